// Archivo: dedup.rs
// Propósito: filtro del lado del escáner. La cámara entrega el mismo código
// varias veces por segundo mientras la etiqueta sigue en cuadro; sólo se deja
// pasar un valor distinto del último aceptado.

/// Suprime repeticiones inmediatas de un mismo valor decodificado.
///
/// El resolver nunca deduplica: dos escaneos que llegan hasta él avanzan el
/// estado dos veces.
#[derive(Debug, Default, Clone)]
pub struct ScanDeduplicator {
    last: Option<String>,
}

impl ScanDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` si el valor debe procesarse (distinto del último aceptado).
    pub fn accept(&mut self, value: &str) -> bool {
        if self.last.as_deref() == Some(value) {
            log::debug!("escaneo repetido ignorado: {}", value);
            return false;
        }
        self.last = Some(value.to_string());
        true
    }

    /// Olvida el último valor (nueva sesión de escaneo).
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
