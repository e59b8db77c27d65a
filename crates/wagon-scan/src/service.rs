// Archivo: service.rs
// Propósito: fachada asíncrona de `ScanResolver`. Cada llamada ejecuta el
// resolver síncrono en el pool de bloqueo de tokio y espera el resultado,
// de modo que el hilo del runtime nunca queda bloqueado por SQLite.
use crate::payload::ScanPayload;
use crate::resolver::{PieceLocation, ScanOutcome, ScanResolver};
use std::sync::Arc;
use wagon_domain::{InventoryError, InventoryStore, PieceCompleteInfo, PieceId, Result, SacCompleteInfo, StateSummary};

/// Servicio de escaneo para llamadores asíncronos.
///
/// Las llamadas se asumen secuenciales: no hay exclusión mutua interna, dos
/// escaneos concurrentes de la misma pieza pueden avanzarla dos veces.
pub struct ScanService<S>
    where S: InventoryStore + ?Sized + 'static
{
    resolver: ScanResolver<S>,
}

impl<S> Clone for ScanService<S> where S: InventoryStore + ?Sized + 'static
{
    fn clone(&self) -> Self {
        Self { resolver: self.resolver.clone() }
    }
}

impl<S> ScanService<S> where S: InventoryStore + ?Sized + 'static
{
    pub fn new(store: Arc<S>) -> Self {
        Self { resolver: ScanResolver::new(store) }
    }

    pub fn resolver(&self) -> &ScanResolver<S> {
        &self.resolver
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
        where F: FnOnce(ScanResolver<S>) -> Result<T> + Send + 'static,
              T: Send + 'static
    {
        let resolver = self.resolver.clone();
        tokio::task::spawn_blocking(move || op(resolver)).await
                                                          .map_err(|e| InventoryError::storage(format!("tarea de escaneo: {}", e)))?
    }

    pub async fn resolve_scan(&self, code: &str) -> Result<PieceCompleteInfo> {
        let code = code.to_string();
        self.run(move |r| r.resolve_scan(&code)).await
    }

    pub async fn resolve_sac_scan(&self, identifiant: &str) -> Result<SacCompleteInfo> {
        let identifiant = identifiant.to_string();
        self.run(move |r| r.resolve_sac_scan(&identifiant)).await
    }

    pub async fn priority_pieces_pending(&self) -> Result<Vec<PieceCompleteInfo>> {
        self.run(|r| r.priority_pieces_pending()).await
    }

    pub async fn reset_piece_state(&self, piece_id: PieceId) -> Result<()> {
        self.run(move |r| r.reset_piece_state(piece_id)).await
    }

    pub async fn locate_piece(&self, location: PieceLocation) -> Result<PieceCompleteInfo> {
        self.run(move |r| r.locate_piece(&location)).await
    }

    pub async fn state_summary(&self) -> Result<StateSummary> {
        self.run(|r| r.state_summary()).await
    }

    pub async fn resolve_payload(&self, payload: ScanPayload) -> Result<ScanOutcome> {
        self.run(move |r| r.resolve_payload(&payload)).await
    }

    /// Ejecuta una operación directa sobre el almacén (altas, listados,
    /// borrado total) en el pool de bloqueo.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T>
        where F: FnOnce(&S) -> Result<T> + Send + 'static,
              T: Send + 'static
    {
        self.run(move |r| op(r.store().as_ref())).await
    }

    /// Punto de entrada del escáner: tipa la cadena decodificada y la
    /// despacha. Un contenido inválido no toca el almacén.
    pub async fn handle_raw_scan(&self, raw: &str) -> Result<ScanOutcome> {
        let payload = ScanPayload::parse(raw)?;
        log::debug!("escaneo recibido: {}", payload);
        self.resolve_payload(payload).await
    }
}
