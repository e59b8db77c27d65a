// Archivo: payload.rs
// Propósito: tipar la cadena decodificada por el escáner. Un texto plano es
// el código de una pieza; un objeto JSON debe ser el sobre versionado v1.
// Cualquier otra forma se rechaza con `InvalidPayload`.
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use wagon_domain::{InventoryError, Result};

/// Versión del sobre JSON aceptada.
pub const PAYLOAD_VERSION: u64 = 1;

/// Contenido de un escaneo ya tipado. El estado que viniera dentro del
/// contenido nunca se usa: la resolución siempre consulta el almacén.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPayload {
    Piece { code: String },
    Sac { identifiant: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum EnvelopeBody {
    Piece { code: String },
    Sac { identifiant: String },
}

impl ScanPayload {
    /// Interpreta la cadena leída por el escáner.
    ///
    /// - `"K50"` → `Piece { code: "K50" }` (se recortan los espacios).
    /// - `{"v":1,"type":"piece","code":"K50"}` → `Piece`.
    /// - `{"v":1,"type":"sac","identifiant":"SAC-001"}` → `Sac`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InventoryError::InvalidPayload("contenido vacío".into()));
        }
        if !trimmed.starts_with('{') {
            return Ok(ScanPayload::Piece { code: trimmed.to_string() });
        }
        let value: Value = serde_json::from_str(trimmed)?;
        match value.get("v").and_then(Value::as_u64) {
            Some(PAYLOAD_VERSION) => {}
            Some(other) => return Err(InventoryError::InvalidPayload(format!("versión de sobre no soportada: {}", other))),
            None => return Err(InventoryError::InvalidPayload("sobre sin versión 'v'".into())),
        }
        let body: EnvelopeBody = serde_json::from_value(value)?;
        let payload = match body {
            EnvelopeBody::Piece { code } => ScanPayload::Piece { code: non_blank(code, "code")? },
            EnvelopeBody::Sac { identifiant } => ScanPayload::Sac { identifiant: non_blank(identifiant, "identifiant")? },
        };
        Ok(payload)
    }

    /// Clave que se busca en el almacén.
    pub fn key(&self) -> &str {
        match self {
            ScanPayload::Piece { code } => code,
            ScanPayload::Sac { identifiant } => identifiant,
        }
    }

    /// Sobre v1 equivalente, tal como lo imprimiría una etiqueta.
    pub fn to_envelope(&self) -> Value {
        match self {
            ScanPayload::Piece { code } => json!({ "v": PAYLOAD_VERSION, "type": "piece", "code": code }),
            ScanPayload::Sac { identifiant } => {
                json!({ "v": PAYLOAD_VERSION, "type": "sac", "identifiant": identifiant })
            }
        }
    }
}

fn non_blank(value: String, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::InvalidPayload(format!("campo '{}' vacío", field)));
    }
    Ok(trimmed.to_string())
}

impl fmt::Display for ScanPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPayload::Piece { code } => write!(f, "pieza {}", code),
            ScanPayload::Sac { identifiant } => write!(f, "sac {}", identifiant),
        }
    }
}
