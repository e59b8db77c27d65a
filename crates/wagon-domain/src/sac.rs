// sac.rs
use crate::errors::{InventoryError, Result};
use crate::zone::ZoneId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type SacId = i32;

/// Sac etiquetado que agrupa piezas dentro de una zona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sac {
  pub id: SacId,
  pub identifiant: String,
  pub zone_id: ZoneId,
  pub created_at: DateTime<Utc>,
}

impl Sac {
  /// Compara el identificador sin distinguir mayúsculas.
  pub fn matches_identifiant(&self, identifiant: &str) -> bool {
    self.identifiant.to_uppercase() == identifiant.to_uppercase()
  }
}

/// Datos para insertar un sac. El `identifiant` es único en el almacén.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSac {
  identifiant: String,
  zone_id: ZoneId,
}

impl NewSac {
  pub fn new(identifiant: &str, zone_id: ZoneId) -> Result<Self> {
    let identifiant = identifiant.trim();
    if identifiant.is_empty() {
      return Err(InventoryError::validation("El identificador del sac no puede estar vacío"));
    }
    Ok(Self { identifiant: identifiant.to_string(), zone_id })
  }

  pub fn identifiant(&self) -> &str {
    &self.identifiant
  }

  pub fn zone_id(&self) -> ZoneId {
    self.zone_id
  }
}

impl fmt::Display for Sac {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Sac {} (id {}, zone {})", self.identifiant, self.id, self.zone_id)
  }
}
