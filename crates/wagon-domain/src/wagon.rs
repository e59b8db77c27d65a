// wagon.rs
use crate::errors::{InventoryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type WagonId = i32;

/// Raíz de la jerarquía wagon → zone → sac → pièce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wagon {
  pub id: WagonId,
  pub numero: String,
  pub created_at: DateTime<Utc>,
}

/// Datos para insertar un wagon. El `numero` es único en el almacén.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWagon {
  numero: String,
}

impl NewWagon {
  pub fn new(numero: &str) -> Result<Self> {
    let numero = numero.trim();
    if numero.is_empty() {
      return Err(InventoryError::validation("El número de wagon no puede estar vacío"));
    }
    Ok(Self { numero: numero.to_string() })
  }

  pub fn numero(&self) -> &str {
    &self.numero
  }
}

impl fmt::Display for Wagon {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Wagon {} (id {})", self.numero, self.id)
  }
}
