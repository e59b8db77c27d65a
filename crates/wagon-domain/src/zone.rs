// zone.rs
use crate::errors::{InventoryError, Result};
use crate::wagon::WagonId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ZoneId = i32;

/// Subdivisión numerada de un wagon (1..N dentro del wagon).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
  pub id: ZoneId,
  pub numero: i32,
  pub wagon_id: WagonId,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewZone {
  numero: i32,
  wagon_id: WagonId,
}

impl NewZone {
  pub fn new(numero: i32, wagon_id: WagonId) -> Result<Self> {
    if numero < 1 {
      return Err(InventoryError::validation(format!("Número de zona inválido: {} (debe ser >= 1)", numero)));
    }
    Ok(Self { numero, wagon_id })
  }

  pub fn numero(&self) -> i32 {
    self.numero
  }

  pub fn wagon_id(&self) -> WagonId {
    self.wagon_id
  }
}

impl fmt::Display for Zone {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Zone {} (id {}, wagon {})", self.numero, self.id, self.wagon_id)
  }
}
