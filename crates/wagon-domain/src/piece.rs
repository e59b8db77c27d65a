// piece.rs
use crate::errors::{InventoryError, Result};
use crate::piece_state::PieceState;
use crate::sac::SacId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PieceId = i32;

/// Pieza física rastreada. `code` es la clave de escaneo y se compara sin
/// distinguir mayúsculas; su unicidad no la garantiza el almacén.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
  pub id: PieceId,
  pub code: String,
  pub state: PieceState,
  pub prioritaire: bool,
  /// Celda en la grilla de colocación (filas × columnas las decide el
  /// llamador; el almacén no valida el límite).
  pub position_index: i32,
  pub sac_id: SacId,
  pub created_at: DateTime<Utc>,
}

impl Piece {
  pub fn matches_code(&self, code: &str) -> bool {
    self.code.to_uppercase() == code.to_uppercase()
  }

  /// Prioritaria y todavía sin instalar.
  pub fn is_pending_priority(&self) -> bool {
    self.prioritaire && !self.state.is_installed()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPiece {
  code: String,
  state: PieceState,
  prioritaire: bool,
  position_index: i32,
  sac_id: SacId,
}

impl NewPiece {
  pub fn new(code: &str, state: PieceState, prioritaire: bool, position_index: i32, sac_id: SacId) -> Result<Self> {
    let code = code.trim();
    if code.is_empty() {
      return Err(InventoryError::validation("El código de la pieza no puede estar vacío"));
    }
    if position_index < 0 {
      return Err(InventoryError::validation(format!("Posición inválida: {}", position_index)));
    }
    Ok(Self { code: code.to_string(), state, prioritaire, position_index, sac_id })
  }

  pub fn code(&self) -> &str {
    &self.code
  }

  pub fn state(&self) -> PieceState {
    self.state
  }

  pub fn prioritaire(&self) -> bool {
    self.prioritaire
  }

  pub fn position_index(&self) -> i32 {
    self.position_index
  }

  pub fn sac_id(&self) -> SacId {
    self.sac_id
  }
}

impl fmt::Display for Piece {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Pieza {} [{}] pos {}{}",
           self.code,
           self.state,
           self.position_index,
           if self.prioritaire { " (prioritaria)" } else { "" })
  }
}
