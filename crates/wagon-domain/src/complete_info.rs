// complete_info.rs
use crate::{Piece, Sac, Wagon, Zone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pieza con su cadena de pertenencia completa. Nunca se construye con un
/// ancestro ausente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceCompleteInfo {
  pub piece: Piece,
  pub sac: Sac,
  pub zone: Zone,
  pub wagon: Wagon,
}

/// Sac escaneado: sus piezas (orden por posición) y sus ancestros.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SacCompleteInfo {
  pub sac: Sac,
  pub pieces: Vec<Piece>,
  pub zone: Zone,
  pub wagon: Wagon,
}

impl fmt::Display for PieceCompleteInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "{} → wagon {} / zone {} / sac {}",
           self.piece, self.wagon.numero, self.zone.numero, self.sac.identifiant)
  }
}

impl fmt::Display for SacCompleteInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Sac {} → wagon {} / zone {} ({} piezas)",
           self.sac.identifiant,
           self.wagon.numero,
           self.zone.numero,
           self.pieces.len())
  }
}
