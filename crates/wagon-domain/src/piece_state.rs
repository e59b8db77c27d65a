// piece_state.rs
use crate::errors::{InventoryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Estado de instalación de una pieza. El código entero es el que se
/// persiste en la columna `etat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceState {
  #[default]
  Uninstalled,
  OnWait,
  InProgress,
  Installed,
  Error,
}

impl PieceState {
  pub const ALL: [PieceState; 5] = [PieceState::Uninstalled,
                                    PieceState::OnWait,
                                    PieceState::InProgress,
                                    PieceState::Installed,
                                    PieceState::Error];

  pub fn code(self) -> i32 {
    match self {
      PieceState::Uninstalled => 0,
      PieceState::OnWait => 1,
      PieceState::InProgress => 2,
      PieceState::Installed => 3,
      PieceState::Error => 4,
    }
  }

  /// Decodifica el entero almacenado. Un código desconocido indica datos
  /// corruptos y se reporta como fallo de almacenamiento.
  pub fn from_code(code: i32) -> Result<Self> {
    Self::ALL.into_iter()
             .find(|s| s.code() == code)
             .ok_or_else(|| InventoryError::storage(format!("código de estado desconocido: {}", code)))
  }

  /// Transición aplicada al escanear la pieza.
  ///
  /// UNINSTALLED → ON_WAIT → INSTALLED. IN_PROGRESS, INSTALLED y ERROR no
  /// cambian: un error sólo se limpia con un reinicio explícito.
  pub fn next_on_scan(self) -> Self {
    match self {
      PieceState::Uninstalled => PieceState::OnWait,
      PieceState::OnWait => PieceState::Installed,
      other => other,
    }
  }

  pub fn is_installed(self) -> bool {
    self == PieceState::Installed
  }

  pub fn name(self) -> &'static str {
    match self {
      PieceState::Uninstalled => "UNINSTALLED",
      PieceState::OnWait => "ON_WAIT",
      PieceState::InProgress => "IN_PROGRESS",
      PieceState::Installed => "INSTALLED",
      PieceState::Error => "ERROR",
    }
  }
}

impl fmt::Display for PieceState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name(), self.code())
  }
}

/// Acepta los nombres canónicos y los alias del esquema antiguo de tres
/// estados (NONE/SCANNED/PLACED y sus equivalentes en francés).
impl FromStr for PieceState {
  type Err = InventoryError;

  fn from_str(s: &str) -> Result<Self> {
    let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
    match normalized.as_str() {
      "UNINSTALLED" | "NONE" | "RIEN" => Ok(PieceState::Uninstalled),
      "ON_WAIT" | "ONWAIT" | "SCANNED" | "SCANNE" => Ok(PieceState::OnWait),
      "IN_PROGRESS" | "BEING" => Ok(PieceState::InProgress),
      "INSTALLED" | "PLACED" | "POSE" => Ok(PieceState::Installed),
      "ERROR" => Ok(PieceState::Error),
      _ => {
        if let Ok(code) = normalized.parse::<i32>() {
          return Self::from_code(code).map_err(|_| InventoryError::validation(format!("estado desconocido: {}", s)));
        }
        Err(InventoryError::validation(format!("estado desconocido: {}", s)))
      }
    }
  }
}

/// Distribución de piezas por estado.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSummary {
  pub uninstalled: usize,
  pub on_wait: usize,
  pub in_progress: usize,
  pub installed: usize,
  pub error: usize,
}

impl StateSummary {
  pub fn from_states<I>(states: I) -> Self
    where I: IntoIterator<Item = PieceState>
  {
    let mut summary = Self::default();
    for state in states {
      match state {
        PieceState::Uninstalled => summary.uninstalled += 1,
        PieceState::OnWait => summary.on_wait += 1,
        PieceState::InProgress => summary.in_progress += 1,
        PieceState::Installed => summary.installed += 1,
        PieceState::Error => summary.error += 1,
      }
    }
    summary
  }

  pub fn count(&self, state: PieceState) -> usize {
    match state {
      PieceState::Uninstalled => self.uninstalled,
      PieceState::OnWait => self.on_wait,
      PieceState::InProgress => self.in_progress,
      PieceState::Installed => self.installed,
      PieceState::Error => self.error,
    }
  }

  pub fn total(&self) -> usize {
    self.uninstalled + self.on_wait + self.in_progress + self.installed + self.error
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scan_transitions_follow_the_table() {
    assert_eq!(PieceState::Uninstalled.next_on_scan(), PieceState::OnWait);
    assert_eq!(PieceState::OnWait.next_on_scan(), PieceState::Installed);
    assert_eq!(PieceState::InProgress.next_on_scan(), PieceState::InProgress);
    assert_eq!(PieceState::Installed.next_on_scan(), PieceState::Installed);
    assert_eq!(PieceState::Error.next_on_scan(), PieceState::Error);
  }

  #[test]
  fn new_pieces_start_uninstalled() {
    assert_eq!(PieceState::default(), PieceState::Uninstalled);
    assert_eq!(PieceState::default().code(), 0);
  }

  #[test]
  fn codes_are_stable() -> Result<()> {
    for state in PieceState::ALL {
      assert_eq!(PieceState::from_code(state.code())?, state);
    }
    assert_eq!(PieceState::Installed.code(), 3);
    match PieceState::from_code(9) {
      Err(InventoryError::StorageFailure(_)) => (),
      other => panic!("expected StorageFailure, got {:?}", other),
    }
    Ok(())
  }

  #[test]
  fn legacy_names_map_to_canonical_states() -> Result<()> {
    assert_eq!("rien".parse::<PieceState>()?, PieceState::Uninstalled);
    assert_eq!("SCANNED".parse::<PieceState>()?, PieceState::OnWait);
    assert_eq!("Pose".parse::<PieceState>()?, PieceState::Installed);
    assert_eq!("on-wait".parse::<PieceState>()?, PieceState::OnWait);
    assert_eq!("being".parse::<PieceState>()?, PieceState::InProgress);
    assert_eq!("4".parse::<PieceState>()?, PieceState::Error);
    assert!("bogus".parse::<PieceState>().is_err());
    Ok(())
  }

  #[test]
  fn serializes_with_canonical_names() {
    let json = serde_json::to_string(&PieceState::OnWait).unwrap();
    assert_eq!(json, "\"ON_WAIT\"");
  }

  #[test]
  fn summary_counts_every_state() {
    let summary = StateSummary::from_states([PieceState::Installed,
                                             PieceState::Installed,
                                             PieceState::OnWait,
                                             PieceState::Error]);
    assert_eq!(summary.count(PieceState::Installed), 2);
    assert_eq!(summary.count(PieceState::Uninstalled), 0);
    assert_eq!(summary.total(), 4);
  }
}
