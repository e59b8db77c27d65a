// errors.rs
use thiserror::Error;

/// Errores del inventario, compartidos por el almacén y el resolver de
/// escaneos. El resolver nunca los envuelve: lo que falla en el almacén llega
/// tal cual al llamador.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
  /// El almacén se usó antes de `open()` o después de `close()`.
  #[error("Almacén no inicializado")]
  NotInitialized,
  /// Fallo del motor de almacenamiento (BD, pool, migraciones, lock).
  #[error("Error de almacenamiento: {0}")]
  StorageFailure(String),
  /// Búsqueda sin resultado. Es un desenlace esperado, no excepcional.
  #[error("No encontrado: {0}")]
  NotFound(String),
  /// Violación de unicidad al insertar.
  #[error("Conflicto: {0}")]
  Conflict(String),
  /// Contenido escaneado que no es un código ni un sobre v1 válido.
  #[error("Contenido de escaneo inválido: {0}")]
  InvalidPayload(String),
  #[error("Error de validación: {0}")]
  Validation(String),
}

impl InventoryError {
  pub fn not_found(what: impl Into<String>) -> Self {
    Self::NotFound(what.into())
  }

  pub fn storage(msg: impl Into<String>) -> Self {
    Self::StorageFailure(msg.into())
  }

  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound(_))
  }
}

impl From<serde_json::Error> for InventoryError {
  fn from(e: serde_json::Error) -> Self {
    Self::InvalidPayload(e.to_string())
  }
}

/// Alias de resultado usado por las APIs del inventario.
pub type Result<T> = std::result::Result<T, InventoryError>;
