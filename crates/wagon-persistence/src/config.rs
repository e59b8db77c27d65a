//! Configuración del almacén SQLite a partir del entorno (`.env` incluido).
//!
//! Variables reconocidas:
//! - `WAGON_DB_URL` (o `DATABASE_URL` como respaldo): ruta/URL SQLite.
//! - `WAGON_DB_POOL_SIZE`: conexiones máximas del pool (por defecto 4).
use wagon_domain::{InventoryError, Result};

pub const DEFAULT_DATABASE_URL: &str = "wagon_inventory.db";
pub const DEFAULT_POOL_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
  pub database_url: String,
  pub pool_size: u32,
}

impl StoreConfig {
  pub fn new(database_url: impl Into<String>) -> Self {
    Self { database_url: database_url.into(), pool_size: DEFAULT_POOL_SIZE }
  }

  pub fn with_pool_size(mut self, pool_size: u32) -> Self {
    self.pool_size = pool_size;
    self
  }

  /// Lee la configuración del entorno tras cargar `.env` si existe.
  pub fn from_env() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Igual que `from_env` pero con una fuente de variables inyectada.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where F: Fn(&str) -> Option<String>
  {
    let database_url = lookup("WAGON_DB_URL").or_else(|| lookup("DATABASE_URL"))
                                             .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    let pool_size = match lookup("WAGON_DB_POOL_SIZE") {
      Some(raw) => raw.trim()
                      .parse::<u32>()
                      .map_err(|_| InventoryError::validation(format!("WAGON_DB_POOL_SIZE inválido: {}", raw)))?,
      None => DEFAULT_POOL_SIZE,
    };
    let config = Self { database_url, pool_size };
    config.validate()?;
    Ok(config)
  }

  /// El almacén sólo habla SQLite; una URL de Postgres es un error de
  /// configuración que se reporta antes de abrir nada.
  pub fn validate(&self) -> Result<()> {
    let url = self.database_url.trim();
    if url.is_empty() {
      return Err(InventoryError::validation("La URL de la base de datos está vacía"));
    }
    let lower = url.to_lowercase();
    if lower.starts_with("postgres://") || lower.starts_with("postgresql://") || lower.starts_with("mysql://") {
      return Err(InventoryError::storage(format!("wagon-persistence sólo soporta SQLite, URL recibida: {}", url)));
    }
    if self.pool_size == 0 {
      return Err(InventoryError::validation("El pool necesita al menos una conexión"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn defaults_when_nothing_is_set() {
    let config = StoreConfig::from_lookup(|_| None).unwrap();
    assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
    assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
  }

  #[test]
  fn wagon_url_wins_over_database_url() {
    let config = StoreConfig::from_lookup(lookup_from(&[("WAGON_DB_URL", "/tmp/a.db"),
                                                        ("DATABASE_URL", "/tmp/b.db"),
                                                        ("WAGON_DB_POOL_SIZE", "2")])).unwrap();
    assert_eq!(config.database_url, "/tmp/a.db");
    assert_eq!(config.pool_size, 2);
  }

  #[test]
  fn rejects_postgres_and_bad_pool_size() {
    let pg = StoreConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://u:p@localhost/db")]));
    assert!(matches!(pg, Err(InventoryError::StorageFailure(_))));
    let bad = StoreConfig::from_lookup(lookup_from(&[("WAGON_DB_POOL_SIZE", "many")]));
    assert!(matches!(bad, Err(InventoryError::Validation(_))));
    assert!(StoreConfig::new("x.db").with_pool_size(0).validate().is_err());
  }
}
