//! Persistencia SQLite del inventario.
//! Expone el módulo `schema`, la configuración leída del entorno y el
//! almacén Diesel que implementa `InventoryStore`. La implementación
//! detallada está en `inventory_persistence.rs`.

mod config;
mod inventory_persistence;
pub mod schema;

pub use config::{StoreConfig, DEFAULT_DATABASE_URL, DEFAULT_POOL_SIZE};
pub use inventory_persistence::{new_from_env, open_sqlite, DieselInventoryStore, MIGRATIONS};
