//! Crate `wagon-scan`: resolución de escaneos sobre el inventario.
//!
//! Expone el `ScanResolver` (máquina de estados de la pieza y resolución de
//! su cadena de pertenencia pieza → sac → zona → wagon), el tipado del
//! contenido leído por el escáner (`ScanPayload`), el filtro de repeticiones
//! del lado del escáner (`ScanDeduplicator`), el modelo de la grilla de
//! colocación (`PlacementGrid`) y una fachada asíncrona (`ScanService`).
//!
//! Ejemplo rápido:
//! ```rust
//! use std::sync::Arc;
//! use wagon_domain::InMemoryInventoryStore;
//! use wagon_scan::ScanResolver;
//! let store = Arc::new(InMemoryInventoryStore::new());
//! let resolver = ScanResolver::new(store);
//! assert!(resolver.resolve_scan("K50").is_err());
//! ```
pub mod dedup;
pub mod grid;
pub mod payload;
pub mod resolver;
pub mod service;

pub use dedup::ScanDeduplicator;
pub use grid::{CellStatus, GridCell, GridLayout, PlacementGrid};
pub use payload::{ScanPayload, PAYLOAD_VERSION};
pub use resolver::{PieceLocation, ScanOutcome, ScanResolver};
pub use service::ScanService;
