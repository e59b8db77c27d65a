mod complete_info;
mod errors;
mod inventory_store;
mod piece;
mod piece_state;
mod sac;
mod wagon;
mod zone;

pub use complete_info::{PieceCompleteInfo, SacCompleteInfo};
pub use errors::{InventoryError, Result};
pub use inventory_store::{InMemoryInventoryStore, InventoryStore};
pub use piece::{NewPiece, Piece, PieceId};
pub use piece_state::{PieceState, StateSummary};
pub use sac::{NewSac, Sac, SacId};
pub use wagon::{NewWagon, Wagon, WagonId};
pub use zone::{NewZone, Zone, ZoneId};
