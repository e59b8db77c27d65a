use crate::errors::{InventoryError, Result};
use crate::piece_state::PieceState;
use crate::{NewPiece, NewSac, NewWagon, NewZone, Piece, PieceId, Sac, SacId, Wagon, WagonId, Zone, ZoneId};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Contrato de persistencia del inventario (wagons, zonas, sacs, piezas).
///
/// Las listas se devuelven ordenadas por su clave natural (wagon por
/// `numero`, zona por `(wagon_id, numero)`, sac por `identifiant`, pieza por
/// `position_index`) y los empates se resuelven por `id`. Todas las
/// operaciones fallan con `NotInitialized` fuera de la ventana open/close.
pub trait InventoryStore: Send + Sync {
  /// Inserta un wagon. `Conflict` si el `numero` ya existe.
  fn add_wagon(&self, wagon: NewWagon) -> Result<WagonId>;
  fn list_wagons(&self) -> Result<Vec<Wagon>>;
  fn get_wagon(&self, id: WagonId) -> Result<Option<Wagon>>;
  /// Elimina el wagon y, en cascada, sus zonas, sacs y piezas.
  fn delete_wagon(&self, id: WagonId) -> Result<()>;

  /// Inserta una zona. `NotFound` si el wagon no existe.
  fn add_zone(&self, zone: NewZone) -> Result<ZoneId>;
  fn list_zones(&self) -> Result<Vec<Zone>>;
  fn get_zone(&self, id: ZoneId) -> Result<Option<Zone>>;
  fn zones_by_wagon(&self, wagon_id: WagonId) -> Result<Vec<Zone>>;
  fn delete_zone(&self, id: ZoneId) -> Result<()>;

  /// Inserta un sac. `Conflict` si el `identifiant` ya existe, `NotFound` si
  /// la zona no existe.
  fn add_sac(&self, sac: NewSac) -> Result<SacId>;
  fn list_sacs(&self) -> Result<Vec<Sac>>;
  fn get_sac(&self, id: SacId) -> Result<Option<Sac>>;
  fn sacs_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Sac>>;
  fn delete_sac(&self, id: SacId) -> Result<()>;

  /// Inserta una pieza. `NotFound` si el sac no existe.
  fn add_piece(&self, piece: NewPiece) -> Result<PieceId>;
  fn list_pieces(&self) -> Result<Vec<Piece>>;
  fn get_piece(&self, id: PieceId) -> Result<Option<Piece>>;
  fn pieces_by_sac(&self, sac_id: SacId) -> Result<Vec<Piece>>;
  /// Todas las piezas prioritarias, en orden de posición.
  fn priority_pieces(&self) -> Result<Vec<Piece>>;
  /// Escritura incondicional del estado (sin control de concurrencia).
  /// `NotFound` si la pieza no existe.
  fn update_piece_state(&self, id: PieceId, state: PieceState) -> Result<()>;
  fn delete_piece(&self, id: PieceId) -> Result<()>;

  /// Vacía las cuatro colecciones de hijo a padre.
  fn delete_all(&self) -> Result<()>;
}

#[derive(Debug)]
struct InventoryTables {
  wagons: BTreeMap<WagonId, Wagon>,
  zones: BTreeMap<ZoneId, Zone>,
  sacs: BTreeMap<SacId, Sac>,
  pieces: BTreeMap<PieceId, Piece>,
  // Contadores tipo AUTOINCREMENT: los ids nunca se reutilizan.
  last_wagon_id: WagonId,
  last_zone_id: ZoneId,
  last_sac_id: SacId,
  last_piece_id: PieceId,
}

impl InventoryTables {
  fn new() -> Self {
    Self { wagons: BTreeMap::new(),
           zones: BTreeMap::new(),
           sacs: BTreeMap::new(),
           pieces: BTreeMap::new(),
           last_wagon_id: 0,
           last_zone_id: 0,
           last_sac_id: 0,
           last_piece_id: 0 }
  }

  fn remove_pieces_of_sacs(&mut self, sac_ids: &[SacId]) {
    self.pieces.retain(|_, p| !sac_ids.contains(&p.sac_id));
  }

  fn remove_sacs(&mut self, sac_ids: &[SacId]) {
    self.remove_pieces_of_sacs(sac_ids);
    self.sacs.retain(|id, _| !sac_ids.contains(id));
  }

  fn remove_zones(&mut self, zone_ids: &[ZoneId]) {
    let sac_ids: Vec<SacId> = self.sacs.values().filter(|s| zone_ids.contains(&s.zone_id)).map(|s| s.id).collect();
    self.remove_sacs(&sac_ids);
    self.zones.retain(|id, _| !zone_ids.contains(id));
  }
}

fn sorted_pieces(mut pieces: Vec<Piece>) -> Vec<Piece> {
  pieces.sort_by(|a, b| a.position_index.cmp(&b.position_index).then(a.id.cmp(&b.id)));
  pieces
}

/// Implementación en memoria para tests y desarrollo. Reproduce la
/// unicidad, las claves foráneas y el borrado en cascada del esquema SQL.
pub struct InMemoryInventoryStore {
  tables: Arc<Mutex<InventoryTables>>,
  open: AtomicBool,
}

impl InMemoryInventoryStore {
  /// Crea un almacén vacío ya abierto.
  pub fn new() -> Self {
    Self { tables: Arc::new(Mutex::new(InventoryTables::new())),
           open: AtomicBool::new(true) }
  }

  /// Simula el cierre de la conexión: toda operación posterior falla con
  /// `NotInitialized`.
  pub fn close(&self) {
    self.open.store(false, Ordering::SeqCst);
  }

  pub fn is_open(&self) -> bool {
    self.open.load(Ordering::SeqCst)
  }

  // Helper to map poisoned mutex errors into InventoryError
  fn lock(&self) -> Result<MutexGuard<'_, InventoryTables>> {
    if !self.is_open() {
      return Err(InventoryError::NotInitialized);
    }
    self.tables
        .lock()
        .map_err(|e| InventoryError::storage(format!("Mutex 'inventory' poisoned: {}", e)))
  }
}

impl Default for InMemoryInventoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl InventoryStore for InMemoryInventoryStore {
  fn add_wagon(&self, wagon: NewWagon) -> Result<WagonId> {
    let mut t = self.lock()?;
    if t.wagons.values().any(|w| w.numero == wagon.numero()) {
      return Err(InventoryError::Conflict(format!("wagon {} ya existe", wagon.numero())));
    }
    t.last_wagon_id += 1;
    let id = t.last_wagon_id;
    t.wagons.insert(id, Wagon { id, numero: wagon.numero().to_string(), created_at: Utc::now() });
    Ok(id)
  }

  fn list_wagons(&self) -> Result<Vec<Wagon>> {
    let t = self.lock()?;
    let mut wagons: Vec<Wagon> = t.wagons.values().cloned().collect();
    wagons.sort_by(|a, b| a.numero.cmp(&b.numero).then(a.id.cmp(&b.id)));
    Ok(wagons)
  }

  fn get_wagon(&self, id: WagonId) -> Result<Option<Wagon>> {
    let t = self.lock()?;
    Ok(t.wagons.get(&id).cloned())
  }

  fn delete_wagon(&self, id: WagonId) -> Result<()> {
    let mut t = self.lock()?;
    let zone_ids: Vec<ZoneId> = t.zones.values().filter(|z| z.wagon_id == id).map(|z| z.id).collect();
    log::debug!("in-memory: borrando wagon {} y {} zonas en cascada", id, zone_ids.len());
    t.remove_zones(&zone_ids);
    t.wagons.remove(&id);
    Ok(())
  }

  fn add_zone(&self, zone: NewZone) -> Result<ZoneId> {
    let mut t = self.lock()?;
    if !t.wagons.contains_key(&zone.wagon_id()) {
      return Err(InventoryError::not_found(format!("wagon {}", zone.wagon_id())));
    }
    t.last_zone_id += 1;
    let id = t.last_zone_id;
    t.zones.insert(id,
                   Zone { id, numero: zone.numero(), wagon_id: zone.wagon_id(), created_at: Utc::now() });
    Ok(id)
  }

  fn list_zones(&self) -> Result<Vec<Zone>> {
    let t = self.lock()?;
    let mut zones: Vec<Zone> = t.zones.values().cloned().collect();
    zones.sort_by(|a, b| a.wagon_id.cmp(&b.wagon_id).then(a.numero.cmp(&b.numero)).then(a.id.cmp(&b.id)));
    Ok(zones)
  }

  fn get_zone(&self, id: ZoneId) -> Result<Option<Zone>> {
    let t = self.lock()?;
    Ok(t.zones.get(&id).cloned())
  }

  fn zones_by_wagon(&self, wagon_id: WagonId) -> Result<Vec<Zone>> {
    Ok(self.list_zones()?.into_iter().filter(|z| z.wagon_id == wagon_id).collect())
  }

  fn delete_zone(&self, id: ZoneId) -> Result<()> {
    let mut t = self.lock()?;
    t.remove_zones(&[id]);
    Ok(())
  }

  fn add_sac(&self, sac: NewSac) -> Result<SacId> {
    let mut t = self.lock()?;
    if !t.zones.contains_key(&sac.zone_id()) {
      return Err(InventoryError::not_found(format!("zone {}", sac.zone_id())));
    }
    if t.sacs.values().any(|s| s.identifiant == sac.identifiant()) {
      return Err(InventoryError::Conflict(format!("sac {} ya existe", sac.identifiant())));
    }
    t.last_sac_id += 1;
    let id = t.last_sac_id;
    t.sacs.insert(id,
                  Sac { id,
                        identifiant: sac.identifiant().to_string(),
                        zone_id: sac.zone_id(),
                        created_at: Utc::now() });
    Ok(id)
  }

  fn list_sacs(&self) -> Result<Vec<Sac>> {
    let t = self.lock()?;
    let mut sacs: Vec<Sac> = t.sacs.values().cloned().collect();
    sacs.sort_by(|a, b| a.identifiant.cmp(&b.identifiant).then(a.id.cmp(&b.id)));
    Ok(sacs)
  }

  fn get_sac(&self, id: SacId) -> Result<Option<Sac>> {
    let t = self.lock()?;
    Ok(t.sacs.get(&id).cloned())
  }

  fn sacs_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Sac>> {
    Ok(self.list_sacs()?.into_iter().filter(|s| s.zone_id == zone_id).collect())
  }

  fn delete_sac(&self, id: SacId) -> Result<()> {
    let mut t = self.lock()?;
    t.remove_sacs(&[id]);
    Ok(())
  }

  fn add_piece(&self, piece: NewPiece) -> Result<PieceId> {
    let mut t = self.lock()?;
    if !t.sacs.contains_key(&piece.sac_id()) {
      return Err(InventoryError::not_found(format!("sac {}", piece.sac_id())));
    }
    t.last_piece_id += 1;
    let id = t.last_piece_id;
    t.pieces.insert(id,
                    Piece { id,
                            code: piece.code().to_string(),
                            state: piece.state(),
                            prioritaire: piece.prioritaire(),
                            position_index: piece.position_index(),
                            sac_id: piece.sac_id(),
                            created_at: Utc::now() });
    Ok(id)
  }

  fn list_pieces(&self) -> Result<Vec<Piece>> {
    let t = self.lock()?;
    Ok(sorted_pieces(t.pieces.values().cloned().collect()))
  }

  fn get_piece(&self, id: PieceId) -> Result<Option<Piece>> {
    let t = self.lock()?;
    Ok(t.pieces.get(&id).cloned())
  }

  fn pieces_by_sac(&self, sac_id: SacId) -> Result<Vec<Piece>> {
    let t = self.lock()?;
    Ok(sorted_pieces(t.pieces.values().filter(|p| p.sac_id == sac_id).cloned().collect()))
  }

  fn priority_pieces(&self) -> Result<Vec<Piece>> {
    let t = self.lock()?;
    Ok(sorted_pieces(t.pieces.values().filter(|p| p.prioritaire).cloned().collect()))
  }

  fn update_piece_state(&self, id: PieceId, state: PieceState) -> Result<()> {
    let mut t = self.lock()?;
    let piece = t.pieces.get_mut(&id).ok_or_else(|| InventoryError::not_found(format!("pieza {}", id)))?;
    piece.state = state;
    Ok(())
  }

  fn delete_piece(&self, id: PieceId) -> Result<()> {
    let mut t = self.lock()?;
    t.pieces.remove(&id);
    Ok(())
  }

  fn delete_all(&self) -> Result<()> {
    let mut t = self.lock()?;
    t.pieces.clear();
    t.sacs.clear();
    t.zones.clear();
    t.wagons.clear();
    log::info!("in-memory: inventario vaciado");
    Ok(())
  }
}
