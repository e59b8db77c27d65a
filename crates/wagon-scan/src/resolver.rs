// Archivo: resolver.rs
// Propósito: implementar `ScanResolver`, la capa que traduce un código
// escaneado en una transición de estado persistida y en la cadena de
// pertenencia completa de la pieza (pieza → sac → zona → wagon).
use crate::payload::ScanPayload;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use wagon_domain::{InventoryError, InventoryStore, Piece, PieceCompleteInfo, PieceId, PieceState, Result, Sac,
                   SacCompleteInfo, SacId, StateSummary, Wagon, WagonId, Zone, ZoneId};

/// Ubicación impresa de una pieza: wagon, zona, sac, código y celda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceLocation {
    pub wagon: String,
    pub zone: i32,
    pub sac: String,
    pub code: String,
    pub position_index: i32,
}

/// Resultado de despachar un `ScanPayload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScanOutcome {
    Piece(PieceCompleteInfo),
    Sac(SacCompleteInfo),
}

/// Resolver de escaneos sobre un `InventoryStore` inyectado.
///
/// No guarda estado propio ni deduplica: cada llamada consulta el almacén.
/// Los errores del almacén se propagan tal cual.
pub struct ScanResolver<S>
    where S: InventoryStore + ?Sized
{
    store: Arc<S>,
}

impl<S> Clone for ScanResolver<S> where S: InventoryStore + ?Sized
{
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

// Caché por llamada de los ancestros ya consultados. `None` recuerda que el
// id no existe para no repetir la búsqueda.
#[derive(Default)]
struct AncestorCache {
    sacs: HashMap<SacId, Option<Sac>>,
    zones: HashMap<ZoneId, Option<Zone>>,
    wagons: HashMap<WagonId, Option<Wagon>>,
}

impl<S> ScanResolver<S> where S: InventoryStore + ?Sized
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Procesa el escaneo de una pieza.
    ///
    /// Busca la primera pieza cuyo código coincide sin distinguir mayúsculas,
    /// aplica `PieceState::next_on_scan` (sólo escribe si el estado cambia) y
    /// devuelve la pieza con sus ancestros. Si falta un ancestro devuelve
    /// `NotFound`, pero la transición ya quedó persistida.
    pub fn resolve_scan(&self, code: &str) -> Result<PieceCompleteInfo> {
        let needle = code.to_uppercase();
        let mut piece = self.store
                            .list_pieces()?
                            .into_iter()
                            .find(|p| p.code.to_uppercase() == needle)
                            .ok_or_else(|| InventoryError::not_found(format!("pieza con código {}", code)))?;
        let next = piece.state.next_on_scan();
        if next != piece.state {
            self.store.update_piece_state(piece.id, next)?;
            log::info!("pieza {} (id {}): {} → {}", piece.code, piece.id, piece.state, next);
            piece.state = next;
        } else {
            log::debug!("pieza {} (id {}) sin cambio de estado: {}", piece.code, piece.id, piece.state);
        }
        self.complete_piece(piece)
    }

    /// Escaneo de la etiqueta de un sac: sólo lectura.
    pub fn resolve_sac_scan(&self, identifiant: &str) -> Result<SacCompleteInfo> {
        let needle = identifiant.to_uppercase();
        let sac = self.store
                      .list_sacs()?
                      .into_iter()
                      .find(|s| s.identifiant.to_uppercase() == needle)
                      .ok_or_else(|| InventoryError::not_found(format!("sac {}", identifiant)))?;
        let pieces = self.store.pieces_by_sac(sac.id)?;
        let (zone, wagon) = self.zone_and_wagon(sac.zone_id)?;
        Ok(SacCompleteInfo { sac, pieces, zone, wagon })
    }

    /// Piezas prioritarias aún no instaladas, con su cadena, en orden de
    /// posición. Una pieza con un ancestro ausente se omite.
    pub fn priority_pieces_pending(&self) -> Result<Vec<PieceCompleteInfo>> {
        let mut cache = AncestorCache::default();
        let mut pending = Vec::new();
        for piece in self.store.priority_pieces()? {
            if !piece.is_pending_priority() {
                continue;
            }
            match self.cached_chain(&mut cache, piece.sac_id)? {
                Some((sac, zone, wagon)) => pending.push(PieceCompleteInfo { piece, sac, zone, wagon }),
                None => log::warn!("pieza prioritaria {} (id {}) con cadena incompleta, se omite", piece.code, piece.id),
            }
        }
        Ok(pending)
    }

    /// Reinicio explícito a `UNINSTALLED` (también limpia `ERROR`).
    pub fn reset_piece_state(&self, piece_id: PieceId) -> Result<()> {
        self.store.update_piece_state(piece_id, PieceState::Uninstalled)?;
        log::info!("pieza {} reiniciada a {}", piece_id, PieceState::Uninstalled);
        Ok(())
    }

    /// Búsqueda de sólo lectura por la ubicación impresa completa. No aplica
    /// ninguna transición.
    pub fn locate_piece(&self, location: &PieceLocation) -> Result<PieceCompleteInfo> {
        let wagon_key = location.wagon.to_uppercase();
        let wagon = self.store
                        .list_wagons()?
                        .into_iter()
                        .find(|w| w.numero.to_uppercase() == wagon_key)
                        .ok_or_else(|| InventoryError::not_found(format!("wagon {}", location.wagon)))?;
        let zone = self.store
                       .zones_by_wagon(wagon.id)?
                       .into_iter()
                       .find(|z| z.numero == location.zone)
                       .ok_or_else(|| {
                           InventoryError::not_found(format!("zona {} del wagon {}", location.zone, location.wagon))
                       })?;
        let sac = self.store
                      .sacs_by_zone(zone.id)?
                      .into_iter()
                      .find(|s| s.matches_identifiant(&location.sac))
                      .ok_or_else(|| InventoryError::not_found(format!("sac {} en zona {}", location.sac, location.zone)))?;
        let piece = self.store
                        .pieces_by_sac(sac.id)?
                        .into_iter()
                        .find(|p| p.matches_code(&location.code) && p.position_index == location.position_index)
                        .ok_or_else(|| {
                            InventoryError::not_found(format!("pieza {} en posición {} del sac {}",
                                                              location.code, location.position_index, location.sac))
                        })?;
        Ok(PieceCompleteInfo { piece, sac, zone, wagon })
    }

    /// Distribución de todas las piezas por estado.
    pub fn state_summary(&self) -> Result<StateSummary> {
        Ok(StateSummary::from_states(self.store.list_pieces()?.into_iter().map(|p| p.state)))
    }

    pub fn resolve_payload(&self, payload: &ScanPayload) -> Result<ScanOutcome> {
        match payload {
            ScanPayload::Piece { code } => self.resolve_scan(code).map(ScanOutcome::Piece),
            ScanPayload::Sac { identifiant } => self.resolve_sac_scan(identifiant).map(ScanOutcome::Sac),
        }
    }

    fn complete_piece(&self, piece: Piece) -> Result<PieceCompleteInfo> {
        let sac = self.store
                      .get_sac(piece.sac_id)?
                      .ok_or_else(|| InventoryError::not_found(format!("sac {} de la pieza {}", piece.sac_id, piece.code)))?;
        let (zone, wagon) = self.zone_and_wagon(sac.zone_id)?;
        Ok(PieceCompleteInfo { piece, sac, zone, wagon })
    }

    fn zone_and_wagon(&self, zone_id: ZoneId) -> Result<(Zone, Wagon)> {
        let zone = self.store
                       .get_zone(zone_id)?
                       .ok_or_else(|| InventoryError::not_found(format!("zona {}", zone_id)))?;
        let wagon = self.store
                        .get_wagon(zone.wagon_id)?
                        .ok_or_else(|| InventoryError::not_found(format!("wagon {}", zone.wagon_id)))?;
        Ok((zone, wagon))
    }

    fn cached_chain(&self, cache: &mut AncestorCache, sac_id: SacId) -> Result<Option<(Sac, Zone, Wagon)>> {
        let sac = match cache.sacs.get(&sac_id) {
            Some(hit) => hit.clone(),
            None => {
                let found = self.store.get_sac(sac_id)?;
                cache.sacs.insert(sac_id, found.clone());
                found
            }
        };
        let Some(sac) = sac else { return Ok(None) };
        let zone = match cache.zones.get(&sac.zone_id) {
            Some(hit) => hit.clone(),
            None => {
                let found = self.store.get_zone(sac.zone_id)?;
                cache.zones.insert(sac.zone_id, found.clone());
                found
            }
        };
        let Some(zone) = zone else { return Ok(None) };
        let wagon = match cache.wagons.get(&zone.wagon_id) {
            Some(hit) => hit.clone(),
            None => {
                let found = self.store.get_wagon(zone.wagon_id)?;
                cache.wagons.insert(zone.wagon_id, found.clone());
                found
            }
        };
        Ok(wagon.map(|wagon| (sac, zone, wagon)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagon_domain::{InMemoryInventoryStore, NewPiece, NewSac, NewWagon, NewZone};

    fn seeded() -> (Arc<InMemoryInventoryStore>, PieceId) {
        let store = Arc::new(InMemoryInventoryStore::new());
        let w = store.add_wagon(NewWagon::new("W001").unwrap()).unwrap();
        let z = store.add_zone(NewZone::new(1, w).unwrap()).unwrap();
        let s = store.add_sac(NewSac::new("SAC-001", z).unwrap()).unwrap();
        let p = store.add_piece(NewPiece::new("K50", PieceState::Uninstalled, true, 0, s).unwrap()).unwrap();
        (store, p)
    }

    #[test]
    fn error_state_is_sticky_until_reset() {
        let (store, id) = seeded();
        store.update_piece_state(id, PieceState::Error).unwrap();
        let resolver = ScanResolver::new(store.clone());
        assert_eq!(resolver.resolve_scan("K50").unwrap().piece.state, PieceState::Error);
        resolver.reset_piece_state(id).unwrap();
        assert_eq!(resolver.resolve_scan("K50").unwrap().piece.state, PieceState::OnWait);
    }

    #[test]
    fn works_through_a_trait_object() {
        let (store, _) = seeded();
        let dyn_store: Arc<dyn InventoryStore> = store;
        let resolver = ScanResolver::new(dyn_store);
        let outcome = resolver.resolve_payload(&ScanPayload::Sac { identifiant: "sac-001".into() }).unwrap();
        match outcome {
            ScanOutcome::Sac(info) => assert_eq!(info.pieces.len(), 1),
            other => panic!("expected a sac outcome, got {:?}", other),
        }
    }
}
