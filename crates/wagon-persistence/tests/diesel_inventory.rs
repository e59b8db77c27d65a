use std::path::PathBuf;
use uuid::Uuid;
use wagon_domain::{InventoryError, InventoryStore, NewPiece, NewSac, NewWagon, NewZone, PieceState};
use wagon_persistence::{open_sqlite, DieselInventoryStore, StoreConfig};

// Base SQLite en un fichero temporal por test; en memoria cada conexión del
// pool vería una base distinta.
fn temp_db_path() -> PathBuf {
  std::env::temp_dir().join(format!("wagon_test_{}.db", Uuid::new_v4()))
}

fn cleanup(path: &PathBuf) {
  let base = path.to_str().unwrap().to_string();
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{}", base, suffix));
  }
}

#[test]
fn operations_fail_before_open_and_after_close() {
  let path = temp_db_path();
  let store = DieselInventoryStore::new(StoreConfig::new(path.to_str().unwrap()));
  assert!(!store.is_open());
  assert_eq!(store.list_wagons(), Err(InventoryError::NotInitialized));
  store.open().expect("open");
  assert!(store.is_open());
  store.open().expect("second open is a no-op");
  store.add_wagon(NewWagon::new("W001").unwrap()).expect("add wagon");
  store.close().expect("close");
  assert!(!store.is_open());
  assert_eq!(store.list_wagons(), Err(InventoryError::NotInitialized));
  assert_eq!(store.update_piece_state(1, PieceState::Installed), Err(InventoryError::NotInitialized));
  // Reabrir conserva los datos.
  store.open().expect("reopen");
  assert_eq!(store.list_wagons().unwrap().len(), 1);
  store.close().unwrap();
  cleanup(&path);
}

#[test]
fn hierarchy_crud_and_ordering() {
  let path = temp_db_path();
  let store = open_sqlite(path.to_str().unwrap()).expect("open store");
  let w2 = store.add_wagon(NewWagon::new("W002").unwrap()).unwrap();
  let w1 = store.add_wagon(NewWagon::new("W001").unwrap()).unwrap();
  let numeros: Vec<String> = store.list_wagons().unwrap().into_iter().map(|w| w.numero).collect();
  assert_eq!(numeros, vec!["W001", "W002"]);

  let z2 = store.add_zone(NewZone::new(2, w1).unwrap()).unwrap();
  let z1 = store.add_zone(NewZone::new(1, w1).unwrap()).unwrap();
  store.add_zone(NewZone::new(1, w2).unwrap()).unwrap();
  let zone_numbers: Vec<i32> = store.zones_by_wagon(w1).unwrap().into_iter().map(|z| z.numero).collect();
  assert_eq!(zone_numbers, vec![1, 2]);
  assert_eq!(store.list_zones().unwrap().len(), 3);

  let sb = store.add_sac(NewSac::new("SAC-B", z1).unwrap()).unwrap();
  store.add_sac(NewSac::new("SAC-A", z1).unwrap()).unwrap();
  store.add_sac(NewSac::new("SAC-C", z2).unwrap()).unwrap();
  let idents: Vec<String> = store.sacs_by_zone(z1).unwrap().into_iter().map(|s| s.identifiant).collect();
  assert_eq!(idents, vec!["SAC-A", "SAC-B"]);

  let p5 = store.add_piece(NewPiece::new("K50", PieceState::Uninstalled, true, 5, sb).unwrap()).unwrap();
  store.add_piece(NewPiece::new("K10", PieceState::OnWait, false, 1, sb).unwrap()).unwrap();
  store.add_piece(NewPiece::new("K11", PieceState::Installed, true, 1, sb).unwrap()).unwrap();
  let codes: Vec<String> = store.pieces_by_sac(sb).unwrap().into_iter().map(|p| p.code).collect();
  assert_eq!(codes, vec!["K10", "K11", "K50"]);
  let priority: Vec<String> = store.priority_pieces().unwrap().into_iter().map(|p| p.code).collect();
  assert_eq!(priority, vec!["K11", "K50"]);

  let piece = store.get_piece(p5).unwrap().expect("piece present");
  assert_eq!(piece.state, PieceState::Uninstalled);
  assert!(piece.prioritaire);
  assert_eq!(piece.sac_id, sb);

  store.update_piece_state(p5, PieceState::OnWait).unwrap();
  assert_eq!(store.get_piece(p5).unwrap().unwrap().state, PieceState::OnWait);

  store.delete_piece(p5).unwrap();
  assert!(store.get_piece(p5).unwrap().is_none());
  store.delete_piece(p5).expect("deleting a missing piece is a no-op");
  assert!(store.get_wagon(9999).unwrap().is_none());

  store.close().unwrap();
  cleanup(&path);
}

#[test]
fn constraint_violations_are_typed() {
  let path = temp_db_path();
  let store = open_sqlite(path.to_str().unwrap()).expect("open store");
  let w = store.add_wagon(NewWagon::new("W001").unwrap()).unwrap();
  match store.add_wagon(NewWagon::new("W001").unwrap()) {
    Err(InventoryError::Conflict(_)) => {}
    other => panic!("expected Conflict for duplicated numero, got {:?}", other),
  }
  let z = store.add_zone(NewZone::new(1, w).unwrap()).unwrap();
  store.add_sac(NewSac::new("SAC-001", z).unwrap()).unwrap();
  match store.add_sac(NewSac::new("SAC-001", z).unwrap()) {
    Err(InventoryError::Conflict(_)) => {}
    other => panic!("expected Conflict for duplicated identifiant, got {:?}", other),
  }
  match store.add_zone(NewZone::new(1, 4242).unwrap()) {
    Err(InventoryError::NotFound(_)) => {}
    other => panic!("expected NotFound for missing wagon, got {:?}", other),
  }
  match store.add_piece(NewPiece::new("K1", PieceState::Uninstalled, false, 0, 4242).unwrap()) {
    Err(InventoryError::NotFound(_)) => {}
    other => panic!("expected NotFound for missing sac, got {:?}", other),
  }
  match store.update_piece_state(4242, PieceState::Installed) {
    Err(InventoryError::NotFound(_)) => {}
    other => panic!("expected NotFound for missing piece, got {:?}", other),
  }
  store.close().unwrap();
  cleanup(&path);
}

#[test]
fn deleting_a_wagon_cascades_and_delete_all_empties_everything() {
  let path = temp_db_path();
  let store = open_sqlite(path.to_str().unwrap()).expect("open store");
  let w1 = store.add_wagon(NewWagon::new("W001").unwrap()).unwrap();
  let w2 = store.add_wagon(NewWagon::new("W002").unwrap()).unwrap();
  for (wagon, sac) in [(w1, "SAC-1"), (w2, "SAC-2")] {
    let z = store.add_zone(NewZone::new(1, wagon).unwrap()).unwrap();
    let s = store.add_sac(NewSac::new(sac, z).unwrap()).unwrap();
    store.add_piece(NewPiece::new(&format!("P-{}", sac), PieceState::Uninstalled, true, 0, s).unwrap())
         .unwrap();
  }

  store.delete_wagon(w1).unwrap();
  assert_eq!(store.list_wagons().unwrap().len(), 1);
  assert_eq!(store.list_zones().unwrap().len(), 1);
  let sacs = store.list_sacs().unwrap();
  assert_eq!(sacs.len(), 1);
  assert_eq!(sacs[0].identifiant, "SAC-2");
  let pieces = store.list_pieces().unwrap();
  assert_eq!(pieces.len(), 1);
  assert_eq!(pieces[0].code, "P-SAC-2");

  store.delete_all().unwrap();
  assert!(store.list_wagons().unwrap().is_empty());
  assert!(store.list_zones().unwrap().is_empty());
  assert!(store.list_sacs().unwrap().is_empty());
  assert!(store.list_pieces().unwrap().is_empty());

  // AUTOINCREMENT: un id borrado no se reutiliza.
  let w3 = store.add_wagon(NewWagon::new("W003").unwrap()).unwrap();
  assert!(w3 > w2);
  store.close().unwrap();
  cleanup(&path);
}

#[test]
fn postgres_urls_are_rejected_at_open() {
  let store = DieselInventoryStore::new(StoreConfig::new("postgres://user:pw@localhost/inventory"));
  match store.open() {
    Err(InventoryError::StorageFailure(_)) => {}
    other => panic!("expected StorageFailure, got {:?}", other),
  }
  assert!(!store.is_open());
}

#[test]
fn unreachable_database_is_a_pool_failure() {
  let dir = std::env::temp_dir().join(format!("wagon_missing_{}", Uuid::new_v4()));
  let path = dir.join("inventory.db");
  let store = DieselInventoryStore::new(StoreConfig::new(path.to_str().unwrap()).with_pool_size(1));
  match store.open() {
    Err(InventoryError::StorageFailure(msg)) => assert!(msg.starts_with("pool:"), "unexpected message: {}", msg),
    other => panic!("expected StorageFailure from the pool, got {:?}", other),
  }
  assert!(!store.is_open());
  assert_eq!(store.list_pieces(), Err(InventoryError::NotInitialized));
}

#[test]
fn deleting_a_zone_or_a_sac_cascades_to_descendants() {
  let path = temp_db_path();
  let store = open_sqlite(path.to_str().unwrap()).expect("open store");
  let w = store.add_wagon(NewWagon::new("W001").unwrap()).unwrap();
  let z1 = store.add_zone(NewZone::new(1, w).unwrap()).unwrap();
  let z2 = store.add_zone(NewZone::new(2, w).unwrap()).unwrap();
  let s1 = store.add_sac(NewSac::new("SAC-1", z1).unwrap()).unwrap();
  let s2a = store.add_sac(NewSac::new("SAC-2A", z2).unwrap()).unwrap();
  let s2b = store.add_sac(NewSac::new("SAC-2B", z2).unwrap()).unwrap();
  store.add_piece(NewPiece::new("P1", PieceState::Uninstalled, false, 0, s1).unwrap()).unwrap();
  store.add_piece(NewPiece::new("P2A", PieceState::OnWait, true, 0, s2a).unwrap()).unwrap();
  store.add_piece(NewPiece::new("P2B", PieceState::Installed, false, 1, s2b).unwrap()).unwrap();

  store.delete_zone(z1).unwrap();
  assert!(store.get_sac(s1).unwrap().is_none());
  assert!(store.pieces_by_sac(s1).unwrap().is_empty());
  assert_eq!(store.list_zones().unwrap().len(), 1);
  assert_eq!(store.list_sacs().unwrap().len(), 2);
  assert_eq!(store.list_pieces().unwrap().len(), 2);

  store.delete_sac(s2a).unwrap();
  let sacs: Vec<String> = store.sacs_by_zone(z2).unwrap().into_iter().map(|s| s.identifiant).collect();
  assert_eq!(sacs, vec!["SAC-2B"]);
  let codes: Vec<String> = store.list_pieces().unwrap().into_iter().map(|p| p.code).collect();
  assert_eq!(codes, vec!["P2B"]);
  assert!(store.priority_pieces().unwrap().is_empty());
  assert_eq!(store.list_wagons().unwrap().len(), 1);

  store.close().unwrap();
  cleanup(&path);
}
