use std::sync::Arc;
use uuid::Uuid;
use wagon_domain::{InventoryError, InventoryStore, NewPiece, NewSac, NewWagon, NewZone, PieceState};
use wagon_persistence::open_sqlite;
use wagon_scan::{ScanOutcome, ScanResolver, ScanService};

#[test]
fn k50_scenario_over_sqlite() {
  let tmp_path = std::env::temp_dir().join(format!("wagon_scan_{}.db", Uuid::new_v4()));
  let db_url = tmp_path.to_str().unwrap().to_string();
  let store = Arc::new(open_sqlite(&db_url).expect("open store"));

  let w = store.add_wagon(NewWagon::new("W001").unwrap()).unwrap();
  let z = store.add_zone(NewZone::new(1, w).unwrap()).unwrap();
  let s = store.add_sac(NewSac::new("SAC-001", z).unwrap()).unwrap();
  store.add_piece(NewPiece::new("K50", PieceState::Uninstalled, true, 0, s).unwrap()).unwrap();

  let resolver = ScanResolver::new(store.clone());
  let info = resolver.resolve_scan("k50").expect("first scan");
  assert_eq!(info.piece.state, PieceState::OnWait);
  assert_eq!(info.sac.identifiant, "SAC-001");
  assert_eq!(info.zone.numero, 1);
  assert_eq!(info.wagon.numero, "W001");
  assert_eq!(resolver.priority_pieces_pending().unwrap().len(), 1);

  let info = resolver.resolve_scan("K50").expect("second scan");
  assert_eq!(info.piece.state, PieceState::Installed);
  assert!(resolver.priority_pieces_pending().unwrap().is_empty());
  assert!(matches!(resolver.resolve_scan("unknown-code"), Err(InventoryError::NotFound(_))));

  // Borrar el wagon se lleva la pieza: el siguiente escaneo ya no la encuentra.
  store.delete_wagon(w).unwrap();
  assert!(resolver.resolve_scan("K50").unwrap_err().is_not_found());

  store.close().unwrap();
  assert_eq!(resolver.state_summary().unwrap_err(), InventoryError::NotInitialized);
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{}", db_url, suffix));
  }
}

#[tokio::test]
async fn async_service_over_sqlite() {
  let tmp_path = std::env::temp_dir().join(format!("wagon_scan_{}.db", Uuid::new_v4()));
  let db_url = tmp_path.to_str().unwrap().to_string();
  let store = Arc::new(open_sqlite(&db_url).expect("open store"));
  let w = store.add_wagon(NewWagon::new("W002").unwrap()).unwrap();
  let z = store.add_zone(NewZone::new(3, w).unwrap()).unwrap();
  let s = store.add_sac(NewSac::new("SAC-777", z).unwrap()).unwrap();
  store.add_piece(NewPiece::new("A1", PieceState::OnWait, false, 4, s).unwrap()).unwrap();

  let service = ScanService::new(store.clone());
  match service.handle_raw_scan(r#"{"v":1,"type":"sac","identifiant":"sac-777"}"#).await.unwrap() {
    ScanOutcome::Sac(info) => {
      assert_eq!(info.zone.numero, 3);
      assert_eq!(info.pieces.len(), 1);
    }
    other => panic!("expected sac outcome, got {:?}", other),
  }
  match service.handle_raw_scan("a1").await.unwrap() {
    ScanOutcome::Piece(info) => assert_eq!(info.piece.state, PieceState::Installed),
    other => panic!("expected piece outcome, got {:?}", other),
  }
  store.close().unwrap();
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{}", db_url, suffix));
  }
}
