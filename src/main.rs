use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wagon_domain::{InventoryStore, NewPiece, NewSac, NewWagon, NewZone, PieceState};
use wagon_persistence::DieselInventoryStore;
use wagon_scan::{GridLayout, PlacementGrid, ScanDeduplicator, ScanOutcome, ScanService};

/// Consola del operador sobre el inventario local.
///
/// Opciones soportadas:
/// 1) Escanear (código de pieza o sobre JSON v1)
/// 2) Escanear un sac
/// 3) Piezas prioritarias pendientes
/// 4) Reiniciar una pieza
/// 5) Árbol del inventario y resumen por estado
/// 6) Grilla de colocación de un sac
/// 7) Exportar pendientes prioritarias como JSON
/// 8) Alta manual (wagon, zona, sac o pieza)
/// 9) Borrar todo
/// 0) Salir
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let layout = grid_layout_from_env();
    // Abre el almacén (aplica migraciones embebidas si procede)
    let store = Arc::new(wagon_persistence::new_from_env().map_err(|e| Box::new(e) as Box<dyn Error>)?);
    let service = ScanService::new(store.clone());
    let mut dedup = ScanDeduplicator::new();

    loop {
        println!("\n== Wagon inventory ==");
        println!("1) Escanear (código o sobre JSON)");
        println!("2) Escanear un sac");
        println!("3) Piezas prioritarias pendientes");
        println!("4) Reiniciar una pieza");
        println!("5) Árbol del inventario");
        println!("6) Grilla de un sac");
        println!("7) Exportar pendientes (JSON)");
        println!("8) Alta manual");
        println!("9) Borrar todo");
        println!("0) Salir");
        let choice = prompt("Elige una opción: ")?;
        match choice.trim() {
            "1" => {
                let raw = prompt("Contenido escaneado: ")?;
                if !dedup.accept(raw.trim()) {
                    println!("Mismo contenido que el escaneo anterior, ignorado");
                    continue;
                }
                match service.handle_raw_scan(&raw).await {
                    Ok(ScanOutcome::Piece(info)) => {
                        println!("{}", info);
                        let sac_id = info.sac.id;
                        match service.with_store(move |s| s.pieces_by_sac(sac_id)).await {
                            Ok(pieces) => print!("{}", PlacementGrid::build(layout, &pieces, Some(info.piece.id))),
                            Err(e) => eprintln!("Error leyendo el sac: {}", e),
                        }
                    }
                    Ok(ScanOutcome::Sac(info)) => print_sac(&info, layout),
                    Err(e) => eprintln!("Escaneo rechazado: {}", e),
                }
            }
            "2" => {
                let identifiant = prompt("Identificador del sac: ")?;
                match service.resolve_sac_scan(identifiant.trim()).await {
                    Ok(info) => print_sac(&info, layout),
                    Err(e) => eprintln!("Error escaneando sac: {}", e),
                }
            }
            "3" => match service.priority_pieces_pending().await {
                Ok(pending) if pending.is_empty() => println!("No quedan piezas prioritarias pendientes"),
                Ok(pending) => {
                    println!("\nID    | CÓDIGO       | ESTADO            | UBICACIÓN");
                    println!("-----------------------------------------------------------------");
                    for info in pending {
                        println!("{:<5} | {:<12} | {:<17} | {}/{}/{}",
                                 info.piece.id,
                                 info.piece.code,
                                 info.piece.state.to_string(),
                                 info.wagon.numero,
                                 info.zone.numero,
                                 info.sac.identifiant);
                    }
                }
                Err(e) => eprintln!("Error listando pendientes: {}", e),
            },
            "4" => {
                let id_s = prompt("Id de la pieza a reiniciar: ")?;
                let id = match id_s.trim().parse::<i32>() {
                    Ok(n) => n,
                    Err(_) => {
                        eprintln!("Id inválido");
                        continue;
                    }
                };
                match service.reset_piece_state(id).await {
                    Ok(()) => {
                        // La siguiente lectura de la misma etiqueta debe contar.
                        dedup.reset();
                        println!("Pieza {} reiniciada", id);
                    }
                    Err(e) => eprintln!("Error reiniciando pieza: {}", e),
                }
            }
            "5" => {
                match service.with_store(render_tree).await {
                    Ok(tree) => print!("{}", tree),
                    Err(e) => {
                        eprintln!("Error leyendo el inventario: {}", e);
                        continue;
                    }
                }
                match service.state_summary().await {
                    Ok(summary) => {
                        println!("\nResumen ({} piezas):", summary.total());
                        for state in PieceState::ALL {
                            println!("  {:<17} {}", state.to_string(), summary.count(state));
                        }
                    }
                    Err(e) => eprintln!("Error calculando resumen: {}", e),
                }
            }
            "6" => {
                let identifiant = prompt("Identificador del sac: ")?;
                match service.resolve_sac_scan(identifiant.trim()).await {
                    Ok(info) => {
                        let grid = PlacementGrid::build(layout, &info.pieces, None);
                        println!("Sac {} ({}x{})", info.sac.identifiant, layout.rows(), layout.columns());
                        print!("{}", grid);
                        println!("Instaladas: {:?}", grid.installed_indices());
                        println!("En espera:  {:?}", grid.waiting_indices());
                    }
                    Err(e) => eprintln!("Error leyendo sac: {}", e),
                }
            }
            "7" => match service.priority_pieces_pending().await {
                Ok(pending) => match serde_json::to_string_pretty(&pending) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error serializando: {}", e),
                },
                Err(e) => eprintln!("Error listando pendientes: {}", e),
            },
            "8" => {
                let entry = match read_manual_entry() {
                    Ok(Some(entry)) => entry,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("Entrada inválida: {}", e);
                        continue;
                    }
                };
                match service.with_store(move |s| entry.apply(s)).await {
                    Ok(message) => println!("{}", message),
                    Err(e) => eprintln!("Error en el alta: {}", e),
                }
            }
            "9" => {
                let confirm = prompt("Se borrará todo el inventario. Escribir 'yes' para confirmar: ")?;
                if confirm.trim().to_lowercase() == "yes" {
                    match service.with_store(|s| s.delete_all()).await {
                        Ok(()) => {
                            dedup.reset();
                            println!("Inventario vaciado");
                        }
                        Err(e) => eprintln!("Error vaciando inventario: {}", e),
                    }
                } else {
                    println!("Borrado cancelado");
                }
            }
            "0" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    store.close().map_err(|e| Box::new(e) as Box<dyn Error>)?;
    Ok(())
}

// `RUST_LOG` manda; por defecto `info`. Los registros de `log` de los
// crates del workspace llegan por el puente de tracing-subscriber.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn grid_layout_from_env() -> GridLayout {
    dotenvy::dotenv().ok();
    let read = |key: &str| std::env::var(key).ok().and_then(|v| v.trim().parse::<usize>().ok());
    match (read("WAGON_GRID_ROWS"), read("WAGON_GRID_COLUMNS")) {
        (None, None) => GridLayout::default(),
        (rows, columns) => {
            let default = GridLayout::default();
            GridLayout::new(rows.unwrap_or(default.rows()), columns.unwrap_or(default.columns())).unwrap_or_else(|e| {
                log::warn!("{}; se usa la grilla por defecto", e);
                default
            })
        }
    }
}

fn print_sac(info: &wagon_domain::SacCompleteInfo, layout: GridLayout) {
    println!("{}", info);
    for piece in &info.pieces {
        println!("  {}", piece);
    }
    print!("{}", PlacementGrid::build(layout, &info.pieces, None));
}

fn render_tree(store: &DieselInventoryStore) -> wagon_domain::Result<String> {
    let wagons = store.list_wagons()?;
    if wagons.is_empty() {
        return Ok("Inventario vacío\n".to_string());
    }
    let mut out = String::new();
    for wagon in wagons {
        out.push_str(&format!("Wagon {} (id {})\n", wagon.numero, wagon.id));
        for zone in store.zones_by_wagon(wagon.id)? {
            out.push_str(&format!("  Zona {} (id {})\n", zone.numero, zone.id));
            for sac in store.sacs_by_zone(zone.id)? {
                out.push_str(&format!("    Sac {} (id {})\n", sac.identifiant, sac.id));
                for piece in store.pieces_by_sac(sac.id)? {
                    out.push_str(&format!("      [{}] {}\n", piece.id, piece));
                }
            }
        }
    }
    Ok(out)
}

/// Alta manual ya validada, lista para enviarse al almacén.
enum ManualEntry {
    Wagon(NewWagon),
    Zone(NewZone),
    Sac(NewSac),
    Piece(NewPiece),
}

impl ManualEntry {
    fn apply(self, store: &DieselInventoryStore) -> wagon_domain::Result<String> {
        match self {
            ManualEntry::Wagon(w) => store.add_wagon(w).map(|id| format!("Wagon creado: {}", id)),
            ManualEntry::Zone(z) => store.add_zone(z).map(|id| format!("Zona creada: {}", id)),
            ManualEntry::Sac(s) => store.add_sac(s).map(|id| format!("Sac creado: {}", id)),
            ManualEntry::Piece(p) => store.add_piece(p).map(|id| format!("Pieza creada: {}", id)),
        }
    }
}

// Lee y valida los campos del alta. `None` si el tipo no existe.
fn read_manual_entry() -> Result<Option<ManualEntry>, Box<dyn Error>> {
    let kind = prompt("Tipo (wagon/zona/sac/pieza): ")?;
    let entry = match kind.trim().to_lowercase().as_str() {
        "wagon" => {
            let numero = prompt("Número del wagon: ")?;
            ManualEntry::Wagon(NewWagon::new(&numero)?)
        }
        "zona" | "zone" => {
            let wagon_id = prompt("Id del wagon: ")?.trim().parse::<i32>()?;
            let numero = prompt("Número de zona: ")?.trim().parse::<i32>()?;
            ManualEntry::Zone(NewZone::new(numero, wagon_id)?)
        }
        "sac" => {
            let zone_id = prompt("Id de la zona: ")?.trim().parse::<i32>()?;
            let identifiant = prompt("Identificador del sac: ")?;
            ManualEntry::Sac(NewSac::new(&identifiant, zone_id)?)
        }
        "pieza" | "piece" => {
            let sac_id = prompt("Id del sac: ")?.trim().parse::<i32>()?;
            let code = prompt("Código: ")?;
            let position = prompt("Posición en la grilla: ")?.trim().parse::<i32>()?;
            let prioritaire = prompt("¿Prioritaria? (s/n): ")?.trim().eq_ignore_ascii_case("s");
            let state_s = prompt("Estado inicial (enter para UNINSTALLED): ")?;
            let state = if state_s.trim().is_empty() { PieceState::default() } else { state_s.parse::<PieceState>()? };
            ManualEntry::Piece(NewPiece::new(&code, state, prioritaire, position, sac_id)?)
        }
        other => {
            println!("Tipo desconocido: {}", other);
            return Ok(None);
        }
    };
    Ok(Some(entry))
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
