use crate::config::StoreConfig;
use crate::schema;
use crate::schema::pieces::dsl as pieces_dsl;
use crate::schema::sacs::dsl as sacs_dsl;
use crate::schema::wagons::dsl as wagons_dsl;
use crate::schema::zones::dsl as zones_dsl;
use chrono::{NaiveDateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::RwLock;
use std::time::Duration;
use wagon_domain::{InventoryError, InventoryStore, NewPiece, NewSac, NewWagon, NewZone, Piece, PieceId, PieceState,
                   Result, Sac, SacId, Wagon, WagonId, Zone, ZoneId};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;
// Espera máxima por una conexión (también al abrir el pool).
const POOL_TIMEOUT: Duration = Duration::from_secs(5);

diesel::define_sql_function! {
  fn last_insert_rowid() -> diesel::sql_types::Integer;
}

/// Pragmas por conexión. SQLite sólo aplica `ON DELETE CASCADE` con
/// `foreign_keys` activo y el valor no persiste entre conexiones.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
    conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        .map_err(diesel::r2d2::Error::QueryError)
  }
}

/// Almacén Diesel/SQLite que implementa `InventoryStore`.
///
/// Se crea cerrado: `open()` construye el pool, aplica las migraciones
/// embebidas y habilita las operaciones; `close()` suelta el pool. Fuera de
/// esa ventana toda operación devuelve `NotInitialized`.
pub struct DieselInventoryStore {
  config: StoreConfig,
  pool: RwLock<Option<DbPool>>,
}

impl DieselInventoryStore {
  pub fn new(config: StoreConfig) -> Self {
    Self { config, pool: RwLock::new(None) }
  }

  pub fn config(&self) -> &StoreConfig {
    &self.config
  }

  /// Abre la conexión. Llamarlo con el almacén ya abierto no hace nada.
  pub fn open(&self) -> Result<()> {
    self.config.validate()?;
    let mut guard = self.pool
                        .write()
                        .map_err(|e| InventoryError::storage(format!("RwLock 'pool' poisoned: {}", e)))?;
    if guard.is_some() {
      return Ok(());
    }
    let pool = self.build_pool().map_err(pool_err)?;
    let mut conn = conn_raw(&pool).map_err(pool_err)?;
    if let Err(e) = conn.batch_execute("PRAGMA journal_mode = WAL;") {
      log::warn!("no se pudo activar WAL en {}: {}", self.config.database_url, e);
    }
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| InventoryError::storage(format!("migraciones: {}", e)))?;
    drop(conn);
    *guard = Some(pool);
    log::info!("almacén abierto en {} (pool {})", self.config.database_url, self.config.pool_size);
    Ok(())
  }

  /// Cierra la conexión. Las conexiones del pool se liberan al soltarlo.
  pub fn close(&self) -> Result<()> {
    let mut guard = self.pool
                        .write()
                        .map_err(|e| InventoryError::storage(format!("RwLock 'pool' poisoned: {}", e)))?;
    if guard.take().is_some() {
      log::info!("almacén cerrado ({})", self.config.database_url);
    }
    Ok(())
  }

  pub fn is_open(&self) -> bool {
    self.pool.read().map(|g| g.is_some()).unwrap_or(false)
  }

  fn conn(&self) -> Result<DbConn> {
    let guard = self.pool
                    .read()
                    .map_err(|e| InventoryError::storage(format!("RwLock 'pool' poisoned: {}", e)))?;
    let pool = guard.as_ref().ok_or(InventoryError::NotInitialized)?;
    conn_raw(pool).map_err(pool_err)
  }

  fn build_pool(&self) -> std::result::Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<SqliteConnection>::new(self.config.database_url.as_str());
    Pool::builder().max_size(self.config.pool_size)
                   .connection_timeout(POOL_TIMEOUT)
                   .connection_customizer(Box::new(SqlitePragmas))
                   .build(manager)
  }
}

fn conn_raw(pool: &DbPool) -> std::result::Result<DbConn, r2d2::Error> {
  pool.get()
}

fn pool_err(e: r2d2::Error) -> InventoryError {
  InventoryError::storage(format!("pool: {}", e))
}

// Diesel row structs for the inventory tables
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::wagons)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct WagonRow {
  pub id: i32,
  pub numero: String,
  pub created_at: NaiveDateTime,
}
#[derive(Debug, Insertable)]
#[diesel(table_name = schema::wagons)]
struct NewWagonRow<'a> {
  pub numero: &'a str,
  pub created_at: NaiveDateTime,
}
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::zones)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct ZoneRow {
  pub id: i32,
  pub numero: i32,
  pub wagon_id: i32,
  pub created_at: NaiveDateTime,
}
#[derive(Debug, Insertable)]
#[diesel(table_name = schema::zones)]
struct NewZoneRow {
  pub numero: i32,
  pub wagon_id: i32,
  pub created_at: NaiveDateTime,
}
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::sacs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct SacRow {
  pub id: i32,
  pub identifiant: String,
  pub zone_id: i32,
  pub created_at: NaiveDateTime,
}
#[derive(Debug, Insertable)]
#[diesel(table_name = schema::sacs)]
struct NewSacRow<'a> {
  pub identifiant: &'a str,
  pub zone_id: i32,
  pub created_at: NaiveDateTime,
}
#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = schema::pieces)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct PieceRow {
  pub id: i32,
  pub code: String,
  pub etat: i32,
  pub prioritaire: bool,
  pub position_index: i32,
  pub sac_id: i32,
  pub created_at: NaiveDateTime,
}
#[derive(Debug, Insertable)]
#[diesel(table_name = schema::pieces)]
struct NewPieceRow<'a> {
  pub code: &'a str,
  pub etat: i32,
  pub prioritaire: bool,
  pub position_index: i32,
  pub sac_id: i32,
  pub created_at: NaiveDateTime,
}

impl From<WagonRow> for Wagon {
  fn from(r: WagonRow) -> Self {
    Wagon { id: r.id, numero: r.numero, created_at: r.created_at.and_utc() }
  }
}
impl From<ZoneRow> for Zone {
  fn from(r: ZoneRow) -> Self {
    Zone { id: r.id, numero: r.numero, wagon_id: r.wagon_id, created_at: r.created_at.and_utc() }
  }
}
impl From<SacRow> for Sac {
  fn from(r: SacRow) -> Self {
    Sac { id: r.id, identifiant: r.identifiant, zone_id: r.zone_id, created_at: r.created_at.and_utc() }
  }
}
impl TryFrom<PieceRow> for Piece {
  type Error = InventoryError;

  fn try_from(r: PieceRow) -> Result<Self> {
    Ok(Piece { id: r.id,
               code: r.code,
               state: PieceState::from_code(r.etat)?,
               prioritaire: r.prioritaire,
               position_index: r.position_index,
               sac_id: r.sac_id,
               created_at: r.created_at.and_utc() })
  }
}

fn map_db_err(e: DieselError) -> InventoryError {
  match e {
    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
      InventoryError::Conflict(info.message().to_string())
    }
    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
      InventoryError::not_found(format!("entidad padre inexistente ({})", info.message()))
    }
    other => InventoryError::storage(format!("db: {}", other)),
  }
}

fn pieces_from_rows(rows: Vec<PieceRow>) -> Result<Vec<Piece>> {
  rows.into_iter().map(Piece::try_from).collect()
}

fn now() -> NaiveDateTime {
  Utc::now().naive_utc()
}

/// Inserta y recupera el id generado en la misma conexión y transacción.
fn insert_with_id<F>(conn: &mut DbConn, insert: F) -> Result<i32>
  where F: FnOnce(&mut DbConn) -> QueryResult<usize>
{
  conn.transaction::<_, DieselError, _>(|c| {
        insert(c)?;
        diesel::select(last_insert_rowid()).get_result::<i32>(c)
      })
      .map_err(map_db_err)
}

impl InventoryStore for DieselInventoryStore {
  fn add_wagon(&self, wagon: NewWagon) -> Result<WagonId> {
    let mut conn = self.conn()?;
    let row = NewWagonRow { numero: wagon.numero(), created_at: now() };
    let id = insert_with_id(&mut conn, |c| diesel::insert_into(schema::wagons::table).values(&row).execute(c))?;
    log::debug!("wagon {} creado con id {}", wagon.numero(), id);
    Ok(id)
  }
  fn list_wagons(&self) -> Result<Vec<Wagon>> {
    let mut conn = self.conn()?;
    let rows = wagons_dsl::wagons.order((wagons_dsl::numero.asc(), wagons_dsl::id.asc()))
                                 .select(WagonRow::as_select())
                                 .load::<WagonRow>(&mut conn)
                                 .map_err(map_db_err)?;
    Ok(rows.into_iter().map(Wagon::from).collect())
  }
  fn get_wagon(&self, id: WagonId) -> Result<Option<Wagon>> {
    let mut conn = self.conn()?;
    let opt = wagons_dsl::wagons.find(id)
                                .select(WagonRow::as_select())
                                .first::<WagonRow>(&mut conn)
                                .optional()
                                .map_err(map_db_err)?;
    Ok(opt.map(Wagon::from))
  }
  fn delete_wagon(&self, id: WagonId) -> Result<()> {
    let mut conn = self.conn()?;
    let n = diesel::delete(wagons_dsl::wagons.find(id)).execute(&mut conn).map_err(map_db_err)?;
    log::debug!("delete wagon {}: {} fila(s), descendientes en cascada", id, n);
    Ok(())
  }

  fn add_zone(&self, zone: NewZone) -> Result<ZoneId> {
    let mut conn = self.conn()?;
    let row = NewZoneRow { numero: zone.numero(), wagon_id: zone.wagon_id(), created_at: now() };
    let id = insert_with_id(&mut conn, |c| diesel::insert_into(schema::zones::table).values(&row).execute(c))?;
    log::debug!("zona {} del wagon {} creada con id {}", zone.numero(), zone.wagon_id(), id);
    Ok(id)
  }
  fn list_zones(&self) -> Result<Vec<Zone>> {
    let mut conn = self.conn()?;
    let rows = zones_dsl::zones.order((zones_dsl::wagon_id.asc(), zones_dsl::numero.asc(), zones_dsl::id.asc()))
                               .select(ZoneRow::as_select())
                               .load::<ZoneRow>(&mut conn)
                               .map_err(map_db_err)?;
    Ok(rows.into_iter().map(Zone::from).collect())
  }
  fn get_zone(&self, id: ZoneId) -> Result<Option<Zone>> {
    let mut conn = self.conn()?;
    let opt = zones_dsl::zones.find(id)
                              .select(ZoneRow::as_select())
                              .first::<ZoneRow>(&mut conn)
                              .optional()
                              .map_err(map_db_err)?;
    Ok(opt.map(Zone::from))
  }
  fn zones_by_wagon(&self, wagon_id: WagonId) -> Result<Vec<Zone>> {
    let mut conn = self.conn()?;
    let rows = zones_dsl::zones.filter(zones_dsl::wagon_id.eq(wagon_id))
                               .order((zones_dsl::numero.asc(), zones_dsl::id.asc()))
                               .select(ZoneRow::as_select())
                               .load::<ZoneRow>(&mut conn)
                               .map_err(map_db_err)?;
    Ok(rows.into_iter().map(Zone::from).collect())
  }
  fn delete_zone(&self, id: ZoneId) -> Result<()> {
    let mut conn = self.conn()?;
    diesel::delete(zones_dsl::zones.find(id)).execute(&mut conn).map_err(map_db_err)?;
    Ok(())
  }

  fn add_sac(&self, sac: NewSac) -> Result<SacId> {
    let mut conn = self.conn()?;
    let row = NewSacRow { identifiant: sac.identifiant(), zone_id: sac.zone_id(), created_at: now() };
    let id = insert_with_id(&mut conn, |c| diesel::insert_into(schema::sacs::table).values(&row).execute(c))?;
    log::debug!("sac {} creado con id {}", sac.identifiant(), id);
    Ok(id)
  }
  fn list_sacs(&self) -> Result<Vec<Sac>> {
    let mut conn = self.conn()?;
    let rows = sacs_dsl::sacs.order((sacs_dsl::identifiant.asc(), sacs_dsl::id.asc()))
                             .select(SacRow::as_select())
                             .load::<SacRow>(&mut conn)
                             .map_err(map_db_err)?;
    Ok(rows.into_iter().map(Sac::from).collect())
  }
  fn get_sac(&self, id: SacId) -> Result<Option<Sac>> {
    let mut conn = self.conn()?;
    let opt = sacs_dsl::sacs.find(id)
                            .select(SacRow::as_select())
                            .first::<SacRow>(&mut conn)
                            .optional()
                            .map_err(map_db_err)?;
    Ok(opt.map(Sac::from))
  }
  fn sacs_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Sac>> {
    let mut conn = self.conn()?;
    let rows = sacs_dsl::sacs.filter(sacs_dsl::zone_id.eq(zone_id))
                             .order((sacs_dsl::identifiant.asc(), sacs_dsl::id.asc()))
                             .select(SacRow::as_select())
                             .load::<SacRow>(&mut conn)
                             .map_err(map_db_err)?;
    Ok(rows.into_iter().map(Sac::from).collect())
  }
  fn delete_sac(&self, id: SacId) -> Result<()> {
    let mut conn = self.conn()?;
    diesel::delete(sacs_dsl::sacs.find(id)).execute(&mut conn).map_err(map_db_err)?;
    Ok(())
  }

  fn add_piece(&self, piece: NewPiece) -> Result<PieceId> {
    let mut conn = self.conn()?;
    let row = NewPieceRow { code: piece.code(),
                            etat: piece.state().code(),
                            prioritaire: piece.prioritaire(),
                            position_index: piece.position_index(),
                            sac_id: piece.sac_id(),
                            created_at: now() };
    let id = insert_with_id(&mut conn, |c| diesel::insert_into(schema::pieces::table).values(&row).execute(c))?;
    log::debug!("pieza {} creada con id {} en sac {}", piece.code(), id, piece.sac_id());
    Ok(id)
  }
  fn list_pieces(&self) -> Result<Vec<Piece>> {
    let mut conn = self.conn()?;
    let rows = pieces_dsl::pieces.order((pieces_dsl::position_index.asc(), pieces_dsl::id.asc()))
                                 .select(PieceRow::as_select())
                                 .load::<PieceRow>(&mut conn)
                                 .map_err(map_db_err)?;
    pieces_from_rows(rows)
  }
  fn get_piece(&self, id: PieceId) -> Result<Option<Piece>> {
    let mut conn = self.conn()?;
    let opt = pieces_dsl::pieces.find(id)
                                .select(PieceRow::as_select())
                                .first::<PieceRow>(&mut conn)
                                .optional()
                                .map_err(map_db_err)?;
    opt.map(Piece::try_from).transpose()
  }
  fn pieces_by_sac(&self, sac_id: SacId) -> Result<Vec<Piece>> {
    let mut conn = self.conn()?;
    let rows = pieces_dsl::pieces.filter(pieces_dsl::sac_id.eq(sac_id))
                                 .order((pieces_dsl::position_index.asc(), pieces_dsl::id.asc()))
                                 .select(PieceRow::as_select())
                                 .load::<PieceRow>(&mut conn)
                                 .map_err(map_db_err)?;
    pieces_from_rows(rows)
  }
  fn priority_pieces(&self) -> Result<Vec<Piece>> {
    let mut conn = self.conn()?;
    let rows = pieces_dsl::pieces.filter(pieces_dsl::prioritaire.eq(true))
                                 .order((pieces_dsl::position_index.asc(), pieces_dsl::id.asc()))
                                 .select(PieceRow::as_select())
                                 .load::<PieceRow>(&mut conn)
                                 .map_err(map_db_err)?;
    pieces_from_rows(rows)
  }
  fn update_piece_state(&self, id: PieceId, state: PieceState) -> Result<()> {
    let mut conn = self.conn()?;
    let n = diesel::update(pieces_dsl::pieces.find(id)).set(pieces_dsl::etat.eq(state.code()))
                                                       .execute(&mut conn)
                                                       .map_err(map_db_err)?;
    if n == 0 {
      return Err(InventoryError::not_found(format!("pieza {}", id)));
    }
    log::info!("pieza {} → {}", id, state);
    Ok(())
  }
  fn delete_piece(&self, id: PieceId) -> Result<()> {
    let mut conn = self.conn()?;
    diesel::delete(pieces_dsl::pieces.find(id)).execute(&mut conn).map_err(map_db_err)?;
    Ok(())
  }

  fn delete_all(&self) -> Result<()> {
    // La cascada sólo se dispara al borrar padres concretos; un vaciado
    // completo se hace explícitamente de hijo a padre.
    let mut conn = self.conn()?;
    conn.transaction::<_, DieselError, _>(|c| {
          diesel::delete(pieces_dsl::pieces).execute(c)?;
          diesel::delete(sacs_dsl::sacs).execute(c)?;
          diesel::delete(zones_dsl::zones).execute(c)?;
          diesel::delete(wagons_dsl::wagons).execute(c)?;
          Ok(())
        })
        .map_err(map_db_err)?;
    log::info!("inventario vaciado ({})", self.config.database_url);
    Ok(())
  }
}

/// Crea y abre el almacén con la configuración del entorno.
pub fn new_from_env() -> Result<DieselInventoryStore> {
  let store = DieselInventoryStore::new(StoreConfig::from_env()?);
  store.open()?;
  Ok(store)
}

/// Abre un almacén SQLite en la ruta indicada (pruebas y herramientas).
pub fn open_sqlite(database_url: &str) -> Result<DieselInventoryStore> {
  let store = DieselInventoryStore::new(StoreConfig::new(database_url));
  store.open()?;
  Ok(store)
}
