mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::crypto::MasterKey;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Master key for credential envelope encryption
    pub master_key: MasterKey,
    /// Base URL for provider return/notify URLs (e.g. https://api.example.com)
    pub base_url: String,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    // WAL lets concurrent webhook handlers write without tripping over each
    // other; the busy timeout covers the remaining lock contention window.
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        Ok(())
    });
    Pool::builder().max_size(10).build(manager)
}
