mod from_row;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::Result;
use crate::middleware::AdminAuthorizer;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// Shared handles for the request handlers. Constructed once at startup and
/// injected; nothing here is ambient global state.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub admin_auth: Arc<dyn AdminAuthorizer>,
    /// Upper bound on licenses created per generate call
    pub generate_cap: i64,
}

/// Open a connection pool over the SQLite database at `path`.
///
/// Every pooled connection gets WAL mode and a busy timeout so concurrent
/// activations block briefly instead of failing with SQLITE_BUSY.
pub fn create_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))
    });
    Ok(r2d2::Pool::new(manager)?)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS licenses (
            id TEXT PRIMARY KEY,
            license_key TEXT NOT NULL UNIQUE,
            machine_code TEXT,
            license_type TEXT NOT NULL,
            status TEXT NOT NULL,
            activated_at INTEGER,
            expires_at INTEGER,
            created_at INTEGER NOT NULL,
            notes TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_machine_code ON licenses (machine_code);
        CREATE INDEX IF NOT EXISTS idx_licenses_status ON licenses (status, license_type);
        CREATE INDEX IF NOT EXISTS idx_licenses_created_at ON licenses (created_at);",
    )?;
    Ok(())
}
