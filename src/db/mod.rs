mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::ReconcileConfig;
use crate::gateway::Gateway;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by handlers and background jobs
#[derive(Clone)]
pub struct AppState {
    /// Access codes, orders and the reconciliation log
    pub db: DbPool,
    /// Payment gateway (real HTTP client in production, fakes in tests)
    pub gateway: Arc<dyn Gateway>,
    pub reconcile: ReconcileConfig,
    /// Bearer key accepted on operator endpoints (None = operator endpoints disabled)
    pub operator_api_key: Option<String>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    // WAL keeps scanner writes from blocking request-path reads
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
    });
    Pool::builder().max_size(10).build(manager)
}
