pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, LedgerStore, MemoryStore, PgLedgerStore};
pub use error::{ReconcileError, ReconcileResult};
pub use service::{AutoReconcileRequest, ReconcileService};
