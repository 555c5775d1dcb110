//! Application state shared by the concurrent services.
//!
//! `AppState` owns the database path and the session tracker. Services
//! that fan out over several blocking queries open one connection per
//! task via `db_path()`; single-query callers use `open_db()`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::authorization::AuthorizationError;
use crate::db::{self, DatabaseError};
use crate::session::SessionTracker;

/// Errors from services that join concurrent store queries.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("query task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
}

/// Shared application state. Wrapped in `Arc` at startup.
pub struct AppState {
    db_path: PathBuf,
    /// Session tracker. Consumers snapshot it directly to resolve the
    /// viewer's identity and role; the services take the requester id as
    /// an explicit argument.
    pub session: Arc<SessionTracker>,
}

impl AppState {
    pub fn new(db_path: PathBuf, session: Arc<SessionTracker>) -> Self {
        Self { db_path, session }
    }

    /// Open a connection to the clinic database.
    pub fn open_db(&self) -> Result<rusqlite::Connection, DatabaseError> {
        db::open_database(&self.db_path)
    }

    /// Database path (owned copies go to per-task connections).
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
