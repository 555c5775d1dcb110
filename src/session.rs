//! Session & identity tracking.
//!
//! Process-wide session state: identity is published synchronously when an
//! auth-state change arrives; role and profile are resolved on a fresh
//! scheduling turn (never inside the event callback itself) and published
//! together with an unconditional clear of the loading flag. Single writer
//! (the tracker), many readers (snapshots).

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use crate::db::{self, repository, DatabaseError};
use crate::models::enums::Role;
use crate::models::Profile;

// ═══════════════════════════════════════════════════════════
// Seams
// ═══════════════════════════════════════════════════════════

/// Identity carried by the external auth subsystem's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth backend error: {0}")]
    Backend(String),
}

/// External authentication subsystem. Auth-state change events are pushed
/// into [`SessionTracker::handle_auth_event`] by whoever owns the client's
/// event stream.
pub trait AuthClient: Send + Sync {
    fn current_session(&self) -> Result<Option<AuthSession>, AuthError>;
    fn sign_out(&self) -> Result<(), AuthError>;
}

/// Role and profile lookups keyed by the authenticated user id.
pub trait IdentityDirectory: Send + Sync {
    fn fetch_role(&self, user_id: &Uuid) -> Result<Option<Role>, DatabaseError>;
    fn fetch_profile(&self, user_id: &Uuid) -> Result<Option<Profile>, DatabaseError>;
}

/// Directory backed by the store.
pub struct StoreDirectory {
    db_path: PathBuf,
}

impl StoreDirectory {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

impl IdentityDirectory for StoreDirectory {
    fn fetch_role(&self, user_id: &Uuid) -> Result<Option<Role>, DatabaseError> {
        let conn = db::open_database(&self.db_path)?;
        repository::get_user_role(&conn, user_id)
    }

    fn fetch_profile(&self, user_id: &Uuid) -> Result<Option<Profile>, DatabaseError> {
        let conn = db::open_database(&self.db_path)?;
        repository::get_profile(&conn, user_id)
    }
}

// ═══════════════════════════════════════════════════════════
// Tracker
// ═══════════════════════════════════════════════════════════

/// Read-only view of the session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub identity: Option<AuthSession>,
    pub role: Option<Role>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl SessionSnapshot {
    fn cleared() -> Self {
        Self {
            identity: None,
            role: None,
            profile: None,
            loading: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session state lock poisoned")]
    LockPoisoned,

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Single-writer session state machine.
///
/// The loading flag starts raised and only ever transitions to cleared:
/// after role/profile resolution, on a null auth event, on sign-out, or
/// when the initial session fetch finds nothing.
pub struct SessionTracker {
    auth: Arc<dyn AuthClient>,
    directory: Arc<dyn IdentityDirectory>,
    state: RwLock<SessionSnapshot>,
    // Advanced by every auth event and sign-out; a deferred resolution
    // publishes only if its epoch is still current.
    epoch: AtomicU64,
}

impl SessionTracker {
    pub fn new(auth: Arc<dyn AuthClient>, directory: Arc<dyn IdentityDirectory>) -> Self {
        Self {
            auth,
            directory,
            state: RwLock::new(SessionSnapshot {
                identity: None,
                role: None,
                profile: None,
                loading: true,
            }),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        Ok(self
            .state
            .read()
            .map_err(|_| SessionError::LockPoisoned)?
            .clone())
    }

    /// One-time startup probe of the auth subsystem. Clears the loading
    /// flag when no session exists; when one does, only the identity is
    /// published — the event-driven path remains the source of truth for
    /// role and profile, so racing it is safe.
    pub fn init(&self) -> Result<(), SessionError> {
        let session = self.auth.current_session()?;
        let mut state = self.state.write().map_err(|_| SessionError::LockPoisoned)?;
        match session {
            Some(session) => state.identity = Some(session),
            None => state.loading = false,
        }
        Ok(())
    }

    /// External auth-state change.
    ///
    /// A live session publishes the identity synchronously and schedules
    /// the role/profile fetch on a fresh scheduling turn; the returned
    /// handle resolves once that publication has happened (or was dropped
    /// as stale). A null session clears everything synchronously. Must be
    /// called within a tokio runtime.
    pub fn handle_auth_event(
        self: &Arc<Self>,
        session: Option<AuthSession>,
    ) -> Result<Option<JoinHandle<()>>, SessionError> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        match session {
            Some(session) => {
                {
                    let mut state =
                        self.state.write().map_err(|_| SessionError::LockPoisoned)?;
                    state.identity = Some(session.clone());
                }

                let tracker = Arc::clone(self);
                Ok(Some(tokio::spawn(async move {
                    tracker.resolve_identity(session.user_id, epoch).await;
                })))
            }
            None => {
                let mut state = self.state.write().map_err(|_| SessionError::LockPoisoned)?;
                *state = SessionSnapshot::cleared();
                Ok(None)
            }
        }
    }

    /// Invokes the external sign-out, then clears all published fields
    /// regardless of that operation's outcome.
    pub fn sign_out(&self) -> Result<(), SessionError> {
        let result = self.auth.sign_out();
        if let Err(e) = &result {
            tracing::warn!("external sign-out failed: {e}");
        }

        self.epoch.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.write().map_err(|_| SessionError::LockPoisoned)?;
            *state = SessionSnapshot::cleared();
        }
        tracing::info!("session cleared");

        result.map_err(SessionError::from)
    }

    /// Deferred half of the event path: fetch role and profile in
    /// parallel, tolerate partial failure, publish, clear loading.
    async fn resolve_identity(&self, user_id: Uuid, epoch: u64) {
        let role_dir = Arc::clone(&self.directory);
        let profile_dir = Arc::clone(&self.directory);

        let (role, profile) = tokio::join!(
            tokio::task::spawn_blocking(move || role_dir.fetch_role(&user_id)),
            tokio::task::spawn_blocking(move || profile_dir.fetch_profile(&user_id)),
        );

        let role = flatten_fetch(role, "role");
        let profile = flatten_fetch(profile, "profile");

        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("dropping stale identity resolution for {user_id}");
            return;
        }

        match self.state.write() {
            Ok(mut state) => {
                state.role = role;
                state.profile = profile;
                state.loading = false;
            }
            Err(_) => tracing::warn!("session state lock poisoned; resolution dropped"),
        }
    }
}

/// Fetch failures are swallowed here: an unresolvable role or profile is a
/// displayable state, not an error.
fn flatten_fetch<T>(
    outcome: Result<Result<Option<T>, DatabaseError>, JoinError>,
    what: &str,
) -> Option<T> {
    match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            tracing::warn!("{what} fetch failed: {e}");
            None
        }
        Err(e) => {
            tracing::warn!("{what} fetch task failed: {e}");
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
