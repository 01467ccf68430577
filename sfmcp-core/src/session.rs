//! Session management
//!
//! The [`SessionManager`] exclusively owns the one authenticated session to
//! the org. Backend calls borrow a snapshot (`Arc<Session>`) per call and
//! never cache it beyond that call.
//!
//! Refresh discipline:
//!
//! - Readers take a shared lock and return the current snapshot when it is
//!   still valid, without blocking each other.
//! - Re-authentication runs behind a single gate. Callers that queue on the
//!   gate re-check the state once they get through, so a burst of callers
//!   after an invalidation produces exactly one login.
//! - A rejected login latches the manager into a failed state. Every later
//!   `acquire()` fails fast until [`SessionManager::reload_credentials`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::config::Credentials;
use crate::error::{BridgeError, BridgeResult};

/// Default lifetime when the login response does not state one
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 7_200;

/// An authenticated session against the org
#[derive(Clone)]
pub struct Session {
    /// Bearer token for REST calls
    pub access_token: String,

    /// Org base URL, e.g. `https://acme.my.salesforce.com`
    pub instance_url: String,

    /// Increments on every successful login
    pub generation: u64,

    /// When the session was obtained
    pub acquired_at: DateTime<Utc>,

    /// When the session stops being usable
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is past its expiry
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Absolute URL for an instance-relative path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.instance_url.trim_end_matches('/'), path)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("instance_url", &self.instance_url)
            .field("generation", &self.generation)
            .field("acquired_at", &self.acquired_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What an authenticator hands back on success
#[derive(Clone)]
pub struct SessionGrant {
    pub access_token: String,
    pub instance_url: String,
    /// Lifetime in seconds, if the org reported one
    pub valid_for_seconds: Option<i64>,
}

impl fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGrant")
            .field("access_token", &"<redacted>")
            .field("instance_url", &self.instance_url)
            .field("valid_for_seconds", &self.valid_for_seconds)
            .finish()
    }
}

/// Authenticator interface
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for a session
    ///
    /// Rejected credentials must surface as
    /// [`BridgeError::Authentication`]; anything else is treated as
    /// recoverable.
    async fn login(&self, credentials: &Credentials) -> BridgeResult<SessionGrant>;
}

enum SessionState {
    Empty,
    Active(Arc<Session>),
    Failed(String),
}

/// Owns the org session and its refresh logic
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    credentials: RwLock<Credentials>,
    state: RwLock<SessionState>,
    refresh_gate: Mutex<()>,
    generation: AtomicU64,
}

impl SessionManager {
    /// Create a manager; no login happens until the first `acquire()`
    pub fn new(authenticator: Arc<dyn Authenticator>, credentials: Credentials) -> Self {
        Self {
            authenticator,
            credentials: RwLock::new(credentials),
            state: RwLock::new(SessionState::Empty),
            refresh_gate: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Return a valid session, logging in if there is none
    pub async fn acquire(&self) -> BridgeResult<Arc<Session>> {
        if let Some(result) = self.current_or_failed().await {
            return result;
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we queued
        if let Some(result) = self.current_or_failed().await {
            return result;
        }

        let credentials = self.credentials.read().await.clone();
        tracing::debug!(username = %credentials.username, "Authenticating with org");

        match self.authenticator.login(&credentials).await {
            Ok(grant) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let acquired_at = Utc::now();
                let session = Arc::new(Session {
                    expires_at: session_expiry(acquired_at, grant.valid_for_seconds),
                    access_token: grant.access_token,
                    instance_url: grant.instance_url,
                    generation,
                    acquired_at,
                });

                *self.state.write().await = SessionState::Active(Arc::clone(&session));

                tracing::info!(
                    instance_url = %session.instance_url,
                    generation,
                    "Org session established"
                );
                Ok(session)
            }
            Err(BridgeError::Authentication { reason }) => {
                tracing::error!(reason = %reason, "Org rejected credentials");
                *self.state.write().await = SessionState::Failed(reason.clone());
                Err(BridgeError::Authentication { reason })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login attempt failed");
                Err(e)
            }
        }
    }

    async fn current_or_failed(&self) -> Option<BridgeResult<Arc<Session>>> {
        let state = self.state.read().await;
        match &*state {
            SessionState::Active(session) if !session.is_expired() => Some(Ok(Arc::clone(session))),
            SessionState::Failed(reason) => Some(Err(BridgeError::authentication(reason.clone()))),
            _ => None,
        }
    }

    /// Drop the current session; the next `acquire()` logs in again
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        if let SessionState::Active(_) = &*state {
            tracing::debug!("Session invalidated");
            *state = SessionState::Empty;
        }
    }

    /// Drop the current session only if it is still `generation`
    ///
    /// Returns true if the session was dropped. Requests that fail on the
    /// same stale session call this with the same generation, and only the
    /// first one has an effect.
    pub async fn invalidate_generation(&self, generation: u64) -> bool {
        let mut state = self.state.write().await;
        match &*state {
            SessionState::Active(session) if session.generation == generation => {
                tracing::debug!(generation, "Session rejected by org, invalidating");
                *state = SessionState::Empty;
                true
            }
            _ => false,
        }
    }

    /// Latch the failed state after the org refused a session it just
    /// issued; only [`SessionManager::reload_credentials`] clears it
    pub async fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(reason = %reason, "Session unusable, latching failed state");
        *self.state.write().await = SessionState::Failed(reason);
    }

    /// Replace credentials and clear any failed state
    pub async fn reload_credentials(&self, credentials: Credentials) {
        let _gate = self.refresh_gate.lock().await;
        *self.credentials.write().await = credentials;
        *self.state.write().await = SessionState::Empty;
        tracing::info!("Credentials reloaded");
    }

    /// Current session snapshot without triggering a login
    pub async fn current(&self) -> Option<Arc<Session>> {
        match &*self.state.read().await {
            SessionState::Active(session) => Some(Arc::clone(session)),
            _ => None,
        }
    }

    /// Whether a login has been rejected and not yet cleared
    pub async fn is_failed(&self) -> bool {
        matches!(&*self.state.read().await, SessionState::Failed(_))
    }
}

/// Expiry for a grant; negative lifetimes are already expired and
/// lifetimes past the calendar range fall back to the default
fn session_expiry(acquired_at: DateTime<Utc>, valid_for_seconds: Option<i64>) -> DateTime<Utc> {
    let ttl = valid_for_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECONDS).max(0);
    TimeDelta::try_seconds(ttl)
        .and_then(|ttl| acquired_at.checked_add_signed(ttl))
        .or_else(|| acquired_at.checked_add_signed(TimeDelta::seconds(DEFAULT_SESSION_TTL_SECONDS)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
