//! Session state shared by every request path.
//!
//! [`SessionContext`] is constructed explicitly and handed to the auth flow,
//! the HTTP wrapper and the monitor, so each client (and each test) owns an
//! isolated token store, CSRF cache and event channel.
//!
//! | Module        | Responsibility                                   |
//! |---------------|--------------------------------------------------|
//! | `token_store` | access/refresh tokens, expiry, durable storage   |
//! | `csrf`        | single-flight CSRF token cache                   |
//! | `monitor`     | periodic expiry checks and lifecycle events      |

pub mod csrf;
pub mod monitor;
pub mod token_store;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use csrf::CsrfCache;
pub use monitor::{MonitorSettings, SessionMonitor, TokenHealth};
pub use token_store::{FileStorage, MemoryStorage, TokenStorage, TokenStore};

/// Subscribers that fall this far behind start losing the oldest events.
const EVENT_CAPACITY: usize = 64;

/// Lifecycle notifications pushed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEventKind {
    Expiring,
    Refreshed,
    Expired,
    Error,
}

impl std::fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEventKind::Expiring => write!(f, "expiring"),
            SessionEventKind::Refreshed => write!(f, "refreshed"),
            SessionEventKind::Expired => write!(f, "expired"),
            SessionEventKind::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, message: Option<String>) -> Self {
        Self { kind, message }
    }

    pub fn expiring(message: impl Into<String>) -> Self {
        Self::new(SessionEventKind::Expiring, Some(message.into()))
    }

    pub fn refreshed() -> Self {
        Self::new(SessionEventKind::Refreshed, None)
    }

    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(SessionEventKind::Expired, Some(message.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(SessionEventKind::Error, Some(message.into()))
    }
}

/// Token store, CSRF cache and event channel for one logical session.
#[derive(Debug)]
pub struct SessionContext {
    tokens: TokenStore,
    csrf: CsrfCache,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    pub fn new(storage: Box<dyn TokenStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tokens: TokenStore::new(storage),
            csrf: CsrfCache::new(),
            events,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn csrf(&self) -> &CsrfCache {
        &self.csrf
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        tracing::debug!(kind = %event.kind, message = ?event.message, "session event");
        // No subscribers is fine; events are ephemeral.
        let _ = self.events.send(event);
    }

    /// Forget every credential. Synchronous; no server round-trip.
    pub fn clear(&self) {
        self.tokens.clear();
        self.csrf.invalidate();
    }
}
