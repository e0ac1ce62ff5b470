//! Periodic token-expiry checks.
//!
//! | Token health   | Action                                                |
//! |----------------|-------------------------------------------------------|
//! | `Valid`        | none; clears any earlier warning                      |
//! | `ExpiringSoon` | emit `expiring` with a countdown (unless dismissed)   |
//! | `Expired`      | emit `expired`, wait the grace delay, log out, redirect |
//! | `Missing`      | none                                                  |
//!
//! A `refreshed` event on the session channel resets the warning state at
//! any point. Only one monitor task runs per [`SessionMonitor`].

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::auth::{AuthClient, RefreshOutcome};
use crate::config::Config;
use crate::navigation::{LoginRedirect, Navigator};
use crate::session::{SessionContext, SessionEvent, SessionEventKind, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub check_interval: Duration,
    pub warning_lead: Duration,
    pub expired_grace: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            warning_lead: Duration::from_secs(300),
            expired_grace: Duration::from_secs(3),
        }
    }
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        Self {
            check_interval: config.check_interval(),
            warning_lead: config.warning_lead(),
            expired_grace: config.expired_grace(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenHealth {
    Missing,
    Valid,
    ExpiringSoon { remaining_secs: i64 },
    Expired,
}

/// Classify the stored token against `now`.
pub fn assess(tokens: &TokenStore, now: DateTime<Utc>, warning_lead: Duration) -> TokenHealth {
    if tokens.access_token().is_none() {
        return TokenHealth::Missing;
    }
    let Some(remaining) = tokens.time_remaining(now) else {
        return TokenHealth::Valid;
    };
    let remaining_secs = remaining.num_seconds();
    if remaining_secs <= 0 {
        TokenHealth::Expired
    } else if remaining_secs <= warning_lead.as_secs() as i64 {
        TokenHealth::ExpiringSoon { remaining_secs }
    } else {
        TokenHealth::Valid
    }
}

/// Countdown text for the `expiring` event.
pub fn countdown_message(remaining_secs: i64) -> String {
    if remaining_secs < 60 {
        let s = remaining_secs.max(1);
        format!(
            "Your session expires in {} second{}.",
            s,
            if s == 1 { "" } else { "s" }
        )
    } else {
        let m = (remaining_secs + 59) / 60;
        format!(
            "Your session expires in {} minute{}.",
            m,
            if m == 1 { "" } else { "s" }
        )
    }
}

#[derive(Debug, Default)]
struct WarningState {
    dismissed: bool,
    expired: bool,
}

struct MonitorInner {
    ctx: Arc<SessionContext>,
    auth: Arc<AuthClient>,
    navigator: Arc<dyn Navigator>,
    settings: MonitorSettings,
    state: Mutex<WarningState>,
}

impl MonitorInner {
    fn state(&self) -> MutexGuard<'_, WarningState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&self) {
        *self.state() = WarningState::default();
    }

    /// One inspection. Returns `false` once the session has been ended.
    async fn check(&self) -> bool {
        match assess(self.ctx.tokens(), Utc::now(), self.settings.warning_lead) {
            TokenHealth::Missing => true,
            TokenHealth::Valid => {
                self.reset();
                true
            }
            TokenHealth::ExpiringSoon { remaining_secs } => {
                if !self.state().dismissed {
                    self.ctx
                        .emit(SessionEvent::expiring(countdown_message(remaining_secs)));
                }
                true
            }
            TokenHealth::Expired => {
                {
                    let mut state = self.state();
                    if state.expired {
                        return true;
                    }
                    state.expired = true;
                }
                let expired_token = self.ctx.tokens().access_token();
                self.ctx
                    .emit(SessionEvent::expired("Your session has expired. Please log in again."));
                tokio::time::sleep(self.settings.expired_grace).await;

                // A refresh or re-login during the grace delay replaces the token.
                let health = assess(self.ctx.tokens(), Utc::now(), self.settings.warning_lead);
                if self.ctx.tokens().access_token() != expired_token
                    || health != TokenHealth::Expired
                {
                    tracing::info!("session renewed during expiry grace; keeping it");
                    self.reset();
                    return true;
                }
                self.ctx.clear();
                self.navigator.redirect_to_login(LoginRedirect::Expired);
                tracing::info!("session expired; forced logout");
                false
            }
        }
    }
}

/// Owner of the background monitor task.
pub struct SessionMonitor {
    inner: Arc<MonitorInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionMonitor {
    pub fn new(
        ctx: Arc<SessionContext>,
        auth: Arc<AuthClient>,
        navigator: Arc<dyn Navigator>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                ctx,
                auth,
                navigator,
                settings,
                state: Mutex::new(WarningState::default()),
            }),
            handle: Mutex::new(None),
        }
    }

    fn handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the monitor task. Returns `false` if one is already running.
    pub fn start(&self) -> bool {
        let mut handle = self.handle();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        self.inner.reset();
        let events = self.inner.ctx.subscribe();
        *handle = Some(tokio::spawn(run(self.inner.clone(), events)));
        tracing::debug!("session monitor started");
        true
    }

    pub fn stop(&self) {
        if let Some(handle) = self.handle().take() {
            handle.abort();
            tracing::debug!("session monitor stopped");
        }
        self.inner.reset();
    }

    pub fn is_running(&self) -> bool {
        self.handle().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Run a single inspection immediately.
    pub async fn check_now(&self) -> bool {
        self.inner.check().await
    }

    /// Suppress `expiring` events until the next refresh.
    pub fn dismiss(&self) {
        self.inner.state().dismissed = true;
    }

    /// "Extend session": refresh now. Unexpected failures emit `error`; a
    /// refused refresh also sends the user back to login.
    pub async fn extend(&self) -> bool {
        match self.inner.auth.refresh().await {
            RefreshOutcome::Refreshed(_) => {
                self.inner.reset();
                true
            }
            RefreshOutcome::Failed(_) => false,
            RefreshOutcome::NoRefreshToken | RefreshOutcome::Rejected { .. } => {
                self.inner.ctx.emit(SessionEvent::error(
                    "Your session could not be extended. Please log in again.",
                ));
                self.inner
                    .navigator
                    .redirect_to_login(LoginRedirect::Unauthorized);
                false
            }
        }
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle().take() {
            handle.abort();
        }
    }
}

async fn run(inner: Arc<MonitorInner>, mut events: broadcast::Receiver<SessionEvent>) {
    let mut interval = tokio::time::interval(inner.settings.check_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !inner.check().await {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent { kind: SessionEventKind::Refreshed, .. }) => inner.reset(),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "session monitor lagged behind events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}
