//! Login redirects on unrecoverable authentication failures.
//!
//! The HTTP wrapper and the session monitor never decide how a login screen
//! is shown; they call a [`Navigator`] with the reason. The CLI prints a
//! hint, tests record the calls.

use std::sync::{Mutex, PoisonError};

/// Why the client is being sent back to the login entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRedirect {
    /// A request stayed unauthorized after the refresh-and-retry path.
    Unauthorized,
    /// The session monitor saw the access token expire.
    Expired,
}

impl LoginRedirect {
    /// Login entry point, carrying the `expired` marker when applicable.
    pub fn login_path(self) -> &'static str {
        match self {
            LoginRedirect::Unauthorized => "/login",
            LoginRedirect::Expired => "/login?expired=1",
        }
    }
}

pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, reason: LoginRedirect);
}

/// Navigator that only logs; used when nothing can be shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self, reason: LoginRedirect) {
        tracing::info!(?reason, path = reason.login_path(), "login required");
    }
}

/// Navigator that remembers every redirect, for assertions.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<LoginRedirect>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<LoginRedirect> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self, reason: LoginRedirect) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reason);
    }
}
