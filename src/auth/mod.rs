//! Login, refresh and logout against the OAuth2 token endpoint.
//!
//! ```text
//! login(username, password) ──► POST /oauth/token (grant_type=password)
//!                                  │ 2xx → TokenStore::set_tokens
//!                                  │ 4xx → LoginError taxonomy
//!
//! refresh_access_token() ─────► POST /oauth/token (grant_type=refresh_token)
//!                                  │ 2xx → store tokens, emit `refreshed`
//!                                  │ else → clear tokens, return None
//! ```
//!
//! Refreshes are serialized behind a gate: when several requests hit a 401
//! at once, the first one refreshes and the rest reuse its token.

pub mod grants;

use chrono::Utc;
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::errors::{ConfigError, LoginError};
use crate::session::{SessionContext, SessionEvent};

pub use grants::{ClientCredentials, OAuthErrorBody, TokenResponse, classify_login_failure};

const TOKEN_PATH: &str = "oauth/token";

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New access token stored.
    Refreshed(String),
    /// Nothing to refresh with; no request was made.
    NoRefreshToken,
    /// The server refused the refresh token. Tokens were cleared.
    Rejected { status: u16 },
    /// The request never produced a usable answer. Tokens were cleared.
    Failed(String),
}

impl RefreshOutcome {
    pub fn token(self) -> Option<String> {
        match self {
            RefreshOutcome::Refreshed(token) => Some(token),
            _ => None,
        }
    }
}

/// OAuth2 client bound to one [`SessionContext`].
pub struct AuthClient {
    http: reqwest::Client,
    token_url: Url,
    credentials: ClientCredentials,
    ctx: Arc<SessionContext>,
    refresh_gate: Mutex<()>,
}

impl AuthClient {
    pub fn new(
        http: reqwest::Client,
        config: &Config,
        ctx: Arc<SessionContext>,
    ) -> Result<Self, ConfigError> {
        let base = config.base_url()?;
        let token_url = base
            .join(TOKEN_PATH)
            .map_err(|e| ConfigError::InvalidBaseUrl {
                url: base.to_string(),
                message: e.to_string(),
            })?;
        let credentials = ClientCredentials {
            client_id: config.client_id()?.to_string(),
            client_secret: config.oauth.client_secret.clone(),
            scope: config.oauth.scope.clone(),
        };
        Ok(Self {
            http,
            token_url,
            credentials,
            ctx,
            refresh_gate: Mutex::new(()),
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Exchange credentials for tokens via the `password` grant.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), LoginError> {
        let resp = self
            .http
            .post(self.token_url.clone())
            .header("Accept", "application/json")
            .form(&self.credentials.password_form(username, password))
            .send()
            .await
            .map_err(LoginError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = classify_login_failure(status.as_u16(), &body);
            tracing::info!(status = status.as_u16(), error = %err, "login rejected");
            return Err(err);
        }

        let tokens: TokenResponse = resp.json().await.map_err(|e| {
            tracing::warn!(error = %e, "unparsable token response");
            LoginError::Failed
        })?;
        self.ctx.tokens().set_tokens(&tokens, Utc::now());
        self.ctx.csrf().invalidate();
        tracing::info!(username, "logged in");
        Ok(())
    }

    /// Refresh the access token. Never fails: any problem clears the stored
    /// tokens and yields `None`.
    pub async fn refresh_access_token(&self) -> Option<String> {
        self.refresh().await.token()
    }

    /// Refresh with the full outcome, for callers that report failures.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.ctx.tokens().refresh_token() else {
            tracing::debug!("no refresh token stored; skipping refresh");
            return RefreshOutcome::NoRefreshToken;
        };

        let sent = self
            .http
            .post(self.token_url.clone())
            .header("Accept", "application/json")
            .form(&self.credentials.refresh_form(&refresh_token))
            .send()
            .await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "token refresh request failed");
                self.ctx.tokens().clear();
                self.ctx
                    .emit(SessionEvent::error("Could not reach the server to refresh your session."));
                return RefreshOutcome::Failed(e.to_string());
            }
        };

        let status = resp.status();
        if !status.is_success() {
            tracing::info!(status = status.as_u16(), "refresh token rejected; logging out");
            self.ctx.tokens().clear();
            return RefreshOutcome::Rejected {
                status: status.as_u16(),
            };
        }

        match resp.json::<TokenResponse>().await {
            Ok(tokens) => {
                self.ctx.tokens().set_tokens(&tokens, Utc::now());
                self.ctx.emit(SessionEvent::refreshed());
                tracing::debug!("access token refreshed");
                RefreshOutcome::Refreshed(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparsable refresh response");
                self.ctx.tokens().clear();
                self.ctx
                    .emit(SessionEvent::error("The server sent an unexpected refresh response."));
                RefreshOutcome::Failed(e.to_string())
            }
        }
    }

    /// Refresh on behalf of a request that was sent with `stale`. If another
    /// caller already replaced that token while this one waited at the gate,
    /// the replacement is returned without a second refresh.
    pub async fn refresh_after(&self, stale: Option<&str>) -> Option<String> {
        let _gate = self.refresh_gate.lock().await;
        if let Some(current) = self.ctx.tokens().access_token()
            && Some(current.as_str()) != stale
        {
            tracing::debug!("token already refreshed by a concurrent request");
            return Some(current);
        }
        self.refresh_access_token().await
    }

    /// Clear tokens and the CSRF cache.
    pub fn logout(&self) {
        self.ctx.clear();
        tracing::info!("logged out");
    }
}
