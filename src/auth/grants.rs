//! OAuth2 token endpoint payloads.

use serde::{Deserialize, Serialize};

use crate::errors::LoginError;

/// Successful response from `POST /oauth/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds from issuance
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Error body from the token endpoint. The backend mixes the RFC 6749
/// fields with its own `message`/`hint`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl OAuthErrorBody {
    fn mentions(&self, needle: &str) -> bool {
        [&self.error_description, &self.message, &self.hint]
            .into_iter()
            .flatten()
            .any(|text| text.to_lowercase().contains(needle))
    }
}

/// Form fields shared by both grants.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
}

impl ClientCredentials {
    fn base_form(&self, grant_type: &str) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", grant_type.to_string()),
            ("client_id", self.client_id.clone()),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.clone()));
        }
        form
    }

    pub fn password_form(&self, username: &str, password: &str) -> Vec<(&'static str, String)> {
        let mut form = self.base_form("password");
        form.push(("username", username.to_string()));
        form.push(("password", password.to_string()));
        form
    }

    pub fn refresh_form(&self, refresh_token: &str) -> Vec<(&'static str, String)> {
        let mut form = self.base_form("refresh_token");
        form.push(("refresh_token", refresh_token.to_string()));
        form
    }
}

/// Map a failed password grant onto the user-facing taxonomy.
///
/// Status codes win over body contents: 429 is always rate limiting and 403
/// always a locked account. Otherwise `invalid_grant` (or a body mentioning
/// a blocked account) decides; anything unrecognised is a generic failure.
pub fn classify_login_failure(status: u16, body: &str) -> LoginError {
    match status {
        429 => return LoginError::RateLimited,
        403 => return LoginError::AccountLocked,
        _ => {}
    }

    let Ok(parsed) = serde_json::from_str::<OAuthErrorBody>(body) else {
        return LoginError::Failed;
    };

    if parsed.mentions("blocked") || parsed.mentions("locked") {
        return LoginError::AccountLocked;
    }
    match parsed.error.as_deref() {
        Some("invalid_grant") | Some("invalid_credentials") => LoginError::InvalidCredentials,
        _ => LoginError::Failed,
    }
}
