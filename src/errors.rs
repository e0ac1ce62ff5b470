//! Typed error hierarchy for the Taskboard client.
//!
//! Top-level enums per subsystem:
//! - `LoginError`: OAuth password-grant failures, mapped to user-facing messages
//! - `ApiError`: resource requests after the retry policy has run
//! - `ConfigError`: loading and validating `taskboard.toml`
//! - `StorageError`: durable token storage
//! - `UploadError`: attachment uploads

use std::path::PathBuf;
use thiserror::Error;

/// Generic message shown when the backend body carries nothing usable.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Errors from `AuthClient::login`.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("This account is locked. Contact a workspace administrator.")]
    AccountLocked,

    #[error("Too many login attempts. Please wait a moment and try again.")]
    RateLimited,

    #[error("Login failed. Please try again.")]
    Failed,

    #[error("Login failed. Could not reach the server.")]
    Transport(#[source] reqwest::Error),
}

/// Errors from the HTTP client wrapper.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The refresh-and-retry path could not recover a valid session.
    #[error("Your session has ended. Please log in again.")]
    Unauthorized,

    /// Non-success response; `detail` is the backend's message or a generic fallback.
    #[error("{detail}")]
    Backend { status: u16, detail: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The caller stopped waiting. Permission sources may return this to
    /// signal an abort.
    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid request URL '{0}'")]
    InvalidUrl(String),

    #[error("Could not obtain a CSRF token: {0}")]
    Csrf(String),
}

impl ApiError {
    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::Unauthorized => Some(401),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Errors caused by the caller going away; these are never reported.
    pub fn is_abort(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("No OAuth client id configured. Set TASKBOARD_CLIENT_ID or [oauth] client_id")]
    MissingClientId,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors from durable token storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access token storage at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token storage at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from attachment uploads.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file_name} is {size} bytes; the upload limit is {limit} bytes")]
    TooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_error_messages_are_user_facing() {
        assert_eq!(
            LoginError::InvalidCredentials.to_string(),
            "Invalid username or password."
        );
        assert!(LoginError::AccountLocked.to_string().contains("locked"));
        assert!(LoginError::RateLimited.to_string().contains("Too many"));
        assert_eq!(LoginError::Failed.to_string(), "Login failed. Please try again.");
    }

    #[test]
    fn api_error_backend_displays_detail() {
        let err = ApiError::Backend {
            status: 422,
            detail: "title: This value should not be null.".into(),
        };
        assert_eq!(err.to_string(), "title: This value should not be null.");
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn api_error_unauthorized_reports_401() {
        assert_eq!(ApiError::Unauthorized.status(), Some(401));
        assert!(!ApiError::Unauthorized.is_abort());
    }

    #[test]
    fn api_error_cancelled_is_abort() {
        assert!(ApiError::Cancelled.is_abort());
        assert_eq!(ApiError::Cancelled.status(), None);
    }

    #[test]
    fn api_error_converts_from_serde_json() {
        let json_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err: ApiError = json_err.into();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn upload_error_too_large_carries_sizes() {
        let err = UploadError::TooLarge {
            file_name: "scan.png".into(),
            size: 20,
            limit: 10,
        };
        match &err {
            UploadError::TooLarge { size, limit, .. } => {
                assert_eq!(*size, 20);
                assert_eq!(*limit, 10);
            }
            _ => panic!("Expected TooLarge"),
        }
        assert!(err.to_string().contains("scan.png"));
    }

    #[test]
    fn upload_error_wraps_api_error() {
        let err: UploadError = ApiError::Unauthorized.into();
        assert!(matches!(err, UploadError::Api(ApiError::Unauthorized)));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&LoginError::Failed);
        assert_std_error(&ApiError::Cancelled);
        assert_std_error(&ConfigError::MissingClientId);
        assert_std_error(&UploadError::TooLarge {
            file_name: "a".into(),
            size: 1,
            limit: 0,
        });
    }
}
