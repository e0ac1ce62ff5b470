//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `session`       | `Login`, `Logout`, `Status`, `Refresh`, `Whoami`, `Watch` |
//! | `permissions`   | `Can`, `Permissions`                               |
//! | `cards`         | `Cards`, `Upload`                                  |
//! | `roles`         | `Roles`                                            |
//! | `config`        | `Config`                                           |

pub mod cards;
pub mod config;
pub mod permissions;
pub mod roles;
pub mod session;

pub use cards::{cmd_cards, cmd_upload};
pub use config::cmd_config;
pub use permissions::{cmd_can, cmd_permissions};
pub use roles::cmd_roles;
pub use session::{cmd_login, cmd_logout, cmd_refresh, cmd_status, cmd_watch, cmd_whoami};

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use taskboard::TaskboardClient;
use taskboard::config::Config;
use taskboard::navigation::{LoginRedirect, Navigator};
use taskboard::session::{FileStorage, TokenStore};

use crate::Cli;

const SESSION_FILE: &str = "session.json";

/// Prints where to go next instead of opening a login screen.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_login(&self, reason: LoginRedirect) {
        let hint = match reason {
            LoginRedirect::Unauthorized => "You are not logged in.",
            LoginRedirect::Expired => "Your session has expired.",
        };
        eprintln!(
            "{} Run {} to continue.",
            console::style(hint).yellow(),
            console::style("taskboard login").bold()
        );
    }
}

pub(crate) fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = &cli.base_url {
        config.server.base_url = url.clone();
    }
    Ok(config)
}

fn session_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.state_dir {
        Some(dir) => Ok(dir.join(SESSION_FILE)),
        None => FileStorage::default_path()
            .context("No data directory on this platform; pass --state-dir"),
    }
}

/// Persisted tokens without a client. `logout` and `status` work offline
/// and without an OAuth client id.
pub(crate) fn token_store(cli: &Cli) -> Result<TokenStore> {
    Ok(TokenStore::new(Box::new(FileStorage::new(session_path(cli)?))))
}

pub(crate) fn open_client(cli: &Cli) -> Result<TaskboardClient> {
    let config = load_config(cli)?;
    let storage = FileStorage::new(session_path(cli)?);
    tracing::debug!(path = %storage.path().display(), "using session file");
    let client = TaskboardClient::new(config, Box::new(storage), Arc::new(CliNavigator))?;
    Ok(client)
}

/// Client with a live session, or an error telling the user to log in.
pub(crate) fn open_session(cli: &Cli) -> Result<TaskboardClient> {
    let client = open_client(cli)?;
    if !client.restore() && client.session().tokens().refresh_token().is_none() {
        anyhow::bail!("Not logged in. Run 'taskboard login' first.");
    }
    Ok(client)
}
