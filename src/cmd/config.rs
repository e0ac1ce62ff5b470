//! Configuration view and validation commands: `taskboard config`.

use anyhow::Result;

use taskboard::config::Config;

use super::load_config;
use crate::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let source = cli.config.clone().or_else(Config::default_path);

    match command {
        None | Some(ConfigCommands::Show) => {
            let config = load_config(cli)?;

            println!();
            println!("Taskboard Configuration");
            println!("=======================");
            println!();
            match &source {
                Some(path) if path.exists() => println!("Config file: {}", path.display()),
                _ => println!("No config file found. Showing defaults plus environment."),
            }
            println!();

            println!("[server]");
            println!("  base_url = \"{}\"", config.server.base_url);
            println!("  jsonapi_path = \"{}\"", config.server.jsonapi_path);
            if let Some(timeout) = config.server.request_timeout_secs {
                println!("  request_timeout_secs = {}", timeout);
            }
            println!();

            println!("[oauth]");
            match &config.oauth.client_id {
                Some(id) => println!("  client_id = \"{}\"", id),
                None => println!("  client_id = (not set)"),
            }
            if config.oauth.client_secret.is_some() {
                println!("  client_secret = (set)");
            }
            if let Some(scope) = &config.oauth.scope {
                println!("  scope = \"{}\"", scope);
            }
            println!();

            println!("[session]");
            println!("  check_interval_secs = {}", config.session.check_interval_secs);
            println!("  warning_lead_secs = {}", config.session.warning_lead_secs);
            println!("  expired_grace_secs = {}", config.session.expired_grace_secs);
            println!();

            println!("[permissions]");
            match config.permissions.super_admin_id {
                Some(id) => println!("  super_admin_id = {}", id),
                None => println!("  super_admin_id = (disabled)"),
            }
            println!("  admin_roles = {:?}", config.permissions.admin_roles);
            println!();

            println!("[presence]");
            println!("  heartbeat_secs = {}", config.presence.heartbeat_secs);
            println!();

            println!("[uploads]");
            println!("  max_bytes = {}", config.uploads.max_bytes);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = load_config(cli)?;
            match config.validate() {
                Ok(()) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration is invalid: {}", e);
                    println!();
                    anyhow::bail!("invalid configuration");
                }
            }
            println!();
        }
        Some(ConfigCommands::Path) => match source {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("No config directory on this platform; pass --config"),
        },
    }

    Ok(())
}
