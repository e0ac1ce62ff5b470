//! Session lifecycle commands: `login`, `logout`, `status`, `refresh`,
//! `whoami` and `watch`.

use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use std::io::BufRead;
use tokio::sync::broadcast::error::RecvError;

use taskboard::session::monitor::countdown_message;
use taskboard::session::{SessionEvent, SessionEventKind};

use super::{open_client, open_session, token_store};
use crate::Cli;

fn read_password_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_login(cli: &Cli, username: Option<&str>, password_stdin: bool) -> Result<()> {
    use dialoguer::{Input, Password};

    let client = open_client(cli)?;

    let username = match username {
        Some(name) => name.to_string(),
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = if password_stdin {
        read_password_line()?
    } else {
        Password::new().with_prompt("Password").interact()?
    };

    client.login(&username, &password).await?;
    // The monitor is not needed once the command returns.
    client.monitor().stop();

    println!(
        "{} Logged in as {}",
        style("✓").green().bold(),
        style(&username).bold()
    );
    if let Some(remaining) = client.session().tokens().time_remaining(Utc::now()) {
        println!("  {}", countdown_message(remaining.num_seconds()));
    }
    Ok(())
}

pub fn cmd_logout(cli: &Cli) -> Result<()> {
    let tokens = token_store(cli)?;
    let had_session = tokens.access_token().is_some() || tokens.refresh_token().is_some();
    tokens.clear();
    if had_session {
        println!("Logged out.");
    } else {
        println!("No stored session.");
    }
    Ok(())
}

pub fn cmd_status(cli: &Cli) -> Result<()> {
    let tokens = token_store(cli)?;
    let now = Utc::now();

    println!();
    println!("{}", style("Session").bold().cyan());
    println!("=======");

    if tokens.access_token().is_none() {
        println!("  Not logged in.");
        if tokens.refresh_token().is_some() {
            println!("  A refresh token is stored; run 'taskboard refresh'.");
        }
        println!();
        return Ok(());
    }

    if tokens.is_valid_at(now) {
        println!("  Status:  {}", style("active").green());
    } else {
        println!("  Status:  {}", style("expired").red());
    }
    match tokens.expires_at() {
        Some(at) => println!("  Expires: {}", at.to_rfc3339()),
        None => println!("  Expires: unknown"),
    }
    if let Some(remaining) = tokens.time_remaining(now)
        && remaining.num_seconds() > 0
    {
        println!("  {}", countdown_message(remaining.num_seconds()));
    }
    println!(
        "  Refresh: {}",
        if tokens.refresh_token().is_some() {
            "stored"
        } else {
            "none"
        }
    );
    println!();
    Ok(())
}

pub async fn cmd_refresh(cli: &Cli) -> Result<()> {
    let client = open_client(cli)?;
    match client.refresh().await {
        Some(_) => {
            println!("{} Session refreshed.", style("✓").green().bold());
            if let Some(remaining) = client.session().tokens().time_remaining(Utc::now()) {
                println!("  {}", countdown_message(remaining.num_seconds()));
            }
            Ok(())
        }
        None => anyhow::bail!("Could not refresh the session. Run 'taskboard login'."),
    }
}

pub async fn cmd_whoami(cli: &Cli) -> Result<()> {
    let client = open_session(cli)?;
    let me = client.me().await?;

    println!("{}", style(&me.name).bold());
    println!("  id:    {}", me.id);
    if let Some(uid) = me.uid {
        println!("  uid:   {}", uid);
    }
    if let Some(email) = &me.email {
        println!("  email: {}", email);
    }
    if !me.roles.is_empty() {
        println!("  roles: {}", me.roles.join(", "));
    }
    Ok(())
}

fn print_event(event: &SessionEvent) {
    let label = match event.kind {
        SessionEventKind::Expiring => style("expiring").yellow(),
        SessionEventKind::Refreshed => style("refreshed").green(),
        SessionEventKind::Expired => style("expired").red(),
        SessionEventKind::Error => style("error").red().bold(),
    };
    match &event.message {
        Some(message) => println!("[{}] {}", label, message),
        None => println!("[{}]", label),
    }
}

/// Follow the session until it expires or the user interrupts. Expiry
/// warnings are answered by extending the session automatically.
pub async fn cmd_watch(cli: &Cli, board: Option<&str>) -> Result<()> {
    let client = open_session(cli)?;
    let mut events = client.subscribe();
    if !client.monitor().is_running() {
        // Only a refresh token survived; get a fresh access token first.
        if client.refresh().await.is_none() {
            anyhow::bail!("Could not resume the session. Run 'taskboard login'.");
        }
        client.monitor().start();
    }

    let presence = board.map(|b| client.start_presence(b));
    let mut viewers = presence.as_ref().map(|p| p.subscribe());

    println!(
        "Watching session{}. Press Ctrl-C to stop.",
        board.map(|b| format!(" and board {}", b)).unwrap_or_default()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event);
                    match event.kind {
                        SessionEventKind::Expiring => {
                            if !client.extend_session().await {
                                client.dismiss_expiry_warning();
                            }
                        }
                        SessionEventKind::Expired => break,
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed session events");
                }
                Err(RecvError::Closed) => break,
            },
            changed = async {
                match viewers.as_mut() {
                    Some(rx) => rx.changed().await,
                    None => std::future::pending().await,
                }
            } => {
                if changed.is_err() {
                    viewers = None;
                    continue;
                }
                if let Some(rx) = viewers.as_mut() {
                    let names: Vec<String> = rx
                        .borrow_and_update()
                        .iter()
                        .map(|v| if v.name.is_empty() { v.user_id.clone() } else { v.name.clone() })
                        .collect();
                    println!("[{}] {}", style("viewers").cyan(), names.join(", "));
                }
            }
        }
    }

    if let Some(presence) = presence {
        presence.stop().await;
    }
    client.monitor().stop();
    Ok(())
}
