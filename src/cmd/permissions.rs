//! `can` and `permissions`: what the logged-in user may do in a workspace.

use anyhow::Result;
use console::style;

use taskboard::permissions::{Permission, PermissionLevel};

use super::open_session;
use crate::Cli;

pub async fn cmd_can(cli: &Cli, workspace: &str, permission: &str, owner: bool) -> Result<()> {
    let permission: Permission = permission.parse()?;
    let client = open_session(cli)?;
    let effective = client.my_permissions(workspace).await?;

    let allowed = effective.allows(permission, owner);
    let verdict = if allowed {
        style("allowed").green().bold()
    } else {
        style("denied").red().bold()
    };
    println!(
        "{} {} ({}, via {})",
        permission,
        verdict,
        effective.level(permission),
        effective.origin
    );
    if !allowed {
        std::process::exit(1);
    }
    Ok(())
}

pub async fn cmd_permissions(cli: &Cli, workspace: &str) -> Result<()> {
    let client = open_session(cli)?;
    let effective = client.my_permissions(workspace).await?;

    println!();
    println!(
        "{} in {} (via {})",
        style("Permissions").bold().cyan(),
        workspace,
        effective.origin
    );
    println!();

    let mut current = None;
    for permission in Permission::ALL.iter().copied() {
        let resource = permission.resource();
        if current != Some(resource) {
            println!("[{}]", resource.as_str());
            current = Some(resource);
        }
        let level = effective.level(permission);
        let shown = match level {
            PermissionLevel::Any => style(level.to_string()).green(),
            PermissionLevel::Own => style(level.to_string()).yellow(),
            PermissionLevel::None => style(level.to_string()).dim(),
        };
        println!("  {:<10} {}", permission.action().as_str(), shown);
    }
    println!();
    Ok(())
}
