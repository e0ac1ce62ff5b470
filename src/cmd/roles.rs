//! Workspace role management commands: `taskboard roles`.

use anyhow::Result;
use console::style;

use super::open_session;
use crate::{Cli, RolesCommands};

pub async fn cmd_roles(cli: &Cli, command: RolesCommands) -> Result<()> {
    let client = open_session(cli)?;

    match command {
        RolesCommands::List { workspace } => {
            let roles = client.list_roles(workspace.as_deref()).await?;
            if roles.is_empty() {
                println!("No roles found.");
                return Ok(());
            }
            println!();
            println!("{}", style("Roles").bold().cyan());
            println!();
            for role in &roles {
                let default = if role.is_default {
                    style(" (default)").yellow().to_string()
                } else {
                    String::new()
                };
                println!(
                    "  {:<24} {}{}",
                    role.display_name(),
                    style(&role.id).dim(),
                    default
                );
            }
            println!();
        }
        RolesCommands::Delete { id, force } => {
            use dialoguer::Confirm;

            if !force {
                let confirm = Confirm::new()
                    .with_prompt(format!("Delete role {}?", id))
                    .default(false)
                    .interact()?;
                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            client.delete_role(&id).await?;
            println!("Deleted role {}.", id);
        }
        RolesCommands::Assign {
            workspace,
            user,
            role,
        } => {
            let assignment = client.assign_role(&workspace, &user, &role).await?;
            println!(
                "{} Assigned role {} to {} in {} ({})",
                style("✓").green().bold(),
                assignment.role_id,
                assignment.user_id,
                assignment.workspace_id,
                style(&assignment.id).dim()
            );
        }
    }

    Ok(())
}
