//! `cards` and `upload`.

use anyhow::Result;
use chrono::Utc;
use console::style;
use std::path::Path;

use taskboard::api;
use taskboard::transform::cards::group_by_list;

use super::open_session;
use crate::Cli;

pub async fn cmd_cards(cli: &Cli, board: &str, archived: bool) -> Result<()> {
    let client = open_session(cli)?;
    let cards = api::cards::board_cards(client.api(), board, archived).await?;
    if cards.is_empty() {
        println!("No cards on board {}.", board);
        return Ok(());
    }

    let now = Utc::now();
    let lists = group_by_list(&cards);
    for (list_id, cards) in &lists {
        println!();
        println!("{} ({})", style(list_id).bold().cyan(), cards.len());
        for card in cards {
            let mut flags = Vec::new();
            if card.archived {
                flags.push(style("archived").dim().to_string());
            }
            if card.is_overdue(now) {
                flags.push(style("overdue").red().to_string());
            }
            println!("  {}  {} {}", style(&card.id).dim(), card.title, flags.join(" "));
        }
    }

    let unlisted = cards.iter().filter(|c| c.list_id.is_none()).count();
    if unlisted > 0 {
        println!();
        println!("{} card(s) are not in any list.", unlisted);
    }
    println!();
    Ok(())
}

pub async fn cmd_upload(cli: &Cli, card: &str, file: &Path) -> Result<()> {
    let client = open_session(cli)?;
    let attachment = client.upload_attachment(card, file).await?;
    println!(
        "{} Uploaded {} ({}, {})",
        style("✓").green().bold(),
        style(&attachment.file_name).bold(),
        attachment.mime_type,
        attachment.display_size()
    );
    if let Ok(base) = client.config().base_url()
        && let Some(url) = attachment.absolute_url(&base)
    {
        println!("  {}", url);
    }
    Ok(())
}
