//! The `recall import` command.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;

use recall_core::parser::validate_deck;
use recall_store::{create_store, load_config_from};

pub async fn execute(deck_path: PathBuf, owner: i64, config_path: Option<PathBuf>) -> Result<()> {
    let decks = super::load_decks(&deck_path)?;
    let config = load_config_from(config_path.as_deref())?;
    let items = create_store(&config.storage)?.items();

    let mut known: HashSet<String> = items
        .list_by_owner(owner)
        .await
        .context("failed to list existing words")?
        .into_iter()
        .map(|i| i.original.to_lowercase())
        .collect();

    let mut imported = 0usize;
    let mut skipped = 0usize;

    for deck in &decks {
        let warnings = validate_deck(deck);
        if !warnings.is_empty() {
            eprintln!("  {}: {} warning(s)", deck.name, warnings.len());
        }

        let candidates = deck.to_new_items(owner);
        skipped += deck.words.len() - candidates.len();

        let mut added = 0usize;
        for item in candidates {
            if !known.insert(item.original.to_lowercase()) {
                skipped += 1;
                continue;
            }
            items
                .insert(item, Utc::now())
                .await
                .with_context(|| format!("failed to import deck {}", deck.id))?;
            added += 1;
        }
        println!("Deck: {} ({added} new words)", deck.name);
        imported += added;
    }

    tracing::info!(owner, imported, skipped, "import finished");
    println!("Imported {imported} word(s), skipped {skipped}.");
    Ok(())
}
