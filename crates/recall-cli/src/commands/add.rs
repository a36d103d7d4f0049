//! The `recall add` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use recall_core::model::NewItem;
use recall_store::{create_store, load_config_from};

pub async fn execute(word: NewItem, config_path: Option<PathBuf>) -> Result<()> {
    word.validate().context("word rejected")?;
    let word = NewItem {
        original: word.original.trim().to_string(),
        translation: word.translation.trim().to_string(),
        ..word
    };

    let config = load_config_from(config_path.as_deref())?;
    let items = create_store(&config.storage)?.items();

    let wanted = word.original.to_lowercase();
    let existing = items
        .list_by_owner(word.owner)
        .await
        .context("failed to list existing words")?;
    if let Some(dup) = existing.iter().find(|i| i.original.to_lowercase() == wanted) {
        bail!("word already exists: {} (id {})", dup.original, dup.id);
    }

    let owner = word.owner;
    let item = items
        .insert(word, Utc::now())
        .await
        .context("failed to add word")?;

    tracing::info!(owner, item = item.id, "added word");
    println!("Added word {}: {} = {}", item.id, item.original, item.translation);
    if let Some(example) = &item.example {
        println!("  Example: {example}");
    }
    Ok(())
}
