//! The `recall words` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use recall_core::statistics::VocabularyProgress;
use recall_store::{create_store, load_config_from};

pub async fn execute(owner: i64, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let items = create_store(&config.storage)?.items();

    let now = Utc::now();
    let words = items.list_by_owner(owner).await?;
    if words.is_empty() {
        println!("No words yet. Use `recall add` or `recall import` to add some.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Word", "Translation", "Status", "Mastery", "Reviews"]);
    for item in &words {
        let status = if item.is_learned() {
            "learned"
        } else if item.is_due(now) {
            "due"
        } else {
            "learning"
        };
        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(&item.original),
            Cell::new(&item.translation),
            Cell::new(status),
            Cell::new(format!("{:.0}%", item.progress())),
            Cell::new(item.review_count),
        ]);
    }

    let progress = VocabularyProgress::compute(&words, now);
    println!("{table}");
    println!(
        "{} word(s), {} learned, {} due.",
        progress.total, progress.learned, progress.due
    );
    Ok(())
}
