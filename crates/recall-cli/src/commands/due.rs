//! The `recall due` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use recall_store::{create_store, load_config_from};

pub async fn execute(owner: i64, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let items = create_store(&config.storage)?.items();

    let now = Utc::now();
    let all = items.list_by_owner(owner).await?;
    let due: Vec<_> = all.iter().filter(|i| i.is_due(now)).collect();

    if due.is_empty() {
        println!("Nothing due ({} word(s) scheduled).", all.len());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Word", "Translation", "Reviews", "Streak", "Ease", "Due since"]);
    for item in &due {
        table.add_row(vec![
            Cell::new(&item.original),
            Cell::new(&item.translation),
            Cell::new(item.review_count),
            Cell::new(item.consecutive_correct),
            Cell::new(format!("{:.2}", item.difficulty)),
            Cell::new(item.next_due_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    println!("{table}");
    println!("{} of {} word(s) due.", due.len(), all.len());
    Ok(())
}
