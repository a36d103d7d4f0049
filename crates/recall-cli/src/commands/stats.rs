//! The `recall stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use recall_store::{create_store, load_config_from};

pub async fn execute(owner: i64, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.storage)?;
    let engine = store.engine(config.engine_config());

    let vocabulary = engine.vocabulary_progress(owner).await?;
    let stats = store.stats().get_stats(owner).await?;

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Words"), Cell::new(vocabulary.total)]);
    table.add_row(vec![Cell::new("Learned"), Cell::new(vocabulary.learned)]);
    table.add_row(vec![Cell::new("Due now"), Cell::new(vocabulary.due)]);
    table.add_row(vec![
        Cell::new("Progress"),
        Cell::new(format!("{:.1}%", vocabulary.progress)),
    ]);

    match &stats {
        Some(stats) => {
            table.add_row(vec![Cell::new("Reviews"), Cell::new(stats.total_reviews)]);
            table.add_row(vec![
                Cell::new("Accuracy"),
                Cell::new(format!("{:.1}%", stats.accuracy())),
            ]);
            table.add_row(vec![
                Cell::new("Streak"),
                Cell::new(format!(
                    "{} day(s) (best {})",
                    stats.streak_days, stats.max_streak_days
                )),
            ]);
            table.add_row(vec![
                Cell::new("Avg answer time"),
                Cell::new(format!("{:.1}s", stats.average_time_secs())),
            ]);
        }
        None => {
            table.add_row(vec![Cell::new("Reviews"), Cell::new(0)]);
        }
    }

    println!("{table}");
    Ok(())
}
