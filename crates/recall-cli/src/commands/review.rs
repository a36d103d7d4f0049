//! The `recall review` command.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use recall_core::error::ReviewError;
use recall_core::sweeper::spawn_sweeper;
use recall_store::{create_store, load_config_from};

pub async fn execute(owner: i64, limit: Option<usize>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = create_store(&config.storage)?;
    let engine = Arc::new(store.engine(config.engine_config()));

    let session = match engine.start_session(owner, limit.unwrap_or(0)).await {
        Ok(session) => session,
        Err(ReviewError::NoItemsAvailable { .. }) => {
            println!("Nothing to review right now.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if session.current_index > 0 {
        println!(
            "Resuming session: {} of {} answered.",
            session.current_index,
            session.total()
        );
    } else {
        println!("Starting review: {} word(s).", session.total());
    }

    let sweeper = spawn_sweeper(Arc::clone(&engine), config.sweeper_config());
    let finished = ask_questions(&engine, owner).await;
    sweeper.shutdown().await;

    if !finished? {
        println!("\nSession saved. Run `recall review` again to continue.");
        return Ok(());
    }

    if let Some(summary) = engine.complete_session(owner).await? {
        println!(
            "\nSession complete: {}/{} correct ({:.0}%) in {}.",
            summary.correct,
            summary.total,
            summary.accuracy,
            format_duration(summary.duration)
        );
        println!("{}", summary.recommendation);
    }
    Ok(())
}

/// Ask until the session is finished. Returns `false` if input ran out
/// first.
async fn ask_questions(engine: &recall_core::engine::ReviewEngine, owner: i64) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(session) = engine.active_session(owner).await? else {
            return Ok(true);
        };
        let Some(item) = session.current_item() else {
            return Ok(true);
        };

        print!(
            "[{}/{}] {} = ",
            session.current_index + 1,
            session.total(),
            item.original
        );
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(false);
        };

        let result = engine.process_answer(owner, &line).await?;
        if result.is_correct {
            println!("  correct");
        } else {
            println!("  wrong: {} = {}", result.original, result.correct_answer);
        }
        if let Some(interval) = result.next_interval {
            println!("  next review in {}", format_duration(interval));
        }
    }
}

fn format_duration(d: Duration) -> String {
    if d.num_days() >= 1 {
        let days = d.num_days();
        format!("{days} day{}", if days == 1 { "" } else { "s" })
    } else if d.num_hours() >= 1 {
        format!("{}h {}m", d.num_hours(), d.num_minutes() % 60)
    } else if d.num_minutes() >= 1 {
        format!("{}m {}s", d.num_minutes(), d.num_seconds() % 60)
    } else {
        format!("{}s", d.num_seconds().max(0))
    }
}
