//! The `recall cleanup` command.

use std::path::PathBuf;

use anyhow::Result;

use recall_store::{create_store, load_config_from};

pub async fn execute(older_than_hours: Option<u64>, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(hours) = older_than_hours {
        config.session_max_age_hours = hours;
    }

    let store = create_store(&config.storage)?;
    let engine = store.engine(config.engine_config());

    let removed = engine.sweep_stale(config.session_max_age()).await?;
    let remaining = engine.restore_active().await?;

    println!("Removed {removed} stale session(s).");
    println!("{remaining} session(s) still in progress.");
    Ok(())
}
