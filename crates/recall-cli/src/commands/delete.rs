//! The `recall delete` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use recall_store::{create_store, load_config_from};

pub async fn execute(owner: i64, id: i64, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let items = create_store(&config.storage)?.items();

    let item = match items.get_by_id(id).await? {
        Some(item) if item.owner == owner => item,
        _ => bail!("word {id} not found for owner {owner}"),
    };
    items
        .delete(id)
        .await
        .with_context(|| format!("failed to delete word {id}"))?;

    tracing::info!(owner, item = id, "deleted word");
    println!("Deleted word {id}: {} = {}", item.original, item.translation);
    Ok(())
}
