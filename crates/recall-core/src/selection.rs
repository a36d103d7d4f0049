//! Due-item selection for new review sessions.

use chrono::{DateTime, Utc};

use crate::error::ReviewError;
use crate::model::{Item, OwnerId, MAX_SESSION_ITEMS};
use crate::traits::ItemStore;

/// Effective session size for a requested limit. Zero means "as many as
/// allowed".
pub fn effective_limit(requested: usize) -> usize {
    if requested == 0 {
        MAX_SESSION_ITEMS
    } else {
        requested.min(MAX_SESSION_ITEMS)
    }
}

/// Filter `items` down to those of `owner` due at `now`, most overdue
/// first (ties by id), keeping at most `limit`.
pub fn pick_due<I>(items: I, owner: OwnerId, now: DateTime<Utc>, limit: usize) -> Vec<Item>
where
    I: IntoIterator<Item = Item>,
{
    let mut due: Vec<Item> = items
        .into_iter()
        .filter(|item| item.owner == owner && item.is_due(now))
        .collect();
    due.sort_by(|a, b| a.next_due_at.cmp(&b.next_due_at).then(a.id.cmp(&b.id)));
    due.truncate(limit);
    due
}

/// Choose the items that seed a session for `owner`.
///
/// At most `min(limit, MAX_SESSION_ITEMS)` items are returned, ordered by
/// ascending due time. Fails with [`ReviewError::NoItemsAvailable`] when
/// nothing is due.
pub async fn select_due(
    store: &dyn ItemStore,
    owner: OwnerId,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Item>, ReviewError> {
    let limit = effective_limit(limit);
    let candidates = store.get_due_items(owner, now, limit).await?;
    let selected = pick_due(candidates, owner, now, limit);

    if selected.is_empty() {
        return Err(ReviewError::NoItemsAvailable { owner });
    }

    tracing::debug!(owner, count = selected.len(), "selected due items");
    Ok(selected)
}
