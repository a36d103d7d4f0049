//! SQLite-backed item, session and statistics store.
//!
//! Timestamps are stored as unix milliseconds. A session keeps its item
//! snapshot as a JSON column next to its progress counters, so resuming a
//! session never has to re-derive `current_index`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use recall_core::error::StoreError;
use recall_core::model::{Item, ItemId, NewItem, OwnerId, Session, SessionId};
use recall_core::statistics::UserStats;
use recall_core::traits::{
    AnswerStore, ItemStore, ReviewRecord, SessionStore, StatsStore, StoreResult,
};

const SCHEMA: &str = "
BEGIN;
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner INTEGER NOT NULL,
    original TEXT NOT NULL,
    translation TEXT NOT NULL,
    language TEXT,
    part_of_speech TEXT,
    example TEXT,
    difficulty REAL NOT NULL,
    review_count INTEGER NOT NULL,
    consecutive_correct INTEGER NOT NULL,
    next_due_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_items_owner_due ON items(owner, next_due_at);
CREATE TABLE IF NOT EXISTS review_sessions (
    id TEXT PRIMARY KEY,
    owner INTEGER NOT NULL,
    current_index INTEGER NOT NULL,
    correct_count INTEGER NOT NULL,
    completed INTEGER NOT NULL,
    started_at INTEGER NOT NULL,
    last_activity_at INTEGER NOT NULL,
    ended_at INTEGER,
    items TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_owner ON review_sessions(owner, started_at);
CREATE INDEX IF NOT EXISTS idx_sessions_activity ON review_sessions(last_activity_at);
CREATE TABLE IF NOT EXISTS user_stats (
    owner INTEGER PRIMARY KEY,
    total_reviews INTEGER NOT NULL,
    total_correct INTEGER NOT NULL,
    streak_days INTEGER NOT NULL,
    max_streak_days INTEGER NOT NULL,
    total_time_secs INTEGER NOT NULL,
    last_review_at INTEGER
);
COMMIT;";

const ITEM_COLUMNS: &str = "id, owner, original, translation, language, part_of_speech, \
     example, difficulty, review_count, consecutive_correct, next_due_at, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, owner, current_index, correct_count, completed, \
     started_at, last_activity_at, ended_at, items";

/// A store persisting everything in one SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::backend)?;
        }
        let conn = Connection::open(path).map_err(StoreError::backend)?;
        conn.busy_timeout(StdDuration::from_secs(5))
            .map_err(StoreError::backend)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// A private database that lives as long as the store.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::backend)?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA).map_err(StoreError::backend)?;
        tracing::debug!(path = ?path, "opened sqlite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(StoreError::backend)?
    }
}

fn millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        owner: row.get(1)?,
        original: row.get(2)?,
        translation: row.get(3)?,
        language: row.get(4)?,
        part_of_speech: row.get(5)?,
        example: row.get(6)?,
        difficulty: row.get(7)?,
        review_count: row.get(8)?,
        consecutive_correct: row.get(9)?,
        next_due_at: timestamp(row, 10)?,
        created_at: timestamp(row, 11)?,
        updated_at: timestamp(row, 12)?,
    })
}

/// A session row before its id and snapshot are decoded.
struct SessionRow {
    id: String,
    owner: OwnerId,
    current_index: i64,
    correct_count: i64,
    completed: bool,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    ended_at: Option<i64>,
    items: String,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            current_index: row.get(2)?,
            correct_count: row.get(3)?,
            completed: row.get(4)?,
            started_at: timestamp(row, 5)?,
            last_activity_at: timestamp(row, 6)?,
            ended_at: row.get(7)?,
            items: row.get(8)?,
        })
    }

    fn decode(self) -> StoreResult<Session> {
        let corrupt = |what: &str| StoreError::Corrupt(format!("session {}: {what}", self.id));
        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(&format!("bad id: {e}")))?;
        let items: Vec<Item> = serde_json::from_str(&self.items)
            .map_err(|e| corrupt(&format!("bad item snapshot: {e}")))?;
        let current_index = usize::try_from(self.current_index)
            .map_err(|_| corrupt("negative current_index"))?;
        let correct_count = usize::try_from(self.correct_count)
            .map_err(|_| corrupt("negative correct_count"))?;
        let ended_at = self
            .ended_at
            .map(|ms| DateTime::from_timestamp_millis(ms).ok_or_else(|| corrupt("bad ended_at")))
            .transpose()?;

        Ok(Session {
            id,
            owner: self.owner,
            items,
            current_index,
            correct_count,
            started_at: self.started_at,
            last_activity_at: self.last_activity_at,
            ended_at,
            completed: self.completed,
        })
    }
}

/// Decode session rows, skipping the ones that cannot be decoded.
fn decode_sessions(rows: Vec<SessionRow>) -> Vec<Session> {
    rows.into_iter()
        .filter_map(|row| match row.decode() {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("skipping unreadable session: {e}");
                None
            }
        })
        .collect()
}

fn query_sessions(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> StoreResult<Vec<Session>> {
    let mut stmt = conn.prepare(sql).map_err(StoreError::backend)?;
    let rows = stmt
        .query_map(params, SessionRow::from_row)
        .map_err(StoreError::backend)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(StoreError::backend)?;
    Ok(decode_sessions(rows))
}

fn snapshot_json(session: &Session) -> StoreResult<String> {
    serde_json::to_string(&session.items).map_err(StoreError::backend)
}

fn update_item(conn: &Connection, item: &Item) -> StoreResult<()> {
    let changed = conn
        .execute(
            "UPDATE items SET owner = ?2, original = ?3, translation = ?4, \
             language = ?5, part_of_speech = ?6, example = ?7, difficulty = ?8, \
             review_count = ?9, consecutive_correct = ?10, next_due_at = ?11, \
             updated_at = ?12 WHERE id = ?1",
            params![
                item.id,
                item.owner,
                item.original,
                item.translation,
                item.language,
                item.part_of_speech,
                item.example,
                item.difficulty,
                item.review_count,
                item.consecutive_correct,
                millis(item.next_due_at),
                millis(item.updated_at),
            ],
        )
        .map_err(StoreError::backend)?;
    if changed == 0 {
        return Err(StoreError::not_found("item", item.id));
    }
    Ok(())
}

fn insert_session(conn: &Connection, session: &Session, snapshot: &str) -> StoreResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO review_sessions ({SESSION_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            session.id.to_string(),
            session.owner,
            session.current_index,
            session.correct_count,
            session.completed,
            millis(session.started_at),
            millis(session.last_activity_at),
            session.ended_at.map(millis),
            snapshot,
        ],
    )
    .map_err(StoreError::backend)?;
    Ok(())
}

/// Returns the number of rows changed.
fn update_session(conn: &Connection, session: &Session, snapshot: &str) -> StoreResult<usize> {
    conn.execute(
        "UPDATE review_sessions SET owner = ?2, current_index = ?3, \
         correct_count = ?4, completed = ?5, started_at = ?6, \
         last_activity_at = ?7, ended_at = ?8, items = ?9 WHERE id = ?1",
        params![
            session.id.to_string(),
            session.owner,
            session.current_index,
            session.correct_count,
            session.completed,
            millis(session.started_at),
            millis(session.last_activity_at),
            session.ended_at.map(millis),
            snapshot,
        ],
    )
    .map_err(StoreError::backend)
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn insert(&self, item: NewItem, now: DateTime<Utc>) -> StoreResult<Item> {
        self.with_conn(move |conn| {
            let mut stored = Item::from_new(0, item, now);
            conn.execute(
                "INSERT INTO items (owner, original, translation, language, part_of_speech, \
                 example, difficulty, review_count, consecutive_correct, next_due_at, \
                 created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    stored.owner,
                    stored.original,
                    stored.translation,
                    stored.language,
                    stored.part_of_speech,
                    stored.example,
                    stored.difficulty,
                    stored.review_count,
                    stored.consecutive_correct,
                    millis(stored.next_due_at),
                    millis(stored.created_at),
                    millis(stored.updated_at),
                ],
            )
            .map_err(StoreError::backend)?;
            stored.id = conn.last_insert_rowid();
            Ok(stored)
        })
        .await
    }

    async fn get_due_items(
        &self,
        owner: OwnerId,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Item>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items \
                     WHERE owner = ?1 AND next_due_at <= ?2 \
                     ORDER BY next_due_at, id LIMIT ?3"
                ))
                .map_err(StoreError::backend)?;
            let items = stmt
                .query_map(params![owner, millis(now), limit], item_from_row)
                .map_err(StoreError::backend)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(StoreError::backend)?;
            Ok(items)
        })
        .await
    }

    async fn get_by_id(&self, id: ItemId) -> StoreResult<Option<Item>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                params![id],
                item_from_row,
            )
            .optional()
            .map_err(StoreError::backend)
        })
        .await
    }

    async fn update(&self, item: &Item) -> StoreResult<()> {
        let item = item.clone();
        self.with_conn(move |conn| update_item(conn, &item)).await
    }

    async fn list_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Item>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items WHERE owner = ?1 ORDER BY next_due_at, id"
                ))
                .map_err(StoreError::backend)?;
            let items = stmt
                .query_map(params![owner], item_from_row)
                .map_err(StoreError::backend)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(StoreError::backend)?;
            Ok(items)
        })
        .await
    }

    async fn delete(&self, id: ItemId) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute("DELETE FROM items WHERE id = ?1", params![id])
                .map_err(StoreError::backend)?;
            if changed == 0 {
                return Err(StoreError::not_found("item", id));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create(&self, session: &Session) -> StoreResult<()> {
        let snapshot = snapshot_json(session)?;
        let session = session.clone();
        self.with_conn(move |conn| insert_session(conn, &session, &snapshot))
            .await
    }

    async fn update(&self, session: &Session) -> StoreResult<()> {
        let snapshot = snapshot_json(session)?;
        let session = session.clone();
        self.with_conn(move |conn| {
            if update_session(conn, &session, &snapshot)? == 0 {
                return Err(StoreError::not_found("session", session.id));
            }
            Ok(())
        })
        .await
    }

    async fn get_by_id(&self, id: SessionId) -> StoreResult<Option<Session>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM review_sessions WHERE id = ?1"),
                params![id.to_string()],
                SessionRow::from_row,
            )
            .optional()
            .map_err(StoreError::backend)?
            .map(SessionRow::decode)
            .transpose()
        })
        .await
    }

    async fn get_by_owner(&self, owner: OwnerId) -> StoreResult<Vec<Session>> {
        self.with_conn(move |conn| {
            query_sessions(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM review_sessions \
                     WHERE owner = ?1 ORDER BY started_at DESC"
                ),
                params![owner],
            )
        })
        .await
    }

    async fn delete_by_id(&self, id: SessionId) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "DELETE FROM review_sessions WHERE id = ?1",
                    params![id.to_string()],
                )
                .map_err(StoreError::backend)?;
            if changed == 0 {
                return Err(StoreError::not_found("session", id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM review_sessions WHERE last_activity_at < ?1",
                params![millis(cutoff)],
            )
            .map_err(StoreError::backend)
        })
        .await
    }

    async fn list_active(&self) -> StoreResult<Vec<Session>> {
        self.with_conn(|conn| {
            query_sessions(
                conn,
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM review_sessions \
                     WHERE completed = 0 ORDER BY started_at"
                ),
                [],
            )
        })
        .await
    }
}

#[async_trait]
impl AnswerStore for SqliteStore {
    async fn commit_answer(&self, item: Option<&Item>, session: &Session) -> StoreResult<()> {
        let snapshot = snapshot_json(session)?;
        let item = item.cloned();
        let session = session.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(StoreError::backend)?;
            if let Some(item) = &item {
                update_item(&tx, item)?;
            }
            if update_session(&tx, &session, &snapshot)? == 0 {
                insert_session(&tx, &session, &snapshot)?;
            }
            tx.commit().map_err(StoreError::backend)
        })
        .await
    }
}

fn load_stats(conn: &Connection, owner: OwnerId) -> StoreResult<Option<UserStats>> {
    conn.query_row(
        "SELECT total_reviews, total_correct, streak_days, max_streak_days, \
         total_time_secs, last_review_at FROM user_stats WHERE owner = ?1",
        params![owner],
        |row| {
            let last_review_at = match row.get::<_, Option<i64>>(5)? {
                Some(_) => Some(timestamp(row, 5)?),
                None => None,
            };
            Ok(UserStats {
                owner,
                total_reviews: row.get::<_, i64>(0)? as u64,
                total_correct: row.get::<_, i64>(1)? as u64,
                streak_days: row.get(2)?,
                max_streak_days: row.get(3)?,
                total_time_secs: row.get::<_, i64>(4)? as u64,
                last_review_at,
            })
        },
    )
    .optional()
    .map_err(StoreError::backend)
}

#[async_trait]
impl StatsStore for SqliteStore {
    async fn record_review(&self, owner: OwnerId, review: &ReviewRecord) -> StoreResult<()> {
        let review = *review;
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(StoreError::backend)?;
            let mut stats = load_stats(&tx, owner)?.unwrap_or_else(|| UserStats::new(owner));
            stats.record_review(&review);
            tx.execute(
                "INSERT OR REPLACE INTO user_stats (owner, total_reviews, total_correct, \
                 streak_days, max_streak_days, total_time_secs, last_review_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    owner,
                    stats.total_reviews as i64,
                    stats.total_correct as i64,
                    stats.streak_days,
                    stats.max_streak_days,
                    stats.total_time_secs as i64,
                    stats.last_review_at.map(millis),
                ],
            )
            .map_err(StoreError::backend)?;
            tx.commit().map_err(StoreError::backend)
        })
        .await
    }

    async fn get_stats(&self, owner: OwnerId) -> StoreResult<Option<UserStats>> {
        self.with_conn(move |conn| load_stats(conn, owner)).await
    }
}
