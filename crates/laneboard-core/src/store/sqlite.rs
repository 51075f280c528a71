//! SQLite-backed [`BoardStore`].
//!
//! Writes run inside `BEGIN IMMEDIATE` transactions, so sequence reads and
//! the record write see one consistent snapshot. Counters advance by
//! compare-and-swap and the partial unique indexes reject any duplicate that
//! slips past a stale snapshot; both surface as [`StoreError::Conflict`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{
    Connection, ErrorCode as SqliteCode, OptionalExtension, Params, Row, TransactionBehavior,
    params,
};
use std::path::Path;
use tracing::warn;

use super::{BoardStore, StoreError};
use crate::db;
use crate::identity::{
    Allocation, apply_allocated, new_opaque_id, next_direct_entry_sequence, next_sequence,
};
use crate::model::{Idea, IdeaStatus, NewIdea, Platform, Post, PostStatus};

const DIRECT_ENTRY_COUNTER: &str = "direct_entry";
const IDEA_NUMBER_COUNTER: &str = "idea_number";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const POST_COLUMNS: &str = "post_id, idea_id, sequence, direct_entry_sequence, platform, \
     title, body, status, is_archived, is_locked, definitive_pillar, publish_date, \
     publish_time, is_evergreen, repurpose_date, created_at_us, updated_at_us";

const IDEA_COLUMNS: &str = "idea_id, idea_number, title, body, pillar, status, \
     resource_links_json, audio_ref, created_at_us, updated_at_us";

/// Board store over one SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the board database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_board(path)?,
        })
    }

    /// Open a private in-memory board.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_board_in_memory()?,
        })
    }

    /// Wrap an already migrated connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl BoardStore for SqliteStore {
    fn idea(&self, id: &str) -> Result<Option<Idea>, StoreError> {
        let sql = format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE idea_id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id], IdeaRow::from_row)
            .optional()?;
        row.map(IdeaRow::into_idea).transpose()
    }

    fn idea_by_number(&self, idea_number: u32) -> Result<Option<Idea>, StoreError> {
        let sql = format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE idea_number = ?1");
        let row = self
            .conn
            .query_row(&sql, [idea_number], IdeaRow::from_row)
            .optional()?;
        row.map(IdeaRow::into_idea).transpose()
    }

    fn ideas(&self) -> Result<Vec<Idea>, StoreError> {
        let sql = format!("SELECT {IDEA_COLUMNS} FROM ideas ORDER BY idea_number");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], IdeaRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(IdeaRow::into_idea).collect()
    }

    fn create_idea(&mut self, idea: NewIdea) -> Result<Idea, StoreError> {
        let links = serde_json::to_string(&idea.resource_links).map_err(|err| {
            StoreError::Corrupt {
                kind: "idea",
                id: idea.title.clone(),
                detail: err.to_string(),
            }
        })?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| classify(err, "ideas"))?;

        let current = read_counter(&tx, IDEA_NUMBER_COUNTER)?;
        let idea_number = current.saturating_add(1);
        advance_counter(&tx, IDEA_NUMBER_COUNTER, current, idea_number)?;

        let created = Idea {
            id: new_opaque_id("ida", &idea.title),
            idea_number,
            title: idea.title,
            body: idea.body,
            pillar: idea.pillar,
            status: idea.status,
            resource_links: idea.resource_links,
            audio_ref: idea.audio_ref,
            created_at: idea.created_at,
            updated_at: idea.created_at,
        };

        tx.execute(
            "INSERT INTO ideas (
                idea_id, idea_number, title, body, pillar, status,
                resource_links_json, audio_ref, created_at_us, updated_at_us
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                created.id,
                created.idea_number,
                created.title,
                created.body,
                created.pillar,
                created.status.as_str(),
                links,
                created.audio_ref,
                created.created_at.timestamp_micros(),
                created.updated_at.timestamp_micros(),
            ],
        )
        .map_err(|err| classify(err, "ideas"))?;
        tx.commit().map_err(|err| classify(err, "ideas"))?;

        Ok(created)
    }

    fn update_idea(&mut self, idea: &Idea) -> Result<(), StoreError> {
        let links =
            serde_json::to_string(&idea.resource_links).map_err(|err| StoreError::Corrupt {
                kind: "idea",
                id: idea.id.clone(),
                detail: err.to_string(),
            })?;

        let changed = self.conn.execute(
            "UPDATE ideas
             SET title = ?2, body = ?3, pillar = ?4, status = ?5,
                 resource_links_json = ?6, audio_ref = ?7, updated_at_us = ?8
             WHERE idea_id = ?1",
            params![
                idea.id,
                idea.title,
                idea.body,
                idea.pillar,
                idea.status.as_str(),
                links,
                idea.audio_ref,
                idea.updated_at.timestamp_micros(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "idea",
                id: idea.id.clone(),
            });
        }
        Ok(())
    }

    fn delete_idea(&mut self, id: &str) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM ideas WHERE idea_id = ?1", [id])?;
        Ok(changed > 0)
    }

    fn post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id], PostRow::from_row)
            .optional()?;
        row.map(PostRow::into_post).transpose()
    }

    fn posts(&self) -> Result<Vec<Post>, StoreError> {
        load_posts(&self.conn, "ORDER BY created_at_us, post_id", [])
    }

    fn posts_for_idea(&self, idea_id: &str) -> Result<Vec<Post>, StoreError> {
        load_posts(
            &self.conn,
            "WHERE idea_id = ?1 ORDER BY sequence, post_id",
            [idea_id],
        )
    }

    fn direct_entry_posts(&self) -> Result<Vec<Post>, StoreError> {
        load_posts(
            &self.conn,
            "WHERE idea_id IS NULL AND direct_entry_sequence IS NOT NULL
             ORDER BY direct_entry_sequence",
            [],
        )
    }

    fn direct_entry_counter(&self) -> Result<u32, StoreError> {
        read_counter(&self.conn, DIRECT_ENTRY_COUNTER)
    }

    fn commit_post(&mut self, mut post: Post, allocation: &Allocation) -> Result<Post, StoreError> {
        let scope = match allocation {
            Allocation::NextForIdea(idea_id) => format!("idea {idea_id}"),
            Allocation::Keep | Allocation::NextDirectEntry => "posts".to_string(),
        };

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| classify(err, &scope))?;

        match allocation {
            Allocation::Keep => {}
            Allocation::NextForIdea(idea_id) => {
                let siblings = load_posts(
                    &tx,
                    "WHERE idea_id = ?1 AND post_id <> ?2",
                    params![idea_id, post.id],
                )?;
                let number = next_sequence(&siblings, idea_id);
                apply_allocated(&mut post, allocation, number);
            }
            Allocation::NextDirectEntry => {
                let current = read_counter(&tx, DIRECT_ENTRY_COUNTER)?;
                let number = next_direct_entry_sequence(current);
                advance_counter(&tx, DIRECT_ENTRY_COUNTER, current, number)?;
                apply_allocated(&mut post, allocation, number);
            }
        }

        upsert_post(&tx, &post).map_err(|err| classify(err, &scope))?;
        tx.commit().map_err(|err| classify(err, &scope))?;

        Ok(post)
    }

    fn delete_post(&mut self, id: &str) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM posts WHERE post_id = ?1", [id])?;
        Ok(changed > 0)
    }
}

/// Map a write failure: duplicates and lock contention are retryable conflicts.
fn classify(err: rusqlite::Error, scope: &str) -> StoreError {
    let conflict = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || matches!(
                    failure.code,
                    SqliteCode::DatabaseBusy | SqliteCode::DatabaseLocked
                )
        }
        _ => false,
    };

    if conflict {
        warn!(scope, error = %err, "write lost a race");
        StoreError::Conflict {
            scope: scope.to_string(),
        }
    } else {
        StoreError::Sqlite(err)
    }
}

fn read_counter(conn: &Connection, name: &str) -> Result<u32, StoreError> {
    let value: i64 = conn
        .query_row("SELECT value FROM counters WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?
        .unwrap_or(0);
    u32::try_from(value).map_err(|_| StoreError::Corrupt {
        kind: "counter",
        id: name.to_string(),
        detail: format!("value {value} out of range"),
    })
}

fn advance_counter(
    conn: &Connection,
    name: &str,
    expected: u32,
    next: u32,
) -> Result<(), StoreError> {
    let changed = conn
        .execute(
            "INSERT INTO counters (name, value) VALUES (?1, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value
             WHERE counters.value = ?2",
            params![name, expected, next],
        )
        .map_err(|err| classify(err, name))?;
    if changed == 0 {
        warn!(counter = name, expected, "counter moved underneath allocation");
        return Err(StoreError::Conflict {
            scope: format!("counter {name}"),
        });
    }
    Ok(())
}

fn load_posts<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<Post>, StoreError> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, PostRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(PostRow::into_post).collect()
}

fn upsert_post(conn: &Connection, post: &Post) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO posts (
            post_id, idea_id, sequence, direct_entry_sequence, platform,
            title, body, status, is_archived, is_locked, definitive_pillar,
            publish_date, publish_time, is_evergreen, repurpose_date,
            created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
         ON CONFLICT(post_id) DO UPDATE SET
            idea_id = excluded.idea_id,
            sequence = excluded.sequence,
            direct_entry_sequence = excluded.direct_entry_sequence,
            platform = excluded.platform,
            title = excluded.title,
            body = excluded.body,
            status = excluded.status,
            is_archived = excluded.is_archived,
            is_locked = excluded.is_locked,
            definitive_pillar = excluded.definitive_pillar,
            publish_date = excluded.publish_date,
            publish_time = excluded.publish_time,
            is_evergreen = excluded.is_evergreen,
            repurpose_date = excluded.repurpose_date,
            updated_at_us = excluded.updated_at_us",
        params![
            post.id,
            post.idea_id,
            post.sequence,
            post.direct_entry_sequence,
            post.platform.map(Platform::as_str),
            post.title,
            post.body,
            post.status.as_str(),
            post.archived,
            post.is_locked,
            post.definitive_pillar,
            post.publish_date.map(|d| d.format(DATE_FORMAT).to_string()),
            post.publish_time.map(|t| t.format(TIME_FORMAT).to_string()),
            post.is_evergreen,
            post.repurpose_date.map(|d| d.format(DATE_FORMAT).to_string()),
            post.created_at.timestamp_micros(),
            post.updated_at.timestamp_micros(),
        ],
    )
}

struct PostRow {
    post_id: String,
    idea_id: Option<String>,
    sequence: Option<i64>,
    direct_entry_sequence: Option<i64>,
    platform: Option<String>,
    title: String,
    body: String,
    status: String,
    is_archived: bool,
    is_locked: bool,
    definitive_pillar: Option<String>,
    publish_date: Option<String>,
    publish_time: Option<String>,
    is_evergreen: bool,
    repurpose_date: Option<String>,
    created_at_us: i64,
    updated_at_us: i64,
}

impl PostRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            post_id: row.get(0)?,
            idea_id: row.get(1)?,
            sequence: row.get(2)?,
            direct_entry_sequence: row.get(3)?,
            platform: row.get(4)?,
            title: row.get(5)?,
            body: row.get(6)?,
            status: row.get(7)?,
            is_archived: row.get(8)?,
            is_locked: row.get(9)?,
            definitive_pillar: row.get(10)?,
            publish_date: row.get(11)?,
            publish_time: row.get(12)?,
            is_evergreen: row.get(13)?,
            repurpose_date: row.get(14)?,
            created_at_us: row.get(15)?,
            updated_at_us: row.get(16)?,
        })
    }

    fn into_post(self) -> Result<Post, StoreError> {
        let id = self.post_id;
        let corrupt = |detail: String| StoreError::Corrupt {
            kind: "post",
            id: id.clone(),
            detail,
        };

        let (status, legacy_archived) =
            PostStatus::parse_stored(&self.status).map_err(|err| corrupt(err.to_string()))?;
        let platform = self
            .platform
            .as_deref()
            .map(str::parse::<Platform>)
            .transpose()
            .map_err(|err| corrupt(err.to_string()))?;
        let sequence = self
            .sequence
            .map(u32::try_from)
            .transpose()
            .map_err(|err| corrupt(format!("sequence: {err}")))?;
        let direct_entry_sequence = self
            .direct_entry_sequence
            .map(u32::try_from)
            .transpose()
            .map_err(|err| corrupt(format!("direct_entry_sequence: {err}")))?;
        let created_at = timestamp(self.created_at_us).ok_or_else(|| corrupt("created_at".into()))?;
        let updated_at = timestamp(self.updated_at_us).ok_or_else(|| corrupt("updated_at".into()))?;

        let publish_date = stored_date(&id, "publish_date", self.publish_date.as_deref());
        let publish_time = stored_time(&id, self.publish_time.as_deref());
        let repurpose_date = stored_date(&id, "repurpose_date", self.repurpose_date.as_deref());

        Ok(Post {
            id,
            idea_id: self.idea_id,
            sequence,
            direct_entry_sequence,
            platform,
            title: self.title,
            body: self.body,
            status,
            archived: self.is_archived || legacy_archived,
            is_locked: self.is_locked,
            definitive_pillar: self.definitive_pillar,
            publish_date,
            publish_time,
            is_evergreen: self.is_evergreen,
            repurpose_date,
            created_at,
            updated_at,
        })
    }
}

struct IdeaRow {
    idea_id: String,
    idea_number: i64,
    title: String,
    body: String,
    pillar: Option<String>,
    status: String,
    resource_links_json: String,
    audio_ref: Option<String>,
    created_at_us: i64,
    updated_at_us: i64,
}

impl IdeaRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            idea_id: row.get(0)?,
            idea_number: row.get(1)?,
            title: row.get(2)?,
            body: row.get(3)?,
            pillar: row.get(4)?,
            status: row.get(5)?,
            resource_links_json: row.get(6)?,
            audio_ref: row.get(7)?,
            created_at_us: row.get(8)?,
            updated_at_us: row.get(9)?,
        })
    }

    fn into_idea(self) -> Result<Idea, StoreError> {
        let id = self.idea_id;
        let corrupt = |detail: String| StoreError::Corrupt {
            kind: "idea",
            id: id.clone(),
            detail,
        };

        let idea_number =
            u32::try_from(self.idea_number).map_err(|err| corrupt(format!("idea_number: {err}")))?;
        let status = self
            .status
            .parse::<IdeaStatus>()
            .map_err(|err| corrupt(err.to_string()))?;
        let resource_links: Vec<String> = serde_json::from_str(&self.resource_links_json)
            .map_err(|err| corrupt(format!("resource_links: {err}")))?;
        let created_at = timestamp(self.created_at_us).ok_or_else(|| corrupt("created_at".into()))?;
        let updated_at = timestamp(self.updated_at_us).ok_or_else(|| corrupt("updated_at".into()))?;

        Ok(Idea {
            id,
            idea_number,
            title: self.title,
            body: self.body,
            pillar: self.pillar,
            status,
            resource_links,
            audio_ref: self.audio_ref,
            created_at,
            updated_at,
        })
    }
}

fn timestamp(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
}

fn stored_date(post_id: &str, field: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(post_id, field, raw, error = %err, "unparseable stored date; treating as unset");
            None
        }
    }
}

fn stored_time(post_id: &str, raw: Option<&str>) -> Option<NaiveTime> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|err| {
            warn!(post_id, raw, error = %err, "unparseable stored time; treating as unset");
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("open in-memory store")
    }

    #[test]
    fn committed_post_reads_back_intact() {
        let mut store = store();
        let post = Post {
            id: "pst-roundtrip".to_string(),
            platform: Some(Platform::Linkedin),
            title: "Launch notes".to_string(),
            status: PostStatus::Scheduled,
            definitive_pillar: Some("edu".to_string()),
            publish_date: Some(date(2024, 3, 1)),
            publish_time: NaiveTime::from_hms_opt(9, 30, 0),
            is_evergreen: true,
            repurpose_date: Some(date(2024, 6, 1)),
            created_at: DateTime::<Utc>::from_timestamp_micros(1_700_000_000_123_456)
                .expect("valid timestamp"),
            ..Post::default()
        };

        let stored = store
            .commit_post(post.clone(), &Allocation::NextDirectEntry)
            .expect("commit");
        assert_eq!(stored.direct_entry_sequence, Some(1));

        let loaded = store.post(&post.id).expect("load").expect("present");
        assert_eq!(loaded, stored);
    }

    #[test]
    fn ideas_get_monotonic_numbers_and_links() {
        let mut store = store();
        let first = store
            .create_idea(NewIdea {
                title: "Hiring loop".to_string(),
                resource_links: vec!["https://example.com/notes".to_string()],
                ..NewIdea::default()
            })
            .expect("create");
        store.delete_idea(&first.id).expect("delete");
        let second = store.create_idea(NewIdea::default()).expect("create");

        assert_eq!((first.idea_number, second.idea_number), (1, 2));
        assert!(store.idea(&first.id).expect("lookup").is_none());

        let mut updated = second.clone();
        updated.status = IdeaStatus::Ready;
        updated.resource_links = vec!["a".to_string(), "b".to_string()];
        store.update_idea(&updated).expect("update");
        assert_eq!(store.idea_by_number(2).expect("lookup"), Some(updated));
    }

    #[test]
    fn relinking_recomputes_against_new_idea() {
        let mut store = store();
        for (id, idea) in [("pst-a", "ida-x"), ("pst-b", "ida-x"), ("pst-c", "ida-y")] {
            let post = Post {
                id: id.to_string(),
                idea_id: Some(idea.to_string()),
                ..Post::default()
            };
            store
                .commit_post(post, &Allocation::NextForIdea(idea.to_string()))
                .expect("commit");
        }

        let mut moved = store.post("pst-a").expect("load").expect("present");
        moved.idea_id = Some("ida-y".to_string());
        let moved = store
            .commit_post(moved, &Allocation::NextForIdea("ida-y".to_string()))
            .expect("relink");
        assert_eq!(moved.sequence, Some(2));
        assert_eq!(moved.direct_entry_sequence, None);
    }

    #[test]
    fn duplicate_sequence_is_a_conflict() {
        let mut store = store();
        let first = Post {
            id: "pst-1".to_string(),
            idea_id: Some("ida-x".to_string()),
            ..Post::default()
        };
        store
            .commit_post(first, &Allocation::NextForIdea("ida-x".to_string()))
            .expect("commit");

        let clash = Post {
            id: "pst-2".to_string(),
            idea_id: Some("ida-x".to_string()),
            sequence: Some(1),
            ..Post::default()
        };
        let err = store
            .commit_post(clash, &Allocation::Keep)
            .expect_err("duplicate must conflict");
        assert!(err.is_conflict(), "unexpected error: {err:?}");
        assert!(store.post("pst-2").expect("lookup").is_none());
    }

    #[test]
    fn counter_moved_by_another_writer_is_a_conflict() {
        let store = store();
        let err = advance_counter(store.connection(), DIRECT_ENTRY_COUNTER, 5, 6)
            .expect_err("stale expected value");
        assert!(err.is_conflict());
        assert_eq!(store.direct_entry_counter().expect("counter"), 0);
    }

    #[test]
    fn unparseable_dates_load_as_unset() {
        let store = store();
        store
            .connection()
            .execute(
                "INSERT INTO posts (
                    post_id, status, publish_date, publish_time, repurpose_date,
                    is_evergreen, created_at_us, updated_at_us
                 ) VALUES ('pst-bad', 'scheduled', 'not-a-date', '25:99', '2024-02-30', 1, 0, 0)",
                [],
            )
            .expect("insert raw row");

        let post = store.post("pst-bad").expect("load").expect("present");
        assert_eq!(post.publish_date, None);
        assert_eq!(post.publish_time, None);
        assert_eq!(post.repurpose_date, None);
    }

    #[test]
    fn legacy_archived_status_loads_as_archived_published() {
        let store = store();
        store
            .connection()
            .execute(
                "INSERT INTO posts (post_id, status, created_at_us, updated_at_us)
                 VALUES ('pst-old', 'archived', 0, 0)",
                [],
            )
            .expect("insert raw row");

        let post = store.post("pst-old").expect("load").expect("present");
        assert_eq!(post.status, PostStatus::Published);
        assert!(post.archived);
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let store = store();
        store
            .connection()
            .execute(
                "INSERT INTO posts (post_id, status, created_at_us, updated_at_us)
                 VALUES ('pst-odd', 'live', 0, 0)",
                [],
            )
            .expect("insert raw row");

        let err = store.post("pst-odd").expect_err("corrupt");
        assert!(matches!(err, StoreError::Corrupt { kind: "post", .. }));
    }
}
