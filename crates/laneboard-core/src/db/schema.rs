//! SQLite schema for a board database.
//!
//! - `ideas` holds idea records; `idea_number` is unique board-wide
//! - `posts` has no foreign key to `ideas`, so deleting an idea orphans its
//!   posts instead of removing them
//! - partial unique indexes reject duplicate sequences within an idea and
//!   duplicate direct-entry numbers
//! - `counters` holds the monotonic direct-entry and idea-number counters

/// Migration v1: records, counters, and uniqueness guards.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS ideas (
    idea_id TEXT PRIMARY KEY,
    idea_number INTEGER NOT NULL UNIQUE CHECK (idea_number > 0),
    title TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL DEFAULT '',
    pillar TEXT,
    status TEXT NOT NULL DEFAULT 'incubating'
        CHECK (status IN ('incubating', 'ready', 'archived')),
    resource_links_json TEXT NOT NULL DEFAULT '[]',
    audio_ref TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (idea_id LIKE 'ida-%')
);

CREATE TABLE IF NOT EXISTS posts (
    post_id TEXT PRIMARY KEY,
    idea_id TEXT,
    sequence INTEGER CHECK (sequence IS NULL OR sequence > 0),
    direct_entry_sequence INTEGER
        CHECK (direct_entry_sequence IS NULL OR direct_entry_sequence > 0),
    platform TEXT,
    title TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'draft',
    is_archived INTEGER NOT NULL DEFAULT 0 CHECK (is_archived IN (0, 1)),
    is_locked INTEGER NOT NULL DEFAULT 0 CHECK (is_locked IN (0, 1)),
    definitive_pillar TEXT,
    publish_date TEXT,
    publish_time TEXT,
    is_evergreen INTEGER NOT NULL DEFAULT 0 CHECK (is_evergreen IN (0, 1)),
    repurpose_date TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_idea_sequence
    ON posts(idea_id, sequence)
    WHERE idea_id IS NOT NULL AND sequence IS NOT NULL;

CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_direct_entry
    ON posts(direct_entry_sequence)
    WHERE idea_id IS NULL AND direct_entry_sequence IS NOT NULL;

CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL DEFAULT 0 CHECK (value >= 0)
);

INSERT OR IGNORE INTO counters (name, value) VALUES ('direct_entry', 0);
INSERT OR IGNORE INTO counters (name, value) VALUES ('idea_number', 0);

CREATE TABLE IF NOT EXISTS board_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO board_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes for lane and resurfacing queries.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_posts_platform_status
    ON posts(platform, status, is_archived);

CREATE INDEX IF NOT EXISTS idx_posts_evergreen_repurpose
    ON posts(is_evergreen, repurpose_date);

CREATE INDEX IF NOT EXISTS idx_posts_idea
    ON posts(idea_id);

UPDATE board_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by the store's lookup paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_posts_idea_sequence",
    "idx_posts_direct_entry",
    "idx_posts_platform_status",
    "idx_posts_evergreen_repurpose",
    "idx_posts_idea",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn migrated() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;
        Ok(conn)
    }

    fn insert_post(
        conn: &Connection,
        post_id: &str,
        idea_id: Option<&str>,
        sequence: Option<i64>,
        direct: Option<i64>,
    ) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO posts (
                post_id, idea_id, sequence, direct_entry_sequence,
                created_at_us, updated_at_us
             ) VALUES (?1, ?2, ?3, ?4, 0, 0)",
            params![post_id, idea_id, sequence, direct],
        )
    }

    fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }

    #[test]
    fn duplicate_sequence_within_idea_is_rejected() -> rusqlite::Result<()> {
        let conn = migrated()?;
        insert_post(&conn, "pst-1", Some("ida-a"), Some(1), None)?;
        insert_post(&conn, "pst-2", Some("ida-b"), Some(1), None)?;

        let err = insert_post(&conn, "pst-3", Some("ida-a"), Some(1), None)
            .expect_err("same idea and sequence");
        assert!(is_unique_violation(&err), "unexpected error: {err:?}");
        Ok(())
    }

    #[test]
    fn duplicate_direct_entry_number_is_rejected() -> rusqlite::Result<()> {
        let conn = migrated()?;
        insert_post(&conn, "pst-1", None, None, Some(4))?;

        let err =
            insert_post(&conn, "pst-2", None, None, Some(4)).expect_err("same direct number");
        assert!(is_unique_violation(&err), "unexpected error: {err:?}");

        // Unnumbered posts never collide.
        insert_post(&conn, "pst-3", None, None, None)?;
        insert_post(&conn, "pst-4", None, None, None)?;
        Ok(())
    }

    #[test]
    fn query_plan_uses_resurface_index() -> rusqlite::Result<()> {
        let conn = migrated()?;
        let mut stmt = conn.prepare(
            "EXPLAIN QUERY PLAN
             SELECT post_id FROM posts
             WHERE is_evergreen = 1 AND repurpose_date <= '2024-06-01'",
        )?;
        let details = stmt
            .query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_posts_evergreen_repurpose")),
            "expected resurface index in plan, got: {details:?}"
        );
        Ok(())
    }
}
