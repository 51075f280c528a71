//! Board schema versions.
//!
//! `PRAGMA user_version` is the source of truth; `board_meta.schema_version`
//! mirrors it for tools that only read tables. Migrations never touch the
//! `counters` rows once seeded, so an upgrade cannot hand out a number twice.

use super::schema;
use rusqlite::{Connection, types::Type};

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "records, counters and numbering guards",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "lane and resurface indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Schema version recorded in the board file.
///
/// # Errors
///
/// Returns an error if querying SQLite fails or the stored value is negative
/// or too large.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error))
    })
}

/// Upgrade the board to [`LATEST_SCHEMA_VERSION`], returning the version
/// reached.
///
/// A board written by a newer binary is left as is.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;
    let mut current = start;

    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        let version = i64::from(migration.version);
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.execute(
            "UPDATE board_meta SET schema_version = ?1 WHERE id = 1",
            [version],
        )?;
        tx.commit()?;
        tracing::debug!(
            version = migration.version,
            name = migration.name,
            "migrated board schema"
        );
        current = migration.version;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, current_schema_version, migrate};
    use crate::db::schema;
    use rusqlite::{Connection, params};

    fn sqlite_object_exists(
        conn: &Connection,
        object_type: &str,
        object_name: &str,
    ) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            )",
            params![object_type, object_name],
            |row| row.get(0),
        )
    }

    #[test]
    fn migrate_empty_db_to_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        let applied = migrate(&mut conn)?;
        assert_eq!(applied, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        for table in ["ideas", "posts", "counters", "board_meta"] {
            assert!(
                sqlite_object_exists(&conn, "table", table)?,
                "missing table {table}"
            );
        }
        for index in schema::REQUIRED_INDEXES {
            assert!(
                sqlite_object_exists(&conn, "index", index)?,
                "missing expected index {index}"
            );
        }

        let counters: i64 = conn.query_row("SELECT COUNT(*) FROM counters", [], |row| row.get(0))?;
        assert_eq!(counters, 2);

        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let meta_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM board_meta", [], |row| row.get(0))?;
        assert_eq!(meta_rows, 1);

        let schema_version: i64 = conn.query_row(
            "SELECT schema_version FROM board_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(schema_version, i64::from(LATEST_SCHEMA_VERSION));

        Ok(())
    }

    #[test]
    fn posts_outlive_their_idea() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        conn.execute_batch(
            "INSERT INTO ideas (idea_id, idea_number, title, created_at_us, updated_at_us)
                 VALUES ('ida-1', 1, 'launch', 0, 0);
             INSERT INTO posts (post_id, idea_id, sequence, title, created_at_us, updated_at_us)
                 VALUES ('pst-1', 'ida-1', 1, 'teaser', 0, 0);
             DELETE FROM ideas WHERE idea_id = 'ida-1';",
        )?;

        let (idea_id, sequence): (String, i64) = conn.query_row(
            "SELECT idea_id, sequence FROM posts WHERE post_id = 'pst-1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert_eq!(idea_id, "ida-1");
        assert_eq!(sequence, 1);

        Ok(())
    }

    #[test]
    fn migrate_upgrades_from_v1_keeping_counters() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        conn.execute_batch(schema::MIGRATION_V1_SQL)?;
        conn.pragma_update(None, "user_version", 1_i64)?;
        conn.execute(
            "UPDATE counters SET value = 12 WHERE name = 'direct_entry'",
            [],
        )?;

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);

        let direct: i64 = conn.query_row(
            "SELECT value FROM counters WHERE name = 'direct_entry'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(direct, 12);
        assert!(sqlite_object_exists(
            &conn,
            "index",
            "idx_posts_evergreen_repurpose"
        )?);

        Ok(())
    }
}
