//! The board database: `.laneboard/board.sqlite3`.
//!
//! One file holds ideas, posts, and the counters that hand out idea numbers
//! and direct-entry numbers. Posts reference ideas by id without a foreign
//! key, so deleting an idea leaves its posts (and their numbers) in place as
//! orphans.
//!
//! Saves from several `lb` processes serialize on the SQLite write lock. WAL
//! keeps board renders readable during a save, and the busy timeout makes a
//! second writer wait for the lock rather than surface `SQLITE_BUSY` at once.

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// How long a save waits for another process's write lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the board database at `path`, creating `.laneboard/` and the file on
/// first use, and bring the schema up to date.
///
/// # Errors
///
/// Returns an error if opening, configuring, or migrating the database fails.
pub fn open_board(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create board db directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open board database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply board migrations")?;

    Ok(conn)
}

/// In-memory board with the full schema. Counters start at zero.
///
/// # Errors
///
/// Returns an error if the schema cannot be applied.
pub fn open_board_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory board database")?;
    migrations::migrate(&mut conn).context("apply board migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BUSY_TIMEOUT, open_board, open_board_in_memory};
    use crate::db::migrations;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(".laneboard").join("board.sqlite3");
        (dir, path)
    }

    #[test]
    fn open_board_sets_wal_and_busy_timeout() {
        let (_dir, path) = temp_db_path();
        let conn = open_board(&path).expect("open board db");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );
    }

    #[test]
    fn open_board_creates_parent_dir_and_migrates() {
        let (_dir, path) = temp_db_path();
        let conn = open_board(&path).expect("open board db");
        assert!(path.exists());

        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn in_memory_board_starts_with_zeroed_counters() {
        let conn = open_board_in_memory().expect("open in-memory board");
        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);

        let total: i64 = conn
            .query_row("SELECT COALESCE(SUM(value), -1) FROM counters", [], |row| {
                row.get(0)
            })
            .expect("sum counters");
        assert_eq!(total, 0);
    }

    #[test]
    fn reopening_a_board_keeps_its_counters() {
        let (_dir, path) = temp_db_path();
        {
            let conn = open_board(&path).expect("open board db");
            conn.execute(
                "UPDATE counters SET value = 7 WHERE name = 'direct_entry'",
                [],
            )
            .expect("advance counter");
        }
        let conn = open_board(&path).expect("reopen board db");
        let direct: i64 = conn
            .query_row(
                "SELECT value FROM counters WHERE name = 'direct_entry'",
                [],
                |row| row.get(0),
            )
            .expect("read counter");
        assert_eq!(direct, 7);
    }
}
