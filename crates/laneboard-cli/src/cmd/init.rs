use anyhow::{Context as _, Result};
use clap::Args;
use laneboard_core::config::{BOARD_DIR, board_db_path, board_dir, write_default_config};
use laneboard_core::store::SqliteStore;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::output::{OutputMode, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-run initialization even if `.laneboard/` already exists.
    ///
    /// Existing config and data are kept; only missing pieces are created.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitReport {
    board_dir: String,
    config: String,
    database: String,
}

/// Execute `lb init`. Creates the board skeleton:
///
/// ```text
/// .laneboard/
///   config.toml       (default board config)
///   board.sqlite3     (migrated to the latest schema)
/// ```
///
/// # Errors
///
/// Returns an error if `.laneboard/` already exists and `--force` is not set,
/// or if the config or database cannot be created.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let dir = board_dir(project_root);
    if dir.exists() && !args.force {
        anyhow::bail!("{BOARD_DIR}/ already exists. Use `lb init --force` to reinitialize.");
    }

    let config_path = write_default_config(project_root)?;
    let db_path = board_db_path(project_root);
    SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to create board database: {}", db_path.display()))?;
    info!(path = %dir.display(), "initialized board");

    let report = InitReport {
        board_dir: dir.display().to_string(),
        config: config_path.display().to_string(),
        database: db_path.display().to_string(),
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "initialized {}", r.board_dir),
        |r, w| {
            writeln!(w, "✓ Initialized {BOARD_DIR}/ board.")?;
            writeln!(w)?;
            writeln!(w, "  Config:   {}", r.config)?;
            writeln!(w, "  Database: {}", r.database)?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  lb idea add --title \"Spring launch\"")?;
            writeln!(w, "  lb post create --title \"Teaser\" --lane instagram --idea 1")
        },
    )
}
