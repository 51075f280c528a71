use anyhow::{Context as _, Result};
use laneboard_core::config::{is_initialized, resolve_config};
use std::io::Write;
use std::path::Path;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Execute `lb config`: print the effective board and user configuration.
///
/// # Errors
///
/// Returns an error if either config file fails to parse.
pub fn run_config(output: OutputMode, cli_json: bool, project_root: &Path) -> Result<()> {
    let effective = resolve_config(project_root, cli_json)?;
    let board_toml =
        toml::to_string_pretty(&effective.board).context("Failed to render board config")?;
    let initialized = is_initialized(project_root);

    render_mode(
        output,
        &effective,
        |_, w| write!(w, "{board_toml}"),
        |e, w| {
            pretty_section(w, "Effective configuration")?;
            pretty_kv(w, "Board", if initialized { "initialized" } else { "defaults" })?;
            pretty_kv(w, "Output", &e.resolved_output)?;
            writeln!(w)?;
            write!(w, "{board_toml}")
        },
    )
}
