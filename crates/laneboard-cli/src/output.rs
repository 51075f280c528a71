//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, compact text for agents and pipes,
//! or stable JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / `--json` flag
//! 2. `FORMAT` env var
//! 3. `output` in the user config
//! 4. Default: pretty if stdout is a TTY, text if piped

use anyhow::Error;
use clap::ValueEnum;
use laneboard_core::error::ErrorCode;
use laneboard_core::model::ParseEnumError;
use laneboard_core::session::SaveError;
use laneboard_core::store::StoreError;
use serde::Serialize;
use std::io::{self, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, visual framing).
    Pretty,
    /// Token-efficient plain text for agents and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Map the resolved output name from the board config layer.
    pub fn from_resolved(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Text,
        }
    }
}

/// Trait implemented by CLI result types rendered as list rows.
pub trait Renderable: Serialize {
    /// Render for human consumption: labelled, multi-line.
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Render as a single tab-separated text row (see [`Renderable::table_headers`]).
    fn render_table(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Column headers for text mode, in the same order as `render_table` fields.
    fn table_headers() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }
}

/// Write a list of [`Renderable`] rows in the given mode.
///
/// - JSON: one array
/// - text: header line plus one row per item
/// - pretty: each item's human block
pub fn write_list<R: Renderable>(
    w: &mut dyn Write,
    items: &[R],
    mode: OutputMode,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, items)?;
            writeln!(w)?;
        }
        OutputMode::Text => {
            let headers = R::table_headers();
            if !items.is_empty() && !headers.is_empty() {
                writeln!(w, "{}", headers.join("\t"))?;
            }
            for item in items {
                item.render_table(w)?;
            }
        }
        OutputMode::Pretty => {
            for item in items {
                item.render_human(w)?;
            }
        }
    }
    Ok(())
}

/// Render a list of [`Renderable`] rows to stdout.
pub fn render_list<R: Renderable>(items: &[R], mode: OutputMode) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_list(&mut out, items, mode)
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// A structured error with optional hint and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. `E2003`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Build from a command failure, classifying it by the first typed error
    /// found in its chain.
    pub fn from_anyhow(err: &Error) -> Self {
        let code = classify(err);
        Self {
            message: format!("{err:#}"),
            suggestion: code.and_then(ErrorCode::hint).map(str::to_string),
            error_code: code.map(|c| c.code().to_string()),
        }
    }
}

fn classify(err: &Error) -> Option<ErrorCode> {
    err.chain().find_map(|cause| {
        if let Some(save) = cause.downcast_ref::<SaveError>() {
            return Some(save.code());
        }
        if let Some(store) = cause.downcast_ref::<StoreError>() {
            return Some(store.code());
        }
        if cause.downcast_ref::<crate::cmd::NotInitialized>().is_some() {
            return Some(ErrorCode::NotInitialized);
        }
        if cause.downcast_ref::<ParseEnumError>().is_some() {
            return Some(ErrorCode::InvalidEnumValue);
        }
        if cause.downcast_ref::<toml::de::Error>().is_some() {
            return Some(ErrorCode::ConfigParseError);
        }
        None
    })
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  hint: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use laneboard_core::lifecycle::{PostField, Rejection, RejectionReason};

    #[derive(Serialize)]
    struct Row {
        id: &'static str,
    }

    impl Renderable for Row {
        fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
            pretty_kv(w, "ID", self.id)
        }

        fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
            writeln!(w, "{}", self.id)
        }

        fn table_headers() -> &'static [&'static str] {
            &["id"]
        }
    }

    #[test]
    fn resolved_names_map_to_modes() {
        assert_eq!(OutputMode::from_resolved("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_resolved("pretty"), OutputMode::Pretty);
        assert_eq!(OutputMode::from_resolved("text"), OutputMode::Text);
    }

    #[test]
    fn text_list_has_header_only_when_non_empty() {
        let mut buf = Vec::new();
        write_list(&mut buf, &[Row { id: "a" }, Row { id: "b" }], OutputMode::Text)
            .expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "id\na\nb\n");

        let mut empty = Vec::new();
        write_list::<Row>(&mut empty, &[], OutputMode::Text).expect("write");
        assert!(empty.is_empty());
    }

    #[test]
    fn json_list_is_one_array() {
        let mut buf = Vec::new();
        write_list(&mut buf, &[Row { id: "a" }], OutputMode::Json).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value[0]["id"], "a");
    }

    #[test]
    fn save_errors_carry_their_code_through_context() {
        let rejection = Rejection::new(RejectionReason::NoLane, PostField::Platform);
        let err = Err::<(), _>(SaveError::Rejected(rejection))
            .context("save post")
            .expect_err("error");
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2003"));
        assert!(cli.message.starts_with("save post: "));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn unknown_errors_have_no_code() {
        let cli = CliError::from_anyhow(&anyhow::anyhow!("boom"));
        assert_eq!(cli.error_code, None);
        assert_eq!(cli.message, "boom");
    }
}
