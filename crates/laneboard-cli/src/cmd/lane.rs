use anyhow::Result;
use clap::Args;
use laneboard_core::clock::{Clock, SystemClock};
use laneboard_core::model::Platform;
use laneboard_core::ordering::{LaneQuery, LaneView, SortMode, build_lane};
use laneboard_core::store::BoardStore;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use super::{Board, PostRow, index};
use crate::output::{OutputMode, pretty_section, render_mode, write_list};

#[derive(Args, Debug)]
pub struct LaneArgs {
    /// Lane to show.
    pub platform: Platform,

    /// Ordering: `scheduled` (by publish time) or `freshness` (recently touched first).
    #[arg(long)]
    pub sort: Option<SortMode>,

    /// Include archived posts.
    #[arg(long)]
    pub archived: bool,
}

/// A lane flattened into printable rows.
#[derive(Debug, Serialize)]
pub struct LaneRows {
    pub platform: Platform,
    pub mode: SortMode,
    pub posts: Vec<PostRow>,
}

impl From<LaneView<'_>> for LaneRows {
    fn from(view: LaneView<'_>) -> Self {
        Self {
            platform: view.platform,
            mode: view.mode,
            posts: view
                .entries
                .into_iter()
                .map(|entry| {
                    PostRow::with_status(
                        entry.post,
                        entry.display_id.to_string(),
                        entry.display_status,
                    )
                })
                .collect(),
        }
    }
}

impl LaneRows {
    pub fn render_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("{} ({}, {})", self.platform, self.mode, self.posts.len()))?;
        if self.posts.is_empty() {
            return writeln!(w, "  (empty)");
        }
        write_list(w, &self.posts, OutputMode::Pretty).map_err(io::Error::other)
    }
}

/// Build the query for a lane or board render from flags and config.
pub fn lane_query(board: &Board, sort: Option<SortMode>, archived: bool) -> LaneQuery {
    let mode = sort.unwrap_or(board.config.ordering.default_mode);
    let mut query = LaneQuery::from_config(&board.config, mode, SystemClock.local_now());
    query.include_archived |= archived;
    query
}

/// Execute `lb lane <platform>`.
///
/// # Errors
///
/// Returns an error if the board is not initialized or the store fails.
pub fn run_lane(args: &LaneArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let board = Board::open(project_root)?;
    let posts = board.store.posts()?;
    let ideas = board.store.ideas()?;
    let query = lane_query(&board, args.sort, args.archived);

    let lane = LaneRows::from(build_lane(args.platform, &posts, &index(&ideas), &query));
    render_mode(
        output,
        &lane,
        |l, w| write_list(w, &l.posts, OutputMode::Text).map_err(io::Error::other),
        LaneRows::render_pretty,
    )
}
