use anyhow::Result;
use clap::Args;
use laneboard_core::ordering::{SortMode, build_board};
use laneboard_core::store::BoardStore;
use std::io::Write;
use std::path::Path;

use super::lane::{LaneRows, lane_query};
use super::{Board, index};
use crate::output::{OutputMode, Renderable, render_mode};

#[derive(Args, Debug)]
pub struct BoardArgs {
    /// Ordering applied to every lane.
    #[arg(long)]
    pub sort: Option<SortMode>,

    /// Include archived posts.
    #[arg(long)]
    pub archived: bool,
}

/// Execute `lb board`: every visible lane, in configured order.
///
/// # Errors
///
/// Returns an error if the board is not initialized or the store fails.
pub fn run_board(args: &BoardArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let board = Board::open(project_root)?;
    let posts = board.store.posts()?;
    let ideas = board.store.ideas()?;
    let query = lane_query(&board, args.sort, args.archived);

    let lanes: Vec<LaneRows> = build_board(&posts, &index(&ideas), &board.config, &query)
        .into_iter()
        .map(LaneRows::from)
        .collect();

    render_mode(
        output,
        &lanes,
        |lanes, w| {
            for lane in lanes {
                writeln!(w, "[{}]", lane.platform)?;
                for post in &lane.posts {
                    post.render_table(w)?;
                }
            }
            Ok(())
        },
        |lanes, w| {
            for lane in lanes {
                lane.render_pretty(w)?;
                writeln!(w)?;
            }
            Ok(())
        },
    )
}
