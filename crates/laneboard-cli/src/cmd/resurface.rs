//! `lb resurface`: evergreen posts whose repurpose date has arrived.

use anyhow::{Context as _, Result};
use clap::Args;
use laneboard_core::clock::{Clock, SystemClock};
use laneboard_core::evergreen::resurface_queue;
use laneboard_core::session::roll_forward;
use laneboard_core::store::{BoardStore, resolve_post};
use std::io::Write;
use std::path::Path;

use super::{Board, PostRow, index};
use crate::output::{OutputMode, render_list, render_mode};

#[derive(Args, Debug)]
pub struct ResurfaceArgs {
    /// Roll a resurfaced post forward to its next cycle date instead of listing.
    #[arg(long, value_name = "POST")]
    pub roll: Option<String>,
}

/// Execute `lb resurface`.
///
/// # Errors
///
/// Returns an error if the board is not initialized, the post to roll cannot
/// be resolved, or the store fails.
pub fn run_resurface(args: &ResurfaceArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let Board { config, mut store } = Board::open(project_root)?;
    let now = SystemClock.local_now();

    if let Some(reference) = &args.roll {
        let post = resolve_post(&store, reference)?;
        let outcome = roll_forward(&mut store, &config, &SystemClock, &post.id)
            .context("roll evergreen post forward")?;
        let ideas = store.ideas()?;
        let row = PostRow::new(&outcome.post, &index(&ideas), now);
        return render_mode(
            output,
            &row,
            |r, w| {
                let next = r.repurpose_date.map(|d| d.to_string()).unwrap_or_default();
                writeln!(w, "{}\t{next}", r.display_id)
            },
            |r, w| {
                let next = r.repurpose_date.map(|d| d.to_string()).unwrap_or_default();
                writeln!(w, "✓ {} returns on {next}", r.display_id)
            },
        );
    }

    let posts = store.posts()?;
    let ideas = store.ideas()?;
    let lookup = index(&ideas);
    let rows: Vec<PostRow> = resurface_queue(&posts, now.date())
        .into_iter()
        .map(|post| PostRow::new(post, &lookup, now))
        .collect();
    render_list(&rows, output)
}
