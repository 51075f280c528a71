//! `lb post`: the write surface for posts.
//!
//! Every write goes through the core save session, so validation and
//! sequence allocation behave the same here as in any other caller.

use anyhow::{Context as _, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Subcommand};
use laneboard_core::clock::{Clock, SystemClock};
use laneboard_core::identity::format_id;
use laneboard_core::model::{Platform, Post, PostStatus};
use laneboard_core::ordering::display_status;
use laneboard_core::session::{SaveOptions, SaveOutcome, approve_post, save_post};
use laneboard_core::store::{BoardStore, SqliteStore, StoreError, resolve_idea, resolve_post};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use super::{Board, PostRow};
use crate::output::{OutputMode, Renderable, pretty_kv, pretty_section, render_mode};

#[derive(Subcommand, Debug)]
pub enum PostCommand {
    /// Create a post, optionally linked to an idea.
    Create(CreateArgs),
    /// Edit fields of an existing post.
    Update(UpdateArgs),
    /// Approve (lock) a post. Approval cannot be undone.
    Approve(PostRef),
    /// Show one post.
    Show(PostRef),
    /// Delete a post. Its number is never reused.
    Delete(PostRef),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[arg(short, long, default_value = "")]
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub body: String,

    /// Distribution lane (linkedin, instagram, x, facebook, tiktok, youtube, newsletter, blog).
    #[arg(short, long)]
    pub lane: Option<Platform>,

    /// Idea to draw from (number or id). Omit for a direct entry.
    #[arg(long)]
    pub idea: Option<String>,

    #[arg(short, long, default_value = "draft")]
    pub status: PostStatus,

    /// Definitive content pillar id.
    #[arg(long)]
    pub pillar: Option<String>,

    /// Publish date (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Publish time (HH:MM).
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    /// Mark as evergreen content.
    #[arg(long)]
    pub evergreen: bool,

    /// Repurpose date for evergreen posts (defaults to publish date + cycle).
    #[arg(long)]
    pub repurpose: Option<NaiveDate>,

    /// Approve the post as part of this save.
    #[arg(long)]
    pub approve: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Post to edit: display id (`POST-3-2`, `POST-D007`), id, or unique id prefix.
    pub post: String,

    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub body: Option<String>,

    #[arg(short, long)]
    pub lane: Option<Platform>,

    /// Link to a different idea (number or id).
    #[arg(long, conflicts_with = "unlink")]
    pub idea: Option<String>,

    /// Drop the idea link and number the post as a direct entry.
    #[arg(long)]
    pub unlink: bool,

    #[arg(short, long)]
    pub status: Option<PostStatus>,

    #[arg(long)]
    pub pillar: Option<String>,

    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    #[arg(long, conflicts_with = "no_evergreen")]
    pub evergreen: bool,

    #[arg(long)]
    pub no_evergreen: bool,

    #[arg(long)]
    pub repurpose: Option<NaiveDate>,

    #[arg(long, conflicts_with = "unarchive")]
    pub archive: bool,

    #[arg(long)]
    pub unarchive: bool,

    #[arg(long)]
    pub approve: bool,
}

#[derive(Args, Debug)]
pub struct PostRef {
    /// Display id (`POST-3-2`, `POST-D007`), id, or unique id prefix.
    pub post: String,
}

/// Full post detail for `post show` and the result of a save.
#[derive(Debug, Serialize)]
struct PostDetail {
    #[serde(flatten)]
    row: PostRow,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
}

impl PostDetail {
    fn render_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        self.row.render_human(w)?;
        if let Some(idea_id) = &self.row.idea_id {
            pretty_kv(w, "Idea", idea_id)?;
        }
        if !self.body.is_empty() {
            pretty_section(w, "Body")?;
            writeln!(w, "{}", self.body)?;
        }
        Ok(())
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
}

/// Execute `lb post <subcommand>`.
///
/// # Errors
///
/// Returns an error if the board is not initialized, a post or idea cannot be
/// resolved, the save is rejected, or the store fails.
pub fn run_post(command: &PostCommand, output: OutputMode, project_root: &Path) -> Result<()> {
    let Board { config, mut store } = Board::open(project_root)?;
    match command {
        PostCommand::Create(args) => {
            let idea_id = args
                .idea
                .as_deref()
                .map(|reference| resolve_idea(&store, reference))
                .transpose()?
                .map(|idea| idea.id);
            let draft = Post {
                title: args.title.clone(),
                body: args.body.clone(),
                platform: args.lane,
                idea_id,
                status: args.status,
                definitive_pillar: args.pillar.clone(),
                publish_date: args.date,
                publish_time: args.time,
                is_evergreen: args.evergreen,
                repurpose_date: args.repurpose,
                ..Post::default()
            };
            let options = SaveOptions {
                approve: args.approve,
            };
            let outcome = save_post(&mut store, &config, &SystemClock, draft, options)
                .context("save post")?;
            render_saved(output, "Created", outcome)
        }
        PostCommand::Update(args) => {
            let mut post = resolve_post(&store, &args.post)?;
            apply_update(&store, &mut post, args)?;
            let options = SaveOptions {
                approve: args.approve,
            };
            let outcome = save_post(&mut store, &config, &SystemClock, post, options)
                .context("save post")?;
            render_saved(output, "Updated", outcome)
        }
        PostCommand::Approve(args) => {
            let post = resolve_post(&store, &args.post)?;
            let outcome = approve_post(&mut store, &config, &SystemClock, &post.id)
                .context("approve post")?;
            render_saved(output, "Approved", outcome)
        }
        PostCommand::Show(args) => {
            let post = resolve_post(&store, &args.post)?;
            let idea = match post.idea_id.as_deref() {
                Some(idea_id) => store.idea(idea_id)?,
                None => None,
            };
            let detail = PostDetail {
                row: PostRow::with_status(
                    &post,
                    format_id(&post, idea.as_ref()).to_string(),
                    display_status(&post, SystemClock.local_now()),
                ),
                body: post.body.clone(),
                attempts: None,
            };
            render_mode(
                output,
                &detail,
                |d, w| d.row.render_table(w),
                PostDetail::render_pretty,
            )
        }
        PostCommand::Delete(args) => {
            let post = resolve_post(&store, &args.post)?;
            let idea = match post.idea_id.as_deref() {
                Some(idea_id) => store.idea(idea_id)?,
                None => None,
            };
            let display_id = format_id(&post, idea.as_ref()).to_string();
            if !store.delete_post(&post.id)? {
                return Err(StoreError::NotFound {
                    kind: "post",
                    id: post.id,
                }
                .into());
            }
            tracing::info!(post_id = %post.id, %display_id, "deleted post");
            let report = serde_json::json!({ "id": post.id, "display_id": display_id });
            render_mode(
                output,
                &report,
                |_, w| writeln!(w, "deleted {display_id}"),
                |_, w| writeln!(w, "✓ Deleted {display_id}"),
            )
        }
    }
}

fn apply_update(store: &SqliteStore, post: &mut Post, args: &UpdateArgs) -> Result<()> {
    if let Some(title) = &args.title {
        post.title.clone_from(title);
    }
    if let Some(body) = &args.body {
        post.body.clone_from(body);
    }
    if args.lane.is_some() {
        post.platform = args.lane;
    }
    if let Some(reference) = &args.idea {
        post.idea_id = Some(resolve_idea(store, reference)?.id);
    }
    if args.unlink {
        post.idea_id = None;
    }
    if let Some(status) = args.status {
        post.status = status;
    }
    if args.pillar.is_some() {
        post.definitive_pillar.clone_from(&args.pillar);
    }
    if args.date.is_some() {
        post.publish_date = args.date;
    }
    if args.time.is_some() {
        post.publish_time = args.time;
    }
    if args.evergreen {
        post.is_evergreen = true;
    }
    if args.no_evergreen {
        post.is_evergreen = false;
        post.repurpose_date = None;
    }
    if args.repurpose.is_some() {
        post.repurpose_date = args.repurpose;
    }
    if args.archive {
        post.archived = true;
    }
    if args.unarchive {
        post.archived = false;
    }
    Ok(())
}

fn render_saved(output: OutputMode, verb: &str, outcome: SaveOutcome) -> Result<()> {
    let SaveOutcome {
        post,
        display_id,
        attempts,
    } = outcome;
    let detail = PostDetail {
        row: PostRow::with_status(
            &post,
            display_id.to_string(),
            display_status(&post, SystemClock.local_now()),
        ),
        body: post.body,
        attempts: Some(attempts),
    };
    render_mode(
        output,
        &detail,
        |d, w| writeln!(w, "{}\t{}", d.row.display_id, d.row.id),
        |d, w| {
            writeln!(w, "✓ {verb} {}", d.row.display_id)?;
            d.render_pretty(w)
        },
    )
}
