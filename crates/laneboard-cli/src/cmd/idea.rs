//! `lb idea`: manage the ideas posts are drawn from.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use laneboard_core::clock::{Clock, SystemClock};
use laneboard_core::model::{Idea, IdeaStatus, NewIdea};
use laneboard_core::store::{BoardStore, StoreError, resolve_idea};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

use super::{Board, PostRow, index};
use crate::output::{
    OutputMode, Renderable, pretty_kv, pretty_rule, pretty_section, render_list, render_mode,
    write_list,
};

#[derive(Subcommand, Debug)]
pub enum IdeaCommand {
    /// Record a new idea.
    Add(AddArgs),
    /// List ideas in number order.
    List,
    /// Show one idea and the posts drawn from it.
    Show(ShowArgs),
    /// Delete an idea. Its posts stay on the board as orphans.
    Delete(ShowArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(short, long)]
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub body: String,

    /// Content pillar id.
    #[arg(long)]
    pub pillar: Option<String>,

    /// Resource link (repeatable).
    #[arg(long = "link")]
    pub links: Vec<String>,

    /// Reference to a recorded audio note.
    #[arg(long)]
    pub audio_ref: Option<String>,

    #[arg(long, default_value = "incubating")]
    pub status: IdeaStatus,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Idea number (`3`, `#3`) or id.
    pub idea: String,
}

/// Idea as shown in lists and detail views.
#[derive(Debug, Serialize)]
pub struct IdeaRow {
    pub id: String,
    pub idea_number: u32,
    pub title: String,
    pub status: IdeaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pillar: Option<String>,
    pub resource_links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Idea> for IdeaRow {
    fn from(idea: &Idea) -> Self {
        Self {
            id: idea.id.clone(),
            idea_number: idea.idea_number,
            title: idea.title.clone(),
            status: idea.status,
            pillar: idea.pillar.clone(),
            resource_links: idea.resource_links.clone(),
            audio_ref: idea.audio_ref.clone(),
            created_at: idea.created_at,
        }
    }
}

impl Renderable for IdeaRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "#{}  {}", self.idea_number, self.title)?;
        pretty_kv(w, "Status", self.status.as_str())?;
        if let Some(pillar) = &self.pillar {
            pretty_kv(w, "Pillar", pillar)?;
        }
        for link in &self.resource_links {
            pretty_kv(w, "Link", link)?;
        }
        if let Some(audio) = &self.audio_ref {
            pretty_kv(w, "Audio", audio)?;
        }
        pretty_kv(w, "ID", &self.id)?;
        pretty_rule(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "#{}\t{}\t{}\t{}",
            self.idea_number, self.status, self.id, self.title
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["number", "status", "id", "title"]
    }
}

#[derive(Debug, Serialize)]
struct IdeaDetail {
    idea: IdeaRow,
    posts: Vec<PostRow>,
}

#[derive(Debug, Serialize)]
struct DeleteReport {
    id: String,
    idea_number: u32,
    orphaned_posts: usize,
}

/// Execute `lb idea <subcommand>`.
///
/// # Errors
///
/// Returns an error if the board is not initialized, the idea cannot be
/// resolved, or the store fails.
pub fn run_idea(command: &IdeaCommand, output: OutputMode, project_root: &Path) -> Result<()> {
    let Board { mut store, .. } = Board::open(project_root)?;
    match command {
        IdeaCommand::Add(args) => {
            let idea = store
                .create_idea(NewIdea {
                    title: args.title.clone(),
                    body: args.body.clone(),
                    pillar: args.pillar.clone(),
                    status: args.status,
                    resource_links: args.links.clone(),
                    audio_ref: args.audio_ref.clone(),
                    created_at: SystemClock.now(),
                })
                .context("create idea")?;
            info!(idea_id = %idea.id, idea_number = idea.idea_number, "created idea");
            render_mode(
                output,
                &IdeaRow::from(&idea),
                |row, w| writeln!(w, "#{}\t{}", row.idea_number, row.id),
                |row, w| {
                    writeln!(w, "✓ Created idea #{}", row.idea_number)?;
                    row.render_human(w)
                },
            )
        }
        IdeaCommand::List => {
            let rows: Vec<IdeaRow> = store.ideas()?.iter().map(IdeaRow::from).collect();
            render_list(&rows, output)
        }
        IdeaCommand::Show(args) => {
            let idea = resolve_idea(&store, &args.idea)?;
            let mut posts = store.posts_for_idea(&idea.id)?;
            posts.sort_by_key(|post| post.sequence);
            let ideas = [idea];
            let lookup = index(&ideas);
            let now = SystemClock.local_now();
            let detail = IdeaDetail {
                posts: posts
                    .iter()
                    .map(|post| PostRow::new(post, &lookup, now))
                    .collect(),
                idea: IdeaRow::from(&ideas[0]),
            };
            render_mode(
                output,
                &detail,
                |d, w| {
                    d.idea.render_table(w)?;
                    for post in &d.posts {
                        post.render_table(w)?;
                    }
                    Ok(())
                },
                |d, w| {
                    d.idea.render_human(w)?;
                    if !d.posts.is_empty() {
                        pretty_section(w, "Posts")?;
                        write_list(w, &d.posts, OutputMode::Pretty).map_err(io::Error::other)?;
                    }
                    Ok(())
                },
            )
        }
        IdeaCommand::Delete(args) => {
            let idea = resolve_idea(&store, &args.idea)?;
            let orphaned_posts = store.posts_for_idea(&idea.id)?.len();
            if !store.delete_idea(&idea.id)? {
                return Err(StoreError::NotFound {
                    kind: "idea",
                    id: idea.id,
                }
                .into());
            }
            info!(idea_id = %idea.id, orphaned_posts, "deleted idea");
            let report = DeleteReport {
                id: idea.id,
                idea_number: idea.idea_number,
                orphaned_posts,
            };
            render_mode(
                output,
                &report,
                |r, w| writeln!(w, "deleted #{}\t{}", r.idea_number, r.orphaned_posts),
                |r, w| {
                    writeln!(w, "✓ Deleted idea #{}", r.idea_number)?;
                    if r.orphaned_posts > 0 {
                        writeln!(
                            w,
                            "  {} post(s) keep their numbers and now show as orphaned.",
                            r.orphaned_posts
                        )?;
                    }
                    Ok(())
                },
            )
        }
    }
}
