pub mod board;
pub mod config;
pub mod idea;
pub mod init;
pub mod lane;
pub mod post;
pub mod resurface;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use laneboard_core::config::{BoardConfig, board_db_path, is_initialized, load_board_config};
use laneboard_core::identity::format_id;
use laneboard_core::model::{Idea, IdeaIndex, Platform, Post, PostStatus};
use laneboard_core::ordering::{DisplayStatus, display_status};
use laneboard_core::store::SqliteStore;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use crate::output::{Renderable, pretty_kv, pretty_rule};

/// No `.laneboard/` directory under the working directory.
#[derive(Debug)]
pub struct NotInitialized;

impl fmt::Display for NotInitialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no laneboard board in this directory")
    }
}

impl std::error::Error for NotInitialized {}

/// An opened board: its config and store.
pub struct Board {
    pub config: BoardConfig,
    pub store: SqliteStore,
}

impl Board {
    pub fn open(project_root: &Path) -> Result<Self> {
        if !is_initialized(project_root) {
            return Err(NotInitialized.into());
        }
        let config = load_board_config(project_root)?;
        let store = SqliteStore::open(&board_db_path(project_root))
            .context("open board database")?;
        Ok(Self { config, store })
    }
}

/// One post as printed by `post`, `lane`, `board`, and `resurface`.
#[derive(Debug, Serialize)]
pub struct PostRow {
    pub id: String,
    pub display_id: String,
    pub lane: Option<Platform>,
    pub status: PostStatus,
    pub display_status: DisplayStatus,
    pub locked: bool,
    pub archived: bool,
    pub title: String,
    pub idea_id: Option<String>,
    pub pillar: Option<String>,
    pub publish_date: Option<NaiveDate>,
    pub publish_time: Option<NaiveTime>,
    pub evergreen: bool,
    pub repurpose_date: Option<NaiveDate>,
}

impl PostRow {
    pub fn new(post: &Post, ideas: &IdeaIndex<'_>, now: NaiveDateTime) -> Self {
        Self::with_status(
            post,
            format_id(post, ideas.for_post(post)).to_string(),
            display_status(post, now),
        )
    }

    pub fn with_status(post: &Post, display_id: String, status: DisplayStatus) -> Self {
        Self {
            id: post.id.clone(),
            display_id,
            lane: post.platform,
            status: post.status,
            display_status: status,
            locked: post.is_locked,
            archived: post.archived,
            title: post.title.clone(),
            idea_id: post.idea_id.clone(),
            pillar: post.definitive_pillar.clone(),
            publish_date: post.publish_date,
            publish_time: post.publish_time,
            evergreen: post.is_evergreen,
            repurpose_date: post.repurpose_date,
        }
    }

    fn when(&self) -> String {
        match (self.publish_date, self.publish_time) {
            (Some(date), Some(time)) => format!("{date} {}", time.format("%H:%M")),
            (Some(date), None) => date.to_string(),
            _ => "-".to_string(),
        }
    }
}

impl Renderable for PostRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let lock = if self.locked { " [approved]" } else { "" };
        writeln!(w, "{}  {}{lock}", self.display_id, self.title)?;
        pretty_kv(w, "Status", self.display_status.to_string())?;
        pretty_kv(
            w,
            "Lane",
            self.lane.map_or_else(|| "-".to_string(), |p| p.to_string()),
        )?;
        pretty_kv(w, "When", self.when())?;
        if let Some(pillar) = &self.pillar {
            pretty_kv(w, "Pillar", pillar)?;
        }
        if self.evergreen {
            pretty_kv(
                w,
                "Repurpose",
                self.repurpose_date
                    .map_or_else(|| "-".to_string(), |d| d.to_string()),
            )?;
        }
        pretty_kv(w, "ID", &self.id)?;
        pretty_rule(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.display_id,
            self.lane.map_or("-", Platform::as_str),
            self.display_status,
            self.when(),
            self.id,
            self.title
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["display_id", "lane", "status", "when", "id", "title"]
    }
}

/// Index over a loaded idea list.
pub fn index(ideas: &[Idea]) -> IdeaIndex<'_> {
    IdeaIndex::new(ideas)
}
