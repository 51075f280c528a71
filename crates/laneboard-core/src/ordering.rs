//! Lane ordering and presentation status.
//!
//! Both sort modes produce a total order; the post id is the last
//! discriminator so equal posts never swap between renders.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

use crate::config::BoardConfig;
use crate::identity::{DisplayId, format_id};
use crate::model::{IdeaIndex, ParseEnumError, Platform, Post, PostStatus};

/// How a lane is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Earliest publish instant first; undated posts last.
    #[default]
    Scheduled,
    /// Most recently touched first.
    Freshness,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => f.write_str("scheduled"),
            Self::Freshness => f.write_str("freshness"),
        }
    }
}

impl FromStr for SortMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" | "schedule" | "date" => Ok(Self::Scheduled),
            "freshness" | "fresh" | "recent" => Ok(Self::Freshness),
            _ => Err(ParseEnumError {
                expected: "sort mode",
                got: s.to_string(),
            }),
        }
    }
}

/// Status as shown on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Draft,
    Scheduled,
    Published,
    Overdue,
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Published => "published",
            Self::Overdue => "overdue",
        })
    }
}

/// Tunables for ordering, taken from [`BoardConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingSettings {
    pub freshness_threshold_ms: i64,
}

impl Default for OrderingSettings {
    fn default() -> Self {
        Self {
            freshness_threshold_ms: 2_000,
        }
    }
}

/// Publish date combined with time-of-day, if the post is dated.
#[must_use]
pub fn effective_publish_instant(post: &Post) -> Option<NaiveDateTime> {
    post.publish_instant()
}

/// Derive the status to display at `now` (board-local).
///
/// A scheduled post whose publish instant has passed shows as overdue. The
/// stored status is left alone.
#[must_use]
pub fn display_status(post: &Post, now: NaiveDateTime) -> DisplayStatus {
    match post.status {
        PostStatus::Draft => DisplayStatus::Draft,
        PostStatus::Published => DisplayStatus::Published,
        PostStatus::Scheduled => match effective_publish_instant(post) {
            Some(instant) if instant < now => DisplayStatus::Overdue,
            _ => DisplayStatus::Scheduled,
        },
    }
}

/// Order `posts` for display under `mode`.
pub fn sort_lane<'a, I>(
    posts: I,
    mode: SortMode,
    ideas: &IdeaIndex<'_>,
    settings: OrderingSettings,
) -> Vec<&'a Post>
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut sorted: Vec<&Post> = posts.into_iter().collect();
    match mode {
        SortMode::Scheduled => {
            sorted.sort_by(|a, b| compare_scheduled(a, b));
            sorted
        }
        SortMode::Freshness => order_by_freshness(sorted, ideas, settings),
    }
}

fn compare_scheduled(a: &Post, b: &Post) -> Ordering {
    let by_instant = match (effective_publish_instant(a), effective_publish_instant(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_instant
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Freshness ordering.
///
/// Posts are walked newest-activity first. Each cluster is anchored on its
/// newest member, and a post more than the threshold older than that anchor
/// starts a new cluster. Every pair inside a cluster is therefore within the
/// threshold; those posts are treated as written concurrently and ordered by
/// the tie-break cascade instead of by their raw timestamps.
fn order_by_freshness<'a>(
    mut posts: Vec<&'a Post>,
    ideas: &IdeaIndex<'_>,
    settings: OrderingSettings,
) -> Vec<&'a Post> {
    posts.sort_by(|a, b| {
        b.activity_at()
            .cmp(&a.activity_at())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut ordered = Vec::with_capacity(posts.len());
    let mut cluster: Vec<&Post> = Vec::new();

    for post in posts {
        if let Some(anchor) = cluster.first() {
            let gap = (anchor.activity_at() - post.activity_at()).num_milliseconds();
            if gap > settings.freshness_threshold_ms {
                flush_cluster(&mut cluster, &mut ordered, ideas);
            }
        }
        cluster.push(post);
    }
    flush_cluster(&mut cluster, &mut ordered, ideas);

    ordered
}

fn flush_cluster<'a>(
    cluster: &mut Vec<&'a Post>,
    ordered: &mut Vec<&'a Post>,
    ideas: &IdeaIndex<'_>,
) {
    cluster.sort_by(|a, b| compare_concurrent(a, b, ideas));
    ordered.append(cluster);
}

fn compare_concurrent(a: &Post, b: &Post, ideas: &IdeaIndex<'_>) -> Ordering {
    let idea_number = |post: &Post| ideas.for_post(post).map(|idea| idea.idea_number);
    let sequence = |post: &Post| post.idea_id.as_ref().and(post.sequence);
    let direct = |post: &Post| {
        if post.is_direct_entry() {
            post.direct_entry_sequence
        } else {
            None
        }
    };

    idea_number(b)
        .cmp(&idea_number(a))
        .then_with(|| sequence(b).cmp(&sequence(a)))
        .then_with(|| direct(b).cmp(&direct(a)))
        .then_with(|| b.activity_at().cmp(&a.activity_at()))
        .then_with(|| a.id.cmp(&b.id))
}

/// One post as rendered in a lane.
#[derive(Debug, Clone, Serialize)]
pub struct LaneEntry<'a> {
    pub display_id: DisplayId,
    pub display_status: DisplayStatus,
    pub post: &'a Post,
}

/// A lane with its ordered entries.
#[derive(Debug, Clone, Serialize)]
pub struct LaneView<'a> {
    pub platform: Platform,
    pub mode: SortMode,
    pub entries: Vec<LaneEntry<'a>>,
}

/// Render-time parameters for a lane or board.
#[derive(Debug, Clone, Copy)]
pub struct LaneQuery {
    pub mode: SortMode,
    /// Board-local wall clock.
    pub now: NaiveDateTime,
    pub include_archived: bool,
    pub settings: OrderingSettings,
}

impl LaneQuery {
    #[must_use]
    pub const fn from_config(config: &BoardConfig, mode: SortMode, now: NaiveDateTime) -> Self {
        Self {
            mode,
            now,
            include_archived: config.ordering.show_archived,
            settings: config.ordering_settings(),
        }
    }
}

/// Build one lane: filter to `platform`, order, and derive display fields.
#[must_use]
pub fn build_lane<'a>(
    platform: Platform,
    posts: &'a [Post],
    ideas: &IdeaIndex<'_>,
    query: &LaneQuery,
) -> LaneView<'a> {
    let members = posts
        .iter()
        .filter(|post| post.platform == Some(platform))
        .filter(|post| query.include_archived || !post.archived);

    let entries = sort_lane(members, query.mode, ideas, query.settings)
        .into_iter()
        .map(|post| LaneEntry {
            display_id: format_id(post, ideas.for_post(post)),
            display_status: display_status(post, query.now),
            post,
        })
        .collect();

    LaneView {
        platform,
        mode: query.mode,
        entries,
    }
}

/// Build every visible lane, in configured order.
#[must_use]
pub fn build_board<'a>(
    posts: &'a [Post],
    ideas: &IdeaIndex<'_>,
    config: &BoardConfig,
    query: &LaneQuery,
) -> Vec<LaneView<'a>> {
    config
        .lanes
        .visible
        .iter()
        .map(|platform| build_lane(*platform, posts, ideas, query))
        .collect()
}
