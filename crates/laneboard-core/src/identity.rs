//! Post identifiers: display formatting and sequence allocation.
//!
//! Two numbering schemes coexist:
//! - idea-linked posts are `POST-<idea_number>-<sequence>`, where `sequence`
//!   is unique among posts of the same idea
//! - direct entries are `POST-D<nnn>`, numbered from one board-wide counter
//!
//! Formatting is pure and never allocates. Allocation is computed here as
//! `max + 1` but only ever committed by a store inside one atomic unit (see
//! [`crate::store::BoardStore::commit_post`]).

use serde::Serialize;
use std::fmt;

use crate::model::{Idea, Post};

/// What a post's identifier currently resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DisplayId {
    /// Fully allocated, persisted identifier.
    Resolved { id: String },
    /// Not yet allocated. Never persisted.
    Pending { idea_number: Option<u32> },
    /// The linked idea can no longer be resolved. Display only.
    Orphaned { sequence: Option<u32> },
}

impl DisplayId {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved { id } => f.write_str(id),
            Self::Pending { idea_number: None } => f.write_str("POST-PENDING"),
            Self::Pending {
                idea_number: Some(number),
            } => write!(f, "POST-{number}-PENDING"),
            Self::Orphaned { sequence: None } => f.write_str("POST-ORPHAN"),
            Self::Orphaned {
                sequence: Some(sequence),
            } => write!(f, "POST-ORPHAN-{sequence}"),
        }
    }
}

/// Format the display identifier of `post`.
///
/// `idea` is the post's linked idea if the caller could load it. An idea whose
/// id does not match `post.idea_id` counts as unresolvable.
#[must_use]
pub fn format_id(post: &Post, idea: Option<&Idea>) -> DisplayId {
    let Some(idea_id) = post.idea_id.as_deref() else {
        return match post.direct_entry_sequence {
            Some(sequence) => DisplayId::Resolved {
                id: format!("POST-D{sequence:03}"),
            },
            None => DisplayId::Pending { idea_number: None },
        };
    };

    match idea.filter(|idea| idea.id == idea_id) {
        Some(idea) => match post.sequence {
            Some(sequence) => DisplayId::Resolved {
                id: format!("POST-{}-{sequence}", idea.idea_number),
            },
            None => DisplayId::Pending {
                idea_number: Some(idea.idea_number),
            },
        },
        None => {
            tracing::debug!(post_id = %post.id, idea_id, "post references an unresolvable idea");
            DisplayId::Orphaned {
                sequence: post.sequence,
            }
        }
    }
}

/// Next sequence for a post joining `idea_id`: `max(existing) + 1`, or `1`.
///
/// Gaps are never filled.
#[must_use]
pub fn next_sequence(existing: &[Post], idea_id: &str) -> u32 {
    existing
        .iter()
        .filter(|post| post.idea_id.as_deref() == Some(idea_id))
        .filter_map(|post| post.sequence)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Next direct-entry number given the current counter value.
#[must_use]
pub const fn next_direct_entry_sequence(counter: u32) -> u32 {
    counter.saturating_add(1)
}

/// How a save should treat the post's sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// Numbers already allocated for the current link are kept as-is.
    Keep,
    /// Allocate the next sequence within the given idea.
    NextForIdea(String),
    /// Allocate the next board-wide direct-entry number.
    NextDirectEntry,
}

/// Decide the allocation for saving `draft` over `previous`.
///
/// - same idea as before, sequence assigned: keep it
/// - linked to a new or different idea: recompute against that idea
/// - unlinked: keep an existing direct-entry number, else allocate one
#[must_use]
pub fn plan_allocation(previous: Option<&Post>, draft: &Post) -> Allocation {
    match draft.idea_id.as_deref() {
        Some(idea_id) => {
            let unchanged = previous.is_some_and(|prev| {
                prev.idea_id.as_deref() == Some(idea_id) && prev.sequence.is_some()
            });
            if unchanged {
                Allocation::Keep
            } else {
                Allocation::NextForIdea(idea_id.to_string())
            }
        }
        None => {
            let numbered = previous
                .is_some_and(|prev| prev.is_direct_entry() && prev.direct_entry_sequence.is_some());
            if numbered {
                Allocation::Keep
            } else {
                Allocation::NextDirectEntry
            }
        }
    }
}

/// Carry the previously allocated numbers onto `draft` for a [`Allocation::Keep`] save.
pub fn carry_numbers(previous: Option<&Post>, draft: &mut Post) {
    if let Some(prev) = previous {
        draft.sequence = prev.sequence;
        draft.direct_entry_sequence = prev.direct_entry_sequence;
    }
}

/// Stamp a freshly allocated number onto `post`, clearing the scheme it no
/// longer uses.
pub fn apply_allocated(post: &mut Post, allocation: &Allocation, number: u32) {
    match allocation {
        Allocation::Keep => {}
        Allocation::NextForIdea(_) => {
            post.sequence = Some(number);
            post.direct_entry_sequence = None;
        }
        Allocation::NextDirectEntry => {
            post.direct_entry_sequence = Some(number);
            post.sequence = None;
        }
    }
}

/// A parsed user-facing post reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRef {
    Linked { idea_number: u32, sequence: u32 },
    Direct { sequence: u32 },
}

/// Parse `POST-12-3` or `POST-D007` (case-insensitive).
#[must_use]
pub fn parse_display_id(text: &str) -> Option<DisplayRef> {
    let upper = text.trim().to_ascii_uppercase();
    let rest = upper.strip_prefix("POST-")?;

    if let Some(digits) = rest.strip_prefix('D') {
        return parse_number(digits).map(|sequence| DisplayRef::Direct { sequence });
    }

    let (idea, sequence) = rest.split_once('-')?;
    Some(DisplayRef::Linked {
        idea_number: parse_number(idea)?,
        sequence: parse_number(sequence)?,
    })
}

fn parse_number(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Derive an opaque record id such as `pst-3f9a0c1e7b2d`.
#[must_use]
pub fn new_opaque_id(prefix: &str, seed: &str) -> String {
    let salt: u64 = rand::random();
    let digest = blake3::hash(format!("{seed}:{salt}").as_bytes()).to_hex();
    format!("{prefix}-{}", &digest[..12])
}
