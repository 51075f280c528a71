//! Storage collaborator for ideas and posts.
//!
//! Sequence allocation and the post write happen together inside
//! [`BoardStore::commit_post`]. A store that detects a duplicate at commit
//! time reports [`StoreError::Conflict`]; the save session re-runs the commit
//! against fresh state.

pub mod memory;
pub mod sqlite;

use crate::error::ErrorCode;
use crate::identity::{Allocation, DisplayRef, parse_display_id};
use crate::model::{Idea, NewIdea, Post};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Failures reported by a [`BoardStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A concurrent writer claimed the same sequence; retry with fresh state.
    #[error("sequence conflict in {scope}")]
    Conflict { scope: String },
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("'{prefix}' matches {count} posts")]
    Ambiguous { prefix: String, count: usize },
    #[error("corrupt {kind} record '{id}': {detail}")]
    Corrupt {
        kind: &'static str,
        id: String,
        detail: String,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Conflict { .. } => ErrorCode::AllocationConflict,
            Self::NotFound { kind: "idea", .. } => ErrorCode::IdeaNotFound,
            Self::NotFound { .. } => ErrorCode::PostNotFound,
            Self::Ambiguous { .. } => ErrorCode::AmbiguousId,
            Self::Corrupt { .. } => ErrorCode::CorruptRecord,
            Self::Sqlite(_) => ErrorCode::StorageFailure,
        }
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Persistence for ideas and posts.
pub trait BoardStore {
    fn idea(&self, id: &str) -> Result<Option<Idea>, StoreError>;

    fn idea_by_number(&self, idea_number: u32) -> Result<Option<Idea>, StoreError>;

    /// All ideas, in idea-number order.
    fn ideas(&self) -> Result<Vec<Idea>, StoreError>;

    /// Insert an idea, assigning its id and the next idea number.
    fn create_idea(&mut self, idea: NewIdea) -> Result<Idea, StoreError>;

    fn update_idea(&mut self, idea: &Idea) -> Result<(), StoreError>;

    /// Remove an idea. Posts linking to it are left in place (orphaned).
    fn delete_idea(&mut self, id: &str) -> Result<bool, StoreError>;

    fn post(&self, id: &str) -> Result<Option<Post>, StoreError>;

    /// All posts, oldest first.
    fn posts(&self) -> Result<Vec<Post>, StoreError>;

    fn posts_for_idea(&self, idea_id: &str) -> Result<Vec<Post>, StoreError>;

    /// Posts numbered in the direct-entry scheme.
    fn direct_entry_posts(&self) -> Result<Vec<Post>, StoreError>;

    /// Current value of the board-wide direct-entry counter.
    fn direct_entry_counter(&self) -> Result<u32, StoreError>;

    /// Allocate per `allocation` and write `post` as one atomic unit.
    ///
    /// Returns the post as stored, with its allocated numbers.
    fn commit_post(&mut self, post: Post, allocation: &Allocation) -> Result<Post, StoreError>;

    fn delete_post(&mut self, id: &str) -> Result<bool, StoreError>;

    /// Look up a post by its legible id.
    fn post_by_display(&self, reference: DisplayRef) -> Result<Option<Post>, StoreError> {
        match reference {
            DisplayRef::Direct { sequence } => Ok(self
                .direct_entry_posts()?
                .into_iter()
                .find(|post| post.direct_entry_sequence == Some(sequence))),
            DisplayRef::Linked {
                idea_number,
                sequence,
            } => {
                let Some(idea) = self.idea_by_number(idea_number)? else {
                    return Ok(None);
                };
                Ok(self
                    .posts_for_idea(&idea.id)?
                    .into_iter()
                    .find(|post| post.sequence == Some(sequence)))
            }
        }
    }
}

/// Resolve user input to a post: a display id (`POST-12-3`, `POST-D007`),
/// an exact opaque id, or a unique opaque-id prefix.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] when nothing matches and
/// [`StoreError::Ambiguous`] when a prefix matches several posts.
pub fn resolve_post<S: BoardStore + ?Sized>(store: &S, text: &str) -> Result<Post, StoreError> {
    let not_found = || StoreError::NotFound {
        kind: "post",
        id: text.to_string(),
    };

    if let Some(reference) = parse_display_id(text) {
        return store.post_by_display(reference)?.ok_or_else(not_found);
    }

    let needle = text.trim();
    if let Some(post) = store.post(needle)? {
        return Ok(post);
    }

    let mut matches: Vec<Post> = store
        .posts()?
        .into_iter()
        .filter(|post| !needle.is_empty() && post.id.starts_with(needle))
        .collect();
    match matches.len() {
        0 => Err(not_found()),
        1 => Ok(matches.remove(0)),
        count => Err(StoreError::Ambiguous {
            prefix: needle.to_string(),
            count,
        }),
    }
}

/// Resolve user input to an idea: an exact id or its idea number.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] when nothing matches.
pub fn resolve_idea<S: BoardStore + ?Sized>(store: &S, text: &str) -> Result<Idea, StoreError> {
    let needle = text.trim();
    let by_number = needle
        .trim_start_matches('#')
        .parse::<u32>()
        .ok()
        .map(|number| store.idea_by_number(number))
        .transpose()?
        .flatten();

    match by_number {
        Some(idea) => Ok(idea),
        None => store.idea(needle)?.ok_or_else(|| StoreError::NotFound {
            kind: "idea",
            id: needle.to_string(),
        }),
    }
}
