//! The save session: the one write path for posts.
//!
//! A save loads the stored record, applies the caller's approval intent,
//! validates, stamps timestamps, and commits through the store with the
//! sequence allocation folded into the same atomic unit. Conflicts reported
//! by the store are retried against fresh state a bounded number of times.

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::BoardConfig;
use crate::error::ErrorCode;
use crate::evergreen::{default_repurpose_date, next_cycle_date};
use crate::identity::{Allocation, DisplayId, carry_numbers, format_id, new_opaque_id, plan_allocation};
use crate::lifecycle::{
    Rejection, ValidationContext, check_lock_transition, normalize_for_save, validate,
};
use crate::model::{Post, PostStatus};
use crate::store::{BoardStore, StoreError};

/// Caller intents that accompany a save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Approve the post: set its lock before validation runs.
    pub approve: bool,
}

/// A committed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub post: Post,
    pub display_id: DisplayId,
    /// Commit attempts used, including the successful one.
    pub attempts: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("sequence allocation still conflicting after {attempts} attempts")]
    AllocationConflict { attempts: u32 },
    #[error("idea '{idea_id}' does not exist")]
    UnknownIdea { idea_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SaveError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected(_) => ErrorCode::ValidationRejected,
            Self::AllocationConflict { .. } => ErrorCode::AllocationConflict,
            Self::UnknownIdea { .. } => ErrorCode::UnknownIdea,
            Self::Store(err) => err.code(),
        }
    }
}

/// Validate and persist `draft`.
///
/// An empty `draft.id` creates a new post. Otherwise the stored record with
/// that id (if any) is the previous version: its `created_at` and, when the
/// idea link is unchanged, its sequence numbers carry over.
///
/// # Errors
///
/// - [`SaveError::Rejected`] when the post fails validation or would lose
///   its approval lock
/// - [`SaveError::UnknownIdea`] when linking to an idea that does not exist
/// - [`SaveError::AllocationConflict`] when every commit attempt lost a race
/// - [`SaveError::Store`] for any other storage failure
pub fn save_post<S, C>(
    store: &mut S,
    config: &BoardConfig,
    clock: &C,
    mut draft: Post,
    options: SaveOptions,
) -> Result<SaveOutcome, SaveError>
where
    S: BoardStore + ?Sized,
    C: Clock + ?Sized,
{
    let previous = if draft.id.is_empty() {
        None
    } else {
        store.post(&draft.id)?
    };

    if options.approve {
        draft.is_locked = true;
    }

    let today = clock.local_now().date();
    if draft.is_evergreen && draft.repurpose_date.is_none() {
        // Drafts lose their publish date on save, so they count from today.
        let anchor = draft
            .publish_date
            .filter(|_| draft.status != PostStatus::Draft);
        draft.repurpose_date = Some(default_repurpose_date(
            anchor,
            config.evergreen.cycle_days,
            today,
        ));
    }

    let pillars = config.pillar_set();
    let checked = check_lock_transition(previous.as_ref(), &draft).and_then(|()| {
        validate(
            &draft,
            &ValidationContext {
                pillars: &pillars,
                today,
            },
        )
    });
    if let Err(rejection) = checked {
        debug!(post_id = %draft.id, code = rejection.reason.code(), "save rejected");
        return Err(rejection.into());
    }
    normalize_for_save(&mut draft);

    let now = clock.now();
    draft.created_at = previous.as_ref().map_or(now, |prev| prev.created_at);
    draft.updated_at = now;
    if draft.id.is_empty() {
        draft.id = new_opaque_id("pst", &draft.title);
    }

    let allocation = plan_allocation(previous.as_ref(), &draft);
    if allocation == Allocation::Keep {
        carry_numbers(previous.as_ref(), &mut draft);
    }

    let idea = match draft.idea_id.as_deref() {
        Some(idea_id) => store.idea(idea_id)?,
        None => None,
    };
    if let (Allocation::NextForIdea(idea_id), None) = (&allocation, &idea) {
        return Err(SaveError::UnknownIdea {
            idea_id: idea_id.clone(),
        });
    }
    debug!(post_id = %draft.id, ?allocation, "planned sequence allocation");

    let max_attempts = config.allocation.max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match store.commit_post(draft.clone(), &allocation) {
            Ok(post) => {
                let display_id = format_id(&post, idea.as_ref());
                info!(
                    post_id = %post.id,
                    display_id = %display_id,
                    status = %post.status,
                    attempts,
                    "saved post"
                );
                return Ok(SaveOutcome {
                    post,
                    display_id,
                    attempts,
                });
            }
            Err(err) if err.is_conflict() && attempts < max_attempts => {
                warn!(post_id = %draft.id, attempts, max_attempts, error = %err, "allocation conflict; retrying");
            }
            Err(err) if err.is_conflict() => {
                warn!(post_id = %draft.id, attempts, error = %err, "allocation conflict; giving up");
                return Err(SaveError::AllocationConflict { attempts });
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Approve a stored post: lock it and re-save.
///
/// # Errors
///
/// Returns [`SaveError::Store`] with `NotFound` when `post_id` is unknown,
/// plus anything [`save_post`] can return.
pub fn approve_post<S, C>(
    store: &mut S,
    config: &BoardConfig,
    clock: &C,
    post_id: &str,
) -> Result<SaveOutcome, SaveError>
where
    S: BoardStore + ?Sized,
    C: Clock + ?Sized,
{
    let post = load(store, post_id)?;
    save_post(store, config, clock, post, SaveOptions { approve: true })
}

/// Roll a resurfaced evergreen post forward to its next cycle boundary.
///
/// # Errors
///
/// Returns [`SaveError::Store`] with `NotFound` when `post_id` is unknown,
/// plus anything [`save_post`] can return.
pub fn roll_forward<S, C>(
    store: &mut S,
    config: &BoardConfig,
    clock: &C,
    post_id: &str,
) -> Result<SaveOutcome, SaveError>
where
    S: BoardStore + ?Sized,
    C: Clock + ?Sized,
{
    let mut post = load(store, post_id)?;
    let today = clock.local_now().date();
    let anchor = post.publish_date.or(post.repurpose_date).unwrap_or(today);
    post.repurpose_date = Some(next_cycle_date(anchor, config.evergreen.cycle_days, today));
    save_post(store, config, clock, post, SaveOptions::default())
}

fn load<S: BoardStore + ?Sized>(store: &S, post_id: &str) -> Result<Post, SaveError> {
    store.post(post_id)?.ok_or_else(|| {
        SaveError::Store(StoreError::NotFound {
            kind: "post",
            id: post_id.to_string(),
        })
    })
}
