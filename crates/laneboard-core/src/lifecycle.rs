//! Save-time validation gate for posts.
//!
//! [`validate`] is the single admission contract for a post's status and
//! fields. Rules run in a fixed order and the first failure wins:
//!
//! 1. title or body present
//! 2. lane selected
//! 3. drafts stop here
//! 4. `published` requires the approval lock
//! 5. a non-administrative pillar is set
//! 6. publish date and time are set
//! 7. a `scheduled` date is not before today (time-of-day ignored)
//! 8. evergreen posts have a repurpose date after the publish date
//!
//! The validator never mutates the post and never sets the lock on the
//! caller's behalf.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::model::{PillarSet, Post, PostStatus};

/// Why a post was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    EmptyContent,
    NoLane,
    NotApproved,
    PillarRequired,
    AdminPillarForbidden,
    DateRequired,
    TimeRequired,
    PastDate,
    RepurposeDateRequired,
    RepurposeBeforePublish,
    LockIrreversible,
}

impl RejectionReason {
    /// Stable code identifier (`V####`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EmptyContent => "V1001",
            Self::NoLane => "V1002",
            Self::NotApproved => "V2001",
            Self::LockIrreversible => "V2002",
            Self::PillarRequired => "V3001",
            Self::AdminPillarForbidden => "V3002",
            Self::DateRequired => "V4001",
            Self::TimeRequired => "V4002",
            Self::PastDate => "V4003",
            Self::RepurposeDateRequired => "V5001",
            Self::RepurposeBeforePublish => "V5002",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::EmptyContent => "Add a title or body before saving",
            Self::NoLane => "Choose a lane for this post",
            Self::NotApproved => "Approve (lock) the post before publishing",
            Self::LockIrreversible => "An approved post cannot be unlocked",
            Self::PillarRequired => "Pick a content pillar before scheduling",
            Self::AdminPillarForbidden => {
                "The administrative pillar cannot be used for scheduled or published posts"
            }
            Self::DateRequired => "Set a publish date",
            Self::TimeRequired => "Set a publish time",
            Self::PastDate => "A scheduled post cannot be dated in the past",
            Self::RepurposeDateRequired => "Evergreen posts need a repurpose date",
            Self::RepurposeBeforePublish => "The repurpose date must be after the publish date",
        }
    }
}

/// The field a rejection points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostField {
    Content,
    Platform,
    IsLocked,
    DefinitivePillar,
    PublishDate,
    PublishTime,
    RepurposeDate,
}

impl PostField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Platform => "platform",
            Self::IsLocked => "is_locked",
            Self::DefinitivePillar => "definitive_pillar",
            Self::PublishDate => "publish_date",
            Self::PublishTime => "publish_time",
            Self::RepurposeDate => "repurpose_date",
        }
    }
}

/// A user-correctable validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub field: PostField,
}

impl Rejection {
    #[must_use]
    pub const fn new(reason: RejectionReason, field: PostField) -> Self {
        Self { reason, field }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.reason.code(),
            self.reason.message(),
            self.field.as_str()
        )
    }
}

impl std::error::Error for Rejection {}

pub type ValidationResult = Result<(), Rejection>;

/// Inputs the validator needs besides the post itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub pillars: &'a PillarSet,
    /// Current board-local calendar date.
    pub today: NaiveDate,
}

/// Decide whether `draft` may be saved with its current status and fields.
///
/// # Errors
///
/// Returns the first failing rule as a [`Rejection`].
pub fn validate(draft: &Post, ctx: &ValidationContext<'_>) -> ValidationResult {
    use PostField as F;
    use RejectionReason as R;

    if draft.title.trim().is_empty() && draft.body.trim().is_empty() {
        return Err(Rejection::new(R::EmptyContent, F::Content));
    }

    if draft.platform.is_none() {
        return Err(Rejection::new(R::NoLane, F::Platform));
    }

    if draft.status == PostStatus::Draft {
        return Ok(());
    }

    if draft.status == PostStatus::Published && !draft.is_locked {
        return Err(Rejection::new(R::NotApproved, F::IsLocked));
    }

    let pillar = draft
        .definitive_pillar
        .as_deref()
        .and_then(|id| ctx.pillars.get(id))
        .ok_or(Rejection::new(R::PillarRequired, F::DefinitivePillar))?;
    if ctx.pillars.is_administrative(pillar) {
        return Err(Rejection::new(R::AdminPillarForbidden, F::DefinitivePillar));
    }

    let publish_date = draft
        .publish_date
        .ok_or(Rejection::new(R::DateRequired, F::PublishDate))?;
    if draft.publish_time.is_none() {
        return Err(Rejection::new(R::TimeRequired, F::PublishTime));
    }

    if draft.status == PostStatus::Scheduled && publish_date < ctx.today {
        return Err(Rejection::new(R::PastDate, F::PublishDate));
    }

    if draft.is_evergreen {
        let repurpose = draft
            .repurpose_date
            .ok_or(Rejection::new(R::RepurposeDateRequired, F::RepurposeDate))?;
        if repurpose <= publish_date {
            return Err(Rejection::new(R::RepurposeBeforePublish, F::RepurposeDate));
        }
    }

    Ok(())
}

/// Reject a save that would clear the approval lock of a stored, locked post.
///
/// # Errors
///
/// Returns [`RejectionReason::LockIrreversible`] when the lock would be lost.
pub fn check_lock_transition(previous: Option<&Post>, draft: &Post) -> ValidationResult {
    if previous.is_some_and(|prev| prev.is_locked) && !draft.is_locked {
        return Err(Rejection::new(
            RejectionReason::LockIrreversible,
            PostField::IsLocked,
        ));
    }
    Ok(())
}

/// Drop fields that carry no meaning for the post's status.
///
/// Drafts have no publish date or time.
pub fn normalize_for_save(post: &mut Post) {
    if post.status == PostStatus::Draft {
        post.publish_date = None;
        post.publish_time = None;
    }
}
