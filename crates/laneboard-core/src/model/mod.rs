//! Board records: ideas, posts, and content pillars.

pub mod idea;
pub mod pillar;
pub mod post;

use std::fmt;

pub use idea::{Idea, IdeaIndex, IdeaStatus, NewIdea};
pub use pillar::{Pillar, PillarSet};
pub use post::{Platform, Post, PostStatus};

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}
