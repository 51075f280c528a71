use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

use super::{ParseEnumError, Post, normalize};

/// Lifecycle of an idea on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaStatus {
    #[default]
    Incubating,
    Ready,
    Archived,
}

impl IdeaStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incubating => "incubating",
            Self::Ready => "ready",
            Self::Archived => "archived",
        }
    }
}

/// An unscheduled content seed. Posts reference ideas; they never own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Idea {
    pub id: String,
    /// Board-wide monotonic, human-readable number.
    pub idea_number: u32,
    pub title: String,
    pub body: String,
    pub pillar: Option<String>,
    pub status: IdeaStatus,
    pub resource_links: Vec<String>,
    /// Reference to an audio note; the bytes live elsewhere.
    pub audio_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Idea {
    fn default() -> Self {
        Self {
            id: String::new(),
            idea_number: 0,
            title: String::new(),
            body: String::new(),
            pillar: None,
            status: IdeaStatus::Incubating,
            resource_links: Vec::new(),
            audio_ref: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }
}

/// Fields supplied when creating an idea; id and number are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIdea {
    pub title: String,
    pub body: String,
    pub pillar: Option<String>,
    pub status: IdeaStatus,
    pub resource_links: Vec<String>,
    pub audio_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Id-keyed view over a loaded set of ideas.
#[derive(Debug, Clone, Default)]
pub struct IdeaIndex<'a> {
    by_id: HashMap<&'a str, &'a Idea>,
}

impl<'a> IdeaIndex<'a> {
    #[must_use]
    pub fn new(ideas: &'a [Idea]) -> Self {
        Self {
            by_id: ideas.iter().map(|idea| (idea.id.as_str(), idea)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a Idea> {
        self.by_id.get(id).copied()
    }

    /// The idea a post links to, if it still exists.
    #[must_use]
    pub fn for_post(&self, post: &Post) -> Option<&'a Idea> {
        post.idea_id.as_deref().and_then(|id| self.get(id))
    }
}

impl fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdeaStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "incubating" => Ok(Self::Incubating),
            "ready" => Ok(Self::Ready),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseEnumError {
                expected: "idea status",
                got: s.to_string(),
            }),
        }
    }
}
