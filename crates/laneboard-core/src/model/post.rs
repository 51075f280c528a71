use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// Distribution lanes a post can be scheduled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    Instagram,
    X,
    Facebook,
    Tiktok,
    Youtube,
    Newsletter,
    Blog,
}

impl Platform {
    pub const ALL: [Self; 8] = [
        Self::Linkedin,
        Self::Instagram,
        Self::X,
        Self::Facebook,
        Self::Tiktok,
        Self::Youtube,
        Self::Newsletter,
        Self::Blog,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::Instagram => "instagram",
            Self::X => "x",
            Self::Facebook => "facebook",
            Self::Tiktok => "tiktok",
            Self::Youtube => "youtube",
            Self::Newsletter => "newsletter",
            Self::Blog => "blog",
        }
    }
}

/// Stored lifecycle status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
}

impl PostStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Published => "published",
        }
    }

    /// Parse a stored status, folding the legacy `archived` value into
    /// `published` plus the archived flag.
    ///
    /// # Errors
    ///
    /// Returns [`ParseEnumError`] for anything other than the three statuses
    /// or `archived`.
    pub fn parse_stored(s: &str) -> Result<(Self, bool), ParseEnumError> {
        if normalize(s) == "archived" {
            return Ok((Self::Published, true));
        }
        s.parse().map(|status| (status, false))
    }
}

/// A unit of content scheduled into a lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: String,
    /// Backing idea; `None` marks a direct entry.
    pub idea_id: Option<String>,
    /// Ordinal among posts sharing `idea_id`.
    pub sequence: Option<u32>,
    /// Board-wide ordinal for direct entries.
    pub direct_entry_sequence: Option<u32>,
    pub platform: Option<Platform>,
    pub title: String,
    pub body: String,
    pub status: PostStatus,
    pub archived: bool,
    pub is_locked: bool,
    pub definitive_pillar: Option<String>,
    pub publish_date: Option<NaiveDate>,
    pub publish_time: Option<NaiveTime>,
    pub is_evergreen: bool,
    pub repurpose_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: String::new(),
            idea_id: None,
            sequence: None,
            direct_entry_sequence: None,
            platform: None,
            title: String::new(),
            body: String::new(),
            status: PostStatus::Draft,
            archived: false,
            is_locked: false,
            definitive_pillar: None,
            publish_date: None,
            publish_time: None,
            is_evergreen: false,
            repurpose_date: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
        }
    }
}

impl Post {
    /// True when the post has no backing idea.
    #[must_use]
    pub const fn is_direct_entry(&self) -> bool {
        self.idea_id.is_none()
    }

    /// Publish date combined with time-of-day (midnight when the time is unset).
    #[must_use]
    pub fn publish_instant(&self) -> Option<NaiveDateTime> {
        self.publish_date
            .map(|date| date.and_time(self.publish_time.unwrap_or(NaiveTime::MIN)))
    }

    /// Last activity: the later of `updated_at` and `created_at`.
    #[must_use]
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.updated_at.max(self.created_at)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "linkedin" => Ok(Self::Linkedin),
            "instagram" => Ok(Self::Instagram),
            "x" | "twitter" => Ok(Self::X),
            "facebook" => Ok(Self::Facebook),
            "tiktok" => Ok(Self::Tiktok),
            "youtube" => Ok(Self::Youtube),
            "newsletter" => Ok(Self::Newsletter),
            "blog" => Ok(Self::Blog),
            _ => Err(ParseEnumError {
                expected: "lane",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for PostStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "published" => Ok(Self::Published),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Platform, Post, PostStatus};
    use chrono::{NaiveDate, NaiveTime};
    use std::str::FromStr;

    #[test]
    fn enum_json_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&Platform::Linkedin).expect("serialize"),
            "\"linkedin\""
        );
        assert_eq!(
            serde_json::to_string(&PostStatus::Scheduled).expect("serialize"),
            "\"scheduled\""
        );
        assert_eq!(
            serde_json::from_str::<Platform>("\"newsletter\"").expect("deserialize"),
            Platform::Newsletter
        );
    }

    #[test]
    fn display_parse_roundtrips() {
        for value in Platform::ALL {
            assert_eq!(Platform::from_str(&value.to_string()), Ok(value));
        }

        for value in [PostStatus::Draft, PostStatus::Scheduled, PostStatus::Published] {
            assert_eq!(PostStatus::from_str(&value.to_string()), Ok(value));
        }
    }

    #[test]
    fn twitter_is_an_alias_for_x() {
        assert_eq!(Platform::from_str(" Twitter "), Ok(Platform::X));
    }

    #[test]
    fn legacy_archived_status_normalizes_to_published() {
        assert_eq!(
            PostStatus::parse_stored("archived"),
            Ok((PostStatus::Published, true))
        );
        assert_eq!(
            PostStatus::parse_stored("scheduled"),
            Ok((PostStatus::Scheduled, false))
        );
        assert!(PostStatus::from_str("archived").is_err());
        assert!(PostStatus::parse_stored("live").is_err());
    }

    #[test]
    fn publish_instant_defaults_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date");
        let mut post = Post {
            publish_date: Some(date),
            ..Post::default()
        };
        assert_eq!(post.publish_instant(), Some(date.and_time(NaiveTime::MIN)));

        let time = NaiveTime::from_hms_opt(14, 30, 0).expect("valid time");
        post.publish_time = Some(time);
        assert_eq!(post.publish_instant(), Some(date.and_time(time)));

        post.publish_date = None;
        assert_eq!(post.publish_instant(), None);
    }

    #[test]
    fn default_post_is_an_unsaved_draft() {
        let post = Post::default();
        assert_eq!(post.status, PostStatus::Draft);
        assert!(post.is_direct_entry());
        assert!(!post.is_locked);
        assert!(post.sequence.is_none());
        assert!(post.direct_entry_sequence.is_none());
    }
}
