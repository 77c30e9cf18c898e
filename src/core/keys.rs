// Strong newtypes for the identifiers that flow through the services.
// Composite keys render to the exact legacy document ids, so records written
// by previous deployments keep resolving.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity-provider user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Id of a title in the `content` collection (anime, series, movie).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(String);

impl TitleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TitleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TitleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Zero-based episode index within a title.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EpisodeIndex(pub u32);

impl EpisodeIndex {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EpisodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EpisodeIndex {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// Composite key of a per-user per-episode reaction document.
///
/// Renders as `{userId}_{titleId}_ep{episodeIndex}`, the legacy key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReactionKey {
    pub user: UserId,
    pub title: TitleId,
    pub episode: EpisodeIndex,
}

impl ReactionKey {
    pub fn new(user: UserId, title: TitleId, episode: EpisodeIndex) -> Self {
        Self {
            user,
            title,
            episode,
        }
    }
}

impl fmt::Display for ReactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_ep{}", self.user, self.title, self.episode)
    }
}

/// Composite key of a per-user per-title rating document.
///
/// Renders as `{userId}_{titleId}`, the legacy key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RatingKey {
    pub user: UserId,
    pub title: TitleId,
}

impl RatingKey {
    pub fn new(user: UserId, title: TitleId) -> Self {
        Self { user, title }
    }
}

impl fmt::Display for RatingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.user, self.title)
    }
}
