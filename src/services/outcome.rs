// Uniform result shapes for the UI layer. Every public service operation
// resolves to one of these; errors are converted at the boundary and never
// propagate to the caller. Wire field names stay camelCase for the
// embedding page scripts.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ReactionKind;

/// Baseline `{success, message}` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpOutcome {
    pub success: bool,
    pub message: String,
}

impl OpOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(err: &AppError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
        }
    }
}

/// Which branch of the three-way reaction toggle fired, so the caller can
/// bump a badge without a refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ToggleAction>,
}

impl ToggleOutcome {
    pub fn ok(message: impl Into<String>, action: ToggleAction) -> Self {
        Self {
            success: true,
            message: message.into(),
            action: Some(action),
        }
    }

    pub fn failed(err: &AppError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            action: None,
        }
    }
}

/// Aggregated reactions for one (title, episode) plus the caller's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionTotals {
    pub success: bool,
    pub likes_count: u64,
    pub dislikes_count: u64,
    pub user_reaction: Option<ReactionKind>,
}

impl ReactionTotals {
    pub fn empty(success: bool) -> Self {
        Self {
            success,
            likes_count: 0,
            dislikes_count: 0,
            user_reaction: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    pub success: bool,
    pub message: String,
    pub user_rating: Option<u8>,
    pub avg_rating: f64,
    pub ratings_count: u64,
}

impl RatingOutcome {
    pub fn failed(err: &AppError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            user_rating: None,
            avg_rating: 0.0,
            ratings_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRatingOutcome {
    pub success: bool,
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageRatingOutcome {
    pub success: bool,
    pub avg_rating: f64,
    pub ratings_count: u64,
}

/// Relation of the caller to another user. When several could match, the
/// precedence is: self-check first, then friends, then outgoing pending,
/// then incoming pending, else none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    NotAuth,
    #[serde(rename = "self")]
    Own,
    Friends,
    Pending,
    Incoming,
    None,
    Error,
}

impl FriendshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FriendshipStatus::NotAuth => "not_auth",
            FriendshipStatus::Own => "self",
            FriendshipStatus::Friends => "friends",
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Incoming => "incoming",
            FriendshipStatus::None => "none",
            FriendshipStatus::Error => "error",
        }
    }
}
