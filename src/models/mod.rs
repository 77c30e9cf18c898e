// Persisted document types. Field names (via serde renames) and collection
// names are a compatibility contract with records already in the store, so
// they stay camelCase on the wire regardless of Rust naming.

use serde::{Deserialize, Serialize};

use crate::core::{EpisodeIndex, TitleId, UserId};

/// Collection names in the document store.
pub mod collections {
    pub const USERS: &str = "users";
    pub const FRIEND_REQUESTS: &str = "friend_requests";
    pub const FRIENDS: &str = "friends";
    pub const VIDEO_REACTIONS: &str = "video_reactions";
    pub const RATINGS: &str = "ratings";
    pub const CONTENT: &str = "content";
}

/// Profile subset read from `users/{id}`. Owned by the identity layer;
/// never written here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
}

/// Pending friend request, `friend_requests` collection. Ephemeral: deleted
/// on accept or reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestDoc {
    pub from: UserId,
    pub from_username: String,
    pub to: UserId,
    pub to_username: String,
    pub time: i64,
    pub status: RequestStatus,
}

/// One directional half of a friendship, `friends` collection. A friendship
/// is exactly two of these, one per direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendshipEdgeDoc {
    pub user_id: UserId,
    pub username: String,
    pub friend_id: UserId,
    pub friend_username: String,
    pub time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

/// Per-user per-episode reaction, `video_reactions` collection, keyed by
/// [`crate::core::ReactionKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionDoc {
    pub user_id: UserId,
    pub anime_id: TitleId,
    pub episode: EpisodeIndex,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
    pub time: i64,
}

/// Per-user per-title star rating, `ratings` collection, keyed by
/// [`crate::core::RatingKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingDoc {
    pub user_id: UserId,
    pub anime_id: TitleId,
    pub stars: u8,
    pub time: i64,
}

/// Derived rating aggregate, merged onto the title's own `content` document.
/// Recomputed from a full scan on every rating write, never incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleAggregate {
    #[serde(default)]
    pub avg_rating: f64,
    #[serde(default)]
    pub ratings_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn friend_request_wire_format() {
        let doc = FriendRequestDoc {
            from: "a".into(),
            from_username: "alice".to_string(),
            to: "b".into(),
            to_username: "bob".to_string(),
            time: 1000,
            status: RequestStatus::Pending,
        };
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "from": "a",
                "fromUsername": "alice",
                "to": "b",
                "toUsername": "bob",
                "time": 1000,
                "status": "pending",
            })
        );
    }

    #[test]
    fn reaction_wire_format_uses_type_field() {
        let doc = ReactionDoc {
            user_id: "u".into(),
            anime_id: "t".into(),
            episode: EpisodeIndex(2),
            kind: ReactionKind::Dislike,
            time: 5,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], json!("dislike"));
        assert_eq!(value["animeId"], json!("t"));
        assert_eq!(value["episode"], json!(2));
    }

    #[test]
    fn aggregate_fields_default_when_absent() {
        let aggregate: TitleAggregate = serde_json::from_value(json!({
            "title": "Some Show",
            "avgRating": 4.5,
        }))
        .unwrap();
        assert_eq!(aggregate.avg_rating, 4.5);
        assert_eq!(aggregate.ratings_count, 0);
    }
}
