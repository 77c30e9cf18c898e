// Core types and primitives
pub mod keys;

pub use keys::{EpisodeIndex, RatingKey, ReactionKey, TitleId, UserId};

/// Millisecond wall-clock timestamp used on every stored document.
pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
