// Reaction & rating service: per-episode like/dislike toggles and per-title
// star ratings with a materialized average on the title record.
//
// Reactions have no materialized counter; totals are a full scan per read.
// Ratings go the other way: every write synchronously rescans all ratings
// for the title and merges {avgRating, ratingsCount} onto the content
// document. That recompute is O(ratings for the title) per write, a
// deliberate simplicity-over-scalability tradeoff. The
// upsert and the aggregate merge are not one transaction; a crash between
// them leaves a stale aggregate until the next rating write.

use std::sync::Arc;

use tracing::{error, warn};

use crate::core::{current_time_millis, EpisodeIndex, RatingKey, ReactionKey, TitleId};
use crate::error::{AppError, AppResult};
use crate::identity::{AuthenticatedUser, IdentityProvider};
use crate::models::collections;
use crate::models::{RatingDoc, ReactionDoc, ReactionKind, TitleAggregate};
use crate::services::outcome::{
    AverageRatingOutcome, RatingOutcome, ReactionTotals, ToggleAction, ToggleOutcome,
    UserRatingOutcome,
};
use crate::store::{DocumentStore, Query};

#[derive(Clone)]
pub struct ReactionService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl ReactionService {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    fn require_user(&self) -> AppResult<AuthenticatedUser> {
        self.identity
            .current_user()
            .ok_or_else(|| AppError::NotAuthenticated("Sign in required".to_string()))
    }

    /// Three-way like toggle on (caller, title, episode): no record creates
    /// one, a like removes it, a dislike flips to like.
    pub async fn toggle_like(
        &self,
        title: &TitleId,
        episode: Option<EpisodeIndex>,
    ) -> ToggleOutcome {
        self.toggle(title, episode, ReactionKind::Like).await
    }

    /// Three-way dislike toggle, mirror of [`Self::toggle_like`].
    pub async fn toggle_dislike(
        &self,
        title: &TitleId,
        episode: Option<EpisodeIndex>,
    ) -> ToggleOutcome {
        self.toggle(title, episode, ReactionKind::Dislike).await
    }

    async fn toggle(
        &self,
        title: &TitleId,
        episode: Option<EpisodeIndex>,
        kind: ReactionKind,
    ) -> ToggleOutcome {
        match self.try_toggle(title, episode, kind).await {
            Ok(action) => ToggleOutcome::ok(toggle_message(kind, action), action),
            Err(err) => {
                error!(title = %title, kind = kind.as_str(), error = %err, "reaction toggle failed");
                ToggleOutcome::failed(&err)
            }
        }
    }

    async fn try_toggle(
        &self,
        title: &TitleId,
        episode: Option<EpisodeIndex>,
        kind: ReactionKind,
    ) -> AppResult<ToggleAction> {
        let user = self.require_user()?;
        let episode = episode.ok_or_else(|| {
            AppError::InvalidArgument("Select an episode first".to_string())
        })?;

        let key = ReactionKey::new(user.id.clone(), title.clone(), episode);
        let id = key.to_string();

        let existing = match self.store.get(collections::VIDEO_REACTIONS, &id).await? {
            Some(doc) => Some(doc.deserialize::<ReactionDoc>()?),
            None => None,
        };

        match &existing {
            Some(reaction) if reaction.kind == kind => {
                self.store.delete(collections::VIDEO_REACTIONS, &id).await?;
                Ok(ToggleAction::Removed)
            }
            _ => {
                let action = if existing.is_some() {
                    ToggleAction::Changed
                } else {
                    ToggleAction::Added
                };
                let reaction = ReactionDoc {
                    user_id: user.id,
                    anime_id: title.clone(),
                    episode,
                    kind,
                    time: current_time_millis(),
                };
                self.store
                    .put(
                        collections::VIDEO_REACTIONS,
                        &id,
                        serde_json::to_value(&reaction)?,
                    )
                    .await?;
                Ok(action)
            }
        }
    }

    /// Scans all reactions for (title, episode): per-kind counts plus the
    /// caller's own reaction. A missing episode index yields empty totals,
    /// and a store failure yields empty totals with `success: false`.
    pub async fn video_reactions(
        &self,
        title: &TitleId,
        episode: Option<EpisodeIndex>,
    ) -> ReactionTotals {
        let episode = match episode {
            Some(episode) => episode,
            None => return ReactionTotals::empty(true),
        };
        match self.try_video_reactions(title, episode).await {
            Ok(totals) => totals,
            Err(err) => {
                error!(title = %title, error = %err, "reaction scan failed");
                ReactionTotals::empty(false)
            }
        }
    }

    async fn try_video_reactions(
        &self,
        title: &TitleId,
        episode: EpisodeIndex,
    ) -> AppResult<ReactionTotals> {
        let docs = self
            .store
            .query(
                Query::collection(collections::VIDEO_REACTIONS)
                    .filter("animeId", title.as_str())
                    .filter("episode", episode.value()),
            )
            .await?;

        let caller = self.identity.current_user();
        let mut totals = ReactionTotals::empty(true);
        for doc in &docs {
            let reaction: ReactionDoc = doc.deserialize()?;
            match reaction.kind {
                ReactionKind::Like => totals.likes_count += 1,
                ReactionKind::Dislike => totals.dislikes_count += 1,
            }
            if caller
                .as_ref()
                .is_some_and(|user| user.id == reaction.user_id)
            {
                totals.user_reaction = Some(reaction.kind);
            }
        }
        Ok(totals)
    }

    /// Upserts the caller's rating and synchronously recomputes the title's
    /// aggregate. The recompute's own failure (including a missing content
    /// document) is swallowed into a zero aggregate; the rating write
    /// stands either way.
    pub async fn set_rating(&self, title: &TitleId, stars: u8) -> RatingOutcome {
        match self.try_set_rating(title, stars).await {
            Ok(aggregate) => RatingOutcome {
                success: true,
                message: format!("Rated {} stars", stars),
                user_rating: Some(stars),
                avg_rating: aggregate.avg_rating,
                ratings_count: aggregate.ratings_count,
            },
            Err(err) => {
                error!(title = %title, stars, error = %err, "set rating failed");
                RatingOutcome::failed(&err)
            }
        }
    }

    async fn try_set_rating(&self, title: &TitleId, stars: u8) -> AppResult<TitleAggregate> {
        let user = self.require_user()?;
        if !(1..=5).contains(&stars) {
            return Err(AppError::InvalidArgument(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let key = RatingKey::new(user.id.clone(), title.clone());
        let rating = RatingDoc {
            user_id: user.id,
            anime_id: title.clone(),
            stars,
            time: current_time_millis(),
        };
        self.store
            .put(
                collections::RATINGS,
                &key.to_string(),
                serde_json::to_value(&rating)?,
            )
            .await?;

        Ok(self.recompute_average(title).await)
    }

    async fn recompute_average(&self, title: &TitleId) -> TitleAggregate {
        match self.try_recompute_average(title).await {
            Ok(aggregate) => aggregate,
            Err(err) => {
                warn!(title = %title, error = %err, "aggregate recompute failed");
                TitleAggregate::default()
            }
        }
    }

    async fn try_recompute_average(&self, title: &TitleId) -> AppResult<TitleAggregate> {
        let docs = self
            .store
            .query(Query::collection(collections::RATINGS).filter("animeId", title.as_str()))
            .await?;
        if docs.is_empty() {
            return Ok(TitleAggregate::default());
        }

        let mut total: u64 = 0;
        for doc in &docs {
            let rating: RatingDoc = doc.deserialize()?;
            total += u64::from(rating.stars);
        }
        let aggregate = TitleAggregate {
            avg_rating: round_to_one_decimal(total as f64 / docs.len() as f64),
            ratings_count: docs.len() as u64,
        };

        self.store
            .merge(
                collections::CONTENT,
                title.as_str(),
                serde_json::to_value(aggregate)?,
            )
            .await?;
        Ok(aggregate)
    }

    /// Point lookup of the caller's own rating. An unauthenticated caller
    /// or a missing record is a successful null, not an error.
    pub async fn user_rating(&self, title: &TitleId) -> UserRatingOutcome {
        let user = match self.identity.current_user() {
            Some(user) => user,
            None => {
                return UserRatingOutcome {
                    success: true,
                    rating: None,
                }
            }
        };
        let key = RatingKey::new(user.id, title.clone());
        match self.store.get(collections::RATINGS, &key.to_string()).await {
            Ok(Some(doc)) => match doc.deserialize::<RatingDoc>() {
                Ok(rating) => UserRatingOutcome {
                    success: true,
                    rating: Some(rating.stars),
                },
                Err(err) => {
                    error!(title = %title, error = %err, "corrupt rating document");
                    UserRatingOutcome {
                        success: false,
                        rating: None,
                    }
                }
            },
            Ok(None) => UserRatingOutcome {
                success: true,
                rating: None,
            },
            Err(err) => {
                error!(title = %title, error = %err, "user rating lookup failed");
                UserRatingOutcome {
                    success: false,
                    rating: None,
                }
            }
        }
    }

    /// Reads the cached aggregate off the title document; never recomputes.
    /// Missing document or fields read as zero.
    pub async fn average_rating(&self, title: &TitleId) -> AverageRatingOutcome {
        match self.store.get(collections::CONTENT, title.as_str()).await {
            Ok(Some(doc)) => match doc.deserialize::<TitleAggregate>() {
                Ok(aggregate) => AverageRatingOutcome {
                    success: true,
                    avg_rating: aggregate.avg_rating,
                    ratings_count: aggregate.ratings_count,
                },
                Err(err) => {
                    error!(title = %title, error = %err, "corrupt content document");
                    AverageRatingOutcome {
                        success: false,
                        avg_rating: 0.0,
                        ratings_count: 0,
                    }
                }
            },
            Ok(None) => AverageRatingOutcome {
                success: true,
                avg_rating: 0.0,
                ratings_count: 0,
            },
            Err(err) => {
                error!(title = %title, error = %err, "average rating lookup failed");
                AverageRatingOutcome {
                    success: false,
                    avg_rating: 0.0,
                    ratings_count: 0,
                }
            }
        }
    }
}

fn toggle_message(kind: ReactionKind, action: ToggleAction) -> &'static str {
    match (kind, action) {
        (ReactionKind::Like, ToggleAction::Removed) => "Like removed",
        (ReactionKind::Like, _) => "Liked!",
        (ReactionKind::Dislike, ToggleAction::Removed) => "Dislike removed",
        (ReactionKind::Dislike, _) => "Disliked",
    }
}

/// Round half away from zero to one decimal place, matching how the
/// aggregate has always been displayed and stored.
fn round_to_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::round_to_one_decimal;

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_to_one_decimal(4.0), 4.0);
        assert_eq!(round_to_one_decimal(3.25), 3.3);
        assert_eq!(round_to_one_decimal(3.333333), 3.3);
        assert_eq!(round_to_one_decimal(4.666666), 4.7);
    }
}
