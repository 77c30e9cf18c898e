use std::sync::Arc;

use serde_json::json;

use anisocial::core::{EpisodeIndex, TitleId};
use anisocial::identity::{AuthenticatedUser, StaticIdentity};
use anisocial::models::collections;
use anisocial::models::{RatingDoc, ReactionKind};
use anisocial::services::{ReactionService, ToggleAction};
use anisocial::store::{DocumentStore, MemoryDocumentStore, Query};

struct Harness {
    store: Arc<MemoryDocumentStore>,
    identity: Arc<StaticIdentity>,
    reactions: ReactionService,
}

async fn harness() -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = Arc::new(MemoryDocumentStore::new());
    let identity = Arc::new(StaticIdentity::new());
    let reactions = ReactionService::new(store.clone(), identity.clone());
    store
        .put(collections::CONTENT, "naruto", json!({ "title": "Naruto" }))
        .await
        .unwrap();
    Harness {
        store,
        identity,
        reactions,
    }
}

fn sign_in(harness: &Harness, name: &str) {
    harness
        .identity
        .sign_in(AuthenticatedUser::new(name, name));
}

fn title() -> TitleId {
    TitleId::new("naruto")
}

fn ep(index: u32) -> Option<EpisodeIndex> {
    Some(EpisodeIndex(index))
}

#[tokio::test]
async fn like_toggle_adds_then_removes() {
    let h = harness().await;
    sign_in(&h, "u1");

    let first = h.reactions.toggle_like(&title(), ep(0)).await;
    assert!(first.success);
    assert_eq!(first.action, Some(ToggleAction::Added));

    let totals = h.reactions.video_reactions(&title(), ep(0)).await;
    assert_eq!(totals.likes_count, 1);
    assert_eq!(totals.dislikes_count, 0);
    assert_eq!(totals.user_reaction, Some(ReactionKind::Like));

    let second = h.reactions.toggle_like(&title(), ep(0)).await;
    assert_eq!(second.action, Some(ToggleAction::Removed));

    let totals = h.reactions.video_reactions(&title(), ep(0)).await;
    assert_eq!(totals.likes_count, 0);
    assert_eq!(totals.user_reaction, None);
}

#[tokio::test]
async fn opposite_toggle_switches_in_place() {
    let h = harness().await;
    sign_in(&h, "u1");

    assert_eq!(
        h.reactions.toggle_dislike(&title(), ep(3)).await.action,
        Some(ToggleAction::Added)
    );
    let switched = h.reactions.toggle_like(&title(), ep(3)).await;
    assert_eq!(switched.action, Some(ToggleAction::Changed));

    let totals = h.reactions.video_reactions(&title(), ep(3)).await;
    assert_eq!(totals.likes_count, 1);
    assert_eq!(totals.dislikes_count, 0);
    assert_eq!(totals.user_reaction, Some(ReactionKind::Like));

    // Exactly one record remains, under the composite key.
    let doc = h
        .store
        .get(collections::VIDEO_REACTIONS, "u1_naruto_ep3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.data["type"], json!("like"));
}

#[tokio::test]
async fn reactions_are_scoped_per_episode_and_user() {
    let h = harness().await;
    sign_in(&h, "u1");
    h.reactions.toggle_like(&title(), ep(0)).await;
    sign_in(&h, "u2");
    h.reactions.toggle_like(&title(), ep(0)).await;
    sign_in(&h, "u3");
    h.reactions.toggle_dislike(&title(), ep(0)).await;
    h.reactions.toggle_like(&title(), ep(1)).await;

    let totals = h.reactions.video_reactions(&title(), ep(0)).await;
    assert_eq!(totals.likes_count, 2);
    assert_eq!(totals.dislikes_count, 1);
    assert_eq!(totals.user_reaction, Some(ReactionKind::Dislike));

    h.identity.sign_out();
    let totals = h.reactions.video_reactions(&title(), ep(0)).await;
    assert_eq!(totals.likes_count, 2);
    assert_eq!(totals.user_reaction, None);
}

#[tokio::test]
async fn toggle_without_episode_fails() {
    let h = harness().await;
    sign_in(&h, "u1");
    let outcome = h.reactions.toggle_like(&title(), None).await;
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Select an episode first");
    assert_eq!(outcome.action, None);

    // Reading without an episode is a successful empty aggregate.
    let totals = h.reactions.video_reactions(&title(), None).await;
    assert!(totals.success);
    assert_eq!(totals.likes_count, 0);
}

#[tokio::test]
async fn out_of_range_stars_leave_no_record() {
    let h = harness().await;
    sign_in(&h, "u1");

    for stars in [0u8, 6] {
        let outcome = h.reactions.set_rating(&title(), stars).await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Rating must be between 1 and 5");
    }
    let ratings = h
        .store
        .query(Query::collection(collections::RATINGS))
        .await
        .unwrap();
    assert!(ratings.is_empty());
}

#[tokio::test]
async fn average_recomputes_on_every_write_and_rerate_replaces() {
    let h = harness().await;

    sign_in(&h, "u1");
    let first = h.reactions.set_rating(&title(), 3).await;
    assert!(first.success);
    assert_eq!(first.user_rating, Some(3));
    assert_eq!(first.avg_rating, 3.0);
    assert_eq!(first.ratings_count, 1);

    sign_in(&h, "u2");
    let second = h.reactions.set_rating(&title(), 4).await;
    assert_eq!(second.avg_rating, 3.5);
    assert_eq!(second.ratings_count, 2);

    sign_in(&h, "u3");
    let third = h.reactions.set_rating(&title(), 5).await;
    assert_eq!(third.avg_rating, 4.0);
    assert_eq!(third.ratings_count, 3);

    // Re-rating replaces the prior score instead of adding a record.
    sign_in(&h, "u1");
    let rerated = h.reactions.set_rating(&title(), 5).await;
    assert_eq!(rerated.ratings_count, 3);
    assert_eq!(rerated.avg_rating, 4.7); // (5+4+5)/3 = 4.666..., one decimal

    let stored: RatingDoc = h
        .store
        .get(collections::RATINGS, "u1_naruto")
        .await
        .unwrap()
        .unwrap()
        .deserialize()
        .unwrap();
    assert_eq!(stored.stars, 5);

    // The cached aggregate on the title record matches the last recompute.
    let cached = h.reactions.average_rating(&title()).await;
    assert!(cached.success);
    assert_eq!(cached.avg_rating, 4.7);
    assert_eq!(cached.ratings_count, 3);
}

#[tokio::test]
async fn rating_a_title_without_content_record_still_sticks() {
    let h = harness().await;
    sign_in(&h, "u1");
    let ghost = TitleId::new("unlisted");

    // The aggregate merge has nowhere to land, so it reports zero, but the
    // rating write itself stands.
    let outcome = h.reactions.set_rating(&ghost, 4).await;
    assert!(outcome.success);
    assert_eq!(outcome.avg_rating, 0.0);
    assert_eq!(outcome.ratings_count, 0);

    assert!(h
        .store
        .get(collections::RATINGS, "u1_unlisted")
        .await
        .unwrap()
        .is_some());
    let cached = h.reactions.average_rating(&ghost).await;
    assert!(cached.success);
    assert_eq!(cached.avg_rating, 0.0);
}

#[tokio::test]
async fn user_rating_lookup_paths() {
    let h = harness().await;

    // Unauthenticated: successful null, not an error.
    h.identity.sign_out();
    let anonymous = h.reactions.user_rating(&title()).await;
    assert!(anonymous.success);
    assert_eq!(anonymous.rating, None);

    sign_in(&h, "u1");
    let missing = h.reactions.user_rating(&title()).await;
    assert!(missing.success);
    assert_eq!(missing.rating, None);

    h.reactions.set_rating(&title(), 2).await;
    let found = h.reactions.user_rating(&title()).await;
    assert_eq!(found.rating, Some(2));
}

#[tokio::test]
async fn average_rating_reads_cache_only() {
    let h = harness().await;

    // Seed a stale cached aggregate directly; the read must not recompute.
    h.store
        .merge(
            collections::CONTENT,
            "naruto",
            json!({ "avgRating": 2.5, "ratingsCount": 10 }),
        )
        .await
        .unwrap();
    let cached = h.reactions.average_rating(&title()).await;
    assert_eq!(cached.avg_rating, 2.5);
    assert_eq!(cached.ratings_count, 10);

    // Missing title record reads as zero/zero, successfully.
    let missing = h.reactions.average_rating(&TitleId::new("nope")).await;
    assert!(missing.success);
    assert_eq!(missing.avg_rating, 0.0);
    assert_eq!(missing.ratings_count, 0);
}

#[tokio::test]
async fn unauthenticated_writes_touch_nothing() {
    let h = harness().await;
    h.identity.sign_out();

    let toggle = h.reactions.toggle_like(&title(), ep(0)).await;
    assert!(!toggle.success);
    assert_eq!(toggle.message, "Sign in required");

    let rating = h.reactions.set_rating(&title(), 5).await;
    assert!(!rating.success);

    assert!(h
        .store
        .query(Query::collection(collections::VIDEO_REACTIONS))
        .await
        .unwrap()
        .is_empty());
    assert!(h
        .store
        .query(Query::collection(collections::RATINGS))
        .await
        .unwrap()
        .is_empty());
}
