use std::sync::Arc;

use serde_json::json;

use anisocial::core::{TitleId, UserId};
use anisocial::identity::{AuthenticatedUser, StaticIdentity};
use anisocial::services::FriendshipStatus;
use anisocial::store::{DocumentStore, Query, SqliteDocumentStore};
use anisocial::{AppError, AppState, Config};

#[tokio::test]
async fn crud_round_trip() {
    let store = SqliteDocumentStore::new_in_memory().await.unwrap();

    store
        .put("content", "t1", json!({ "title": "Show", "time": 1 }))
        .await
        .unwrap();
    let doc = store.get("content", "t1").await.unwrap().unwrap();
    assert_eq!(doc.data["title"], json!("Show"));

    // Upsert replaces the whole body.
    store
        .put("content", "t1", json!({ "title": "Renamed" }))
        .await
        .unwrap();
    let doc = store.get("content", "t1").await.unwrap().unwrap();
    assert!(doc.data.get("time").is_none());

    store.delete("content", "t1").await.unwrap();
    assert!(store.get("content", "t1").await.unwrap().is_none());
    // Idempotent delete.
    store.delete("content", "t1").await.unwrap();
}

#[tokio::test]
async fn create_assigns_distinct_ids() {
    let store = SqliteDocumentStore::new_in_memory().await.unwrap();
    let a = store.create("friends", json!({ "userId": "a" })).await.unwrap();
    let b = store.create("friends", json!({ "userId": "a" })).await.unwrap();
    assert_ne!(a.id, b.id);

    let docs = store
        .query(Query::collection("friends").filter("userId", "a"))
        .await
        .unwrap();
    assert_eq!(docs.len(), 2);
}

#[tokio::test]
async fn merge_patches_fields_and_requires_existence() {
    let store = SqliteDocumentStore::new_in_memory().await.unwrap();
    store
        .put("content", "t1", json!({ "title": "Show" }))
        .await
        .unwrap();
    store
        .merge("content", "t1", json!({ "avgRating": 4.5, "ratingsCount": 2 }))
        .await
        .unwrap();
    let doc = store.get("content", "t1").await.unwrap().unwrap();
    assert_eq!(doc.data["title"], json!("Show"));
    assert_eq!(doc.data["avgRating"], json!(4.5));

    let err = store
        .merge("content", "missing", json!({ "avgRating": 1.0 }))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn equality_filters_and_time_ordering() {
    let store = SqliteDocumentStore::new_in_memory().await.unwrap();
    store
        .put("r", "a", json!({ "animeId": "x", "episode": 0, "time": 10 }))
        .await
        .unwrap();
    store
        .put("r", "b", json!({ "animeId": "x", "episode": 0, "time": 30 }))
        .await
        .unwrap();
    store
        .put("r", "c", json!({ "animeId": "x", "episode": 1, "time": 20 }))
        .await
        .unwrap();
    store
        .put("r", "d", json!({ "animeId": "y", "episode": 0, "time": 40 }))
        .await
        .unwrap();

    let docs = store
        .query(
            Query::collection("r")
                .filter("animeId", "x")
                .filter("episode", 0u32)
                .newest_first(),
        )
        .await
        .unwrap();
    assert_eq!(
        docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
        vec!["b", "a"]
    );
}

#[tokio::test]
async fn subscription_snapshots_follow_writes() {
    let store = SqliteDocumentStore::new_in_memory().await.unwrap();
    let mut sub = store
        .subscribe(Query::collection("friend_requests").filter("to", "bob"))
        .await
        .unwrap();
    assert!(sub.recv().await.unwrap().is_empty());

    store
        .create("friend_requests", json!({ "to": "bob", "from": "alice", "time": 1 }))
        .await
        .unwrap();
    let snapshot = sub.recv().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].data["from"], json!("alice"));
}

#[tokio::test]
async fn persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}/social.db", dir.path().display());

    {
        let store = SqliteDocumentStore::connect(&url).await.unwrap();
        store
            .put("content", "t1", json!({ "title": "Show" }))
            .await
            .unwrap();
    }

    let store = SqliteDocumentStore::connect(&url).await.unwrap();
    let doc = store.get("content", "t1").await.unwrap().unwrap();
    assert_eq!(doc.data["title"], json!("Show"));
}

/// End-to-end parity check: the same friendship flow the memory-store tests
/// drive, but through AppState over sqlite.
#[tokio::test]
async fn services_run_against_sqlite() {
    let identity = Arc::new(StaticIdentity::new());
    let state = AppState::new(Config::default(), identity.clone())
        .await
        .unwrap();

    for name in ["alice", "bob"] {
        state
            .store
            .put("users", name, json!({ "username": name }))
            .await
            .unwrap();
    }
    state
        .store
        .put("content", "naruto", json!({ "title": "Naruto" }))
        .await
        .unwrap();

    identity.sign_in(AuthenticatedUser::new("alice", "alice"));
    assert!(
        state
            .social
            .send_friend_request(&UserId::from("bob"), "bob")
            .await
            .success
    );

    identity.sign_in(AuthenticatedUser::new("bob", "bob"));
    let requests = state
        .store
        .query(Query::collection("friend_requests").filter("to", "bob"))
        .await
        .unwrap();
    assert!(
        state
            .social
            .accept_friend_request(&requests[0].id, &UserId::from("alice"), "alice")
            .await
            .success
    );
    assert_eq!(
        state.social.friendship_status(&UserId::from("alice")).await,
        FriendshipStatus::Friends
    );

    let rated = state.reactions.set_rating(&TitleId::new("naruto"), 4).await;
    assert!(rated.success);
    assert_eq!(rated.avg_rating, 4.0);
    assert_eq!(rated.ratings_count, 1);
}
