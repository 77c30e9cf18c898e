// Social graph service: friend requests and the bidirectional friendship
// edges they turn into.
//
// Per ordered user pair the states are none -> pending -> friends, with the
// reverse-direction pending branch independent, and friends -> none on
// removal. Multi-record writes (accept's two edges + request delete,
// removal's two deletes) are sequential, not transactional: a failure
// mid-way leaves the earlier writes committed. Duplicate-pending prevention
// is a pre-check, so two racing senders can still both get through.

use std::sync::Arc;

use tracing::error;

use crate::core::{current_time_millis, UserId};
use crate::error::{AppError, AppResult};
use crate::identity::{AuthenticatedUser, IdentityProvider};
use crate::models::collections;
use crate::models::{FriendRequestDoc, FriendshipEdgeDoc, RequestStatus, UserProfile};
use crate::services::outcome::{FriendshipStatus, OpOutcome};
use crate::store::{DocumentStore, Query, TypedSubscription};

#[derive(Clone)]
pub struct SocialGraphService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl SocialGraphService {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    fn require_user(&self) -> AppResult<AuthenticatedUser> {
        self.identity
            .current_user()
            .ok_or_else(|| AppError::NotAuthenticated("Sign in required".to_string()))
    }

    /// Reads the caller's own profile for the username stamped onto
    /// requests and edges.
    async fn own_profile(&self, user: &UserId) -> AppResult<UserProfile> {
        let doc = self
            .store
            .get(collections::USERS, user.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        doc.deserialize()
    }

    async fn pending_between(&self, from: &UserId, to: &UserId) -> AppResult<bool> {
        let requests = self
            .store
            .query(
                Query::collection(collections::FRIEND_REQUESTS)
                    .filter("from", from.as_str())
                    .filter("to", to.as_str()),
            )
            .await?;
        Ok(!requests.is_empty())
    }

    async fn edge_exists(&self, user: &UserId, friend: &UserId) -> AppResult<bool> {
        let edges = self
            .store
            .query(
                Query::collection(collections::FRIENDS)
                    .filter("userId", user.as_str())
                    .filter("friendId", friend.as_str()),
            )
            .await?;
        Ok(!edges.is_empty())
    }

    /// Sends a friend request to `to`. Fails on self-request, an already
    /// pending request from the caller, or an existing friendship.
    pub async fn send_friend_request(&self, to: &UserId, to_username: &str) -> OpOutcome {
        match self.try_send_friend_request(to, to_username).await {
            Ok(()) => OpOutcome::ok("Friend request sent"),
            Err(err) => {
                error!(to = %to, error = %err, "send friend request failed");
                OpOutcome::failed(&err)
            }
        }
    }

    async fn try_send_friend_request(&self, to: &UserId, to_username: &str) -> AppResult<()> {
        let user = self.require_user()?;

        if *to == user.id {
            return Err(AppError::InvalidArgument(
                "You cannot send a friend request to yourself".to_string(),
            ));
        }
        if self.pending_between(&user.id, to).await? {
            return Err(AppError::DuplicateState(
                "Friend request already sent".to_string(),
            ));
        }
        if self.edge_exists(&user.id, to).await? {
            return Err(AppError::DuplicateState(
                "You are already friends".to_string(),
            ));
        }

        let profile = self.own_profile(&user.id).await?;
        let request = FriendRequestDoc {
            from: user.id,
            from_username: profile.username,
            to: to.clone(),
            to_username: to_username.to_string(),
            time: current_time_millis(),
            status: RequestStatus::Pending,
        };
        self.store
            .create(collections::FRIEND_REQUESTS, serde_json::to_value(&request)?)
            .await?;
        Ok(())
    }

    /// Accepts a pending request: writes the two directional edges, then
    /// deletes the request. If an edge already exists (a duplicate accept
    /// racing this one), the stale request is deleted and the call fails
    /// with an already-friends error.
    pub async fn accept_friend_request(
        &self,
        request_id: &str,
        friend: &UserId,
        friend_username: &str,
    ) -> OpOutcome {
        match self
            .try_accept_friend_request(request_id, friend, friend_username)
            .await
        {
            Ok(()) => OpOutcome::ok("Friend added"),
            Err(err) => {
                error!(request_id, friend = %friend, error = %err, "accept friend request failed");
                OpOutcome::failed(&err)
            }
        }
    }

    async fn try_accept_friend_request(
        &self,
        request_id: &str,
        friend: &UserId,
        friend_username: &str,
    ) -> AppResult<()> {
        let user = self.require_user()?;

        if self.edge_exists(&user.id, friend).await? {
            // Self-healing cleanup of the stale request, then still an error.
            self.store
                .delete(collections::FRIEND_REQUESTS, request_id)
                .await?;
            return Err(AppError::DuplicateState(
                "You are already friends".to_string(),
            ));
        }

        let profile = self.own_profile(&user.id).await?;
        let now = current_time_millis();

        let own_edge = FriendshipEdgeDoc {
            user_id: user.id.clone(),
            username: profile.username.clone(),
            friend_id: friend.clone(),
            friend_username: friend_username.to_string(),
            time: now,
        };
        let reciprocal_edge = FriendshipEdgeDoc {
            user_id: friend.clone(),
            username: friend_username.to_string(),
            friend_id: user.id,
            friend_username: profile.username,
            time: now,
        };

        self.store
            .create(collections::FRIENDS, serde_json::to_value(&own_edge)?)
            .await?;
        self.store
            .create(collections::FRIENDS, serde_json::to_value(&reciprocal_edge)?)
            .await?;
        self.store
            .delete(collections::FRIEND_REQUESTS, request_id)
            .await?;
        Ok(())
    }

    /// Deletes the request unconditionally. Deleting an id that no longer
    /// exists is deliberately not an error, so reject is idempotent.
    pub async fn reject_friend_request(&self, request_id: &str) -> OpOutcome {
        match self
            .store
            .delete(collections::FRIEND_REQUESTS, request_id)
            .await
        {
            Ok(()) => OpOutcome::ok("Request removed"),
            Err(err) => {
                error!(request_id, error = %err, "reject friend request failed");
                OpOutcome::failed(&err)
            }
        }
    }

    /// Removes a friendship: deletes the caller's own edge by its document
    /// id, then looks up and deletes the reciprocal edge. Two independent
    /// deletes; a failure after the first leaves an asymmetric pair.
    pub async fn remove_friend(&self, edge_doc_id: &str, friend: &UserId) -> OpOutcome {
        match self.try_remove_friend(edge_doc_id, friend).await {
            Ok(()) => OpOutcome::ok("Friend removed"),
            Err(err) => {
                error!(edge_doc_id, friend = %friend, error = %err, "remove friend failed");
                OpOutcome::failed(&err)
            }
        }
    }

    async fn try_remove_friend(&self, edge_doc_id: &str, friend: &UserId) -> AppResult<()> {
        let user = self.require_user()?;

        self.store.delete(collections::FRIENDS, edge_doc_id).await?;

        let reciprocals = self
            .store
            .query(
                Query::collection(collections::FRIENDS)
                    .filter("userId", friend.as_str())
                    .filter("friendId", user.id.as_str()),
            )
            .await?;
        for edge in reciprocals {
            self.store.delete(collections::FRIENDS, &edge.id).await?;
        }
        Ok(())
    }

    /// Relation of the caller to `other`. Store failures come back as
    /// `Error`, never as a propagated error.
    pub async fn friendship_status(&self, other: &UserId) -> FriendshipStatus {
        let user = match self.identity.current_user() {
            Some(user) => user,
            None => return FriendshipStatus::NotAuth,
        };
        if *other == user.id {
            return FriendshipStatus::Own;
        }
        match self.lookup_status(&user.id, other).await {
            Ok(status) => status,
            Err(err) => {
                error!(other = %other, error = %err, "friendship status check failed");
                FriendshipStatus::Error
            }
        }
    }

    async fn lookup_status(&self, me: &UserId, other: &UserId) -> AppResult<FriendshipStatus> {
        if self.edge_exists(me, other).await? {
            return Ok(FriendshipStatus::Friends);
        }
        if self.pending_between(me, other).await? {
            return Ok(FriendshipStatus::Pending);
        }
        if self.pending_between(other, me).await? {
            return Ok(FriendshipStatus::Incoming);
        }
        Ok(FriendshipStatus::None)
    }

    /// Live feed of requests addressed to the caller, newest first.
    pub async fn subscribe_requests(&self) -> AppResult<TypedSubscription<FriendRequestDoc>> {
        let user = self.require_user()?;
        let subscription = self
            .store
            .subscribe(
                Query::collection(collections::FRIEND_REQUESTS)
                    .filter("to", user.id.as_str())
                    .newest_first(),
            )
            .await?;
        Ok(TypedSubscription::new(subscription))
    }

    /// Live feed of the caller's friendship edges, newest first.
    pub async fn subscribe_friends(&self) -> AppResult<TypedSubscription<FriendshipEdgeDoc>> {
        let user = self.require_user()?;
        let subscription = self
            .store
            .subscribe(
                Query::collection(collections::FRIENDS)
                    .filter("userId", user.id.as_str())
                    .newest_first(),
            )
            .await?;
        Ok(TypedSubscription::new(subscription))
    }
}
