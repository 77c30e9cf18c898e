// Identity seam. The services never reach for an ambient auth singleton;
// whoever embeds them injects a provider at construction.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::core::UserId;

/// The currently signed-in user as reported by the external identity
/// provider. Absence means every write-like operation fails with a
/// not-authenticated error before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub username: String,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<AuthenticatedUser>;
}

/// Switchable provider for tests and single-user embeddings.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: RwLock<Option<AuthenticatedUser>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: AuthenticatedUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: AuthenticatedUser) {
        *self.user.write().expect("identity lock poisoned") = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().expect("identity lock poisoned") = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<AuthenticatedUser> {
        self.user.read().expect("identity lock poisoned").clone()
    }
}
