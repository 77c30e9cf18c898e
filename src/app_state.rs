use std::sync::Arc;

use crate::config::Config;
use crate::identity::IdentityProvider;
use crate::services::{ReactionService, SocialGraphService};
use crate::store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore};

/// Wired application state: one shared store, one identity provider, both
/// services. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub social: SocialGraphService,
    pub reactions: ReactionService,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Config,
}

impl AppState {
    /// Opens the configured sqlite store and wires both services around it
    /// and the injected identity provider.
    pub async fn new(config: Config, identity: Arc<dyn IdentityProvider>) -> anyhow::Result<Self> {
        let store = SqliteDocumentStore::connect_with_buffer(
            &config.database.url,
            config.subscriptions.buffer,
        )
        .await?;
        Ok(Self::with_store(config, Arc::new(store), identity))
    }

    /// Same wiring over an in-memory store, for tests and ephemeral use.
    pub fn in_memory(identity: Arc<dyn IdentityProvider>) -> Self {
        let config = Config::default();
        let store = Arc::new(MemoryDocumentStore::with_buffer(
            config.subscriptions.buffer,
        ));
        Self::with_store(config, store, identity)
    }

    pub fn with_store(
        config: Config,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            social: SocialGraphService::new(store.clone(), identity.clone()),
            reactions: ReactionService::new(store.clone(), identity.clone()),
            store,
            identity,
            config,
        }
    }
}
