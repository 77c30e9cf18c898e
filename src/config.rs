use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub subscriptions: SubscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Per-subscription snapshot channel capacity. A subscriber that falls
    /// behind loses intermediate snapshots, never the subscription itself.
    pub buffer: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/anisocial.db".to_string()),
            },
            subscriptions: SubscriptionConfig {
                buffer: env::var("SUBSCRIPTION_BUFFER")
                    .unwrap_or_else(|_| "64".to_string())
                    .parse()
                    .unwrap_or(64),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            subscriptions: SubscriptionConfig { buffer: 64 },
        }
    }
}
