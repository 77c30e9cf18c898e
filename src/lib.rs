// anisocial - social graph and reactions/ratings engine for a streaming site

// Core types and primitives
pub mod core;

// Persisted document types and collection names
pub mod models;

// Identity seam (who is acting)
pub mod identity;

// Document store seam and its backends
pub mod store;

// The two services and their outcome shapes
pub mod services;

// Common utilities
pub mod app_state;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, AppResult};
