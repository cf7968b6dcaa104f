//! Shared library for the maaboo media tracker.
//!
//! This crate provides common functionality used by the server and catalog crates:
//! - Configuration management
//! - Database connection and schema
//! - Persisted models and the store
//! - Logging infrastructure

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use logging::LogConfig;
pub use models::*;
pub use store::{Store, StoreStats};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
