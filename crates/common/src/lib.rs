//! Hoard Common Library
//!
//! Shared code for the Hoard services including:
//! - The treasure resource contract (fields, groups, filters, validation)
//! - Read/write view projections
//! - Database models and repository patterns
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod resource;
pub mod text;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use resource::{ApiResource, Group, Treasure, User};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix of every API route
pub const API_PREFIX: &str = "/api";
