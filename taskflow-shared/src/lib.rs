//! # TaskFlow Shared Library
//!
//! This crate contains shared types, utilities, and business logic used by
//! the TaskFlow API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Password, JWT, OAuth, and middleware utilities
//! - `db`: Connection pool and migration helpers
//! - `events`: Change notifications behind the SSE feed

pub mod auth;
pub mod db;
pub mod events;
pub mod models;

/// Current version of the TaskFlow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
