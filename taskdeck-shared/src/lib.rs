//! # TaskDeck Shared Library
//!
//! This crate contains the domain layer shared by the TaskDeck HTTP and
//! realtime transports: database models, authentication primitives, the
//! transport-agnostic task service, and upload validation.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Password hashing, session tokens, and the authorization gate
//! - `db`: Connection pool and migrations
//! - `service`: Transport-agnostic business operations and error taxonomy
//! - `uploads`: Attachment ingestion policy

pub mod auth;
pub mod db;
pub mod models;
pub mod service;
pub mod uploads;

/// Current version of the TaskDeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
