//! Configuration types for catalog sessions.
//!
//! # Security
//! These structs intentionally do NOT store passwords or credentials.
//! Credentials are handled separately through the security module.

mod connection;

pub use connection::{ConnectionConfig, DEFAULT_PORT, ServerAddress};
