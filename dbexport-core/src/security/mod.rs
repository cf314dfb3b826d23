//! Credential handling.
//!
//! Credentials live in `Zeroizing` containers and are kept apart from
//! [`ConnectionConfig`](crate::adapters::ConnectionConfig) so that the
//! connection settings can be logged and serialized freely.

mod credentials;

pub use credentials::Credentials;
