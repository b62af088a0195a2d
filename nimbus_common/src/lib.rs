//! Common types and utilities for the Nimbus projects.

pub mod cluster;
pub mod config;
pub mod credentials;
pub mod error;
pub mod registry;

pub use ::anyhow;
pub use ::serde;
pub use ::serde_json;
pub use ::tokio;
pub use ::tracing;
pub use ::tracing_subscriber;
