//! Mew Clipper Core
//!
//! This crate captures web content (text selections, whole pages,
//! transcripts) into the Mew note graph through its HTTP sync API.
//!
//! # Architecture
//!
//! - **Ordered transactions**: every node creation is one batch of
//!   `addNode` / `addRelation` / `updateRelationList` / `updateRelation`
//!   operations applied by the service in order
//! - **Idempotent resolution**: container and article nodes are found before
//!   they are created, and cached ids are re-verified
//! - **Strict errors**: failed requests surface as typed errors; nothing is
//!   reported as saved unless the service accepted it
//!
//! # Modules
//!
//! - [`ids`] - Id and timestamp generation
//! - [`models`] - Wire types (nodes, relations, operations, layers)
//! - [`operations`] - Transaction building and fractional ordering
//! - [`transport`] - `GraphStore` trait with HTTP and in-memory backends
//! - [`services`] - Node resolution and clipper flows
//! - [`config`] - Connection settings

pub mod config;
pub mod ids;
pub mod models;
pub mod operations;
pub mod services;
pub mod transport;

// Re-export commonly used types
pub use config::MewConfig;
pub use models::*;
pub use services::*;
