//! GraphStore Trait - Sync Transport Abstraction
//!
//! This module defines the `GraphStore` trait through which the resolver
//! layer reads and mutates the Mew graph. Two implementations exist:
//!
//! - [`HttpGraphStore`] - the Mew HTTP sync API (`/sync`, `/layer`)
//! - [`InMemoryGraphStore`] - an in-process graph applying transactions
//!   locally, for tests and dry runs
//!
//! # Design Decisions
//!
//! 1. **Async-First**: all methods are async
//! 2. **Strict errors**: failures return [`TransportError`]; no placeholder
//!    results are ever synthesized for a failed mutation
//! 3. **Ordered transactions**: implementations apply a transaction's
//!    operations in the order given, all or nothing
//!
//! # Examples
//!
//! ```rust,no_run
//! use mew_clipper_core::transport::{GraphStore, HttpGraphStore};
//! use mew_clipper_core::config::MewConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = HttpGraphStore::new(&MewConfig::from_env())?;
//! let layer = store.fetch_layer(&["user-root-id-XYZ".to_string()]).await?;
//! println!("{} node(s)", layer.nodes_by_id.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod http;
pub mod memory;

pub use auth::{TokenPolicy, TokenProvider, SENTINEL_ACCESS_TOKEN};
pub use error::{TransportError, TransportErrorKind};
pub use http::HttpGraphStore;
pub use memory::InMemoryGraphStore;

use async_trait::async_trait;

use crate::models::{LayerData, SyncSnapshot, Transaction};

/// Read and write access to the Mew graph
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// operation of a client.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Submit one transaction
    ///
    /// # Returns
    ///
    /// The service's response body. It is not schema-checked; callers rely
    /// on the ids they generated, not on the response.
    ///
    /// # Errors
    ///
    /// [`TransportError`] on timeout, network failure, or non-2xx status.
    /// The caller cannot tell whether a timed-out transaction was applied.
    async fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<serde_json::Value, TransportError>;

    /// Everything visible to the authenticated client
    async fn fetch_sync_snapshot(&self) -> Result<SyncSnapshot, TransportError>;

    /// Nodes and relations around `object_ids`
    ///
    /// The layer holds the requested objects, their outgoing relations and
    /// the targets of those relations. Targets outside the layer may be
    /// `None`.
    async fn fetch_layer(&self, object_ids: &[String]) -> Result<LayerData, TransportError>;
}
