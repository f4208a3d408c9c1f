//! Graph Mutation Operations
//!
//! This module turns node-creation intents into sync transactions:
//!
//! - [`AddNodeParams`] - what to create and where
//! - [`GraphUpdateBuilder`] - the ordered operation list for one intent
//! - [`fractional_ordering`] - relation-list order keys
//! - [`RetryPolicy`] - backoff for idempotent reads

pub mod builder;
pub mod error;
pub mod fractional_ordering;
pub mod retry;


pub use builder::{AddNodeOutcome, BuiltTransaction, GraphUpdateBuilder};
pub use error::BuildError;
pub use fractional_ordering::{key_between, OrderKeyError, PositionAllocator};
pub use retry::RetryPolicy;

use crate::models::ContentSpec;

/// Parameters for creating a node
///
/// # Examples
///
/// ```rust
/// # use mew_clipper_core::operations::AddNodeParams;
/// # use mew_clipper_core::models::ContentSpec;
/// // A clip under an article node
/// let clip = AddNodeParams::new(ContentSpec::text("hello world"), "auth0|user")
///     .with_parent("article-node-id");
///
/// // The URL child of an article, labelled "url"
/// let url = AddNodeParams::new(ContentSpec::text("https://example.com"), "auth0|user")
///     .with_parent("article-node-id")
///     .with_label("url");
/// assert_eq!(url.relation_label.as_deref(), Some("url"));
/// # let _ = clip;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AddNodeParams {
    /// Content of the new node
    pub content: ContentSpec,
    /// Node the new node is created under
    pub parent_node_id: Option<String>,
    /// Text of a label node attached to the parent-child relation
    pub relation_label: Option<String>,
    /// Checkbox state
    pub is_checked: Option<bool>,
    /// User stamped on every record, also the transaction's user id
    pub author_id: String,
}

impl AddNodeParams {
    pub fn new(content: impl Into<ContentSpec>, author_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            parent_node_id: None,
            relation_label: None,
            is_checked: None,
            author_id: author_id.into(),
        }
    }

    pub fn with_parent(mut self, parent_node_id: impl Into<String>) -> Self {
        self.parent_node_id = Some(parent_node_id.into());
        self
    }

    pub fn with_label(mut self, relation_label: impl Into<String>) -> Self {
        self.relation_label = Some(relation_label.into());
        self
    }

    pub fn with_checked(mut self, is_checked: bool) -> Self {
        self.is_checked = Some(is_checked);
        self
    }
}
