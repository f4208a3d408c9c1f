//! Clipper Services
//!
//! This module contains the node resolution and clipper logic:
//!
//! - `LayerQuery` - Child lookups over layer queries, tolerant of null entries
//! - `NodeResolver` - Find-or-create for the container, article and clip nodes
//! - `ClipperService` - Setup plus the save-selection / save-page / save-transcript flows
//! - `KeyValueStore` - Persisted clipper state (memory and JSON-file backends)
//! - `NodeUrlFormat` - Parsing root node URLs and building node links
//!
//! Services sit between the sync transport and the caller, turning one user
//! action into the layer queries and transactions it needs.

pub mod clipper;
pub mod error;
pub mod key_value;
pub mod layer_query;
pub mod node_resolver;
pub mod node_url;

#[cfg(test)]
mod clipper_test;

pub use clipper::{
    ClipKind, ClipReceipt, ClipperService, PageInfo, Setup, TranscriptOutcome, CONTAINER_NAME,
    FAILURE_MESSAGE, SAVING_MESSAGE, TRANSCRIPT_NODE_NAME,
};
pub use error::ClipperError;
pub use key_value::{
    JsonFileKeyValueStore, KeyValueStore, MemoryKeyValueStore, ARTICLE_NODES_KEY,
    USER_NODE_ID_KEY, USER_ROOT_URL_KEY,
};
pub use layer_query::{ChildNodes, LayerQuery};
pub use node_resolver::{NodeResolver, ResolvedNode, URL_RELATION_LABEL};
pub use node_url::{decode_node_id, parse_node_id_from_url, NodeUrlFormat, DEFAULT_NODE_HOST};
