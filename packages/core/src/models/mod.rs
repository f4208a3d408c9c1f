//! Data Models
//!
//! Wire-level records of the Mew note graph:
//!
//! - `GraphNode` / `ContentBlock` - vertices and their content
//! - `Relation` / `RelationPosition` - typed edges and list order keys
//! - `ContentSpec` - content requested for a node being created
//! - `UpdateOperation` / `Transaction` - the sync mutation protocol
//! - `LayerData` / `SyncSnapshot` - read responses

mod content;
mod layer;
mod node;
mod relation;
mod update;

pub use content::{ContentSpec, MentionData, ReplacementNodeData, REPLACEMENT_PLACEHOLDER_TEXT};
pub use layer::{DataEnvelope, LayerData, SyncSnapshot, User};
pub use node::{ContentBlock, GraphNode, NodeAttributes};
pub use relation::{
    Relation, RelationPosition, CHILD_RELATION_TYPE, FIRST_FRACTIONAL_KEY, LABEL_RELATION_TYPE,
};
pub use update::{
    AddNodeOp, AddRelationOp, Transaction, UpdateOperation, UpdateRelationListOp,
    UpdateRelationOp, RELATION_LIST_ALL,
};
