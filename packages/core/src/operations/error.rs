//! Error types for the graph update builder
//!
//! The builder never contacts the network, so every error here is an input
//! validation failure. A failed build produces no operations at all.

use thiserror::Error;

/// Reasons a node-creation intent cannot be turned into a transaction
///
/// # Examples
///
/// ```rust
/// use mew_clipper_core::operations::BuildError;
///
/// let err = BuildError::label_requires_parent("url".to_string());
/// assert_eq!(
///     err.to_string(),
///     "Relation label 'url' needs a parent node to attach to"
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Every operation is stamped with an author; blank is not accepted
    #[error("Author id must not be empty")]
    EmptyAuthor,

    /// A relation label attaches to the parent-child relation, which only
    /// exists when a parent is given
    #[error("Relation label '{label}' needs a parent node to attach to")]
    LabelRequiresParent { label: String },

    /// A replacement retargets the parent-child relation
    #[error("Replacement of node '{reference_node_id}' needs a parent node")]
    ReplacementRequiresParent { reference_node_id: String },

    /// Both would rewrite the parent-child relation's canonical relation id
    #[error("Relation label '{label}' cannot be combined with replacement content")]
    LabelWithReplacement { label: String },
}

impl BuildError {
    pub fn label_requires_parent(label: String) -> Self {
        Self::LabelRequiresParent { label }
    }

    pub fn replacement_requires_parent(reference_node_id: String) -> Self {
        Self::ReplacementRequiresParent { reference_node_id }
    }

    pub fn label_with_replacement(label: String) -> Self {
        Self::LabelWithReplacement { label }
    }
}
