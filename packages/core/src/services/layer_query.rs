//! Child lookup on top of layer queries
//!
//! The layer endpoint returns loosely shaped data: relations may point at
//! nodes the layer does not include, and such targets come back as `null`.
//! [`LayerQuery::get_child_nodes`] drops those instead of handing partial
//! records to callers.

use std::sync::Arc;

use crate::models::{GraphNode, Relation};
use crate::operations::RetryPolicy;
use crate::transport::{GraphStore, TransportError};

/// A parent and its direct children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildNodes {
    pub parent_node: Option<GraphNode>,
    /// Ordered by the creation time of the containing relation, then by
    /// relation id
    pub child_nodes: Vec<GraphNode>,
}

/// Reads children through a [`GraphStore`]
#[derive(Clone)]
pub struct LayerQuery {
    store: Arc<dyn GraphStore>,
    retry: RetryPolicy,
}

impl LayerQuery {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    pub fn with_retry(store: Arc<dyn GraphStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Direct `child` targets of `parent_id`
    ///
    /// # Errors
    ///
    /// [`TransportError`] when the layer cannot be fetched after retries.
    pub async fn get_child_nodes(&self, parent_id: &str) -> Result<ChildNodes, TransportError> {
        let object_ids = vec![parent_id.to_string()];
        let layer = self
            .retry
            .run("Layer query", || self.store.fetch_layer(&object_ids))
            .await?;

        let mut relations: Vec<&Relation> = layer
            .relations()
            .filter(|relation| relation.is_child_of(parent_id))
            .collect();
        relations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = relations.len();
        let child_nodes: Vec<GraphNode> = relations
            .into_iter()
            .filter_map(|relation| layer.node(&relation.to_id).cloned())
            .collect();

        if child_nodes.len() < total {
            tracing::debug!(
                "Skipped {} child relation(s) of '{}' with missing targets",
                total - child_nodes.len(),
                parent_id
            );
        }

        Ok(ChildNodes {
            parent_node: layer.node(parent_id).cloned(),
            child_nodes,
        })
    }
}
