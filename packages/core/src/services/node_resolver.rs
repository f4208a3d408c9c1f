//! Node Resolver - Find-or-Create Layer
//!
//! Resolves the nodes a clip hangs under, creating them when missing:
//!
//! ```text
//! user root
//! └── "My Highlights"            (ensure_container)
//!     └── <page title>           (resolve_article_node)
//!         ├── <page url>         labelled "url"
//!         └── <clip text> ...    (append_clip)
//! ```
//!
//! Lookups are exact matches on a child's first content block. Article nodes
//! are cached per page URL in the [`KeyValueStore`], and a cached id is only
//! trusted after a layer query confirms it is still a child of the
//! container.
//!
//! # Concurrency
//!
//! Each call is one sequential chain of awaits. Two overlapping calls for
//! the same page can both miss the cache and both create an article node;
//! the later cache write wins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{ContentSpec, GraphNode};
use crate::operations::{AddNodeOutcome, AddNodeParams, GraphUpdateBuilder};
use crate::services::key_value::{
    get_typed, set_typed, KeyValueStore, ARTICLE_NODES_KEY, USER_NODE_ID_KEY,
};
use crate::services::layer_query::LayerQuery;
use crate::services::node_url::{decode_node_id, NodeUrlFormat};
use crate::services::ClipperError;
use crate::transport::GraphStore;

/// Label on the relation from an article node to its URL child
pub const URL_RELATION_LABEL: &str = "url";

/// Result of a find-or-create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub id: String,
    /// False when an existing node was found
    pub created: bool,
}

/// Find-or-create operations against one graph store
pub struct NodeResolver {
    store: Arc<dyn GraphStore>,
    builder: Arc<GraphUpdateBuilder>,
    layers: LayerQuery,
    state: Arc<dyn KeyValueStore>,
    urls: NodeUrlFormat,
}

impl NodeResolver {
    pub fn new(
        store: Arc<dyn GraphStore>,
        builder: Arc<GraphUpdateBuilder>,
        state: Arc<dyn KeyValueStore>,
        urls: NodeUrlFormat,
    ) -> Self {
        Self {
            layers: LayerQuery::new(store.clone()),
            store,
            builder,
            state,
            urls,
        }
    }

    /// Replace the layer query, e.g. to change its retry policy
    pub fn with_layer_query(mut self, layers: LayerQuery) -> Self {
        self.layers = layers;
        self
    }

    pub fn urls(&self) -> &NodeUrlFormat {
        &self.urls
    }

    /// Link to a node created by this client
    pub fn node_url(&self, node_id: &str) -> String {
        self.urls.node_url(node_id)
    }

    /// Author stamped on every created record: the user node id saved at
    /// setup
    pub async fn author_id(&self) -> Result<String, ClipperError> {
        let stored: Option<String> = get_typed(self.state.as_ref(), USER_NODE_ID_KEY).await?;
        let stored = stored
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(ClipperError::setup_required)?;
        decode_node_id(stored.trim())
            .ok_or_else(|| ClipperError::configuration("Stored user node id is not valid UTF-8"))
    }

    /// First child of `parent_id` whose first content block is exactly
    /// `text`
    ///
    /// Not found is `Ok(None)`.
    pub async fn find_node_by_text(
        &self,
        parent_id: &str,
        text: &str,
    ) -> Result<Option<GraphNode>, ClipperError> {
        let children = self.layers.get_child_nodes(parent_id).await?;
        let found = children
            .child_nodes
            .into_iter()
            .find(|node| node.first_text() == Some(text));

        match &found {
            Some(node) => tracing::debug!("Found '{}' under '{}': {}", text, parent_id, node.id),
            None => tracing::debug!("No child '{}' under '{}'", text, parent_id),
        }
        Ok(found)
    }

    /// Child of `parent_id` with text `text`, created when missing
    pub async fn ensure_child_node(
        &self,
        parent_id: &str,
        text: &str,
    ) -> Result<ResolvedNode, ClipperError> {
        if let Some(existing) = self.find_node_by_text(parent_id, text).await? {
            return Ok(ResolvedNode {
                id: existing.id,
                created: false,
            });
        }

        let outcome = self
            .create_node(AddNodeParams::new(text, self.author_id().await?).with_parent(parent_id))
            .await?;
        Ok(ResolvedNode {
            id: outcome.new_node_id,
            created: true,
        })
    }

    /// Container `name` under the root node addressed by `root_url`
    ///
    /// # Errors
    ///
    /// [`ClipperError::InvalidNodeUrl`] when `root_url` is not a root node
    /// URL for the configured host.
    pub async fn ensure_container(&self, root_url: &str, name: &str) -> Result<String, ClipperError> {
        let root_id = self.urls.parse_node_id(root_url)?;
        tracing::debug!("Resolving container '{}' under root '{}'", name, root_id);

        let resolved = self.ensure_child_node(&root_id, name).await?;
        if resolved.created {
            tracing::info!("Created container '{}': {}", name, self.node_url(&resolved.id));
        }
        Ok(resolved.id)
    }

    /// Article node for the page at `url` inside `container_id`
    ///
    /// A cached article is reused only while it is still a direct child of
    /// the container. Otherwise a title node plus a `"url"`-labelled URL
    /// child are created and the cache is updated afterwards.
    pub async fn resolve_article_node(
        &self,
        title: &str,
        url: &str,
        container_id: &str,
    ) -> Result<String, ClipperError> {
        let cached = self.cached_articles().await?.remove(url);

        if let Some(article_id) = cached {
            let children = self.layers.get_child_nodes(container_id).await?;
            if children.child_nodes.iter().any(|node| node.id == article_id) {
                tracing::debug!("Reusing article node {} for {}", article_id, url);
                return Ok(article_id);
            }
            tracing::debug!(
                "Cached article node {} is no longer under '{}', creating a new one",
                article_id,
                container_id
            );
        }

        let author_id = self.author_id().await?;
        let article = self
            .create_node(AddNodeParams::new(title, author_id.clone()).with_parent(container_id))
            .await?;
        let article_id = article.new_node_id;

        self.create_node(
            AddNodeParams::new(url, author_id)
                .with_parent(article_id.clone())
                .with_label(URL_RELATION_LABEL),
        )
        .await?;

        // Re-read so entries written since the lookup are kept
        let mut articles = self.cached_articles().await?;
        articles.insert(url.to_string(), article_id.clone());
        set_typed(self.state.as_ref(), ARTICLE_NODES_KEY, &articles).await?;

        tracing::info!("Created article node for {}: {}", url, self.node_url(&article_id));
        Ok(article_id)
    }

    /// New child of `article_id` holding `text`; never deduplicated
    pub async fn append_clip(&self, article_id: &str, text: &str) -> Result<String, ClipperError> {
        let outcome = self
            .create_node(
                AddNodeParams::new(ContentSpec::text(text), self.author_id().await?)
                    .with_parent(article_id),
            )
            .await?;
        Ok(outcome.new_node_id)
    }

    /// Build and submit one add-node transaction
    pub async fn create_node(&self, params: AddNodeParams) -> Result<AddNodeOutcome, ClipperError> {
        let built = self.builder.build_add_node(&params)?;
        self.store.submit_transaction(&built.transaction).await?;

        tracing::debug!(
            "Created node {} ({})",
            built.outcome.new_node_id,
            self.node_url(&built.outcome.new_node_id)
        );
        Ok(built.outcome)
    }

    async fn cached_articles(&self) -> Result<HashMap<String, String>, ClipperError> {
        Ok(get_typed(self.state.as_ref(), ARTICLE_NODES_KEY)
            .await?
            .unwrap_or_default())
    }
}
