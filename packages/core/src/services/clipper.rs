//! Clipper flows
//!
//! The user-facing actions: setup, saving a selection, saving a page, and
//! saving a page together with its transcript. Each action resolves the
//! container and article nodes first, then adds its own nodes.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use mew_clipper_core::config::MewConfig;
//! # use mew_clipper_core::ids::SystemIdGenerator;
//! # use mew_clipper_core::services::{ClipperService, JsonFileKeyValueStore, PageInfo};
//! # use mew_clipper_core::transport::HttpGraphStore;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MewConfig::from_env();
//! let clipper = ClipperService::new(
//!     &config,
//!     Arc::new(HttpGraphStore::new(&config)?),
//!     Arc::new(JsonFileKeyValueStore::default_location()?),
//!     Arc::new(SystemIdGenerator::new()),
//! )?;
//!
//! let page = PageInfo::new("Example Domain", "https://example.com/");
//! let receipt = clipper.save_selection(&page, "An interesting sentence").await?;
//! println!("{}", receipt.notification());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::config::MewConfig;
use crate::ids::IdGenerator;
use crate::operations::{AddNodeParams, GraphUpdateBuilder};
use crate::services::key_value::{
    get_typed, KeyValueStore, USER_NODE_ID_KEY, USER_ROOT_URL_KEY,
};
use crate::services::node_resolver::NodeResolver;
use crate::services::node_url::NodeUrlFormat;
use crate::services::ClipperError;
use crate::transport::GraphStore;

/// Name of the container node created under the user's root
pub const CONTAINER_NAME: &str = "My Highlights";

/// Name of the child of an article holding its transcript
pub const TRANSCRIPT_NODE_NAME: &str = "Transcript";

/// Shown while a save is in flight
pub const SAVING_MESSAGE: &str = "Saving to My Highlights...";

/// Shown when a save failed
pub const FAILURE_MESSAGE: &str = "Error saving to My Highlights";

/// Page being clipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub title: String,
    pub url: String,
}

impl PageInfo {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    fn validate(&self) -> Result<(), ClipperError> {
        if self.title.trim().is_empty() {
            return Err(ClipperError::invalid_page("page title is empty"));
        }
        if self.url.trim().is_empty() {
            return Err(ClipperError::invalid_page("page URL is empty"));
        }
        Ok(())
    }
}

/// Persisted setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    pub user_root_url: String,
    pub user_node_id: String,
}

/// What happened to a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
    /// A new `Transcript` node was created holding the text
    Stored {
        transcript_node_id: String,
        text_node_id: String,
    },
    /// The article already had a `Transcript` node; nothing was written
    AlreadyPresent { transcript_node_id: String },
    /// No transcript text was available; nothing was written
    Unavailable,
}

/// Which action produced a receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipKind {
    Selection,
    Page,
    Transcript(TranscriptOutcome),
}

/// Ids touched by a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipReceipt {
    pub kind: ClipKind,
    pub container_id: String,
    pub article_id: String,
    /// Clip node, for selections
    pub clip_id: Option<String>,
}

impl ClipReceipt {
    /// User-facing success message
    pub fn notification(&self) -> &'static str {
        match &self.kind {
            ClipKind::Selection => "Selection saved to My Highlights",
            ClipKind::Page => "Page saved to My Highlights",
            ClipKind::Transcript(TranscriptOutcome::Stored { .. }) => {
                "Saved page with transcript to My Highlights"
            }
            ClipKind::Transcript(TranscriptOutcome::AlreadyPresent { .. }) => {
                "Saved page to My Highlights"
            }
            ClipKind::Transcript(TranscriptOutcome::Unavailable) => {
                "Saved page to My Highlights (transcript unavailable)"
            }
        }
    }
}

/// Entry point for clipper actions
pub struct ClipperService {
    resolver: NodeResolver,
    state: Arc<dyn KeyValueStore>,
}

impl ClipperService {
    /// Wire a clipper from its collaborators
    ///
    /// Transactions carry the configured client id.
    pub fn new(
        config: &MewConfig,
        store: Arc<dyn GraphStore>,
        state: Arc<dyn KeyValueStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, ClipperError> {
        let builder = Arc::new(GraphUpdateBuilder::new(config.sync_client_id(), ids));
        let urls = NodeUrlFormat::from_config(config)?;
        Ok(Self::from_resolver(
            NodeResolver::new(store, builder, state.clone(), urls),
            state,
        ))
    }

    pub fn from_resolver(resolver: NodeResolver, state: Arc<dyn KeyValueStore>) -> Self {
        Self { resolver, state }
    }

    pub fn resolver(&self) -> &NodeResolver {
        &self.resolver
    }

    /// Store the user's root node URL
    ///
    /// # Returns
    ///
    /// The user node id parsed from the URL.
    ///
    /// # Errors
    ///
    /// [`ClipperError::InvalidNodeUrl`] when the URL is not a root node URL
    /// on the configured host; nothing is stored in that case.
    pub async fn configure(&self, root_url: &str) -> Result<String, ClipperError> {
        let root_url = root_url.trim();
        let user_node_id = self.resolver.urls().parse_node_id(root_url)?;

        self.state
            .set(USER_NODE_ID_KEY, Value::String(user_node_id.clone()))
            .await?;
        self.state
            .set(USER_ROOT_URL_KEY, Value::String(root_url.to_string()))
            .await?;

        tracing::info!("Setup complete for user node {}", user_node_id);
        Ok(user_node_id)
    }

    /// Persisted setup, verified
    ///
    /// Incomplete setup, or a root URL for another host, is discarded and
    /// reported as [`ClipperError::Configuration`].
    pub async fn setup(&self) -> Result<Setup, ClipperError> {
        let user_node_id: Option<String> = get_typed(self.state.as_ref(), USER_NODE_ID_KEY).await?;
        let user_root_url: Option<String> =
            get_typed(self.state.as_ref(), USER_ROOT_URL_KEY).await?;

        match (user_node_id, user_root_url) {
            (Some(user_node_id), Some(user_root_url))
                if !user_node_id.is_empty() && self.resolver.urls().is_node_url(&user_root_url) =>
            {
                Ok(Setup {
                    user_root_url,
                    user_node_id,
                })
            }
            (None, None) => Err(ClipperError::setup_required()),
            _ => {
                tracing::warn!("Discarding incomplete or invalid setup");
                self.state.remove(USER_NODE_ID_KEY).await?;
                self.state.remove(USER_ROOT_URL_KEY).await?;
                Err(ClipperError::setup_required())
            }
        }
    }

    /// Save `text` as a clip under the page's article node
    pub async fn save_selection(
        &self,
        page: &PageInfo,
        text: &str,
    ) -> Result<ClipReceipt, ClipperError> {
        if text.trim().is_empty() {
            return Err(ClipperError::invalid_page("selection is empty"));
        }
        let (container_id, article_id) = self.resolve_page(page).await?;

        let clip_id = self.resolver.append_clip(&article_id, text).await?;
        tracing::info!("Clip saved with node id {}", clip_id);

        Ok(ClipReceipt {
            kind: ClipKind::Selection,
            container_id,
            article_id,
            clip_id: Some(clip_id),
        })
    }

    /// Make sure the page has an article node
    pub async fn save_page(&self, page: &PageInfo) -> Result<ClipReceipt, ClipperError> {
        let (container_id, article_id) = self.resolve_page(page).await?;
        tracing::info!("Page saved. Article node id {}", article_id);

        Ok(ClipReceipt {
            kind: ClipKind::Page,
            container_id,
            article_id,
            clip_id: None,
        })
    }

    /// Save the page and, unless the article already has one, a
    /// `Transcript` node holding `transcript`
    ///
    /// A blank transcript creates no `Transcript` node.
    pub async fn save_transcript(
        &self,
        page: &PageInfo,
        transcript: &str,
    ) -> Result<ClipReceipt, ClipperError> {
        let (container_id, article_id) = self.resolve_page(page).await?;

        let outcome = match self
            .resolver
            .find_node_by_text(&article_id, TRANSCRIPT_NODE_NAME)
            .await?
        {
            Some(existing) => {
                tracing::debug!("Transcript node already exists: {}", existing.id);
                TranscriptOutcome::AlreadyPresent {
                    transcript_node_id: existing.id,
                }
            }
            None if transcript.trim().is_empty() => {
                tracing::debug!("No transcript text for {}, not creating a node", page.url);
                TranscriptOutcome::Unavailable
            }
            None => {
                let author_id = self.resolver.author_id().await?;
                let transcript_node = self
                    .resolver
                    .create_node(
                        AddNodeParams::new(TRANSCRIPT_NODE_NAME, author_id.clone())
                            .with_parent(article_id.clone()),
                    )
                    .await?;
                let text_node = self
                    .resolver
                    .create_node(
                        AddNodeParams::new(transcript.trim(), author_id)
                            .with_parent(transcript_node.new_node_id.clone()),
                    )
                    .await?;
                TranscriptOutcome::Stored {
                    transcript_node_id: transcript_node.new_node_id,
                    text_node_id: text_node.new_node_id,
                }
            }
        };

        Ok(ClipReceipt {
            kind: ClipKind::Transcript(outcome),
            container_id,
            article_id,
            clip_id: None,
        })
    }

    /// Forget setup and cached article nodes
    pub async fn clear_state(&self) -> Result<(), ClipperError> {
        self.state.clear().await?;
        tracing::info!("Cleared clipper state");
        Ok(())
    }

    /// Container then article
    async fn resolve_page(&self, page: &PageInfo) -> Result<(String, String), ClipperError> {
        page.validate()?;
        let setup = self.setup().await?;

        let container_id = self
            .resolver
            .ensure_container(&setup.user_root_url, CONTAINER_NAME)
            .await?;
        let article_id = self
            .resolver
            .resolve_article_node(page.title.trim(), page.url.trim(), &container_id)
            .await?;
        Ok((container_id, article_id))
    }
}
