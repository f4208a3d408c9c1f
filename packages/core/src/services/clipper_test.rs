//! Tests for the clipper flows (setup, selection, page, transcript)

#[cfg(test)]
mod tests {
    use crate::config::MewConfig;
    use crate::ids::SequentialIdGenerator;
    use crate::models::{ContentBlock, GraphNode};
    use crate::services::key_value::{KeyValueStore, MemoryKeyValueStore};
    use crate::services::{
        ClipKind, ClipperError, ClipperService, PageInfo, TranscriptOutcome, CONTAINER_NAME,
        TRANSCRIPT_NODE_NAME, USER_NODE_ID_KEY, USER_ROOT_URL_KEY,
    };
    use crate::transport::{InMemoryGraphStore, TransportError};
    use serde_json::json;
    use std::sync::Arc;

    const NOW: i64 = 1_700_000_000_000;
    const ROOT_ID: &str = "user-root-id-auth0|42";
    const ROOT_URL: &str = "https://mew-edge.ideaflow.app/g/all/global-root-to-users/all/users-to-user-relation-id-ABC/user-root-id-auth0%7C42";

    fn config() -> MewConfig {
        let mut config = MewConfig::default();
        config.auth.client_id = "clipper-client".to_string();
        config
    }

    fn service() -> (ClipperService, Arc<InMemoryGraphStore>, Arc<MemoryKeyValueStore>) {
        let store = Arc::new(InMemoryGraphStore::new());
        store.insert_node(GraphNode::new(
            ROOT_ID.to_string(),
            ROOT_ID.to_string(),
            NOW,
            vec![ContentBlock::text("Root")],
        ));
        let state = Arc::new(MemoryKeyValueStore::new());
        let clipper = ClipperService::new(
            &config(),
            store.clone(),
            state.clone(),
            Arc::new(SequentialIdGenerator::new("id", NOW)),
        )
        .unwrap();
        (clipper, store, state)
    }

    async fn configured() -> (ClipperService, Arc<InMemoryGraphStore>, Arc<MemoryKeyValueStore>) {
        let (clipper, store, state) = service();
        clipper.configure(ROOT_URL).await.unwrap();
        (clipper, store, state)
    }

    fn page() -> PageInfo {
        PageInfo::new("Example Domain", "https://example.com/")
    }

    // =========================================================================
    // Setup
    // =========================================================================

    #[tokio::test]
    async fn test_configure_stores_setup() {
        let (clipper, _store, state) = service();

        let user_node_id = clipper.configure(&format!("  {}  ", ROOT_URL)).await.unwrap();
        assert_eq!(user_node_id, ROOT_ID);
        assert_eq!(state.get(USER_NODE_ID_KEY).await.unwrap(), Some(json!(ROOT_ID)));
        assert_eq!(state.get(USER_ROOT_URL_KEY).await.unwrap(), Some(json!(ROOT_URL)));

        let setup = clipper.setup().await.unwrap();
        assert_eq!(setup.user_root_url, ROOT_URL);
        assert_eq!(setup.user_node_id, ROOT_ID);
    }

    #[tokio::test]
    async fn test_configure_rejects_invalid_url() {
        let (clipper, _store, state) = service();

        let err = clipper
            .configure("https://mew-edge.ideaflow.app/g/all/users-to-user-relation-id-A/user-root-id-B")
            .await
            .unwrap_err();

        assert!(matches!(err, ClipperError::InvalidNodeUrl { .. }));
        assert_eq!(state.get(USER_NODE_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_actions_require_setup() {
        let (clipper, store, _state) = service();

        let err = clipper.save_page(&page()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Please complete setup first"
        );
        assert!(store.layer_requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_stored_setup_is_discarded() {
        let (clipper, _store, state) = service();
        state
            .set(USER_ROOT_URL_KEY, json!("https://example.com/not-mew"))
            .await
            .unwrap();
        state.set(USER_NODE_ID_KEY, json!(ROOT_ID)).await.unwrap();

        assert!(matches!(
            clipper.setup().await,
            Err(ClipperError::Configuration { .. })
        ));
        assert_eq!(state.get(USER_ROOT_URL_KEY).await.unwrap(), None);
        assert_eq!(state.get(USER_NODE_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_state_forgets_setup() {
        let (clipper, _store, _state) = configured().await;
        clipper.save_page(&page()).await.unwrap();

        clipper.clear_state().await.unwrap();
        assert!(matches!(
            clipper.setup().await,
            Err(ClipperError::Configuration { .. })
        ));
    }

    // =========================================================================
    // Selection and page
    // =========================================================================

    #[tokio::test]
    async fn test_save_selection() {
        let (clipper, store, _state) = configured().await;

        let receipt = clipper
            .save_selection(&page(), "hello world")
            .await
            .unwrap();

        assert_eq!(receipt.kind, ClipKind::Selection);
        assert_eq!(receipt.notification(), "Selection saved to My Highlights");

        let container = store.node(&receipt.container_id).unwrap();
        assert_eq!(container.first_text(), Some(CONTAINER_NAME));
        let article = store.node(&receipt.article_id).unwrap();
        assert_eq!(article.first_text(), Some("Example Domain"));
        let clip = store.node(receipt.clip_id.as_deref().unwrap()).unwrap();
        assert_eq!(clip.first_text(), Some("hello world"));
        assert_eq!(clip.author_id, ROOT_ID);

        // Container, article, URL child, clip
        let transactions = store.transactions();
        assert_eq!(transactions.len(), 4);
        assert!(transactions
            .iter()
            .all(|tx| tx.client_id == "clipper-client" && tx.user_id == ROOT_ID));
    }

    #[tokio::test]
    async fn test_repeated_selections_share_article() {
        let (clipper, store, _state) = configured().await;

        let first = clipper.save_selection(&page(), "one").await.unwrap();
        let second = clipper.save_selection(&page(), "two").await.unwrap();

        assert_eq!(first.container_id, second.container_id);
        assert_eq!(first.article_id, second.article_id);
        assert_ne!(first.clip_id, second.clip_id);
        assert_eq!(store.children_of(&first.article_id).len(), 3);
    }

    #[tokio::test]
    async fn test_empty_selection_rejected() {
        let (clipper, store, _state) = configured().await;

        let err = clipper.save_selection(&page(), "   ").await.unwrap_err();
        assert!(matches!(err, ClipperError::InvalidPage { .. }));
        assert!(store.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_page_without_title_rejected() {
        let (clipper, _store, _state) = configured().await;

        let err = clipper
            .save_page(&PageInfo::new("", "https://example.com/"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid page: page title is empty");
    }

    #[tokio::test]
    async fn test_save_page() {
        let (clipper, store, _state) = configured().await;

        let receipt = clipper.save_page(&page()).await.unwrap();
        assert_eq!(receipt.kind, ClipKind::Page);
        assert_eq!(receipt.clip_id, None);
        assert_eq!(receipt.notification(), "Page saved to My Highlights");

        // Saving again reuses everything
        let again = clipper.save_page(&page()).await.unwrap();
        assert_eq!(again.article_id, receipt.article_id);
        assert_eq!(store.transactions().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_save_reports_error() {
        let (clipper, store, _state) = configured().await;
        store.fail_next(1, TransportError::http_status(401, "Unauthorized"));

        let err = clipper.save_page(&page()).await.unwrap_err();
        assert_eq!(err.transport().and_then(|e| e.status()), Some(401));
        assert!(store.transactions().is_empty());
    }

    // =========================================================================
    // Transcript
    // =========================================================================

    #[tokio::test]
    async fn test_transcript_stored_once() {
        let (clipper, store, _state) = configured().await;

        let receipt = clipper
            .save_transcript(&page(), "0:00 intro\n0:05 more\n")
            .await
            .unwrap();
        let (transcript_node_id, text_node_id) = match receipt.kind.clone() {
            ClipKind::Transcript(TranscriptOutcome::Stored {
                transcript_node_id,
                text_node_id,
            }) => (transcript_node_id, text_node_id),
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(
            receipt.notification(),
            "Saved page with transcript to My Highlights"
        );
        assert_eq!(
            store.node(&transcript_node_id).unwrap().first_text(),
            Some(TRANSCRIPT_NODE_NAME)
        );
        assert_eq!(
            store.node(&text_node_id).unwrap().first_text(),
            Some("0:00 intro\n0:05 more")
        );

        let transactions_before = store.transactions().len();
        let again = clipper
            .save_transcript(&page(), "a different transcript")
            .await
            .unwrap();
        assert_eq!(
            again.kind,
            ClipKind::Transcript(TranscriptOutcome::AlreadyPresent { transcript_node_id })
        );
        assert_eq!(again.notification(), "Saved page to My Highlights");
        assert_eq!(store.transactions().len(), transactions_before);
    }

    #[tokio::test]
    async fn test_blank_transcript_creates_nothing() {
        let (clipper, store, _state) = configured().await;

        let receipt = clipper.save_transcript(&page(), "  \n").await.unwrap();
        assert_eq!(
            receipt.kind,
            ClipKind::Transcript(TranscriptOutcome::Unavailable)
        );
        assert!(receipt.notification().contains("transcript unavailable"));
        // URL child only
        assert_eq!(store.children_of(&receipt.article_id).len(), 1);
    }
}
