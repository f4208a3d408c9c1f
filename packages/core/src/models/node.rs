//! Graph Node Data Structures
//!
//! This module defines the `GraphNode` record exchanged with the Mew sync API
//! and the content blocks a node's `content` is made of.
//!
//! # Wire Shape
//!
//! Nodes travel as camelCase JSON objects. Writes always carry epoch
//! milliseconds for `createdAt`/`updatedAt`; reads tolerate RFC 3339 strings
//! as well, since layer responses are not schema-checked by the server.
//!
//! # Examples
//!
//! ```rust
//! use mew_clipper_core::models::{ContentBlock, GraphNode};
//!
//! let node = GraphNode::new(
//!     "node-1".to_string(),
//!     "user-1".to_string(),
//!     1_700_000_000_000,
//!     vec![ContentBlock::text("My Highlights")],
//! );
//! assert_eq!(node.first_text(), Some("My Highlights"));
//! ```

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Default version value for serde deserialization (version 1)
fn default_version() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

/// Accept epoch milliseconds as a number, a numeric string, or an RFC 3339
/// timestamp. Anything else (including null) reads as 0.
pub(crate) fn lenient_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Some(serde_json::Value::String(s)) => s.parse::<i64>().unwrap_or_else(|_| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.timestamp_millis())
                .unwrap_or_default()
        }),
        _ => 0,
    })
}

/// Flags the Mew client attaches to every node it creates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    #[serde(default)]
    pub is_ai_generated: bool,

    #[serde(default)]
    pub is_unconfirmed: bool,
}

/// One block of a node's content.
///
/// `styles` is a bitmask the web app reserves for inline formatting; this
/// client always writes 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    /// Plain text
    Text {
        #[serde(default)]
        value: String,
        #[serde(default)]
        styles: u32,
    },

    /// Inline reference to another node, `value` is the node id
    #[serde(rename_all = "camelCase")]
    Mention {
        #[serde(default)]
        value: String,
        #[serde(default = "ContentBlock::default_mention_trigger")]
        mention_trigger: String,
    },

    /// Any block type this client does not model (read side only)
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    fn default_mention_trigger() -> String {
        "@".to_string()
    }

    /// Plain text block with no styles
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
            styles: 0,
        }
    }

    /// `@`-triggered mention of `node_id`
    pub fn mention(node_id: impl Into<String>) -> Self {
        Self::Mention {
            value: node_id.into(),
            mention_trigger: Self::default_mention_trigger(),
        }
    }

    /// The block's `value`, if the block type carries one
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Text { value, .. } | Self::Mention { value, .. } => Some(value),
            Self::Unknown => None,
        }
    }
}

/// Node record as stored by the Mew service.
///
/// # Fields
///
/// - `canonical_relation_id`: the relation owning this node's canonical
///   position. For freshly created children this names the parent-child
///   relation added later in the same transaction.
/// - `is_checked`: checkbox state, `None` when the node is not a todo
/// - `access_mode`: service-defined visibility mode, always 0 from this client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    #[serde(default = "default_version")]
    pub version: i64,

    pub id: String,

    #[serde(default)]
    pub author_id: String,

    #[serde(default, deserialize_with = "lenient_millis")]
    pub created_at: i64,

    #[serde(default, deserialize_with = "lenient_millis")]
    pub updated_at: i64,

    #[serde(default)]
    pub content: Vec<ContentBlock>,

    #[serde(default = "default_true")]
    pub is_public: bool,

    #[serde(default)]
    pub is_new_related_objects_public: bool,

    #[serde(default)]
    pub canonical_relation_id: Option<String>,

    #[serde(default)]
    pub is_checked: Option<bool>,

    #[serde(default)]
    pub access_mode: i64,

    #[serde(default)]
    pub attributes: NodeAttributes,
}

impl GraphNode {
    /// Create a public, unparented node stamped with `timestamp`
    pub fn new(id: String, author_id: String, timestamp: i64, content: Vec<ContentBlock>) -> Self {
        Self {
            version: 1,
            id,
            author_id,
            created_at: timestamp,
            updated_at: timestamp,
            content,
            is_public: true,
            is_new_related_objects_public: false,
            canonical_relation_id: None,
            is_checked: None,
            access_mode: 0,
            attributes: NodeAttributes::default(),
        }
    }

    /// Value of the first content block, the node's display name
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(ContentBlock::value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_serializes_camel_case() {
        let mut node = GraphNode::new(
            "n1".to_string(),
            "auth0|u".to_string(),
            123,
            vec![ContentBlock::text("hello")],
        );
        node.canonical_relation_id = Some("r1".to_string());

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "version": 1,
                "id": "n1",
                "authorId": "auth0|u",
                "createdAt": 123,
                "updatedAt": 123,
                "content": [{"type": "text", "value": "hello", "styles": 0}],
                "isPublic": true,
                "isNewRelatedObjectsPublic": false,
                "canonicalRelationId": "r1",
                "isChecked": null,
                "accessMode": 0,
                "attributes": {"isAiGenerated": false, "isUnconfirmed": false}
            })
        );
    }

    #[test]
    fn test_mention_block_wire_shape() {
        let value = serde_json::to_value(ContentBlock::mention("target")).unwrap();
        assert_eq!(
            value,
            json!({"type": "mention", "value": "target", "mentionTrigger": "@"})
        );
    }

    #[test]
    fn test_deserialize_sparse_node_from_layer() {
        let node: GraphNode = serde_json::from_value(json!({
            "id": "n2",
            "createdAt": "2024-03-01T12:00:00Z",
            "content": [
                {"type": "image", "url": "https://example.com/a.png"},
                {"type": "text", "value": "caption"}
            ]
        }))
        .unwrap();

        assert_eq!(node.version, 1);
        assert!(node.is_public);
        assert_eq!(node.created_at, 1_709_294_400_000);
        assert_eq!(node.updated_at, 0);
        assert_eq!(node.content[0], ContentBlock::Unknown);
        assert_eq!(node.first_text(), None);
        assert_eq!(node.content[1].value(), Some("caption"));
    }

    #[test]
    fn test_first_text_reads_mention_value() {
        let node = GraphNode::new(
            "n3".to_string(),
            String::new(),
            0,
            vec![ContentBlock::mention("other")],
        );
        assert_eq!(node.first_text(), Some("other"));
    }
}
