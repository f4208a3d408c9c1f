//! Content Specifications
//!
//! `ContentSpec` is what a caller asks a new node to contain. The update
//! builder renders it into the `ContentBlock` sequence stored on the node.
//!
//! Callers holding loosely shaped JSON (the extension's message payloads)
//! convert at the boundary with [`ContentSpec::from_value`]; the builder
//! itself only ever sees the closed enum.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::ContentBlock;

/// Text placed on the throwaway node created for a replacement
pub const REPLACEMENT_PLACEHOLDER_TEXT: &str = "replacement";

/// Inline mention surrounded by text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionData {
    pub pre_mention_text: String,
    pub post_mention_text: String,
    pub mention_node_id: String,
}

/// Existing node a parent should point at instead of a fresh leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementNodeData {
    pub reference_node_id: String,
    pub reference_canonical_relation_id: String,
}

/// Content requested for a new node
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSpec {
    /// Pre-built blocks, stored unchanged
    Blocks(Vec<ContentBlock>),

    /// A single plain text block
    Text { text: String },

    /// `pre`, `@mention`, `post`
    Mention(MentionData),

    /// Insert a reference to an existing node rather than a new leaf
    Replacement(ReplacementNodeData),
}

impl ContentSpec {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Blocks stored on the node created for this spec
    pub fn to_blocks(&self) -> Vec<ContentBlock> {
        match self {
            Self::Blocks(blocks) => blocks.clone(),
            Self::Text { text } => vec![ContentBlock::text(text.clone())],
            Self::Mention(data) => vec![
                ContentBlock::text(data.pre_mention_text.clone()),
                ContentBlock::mention(data.mention_node_id.clone()),
                ContentBlock::text(data.post_mention_text.clone()),
            ],
            Self::Replacement(_) => vec![ContentBlock::text(REPLACEMENT_PLACEHOLDER_TEXT)],
        }
    }

    pub fn replacement(&self) -> Option<&ReplacementNodeData> {
        match self {
            Self::Replacement(data) => Some(data),
            _ => None,
        }
    }

    /// Convert a loosely shaped content payload.
    ///
    /// Accepted shapes:
    /// - a JSON array of content blocks
    /// - `{"type": "text", "text": ...}`
    /// - `{"type": "mention", "mentionData": {...}}`
    /// - `{"type": "replacement", "replacementNodeData": {...}}`
    ///
    /// Type tags match case-insensitively. Anything unrecognized or malformed
    /// becomes a single empty text block.
    pub fn from_value(value: &Value) -> Self {
        Self::try_from_value(value).unwrap_or_else(|| Self::Blocks(vec![ContentBlock::text("")]))
    }

    fn try_from_value(value: &Value) -> Option<Self> {
        if value.is_array() {
            return serde_json::from_value::<Vec<ContentBlock>>(value.clone())
                .ok()
                .map(Self::Blocks);
        }

        let kind = value.get("type")?.as_str()?.to_ascii_lowercase();
        match kind.as_str() {
            "text" => value.get("text")?.as_str().map(|text| Self::text(text)),
            "mention" => serde_json::from_value(value.get("mentionData")?.clone())
                .ok()
                .map(Self::Mention),
            "replacement" => serde_json::from_value(value.get("replacementNodeData")?.clone())
                .ok()
                .map(Self::Replacement),
            _ => None,
        }
    }
}

impl From<&str> for ContentSpec {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for ContentSpec {
    fn from(text: String) -> Self {
        Self::Text { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_renders_single_block() {
        assert_eq!(
            ContentSpec::text("hello").to_blocks(),
            vec![ContentBlock::text("hello")]
        );
    }

    #[test]
    fn test_mention_renders_three_blocks() {
        let spec = ContentSpec::Mention(MentionData {
            pre_mention_text: "see ".to_string(),
            post_mention_text: " later".to_string(),
            mention_node_id: "n-42".to_string(),
        });
        assert_eq!(
            spec.to_blocks(),
            vec![
                ContentBlock::text("see "),
                ContentBlock::mention("n-42"),
                ContentBlock::text(" later"),
            ]
        );
    }

    #[test]
    fn test_replacement_renders_placeholder() {
        let spec = ContentSpec::Replacement(ReplacementNodeData {
            reference_node_id: "ref".to_string(),
            reference_canonical_relation_id: "ref-rel".to_string(),
        });
        assert_eq!(spec.to_blocks(), vec![ContentBlock::text("replacement")]);
        assert_eq!(spec.replacement().unwrap().reference_node_id, "ref");
    }

    #[test]
    fn test_blocks_pass_through_unchanged() {
        let blocks = vec![ContentBlock::mention("x"), ContentBlock::text("y")];
        assert_eq!(ContentSpec::Blocks(blocks.clone()).to_blocks(), blocks);
    }

    #[test]
    fn test_from_value_accepts_loose_shapes() {
        assert_eq!(
            ContentSpec::from_value(&json!({"type": "text", "text": "clip"})),
            ContentSpec::text("clip")
        );
        assert_eq!(
            ContentSpec::from_value(&json!({
                "type": "Replacement",
                "replacementNodeData": {
                    "referenceNodeId": "a",
                    "referenceCanonicalRelationId": "b"
                }
            })),
            ContentSpec::Replacement(ReplacementNodeData {
                reference_node_id: "a".to_string(),
                reference_canonical_relation_id: "b".to_string(),
            })
        );
        assert_eq!(
            ContentSpec::from_value(&json!([{"type": "text", "value": "raw", "styles": 0}])),
            ContentSpec::Blocks(vec![ContentBlock::text("raw")])
        );
    }

    #[test]
    fn test_from_value_degrades_to_empty_text() {
        let empty = ContentSpec::Blocks(vec![ContentBlock::text("")]);
        assert_eq!(ContentSpec::from_value(&json!(42)), empty);
        assert_eq!(ContentSpec::from_value(&json!({"type": "video"})), empty);
        assert_eq!(ContentSpec::from_value(&json!({"type": "text"})), empty);
        assert_eq!(
            ContentSpec::from_value(&json!({"type": "mention", "mentionData": {"preMentionText": 1}})),
            empty
        );
    }
}
