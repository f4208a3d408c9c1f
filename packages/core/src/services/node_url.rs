//! User-facing node URLs
//!
//! A user's root node is addressed as
//! `https://<host>/g/all/global-root-to-users/all/users-to-user-relation-id-<X>/user-root-id-<Y>`.
//! The node id is the final segment, percent-decoded, with `%7C` turned into
//! `|` (raw ids use `|` as a separator, e.g. `user-root-id-auth0|123`).
//!
//! Nodes created by this client are linked with the single-segment form
//! `{api_base}/g/all/global-root-to-users/all/users-to-user-relation-id/{node_id}`.
//!
//! # Examples
//!
//! ```rust
//! use mew_clipper_core::services::NodeUrlFormat;
//!
//! let urls = NodeUrlFormat::new("mew-edge.ideaflow.app", "https://mew-edge.ideaflow.app/api")
//!     .unwrap();
//! let id = urls
//!     .parse_node_id(
//!         "https://mew-edge.ideaflow.app/g/all/global-root-to-users/all/users-to-user-relation-id-ABC%7C123/user-root-id-auth0%7C42",
//!     )
//!     .unwrap();
//! assert_eq!(id, "user-root-id-auth0|42");
//! ```

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::config::MewConfig;
use crate::services::ClipperError;

/// Host accepted when none is configured
pub const DEFAULT_NODE_HOST: &str = "mew-edge.ideaflow.app";

const ROOT_PATH: &str = "/g/all/global-root-to-users/all/users-to-user-relation-id";

/// Parses root node URLs for one host and builds node URLs for one API base
#[derive(Debug, Clone)]
pub struct NodeUrlFormat {
    host: String,
    api_base_url: String,
    pattern: Regex,
}

impl NodeUrlFormat {
    pub fn new(
        host: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Result<Self, ClipperError> {
        let host = host.into();
        let pattern = Regex::new(&format!(
            r"^https?://{}{}-[^/]+/user-root-id-[^/]+$",
            regex::escape(&host),
            ROOT_PATH
        ))
        .map_err(|e| ClipperError::configuration(format!("Invalid node host '{}': {}", host, e)))?;

        Ok(Self {
            host,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            pattern,
        })
    }

    /// Host from `node_base_url`, falling back to the public Mew host
    pub fn from_config(config: &MewConfig) -> Result<Self, ClipperError> {
        let host = config
            .node_host()
            .unwrap_or_else(|| DEFAULT_NODE_HOST.to_string());
        Self::new(host, config.api_base_url.clone())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether `url` has the root node URL shape
    pub fn is_node_url(&self, url: &str) -> bool {
        self.pattern.is_match(url.trim())
    }

    /// Node id from a root node URL
    ///
    /// # Errors
    ///
    /// [`ClipperError::InvalidNodeUrl`] for any other URL shape or host.
    pub fn parse_node_id(&self, url: &str) -> Result<String, ClipperError> {
        let url = url.trim();
        if !self.pattern.is_match(url) {
            return Err(ClipperError::invalid_node_url(url));
        }

        let last_segment = url
            .rsplit('/')
            .next()
            .ok_or_else(|| ClipperError::invalid_node_url(url))?;

        decode_node_id(last_segment).ok_or_else(|| ClipperError::invalid_node_url(url))
    }

    /// Link to a node created by this client
    pub fn node_url(&self, node_id: &str) -> String {
        format!("{}{}/{}", self.api_base_url, ROOT_PATH, node_id)
    }
}

/// Parse with the public Mew host
pub fn parse_node_id_from_url(url: &str) -> Result<String, ClipperError> {
    NodeUrlFormat::from_config(&MewConfig::default())?.parse_node_id(url)
}

/// Decode a raw id segment: `%7C` to `|`, percent-decoding, then `%7C` to
/// `|` again
///
/// `None` when the decoded bytes are not UTF-8.
pub fn decode_node_id(segment: &str) -> Option<String> {
    let piped = replace_encoded_pipes(segment);
    let decoded = percent_decode_str(&piped).decode_utf8().ok()?;
    Some(replace_encoded_pipes(&decoded))
}

/// `%7C` and `%7c` to `|`
fn replace_encoded_pipes(segment: &str) -> String {
    segment.replace("%7C", "|").replace("%7c", "|")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://mew-edge.ideaflow.app/g/all/global-root-to-users/all";

    fn urls() -> NodeUrlFormat {
        NodeUrlFormat::new(DEFAULT_NODE_HOST, "https://mew-edge.ideaflow.app/api").unwrap()
    }

    #[test]
    fn test_parse_plain_id() {
        let url = format!("{}/users-to-user-relation-id-ABC%7C123/user-root-id-XYZ", BASE);
        assert_eq!(urls().parse_node_id(&url).unwrap(), "user-root-id-XYZ");
        assert_eq!(parse_node_id_from_url(&url).unwrap(), "user-root-id-XYZ");
    }

    #[test]
    fn test_parse_decodes_pipes_and_escapes() {
        let url = format!(
            "{}/users-to-user-relation-id-ABC/user-root-id-google-oauth2%7c1234%20x",
            BASE
        );
        assert_eq!(
            urls().parse_node_id(&url).unwrap(),
            "user-root-id-google-oauth2|1234 x"
        );

        // Double-encoded pipe survives the second pass
        let url = format!("{}/users-to-user-relation-id-ABC/user-root-id-a%257Cb", BASE);
        assert_eq!(urls().parse_node_id(&url).unwrap(), "user-root-id-a|b");
    }

    #[test]
    fn test_http_scheme_and_whitespace_accepted() {
        let url = "  http://mew-edge.ideaflow.app/g/all/global-root-to-users/all/users-to-user-relation-id-A/user-root-id-B \n";
        assert_eq!(urls().parse_node_id(url).unwrap(), "user-root-id-B");
    }

    #[test]
    fn test_rejects_malformed_urls() {
        let rejected = [
            // Missing global-root-to-users
            "https://mew-edge.ideaflow.app/g/all/users-to-user-relation-id-A/user-root-id-B".to_string(),
            // Wrong host
            "https://evil.example.com/g/all/global-root-to-users/all/users-to-user-relation-id-A/user-root-id-B".to_string(),
            // Final segment without the prefix
            format!("{}/users-to-user-relation-id-A/node-B", BASE),
            // Trailing slash
            format!("{}/users-to-user-relation-id-A/user-root-id-B/", BASE),
            // Single-segment node URL form
            format!("{}/users-to-user-relation-id/user-root-id-B", BASE),
            String::new(),
        ];

        for url in rejected {
            let err = urls().parse_node_id(&url).unwrap_err();
            assert!(
                matches!(err, ClipperError::InvalidNodeUrl { .. }),
                "expected rejection of {:?}",
                url
            );
        }
    }

    #[test]
    fn test_custom_host_is_escaped() {
        let urls = NodeUrlFormat::new("localhost:3000", "http://localhost:3000/api").unwrap();
        assert!(urls.is_node_url(
            "http://localhost:3000/g/all/global-root-to-users/all/users-to-user-relation-id-A/user-root-id-B"
        ));
        // '.' in the configured host is not a wildcard
        let dotted = NodeUrlFormat::new("a.b", "http://a.b/api").unwrap();
        assert!(!dotted.is_node_url(
            "http://aXb/g/all/global-root-to-users/all/users-to-user-relation-id-A/user-root-id-B"
        ));
    }

    #[test]
    fn test_decode_node_id() {
        assert_eq!(decode_node_id("user-root-id-a%7Cb").as_deref(), Some("user-root-id-a|b"));
        assert_eq!(decode_node_id("already|decoded").as_deref(), Some("already|decoded"));
        assert_eq!(decode_node_id("bad-%FF"), None);
    }

    #[test]
    fn test_node_url() {
        assert_eq!(
            urls().node_url("abc-123"),
            "https://mew-edge.ideaflow.app/api/g/all/global-root-to-users/all/users-to-user-relation-id/abc-123"
        );
    }
}
