//! Read-side Graph Shapes
//!
//! Responses of `POST {base}/layer` and `GET {base}/sync`. Both wrap their
//! maps in a `data` envelope. Map entries may be `null`, or present but
//! empty, when a relation references an object outside the fetched layer.
//! Each entry is decoded on its own; ones that are null or do not decode
//! become `None` here and are dropped by the query layer.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::node::GraphNode;
use super::relation::Relation;

/// Decode a `{ id: record }` map entry by entry
///
/// A malformed record does not fail the whole map; it is kept as `None`.
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<HashMap<String, Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<HashMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();

    let mut entries = HashMap::with_capacity(raw.len());
    for (id, value) in raw {
        let record = if value.is_null() {
            None
        } else {
            match serde_json::from_value::<T>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!("Skipping malformed entry '{}': {}", id, e);
                    None
                }
            }
        };
        entries.insert(id, record);
    }
    Ok(entries)
}

/// Nodes and relations for a set of requested object ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerData {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub nodes_by_id: HashMap<String, Option<GraphNode>>,

    #[serde(default, deserialize_with = "lenient_entries")]
    pub relations_by_id: HashMap<String, Option<Relation>>,
}

impl LayerData {
    /// Node record for `id`, if present and not null
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes_by_id.get(id).and_then(Option::as_ref)
    }

    /// Non-null relations
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations_by_id.values().filter_map(Option::as_ref)
    }
}

/// User record from the full sync snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub email: String,
}

/// Full graph visible to the authenticated client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub users_by_id: HashMap<String, Option<User>>,

    #[serde(default, deserialize_with = "lenient_entries")]
    pub nodes_by_id: HashMap<String, Option<GraphNode>>,

    #[serde(default, deserialize_with = "lenient_entries")]
    pub relations_by_id: HashMap<String, Option<Relation>>,
}

/// `{ "data": ... }` envelope used by the read endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default)]
    pub data: T,
}
