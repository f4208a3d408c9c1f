//! Relation Data Structures
//!
//! A relation is a directed, typed edge that is itself addressable by id, so
//! other relations can point *at* it (that is how relation labels work).

use serde::{Deserialize, Serialize};

use super::node::lenient_millis;

/// Parent-child containment
pub const CHILD_RELATION_TYPE: &str = "child";

/// "This relation is labelled by that node"; `from_id` is a relation id
pub const LABEL_RELATION_TYPE: &str = "__type__";

/// Fractional key of the first entry in a list at a given `int`
pub const FIRST_FRACTIONAL_KEY: &str = "a0";

fn default_version() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

/// Relation record as stored by the Mew service.
///
/// Updates replace the whole record: an `updateRelation` carries the full
/// old and new props, never a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(default = "default_version")]
    pub version: i64,

    pub id: String,

    #[serde(default)]
    pub author_id: String,

    #[serde(default, deserialize_with = "lenient_millis")]
    pub created_at: i64,

    #[serde(default, deserialize_with = "lenient_millis")]
    pub updated_at: i64,

    pub from_id: String,

    pub to_id: String,

    pub relation_type_id: String,

    #[serde(default = "default_true")]
    pub is_public: bool,

    #[serde(default)]
    pub canonical_relation_id: Option<String>,
}

impl Relation {
    /// Create a public relation with no canonical relation
    pub fn new(
        id: String,
        author_id: String,
        timestamp: i64,
        from_id: String,
        to_id: String,
        relation_type_id: impl Into<String>,
    ) -> Self {
        Self {
            version: 1,
            id,
            author_id,
            created_at: timestamp,
            updated_at: timestamp,
            from_id,
            to_id,
            relation_type_id: relation_type_id.into(),
            is_public: true,
            canonical_relation_id: None,
        }
    }

    /// True for a `child` edge leaving `parent_id`
    pub fn is_child_of(&self, parent_id: &str) -> bool {
        self.from_id == parent_id && self.relation_type_id == CHILD_RELATION_TYPE
    }
}

/// Order key of a relation inside a relation list.
///
/// `int` is a coarse millisecond timestamp, `frac` a fractional-index key
/// breaking ties between entries sharing the same `int`. Entries sort by
/// `(int, frac)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationPosition {
    pub int: i64,
    pub frac: String,
}

impl RelationPosition {
    /// Key of the first entry inserted at `timestamp`
    pub fn first(timestamp: i64) -> Self {
        Self {
            int: timestamp,
            frac: FIRST_FRACTIONAL_KEY.to_string(),
        }
    }
}

impl PartialOrd for RelationPosition {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RelationPosition {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.int
            .cmp(&other.int)
            .then_with(|| self.frac.as_bytes().cmp(other.frac.as_bytes()))
    }
}
