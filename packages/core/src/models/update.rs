//! Sync Protocol Operations
//!
//! A [`Transaction`] is an ordered batch of [`UpdateOperation`]s that the
//! Mew service applies atomically and **strictly in the order given**.
//! Later operations may reference ids introduced by earlier ones, and a node
//! may name (as its `canonicalRelationId`) a relation that is only added by a
//! later operation of the same batch. Reordering the batch is therefore not
//! allowed.

use serde::{Deserialize, Serialize};

use super::node::GraphNode;
use super::relation::{Relation, RelationPosition};

/// Relation-list kind the web app maintains for every node
pub const RELATION_LIST_ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddNodeOp {
    pub node: GraphNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRelationOp {
    pub relation: Relation,
    pub from_pos: RelationPosition,
    pub to_pos: RelationPosition,
}

/// Registers (or moves) `relation_id` inside the relation list of `node_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRelationListOp {
    pub relation_id: String,
    pub old_position: Option<RelationPosition>,
    pub new_position: RelationPosition,
    pub author_id: String,
    #[serde(rename = "type")]
    pub list_type: String,
    pub old_is_public: bool,
    pub new_is_public: bool,
    pub node_id: String,
    pub related_node_id: String,
}

/// Full-record replace of a relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRelationOp {
    pub old_props: Relation,
    pub new_props: Relation,
}

/// One atomic step of a sync transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum UpdateOperation {
    AddNode(AddNodeOp),
    AddRelation(AddRelationOp),
    UpdateRelationList(UpdateRelationListOp),
    UpdateRelation(UpdateRelationOp),
}

impl UpdateOperation {
    /// Wire name of the operation
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddNode(_) => "addNode",
            Self::AddRelation(_) => "addRelation",
            Self::UpdateRelationList(_) => "updateRelationList",
            Self::UpdateRelation(_) => "updateRelation",
        }
    }

    pub fn as_add_node(&self) -> Option<&GraphNode> {
        match self {
            Self::AddNode(op) => Some(&op.node),
            _ => None,
        }
    }

    pub fn as_add_relation(&self) -> Option<&AddRelationOp> {
        match self {
            Self::AddRelation(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_update_relation_list(&self) -> Option<&UpdateRelationListOp> {
        match self {
            Self::UpdateRelationList(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_update_relation(&self) -> Option<&UpdateRelationOp> {
        match self {
            Self::UpdateRelation(op) => Some(op),
            _ => None,
        }
    }
}

/// Payload of `POST {base}/sync`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub client_id: String,
    pub user_id: String,
    pub transaction_id: String,
    pub updates: Vec<UpdateOperation>,
}

impl Transaction {
    /// Number of `addNode` operations in the batch
    pub fn added_node_count(&self) -> usize {
        self.updates
            .iter()
            .filter(|op| op.as_add_node().is_some())
            .count()
    }

    /// Operation names in order, for logging
    pub fn operation_names(&self) -> Vec<&'static str> {
        self.updates.iter().map(UpdateOperation::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentBlock;
    use serde_json::json;

    #[test]
    fn test_update_relation_list_wire_shape() {
        let op = UpdateOperation::UpdateRelationList(UpdateRelationListOp {
            relation_id: "r".to_string(),
            old_position: None,
            new_position: RelationPosition::first(7),
            author_id: "u".to_string(),
            list_type: RELATION_LIST_ALL.to_string(),
            old_is_public: true,
            new_is_public: true,
            node_id: "p".to_string(),
            related_node_id: "c".to_string(),
        });

        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({
                "operation": "updateRelationList",
                "relationId": "r",
                "oldPosition": null,
                "newPosition": {"int": 7, "frac": "a0"},
                "authorId": "u",
                "type": "all",
                "oldIsPublic": true,
                "newIsPublic": true,
                "nodeId": "p",
                "relatedNodeId": "c"
            })
        );
    }

    #[test]
    fn test_add_node_is_tagged_and_parses_back() {
        let op = UpdateOperation::AddNode(AddNodeOp {
            node: GraphNode::new("n".to_string(), "u".to_string(), 1, vec![ContentBlock::text("x")]),
        });
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["operation"], "addNode");
        assert_eq!(value["node"]["id"], "n");

        let parsed: UpdateOperation = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.name(), "addNode");
        assert_eq!(parsed.as_add_node().unwrap().id, "n");
    }

    #[test]
    fn test_transaction_helpers() {
        let tx = Transaction {
            client_id: "client".to_string(),
            user_id: "u".to_string(),
            transaction_id: "t".to_string(),
            updates: vec![UpdateOperation::AddNode(AddNodeOp {
                node: GraphNode::new("n".to_string(), "u".to_string(), 1, vec![]),
            })],
        };
        assert_eq!(tx.added_node_count(), 1);
        assert_eq!(tx.operation_names(), vec!["addNode"]);

        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["clientId"], "client");
        assert_eq!(value["transactionId"], "t");
    }
}
