//! Graph Update Builder
//!
//! Turns one "add node" intent into the complete, ordered operation list of a
//! sync transaction. Nothing here touches the network; the result is handed
//! to a [`GraphStore`](crate::transport::GraphStore) for submission.
//!
//! # Operation Order
//!
//! For a node with a parent, a relation label and plain content:
//!
//! 1. `addNode` (new node, `canonicalRelationId` = parent-child relation id)
//! 2. `addRelation` (`child`, parent → new node)
//! 3. `updateRelationList` (register the relation under the parent)
//! 4. `addNode` (label node)
//! 5. `addRelation` (`__type__`, parent-child relation → label node)
//! 6. `updateRelationList` (register the label relation under the relation)
//! 7. `updateRelation` (parent-child relation gets the label relation as its
//!    canonical relation)
//!
//! Step 1 names a relation that only exists after step 2. The service applies
//! operations in order, so this forward reference is part of the protocol
//! and the order must not change.
//!
//! Replacement content appends an `updateRelation` retargeting the
//! parent-child relation to the referenced node and an `updateRelationList`
//! for the new target. The node from step 1 is left unlinked.

use std::sync::Arc;

use crate::ids::IdGenerator;
use crate::models::{
    AddNodeOp, AddRelationOp, ContentBlock, GraphNode, Relation, RelationPosition, Transaction,
    UpdateOperation, UpdateRelationListOp, UpdateRelationOp, CHILD_RELATION_TYPE,
    LABEL_RELATION_TYPE, RELATION_LIST_ALL,
};
use crate::operations::fractional_ordering::PositionAllocator;
use crate::operations::{AddNodeParams, BuildError};

/// Ids produced by one add-node transaction
///
/// Fields that do not apply to the request are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddNodeOutcome {
    pub new_node_id: String,
    pub parent_child_relation_id: Option<String>,
    pub relation_label_node_id: Option<String>,
    pub relation_label_relation_id: Option<String>,
    pub reference_node_id: Option<String>,
    pub reference_canonical_relation_id: Option<String>,
    pub is_checked: Option<bool>,
}

impl AddNodeOutcome {
    /// Node the parent ends up pointing at: the reference node for a
    /// replacement, otherwise the new node
    pub fn effective_node_id(&self) -> &str {
        self.reference_node_id.as_deref().unwrap_or(&self.new_node_id)
    }
}

/// A transaction ready for submission plus the ids it introduces
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTransaction {
    pub transaction: Transaction,
    pub outcome: AddNodeOutcome,
}

/// Builds add-node transactions
///
/// Holds the id source and the per-list position allocator, so a single
/// builder should be shared by everything writing through one client.
pub struct GraphUpdateBuilder {
    client_id: String,
    ids: Arc<dyn IdGenerator>,
    positions: PositionAllocator,
}

impl GraphUpdateBuilder {
    pub fn new(client_id: impl Into<String>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            client_id: client_id.into(),
            ids,
            positions: PositionAllocator::new(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn ids(&self) -> &Arc<dyn IdGenerator> {
        &self.ids
    }

    /// Build the transaction creating one node
    ///
    /// Empty parent ids and labels are treated as absent.
    ///
    /// # Errors
    ///
    /// [`BuildError`] when the request is inconsistent; no partial operation
    /// list is ever returned.
    pub fn build_add_node(&self, params: &AddNodeParams) -> Result<BuiltTransaction, BuildError> {
        let author_id = params.author_id.trim();
        if author_id.is_empty() {
            return Err(BuildError::EmptyAuthor);
        }
        let author_id = author_id.to_string();

        let parent_node_id = params
            .parent_node_id
            .as_deref()
            .filter(|id| !id.is_empty());
        let relation_label = params
            .relation_label
            .as_deref()
            .filter(|label| !label.is_empty());
        let replacement = params.content.replacement();

        if let (Some(label), Some(_)) = (relation_label, replacement) {
            return Err(BuildError::label_with_replacement(label.to_string()));
        }
        if parent_node_id.is_none() {
            if let Some(label) = relation_label {
                return Err(BuildError::label_requires_parent(label.to_string()));
            }
            if let Some(data) = replacement {
                return Err(BuildError::replacement_requires_parent(
                    data.reference_node_id.clone(),
                ));
            }
        }

        let new_node_id = self.ids.new_id();
        let parent_child_relation_id = self.ids.new_id();
        let transaction_id = self.ids.new_id();
        let timestamp = self.ids.now_millis();

        let mut updates = Vec::new();
        let mut outcome = AddNodeOutcome {
            new_node_id: new_node_id.clone(),
            parent_child_relation_id: None,
            relation_label_node_id: None,
            relation_label_relation_id: None,
            reference_node_id: None,
            reference_canonical_relation_id: None,
            is_checked: params.is_checked,
        };

        // Step 1: the node itself
        let mut node = GraphNode::new(
            new_node_id.clone(),
            author_id.clone(),
            timestamp,
            params.content.to_blocks(),
        );
        node.is_checked = params.is_checked;
        if parent_node_id.is_some() {
            node.canonical_relation_id = Some(parent_child_relation_id.clone());
        }
        updates.push(UpdateOperation::AddNode(AddNodeOp { node }));

        // Step 2: containment under the parent
        let Some(parent_node_id) = parent_node_id else {
            return Ok(self.finish(transaction_id, author_id, updates, outcome));
        };
        outcome.parent_child_relation_id = Some(parent_child_relation_id.clone());

        let mut parent_child = Relation::new(
            parent_child_relation_id.clone(),
            author_id.clone(),
            timestamp,
            parent_node_id.to_string(),
            new_node_id.clone(),
            CHILD_RELATION_TYPE,
        );
        let child_position = self.positions.next_position(parent_node_id, timestamp);
        self.push_relation(&mut updates, &parent_child, child_position.clone(), timestamp);

        // Step 3: relation label
        if let Some(label) = relation_label {
            let label_node_id = self.ids.new_id();
            let label_relation_id = self.ids.new_id();

            updates.push(UpdateOperation::AddNode(AddNodeOp {
                node: GraphNode::new(
                    label_node_id.clone(),
                    author_id.clone(),
                    timestamp,
                    vec![ContentBlock::text(label)],
                ),
            }));

            let label_relation = Relation::new(
                label_relation_id.clone(),
                author_id.clone(),
                timestamp,
                parent_child_relation_id.clone(),
                label_node_id.clone(),
                LABEL_RELATION_TYPE,
            );
            let label_position = self
                .positions
                .next_position(&parent_child_relation_id, timestamp);
            self.push_relation(&mut updates, &label_relation, label_position, timestamp);

            let mut labelled = parent_child.clone();
            labelled.canonical_relation_id = Some(label_relation_id.clone());
            updates.push(UpdateOperation::UpdateRelation(UpdateRelationOp {
                old_props: parent_child,
                new_props: labelled.clone(),
            }));
            parent_child = labelled;

            outcome.relation_label_node_id = Some(label_node_id);
            outcome.relation_label_relation_id = Some(label_relation_id);
        }

        // Step 4: point the parent at an existing node instead
        if let Some(data) = replacement {
            let mut retargeted = parent_child.clone();
            retargeted.to_id = data.reference_node_id.clone();
            retargeted.canonical_relation_id = Some(data.reference_canonical_relation_id.clone());
            updates.push(UpdateOperation::UpdateRelation(UpdateRelationOp {
                old_props: parent_child,
                new_props: retargeted,
            }));
            updates.push(UpdateOperation::UpdateRelationList(UpdateRelationListOp {
                relation_id: parent_child_relation_id.clone(),
                old_position: None,
                new_position: child_position,
                author_id: author_id.clone(),
                list_type: RELATION_LIST_ALL.to_string(),
                old_is_public: true,
                new_is_public: true,
                node_id: parent_node_id.to_string(),
                related_node_id: data.reference_node_id.clone(),
            }));

            outcome.reference_node_id = Some(data.reference_node_id.clone());
            outcome.reference_canonical_relation_id =
                Some(data.reference_canonical_relation_id.clone());
        }

        Ok(self.finish(transaction_id, author_id, updates, outcome))
    }

    /// `addRelation` immediately followed by its `updateRelationList`
    fn push_relation(
        &self,
        updates: &mut Vec<UpdateOperation>,
        relation: &Relation,
        position: RelationPosition,
        timestamp: i64,
    ) {
        updates.push(UpdateOperation::AddRelation(AddRelationOp {
            relation: relation.clone(),
            from_pos: position.clone(),
            to_pos: RelationPosition::first(timestamp),
        }));
        updates.push(UpdateOperation::UpdateRelationList(UpdateRelationListOp {
            relation_id: relation.id.clone(),
            old_position: None,
            new_position: position,
            author_id: relation.author_id.clone(),
            list_type: RELATION_LIST_ALL.to_string(),
            old_is_public: true,
            new_is_public: relation.is_public,
            node_id: relation.from_id.clone(),
            related_node_id: relation.to_id.clone(),
        }));
    }

    fn finish(
        &self,
        transaction_id: String,
        author_id: String,
        updates: Vec<UpdateOperation>,
        outcome: AddNodeOutcome,
    ) -> BuiltTransaction {
        tracing::debug!(
            "Built transaction {} with {} operation(s) for node '{}'",
            transaction_id,
            updates.len(),
            outcome.new_node_id
        );
        BuiltTransaction {
            transaction: Transaction {
                client_id: self.client_id.clone(),
                user_id: author_id,
                transaction_id,
                updates,
            },
            outcome,
        }
    }
}
