//! In-process [`GraphStore`]
//!
//! Applies transactions to a local graph with the same ordering rules the
//! Mew service enforces: operations run in sequence, a relation may only be
//! added once both ends exist, `updateRelation` must quote the current record
//! in `oldProps`, and a failing operation rolls back the whole transaction.
//! A node's `canonicalRelationId` is not checked, so the forward reference
//! from `addNode` to the relation added after it is accepted.
//!
//! Failures can be injected with [`InMemoryGraphStore::fail_next`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;

use super::{GraphStore, TransportError};
use crate::models::{
    GraphNode, LayerData, Relation, RelationPosition, SyncSnapshot, Transaction, UpdateOperation,
    CHILD_RELATION_TYPE,
};

#[derive(Debug, Clone, Default)]
struct MemoryGraph {
    nodes: HashMap<String, GraphNode>,
    relations: HashMap<String, Relation>,
    /// Relation lists keyed by owner (node or relation id)
    relation_lists: HashMap<String, Vec<(RelationPosition, String)>>,
}

impl MemoryGraph {
    fn object_exists(&self, id: &str) -> bool {
        self.nodes.contains_key(id) || self.relations.contains_key(id)
    }

    fn apply(&mut self, op: &UpdateOperation) -> Result<(), TransportError> {
        match op {
            UpdateOperation::AddNode(add) => {
                let node = &add.node;
                if self.object_exists(&node.id) {
                    return Err(conflict(format!("Object '{}' already exists", node.id)));
                }
                self.nodes.insert(node.id.clone(), node.clone());
            }

            UpdateOperation::AddRelation(add) => {
                let relation = &add.relation;
                if self.object_exists(&relation.id) {
                    return Err(conflict(format!("Object '{}' already exists", relation.id)));
                }
                if !self.object_exists(&relation.from_id) {
                    return Err(bad_request(format!(
                        "Relation '{}' starts at unknown object '{}'",
                        relation.id, relation.from_id
                    )));
                }
                if !self.nodes.contains_key(&relation.to_id) {
                    return Err(bad_request(format!(
                        "Relation '{}' targets unknown node '{}'",
                        relation.id, relation.to_id
                    )));
                }
                self.relations.insert(relation.id.clone(), relation.clone());
            }

            UpdateOperation::UpdateRelationList(list) => {
                let relation = self.relations.get(&list.relation_id).ok_or_else(|| {
                    not_found(format!("Relation '{}' does not exist", list.relation_id))
                })?;
                if relation.from_id != list.node_id || relation.to_id != list.related_node_id {
                    return Err(conflict(format!(
                        "Relation '{}' does not connect '{}' to '{}'",
                        list.relation_id, list.node_id, list.related_node_id
                    )));
                }

                let entries = self.relation_lists.entry(list.node_id.clone()).or_default();
                if entries
                    .iter()
                    .any(|(pos, id)| pos == &list.new_position && id != &list.relation_id)
                {
                    return Err(conflict(format!(
                        "Position {}:{} is already taken in the list of '{}'",
                        list.new_position.int, list.new_position.frac, list.node_id
                    )));
                }
                entries.retain(|(_, id)| id != &list.relation_id);
                entries.push((list.new_position.clone(), list.relation_id.clone()));
                entries.sort();
            }

            UpdateOperation::UpdateRelation(update) => {
                let current = self.relations.get(&update.old_props.id).ok_or_else(|| {
                    not_found(format!("Relation '{}' does not exist", update.old_props.id))
                })?;
                if current != &update.old_props {
                    return Err(conflict(format!(
                        "Stale oldProps for relation '{}'",
                        update.old_props.id
                    )));
                }
                if update.new_props.id != update.old_props.id {
                    return Err(bad_request("updateRelation cannot change a relation id"));
                }
                if !self.nodes.contains_key(&update.new_props.to_id) {
                    return Err(bad_request(format!(
                        "Relation '{}' targets unknown node '{}'",
                        update.new_props.id, update.new_props.to_id
                    )));
                }
                self.relations
                    .insert(update.new_props.id.clone(), update.new_props.clone());
            }
        }
        Ok(())
    }
}

fn conflict(detail: impl Into<String>) -> TransportError {
    TransportError::http_status(409, detail)
}

fn bad_request(detail: impl Into<String>) -> TransportError {
    TransportError::http_status(400, detail)
}

fn not_found(detail: impl Into<String>) -> TransportError {
    TransportError::http_status(404, detail)
}

#[derive(Debug, Default)]
struct MemoryState {
    graph: MemoryGraph,
    transactions: Vec<Transaction>,
    layer_requests: Vec<Vec<String>>,
    pending_failures: VecDeque<TransportError>,
}

/// Graph store living entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: Mutex<MemoryState>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `count` calls (of any kind) fail with `error`
    pub fn fail_next(&self, count: usize, error: TransportError) {
        let mut state = self.lock();
        for _ in 0..count {
            state.pending_failures.push_back(error.clone());
        }
    }

    /// Insert a node directly, bypassing transactions
    pub fn insert_node(&self, node: GraphNode) {
        self.lock().graph.nodes.insert(node.id.clone(), node);
    }

    /// Insert a relation directly, bypassing transactions
    pub fn insert_relation(&self, relation: Relation) {
        self.lock()
            .graph
            .relations
            .insert(relation.id.clone(), relation);
    }

    /// Delete a node; relations pointing at it are left dangling
    pub fn remove_node(&self, id: &str) -> Option<GraphNode> {
        self.lock().graph.nodes.remove(id)
    }

    /// Delete a relation and its list entries
    pub fn remove_relation(&self, id: &str) -> Option<Relation> {
        let mut state = self.lock();
        for entries in state.graph.relation_lists.values_mut() {
            entries.retain(|(_, relation_id)| relation_id != id);
        }
        state.graph.relations.remove(id)
    }

    pub fn node(&self, id: &str) -> Option<GraphNode> {
        self.lock().graph.nodes.get(id).cloned()
    }

    pub fn relation(&self, id: &str) -> Option<Relation> {
        self.lock().graph.relations.get(id).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.lock().graph.nodes.len()
    }

    /// Relation ids registered under `owner_id`, in list order
    pub fn relation_list(&self, owner_id: &str) -> Vec<String> {
        self.lock()
            .graph
            .relation_lists
            .get(owner_id)
            .map(|entries| entries.iter().map(|(_, id)| id.clone()).collect())
            .unwrap_or_default()
    }

    /// Child nodes of `parent_id` in relation-list order
    pub fn children_of(&self, parent_id: &str) -> Vec<GraphNode> {
        let state = self.lock();
        let graph = &state.graph;
        graph
            .relation_lists
            .get(parent_id)
            .into_iter()
            .flatten()
            .filter_map(|(_, relation_id)| graph.relations.get(relation_id))
            .filter(|relation| relation.relation_type_id == CHILD_RELATION_TYPE)
            .filter_map(|relation| graph.nodes.get(&relation.to_id).cloned())
            .collect()
    }

    /// Successfully applied transactions, in submission order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    /// Object ids of every layer query received
    pub fn layer_requests(&self) -> Vec<Vec<String>> {
        self.lock().layer_requests.clone()
    }

    fn take_failure(state: &mut MemoryState) -> Result<(), TransportError> {
        match state.pending_failures.pop_front() {
            Some(err) => {
                tracing::debug!("Injected failure: {}", err);
                Err(err)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn submit_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<serde_json::Value, TransportError> {
        let mut state = self.lock();
        Self::take_failure(&mut state)?;

        let mut staged = state.graph.clone();
        for (index, op) in transaction.updates.iter().enumerate() {
            staged.apply(op).map_err(|e| {
                tracing::debug!(
                    "Transaction {} rejected at operation {} ({}): {}",
                    transaction.transaction_id,
                    index,
                    op.name(),
                    e
                );
                e
            })?;
        }

        state.graph = staged;
        state.transactions.push(transaction.clone());
        Ok(json!({ "transactionId": transaction.transaction_id }))
    }

    async fn fetch_sync_snapshot(&self) -> Result<SyncSnapshot, TransportError> {
        let mut state = self.lock();
        Self::take_failure(&mut state)?;

        Ok(SyncSnapshot {
            users_by_id: HashMap::new(),
            nodes_by_id: state
                .graph
                .nodes
                .iter()
                .map(|(id, node)| (id.clone(), Some(node.clone())))
                .collect(),
            relations_by_id: state
                .graph
                .relations
                .iter()
                .map(|(id, relation)| (id.clone(), Some(relation.clone())))
                .collect(),
        })
    }

    async fn fetch_layer(&self, object_ids: &[String]) -> Result<LayerData, TransportError> {
        let mut state = self.lock();
        state.layer_requests.push(object_ids.to_vec());
        Self::take_failure(&mut state)?;

        let graph = &state.graph;
        let mut layer = LayerData::default();
        for id in object_ids {
            if let Some(node) = graph.nodes.get(id) {
                layer.nodes_by_id.insert(id.clone(), Some(node.clone()));
            } else if !graph.relations.contains_key(id) {
                layer.nodes_by_id.insert(id.clone(), None);
            }

            for relation in graph.relations.values().filter(|r| &r.from_id == id) {
                layer
                    .relations_by_id
                    .insert(relation.id.clone(), Some(relation.clone()));
                layer
                    .nodes_by_id
                    .insert(relation.to_id.clone(), graph.nodes.get(&relation.to_id).cloned());
            }
        }
        Ok(layer)
    }
}
