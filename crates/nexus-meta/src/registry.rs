//! Storage node membership and block-holding records.
//!
//! Nodes are registered explicitly and never removed. Their health is
//! operator-commanded: nothing in the registry infers a Dead node from a
//! stale heartbeat. A Dead node keeps its held-block record, so its copies
//! count again as soon as it is reactivated.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MetaError, MetaResult};
use crate::types::{BlockId, NodeId, NodeStatus, Timestamp};

/// A storage node and the blocks assigned to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNode {
    /// Unique node identifier.
    pub id: NodeId,
    /// Display name, `Node-N`.
    pub name: String,
    /// Operator-commanded health.
    pub status: NodeStatus,
    /// Blocks held, in assignment order, without duplicates.
    held_blocks: Vec<BlockId>,
    /// Recorded at registration.
    pub last_heartbeat: Timestamp,
}

impl StorageNode {
    /// Blocks held by this node, in assignment order.
    pub fn held_blocks(&self) -> &[BlockId] {
        &self.held_blocks
    }

    /// Returns true if the node holds `block`.
    pub fn holds(&self, block: &BlockId) -> bool {
        self.held_blocks.contains(block)
    }

    /// Returns true if the node is Active.
    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }
}

/// A status transition applied by the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    /// Node that changed.
    pub node_id: NodeId,
    /// Display name of the node.
    pub name: String,
    /// Previous status.
    pub from: NodeStatus,
    /// New status.
    pub to: NodeStatus,
}

/// Owns every storage node in the cluster.
#[derive(Debug, Default, Clone)]
pub struct NodeRegistry {
    nodes: Vec<StorageNode>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new Active node with an empty block set.
    ///
    /// The id and name are derived from the registry size, which never
    /// shrinks, so they are unique.
    pub fn register_node(&mut self, now: Timestamp) -> StorageNode {
        let ordinal = self.nodes.len() as u64 + 1;
        let node = StorageNode {
            id: NodeId::new(ordinal),
            name: format!("Node-{}", ordinal),
            status: NodeStatus::Active,
            held_blocks: Vec::new(),
            last_heartbeat: now,
        };
        info!(node_id = %node.id, name = %node.name, "registered storage node");
        self.nodes.push(node.clone());
        node
    }

    /// Looks up a node.
    pub fn get(&self, node_id: NodeId) -> Option<&StorageNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    fn get_mut(&mut self, node_id: NodeId) -> Option<&mut StorageNode> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    /// Sets a node's status.
    ///
    /// Returns the transition, or `None` if the node is unknown or already
    /// in that status.
    pub fn set_status(&mut self, node_id: NodeId, status: NodeStatus) -> Option<StatusChange> {
        let node = self.get_mut(node_id)?;
        if node.status == status {
            return None;
        }
        let from = node.status;
        node.status = status;
        info!(node_id = %node_id, from = %from, to = %status, "node status changed");
        Some(StatusChange {
            node_id,
            name: node.name.clone(),
            from,
            to: status,
        })
    }

    /// Flips a node between Active and Dead. `None` if the node is unknown.
    pub fn toggle(&mut self, node_id: NodeId) -> Option<StatusChange> {
        let current = self.get(node_id)?.status;
        self.set_status(node_id, current.toggled())
    }

    /// Active nodes, in registration order.
    pub fn active_nodes(&self) -> Vec<&StorageNode> {
        self.nodes.iter().filter(|n| n.is_active()).collect()
    }

    /// IDs of Active nodes, in registration order.
    pub fn active_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_active())
            .map(|n| n.id)
            .collect()
    }

    /// Number of Active nodes.
    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    /// Adds `block` to a node's held set.
    ///
    /// Idempotent: returns `Ok(false)` if the node already held it.
    pub fn assign(&mut self, node_id: NodeId, block: BlockId) -> MetaResult<bool> {
        let node = self
            .get_mut(node_id)
            .ok_or(MetaError::NodeNotFound(node_id))?;
        if node.holds(&block) {
            return Ok(false);
        }
        node.held_blocks.push(block);
        debug!(node_id = %node_id, block = %block, "assigned block replica");
        Ok(true)
    }

    /// Removes blocks matching `predicate` from the given nodes.
    ///
    /// Unknown node ids are ignored. Returns the number of removed references.
    pub fn evict<F>(&mut self, node_ids: &[NodeId], predicate: F) -> usize
    where
        F: Fn(&BlockId) -> bool,
    {
        let mut removed = 0;
        for node in self.nodes.iter_mut().filter(|n| node_ids.contains(&n.id)) {
            let before = node.held_blocks.len();
            node.held_blocks.retain(|b| !predicate(b));
            removed += before - node.held_blocks.len();
        }
        removed
    }

    /// Removes blocks matching `predicate` from every node, Dead ones included.
    pub fn evict_everywhere<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&BlockId) -> bool,
    {
        let all: Vec<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        self.evict(&all, predicate)
    }

    /// Active nodes holding `block`.
    pub fn holders(&self, block: &BlockId) -> Vec<&StorageNode> {
        self.nodes
            .iter()
            .filter(|n| n.is_active() && n.holds(block))
            .collect()
    }

    /// Number of Active nodes holding `block`.
    pub fn live_replica_count(&self, block: &BlockId) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.is_active() && n.holds(block))
            .count()
    }

    /// All nodes, in registration order.
    pub fn nodes(&self) -> &[StorageNode] {
        &self.nodes
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
