//! Mutation records
//!
//! Child-list changes recorded by the tree and drained by the host in batches.

use crate::NodeId;

/// Child-list mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub fn added(target: NodeId, node: NodeId) -> Self {
        Self {
            target,
            added_nodes: vec![node],
            removed_nodes: Vec::new(),
        }
    }

    pub fn removed(target: NodeId, node: NodeId) -> Self {
        Self {
            target,
            added_nodes: Vec::new(),
            removed_nodes: vec![node],
        }
    }
}
