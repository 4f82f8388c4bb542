//! Stable node ids

use crate::host::NodeRef;
use crate::mirror::record::NodeId;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Identity registry: bidirectional map between host nodes and stable ids
///
/// Ids are allocated monotonically from 1 and never handed to another node,
/// even after the original node is retired. The registry holds only
/// [`NodeRef`] handles; the host tree keeps ownership of the nodes.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Map from host node to its id
    ids: HashMap<NodeRef, NodeId>,

    /// Map from id to host node, in allocation order
    nodes: IndexMap<NodeId, NodeRef>,

    /// Next id to hand out
    next_id: u32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new empty Registry
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            nodes: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Clear all ids and pre-allocate the first one for `root`
    pub fn reset(&mut self, root: NodeRef) -> NodeId {
        self.ids.clear();
        self.nodes.clear();
        self.next_id = 1;
        self.id_for(root)
    }

    /// Get the id of `node`, allocating one on first use
    pub fn id_for(&mut self, node: NodeRef) -> NodeId {
        if let Some(&id) = self.ids.get(&node) {
            return id;
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.ids.insert(node, id);
        self.nodes.insert(id, node);
        id
    }

    /// Get the id of `node` without allocating
    pub fn get(&self, node: NodeRef) -> Option<NodeId> {
        self.ids.get(&node).copied()
    }

    /// Check if `node` has an id
    pub fn has(&self, node: NodeRef) -> bool {
        self.ids.contains_key(&node)
    }

    /// Find the node an id was allocated to
    pub fn node(&self, id: NodeId) -> Option<NodeRef> {
        self.nodes.get(&id).copied()
    }

    /// Forget `node`; its id stays consumed and is never reallocated
    pub fn retire(&mut self, node: NodeRef) -> Option<NodeId> {
        let id = self.ids.remove(&node)?;
        self.nodes.shift_remove(&id);
        Some(id)
    }

    /// Get the number of registered nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all (id, node) pairs in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeRef)> {
        self.nodes.iter()
    }
}
