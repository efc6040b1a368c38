//! Node Arena - Index allocation for reduce nodes.
//!
//! Nodes are NOT linked by pointers or live subscriptions. They are slots in
//! one arena, and chains hold `NodeId`s into it:
//! - Free index pool for O(1) reuse
//! - Generation counter per slot so a stale id never aliases a reused slot

use super::reduce_node::ReduceNode;
use crate::types::Scalar;

// =============================================================================
// NodeId
// =============================================================================

/// Handle to a node slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Slot index inside the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.index
    }
}

// =============================================================================
// Arena
// =============================================================================

struct Slot<T: Scalar> {
    generation: u32,
    node: Option<ReduceNode<T>>,
}

/// Slot storage for every node owned by one list.
pub(crate) struct NodeArena<T: Scalar> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T: Scalar> NodeArena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Store a node, reusing a freed slot when one is available.
    pub(crate) fn insert(&mut self, node: ReduceNode<T>) -> NodeId {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Take a node out and return its slot to the pool.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<ReduceNode<T>> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&ReduceNode<T>> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut ReduceNode<T>> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Remove every node, handing each one to the caller.
    pub(crate) fn drain(&mut self) -> Vec<ReduceNode<T>> {
        let nodes: Vec<_> = self
            .slots
            .iter_mut()
            .filter_map(|slot| slot.node.take())
            .collect();
        self.slots.clear();
        self.free.clear();
        self.len = 0;
        nodes
    }
}
