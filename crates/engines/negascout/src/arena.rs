//! Per-worker scratch storage for the deep part of the search.
//!
//! Nodes closer to the root than `shallow_depth` are kept in the cached tree
//! so a later search can reuse them. Below that, each stack depth gets a single
//! scratch node that is re-expanded on every visit, which keeps memory flat no
//! matter how wide the tree gets.

use std::mem;

use crate::{error::SearchError, node::GameTreeNode};

pub struct SearchArena<M> {
    shallow_depth: u32,
    capacity: usize,
    stack: Vec<GameTreeNode<M>>,
    pub(crate) moves: Vec<M>,
    pub(crate) nodes: u64,
}

impl<M> SearchArena<M> {
    pub fn new(shallow_depth: u32, capacity: usize) -> Self {
        Self {
            shallow_depth,
            capacity,
            stack: Vec::with_capacity(capacity),
            moves: Vec::with_capacity(64),
            nodes: 0,
        }
    }

    pub fn shallow_depth(&self) -> u32 {
        self.shallow_depth
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Nodes visited since the last [`SearchArena::reset_nodes`].
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    pub fn reset_nodes(&mut self) {
        self.nodes = 0;
    }

    /// Scratch slot for a node `stack_depth` plies below the root, or `None`
    /// when that depth still belongs to the cached tree.
    pub(crate) fn slot(&self, stack_depth: u32) -> Option<usize> {
        stack_depth
            .checked_sub(self.shallow_depth)
            .map(|index| index as usize)
    }

    /// Borrows the scratch node at `index` out of the stack. Must be handed
    /// back with [`SearchArena::restore`].
    pub(crate) fn take(&mut self, index: usize) -> Result<GameTreeNode<M>, SearchError> {
        if index >= self.capacity {
            return Err(SearchError::StackCapacityExceeded { capacity: self.capacity });
        }
        if self.stack.len() <= index {
            self.stack.resize_with(index + 1, GameTreeNode::default);
        }
        Ok(mem::take(&mut self.stack[index]))
    }

    pub(crate) fn restore(&mut self, index: usize, node: GameTreeNode<M>) {
        self.stack[index] = node;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_start_at_shallow_depth() {
        let arena: SearchArena<u8> = SearchArena::new(4, 32);
        assert_eq!(arena.slot(3), None);
        assert_eq!(arena.slot(4), Some(0));
        assert_eq!(arena.slot(9), Some(5));
    }

    #[test]
    fn test_take_past_capacity_fails() {
        let mut arena: SearchArena<u8> = SearchArena::new(0, 2);
        assert!(arena.take(1).is_ok());
        assert_eq!(
            arena.take(2),
            Err(SearchError::StackCapacityExceeded { capacity: 2 })
        );
    }

    #[test]
    fn test_restored_node_keeps_children() {
        let mut arena: SearchArena<u8> = SearchArena::new(0, 4);
        let mut node = arena.take(0).unwrap();
        node.children = Some(vec![GameTreeNode::leaf(7)]);
        arena.restore(0, node);
        let again = arena.take(0).unwrap();
        assert_eq!(again.children().len(), 1);
    }
}
