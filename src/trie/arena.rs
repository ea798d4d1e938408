//! Append-only node arena

use super::node::{Node, NodeId};
use crate::{Error, Result};

/// Grow once fewer than this many free slots remain
const FREE_SLOT_THRESHOLD: usize = 10;

/// Multiplicative growth factor
const GROWTH_FACTOR: f64 = 1.2;

/// A growable pool of nodes addressed by [`NodeId`]
///
/// Nodes are never removed individually; handles stay valid across growth.
/// Only `&mut` access can allocate, so a borrowed node reference can never
/// outlive a reallocation.
#[derive(Debug)]
pub struct Arena {
    nodes: Vec<Node>,
    /// Logical capacity, grown by [`GROWTH_FACTOR`]
    capacity: usize,
    /// Hard cap on the number of nodes, if any
    limit: Option<usize>,
}

impl Arena {
    pub fn with_capacity(capacity: usize, limit: Option<usize>) -> Result<Self> {
        let mut nodes = Vec::new();
        nodes
            .try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory { capacity })?;
        Ok(Arena {
            nodes,
            capacity,
            limit,
        })
    }

    /// Append a node and return its handle
    pub fn allocate(&mut self, node: Node) -> Result<NodeId> {
        let id = next_id(self.nodes.len())?;
        self.ensure_capacity()?;
        self.nodes.push(node);
        Ok(id)
    }

    fn ensure_capacity(&mut self) -> Result<()> {
        if let Some(limit) = self.limit {
            if self.nodes.len() >= limit {
                log::error!("node arena exhausted at {} nodes", limit);
                return Err(Error::OutOfMemory { capacity: limit });
            }
        }

        if self.nodes.len() + FREE_SLOT_THRESHOLD < self.capacity {
            return Ok(());
        }

        let grown = (self.capacity as f64 * GROWTH_FACTOR) as usize;
        let target = grown.max(self.nodes.len() + FREE_SLOT_THRESHOLD + 1);
        log::debug!(
            "extending node arena from {} to {} nodes",
            self.capacity,
            target
        );

        if self
            .nodes
            .try_reserve_exact(target - self.nodes.len())
            .is_err()
        {
            log::error!("out of memory growing node arena to {} nodes", target);
            return Err(Error::OutOfMemory { capacity: target });
        }
        self.capacity = target;
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every node, keeping the reserved storage
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Handle for the node appended after `len` existing ones
fn next_id(len: usize) -> Result<NodeId> {
    NodeId::new(len).ok_or_else(|| {
        log::error!("node arena exhausted: {} nodes is the handle limit", len);
        Error::OutOfMemory { capacity: len }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_sequential() {
        let mut arena = Arena::with_capacity(4, None).unwrap();
        let a = arena.allocate(Node::branch(0.0)).unwrap();
        let b = arena.allocate(Node::leaf(1.0)).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena.get(b).weight, 1.0);
    }

    #[test]
    fn test_growth_keeps_contents() {
        let mut arena = Arena::with_capacity(0, None).unwrap();
        let ids: Vec<_> = (0..100)
            .map(|i| arena.allocate(Node::branch(i as f64)).unwrap())
            .collect();

        assert!(arena.capacity() >= arena.len() + FREE_SLOT_THRESHOLD);
        for (i, id) in ids.into_iter().enumerate() {
            assert_eq!(arena.get(id).weight, i as f64);
        }
    }

    #[test]
    fn test_growth_factor() {
        let mut arena = Arena::with_capacity(100, None).unwrap();
        for _ in 0..90 {
            arena.allocate(Node::branch(0.0)).unwrap();
        }
        assert_eq!(arena.capacity(), 100);

        arena.allocate(Node::branch(0.0)).unwrap();
        assert_eq!(arena.capacity(), 120);
    }

    #[test]
    fn test_limit_reports_out_of_memory() {
        let mut arena = Arena::with_capacity(2, Some(3)).unwrap();
        for _ in 0..3 {
            arena.allocate(Node::branch(0.0)).unwrap();
        }
        let err = arena.allocate(Node::branch(0.0)).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { capacity: 3 }));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_handle_space_is_bounded() {
        let last = u32::MAX as usize;
        assert_eq!(next_id(last).unwrap().index(), last);
        assert!(matches!(
            next_id(last + 1),
            Err(Error::OutOfMemory { capacity }) if capacity == last + 1
        ));
    }

    #[test]
    fn test_clear() {
        let mut arena = Arena::with_capacity(16, None).unwrap();
        arena.allocate(Node::branch(0.0)).unwrap();
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), 16);
    }
}
