//! Trie node types

use crate::alphabet::ALPHABET_SIZE;
use std::fmt;

/// Longest suffix a run node can hold inline
pub const RUN_CAPACITY: usize = 16;

/// Handle of a node in the arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Handle for arena slot `index`, if it fits in 32 bits
    pub(crate) fn new(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(NodeId)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reference from a branch slot to the next node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Child {
    #[default]
    Empty,
    /// A branch node (or leaf-weight node) one level down
    Branch(NodeId),
    /// A run node holding the rest of the k-mer inline
    Run(NodeId),
}

/// A literal suffix of up to [`RUN_CAPACITY`] symbols
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Run {
    len: u8,
    symbols: [u8; RUN_CAPACITY],
}

impl Run {
    /// Build a run from at most [`RUN_CAPACITY`] symbols
    ///
    /// Panics if `symbols` is empty or too long: callers size runs from the
    /// remaining depth, so either case is a broken invariant.
    pub fn new(symbols: &[u8]) -> Self {
        assert!(
            !symbols.is_empty() && symbols.len() <= RUN_CAPACITY,
            "run length {} outside 1..={}",
            symbols.len(),
            RUN_CAPACITY
        );
        let mut buf = [0u8; RUN_CAPACITY];
        buf[..symbols.len()].copy_from_slice(symbols);
        Run {
            len: symbols.len() as u8,
            symbols: buf,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.symbols[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop the first `n` symbols
    pub fn advance(&mut self, n: usize) {
        assert!(
            n < self.len(),
            "cannot advance run of length {} by {}",
            self.len,
            n
        );
        let len = self.len();
        self.symbols.copy_within(n..len, 0);
        self.len = (len - n) as u8;
    }
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Run").field(&self.as_slice()).finish()
    }
}

/// The three mutually exclusive views of a node's payload
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Payload {
    /// One child reference per symbol
    Branch([Child; ALPHABET_SIZE]),
    /// One weight per symbol, used one level above the deepest k-mer
    Leaf([f64; ALPHABET_SIZE]),
    /// A compressed suffix shared by every example that reached this node
    Run(Run),
}

/// A node in the arena
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub weight: f64,
    pub payload: Payload,
}

impl Node {
    /// A branch node with every slot empty
    pub fn branch(weight: f64) -> Self {
        Node {
            weight,
            payload: Payload::Branch([Child::Empty; ALPHABET_SIZE]),
        }
    }

    /// A node whose children are folded into per-symbol weights
    pub fn leaf(weight: f64) -> Self {
        Node {
            weight,
            payload: Payload::Leaf([0.0; ALPHABET_SIZE]),
        }
    }

    pub fn run(weight: f64, symbols: &[u8]) -> Self {
        Node {
            weight,
            payload: Payload::Run(Run::new(symbols)),
        }
    }

    /// Branch or leaf node for the level reached after consuming symbol `depth`
    pub fn interior(weight: f64, depth: usize, degree: usize) -> Self {
        if depth + 2 == degree {
            Node::leaf(weight)
        } else {
            Node::branch(weight)
        }
    }

    /// Child reference for `symbol`; leaf and run nodes have none
    pub fn child(&self, symbol: u8) -> Child {
        match &self.payload {
            Payload::Branch(children) => children[symbol as usize],
            _ => Child::Empty,
        }
    }

    pub fn set_child(&mut self, symbol: u8, child: Child) {
        match &mut self.payload {
            Payload::Branch(children) => children[symbol as usize] = child,
            other => panic!("set_child on non-branch payload {:?}", other),
        }
    }

    pub fn leaf_weights(&self) -> Option<&[f64; ALPHABET_SIZE]> {
        match &self.payload {
            Payload::Leaf(w) => Some(w),
            _ => None,
        }
    }

    pub fn leaf_weights_mut(&mut self) -> Option<&mut [f64; ALPHABET_SIZE]> {
        match &mut self.payload {
            Payload::Leaf(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_run(&self) -> Option<&Run> {
        match &self.payload {
            Payload::Run(run) => Some(run),
            _ => None,
        }
    }

    pub fn as_run_mut(&mut self) -> Option<&mut Run> {
        match &mut self.payload {
            Payload::Run(run) => Some(run),
            _ => None,
        }
    }
}
