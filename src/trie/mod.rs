//! Compact k-mer trie forest
//!
//! This implements an arena-backed forest of tries where:
//! - Each sequence position owns one trie of k-mers up to `degree` symbols
//! - Unbranched suffixes of up to 16 symbols are stored inline as runs
//! - The level above the deepest k-mers folds its children into four weights
//! - Queries replay the insertion walk read-only to score new sequences

mod arena;
mod node;
mod query;
mod tree;

pub use node::{Child, Node, NodeId, Payload, Run, RUN_CAPACITY};
pub use query::{Probe, MAX_KMER_TABLE};
pub use tree::{Forest, NEGLIGIBLE_WEIGHT};
