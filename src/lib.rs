//! # wdtrie
//!
//! A memory-compact trie forest for weighted-degree string kernels.
//!
//! wdtrie accumulates weighted k-mer statistics over nucleotide sequences,
//! one trie per sequence position, and evaluates kernel contributions of new
//! sequences against them.
//!
//! ## Core Concepts
//!
//! - **Forest**: one trie root per position, all sharing one node arena
//! - **Degree**: the longest k-mer tracked
//! - **Runs**: unbranched suffixes stored inline instead of as node chains
//! - **Weighting**: per-depth weights, optionally per position, plus an
//!   optional scalar weight per position
//!
//! ## Example
//!
//! ```
//! use wdtrie::{Forest, Probe, TrieConfig, Weighting};
//!
//! let mut forest = Forest::new(TrieConfig::new(3, 5))?;
//! forest.insert(0, 0, &[0, 1, 2], 1.0, &[1.0, 1.0, 1.0])?;
//!
//! let weights = [1.0, 1.0, 1.0];
//! let score = forest.score(&Probe::new(&[0, 1, 2], 0, 0), &Weighting::shared(&weights))?;
//! assert_eq!(score, 3.0);
//! # Ok::<(), wdtrie::Error>(())
//! ```

pub mod alphabet;
pub mod config;
pub mod dataset;
pub mod kernel;
pub mod trie;
pub mod weights;

mod error;

pub use config::{TrieConfig, WeightFolding};
pub use error::{Error, Result};
pub use kernel::WdKernel;
pub use trie::{Forest, NodeId, Probe};
pub use weights::{weighted_degree, DepthWeights, Weighting};
