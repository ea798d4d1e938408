//! Forest configuration
//!
//! A [`TrieConfig`] is fixed for the lifetime of a [`crate::Forest`]. It can be
//! built in code or loaded from a JSON file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default maximum k-mer length
pub const DEFAULT_DEGREE: usize = 20;

/// Default number of node slots reserved up front
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// When per-depth weights are applied to branch and leaf contributions
///
/// Compressed runs always store the raw coefficient and are scaled by the
/// depth weights at query time under both conventions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightFolding {
    /// Branch and leaf weights store `alpha * w[depth]`; insertion stops at the
    /// last depth with a non-negligible weight.
    #[default]
    AtInsert,
    /// Nothing is scaled at insertion; queries multiply every contribution by
    /// its depth weight.
    AtQuery,
}

/// Configuration for a trie forest
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrieConfig {
    /// Longest k-mer tracked by each trie
    #[serde(default = "default_degree")]
    pub degree: usize,
    /// Number of roots (one per sequence position)
    #[serde(default)]
    pub length: usize,
    /// Weight folding convention
    #[serde(default)]
    pub folding: WeightFolding,
    /// Node slots reserved when the arena is created
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Refuse to grow the arena past this many nodes
    #[serde(default)]
    pub max_nodes: Option<usize>,
}

fn default_degree() -> usize {
    DEFAULT_DEGREE
}

fn default_initial_capacity() -> usize {
    DEFAULT_INITIAL_CAPACITY
}

impl Default for TrieConfig {
    fn default() -> Self {
        TrieConfig {
            degree: DEFAULT_DEGREE,
            length: 0,
            folding: WeightFolding::default(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_nodes: None,
        }
    }
}

impl TrieConfig {
    pub fn new(degree: usize, length: usize) -> Self {
        TrieConfig {
            degree,
            length,
            ..Default::default()
        }
    }

    pub fn with_folding(mut self, folding: WeightFolding) -> Self {
        self.folding = folding;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    /// Load a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TrieConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a forest cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.degree == 0 {
            return Err(Error::InvalidConfig("degree must be at least 1".into()));
        }
        Ok(())
    }
}
