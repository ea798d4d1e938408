//! Weighted-degree kernel on top of the trie forest
//!
//! This module provides the high-level entry point: add whole training
//! sequences and evaluate whole query sequences, one trie per position.

use crate::config::TrieConfig;
use crate::trie::{Forest, Probe};
use crate::weights::{weighted_degree, Weighting};
use crate::{Error, Result};

/// A weighted-degree kernel expansion `f(x) = sum_i alpha_i k(x_i, x)`
pub struct WdKernel {
    forest: Forest,
    weights: Vec<f64>,
    /// Optional scalar weight per position
    position_weights: Option<Vec<f64>>,
}

impl WdKernel {
    /// Kernel with the standard weighted-degree depth weights
    pub fn new(config: TrieConfig) -> Result<Self> {
        let weights = weighted_degree(config.degree);
        Self::with_weights(config, weights)
    }

    pub fn with_weights(config: TrieConfig, weights: Vec<f64>) -> Result<Self> {
        if weights.len() < config.degree {
            return Err(Error::WeightsTooShort {
                needed: config.degree,
                got: weights.len(),
            });
        }
        Ok(WdKernel {
            forest: Forest::new(config)?,
            weights,
            position_weights: None,
        })
    }

    pub fn set_position_weights(&mut self, weights: Vec<f64>) -> Result<()> {
        if weights.len() < self.forest.len() {
            return Err(Error::WeightsTooShort {
                needed: self.forest.len(),
                got: weights.len(),
            });
        }
        self.position_weights = Some(weights);
        Ok(())
    }

    fn weighting(&self) -> Weighting<'_> {
        let weighting = Weighting::shared(&self.weights);
        match &self.position_weights {
            Some(p) => weighting.with_position_weights(p),
            None => weighting,
        }
    }

    /// Add a training sequence with coefficient `alpha` at every position
    pub fn add_example(&mut self, sequence: &[u8], alpha: f64) -> Result<()> {
        for position in 0..self.forest.len() {
            self.forest
                .insert(position, 0, sequence, alpha, &self.weights)?;
        }
        Ok(())
    }

    /// Kernel expansion value for `sequence`
    pub fn output(&self, sequence: &[u8]) -> Result<f64> {
        let weighting = self.weighting();
        let mut total = 0.0;
        for position in 0..self.forest.len() {
            total += self
                .forest
                .score(&Probe::new(sequence, position, position), &weighting)?;
        }
        Ok(total)
    }

    /// Contribution of `sequence` split into buckets of `stride` depths
    /// (or of `stride` positions when position weights are set)
    pub fn contributions(&self, sequence: &[u8], stride: usize) -> Result<Vec<f64>> {
        if stride == 0 {
            return Err(Error::InvalidConfig("bucket stride must be positive".into()));
        }
        let span = match self.position_weights {
            Some(_) => self.forest.len(),
            None => self.forest.degree(),
        };
        let mut buckets = vec![0.0; span.div_ceil(stride)];
        let weighting = self.weighting();
        for position in 0..self.forest.len() {
            self.forest.score_buckets(
                &Probe::new(sequence, position, position),
                &weighting,
                1.0,
                &mut buckets,
                stride,
            )?;
        }
        Ok(buckets)
    }

    /// Absolute weight per depth over all positions
    pub fn abs_weights_per_depth(&self) -> Result<Vec<f64>> {
        self.forest.abs_weights_per_depth(&self.weights)
    }

    /// Weight of every k-mer of length `k` at `position`, see [`Forest::kmer_weights`]
    pub fn kmer_weights(&self, position: usize, k: usize) -> Result<Vec<f64>> {
        self.forest.kmer_weights(position, k, &self.weights)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Drop every example, keeping configuration and weights
    pub fn clear(&mut self) -> Result<()> {
        self.forest.clear()
    }
}
