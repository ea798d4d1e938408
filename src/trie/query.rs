//! Read-only traversals: kernel queries and weight aggregation

use super::arena::Arena;
use super::node::{Child, NodeId, Payload};
use super::tree::Forest;
use crate::alphabet::{self, ALPHABET_SIZE};
use crate::config::WeightFolding;
use crate::weights::Weighting;
use crate::{Error, Result};

/// Longest k-mer [`Forest::kmer_weights`] tabulates
pub const MAX_KMER_TABLE: usize = 10;

/// Where a query sequence meets the forest
#[derive(Clone, Copy, Debug)]
pub struct Probe<'a> {
    /// Symbols of the query sequence
    pub sequence: &'a [u8],
    /// Index into `sequence` where k-mers start
    pub start: usize,
    /// Root position whose trie is walked
    pub tree: usize,
    /// Row of the position weights and per-position depth weights
    pub weight_row: usize,
}

impl<'a> Probe<'a> {
    /// Probe the trie at `tree` with k-mers starting at `sequence[start]`
    pub fn new(sequence: &'a [u8], start: usize, tree: usize) -> Self {
        Probe {
            sequence,
            start,
            tree,
            weight_row: tree,
        }
    }

    pub fn with_weight_row(mut self, row: usize) -> Self {
        self.weight_row = row;
        self
    }
}

/// Walks a trie without mutating it
///
/// Holding only a shared borrow of the arena, a walker can never allocate;
/// the insert phase has to end before any walker exists.
pub(crate) struct Walker<'a> {
    arena: &'a Arena,
    degree: usize,
    folding: WeightFolding,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(forest: &'a Forest) -> Self {
        Walker {
            arena: &forest.arena,
            degree: forest.config.degree,
            folding: forest.config.folding,
        }
    }

    /// Contribution of a branch or leaf weight stored at `depth`
    fn unfold(&self, stored: f64, weights: &[f64], depth: usize) -> f64 {
        match self.folding {
            WeightFolding::AtInsert => stored,
            WeightFolding::AtQuery => stored * weights[depth],
        }
    }

    /// Follow `query` down from `root`, reporting `(depth, contribution)` for
    /// every matched k-mer
    ///
    /// `query` must be validated and no longer than `degree`.
    pub(crate) fn walk(
        &self,
        root: NodeId,
        query: &[u8],
        weights: &[f64],
        mut visit: impl FnMut(usize, f64),
    ) {
        debug_assert!(query.len() <= self.degree);
        let mut node = root;
        for (j, &symbol) in query.iter().enumerate() {
            let current = self.arena.get(node);

            if j + 1 == self.degree {
                let slots = current
                    .leaf_weights()
                    .unwrap_or_else(|| panic!("node {} at depth {} has no leaf weights", node, j));
                visit(j, self.unfold(slots[symbol as usize], weights, j));
                return;
            }

            match current.child(symbol) {
                Child::Branch(next) => {
                    node = next;
                    visit(j, self.unfold(self.arena.get(next).weight, weights, j));
                }
                Child::Run(id) => {
                    let run_node = self.arena.get(id);
                    let run = run_node
                        .as_run()
                        .unwrap_or_else(|| panic!("child {} is tagged as a run but is not one", id));
                    let matched = run
                        .as_slice()
                        .iter()
                        .zip(&query[j..])
                        .take_while(|(a, b)| a == b)
                        .count();
                    // runs keep the raw coefficient under both conventions
                    for depth in j..j + matched {
                        visit(depth, run_node.weight * weights[depth]);
                    }
                    return;
                }
                Child::Empty => return,
            }
        }
    }

    /// Add the absolute weight of every node below `root` into `out[depth]`
    pub(crate) fn abs_per_depth(&self, root: NodeId, weights: &[f64], out: &mut [f64]) {
        let root_node = self.arena.get(root);
        if let Some(slots) = root_node.leaf_weights() {
            for &w in slots {
                out[0] += self.unfold(w, weights, 0).abs();
            }
            return;
        }

        let mut stack: Vec<(Child, usize)> = Vec::new();
        push_children(&mut stack, root_node.payload, 0);

        while let Some((child, depth)) = stack.pop() {
            match child {
                Child::Empty => {}
                Child::Run(id) => {
                    let node = self.arena.get(id);
                    let len = node.as_run().map_or(0, |r| r.len());
                    for d in depth..depth + len {
                        out[d] += (node.weight * weights[d]).abs();
                    }
                }
                Child::Branch(id) => {
                    let node = self.arena.get(id);
                    out[depth] += self.unfold(node.weight, weights, depth).abs();
                    match &node.payload {
                        Payload::Leaf(slots) => {
                            for &w in slots {
                                out[depth + 1] += self.unfold(w, weights, depth + 1).abs();
                            }
                        }
                        payload => push_children(&mut stack, *payload, depth + 1),
                    }
                }
            }
        }
    }

    /// Add what a query gains at depth `target` into `table`, indexed by the
    /// base-4 value of the k-mer that reaches it
    pub(crate) fn kmers(&self, root: NodeId, target: usize, weights: &[f64], table: &mut [f64]) {
        let root_node = self.arena.get(root);
        if let Some(slots) = root_node.leaf_weights() {
            for (symbol, &w) in slots.iter().enumerate() {
                table[symbol] += self.unfold(w, weights, 0);
            }
            return;
        }

        // (child, depth of its edge symbol, k-mer index up to that symbol)
        let mut stack: Vec<(Child, usize, usize)> = Vec::new();
        if let Payload::Branch(children) = root_node.payload {
            stack.extend(children.iter().enumerate().map(|(s, &c)| (c, 0, s)));
        }

        while let Some((child, depth, index)) = stack.pop() {
            match child {
                Child::Empty => {}
                Child::Run(id) => {
                    let node = self.arena.get(id);
                    let symbols = node.as_run().map_or(&[][..], |r| r.as_slice());
                    if depth + symbols.len() <= target {
                        continue;
                    }
                    let index = symbols[1..=target - depth]
                        .iter()
                        .fold(index, |i, &s| i * ALPHABET_SIZE + s as usize);
                    table[index] += node.weight * weights[target];
                }
                Child::Branch(id) => {
                    let node = self.arena.get(id);
                    if depth == target {
                        table[index] += self.unfold(node.weight, weights, depth);
                        continue;
                    }
                    match node.payload {
                        Payload::Leaf(slots) => {
                            for (symbol, &w) in slots.iter().enumerate() {
                                table[index * ALPHABET_SIZE + symbol] +=
                                    self.unfold(w, weights, depth + 1);
                            }
                        }
                        Payload::Branch(children) => stack.extend(
                            children
                                .iter()
                                .enumerate()
                                .map(|(s, &c)| (c, depth + 1, index * ALPHABET_SIZE + s)),
                        ),
                        Payload::Run(_) => {}
                    }
                }
            }
        }
    }

    /// Total absolute stored weight of the subtree under `child`
    pub(crate) fn abs_subtree(&self, child: Child) -> f64 {
        let mut total = 0.0;
        let mut stack = vec![child];
        while let Some(child) = stack.pop() {
            let id = match child {
                Child::Empty => continue,
                Child::Run(id) | Child::Branch(id) => id,
            };
            let node = self.arena.get(id);
            total += node.weight.abs();
            match &node.payload {
                Payload::Branch(children) => stack.extend(children.iter().copied()),
                Payload::Leaf(slots) => total += slots.iter().map(|w| w.abs()).sum::<f64>(),
                Payload::Run(_) => {}
            }
        }
        total
    }
}

fn push_children(stack: &mut Vec<(Child, usize)>, payload: Payload, depth: usize) {
    if let Payload::Branch(children) = payload {
        stack.extend(children.iter().map(|&c| (c, depth)));
    }
}

impl Forest {
    /// The validated part of the query sequence a probe can reach
    fn query_window<'q>(&self, probe: &Probe<'q>) -> Result<&'q [u8]> {
        let seq = probe.sequence;
        let start = probe.start.min(seq.len());
        let end = seq.len().min(start + self.degree());
        let window = &seq[start..end];
        alphabet::validate_from(window, start)?;
        Ok(window)
    }

    /// Kernel contribution of the k-mers of `probe` against one trie
    ///
    /// A zero position weight short-circuits to `0.0` without walking.
    pub fn score(&self, probe: &Probe<'_>, weighting: &Weighting<'_>) -> Result<f64> {
        let root = self.root(probe.tree)?;
        let position_weight = weighting.position_weight(probe.weight_row)?;
        if position_weight == Some(0.0) {
            return Ok(0.0);
        }
        let weights = weighting.depth.row(probe.weight_row, self.degree())?;
        let weights = self.walk_weights(weights)?;
        let query = self.query_window(probe)?;

        let mut sum = 0.0;
        Walker::new(self).walk(root, query, weights, |_, c| sum += c);

        Ok(match position_weight {
            Some(p) => sum * p,
            None => sum,
        })
    }

    /// Spread the contribution of `probe`, scaled by `factor`, over buckets
    ///
    /// Bucket index of a contribution at `depth`:
    /// - with position weights: `weight_row / stride`
    /// - shared depth weights: `depth / stride`
    /// - per-position depth weights: `(depth + degree * weight_row) / stride`
    ///
    /// Nothing is written when `factor` or the position weight is zero, or
    /// when any check fails.
    pub fn score_buckets(
        &self,
        probe: &Probe<'_>,
        weighting: &Weighting<'_>,
        factor: f64,
        buckets: &mut [f64],
        stride: usize,
    ) -> Result<()> {
        if stride == 0 {
            return Err(Error::InvalidConfig("bucket stride must be positive".into()));
        }
        if factor == 0.0 {
            return Ok(());
        }
        let root = self.root(probe.tree)?;
        let position_weight = weighting.position_weight(probe.weight_row)?;
        let factor = match position_weight {
            Some(p) if p == 0.0 => return Ok(()),
            Some(p) => factor * p,
            None => factor,
        };
        let weights = weighting.depth.row(probe.weight_row, self.degree())?;
        let weights = self.walk_weights(weights)?;
        let query = self.query_window(probe)?;

        let degree = self.degree();
        let row = probe.weight_row;
        let per_position = weighting.depth.is_per_position();
        let bucket_of = |depth: usize| {
            if position_weight.is_some() {
                row / stride
            } else if per_position {
                (depth + degree * row) / stride
            } else {
                depth / stride
            }
        };

        let deepest = bucket_of(degree - 1);
        if deepest >= buckets.len() {
            return Err(Error::BucketOutOfRange {
                index: deepest,
                available: buckets.len(),
            });
        }

        Walker::new(self).walk(root, query, weights, |depth, c| {
            buckets[bucket_of(depth)] += factor * c;
        });
        Ok(())
    }

    /// Total absolute weight per depth across every trie
    ///
    /// `weights` scales whatever the forest stores unscaled: runs always, and
    /// everything under [`WeightFolding::AtQuery`]. Under
    /// [`WeightFolding::AtInsert`] they must match the folded weights.
    pub fn abs_weights_per_depth(&self, weights: &[f64]) -> Result<Vec<f64>> {
        let degree = self.degree();
        if weights.len() < degree {
            return Err(Error::WeightsTooShort {
                needed: degree,
                got: weights.len(),
            });
        }
        let weights = self.walk_weights(&weights[..degree])?;
        let walker = Walker::new(self);
        let mut out = vec![0.0; degree];
        for &root in &self.roots {
            walker.abs_per_depth(root, weights, &mut out);
        }
        Ok(out)
    }

    /// Weight of every k-mer of length `k` in the trie at `position`
    ///
    /// Entry `i` belongs to the k-mer whose symbols are the base-4 digits of
    /// `i`, first symbol most significant. Its value is what a query spelling
    /// that k-mer gains at depth `k - 1`.
    pub fn kmer_weights(&self, position: usize, k: usize, weights: &[f64]) -> Result<Vec<f64>> {
        let degree = self.degree();
        if k == 0 || k > degree || k > MAX_KMER_TABLE {
            return Err(Error::InvalidConfig(format!(
                "k-mer length {} outside 1..={}",
                k,
                degree.min(MAX_KMER_TABLE)
            )));
        }
        if weights.len() < degree {
            return Err(Error::WeightsTooShort {
                needed: degree,
                got: weights.len(),
            });
        }
        let root = self.root(position)?;
        let weights = self.walk_weights(&weights[..degree])?;

        let mut table = vec![0.0; ALPHABET_SIZE.pow(k as u32)];
        Walker::new(self).kmers(root, k - 1, weights, &mut table);
        Ok(table)
    }

    /// Total absolute stored weight under each (position, first symbol)
    pub fn abs_weights_per_position(&self) -> Vec<[f64; ALPHABET_SIZE]> {
        let walker = Walker::new(self);
        self.roots
            .iter()
            .map(|&root| {
                let node = self.arena.get(root);
                match node.payload {
                    Payload::Leaf(slots) => slots.map(f64::abs),
                    _ => {
                        let mut row = [0.0; ALPHABET_SIZE];
                        for (symbol, total) in row.iter_mut().enumerate() {
                            *total = walker.abs_subtree(node.child(symbol as u8));
                        }
                        row
                    }
                }
            })
            .collect()
    }
}
