//! Forest of per-position tries and the insertion algorithms

use super::arena::Arena;
use super::node::{Child, Node, NodeId, RUN_CAPACITY};
use crate::alphabet::{self, ALPHABET_SIZE};
use crate::config::{TrieConfig, WeightFolding};
use crate::{Error, Result};

/// Depth weights scaled below this magnitude end an insertion early
pub const NEGLIGIBLE_WEIGHT: f64 = 1e-10;

/// Relative tolerance when comparing depth weights with the folded ones
const WEIGHT_TOLERANCE: f64 = 1e-12;

/// A forest of k-mer tries, one root per sequence position, sharing one arena
///
/// Each trie accumulates weighted k-mers starting at its position:
/// - Branch nodes carry the weight of the k-mer spelled by the path to them
/// - Nodes one level above `degree` fold their children into four weights
/// - Unbranched suffixes of up to 16 symbols are stored inline as runs
///
/// Under [`WeightFolding::AtInsert`] the first insertion fixes the depth
/// weights for the life of the forest: later insertions, queries and
/// aggregations must use the same ones.
#[derive(Debug)]
pub struct Forest {
    pub(crate) config: TrieConfig,
    pub(crate) arena: Arena,
    pub(crate) roots: Vec<NodeId>,
    /// Depth weights folded into branch and leaf weights
    pub(crate) folded: Option<Vec<f64>>,
}

impl Forest {
    /// Create a forest with `config.length` empty roots
    pub fn new(config: TrieConfig) -> Result<Self> {
        config.validate()?;
        let arena = Arena::with_capacity(config.initial_capacity, config.max_nodes)?;
        let mut forest = Forest {
            config,
            arena,
            roots: Vec::new(),
            folded: None,
        };
        forest.plant_roots()?;
        log::debug!(
            "created forest: {} positions, degree {}",
            forest.len(),
            forest.degree()
        );
        Ok(forest)
    }

    fn plant_roots(&mut self) -> Result<()> {
        self.roots.clear();
        self.arena.clear();
        self.folded = None;
        self.roots.reserve(self.config.length);
        for _ in 0..self.config.length {
            // a degree-1 trie stores everything in its root
            let root = if self.config.degree == 1 {
                Node::leaf(0.0)
            } else {
                Node::branch(0.0)
            };
            let id = self.arena.allocate(root)?;
            self.roots.push(id);
        }
        Ok(())
    }

    /// Discard every trie and start over with `length` positions
    pub fn reset(&mut self, length: usize) -> Result<()> {
        log::debug!(
            "resetting forest: {} -> {} positions ({} nodes released)",
            self.len(),
            length,
            self.arena.len()
        );
        self.config.length = length;
        self.plant_roots()
    }

    /// Drop all accumulated weight, keeping the number of positions
    pub fn clear(&mut self) -> Result<()> {
        self.reset(self.config.length)
    }

    /// Number of positions (roots)
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn degree(&self) -> usize {
        self.config.degree
    }

    pub fn config(&self) -> &TrieConfig {
        &self.config
    }

    /// Number of live nodes, roots included
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Current logical capacity of the arena
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Depth weights folded into the stored weights, once anything was inserted
    pub fn folded_weights(&self) -> Option<&[f64]> {
        self.folded.as_deref()
    }

    pub(crate) fn root(&self, position: usize) -> Result<NodeId> {
        self.roots
            .get(position)
            .copied()
            .ok_or(Error::PositionOutOfRange {
                position,
                length: self.len(),
            })
    }

    /// Fail unless `weights` match the depth weights already folded in
    pub(crate) fn check_folded(&self, weights: &[f64]) -> Result<()> {
        let folded = match (&self.folded, self.config.folding) {
            (Some(folded), WeightFolding::AtInsert) => folded,
            _ => return Ok(()),
        };
        for (depth, (&expected, &got)) in folded.iter().zip(weights).enumerate() {
            let scale = expected.abs().max(got.abs()).max(1.0);
            if (expected - got).abs() > WEIGHT_TOLERANCE * scale {
                return Err(Error::InconsistentWeights {
                    depth,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Depth weights a walk scales by: the folded ones under `AtInsert`
    /// (after checking `given` against them), `given` otherwise
    pub(crate) fn walk_weights<'w>(&'w self, given: &'w [f64]) -> Result<&'w [f64]> {
        self.check_folded(given)?;
        Ok(match self.config.folding {
            WeightFolding::AtInsert => self.folded.as_deref().unwrap_or(given),
            WeightFolding::AtQuery => given,
        })
    }

    fn record_weights(&mut self, weights: &[f64]) -> Result<()> {
        if self.config.folding != WeightFolding::AtInsert {
            return Ok(());
        }
        if self.folded.is_none() {
            log::debug!("folding depth weights into the forest at insertion");
            self.folded = Some(weights.to_vec());
            return Ok(());
        }
        self.check_folded(weights)
    }

    /// Validated symbols an insertion at `position` sees
    fn insert_window<'s>(
        &self,
        position: usize,
        offset: usize,
        sequence: &'s [u8],
    ) -> Result<&'s [u8]> {
        let start = position.saturating_add(offset);
        let end = self
            .len()
            .min(sequence.len())
            .min(start.saturating_add(self.degree()));
        let window = if start < end {
            &sequence[start..end]
        } else {
            &[][..]
        };
        alphabet::validate_from(window, start)?;
        Ok(window)
    }

    /// Add one weighted example to the trie at `position`
    ///
    /// The k-mers start at `sequence[position + offset]` and are cut at the
    /// forest length, the sequence end, and `degree`; the example contributes
    /// only to k-mers inside that window. Every symbol in the window is
    /// checked before the trie is touched. Running out of arena space
    /// mid-insert leaves the trie partially updated; the forest should be
    /// abandoned after an `OutOfMemory` error.
    pub fn insert(
        &mut self,
        position: usize,
        offset: usize,
        sequence: &[u8],
        alpha: f64,
        weights: &[f64],
    ) -> Result<()> {
        let root = self.root(position)?;
        let degree = self.degree();
        if weights.len() < degree {
            return Err(Error::WeightsTooShort {
                needed: degree,
                got: weights.len(),
            });
        }
        let weights = &weights[..degree];
        let window = self.insert_window(position, offset, sequence)?;
        self.record_weights(weights)?;

        let max_depth = match self.config.folding {
            WeightFolding::AtInsert => weights
                .iter()
                .rposition(|w| (w * alpha).abs() > NEGLIGIBLE_WEIGHT)
                .map_or(0, |j| j + 1),
            WeightFolding::AtQuery => degree,
        };

        let mut inserter = Inserter {
            arena: &mut self.arena,
            degree,
            folding: self.config.folding,
            window,
            steps: max_depth.min(window.len()),
            alpha,
            weights,
        };
        inserter.run(root)
    }

    /// Add an example to every k-mer within `max_mismatch` substitutions of it
    ///
    /// `weights` is a `degree x (max_mismatch + 1)` matrix, column-major by
    /// mismatch count: a k-mer of length `d + 1` that differs from the
    /// example in `m` places gains `alpha * weights[d + degree * m]`. Column
    /// zero must match the depth weights used by [`Forest::insert`]. Paths
    /// touched here are stored as branch nodes; runs met on the way are
    /// expanded. Requires [`WeightFolding::AtInsert`].
    pub fn insert_with_mismatches(
        &mut self,
        position: usize,
        offset: usize,
        sequence: &[u8],
        alpha: f64,
        max_mismatch: usize,
        weights: &[f64],
    ) -> Result<()> {
        if self.config.folding != WeightFolding::AtInsert {
            return Err(Error::InvalidConfig(
                "mismatch insertion needs at-insert weight folding".into(),
            ));
        }
        let root = self.root(position)?;
        let degree = self.degree();
        let needed = max_mismatch
            .checked_add(1)
            .and_then(|columns| columns.checked_mul(degree))
            .unwrap_or(usize::MAX);
        if weights.len() < needed {
            return Err(Error::WeightsTooShort {
                needed,
                got: weights.len(),
            });
        }
        let window = self.insert_window(position, offset, sequence)?;
        self.record_weights(&weights[..degree])?;

        let mut inserter = Inserter {
            arena: &mut self.arena,
            degree,
            folding: self.config.folding,
            window,
            steps: window.len(),
            alpha,
            weights: &weights[..degree],
        };
        inserter.run_mismatches(root, max_mismatch, &weights[..needed])
    }
}

/// State of one insertion walk
struct Inserter<'a> {
    arena: &'a mut Arena,
    degree: usize,
    folding: WeightFolding,
    /// Symbols from the start position, at most `degree` long
    window: &'a [u8],
    /// Number of depths this example contributes to
    steps: usize,
    alpha: f64,
    /// Depth weights, `degree` long
    weights: &'a [f64],
}

impl Inserter<'_> {
    /// Weight stored for `value` at `depth` under the folding convention
    fn fold(&self, value: f64, depth: usize) -> f64 {
        match self.folding {
            WeightFolding::AtInsert => value * self.weights[depth],
            WeightFolding::AtQuery => value,
        }
    }

    fn run(&mut self, root: NodeId) -> Result<()> {
        let mut node = root;
        for j in 0..self.steps {
            let symbol = self.window[j];

            if j + 1 == self.degree {
                let add = self.fold(self.alpha, j);
                let slots = self
                    .arena
                    .get_mut(node)
                    .leaf_weights_mut()
                    .unwrap_or_else(|| panic!("node {} at depth {} has no leaf weights", node, j));
                slots[symbol as usize] += add;
                return Ok(());
            }

            match self.arena.get(node).child(symbol) {
                Child::Branch(next) => {
                    let add = self.fold(self.alpha, j);
                    self.arena.get_mut(next).weight += add;
                    node = next;
                }
                Child::Run(run) => return self.merge_run(node, run, j),
                Child::Empty => {
                    if self.degree - j <= RUN_CAPACITY {
                        let run = Node::run(self.alpha, &self.window[j..self.steps]);
                        let id = self.arena.allocate(run)?;
                        self.arena.get_mut(node).set_child(symbol, Child::Run(id));
                        return Ok(());
                    }
                    let interior = Node::interior(self.fold(self.alpha, j), j, self.degree);
                    let id = self.arena.allocate(interior)?;
                    self.arena.get_mut(node).set_child(symbol, Child::Branch(id));
                    node = id;
                }
            }
        }
        Ok(())
    }

    /// Meet an existing run at depth `j`: either it spells exactly this
    /// example's remaining k-mers, or it is split where the two part ways
    ///
    /// One of the two ending early counts as parting ways: the shorter one
    /// ends on the last shared branch node.
    fn merge_run(&mut self, parent: NodeId, run_id: NodeId, j: usize) -> Result<()> {
        let window = self.window;
        let incoming = &window[j..self.steps];
        let (run, run_weight) = {
            let node = self.arena.get(run_id);
            let run = *node
                .as_run()
                .unwrap_or_else(|| panic!("child {} is tagged as a run but is not one", run_id));
            (run, node.weight)
        };
        let stored = run.as_slice();
        debug_assert_eq!(stored[0], incoming[0], "run does not start with its edge symbol");

        let m = stored
            .iter()
            .zip(incoming)
            .take_while(|(a, b)| a == b)
            .count();
        if m == stored.len() && m == incoming.len() {
            self.arena.get_mut(run_id).weight += self.alpha;
            return Ok(());
        }
        assert!(m > 0, "run {} mismatches on its own edge symbol", run_id);

        let split_depth = j + m;
        log::trace!("splitting run {} at depth {}", run_id, split_depth);

        // the shared prefix becomes a chain of branch nodes carrying both weights
        let carried = run_weight + self.alpha;
        let head = Node::interior(self.fold(carried, j), j, self.degree);
        let mut last = self.arena.allocate(head)?;
        self.arena
            .get_mut(parent)
            .set_child(window[j], Child::Branch(last));
        for depth in j + 1..split_depth {
            let link = Node::interior(self.fold(carried, depth), depth, self.degree);
            let next = self.arena.allocate(link)?;
            self.arena
                .get_mut(last)
                .set_child(window[depth], Child::Branch(next));
            last = next;
        }

        let old_tail = &stored[m..];
        let new_tail = &incoming[m..];
        if split_depth + 1 == self.degree {
            // each tail is at most the final symbol
            let old = old_tail
                .first()
                .map(|&s| (s, self.fold(run_weight, split_depth)));
            let new = new_tail
                .first()
                .map(|&s| (s, self.fold(self.alpha, split_depth)));
            let slots = self
                .arena
                .get_mut(last)
                .leaf_weights_mut()
                .unwrap_or_else(|| panic!("split node {} has no leaf weights", last));
            for (symbol, weight) in old.into_iter().chain(new) {
                slots[symbol as usize] += weight;
            }
            return Ok(());
        }

        if let Some(&symbol) = old_tail.first() {
            if let Some(run) = self.arena.get_mut(run_id).as_run_mut() {
                run.advance(m);
            }
            self.arena
                .get_mut(last)
                .set_child(symbol, Child::Run(run_id));
        }
        if let Some(&symbol) = new_tail.first() {
            let fresh = Node::run(self.alpha, new_tail);
            let id = if old_tail.is_empty() {
                // the old run is fully absorbed by the chain
                *self.arena.get_mut(run_id) = fresh;
                run_id
            } else {
                self.arena.allocate(fresh)?
            };
            self.arena.get_mut(last).set_child(symbol, Child::Run(id));
        }
        Ok(())
    }

    /// Walk every path within `max_mismatch` substitutions of the window
    fn run_mismatches(&mut self, root: NodeId, max_mismatch: usize, matrix: &[f64]) -> Result<()> {
        let mut stack = vec![(root, 0usize, 0usize)];
        while let Some((node, j, mismatches)) = stack.pop() {
            if j == self.steps {
                continue;
            }
            let actual = self.window[j];
            for symbol in 0..ALPHABET_SIZE as u8 {
                let m = mismatches + usize::from(symbol != actual);
                if m > max_mismatch {
                    continue;
                }
                let add = self.alpha * matrix[j + self.degree * m];

                if j + 1 == self.degree {
                    let slots = self
                        .arena
                        .get_mut(node)
                        .leaf_weights_mut()
                        .unwrap_or_else(|| panic!("node {} at depth {} has no leaf weights", node, j));
                    slots[symbol as usize] += add;
                    continue;
                }

                let child = self.branch_child(node, symbol, j)?;
                self.arena.get_mut(child).weight += add;
                stack.push((child, j + 1, m));
            }
        }
        Ok(())
    }

    /// The branch node under `node` for `symbol`, creating or expanding it
    fn branch_child(&mut self, node: NodeId, symbol: u8, j: usize) -> Result<NodeId> {
        match self.arena.get(node).child(symbol) {
            Child::Branch(id) => Ok(id),
            Child::Run(run) => self.expand_run(node, run, j),
            Child::Empty => {
                let id = self.arena.allocate(Node::interior(0.0, j, self.degree))?;
                self.arena.get_mut(node).set_child(symbol, Child::Branch(id));
                Ok(id)
            }
        }
    }

    /// Replace the run under `parent` at depth `j` by an equivalent chain of
    /// branch nodes; the run's own slot becomes the head of the chain
    fn expand_run(&mut self, parent: NodeId, run_id: NodeId, j: usize) -> Result<NodeId> {
        let (run, weight) = {
            let node = self.arena.get(run_id);
            let run = *node
                .as_run()
                .unwrap_or_else(|| panic!("child {} is tagged as a run but is not one", run_id));
            (run, node.weight)
        };
        let symbols = run.as_slice();
        let last_depth = (j + symbols.len() - 1).min(self.degree - 2);

        *self.arena.get_mut(run_id) = Node::interior(self.fold(weight, j), j, self.degree);
        self.arena
            .get_mut(parent)
            .set_child(symbols[0], Child::Branch(run_id));

        let mut last = run_id;
        for depth in j + 1..=last_depth {
            let link = Node::interior(self.fold(weight, depth), depth, self.degree);
            let next = self.arena.allocate(link)?;
            self.arena
                .get_mut(last)
                .set_child(symbols[depth - j], Child::Branch(next));
            last = next;
        }
        if j + symbols.len() == self.degree {
            let add = self.fold(weight, self.degree - 1);
            let slots = self
                .arena
                .get_mut(last)
                .leaf_weights_mut()
                .unwrap_or_else(|| panic!("expanded node {} has no leaf weights", last));
            slots[symbols[symbols.len() - 1] as usize] += add;
        }
        Ok(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::node::Payload;

    fn forest(degree: usize, length: usize) -> Forest {
        Forest::new(TrieConfig::new(degree, length)).unwrap()
    }

    fn run_child(forest: &Forest, node: NodeId, symbol: u8) -> NodeId {
        match forest.arena.get(node).child(symbol) {
            Child::Run(id) => id,
            other => panic!("expected run child, got {:?}", other),
        }
    }

    fn branch_child(forest: &Forest, node: NodeId, symbol: u8) -> NodeId {
        match forest.arena.get(node).child(symbol) {
            Child::Branch(id) => id,
            other => panic!("expected branch child, got {:?}", other),
        }
    }

    #[test]
    fn test_new_forest_has_one_node_per_position() {
        let f = forest(5, 7);
        assert_eq!(f.len(), 7);
        assert_eq!(f.node_count(), 7);
        for &root in &f.roots {
            assert_eq!(f.arena.get(root), &Node::branch(0.0));
        }
    }

    #[test]
    fn test_short_suffix_becomes_run() {
        let mut f = forest(3, 5);
        f.insert(0, 0, &[0, 1, 2], 1.0, &[1.0; 3]).unwrap();

        let run = run_child(&f, f.roots[0], 0);
        let node = f.arena.get(run);
        assert_eq!(node.weight, 1.0);
        assert_eq!(node.as_run().unwrap().as_slice(), &[0, 1, 2]);
        assert_eq!(f.node_count(), 6);
    }

    #[test]
    fn test_repeat_insert_adds_to_run() {
        let mut f = forest(4, 4);
        let seq = [3, 2, 1, 0];
        f.insert(0, 0, &seq, 1.5, &[1.0; 4]).unwrap();
        f.insert(0, 0, &seq, 0.5, &[1.0; 4]).unwrap();

        let run = run_child(&f, f.roots[0], 3);
        assert_eq!(f.arena.get(run).weight, 2.0);
        assert_eq!(f.node_count(), 5);
    }

    #[test]
    fn test_split_in_the_middle() {
        let mut f = forest(5, 5);
        let w = [1.0, 0.5, 0.25, 0.125, 0.0625];
        f.insert(0, 0, &[0, 1, 2, 3, 0], 1.0, &w).unwrap();
        f.insert(0, 0, &[0, 1, 3, 3, 0], 2.0, &w).unwrap();

        let a = branch_child(&f, f.roots[0], 0);
        assert_eq!(f.arena.get(a).weight, 3.0 * w[0]);
        let b = branch_child(&f, a, 1);
        assert_eq!(f.arena.get(b).weight, 3.0 * w[1]);

        let old = run_child(&f, b, 2);
        assert_eq!(f.arena.get(old).weight, 1.0);
        assert_eq!(f.arena.get(old).as_run().unwrap().as_slice(), &[2, 3, 0]);

        let new = run_child(&f, b, 3);
        assert_eq!(f.arena.get(new).weight, 2.0);
        assert_eq!(f.arena.get(new).as_run().unwrap().as_slice(), &[3, 3, 0]);
    }

    #[test]
    fn test_split_on_last_level_uses_leaf_weights() {
        let mut f = forest(3, 3);
        f.insert(0, 0, &[0, 1, 2], 1.0, &[1.0, 1.0, 0.5]).unwrap();
        f.insert(0, 0, &[0, 1, 3], 2.0, &[1.0, 1.0, 0.5]).unwrap();

        let a = branch_child(&f, f.roots[0], 0);
        let b = branch_child(&f, a, 1);
        assert_eq!(f.arena.get(b).weight, 3.0);
        match f.arena.get(b).payload {
            Payload::Leaf(slots) => assert_eq!(slots, [0.0, 0.0, 0.5, 1.0]),
            other => panic!("expected leaf weights, got {:?}", other),
        }

        // the last level now folds into the leaf slot
        f.insert(0, 0, &[0, 1, 0], 4.0, &[1.0, 1.0, 0.5]).unwrap();
        assert_eq!(f.arena.get(b).leaf_weights().unwrap(), &[2.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_long_suffix_creates_branches_before_run() {
        let degree = 20;
        let mut f = forest(degree, degree);
        let seq: Vec<u8> = (0..degree).map(|i| (i % 4) as u8).collect();
        f.insert(0, 0, &seq, 1.0, &vec![1.0; degree]).unwrap();

        // depths 0..4 branch, depth 4 starts a 16-symbol run
        let mut node = f.roots[0];
        for &s in &seq[..4] {
            node = branch_child(&f, node, s);
            assert_eq!(f.arena.get(node).weight, 1.0);
        }
        let run = run_child(&f, node, seq[4]);
        assert_eq!(f.arena.get(run).as_run().unwrap().as_slice(), &seq[4..]);
    }

    #[test]
    fn test_negligible_weights_cap_depth() {
        let degree = 20;
        let mut f = forest(degree, degree);
        let seq = vec![2u8; degree];
        let mut w = vec![0.0; degree];
        w[0] = 1.0;
        w[1] = 1.0;
        f.insert(0, 0, &seq, 1.0, &w).unwrap();

        let a = branch_child(&f, f.roots[0], 2);
        let b = branch_child(&f, a, 2);
        assert_eq!(f.arena.get(b).child(2), Child::Empty);
        assert_eq!(f.node_count(), degree + 2);
    }

    #[test]
    fn test_window_is_cut_at_forest_length() {
        let mut f = forest(6, 4);
        f.insert(1, 1, &[0, 0, 1, 2, 3, 3, 3], 1.0, &[1.0; 6]).unwrap();

        let run = run_child(&f, f.roots[1], 1);
        assert_eq!(f.arena.get(run).as_run().unwrap().as_slice(), &[1, 2]);
    }

    #[test]
    fn test_shorter_run_is_extended_by_longer_window() {
        let mut f = forest(4, 4);
        f.insert(0, 0, &[1, 2], 1.0, &[1.0; 4]).unwrap();
        f.insert(0, 0, &[1, 2, 3, 0], 1.0, &[1.0; 4]).unwrap();

        // both examples share two depths; only the longer one continues
        let a = branch_child(&f, f.roots[0], 1);
        assert_eq!(f.arena.get(a).weight, 2.0);
        let b = branch_child(&f, a, 2);
        assert_eq!(f.arena.get(b).weight, 2.0);
        let tail = run_child(&f, b, 3);
        assert_eq!(f.arena.get(tail).weight, 1.0);
        assert_eq!(f.arena.get(tail).as_run().unwrap().as_slice(), &[3, 0]);
        // the first run's slot is reused for the tail
        assert_eq!(f.node_count(), 7);
    }

    #[test]
    fn test_shorter_window_ends_on_branch() {
        let mut f = forest(4, 4);
        f.insert(0, 0, &[1, 2, 3, 0], 1.0, &[1.0; 4]).unwrap();
        // offset 2 leaves a two-symbol window at position 0
        f.insert(0, 2, &[0, 0, 1, 2], 1.0, &[1.0; 4]).unwrap();

        let a = branch_child(&f, f.roots[0], 1);
        let b = branch_child(&f, a, 2);
        assert_eq!(f.arena.get(b).weight, 2.0);
        let tail = run_child(&f, b, 3);
        assert_eq!(f.arena.get(tail).weight, 1.0);
        assert_eq!(f.arena.get(tail).as_run().unwrap().as_slice(), &[3, 0]);
    }

    #[test]
    fn test_short_window_split_on_last_level() {
        let mut f = forest(3, 3);
        f.insert(0, 0, &[0, 1], 1.0, &[1.0; 3]).unwrap();
        f.insert(0, 0, &[0, 1, 2], 1.0, &[1.0; 3]).unwrap();

        let a = branch_child(&f, f.roots[0], 0);
        let b = branch_child(&f, a, 1);
        assert_eq!(f.arena.get(b).weight, 2.0);
        assert_eq!(f.arena.get(b).leaf_weights().unwrap(), &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_insert_weights_must_match_folded_ones() {
        let mut f = forest(3, 3);
        f.insert(0, 0, &[0, 1, 2], 1.0, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(f.folded_weights(), Some(&[1.0, 1.0, 1.0][..]));

        let err = f.insert(1, 0, &[0, 1, 2], 1.0, &[1.0, 2.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentWeights { depth: 1, expected, got } if expected == 1.0 && got == 2.0
        ));
        assert_eq!(f.node_count(), 4);

        // weights are only fixed until the forest is cleared
        f.clear().unwrap();
        assert_eq!(f.folded_weights(), None);
        f.insert(1, 0, &[0, 1, 2], 1.0, &[1.0, 2.0, 1.0]).unwrap();
    }

    #[test]
    fn test_at_query_accepts_varying_insert_weights() {
        let config = TrieConfig::new(3, 3).with_folding(WeightFolding::AtQuery);
        let mut f = Forest::new(config).unwrap();
        f.insert(0, 0, &[0, 1, 2], 1.0, &[1.0, 1.0, 1.0]).unwrap();
        f.insert(0, 0, &[0, 1, 2], 1.0, &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(f.folded_weights(), None);
    }

    #[test]
    fn test_huge_offset_is_an_empty_window() {
        let mut f = forest(4, 4);
        f.insert(3, usize::MAX, &[0, 1, 2, 3], 1.0, &[1.0; 4]).unwrap();
        f.insert_with_mismatches(3, usize::MAX, &[0, 1, 2, 3], 1.0, 0, &[1.0; 4])
            .unwrap();
        assert_eq!(f.node_count(), 4);
    }

    #[test]
    fn test_mismatch_insert_covers_neighbours() {
        let mut f = forest(2, 2);
        // column 0: exact symbols, column 1: one substitution
        let w = [1.0, 1.0, 0.5, 0.5];
        f.insert_with_mismatches(0, 0, &[0, 1], 1.0, 1, &w).unwrap();

        let exact = branch_child(&f, f.roots[0], 0);
        assert_eq!(f.arena.get(exact).weight, 1.0);
        assert_eq!(f.arena.get(exact).leaf_weights().unwrap(), &[0.5, 1.0, 0.5, 0.5]);

        for s in 1..4 {
            let other = branch_child(&f, f.roots[0], s);
            assert_eq!(f.arena.get(other).weight, 0.5);
            // a second substitution is out of budget
            assert_eq!(f.arena.get(other).leaf_weights().unwrap(), &[0.0, 0.5, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_mismatch_insert_expands_runs() {
        let mut f = forest(4, 4);
        f.insert(0, 0, &[0, 1, 2, 3], 1.0, &[1.0; 4]).unwrap();
        let run = run_child(&f, f.roots[0], 0);

        f.insert_with_mismatches(0, 0, &[0, 1, 2, 0], 1.0, 0, &[1.0; 4])
            .unwrap();

        // the run's slot now heads the chain
        assert_eq!(branch_child(&f, f.roots[0], 0), run);
        assert_eq!(f.arena.get(run).weight, 2.0);
        let b = branch_child(&f, run, 1);
        assert_eq!(f.arena.get(b).weight, 2.0);
        let c = branch_child(&f, b, 2);
        assert_eq!(f.arena.get(c).weight, 2.0);
        assert_eq!(f.arena.get(c).leaf_weights().unwrap(), &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mismatch_insert_checks() {
        let config = TrieConfig::new(2, 2).with_folding(WeightFolding::AtQuery);
        let mut f = Forest::new(config).unwrap();
        assert!(matches!(
            f.insert_with_mismatches(0, 0, &[0, 1], 1.0, 1, &[1.0; 4]),
            Err(Error::InvalidConfig(_))
        ));

        let mut f = forest(2, 2);
        assert!(matches!(
            f.insert_with_mismatches(0, 0, &[0, 1], 1.0, 1, &[1.0; 3]),
            Err(Error::WeightsTooShort { needed: 4, got: 3 })
        ));
        assert!(matches!(
            f.insert_with_mismatches(0, 0, &[0, 1], 1.0, usize::MAX, &[1.0; 4]),
            Err(Error::WeightsTooShort { needed: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_degree_one_root_holds_leaf_weights() {
        let mut f = forest(1, 2);
        f.insert(1, 0, &[0, 3], 2.0, &[0.5]).unwrap();
        assert_eq!(
            f.arena.get(f.roots[1]).leaf_weights().unwrap(),
            &[0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_bad_symbol_rejected_before_mutation() {
        let mut f = forest(4, 4);
        let err = f.insert(0, 0, &[0, 1, 9, 2], 1.0, &[1.0; 4]).unwrap_err();
        assert!(matches!(err, Error::InvalidSymbol { index: 2, symbol: 9 }));
        assert_eq!(f.node_count(), 4);
    }

    #[test]
    fn test_position_and_weight_checks() {
        let mut f = forest(4, 4);
        assert!(matches!(
            f.insert(4, 0, &[0; 8], 1.0, &[1.0; 4]),
            Err(Error::PositionOutOfRange {
                position: 4,
                length: 4
            })
        ));
        assert!(matches!(
            f.insert(0, 0, &[0; 4], 1.0, &[1.0; 3]),
            Err(Error::WeightsTooShort { needed: 4, got: 3 })
        ));
    }

    #[test]
    fn test_out_of_memory_is_reported() {
        let config = TrieConfig::new(20, 20)
            .with_initial_capacity(2)
            .with_max_nodes(22);
        let mut f = Forest::new(config).unwrap();
        let seq = vec![1u8; 20];
        let err = f.insert(0, 0, &seq, 1.0, &[1.0; 20]).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { capacity: 22 }));
        assert_eq!(f.node_count(), 22);
    }

    #[test]
    fn test_reset_changes_length() {
        let mut f = forest(3, 5);
        f.insert(0, 0, &[0, 1, 2], 1.0, &[1.0; 3]).unwrap();
        f.reset(2).unwrap();
        assert_eq!(f.len(), 2);
        assert_eq!(f.node_count(), 2);

        f.insert(1, 0, &[0, 1, 2], 1.0, &[1.0; 3]).unwrap();
        f.clear().unwrap();
        assert_eq!(f.node_count(), 2);
        assert_eq!(f.arena.get(f.roots[1]).child(1), Child::Empty);
    }
}
