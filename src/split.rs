//! Split-dimension strategies.
//!
//! Every strategy answers the same question: along which dimension should a
//! node be cut? The answer must be a dimension of maximum side length; the
//! strategies differ only in how ties are resolved. Randomized strategies
//! own an explicitly seeded [`fastrand::Rng`], so choosing a dimension takes
//! `&mut self` and equal seeds reproduce equal runs.

use std::collections::HashMap;

use crate::node::Node;

/// Trait for pluggable split-dimension strategies.
///
/// Implementations receive a node and return a dimension index in
/// `[0, dim)` whose side length is maximal for that node.
///
/// # Implementing a custom strategy
///
/// ```
/// use optimistic::split::SplitStrategy;
/// use optimistic::Node;
///
/// struct LastMax;
///
/// impl SplitStrategy for LastMax {
///     fn choose(&mut self, node: &Node) -> usize {
///         let mut best = 0;
///         for (d, &size) in node.sizes().iter().enumerate() {
///             if size >= node.sizes()[best] {
///                 best = d;
///             }
///         }
///         best
///     }
/// }
/// ```
pub trait SplitStrategy: Send {
    /// Picks the dimension the node should be split along.
    fn choose(&mut self, node: &Node) -> usize;
}

/// Indices of all dimensions sharing the maximum side length.
#[allow(clippy::float_cmp)]
fn tied_dimensions(node: &Node) -> Vec<usize> {
    let mut max_size = f64::NEG_INFINITY;
    let mut tied = Vec::new();
    for (d, &size) in node.sizes().iter().enumerate() {
        if size > max_size {
            max_size = size;
            tied.clear();
        }
        if size == max_size {
            tied.push(d);
        }
    }
    tied
}

/// Deterministic rule: the lowest index among maximum-size dimensions.
///
/// This is the default split rule of the base partitioning policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct LargestFirst;

impl LargestFirst {
    /// Creates the deterministic strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SplitStrategy for LargestFirst {
    fn choose(&mut self, node: &Node) -> usize {
        let mut best = 0;
        for (d, &size) in node.sizes().iter().enumerate() {
            if size > node.sizes()[best] {
                best = d;
            }
        }
        best
    }
}

/// Randomized-fixed-order rule: a permutation of the dimension indices is
/// drawn once from the seed at construction; among tied dimensions the one
/// appearing earliest in the permutation wins.
///
/// Seed-reproducible but not per-call random: the same node always splits
/// the same way within a run.
#[derive(Clone, Debug)]
pub struct ShuffledOrder {
    order: Vec<usize>,
}

impl ShuffledOrder {
    /// Creates the strategy for `dim` dimensions from a fixed seed.
    #[must_use]
    pub fn new(dim: usize, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..dim).collect();
        let mut rng = fastrand::Rng::with_seed(seed);
        rng.shuffle(&mut order);
        Self { order }
    }

    /// The permutation consulted to break ties.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

impl SplitStrategy for ShuffledOrder {
    fn choose(&mut self, node: &Node) -> usize {
        let tied = tied_dimensions(node);
        if tied.len() == 1 {
            return tied[0];
        }
        for &o in &self.order {
            if tied.contains(&o) {
                return o;
            }
        }
        tied[0]
    }
}

/// Randomized-per-call rule: among tied dimensions, one is drawn uniformly
/// at random on every call from a retained seeded generator, so repeated
/// runs with the same seed reproduce the same sequence of choices.
#[derive(Debug)]
pub struct UniformTie {
    rng: fastrand::Rng,
}

impl UniformTie {
    /// Creates the strategy from a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl SplitStrategy for UniformTie {
    fn choose(&mut self, node: &Node) -> usize {
        let tied = tied_dimensions(node);
        if tied.len() == 1 {
            return tied[0];
        }
        tied[self.rng.usize(0..tied.len())]
    }
}

/// Exact rectangle identity: depth plus the bit patterns of the corner and
/// side-length coordinates. Floating-point bit equality is deliberate —
/// two nodes at the same position are produced by the same sequence of
/// splits and therefore carry identical bits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct RectKey {
    depth: usize,
    bits: Vec<u64>,
}

impl RectKey {
    fn of(node: &Node) -> Self {
        let bits = node
            .edges()
            .iter()
            .chain(node.sizes())
            .map(|v| v.to_bits())
            .collect();
        Self {
            depth: node.depth(),
            bits,
        }
    }
}

/// Wraps a randomized strategy and records every decision keyed by exact
/// rectangle identity.
///
/// The subtree lookahead simulates future splits of nodes that may later be
/// expanded for real; without the cache a per-call random strategy could
/// split the simulated node differently from the real one and compare
/// mismatched trees. Looking a position up before drawing afresh keeps the
/// simulated and real trees aligned.
pub struct RecordedSplit {
    inner: Box<dyn SplitStrategy>,
    seen: HashMap<RectKey, usize>,
}

impl RecordedSplit {
    /// Wraps the given strategy.
    #[must_use]
    pub fn new(inner: Box<dyn SplitStrategy>) -> Self {
        Self {
            inner,
            seen: HashMap::new(),
        }
    }

    /// Number of recorded positions.
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.seen.len()
    }
}

impl SplitStrategy for RecordedSplit {
    fn choose(&mut self, node: &Node) -> usize {
        let key = RectKey::of(node);
        if let Some(&dim) = self.seen.get(&key) {
            return dim;
        }
        let dim = self.inner.choose(node);
        self.seen.insert(key, dim);
        dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(sizes: Vec<f64>) -> Node {
        let dim = sizes.len();
        Node::new(vec![0.0; dim], sizes, 0)
    }

    #[test]
    fn test_largest_first_picks_lowest_tied_index() {
        let mut strategy = LargestFirst::new();
        assert_eq!(strategy.choose(&node(vec![1.0, 1.0, 1.0])), 0);
        assert_eq!(strategy.choose(&node(vec![0.5, 1.0, 1.0])), 1);
        assert_eq!(strategy.choose(&node(vec![0.5, 0.25, 1.0])), 2);
    }

    #[test]
    fn test_shuffled_order_is_seed_stable() {
        let n = node(vec![1.0, 1.0, 1.0, 1.0]);
        let mut a = ShuffledOrder::new(4, 7);
        let mut b = ShuffledOrder::new(4, 7);
        for _ in 0..10 {
            assert_eq!(a.choose(&n), b.choose(&n));
        }
    }

    #[test]
    fn test_shuffled_order_respects_max_size() {
        let mut strategy = ShuffledOrder::new(3, 11);
        // Only dimension 1 has the maximum size, so the permutation is moot.
        assert_eq!(strategy.choose(&node(vec![0.5, 1.0, 0.5])), 1);
    }

    #[test]
    fn test_uniform_tie_reproducible_and_valid() {
        let n = node(vec![1.0, 1.0, 0.5]);
        let mut a = UniformTie::new(42);
        let mut b = UniformTie::new(42);
        for _ in 0..20 {
            let d = a.choose(&n);
            assert_eq!(d, b.choose(&n));
            assert!(d < 2, "must pick among the tied dimensions");
        }
    }

    #[test]
    fn test_recorded_split_replays_decisions() {
        let n = node(vec![1.0, 1.0, 1.0]);
        let mut recorded = RecordedSplit::new(Box::new(UniformTie::new(3)));
        let first = recorded.choose(&n);
        for _ in 0..10 {
            assert_eq!(recorded.choose(&n), first);
        }
        assert_eq!(recorded.recorded(), 1);

        // A different position gets its own decision slot.
        let other = node(vec![1.0, 0.5, 0.5]);
        assert_eq!(recorded.choose(&other), 0);
        assert_eq!(recorded.recorded(), 2);
    }
}
