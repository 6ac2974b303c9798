//! Bounded subtree lookahead: the IMGPO expansion veto.
//!
//! Before a node passing the vmax admission is expanded, the lookahead
//! checks whether a smaller region already known at a nearby greater depth
//! makes the expansion pointless: it simulates a bounded-depth subtree
//! below the candidate (off the books — no counters, no budget), scores
//! every simulated center with the gate's upper confidence bound, and
//! vetoes the expansion when the best simulated bound cannot reach the
//! existing node's real value. The simulated depth adapts to progress.

use crate::engine::EngineCore;
use crate::gate::EvaluationGate;
use crate::node::Node;
use crate::split::SplitStrategy;

/// Horizon growth after a step that improved the best value.
const GROW: f64 = 4.0;

/// Horizon decay after a step with no improvement.
const DECAY: f64 = 0.5;

/// Lower clamp for the decayed horizon.
const MIN_HORIZON: f64 = 4.0;

/// Adaptive bounded-depth subtree lookahead.
pub struct SubtreeLookahead {
    max_depth: usize,
    horizon: f64,
    prev_best: Option<f64>,
}

impl SubtreeLookahead {
    /// Creates a lookahead with the configured maximum subtree depth.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            horizon: 1.0,
            prev_best: None,
        }
    }

    /// The current adaptive horizon, before clamping to the maximum.
    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Snapshot the best value so the end-of-step adaptation can compare.
    pub fn begin_step(&mut self, core: &EngineCore) {
        self.prev_best = core.best_value();
    }

    /// Adapt the horizon: grow after an improving step, decay otherwise.
    /// The first step always counts as improving.
    pub fn end_step(&mut self, core: &EngineCore) {
        let improved = match self.prev_best {
            None => true,
            Some(prev) => core.best_value().is_some_and(|best| best > prev),
        };
        if improved {
            self.horizon += GROW;
        } else {
            self.horizon = (self.horizon - DECAY).max(MIN_HORIZON);
        }
        trace_debug!(horizon = self.horizon, "subtree horizon updated");
    }

    /// Whether the candidate may be expanded.
    ///
    /// Searches depths `1..=min(max_depth, ceil(horizon))` below the
    /// candidate for a node with a real value at least the running
    /// per-step maximum. If none exists, the expansion proceeds. If one
    /// exists at offset `e`, a depth-`e` subtree below the candidate is
    /// simulated with the shared split strategy and the expansion proceeds
    /// only if its best upper confidence bound reaches that node's value.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn permits(
        &self,
        core: &EngineCore,
        split: &mut dyn SplitStrategy,
        gate: &dyn EvaluationGate,
        node: &Node,
    ) -> bool {
        let horizon = self.max_depth.min(self.horizon.ceil() as usize);

        let mut found: Option<(usize, f64)> = None;
        for offset in 1..=horizon {
            let Some(id) = core.space().best_at_depth(node.depth() + offset) else {
                continue;
            };
            let Some(smaller) = core.space().get(id) else {
                continue;
            };
            if smaller.has_real_value()
                && smaller.value().is_some_and(|v| v >= core.vmax())
            {
                if let Some(value) = smaller.value() {
                    found = Some((offset, value));
                    break;
                }
            }
        }

        let Some((offset, smaller_value)) = found else {
            trace_debug!("no competing smaller node, expanding");
            return true;
        };

        let Some(best_ucb) = best_subtree_ucb(core, split, gate, node, offset) else {
            // No usable model bounds: the veto has no basis.
            return true;
        };
        trace_debug!(best_ucb, smaller_value, "comparing simulated subtree");
        best_ucb >= smaller_value
    }
}

/// Maximum upper confidence bound over a simulated subtree of the given
/// depth below the node. `None` when the gate has no model bounds for any
/// simulated center.
fn best_subtree_ucb(
    core: &EngineCore,
    split: &mut dyn SplitStrategy,
    gate: &dyn EvaluationGate,
    node: &Node,
    depth: usize,
) -> Option<f64> {
    let mut best: Option<f64> = None;
    let mut level = vec![node.clone()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for parent in &level {
            let dim = split.choose(parent);
            next.extend(core.make_children(parent, dim));
        }
        for child in &next {
            if let Some((_, ucb)) = gate.confidence_bounds(core, &child.center()) {
                best = Some(best.map_or(ucb, |b: f64| b.max(ucb)));
            }
        }
        level = next;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineCore;
    use crate::error::Result;
    use crate::gate::{Assessment, DirectEvaluation, EvaluationGate};
    use crate::split::LargestFirst;

    /// Gate exposing a constant confidence interval.
    struct FixedBounds {
        lcb: f64,
        ucb: f64,
    }

    impl EvaluationGate for FixedBounds {
        fn assess(&self, _core: &EngineCore, _node: &Node) -> Result<Assessment> {
            Ok(Assessment::Evaluate)
        }

        fn confidence_bounds(&self, _core: &EngineCore, _point: &[f64]) -> Option<(f64, f64)> {
            Some((self.lcb, self.ucb))
        }
    }

    fn core_with_deep_node(depth: usize, value: f64) -> EngineCore {
        let mut core = EngineCore::new(Box::new(|_| 0.0), 1, 100, 3);
        let mut node = Node::new(vec![0.0], vec![0.1], depth);
        node.set_value(value);
        core.space_mut().insert(node);
        core
    }

    fn candidate() -> Node {
        let mut node = Node::new(vec![0.0], vec![1.0], 0);
        node.set_value(0.5);
        node
    }

    #[test]
    fn test_permits_without_competitor() {
        let core = EngineCore::new(Box::new(|_| 0.0), 1, 100, 3);
        let la = SubtreeLookahead::new(4);
        let mut split = LargestFirst::new();
        assert!(la.permits(&core, &mut split, &DirectEvaluation::new(), &candidate()));
    }

    #[test]
    fn test_vetoes_when_competitor_beats_subtree_bound() {
        let core = core_with_deep_node(2, 3.0);
        let mut la = SubtreeLookahead::new(4);
        la.horizon = 4.0;
        let mut split = LargestFirst::new();
        let gate = FixedBounds { lcb: 0.0, ucb: 1.0 };
        // A real-valued node at depth 2 holds 3.0 >= vmax, and the
        // simulated subtree tops out at ucb 1.0.
        assert!(!la.permits(&core, &mut split, &gate, &candidate()));
    }

    #[test]
    fn test_permits_when_subtree_bound_reaches_competitor() {
        let core = core_with_deep_node(2, 3.0);
        let mut la = SubtreeLookahead::new(4);
        la.horizon = 4.0;
        let mut split = LargestFirst::new();
        let gate = FixedBounds { lcb: 0.0, ucb: 3.5 };
        assert!(la.permits(&core, &mut split, &gate, &candidate()));
    }

    #[test]
    fn test_permits_when_gate_has_no_bounds() {
        let core = core_with_deep_node(2, 3.0);
        let mut la = SubtreeLookahead::new(4);
        la.horizon = 4.0;
        let mut split = LargestFirst::new();
        assert!(la.permits(&core, &mut split, &DirectEvaluation::new(), &candidate()));
    }

    #[test]
    fn test_horizon_adaptation() {
        let mut core = EngineCore::new(Box::new(|_| 0.0), 1, 100, 3);
        let mut la = SubtreeLookahead::new(8);
        assert!((la.horizon() - 1.0).abs() < 1e-12);

        // First step always improves.
        la.begin_step(&core);
        let mut node = Node::new(vec![0.0], vec![1.0], 0);
        node.set_value(1.0);
        core.space_mut().insert(node);
        la.end_step(&core);
        assert!((la.horizon() - 5.0).abs() < 1e-12);

        // No improvement: decay, clamped at 4.
        la.begin_step(&core);
        la.end_step(&core);
        assert!((la.horizon() - 4.5).abs() < 1e-12);
        la.begin_step(&core);
        la.end_step(&core);
        la.begin_step(&core);
        la.end_step(&core);
        assert!((la.horizon() - 4.0).abs() < 1e-12);
    }
}
