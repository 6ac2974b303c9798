//! Depth schedulers: which nodes are candidates for expansion each step.
//!
//! A scheduler maps the engine's per-step loop onto the search tree. The
//! base policy walks true depths under a square-root cap, the banded policy
//! aggregates depths into adaptive-width bands, the slope-bound policy
//! collapses the whole step to a single global upper-bound argmax, and the
//! full-depth policy removes the cap for lookahead-gated engines.

use crate::engine::EngineCore;
use crate::node::Node;
use crate::space::NodeId;

/// Trait for pluggable per-step candidate scheduling.
///
/// The engine iterates indices `0..=max_index`; the meaning of an index
/// (true depth, depth band, or a single global scan) belongs to the
/// scheduler. [`admits`](DepthScheduler::admits) gates a candidate against
/// the running per-step maximum `vmax`; the engine raises `vmax` to the
/// candidate's value after an admission.
pub trait DepthScheduler: Send {
    /// The largest candidate index to consider this step (inclusive).
    fn max_index(&self, core: &EngineCore) -> usize;

    /// The candidate node for the given index, if any.
    fn candidate(&self, core: &EngineCore, index: usize) -> Option<NodeId>;

    /// Whether the candidate should be expanded given the running per-step
    /// maximum. The default is the base rule: strictly exceed `vmax`.
    fn admits(&self, node: &Node, vmax: f64) -> bool {
        node.value().is_some_and(|v| v > vmax)
    }

    /// Hook run once at the end of every step, after all expansions.
    fn end_step(&mut self, _core: &EngineCore) {}

    /// The active depth-band width, for banded schedulers. `None` for
    /// schedulers without a band notion.
    fn band_width(&self) -> Option<usize> {
        None
    }
}

/// Square-root depth cap shared by the base and banded schedulers.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn sqrt_depth_cap(core: &EngineCore) -> usize {
    let cap = (core.num_expansions() as f64).sqrt().floor() as usize;
    cap.min(core.space().num_depths())
}

/// Base partitioning schedule: one index per true depth, capped at
/// `floor(sqrt(num_expansions))` and the number of populated depth levels;
/// the candidate is the best node at that depth.
#[derive(Clone, Copy, Debug, Default)]
pub struct SooSchedule;

impl SooSchedule {
    /// Creates the base schedule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DepthScheduler for SooSchedule {
    fn max_index(&self, core: &EngineCore) -> usize {
        sqrt_depth_cap(core)
    }

    fn candidate(&self, core: &EngineCore, index: usize) -> Option<NodeId> {
        core.space().best_at_depth(index)
    }
}

/// Depth-set aggregation schedule: index `i` covers true depths
/// `[i*w, i*w + w - 1]` where the width `w` walks an ordered schedule,
/// forward after a step whose best observation improved on the previous
/// step's, backward otherwise, clamped to the schedule's ends.
#[derive(Clone, Debug)]
pub struct BandedSchedule {
    schedule: Vec<usize>,
    position: usize,
    last_best: f64,
}

impl BandedSchedule {
    /// Creates a banded schedule starting at the first width.
    ///
    /// The schedule must be non-empty with positive widths; the engine
    /// builder validates this before construction.
    #[must_use]
    pub fn new(schedule: Vec<usize>) -> Self {
        debug_assert!(!schedule.is_empty());
        debug_assert!(schedule.iter().all(|&w| w > 0));
        Self {
            schedule,
            position: 0,
            last_best: f64::NEG_INFINITY,
        }
    }

    /// The current width `w`.
    #[must_use]
    pub fn width(&self) -> usize {
        self.schedule[self.position]
    }

    /// The current position in the width schedule.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl DepthScheduler for BandedSchedule {
    fn max_index(&self, core: &EngineCore) -> usize {
        sqrt_depth_cap(core) / self.width()
    }

    fn candidate(&self, core: &EngineCore, index: usize) -> Option<NodeId> {
        let min_depth = index * self.width();
        let max_depth = min_depth + self.width() - 1;
        let mut best: Option<(NodeId, f64)> = None;
        for depth in min_depth..=max_depth {
            let Some(id) = core.space().best_at_depth(depth) else {
                continue;
            };
            let Some(value) = core.space().get(id).and_then(Node::value) else {
                continue;
            };
            if best.map_or(true, |(_, b)| value > b) {
                best = Some((id, value));
            }
        }
        best.map(|(id, _)| id)
    }

    fn end_step(&mut self, core: &EngineCore) {
        let step_best = core
            .step_observed_nodes()
            .iter()
            .filter_map(Node::value)
            .fold(f64::NEG_INFINITY, f64::max);

        // A step that observed nothing counts as non-improving.
        if step_best > self.last_best {
            self.position = (self.position + 1).min(self.schedule.len() - 1);
        } else {
            self.position = self.position.saturating_sub(1);
        }
        if step_best.is_finite() {
            self.last_best = step_best;
        }
        trace_debug!(width = self.width(), "depth-band width updated");
    }

    fn band_width(&self) -> Option<usize> {
        Some(self.width())
    }
}

/// Slope-bound schedule: a single index per step whose candidate is the
/// node with the greatest `value + max_slope * half_diagonal` over the
/// whole space, at any depth. Always admits — the bound, not `vmax`,
/// decides. The guarantee holds only when the slope constant truly bounds
/// the function's local rate of change.
#[derive(Clone, Copy, Debug)]
pub struct BoundSchedule {
    max_slope: f64,
}

impl BoundSchedule {
    /// Creates the schedule with the known global slope constant.
    #[must_use]
    pub fn new(max_slope: f64) -> Self {
        Self { max_slope }
    }

    /// Upper bound on the true function value anywhere within the node.
    #[must_use]
    pub fn upper_bound(&self, node: &Node) -> Option<f64> {
        let value = node.value()?;
        Some(value + self.max_slope * node.half_diagonal())
    }
}

impl DepthScheduler for BoundSchedule {
    fn max_index(&self, _core: &EngineCore) -> usize {
        0
    }

    fn candidate(&self, core: &EngineCore, _index: usize) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for (id, node) in core.space().iter_ids() {
            let Some(bound) = self.upper_bound(node) else {
                continue;
            };
            if best.map_or(true, |(_, b)| bound > b) {
                best = Some((id, bound));
            }
        }
        best.map(|(id, _)| id)
    }

    fn admits(&self, _node: &Node, _vmax: f64) -> bool {
        true
    }
}

/// Uncapped schedule: one index per populated depth level, with the base
/// admission rule. Used by the lookahead-gated bundle, which bounds work
/// through its expansion veto instead of a depth cap.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullDepthSchedule;

impl FullDepthSchedule {
    /// Creates the uncapped schedule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DepthScheduler for FullDepthSchedule {
    fn max_index(&self, core: &EngineCore) -> usize {
        core.space().num_depths()
    }

    fn candidate(&self, core: &EngineCore, index: usize) -> Option<NodeId> {
        core.space().best_at_depth(index)
    }
}
