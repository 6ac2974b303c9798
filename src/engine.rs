//! The generic stepwise partition/evaluate/select engine.
//!
//! One concrete [`Engine`] drives every algorithm bundle: it owns the
//! [`NodeSpace`], the counters and the per-step scratch state, and
//! composes a split strategy, a depth scheduler, an evaluation gate and an
//! optional subtree lookahead. Which bundle you get is decided entirely by
//! the [`EngineBuilder`] configuration.

use crate::error::{Error, Result};
use crate::gate::{
    DirectEvaluation, EvaluationGate, SurrogateGate, BAMSOO_SCALE, DEFAULT_CONFIDENCE,
    IMGPO_SCALE,
};
use crate::lookahead::SubtreeLookahead;
use crate::node::Node;
use crate::schedule::{
    BandedSchedule, BoundSchedule, DepthScheduler, FullDepthSchedule, SooSchedule,
};
use crate::space::{NodeId, NodeSpace};
use crate::split::{LargestFirst, RecordedSplit, ShuffledOrder, SplitStrategy, UniformTie};
use crate::surrogate::{GaussianProcess, SurrogateModel};

/// The objective: a deterministic map from a normalized center coordinate
/// in `[0,1]^dim` to the value to maximize.
pub type ObjectiveFn = Box<dyn Fn(&[f64]) -> f64 + Send>;

/// Search state shared with the policies: the node space, the objective,
/// the configuration scalars, the counters and the per-step scratch.
///
/// Policies receive `&EngineCore` and read it through the accessors; all
/// mutation happens inside the engine.
pub struct EngineCore {
    objective: ObjectiveFn,
    dim: usize,
    max_observations: usize,
    num_children: usize,
    space: NodeSpace,
    num_observations: usize,
    num_expansions: usize,
    num_node_evals: usize,
    vmax: f64,
    step_observed: Vec<Node>,
    budget_starved: bool,
}

impl EngineCore {
    pub(crate) fn new(
        objective: ObjectiveFn,
        dim: usize,
        max_observations: usize,
        num_children: usize,
    ) -> Self {
        Self {
            objective,
            dim,
            max_observations,
            num_children,
            space: NodeSpace::new(),
            num_observations: 0,
            num_expansions: 1,
            num_node_evals: 1,
            vmax: f64::NEG_INFINITY,
            step_observed: Vec::new(),
            budget_starved: false,
        }
    }

    /// Dimensionality of the search domain.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Children created per split.
    #[must_use]
    pub fn num_children(&self) -> usize {
        self.num_children
    }

    /// Configured real-evaluation budget.
    #[must_use]
    pub fn max_observations(&self) -> usize {
        self.max_observations
    }

    /// Count of real function evaluations performed so far.
    #[must_use]
    pub fn num_observations(&self) -> usize {
        self.num_observations
    }

    /// Count of node expansions, starting at 1.
    #[must_use]
    pub fn num_expansions(&self) -> usize {
        self.num_expansions
    }

    /// Running node-evaluation counter, starting at 1; incremented once
    /// per scheduler index that yields a candidate and consumed by the
    /// confidence-bound formula.
    #[must_use]
    pub fn num_node_evals(&self) -> usize {
        self.num_node_evals
    }

    /// The running best triggering value within the current step.
    #[must_use]
    pub fn vmax(&self) -> f64 {
        self.vmax
    }

    /// All nodes currently held, grouped by depth.
    #[must_use]
    pub fn space(&self) -> &NodeSpace {
        &self.space
    }

    /// Clones of every node really observed during the current step.
    #[must_use]
    pub fn step_observed_nodes(&self) -> &[Node] {
        &self.step_observed
    }

    /// Real evaluations still allowed by the budget.
    #[must_use]
    pub fn remaining_budget(&self) -> usize {
        self.max_observations.saturating_sub(self.num_observations)
    }

    /// Value of the best node anywhere in the space.
    #[must_use]
    pub fn best_value(&self) -> Option<f64> {
        self.space
            .best_node()
            .and_then(|id| self.space.get(id))
            .and_then(Node::value)
    }

    /// Builds the children that exactly partition `parent` along
    /// `split_dim`: `num_children` boxes of side `sizes[split_dim] / k`,
    /// identical elsewhere, edges offset by multiples of the child size.
    /// The middle child inherits a real parent value, since its center
    /// coincides with the parent's.
    pub(crate) fn make_children(&self, parent: &Node, split_dim: usize) -> Vec<Node> {
        let mut edges = parent.edges().to_vec();
        let mut sizes = parent.sizes().to_vec();
        #[allow(clippy::cast_precision_loss)]
        let child_size = sizes[split_dim] / self.num_children as f64;
        sizes[split_dim] = child_size;
        let depth = parent.depth() + 1;

        let mut children = Vec::with_capacity(self.num_children);
        for i in 0..self.num_children {
            let mut child = Node::new(edges.clone(), sizes.clone(), depth);
            if i == self.num_children / 2 && parent.has_real_value() {
                if let Some(value) = parent.value() {
                    child.set_value(value);
                }
            }
            children.push(child);
            edges[split_dim] += child_size;
        }
        children
    }

    /// Evaluates the objective at a point, validating the result and
    /// counting it against the budget.
    pub(crate) fn evaluate(&mut self, point: &[f64]) -> Result<f64> {
        let value = (self.objective)(point);
        if !value.is_finite() {
            return Err(Error::NonFiniteObjective {
                value,
                point: point.to_vec(),
            });
        }
        self.num_observations += 1;
        Ok(value)
    }

    pub(crate) fn begin_step(&mut self) {
        self.vmax = f64::NEG_INFINITY;
        self.step_observed.clear();
        self.budget_starved = false;
    }

    pub(crate) fn space_mut(&mut self) -> &mut NodeSpace {
        &mut self.space
    }

    pub(crate) fn push_observed(&mut self, node: Node) {
        self.step_observed.push(node);
    }

    pub(crate) fn bump_expansions(&mut self) {
        self.num_expansions += 1;
    }

    pub(crate) fn bump_node_evals(&mut self) {
        self.num_node_evals += 1;
    }
}

/// The stepwise optimization engine.
///
/// Construct one through [`EngineBuilder`]; the builder validates the
/// configuration, creates the root node covering `[0,1]^dim` and really
/// evaluates it, so a fresh engine always has a best node.
///
/// # Examples
///
/// ```
/// use optimistic::EngineBuilder;
///
/// let mut engine = EngineBuilder::new(|x: &[f64]| -(x[0] - 0.5).powi(2), 1, 50)
///     .build()
///     .unwrap();
/// engine.optimize().unwrap();
///
/// let best = engine.best_node().unwrap();
/// assert!((best.center()[0] - 0.5).abs() < 1e-2);
/// ```
pub struct Engine {
    core: EngineCore,
    split: Box<dyn SplitStrategy>,
    scheduler: Box<dyn DepthScheduler>,
    gate: Box<dyn EvaluationGate>,
    lookahead: Option<SubtreeLookahead>,
}

impl Engine {
    /// Executes exactly one optimization step. May be called repeatedly,
    /// including after [`is_finished`](Engine::is_finished) turns true (a
    /// finished engine's steps do nothing but bookkeeping).
    ///
    /// # Errors
    ///
    /// Propagates a non-finite objective value or an internal invariant
    /// violation; both are fatal for the run.
    pub fn step(&mut self) -> Result<()> {
        trace_debug!("beginning step");
        self.core.begin_step();
        if let Some(la) = &mut self.lookahead {
            la.begin_step(&self.core);
        }

        let max_index = self.scheduler.max_index(&self.core);
        for index in 0..=max_index {
            self.expand_best_at(index)?;
        }

        self.scheduler.end_step(&self.core);
        if let Some(la) = &mut self.lookahead {
            la.end_step(&self.core);
        }
        trace_debug!(
            observations = self.core.num_observations(),
            "ending step"
        );
        Ok(())
    }

    /// Steps until [`is_finished`](Engine::is_finished), or until the
    /// remaining budget is too small for any further expansion.
    ///
    /// # Errors
    ///
    /// Propagates the first [`step`](Engine::step) failure.
    pub fn optimize(&mut self) -> Result<()> {
        while !self.is_finished() {
            let before = self.core.num_observations();
            self.step()?;
            if self.core.num_observations() == before && self.core.budget_starved {
                trace_info!("budget too small for further expansion, stopping");
                break;
            }
        }
        Ok(())
    }

    /// True iff the real-evaluation count has reached the budget.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.core.num_observations >= self.core.max_observations
    }

    /// The node with the maximum value across all depths, ties broken by
    /// first encountered in depth order. `None` only for an empty space,
    /// which cannot happen after construction.
    #[must_use]
    pub fn best_node(&self) -> Option<&Node> {
        self.core
            .space
            .best_node()
            .and_then(|id| self.core.space.get(id))
    }

    /// Count of real (non-surrogate) function evaluations performed.
    #[must_use]
    pub fn num_observations(&self) -> usize {
        self.core.num_observations()
    }

    /// Count of node expansions, starting at 1.
    #[must_use]
    pub fn num_expansions(&self) -> usize {
        self.core.num_expansions()
    }

    /// Running node-evaluation counter consumed by the confidence bound.
    #[must_use]
    pub fn num_node_evals(&self) -> usize {
        self.core.num_node_evals()
    }

    /// Clones of every node really observed during the last step.
    #[must_use]
    pub fn step_observed_nodes(&self) -> &[Node] {
        self.core.step_observed_nodes()
    }

    /// All nodes currently held, grouped by depth.
    #[must_use]
    pub fn space(&self) -> &NodeSpace {
        self.core.space()
    }

    /// The active depth-band width, when the banded scheduler is in use.
    #[must_use]
    pub fn band_width(&self) -> Option<usize> {
        self.scheduler.band_width()
    }

    /// One expansion attempt at one scheduler index. The node-evaluation
    /// counter ticks exactly once per index that yields a candidate,
    /// expanded or not; an empty index leaves it untouched.
    fn expand_best_at(&mut self, index: usize) -> Result<()> {
        let Some(id) = self.scheduler.candidate(&self.core, index) else {
            trace_debug!(index, "no candidate at index");
            return Ok(());
        };
        let result = self.try_expand(id);
        self.core.bump_node_evals();
        result
    }

    fn try_expand(&mut self, id: NodeId) -> Result<()> {
        let parent = self
            .core
            .space
            .get(id)
            .ok_or(Error::Internal("candidate handle is stale"))?
            .clone();

        // Worst case this expansion can cost: every child except the
        // inherited middle, plus one forced observation of a fake parent.
        let mut worst = self.core.num_children - 1;
        if parent.is_fake_value() {
            worst += 1;
        }
        if self.core.remaining_budget() < worst {
            trace_debug!("expansion skipped, budget too small");
            self.core.budget_starved = true;
            return Ok(());
        }

        if !self.scheduler.admits(&parent, self.core.vmax) {
            return Ok(());
        }
        if let Some(value) = parent.value() {
            self.core.vmax = self.core.vmax.max(value);
            trace_debug!(vmax = self.core.vmax, "new vmax");
        }

        // A fake value is an unverified bound; verify it before splitting
        // so the bound cannot propagate arbitrarily deep.
        let parent = if parent.is_fake_value() {
            self.force_observe(id)?;
            self.core
                .space
                .get(id)
                .ok_or(Error::Internal("observed node vanished"))?
                .clone()
        } else {
            parent
        };

        if let Some(la) = &self.lookahead {
            if !la.permits(&self.core, &mut *self.split, &*self.gate, &parent) {
                trace_debug!("expansion vetoed by lookahead");
                return Ok(());
            }
        }

        let split_dim = self.split.choose(&parent);
        trace_debug!(split_dim, "expanding");
        let mut children = self.core.make_children(&parent, split_dim);
        self.core.bump_expansions();

        self.gate.prepare(&self.core)?;
        for child in &mut children {
            self.observe_node(child)?;
        }

        for child in children {
            self.core.space_mut().insert(child);
        }
        self.core
            .space_mut()
            .remove(id)
            .ok_or(Error::Internal("expanded node vanished"))?;
        Ok(())
    }

    /// Gives a freshly created child a value: a real observation when the
    /// gate allows it, the gate's fake bound otherwise. A child that
    /// inherited the parent's real value is left alone.
    fn observe_node(&mut self, node: &mut Node) -> Result<()> {
        if node.has_real_value() {
            trace_debug!("child inherited its value");
            return Ok(());
        }
        match self.gate.assess(&self.core, node)? {
            crate::gate::Assessment::Evaluate => {
                let center = node.center();
                let value = self.core.evaluate(&center)?;
                node.set_value(value);
                self.gate.record(&center, value);
                self.core.push_observed(node.clone());
                trace_debug!(value, "observed node");
            }
            crate::gate::Assessment::Fake(value) => {
                node.set_fake_value(value);
            }
        }
        Ok(())
    }

    /// Really evaluates a node already stored in the space, bypassing the
    /// gate. Used for the root and for verifying fake-valued nodes.
    fn force_observe(&mut self, id: NodeId) -> Result<()> {
        let center = self
            .core
            .space
            .get(id)
            .ok_or(Error::Internal("cannot observe a missing node"))?
            .center();
        let value = self.core.evaluate(&center)?;
        self.gate.record(&center, value);
        let node = self
            .core
            .space_mut()
            .get_mut(id)
            .ok_or(Error::Internal("cannot observe a missing node"))?;
        node.set_value(value);
        let observed = node.clone();
        self.core.push_observed(observed);
        Ok(())
    }
}

/// Which split strategy the builder assembles.
#[derive(Clone, Copy, Debug)]
enum SplitChoice {
    LargestFirst,
    Shuffled(u64),
    Uniform(u64),
}

/// Which depth scheduler the builder assembles. `None` in the builder
/// means the default for the chosen gate.
#[derive(Clone, Debug)]
enum ScheduleChoice {
    Bands(Vec<usize>),
    Slope(f64),
}

/// Which evaluation gate the builder assembles.
#[derive(Clone, Copy, Debug)]
enum GateChoice {
    Direct,
    Bamsoo,
    Imgpo { subtree_depth: usize },
}

/// Validating builder assembling an [`Engine`] from a policy bundle.
///
/// The named algorithm variants are bundles of the pluggable policies:
///
/// | Variant | Builder calls |
/// |---------|---------------|
/// | SOO | defaults |
/// | `RandomSOO` | `.split_shuffled(seed)` or `.split_uniform(seed)` |
/// | LOGO | `.depth_bands(vec![w1, w2, ...])` |
/// | DOO | `.slope_bound(max_slope)` |
/// | `BaMSOO` | `.bamsoo()` |
/// | IMGPO | `.imgpo(subtree_depth)` |
///
/// Split strategies compose freely with the others (`RandomLOGO`,
/// `RandomBaMSOO` and so on are just different call combinations).
///
/// # Examples
///
/// ```
/// use optimistic::EngineBuilder;
///
/// // LOGO with a shuffled split order.
/// let engine = EngineBuilder::new(|x: &[f64]| -(x[0] - 0.3).abs(), 1, 40)
///     .depth_bands(vec![1, 2, 4, 8])
///     .split_shuffled(7)
///     .build()
///     .unwrap();
/// assert_eq!(engine.num_observations(), 1);
/// ```
pub struct EngineBuilder {
    objective: ObjectiveFn,
    dim: usize,
    max_observations: usize,
    num_children: usize,
    split: SplitChoice,
    schedule: Option<ScheduleChoice>,
    gate: GateChoice,
    confidence: f64,
    surrogate: Option<Box<dyn SurrogateModel>>,
}

impl EngineBuilder {
    /// Starts a builder from the three mandatory options: the objective,
    /// the dimensionality and the real-evaluation budget.
    #[must_use]
    pub fn new(
        objective: impl Fn(&[f64]) -> f64 + Send + 'static,
        dim: usize,
        max_observations: usize,
    ) -> Self {
        Self {
            objective: Box::new(objective),
            dim,
            max_observations,
            num_children: 3,
            split: SplitChoice::LargestFirst,
            schedule: None,
            gate: GateChoice::Direct,
            confidence: DEFAULT_CONFIDENCE,
            surrogate: None,
        }
    }

    /// Sets the children-per-split count. Must be odd. Default: 3.
    #[must_use]
    pub fn num_children(mut self, n: usize) -> Self {
        self.num_children = n;
        self
    }

    /// Uses the deterministic lowest-index-among-ties split rule
    /// (the default).
    #[must_use]
    pub fn split_largest_first(mut self) -> Self {
        self.split = SplitChoice::LargestFirst;
        self
    }

    /// Uses a fixed dimension order shuffled once from the seed to break
    /// split ties.
    #[must_use]
    pub fn split_shuffled(mut self, seed: u64) -> Self {
        self.split = SplitChoice::Shuffled(seed);
        self
    }

    /// Breaks split ties uniformly at random per call, from the seed.
    #[must_use]
    pub fn split_uniform(mut self, seed: u64) -> Self {
        self.split = SplitChoice::Uniform(seed);
        self
    }

    /// Aggregates depths into bands whose width walks the given schedule
    /// (the LOGO policy). Widths must be positive.
    #[must_use]
    pub fn depth_bands(mut self, schedule: Vec<usize>) -> Self {
        self.schedule = Some(ScheduleChoice::Bands(schedule));
        self
    }

    /// Expands exactly one node per step by slope-derived upper bound
    /// (the DOO policy). `max_slope` must be a true bound on the
    /// function's local rate of change for the guarantee to hold.
    #[must_use]
    pub fn slope_bound(mut self, max_slope: f64) -> Self {
        self.schedule = Some(ScheduleChoice::Slope(max_slope));
        self
    }

    /// Gates evaluations through a surrogate model with the `BaMSOO`
    /// confidence scale.
    #[must_use]
    pub fn bamsoo(mut self) -> Self {
        self.gate = GateChoice::Bamsoo;
        self
    }

    /// Gates evaluations through a surrogate model with the IMGPO
    /// confidence scale and enables the bounded subtree lookahead.
    #[must_use]
    pub fn imgpo(mut self, subtree_depth: usize) -> Self {
        self.gate = GateChoice::Imgpo { subtree_depth };
        self
    }

    /// Sets the confidence parameter δ of the surrogate gate's bound.
    /// Must lie in `(0, 1]`. Default: 0.5.
    #[must_use]
    pub fn confidence(mut self, delta: f64) -> Self {
        self.confidence = delta;
        self
    }

    /// Injects a custom surrogate model for the gated bundles. Default:
    /// the shipped Gaussian process.
    #[must_use]
    pub fn surrogate(mut self, model: Box<dyn SurrogateModel>) -> Self {
        self.surrogate = Some(model);
        self
    }

    /// Validates the configuration, assembles the policy bundle, creates
    /// the root node over `[0,1]^dim` and really evaluates it.
    ///
    /// # Errors
    ///
    /// Any of the configuration variants of [`Error`], or a non-finite
    /// objective value at the root center.
    pub fn build(self) -> Result<Engine> {
        if self.dim == 0 {
            return Err(Error::InvalidDimension);
        }
        if self.max_observations == 0 {
            return Err(Error::InvalidBudget);
        }
        if self.num_children == 0 || self.num_children % 2 == 0 {
            return Err(Error::InvalidChildCount(self.num_children));
        }
        if !(self.confidence > 0.0 && self.confidence <= 1.0) {
            return Err(Error::InvalidConfidence(self.confidence));
        }
        if let Some(ScheduleChoice::Bands(schedule)) = &self.schedule {
            if schedule.is_empty() {
                return Err(Error::EmptyWidthSchedule);
            }
            if schedule.iter().any(|&w| w == 0) {
                return Err(Error::InvalidWidth);
            }
        }
        if let Some(ScheduleChoice::Slope(slope)) = &self.schedule {
            if !slope.is_finite() || *slope <= 0.0 {
                return Err(Error::InvalidSlope(*slope));
            }
        }
        if let GateChoice::Imgpo { subtree_depth } = self.gate {
            if subtree_depth == 0 {
                return Err(Error::InvalidLookaheadDepth);
            }
        }

        let randomized = !matches!(self.split, SplitChoice::LargestFirst);
        let split: Box<dyn SplitStrategy> = match self.split {
            SplitChoice::LargestFirst => Box::new(LargestFirst::new()),
            SplitChoice::Shuffled(seed) => Box::new(ShuffledOrder::new(self.dim, seed)),
            SplitChoice::Uniform(seed) => Box::new(UniformTie::new(seed)),
        };
        // The lookahead replays splits of simulated nodes; a randomized
        // strategy must answer identically when the real expansion asks
        // about the same rectangle later.
        let split: Box<dyn SplitStrategy> =
            if randomized && matches!(self.gate, GateChoice::Imgpo { .. }) {
                Box::new(RecordedSplit::new(split))
            } else {
                split
            };

        let scheduler: Box<dyn DepthScheduler> = match self.schedule {
            Some(ScheduleChoice::Bands(schedule)) => Box::new(BandedSchedule::new(schedule)),
            Some(ScheduleChoice::Slope(slope)) => Box::new(BoundSchedule::new(slope)),
            None => match self.gate {
                GateChoice::Imgpo { .. } => Box::new(FullDepthSchedule::new()),
                _ => Box::new(SooSchedule::new()),
            },
        };

        let (gate, lookahead): (Box<dyn EvaluationGate>, Option<SubtreeLookahead>) =
            match self.gate {
                GateChoice::Direct => (Box::new(DirectEvaluation::new()), None),
                GateChoice::Bamsoo => {
                    let model = self
                        .surrogate
                        .unwrap_or_else(|| Box::new(GaussianProcess::new()));
                    (
                        Box::new(SurrogateGate::new(model, BAMSOO_SCALE, self.confidence)),
                        None,
                    )
                }
                GateChoice::Imgpo { subtree_depth } => {
                    let model = self
                        .surrogate
                        .unwrap_or_else(|| Box::new(GaussianProcess::new()));
                    (
                        Box::new(SurrogateGate::new(model, IMGPO_SCALE, self.confidence)),
                        Some(SubtreeLookahead::new(subtree_depth)),
                    )
                }
            };

        let mut core = EngineCore::new(
            self.objective,
            self.dim,
            self.max_observations,
            self.num_children,
        );
        let root = Node::new(vec![0.0; self.dim], vec![1.0; self.dim], 0);
        let root_id = core.space_mut().insert(root);

        let mut engine = Engine {
            core,
            split,
            scheduler,
            gate,
            lookahead,
        };
        engine.force_observe(root_id)?;
        trace_info!(
            dim = engine.core.dim(),
            budget = engine.core.max_observations(),
            "engine constructed, root evaluated"
        );
        Ok(engine)
    }
}
