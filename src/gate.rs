//! Evaluation gates: whether a new node gets a real observation.
//!
//! The default gate evaluates everything. The surrogate gate consults a
//! probabilistic model first and substitutes a conservative
//! lower-confidence-bound value for nodes whose upper bound cannot beat
//! the best real observation, saving budget on likely-bad regions.

use crate::engine::EngineCore;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::surrogate::SurrogateModel;

/// Confidence-bound scale for the `BaMSOO` bundle.
pub const BAMSOO_SCALE: f64 = 6.0;

/// Confidence-bound scale for the IMGPO bundle.
pub const IMGPO_SCALE: f64 = 12.0;

/// Default confidence parameter δ.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// The gate's verdict for one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Assessment {
    /// Really evaluate the objective at the node's center.
    Evaluate,
    /// Skip the evaluation and assign this fake value instead.
    Fake(f64),
}

/// Trait for pluggable evaluation gating.
pub trait EvaluationGate: Send {
    /// Called once before each batch of child observations; surrogate
    /// gates refit their model here.
    ///
    /// # Errors
    ///
    /// Propagates a surrogate fitting failure.
    fn prepare(&mut self, _core: &EngineCore) -> Result<()> {
        Ok(())
    }

    /// Decides whether the node deserves a real evaluation.
    ///
    /// # Errors
    ///
    /// Surrogate prediction failures other than an unfit model propagate.
    fn assess(&self, core: &EngineCore, node: &Node) -> Result<Assessment>;

    /// Feeds a completed real observation back to the gate.
    fn record(&mut self, _point: &[f64], _value: f64) {}

    /// Lower and upper confidence bounds at a point, when the gate has a
    /// usable model. The subtree lookahead scores simulated nodes with
    /// this.
    fn confidence_bounds(&self, _core: &EngineCore, _point: &[f64]) -> Option<(f64, f64)> {
        None
    }
}

/// Gate that always evaluates for real. The default for the SOO, LOGO and
/// DOO bundles.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectEvaluation;

impl DirectEvaluation {
    /// Creates the pass-through gate.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EvaluationGate for DirectEvaluation {
    fn assess(&self, _core: &EngineCore, _node: &Node) -> Result<Assessment> {
        Ok(Assessment::Evaluate)
    }
}

/// Surrogate-gated evaluation.
///
/// Keeps a [`SurrogateModel`] trained on every real observation. For a
/// node with no real value, once the model can predict, the gate computes
///
/// `width = sqrt(2 · ln(π² · m² / (scale · δ))) · σ`
///
/// with `m` the running node-evaluation counter, and really evaluates only
/// when `μ + width` exceeds the best real value anywhere in the space;
/// otherwise the node receives `μ − width` as a fake value. `scale` is 6
/// for the `BaMSOO` bundle and 12 for the IMGPO bundle; both it and δ are
/// tunable policy parameters, not load-bearing constants.
pub struct SurrogateGate {
    model: Box<dyn SurrogateModel>,
    scale: f64,
    delta: f64,
    ready: bool,
}

impl SurrogateGate {
    /// Creates a gate around the given model.
    #[must_use]
    pub fn new(model: Box<dyn SurrogateModel>, scale: f64, delta: f64) -> Self {
        Self {
            model,
            scale,
            delta,
            ready: false,
        }
    }

    /// The confidence-bound half-width at a predicted standard deviation.
    #[allow(clippy::cast_precision_loss)]
    fn bound_width(&self, core: &EngineCore, std: f64) -> f64 {
        let m = core.num_node_evals() as f64;
        let arg = core::f64::consts::PI.powi(2) * m * m / (self.scale * self.delta);
        (2.0 * arg.ln()).max(0.0).sqrt() * std
    }
}

impl EvaluationGate for SurrogateGate {
    fn prepare(&mut self, _core: &EngineCore) -> Result<()> {
        if self.model.is_valid() {
            self.model.fit()?;
            self.ready = true;
        }
        Ok(())
    }

    fn assess(&self, core: &EngineCore, node: &Node) -> Result<Assessment> {
        // Fewer than two real samples, or a node that already holds a real
        // observation: evaluate normally.
        if !self.ready || node.has_real_value() {
            return Ok(Assessment::Evaluate);
        }

        let prediction = match self.model.predict(&node.center()) {
            Ok(p) => p,
            Err(Error::SurrogateUnavailable) => return Ok(Assessment::Evaluate),
            Err(e) => return Err(e),
        };

        let width = self.bound_width(core, prediction.std);
        let upper = prediction.mean + width;
        let lower = prediction.mean - width;

        let best_real = core
            .space()
            .best_real_value()
            .unwrap_or(f64::NEG_INFINITY);
        if upper > best_real {
            trace_debug!(upper, best_real, "upper bound beats best, evaluating");
            Ok(Assessment::Evaluate)
        } else {
            trace_debug!(lower, "assigning lower confidence bound");
            Ok(Assessment::Fake(lower))
        }
    }

    fn record(&mut self, point: &[f64], value: f64) {
        self.model.add_sample(point, value);
    }

    fn confidence_bounds(&self, core: &EngineCore, point: &[f64]) -> Option<(f64, f64)> {
        if !self.ready {
            return None;
        }
        let prediction = self.model.predict(point).ok()?;
        let width = self.bound_width(core, prediction.std);
        Some((prediction.mean - width, prediction.mean + width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surrogate::Prediction;

    /// Surrogate stub with a scripted prediction.
    struct Scripted {
        samples: usize,
        mean: f64,
        std: f64,
    }

    impl SurrogateModel for Scripted {
        fn add_sample(&mut self, _point: &[f64], _value: f64) {
            self.samples += 1;
        }

        fn num_samples(&self) -> usize {
            self.samples
        }

        fn fit(&mut self) -> Result<()> {
            Ok(())
        }

        fn predict(&self, _point: &[f64]) -> Result<Prediction> {
            Ok(Prediction {
                mean: self.mean,
                std: self.std,
            })
        }
    }

    fn core_with_best(value: f64) -> EngineCore {
        let mut core = EngineCore::new(Box::new(|_| 0.0), 1, 100, 3);
        let mut node = Node::new(vec![0.0], vec![1.0], 0);
        node.set_value(value);
        core.space_mut().insert(node);
        core
    }

    #[test]
    fn test_under_two_samples_always_evaluates() {
        let core = core_with_best(10.0);
        let mut gate = SurrogateGate::new(
            Box::new(Scripted {
                samples: 1,
                mean: -100.0,
                std: 0.0,
            }),
            BAMSOO_SCALE,
            DEFAULT_CONFIDENCE,
        );
        gate.prepare(&core).unwrap();

        // Model predicts terribly, but with one sample it is not consulted.
        let node = Node::new(vec![0.0], vec![0.5], 1);
        assert_eq!(gate.assess(&core, &node).unwrap(), Assessment::Evaluate);
    }

    #[test]
    fn test_promising_upper_bound_evaluates() {
        let core = core_with_best(1.0);
        let mut gate = SurrogateGate::new(
            Box::new(Scripted {
                samples: 5,
                mean: 1.5,
                std: 0.1,
            }),
            BAMSOO_SCALE,
            DEFAULT_CONFIDENCE,
        );
        gate.prepare(&core).unwrap();

        let node = Node::new(vec![0.0], vec![0.5], 1);
        assert_eq!(gate.assess(&core, &node).unwrap(), Assessment::Evaluate);
    }

    #[test]
    fn test_hopeless_node_gets_lower_bound() {
        let core = core_with_best(1.0);
        let mut gate = SurrogateGate::new(
            Box::new(Scripted {
                samples: 5,
                mean: -5.0,
                std: 0.0,
            }),
            BAMSOO_SCALE,
            DEFAULT_CONFIDENCE,
        );
        gate.prepare(&core).unwrap();

        let node = Node::new(vec![0.0], vec![0.5], 1);
        match gate.assess(&core, &node).unwrap() {
            Assessment::Fake(v) => assert!((v - -5.0).abs() < 1e-12),
            Assessment::Evaluate => panic!("expected a fake value"),
        }
    }

    #[test]
    fn test_real_valued_node_is_not_gated() {
        let core = core_with_best(1.0);
        let mut gate = SurrogateGate::new(
            Box::new(Scripted {
                samples: 5,
                mean: -5.0,
                std: 0.0,
            }),
            BAMSOO_SCALE,
            DEFAULT_CONFIDENCE,
        );
        gate.prepare(&core).unwrap();

        let mut node = Node::new(vec![0.0], vec![0.5], 1);
        node.set_value(0.2);
        assert_eq!(gate.assess(&core, &node).unwrap(), Assessment::Evaluate);
    }

    #[test]
    fn test_confidence_bounds_widen_with_node_evals() {
        let mut core = core_with_best(1.0);
        let mut gate = SurrogateGate::new(
            Box::new(Scripted {
                samples: 5,
                mean: 0.0,
                std: 1.0,
            }),
            IMGPO_SCALE,
            DEFAULT_CONFIDENCE,
        );
        gate.prepare(&core).unwrap();

        let (_, narrow) = gate.confidence_bounds(&core, &[0.5]).unwrap();
        for _ in 0..50 {
            core.bump_node_evals();
        }
        let (_, wide) = gate.confidence_bounds(&core, &[0.5]).unwrap();
        assert!(wide > narrow);
    }
}
