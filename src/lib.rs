#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Optimistic global optimization over a unit hyper-rectangle.
//!
//! The crate maximizes a deterministic black-box function on `[0,1]^dim`
//! by hierarchical partitioning: a tree of sub-rectangles is refined by
//! repeatedly splitting promising cells, each cell scored by an objective
//! evaluation at its center. One stepwise [`Engine`] drives every
//! algorithm; the named variants are bundles of four pluggable policies
//! (split strategy, depth scheduler, evaluation gate, subtree lookahead)
//! selected through [`EngineBuilder`].
//!
//! # Getting Started
//!
//! Simultaneous Optimistic Optimization (SOO) is the default bundle and
//! needs nothing beyond the objective, the dimensionality and an
//! evaluation budget:
//!
//! ```
//! use optimistic::prelude::*;
//!
//! let mut engine = EngineBuilder::new(|x: &[f64]| -(x[0] - 0.5).powi(2), 1, 50)
//!     .build()
//!     .unwrap();
//! engine.optimize().unwrap();
//!
//! let best = engine.best_node().unwrap();
//! println!("x = {:.4}, f(x) = {:.4}", best.center()[0], best.value().unwrap());
//! ```
//!
//! # Algorithm Variants
//!
//! | Variant | Builder calls | Idea |
//! |---------|---------------|------|
//! | SOO | defaults | Expand the best node per depth when it beats every shallower best |
//! | `RandomSOO` | [`split_shuffled`](EngineBuilder::split_shuffled) / [`split_uniform`](EngineBuilder::split_uniform) | SOO with randomized split ties |
//! | LOGO | [`depth_bands`](EngineBuilder::depth_bands) | Aggregate depths into adaptive-width bands |
//! | DOO | [`slope_bound`](EngineBuilder::slope_bound) | Expand the global argmax of a slope-derived upper bound |
//! | `BaMSOO` | [`bamsoo`](EngineBuilder::bamsoo) | Gate evaluations through a Gaussian-process surrogate |
//! | IMGPO | [`imgpo`](EngineBuilder::imgpo) | Surrogate gating plus a bounded subtree lookahead |
//!
//! Split strategies compose freely with the scheduler and gate choices.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key search points | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod engine;
mod error;
pub mod gate;
mod lookahead;
mod node;
pub mod schedule;
mod space;
pub mod split;
pub mod surrogate;

pub use engine::{Engine, EngineBuilder, EngineCore, ObjectiveFn};
pub use error::{Error, Result};
pub use lookahead::SubtreeLookahead;
pub use node::Node;
pub use space::{NodeId, NodeSpace};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use optimistic::prelude::*;
/// ```
pub mod prelude {
    pub use crate::engine::{Engine, EngineBuilder, EngineCore};
    pub use crate::error::{Error, Result};
    pub use crate::gate::{Assessment, EvaluationGate};
    pub use crate::node::Node;
    pub use crate::schedule::DepthScheduler;
    pub use crate::space::{NodeId, NodeSpace};
    pub use crate::split::SplitStrategy;
    pub use crate::surrogate::{GaussianProcess, Prediction, SurrogateModel};
}
