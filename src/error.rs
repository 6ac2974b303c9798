#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the configured dimensionality is zero.
    #[error("invalid dimensionality: must be at least 1")]
    InvalidDimension,

    /// Returned when the children-per-split count is even or zero.
    #[error("invalid children per split: {0} (must be odd and at least 1)")]
    InvalidChildCount(usize),

    /// Returned when the real-evaluation budget is zero.
    #[error("invalid evaluation budget: must be at least 1")]
    InvalidBudget,

    /// Returned when a depth-band width schedule is empty.
    #[error("width schedule cannot be empty")]
    EmptyWidthSchedule,

    /// Returned when a depth-band width schedule contains a zero width.
    #[error("invalid width in schedule: widths must be positive")]
    InvalidWidth,

    /// Returned when the slope bound is non-finite or non-positive.
    #[error("invalid slope bound: {0} (must be finite and positive)")]
    InvalidSlope(f64),

    /// Returned when the subtree lookahead depth is zero.
    #[error("invalid subtree lookahead depth: must be at least 1")]
    InvalidLookaheadDepth,

    /// Returned when the confidence parameter is outside (0, 1].
    #[error("invalid confidence parameter: {0} (must be in (0, 1])")]
    InvalidConfidence(f64),

    /// Returned when the objective produces a NaN or infinite value.
    #[error("objective returned non-finite value {value} at {point:?}")]
    NonFiniteObjective {
        /// The offending objective value.
        value: f64,
        /// The evaluated center point.
        point: Vec<f64>,
    },

    /// Returned when a surrogate prediction is requested before the model
    /// has been fit on at least two samples. Always recovered internally
    /// by falling back to a real evaluation.
    #[error("surrogate model has too few samples to predict")]
    SurrogateUnavailable,

    /// Returned when an internal invariant is violated. Indicates a bug
    /// in the engine, not a recoverable runtime condition.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
