//! Hyper-rectangle node record.

/// One hyper-rectangular region of the search domain.
///
/// Geometry (`edges`, `sizes`, `depth`) is fixed at creation; only the
/// observed value slot mutates. A node with no value has never been
/// evaluated by any means; a node with a fake value carries a surrogate
/// lower-confidence bound instead of a real observation.
///
/// # Examples
///
/// ```
/// use optimistic::Node;
///
/// let node = Node::new(vec![0.0, 0.5], vec![1.0, 0.5], 1);
/// assert_eq!(node.center(), vec![0.5, 0.75]);
/// assert!(!node.has_value());
/// ```
#[derive(Clone, Debug)]
pub struct Node {
    edges: Vec<f64>,
    sizes: Vec<f64>,
    depth: usize,
    value: Option<f64>,
    is_fake: bool,
}

impl Node {
    /// Creates an unevaluated node from its lower corner and side lengths.
    #[must_use]
    pub fn new(edges: Vec<f64>, sizes: Vec<f64>, depth: usize) -> Self {
        debug_assert_eq!(edges.len(), sizes.len());
        Self {
            edges,
            sizes,
            depth,
            value: None,
            is_fake: false,
        }
    }

    /// The lower corner coordinate, one entry per dimension.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// The side length, one entry per dimension.
    #[must_use]
    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    /// Number of splits between the root region and this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The observed (or surrogate-substituted) value, if any.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Whether the node carries any value at all.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Whether the node's value is a surrogate-derived bound rather than
    /// a real observation.
    #[must_use]
    pub fn is_fake_value(&self) -> bool {
        self.is_fake
    }

    /// Whether the node carries a real (non-surrogate) observation.
    #[must_use]
    pub fn has_real_value(&self) -> bool {
        self.value.is_some() && !self.is_fake
    }

    /// Records a real observation at the node's center.
    pub fn set_value(&mut self, value: f64) {
        self.value = Some(value);
        self.is_fake = false;
    }

    /// Records a surrogate lower-confidence bound in place of a real
    /// observation.
    pub fn set_fake_value(&mut self, value: f64) {
        self.value = Some(value);
        self.is_fake = true;
    }

    /// The center point of the region, where observations happen.
    #[must_use]
    pub fn center(&self) -> Vec<f64> {
        self.edges
            .iter()
            .zip(&self.sizes)
            .map(|(e, s)| e + s / 2.0)
            .collect()
    }

    /// The volume of the region.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.sizes.iter().product()
    }

    /// Euclidean distance from the center to a corner. The slope-bound
    /// scheduler multiplies this by the smoothness constant to bound the
    /// best value the region can contain.
    #[must_use]
    pub fn half_diagonal(&self) -> f64 {
        self.sizes
            .iter()
            .map(|s| {
                let half = s / 2.0;
                half * half
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Whether two nodes occupy the same position: equal depth and
    /// bit-identical geometry.
    #[must_use]
    pub fn same_position(&self, other: &Self) -> bool {
        self.depth == other.depth && self.edges == other.edges && self.sizes == other.sizes
    }
}
