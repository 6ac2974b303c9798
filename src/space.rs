//! Per-depth node arena with stable handles.

use crate::node::Node;

/// Handle to a node stored in a [`NodeSpace`].
///
/// A handle stays valid across insertions at any depth (indices survive
/// reallocation, unlike raw references into a growing vector). It is
/// invalidated only by a removal at the same depth, which the engine never
/// performs while holding one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId {
    /// Depth level the node lives at.
    pub depth: usize,
    /// Position within that depth level.
    pub index: usize,
}

/// All nodes currently held by an engine, grouped by depth.
///
/// Exclusively owned and mutated by the engine that created it. Within a
/// depth the order is insertion order; best-value queries break ties in
/// favor of the earliest-inserted node.
#[derive(Debug, Default)]
pub struct NodeSpace {
    levels: Vec<Vec<Node>>,
}

impl NodeSpace {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self { levels: Vec::new() }
    }

    /// Number of depth levels allocated so far (some may be empty).
    #[must_use]
    pub fn num_depths(&self) -> usize {
        self.levels.len()
    }

    /// Total number of nodes across all depths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Whether the space holds no nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }

    /// Inserts a node at its own depth, growing the level list as needed.
    pub fn insert(&mut self, node: Node) -> NodeId {
        let depth = node.depth();
        if self.levels.len() <= depth {
            self.levels.resize_with(depth + 1, Vec::new);
        }
        self.levels[depth].push(node);
        NodeId {
            depth,
            index: self.levels[depth].len() - 1,
        }
    }

    /// Looks up a node by handle.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.levels.get(id.depth)?.get(id.index)
    }

    /// Looks up a node by handle, mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.levels.get_mut(id.depth)?.get_mut(id.index)
    }

    /// Removes a node, preserving the insertion order of its depth level.
    ///
    /// Returns `None` if the handle is stale. Handles at the same depth
    /// with a larger index are invalidated.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let level = self.levels.get_mut(id.depth)?;
        if id.index >= level.len() {
            return None;
        }
        Some(level.remove(id.index))
    }

    /// Handle of the highest-valued node at the given depth, earliest
    /// insertion winning ties. `None` for an empty or unallocated depth
    /// or when no node there carries a value.
    #[must_use]
    pub fn best_at_depth(&self, depth: usize) -> Option<NodeId> {
        let level = self.levels.get(depth)?;
        let mut best: Option<(usize, f64)> = None;
        for (index, node) in level.iter().enumerate() {
            let Some(value) = node.value() else { continue };
            if best.map_or(true, |(_, b)| value > b) {
                best = Some((index, value));
            }
        }
        best.map(|(index, _)| NodeId { depth, index })
    }

    /// Handle of the highest-valued node anywhere in the space, scanning
    /// depths in order so the first-encountered node wins ties.
    #[must_use]
    pub fn best_node(&self) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for (depth, level) in self.levels.iter().enumerate() {
            for (index, node) in level.iter().enumerate() {
                let Some(value) = node.value() else { continue };
                if best.map_or(true, |(_, b)| value > b) {
                    best = Some((NodeId { depth, index }, value));
                }
            }
        }
        best.map(|(id, _)| id)
    }

    /// Greatest value among real (non-surrogate) observations in the space.
    #[must_use]
    pub fn best_real_value(&self) -> Option<f64> {
        self.iter()
            .filter(|n| n.has_real_value())
            .filter_map(Node::value)
            .fold(None, |acc, v| match acc {
                Some(b) if b >= v => Some(b),
                _ => Some(v),
            })
    }

    /// Iterates all nodes in depth order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.levels.iter().flatten()
    }

    /// Iterates `(handle, node)` pairs in depth order.
    pub fn iter_ids(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.levels.iter().enumerate().flat_map(|(depth, level)| {
            level
                .iter()
                .enumerate()
                .map(move |(index, node)| (NodeId { depth, index }, node))
        })
    }
}
