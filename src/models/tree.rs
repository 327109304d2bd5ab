// src/models/tree.rs

use crate::core::{Result, ShapError};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A node of a gradient-boosted tree, stored in an index arena.
///
/// `cover` is the (hessian-weighted) training mass that reached the node. It is
/// only consulted by tree-path-dependent explanations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        /// Branch taken when the feature value is missing (NaN).
        default_left: bool,
        left: usize,
        right: usize,
        #[serde(default)]
        cover: f64,
    },
    Leaf {
        value: f64,
        #[serde(default)]
        cover: f64,
    },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => *cover,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Which child a value is routed to: left iff `value < threshold`, missing
/// values follow the default branch.
#[inline]
pub fn goes_left(value: f64, threshold: f64, default_left: bool) -> bool {
    if value.is_nan() {
        default_left
    } else {
        value < threshold
    }
}

/// A single binary decision tree. Node 0 is the root.
///
/// Deserialization goes through [`DecisionTree::new`], so a tree that exists
/// always satisfies [`DecisionTree::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTree")]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Deserialize)]
struct RawTree {
    nodes: Vec<Node>,
}

impl TryFrom<RawTree> for DecisionTree {
    type Error = ShapError;

    fn try_from(raw: RawTree) -> Result<Self> {
        DecisionTree::new(raw.nodes)
    }
}

impl DecisionTree {
    pub fn new(nodes: Vec<Node>) -> Result<Self> {
        let tree = DecisionTree { nodes };
        tree.validate()?;
        Ok(tree)
    }

    /// A tree consisting of a single leaf.
    pub fn leaf(value: f64) -> Result<Self> {
        Self::new(vec![Node::Leaf { value, cover: 1.0 }])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checks the binary-tree invariant: every split has two distinct children
    /// stored after it, every non-root node has exactly one parent, and all
    /// values are finite.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(ShapError::MalformedModel("tree has no nodes".to_string()));
        }
        let mut parents = vec![0usize; self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split { threshold, left, right, .. } => {
                    if left == right {
                        return Err(ShapError::MalformedModel(format!(
                            "node {} has only one distinct child ({})",
                            idx, left
                        )));
                    }
                    for child in [left, right] {
                        if child >= self.nodes.len() || child <= idx {
                            return Err(ShapError::MalformedModel(format!(
                                "node {} points to invalid child {}",
                                idx, child
                            )));
                        }
                        parents[child] += 1;
                    }
                    if !threshold.is_finite() {
                        return Err(ShapError::MalformedModel(format!(
                            "node {} has non-finite threshold {}",
                            idx, threshold
                        )));
                    }
                }
                Node::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(ShapError::MalformedModel(format!(
                            "leaf {} has non-finite value {}",
                            idx, value
                        )));
                    }
                }
            }
        }
        if let Some(orphan) = (1..self.nodes.len()).find(|&i| parents[i] != 1) {
            return Err(ShapError::MalformedModel(format!(
                "node {} is referenced by {} parents",
                orphan, parents[orphan]
            )));
        }
        Ok(())
    }

    /// Fails if any split reads a feature at or beyond `num_features`.
    pub fn check_features(&self, num_features: usize) -> Result<()> {
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split { feature, .. } = node {
                if *feature >= num_features {
                    return Err(ShapError::MalformedModel(format!(
                        "node {} splits on feature {} but the model has {} features",
                        idx, feature, num_features
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fails unless every node carries a positive, finite cover.
    pub fn check_covers(&self) -> Result<()> {
        match self.nodes.iter().position(|n| !(n.cover() > 0.0 && n.cover().is_finite())) {
            Some(idx) => Err(ShapError::MalformedModel(format!(
                "node {} has cover {}; tree-path-dependent explanations need positive covers",
                idx,
                self.nodes[idx].cover()
            ))),
            None => Ok(()),
        }
    }

    /// Leaf output reached by routing `x` from the root.
    pub fn predict(&self, x: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                    ..
                } => {
                    idx = if goes_left(x[*feature], *threshold, *default_left) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Expected leaf value with no features known, weighting each child by
    /// `cover(child) / cover(parent)`.
    pub fn expected_value(&self) -> f64 {
        self.expected_value_from(0)
    }

    fn expected_value_from(&self, idx: usize) -> f64 {
        match &self.nodes[idx] {
            Node::Leaf { value, .. } => *value,
            Node::Split { left, right, cover, .. } => {
                let l = self.nodes[*left].cover() / cover;
                let r = self.nodes[*right].cover() / cover;
                l * self.expected_value_from(*left) + r * self.expected_value_from(*right)
            }
        }
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.depth_from(0)
    }

    fn depth_from(&self, idx: usize) -> usize {
        match &self.nodes[idx] {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => {
                1 + self.depth_from(*left).max(self.depth_from(*right))
            }
        }
    }
}
