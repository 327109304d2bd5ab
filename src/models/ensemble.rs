// src/models/ensemble.rs

use super::tree::DecisionTree;
use crate::core::{Instance, Result, ShapError};
use crate::traits::{check_instance_len, PredictModel};
use serde::{Deserialize, Serialize};

/// An additive gradient-boosted ensemble in log-odds space.
///
/// `margin = base_score + Σ tree outputs`, summed in tree-index order so the
/// result is bit-reproducible. Deserialized ensembles are validated exactly
/// like ones built with [`TreeEnsemble::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnsemble")]
pub struct TreeEnsemble {
    base_score: f64,
    num_features: usize,
    trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct RawEnsemble {
    base_score: f64,
    num_features: usize,
    trees: Vec<DecisionTree>,
}

impl TryFrom<RawEnsemble> for TreeEnsemble {
    type Error = ShapError;

    fn try_from(raw: RawEnsemble) -> Result<Self> {
        TreeEnsemble::new(raw.base_score, raw.num_features, raw.trees)
    }
}

impl TreeEnsemble {
    /// `base_score` is the prior log-odds and must already be a finite number;
    /// repairing badly serialized artifacts is the loader's job.
    pub fn new(base_score: f64, num_features: usize, trees: Vec<DecisionTree>) -> Result<Self> {
        let ensemble = TreeEnsemble {
            base_score,
            num_features,
            trees,
        };
        ensemble.validate()?;
        Ok(ensemble)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_score.is_finite() {
            return Err(ShapError::MalformedModel(format!(
                "ensemble base_score must be finite, got {}",
                self.base_score
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .and_then(|_| tree.check_features(self.num_features))
                .map_err(|e| ShapError::MalformedModel(format!("tree {}: {}", i, e)))?;
        }
        Ok(())
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }
}

impl PredictModel for TreeEnsemble {
    fn predict_margin(&self, instance: &Instance) -> Result<f64> {
        check_instance_len(instance, self.num_features)?;
        let x = instance.view();
        let mut margin = self.base_score;
        for tree in &self.trees {
            margin += tree.predict(x);
        }
        Ok(margin)
    }

    fn num_features(&self) -> usize {
        self.num_features
    }
}
