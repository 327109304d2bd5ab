// src/algorithms/tree_shap.rs

use super::interventional;
use super::path::UniquePath;
use crate::core::{Dataset, Explanation, Instance, Result, ShapError};
use crate::models::tree::{goes_left, DecisionTree, Node};
use crate::models::TreeEnsemble;
use crate::traits::{check_instance_len, PredictModel};
use ndarray::{Array1, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// How the value of a coalition is defined when some features are unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeaturePerturbation {
    /// Unknown features are replaced by rows of a background dataset.
    Interventional,
    /// Unknown features are marginalized using the trees' node covers.
    #[default]
    TreePathDependent,
}

/// Configuration for the TreeSHAP explainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeShapConfig {
    pub perturbation: FeaturePerturbation,
    /// Verify `sum(phi) + base == margin` on every explanation.
    pub check_additivity: bool,
    pub additivity_tolerance: f64,
    /// Interventional backgrounds larger than this are subsampled.
    pub max_background_samples: Option<usize>,
    pub background_seed: u64,
}

impl Default for TreeShapConfig {
    fn default() -> Self {
        TreeShapConfig {
            perturbation: FeaturePerturbation::TreePathDependent,
            check_additivity: true,
            additivity_tolerance: 1e-6,
            max_background_samples: Some(100),
            background_seed: 42,
        }
    }
}

/// Exact Shapley attributions for a [`TreeEnsemble`].
///
/// All validation happens in [`TreeExplainer::new`]; once built the explainer
/// is immutable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    ensemble: TreeEnsemble,
    background: Option<Dataset>,
    expected_value: f64,
    max_depth: usize,
    config: TreeShapConfig,
}

impl TreeExplainer {
    pub fn new(
        ensemble: TreeEnsemble,
        background: Option<Dataset>,
        config: Option<TreeShapConfig>,
    ) -> Result<Self> {
        let config = config.unwrap_or_default();
        ensemble.validate()?;
        if ensemble.num_trees() == 0 {
            return Err(ShapError::NotReady(
                "tree ensemble has no trees; it has not been finalized".to_string(),
            ));
        }

        let (background, expected_value) = match config.perturbation {
            FeaturePerturbation::TreePathDependent => {
                for (i, tree) in ensemble.trees().iter().enumerate() {
                    tree.check_covers()
                        .map_err(|e| ShapError::MalformedModel(format!("tree {}: {}", i, e)))?;
                }
                if background.is_some() {
                    log::debug!(
                        "background dataset ignored under tree-path-dependent perturbation"
                    );
                }
                let expected = ensemble
                    .trees()
                    .iter()
                    .fold(ensemble.base_score(), |acc, t| acc + t.expected_value());
                (None, expected)
            }
            FeaturePerturbation::Interventional => {
                let background = background.ok_or_else(|| {
                    ShapError::NotReady(
                        "interventional perturbation requires a background dataset".to_string(),
                    )
                })?;
                if background.ncols() != ensemble.num_features() {
                    return Err(ShapError::IncompatibleDimensions(format!(
                        "Background data has {} features, but model expects {}.",
                        background.ncols(),
                        ensemble.num_features()
                    )));
                }
                let background = subsample(background, &config);
                if background.nrows() == 0 {
                    return Err(ShapError::NotReady(
                        "background dataset has no rows".to_string(),
                    ));
                }
                let margins = ensemble.predict_batch(&background)?;
                let expected = margins.sum() / margins.len() as f64;
                (Some(background), expected)
            }
        };

        let max_depth = ensemble.max_depth();
        log::debug!(
            "TreeExplainer ready: {} trees, max depth {}, {:?}, base value {:.6}",
            ensemble.num_trees(),
            max_depth,
            config.perturbation,
            expected_value
        );

        Ok(TreeExplainer {
            ensemble,
            background,
            expected_value,
            max_depth,
            config,
        })
    }

    /// Base value: the ensemble's expected margin with no features known.
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    pub fn num_features(&self) -> usize {
        self.ensemble.num_features()
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }

    pub fn background_data(&self) -> Option<&Dataset> {
        self.background.as_ref()
    }

    pub fn config(&self) -> &TreeShapConfig {
        &self.config
    }

    pub fn shap_values(&self, instance: &Instance) -> Result<Explanation> {
        check_instance_len(instance, self.num_features())?;
        let x = instance.view();
        let mut phi = Array1::zeros(self.num_features());

        match self.config.perturbation {
            FeaturePerturbation::TreePathDependent => {
                for tree in self.ensemble.trees() {
                    path_dependent(tree, x, self.max_depth, &mut phi);
                }
            }
            FeaturePerturbation::Interventional => {
                // Checked in `new`.
                let background = self.background.as_ref().ok_or_else(|| {
                    ShapError::NotReady("interventional explainer lost its background".to_string())
                })?;
                for z in background.axis_iter(Axis(0)) {
                    for tree in self.ensemble.trees() {
                        interventional::accumulate(tree, x, z, &mut phi.view_mut());
                    }
                }
                phi /= background.nrows() as f64;
            }
        }

        let margin = self.ensemble.predict_margin(instance)?;
        if self.config.check_additivity {
            let explained = phi.sum() + self.expected_value;
            if (explained - margin).abs() > self.config.additivity_tolerance {
                return Err(ShapError::AdditivityViolation(format!(
                    "base value plus contributions is {} but the model margin is {}",
                    explained, margin
                )));
            }
        }

        Ok(Explanation {
            shap_values: phi,
            expected_value: self.expected_value,
            actual_prediction: margin,
            instance: Some(instance.to_owned()),
        })
    }
}

fn subsample(background: Dataset, config: &TreeShapConfig) -> Dataset {
    match config.max_background_samples {
        Some(max) if background.nrows() > max => {
            log::warn!(
                "subsampling interventional background from {} to {} rows",
                background.nrows(),
                max
            );
            let mut rng = StdRng::seed_from_u64(config.background_seed);
            let mut rows = rand::seq::index::sample(&mut rng, background.nrows(), max).into_vec();
            rows.sort_unstable();
            background.select(Axis(0), &rows)
        }
        _ => background,
    }
}

/// Tree-path-dependent TreeSHAP for one tree, added into `phi`.
fn path_dependent(
    tree: &DecisionTree,
    x: ArrayView1<'_, f64>,
    max_depth: usize,
    phi: &mut Array1<f64>,
) {
    recurse(tree, x, 0, UniquePath::with_capacity(max_depth), 1.0, 1.0, None, phi);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &DecisionTree,
    x: ArrayView1<'_, f64>,
    node: usize,
    mut path: UniquePath,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
    phi: &mut Array1<f64>,
) {
    path.extend(zero_fraction, one_fraction, feature);

    match *tree.node(node) {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let e = *path.element(i);
                if let Some(f) = e.feature {
                    phi[f] += path.unwound_sum(i) * (e.one_fraction - e.zero_fraction) * value;
                }
            }
        }
        Node::Split {
            feature: split_feature,
            threshold,
            default_left,
            left,
            right,
            cover,
        } => {
            let (hot, cold) = if goes_left(x[split_feature], threshold, default_left) {
                (left, right)
            } else {
                (right, left)
            };

            // A feature already on the path is folded into a single element.
            let (mut incoming_zero, mut incoming_one) = (1.0, 1.0);
            if let Some(k) = path.position(split_feature) {
                let e = *path.element(k);
                incoming_zero = e.zero_fraction;
                incoming_one = e.one_fraction;
                path.unwind(k);
            }

            let hot_zero = incoming_zero * tree.node(hot).cover() / cover;
            let cold_zero = incoming_zero * tree.node(cold).cover() / cover;
            recurse(tree, x, hot, path.clone(), hot_zero, incoming_one, Some(split_feature), phi);
            recurse(tree, x, cold, path, cold_zero, 0.0, Some(split_feature), phi);
        }
    }
}
