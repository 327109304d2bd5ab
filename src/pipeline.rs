// src/pipeline.rs

//! Record in, probability or full explanation out.

use crate::algorithms::{TreeExplainer, TreeShapConfig};
use crate::core::{Contribution, Dataset, ExplanationResult, FeatureRecord, Result, ShapError};
use crate::models::{LogisticModel, TreeEnsemble};
use crate::preprocessing::{ImputationStats, Preprocessor};
use crate::summary::{SummaryConfig, SummaryGenerator};
use crate::traits::PredictModel;
use crate::utils::sigmoid;
use ndarray::ArrayView1;

/// Fitted artifacts handed over by the loader. Anything left as `None`
/// surfaces as `NotReady` when a call needs it.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    /// Canonical feature order shared by preprocessing, scoring and explanation.
    pub feature_order: Vec<String>,
    pub stats: Option<ImputationStats>,
    pub ensemble: Option<TreeEnsemble>,
    pub logistic: Option<LogisticModel>,
    /// Preprocessed rows, required for interventional explanations.
    pub background: Option<Dataset>,
    /// Raw values treated as missing before imputation.
    pub missing_sentinels: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub shap: TreeShapConfig,
    pub summary: SummaryConfig,
}

/// Immutable after construction; share it by reference across threads.
#[derive(Debug, Clone)]
pub struct ExplanationPipeline {
    preprocessor: Preprocessor,
    explainer: Option<TreeExplainer>,
    logistic: Option<LogisticModel>,
    summary: SummaryGenerator,
}

impl ExplanationPipeline {
    pub fn new(artifacts: Artifacts, config: Option<PipelineConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let n = artifacts.feature_order.len();

        let mut preprocessor = Preprocessor::new(artifacts.feature_order)
            .with_missing_sentinels(artifacts.missing_sentinels);
        if let Some(stats) = artifacts.stats {
            preprocessor = preprocessor.with_stats(stats)?;
        }

        let explainer = match artifacts.ensemble {
            Some(ensemble) => {
                check_width("tree ensemble", ensemble.num_features(), n)?;
                Some(TreeExplainer::new(
                    ensemble,
                    artifacts.background,
                    Some(config.shap.clone()),
                )?)
            }
            None => None,
        };

        if let Some(logistic) = &artifacts.logistic {
            check_width("logistic model", logistic.num_features(), n)?;
        }

        log::info!(
            "explanation pipeline assembled: {} features, preprocessor fitted: {}, trees: {}, logistic: {}, perturbation: {:?}",
            n,
            preprocessor.is_fitted(),
            explainer.as_ref().map_or(0, |e| e.ensemble().num_trees()),
            artifacts.logistic.is_some(),
            config.shap.perturbation
        );

        Ok(ExplanationPipeline {
            preprocessor,
            explainer,
            logistic: artifacts.logistic,
            summary: SummaryGenerator::new(Some(config.summary)),
        })
    }

    pub fn feature_order(&self) -> &[String] {
        self.preprocessor.feature_order()
    }

    pub fn explainer(&self) -> Option<&TreeExplainer> {
        self.explainer.as_ref()
    }

    /// Probability of default from the tree ensemble.
    pub fn predict(&self, record: &FeatureRecord) -> Result<f64> {
        let explainer = self.require_explainer()?;
        let x = self.preprocessor.transform(record)?;
        explainer.ensemble().predict_proba(&x)
    }

    /// Probability of default from the logistic-regression model.
    pub fn predict_logistic(&self, record: &FeatureRecord) -> Result<f64> {
        let model = self.logistic.as_ref().ok_or_else(|| {
            log::warn!("logistic prediction requested but no logistic model is loaded");
            ShapError::NotReady("logistic model not loaded".to_string())
        })?;
        let x = self.preprocessor.transform(record)?;
        model.predict_proba(&x)
    }

    pub fn explain(&self, record: &FeatureRecord) -> Result<ExplanationResult> {
        let explainer = self.require_explainer()?;
        let x = self.preprocessor.transform(record)?;
        let explanation = explainer.shap_values(&x)?;

        let explanations = rank_contributions(self.feature_order(), explanation.shap_values.view());
        let summary = self.summary.summarize(explanation.expected_value, &explanations);

        Ok(ExplanationResult {
            probability: sigmoid(explanation.actual_prediction),
            base_value: explanation.expected_value,
            explanations,
            summary,
        })
    }

    fn require_explainer(&self) -> Result<&TreeExplainer> {
        self.explainer
            .as_ref()
            .ok_or_else(|| ShapError::NotReady("tree ensemble not loaded".to_string()))
    }
}

fn check_width(what: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(ShapError::MalformedModel(format!(
            "{} expects {} features but the feature order lists {}",
            what, got, expected
        )));
    }
    Ok(())
}

/// Pairs values with feature names and sorts by descending absolute value.
/// Ties keep canonical feature order.
pub fn rank_contributions(names: &[String], values: ArrayView1<'_, f64>) -> Vec<Contribution> {
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then(a.0.cmp(&b.0)));
    indexed
        .into_iter()
        .map(|(i, shap_value)| Contribution {
            feature: names[i].clone(),
            shap_value,
        })
        .collect()
}
