// src/core/data.rs
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::errors::{Result, ShapError};

/// Represents a single data instance (a row of features) in canonical order,
/// after preprocessing.
pub type Instance = Array1<f64>;

/// Represents a dataset (multiple instances, e.g., background data).
pub type Dataset = Array2<f64>;

/// Feature names of the HELOC credit application, in the order the request
/// schema lists them.
pub const HELOC_FEATURES: [&str; 23] = [
    "ExternalRiskEstimate",
    "MSinceOldestTradeOpen",
    "MSinceMostRecentTradeOpen",
    "AverageMInFile",
    "NumSatisfactoryTrades",
    "NumTrades60Ever2DerogPubRec",
    "NumTrades90Ever2DerogPubRec",
    "PercentTradesNeverDelq",
    "MSinceMostRecentDelq",
    "MaxDelq2PublicRecLast12M",
    "MaxDelqEver",
    "NumTotalTrades",
    "NumTradesOpeninLast12M",
    "PercentInstallTrades",
    "MSinceMostRecentInqexcl7days",
    "NumInqLast6M",
    "NumInqLast6Mexcl7days",
    "NetFractionRevolvingBurden",
    "NetFractionInstallBurden",
    "NumRevolvingTradesWBalance",
    "NumInstallTradesWBalance",
    "NumBank2NatlTradesWHighUtilization",
    "PercentTradesWBalance",
];

/// A raw applicant record: feature name to an optional value. `None` means
/// the value is missing and will be imputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord {
    values: HashMap<String, Option<f64>>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.values.insert(name.into(), value);
    }

    /// Looks up a feature. The outer `Err` means the key is absent entirely,
    /// which is different from a present key holding `None`.
    pub fn get(&self, name: &str) -> Result<Option<f64>> {
        self.values.get(name).copied().ok_or_else(|| {
            ShapError::SchemaMismatch(format!("record is missing required feature '{}'", name))
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<f64>)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (K, Option<f64>)>>(iter: I) -> Self {
        let mut record = FeatureRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// One feature's signed share of the margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub feature: String,
    pub shap_value: f64,
}

/// Represents the output of a SHAP explanation for a single instance.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// SHAP values, one for each feature, in canonical order.
    pub shap_values: Array1<f64>,
    /// The base value, E[f(x)] under the empty coalition, including the ensemble base score.
    pub expected_value: f64,
    /// The raw margin for the instance being explained.
    pub actual_prediction: f64,
    /// The instance that was explained.
    pub instance: Option<Instance>,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Explanation:")?;
        writeln!(f, "  Expected Value (Base): {:.4}", self.expected_value)?;
        writeln!(f, "  Actual Margin:         {:.4}", self.actual_prediction)?;
        writeln!(f, "  SHAP Values:")?;
        for (i, val) in self.shap_values.iter().enumerate() {
            writeln!(f, "    Feature {}: {:.4}", i, val)?;
        }
        Ok(())
    }
}

/// The assembled answer to an explanation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    /// Probability of default.
    pub probability: f64,
    pub base_value: f64,
    /// Sorted by descending absolute value, canonical order on ties.
    pub explanations: Vec<Contribution>,
    pub summary: String,
}

impl ExplanationResult {
    /// `base_value` plus every contribution, i.e. the margin the explanation accounts for.
    pub fn explained_margin(&self) -> f64 {
        self.base_value + self.explanations.iter().map(|c| c.shap_value).sum::<f64>()
    }
}

impl fmt::Display for ExplanationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Probability of default: {:.4}", self.probability)?;
        writeln!(f, "Base value (log-odds):  {:.4}", self.base_value)?;
        writeln!(f, "Top contributions:")?;
        for c in self.explanations.iter().take(10) {
            writeln!(f, "    {:<36} {:+.4}", c.feature, c.shap_value)?;
        }
        if self.explanations.len() > 10 {
            writeln!(f, "    ...")?;
        }
        writeln!(f, "{}", self.summary)
    }
}
