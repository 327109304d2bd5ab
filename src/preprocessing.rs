// src/preprocessing.rs

//! Median imputation followed by z-score standardization, using statistics
//! frozen at fit time.

use crate::core::{FeatureRecord, Instance, Result, ShapError};
use serde::{Deserialize, Serialize};

/// Per-feature statistics captured when the preprocessing pipeline was fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationStats {
    medians: Vec<f64>,
    means: Vec<f64>,
    std_devs: Vec<f64>,
}

impl ImputationStats {
    pub fn new(medians: Vec<f64>, means: Vec<f64>, std_devs: Vec<f64>) -> Result<Self> {
        let stats = ImputationStats { medians, means, std_devs };
        stats.validate()?;
        Ok(stats)
    }

    pub fn num_features(&self) -> usize {
        self.medians.len()
    }

    pub fn medians(&self) -> &[f64] {
        &self.medians
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn std_devs(&self) -> &[f64] {
        &self.std_devs
    }

    /// Re-checks the invariants; deserialized statistics have not been through `new`.
    pub fn validate(&self) -> Result<()> {
        let n = self.medians.len();
        if self.means.len() != n || self.std_devs.len() != n {
            return Err(ShapError::MalformedModel(format!(
                "imputation statistics disagree on feature count: {} medians, {} means, {} std devs",
                n,
                self.means.len(),
                self.std_devs.len()
            )));
        }
        for (i, &sd) in self.std_devs.iter().enumerate() {
            if sd == 0.0 || !sd.is_finite() {
                return Err(ShapError::NumericDegeneracy(format!(
                    "feature {} has standard deviation {}; standardization is undefined",
                    i, sd
                )));
            }
        }
        if let Some(i) = self
            .medians
            .iter()
            .chain(self.means.iter())
            .position(|v| !v.is_finite())
        {
            return Err(ShapError::NumericDegeneracy(format!(
                "non-finite median or mean at statistic index {}",
                i
            )));
        }
        Ok(())
    }
}

/// Turns a raw [`FeatureRecord`] into an [`Instance`] in canonical feature order.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    feature_order: Vec<String>,
    stats: Option<ImputationStats>,
    missing_sentinels: Vec<f64>,
}

impl Preprocessor {
    /// An unfitted preprocessor. `transform` fails with `NotReady` until
    /// statistics are attached with [`Preprocessor::with_stats`].
    pub fn new(feature_order: Vec<String>) -> Self {
        Preprocessor {
            feature_order,
            stats: None,
            missing_sentinels: Vec::new(),
        }
    }

    /// Attaches fitted statistics. Their length must match the feature order.
    pub fn with_stats(mut self, stats: ImputationStats) -> Result<Self> {
        stats.validate()?;
        if stats.num_features() != self.feature_order.len() {
            return Err(ShapError::MalformedModel(format!(
                "preprocessor has {} features but statistics cover {}",
                self.feature_order.len(),
                stats.num_features()
            )));
        }
        self.stats = Some(stats);
        Ok(self)
    }

    /// Raw values equal to any of `sentinels` are treated as missing, the way
    /// the bureau codes -7, -8 and -9 were replaced before fitting.
    pub fn with_missing_sentinels(mut self, sentinels: Vec<f64>) -> Self {
        self.missing_sentinels = sentinels;
        self
    }

    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    pub fn num_features(&self) -> usize {
        self.feature_order.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.stats.is_some()
    }

    pub fn stats(&self) -> Option<&ImputationStats> {
        self.stats.as_ref()
    }

    pub fn transform(&self, record: &FeatureRecord) -> Result<Instance> {
        let stats = self.stats.as_ref().ok_or_else(|| {
            ShapError::NotReady("preprocessor statistics have not been fitted".to_string())
        })?;

        let mut out = Vec::with_capacity(self.feature_order.len());
        for (i, name) in self.feature_order.iter().enumerate() {
            let raw = record.get(name)?.filter(|v| !self.is_missing(*v));
            let value = match raw {
                Some(v) => v,
                None => {
                    log::trace!("imputing median for missing feature '{}'", name);
                    stats.medians[i]
                }
            };
            out.push((value - stats.means[i]) / stats.std_devs[i]);
        }
        Ok(Instance::from_vec(out))
    }

    fn is_missing(&self, value: f64) -> bool {
        value.is_nan() || self.missing_sentinels.contains(&value)
    }
}
