// src/models/logistic.rs

use crate::core::{Instance, Result, ShapError};
use crate::traits::{check_instance_len, PredictModel};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A fitted logistic-regression scorer over the same preprocessed features as
/// the tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ShapError::MalformedModel(
                "logistic coefficients and intercept must be finite".to_string(),
            ));
        }
        Ok(LogisticModel {
            coefficients: Array1::from(coefficients),
            intercept,
        })
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl PredictModel for LogisticModel {
    fn predict_margin(&self, instance: &Instance) -> Result<f64> {
        check_instance_len(instance, self.coefficients.len())?;
        Ok(instance.dot(&self.coefficients) + self.intercept)
    }

    fn num_features(&self) -> usize {
        self.coefficients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn linear_margin_and_probability() -> Result<()> {
        // f(x1, x2) = 2*x1 + 3*x2 - 1
        let model = LogisticModel::new(vec![2.0, 3.0], -1.0)?;
        let x = array![0.5, -0.5];
        assert_abs_diff_eq!(model.predict_margin(&x)?, -1.5);
        assert_abs_diff_eq!(model.predict_proba(&x)?, 1.0 / (1.0 + 1.5f64.exp()));
        Ok(())
    }

    #[test]
    fn rejects_nan_coefficients() {
        assert!(matches!(
            LogisticModel::new(vec![f64::NAN], 0.0),
            Err(ShapError::MalformedModel(_))
        ));
    }
}
