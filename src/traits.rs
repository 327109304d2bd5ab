// src/traits.rs

use crate::core::{Dataset, Instance, Result, ShapError};
use crate::utils::sigmoid;
use ndarray::Array1;

/// A fitted binary classifier scoring preprocessed instances in log-odds space.
pub trait PredictModel {
    /// Raw additive output (log-odds) for one instance.
    fn predict_margin(&self, instance: &Instance) -> Result<f64>;

    /// Number of features the model was fit against.
    fn num_features(&self) -> usize;

    /// Probability of the positive class.
    fn predict_proba(&self, instance: &Instance) -> Result<f64> {
        Ok(sigmoid(self.predict_margin(instance)?))
    }

    /// Margins for every row of `instances`, in row order.
    fn predict_batch(&self, instances: &Dataset) -> Result<Array1<f64>> {
        if instances.ncols() != self.num_features() {
            return Err(ShapError::IncompatibleDimensions(format!(
                "Model expects {} features, got {}",
                self.num_features(),
                instances.ncols()
            )));
        }
        let mut margins = Vec::with_capacity(instances.nrows());
        for row in instances.rows() {
            margins.push(self.predict_margin(&row.to_owned())?);
        }
        Ok(Array1::from_vec(margins))
    }
}

/// Shared length check for single-instance scoring.
pub(crate) fn check_instance_len(instance: &Instance, expected: usize) -> Result<()> {
    if instance.len() != expected {
        return Err(ShapError::IncompatibleDimensions(format!(
            "Instance has {} features, but model expects {}.",
            instance.len(),
            expected
        )));
    }
    Ok(())
}
