// src/lib.rs

//! `credisight_shap` scores credit applications with a gradient-boosted tree
//! ensemble and explains each score with exact TreeSHAP attributions and a
//! short narrative.
//!
//! ```no_run
//! use credisight_shap::{Artifacts, ExplanationPipeline, FeatureRecord};
//!
//! # fn run(artifacts: Artifacts, record: FeatureRecord) -> credisight_shap::Result<()> {
//! let pipeline = ExplanationPipeline::new(artifacts, None)?;
//! let result = pipeline.explain(&record)?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod core;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod summary;
pub mod traits;
pub mod utils;

// Re-export key components for easier use by library consumers
pub use crate::algorithms::{FeaturePerturbation, TreeExplainer, TreeShapConfig};
pub use crate::core::{
    Contribution, Dataset, Explanation, ExplanationResult, FeatureRecord, Instance, Result,
    ShapError, HELOC_FEATURES,
};
pub use crate::models::{DecisionTree, LogisticModel, Node, TreeEnsemble};
pub use crate::pipeline::{Artifacts, ExplanationPipeline, PipelineConfig};
pub use crate::preprocessing::{ImputationStats, Preprocessor};
pub use crate::summary::{SummaryConfig, SummaryGenerator};
pub use crate::traits::PredictModel;
