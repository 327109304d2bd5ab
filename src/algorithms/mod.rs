mod interventional;
mod path;
pub mod tree_shap;

pub use tree_shap::{FeaturePerturbation, TreeExplainer, TreeShapConfig};
