pub mod ensemble;
pub mod logistic;
pub mod tree;

pub use ensemble::TreeEnsemble;
pub use logistic::LogisticModel;
pub use tree::{DecisionTree, Node};
