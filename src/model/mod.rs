//! Random forest model
//!
//! - Decision tree: CART with gini impurity, flat node storage
//! - Random forest: bootstrap-aggregated trees, averaged probabilities
//! - Preprocessor: imputer and scaler fitted on training rows
//! - Artifact: everything above plus feature metadata, persisted as JSON

pub mod artifact;
pub mod decision_tree;
pub mod preprocess;
pub mod random_forest;

pub use artifact::{ModelArtifact, TrainingSummary, FORMAT_VERSION};
pub use decision_tree::{DecisionTree, TreeNode};
pub use preprocess::Preprocessor;
pub use random_forest::RandomForest;
