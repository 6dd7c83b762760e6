//! Model training
//!
//! Random forest classifier over encoded matrices, the trained model bundle
//! and the trainer that ties them to an encoded dataset.

mod config;
mod labels;
mod model;
mod trainer;
pub mod decision_tree;
pub mod random_forest;

pub use config::Hyperparameters;
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use labels::ClassLabels;
pub use model::{ChurnModel, ImportanceRanked, ModelInfo, Predictor, TrainedPredictor};
pub use random_forest::{MaxFeatures, RandomForest};
pub use trainer::ModelTrainer;
