//! Model evaluation
//!
//! Accuracy plus per-class, macro and support-weighted precision, recall and F1.

mod evaluator;
mod metrics;

pub use evaluator::ModelEvaluator;
pub use metrics::{AverageMetrics, ClassMetrics, EvaluationReport};
