//! Training hyperparameters

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

/// Hyperparameters of the random forest classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Number of trees in the forest
    pub tree_count: usize,
    /// Maximum depth per tree, unlimited when `None`
    pub max_depth: Option<usize>,
    /// Seed for bootstrap sampling and feature selection
    pub random_seed: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            tree_count: 100,
            max_depth: None,
            random_seed: 42,
        }
    }
}

impl Hyperparameters {
    pub fn with_tree_count(mut self, tree_count: usize) -> Self {
        self.tree_count = tree_count;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Reject a zero tree count or a zero depth limit
    pub fn validate(&self) -> Result<()> {
        if self.tree_count == 0 {
            return Err(ChurnError::InvalidHyperparameter {
                name: "tree_count".to_string(),
                value: self.tree_count.to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.max_depth == Some(0) {
            return Err(ChurnError::InvalidHyperparameter {
                name: "max_depth".to_string(),
                value: "0".to_string(),
                reason: "must be greater than 0 or unlimited".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = Hyperparameters::default();
        assert_eq!(params.tree_count, 100);
        assert_eq!(params.max_depth, None);
        assert_eq!(params.random_seed, 42);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(Hyperparameters::default().with_tree_count(0).validate().is_err());
        assert!(Hyperparameters::default().with_max_depth(Some(0)).validate().is_err());
        assert!(Hyperparameters::default().with_max_depth(Some(3)).validate().is_ok());
    }
}
