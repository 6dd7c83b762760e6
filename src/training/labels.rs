//! Class label vocabulary

use crate::error::{ChurnError, Result};
use crate::preprocessing::{LabelKind, LabelVector};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Distinct label values observed at training time, in class-index order.
///
/// Boolean labels order as `false, true`, numeric labels by value and text
/// labels lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassLabels {
    /// Name of the label column the classes came from
    pub name: String,
    pub kind: LabelKind,
    values: Vec<String>,
}

impl ClassLabels {
    pub fn fit(labels: &LabelVector) -> Result<Self> {
        if labels.is_empty() {
            return Err(ChurnError::TrainingFailure(format!(
                "label column '{}' has no values",
                labels.name
            )));
        }

        let mut values: Vec<String> = labels
            .values
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if labels.kind == LabelKind::Numeric {
            values.sort_by(|a, b| {
                let a = a.parse::<f64>().unwrap_or(f64::NAN);
                let b = b.parse::<f64>().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            });
        }

        Ok(Self {
            name: labels.name.clone(),
            kind: labels.kind,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Raw label value of a class
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Human readable class name; boolean classes read as Negative/Positive
    pub fn display_name(&self, index: usize) -> String {
        match (self.kind, self.value(index)) {
            (LabelKind::Boolean, Some("false")) => "Negative".to_string(),
            (LabelKind::Boolean, Some("true")) => "Positive".to_string(),
            (_, Some(value)) => value.to_string(),
            (_, None) => format!("class {}", index),
        }
    }

    /// Map every label to its class index
    pub fn encode(&self, labels: &LabelVector) -> Result<Vec<usize>> {
        labels
            .values
            .iter()
            .map(|v| {
                self.index_of(v).ok_or_else(|| {
                    ChurnError::TrainingFailure(format!("label '{}' is not a known class", v))
                })
            })
            .collect()
    }
}
