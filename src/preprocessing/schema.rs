//! Feature schema: the ordered encoded columns plus the plan that produced them

use crate::data::{parse_bool, RawValue};
use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// How one raw column maps onto encoded columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Passed through as a single f64 column
    Numeric,
    /// Single 0/1 column
    Boolean,
    /// One indicator column per kept category. `reference` is the dropped
    /// category, encoded as all zeros.
    Categorical {
        reference: Option<String>,
        categories: Vec<String>,
    },
}

/// A raw column and its encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceColumn {
    pub name: String,
    pub kind: SourceKind,
}

/// Ordered encoded column names and the encoding plan behind them.
///
/// Pass-through columns (numeric and boolean) come first in source order,
/// followed by indicator columns grouped by source column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    sources: Vec<SourceColumn>,
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema from its encoding plan. Fails when two sources encode to
    /// the same column name, e.g. a numeric `State_OH` next to `State` = `OH`.
    pub fn new(sources: Vec<SourceColumn>) -> Result<Self> {
        let columns = derive_columns(&sources);
        if let Some(name) = first_duplicate(&columns) {
            return Err(ChurnError::DuplicateColumn(name));
        }
        Ok(Self { sources, columns })
    }

    /// Indicator column name for a category
    pub fn indicator_name(source: &str, category: &str) -> String {
        format!("{}_{}", source, category)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn sources(&self) -> &[SourceColumn] {
        &self.sources
    }

    /// Keep only the columns named in `keep`, preserving this schema's order
    pub fn restrict(&self, keep: &HashSet<String>) -> Result<FeatureSchema> {
        let sources = self
            .sources
            .iter()
            .filter_map(|source| match &source.kind {
                SourceKind::Numeric | SourceKind::Boolean => {
                    keep.contains(&source.name).then(|| source.clone())
                }
                SourceKind::Categorical { reference, categories } => {
                    let kept: Vec<String> = categories
                        .iter()
                        .filter(|c| keep.contains(&Self::indicator_name(&source.name, c)))
                        .cloned()
                        .collect();
                    // The source stays known even when all of its indicators were
                    // dropped, so that records carrying it are still validated
                    Some(SourceColumn {
                        name: source.name.clone(),
                        kind: SourceKind::Categorical {
                            reference: reference.clone(),
                            categories: kept,
                        },
                    })
                }
            })
            .collect();
        FeatureSchema::new(sources)
    }

    /// Check that `other` has exactly this schema's columns, in order
    pub fn ensure_compatible(&self, other: &FeatureSchema) -> Result<()> {
        self.ensure_columns(other.columns())
    }

    /// Check a column list against this schema: count first, then names by position
    pub fn ensure_columns(&self, columns: &[String]) -> Result<()> {
        if columns.len() != self.len() {
            return Err(ChurnError::SchemaMismatch {
                expected: self.len(),
                actual: columns.len(),
            });
        }
        for (index, (expected, actual)) in self.columns.iter().zip(columns).enumerate() {
            if expected != actual {
                return Err(ChurnError::ColumnMismatch {
                    index,
                    expected: expected.clone(),
                    actual: actual.clone(),
                });
            }
        }
        Ok(())
    }

    /// Column ranges of each categorical indicator group
    pub fn indicator_groups(&self) -> Vec<(&SourceColumn, Range<usize>)> {
        let mut offset = self
            .sources
            .iter()
            .filter(|s| !matches!(s.kind, SourceKind::Categorical { .. }))
            .count();

        let mut groups = Vec::new();
        for source in &self.sources {
            if let SourceKind::Categorical { categories, .. } = &source.kind {
                groups.push((source, offset..offset + categories.len()));
                offset += categories.len();
            }
        }
        groups
    }

    /// Validate a positional feature vector against this schema.
    ///
    /// The vector must have the schema's width, contain only finite values,
    /// use 0/1 for boolean and indicator columns, and set at most one
    /// indicator per categorical group (exactly one when no reference
    /// category was dropped).
    pub fn validate_vector(&self, features: &[f64]) -> Result<()> {
        if features.is_empty() || features.len() != self.len() {
            return Err(ChurnError::FeatureCountMismatch {
                expected: self.len(),
                actual: features.len(),
            });
        }

        if let Some((i, v)) = features.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ChurnError::InvalidFeatureValue {
                feature: self.columns[i].clone(),
                reason: format!("non-finite value {}", v),
            });
        }

        let pass_through = self
            .sources
            .iter()
            .filter(|s| !matches!(s.kind, SourceKind::Categorical { .. }));
        for (i, source) in pass_through.enumerate() {
            if source.kind == SourceKind::Boolean && !is_flag(features[i]) {
                return Err(ChurnError::InvalidFeatureValue {
                    feature: source.name.clone(),
                    reason: format!("boolean column must be 0 or 1, got {}", features[i]),
                });
            }
        }

        for (source, range) in self.indicator_groups() {
            let values = &features[range.clone()];
            if let Some(v) = values.iter().find(|v| !is_flag(**v)) {
                return Err(ChurnError::InvalidFeatureValue {
                    feature: source.name.clone(),
                    reason: format!("indicator must be 0 or 1, got {}", v),
                });
            }
            let set = values.iter().filter(|v| **v == 1.0).count();
            let has_reference = matches!(
                &source.kind,
                SourceKind::Categorical { reference: Some(_), .. }
            );
            if set > 1 || (set == 0 && !has_reference && !range.is_empty()) {
                return Err(ChurnError::InvalidFeatureValue {
                    feature: source.name.clone(),
                    reason: format!("{} indicators set in one categorical group", set),
                });
            }
        }

        Ok(())
    }

    /// Encode a named raw record into a positional vector.
    ///
    /// Every source column must be present. Categories without an indicator
    /// column (and which are not the reference category) are rejected rather
    /// than encoded as zeros.
    pub fn encode_record(&self, fields: &HashMap<String, RawValue>) -> Result<Vec<f64>> {
        let mut pass_through = Vec::new();
        let mut indicators = Vec::new();

        for source in &self.sources {
            let value = fields
                .get(&source.name)
                .ok_or_else(|| ChurnError::MissingFeature(source.name.clone()))?;

            match &source.kind {
                SourceKind::Numeric => pass_through.push(numeric_value(&source.name, value)?),
                SourceKind::Boolean => {
                    pass_through.push(if boolean_value(&source.name, value)? { 1.0 } else { 0.0 })
                }
                SourceKind::Categorical { reference, categories } => {
                    let category = value.render();
                    let mut group = vec![0.0; categories.len()];
                    if let Some(pos) = categories.iter().position(|c| *c == category) {
                        group[pos] = 1.0;
                    } else if reference.as_deref() != Some(category.as_str()) {
                        return Err(ChurnError::UnseenCategory {
                            feature: source.name.clone(),
                            category,
                        });
                    }
                    indicators.extend(group);
                }
            }
        }

        pass_through.extend(indicators);
        Ok(pass_through)
    }
}

fn derive_columns(sources: &[SourceColumn]) -> Vec<String> {
    let mut columns: Vec<String> = sources
        .iter()
        .filter(|s| !matches!(s.kind, SourceKind::Categorical { .. }))
        .map(|s| s.name.clone())
        .collect();

    for source in sources {
        if let SourceKind::Categorical { categories, .. } = &source.kind {
            columns.extend(
                categories
                    .iter()
                    .map(|c| FeatureSchema::indicator_name(&source.name, c)),
            );
        }
    }
    columns
}

fn first_duplicate(columns: &[String]) -> Option<String> {
    let mut seen = HashSet::new();
    columns.iter().find(|c| !seen.insert(c.as_str())).cloned()
}

fn is_flag(v: f64) -> bool {
    v == 0.0 || v == 1.0
}

fn numeric_value(feature: &str, value: &RawValue) -> Result<f64> {
    let parsed = match value {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(s) => s.trim().parse::<f64>().ok(),
        RawValue::Bool(_) => None,
    };
    match parsed {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ChurnError::InvalidFeatureValue {
            feature: feature.to_string(),
            reason: format!("expected a number, got '{}'", value.render()),
        }),
    }
}

fn boolean_value(feature: &str, value: &RawValue) -> Result<bool> {
    let parsed = match value {
        RawValue::Bool(b) => Some(*b),
        RawValue::Number(n) if *n == 0.0 || *n == 1.0 => Some(*n == 1.0),
        RawValue::Text(s) => parse_bool(s.trim()),
        RawValue::Number(_) => None,
    };
    parsed.ok_or_else(|| ChurnError::InvalidFeatureValue {
        feature: feature.to_string(),
        reason: format!("expected a boolean, got '{}'", value.render()),
    })
}
