//! Dummy (one-hot, drop-first) encoding and schema reconciliation

use super::schema::{FeatureSchema, SourceColumn, SourceKind};
use crate::data::{ColumnValues, RawColumn, RawTable};
use crate::error::{ChurnError, Result};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};

/// Order in which categories of a text column are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryOrder {
    /// Lexicographic order of the category strings
    Sorted,
    /// Order of first appearance in the source rows
    FirstSeen,
}

/// Encoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Drop the first category of every text column as the reference level
    pub drop_first: bool,
    pub category_order: CategoryOrder,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            drop_first: true,
            category_order: CategoryOrder::Sorted,
        }
    }
}

impl EncoderConfig {
    pub fn with_drop_first(mut self, drop_first: bool) -> Self {
        self.drop_first = drop_first;
        self
    }

    pub fn with_category_order(mut self, order: CategoryOrder) -> Self {
        self.category_order = order;
        self
    }
}

/// Kind of raw label values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelKind {
    Boolean,
    Numeric,
    Text,
}

/// Label values aligned with the rows of an encoded matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelVector {
    pub name: String,
    pub kind: LabelKind,
    /// Canonical string form of each row's label
    pub values: Vec<String>,
}

impl LabelVector {
    fn from_column(column: &RawColumn) -> Self {
        let kind = match column.values {
            ColumnValues::Boolean(_) => LabelKind::Boolean,
            ColumnValues::Numeric(_) => LabelKind::Numeric,
            ColumnValues::Text(_) => LabelKind::Text,
        };
        let values = (0..column.values.len()).map(|i| column.values.render(i)).collect();
        Self {
            name: column.name.clone(),
            kind,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Encoded matrix with its schema and (optionally) labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedDataset {
    pub x: Array2<f64>,
    pub schema: FeatureSchema,
    pub labels: Option<LabelVector>,
}

impl EncodedDataset {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Project onto `schema`, whose columns must all exist in this dataset
    fn project(&self, schema: FeatureSchema) -> Result<EncodedDataset> {
        let indices: Vec<usize> = schema
            .columns()
            .iter()
            .map(|name| {
                self.schema
                    .columns()
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| ChurnError::MissingFeature(name.clone()))
            })
            .collect::<Result<_>>()?;

        Ok(EncodedDataset {
            x: self.x.select(Axis(1), &indices),
            schema,
            labels: self.labels.clone(),
        })
    }
}

/// Converts raw tables into numeric matrices
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    config: EncoderConfig,
}

impl FeatureEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode a table whose label column must be present
    pub fn encode_labeled(&self, table: &RawTable, label_column: &str) -> Result<EncodedDataset> {
        self.encode(table, Some(label_column))
    }

    /// Encode every column of a table as a feature
    pub fn encode_unlabeled(&self, table: &RawTable) -> Result<EncodedDataset> {
        self.encode(table, None)
    }

    /// Encode a table. When `label_column` is given it is split off as the
    /// label vector and fails with `MissingLabelColumn` if absent.
    pub fn encode(&self, table: &RawTable, label_column: Option<&str>) -> Result<EncodedDataset> {
        let labels = match label_column {
            Some(name) => {
                let column = table
                    .column(name)
                    .ok_or_else(|| ChurnError::MissingLabelColumn(name.to_string()))?;
                Some(LabelVector::from_column(column))
            }
            None => None,
        };

        let mut sources = Vec::new();
        let mut pass_through: Vec<Vec<f64>> = Vec::new();
        let mut indicators: Vec<Vec<f64>> = Vec::new();

        for column in table.columns() {
            if Some(column.name.as_str()) == label_column {
                continue;
            }
            match &column.values {
                ColumnValues::Numeric(values) => {
                    sources.push(SourceColumn { name: column.name.clone(), kind: SourceKind::Numeric });
                    pass_through.push(values.clone());
                }
                ColumnValues::Boolean(values) => {
                    sources.push(SourceColumn { name: column.name.clone(), kind: SourceKind::Boolean });
                    pass_through.push(values.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect());
                }
                ColumnValues::Text(values) => {
                    let mut categories = self.categories(values);
                    let reference = if self.config.drop_first && !categories.is_empty() {
                        Some(categories.remove(0))
                    } else {
                        None
                    };
                    for category in &categories {
                        indicators.push(
                            values
                                .iter()
                                .map(|v| if v == category { 1.0 } else { 0.0 })
                                .collect(),
                        );
                    }
                    sources.push(SourceColumn {
                        name: column.name.clone(),
                        kind: SourceKind::Categorical { reference, categories },
                    });
                }
            }
        }

        pass_through.extend(indicators);
        let schema = FeatureSchema::new(sources)?;
        let n_rows = table.n_rows();
        let x = Array2::from_shape_fn((n_rows, pass_through.len()), |(r, c)| pass_through[c][r]);

        debug!(rows = n_rows, columns = schema.len(), "Encoded table");
        Ok(EncodedDataset { x, schema, labels })
    }

    fn categories(&self, values: &[String]) -> Vec<String> {
        match self.config.category_order {
            CategoryOrder::Sorted => values
                .iter()
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            CategoryOrder::FirstSeen => {
                let mut seen = HashSet::new();
                values
                    .iter()
                    .filter(|v| seen.insert(v.as_str()))
                    .cloned()
                    .collect()
            }
        }
    }

    /// Restrict two independently encoded datasets to the intersection of their
    /// columns, in the training side's order.
    ///
    /// Columns present on only one side are dropped (and logged).
    pub fn reconcile(
        &self,
        train: &EncodedDataset,
        eval: &EncodedDataset,
    ) -> Result<(EncodedDataset, EncodedDataset)> {
        let eval_columns: HashSet<&String> = eval.schema.columns().iter().collect();
        let train_columns: HashSet<&String> = train.schema.columns().iter().collect();

        let keep: HashSet<String> = train
            .schema
            .columns()
            .iter()
            .filter(|c| eval_columns.contains(c))
            .cloned()
            .collect();

        let train_only: Vec<&String> = train.schema.columns().iter().filter(|c| !keep.contains(*c)).collect();
        let eval_only: Vec<&String> = eval
            .schema
            .columns()
            .iter()
            .filter(|c| !train_columns.contains(c))
            .collect();
        if !train_only.is_empty() || !eval_only.is_empty() {
            warn!(
                train_only = ?train_only,
                eval_only = ?eval_only,
                kept = keep.len(),
                "Dropping columns not shared by train and eval encodings"
            );
        }

        let schema = train.schema.restrict(&keep)?;
        Ok((train.project(schema.clone())?, eval.project(schema)?))
    }
}
