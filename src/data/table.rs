//! In-memory raw tables
//!
//! A [`RawTable`] is the loaded, cleaned form of a tabular source: ordered,
//! typed columns with no missing values. It is immutable once built.

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Values of a single raw column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Boolean(Vec<bool>),
    Text(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical string form of the value at `row`
    pub fn render(&self, row: usize) -> String {
        match self {
            ColumnValues::Numeric(v) => format_number(v[row]),
            ColumnValues::Boolean(v) => v[row].to_string(),
            ColumnValues::Text(v) => v[row].clone(),
        }
    }
}

/// A named raw column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl RawColumn {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self { name: name.into(), values: ColumnValues::Numeric(values) }
    }

    pub fn boolean(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self { name: name.into(), values: ColumnValues::Boolean(values) }
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Text(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// A single raw scalar, as supplied by a caller for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Canonical string form, matching [`ColumnValues::render`]
    pub fn render(&self) -> String {
        match self {
            RawValue::Bool(b) => b.to_string(),
            RawValue::Number(n) => format_number(*n),
            RawValue::Text(s) => s.clone(),
        }
    }
}

/// Ordered collection of complete raw columns of equal length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<RawColumn>,
    n_rows: usize,
}

impl RawTable {
    /// Build a table, checking that all columns have the same length
    pub fn new(columns: Vec<RawColumn>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != n_rows) {
            return Err(ChurnError::data_unavailable(
                bad.name.clone(),
                format!("column has {} rows, expected {}", bad.values.len(), n_rows),
            ));
        }
        Ok(Self { columns, n_rows })
    }

    /// Convert a polars frame, dropping every row with a null (or NaN) in any column.
    ///
    /// Returns the table and the number of dropped rows.
    pub fn from_dataframe(df: &DataFrame) -> Result<(Self, usize)> {
        let partial: Vec<PartialColumn> = df
            .get_columns()
            .iter()
            .map(|col| PartialColumn::from_series(col.name().as_str(), col.as_materialized_series()))
            .collect::<Result<_>>()?;

        let n_input = df.height();
        let keep: Vec<bool> = (0..n_input)
            .map(|row| partial.iter().all(|c| c.is_present(row)))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();

        let columns = partial.into_iter().map(|c| c.finish(&keep)).collect();
        Ok((Self::new(columns)?, dropped))
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Column values read from polars before row filtering
enum PartialColumn {
    Numeric(String, Vec<Option<f64>>),
    Boolean(String, Vec<Option<bool>>),
    Text(String, Vec<Option<String>>),
}

impl PartialColumn {
    fn from_series(name: &str, series: &Series) -> Result<Self> {
        let name = name.to_string();
        let dtype = series.dtype();

        if dtype == &DataType::Boolean {
            let values = series.bool()?.into_iter().collect();
            return Ok(PartialColumn::Boolean(name, values));
        }

        if dtype.is_integer() || dtype.is_float() {
            let cast = series.cast(&DataType::Float64)?;
            let values = cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();
            return Ok(PartialColumn::Numeric(name, values));
        }

        let cast = series.cast(&DataType::String)?;
        let values: Vec<Option<String>> = cast
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect();

        // CSV readers leave "True"/"False" as text; treat an all-boolean column as boolean
        if let Some(flags) = parse_boolean_column(&values) {
            return Ok(PartialColumn::Boolean(name, flags));
        }

        Ok(PartialColumn::Text(name, values))
    }

    fn is_present(&self, row: usize) -> bool {
        match self {
            PartialColumn::Numeric(_, v) => v[row].is_some(),
            PartialColumn::Boolean(_, v) => v[row].is_some(),
            PartialColumn::Text(_, v) => v[row].is_some(),
        }
    }

    fn finish(self, keep: &[bool]) -> RawColumn {
        fn retain<T>(values: Vec<Option<T>>, keep: &[bool]) -> Vec<T> {
            values
                .into_iter()
                .zip(keep)
                .filter_map(|(v, &k)| if k { v } else { None })
                .collect()
        }

        match self {
            PartialColumn::Numeric(name, v) => RawColumn::numeric(name, retain(v, keep)),
            PartialColumn::Boolean(name, v) => RawColumn::boolean(name, retain(v, keep)),
            PartialColumn::Text(name, v) => RawColumn::text(name, retain(v, keep)),
        }
    }
}

fn parse_boolean_column(values: &[Option<String>]) -> Option<Vec<Option<bool>>> {
    let mut seen_any = false;
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value.as_deref() {
            None => out.push(None),
            Some(s) => {
                let flag = parse_bool(s)?;
                seen_any = true;
                out.push(Some(flag));
            }
        }
    }
    seen_any.then_some(out)
}

/// Parse "true"/"false" in any letter case
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Render integral floats without a fractional part so "1" and 1.0 agree
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dataframe_drops_incomplete_rows() {
        let df = df!(
            "minutes" => &[Some(10.0), None, Some(30.0), Some(f64::NAN)],
            "plan" => &[Some("yes"), Some("no"), None, Some("no")],
            "calls" => &[1i64, 2, 3, 4]
        )
        .unwrap();

        let (table, dropped) = RawTable::from_dataframe(&df).unwrap();
        assert_eq!(dropped, 3);
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.column_names(), vec!["minutes", "plan", "calls"]);
        assert_eq!(table.column("calls").unwrap().values, ColumnValues::Numeric(vec![1.0]));
    }

    #[test]
    fn test_boolean_text_is_normalized() {
        let df = df!("Churn" => &["False", "True", "false"]).unwrap();
        let (table, _) = RawTable::from_dataframe(&df).unwrap();
        assert_eq!(
            table.column("Churn").unwrap().values,
            ColumnValues::Boolean(vec![false, true, false])
        );
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = RawTable::new(vec![
            RawColumn::numeric("a", vec![1.0, 2.0]),
            RawColumn::numeric("b", vec![1.0]),
        ]);
        assert!(matches!(result, Err(ChurnError::DataUnavailable { .. })));
    }

    #[test]
    fn test_render_matches_raw_value() {
        let col = ColumnValues::Numeric(vec![415.0, 2.5]);
        assert_eq!(col.render(0), RawValue::Number(415.0).render());
        assert_eq!(col.render(1), "2.5");
        assert_eq!(RawValue::Bool(true).render(), "true");
    }
}
