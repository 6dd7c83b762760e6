//! Tabular data sources

use crate::error::{ChurnError, Result};
use parking_lot::RwLock;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A readable tabular resource addressed by an identifier (path or URI)
pub trait TableSource: Send + Sync {
    /// Read the whole resource as a frame, nulls included
    fn read_table(&self, id: &str) -> Result<DataFrame>;
}

/// CSV files on the local filesystem, resolved against an optional base directory
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    base_dir: Option<PathBuf>,
    infer_schema_length: usize,
}

impl CsvSource {
    pub fn new() -> Self {
        Self {
            base_dir: None,
            infer_schema_length: 1000,
        }
    }

    /// Resolve relative identifiers against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn resolve(&self, id: &str) -> PathBuf {
        let path = Path::new(id);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl TableSource for CsvSource {
    fn read_table(&self, id: &str) -> Result<DataFrame> {
        let path = self.resolve(id);
        if !path.is_file() {
            return Err(ChurnError::data_unavailable(id, "file not found"));
        }

        let separator = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length.max(1)))
            .with_parse_options(CsvParseOptions::default().with_separator(separator))
            .try_into_reader_with_file_path(Some(path))
            .and_then(|reader| reader.finish())
            .map_err(|e| ChurnError::data_unavailable(id, e))
    }
}

/// Frames held in memory, keyed by identifier
#[derive(Default)]
pub struct MemorySource {
    tables: RwLock<HashMap<String, DataFrame>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a frame under `id`
    pub fn insert(&self, id: impl Into<String>, df: DataFrame) {
        self.tables.write().insert(id.into(), df);
    }

    pub fn with_table(self, id: impl Into<String>, df: DataFrame) -> Self {
        self.insert(id, df);
        self
    }
}

impl TableSource for MemorySource {
    fn read_table(&self, id: &str) -> Result<DataFrame> {
        self.tables
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ChurnError::data_unavailable(id, "no such table"))
    }
}
