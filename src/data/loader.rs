//! Dataset loading with incomplete-row removal

use super::source::TableSource;
use super::table::RawTable;
use crate::error::{ChurnError, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Loads train/eval splits from a [`TableSource`] and drops incomplete rows
#[derive(Clone)]
pub struct DatasetLoader {
    source: Arc<dyn TableSource>,
}

impl DatasetLoader {
    pub fn new(source: Arc<dyn TableSource>) -> Self {
        Self { source }
    }

    /// Load a single split. Rows with any missing value are dropped; no imputation.
    pub fn load_split(&self, source_id: &str) -> Result<RawTable> {
        let start = Instant::now();
        let df = self.source.read_table(source_id)?;
        let (table, dropped) = RawTable::from_dataframe(&df)?;

        if dropped > 0 {
            warn!(source = source_id, dropped, "Dropped rows with missing values");
        }

        if table.n_rows() == 0 {
            return Err(ChurnError::EmptyDataset(source_id.to_string()));
        }

        info!(
            source = source_id,
            rows = table.n_rows(),
            columns = table.n_cols(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(table)
    }

    /// Load the training and held-out evaluation splits
    pub fn load_pair(&self, train_id: &str, eval_id: &str) -> Result<(RawTable, RawTable)> {
        let train = self.load_split(train_id)?;
        let eval = self.load_split(eval_id)?;
        Ok((train, eval))
    }
}
