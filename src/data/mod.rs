//! Dataset loading
//!
//! Reads the training and evaluation splits from a tabular source and removes
//! incomplete rows. Missing values are never imputed.

mod loader;
mod source;
mod table;

pub use loader::DatasetLoader;
pub use source::{CsvSource, MemorySource, TableSource};
pub use table::{ColumnValues, RawColumn, RawTable, RawValue};

pub(crate) use table::parse_bool;
