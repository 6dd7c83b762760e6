//! Feature encoding
//!
//! Converts raw tables into fixed-width numeric matrices:
//! - Numeric columns pass through unchanged
//! - Boolean columns become a single 0/1 column
//! - Text columns become k-1 indicator columns (drop-first dummy encoding)
//!
//! Two independently encoded datasets (train and eval) are reconciled to the
//! intersection of their columns so that they share one [`FeatureSchema`].

mod encoder;
mod schema;

pub use encoder::{
    CategoryOrder, EncodedDataset, EncoderConfig, FeatureEncoder, LabelKind, LabelVector,
};
pub use schema::{FeatureSchema, SourceColumn, SourceKind};
