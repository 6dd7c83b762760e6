//! Versioned artifact envelope
//!
//! Layout: 8 magic bytes, then a bincode-encoded `{format, format_version, payload}`.

use crate::error::{ChurnError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const MAGIC: &[u8; 8] = b"CHURNMDL";
pub const FORMAT_VERSION: u32 = 1;

pub const MODEL_FORMAT: &str = "churn-model";
pub const PREPARED_FORMAT: &str = "churn-prepared";

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: &'a str,
    format_version: u32,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Header {
    format: String,
    format_version: u32,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    format: String,
    #[allow(dead_code)]
    format_version: u32,
    payload: T,
}

pub fn encode<T: Serialize>(format: &str, payload: &T) -> Result<Vec<u8>> {
    let envelope = EnvelopeRef {
        format,
        format_version: FORMAT_VERSION,
        payload,
    };
    let mut bytes = MAGIC.to_vec();
    bytes.extend(bincode::serialize(&envelope)?);
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(format: &str, bytes: &[u8]) -> Result<T> {
    let body = bytes
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| ChurnError::CorruptArtifact("missing artifact header".to_string()))?;

    let header: Header = bincode::deserialize(body)?;
    if header.format != format {
        return Err(ChurnError::CorruptArtifact(format!(
            "expected format '{}', found '{}'",
            format, header.format
        )));
    }
    if header.format_version != FORMAT_VERSION {
        return Err(ChurnError::CorruptArtifact(format!(
            "unsupported format version {} (expected {})",
            header.format_version, FORMAT_VERSION
        )));
    }

    let envelope: Envelope<T> = bincode::deserialize(body)?;
    Ok(envelope.payload)
}
