//! Text-blob encoding for structured columns.
//!
//! Some record fields hold structured data (lists, maps, nested structs)
//! that the row model stores in a single text column. A [`BlobCodec`] turns
//! such a field into its stored text form and back; records apply it in
//! their `encode_blobs`/`decode_blobs` hooks so the engine never needs to
//! know which fields are blobs.

use crate::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encodes and decodes structured values to and from text columns.
pub trait BlobCodec: Send + Sync {
    /// Serialize a value into its text-column form.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String>;

    /// Deserialize a value from its text-column form.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T>;
}

/// The default codec: JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BlobCodec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        Ok(serde_json::from_str(text)?)
    }
}
