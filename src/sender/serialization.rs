use crate::buffer::Batch;
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Batch is empty")]
    EmptyBatch,
}

/// Encodes batches into the ingest body: a JSON array holding one
/// `{ "tags": .., "events": [..] }` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSerializer;

impl BatchSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&self, batch: &Batch) -> Result<Bytes, SerializationError> {
        if batch.is_empty() {
            return Err(SerializationError::EmptyBatch);
        }

        let body = serde_json::to_vec(std::slice::from_ref(batch))?;
        Ok(Bytes::from(body))
    }

    /// Inverse of [`encode`](Self::encode), as an ingest server would read it.
    pub fn decode(&self, body: &[u8]) -> Result<Vec<Batch>, SerializationError> {
        Ok(serde_json::from_slice(body)?)
    }
}
