//! Helpers shared by the crate's unit tests.

use crate::buffer::Batch;
use crate::sender::{BatchSerializer, IngestRequest, Transport, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// In-memory transport that records every request and answers from a script.
/// Once the script runs out every delivery succeeds.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    requests: Arc<Mutex<Vec<IngestRequest>>>,
    outcomes: Arc<Mutex<VecDeque<Result<(), TransportError>>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_outcomes(outcomes: Vec<Result<(), TransportError>>) -> Self {
        let transport = Self::new();
        transport.outcomes.lock().extend(outcomes);
        transport
    }

    pub(crate) fn requests(&self) -> Vec<IngestRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every recorded body decoded back into batches, in send order.
    pub(crate) fn decoded_batches(&self) -> Vec<Batch> {
        let serializer = BatchSerializer::new();
        self.requests()
            .iter()
            .flat_map(|request| serializer.decode(&request.body).unwrap())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn deliver(&self, request: IngestRequest) -> Result<(), TransportError> {
        self.requests.lock().push(request);
        self.outcomes.lock().pop_front().unwrap_or(Ok(()))
    }
}
