#![allow(dead_code)]

use humio_shipper::Config;
use humio_shipper::app::FlushMode;
use humio_shipper::buffer::Batch;
use humio_shipper::sender::BatchSerializer;
use wiremock::MockServer;
use wiremock::matchers::{method, path};

pub const TOKEN: &str = "test-ingest-token";
pub const DATASPACE: &str = "sandbox";
pub const INGEST_PATH: &str = "/api/v1/dataspaces/sandbox/ingest";

/// Config pointing at `server`, flushed only on demand, with fast retries.
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::new(TOKEN, DATASPACE);
    config.base_url = server.uri();
    config.flush_mode = FlushMode::Threshold;
    config.bulk_size = 1_000;
    config.retry_delay_ms = 20;
    config.request_timeout_ms = 2_000;
    config.logger_id = Some("integration-logger".to_string());
    config
}

pub fn ingest_post() -> wiremock::MockBuilder {
    wiremock::Mock::given(method("POST")).and(path(INGEST_PATH))
}

/// Every batch posted to `server`, in arrival order.
pub async fn received_batches(server: &MockServer) -> Vec<Batch> {
    let serializer = BatchSerializer::new();
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .iter()
        .flat_map(|request| serializer.decode(&request.body).expect("valid ingest body"))
        .collect()
}
