pub mod client;
pub mod serialization;
pub mod stats;

pub use client::{
    ClientConfig, ClientError, HttpTransport, IngestRequest, Transport, TransportError,
};
pub use serialization::{BatchSerializer, SerializationError};
pub use stats::{DeliveryStats, DeliveryStatsSnapshot};
