pub mod retry;

pub use retry::{Admission, AttemptId, AttemptTracker, DeliveryState, RetryConfig};
