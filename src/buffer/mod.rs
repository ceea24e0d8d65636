pub mod batch;
pub mod pending;

pub use batch::{Batch, Tags};
pub use pending::Buffer;
