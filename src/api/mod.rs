pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::{BackendApi, HttpBackend};
pub use error::ApiError;
pub use mock::{MockBackend, RecordedCall};
pub use types::HealthStatus;
