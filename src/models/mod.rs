pub use backoff::RetryBackoff;
pub use error::Error;
pub use job::JobRecord;
pub use job::JobStatus;
pub use state::AppState;
pub use state::QueueOptions;

pub mod backoff;
mod error;
mod job;
mod state;
