mod process;

pub use process::{ErrorResponse, HealthResponse, ProcessResponse, ProcessStatus};
