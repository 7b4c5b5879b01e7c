use pipeline::Pipeline;
use tokio_util::sync::CancellationToken;

pub struct AppState {
    pub pipeline: Pipeline,
    /// Cancelled on shutdown; every job runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(pipeline: Pipeline, shutdown: CancellationToken) -> Self {
        Self { pipeline, shutdown }
    }
}
