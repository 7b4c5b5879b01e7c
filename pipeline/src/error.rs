use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use dataset::DatasetError;
use density::DensityError;
use thiserror::Error;

use crate::workspace::JobId;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Broad classification of a failed job, used for logging and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Upload,
    Workspace,
    Tool,
    Timeout,
    Cancelled,
    Model,
    Degenerate,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Upload => "upload",
            ErrorKind::Workspace => "workspace",
            ErrorKind::Tool => "tool",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Model => "model",
            ErrorKind::Degenerate => "degenerate",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No files uploaded")]
    NoFiles,

    #[error("Uploaded file has no name")]
    MissingFilename,

    #[error("Unsafe file name '{0}'")]
    UnsafeFilename(String),

    #[error("File '{0}' uploaded more than once")]
    DuplicateFilename(String),
}

/// Failure of one external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {}", exit_label(*.exit_code), tail(.stderr))]
    Failed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {limit:?}")]
    TimedOut { program: String, limit: Duration },

    #[error("{program} was cancelled")]
    Cancelled { program: String },

    #[error("IO error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::TimedOut { .. } => ErrorKind::Timeout,
            ToolError::Cancelled { .. } => ErrorKind::Cancelled,
            _ => ErrorKind::Tool,
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Last few lines of tool output, enough to identify the failure.
fn tail(text: &str) -> String {
    const LINES: usize = 5;
    let lines: Vec<&str> = text.trim_end().lines().collect();
    lines[lines.len().saturating_sub(LINES)..].join("\n")
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),

    #[error("Workspace IO error at {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job directory for {0} already exists")]
    JobCollision(JobId),

    #[error("Reconstruction failed: {0}")]
    Reconstruction(#[source] ToolError),

    #[error("Training failed: {0}")]
    Training(#[source] ToolError),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Trained model not found in {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to read trained model: {0}")]
    Model(#[source] DatasetError),

    #[error("Trained model is degenerate: {0}")]
    Degenerate(#[source] DatasetError),

    #[error("Failed to build density image: {0}")]
    Density(#[from] DensityError),

    #[error("Projection task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl PipelineError {
    pub(crate) fn workspace(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PipelineError::Workspace { path, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Upload(_) => ErrorKind::Upload,
            PipelineError::Workspace { .. } | PipelineError::JobCollision(_) => ErrorKind::Workspace,
            PipelineError::Reconstruction(e) | PipelineError::Training(e) => e.kind(),
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::ModelNotFound(_) | PipelineError::Model(_) => ErrorKind::Model,
            PipelineError::Degenerate(_) => ErrorKind::Degenerate,
            PipelineError::Density(DensityError::Image(_)) => ErrorKind::Workspace,
            PipelineError::Density(_) | PipelineError::Join(_) => ErrorKind::Internal,
        }
    }
}

impl From<DatasetError> for PipelineError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Empty => PipelineError::Degenerate(err),
            err => PipelineError::Model(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_tool_message_keeps_stderr_tail() {
        let stderr = (1..=8).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let err = ToolError::Failed {
            program: "colmap".into(),
            exit_code: Some(2),
            stderr,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("colmap exited with status 2"));
        assert!(msg.contains("line 8"));
        assert!(msg.contains("line 4"));
        assert!(!msg.contains("line 3"));
    }

    #[test]
    fn kinds() {
        let timeout = ToolError::TimedOut {
            program: "python".into(),
            limit: Duration::from_secs(1),
        };
        assert_eq!(PipelineError::Training(timeout).kind(), ErrorKind::Timeout);
        assert_eq!(PipelineError::from(DatasetError::Empty).kind(), ErrorKind::Degenerate);
        assert_eq!(PipelineError::from(UploadError::NoFiles).kind(), ErrorKind::Upload);
        assert_eq!(ErrorKind::Degenerate.to_string(), "degenerate");
    }
}
