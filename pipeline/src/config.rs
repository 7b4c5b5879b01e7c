use std::path::PathBuf;
use std::time::Duration;

use density::ProjectionConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding one subdirectory per job.
    pub workspace_root: PathBuf,

    /// Directory density images are written to, served under `/static`.
    pub static_dir: PathBuf,

    pub colmap: ColmapConfig,

    pub trainer: TrainerConfig,

    pub projection: ProjectionConfig,

    /// Kill an external tool after this many seconds. No limit by default.
    pub tool_timeout_secs: Option<u64>,
}

impl PipelineConfig {
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("workspace"),
            static_dir: PathBuf::from("static"),
            colmap: ColmapConfig::default(),
            trainer: TrainerConfig::default(),
            projection: ProjectionConfig::default(),
            tool_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColmapConfig {
    /// COLMAP executable.
    pub program: PathBuf,

    /// Pass `--use_gpu 1` to the reconstructor.
    pub use_gpu: bool,
}

impl Default for ColmapConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("colmap"),
            use_gpu: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    /// Interpreter the training script runs under.
    pub python: PathBuf,

    /// Gaussian splatting training entry point.
    pub script: PathBuf,

    /// Total number of optimization iterations. Fixed for every job.
    pub iterations: u32,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python"),
            script: PathBuf::from("gaussian-splatting/train.py"),
            iterations: 7000,
        }
    }
}
