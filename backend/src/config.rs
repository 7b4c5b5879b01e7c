use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use dataset::UpAxis;
use pipeline::{ColmapConfig, PipelineConfig, ProjectionConfig, TrainerConfig, MAX_BINS};

/// HTTP service turning uploaded photos into a top-down density map.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Address to listen on.
    #[arg(long, env = "HEATMAP_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Directory holding one subdirectory per job.
    #[arg(long, env = "HEATMAP_WORKSPACE", default_value = "workspace")]
    pub workspace: PathBuf,

    /// Directory density images are written to and served from.
    #[arg(long, env = "HEATMAP_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// COLMAP executable.
    #[arg(long, env = "HEATMAP_COLMAP", default_value = "colmap")]
    pub colmap: PathBuf,

    /// Run COLMAP without GPU acceleration.
    #[arg(long, env = "HEATMAP_NO_GPU")]
    pub no_gpu: bool,

    /// Python interpreter for the training script.
    #[arg(long, env = "HEATMAP_PYTHON", default_value = "python")]
    pub python: PathBuf,

    /// Gaussian splatting training script.
    #[arg(long, env = "HEATMAP_TRAIN_SCRIPT", default_value = "gaussian-splatting/train.py")]
    pub train_script: PathBuf,

    /// Training iterations, the same for every job.
    #[arg(long, env = "HEATMAP_ITERATIONS", default_value_t = 7000)]
    pub iterations: u32,

    /// Points at or above this height are left out of the map.
    #[arg(long, env = "HEATMAP_HEIGHT_THRESHOLD", default_value_t = 0.2, allow_hyphen_values = true)]
    pub height_threshold: f32,

    /// Vertical axis of the reconstruction (y or z).
    #[arg(long, env = "HEATMAP_UP_AXIS", default_value = "y")]
    pub up_axis: UpAxis,

    /// Bins along each side of the map.
    #[arg(
        long,
        env = "HEATMAP_BINS",
        default_value_t = 100,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=MAX_BINS as u64)
    )]
    pub bins: usize,

    /// Kill an external tool after this many seconds.
    #[arg(long, env = "HEATMAP_TOOL_TIMEOUT_SECS")]
    pub tool_timeout_secs: Option<u64>,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "HEATMAP_MAX_UPLOAD_BYTES", default_value_t = 1 << 30)]
    pub max_upload_bytes: usize,
}

impl Args {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workspace_root: self.workspace.clone(),
            static_dir: self.static_dir.clone(),
            colmap: ColmapConfig {
                program: self.colmap.clone(),
                use_gpu: !self.no_gpu,
            },
            trainer: TrainerConfig {
                python: self.python.clone(),
                script: self.train_script.clone(),
                iterations: self.iterations,
            },
            projection: ProjectionConfig {
                height_threshold: self.height_threshold,
                up_axis: self.up_axis,
                bins: self.bins,
            },
            tool_timeout_secs: self.tool_timeout_secs,
        }
    }
}
