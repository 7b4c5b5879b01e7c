use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::TrainerConfig;
use crate::error::ToolError;
use crate::process::{run_command, Invocation};

const MODEL_FILE: &str = "point_cloud.ply";

/// Splat training step: sparse reconstruction in, point model out.
#[async_trait]
pub trait Train: Send + Sync {
    async fn train(&self, source: &Path, model_dir: &Path, invocation: &Invocation) -> Result<(), ToolError>;
}

/// Runs the gaussian splatting training script for a fixed iteration count.
pub struct GaussianTrainer {
    config: TrainerConfig,
}

impl GaussianTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    fn command(&self, source: &Path, model_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.config.python);
        cmd.arg(&self.config.script)
            .arg("-s")
            .arg(source)
            .arg("-m")
            .arg(model_dir)
            .arg("--iterations")
            .arg(self.config.iterations.to_string());
        cmd
    }
}

#[async_trait]
impl Train for GaussianTrainer {
    #[tracing::instrument(skip_all, fields(iterations = self.config.iterations))]
    async fn train(&self, source: &Path, model_dir: &Path, invocation: &Invocation) -> Result<(), ToolError> {
        tracing::info!("Starting splat training");
        let program = self.config.python.to_string_lossy();
        run_command(self.command(source, model_dir), invocation)
            .await?
            .check(&program)?;
        Ok(())
    }
}

/// Find the trained point file in `model_dir`.
///
/// A `point_cloud.ply` at the top level wins; otherwise the trainer's own
/// layout `point_cloud/iteration_<n>/point_cloud.ply` for the final
/// iteration is used.
pub fn locate_model(model_dir: &Path, iterations: u32) -> Option<PathBuf> {
    let flat = model_dir.join(MODEL_FILE);
    if flat.is_file() {
        return Some(flat);
    }
    let nested = model_dir
        .join("point_cloud")
        .join(format!("iteration_{iterations}"))
        .join(MODEL_FILE);
    nested.is_file().then_some(nested)
}
