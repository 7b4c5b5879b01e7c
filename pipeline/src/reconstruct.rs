use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ColmapConfig;
use crate::error::ToolError;
use crate::process::{run_command, Invocation};

/// Structure-from-motion step: images in, sparse reconstruction out.
#[async_trait]
pub trait Reconstruct: Send + Sync {
    async fn reconstruct(&self, images: &Path, output: &Path, invocation: &Invocation) -> Result<(), ToolError>;
}

/// Runs `colmap automatic_reconstructor`, which writes `sparse/` into the
/// output directory.
pub struct ColmapReconstructor {
    config: ColmapConfig,
}

impl ColmapReconstructor {
    pub fn new(config: ColmapConfig) -> Self {
        Self { config }
    }

    fn command(&self, images: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("automatic_reconstructor")
            .arg("--image_path")
            .arg(images)
            .arg("--workspace_path")
            .arg(output)
            .arg("--use_gpu")
            .arg(if self.config.use_gpu { "1" } else { "0" });
        cmd
    }
}

#[async_trait]
impl Reconstruct for ColmapReconstructor {
    #[tracing::instrument(skip_all, fields(images = %images.display()))]
    async fn reconstruct(&self, images: &Path, output: &Path, invocation: &Invocation) -> Result<(), ToolError> {
        tracing::info!("Starting COLMAP reconstruction");
        let program = self.config.program.to_string_lossy();
        run_command(self.command(images, output), invocation)
            .await?
            .check(&program)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn builds_gpu_command() {
        let colmap = ColmapReconstructor::new(ColmapConfig::default());
        let cmd = colmap.command(Path::new("job/input"), Path::new("job/colmap"));
        let cmd = cmd.as_std();

        assert_eq!(cmd.get_program(), "colmap");
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(
            args,
            [
                "automatic_reconstructor",
                "--image_path",
                "job/input",
                "--workspace_path",
                "job/colmap",
                "--use_gpu",
                "1",
            ]
        );
    }

    #[test]
    fn gpu_can_be_disabled() {
        let colmap = ColmapReconstructor::new(ColmapConfig {
            use_gpu: false,
            ..Default::default()
        });
        let cmd = colmap.command(Path::new("a"), Path::new("b"));
        assert_eq!(cmd.as_std().get_args().last().unwrap(), "0");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_is_an_error() {
        let colmap = ColmapReconstructor::new(ColmapConfig {
            program: "false".into(),
            use_gpu: true,
        });
        let err = colmap
            .reconstruct(Path::new("a"), Path::new("b"), &Invocation::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed { exit_code: Some(1), .. }));
    }
}
