use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dataset::UpAxis;
use pipeline::{
    ColmapConfig, Pipeline, PipelineConfig, ProjectionConfig, TrainerConfig, MAX_BINS,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Build a top-down density map from a folder of photos, or from an already
/// trained point file, without going through the HTTP service.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory of input images. Runs reconstruction and training first.
    #[arg(short, long, required_unless_present = "model", conflicts_with = "model")]
    input: Option<PathBuf>,

    /// Trained point file. Only the projection step runs.
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// PNG file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Directory the job workspace is created in
    #[arg(long, default_value = "workspace")]
    workspace: PathBuf,

    #[arg(long, default_value = "colmap")]
    colmap: PathBuf,

    #[arg(long)]
    no_gpu: bool,

    #[arg(long, default_value = "python")]
    python: PathBuf,

    #[arg(long, default_value = "gaussian-splatting/train.py")]
    train_script: PathBuf,

    #[arg(long, default_value_t = 7000)]
    iterations: u32,

    #[arg(long, default_value_t = 0.2, allow_hyphen_values = true)]
    height_threshold: f32,

    #[arg(long, default_value = "y")]
    up_axis: UpAxis,

    #[arg(
        long,
        default_value_t = 100,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=MAX_BINS as u64)
    )]
    bins: usize,

    /// Kill an external tool after this many seconds
    #[arg(long)]
    tool_timeout_secs: Option<u64>,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workspace_root: self.workspace.clone(),
            static_dir: self.output.parent().map(PathBuf::from).unwrap_or_default(),
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let pipeline = Pipeline::new(args.pipeline_config());

    let map = match (&args.model, &args.input) {
        (Some(model), _) => pipeline
            .project(model, &args.output)
            .await
            .with_context(|| format!("Failed to project {}", model.display()))?,
        (None, Some(input)) => {
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

            let job = pipeline.create_job().await?;
            let count = job.import_dir(input).await?;
            info!(job = %job.id(), "Imported {count} images from {}", input.display());

            pipeline
                .run_to(&job, &args.output, &cancel)
                .await
                .with_context(|| format!("Job {} failed, workspace kept at {}", job.id(), job.dir().display()))?
                .map
        }
        (None, None) => anyhow::bail!("either --input or --model is required"),
    };

    info!(
        "Wrote {}x{} density map of {} points to {}",
        map.width(),
        map.height(),
        map.total(),
        args.output.display()
    );
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Interrupted, stopping external tools");
        cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_a_source() {
        assert!(Args::try_parse_from(["ml-cmd", "--output", "map.png"]).is_err());
        assert!(Args::try_parse_from([
            "ml-cmd", "--input", "imgs", "--model", "m.ply", "--output", "map.png"
        ])
        .is_err());
    }

    #[test]
    fn model_only() {
        let args = Args::try_parse_from(["ml-cmd", "-m", "m.ply", "-o", "out/map.png"]).unwrap();
        let config = args.pipeline_config();
        assert_eq!(config.static_dir, PathBuf::from("out"));
        assert_eq!(config.projection, ProjectionConfig::default());
        assert_eq!(config.trainer, TrainerConfig::default());
    }

    #[test]
    fn rejects_out_of_range_bins() {
        for bins in ["0", "4097"] {
            assert!(Args::try_parse_from(["ml-cmd", "-m", "m.ply", "-o", "map.png", "--bins", bins])
                .is_err());
        }
    }
}
