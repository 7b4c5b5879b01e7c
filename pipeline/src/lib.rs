//! Image set to density map processing.
//!
//! A job runs three steps in order: COLMAP reconstruction, gaussian splat
//! training and top-down projection of the trained points. The first two
//! are external tools behind the [`Reconstruct`] and [`Train`] traits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use density::DensityMap;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod config;
mod error;
mod process;
mod reconstruct;
mod stage;
mod train;
mod workspace;

pub use config::{ColmapConfig, PipelineConfig, TrainerConfig};
pub use density::{ProjectionConfig, MAX_BINS};
pub use error::{ErrorKind, PipelineError, Result, ToolError, UploadError};
pub use process::{run_command, Invocation, ProcessOutput};
pub use reconstruct::{ColmapReconstructor, Reconstruct};
pub use stage::JobStage;
pub use train::{locate_model, GaussianTrainer, Train};
pub use workspace::{sanitize_filename, JobId, JobWorkspace};

/// Result of a successful job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub job_id: JobId,
    pub image: PathBuf,
    pub map: DensityMap,
}

#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    reconstructor: Arc<dyn Reconstruct>,
    trainer: Arc<dyn Train>,
}

impl Pipeline {
    /// Pipeline backed by COLMAP and the gaussian splatting trainer.
    pub fn new(config: PipelineConfig) -> Self {
        let reconstructor = Arc::new(ColmapReconstructor::new(config.colmap.clone()));
        let trainer = Arc::new(GaussianTrainer::new(config.trainer.clone()));
        Self::with_tools(config, reconstructor, trainer)
    }

    pub fn with_tools(
        config: PipelineConfig,
        reconstructor: Arc<dyn Reconstruct>,
        trainer: Arc<dyn Train>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            reconstructor,
            trainer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Allocate a new job under the configured workspace root.
    pub async fn create_job(&self) -> Result<JobWorkspace> {
        let job = JobWorkspace::create(&self.config.workspace_root).await?;
        info!(job = %job.id(), stage = %JobStage::WorkspaceCreated);
        Ok(job)
    }

    /// Where the density image of `id` is written.
    pub fn image_path(&self, id: JobId) -> PathBuf {
        self.config.static_dir.join(format!("{id}.png"))
    }

    /// Process `job` and write its image into the static directory.
    pub async fn run(&self, job: &JobWorkspace, cancel: &CancellationToken) -> Result<JobOutput> {
        let output = self.image_path(job.id());
        self.run_to(job, &output, cancel).await
    }

    /// Process `job` and write its image to `output`.
    #[tracing::instrument(skip_all, fields(job = %job.id()))]
    pub async fn run_to(&self, job: &JobWorkspace, output: &Path, cancel: &CancellationToken) -> Result<JobOutput> {
        if job.input_count().await? == 0 {
            return Err(UploadError::NoFiles.into());
        }
        let invocation = Invocation::new(cancel.clone(), self.config.tool_timeout());

        self.reconstructor
            .reconstruct(&job.input_dir(), &job.colmap_dir(), &invocation)
            .await
            .map_err(PipelineError::Reconstruction)?;
        info!(stage = %JobStage::ReconstructionDone);

        self.trainer
            .train(&job.sparse_dir(), &job.gaussian_dir(), &invocation)
            .await
            .map_err(PipelineError::Training)?;
        info!(stage = %JobStage::TrainingDone);

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let model = locate_model(&job.gaussian_dir(), self.config.trainer.iterations)
            .ok_or_else(|| PipelineError::ModelNotFound(job.gaussian_dir()))?;

        let map = self.project(&model, output).await?;
        Ok(JobOutput {
            job_id: job.id(),
            image: output.to_owned(),
            map,
        })
    }

    /// Build the density map of the model at `model` and write it to `output`.
    pub async fn project(&self, model: &Path, output: &Path) -> Result<DensityMap> {
        let projection = self.config.projection.clone();
        let model = model.to_owned();
        let output = output.to_owned();
        let span = tracing::Span::current();

        tokio::task::spawn_blocking(move || -> Result<DensityMap> {
            let _guard = span.enter();
            let cloud = dataset::load_point_cloud(&model)?;
            let map = density::project(&cloud, &projection)?;
            info!(stage = %JobStage::ProjectionDone, binned = map.total());

            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent).map_err(PipelineError::workspace(parent))?;
            }
            density::save_png(&map, &output)?;
            info!(stage = %JobStage::ImageWritten, image = %output.display());
            Ok(map)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MODEL: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
property float opacity
end_header
0 0 0 1
1 0.1 1 1
0.5 -2 0.5 1
9 4 9 1
";

    #[derive(Default)]
    struct FakeColmap {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Reconstruct for FakeColmap {
        async fn reconstruct(&self, images: &Path, output: &Path, _: &Invocation) -> std::result::Result<(), ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(images.ends_with("input"));
            if self.fail {
                return Err(ToolError::Failed {
                    program: "colmap".into(),
                    exit_code: Some(1),
                    stderr: "no images registered".into(),
                });
            }
            std::fs::create_dir_all(output.join("sparse/0")).unwrap();
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTrainer {
        model: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Train for FakeTrainer {
        async fn train(&self, source: &Path, model_dir: &Path, _: &Invocation) -> std::result::Result<(), ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(source.is_dir(), "training started without a reconstruction");
            if let Some(model) = self.model {
                std::fs::write(model_dir.join("point_cloud.ply"), model).unwrap();
            }
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        pipeline: Pipeline,
        colmap: Arc<FakeColmap>,
        trainer: Arc<FakeTrainer>,
    }

    fn fixture(colmap: FakeColmap, trainer: FakeTrainer) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            workspace_root: dir.path().join("workspace"),
            static_dir: dir.path().join("static"),
            ..Default::default()
        };
        let colmap = Arc::new(colmap);
        let trainer = Arc::new(trainer);
        let pipeline = Pipeline::with_tools(config, colmap.clone(), trainer.clone());
        Fixture {
            _dir: dir,
            pipeline,
            colmap,
            trainer,
        }
    }

    #[tokio::test]
    async fn full_run_writes_one_image() {
        let f = fixture(
            FakeColmap::default(),
            FakeTrainer {
                model: Some(MODEL),
                ..Default::default()
            },
        );
        let job = f.pipeline.create_job().await.unwrap();
        job.save_input("a.jpg", b"jpeg").await.unwrap();

        let out = f.pipeline.run(&job, &CancellationToken::new()).await.unwrap();

        assert_eq!(out.job_id, job.id());
        assert_eq!(out.image, f.pipeline.image_path(job.id()));
        assert!(out.image.is_file());
        assert_eq!(std::fs::read_dir(&f.pipeline.config().static_dir).unwrap().count(), 1);
        assert_eq!((out.map.width(), out.map.height()), (100, 100));
        assert_eq!(out.map.total(), 3);
    }

    #[tokio::test]
    async fn empty_input_never_reaches_tools() {
        let f = fixture(FakeColmap::default(), FakeTrainer::default());
        let job = f.pipeline.create_job().await.unwrap();

        let err = f.pipeline.run(&job, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Upload(UploadError::NoFiles)));
        assert_eq!(f.colmap.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.trainer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reconstruction_failure_skips_training() {
        let f = fixture(
            FakeColmap {
                fail: true,
                ..Default::default()
            },
            FakeTrainer::default(),
        );
        let job = f.pipeline.create_job().await.unwrap();
        job.save_input("a.jpg", b"jpeg").await.unwrap();

        let err = f.pipeline.run(&job, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Reconstruction(ToolError::Failed { .. })));
        assert_eq!(err.kind(), ErrorKind::Tool);
        assert_eq!(f.colmap.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.trainer.calls.load(Ordering::SeqCst), 0);
        assert!(!f.pipeline.image_path(job.id()).exists());
        // Failed jobs keep their workspace.
        assert!(job.input_dir().join("a.jpg").is_file());
    }

    #[tokio::test]
    async fn missing_model_is_a_model_error() {
        let f = fixture(FakeColmap::default(), FakeTrainer::default());
        let job = f.pipeline.create_job().await.unwrap();
        job.save_input("a.jpg", b"jpeg").await.unwrap();

        let err = f.pipeline.run(&job, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, PipelineError::ModelNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::Model);
    }

    #[tokio::test]
    async fn empty_model_is_degenerate() {
        let f = fixture(
            FakeColmap::default(),
            FakeTrainer {
                model: Some("ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nproperty float y\nproperty float z\nend_header\n"),
                ..Default::default()
            },
        );
        let job = f.pipeline.create_job().await.unwrap();
        job.save_input("a.jpg", b"jpeg").await.unwrap();

        let err = f.pipeline.run(&job, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Degenerate);
    }

    #[tokio::test]
    async fn cancelled_job_stops_before_projection() {
        let f = fixture(
            FakeColmap::default(),
            FakeTrainer {
                model: Some(MODEL),
                ..Default::default()
            },
        );
        let job = f.pipeline.create_job().await.unwrap();
        job.save_input("a.jpg", b"jpeg").await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = f.pipeline.run(&job, &cancel).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert!(!f.pipeline.image_path(job.id()).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_external_tools() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("train.sh");
        // Arguments: -s <source> -m <model> --iterations <n>
        std::fs::write(
            &script,
            format!(
                "mkdir -p \"$4/point_cloud/iteration_$6\"\nprintf '{}' > \"$4/point_cloud/iteration_$6/point_cloud.ply\"\n",
                MODEL.replace('\n', "\\n")
            ),
        )
        .unwrap();

        let config = PipelineConfig {
            workspace_root: dir.path().join("workspace"),
            static_dir: dir.path().join("static"),
            colmap: ColmapConfig {
                program: "true".into(),
                use_gpu: true,
            },
            trainer: TrainerConfig {
                python: "sh".into(),
                script,
                iterations: 10,
            },
            ..Default::default()
        };
        let pipeline = Pipeline::new(config);
        let job = pipeline.create_job().await.unwrap();
        job.save_input("a.jpg", b"jpeg").await.unwrap();

        let out = pipeline.run(&job, &CancellationToken::new()).await.unwrap();
        assert!(out.image.is_file());
        assert_eq!(out.map.total(), 3);
    }
}
