use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{PipelineError, Result, UploadError};

const INPUT_DIR: &str = "input";
const COLMAP_DIR: &str = "colmap";
const GAUSSIAN_DIR: &str = "gaussian";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// The isolated directory tree of one job.
///
/// ```text
/// {root}/{id}/input     uploaded images
/// {root}/{id}/colmap    reconstruction
/// {root}/{id}/gaussian  trained model
/// ```
///
/// Nothing is removed when a job fails.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    id: JobId,
    dir: PathBuf,
}

impl JobWorkspace {
    /// Allocate a fresh job id and create its tree under `root`.
    pub async fn create(root: &Path) -> Result<Self> {
        Self::create_with_id(root, JobId::new()).await
    }

    pub async fn create_with_id(root: &Path, id: JobId) -> Result<Self> {
        fs::create_dir_all(root)
            .await
            .map_err(PipelineError::workspace(root))?;

        let dir = root.join(id.to_string());
        match fs::create_dir(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                return Err(PipelineError::JobCollision(id));
            }
            Err(e) => return Err(PipelineError::workspace(&dir)(e)),
        }

        let job = Self { id, dir };
        for sub in [job.input_dir(), job.colmap_dir(), job.gaussian_dir()] {
            fs::create_dir(&sub).await.map_err(PipelineError::workspace(&sub))?;
        }
        tracing::debug!(job = %id, dir = %job.dir.display(), "Created job workspace");
        Ok(job)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn input_dir(&self) -> PathBuf {
        self.dir.join(INPUT_DIR)
    }

    pub fn colmap_dir(&self) -> PathBuf {
        self.dir.join(COLMAP_DIR)
    }

    /// Sparse model the trainer starts from.
    pub fn sparse_dir(&self) -> PathBuf {
        self.colmap_dir().join("sparse")
    }

    pub fn gaussian_dir(&self) -> PathBuf {
        self.dir.join(GAUSSIAN_DIR)
    }

    /// Write one uploaded file into `input/` under its sanitized name.
    ///
    /// Existing files are never overwritten.
    pub async fn save_input(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = sanitize_filename(file_name)?;
        let path = self.input_dir().join(&name);

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                return Err(UploadError::DuplicateFilename(name).into());
            }
            Err(e) => return Err(PipelineError::workspace(&path)(e)),
        };
        file.write_all(bytes).await.map_err(PipelineError::workspace(&path))?;
        file.flush().await.map_err(PipelineError::workspace(&path))?;
        Ok(path)
    }

    /// Copy every regular file of `dir` into `input/`.
    ///
    /// Hidden entries (`.DS_Store` and the like) are skipped. Returns the
    /// number of files imported.
    pub async fn import_dir(&self, dir: &Path) -> Result<usize> {
        let mut entries = fs::read_dir(dir).await.map_err(PipelineError::workspace(dir))?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.map_err(PipelineError::workspace(dir))? {
            let file_type = entry.file_type().await.map_err(PipelineError::workspace(entry.path()))?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                tracing::debug!(file = %name, "Skipping hidden file");
                continue;
            }
            let bytes = fs::read(entry.path())
                .await
                .map_err(PipelineError::workspace(entry.path()))?;
            self.save_input(&name, &bytes).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Number of files in `input/`.
    pub async fn input_count(&self) -> Result<usize> {
        let dir = self.input_dir();
        let mut entries = fs::read_dir(&dir).await.map_err(PipelineError::workspace(&dir))?;
        let mut count = 0;
        while entries
            .next_entry()
            .await
            .map_err(PipelineError::workspace(&dir))?
            .is_some()
        {
            count += 1;
        }
        Ok(count)
    }
}

/// Reduce a client supplied name to a plain file name.
///
/// Only the last path component is kept. Hidden names, `.`/`..` and names
/// containing NUL are rejected.
pub fn sanitize_filename(name: &str) -> std::result::Result<String, UploadError> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() {
        return Err(UploadError::MissingFilename);
    }
    if base.starts_with('.') || base.contains('\0') {
        return Err(UploadError::UnsafeFilename(name.to_string()));
    }
    Ok(base.to_string())
}
