use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use pipeline::{sanitize_filename, JobStage, UploadError};
use tracing::info;
use web_cmn::responses::ProcessResponse;

use super::STATIC_ROUTE;
use crate::error::{BackendError, Result};
use crate::state::AppState;

/// Multipart field carrying the images.
const FILES_FIELD: &str = "files";

/// Run the whole pipeline on the uploaded images and answer with the URL of
/// the density image.
pub async fn process_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>> {
    info!(stage = %JobStage::Received, "Received process request");

    let files = read_files(&mut multipart).await?;
    if files.is_empty() {
        return Err(UploadError::NoFiles.into());
    }

    let job = state.pipeline.create_job().await?;
    for (name, bytes) in &files {
        job.save_input(name, bytes).await?;
    }
    info!(job = %job.id(), stage = %JobStage::FilesSaved, files = files.len());

    let cancel = state.shutdown.child_token();
    let output = state.pipeline.run(&job, &cancel).await?;

    let result = format!("{STATIC_ROUTE}/{}.png", output.job_id);
    info!(job = %job.id(), stage = %JobStage::Responded, %result);
    Ok(Json(ProcessResponse::completed(result)))
}

/// Collect every uploaded file before anything touches the disk.
async fn read_files(multipart: &mut Multipart) -> Result<Vec<(String, Bytes)>> {
    let mut files = Vec::new();
    let mut names = HashSet::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILES_FIELD) {
            return Err(BackendError::BadRequest(format!(
                "Unexpected field '{}', expected '{FILES_FIELD}'",
                field.name().unwrap_or_default()
            )));
        }

        let name = field.file_name().ok_or(UploadError::MissingFilename)?;
        let name = sanitize_filename(name)?;
        if !names.insert(name.clone()) {
            return Err(UploadError::DuplicateFilename(name).into());
        }

        let bytes = field.bytes().await?;
        info!("Received file {name} ({} bytes)", bytes.len());
        files.push((name, bytes));
    }
    Ok(files)
}
