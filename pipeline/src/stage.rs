use std::fmt;

/// Progress of a single processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobStage {
    Received,
    WorkspaceCreated,
    FilesSaved,
    ReconstructionDone,
    TrainingDone,
    ProjectionDone,
    ImageWritten,
    Responded,
}

impl JobStage {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStage::Received => "received",
            JobStage::WorkspaceCreated => "workspace-created",
            JobStage::FilesSaved => "files-saved",
            JobStage::ReconstructionDone => "reconstruction-done",
            JobStage::TrainingDone => "training-done",
            JobStage::ProjectionDone => "projection-done",
            JobStage::ImageWritten => "image-written",
            JobStage::Responded => "responded",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
