use crate::common::models::ProcessingStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A workbook received from a client, named after the file it was read from
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Response of the raw upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredUpload {
    pub success: bool,
    pub filename: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IngestQuery {
    /// Replace operations already ingested from a workbook with the same name
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OperationListQuery {
    /// Case-insensitive fragment of the operation name
    pub search: Option<String>,
}

/// Outcome of ingesting one workbook of a batch
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileIngestReport {
    pub file: String,
    pub status: ProcessingStatus,
    /// Position of the new operation in the database
    pub operation_index: Option<usize>,
    /// Operations from the same workbook removed before appending
    pub replaced: usize,
    pub records: usize,
    pub error: Option<String>,
}

/// Outcome of a batch; one failing file never stops the others
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestReport {
    pub succeeded: usize,
    pub failed: usize,
    pub files: Vec<FileIngestReport>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
