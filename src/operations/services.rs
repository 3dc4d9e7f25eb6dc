//! Workbook ingestion: decode, consolidate, persist.

use super::models::{FileIngestReport, IngestReport, UploadedFile};
use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::models::ProcessingStatus;
use crate::database::services::Database;
use crate::{duplicate_resource, validation_error};
use crate::extraction::consolidation::consolidate;
use crate::extraction::models::OperationRecord;
use crate::workbook::Workbook;
use chrono::Utc;
use std::sync::Arc;

/// Spreadsheet formats the workbook decoder accepts
const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsb", "xlsx", "xlsm", "xls", "ods"];

pub fn extension_of(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn ensure_workbook(file: &UploadedFile) -> BusinessResult<()> {
    if WORKBOOK_EXTENSIONS.contains(&extension_of(&file.name).as_str()) {
        Ok(())
    } else {
        Err(validation_error!(
            "file",
            format!("'{}' is not a spreadsheet workbook", file.name)
        ))
    }
}

/// Decode a workbook off the async runtime
pub async fn load_workbook(file: UploadedFile) -> BusinessResult<Arc<Workbook>> {
    let UploadedFile { name, bytes } = file;
    tokio::task::spawn_blocking(move || Workbook::from_bytes(&name, bytes))
        .await
        .map_err(|e| BusinessError::InternalError {
            message: format!("Workbook decoding task failed: {e}"),
        })?
        .map(Arc::new)
}

/// Consolidate an uploaded workbook without persisting anything
pub async fn consolidate_file(file: UploadedFile) -> BusinessResult<OperationRecord> {
    let workbook = load_workbook(file).await?;
    consolidate(workbook).await
}

/// Where an ingested operation landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestedOperation {
    pub index: usize,
    pub replaced: usize,
    pub records: usize,
}

/// Consolidate one workbook and append it to the database.
///
/// An operation from a workbook with the same name already in the database is
/// a conflict unless `replace` is set, in which case the older operations are
/// removed in the same transaction.
pub async fn ingest_file(
    file: UploadedFile,
    database: &Database,
    replace: bool,
) -> BusinessResult<IngestedOperation> {
    ensure_workbook(&file)?;
    let operation = consolidate_file(file).await?;
    let records = operation.record_count();

    database
        .transaction(move |document| {
            let mut replaced = 0;
            if let Some(source_id) = operation.source_id().cloned() {
                if document.position_of_source(&source_id).is_some() {
                    if !replace {
                        return Err(duplicate_resource!("Operation", "source workbook"));
                    }
                    replaced = document.remove_source(&source_id);
                }
            }
            Ok(IngestedOperation {
                index: document.push(operation),
                replaced,
                records,
            })
        })
        .await
}

/// Ingest workbooks one after the other, reporting on each
pub async fn ingest_batch(
    files: Vec<UploadedFile>,
    database: &Database,
    replace: bool,
) -> IngestReport {
    let started_at = Utc::now();
    let mut reports = Vec::with_capacity(files.len());

    for file in files {
        let name = file.name.clone();
        let report = match ingest_file(file, database, replace).await {
            Ok(ingested) => {
                tracing::info!(
                    file = %name,
                    index = ingested.index,
                    replaced = ingested.replaced,
                    "workbook ingested"
                );
                FileIngestReport {
                    file: name,
                    status: ProcessingStatus::Completed,
                    operation_index: Some(ingested.index),
                    replaced: ingested.replaced,
                    records: ingested.records,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "workbook ingestion failed");
                FileIngestReport {
                    file: name,
                    status: ProcessingStatus::Failed,
                    operation_index: None,
                    replaced: 0,
                    records: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }

    let succeeded = reports
        .iter()
        .filter(|r| r.status == ProcessingStatus::Completed)
        .count();

    IngestReport {
        succeeded,
        failed: reports.len() - succeeded,
        files: reports,
        started_at,
        completed_at: Utc::now(),
    }
}
