use super::models::{IngestQuery, IngestReport, OperationListQuery, StoredUpload, UploadedFile};
use super::services::{ensure_workbook, extension_of, ingest_batch, load_workbook};
use crate::common::errors::{BusinessError, BusinessResult};
use crate::common::state::AppState;
use crate::database::models::OperationSummary;
use crate::extraction::consolidation::consolidate_json;
use crate::extraction::models::OperationRecord;
use crate::validation_error;
use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::header,
    response::IntoResponse,
};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(ingest_operations, list_operations))
        .routes(routes!(consolidate_operation))
        .with_state(state.clone())
}

pub fn uploads_router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(store_upload))
        .with_state(state.clone())
}

/// Collect every `file` field of the form
async fn read_files(multipart: &mut Multipart) -> BusinessResult<Vec<UploadedFile>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| validation_error!("file", format!("invalid form data: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        // The file name becomes the operation's source id
        let name = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| validation_error!("file", "uploaded file has no file name"))?
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| validation_error!("file", format!("unreadable upload: {e}")))?;
        files.push(UploadedFile {
            name,
            bytes: bytes.to_vec(),
        });
    }

    if files.is_empty() {
        return Err(validation_error!("file", "no file provided"));
    }
    Ok(files)
}

#[utoipa::path(
    post,
    path = "/",
    request_body(content_type = "multipart/form-data", description = "A single `.xlsb` workbook in the `file` field"),
    responses(
        (status = 200, description = "Workbook stored", body = StoredUpload),
        (status = 400, description = "Missing file or not an .xlsb workbook")
    ),
    tag = "uploads"
)]
pub async fn store_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> BusinessResult<Json<StoredUpload>> {
    let file = read_files(&mut multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| validation_error!("file", "no file provided"))?;

    if extension_of(&file.name) != "xlsb" {
        return Err(validation_error!("file", "only .xlsb workbooks are accepted"));
    }

    let filename = format!("xlsb_{}.xlsb", Uuid::new_v4().simple());
    let target = state.config.upload_dir.join(&filename);

    let storage_error = |e: std::io::Error| BusinessError::InternalError {
        message: format!("Could not store upload: {e}"),
    };
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(storage_error)?;
    tokio::fs::write(&target, &file.bytes)
        .await
        .map_err(storage_error)?;

    tracing::info!(original = %file.name, stored = %filename, size = file.bytes.len(), "upload stored");
    Ok(Json(StoredUpload {
        success: true,
        filename,
    }))
}

#[utoipa::path(
    post,
    path = "/consolidate",
    request_body(content_type = "multipart/form-data", description = "One workbook in the `file` field"),
    responses(
        (status = 200, description = "Consolidated operation, nothing persisted", body = OperationRecord),
        (status = 400, description = "Missing file or unsupported format"),
        (status = 422, description = "Workbook could not be decoded")
    ),
    tag = "operations"
)]
pub async fn consolidate_operation(mut multipart: Multipart) -> BusinessResult<impl IntoResponse> {
    let file = read_files(&mut multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| validation_error!("file", "no file provided"))?;
    ensure_workbook(&file)?;

    let workbook = load_workbook(file).await?;
    let body = consolidate_json(workbook).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

#[utoipa::path(
    post,
    path = "/",
    params(IngestQuery),
    request_body(content_type = "multipart/form-data", description = "One or more workbooks, each in a `file` field"),
    responses(
        (status = 200, description = "Per-file outcome of the batch", body = IngestReport),
        (status = 400, description = "No file in the form, or a file without a name")
    ),
    tag = "operations"
)]
pub async fn ingest_operations(
    State(state): State<AppState>,
    Query(query): Query<IngestQuery>,
    mut multipart: Multipart,
) -> BusinessResult<Json<IngestReport>> {
    let files = read_files(&mut multipart).await?;

    tracing::info!(files = files.len(), replace = query.replace, "ingesting workbooks");
    Ok(Json(
        ingest_batch(files, &state.database, query.replace).await,
    ))
}

#[utoipa::path(
    get,
    path = "/",
    params(OperationListQuery),
    responses(
        (status = 200, description = "Operations in database order", body = Vec<OperationSummary>),
        (status = 502, description = "Document store unavailable")
    ),
    tag = "operations"
)]
pub async fn list_operations(
    State(state): State<AppState>,
    Query(query): Query<OperationListQuery>,
) -> BusinessResult<Json<Vec<OperationSummary>>> {
    let document = state.database.load().await?;
    Ok(Json(document.summaries(query.search.as_deref())))
}
