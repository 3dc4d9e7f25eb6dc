use super::models::{
    DatabaseDocument, FieldEdit, FieldEditResult, GlobalFieldEdit, GlobalFieldEditResult,
};
use crate::common::errors::BusinessResult;
use crate::common::state::AppState;
use crate::validation_error;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_database, replace_database))
        .routes(routes!(update_operation_field, delete_operation))
        .routes(routes!(update_field_everywhere))
        .with_state(state.clone())
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "The whole database document", body = DatabaseDocument),
        (status = 502, description = "Document store unavailable")
    ),
    tag = "database"
)]
pub async fn get_database(State(state): State<AppState>) -> BusinessResult<Json<DatabaseDocument>> {
    Ok(Json(state.database.load().await?))
}

#[utoipa::path(
    put,
    path = "/",
    request_body = DatabaseDocument,
    responses(
        (status = 204, description = "Document replaced"),
        (status = 502, description = "Document store unavailable")
    ),
    tag = "database"
)]
pub async fn replace_database(
    State(state): State<AppState>,
    Json(document): Json<DatabaseDocument>,
) -> BusinessResult<StatusCode> {
    state.database.replace(document).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/operations/{index}",
    request_body = FieldEdit,
    params(("index" = usize, Path, description = "Position of the operation in the database")),
    responses(
        (status = 200, description = "Field updated", body = FieldEditResult),
        (status = 400, description = "Missing value"),
        (status = 404, description = "No operation at this index")
    ),
    tag = "database"
)]
pub async fn update_operation_field(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(edit): Json<FieldEdit>,
) -> BusinessResult<Json<FieldEditResult>> {
    if edit.value.is_null() {
        return Err(validation_error!("value", "a value is required"));
    }
    if edit.id2.is_null() {
        return Err(validation_error!("id2", "a row id2 is required"));
    }

    let old_value = state
        .database
        .transaction(|document| document.set_field(index, &edit))
        .await?;

    tracing::info!(index, table = %edit.table, key = %edit.key, "operation field updated");
    Ok(Json(FieldEditResult {
        success: true,
        old_value,
    }))
}

#[utoipa::path(
    patch,
    path = "/operations/{index}/fields",
    request_body = GlobalFieldEdit,
    params(("index" = usize, Path, description = "Position of the operation in the database")),
    responses(
        (status = 200, description = "Field updated in every table", body = GlobalFieldEditResult),
        (status = 404, description = "No operation at this index")
    ),
    tag = "database"
)]
pub async fn update_field_everywhere(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(edit): Json<GlobalFieldEdit>,
) -> BusinessResult<Json<GlobalFieldEditResult>> {
    let rows_updated = state
        .database
        .transaction(|document| document.set_field_everywhere(index, &edit.key, &edit.value))
        .await?;

    Ok(Json(GlobalFieldEditResult {
        success: true,
        rows_updated,
    }))
}

#[utoipa::path(
    delete,
    path = "/operations/{index}",
    params(("index" = usize, Path, description = "Position of the operation in the database")),
    responses(
        (status = 204, description = "Operation removed"),
        (status = 404, description = "No operation at this index")
    ),
    tag = "database"
)]
pub async fn delete_operation(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> BusinessResult<StatusCode> {
    state
        .database
        .transaction(|document| document.remove(index).map(|_| ()))
        .await?;

    tracing::info!(index, "operation deleted");
    Ok(StatusCode::NO_CONTENT)
}
