use super::models::HealthCheck;
use crate::common::state::AppState;
use crate::database::services::Database;
use axum::{Json, extract::State, http::StatusCode};
use utoipa_axum::{router::OpenApiRouter, routes};

pub fn router(state: &AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(healthz))
        .with_state(state.database.clone())
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = OK, description = "Document store reachable", body = HealthCheck),
        (status = INTERNAL_SERVER_ERROR, description = "Document store unreachable", body = HealthCheck)
    )
)]
pub async fn healthz(State(database): State<Database>) -> (StatusCode, Json<HealthCheck>) {
    if !database.ping().await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthCheck {
                status: "error".to_string(),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(HealthCheck {
            status: "ok".to_string(),
        }),
    )
}
