use crate::common::state::AppState;
use crate::config::Config;
use crate::database::services::Database;
use crate::{database, operations};
use axum::{Router, extract::DefaultBodyLimit};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

pub fn build_router(database: Database, config: &Config) -> Router {
    #[derive(OpenApi)]
    #[openapi(info(
        title = "Operations API",
        description = "Extraction of real-estate operation workbooks into a JSON database"
    ))]
    struct ApiDoc;

    let app_state = AppState::new(database, config.clone());

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(crate::common::views::router(&app_state)) // Root routes
        .nest("/api/uploads", operations::views::uploads_router(&app_state))
        .nest("/api/operations", operations::views::router(&app_state))
        .nest("/api/database", database::views::router(&app_state))
        .split_for_parts();

    router
        .merge(Scalar::with_url("/api/docs", api))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
}
