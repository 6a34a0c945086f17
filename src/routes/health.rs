use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::response::ApiResponse;

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
}

/// Liveness probe. Does not touch the database.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<ApiResponse<HealthData>> {
    let data = HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success("Health check", data, None))
}
