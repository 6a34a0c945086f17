use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/product/{id}", get(list_reviews).post(create_review))
        .route("/{id}", delete(delete_review))
}

#[utoipa::path(
    get,
    path = "/api/reviews/product/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reviews with an average rating", body = ApiResponse<ReviewList>),
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    Ok(Json(review_service::list_reviews(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/reviews/product/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Created review", body = ApiResponse<Review>),
        (status = 400, description = "Rating out of range or already reviewed"),
        (status = 404, description = "Product not found"),
    ),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    Ok(Json(
        review_service::create_review(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Deleted review"),
        (status = 403, description = "Not the author and not an admin"),
        (status = 404, description = "Review not found"),
    ),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(review_service::delete_review(&state, &user, id).await?))
}
