use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::coupons::{
        CouponList, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest,
        ValidateCouponResponse,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Coupon,
    response::ApiResponse,
    services::coupon_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate_coupon))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route("/{id}", put(update_coupon).delete(delete_coupon))
}

#[utoipa::path(
    post,
    path = "/api/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Discount the coupon would apply", body = ApiResponse<ValidateCouponResponse>),
        (status = 400, description = "Coupon invalid, expired or exhausted"),
    ),
    tag = "Coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ValidateCouponRequest>,
) -> AppResult<Json<ApiResponse<ValidateCouponResponse>>> {
    Ok(Json(
        coupon_service::validate_coupon(&state, &user, payload).await?,
    ))
}

#[utoipa::path(get, path = "/api/admin/coupons", tag = "Admin")]
pub async fn list_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CouponList>>> {
    Ok(Json(coupon_service::list_coupons(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 200, description = "Created coupon", body = ApiResponse<Coupon>),
        (status = 400, description = "Code taken or value out of range"),
    ),
    tag = "Admin"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    Ok(Json(
        coupon_service::create_coupon(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Updated coupon", body = ApiResponse<Coupon>),
        (status = 404, description = "Coupon not found"),
    ),
    tag = "Admin"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    Ok(Json(
        coupon_service::update_coupon(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 200, description = "Deleted coupon"),
        (status = 404, description = "Coupon not found"),
    ),
    tag = "Admin"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        coupon_service::delete_coupon(&state, &user, id).await?,
    ))
}
