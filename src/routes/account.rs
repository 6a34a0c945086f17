use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::account::{AddressList, UpdateProfileRequest, UpsertAddressRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Address, User},
    response::ApiResponse,
    services::account_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/addresses", get(list_addresses).post(create_address))
        .route(
            "/addresses/{id}",
            put(update_address).delete(delete_address),
        )
}

#[utoipa::path(get, path = "/api/account/profile", tag = "Account")]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(account_service::get_profile(&state, &user).await?))
}

#[utoipa::path(
    put,
    path = "/api/account/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<User>),
    ),
    tag = "Account"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(
        account_service::update_profile(&state, &user, payload).await?,
    ))
}

#[utoipa::path(get, path = "/api/account/addresses", tag = "Account")]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    Ok(Json(account_service::list_addresses(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/account/addresses",
    request_body = UpsertAddressRequest,
    responses(
        (status = 200, description = "Created address", body = ApiResponse<Address>),
    ),
    tag = "Account"
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpsertAddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    Ok(Json(
        account_service::create_address(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/account/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    request_body = UpsertAddressRequest,
    responses(
        (status = 200, description = "Updated address", body = ApiResponse<Address>),
        (status = 404, description = "Address not found"),
    ),
    tag = "Account"
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertAddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    Ok(Json(
        account_service::update_address(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/account/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Deleted address"),
        (status = 404, description = "Address not found"),
    ),
    tag = "Account"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        account_service::delete_address(&state, &user, id).await?,
    ))
}
