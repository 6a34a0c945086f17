use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::Pagination,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).post(add_to_cart).delete(clear_cart))
        .route(
            "/{product_id}",
            put(update_cart_item).delete(remove_from_cart),
        )
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Cart contents with subtotal", body = ApiResponse<CartList>),
    ),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<CartList>>> {
    Ok(Json(
        cart_service::list_cart(&state, &user, pagination).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Cart item after the add", body = ApiResponse<CartItemDto>),
        (status = 400, description = "Product unavailable or quantity invalid"),
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItemDto>>> {
    Ok(Json(
        cart_service::add_to_cart(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/cart/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated item, or null when the quantity dropped to zero", body = ApiResponse<Option<CartItemDto>>),
        (status = 404, description = "Item not in cart"),
    ),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<Option<CartItemDto>>>> {
    Ok(Json(
        cart_service::update_cart_item(&state, &user, product_id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Removed item"),
        (status = 404, description = "Item not in cart"),
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        cart_service::remove_from_cart(&state, &user, product_id).await?,
    ))
}

#[utoipa::path(delete, path = "/api/cart", tag = "Cart")]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(cart_service::clear_cart(&state, &user).await?))
}
