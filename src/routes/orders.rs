use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CancelCheckoutRequest, CancelCheckoutResponse, CheckoutRequest, CheckoutResponse,
        ConfirmPaymentRequest, OrderList, OrderWithItems,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/{id}", get(get_order))
        .route("/{id}/confirm", post(confirm_payment))
        .route("/{id}/cancel", post(cancel_checkout))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("sort_order" = Option<String>, Query, description = "asc or desc, default desc"),
    ),
    responses(
        (status = 200, description = "The caller's orders", body = ApiResponse<OrderList>),
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(
        order_service::list_orders(&state, &user, query).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Pending order with a gateway order to pay", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty cart, stock shortage or bad coupon"),
        (status = 502, description = "Payment gateway unavailable"),
    ),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    Ok(Json(order_service::checkout(&state, &user, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with line items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(order_service::get_order(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/confirm",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment verified, order moved to processing", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Signature rejected"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(
        order_service::confirm_payment(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = CancelCheckoutRequest,
    responses(
        (status = 200, description = "Order deleted, or kept as failed after a payment attempt", body = ApiResponse<CancelCheckoutResponse>),
        (status = 400, description = "Order is no longer pending"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn cancel_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelCheckoutRequest>,
) -> AppResult<Json<ApiResponse<CancelCheckoutResponse>>> {
    Ok(Json(
        order_service::cancel_checkout(&state, &user, id, payload).await?,
    ))
}
