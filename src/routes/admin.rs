use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        dashboard::{DashboardStats, TopProductList},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::{OrderListQuery, TopProductsQuery},
    services::{dashboard_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/status", put(update_order_status))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/dashboard/top-products", get(top_products))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("sort_order" = Option<String>, Query, description = "asc or desc, default desc"),
    ),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
    ),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(
        order_service::list_all_orders(&state, &user, query).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with line items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(
        order_service::get_order_admin(&state, &user, id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order with the new status", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(
        order_service::update_order_status(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard/stats",
    responses(
        (status = 200, description = "Revenue and order windows with trends", body = ApiResponse<DashboardStats>),
    ),
    tag = "Admin"
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    Ok(Json(dashboard_service::stats(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard/top-products",
    params(("limit" = Option<i64>, Query, description = "How many products, default 10, max 50")),
    responses(
        (status = 200, description = "Best sellers by units across paid orders", body = ApiResponse<TopProductList>),
    ),
    tag = "Admin"
)]
pub async fn top_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TopProductsQuery>,
) -> AppResult<Json<ApiResponse<TopProductList>>> {
    Ok(Json(
        dashboard_service::top_products(&state, &user, query.limit.unwrap_or(10)).await?,
    ))
}
