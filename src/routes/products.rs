use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    routes::params::{LowStockQuery, ProductQuery},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/{slug}", get(get_product))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/low-stock", get(list_low_stock))
        .route("/{id}", put(update_product).delete(delete_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name and description"),
        ("category_id" = Option<Uuid>, Query, description = "Restrict to a category subtree"),
        ("min_price" = Option<i64>, Query, description = "Minimum price in minor units"),
        ("max_price" = Option<i64>, Query, description = "Maximum price in minor units"),
        ("featured" = Option<bool>, Query, description = "Only featured products"),
        ("bestseller" = Option<bool>, Query, description = "Only bestsellers"),
        ("on_sale" = Option<bool>, Query, description = "Only discounted products"),
        ("sort_by" = Option<String>, Query, description = "created_at, price or name"),
        ("sort_order" = Option<String>, Query, description = "asc or desc"),
    ),
    responses(
        (status = 200, description = "Active products", body = ApiResponse<ProductList>),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(product_service::list_products(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(product_service::get_product(&state, &slug).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Created product", body = ApiResponse<Product>),
        (status = 400, description = "Slug taken or invalid sections"),
    ),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(
        product_service::create_product(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(
        product_service::update_product(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Deleted product"),
        (status = 404, description = "Product not found"),
    ),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        product_service::delete_product(&state, &user, id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/products/low-stock",
    params(
        ("threshold" = Option<i32>, Query, description = "Stock at or below this level, default 5"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Products running low", body = ApiResponse<ProductList>),
    ),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(
        product_service::list_low_stock(&state, &user, query).await?,
    ))
}
