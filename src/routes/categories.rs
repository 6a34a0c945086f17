use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::categories::{
        CategoryList, CategoryTree, CreateCategoryRequest, DeleteCategoryQuery,
        UpdateCategoryRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Category, DeletionImpact},
    response::ApiResponse,
    services::category_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{slug}", get(get_category))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories_admin).post(create_category))
        .route("/{id}", put(update_category).delete(delete_category))
        .route("/{id}/impact", get(get_deletion_impact))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Active categories as a tree", body = ApiResponse<CategoryTree>),
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryTree>>> {
    Ok(Json(category_service::list_categories(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Category>>> {
    Ok(Json(category_service::get_category(&state, &slug).await?))
}

#[utoipa::path(get, path = "/api/admin/categories", tag = "Admin")]
pub async fn list_categories_admin(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    Ok(Json(
        category_service::list_categories_admin(&state, &user).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Created category", body = ApiResponse<Category>),
        (status = 400, description = "Slug taken or parent missing"),
    ),
    tag = "Admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    Ok(Json(
        category_service::create_category(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated category", body = ApiResponse<Category>),
        (status = 400, description = "Reparenting would create a cycle"),
        (status = 404, description = "Category not found"),
    ),
    tag = "Admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    Ok(Json(
        category_service::update_category(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/categories/{id}/impact",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "What deleting this category would remove", body = ApiResponse<DeletionImpact>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Admin"
)]
pub async fn get_deletion_impact(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletionImpact>>> {
    Ok(Json(
        category_service::get_deletion_impact(&state, &user, id).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        ("move_products_to_uncategorized" = Option<bool>, Query, description = "Confirm deleting a non-empty subtree"),
    ),
    responses(
        (status = 200, description = "Deleted category and its descendants"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Subtree is not empty and the confirmation flag was not set"),
    ),
    tag = "Admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteCategoryQuery>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(
        category_service::delete_category(&state, &user, id, query).await?,
    ))
}
