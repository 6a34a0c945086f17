use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::cms::{
        CreateFaqRequest, CreatePageRequest, FaqList, PageList, ReorderFaqsRequest,
        UpdateFaqRequest, UpdatePageRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Faq, Page},
    response::ApiResponse,
    services::cms_service,
    state::AppState,
};

pub fn pages_router() -> Router<AppState> {
    Router::new().route("/{slug}", get(get_page))
}

pub fn faqs_router() -> Router<AppState> {
    Router::new().route("/", get(list_faqs))
}

pub fn admin_pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages_admin).post(create_page))
        .route("/{id}", put(update_page).delete(delete_page))
}

pub fn admin_faqs_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_faqs_admin).post(create_faq))
        .route("/reorder", put(reorder_faqs))
        .route("/{id}", put(update_faq).delete(delete_faq))
}

#[utoipa::path(
    get,
    path = "/api/pages/{slug}",
    params(("slug" = String, Path, description = "Page slug")),
    responses(
        (status = 200, description = "Published page", body = ApiResponse<Page>),
        (status = 404, description = "Page not found or unpublished"),
    ),
    tag = "Cms"
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Page>>> {
    Ok(Json(cms_service::get_page(&state, &slug).await?))
}

#[utoipa::path(get, path = "/api/faqs", tag = "Cms")]
pub async fn list_faqs(State(state): State<AppState>) -> AppResult<Json<ApiResponse<FaqList>>> {
    Ok(Json(cms_service::list_faqs(&state).await?))
}

#[utoipa::path(get, path = "/api/admin/pages", tag = "Admin")]
pub async fn list_pages_admin(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PageList>>> {
    Ok(Json(cms_service::list_pages_admin(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/pages",
    request_body = CreatePageRequest,
    responses(
        (status = 200, description = "Created page", body = ApiResponse<Page>),
        (status = 400, description = "Slug already taken"),
    ),
    tag = "Admin"
)]
pub async fn create_page(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePageRequest>,
) -> AppResult<Json<ApiResponse<Page>>> {
    Ok(Json(cms_service::create_page(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/pages/{id}",
    params(("id" = Uuid, Path, description = "Page ID")),
    request_body = UpdatePageRequest,
    responses(
        (status = 200, description = "Updated page", body = ApiResponse<Page>),
        (status = 404, description = "Page not found"),
    ),
    tag = "Admin"
)]
pub async fn update_page(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePageRequest>,
) -> AppResult<Json<ApiResponse<Page>>> {
    Ok(Json(
        cms_service::update_page(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/admin/pages/{id}",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Deleted page"),
        (status = 404, description = "Page not found"),
    ),
    tag = "Admin"
)]
pub async fn delete_page(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(cms_service::delete_page(&state, &user, id).await?))
}

#[utoipa::path(get, path = "/api/admin/faqs", tag = "Admin")]
pub async fn list_faqs_admin(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<FaqList>>> {
    Ok(Json(cms_service::list_faqs_admin(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/faqs",
    request_body = CreateFaqRequest,
    responses(
        (status = 200, description = "Created FAQ", body = ApiResponse<Faq>),
    ),
    tag = "Admin"
)]
pub async fn create_faq(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateFaqRequest>,
) -> AppResult<Json<ApiResponse<Faq>>> {
    Ok(Json(cms_service::create_faq(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/faqs/{id}",
    params(("id" = Uuid, Path, description = "FAQ ID")),
    request_body = UpdateFaqRequest,
    responses(
        (status = 200, description = "Updated FAQ", body = ApiResponse<Faq>),
        (status = 404, description = "FAQ not found"),
    ),
    tag = "Admin"
)]
pub async fn update_faq(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFaqRequest>,
) -> AppResult<Json<ApiResponse<Faq>>> {
    Ok(Json(
        cms_service::update_faq(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/faqs/reorder",
    request_body = ReorderFaqsRequest,
    responses(
        (status = 200, description = "FAQs in their new order", body = ApiResponse<FaqList>),
        (status = 400, description = "An ID does not match an existing FAQ"),
    ),
    tag = "Admin"
)]
pub async fn reorder_faqs(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ReorderFaqsRequest>,
) -> AppResult<Json<ApiResponse<FaqList>>> {
    Ok(Json(
        cms_service::reorder_faqs(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/admin/faqs/{id}",
    params(("id" = Uuid, Path, description = "FAQ ID")),
    responses(
        (status = 200, description = "Deleted FAQ"),
        (status = 404, description = "FAQ not found"),
    ),
    tag = "Admin"
)]
pub async fn delete_faq(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(cms_service::delete_faq(&state, &user, id).await?))
}
