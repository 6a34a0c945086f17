use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cms::{
        CreateFaqRequest, CreatePageRequest, FaqList, PageList, ReorderFaqsRequest,
        UpdateFaqRequest, UpdatePageRequest,
    },
    entity::faqs::{ActiveModel as FaqActive, Column as FaqCol, Entity as Faqs, Model as FaqModel},
    entity::pages::{
        ActiveModel as PageActive, Column as PageCol, Entity as Pages, Model as PageModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Faq, Page},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_page(state: &AppState, slug: &str) -> AppResult<ApiResponse<Page>> {
    let page = Pages::find()
        .filter(PageCol::Slug.eq(slug))
        .filter(PageCol::IsPublished.eq(true))
        .one(&state.orm)
        .await?;
    let page = match page {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Page", page_from_entity(page), None))
}

pub async fn list_pages_admin(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<PageList>> {
    ensure_admin(user)?;
    let items = Pages::find()
        .order_by_asc(PageCol::Slug)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(page_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "Pages",
        PageList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_page(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePageRequest,
) -> AppResult<ApiResponse<Page>> {
    ensure_admin(user)?;
    let exists = Pages::find()
        .filter(PageCol::Slug.eq(payload.slug.clone()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("slug is already taken".into()));
    }

    let page = PageActive {
        id: Set(Uuid::new_v4()),
        slug: Set(payload.slug),
        title: Set(payload.title),
        body: Set(payload.body),
        is_published: Set(payload.is_published),
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    log_audit(
        state,
        Some(user.user_id),
        "page_create",
        "pages",
        serde_json::json!({ "page_id": page.id, "slug": page.slug }),
    )
    .await;

    Ok(ApiResponse::success(
        "Page created",
        page_from_entity(page),
        Some(Meta::empty()),
    ))
}

pub async fn update_page(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePageRequest,
) -> AppResult<ApiResponse<Page>> {
    ensure_admin(user)?;
    let existing = Pages::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: PageActive = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(body) = payload.body {
        active.body = Set(body);
    }
    if let Some(is_published) = payload.is_published {
        active.is_published = Set(is_published);
    }
    active.updated_at = Set(Utc::now().into());
    let page = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        page_from_entity(page),
        Some(Meta::empty()),
    ))
}

pub async fn delete_page(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Pages::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_faqs(state: &AppState) -> AppResult<ApiResponse<FaqList>> {
    let items = Faqs::find()
        .filter(FaqCol::IsPublished.eq(true))
        .order_by_asc(FaqCol::SortOrder)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(faq_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "FAQs",
        FaqList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_faqs_admin(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<FaqList>> {
    ensure_admin(user)?;
    let items = Faqs::find()
        .order_by_asc(FaqCol::SortOrder)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(faq_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "FAQs",
        FaqList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_faq(
    state: &AppState,
    user: &AuthUser,
    payload: CreateFaqRequest,
) -> AppResult<ApiResponse<Faq>> {
    ensure_admin(user)?;
    let faq = FaqActive {
        id: Set(Uuid::new_v4()),
        question: Set(payload.question),
        answer: Set(payload.answer),
        sort_order: Set(payload.sort_order),
        is_published: Set(payload.is_published),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "FAQ created",
        faq_from_entity(faq),
        Some(Meta::empty()),
    ))
}

pub async fn update_faq(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateFaqRequest,
) -> AppResult<ApiResponse<Faq>> {
    ensure_admin(user)?;
    let existing = Faqs::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(f) => f,
        None => return Err(AppError::NotFound),
    };

    let mut active: FaqActive = existing.into();
    if let Some(question) = payload.question {
        active.question = Set(question);
    }
    if let Some(answer) = payload.answer {
        active.answer = Set(answer);
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(is_published) = payload.is_published {
        active.is_published = Set(is_published);
    }
    let faq = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        faq_from_entity(faq),
        Some(Meta::empty()),
    ))
}

/// Apply a full ordering in one transaction so no reader ever observes a
/// partially reordered list.
pub async fn reorder_faqs(
    state: &AppState,
    user: &AuthUser,
    payload: ReorderFaqsRequest,
) -> AppResult<ApiResponse<FaqList>> {
    ensure_admin(user)?;
    if payload.ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".into()));
    }

    let txn = state.orm.begin().await?;
    for (position, id) in payload.ids.iter().enumerate() {
        let existing = Faqs::find_by_id(*id).one(&txn).await?;
        let existing = match existing {
            Some(f) => f,
            None => return Err(AppError::BadRequest(format!("unknown faq id {id}"))),
        };
        let mut active: FaqActive = existing.into();
        active.sort_order = Set(position as i32);
        active.update(&txn).await?;
    }
    txn.commit().await?;

    log_audit(
        state,
        Some(user.user_id),
        "faq_reorder",
        "faqs",
        serde_json::json!({ "count": payload.ids.len() }),
    )
    .await;

    list_faqs_admin(state, user).await
}

pub async fn delete_faq(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Faqs::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn page_from_entity(model: PageModel) -> Page {
    Page {
        id: model.id,
        slug: model.slug,
        title: model.title,
        body: model.body,
        is_published: model.is_published,
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn faq_from_entity(model: FaqModel) -> Faq {
    Faq {
        id: model.id,
        question: model.question,
        answer: model.answer,
        sort_order: model.sort_order,
        is_published: model.is_published,
    }
}
