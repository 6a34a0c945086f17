use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList},
    entity::products::Entity as Products,
    entity::reviews::{
        ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews, Model as ReviewModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_reviews(state: &AppState, product_id: Uuid) -> AppResult<ApiResponse<ReviewList>> {
    let rows = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let average_rating = if rows.is_empty() {
        None
    } else {
        let sum: i64 = rows.iter().map(|r| r.rating as i64).sum();
        Some(sum as f64 / rows.len() as f64)
    };

    let items = rows.into_iter().map(review_from_entity).collect();
    Ok(ApiResponse::success(
        "Reviews",
        ReviewList {
            items,
            average_rating,
        },
        Some(Meta::empty()),
    ))
}

/// One review per user per product, keyed on user id.
pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }

    if Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let existing = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::ProductId.eq(product_id))
                .add(ReviewCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(
            "you have already reviewed this product".into(),
        ));
    }

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Review created",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

/// The author may remove their own review; admins may remove any.
pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let review = Reviews::find_by_id(id).one(&state.orm).await?;
    let review = match review {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    if review.user_id != user.user_id && user.role != "admin" {
        return Err(AppError::Forbidden);
    }

    Reviews::delete_by_id(id).exec(&state.orm).await?;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
