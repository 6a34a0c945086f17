use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::coupons::{
        CouponList, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest,
        ValidateCouponResponse,
    },
    entity::coupons::{
        ActiveModel as CouponActive, Column as CouponCol, Entity as Coupons, Model as CouponModel,
    },
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Coupon, CouponKind, PaymentStatus},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Discount for a validated coupon. A percentage discount is capped at
/// `max_discount` when set; every discount is capped at the subtotal itself,
/// so the payable total can never go negative.
pub fn compute_discount(
    kind: CouponKind,
    value: i64,
    max_discount: Option<i64>,
    subtotal: i64,
) -> i64 {
    let raw = match kind {
        CouponKind::Percentage => {
            let pct = subtotal * value / 100;
            match max_discount {
                Some(max) => pct.min(max),
                None => pct,
            }
        }
        CouponKind::Flat => value,
    };
    raw.clamp(0, subtotal)
}

/// Server-side validation used by both the validate endpoint and checkout.
/// Returns the coupon row and the discount it yields for `subtotal`.
pub async fn validate_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    code: &str,
    subtotal: i64,
) -> AppResult<(CouponModel, i64)> {
    let code = code.trim().to_uppercase();
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(code.clone()))
        .one(conn)
        .await?;
    let coupon = match coupon {
        Some(c) => c,
        None => return Err(AppError::BadRequest("invalid coupon code".into())),
    };

    if !coupon.is_active {
        return Err(AppError::BadRequest("coupon is not active".into()));
    }
    if let Some(expires_at) = coupon.expires_at {
        if expires_at.with_timezone(&Utc) < Utc::now() {
            return Err(AppError::BadRequest("coupon has expired".into()));
        }
    }
    if let Some(min_order_value) = coupon.min_order_value {
        if subtotal < min_order_value {
            return Err(AppError::BadRequest(format!(
                "order subtotal below coupon minimum of {min_order_value}"
            )));
        }
    }
    if let Some(usage_limit) = coupon.usage_limit {
        if coupon.used_count >= usage_limit {
            return Err(AppError::BadRequest("coupon usage limit reached".into()));
        }
    }
    if let Some(per_user_limit) = coupon.per_user_limit {
        let used_by_user = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::UserId.eq(user_id))
                    .add(OrderCol::CouponCode.eq(code.clone()))
                    .add(OrderCol::PaymentStatus.eq(PaymentStatus::Success.as_str())),
            )
            .count(conn)
            .await? as i32;
        if used_by_user >= per_user_limit {
            return Err(AppError::BadRequest(
                "coupon already used the maximum number of times".into(),
            ));
        }
    }

    let kind = CouponKind::parse(&coupon.kind)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown coupon kind {}", coupon.kind)))?;
    let discount = compute_discount(kind, coupon.value, coupon.max_discount, subtotal);
    Ok((coupon, discount))
}

pub async fn validate_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: ValidateCouponRequest,
) -> AppResult<ApiResponse<ValidateCouponResponse>> {
    if payload.subtotal <= 0 {
        return Err(AppError::BadRequest("subtotal must be positive".into()));
    }
    let (coupon, discount) =
        validate_for_user(&state.orm, user.user_id, &payload.code, payload.subtotal).await?;
    Ok(ApiResponse::success(
        "Coupon valid",
        ValidateCouponResponse {
            code: coupon.code,
            discount,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_coupons(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let items = Coupons::find()
        .order_by_desc(CouponCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(coupon_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let code = payload.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::BadRequest("code must not be empty".into()));
    }
    if payload.value <= 0 {
        return Err(AppError::BadRequest("value must be positive".into()));
    }
    if payload.kind == CouponKind::Percentage && payload.value > 100 {
        return Err(AppError::BadRequest(
            "percentage value must not exceed 100".into(),
        ));
    }

    let exists = Coupons::find()
        .filter(CouponCol::Code.eq(code.clone()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("coupon code already exists".into()));
    }

    let coupon = CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        kind: Set(payload.kind.as_str().to_string()),
        value: Set(payload.value),
        min_order_value: Set(payload.min_order_value),
        max_discount: Set(payload.max_discount),
        usage_limit: Set(payload.usage_limit),
        per_user_limit: Set(payload.per_user_limit),
        used_count: Set(0),
        expires_at: Set(payload.expires_at.map(Into::into)),
        is_active: Set(payload.is_active),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    log_audit(
        state,
        Some(user.user_id),
        "coupon_create",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon created",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let existing = Coupons::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: CouponActive = existing.into();
    if let Some(value) = payload.value {
        if value <= 0 {
            return Err(AppError::BadRequest("value must be positive".into()));
        }
        active.value = Set(value);
    }
    if let Some(min_order_value) = payload.min_order_value {
        active.min_order_value = Set(Some(min_order_value));
    }
    if let Some(max_discount) = payload.max_discount {
        active.max_discount = Set(Some(max_discount));
    }
    if let Some(usage_limit) = payload.usage_limit {
        active.usage_limit = Set(Some(usage_limit));
    }
    if let Some(per_user_limit) = payload.per_user_limit {
        active.per_user_limit = Set(Some(per_user_limit));
    }
    if let Some(expires_at) = payload.expires_at {
        active.expires_at = Set(Some(expires_at.into()));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let coupon = active.update(&state.orm).await?;

    log_audit(
        state,
        Some(user.user_id),
        "coupon_update",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Coupons::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    log_audit(
        state,
        Some(user.user_id),
        "coupon_delete",
        "coupons",
        serde_json::json!({ "coupon_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn coupon_from_entity(model: CouponModel) -> Coupon {
    Coupon {
        id: model.id,
        code: model.code,
        kind: model.kind,
        value: model.value,
        min_order_value: model.min_order_value,
        max_discount: model.max_discount,
        usage_limit: model.usage_limit,
        per_user_limit: model.per_user_limit,
        used_count: model.used_count,
        expires_at: model.expires_at.map(|dt| dt.with_timezone(&Utc)),
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_discount_is_capped_at_max_discount() {
        // 20% of 1000 is 200, capped at 100.
        assert_eq!(
            compute_discount(CouponKind::Percentage, 20, Some(100), 1000),
            100
        );
    }

    #[test]
    fn percentage_discount_without_cap() {
        assert_eq!(compute_discount(CouponKind::Percentage, 20, None, 1000), 200);
    }

    #[test]
    fn flat_discount_is_capped_at_subtotal() {
        assert_eq!(compute_discount(CouponKind::Flat, 500, None, 300), 300);
    }

    #[test]
    fn discount_is_never_negative() {
        assert_eq!(compute_discount(CouponKind::Flat, -50, None, 300), 0);
        assert_eq!(compute_discount(CouponKind::Percentage, -10, None, 300), 0);
    }

    #[test]
    fn zero_subtotal_yields_zero_discount() {
        assert_eq!(compute_discount(CouponKind::Percentage, 50, None, 0), 0);
    }
}
