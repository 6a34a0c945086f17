use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Coupon, CouponKind};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub min_order_value: Option<i64>,
    pub max_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub value: Option<i64>,
    pub min_order_value: Option<i64>,
    pub max_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
    /// Order subtotal in minor units.
    pub subtotal: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateCouponResponse {
    pub code: String,
    pub discount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponList {
    pub items: Vec<Coupon>,
}

fn default_true() -> bool {
    true
}
