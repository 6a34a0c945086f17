use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Revenue/order figures for one window plus the change vs the prior
/// equal-length window.
#[derive(Debug, Serialize, ToSchema)]
pub struct WindowStats {
    pub revenue: i64,
    pub order_count: i64,
    pub revenue_change_pct: f64,
    pub order_count_change_pct: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub today: WindowStats,
    pub last_30_days: WindowStats,
    pub last_90_days: WindowStats,
    pub lifetime_revenue: i64,
    pub lifetime_order_count: i64,
    pub pending_order_count: i64,
    pub customer_count: i64,
    pub product_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub units_sold: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProductList {
    pub items: Vec<TopProduct>,
}
