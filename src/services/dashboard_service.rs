use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    dto::dashboard::{DashboardStats, TopProduct, TopProductList, WindowStats},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Change between two window values. A zero previous value yields 100% when
/// anything was earned this window and 0% otherwise, avoiding a division by
/// zero.
pub fn percent_change(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        if current > 0 { 100.0 } else { 0.0 }
    } else {
        (current - previous) as f64 / previous as f64 * 100.0
    }
}

struct Window {
    revenue: i64,
    order_count: i64,
}

async fn paid_window(
    state: &AppState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<Window> {
    let row: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total), 0)::BIGINT, COUNT(*)
        FROM orders
        WHERE payment_status = 'success' AND created_at >= $1 AND created_at < $2
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(&state.pool)
    .await?;
    Ok(Window {
        revenue: row.0,
        order_count: row.1,
    })
}

async fn window_with_change(
    state: &AppState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<WindowStats> {
    let span = to - from;
    let current = paid_window(state, from, to).await?;
    let previous = paid_window(state, from - span, from).await?;
    Ok(WindowStats {
        revenue: current.revenue,
        order_count: current.order_count,
        revenue_change_pct: percent_change(current.revenue, previous.revenue),
        order_count_change_pct: percent_change(current.order_count, previous.order_count),
    })
}

pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;

    let now = Utc::now();
    // "Today" is the current UTC calendar day, not a rolling 24h window.
    let today_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc();

    let today = window_with_change(state, today_start, now).await?;
    let last_30_days = window_with_change(state, now - Duration::days(30), now).await?;
    let last_90_days = window_with_change(state, now - Duration::days(90), now).await?;

    let lifetime: (i64, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(total), 0)::BIGINT, COUNT(*) FROM orders WHERE payment_status = 'success'",
    )
    .fetch_one(&state.pool)
    .await?;

    let pending: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'pending'")
            .fetch_one(&state.pool)
            .await?;

    let customers: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'user'")
        .fetch_one(&state.pool)
        .await?;

    let products: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&state.pool)
        .await?;

    let data = DashboardStats {
        today,
        last_30_days,
        last_90_days,
        lifetime_revenue: lifetime.0,
        lifetime_order_count: lifetime.1,
        pending_order_count: pending.0,
        customer_count: customers.0,
        product_count: products.0,
    };

    Ok(ApiResponse::success("Dashboard", data, Some(Meta::empty())))
}

#[derive(FromRow)]
struct TopProductRow {
    product_id: Uuid,
    product_name: String,
    units_sold: i64,
    revenue: i64,
}

pub async fn top_products(
    state: &AppState,
    user: &AuthUser,
    limit: i64,
) -> AppResult<ApiResponse<TopProductList>> {
    ensure_admin(user)?;
    let limit = limit.clamp(1, 50);

    let rows = sqlx::query_as::<_, TopProductRow>(
        r#"
        SELECT oi.product_id,
               MAX(oi.product_name) AS product_name,
               SUM(oi.quantity)::BIGINT AS units_sold,
               SUM(oi.unit_price * oi.quantity)::BIGINT AS revenue
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE o.payment_status = 'success'
        GROUP BY oi.product_id
        ORDER BY units_sold DESC, revenue DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| TopProduct {
            product_id: row.product_id,
            product_name: row.product_name,
            units_sold: row.units_sold,
            revenue: row.revenue,
        })
        .collect();

    Ok(ApiResponse::success(
        "Top products",
        TopProductList { items },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_previous_maps_to_hundred_or_zero() {
        assert_eq!(percent_change(500, 0), 100.0);
        assert_eq!(percent_change(0, 0), 0.0);
    }

    #[test]
    fn growth_and_decline_are_signed() {
        assert_eq!(percent_change(150, 100), 50.0);
        assert_eq!(percent_change(50, 100), -50.0);
        assert_eq!(percent_change(0, 100), -100.0);
    }
}
