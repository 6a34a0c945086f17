use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, ProductSection},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    category_id: Option<Uuid>,
    price: i64,
    compare_at_price: Option<i64>,
    stock: i32,
    sections: serde_json::Value,
    is_featured: bool,
    is_bestseller: bool,
    is_on_sale: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.name, p.slug, p.description, p.category_id,
               p.price, p.compare_at_price, p.stock, p.sections,
               p.is_featured, p.is_bestseller, p.is_on_sale, p.is_active, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let totals: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COALESCE(SUM(p.price * ci.quantity), 0)::BIGINT
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(cart_item_from_row)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, totals.0);
    Ok(ApiResponse::success(
        "OK",
        CartList {
            items,
            subtotal: totals.1,
        },
        Some(meta),
    ))
}

/// Upsert a cart line. The requested quantity is clamped to available stock;
/// the clamped row is returned so the client's optimistic mirror can correct
/// itself against the authoritative state.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItemDto>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let stock: Option<(i32, bool)> =
        sqlx::query_as("SELECT stock, is_active FROM products WHERE id = $1")
            .bind(payload.product_id)
            .fetch_optional(&state.pool)
            .await?;
    let (stock, is_active) = match stock {
        Some(row) => row,
        None => return Err(AppError::BadRequest("product not found".to_string())),
    };
    if !is_active {
        return Err(AppError::BadRequest("product is unavailable".to_string()));
    }

    let quantity = match clamp_to_stock(payload.quantity, stock) {
        Some(q) => q,
        None => return Err(AppError::BadRequest("product is out of stock".to_string())),
    };

    let cart_id: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(quantity)
    .fetch_one(&state.pool)
    .await?;

    let item = fetch_cart_item(state, user, cart_id.0).await?;
    Ok(ApiResponse::success("OK", item, None))
}

/// Set the quantity on an existing line; zero or below removes the line.
pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<Option<CartItemDto>>> {
    if payload.quantity <= 0 {
        return remove_line(state, user, product_id).await;
    }

    let stock: Option<(i32,)> = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.pool)
        .await?;
    let stock = match stock {
        Some((s,)) => s,
        None => return Err(AppError::BadRequest("product not found".to_string())),
    };
    // A line never lingers at quantity zero: exhausted stock removes it.
    let quantity = match clamp_to_stock(payload.quantity, stock) {
        Some(q) => q,
        None => return remove_line(state, user, product_id).await,
    };

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE cart_items SET quantity = $3
        WHERE user_id = $1 AND product_id = $2
        RETURNING id
        "#,
    )
    .bind(user.user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&state.pool)
    .await?;

    let cart_id = match row {
        Some((id,)) => id,
        None => return Err(AppError::NotFound),
    };

    let item = fetch_cart_item(state, user, cart_id).await?;
    Ok(ApiResponse::success("OK", Some(item), None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Clamp a requested line quantity to what is actually in stock. `None`
/// means the line cannot exist at all.
fn clamp_to_stock(requested: i32, stock: i32) -> Option<i32> {
    let clamped = requested.min(stock);
    (clamped > 0).then_some(clamped)
}

async fn remove_line(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<Option<CartItemDto>>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Removed from cart",
        None,
        Some(Meta::empty()),
    ))
}

async fn fetch_cart_item(
    state: &AppState,
    user: &AuthUser,
    cart_id: Uuid,
) -> AppResult<CartItemDto> {
    let row = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.name, p.slug, p.description, p.category_id,
               p.price, p.compare_at_price, p.stock, p.sections,
               p.is_featured, p.is_bestseller, p.is_on_sale, p.is_active, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.id = $1 AND ci.user_id = $2
        "#,
    )
    .bind(cart_id)
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    cart_item_from_row(row)
}

fn cart_item_from_row(row: CartWithProductRow) -> AppResult<CartItemDto> {
    let sections: Vec<ProductSection> = serde_json::from_value(row.sections)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt product sections: {e}")))?;
    Ok(CartItemDto {
        id: row.cart_id,
        product: Product {
            id: row.product_id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            category_id: row.category_id,
            price: row.price,
            compare_at_price: row.compare_at_price,
            stock: row.stock,
            sections,
            is_featured: row.is_featured,
            is_bestseller: row.is_bestseller,
            is_on_sale: row.is_on_sale,
            is_active: row.is_active,
            created_at: row.created_at,
        },
        quantity: row.quantity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_is_clamped_to_stock() {
        assert_eq!(clamp_to_stock(5, 3), Some(3));
        assert_eq!(clamp_to_stock(2, 3), Some(2));
    }

    #[test]
    fn exhausted_stock_leaves_no_line() {
        assert_eq!(clamp_to_stock(1, 0), None);
        assert_eq!(clamp_to_stock(3, -1), None);
        assert_eq!(clamp_to_stock(0, 5), None);
    }
}
