use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{
        ActiveModel as ProductActive, Column, Entity as Products, Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, ProductSection},
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, ProductQuery, ProductSortBy, SortOrder},
    services::category_service,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(Column::IsActive.eq(true));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    // A category filter covers the whole subtree under it.
    if let Some(category_id) = query.category_id {
        let mut ids = category_service::descendant_ids(&state.orm, category_id).await?;
        ids.push(category_id);
        condition = condition.add(Column::CategoryId.is_in(ids));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }
    if query.featured.unwrap_or(false) {
        condition = condition.add(Column::IsFeatured.eq(true));
    }
    if query.bestseller.unwrap_or(false) {
        condition = condition.add(Column::IsBestseller.eq(true));
    }
    if query.on_sale.unwrap_or(false) {
        condition = condition.add(Column::IsOnSale.eq(true));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, slug: &str) -> AppResult<ApiResponse<Product>> {
    let result = Products::find()
        .filter(Column::Slug.eq(slug))
        .filter(Column::IsActive.eq(true))
        .one(&state.orm)
        .await?;
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Product",
        product_from_entity(result)?,
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if payload.stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    ensure_slug_free(&state.orm, &payload.slug, None).await?;

    let sections = serde_json::to_value(&payload.sections)
        .map_err(|e| AppError::Internal(e.into()))?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        slug: Set(payload.slug),
        description: Set(payload.description),
        category_id: Set(payload.category_id),
        price: Set(payload.price),
        compare_at_price: Set(payload.compare_at_price),
        stock: Set(payload.stock),
        sections: Set(sections),
        is_featured: Set(payload.is_featured),
        is_bestseller: Set(payload.is_bestseller),
        is_on_sale: Set(payload.is_on_sale),
        is_active: Set(payload.is_active),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    log_audit(
        state,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(slug) = payload.slug.as_ref() {
        ensure_slug_free(&state.orm, slug, Some(id)).await?;
    }

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(compare_at_price) = payload.compare_at_price {
        active.compare_at_price = Set(Some(compare_at_price));
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(AppError::BadRequest("stock must not be negative".into()));
        }
        active.stock = Set(stock);
    }
    if let Some(sections) = payload.sections {
        let value = serde_json::to_value(&sections)
            .map_err(|e| AppError::Internal(e.into()))?;
        active.sections = Set(value);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }
    if let Some(is_bestseller) = payload.is_bestseller {
        active.is_bestseller = Set(is_bestseller);
    }
    if let Some(is_on_sale) = payload.is_on_sale {
        active.is_on_sale = Set(is_on_sale);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }

    let product = active.update(&state.orm).await?;

    log_audit(
        state,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product)?,
        Some(Meta::empty()),
    ))
}

/// Product deletion is unconditional; no cascade beyond the row itself.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    log_audit(
        state,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(5);
    let (page, limit, offset) = query.pagination.normalize();

    let finder = Products::find()
        .filter(Column::Stock.lte(threshold))
        .order_by_asc(Column::Stock)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(meta),
    ))
}

async fn ensure_slug_free<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Products::find().filter(Column::Slug.eq(slug));
    if let Some(exclude) = exclude {
        finder = finder.filter(Column::Id.ne(exclude));
    }
    if finder.one(conn).await?.is_some() {
        return Err(AppError::BadRequest("slug is already taken".into()));
    }
    Ok(())
}

pub fn product_from_entity(model: ProductModel) -> AppResult<Product> {
    let sections: Vec<ProductSection> = serde_json::from_value(model.sections)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("corrupt product sections: {e}")))?;
    Ok(Product {
        id: model.id,
        name: model.name,
        slug: model.slug,
        description: model.description,
        category_id: model.category_id,
        price: model.price,
        compare_at_price: model.compare_at_price,
        stock: model.stock,
        sections,
        is_featured: model.is_featured,
        is_bestseller: model.is_bestseller,
        is_on_sale: model.is_on_sale,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
