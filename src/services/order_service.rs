use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    config::CheckoutConfig,
    dto::orders::{
        CancelCheckoutRequest, CancelCheckoutResponse, CheckoutRequest, CheckoutResponse,
        ConfirmPaymentRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest,
    },
    entity::{
        addresses::{Column as AddressCol, Entity as Addresses},
        cart_items::{self, Column as CartCol, Entity as CartItems},
        coupons::{Column as CouponCol, Entity as Coupons},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProdCol, Entity as Products},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    mail,
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::coupon_service,
    state::AppState,
};

/// Derived money fields for an order. Maintains the invariant
/// `total = subtotal - discount + tax + shipping`.
#[derive(Debug, PartialEq, Eq)]
pub struct OrderTotals {
    pub tax_amount: i64,
    pub shipping_fee: i64,
    pub total: i64,
}

pub fn price_order(subtotal: i64, discount: i64, config: &CheckoutConfig) -> OrderTotals {
    let discounted = subtotal - discount;
    let tax_amount = discounted * config.tax_rate_bps / 10_000;
    let shipping_fee = if discounted >= config.free_shipping_threshold {
        0
    } else {
        config.shipping_flat_fee
    };
    OrderTotals {
        tax_amount,
        shipping_fee,
        total: subtotal - discount + tax_amount + shipping_fee,
    }
}

fn build_order_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("ORD-{}-{}", date, short)
}

#[derive(Debug, FromQueryResult)]
struct CartProductRow {
    product_id: Uuid,
    quantity: i32,
    product_name: String,
    price: i64,
    stock: i32,
    is_active: bool,
}

/// Build an order from the user's cart: recompute prices server-side,
/// validate the coupon, snapshot the address, reserve stock, and register the
/// order with the payment gateway. The order starts out PENDING/PENDING.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let address = Addresses::find()
        .filter(
            Condition::all()
                .add(AddressCol::Id.eq(payload.address_id))
                .add(AddressCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    let address = match address {
        Some(a) => a,
        None => return Err(AppError::BadRequest("address not found".into())),
    };
    let address_snapshot = serde_json::json!({
        "recipient": address.recipient,
        "line1": address.line1,
        "line2": address.line2,
        "city": address.city,
        "state": address.state,
        "postal_code": address.postal_code,
        "phone": address.phone,
    });

    let txn = state.orm.begin().await?;

    let rows = CartItems::find()
        .select_only()
        .column_as(CartCol::ProductId, "product_id")
        .column_as(CartCol::Quantity, "quantity")
        .column_as(ProdCol::Name, "product_name")
        .column_as(ProdCol::Price, "price")
        .column_as(ProdCol::Stock, "stock")
        .column_as(ProdCol::IsActive, "is_active")
        .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .into_model::<CartProductRow>()
        .all(&txn)
        .await?;

    if rows.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut subtotal: i64 = 0;
    for row in &rows {
        if row.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        if !row.is_active {
            return Err(AppError::BadRequest(format!(
                "Product {} is no longer available",
                row.product_name
            )));
        }
        if row.stock < row.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                row.product_name
            )));
        }
        subtotal += row.price * (row.quantity as i64);
    }

    // Coupons are validated server-side; client-supplied discounts are never trusted.
    let (coupon_code, discount) = match payload.coupon_code.as_deref() {
        Some(code) if !code.trim().is_empty() => {
            let (coupon, discount) =
                coupon_service::validate_for_user(&txn, user.user_id, code, subtotal).await?;
            (Some(coupon.code), discount)
        }
        _ => (None, 0),
    };

    let totals = price_order(subtotal, discount, &state.config.checkout);

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        order_number: Set(build_order_number(order_id)),
        user_id: Set(user.user_id),
        status: Set(OrderStatus::Pending.as_str().into()),
        payment_status: Set(PaymentStatus::Pending.as_str().into()),
        subtotal: Set(subtotal),
        discount: Set(discount),
        tax_amount: Set(totals.tax_amount),
        shipping_fee: Set(totals.shipping_fee),
        total: Set(totals.total),
        coupon_code: Set(coupon_code),
        shipping_address: Set(address_snapshot),
        gateway_order_id: Set(None),
        gateway_payment_id: Set(None),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::new();
    for row in &rows {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(row.product_id),
            product_name: Set(row.product_name.clone()),
            unit_price: Set(row.price),
            quantity: Set(row.quantity),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        order_items.push(order_item_from_entity(item));

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(row.quantity))
            .filter(ProdCol::Id.eq(row.product_id))
            .exec(&txn)
            .await?;
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    // Gateway registration happens after commit. If it fails, the pending
    // order never represented a payment attempt, so undo it entirely.
    let gateway_order = match state
        .gateway
        .create_order(order.total, &order.order_number)
        .await
    {
        Ok(go) => go,
        Err(err) => {
            if let Err(undo_err) = undo_pending_order(state, order.id).await {
                tracing::error!(
                    order_id = %order.id,
                    error = %undo_err,
                    "failed to undo order after gateway error"
                );
            }
            return Err(err);
        }
    };

    let mut active: OrderActive = order.into();
    active.gateway_order_id = Set(Some(gateway_order.id.clone()));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    log_audit(
        state,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout initiated",
        CheckoutResponse {
            order: order_from_entity(order),
            items: order_items,
            gateway_order_id: gateway_order.id,
            gateway_key_id: state.config.payment.key_id.clone(),
        },
        Some(Meta::empty()),
    ))
}

/// Verify the gateway callback and settle the order. A verified signature
/// moves the order to PROCESSING/paid; a mismatch records a failed attempt
/// and leaves the order unpaid.
pub async fn confirm_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ConfirmPaymentRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.payment_status == PaymentStatus::Success.as_str() {
        return Err(AppError::BadRequest("Order already paid".into()));
    }
    if order.gateway_order_id.as_deref() != Some(payload.gateway_order_id.as_str()) {
        return Err(AppError::BadRequest("gateway order mismatch".into()));
    }

    let verified = state.gateway.verify_signature(
        &payload.gateway_order_id,
        &payload.gateway_payment_id,
        &payload.signature,
    );

    if !verified {
        // Expected outcome, not an exception: keep the order for support
        // visibility, leave it unpaid.
        let mut active: OrderActive = order.into();
        active.payment_status = Set(PaymentStatus::Failed.as_str().into());
        active.status = Set(OrderStatus::Failed.as_str().into());
        active.gateway_payment_id = Set(Some(payload.gateway_payment_id.clone()));
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&txn).await?;
        txn.commit().await?;

        tracing::warn!(order_id = %order.id, "payment signature verification failed");
        return Err(AppError::BadRequest(
            "payment signature verification failed".into(),
        ));
    }

    let coupon_code = order.coupon_code.clone();
    let mut active: OrderActive = order.into();
    active.payment_status = Set(PaymentStatus::Success.as_str().into());
    active.status = Set(OrderStatus::Processing.as_str().into());
    active.gateway_payment_id = Set(Some(payload.gateway_payment_id.clone()));
    active.paid_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    if let Some(code) = coupon_code {
        Coupons::update_many()
            .col_expr(
                CouponCol::UsedCount,
                Expr::col(CouponCol::UsedCount).add(1),
            )
            .filter(CouponCol::Code.eq(code))
            .exec(&txn)
            .await?;
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    txn.commit().await?;

    let order = order_from_entity(order);
    send_order_emails(state, &order).await;

    log_audit(
        state,
        Some(user.user_id),
        "payment_confirmed",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Wind down an unpaid checkout. A dismissal before any payment attempt
/// deletes the pending order outright; a failed attempt keeps the order,
/// marked FAILED, for audit and support visibility.
pub async fn cancel_checkout(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CancelCheckoutRequest,
) -> AppResult<ApiResponse<CancelCheckoutResponse>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.payment_status != PaymentStatus::Pending.as_str() {
        return Err(AppError::BadRequest(
            "only pending orders can be cancelled".into(),
        ));
    }

    if payload.attempted {
        let mut active: OrderActive = order.into();
        active.payment_status = Set(PaymentStatus::Failed.as_str().into());
        active.status = Set(OrderStatus::Failed.as_str().into());
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&txn).await?;
        txn.commit().await?;

        return Ok(ApiResponse::success(
            "Order marked as failed",
            CancelCheckoutResponse {
                deleted: false,
                order: Some(order_from_entity(order)),
            },
            Some(Meta::empty()),
        ));
    }

    restore_stock(&txn, order.id).await?;
    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(order.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Checkout abandoned, order removed",
        CancelCheckoutResponse {
            deleted: true,
            order: None,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    list_with_condition(state, condition, query).await
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    list_with_condition(state, Condition::all(), query).await
}

async fn list_with_condition(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        if OrderStatus::parse(status).is_none() {
            return Err(AppError::BadRequest("Invalid order status".into()));
        }
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    order_with_items(state, order).await
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    order_with_items(state, order).await
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    if OrderStatus::parse(&payload.status).is_none() {
        return Err(AppError::BadRequest("Invalid order status".into()));
    }

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    log_audit(
        state,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

async fn order_with_items(
    state: &AppState,
    order: OrderModel,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Compensate a pending order that never reached the gateway: put the
/// reserved stock back, reinstate the cart from the order-item snapshots,
/// and remove the order rows.
async fn undo_pending_order(state: &AppState, order_id: Uuid) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    let order = match Orders::find_by_id(order_id).one(&txn).await? {
        Some(o) => o,
        None => return Ok(()),
    };
    restore_stock(&txn, order_id).await?;
    restore_cart(&txn, order.user_id, order_id).await?;
    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(order_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Put the order's lines back into the user's cart so a gateway outage does
/// not empty it. The user may have re-added items meanwhile, so upsert.
async fn restore_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    order_id: Uuid,
) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    for item in items {
        let line = cart_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            created_at: NotSet,
        };
        CartItems::insert(line)
            .on_conflict(
                OnConflict::columns([CartCol::UserId, CartCol::ProductId])
                    .update_column(CartCol::Quantity)
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }
    Ok(())
}

async fn restore_stock<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    for item in items {
        Products::update_many()
            .col_expr(
                ProdCol::Stock,
                Expr::col(ProdCol::Stock).add(item.quantity),
            )
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

async fn send_order_emails(state: &AppState, order: &Order) {
    match Users::find_by_id(order.user_id).one(&state.orm).await {
        Ok(Some(customer)) => {
            state
                .mailer
                .send_detached(mail::order_confirmation(&customer.email, order));
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "failed to load customer for email"),
    }
    if let Some(admin_email) = &state.config.admin_email {
        state
            .mailer
            .send_detached(mail::admin_new_order_alert(admin_email, order));
    }
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        order_number: model.order_number,
        user_id: model.user_id,
        status: model.status,
        payment_status: model.payment_status,
        subtotal: model.subtotal,
        discount: model.discount,
        tax_amount: model.tax_amount,
        shipping_fee: model.shipping_fee,
        total: model.total,
        coupon_code: model.coupon_code,
        shipping_address: model.shipping_address,
        gateway_order_id: model.gateway_order_id,
        gateway_payment_id: model.gateway_payment_id,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        unit_price: model.unit_price,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: i64, fee: i64, tax_bps: i64) -> CheckoutConfig {
        CheckoutConfig {
            free_shipping_threshold: threshold,
            shipping_flat_fee: fee,
            tax_rate_bps: tax_bps,
        }
    }

    #[test]
    fn total_holds_the_order_invariant() {
        let cfg = config(100_000, 5_000, 1_800);
        for (subtotal, discount) in [(50_000, 0), (120_000, 20_000), (100_000, 100_000)] {
            let totals = price_order(subtotal, discount, &cfg);
            assert_eq!(
                totals.total,
                subtotal - discount + totals.tax_amount + totals.shipping_fee
            );
        }
    }

    #[test]
    fn shipping_is_free_at_the_threshold() {
        let cfg = config(100_000, 5_000, 0);
        assert_eq!(price_order(100_000, 0, &cfg).shipping_fee, 0);
        assert_eq!(price_order(99_999, 0, &cfg).shipping_fee, 5_000);
        // The threshold applies to the discounted amount.
        assert_eq!(price_order(110_000, 20_000, &cfg).shipping_fee, 5_000);
    }

    #[test]
    fn tax_applies_to_the_discounted_subtotal() {
        let cfg = config(0, 0, 1_000);
        let totals = price_order(10_000, 2_000, &cfg);
        assert_eq!(totals.tax_amount, 800);
        assert_eq!(totals.total, 8_800);
    }

    #[test]
    fn order_number_embeds_the_date() {
        let id = Uuid::new_v4();
        let number = build_order_number(id);
        assert!(number.starts_with("ORD-"));
        assert!(number.ends_with(&id.to_string()[..8]));
    }
}
