use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use uuid::Uuid;

use storefront_api::{
    config::{AppConfig, CheckoutConfig, PaymentConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        account::UpsertAddressRequest,
        cart::{AddToCartRequest, UpdateCartItemRequest},
        cms::{CreateFaqRequest, ReorderFaqsRequest},
        coupons::CreateCouponRequest,
        orders::{
            CancelCheckoutRequest, CheckoutRequest, ConfirmPaymentRequest,
            UpdateOrderStatusRequest,
        },
        reviews::CreateReviewRequest,
    },
    entity::{
        Coupons, Products,
        categories::ActiveModel as CategoryActive,
        order_items::ActiveModel as OrderItemActive,
        orders::ActiveModel as OrderActive,
        products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    mail::Mailer,
    middleware::auth::AuthUser,
    models::CouponKind,
    payment::PaymentGateway,
    services::{
        account_service, cart_service, category_service, cms_service, coupon_service,
        dashboard_service, order_service, review_service,
    },
    state::AppState,
};

// Full storefront flow against a real database: cart -> checkout (gateway down,
// order undone) -> payment confirmation -> dashboard; then category deletion,
// FAQ reorder and review rules.
#[tokio::test]
async fn storefront_end_to_end_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "user@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;
    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };
    let auth_admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test Widget".into()),
        slug: Set("test-widget".into()),
        description: Set(Some("A product for testing".into())),
        category_id: Set(None),
        price: Set(1_000),
        compare_at_price: Set(None),
        stock: Set(10),
        sections: Set(serde_json::json!([])),
        is_featured: Set(false),
        is_bestseller: Set(false),
        is_on_sale: Set(false),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let address = account_service::create_address(
        &state,
        &auth_user,
        UpsertAddressRequest {
            label: Some("Home".into()),
            recipient: "Test User".into(),
            line1: "1 Main St".into(),
            line2: None,
            city: "Springfield".into(),
            state: "IL".into(),
            postal_code: "62701".into(),
            phone: "5551234".into(),
            is_default: true,
        },
    )
    .await?
    .data
    .unwrap();

    // 10% off capped at 150 minor units.
    coupon_service::create_coupon(
        &state,
        &auth_admin,
        CreateCouponRequest {
            code: "save10".into(),
            kind: CouponKind::Percentage,
            value: 10,
            min_order_value: None,
            max_discount: Some(150),
            usage_limit: None,
            per_user_limit: None,
            expires_at: None,
            is_active: true,
        },
    )
    .await?;

    cart_service::add_to_cart(
        &state,
        &auth_user,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;

    // The gateway is unreachable, so checkout must fail and compensate:
    // the pending order disappears and the reserved stock comes back.
    let result = order_service::checkout(
        &state,
        &auth_user,
        CheckoutRequest {
            address_id: address.id,
            coupon_code: Some("SAVE10".into()),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Gateway(_))));

    let restocked = Products::find_by_id(product.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(restocked.stock, 10);
    let orders = order_service::list_orders(&state, &auth_user, default_order_query()).await?;
    assert!(orders.data.unwrap().items.is_empty());

    // The cart is reinstated too; a gateway outage must not empty it.
    let cart = cart_service::list_cart(&state, &auth_user, default_pagination())
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product.id, product.id);
    assert_eq!(cart.items[0].quantity, 2);
    cart_service::clear_cart(&state, &auth_user).await?;

    // Simulate a checkout that reached the gateway: pending order, stock held.
    let order = insert_pending_order(&state, user_id, product.id, 2, "order_test_1").await?;
    assert_eq!(order.total, 6_850); // 2000 - 150 + 5000 shipping

    // A bad signature records a failed attempt but keeps the order.
    let result = order_service::confirm_payment(
        &state,
        &auth_user,
        order.id,
        ConfirmPaymentRequest {
            gateway_order_id: "order_test_1".into(),
            gateway_payment_id: "pay_1".into(),
            signature: "deadbeef".into(),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    let failed = order_service::get_order(&state, &auth_user, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(failed.order.status, "failed");

    // Retrying with the correct signature settles the order.
    let signature = state.gateway.sign("order_test_1", "pay_1");
    let paid = order_service::confirm_payment(
        &state,
        &auth_user,
        order.id,
        ConfirmPaymentRequest {
            gateway_order_id: "order_test_1".into(),
            gateway_payment_id: "pay_1".into(),
            signature,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(paid.order.status, "processing");
    assert_eq!(paid.order.payment_status, "success");
    assert!(paid.order.paid_at.is_some());

    let coupon = Coupons::find()
        .one(&state.orm)
        .await?
        .expect("seeded coupon");
    assert_eq!(coupon.used_count, 1);

    let stats = dashboard_service::stats(&state, &auth_admin)
        .await?
        .data
        .unwrap();
    assert_eq!(stats.today.order_count, 1);
    assert_eq!(stats.today.revenue, 6_850);

    let shipped = order_service::update_order_status(
        &state,
        &auth_admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await?;
    assert_eq!(shipped.data.unwrap().status, "shipped");

    // Dismissing the widget before paying deletes the order and frees stock.
    let pending = insert_pending_order(&state, user_id, product.id, 3, "order_test_2").await?;
    let before = Products::find_by_id(product.id)
        .one(&state.orm)
        .await?
        .unwrap()
        .stock;
    let cancelled = order_service::cancel_checkout(
        &state,
        &auth_user,
        pending.id,
        CancelCheckoutRequest { attempted: false },
    )
    .await?
    .data
    .unwrap();
    assert!(cancelled.deleted);
    let after = Products::find_by_id(product.id)
        .one(&state.orm)
        .await?
        .unwrap()
        .stock;
    assert_eq!(after, before + 3);

    // A failed payment attempt keeps the order around, marked failed.
    let pending = insert_pending_order(&state, user_id, product.id, 1, "order_test_3").await?;
    let kept = order_service::cancel_checkout(
        &state,
        &auth_user,
        pending.id,
        CancelCheckoutRequest { attempted: true },
    )
    .await?
    .data
    .unwrap();
    assert!(!kept.deleted);
    assert_eq!(kept.order.unwrap().status, "failed");

    category_deletion_checks(&state, &auth_admin, &auth_user).await?;
    faq_reorder_checks(&state, &auth_admin).await?;
    review_checks(&state, &auth_user, product.id).await?;
    cart_clamp_checks(&state, &auth_user).await?;

    Ok(())
}

fn default_pagination() -> storefront_api::routes::params::Pagination {
    storefront_api::routes::params::Pagination {
        page: None,
        per_page: None,
    }
}

fn default_order_query() -> storefront_api::routes::params::OrderListQuery {
    storefront_api::routes::params::OrderListQuery {
        pagination: default_pagination(),
        status: None,
        sort_order: None,
    }
}

async fn category_deletion_checks(
    state: &AppState,
    auth_admin: &AuthUser,
    _auth_user: &AuthUser,
) -> anyhow::Result<()> {
    let parent = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set("Clothing".into()),
        slug: Set("clothing".into()),
        parent_id: Set(None),
        sort_order: Set(0),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let child = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set("Shirts".into()),
        slug: Set("shirts".into()),
        parent_id: Set(Some(parent.id)),
        sort_order: Set(0),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let shirt = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Plain Shirt".into()),
        slug: Set("plain-shirt".into()),
        description: Set(None),
        category_id: Set(Some(child.id)),
        price: Set(2_000),
        compare_at_price: Set(None),
        stock: Set(5),
        sections: Set(serde_json::json!([])),
        is_featured: Set(false),
        is_bestseller: Set(false),
        is_on_sale: Set(false),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let impact = category_service::get_deletion_impact(state, auth_admin, parent.id)
        .await?
        .data
        .unwrap();
    assert_eq!(impact.descendant_count, 1);
    assert_eq!(impact.total_product_count, 1);

    // Deleting a non-empty subtree without confirming is rejected with the impact.
    let result = category_service::delete_category(
        state,
        auth_admin,
        parent.id,
        storefront_api::dto::categories::DeleteCategoryQuery {
            move_products_to_uncategorized: false,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Confirmation { .. })));

    category_service::delete_category(
        state,
        auth_admin,
        parent.id,
        storefront_api::dto::categories::DeleteCategoryQuery {
            move_products_to_uncategorized: true,
        },
    )
    .await?;

    let orphaned = Products::find_by_id(shirt.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(orphaned.category_id, None);

    Ok(())
}

async fn faq_reorder_checks(state: &AppState, auth_admin: &AuthUser) -> anyhow::Result<()> {
    let first = cms_service::create_faq(
        state,
        auth_admin,
        CreateFaqRequest {
            question: "First?".into(),
            answer: "Yes.".into(),
            sort_order: 0,
            is_published: true,
        },
    )
    .await?
    .data
    .unwrap();
    let second = cms_service::create_faq(
        state,
        auth_admin,
        CreateFaqRequest {
            question: "Second?".into(),
            answer: "Also yes.".into(),
            sort_order: 1,
            is_published: true,
        },
    )
    .await?
    .data
    .unwrap();

    let reordered = cms_service::reorder_faqs(
        state,
        auth_admin,
        ReorderFaqsRequest {
            ids: vec![second.id, first.id],
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(reordered.items[0].id, second.id);
    assert_eq!(reordered.items[1].id, first.id);

    Ok(())
}

async fn review_checks(
    state: &AppState,
    auth_user: &AuthUser,
    product_id: Uuid,
) -> anyhow::Result<()> {
    review_service::create_review(
        state,
        auth_user,
        product_id,
        CreateReviewRequest {
            rating: 4,
            comment: Some("Solid widget".into()),
        },
    )
    .await?;

    // One review per user per product.
    let duplicate = review_service::create_review(
        state,
        auth_user,
        product_id,
        CreateReviewRequest {
            rating: 5,
            comment: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let list = review_service::list_reviews(state, product_id)
        .await?
        .data
        .unwrap();
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.average_rating, Some(4.0));

    Ok(())
}

async fn cart_clamp_checks(state: &AppState, auth_user: &AuthUser) -> anyhow::Result<()> {
    let gadget = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test Gadget".into()),
        slug: Set("test-gadget".into()),
        description: Set(None),
        category_id: Set(None),
        price: Set(500),
        compare_at_price: Set(None),
        stock: Set(3),
        sections: Set(serde_json::json!([])),
        is_featured: Set(false),
        is_bestseller: Set(false),
        is_on_sale: Set(false),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Requests beyond stock are clamped to what is available.
    cart_service::add_to_cart(
        state,
        auth_user,
        AddToCartRequest {
            product_id: gadget.id,
            quantity: 5,
        },
    )
    .await?;
    let cart = cart_service::list_cart(state, auth_user, default_pagination())
        .await?
        .data
        .unwrap();
    let line = cart
        .items
        .iter()
        .find(|i| i.product.id == gadget.id)
        .expect("cart line");
    assert_eq!(line.quantity, 3);

    // The stock sells out elsewhere; updating the line removes it rather
    // than keeping a zero-quantity row that would poison checkout.
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_sql_and_values(
            backend,
            "UPDATE products SET stock = 0 WHERE id = $1",
            [gadget.id.into()],
        ))
        .await?;
    let updated = cart_service::update_cart_item(
        state,
        auth_user,
        gadget.id,
        UpdateCartItemRequest { quantity: 2 },
    )
    .await?;
    assert!(updated.data.unwrap().is_none());
    let cart = cart_service::list_cart(state, auth_user, default_pagination())
        .await?
        .data
        .unwrap();
    assert!(cart.items.iter().all(|i| i.product.id != gadget.id));

    Ok(())
}

async fn insert_pending_order(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    gateway_order_id: &str,
) -> anyhow::Result<storefront_api::entity::orders::Model> {
    let subtotal = 1_000 * quantity as i64;
    let discount = if quantity == 2 { 150 } else { 0 };
    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        order_number: Set(format!("ORD-TEST-{}", &order_id.to_string()[..8])),
        user_id: Set(user_id),
        status: Set("pending".into()),
        payment_status: Set("pending".into()),
        subtotal: Set(subtotal),
        discount: Set(discount),
        tax_amount: Set(0),
        shipping_fee: Set(5_000),
        total: Set(subtotal - discount + 5_000),
        coupon_code: Set(if discount > 0 {
            Some("SAVE10".into())
        } else {
            None
        }),
        shipping_address: Set(serde_json::json!({ "line1": "1 Main St" })),
        gateway_order_id: Set(Some(gateway_order_id.into())),
        gateway_payment_id: Set(None),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        product_id: Set(product_id),
        product_name: Set("Test Widget".into()),
        unit_price: Set(1_000),
        quantity: Set(quantity),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Mimic the stock hold checkout takes.
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_sql_and_values(
            backend,
            "UPDATE products SET stock = stock - $1 WHERE id = $2",
            [quantity.into(), product_id.into()],
        ))
        .await?;

    Ok(order)
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&pool).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_items, reviews, addresses, coupons, \
         audit_logs, products, categories, pages, faqs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let payment = PaymentConfig {
        // Nothing listens here; gateway calls must fail fast.
        base_url: "http://127.0.0.1:1".into(),
        key_id: "rzp_test_key".into(),
        key_secret: "s3cret".into(),
    };
    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        payment: payment.clone(),
        checkout: CheckoutConfig {
            free_shipping_threshold: 100_000,
            shipping_flat_fee: 5_000,
            tax_rate_bps: 0,
        },
        smtp: None,
        admin_email: None,
        public_base_url: "http://localhost:3000".into(),
    };

    Ok(AppState {
        pool,
        orm,
        gateway: PaymentGateway::new(payment),
        mailer: Mailer::new(None)?,
        config,
    })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        name: Set("Test User".into()),
        role: Set(role.into()),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
