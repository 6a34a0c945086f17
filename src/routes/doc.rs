use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        account::{AddressList, UpdateProfileRequest, UpsertAddressRequest},
        auth::{ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        categories::{CategoryList, CategoryTree, CreateCategoryRequest, UpdateCategoryRequest},
        cms::{
            CreateFaqRequest, CreatePageRequest, FaqList, PageList, ReorderFaqsRequest,
            UpdateFaqRequest, UpdatePageRequest,
        },
        coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest, ValidateCouponResponse},
        dashboard::{DashboardStats, TopProduct, TopProductList, WindowStats},
        orders::{
            CancelCheckoutRequest, CancelCheckoutResponse, CheckoutRequest, CheckoutResponse,
            ConfirmPaymentRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        reviews::{CreateReviewRequest, ReviewList},
    },
    models::{
        Address, Category, CategoryNode, Coupon, CouponKind, DeletionImpact, Faq, Order,
        OrderItem, OrderStatus, Page, PaymentStatus, Product, ProductSection, Review, SpecRow,
        User,
    },
    response::{ApiResponse, Meta},
    routes::{
        account, admin, auth, cart, categories, cms, coupons, health, orders, params, products,
        reviews,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::forgot_password,
        auth::reset_password,
        account::get_profile,
        account::update_profile,
        account::list_addresses,
        account::create_address,
        account::update_address,
        account::delete_address,
        categories::list_categories,
        categories::get_category,
        categories::list_categories_admin,
        categories::create_category,
        categories::update_category,
        categories::get_deletion_impact,
        categories::delete_category,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_low_stock,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        coupons::validate_coupon,
        coupons::list_coupons,
        coupons::create_coupon,
        coupons::update_coupon,
        coupons::delete_coupon,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::confirm_payment,
        orders::cancel_checkout,
        reviews::list_reviews,
        reviews::create_review,
        reviews::delete_review,
        cms::get_page,
        cms::list_faqs,
        cms::list_pages_admin,
        cms::create_page,
        cms::update_page,
        cms::delete_page,
        cms::list_faqs_admin,
        cms::create_faq,
        cms::update_faq,
        cms::reorder_faqs,
        cms::delete_faq,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::dashboard_stats,
        admin::top_products,
    ),
    components(
        schemas(
            User,
            Category,
            CategoryNode,
            DeletionImpact,
            Product,
            ProductSection,
            SpecRow,
            Order,
            OrderItem,
            OrderStatus,
            PaymentStatus,
            Coupon,
            CouponKind,
            Review,
            Address,
            Page,
            Faq,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            UpdateProfileRequest,
            UpsertAddressRequest,
            AddressList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CategoryTree,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CreateCouponRequest,
            UpdateCouponRequest,
            ValidateCouponRequest,
            ValidateCouponResponse,
            CouponList,
            CheckoutRequest,
            CheckoutResponse,
            ConfirmPaymentRequest,
            CancelCheckoutRequest,
            CancelCheckoutResponse,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            CreateReviewRequest,
            ReviewList,
            CreatePageRequest,
            UpdatePageRequest,
            PageList,
            CreateFaqRequest,
            UpdateFaqRequest,
            ReorderFaqsRequest,
            FaqList,
            WindowStats,
            DashboardStats,
            TopProduct,
            TopProductList,
            params::Pagination,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartList>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<DashboardStats>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Account", description = "Profile and address book"),
        (name = "Categories", description = "Category tree"),
        (name = "Products", description = "Product catalog"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Coupons", description = "Discount codes"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Cms", description = "Pages and FAQs"),
        (name = "Admin", description = "Back office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
