use axum::Router;

use crate::state::AppState;

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod cms;
pub mod coupons;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod reviews;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/account", account::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/coupons", coupons::router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
        .nest("/pages", cms::pages_router())
        .nest("/faqs", cms::faqs_router())
        .nest("/admin/categories", categories::admin_router())
        .nest("/admin/products", products::admin_router())
        .nest("/admin/coupons", coupons::admin_router())
        .nest("/admin/pages", cms::admin_pages_router())
        .nest("/admin/faqs", cms::admin_faqs_router())
        .nest("/admin", admin::router())
}
