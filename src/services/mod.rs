pub mod account_service;
pub mod auth_service;
pub mod cart_service;
pub mod category_service;
pub mod cms_service;
pub mod coupon_service;
pub mod dashboard_service;
pub mod order_service;
pub mod product_service;
pub mod review_service;
