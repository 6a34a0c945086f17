pub mod account;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod cms;
pub mod coupons;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod reviews;
