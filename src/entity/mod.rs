pub mod addresses;
pub mod audit_logs;
pub mod cart_items;
pub mod categories;
pub mod coupons;
pub mod faqs;
pub mod order_items;
pub mod orders;
pub mod pages;
pub mod products;
pub mod reviews;
pub mod users;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use categories::Entity as Categories;
pub use coupons::Entity as Coupons;
pub use faqs::Entity as Faqs;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use pages::Entity as Pages;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
