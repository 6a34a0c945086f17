use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Product, ProductSection};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: i64,
    pub compare_at_price: Option<i64>,
    pub stock: i32,
    #[serde(default)]
    pub sections: Vec<ProductSection>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub is_on_sale: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Absent leaves the category unchanged; explicit null detaches it.
    #[serde(default)]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    pub price: Option<i64>,
    pub compare_at_price: Option<i64>,
    pub stock: Option<i32>,
    pub sections: Option<Vec<ProductSection>>,
    pub is_featured: Option<bool>,
    pub is_bestseller: Option<bool>,
    pub is_on_sale: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

fn default_true() -> bool {
    true
}
