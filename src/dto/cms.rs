use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Faq, Page};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePageRequest {
    pub slug: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePageRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageList {
    pub items: Vec<Page>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFaqRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFaqRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub sort_order: Option<i32>,
    pub is_published: Option<bool>,
}

/// Full ordered id list; applied as one transaction so a partial
/// reorder is never observable.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderFaqsRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FaqList {
    pub items: Vec<Faq>,
}
