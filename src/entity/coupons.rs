use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub code: String,
    /// "percentage" or "flat".
    pub kind: String,
    pub value: i64,
    pub min_order_value: Option<i64>,
    pub max_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub used_count: i32,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
