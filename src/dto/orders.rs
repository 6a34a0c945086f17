use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub address_id: Uuid,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelCheckoutRequest {
    /// True when the payment widget reported a failed attempt; false when the
    /// user dismissed it before attempting payment.
    #[serde(default)]
    pub attempted: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// What the storefront needs to open the payment widget.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub gateway_order_id: String,
    pub gateway_key_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelCheckoutResponse {
    /// True when the pending order row was deleted outright.
    pub deleted: bool,
    pub order: Option<Order>,
}
