use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::{config::PaymentConfig, error::AppError};

type HmacSha256 = Hmac<Sha256>;

/// Client for the payment gateway: creates gateway orders and verifies
/// signed payment callbacks.
#[derive(Clone)]
pub struct PaymentGateway {
    http: reqwest::Client,
    config: PaymentConfig,
}

#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
}

impl PaymentGateway {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Create a gateway-side order for `amount` minor units. The returned id
    /// is what the client hands to the payment widget.
    pub async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder, AppError> {
        let url = format!("{}/v1/orders", self.config.base_url);
        let body = serde_json::json!({
            "amount": amount,
            "currency": "INR",
            "receipt": receipt,
        });

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %text, "gateway order creation rejected");
            return Err(AppError::Gateway(format!(
                "gateway returned status {status}"
            )));
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;
        Ok(order)
    }

    /// Verify the callback signature: hex HMAC-SHA256 over
    /// `"{gateway_order_id}|{payment_id}"` keyed with the shared secret.
    /// Comparison is constant-time via `Mac::verify_slice`.
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let payload = format!("{gateway_order_id}|{payment_id}");
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.config.key_secret.as_bytes()) else {
            return false;
        };
        mac.update(payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    /// Sign a payload the way the gateway does; used by tests.
    pub fn sign(&self, gateway_order_id: &str, payment_id: &str) -> String {
        let payload = format!("{gateway_order_id}|{payment_id}");
        let mut mac = HmacSha256::new_from_slice(self.config.key_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> PaymentGateway {
        PaymentGateway::new(PaymentConfig {
            base_url: "http://localhost:0".into(),
            key_id: "rzp_test_key".into(),
            key_secret: "s3cret".into(),
        })
    }

    #[test]
    fn accepts_correct_signature() {
        let gw = gateway();
        let sig = gw.sign("order_abc", "pay_123");
        assert!(gw.verify_signature("order_abc", "pay_123", &sig));
    }

    #[test]
    fn rejects_tampered_payment_id() {
        let gw = gateway();
        let sig = gw.sign("order_abc", "pay_123");
        assert!(!gw.verify_signature("order_abc", "pay_999", &sig));
    }

    #[test]
    fn rejects_non_hex_signature() {
        let gw = gateway();
        assert!(!gw.verify_signature("order_abc", "pay_123", "not-hex!!"));
    }
}
