use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub payment: PaymentConfig,
    pub checkout: CheckoutConfig,
    pub smtp: Option<SmtpConfig>,
    /// Recipient of new-order alerts. No alert is sent when unset.
    pub admin_email: Option<String>,
    /// Base URL used when building password-reset links.
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Orders at or above this amount (minor units, after discount) ship free.
    pub free_shipping_threshold: i64,
    pub shipping_flat_fee: i64,
    /// Tax rate in basis points, applied to the discounted subtotal.
    pub tax_rate_bps: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let payment = PaymentConfig {
            base_url: env::var("PAYMENT_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            key_id: env::var("PAYMENT_KEY_ID").unwrap_or_default(),
            key_secret: env::var("PAYMENT_KEY_SECRET").unwrap_or_default(),
        };

        let checkout = CheckoutConfig {
            free_shipping_threshold: env_i64("FREE_SHIPPING_THRESHOLD", 100_000),
            shipping_flat_fee: env_i64("SHIPPING_FLAT_FEE", 5_000),
            tax_rate_bps: env_i64("TAX_RATE_BPS", 0),
        };

        let smtp = match env::var("SMTP_HOST") {
            Ok(smtp_host) => Some(SmtpConfig {
                host: smtp_host,
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(587),
                username: env::var("SMTP_USERNAME").unwrap_or_default(),
                password: env::var("SMTP_PASSWORD").unwrap_or_default(),
                from_email: env::var("SMTP_FROM_EMAIL")
                    .unwrap_or_else(|_| "noreply@localhost".to_string()),
                from_name: env::var("SMTP_FROM_NAME")
                    .unwrap_or_else(|_| "Storefront".to_string()),
            }),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            payment,
            checkout,
            smtp,
            admin_email: env::var("ADMIN_ALERT_EMAIL").ok(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}
