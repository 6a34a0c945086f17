use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::config::SmtpConfig;
use crate::models::Order;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
}

/// Transactional mail sender. Delivery is fire-and-forget: callers spawn
/// `send` and failures are logged, never surfaced to the request.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_email: String,
    from_name: String,
}

impl Mailer {
    pub fn new(config: Option<&SmtpConfig>) -> anyhow::Result<Self> {
        match config {
            Some(smtp) => {
                let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
                let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                    .map_err(|e| anyhow::anyhow!("failed to create SMTP transport: {e}"))?
                    .port(smtp.port)
                    .credentials(creds)
                    .build();
                Ok(Self {
                    transport: Some(transport),
                    from_email: smtp.from_email.clone(),
                    from_name: smtp.from_name.clone(),
                })
            }
            None => Ok(Self {
                transport: None,
                from_email: "noreply@localhost".into(),
                from_name: "Storefront".into(),
            }),
        }
    }

    /// Spawn a best-effort delivery of `message`.
    pub fn send_detached(&self, message: EmailMessage) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(err) = mailer.send(message).await {
                tracing::warn!(error = %err, "transactional email failed");
            }
        });
    }

    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        let Some(transport) = &self.transport else {
            tracing::debug!(to = %message.to, subject = %message.subject, "SMTP not configured, dropping email");
            return Ok(());
        };

        let from_address = format!("{} <{}>", self.from_name, self.from_email);
        let email = Message::builder()
            .from(
                from_address
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid from address: {e}"))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid to address: {e}"))?)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.body_text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.body_html.clone()),
                    ),
            )
            .map_err(|e| anyhow::anyhow!("failed to build email: {e}"))?;

        transport
            .send(email)
            .await
            .map_err(|e| anyhow::anyhow!("failed to send email via SMTP: {e}"))?;
        Ok(())
    }
}

pub fn order_confirmation(to: &str, order: &Order) -> EmailMessage {
    let amount = format_amount(order.total);
    EmailMessage {
        to: to.to_string(),
        subject: format!("Order {} confirmed", order.order_number),
        body_html: format!(
            "<h1>Thanks for your order!</h1>\
             <p>Order <strong>{}</strong> has been paid.</p>\
             <p>Total: <strong>{amount}</strong></p>",
            order.order_number
        ),
        body_text: format!(
            "Thanks for your order!\nOrder {} has been paid.\nTotal: {amount}\n",
            order.order_number
        ),
    }
}

pub fn admin_new_order_alert(to: &str, order: &Order) -> EmailMessage {
    let amount = format_amount(order.total);
    EmailMessage {
        to: to.to_string(),
        subject: format!("New paid order {}", order.order_number),
        body_html: format!(
            "<p>Order <strong>{}</strong> was paid: {amount}.</p>",
            order.order_number
        ),
        body_text: format!("Order {} was paid: {amount}.\n", order.order_number),
    }
}

pub fn password_reset(to: &str, reset_link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your password".into(),
        body_html: format!(
            "<p>Someone requested a password reset for this account.</p>\
             <p><a href=\"{reset_link}\">Reset password</a></p>\
             <p>If this wasn't you, ignore this email.</p>"
        ),
        body_text: format!(
            "Someone requested a password reset for this account.\n\
             Reset link: {reset_link}\n\
             If this wasn't you, ignore this email.\n"
        ),
    }
}

fn format_amount(minor_units: i64) -> String {
    format!("{}.{:02}", minor_units / 100, (minor_units % 100).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_formats_minor_units() {
        assert_eq!(format_amount(123456), "1234.56");
        assert_eq!(format_amount(5), "0.05");
    }
}
