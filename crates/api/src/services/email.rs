//! Transactional email.
//!
//! Uses SMTP via lettre with Askama HTML and plain-text templates. Without an
//! SMTP host configured, messages are logged instead of sent.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use emporium_core::{Email, OrderStatus};

use crate::config::EmailConfig;

/// SMTPS port; any other port upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
    verification_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
    verification_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    reset_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationEmailHtml<'a> {
    name: &'a str,
    order_number: &'a str,
    total: &'a Decimal,
    status: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationEmailText<'a> {
    name: &'a str,
    order_number: &'a str,
    total: &'a Decimal,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Clone)]
enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// No relay configured: log and drop.
    Disabled,
}

/// Mailer for the store's transactional emails.
#[derive(Clone)]
pub struct Mailer {
    transport: Transport,
    from_address: String,
}

impl Mailer {
    /// Create a mailer from configuration. `None` yields a log-only mailer.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: Option<&EmailConfig>) -> Result<Self, MailError> {
        let Some(config) = config else {
            return Ok(Self::disabled());
        };

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };
        let mut builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: Transport::Smtp(builder.build()),
            from_address: config.from.clone(),
        })
    }

    /// A mailer that only logs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            transport: Transport::Disabled,
            from_address: "Emporium <noreply@localhost>".to_string(),
        }
    }

    /// Whether messages actually leave the process.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self.transport, Transport::Smtp(_))
    }

    /// Send the welcome email with the email verification link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_welcome(
        &self,
        to: &Email,
        name: &str,
        verification_url: &str,
    ) -> Result<(), MailError> {
        let html = WelcomeEmailHtml {
            name,
            verification_url,
        }
        .render()?;
        let text = WelcomeEmailText {
            name,
            verification_url,
        }
        .render()?;

        self.send_multipart_email(to, "Welcome to Our E-commerce Store!", &text, &html)
            .await
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(
        &self,
        to: &Email,
        name: &str,
        reset_url: &str,
    ) -> Result<(), MailError> {
        let html = PasswordResetEmailHtml { name, reset_url }.render()?;
        let text = PasswordResetEmailText { name, reset_url }.render()?;

        self.send_multipart_email(to, "Password Reset Request", &text, &html)
            .await
    }

    /// Send an order confirmation.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &Email,
        name: &str,
        order_number: &str,
        total: &Decimal,
        status: OrderStatus,
    ) -> Result<(), MailError> {
        let html = OrderConfirmationEmailHtml {
            name,
            order_number,
            total,
            status: status.as_str(),
        }
        .render()?;
        let text = OrderConfirmationEmailText {
            name,
            order_number,
            total,
        }
        .render()?;

        let subject = format!("Order Confirmation - {order_number}");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &Email,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        let Transport::Smtp(mailer) = &self.transport else {
            tracing::info!(to = %to, subject = %subject, "Email delivery disabled, message dropped");
            return Ok(());
        };

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .as_str()
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_templates_carry_link() {
        let url = "http://localhost:3000/verify-email/abc123";
        let html = WelcomeEmailHtml {
            name: "Sam",
            verification_url: url,
        }
        .render()
        .unwrap();
        let text = WelcomeEmailText {
            name: "Sam",
            verification_url: url,
        }
        .render()
        .unwrap();

        assert!(html.contains("Welcome, Sam!"));
        assert!(html.contains("abc123"));
        assert!(text.contains(url));
    }

    #[test]
    fn test_html_templates_escape_names() {
        let html = PasswordResetEmailHtml {
            name: "<script>",
            reset_url: "http://localhost:3000/reset-password/t",
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("1 hour"));
    }

    #[test]
    fn test_order_confirmation_shows_total() {
        let total = Decimal::new(12_099, 2);
        let text = OrderConfirmationEmailText {
            name: "Sam",
            order_number: "ORD-1-ABC",
            total: &total,
        }
        .render()
        .unwrap();
        assert!(text.contains("ORD-1-ABC"));
        assert!(text.contains("$120.99"));
    }

    #[tokio::test]
    async fn test_disabled_mailer_succeeds_without_sending() {
        let mailer = Mailer::new(None).unwrap();
        assert!(!mailer.is_enabled());
        let to = Email::parse("shopper@example.com").unwrap();
        mailer
            .send_password_reset(&to, "Sam", "http://localhost:3000/reset-password/t")
            .await
            .unwrap();
    }
}
