//! Transactional email: newsletter welcome and order confirmation.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain-text templates.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use wovry_core::{CurrencyCode, Email, Order, Price};

use crate::config::EmailConfig;

/// Brand name used in subjects and signatures.
pub const BRAND: &str = "Knit & Purl";

/// Subject of the newsletter welcome message.
pub const WELCOME_SUBJECT: &str = "Welcome to the Knit & Purl Family!";

/// HTML template for the newsletter welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    brand: &'a str,
    storefront_url: &'a str,
}

/// Plain text template for the newsletter welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    brand: &'a str,
    storefront_url: &'a str,
}

/// One rendered order line.
struct ConfirmationLine {
    name: String,
    quantity: u32,
    amount: String,
}

/// HTML template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    brand: &'a str,
    customer_name: &'a str,
    order_id: String,
    lines: &'a [ConfirmationLine],
    total: String,
    shipping_address: String,
}

/// Plain text template for the order confirmation email.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    brand: &'a str,
    customer_name: &'a str,
    order_id: String,
    lines: &'a [ConfirmationLine],
    total: String,
    shipping_address: String,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
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

/// Sends the storefront's transactional messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Greet a new newsletter subscriber.
    async fn send_welcome(&self, to: &Email) -> Result<(), EmailError>;

    /// Confirm a paid order to the customer.
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), EmailError>;
}

/// Rendered message bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Render the welcome message.
///
/// # Errors
///
/// Returns [`EmailError::Template`] if a template fails to render.
pub fn render_welcome(storefront_url: &str) -> Result<RenderedEmail, EmailError> {
    Ok(RenderedEmail {
        subject: WELCOME_SUBJECT.to_string(),
        html: WelcomeEmailHtml {
            brand: BRAND,
            storefront_url,
        }
        .render()?,
        text: WelcomeEmailText {
            brand: BRAND,
            storefront_url,
        }
        .render()?,
    })
}

/// Render the order confirmation message.
///
/// # Errors
///
/// Returns [`EmailError::Template`] if a template fails to render.
pub fn render_order_confirmation(
    order: &Order,
    currency: CurrencyCode,
) -> Result<RenderedEmail, EmailError> {
    let lines: Vec<ConfirmationLine> = order
        .items
        .iter()
        .map(|item| ConfirmationLine {
            name: item.name.clone(),
            quantity: item.quantity,
            amount: item
                .line_total()
                .map(|amount| Price::new(amount, currency).to_string())
                .unwrap_or_default(),
        })
        .collect();

    let info = &order.customer_info;
    let shipping_address = [
        info.address.as_str(),
        info.city.as_str(),
        info.state.as_str(),
        info.zip.as_str(),
    ]
    .iter()
    .map(|part| part.trim())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ");

    let order_id = order.id.to_string();
    let total = Price::new(order.total, currency).to_string();

    Ok(RenderedEmail {
        subject: format!("Your {BRAND} order is confirmed"),
        html: OrderConfirmationHtml {
            brand: BRAND,
            customer_name: &info.name,
            order_id: order_id.clone(),
            lines: &lines,
            total: total.clone(),
            shipping_address: shipping_address.clone(),
        }
        .render()?,
        text: OrderConfirmationText {
            brand: BRAND,
            customer_name: &info.name,
            order_id,
            lines: &lines,
            total,
            shipping_address,
        }
        .render()?,
    })
}

/// SMTP mailer.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    storefront_url: String,
    currency: CurrencyCode,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(
        config: &EmailConfig,
        storefront_url: &str,
        currency: CurrencyCode,
    ) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            storefront_url: storefront_url.to_string(),
            currency,
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(&self, to: &str, email: RenderedEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_welcome(&self, to: &Email) -> Result<(), EmailError> {
        let email = render_welcome(&self.storefront_url)?;
        self.send_multipart_email(to.as_str(), email).await
    }

    async fn send_order_confirmation(&self, order: &Order) -> Result<(), EmailError> {
        let email = render_order_confirmation(order, self.currency)?;
        self.send_multipart_email(order.customer_info.email.as_str(), email)
            .await
    }
}
