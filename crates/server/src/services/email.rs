//! Transactional email.
//!
//! Messages are rendered from Askama templates (plain text and HTML) and
//! handed to a [`Mailer`]. Production uses [`SmtpMailer`]; without SMTP
//! configuration the server falls back to [`LogMailer`], which only logs.
//! Delivery problems never fail the request that triggered the email.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::{Appointment, QuoteWithItems};
use crate::models::quote::QuoteItem;

#[derive(Template)]
#[template(path = "email/quote_sent.html")]
struct QuoteSentHtml<'a> {
    quote: &'a QuoteWithItems,
    items: &'a [QuoteItem],
    has_discount: bool,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/quote_sent.txt")]
struct QuoteSentText<'a> {
    quote: &'a QuoteWithItems,
    items: &'a [QuoteItem],
    has_discount: bool,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/appointment_confirmation.html")]
struct AppointmentConfirmationHtml<'a> {
    appointment: &'a Appointment,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/appointment_confirmation.txt")]
struct AppointmentConfirmationText<'a> {
    appointment: &'a Appointment,
    shop_url: &'a str,
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

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingEmail {
    /// The customer's copy of a quote.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn quote_sent(quote: &QuoteWithItems, shop_url: &str) -> Result<Self, EmailError> {
        let items = quote.items.as_slice();
        let has_discount = !quote.quote.discount_amount.amount().is_zero();
        Ok(Self {
            to: quote.quote.customer_email.clone(),
            subject: format!("Your quote {}", quote.quote.quote_number),
            text: QuoteSentText {
                quote,
                items,
                has_discount,
                shop_url,
            }
            .render()?,
            html: QuoteSentHtml {
                quote,
                items,
                has_discount,
                shop_url,
            }
            .render()?,
        })
    }

    /// Booking confirmation for a new appointment.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if rendering fails.
    pub fn appointment_confirmation(
        appointment: &Appointment,
        shop_url: &str,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            to: appointment.customer_email.clone(),
            subject: format!(
                "Appointment {} on {}",
                appointment.appointment_number, appointment.scheduled_date
            ),
            text: AppointmentConfirmationText { appointment, shop_url }.render()?,
            html: AppointmentConfirmationHtml { appointment, shop_url }.render()?,
        })
    }
}

/// Delivers rendered emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// # Errors
    ///
    /// Returns `EmailError` if the message cannot be built or delivered.
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// Render and send, logging instead of failing.
///
/// The originating request has already succeeded by the time this runs.
pub async fn send_logged(mailer: &dyn Mailer, email: Result<OutgoingEmail, EmailError>) {
    let result = match email {
        Ok(email) => mailer.send(email).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to send email");
    }
}

/// SMTP delivery via lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.as_str())
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

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Logs messages instead of sending them (no SMTP configured).
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured, email dropped"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::{NaiveDate, NaiveTime, Utc};
    use tireshop_core::{
        AppointmentId, AppointmentStatus, Money, QuoteId, QuoteItemId, QuoteStatus,
    };

    use super::*;
    use crate::models::Quote;

    fn quote() -> QuoteWithItems {
        let now = Utc::now();
        QuoteWithItems {
            quote: Quote {
                id: QuoteId::new(7),
                quote_number: "Q-1767225600000-0A1B2C3D".to_string(),
                customer_name: "Ana <Ruiz>".to_string(),
                customer_email: "ana@example.com".to_string(),
                customer_phone: None,
                vehicle_make: Some("Seat".to_string()),
                vehicle_model: Some("Leon".to_string()),
                vehicle_year: Some(2019),
                notes: None,
                status: QuoteStatus::Sent,
                subtotal: Money::from_cents(2500),
                tax_amount: Money::from_cents(525),
                discount_amount: Money::from_cents(0),
                total_amount: Money::from_cents(3025),
                valid_until: NaiveDate::from_ymd_opt(2026, 2, 1),
                sent_at: Some(now),
                user_id: None,
                item_count: 1,
                created_at: now,
                updated_at: now,
            },
            items: vec![QuoteItem {
                id: QuoteItemId::new(1),
                quote_id: QuoteId::new(7),
                product_id: None,
                service_id: None,
                description: "Pilot Sport 5 225/45R17".to_string(),
                quantity: 2,
                unit_price: Money::from_cents(1000),
                total_price: Money::from_cents(2000),
                position: 0,
            }],
        }
    }

    fn appointment() -> Appointment {
        let now = Utc::now();
        Appointment {
            id: AppointmentId::new(3),
            appointment_number: "A-1767225600000-FFEE0011".to_string(),
            service_id: None,
            service_name: Some("Wheel Alignment".to_string()),
            user_id: None,
            customer_name: "Luis".to_string(),
            customer_email: "luis@example.com".to_string(),
            customer_phone: "600000000".to_string(),
            vehicle_make: None,
            vehicle_model: None,
            vehicle_year: None,
            license_plate: Some("1234ABC".to_string()),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            duration_minutes: 60,
            status: AppointmentStatus::Scheduled,
            notes: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
            Err(EmailError::InvalidAddress(email.to))
        }
    }

    #[test]
    fn test_quote_email_renders_totals() {
        let email = OutgoingEmail::quote_sent(&quote(), "https://shop.example.com").unwrap();
        assert_eq!(email.to, "ana@example.com");
        assert_eq!(email.subject, "Your quote Q-1767225600000-0A1B2C3D");
        assert!(email.text.contains("30.25"));
        assert!(email.text.contains("Pilot Sport 5 225/45R17"));
        assert!(!email.html.contains("<Ruiz>"));
    }

    #[test]
    fn test_appointment_email() {
        let email =
            OutgoingEmail::appointment_confirmation(&appointment(), "https://shop.example.com")
                .unwrap();
        assert_eq!(email.subject, "Appointment A-1767225600000-FFEE0011 on 2026-03-14");
        assert!(email.text.contains("09:30"));
        assert!(email.text.contains("Wheel Alignment"));
    }

    #[tokio::test]
    async fn test_send_logged_delivers() {
        let mailer = RecordingMailer::default();
        send_logged(
            &mailer,
            OutgoingEmail::quote_sent(&quote(), "https://shop.example.com"),
        )
        .await;
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_logged_swallows_failures() {
        send_logged(
            &FailingMailer,
            OutgoingEmail::quote_sent(&quote(), "https://shop.example.com"),
        )
        .await;
        assert!(LogMailer.send(OutgoingEmail::quote_sent(&quote(), "x").unwrap()).await.is_ok());
    }
}
