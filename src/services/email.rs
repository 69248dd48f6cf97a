//! Email delivery of lending notifications

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use super::notifier::Notifier;
use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::{loan::LoanDetails, reservation::ReservationDetails},
};

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send one plain text + HTML message; only logs when email is disabled
    async fn send_email(&self, to: Option<&str>, subject: &str, body: &str) -> AppResult<()> {
        let to = to
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::BadRequest("Member has no email address".to_string()))?;

        if !self.config.enabled {
            tracing::info!(to = %to, subject = %subject, "Email disabled, notification not sent");
            return Ok(());
        }

        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Bibliotheca");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::BadRequest(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><p>{}</p></body></html>"#,
                                body.trim().replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        let mailer = mailer_builder.build();

        // SmtpTransport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

fn greeting(name: Option<&str>, login: &str) -> String {
    format!("Dear {},", name.unwrap_or(login))
}

#[async_trait]
impl Notifier for EmailService {
    async fn notify_reservation_fulfilled(&self, reservation: &ReservationDetails) -> AppResult<()> {
        let subject = format!("Reserved book available: {}", reservation.book_title);
        let body = format!(
            r#"
{greeting}

The book "{title}" you reserved is now available.
Please pick it up at the library desk within the next few days.
"#,
            greeting = greeting(reservation.member_name.as_deref(), &reservation.member_login),
            title = reservation.book_title,
        );
        self.send_email(reservation.member_email.as_deref(), &subject, &body)
            .await
    }

    async fn notify_due_soon(&self, loan: &LoanDetails) -> AppResult<()> {
        let subject = format!("Reminder: \"{}\" is due soon", loan.book_title);
        let body = format!(
            r#"
{greeting}

The book "{title}" is due on {due}.
Please return it on time to avoid late fees.
"#,
            greeting = greeting(loan.member_name.as_deref(), &loan.member_login),
            title = loan.book_title,
            due = loan.due_date.format("%Y-%m-%d"),
        );
        self.send_email(loan.member_email.as_deref(), &subject, &body)
            .await
    }

    async fn notify_overdue(&self, loan: &LoanDetails) -> AppResult<()> {
        let subject = format!("Overdue: \"{}\"", loan.book_title);
        let body = format!(
            r#"
{greeting}

The book "{title}" was due on {due} and is now overdue.
The fine accrued so far is {fine}. Please return it as soon as possible.
"#,
            greeting = greeting(loan.member_name.as_deref(), &loan.member_login),
            title = loan.book_title,
            due = loan.due_date.format("%Y-%m-%d"),
            fine = loan.fine_amount,
        );
        self.send_email(loan.member_email.as_deref(), &subject, &body)
            .await
    }
}
