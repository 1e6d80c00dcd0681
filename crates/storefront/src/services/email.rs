//! Transactional email.
//!
//! SMTP delivery via lettre with paired Askama templates (HTML plus plain
//! text) for every message.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use paperfold_core::Email;

use crate::config::EmailConfig;

/// HTML template for the sign-in code email.
#[derive(Template)]
#[template(path = "email/signin_code.html")]
struct SigninCodeEmailHtml<'a> {
    code: &'a str,
}

/// Plain text template for the sign-in code email.
#[derive(Template)]
#[template(path = "email/signin_code.txt")]
struct SigninCodeEmailText<'a> {
    code: &'a str,
}

/// HTML template for the order-ready email.
#[derive(Template)]
#[template(path = "email/order_ready.html")]
struct OrderReadyEmailHtml<'a> {
    titles: &'a [String],
    library_url: &'a str,
}

/// Plain text template for the order-ready email.
#[derive(Template)]
#[template(path = "email/order_ready.txt")]
struct OrderReadyEmailText<'a> {
    titles: &'a [String],
    library_url: &'a str,
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

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    library_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
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
            library_url: format!("{}/library", base_url.trim_end_matches('/')),
        })
    }

    /// Send a one-time sign-in code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, to, code), fields(to = %to))]
    pub async fn send_signin_code(&self, to: &Email, code: &str) -> Result<(), EmailError> {
        let html = SigninCodeEmailHtml { code }.render()?;
        let text = SigninCodeEmailText { code }.render()?;

        self.send_multipart_email(to.as_str(), "Your Paperfold sign-in code", &text, &html)
            .await
    }

    /// Tell a customer their purchase is ready to download.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, to, titles), fields(to = %to, titles = titles.len()))]
    pub async fn send_order_ready(&self, to: &Email, titles: &[String]) -> Result<(), EmailError> {
        let html = OrderReadyEmailHtml {
            titles,
            library_url: &self.library_url,
        }
        .render()?;
        let text = OrderReadyEmailText {
            titles,
            library_url: &self.library_url,
        }
        .render()?;

        self.send_multipart_email(to.as_str(), "Your Paperfold downloads are ready", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
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

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_signin_code_templates_render_code() {
        let html = SigninCodeEmailHtml { code: "042137" }.render().unwrap();
        let text = SigninCodeEmailText { code: "042137" }.render().unwrap();

        assert!(html.contains("042137"));
        assert!(text.contains("042137"));
    }

    #[test]
    fn test_order_ready_templates_list_items() {
        let titles = vec!["Weekly Planner".to_owned(), "Habit Tracker".to_owned()];
        let html = OrderReadyEmailHtml {
            titles: &titles,
            library_url: "https://paperfold.ink/library",
        }
        .render()
        .unwrap();
        let text = OrderReadyEmailText {
            titles: &titles,
            library_url: "https://paperfold.ink/library",
        }
        .render()
        .unwrap();

        assert!(html.contains("Weekly Planner"));
        assert!(html.contains("https://paperfold.ink/library"));
        assert!(text.contains("Habit Tracker"));
        assert!(text.contains("https://paperfold.ink/library"));
    }
}
