//! Outbound account email.
//!
//! Delivery is best effort: [`dispatch`] hands the message to a background task
//! and returns immediately. Failures are logged and never reach the request
//! that triggered them.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    pub fn welcome(to: &str, name: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Welcome to the app!".to_string(),
            text: format!("Hi {}!", name),
        }
    }

    pub fn cancellation(to: &str, name: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Sorry to see you go".to_string(),
            text: format!("Bye bye {}!", name),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), AppError>;
}

/// Delivers through the SendGrid v3 API.
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.from },
            "subject": email.subject,
            "content": [{ "type": "text/plain", "value": email.text }]
        });

        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::InternalServerError(format!("email transport: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::InternalServerError(format!(
                "email provider answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Writes messages to the log instead of sending them. Used when no provider
/// key is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), AppError> {
        log::info!("email to {}: {} ({})", email.to, email.subject, email.text);
        Ok(())
    }
}

/// Picks the mailer for this configuration.
pub fn from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.sendgrid_api_key {
        Some(key) => Arc::new(SendGridMailer::new(key.clone(), config.email_from.clone())),
        None => {
            log::warn!("SENDGRID_API_KEY not set; outbound email will only be logged");
            Arc::new(LogMailer)
        }
    }
}

/// Sends `email` in the background. Must be called from within the actix runtime.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: Email) {
    actix_web::rt::spawn(async move {
        let to = email.to.clone();
        if let Err(e) = mailer.send(email).await {
            log::warn!("failed to send email to {}: {}", to, e);
        }
    });
}
