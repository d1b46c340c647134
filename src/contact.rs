use crate::config::ContactConfig;
use crate::model::{trimmed_string, ContactSpecification};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
pub const MAX_MESSAGE_LENGTH: usize = 5000;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Trims the submitted fields and collects one message per invalid field.
pub fn validate(payload: &ContactSpecification) -> Result<ContactMessage, BTreeMap<&'static str, String>> {
    let name = trimmed_string(&payload.name);
    let email = trimmed_string(&payload.email);
    let message = trimmed_string(&payload.message);
    let mut errors = BTreeMap::new();

    if name.is_empty() {
        errors.insert("name", "Name is required.".to_string());
    }
    if email.is_empty() {
        errors.insert("email", "Email is required.".to_string());
    } else if !EMAIL_PATTERN.is_match(&email) {
        errors.insert("email", "Email must be valid.".to_string());
    }
    if message.is_empty() {
        errors.insert("message", "Message is required.".to_string());
    } else if message.chars().count() > MAX_MESSAGE_LENGTH {
        errors.insert(
            "message",
            format!("Message must be {MAX_MESSAGE_LENGTH} characters or fewer."),
        );
    }

    if errors.is_empty() {
        Ok(ContactMessage {
            name,
            email,
            message,
        })
    } else {
        Err(errors)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail relay responded with status {0}")]
    Status(u16),
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No relay is configured; the submission was accepted but not forwarded.
    Local,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<Delivery, MailError>;
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    to_email: Option<String>,
    from_email: String,
}

impl ResendMailer {
    pub fn new(client: reqwest::Client, config: &ContactConfig) -> Self {
        Self {
            client,
            api_key: config.resend_api_key.clone(),
            to_email: config.to_email.clone(),
            from_email: config.from_email.clone(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &ContactMessage) -> Result<Delivery, MailError> {
        let Some(api_key) = &self.api_key else {
            tracing::info!("Mail relay not configured, accepting contact from {} locally", message.email);
            return Ok(Delivery::Local);
        };
        let to_email = self.to_email.as_deref().unwrap_or(&message.email);

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(&json!({
                "from": self.from_email,
                "to": [to_email],
                "reply_to": message.email,
                "subject": format!("Portfolio inquiry from {}", message.name),
                "text": message.message,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Status(response.status().as_u16()));
        }
        Ok(Delivery::Sent)
    }
}
