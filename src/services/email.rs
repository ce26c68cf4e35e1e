//! Outbound notification email.
//!
//! [`ResendMailer`] posts to an HTTP email API. When no API key is configured the
//! [`LogMailer`] is used instead and messages only appear in the logs. Callers treat email
//! as best-effort: a failed send is logged and never undoes the write that triggered it.

use crate::config::settings::EmailConfig;
use crate::errors::{Error, Result};
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;

/// A notification email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipients
    pub to: Vec<String>,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Sends notification emails.
pub trait Mailer: Send + Sync {
    /// Delivers one message.
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<()>>;
}

/// Mailer backed by the Resend HTTP API
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    /// Creates a mailer for the given endpoint and credentials.
    #[must_use]
    pub fn new(endpoint: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            from,
        }
    }
}

impl Mailer for ResendMailer {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let body = SendRequest {
                from: &self.from,
                to: &message.to,
                subject: &message.subject,
                html: &message.html,
            };
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(Error::Email {
                    message: format!("email API returned {status}: {text}"),
                });
            }
            tracing::info!(subject = %message.subject, "Sent notification email");
            Ok(())
        })
    }
}

/// Mailer that only logs; used when no API key is configured
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            tracing::info!(
                to = ?message.to,
                subject = %message.subject,
                "Email (no provider configured)"
            );
            Ok(())
        })
    }
}

/// Picks the mailer implementation for the configuration.
#[must_use]
pub fn mailer_from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => Arc::new(ResendMailer::new(
            config.endpoint.clone(),
            key.to_string(),
            config.from.clone(),
        )),
        None => Arc::new(LogMailer),
    }
}
