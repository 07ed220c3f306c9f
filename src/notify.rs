//! Email Notifications
//! Mission: Tell users what happened without ever slowing down or failing a request
//!
//! Messages are pushed onto a bounded queue and delivered by a single
//! background worker. Delivery is at-most-once and best-effort: a full
//! queue drops the message, a failed send is logged and never retried.

use crate::issues::models::Issue;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// One outbound email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Resend HTTP API
pub struct ResendMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_url: String, api_key: String, from: String) -> Self {
        Self {
            http,
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let body = json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
        });

        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Email API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Email API returned {}", status);
        }
        Ok(())
    }
}

/// Used when no email provider is configured
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "Email provider not configured, dropping email");
        Ok(())
    }
}

/// Handle for queueing notifications
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<EmailMessage>,
}

impl Notifier {
    /// Start the delivery worker. Must be called inside a tokio runtime.
    pub fn spawn(mailer: Arc<dyn Mailer>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(delivery_worker(mailer, rx));
        Self { tx }
    }

    pub fn welcome(&self, to: &str, name: &str) {
        self.enqueue(EmailMessage {
            to: to.to_string(),
            subject: "Welcome to ApniSec Dashboard".to_string(),
            html: format!(
                "<h1>Welcome, {}!</h1>\
                 <p>Thank you for registering with ApniSec. We are glad to have you on board.</p>\
                 <p>Visit your dashboard to manage security assessments.</p>",
                escape_html(name)
            ),
        });
    }

    pub fn issue_created(&self, to: &str, issue: &Issue) {
        self.enqueue(EmailMessage {
            to: to.to_string(),
            subject: format!("New Issue Created: {}", issue.title),
            html: format!(
                "<h1>New Issue Created</h1>\
                 <p><strong>Type:</strong> {}</p>\
                 <p><strong>Title:</strong> {}</p>\
                 <p>Your issue has been logged successfully with ID: {}.</p>",
                issue.issue_type.as_str(),
                escape_html(&issue.title),
                issue.id
            ),
        });
    }

    fn enqueue(&self, message: EmailMessage) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                warn!(to = %message.to, subject = %message.subject, "Email queue full, dropping email");
            }
            Err(TrySendError::Closed(message)) => {
                warn!(to = %message.to, subject = %message.subject, "Email worker stopped, dropping email");
            }
        }
    }
}

async fn delivery_worker(mailer: Arc<dyn Mailer>, mut rx: mpsc::Receiver<EmailMessage>) {
    while let Some(message) = rx.recv().await {
        match mailer.send(&message).await {
            Ok(()) => debug!(to = %message.to, subject = %message.subject, "Email sent"),
            Err(e) => warn!(to = %message.to, subject = %message.subject, "Failed to send email: {:#}", e),
        }
    }
    debug!("Email worker exiting");
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
