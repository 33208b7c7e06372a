//! Notification Collaborator
//!
//! Best-effort side channel: the ledger fires these after a successful
//! transition and logs failures. A notification error never rolls back a
//! status change - the money movement of record is the status column.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

/// Lifecycle events worth telling a human about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    Delivered,
    Released,
    Disputed,
}

impl NotifyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyEvent::Delivered => "delivered",
            NotifyEvent::Released => "released",
            NotifyEvent::Disputed => "disputed",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fire-and-forget. Implementations must not panic; errors are returned
    /// only so the caller can log them.
    async fn notify(
        &self,
        payment_id: &str,
        event: NotifyEvent,
        recipient_email: &str,
        project_name: &str,
    ) -> Result<(), String>;
}

/// Logs the notification instead of sending it (tests, demo runs)
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        payment_id: &str,
        event: NotifyEvent,
        recipient_email: &str,
        _project_name: &str,
    ) -> Result<(), String> {
        info!(
            payment_id = %payment_id,
            event = event.as_str(),
            to = %recipient_email,
            "Notification (log only)"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    to: &'a str,
    event: &'a str,
    payment_id: &'a str,
    project_name: &'a str,
}

/// POSTs the notification to an external mailer endpoint
pub struct HttpNotifier {
    client: reqwest::Client,
    mailer_url: String,
}

impl HttpNotifier {
    pub fn new(mailer_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, mailer_url }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(
        &self,
        payment_id: &str,
        event: NotifyEvent,
        recipient_email: &str,
        project_name: &str,
    ) -> Result<(), String> {
        let body = EmailRequest {
            to: recipient_email,
            event: event.as_str(),
            payment_id,
            project_name,
        };

        let resp = self
            .client
            .post(&self.mailer_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            warn!(
                payment_id = %payment_id,
                status = %resp.status(),
                "Mailer rejected notification"
            );
            return Err(format!("mailer returned {}", resp.status()));
        }
        Ok(())
    }
}
