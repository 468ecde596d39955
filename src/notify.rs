//! Outbound email dispatch.
//!
//! Fire-and-forget: one send per call, no retry, no queue. A transport
//! failure is terminal for the request that triggered it. The concrete
//! transport is an HTTP mail API; deployments without one configured get
//! the null mailer, which logs and drops.

use async_trait::async_trait;
use serde_json::json;

use crate::config::MailConfig;
use crate::error::{Error, Result};

/// Narrow interface the ledger and handlers send mail through.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Delivers via an HTTP mail API endpoint.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(api_url: String, sender: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            sender,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let payload = json!({
            "from": self.sender,
            "to": recipient,
            "subject": subject,
            "text": body,
        });

        let response = self
            .client
            .post(&self.api_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "mail API returned {}",
                response.status()
            )));
        }

        tracing::info!(recipient, subject, "email sent");
        Ok(())
    }
}

/// Logs and drops every message. Used when no mail API is configured.
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<()> {
        tracing::info!(recipient, subject, "mail delivery disabled, dropping message");
        Ok(())
    }
}

/// Build the mailer for the given config.
pub fn from_config(config: &MailConfig) -> std::sync::Arc<dyn Mailer> {
    match &config.api_url {
        Some(url) => std::sync::Arc::new(HttpMailer::new(url.clone(), config.sender.clone())),
        None => std::sync::Arc::new(NullMailer),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Captures sends for assertions.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    /// Always fails, for transport-error paths.
    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> Result<()> {
            Err(Error::Transport("connection refused".to_string()))
        }
    }
}
