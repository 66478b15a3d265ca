//! Webhook notifier — posts lead events as JSON.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Notification, Notifier};
use crate::config::WebhookConfig;
use crate::error::NotifyError;

pub struct WebhookNotifier {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url_for(&self, notification: &Notification) -> Option<&str> {
        match notification {
            Notification::FormSubmitted(_) => self.config.form_submitted_url.as_deref(),
            Notification::SecureDemoRequested(_) => self.config.secure_demo_url.as_deref(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let kind = notification.kind();
        let Some(url) = self.url_for(notification) else {
            debug!(kind = kind, "No webhook configured, skipping");
            return Ok(());
        };

        let request = self.client.post(url);
        let request = match notification {
            Notification::FormSubmitted(payload) => request.json(payload),
            Notification::SecureDemoRequested(payload) => request.json(payload),
        };

        let response = request.send().await.map_err(|e| NotifyError::RequestFailed {
            kind: kind.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                kind: kind.to_string(),
                status: status.as_u16(),
            });
        }

        info!(kind = kind, "Webhook delivered");
        Ok(())
    }
}
