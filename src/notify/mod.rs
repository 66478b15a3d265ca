//! Best-effort notifications about leads.
//!
//! Delivery failures are logged and never reach the workflow's error path.

pub mod webhook;

pub use webhook::WebhookNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::NotifyError;
use crate::profile::{AgentProfile, UserData};

/// Sent when the contact form is submitted.
#[derive(Debug, Clone, Serialize)]
pub struct FormSubmission {
    #[serde(flatten)]
    pub user: UserData,
    pub timestamp: DateTime<Utc>,
}

/// Sent when the visitor asks to keep their demo.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureDemoRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub company_name: String,
    pub system_instruction: String,
    /// Field name expected by the lead collector.
    #[serde(rename = "vapiAssistantId")]
    pub assistant_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SecureDemoRequest {
    pub fn new(user: &UserData, profile: &AgentProfile) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            website: user.website.clone(),
            company_name: profile.company_name.clone(),
            system_instruction: profile.system_instruction.clone(),
            assistant_id: profile.assistant_id.clone(),
            created_at: Utc::now(),
        }
    }
}

/// A lead event for an external collector.
#[derive(Debug, Clone)]
pub enum Notification {
    FormSubmitted(FormSubmission),
    SecureDemoRequested(SecureDemoRequest),
}

impl Notification {
    pub fn form_submitted(user: &UserData) -> Self {
        Self::FormSubmitted(FormSubmission {
            user: user.clone(),
            timestamp: Utc::now(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::FormSubmitted(_) => "form_submitted",
            Self::SecureDemoRequested(_) => "secure_demo",
        }
    }
}

/// Delivers notifications somewhere outside the process.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Deliver in the background. Returns immediately; failures are only logged.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.deliver(&notification).await {
            warn!(kind = notification.kind(), error = %e, "Notification delivery failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn user() -> UserData {
        UserData {
            name: "Anna Beispiel".into(),
            phone: "+49123".into(),
            email: "a@b.de".into(),
            website: "www.beispielfirma.de".into(),
        }
    }

    #[test]
    fn form_submission_is_flat() {
        let Notification::FormSubmitted(payload) = Notification::form_submitted(&user()) else {
            panic!("wrong variant");
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["name"], "Anna Beispiel");
        assert_eq!(json["website"], "www.beispielfirma.de");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn secure_demo_uses_collector_field_names() {
        let profile = AgentProfile::new("Beispiel GmbH", "inst").with_assistant_id("asst_9");
        let json = serde_json::to_value(SecureDemoRequest::new(&user(), &profile)).unwrap();
        assert_eq!(json["companyName"], "Beispiel GmbH");
        assert_eq!(json["systemInstruction"], "inst");
        assert_eq!(json["vapiAssistantId"], "asst_9");
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["email"], "a@b.de");
    }

    struct FailingNotifier {
        attempted: mpsc::UnboundedSender<&'static str>,
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
            let _ = self.attempted.send(notification.kind());
            Err(NotifyError::Rejected {
                kind: notification.kind().into(),
                status: 500,
            })
        }
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatch(
            Arc::new(FailingNotifier { attempted: tx }),
            Notification::form_submitted(&user()),
        );
        let kind = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(kind, Some("form_submitted"));
    }
}
