//! The narrow capability a call controller needs from a real-time voice SDK.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::SessionError;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle signals emitted by a voice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// The call is live. `join_url` is the room the browser should join, when
    /// the session hands audio off to the browser.
    CallStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join_url: Option<String>,
    },
    CallEnd,
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Speaker amplitude, 0.0..=1.0. Cosmetic only.
    VolumeLevel { level: f32 },
}

/// Broadcast sender for session events. Cloneable so transports that observe
/// the call elsewhere (e.g. the browser) can feed events in.
#[derive(Debug, Clone)]
pub struct EventSource {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventSource {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A real-time voice session client.
#[async_trait]
pub trait VoiceSession: Send + Sync {
    /// Open a call against the given assistant.
    async fn start(&self, assistant_id: &str) -> Result<(), SessionError>;

    /// Tear down the active call. Must be safe when no call exists.
    async fn stop(&self);

    /// Subscribe to lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_sdk_names_on_the_wire() {
        let start = serde_json::to_value(SessionEvent::CallStart { join_url: None }).unwrap();
        assert_eq!(start, serde_json::json!({"type": "call-start"}));

        let parsed: SessionEvent =
            serde_json::from_str(r#"{"type":"volume-level","level":0.4}"#).unwrap();
        assert_eq!(parsed, SessionEvent::VolumeLevel { level: 0.4 });

        let parsed: SessionEvent = serde_json::from_str(r#"{"type":"error"}"#).unwrap();
        assert_eq!(parsed, SessionEvent::Error { message: None });
    }

    #[tokio::test]
    async fn event_source_fans_out() {
        let source = EventSource::new();
        let mut a = source.subscribe();
        let mut b = source.subscribe();
        source.emit(SessionEvent::CallEnd);
        assert_eq!(a.recv().await.unwrap(), SessionEvent::CallEnd);
        assert_eq!(b.recv().await.unwrap(), SessionEvent::CallEnd);
    }
}
