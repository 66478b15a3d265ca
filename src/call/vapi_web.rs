//! `VoiceSession` backed by Vapi web calls.
//!
//! Starting a session creates a web call with the public key; the browser
//! joins the returned room for audio. Stopping sends `end-call` through the
//! call's live control URL. Events the browser observes while in the room are
//! fed back through [`VapiWebSession::event_source`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use super::session::{EventSource, SessionEvent, VoiceSession};
use crate::config::VapiConfig;
use crate::error::{ConfigError, SessionError};

/// A created web call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebCall {
    pub id: String,
    #[serde(default)]
    pub web_call_url: Option<String>,
    #[serde(default)]
    pub monitor: Option<CallMonitor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMonitor {
    #[serde(default)]
    pub control_url: Option<String>,
}

impl WebCall {
    fn control_url(&self) -> Option<&str> {
        self.monitor.as_ref()?.control_url.as_deref()
    }
}

/// Vapi web-call session. One active call at a time.
pub struct VapiWebSession {
    client: reqwest::Client,
    public_key: Option<SecretString>,
    base_url: String,
    events: EventSource,
    active: Mutex<Option<WebCall>>,
}

impl VapiWebSession {
    pub fn new(config: &VapiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            public_key: config.public_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            events: EventSource::new(),
            active: Mutex::new(None),
        }
    }

    /// Sender for events observed outside this process.
    pub fn event_source(&self) -> EventSource {
        self.events.clone()
    }

    pub async fn active_call(&self) -> Option<WebCall> {
        self.active.lock().await.clone()
    }

    /// Send `end-call` through the call's control URL. Failures are only logged.
    async fn end_call(&self, call: &WebCall) {
        let Some(control_url) = call.control_url() else {
            debug!(call_id = %call.id, "Web call has no control URL");
            return;
        };
        let result = self
            .client
            .post(control_url)
            .json(&json!({ "type": "end-call" }))
            .send()
            .await;
        match result {
            Ok(resp) if !resp.status().is_success() => {
                warn!(call_id = %call.id, status = resp.status().as_u16(), "end-call rejected");
            }
            Ok(_) => {}
            Err(e) => warn!(call_id = %call.id, error = %e, "end-call request failed"),
        }
    }
}

#[async_trait]
impl VoiceSession for VapiWebSession {
    async fn start(&self, assistant_id: &str) -> Result<(), SessionError> {
        let public_key = self.public_key.as_ref().ok_or_else(|| ConfigError::MissingCredential {
            key: "VAPI_PUBLIC_KEY".to_string(),
            hint: "Anruf kann nicht gestartet werden.".to_string(),
        })?;

        let previous = self.active.lock().await.take();
        if let Some(previous) = previous {
            warn!(call_id = %previous.id, "Ending previous web call before starting a new one");
            self.end_call(&previous).await;
        }

        let response = self
            .client
            .post(format!("{}/call/web", self.base_url))
            .bearer_auth(public_key.expose_secret())
            .json(&json!({ "assistantId": assistant_id }))
            .send()
            .await
            .map_err(|e| SessionError::StartFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::StartFailed(format!(
                "web call rejected ({}): {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let call: WebCall = response
            .json()
            .await
            .map_err(|e| SessionError::StartFailed(format!("invalid web call response: {e}")))?;

        info!(call_id = %call.id, "Web call created");
        let join_url = call.web_call_url.clone();
        *self.active.lock().await = Some(call);
        self.events.emit(SessionEvent::CallStart { join_url });
        Ok(())
    }

    async fn stop(&self) {
        let Some(call) = self.active.lock().await.take() else {
            debug!("No active web call to stop");
            return;
        };

        self.end_call(&call).await;
        info!(call_id = %call.id, "Web call stopped");
        self.events.emit(SessionEvent::CallEnd);
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn web_call_response_parses() {
        let raw = r#"{
            "id": "call_1",
            "webCallUrl": "https://vapi.daily.co/room",
            "monitor": {"listenUrl": "wss://x", "controlUrl": "https://control/1"},
            "status": "queued"
        }"#;
        let call: WebCall = serde_json::from_str(raw).unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(call.web_call_url.as_deref(), Some("https://vapi.daily.co/room"));
        assert_eq!(call.control_url(), Some("https://control/1"));

        let bare: WebCall = serde_json::from_str(r#"{"id":"call_2"}"#).unwrap();
        assert!(bare.control_url().is_none());
    }

    #[tokio::test]
    async fn start_without_public_key_fails() {
        let session = VapiWebSession::new(&VapiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..VapiConfig::default()
        });
        let err = session.start("asst_1").await.unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert!(err.to_string().starts_with("VAPI_PUBLIC_KEY fehlt."));
    }

    #[tokio::test]
    async fn stop_without_call_emits_nothing() {
        let session = VapiWebSession::new(&VapiConfig::default());
        let mut events = session.subscribe();
        session.stop().await;
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    /// Fake Vapi: numbered web calls, each with its own control URL.
    #[derive(Clone, Default)]
    struct FakeVapi {
        port: u16,
        created: Arc<AtomicUsize>,
        ended: Arc<StdMutex<Vec<String>>>,
    }

    async fn create_web_call(State(vapi): State<FakeVapi>) -> Json<serde_json::Value> {
        let n = vapi.created.fetch_add(1, Ordering::SeqCst) + 1;
        Json(json!({
            "id": format!("call_{n}"),
            "webCallUrl": format!("https://room.test/call_{n}"),
            "monitor": { "controlUrl": format!("http://127.0.0.1:{}/control/call_{n}", vapi.port) }
        }))
    }

    async fn control(
        State(vapi): State<FakeVapi>,
        Path(id): Path<String>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        assert_eq!(body["type"], "end-call");
        vapi.ended.lock().unwrap().push(id);
        StatusCode::OK
    }

    async fn start_fake_vapi() -> (FakeVapi, VapiWebSession) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let vapi = FakeVapi {
            port: listener.local_addr().unwrap().port(),
            ..FakeVapi::default()
        };
        let app = Router::new()
            .route("/call/web", post(create_web_call))
            .route("/control/{id}", post(control))
            .with_state(vapi.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let session = VapiWebSession::new(&VapiConfig {
            public_key: Some(SecretString::from("vapi-public")),
            base_url: format!("http://127.0.0.1:{}", vapi.port),
            ..VapiConfig::default()
        });
        (vapi, session)
    }

    #[tokio::test]
    async fn start_and_stop_round_trip_through_control_url() {
        let (vapi, session) = start_fake_vapi().await;
        let mut events = session.subscribe();

        session.start("asst_1").await.unwrap();
        let call = session.active_call().await.unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::CallStart {
                join_url: Some("https://room.test/call_1".into())
            }
        );

        session.stop().await;
        assert!(session.active_call().await.is_none());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::CallEnd);
        assert_eq!(*vapi.ended.lock().unwrap(), vec!["call_1".to_string()]);
    }

    #[tokio::test]
    async fn second_start_ends_the_previous_call() {
        let (vapi, session) = start_fake_vapi().await;

        session.start("asst_1").await.unwrap();
        session.start("asst_1").await.unwrap();

        assert_eq!(session.active_call().await.unwrap().id, "call_2");
        assert_eq!(*vapi.ended.lock().unwrap(), vec!["call_1".to_string()]);

        session.stop().await;
        assert_eq!(
            *vapi.ended.lock().unwrap(),
            vec!["call_1".to_string(), "call_2".to_string()]
        );
    }
}

