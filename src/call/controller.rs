//! Call session controller — a small status state machine over a
//! `VoiceSession`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::session::{SessionEvent, VoiceSession};
use crate::error::SessionError;

const UPDATE_CAPACITY: usize = 64;

const GENERIC_ERROR: &str = "Ein Fehler ist aufgetreten.";
const START_FAILED: &str =
    "Verbindung konnte nicht hergestellt werden. Überprüfen Sie den API-Schlüssel.";

/// Connection status shown next to the live call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl CallStatus {
    /// A call is being set up or is live.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Current call state.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CallSnapshot {
    pub status: CallStatus,
    /// User-facing message, set until the next start or reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_url: Option<String>,
    pub volume: f32,
}

/// Change notifications for subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallUpdate {
    CallStatus {
        status: CallStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        join_url: Option<String>,
    },
    VolumeLevel { level: f32 },
}

impl CallUpdate {
    fn status(snapshot: &CallSnapshot) -> Self {
        Self::CallStatus {
            status: snapshot.status,
            error: snapshot.error.clone(),
            join_url: snapshot.join_url.clone(),
        }
    }
}

/// Shared state touched by both the controller and its event pump.
struct Shared {
    state: RwLock<CallSnapshot>,
    tx: broadcast::Sender<CallUpdate>,
}

impl Shared {
    async fn update(&self, f: impl FnOnce(&mut CallSnapshot)) {
        let update = {
            let mut state = self.state.write().await;
            f(&mut *state);
            CallUpdate::status(&state)
        };
        let _ = self.tx.send(update);
    }

    async fn apply(&self, event: SessionEvent) {
        match event {
            SessionEvent::CallStart { join_url } => {
                info!("Call started");
                self.update(|s| {
                    s.status = CallStatus::Connected;
                    s.error = None;
                    s.join_url = join_url;
                })
                .await;
            }
            SessionEvent::CallEnd => {
                info!("Call ended");
                self.update(|s| {
                    s.status = CallStatus::Disconnected;
                    s.join_url = None;
                    s.volume = 0.0;
                })
                .await;
            }
            SessionEvent::Error { message } => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_ERROR.to_string());
                warn!(error = %message, "Call session error");
                self.update(|s| {
                    s.status = CallStatus::Error;
                    s.error = Some(message);
                    s.join_url = None;
                })
                .await;
            }
            SessionEvent::VolumeLevel { level } => {
                let level = level.clamp(0.0, 1.0);
                self.state.write().await.volume = level;
                let _ = self.tx.send(CallUpdate::VolumeLevel { level });
            }
        }
    }
}

/// Wraps one voice session and exposes connect/disconnect as a state machine.
///
/// Events from the session are consumed by a background pump subscribed once
/// at construction; they are the only way to reach `connected`.
///
/// `start` and `stop` are serialized: a stop issued while a start is in
/// flight waits for it and then tears the new session down.
pub struct CallController {
    session: Arc<dyn VoiceSession>,
    shared: Arc<Shared>,
    lifecycle: Mutex<()>,
    pump: JoinHandle<()>,
}

impl CallController {
    /// Must be called from within a tokio runtime.
    pub fn new(session: Arc<dyn VoiceSession>) -> Self {
        let (tx, _rx) = broadcast::channel(UPDATE_CAPACITY);
        let shared = Arc::new(Shared {
            state: RwLock::new(CallSnapshot::default()),
            tx,
        });
        let pump = spawn_event_pump(session.subscribe(), Arc::clone(&shared));
        Self {
            session,
            shared,
            lifecycle: Mutex::new(()),
            pump,
        }
    }

    pub async fn snapshot(&self) -> CallSnapshot {
        self.shared.state.read().await.clone()
    }

    pub async fn status(&self) -> CallStatus {
        self.shared.state.read().await.status
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallUpdate> {
        self.shared.tx.subscribe()
    }

    /// Open a call. A no-op while a call is connecting or connected.
    pub async fn start(&self, assistant_id: &str) {
        let _lifecycle = self.lifecycle.lock().await;
        {
            let mut state = self.shared.state.write().await;
            if state.status.is_active() {
                debug!(status = %state.status, "Call already active, ignoring start");
                return;
            }
            state.status = CallStatus::Connecting;
            state.error = None;
            let _ = self.shared.tx.send(CallUpdate::status(&state));
        }

        info!(assistant_id = assistant_id, "Starting call");
        if let Err(e) = self.session.start(assistant_id).await {
            warn!(error = %e, "Failed to start call");
            self.shared
                .update(|s| {
                    s.status = CallStatus::Disconnected;
                    s.error = Some(START_FAILED.to_string());
                })
                .await;
        }
    }

    /// Tear down the session. Status follows the session's `call-end` event.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        debug!("Stopping call");
        self.session.stop().await;
    }

    /// Stop an active call, otherwise start one.
    pub async fn toggle(&self, assistant_id: Option<&str>) {
        if self.status().await.is_active() {
            self.stop().await;
            return;
        }
        match assistant_id {
            Some(id) => self.start(id).await,
            None => {
                let message = SessionError::NoAssistant.to_string();
                warn!("No assistant id to start a call with");
                self.shared.update(|s| s.error = Some(message)).await;
            }
        }
    }

    /// Clear the error and return to `idle` (retry affordance).
    ///
    /// A no-op while a call is connecting or connected; stop it first.
    pub async fn reset(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let mut state = self.shared.state.write().await;
        if state.status.is_active() {
            debug!(status = %state.status, "Call active, ignoring reset");
            return;
        }
        state.status = CallStatus::Idle;
        state.error = None;
        state.join_url = None;
        state.volume = 0.0;
        let _ = self.shared.tx.send(CallUpdate::status(&state));
    }
}

impl Drop for CallController {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

fn spawn_event_pump(
    mut events: broadcast::Receiver<SessionEvent>,
    shared: Arc<Shared>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => shared.apply(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "Call controller lagged behind session events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Session event source closed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::session::EventSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory session: `start` emits call-start unless told to fail,
    /// `stop` emits call-end only when a call was started.
    struct FakeSession {
        events: EventSource,
        fail_start: bool,
        emit_on_start: bool,
        start_delay: Duration,
        live: AtomicBool,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl FakeSession {
        fn new() -> Arc<Self> {
            Self::build(false, true)
        }

        fn build(fail_start: bool, emit_on_start: bool) -> Arc<Self> {
            Self::with_delay(fail_start, emit_on_start, Duration::ZERO)
        }

        /// A session whose `start` takes a while to connect.
        fn slow(delay: Duration) -> Arc<Self> {
            Self::with_delay(false, true, delay)
        }

        fn with_delay(fail_start: bool, emit_on_start: bool, start_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                events: EventSource::new(),
                fail_start,
                emit_on_start,
                start_delay,
                live: AtomicBool::new(false),
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VoiceSession for FakeSession {
        async fn start(&self, _assistant_id: &str) -> Result<(), SessionError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.start_delay).await;
            if self.fail_start {
                return Err(SessionError::StartFailed("boom".into()));
            }
            self.live.store(true, Ordering::SeqCst);
            if self.emit_on_start {
                self.events.emit(SessionEvent::CallStart {
                    join_url: Some("https://room.test/abc".into()),
                });
            }
            Ok(())
        }

        async fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if self.live.swap(false, Ordering::SeqCst) {
                self.events.emit(SessionEvent::CallEnd);
            }
        }

        fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
            self.events.subscribe()
        }
    }

    async fn wait_for(controller: &CallController, status: CallStatus) {
        for _ in 0..100 {
            if controller.status().await == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "status never reached {status}, stuck at {}",
            controller.status().await
        );
    }

    #[tokio::test]
    async fn starts_idle() {
        let controller = CallController::new(FakeSession::new());
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.status, CallStatus::Idle);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn start_reaches_connected_via_event() {
        let session = FakeSession::new();
        let controller = CallController::new(session.clone());

        controller.start("asst_1").await;
        wait_for(&controller, CallStatus::Connected).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.join_url.as_deref(), Some("https://room.test/abc"));
        assert_eq!(session.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_without_event_stays_connecting() {
        let controller = CallController::new(FakeSession::build(false, false));
        controller.start("asst_1").await;
        assert_eq!(controller.status().await, CallStatus::Connecting);
    }

    #[tokio::test]
    async fn start_while_active_is_noop() {
        let session = FakeSession::build(false, false);
        let controller = CallController::new(session.clone());

        controller.start("asst_1").await;
        controller.start("asst_1").await;
        assert_eq!(session.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_start_reverts_to_disconnected_with_message() {
        let controller = CallController::new(FakeSession::build(true, false));
        controller.start("asst_1").await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.status, CallStatus::Disconnected);
        assert_eq!(snapshot.error.as_deref(), Some(START_FAILED));
    }

    #[tokio::test]
    async fn stop_without_session_is_harmless() {
        let session = FakeSession::new();
        let controller = CallController::new(session.clone());

        controller.stop().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(controller.status().await, CallStatus::Idle);
        assert_eq!(session.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_reaches_disconnected_via_event() {
        let controller = CallController::new(FakeSession::new());
        controller.start("asst_1").await;
        wait_for(&controller, CallStatus::Connected).await;

        controller.stop().await;
        wait_for(&controller, CallStatus::Disconnected).await;
        assert!(controller.snapshot().await.join_url.is_none());
    }

    #[tokio::test]
    async fn session_error_sets_error_state() {
        let session = FakeSession::new();
        let controller = CallController::new(session.clone());

        session.events.emit(SessionEvent::Error { message: None });
        wait_for(&controller, CallStatus::Error).await;
        assert_eq!(
            controller.snapshot().await.error.as_deref(),
            Some(GENERIC_ERROR)
        );

        session.events.emit(SessionEvent::Error {
            message: Some("Mikrofon blockiert".into()),
        });
        for _ in 0..100 {
            if controller.snapshot().await.error.as_deref() == Some("Mikrofon blockiert") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            controller.snapshot().await.error.as_deref(),
            Some("Mikrofon blockiert")
        );
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let session = FakeSession::new();
        let controller = CallController::new(session.clone());
        session.events.emit(SessionEvent::Error { message: None });
        wait_for(&controller, CallStatus::Error).await;

        controller.reset().await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.status, CallStatus::Idle);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn toggle_starts_then_stops() {
        let session = FakeSession::new();
        let controller = CallController::new(session.clone());

        controller.toggle(Some("asst_1")).await;
        wait_for(&controller, CallStatus::Connected).await;

        controller.toggle(Some("asst_1")).await;
        wait_for(&controller, CallStatus::Disconnected).await;
        assert_eq!(session.starts.load(Ordering::SeqCst), 1);
        assert_eq!(session.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn toggle_without_assistant_reports_error() {
        let session = FakeSession::new();
        let controller = CallController::new(session.clone());

        controller.toggle(None).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.status, CallStatus::Idle);
        assert_eq!(snapshot.error.as_deref(), Some("Keine Assistant ID gefunden."));
        assert_eq!(session.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn volume_updates_are_broadcast_without_status_change() {
        let session = FakeSession::new();
        let controller = CallController::new(session.clone());
        let mut updates = controller.subscribe();

        session.events.emit(SessionEvent::VolumeLevel { level: 1.7 });
        let update = tokio::time::timeout(Duration::from_secs(1), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update, CallUpdate::VolumeLevel { level: 1.0 });
        assert_eq!(controller.status().await, CallStatus::Idle);
    }

    #[tokio::test]
    async fn reset_while_connected_keeps_the_call() {
        let session = FakeSession::new();
        let controller = CallController::new(session.clone());
        controller.start("asst_1").await;
        wait_for(&controller, CallStatus::Connected).await;

        controller.reset().await;
        assert_eq!(controller.status().await, CallStatus::Connected);

        // The next toggle ends the existing call instead of opening a second one
        controller.toggle(Some("asst_1")).await;
        wait_for(&controller, CallStatus::Disconnected).await;
        assert_eq!(session.starts.load(Ordering::SeqCst), 1);
        assert_eq!(session.stops.load(Ordering::SeqCst), 1);
        assert!(!session.live.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stop_during_pending_start_tears_the_call_down() {
        let session = FakeSession::slow(Duration::from_millis(100));
        let controller = Arc::new(CallController::new(session.clone()));

        let starting = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.start("asst_1").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.status().await, CallStatus::Connecting);

        controller.stop().await;
        assert!(!session.live.load(Ordering::SeqCst), "call still live after stop");
        starting.await.unwrap();

        wait_for(&controller, CallStatus::Disconnected).await;
        assert_eq!(session.starts.load(Ordering::SeqCst), 1);
        assert_eq!(session.stops.load(Ordering::SeqCst), 1);
    }
}
