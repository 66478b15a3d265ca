//! WebSocket stream of workflow and call updates.
//!
//! On connect the client gets a `sync` frame with the full snapshot, then
//! every `WorkflowEvent` and `CallUpdate` as it happens. The browser reports
//! what it observes on the live call with `call_event` frames.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::AppState;
use crate::call::SessionEvent;
use crate::workflow::WorkflowSnapshot;

/// Frames only the socket layer produces.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    Sync { workflow: WorkflowSnapshot },
}

/// Frames accepted from the browser.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    CallEvent { event: SessionEvent },
}

pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, frame: &T) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize WS frame");
            true
        }
    }
}

async fn send_sync(socket: &mut WebSocket, state: &AppState) -> bool {
    let workflow = state.workflow.snapshot().await;
    send_json(socket, &ServerFrame::Sync { workflow }).await
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("WebSocket client connected");

    // Subscribe before the snapshot so nothing falls between them
    let mut workflow_rx = state.workflow.subscribe();
    let mut call_rx = state.workflow.call().subscribe();

    if !send_sync(&mut socket, &state).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = workflow_rx.recv() => {
                let alive = match result {
                    Ok(event) => send_json(&mut socket, &event).await,
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind workflow events");
                        send_sync(&mut socket, &state).await
                    }
                    Err(RecvError::Closed) => {
                        debug!("Workflow channel closed");
                        false
                    }
                };
                if !alive {
                    break;
                }
            }

            result = call_rx.recv() => {
                let alive = match result {
                    Ok(update) => send_json(&mut socket, &update).await,
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind call updates");
                        send_sync(&mut socket, &state).await
                    }
                    Err(RecvError::Closed) => {
                        debug!("Call channel closed");
                        false
                    }
                };
                if !alive {
                    break;
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => handle_client_message(&text, &state),
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

fn handle_client_message(text: &str, state: &AppState) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::CallEvent { event }) => match &state.session_events {
            Some(events) => {
                debug!(event = ?event, "Call event from browser");
                events.emit(event);
            }
            None => debug!("No session accepts browser call events, ignoring"),
        },
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_event_frames() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"call_event","event":{"type":"volume-level","level":0.4}}"#)
                .unwrap();
        let ClientFrame::CallEvent { event } = frame;
        assert_eq!(event, SessionEvent::VolumeLevel { level: 0.4 });

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"call_event","event":{"type":"call-end"}}"#).unwrap();
        let ClientFrame::CallEvent { event } = frame;
        assert_eq!(event, SessionEvent::CallEnd);
    }

    #[test]
    fn rejects_unknown_frames() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"approve"}"#).is_err());
    }
}
