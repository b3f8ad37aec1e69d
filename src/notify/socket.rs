use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use super::events::{ClientMessage, NotificationMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketParams {
    /// Without an event id the client receives every event's messages.
    pub event_id: Option<String>,
}

/// `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<SocketParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.event_id))
}

fn wants(filter: &Option<String>, msg: &NotificationMessage) -> bool {
    filter
        .as_deref()
        .map_or(true, |event_id| msg.notification.event_id() == event_id)
}

async fn send_json(socket: &mut WebSocket, value: serde_json::Value) -> bool {
    socket.send(Message::Text(value.to_string())).await.is_ok()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, mut filter: Option<String>) {
    let mut rx = state.notifier.subscribe();
    tracing::debug!(event_id = ?filter, "Dashboard socket connected");

    let welcome = json!({
        "type": "connected",
        "eventId": filter,
        "currentSequenceId": state.notifier.current_sequence_id(),
    });
    if !send_json(&mut socket, welcome).await {
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(msg) if wants(&filter, &msg) => {
                        let Ok(json) = serde_json::to_string(&msg) else { continue };
                        if socket.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        let lagged = json!({
                            "type": "error",
                            "code": "lagged",
                            "message": format!("Missed {} updates, please refresh", n),
                        });
                        if !send_json(&mut socket, lagged).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(msg)) => {
                        if !handle_client_message(msg, &mut socket, &mut filter).await {
                            break;
                        }
                    }
                    Some(Err(_)) | None => break,
                }
            }
        }
    }

    tracing::debug!(event_id = ?filter, "Dashboard socket closed");
}

/// Returns false when the connection should close.
async fn handle_client_message(
    msg: Message,
    socket: &mut WebSocket,
    filter: &mut Option<String>,
) -> bool {
    match msg {
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => send_json(socket, json!({ "type": "pong" })).await,
                Ok(ClientMessage::Subscribe { event_id }) => {
                    let ack = json!({ "type": "subscribed", "eventId": event_id });
                    *filter = Some(event_id);
                    send_json(socket, ack).await
                }
                // Unknown frames are ignored.
                Err(_) => true,
            }
        }
        Message::Binary(_) | Message::Pong(_) => true,
        Message::Ping(data) => socket.send(Message::Pong(data)).await.is_ok(),
        Message::Close(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notification;

    fn message(event_id: &str) -> NotificationMessage {
        NotificationMessage {
            notification: Notification::NewCheckin {
                event_id: event_id.to_string(),
                checked_in_count: 1,
            },
            sequence_id: 0,
            timestamp: 0,
        }
    }

    #[test]
    fn test_filter_by_event() {
        assert!(wants(&None, &message("E1")));
        assert!(wants(&Some("E1".to_string()), &message("E1")));
        assert!(!wants(&Some("E2".to_string()), &message("E1")));
    }
}
