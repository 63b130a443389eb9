//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{EventTopic, Session, StorefrontEvent};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards events visible to `session` and matching its subscriptions.
/// - Closes the socket once its session logs out or the customer's account
///   is banned or deleted.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<StorefrontEvent>,
    session: Session,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new(&session);

    tracing::debug!(principal = ?session.principal, "ws connection opened");

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if subs.matches(&event) {
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&event).unwrap_or_default(),
                            );
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                        if subs.revokes_access(&event) {
                            let _ = ws_tx.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!(principal = ?session.principal, "ws connection closed");
}

/// Splits topic names into known topics and the wildcard flag.
fn parse_topics(names: &[String]) -> Result<(Vec<EventTopic>, bool), String> {
    let mut topics = Vec::with_capacity(names.len());
    let mut wildcard = false;
    for name in names {
        if name == "*" {
            wildcard = true;
            continue;
        }
        let topic = serde_json::from_value::<EventTopic>(serde_json::Value::String(name.clone()))
            .map_err(|_| format!("unknown topic '{name}'"))?;
        topics.push(topic);
    }
    Ok((topics, wildcard))
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error(String::new(), 400, "malformed JSON")).ok();
    };

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return serde_json::to_string(&WsMessage::error(msg.id, 404, "unknown command")).ok();
    };

    let payload = match command {
        WsCommand::Subscribe { topics } => match parse_topics(&topics) {
            Ok((parsed, wildcard)) => {
                subs.subscribe(&parsed, wildcard);
                serde_json::json!({
                    "subscribed": parsed,
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                })
            }
            Err(reason) => {
                return serde_json::to_string(&WsMessage::error(msg.id, 400, &reason)).ok();
            }
        },
        WsCommand::Unsubscribe { topics } => match parse_topics(&topics) {
            Ok((parsed, wildcard)) => {
                subs.unsubscribe(&parsed, wildcard);
                serde_json::json!({
                    "unsubscribed": parsed,
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                })
            }
            Err(reason) => {
                return serde_json::to_string(&WsMessage::error(msg.id, 400, &reason)).ok();
            }
        },
        WsCommand::ListSubscriptions => serde_json::json!({
            "topics": subs.topics(),
            "wildcard": subs.is_subscribed_all(),
            "account_id": subs.account_id(),
        }),
        WsCommand::Ping => serde_json::json!({ "pong": true }),
    };

    serde_json::to_string(&WsMessage::new(msg.id, WsMessageType::Response, payload)).ok()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::domain::AccountId;

    fn customer() -> SubscriptionManager {
        SubscriptionManager::new(&Session::for_account(AccountId::new()))
    }

    fn command(payload: serde_json::Value) -> String {
        serde_json::json!({
            "id": "req-1",
            "type": "command",
            "timestamp": chrono::Utc::now(),
            "payload": payload,
        })
        .to_string()
    }

    fn reply(raw: Option<String>) -> WsMessage {
        let Some(raw) = raw else {
            panic!("expected a reply");
        };
        let Ok(msg) = serde_json::from_str::<WsMessage>(&raw) else {
            panic!("reply is not an envelope: {raw}");
        };
        msg
    }

    #[test]
    fn malformed_json_is_rejected() {
        let mut subs = customer();
        let msg = reply(handle_text_message("{nope", &mut subs));
        assert_eq!(msg.msg_type, WsMessageType::Error);
        assert_eq!(msg.payload["code"], 400);
    }

    #[test]
    fn subscribe_registers_topics() {
        let mut subs = customer();
        let raw = command(serde_json::json!({
            "command": "subscribe",
            "topics": ["credits", "jobs"],
        }));
        let msg = reply(handle_text_message(&raw, &mut subs));
        assert_eq!(msg.msg_type, WsMessageType::Response);
        assert_eq!(msg.id, "req-1");
        assert_eq!(msg.payload["count"], 2);
        assert_eq!(subs.count(), 2);
    }

    #[test]
    fn wildcard_then_unsubscribe() {
        let mut subs = customer();
        let sub = command(serde_json::json!({ "command": "subscribe", "topics": ["*"] }));
        let _ = handle_text_message(&sub, &mut subs);
        assert!(subs.is_subscribed_all());

        let unsub = command(serde_json::json!({ "command": "unsubscribe", "topics": ["*"] }));
        let msg = reply(handle_text_message(&unsub, &mut subs));
        assert_eq!(msg.payload["wildcard"], false);
        assert!(!subs.is_subscribed_all());
    }

    #[test]
    fn unknown_topic_is_an_error() {
        let mut subs = customer();
        let raw = command(serde_json::json!({ "command": "subscribe", "topics": ["weather"] }));
        let msg = reply(handle_text_message(&raw, &mut subs));
        assert_eq!(msg.msg_type, WsMessageType::Error);
        assert_eq!(subs.count(), 0);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let mut subs = customer();
        let raw = command(serde_json::json!({ "command": "teleport" }));
        let msg = reply(handle_text_message(&raw, &mut subs));
        assert_eq!(msg.msg_type, WsMessageType::Error);
        assert_eq!(msg.payload["code"], 404);
    }

    #[test]
    fn ping_gets_pong() {
        let mut subs = customer();
        let raw = command(serde_json::json!({ "command": "ping" }));
        let msg = reply(handle_text_message(&raw, &mut subs));
        assert_eq!(msg.payload["pong"], true);
    }
}
