use axum::{Json, body::Bytes, debug_handler, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Relay, event::ConnectionId};
use crate::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    pub username: String,
    pub client_id: ConnectionId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub message: String,
    pub username: String,
    pub client_id: ConnectionId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessageData {
    pub message: String,
    pub username: String,
    pub client_id: ConnectionId,
    pub recipient_id: ConnectionId,
    pub recipient_username: String,
}

#[derive(Debug)]
pub enum Command {
    Join(JoinData),
    Message(MessageData),
    PrivateMessage(PrivateMessageData),
}

impl Command {
    /// `Ok(None)` for any JSON that is not one of the known command types,
    /// whatever its shape. Unparsable bytes, a `null` body, or bad `data` for
    /// a known type are errors.
    pub fn parse(body: &[u8]) -> anyhow::Result<Option<Command>> {
        let Some(mut request) = serde_json::from_slice::<Option<Value>>(body)? else {
            anyhow::bail!("command body is null");
        };
        let data = request.get_mut("data").map(Value::take).unwrap_or_default();

        Ok(Some(match request.get("type").and_then(Value::as_str) {
            Some("join") => Command::Join(serde_json::from_value(data)?),
            Some("message") => Command::Message(serde_json::from_value(data)?),
            Some("private-message") => Command::PrivateMessage(serde_json::from_value(data)?),
            kind => {
                debug!(kind = ?kind, "ignoring unknown command");
                return Ok(None);
            }
        }))
    }

    pub async fn apply(self, relay: &Relay) {
        match self {
            Command::Join(JoinData { username, client_id }) => {
                relay.join(&client_id, username).await;
            }
            Command::Message(MessageData { message, username, client_id }) => {
                relay.send(&client_id, username, message).await;
            }
            Command::PrivateMessage(PrivateMessageData {
                message,
                username,
                client_id,
                recipient_id,
                recipient_username,
            }) => {
                relay
                    .send_private(&client_id, username, message, recipient_id, recipient_username)
                    .await;
            }
        }
    }
}

#[debug_handler(state = crate::AppState)]
pub async fn command(State(relay): State<Relay>, body: Bytes) -> AppResult<Json<Value>> {
    if let Some(command) = Command::parse(&body)? {
        command.apply(&relay).await;
    }

    Ok(Json(json!({ "success": true })))
}
