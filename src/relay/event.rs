use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-assigned identifier of one push connection. A joined user shares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: ConnectionId,
    pub username: String,
    pub color: &'static str,
}

/// Marks a message as private and names who it is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyMarker {
    is_private: bool,
    pub recipient_id: ConnectionId,
    pub recipient_username: String,
}

impl PrivacyMarker {
    pub fn new(recipient_id: ConnectionId, recipient_username: String) -> Self {
        Self {
            is_private: true,
            recipient_id,
            recipient_username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: String,
    pub body: String,
    pub username: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub privacy: Option<PrivacyMarker>,
}

impl Message {
    pub fn public(username: String, body: String) -> Self {
        Self {
            id: Uuid::now_v7().simple().to_string(),
            body,
            username,
            timestamp: now_millis(),
            privacy: None,
        }
    }

    pub fn private(username: String, body: String, privacy: PrivacyMarker) -> Self {
        Self {
            privacy: Some(privacy),
            ..Self::public(username, body)
        }
    }

    pub fn is_private(&self) -> bool {
        self.privacy.is_some()
    }
}

fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Everything pushed down a connection's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Event {
    Initial {
        messages: Vec<Message>,
        users: Vec<User>,
        connection_id: ConnectionId,
    },
    Message {
        message: Message,
    },
    PrivateMessage {
        message: Message,
    },
    UserJoined {
        user: User,
    },
    UsersUpdate {
        users: Vec<User>,
    },
    UserLeft {
        user: User,
    },
    Ping,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Initial { .. } => "initial",
            Event::Message { .. } => "message",
            Event::PrivateMessage { .. } => "private-message",
            Event::UserJoined { .. } => "user-joined",
            Event::UsersUpdate { .. } => "users-update",
            Event::UserLeft { .. } => "user-left",
            Event::Ping => "ping",
        }
    }

    /// JSON text of one stream frame.
    pub fn encode(&self) -> String {
        // Every field is a string, integer or list of those.
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"type":"{}"}}"#, self.kind()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn value(event: &Event) -> serde_json::Value {
        serde_json::from_str(&event.encode()).unwrap()
    }

    #[test]
    fn public_message_has_no_privacy_fields() {
        let message = Message::public("alice".into(), "hello".into());
        let encoded = value(&Event::Message { message: message.clone() });

        assert_eq!(encoded["type"], "message");
        assert_eq!(encoded["message"]["body"], "hello");
        assert_eq!(encoded["message"]["username"], "alice");
        assert_eq!(encoded["message"]["timestamp"], message.timestamp);
        assert!(encoded["message"].get("isPrivate").is_none());
        assert!(encoded["message"].get("recipientId").is_none());
    }

    #[test]
    fn private_message_flattens_marker() {
        let marker = PrivacyMarker::new("b0b".into(), "bob".into());
        let message = Message::private("alice".into(), "hi bob".into(), marker);
        let encoded = value(&Event::PrivateMessage { message });

        assert_eq!(encoded["type"], "private-message");
        assert_eq!(encoded["message"]["isPrivate"], true);
        assert_eq!(encoded["message"]["recipientId"], "b0b");
        assert_eq!(encoded["message"]["recipientUsername"], "bob");
    }

    #[test]
    fn initial_uses_camel_case_connection_id() {
        let event = Event::Initial {
            messages: vec![],
            users: vec![],
            connection_id: "abc".into(),
        };

        assert_eq!(
            value(&event),
            json!({ "type": "initial", "messages": [], "users": [], "connectionId": "abc" })
        );
    }

    #[test]
    fn ping_is_bare() {
        assert_eq!(value(&Event::Ping), json!({ "type": "ping" }));
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(ConnectionId::generate(), ConnectionId::generate());
    }
}
