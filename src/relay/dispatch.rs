use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use super::{
    event::{ConnectionId, Event, Message, PrivacyMarker, User},
    history::History,
    presence::{Joined, Presence},
    registry::Registry,
};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Joined,
    Closed,
}

struct RelayState {
    registry: Registry,
    presence: Presence,
    history: History,
}

impl RelayState {
    /// Fans out and returns the connections that could not be written to.
    fn broadcast(&self, event: Event) -> Vec<ConnectionId> {
        let failed = self.registry.broadcast(&event);
        debug!(kind = event.kind(), failed = failed.len(), "broadcast");
        failed
    }

    /// Removes connections and announces departures. Connections that fail while
    /// being told about a departure are reaped in the same pass.
    fn reap(&mut self, mut pending: Vec<ConnectionId>) {
        while let Some(id) = pending.pop() {
            if !self.registry.deregister(&id) {
                continue;
            }

            let Some(user) = self.presence.leave(&id) else {
                info!(connection = %id, "connection closed");
                continue;
            };
            info!(connection = %id, username = %user.username, "user left");

            pending.extend(self.broadcast(Event::UserLeft { user }));
            pending.extend(self.broadcast(Event::UsersUpdate { users: self.presence.list() }));
        }
    }
}

/// Owns the registry, presence directory and message log behind one lock.
#[derive(Clone)]
pub struct Relay {
    state: Arc<Mutex<RelayState>>,
}

impl Relay {
    pub fn new(config: &Config) -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState {
                registry: Registry::new(config.channel_capacity),
                presence: Presence::new(),
                history: History::new(config.log_capacity),
            })),
        }
    }

    /// Registers a connection and queues the `initial` snapshot as its first event.
    pub async fn connect(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let mut state = self.state.lock().await;
        let (connection_id, rx) = state.registry.register();

        let initial = Event::Initial {
            messages: state.history.snapshot(),
            users: state.presence.list(),
            connection_id: connection_id.clone(),
        };

        if state.registry.send(&connection_id, &initial).is_err() {
            state.reap(vec![connection_id.clone()]);
        }

        info!(
            connection = %connection_id,
            connections = state.registry.len(),
            users = state.presence.len(),
            "client connected"
        );
        (connection_id, rx)
    }

    /// Returns the user only when this call created it.
    pub async fn join(&self, id: &ConnectionId, username: String) -> Option<User> {
        let mut state = self.state.lock().await;

        if !state.registry.contains(id) {
            debug!(connection = %id, username = %username, "join for unknown connection");
            return None;
        }

        let user = match state.presence.join(id, username) {
            Joined::New(user) => user,
            Joined::Existing(user) => {
                debug!(connection = %id, username = %user.username, "already joined");
                return None;
            }
        };
        state.registry.attach_user(id, user.id.clone());
        info!(
            connection = %id,
            username = %user.username,
            users = state.presence.len(),
            "user joined"
        );

        let mut failed = state.broadcast(Event::UserJoined { user: user.clone() });
        failed.extend(state.broadcast(Event::UsersUpdate { users: state.presence.list() }));
        state.reap(failed);

        Some(user)
    }

    pub async fn send(&self, id: &ConnectionId, username: String, body: String) -> Message {
        let message = Message::public(username, body);
        debug!(connection = %id, message = %message.id, "public message");

        let mut state = self.state.lock().await;
        state.history.append(message.clone());
        let failed = state.broadcast(Event::Message { message: message.clone() });
        state.reap(failed);

        message
    }

    /// Delivers to the sender and then the recipient, one write each, even when
    /// they are the same connection. Either side may be gone.
    pub async fn send_private(
        &self,
        id: &ConnectionId,
        username: String,
        body: String,
        recipient_id: ConnectionId,
        recipient_username: String,
    ) -> Message {
        let marker = PrivacyMarker::new(recipient_id.clone(), recipient_username);
        let message = Message::private(username, body, marker);
        debug!(connection = %id, recipient = %recipient_id, "private message");

        let event = Event::PrivateMessage { message: message.clone() };

        let mut state = self.state.lock().await;
        let failed: Vec<ConnectionId> = [id.clone(), recipient_id]
            .into_iter()
            .filter(|target| state.registry.send(target, &event).is_err())
            .collect();
        state.reap(failed);

        message
    }

    /// Runs the departure path for one connection. Safe to call repeatedly.
    pub async fn disconnect(&self, id: &ConnectionId) {
        self.state.lock().await.reap(vec![id.clone()]);
    }

    /// Pings every connection and reaps the ones that no longer accept writes.
    pub async fn heartbeat(&self) -> usize {
        let mut state = self.state.lock().await;
        let failed = state.broadcast(Event::Ping);
        let reaped = failed.len();
        state.reap(failed);
        reaped
    }

    /// Drops every channel, ending all open streams.
    pub async fn close_all(&self) {
        let mut state = self.state.lock().await;
        let closed = state.registry.clear();
        for id in &closed {
            state.presence.leave(id);
        }
        info!(closed = closed.len(), "closed all connections");
    }

    pub async fn state(&self, id: &ConnectionId) -> ConnectionState {
        let state = self.state.lock().await;
        if !state.registry.contains(id) {
            ConnectionState::Closed
        } else if state.registry.user_id(id).is_some() {
            ConnectionState::Joined
        } else {
            ConnectionState::Open
        }
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.presence.list()
    }

    pub async fn find_user(&self, id: &ConnectionId) -> Option<User> {
        self.state.lock().await.presence.find(id).cloned()
    }

    pub async fn find_user_by_name(&self, username: &str) -> Option<User> {
        self.state.lock().await.presence.find_by_name(username).cloned()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.history.snapshot()
    }

    pub async fn connections(&self) -> Vec<ConnectionId> {
        self.state.lock().await.registry.ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay() -> Relay {
        Relay::new(&Config::default())
    }

    fn kinds(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut kinds = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            kinds.push(value["type"].as_str().unwrap().to_owned());
        }
        kinds
    }

    #[tokio::test]
    async fn state_machine_follows_lifecycle() {
        let relay = relay();
        let (id, _rx) = relay.connect().await;

        assert_eq!(relay.state(&id).await, ConnectionState::Open);
        relay.join(&id, "alice".into()).await;
        assert_eq!(relay.state(&id).await, ConnectionState::Joined);
        relay.disconnect(&id).await;
        assert_eq!(relay.state(&id).await, ConnectionState::Closed);
        relay.disconnect(&id).await;
        assert_eq!(relay.state(&id).await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn join_for_unregistered_connection_is_ignored() {
        let relay = relay();
        let (_id, mut rx) = relay.connect().await;
        kinds(&mut rx);

        assert!(relay.join(&"ghost".into(), "casper".into()).await.is_none());
        assert!(relay.users().await.is_empty());
        assert!(kinds(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn private_to_self_is_pushed_per_side() {
        let relay = relay();
        let (id, mut rx) = relay.connect().await;
        kinds(&mut rx);

        relay
            .send_private(&id, "alice".into(), "note".into(), id.clone(), "alice".into())
            .await;

        assert_eq!(kinds(&mut rx), ["private-message", "private-message"]);
        assert_eq!(relay.state(&id).await, ConnectionState::Open);
    }

    #[tokio::test]
    async fn send_reaps_dead_connections() {
        let relay = relay();
        let (alice, _rx_alice) = relay.connect().await;
        let (bob, rx_bob) = relay.connect().await;
        relay.join(&bob, "bob".into()).await;
        drop(rx_bob);

        relay.send(&alice, "alice".into(), "hi".into()).await;

        assert_eq!(relay.state(&bob).await, ConnectionState::Closed);
        assert!(relay.users().await.is_empty());
    }

    #[tokio::test]
    async fn close_all_ends_every_stream() {
        let relay = relay();
        let (_a, mut rx_a) = relay.connect().await;
        let (b, _rx_b) = relay.connect().await;
        relay.join(&b, "bob".into()).await;

        relay.close_all().await;

        assert!(relay.connections().await.is_empty());
        assert!(relay.users().await.is_empty());
        kinds(&mut rx_a);
        assert!(rx_a.recv().await.is_none());
    }
}
