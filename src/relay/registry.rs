use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::event::{ConnectionId, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("connection is closed")]
    Closed,
    #[error("connection buffer is full")]
    Full,
}

impl<T> From<TrySendError<T>> for DeliveryError {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Closed(_) => DeliveryError::Closed,
            TrySendError::Full(_) => DeliveryError::Full,
        }
    }
}

struct Connection {
    tx: mpsc::Sender<String>,
    user_id: Option<ConnectionId>,
}

/// Open push channels keyed by connection id.
pub struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    channel_capacity: usize,
}

impl Registry {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            connections: HashMap::new(),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Opens a channel for a new connection. The receiver is the stream side.
    pub fn register(&mut self) -> (ConnectionId, mpsc::Receiver<String>) {
        let mut id = ConnectionId::generate();
        while self.connections.contains_key(&id) {
            id = ConnectionId::generate();
        }

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        self.connections.insert(id.clone(), Connection { tx, user_id: None });
        (id, rx)
    }

    /// Dropping the sender closes the channel. Returns whether anything was removed.
    pub fn deregister(&mut self, id: &ConnectionId) -> bool {
        self.connections.remove(id).is_some()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().cloned().collect()
    }

    pub fn user_id(&self, id: &ConnectionId) -> Option<&ConnectionId> {
        self.connections.get(id)?.user_id.as_ref()
    }

    /// Returns false if the connection is not registered.
    pub fn attach_user(&mut self, id: &ConnectionId, user_id: ConnectionId) -> bool {
        match self.connections.get_mut(id) {
            Some(connection) => {
                connection.user_id = Some(user_id);
                true
            }
            None => false,
        }
    }

    /// `Ok(false)` when the connection is not registered.
    pub fn send(&self, id: &ConnectionId, event: &Event) -> Result<bool, DeliveryError> {
        let Some(connection) = self.connections.get(id) else {
            return Ok(false);
        };

        connection.tx.try_send(event.encode())?;
        Ok(true)
    }

    /// Pushes to every registered connection and returns the ones that failed.
    pub fn broadcast(&self, event: &Event) -> Vec<ConnectionId> {
        let frame = event.encode();
        self.connections
            .iter()
            .filter(|(_, connection)| connection.tx.try_send(frame.clone()).is_err())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn clear(&mut self) -> Vec<ConnectionId> {
        self.connections.drain().map(|(id, _)| id).collect()
    }
}
