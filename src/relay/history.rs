use std::collections::VecDeque;

use super::event::Message;

/// Public messages kept for replay to new connections.
pub struct History {
    messages: VecDeque<Message>,
    capacity: Option<usize>,
}

impl History {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    /// Private messages are never retained.
    pub fn append(&mut self, message: Message) {
        if message.is_private() {
            return;
        }

        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while self.messages.len() >= capacity {
                self.messages.pop_front();
            }
        }
        self.messages.push_back(message);
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
