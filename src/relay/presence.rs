use rand::seq::IndexedRandom;

use super::event::{ConnectionId, User};

const COLORS: [&str; 20] = [
    "#ef4444", "#f97316", "#f59e0b", "#eab308", "#84cc16",
    "#22c55e", "#10b981", "#14b8a6", "#06b6d4", "#0ea5e9",
    "#3b82f6", "#6366f1", "#8b5cf6", "#a855f7", "#d946ef",
    "#ec4899", "#f43f5e", "#64748b", "#6b7280", "#9ca3af",
];

pub enum Joined {
    New(User),
    Existing(User),
}

/// Joined users in join order.
#[derive(Default)]
pub struct Presence {
    users: Vec<User>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, id: &ConnectionId, username: String) -> Joined {
        if let Some(user) = self.find(id) {
            return Joined::Existing(user.clone());
        }

        let user = User {
            id: id.clone(),
            username,
            color: COLORS.choose(&mut rand::rng()).copied().unwrap_or(COLORS[0]),
        };
        self.users.push(user.clone());
        Joined::New(user)
    }

    pub fn leave(&mut self, id: &ConnectionId) -> Option<User> {
        let index = self.users.iter().position(|user| &user.id == id)?;
        Some(self.users.remove(index))
    }

    pub fn find(&self, id: &ConnectionId) -> Option<&User> {
        self.users.iter().find(|user| &user.id == id)
    }

    pub fn find_by_name(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|user| user.username == username)
    }

    pub fn list(&self) -> Vec<User> {
        self.users.clone()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_idempotent() {
        let mut presence = Presence::new();
        let id = ConnectionId::from("a");

        let Joined::New(first) = presence.join(&id, "alice".into()) else {
            panic!("first join should create a user");
        };
        let Joined::Existing(second) = presence.join(&id, "alice again".into()) else {
            panic!("second join should be a no-op");
        };

        assert_eq!(first, second);
        assert_eq!(presence.len(), 1);
        assert_eq!(presence.find(&id).unwrap().username, "alice");
        assert!(COLORS.contains(&first.color));
    }

    #[test]
    fn list_keeps_join_order() {
        let mut presence = Presence::new();
        for name in ["carol", "alice", "bob"] {
            presence.join(&ConnectionId::from(name), name.into());
        }

        let names: Vec<_> = presence.list().into_iter().map(|user| user.username).collect();
        assert_eq!(names, ["carol", "alice", "bob"]);
    }

    #[test]
    fn leave_removes_once() {
        let mut presence = Presence::new();
        let id = ConnectionId::from("b");
        presence.join(&id, "bob".into());

        assert_eq!(presence.leave(&id).map(|user| user.username), Some("bob".into()));
        assert!(presence.leave(&id).is_none());
        assert!(presence.find_by_name("bob").is_none());
        assert!(presence.is_empty());
    }

    #[test]
    fn names_need_not_be_unique() {
        let mut presence = Presence::new();
        presence.join(&"1".into(), "sam".into());
        presence.join(&"2".into(), "sam".into());

        assert_eq!(presence.len(), 2);
        assert_eq!(presence.find_by_name("sam").unwrap().id, ConnectionId::from("1"));
    }
}
