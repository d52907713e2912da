//! Connection registry for player records and room subscriptions.
//!
//! The registry maintains bidirectional mappings: room → sessions (for
//! broadcast and enumeration) and session → room (for cleanup on
//! disconnect). A session belongs to at most one room at a time:
//! subscribing to a new room silently leaves the previous one.
//!
//! Player records are separate from subscriptions. A session subscribes
//! first and is registered as a player only once its join has been
//! confirmed against the post-subscribe enumeration, so absence of a
//! record is a normal not-yet-joined state, not an error.

use std::collections::{HashMap, HashSet};

/// A registered player: the username and room submitted with the most
/// recent successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Display name, set at join.
    pub username: String,
    /// Current room. One room at a time.
    pub room: String,
}

/// Registry tracking player records and room subscriptions.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Session id → player record.
    players: HashMap<u64, Player>,
    /// Room name → set of subscribed session ids.
    room_members: HashMap<String, HashSet<u64>>,
    /// Session id → room it is subscribed to.
    session_room: HashMap<u64, String>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the player record for a session.
    pub fn register(&mut self, session_id: u64, username: impl Into<String>, room: impl Into<String>) {
        self.players
            .insert(session_id, Player { username: username.into(), room: room.into() });
    }

    /// Player record for a session. `None` means not yet joined.
    #[must_use]
    pub fn lookup(&self, session_id: u64) -> Option<&Player> {
        self.players.get(&session_id)
    }

    /// Remove and return the player record for a session.
    pub fn remove(&mut self, session_id: u64) -> Option<Player> {
        self.players.remove(&session_id)
    }

    /// Number of registered players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Subscribe a session to a room, leaving its previous room if any.
    pub fn subscribe(&mut self, session_id: u64, room: impl Into<String>) {
        let room = room.into();

        if self.session_room.get(&session_id) == Some(&room) {
            return;
        }

        self.unsubscribe(session_id);
        self.room_members.entry(room.clone()).or_default().insert(session_id);
        self.session_room.insert(session_id, room);
    }

    /// Remove a session from whatever room it is subscribed to.
    ///
    /// Returns the room it was in, if any. Empty member sets are dropped.
    pub fn unsubscribe(&mut self, session_id: u64) -> Option<String> {
        let room = self.session_room.remove(&session_id)?;

        if let Some(members) = self.room_members.get_mut(&room) {
            members.remove(&session_id);
            if members.is_empty() {
                self.room_members.remove(&room);
            }
        }

        Some(room)
    }

    /// Check whether a session is subscribed to a room.
    #[must_use]
    pub fn is_member(&self, session_id: u64, room: &str) -> bool {
        self.room_members.get(room).is_some_and(|m| m.contains(&session_id))
    }

    /// Current membership snapshot of a room.
    ///
    /// Enumeration order is unspecified; callers must not depend on it.
    #[must_use]
    pub fn members_of(&self, room: &str) -> Vec<u64> {
        self.room_members.get(room).map(|m| m.iter().copied().collect()).unwrap_or_default()
    }

    /// Number of sessions subscribed to a room.
    #[must_use]
    pub fn occupancy(&self, room: &str) -> usize {
        self.room_members.get(room).map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut registry = ConnectionRegistry::new();

        assert!(registry.lookup(1).is_none());

        registry.register(1, "alice", "Lobby");
        let player = registry.lookup(1).unwrap();
        assert_eq!(player.username, "alice");
        assert_eq!(player.room, "Lobby");
    }

    #[test]
    fn register_updates_existing_record() {
        let mut registry = ConnectionRegistry::new();

        registry.register(1, "alice", "Lobby");
        registry.register(1, "alice", "4f2a1");

        assert_eq!(registry.lookup(1).unwrap().room, "4f2a1");
        assert_eq!(registry.player_count(), 1);
    }

    #[test]
    fn remove_returns_record() {
        let mut registry = ConnectionRegistry::new();

        registry.register(1, "alice", "Lobby");
        let player = registry.remove(1).unwrap();
        assert_eq!(player.username, "alice");
        assert!(registry.lookup(1).is_none());
        assert!(registry.remove(1).is_none());
    }

    #[test]
    fn subscribe_and_enumerate() {
        let mut registry = ConnectionRegistry::new();

        registry.subscribe(1, "Lobby");
        registry.subscribe(2, "Lobby");

        assert!(registry.is_member(1, "Lobby"));
        assert!(registry.is_member(2, "Lobby"));
        assert_eq!(registry.occupancy("Lobby"), 2);

        let mut members = registry.members_of("Lobby");
        members.sort_unstable();
        assert_eq!(members, vec![1, 2]);
    }

    #[test]
    fn subscribe_replaces_previous_room() {
        let mut registry = ConnectionRegistry::new();

        registry.subscribe(1, "Lobby");
        registry.subscribe(1, "4f2a1");

        assert!(!registry.is_member(1, "Lobby"));
        assert!(registry.is_member(1, "4f2a1"));
        assert_eq!(registry.occupancy("Lobby"), 0);
        assert!(registry.members_of("Lobby").is_empty());
    }

    #[test]
    fn resubscribe_to_same_room_is_noop() {
        let mut registry = ConnectionRegistry::new();

        registry.subscribe(1, "Lobby");
        registry.subscribe(1, "Lobby");

        assert_eq!(registry.occupancy("Lobby"), 1);
    }

    #[test]
    fn unsubscribe_returns_room_and_cleans_up() {
        let mut registry = ConnectionRegistry::new();

        registry.subscribe(1, "Lobby");
        assert_eq!(registry.unsubscribe(1).as_deref(), Some("Lobby"));
        assert!(registry.unsubscribe(1).is_none());
        assert_eq!(registry.occupancy("Lobby"), 0);
    }

    #[test]
    fn unknown_room_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.members_of("nowhere").is_empty());
        assert_eq!(registry.occupancy("nowhere"), 0);
        assert!(!registry.is_member(1, "nowhere"));
    }
}
