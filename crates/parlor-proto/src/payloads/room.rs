//! Room membership and chat payload types.

use serde::{Deserialize, Serialize};

use super::Outcome;

/// Request to join a named room.
///
/// A session belongs to one room at a time; joining a new room leaves the
/// previous one. Joining also (re)registers the sender's player record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoom {
    /// Room to join.
    pub room: String,
    /// Username to register for the joining session.
    pub username: String,
}

/// Membership snapshot entry, broadcast once per current member after any
/// successful join, or sent alone to the requester on failure.
///
/// Every client rebuilds its roster from the same snapshot round, since
/// membership cannot be diffed cheaply across independent clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    /// Request outcome.
    pub result: Outcome,
    /// Failure reason; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Room this entry describes.
    pub room: String,
    /// Username of the member this entry describes.
    pub username: String,
    /// Total occupancy of the room in this snapshot round.
    pub count: u32,
    /// Session id of the member this entry describes.
    pub session_id: u64,
}

impl JoinRoomResponse {
    /// Snapshot entry for one current member.
    #[must_use]
    pub fn member(room: impl Into<String>, username: impl Into<String>, count: u32, session_id: u64) -> Self {
        Self {
            result: Outcome::Success,
            message: None,
            room: room.into(),
            username: username.into(),
            count,
            session_id,
        }
    }

    /// Local failure response.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            result: Outcome::Fail,
            message: Some(message.into()),
            room: String::new(),
            username: String::new(),
            count: 0,
            session_id: 0,
        }
    }
}

/// Request to relay a chat line to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Room the line is addressed to.
    pub room: String,
    /// Sender's display name.
    pub username: String,
    /// The chat line itself. May be empty.
    pub message: String,
}

/// Chat line broadcast to a room, or local failure to the sender.
///
/// `message` carries the chat text on success and the failure reason on
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    /// Request outcome.
    pub result: Outcome,
    /// Sender's display name; empty on failure.
    pub username: String,
    /// Room the line was addressed to; empty on failure.
    pub room: String,
    /// Chat text, or failure reason.
    pub message: String,
}

impl ChatMessageResponse {
    /// Broadcast form of an accepted chat line.
    #[must_use]
    pub fn relayed(
        username: impl Into<String>,
        room: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            result: Outcome::Success,
            username: username.into(),
            room: room.into(),
            message: message.into(),
        }
    }

    /// Local failure response.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            result: Outcome::Fail,
            username: String::new(),
            room: String::new(),
            message: message.into(),
        }
    }
}

/// Broadcast to a room when one of its registered players disconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDisconnected {
    /// Username of the departed player.
    pub username: String,
    /// Room the player was in.
    pub room: String,
    /// Total registered players remaining on the server. An
    /// approximation, not a per-room occupancy count.
    pub count: u32,
    /// Session id of the departed player.
    pub session_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_response_omits_message_field_on_success() {
        let ok = JoinRoomResponse::member("Lobby", "alice", 1, 42);

        let mut buf = Vec::new();
        ciborium::ser::into_writer(&ok, &mut buf).unwrap();
        let value: ciborium::Value = ciborium::de::from_reader(buf.as_slice()).unwrap();

        let map = value.as_map().unwrap();
        assert!(map.iter().all(|(k, _)| k.as_text() != Some("message")));
    }

    #[test]
    fn fail_response_carries_reason() {
        let fail = JoinRoomResponse::fail("no room named");
        assert_eq!(fail.result, Outcome::Fail);
        assert_eq!(fail.message.as_deref(), Some("no room named"));
        assert_eq!(fail.count, 0);
    }
}
