//! Invitation handshake payload types.
//!
//! Invitations are stateless point-to-point relays: the server validates
//! that both parties share a room and forwards the event. No pending
//! invitation record is kept, so repeated invites and withdrawals are
//! idempotent at the message level.

use serde::{Deserialize, Serialize};

use super::Outcome;

/// Request to invite another member of the sender's room to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// Session id of the member to invite.
    pub requested_user: u64,
}

/// Acknowledgment of an invite, sent to the requester only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteResponse {
    /// Request outcome.
    pub result: Outcome,
    /// Failure reason; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The invited member's session id; zero on failure.
    pub session_id: u64,
}

impl InviteResponse {
    /// Successful acknowledgment naming the invited member.
    #[must_use]
    pub fn ok(session_id: u64) -> Self {
        Self { result: Outcome::Success, message: None, session_id }
    }

    /// Local failure response.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self { result: Outcome::Fail, message: Some(message.into()), session_id: 0 }
    }
}

/// Delivered to the invited member, naming the inviter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invited {
    /// Always success; failures never reach the target.
    pub result: Outcome,
    /// The inviter's session id.
    pub session_id: u64,
}

impl Invited {
    /// Notification naming the inviter.
    #[must_use]
    pub fn by(session_id: u64) -> Self {
        Self { result: Outcome::Success, session_id }
    }
}

/// Request to withdraw an invitation to a room member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uninvite {
    /// Session id of the member to uninvite.
    pub requested_user: u64,
}

/// Withdrawal notification. The requester receives one naming the target;
/// the target receives one naming the requester. Failures go to the
/// requester only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uninvited {
    /// Request outcome.
    pub result: Outcome,
    /// Failure reason; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The other party's session id; zero on failure.
    pub session_id: u64,
}

impl Uninvited {
    /// Successful notification naming the other party.
    #[must_use]
    pub fn ok(session_id: u64) -> Self {
        Self { result: Outcome::Success, message: None, session_id }
    }

    /// Local failure response.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self { result: Outcome::Fail, message: Some(message.into()), session_id: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_response_constructors() {
        let ok = InviteResponse::ok(99);
        assert!(ok.result.is_success());
        assert_eq!(ok.session_id, 99);

        let fail = InviteResponse::fail("no longer in the room");
        assert_eq!(fail.result, Outcome::Fail);
        assert_eq!(fail.message.as_deref(), Some("no longer in the room"));
    }
}
