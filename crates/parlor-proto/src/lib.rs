//! Parlor wire protocol.
//!
//! Defines the transport framing and message surface for the parlor
//! coordination server: a fixed 16-byte binary header for O(1) routing,
//! CBOR-encoded payload bodies for type safety, and one opcode per
//! client/server event.
//!
//! The crate is pure data: no I/O, no async. Servers and clients share it.

mod errors;
mod frame;
mod header;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use payloads::Payload;

/// ALPN protocol identifier negotiated during the TLS handshake.
pub const ALPN_PROTOCOL: &[u8] = b"parlor";

/// Operation codes identifying the payload type of a frame.
///
/// Requests (client to server) and their responses share a numeric block
/// per feature area: room membership and chat in 0x000x, invitations in
/// 0x001x, game session traffic in 0x002x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Join a named room (request).
    JoinRoom = 0x0001,
    /// Membership snapshot entry, broadcast per member (response).
    JoinRoomResponse = 0x0002,
    /// Relay a chat line to a room (request).
    ChatMessage = 0x0003,
    /// Chat line broadcast (response).
    ChatMessageResponse = 0x0004,
    /// A registered player left the server (broadcast).
    PlayerDisconnected = 0x0005,

    /// Invite another room member to play (request).
    Invite = 0x0010,
    /// Local acknowledgment of an invite (response).
    InviteResponse = 0x0011,
    /// Delivered to the invited member (event).
    Invited = 0x0012,
    /// Withdraw an invitation (request).
    Uninvite = 0x0013,
    /// Delivered to both parties of a withdrawal (event).
    Uninvited = 0x0014,

    /// Start a game with another room member (request).
    GameStart = 0x0020,
    /// Game id handshake, sent to both parties (response).
    GameStartResponse = 0x0021,
    /// Place a token on the board (request).
    PlayToken = 0x0022,
    /// Local acknowledgment of a token placement (response).
    PlayTokenResponse = 0x0023,
    /// Full authoritative game state (broadcast).
    GameUpdate = 0x0024,
    /// Terminal game state once the board fills (broadcast).
    GameOver = 0x0025,
}

impl Opcode {
    /// Numeric wire value of this opcode.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire value into an opcode. `None` for unknown values.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::JoinRoom),
            0x0002 => Some(Self::JoinRoomResponse),
            0x0003 => Some(Self::ChatMessage),
            0x0004 => Some(Self::ChatMessageResponse),
            0x0005 => Some(Self::PlayerDisconnected),
            0x0010 => Some(Self::Invite),
            0x0011 => Some(Self::InviteResponse),
            0x0012 => Some(Self::Invited),
            0x0013 => Some(Self::Uninvite),
            0x0014 => Some(Self::Uninvited),
            0x0020 => Some(Self::GameStart),
            0x0021 => Some(Self::GameStartResponse),
            0x0022 => Some(Self::PlayToken),
            0x0023 => Some(Self::PlayTokenResponse),
            0x0024 => Some(Self::GameUpdate),
            0x0025 => Some(Self::GameOver),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Opcode; 16] = [
        Opcode::JoinRoom,
        Opcode::JoinRoomResponse,
        Opcode::ChatMessage,
        Opcode::ChatMessageResponse,
        Opcode::PlayerDisconnected,
        Opcode::Invite,
        Opcode::InviteResponse,
        Opcode::Invited,
        Opcode::Uninvite,
        Opcode::Uninvited,
        Opcode::GameStart,
        Opcode::GameStartResponse,
        Opcode::PlayToken,
        Opcode::PlayTokenResponse,
        Opcode::GameUpdate,
        Opcode::GameOver,
    ];

    #[test]
    fn opcode_round_trip() {
        for op in ALL {
            assert_eq!(Opcode::from_u16(op.to_u16()), Some(op));
        }
    }

    #[test]
    fn unknown_opcode_rejected() {
        assert_eq!(Opcode::from_u16(0x0000), None);
        assert_eq!(Opcode::from_u16(0x00FF), None);
        assert_eq!(Opcode::from_u16(0xFFFF), None);
    }
}
