//! CBOR-encoded protocol messages.
//!
//! Frame headers are raw binary for cheap routing, but payload bodies use
//! CBOR for type safety and forward compatibility. The [`Payload`] enum
//! covers the whole message surface: room membership and chat, the
//! invitation handshake, and game session traffic.
//!
//! # Invariants
//!
//! - Each payload variant maps to exactly one opcode (enforced by match
//!   exhaustiveness in `opcode()`, `encode()`, and `decode()`).
//! - The variant discriminator is NOT serialized: the frame header's
//!   opcode already identifies the payload type, so a mismatched
//!   opcode/body pair fails to decode instead of silently misrouting.

pub mod game;
pub mod invite;
pub mod room;

use bytes::BufMut;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Frame, FrameHeader, Opcode,
    errors::{ProtocolError, Result},
};

/// Request outcome carried by every response payload.
///
/// Serialized as the lowercase strings `"success"` / `"fail"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The request was accepted and its effects applied.
    Success,
    /// The request was rejected; `message` explains why.
    Fail,
}

impl Outcome {
    /// True for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// All possible frame payloads.
///
/// The payload type is determined by the opcode in the frame header, so
/// only the inner struct content is serialized (no variant tag in CBOR).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    // Rooms and chat
    /// Join a named room.
    JoinRoom(room::JoinRoom),
    /// Membership snapshot entry or local failure.
    JoinRoomResponse(room::JoinRoomResponse),
    /// Relay a chat line.
    ChatMessage(room::ChatMessage),
    /// Chat line broadcast or local failure.
    ChatMessageResponse(room::ChatMessageResponse),
    /// A registered player disconnected.
    PlayerDisconnected(room::PlayerDisconnected),

    // Invitations
    /// Invite a room member to play.
    Invite(invite::Invite),
    /// Invite acknowledgment to the requester.
    InviteResponse(invite::InviteResponse),
    /// Invite notification to the target.
    Invited(invite::Invited),
    /// Withdraw an invitation.
    Uninvite(invite::Uninvite),
    /// Withdrawal notification to either party.
    Uninvited(invite::Uninvited),

    // Game sessions
    /// Start a game with a room member.
    GameStart(game::GameStart),
    /// Game id handshake to both parties.
    GameStartResponse(game::GameStartResponse),
    /// Place a token.
    PlayToken(game::PlayToken),
    /// Token placement acknowledgment to the sender.
    PlayTokenResponse(game::PlayTokenResponse),
    /// Full authoritative game state.
    GameUpdate(game::GameUpdate),
    /// Terminal game state.
    GameOver(game::GameOver),
}

fn de<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

impl Payload {
    /// Opcode corresponding to this payload type.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::JoinRoom(_) => Opcode::JoinRoom,
            Self::JoinRoomResponse(_) => Opcode::JoinRoomResponse,
            Self::ChatMessage(_) => Opcode::ChatMessage,
            Self::ChatMessageResponse(_) => Opcode::ChatMessageResponse,
            Self::PlayerDisconnected(_) => Opcode::PlayerDisconnected,
            Self::Invite(_) => Opcode::Invite,
            Self::InviteResponse(_) => Opcode::InviteResponse,
            Self::Invited(_) => Opcode::Invited,
            Self::Uninvite(_) => Opcode::Uninvite,
            Self::Uninvited(_) => Opcode::Uninvited,
            Self::GameStart(_) => Opcode::GameStart,
            Self::GameStartResponse(_) => Opcode::GameStartResponse,
            Self::PlayToken(_) => Opcode::PlayToken,
            Self::PlayTokenResponse(_) => Opcode::PlayTokenResponse,
            Self::GameUpdate(_) => Opcode::GameUpdate,
            Self::GameOver(_) => Opcode::GameOver,
        }
    }

    /// Encode the payload body into a buffer.
    ///
    /// Serializes only the inner struct, not the variant tag; the frame
    /// header's opcode identifies the payload type on the wire.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::CborEncode`] if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();

        match self {
            Self::JoinRoom(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::JoinRoomResponse(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ChatMessage(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::ChatMessageResponse(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::PlayerDisconnected(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Invite(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::InviteResponse(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Invited(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Uninvite(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::Uninvited(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::GameStart(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::GameStartResponse(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::PlayToken(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::PlayTokenResponse(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::GameUpdate(inner) => ciborium::ser::into_writer(inner, &mut writer),
            Self::GameOver(inner) => ciborium::ser::into_writer(inner, &mut writer),
        }
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode a payload body from bytes based on the opcode.
    ///
    /// The size check happens before CBOR parsing begins, so the parser
    /// never sees maliciously large inputs.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::PayloadTooLarge`] if bytes exceed the wire limit
    /// - [`ProtocolError::CborDecode`] if deserialization fails
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: bytes.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        let payload = match opcode {
            Opcode::JoinRoom => Self::JoinRoom(de(bytes)?),
            Opcode::JoinRoomResponse => Self::JoinRoomResponse(de(bytes)?),
            Opcode::ChatMessage => Self::ChatMessage(de(bytes)?),
            Opcode::ChatMessageResponse => Self::ChatMessageResponse(de(bytes)?),
            Opcode::PlayerDisconnected => Self::PlayerDisconnected(de(bytes)?),
            Opcode::Invite => Self::Invite(de(bytes)?),
            Opcode::InviteResponse => Self::InviteResponse(de(bytes)?),
            Opcode::Invited => Self::Invited(de(bytes)?),
            Opcode::Uninvite => Self::Uninvite(de(bytes)?),
            Opcode::Uninvited => Self::Uninvited(de(bytes)?),
            Opcode::GameStart => Self::GameStart(de(bytes)?),
            Opcode::GameStartResponse => Self::GameStartResponse(de(bytes)?),
            Opcode::PlayToken => Self::PlayToken(de(bytes)?),
            Opcode::PlayTokenResponse => Self::PlayTokenResponse(de(bytes)?),
            Opcode::GameUpdate => Self::GameUpdate(de(bytes)?),
            Opcode::GameOver => Self::GameOver(de(bytes)?),
        };

        Ok(payload)
    }

    /// Convert the payload into a transport frame.
    ///
    /// Encodes the body to CBOR, stamps the matching opcode into the
    /// header, and sizes the frame automatically.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::CborEncode`] if serialization fails
    pub fn into_frame(self, mut header: FrameHeader) -> Result<Frame> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        header.opcode = self.opcode().to_u16().to_be_bytes();
        Ok(Frame::new(header, buf))
    }

    /// Parse a payload from a raw transport frame.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UnknownOpcode`] if the header opcode is not
    ///   registered
    /// - [`ProtocolError::CborDecode`] if deserialization fails
    /// - [`ProtocolError::PayloadTooLarge`] if the body exceeds the limit
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let opcode = frame
            .header
            .opcode_enum()
            .ok_or_else(|| ProtocolError::UnknownOpcode(frame.header.opcode()))?;
        Self::decode(opcode, &frame.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trip() {
        let payload = Payload::JoinRoom(room::JoinRoom {
            room: "Lobby".to_string(),
            username: "alice".to_string(),
        });

        let frame =
            payload.clone().into_frame(FrameHeader::new(Opcode::JoinRoom)).expect("should encode");
        let decoded = Payload::from_frame(&frame).expect("should decode");
        assert_eq!(payload, decoded);
    }

    #[test]
    fn into_frame_overrides_header_opcode() {
        // A header stamped with the wrong opcode is corrected on encode.
        let payload = Payload::Invite(invite::Invite { requested_user: 7 });
        let frame = payload.into_frame(FrameHeader::new(Opcode::ChatMessage)).unwrap();
        assert_eq!(frame.header.opcode_enum(), Some(Opcode::Invite));
    }

    #[test]
    fn mismatched_body_fails_decode() {
        // A chat body under the PlayToken opcode must not parse.
        let chat = Payload::ChatMessage(room::ChatMessage {
            room: "Lobby".to_string(),
            username: "alice".to_string(),
            message: "hi".to_string(),
        });
        let mut body = Vec::new();
        chat.encode(&mut body).unwrap();

        let result = Payload::decode(Opcode::PlayToken, &body);
        assert!(matches!(result, Err(ProtocolError::CborDecode(_))));
    }

    #[test]
    fn outcome_wire_form() {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&Outcome::Success, &mut buf).unwrap();
        let text: String = ciborium::de::from_reader(buf.as_slice()).unwrap();
        assert_eq!(text, "success");
    }
}
