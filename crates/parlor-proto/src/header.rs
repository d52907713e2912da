//! Frame header implementation with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 16-byte structure serialized as raw binary
//! (Big Endian). Routing decisions (which handler a frame goes to) only
//! need the header, so the server can dispatch without touching the CBOR
//! payload.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    Opcode,
    errors::{ProtocolError, Result},
};

/// Fixed 16-byte frame header (Big Endian network byte order).
///
/// Fields are stored as raw byte arrays to avoid alignment issues. The
/// `#[repr(C, packed)]` layout with zerocopy traits allows the struct to
/// be cast directly from untrusted network bytes: every 16-byte pattern is
/// a structurally valid header, and semantic validation (magic, version,
/// size limit) happens in [`FrameHeader::from_bytes`].
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4],                   // 0x50524C52 ("PRLR" in ASCII)
    version: u8,                      // 0x01
    flags: u8,                        // reserved, must be zero
    pub(crate) opcode: [u8; 2],       // u16 operation code
    request_id: [u8; 4],              // u32 client correlation nonce
    pub(crate) payload_size: [u8; 4], // u32 payload length
}

impl FrameHeader {
    /// Size of the serialized header (16 bytes).
    pub const SIZE: usize = 16;

    /// Magic number: "PRLR" in ASCII.
    pub const MAGIC: u32 = 0x5052_4C52;

    /// Current protocol version.
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (64 KB).
    ///
    /// Room names, usernames, chat lines, and full game snapshots all fit
    /// comfortably; anything larger is a protocol violation.
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Create a new header with the specified opcode.
    #[must_use]
    pub fn new(opcode: Opcode) -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            flags: 0,
            opcode: opcode.to_u16().to_be_bytes(),
            request_id: [0; 4],
            payload_size: [0; 4],
        }
    }

    /// Parse a header from network bytes (zero-copy, safe).
    ///
    /// Validates cheapest-to-check properties first (size, magic) before
    /// version and payload limit, failing fast on garbage data. No bytes
    /// are copied.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::FrameTooShort`] if the buffer is under 16 bytes
    /// - [`ProtocolError::InvalidMagic`] if the magic number is wrong
    /// - [`ProtocolError::UnsupportedVersion`] for unknown versions
    /// - [`ProtocolError::PayloadTooLarge`] if the claimed payload size
    ///   exceeds [`FrameHeader::MAX_PAYLOAD_SIZE`]
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let header = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            })?
            .0;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize the header to its 16-byte wire form.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.magic);
        out[4] = self.version;
        out[5] = self.flags;
        out[6..8].copy_from_slice(&self.opcode);
        out[8..12].copy_from_slice(&self.request_id);
        out[12..16].copy_from_slice(&self.payload_size);
        out
    }

    /// Raw opcode value.
    #[must_use]
    pub fn opcode(&self) -> u16 {
        u16::from_be_bytes(self.opcode)
    }

    /// Opcode as the typed enum. `None` for unknown values.
    #[must_use]
    pub fn opcode_enum(&self) -> Option<Opcode> {
        Opcode::from_u16(self.opcode())
    }

    /// Client-chosen correlation nonce, echoed back in direct responses.
    #[must_use]
    pub fn request_id(&self) -> u32 {
        u32::from_be_bytes(self.request_id)
    }

    /// Set the correlation nonce.
    pub fn set_request_id(&mut self, request_id: u32) {
        self.request_id = request_id.to_be_bytes();
    }

    /// Payload length claimed by this header.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("opcode", &format_args!("{:#06x}", self.opcode()))
            .field("request_id", &self.request_id())
            .field("payload_size", &self.payload_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_header_is_parseable() {
        let header = FrameHeader::new(Opcode::JoinRoom);
        let bytes = header.to_bytes();

        let parsed = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.opcode_enum(), Some(Opcode::JoinRoom));
        assert_eq!(parsed.payload_size(), 0);
        assert_eq!(parsed.request_id(), 0);
    }

    #[test]
    fn round_trip_preserves_request_id() {
        let mut header = FrameHeader::new(Opcode::PlayToken);
        header.set_request_id(0xDEAD_BEEF);

        let bytes = header.to_bytes();
        let parsed = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.request_id(), 0xDEAD_BEEF);
    }

    #[test]
    fn reject_short_buffer() {
        let result = FrameHeader::from_bytes(&[0u8; 8]);
        assert!(matches!(result, Err(ProtocolError::FrameTooShort { expected: 16, actual: 8 })));
    }

    #[test]
    fn reject_bad_magic() {
        let mut bytes = FrameHeader::new(Opcode::JoinRoom).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(FrameHeader::from_bytes(&bytes), Err(ProtocolError::InvalidMagic)));
    }

    #[test]
    fn reject_unknown_version() {
        let mut bytes = FrameHeader::new(Opcode::JoinRoom).to_bytes();
        bytes[4] = 0x7F;
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(ProtocolError::UnsupportedVersion(0x7F))
        ));
    }

    #[test]
    fn reject_oversized_payload_claim() {
        let mut bytes = FrameHeader::new(Opcode::ChatMessage).to_bytes();
        bytes[12..16].copy_from_slice(&(FrameHeader::MAX_PAYLOAD_SIZE + 1).to_be_bytes());
        assert!(matches!(
            FrameHeader::from_bytes(&bytes),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }
}
