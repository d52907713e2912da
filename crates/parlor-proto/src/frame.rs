//! Frame type combining header and payload.
//!
//! A `Frame` is the transport-layer packet: a 16-byte raw binary header
//! followed by a variable-length, already-encoded CBOR payload. It is a
//! pure data holder; for high-level logic see [`crate::Payload`].

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame (transport layer).
///
/// Wire layout: `[FrameHeader: 16 bytes] + [payload: variable bytes]`.
///
/// Holds raw bytes, not the `Payload` enum, so the server can route frames
/// without deserializing the body.
///
/// # Invariants
///
/// - `payload.len()` matches `header.payload_size()`, enforced by
///   [`Frame::new`] and verified by [`Frame::decode`].
/// - `payload.len()` never exceeds [`FrameHeader::MAX_PAYLOAD_SIZE`];
///   violations are rejected during encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header (16 bytes).
    pub header: FrameHeader,

    /// Raw payload bytes (already CBOR-encoded).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame with automatic `payload_size` calculation.
    ///
    /// The header's size field is overwritten to match the actual payload
    /// length, so a frame with a mismatched header cannot be constructed.
    #[must_use]
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();

        // INVARIANT: Bytes is bounded by isize::MAX and the protocol limit
        // is 64 KB, so the length always fits in u32.
        #[allow(clippy::expect_used)]
        let payload_len = u32::try_from(payload.len())
            .expect("invariant: payload length fits in u32 (bounded by protocol limit)");

        header.payload_size = payload_len.to_be_bytes();

        Self { header, payload }
    }

    /// Encode the frame into a buffer.
    ///
    /// This is the enforcement point for the payload size limit; oversized
    /// frames are rejected before any bytes are written.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::PayloadTooLarge`] if the payload exceeds
    ///   [`FrameHeader::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        debug_assert_eq!(self.payload.len(), self.header.payload_size() as usize);

        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode a frame from wire format.
    ///
    /// Returns a frame with raw payload bytes; CBOR parsing happens later
    /// via [`crate::Payload::from_frame`]. All validation happens before
    /// the payload is copied, and only exactly `payload_size` bytes are
    /// read (trailing data is ignored).
    ///
    /// # Errors
    ///
    /// - Header errors from [`FrameHeader::from_bytes`]
    /// - [`ProtocolError::FrameTruncated`] if the buffer holds fewer
    ///   payload bytes than the header claims
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;

        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        if bytes.len() < total_size {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        }

        // INVARIANT: bytes.len() >= total_size was checked above, so this
        // range is in bounds.
        #[allow(clippy::expect_used)]
        let payload = Bytes::copy_from_slice(
            bytes.get(FrameHeader::SIZE..total_size).expect("invariant: bounds checked above"),
        );

        Ok(Self { header: *header, payload })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::Opcode;

    #[test]
    fn frame_with_payload_round_trips() {
        let header = FrameHeader::new(Opcode::ChatMessage);
        let frame = Frame::new(header, vec![1, 2, 3, 4]);

        assert_eq!(frame.header.payload_size(), 4);

        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();

        let parsed = Frame::decode(&wire).unwrap();
        assert_eq!(parsed.header.opcode_enum(), Some(Opcode::ChatMessage));
        assert_eq!(frame.payload, parsed.payload);
    }

    #[test]
    fn reject_truncated_frame() {
        let header = FrameHeader::new(Opcode::ChatMessage);
        let frame = Frame::new(header, vec![0u8; 100]);

        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();

        // Drop the tail of the payload.
        let result = Frame::decode(&wire[..FrameHeader::SIZE + 10]);
        assert!(matches!(
            result,
            Err(ProtocolError::FrameTruncated { expected: 100, actual: 10 })
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let frame = Frame::new(FrameHeader::new(Opcode::PlayToken), vec![7u8; 3]);

        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        wire.extend_from_slice(&[0xAA; 16]);

        let parsed = Frame::decode(&wire).unwrap();
        assert_eq!(parsed.payload.len(), 3);
    }

    proptest! {
        #[test]
        fn frame_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let frame = Frame::new(FrameHeader::new(Opcode::GameUpdate), payload);

            let mut wire = Vec::new();
            frame.encode(&mut wire).expect("should encode");

            let parsed = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame.payload, parsed.payload);
        }
    }
}
