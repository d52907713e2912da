//! Protocol error types.

/// Convenience result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while framing, parsing, or (de)serializing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Buffer is shorter than a complete frame header.
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum byte count required.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Header claims more payload bytes than the buffer holds.
    #[error("frame truncated: header claims {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload size claimed by the header.
        expected: usize,
        /// Payload bytes actually available.
        actual: usize,
    },

    /// Magic number does not identify a parlor frame.
    #[error("invalid magic number")]
    InvalidMagic,

    /// Protocol version is not supported by this build.
    #[error("unsupported protocol version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// Payload exceeds the wire size limit.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Observed payload size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Opcode value has no registered payload type.
    #[error("unknown opcode: {0:#06x}")]
    UnknownOpcode(u16),

    /// CBOR serialization failed.
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::FrameTooShort { expected: 16, actual: 3 };
        assert_eq!(err.to_string(), "frame too short: expected 16 bytes, got 3");

        let err = ProtocolError::UnknownOpcode(0x00FF);
        assert_eq!(err.to_string(), "unknown opcode: 0x00ff");
    }
}
