//! Error types for the transport layer.
//!
//! Transport failures never abort a turn: a bad inbound envelope is
//! dropped and logged, and the turn commits without it.

/// Errors that can occur encrypting, decrypting, or relaying payloads.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The envelope's MAC did not verify.
    #[error("MAC mismatch")]
    MacMismatch,

    /// The envelope carries an unsupported version byte.
    #[error("unsupported envelope version: {0}")]
    BadVersion(u8),

    /// The envelope is structurally malformed (too short, bad framing).
    #[error("malformed envelope: {0}")]
    Malformed(&'static str),

    /// The decrypted plaintext's length prefix is invalid.
    #[error("invalid plaintext length prefix")]
    BadLengthPrefix,

    /// Plaintext must be 1 to 65535 bytes.
    #[error("plaintext length {0} out of range")]
    PlaintextLength(usize),

    /// A public or secret key was not 32 bytes of hex.
    #[error("invalid key: {0}")]
    InvalidKey(&'static str),

    /// Payload serialization failed.
    #[error("encode error: {source}")]
    Encode {
        /// The underlying msgpack error.
        #[from]
        source: rmp_serde::encode::Error,
    },

    /// Payload deserialization failed.
    #[error("decode error: {source}")]
    Decode {
        /// The underlying msgpack error.
        #[from]
        source: rmp_serde::decode::Error,
    },

    /// The relay connection failed.
    #[error("relay error: {0}")]
    Relay(String),

    /// An inbound event named an unknown kind.
    #[error("unknown event kind: {0}")]
    UnknownKind(u32),
}
