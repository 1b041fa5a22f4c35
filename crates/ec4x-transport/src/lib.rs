//! Encrypted event-stream transport for EC4X.
//!
//! Every payload leaving or entering the engine -- full player states,
//! per-turn deltas, order-packet uploads -- is msgpack-serialized and
//! sealed in a NIP-44 v2 envelope (X25519, ChaCha20, HMAC-SHA256). The
//! relay carries opaque bytes; only the endpoints hold keys.
//!
//! # Modules
//!
//! - [`nip44`] -- The envelope: conversation keys, message keys, padding
//! - [`codec`] -- Msgpack payloads and the relay event framing
//! - [`relay`] -- The relay (NATS) client
//! - [`error`] -- Shared error types

pub mod codec;
pub mod error;
pub mod nip44;
pub mod relay;

pub use codec::{
    KIND_FULL_STATE, KIND_ORDER_PACKET, KIND_TURN_DELTA, RelayEvent, decode_event,
    decode_payload, encode_event, encode_payload,
};
pub use error::TransportError;
pub use nip44::{
    calc_padded_len, conversation_key, decrypt, encrypt, message_keys, pad, parse_key,
    public_key, unpad,
};
pub use relay::{OrderSubscription, RelayClient};
