//! Wire payload codec and event kinds.
//!
//! Payloads are self-describing msgpack. Three event kinds flow over the
//! relay: full player states and turn deltas outbound from the engine,
//! order packets inbound from clients. Every payload rides inside a
//! NIP-44 envelope; this module only handles the cleartext framing around
//! it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransportError;

/// Event kind: a full [`PlayerState`] snapshot.
///
/// [`PlayerState`]: ec4x_types::player_state::PlayerState
pub const KIND_FULL_STATE: u32 = 30_402;

/// Event kind: a per-turn [`PlayerStateDelta`].
///
/// [`PlayerStateDelta`]: ec4x_types::player_state::PlayerStateDelta
pub const KIND_TURN_DELTA: u32 = 30_403;

/// Event kind: an inbound [`CommandPacket`] upload.
///
/// [`CommandPacket`]: ec4x_types::orders::CommandPacket
pub const KIND_ORDER_PACKET: u32 = 30_404;

/// One event on the relay: an encrypted payload plus routing cleartext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEvent {
    /// Event kind (30402 full state, 30403 delta, 30404 orders).
    pub kind: u32,
    /// The game this event belongs to.
    pub game_id: Uuid,
    /// Turn the payload refers to.
    pub turn: u32,
    /// Hex-encoded X25519 public key of the intended recipient (for
    /// outbound events) or the sender (for order uploads).
    pub pubkey: String,
    /// The NIP-44 envelope carrying the msgpack payload.
    pub envelope: Vec<u8>,
}

impl RelayEvent {
    /// Check the kind is one this protocol speaks.
    pub const fn validate_kind(&self) -> Result<(), TransportError> {
        match self.kind {
            KIND_FULL_STATE | KIND_TURN_DELTA | KIND_ORDER_PACKET => Ok(()),
            other => Err(TransportError::UnknownKind(other)),
        }
    }
}

/// Serialize a payload to msgpack.
pub fn encode_payload<T: Serialize>(payload: &T) -> Result<Vec<u8>, TransportError> {
    Ok(rmp_serde::to_vec_named(payload)?)
}

/// Deserialize a msgpack payload.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TransportError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Serialize a relay event for the wire.
pub fn encode_event(event: &RelayEvent) -> Result<Vec<u8>, TransportError> {
    Ok(rmp_serde::to_vec_named(event)?)
}

/// Deserialize a relay event from the wire.
pub fn decode_event(bytes: &[u8]) -> Result<RelayEvent, TransportError> {
    let event: RelayEvent = rmp_serde::from_slice(bytes)?;
    event.validate_kind()?;
    Ok(event)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_types::ids::HouseId;
    use ec4x_types::orders::CommandPacket;

    #[test]
    fn payload_round_trips_through_msgpack() {
        let packet = CommandPacket::hold(HouseId::new(2), 14);
        let bytes = encode_payload(&packet).unwrap();
        let back: CommandPacket = decode_payload(&bytes).unwrap();
        assert_eq!(back, packet);
    }

    #[test]
    fn relay_event_round_trips() {
        let event = RelayEvent {
            kind: KIND_TURN_DELTA,
            game_id: Uuid::from_u128(7),
            turn: 3,
            pubkey: "ab".repeat(32),
            envelope: vec![2, 0, 1, 2, 3],
        };
        let bytes = encode_event(&event).unwrap();
        assert_eq!(decode_event(&bytes).unwrap(), event);
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        let event = RelayEvent {
            kind: 1,
            game_id: Uuid::from_u128(7),
            turn: 0,
            pubkey: String::new(),
            envelope: Vec::new(),
        };
        let bytes = encode_event(&event).unwrap();
        assert!(matches!(
            decode_event(&bytes),
            Err(TransportError::UnknownKind(1))
        ));
    }
}
