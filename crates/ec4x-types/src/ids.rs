//! Type-safe identifier wrappers for every entity kind.
//!
//! Every entity in the game state has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. IDs are plain `u32`
//! values handed out monotonically by the per-kind arenas in `ec4x-core`;
//! a freed ID is never re-issued, so a stale reference can only ever miss,
//! never alias a different entity.
//!
//! Monotonic `u32` IDs (rather than random UUIDs) matter here: turn
//! resolution breaks simultaneity ties on ascending ID order, and replays
//! must produce byte-identical state from the same seed.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u32` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
            Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Wrap a raw arena index.
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Return the inner `u32` value.
            pub const fn into_inner(self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a house (player faction).
    HouseId
}

define_id! {
    /// Unique identifier for a star system (hex on the starmap).
    SystemId
}

define_id! {
    /// Unique identifier for a fleet.
    FleetId
}

define_id! {
    /// Unique identifier for a squadron (flagship plus subordinates).
    SquadronId
}

define_id! {
    /// Unique identifier for a ship.
    ShipId
}

define_id! {
    /// Unique identifier for a ground unit (army, marine, battery, fighter).
    GroundUnitId
}

define_id! {
    /// Unique identifier for an orbital or surface facility.
    FacilityId
}

define_id! {
    /// Unique identifier for a construction or repair project.
    ProjectId
}

define_id! {
    /// Unique identifier for a population transfer in transit.
    TransferId
}

define_id! {
    /// Unique identifier for an ongoing (timed) effect.
    EffectId
}

/// Pack an ordered house pair into a single `u32` key.
///
/// Used by the diplomatic-relations delta tables, whose wire format keys
/// each directed pair as `(source << 16) | target`.
pub const fn pack_house_pair(source: HouseId, target: HouseId) -> u32 {
    (source.0 << 16) | (target.0 & 0xFFFF)
}

/// Unpack a `(source << 16) | target` key back into the house pair.
pub const fn unpack_house_pair(key: u32) -> (HouseId, HouseId) {
    (HouseId(key >> 16), HouseId(key & 0xFFFF))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let house = HouseId::new(1);
        let system = SystemId::new(1);
        // Same raw value, different types -- the compiler enforces no mixing.
        assert_eq!(house.into_inner(), system.into_inner());
    }

    #[test]
    fn display_shows_raw_value() {
        assert_eq!(FleetId::new(42).to_string(), "42");
    }

    #[test]
    fn house_pair_round_trips() {
        let key = pack_house_pair(HouseId(3), HouseId(11));
        assert_eq!(unpack_house_pair(key), (HouseId(3), HouseId(11)));
    }

    #[test]
    fn serde_round_trip_is_transparent() {
        let id = SystemId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
        let back: SystemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
