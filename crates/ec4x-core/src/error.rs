//! Engine error types.
//!
//! Order-validation failures are *values* ([`RejectReason`]) and never pass
//! through here; these errors are the fatal kind. An invariant violation
//! aborts the turn: the resolver restores the pre-turn snapshot and refuses
//! to advance, because best-effort continuation would desynchronize every
//! client.
//!
//! [`RejectReason`]: ec4x_types::enums::RejectReason

use ec4x_types::ids::HouseId;

/// Errors that can occur during game creation or turn resolution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A state invariant was violated mid-turn. Fatal to the turn.
    #[error("invariant violation in {phase}: {details}")]
    Invariant {
        /// The phase that detected the violation.
        phase: &'static str,
        /// The violations found, joined.
        details: String,
    },

    /// The starmap layer failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: ec4x_world::WorldError,
    },

    /// The rules layer failed.
    #[error("rules error: {source}")]
    Rules {
        /// The underlying rules error.
        #[from]
        source: ec4x_rules::RulesError,
    },

    /// An order packet arrived for an unknown house.
    #[error("unknown house: {0}")]
    UnknownHouse(HouseId),

    /// An order packet arrived for the wrong turn.
    #[error("packet for turn {packet_turn}, game is at turn {game_turn}")]
    WrongTurn {
        /// The turn the packet names.
        packet_turn: u32,
        /// The game's current turn.
        game_turn: u32,
    },
}
