//! Authoritative game state and turn resolution for EC4X.
//!
//! This crate is the engine: the entity arenas and reverse indices, the
//! order validator, the four-phase turn resolver, three-theater combat,
//! the economy, espionage, diplomacy, and the fog-of-war projections that
//! are the only thing clients ever see.
//!
//! A turn is a pure function: `(state, rng seed, orders) -> (state',
//! events)`. Everything here is synchronous and single-threaded; the
//! surrounding runtime owns scheduling and I/O.
//!
//! # Modules
//!
//! - [`arena`] -- Generic entity arenas
//! - [`state`] -- [`GameState`], indices, mutation helpers, `new_game`
//! - [`orders`] -- Packet validation and budget projection
//! - [`resolve`] -- The Conflict/Income/Command/Maintenance pipeline
//! - [`combat`] -- The shared battle engine
//! - [`economy`] -- Output, growth, and cost formulas
//! - [`espionage`] -- Covert actions and detection
//! - [`diplomacy`] -- The escalation ladder
//! - [`prestige`] -- The zero-sum prestige ledger
//! - [`intel`] -- Report generation
//! - [`projection`] -- Fog-of-war player states
//! - [`delta`] -- Per-turn delta extraction
//! - [`events`] -- The per-turn event sink
//! - [`rng`] -- The seeded turn stream
//! - [`error`] -- Engine errors
//!
//! [`GameState`]: state::GameState

pub mod arena;
pub mod combat;
pub mod delta;
pub mod diplomacy;
pub mod economy;
pub mod error;
pub mod espionage;
pub mod events;
pub mod intel;
pub mod orders;
pub mod prestige;
pub mod projection;
pub mod resolve;
pub mod rng;
pub mod state;

pub use arena::Arena;
pub use delta::diff_player_states;
pub use error::EngineError;
pub use events::EventSink;
pub use orders::{PacketReview, validate_packet};
pub use projection::player_state;
pub use resolve::{TurnOutcome, advance_turn};
pub use rng::TurnRng;
pub use state::{AssaultKind, GameState, Indices, PactViolation, QueuedAssault};
