//! PostgreSQL persistence for EC4X games.
//!
//! One relational store serves every game; all rows carry a `game_id`.
//! The full serialized state per turn is the source of truth; entity
//! mirror tables exist for operator queries. The read path rebuilds the
//! arenas from the newest snapshot and re-validates the reverse indices
//! before the engine touches it.
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool and configuration
//! - [`game_store`] -- The `games` and `invites` tables
//! - [`state_store`] -- Snapshots, entity mirrors, and the event log
//! - [`error`] -- Shared error types

pub mod error;
pub mod game_store;
pub mod postgres;
pub mod state_store;

pub use error::DbError;
pub use game_store::{GameRow, GameStore, InviteRow};
pub use postgres::{PostgresConfig, PostgresPool};
pub use state_store::StateStore;
