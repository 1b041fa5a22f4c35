//! Rule snapshot and scenario loading for the EC4X turn engine.
//!
//! The canonical rules live in YAML. This crate defines strongly-typed
//! tables mirroring that structure, a loader that reads and validates them,
//! and the `config_hash` that pins every delta to the rule version it was
//! produced under.
//!
//! # Modules
//!
//! - [`tables`] -- The static rule tables
//! - [`snapshot`] -- The materialized, hashed [`RuleSnapshot`]
//! - [`scenario`] -- [`GameSetup`] loading
//! - [`error`] -- Shared error types
//!
//! [`RuleSnapshot`]: snapshot::RuleSnapshot
//! [`GameSetup`]: scenario::GameSetup

pub mod error;
pub mod scenario;
pub mod snapshot;
pub mod tables;

pub use error::RulesError;
pub use scenario::{
    GameSetup, HomeworldTemplate, PlayerSlot, StartingSquadron, VictoryConditions,
};
pub use snapshot::RuleSnapshot;
pub use tables::{
    CombatTable, EconomyTable, EspionageActionSpec, EspionageEffectSpec, EspionageTable,
    FacilitySpec, FacilityTable, GroundUnitSpec, GroundUnitTable, GuildTable, IuCostTier,
    MilitaryTable, PlanetClassRow, PrestigeTable, ShieldLevelSpec, ShipSpec, ShipTable,
    StandingOrderTable, StarmapTable,
};
