//! Shared type definitions for the EC4X turn engine.
//!
//! This crate is the single source of truth for all types used across the
//! EC4X workspace: identifier newtypes, entity records, order packets,
//! events, intelligence reports, and the player-state projections that
//! travel over the wire.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe `u32` wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (classes, states, reasons, tech fields)
//! - [`system`] -- Star systems and axial hex coordinates
//! - [`house`] -- Houses, tech trees, prestige ledgers
//! - [`colony`] -- Colonies and their queues
//! - [`fleet`] -- Fleets, squadrons, ships, ground units, facilities
//! - [`projects`] -- Construction projects, transfers, ongoing effects
//! - [`orders`] -- Per-house command packets
//! - [`events`] -- The per-turn event log
//! - [`intel`] -- Intelligence reports and databases
//! - [`player_state`] -- Fog-of-war projections and deltas

pub mod colony;
pub mod enums;
pub mod events;
pub mod fleet;
pub mod house;
pub mod ids;
pub mod intel;
pub mod orders;
pub mod player_state;
pub mod projects;
pub mod system;

// Re-export all public types at crate root for convenience.
pub use colony::{Colony, ColonyAutomation};
pub use enums::{
    DiplomaticState, EffectKind, EspionageAction, FacilityKind, FleetPosture, GroundUnitKind,
    IntelQuality, LaneClass, PlanetClass, PrestigeSource, RejectReason, RulesOfEngagement,
    ShipClass, ShipState, StandingOrderKind, TechField,
};
pub use events::{EventKind, GameEvent, Visibility};
pub use fleet::{
    Cargo, Facility, Fleet, GroundUnit, MovementOrder, Ship, ShipStats, Squadron,
};
pub use house::{EspionageBudget, House, PrestigeEntry, TechTree};
pub use ids::{
    EffectId, FacilityId, FleetId, GroundUnitId, HouseId, ProjectId, ShipId, SquadronId,
    SystemId, TransferId, pack_house_pair, unpack_house_pair,
};
pub use intel::{
    ColonyIntel, CombatEncounterReport, IntelReport, IntelligenceDatabase,
    ScoutEncounterReport, StarbaseIntel, StarbaseSurveillanceReport, SystemIntel,
};
pub use orders::{
    BuildItem, BuildOrder, ColonyDirective, CommandPacket, DiplomaticCommand,
    EspionageDirective, EspionageOrder, FleetOrder, FleetVerb, RepairOrder,
    ResearchAllocation, ScrapOrder, StandingOrderAssignment, TransferOrder,
};
pub use player_state::{
    CollectionDelta, DiplomacyEntry, PlayerState, PlayerStateDelta, VisibleColony,
    VisibleFleet, VisibleSystem, apply_delta,
};
pub use projects::{ConstructionProject, OngoingEffect, PopulationInTransit, ProjectKind};
pub use system::{AxialCoord, StarSystem};
