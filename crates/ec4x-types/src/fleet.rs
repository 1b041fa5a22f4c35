//! Fleets, squadrons, ships, ground units, and facilities.
//!
//! The fleet → squadron → ship tree is represented with one source of truth
//! per edge: ships carry their squadron ID, squadrons carry a flagship ID
//! and a member list, fleets carry a squadron list. The helper operations in
//! `ec4x-core` keep the tree shape intact; nothing mutates these links
//! through raw arena writes.

use serde::{Deserialize, Serialize};

use crate::enums::{
    FacilityKind, FleetPosture, GroundUnitKind, RulesOfEngagement, ShipClass, ShipState,
    StandingOrderKind,
};
use crate::ids::{FacilityId, FleetId, GroundUnitId, HouseId, ShipId, SquadronId, SystemId};

/// A mobile formation of squadrons under one house at one system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fleet {
    /// This fleet's identifier.
    pub id: FleetId,
    /// Owning house.
    pub owner: HouseId,
    /// Current system.
    pub location: SystemId,
    /// Member squadrons. All must belong to `owner` and be co-located.
    pub squadrons: Vec<SquadronId>,
    /// Readiness posture.
    pub posture: FleetPosture,
    /// Rules of engagement: when this fleet breaks off.
    pub roe: RulesOfEngagement,
    /// Persistent default order.
    pub standing_order: Option<StandingOrderKind>,
    /// Movement order persisted for the Maintenance Phase: the remaining
    /// path, destination last. One hex is traversed per turn.
    pub movement: Option<MovementOrder>,
}

impl Fleet {
    /// Create an empty fleet at `location`.
    pub const fn new(id: FleetId, owner: HouseId, location: SystemId) -> Self {
        Self {
            id,
            owner,
            location,
            squadrons: Vec::new(),
            posture: FleetPosture::Active,
            roe: RulesOfEngagement::Standard,
            standing_order: None,
            movement: None,
        }
    }
}

/// A persisted movement order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementOrder {
    /// Remaining systems to traverse, in order. The final entry is the
    /// destination.
    pub path: Vec<SystemId>,
    /// The ultimate destination, kept for re-pathing after interception.
    pub destination: SystemId,
}

/// A flagship plus subordinate ships fighting as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squadron {
    /// This squadron's identifier.
    pub id: SquadronId,
    /// Owning house. Always matches the flagship's house.
    pub house_id: HouseId,
    /// The flagship. Its command rating bounds the members' command cost.
    pub flagship: ShipId,
    /// All member ships, flagship included.
    pub ships: Vec<ShipId>,
    /// Set when the flagship is destroyed; the squadron dies with it.
    pub destroyed: bool,
}

/// One hull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    /// This ship's identifier.
    pub id: ShipId,
    /// Owning house.
    pub house_id: HouseId,
    /// The squadron this ship fights under.
    pub squadron_id: SquadronId,
    /// Hull class.
    pub class: ShipClass,
    /// Combat statistics, frozen at commission.
    pub stats: ShipStats,
    /// Damage state.
    pub state: ShipState,
    /// Cargo aboard, if any.
    pub cargo: Cargo,
}

/// Combat statistics for a ship, frozen at commission time.
///
/// Weapons tech at commission is baked into `attack`; later tech advances
/// do not retrofit existing hulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipStats {
    /// Attack strength.
    pub attack: u32,
    /// Defense strength (hit capacity per damage tier).
    pub defense: u32,
    /// Command cost counted against the flagship's command rating.
    pub command_cost: u32,
    /// Command rating: capacity to lead a squadron. Zero for non-leaders.
    pub command_rating: u32,
    /// Per-turn maintenance in PP.
    pub maintenance: i64,
    /// Build cost in PP, the basis for repair pricing.
    pub build_cost: i64,
    /// Weapons tech level baked in at commission.
    pub commissioned_wep: u8,
}

/// What a ship is carrying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cargo {
    /// Empty hold.
    #[default]
    Empty,
    /// Embarked marines.
    Marines(Vec<GroundUnitId>),
    /// Population transfer units in cold sleep.
    Population(u32),
    /// A colony kit able to found one colony.
    ColonyKit,
}

/// A ground-force unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundUnit {
    /// This unit's identifier.
    pub id: GroundUnitId,
    /// Owning house.
    pub owner: HouseId,
    /// The system the unit is at (or embarked from).
    pub system_id: SystemId,
    /// Unit kind.
    pub kind: GroundUnitKind,
}

/// An orbital or surface facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    /// This facility's identifier.
    pub id: FacilityId,
    /// Facility kind.
    pub kind: FacilityKind,
    /// The colony (by system) this facility serves.
    pub colony: SystemId,
    /// Dock slots this facility contributes. Zero for starbases.
    pub effective_docks: u32,
    /// Whether the facility sits in fixed orbit (cannot be relocated).
    pub fixed_orbit: bool,
    /// Whether the facility is combat-crippled.
    pub crippled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fleet_is_active_with_standard_roe() {
        let fleet = Fleet::new(FleetId::new(0), HouseId::new(1), SystemId::new(2));
        assert_eq!(fleet.posture, FleetPosture::Active);
        assert_eq!(fleet.roe, RulesOfEngagement::Standard);
        assert!(fleet.squadrons.is_empty());
        assert!(fleet.movement.is_none());
    }

    #[test]
    fn cargo_defaults_to_empty() {
        assert_eq!(Cargo::default(), Cargo::Empty);
    }
}
