//! Per-house order packets: everything a player can ask for in one turn.
//!
//! A [`CommandPacket`] is the unit of player input. The validator in
//! `ec4x-core` checks each order against the current state and rejects
//! individually with a typed [`RejectReason`]; valid orders are staged into
//! the phase pipeline.
//!
//! [`RejectReason`]: crate::enums::RejectReason

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{
    EspionageAction, FacilityKind, GroundUnitKind, ShipClass, StandingOrderKind, TechField,
};
use crate::ids::{FacilityId, FleetId, GroundUnitId, HouseId, ShipId, SquadronId, SystemId};

/// All orders one house submits for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandPacket {
    /// The submitting house.
    pub house: HouseId,
    /// The turn these orders apply to.
    pub turn: u32,
    /// Fleet orders, at most one per fleet.
    pub fleet_orders: Vec<FleetOrder>,
    /// Build orders, budget-projected in submission order.
    pub build_orders: Vec<BuildOrder>,
    /// Repair orders.
    pub repair_orders: Vec<RepairOrder>,
    /// Scrap orders.
    pub scrap_orders: Vec<ScrapOrder>,
    /// Research point allocation for the Income Phase.
    pub research: ResearchAllocation,
    /// Diplomatic commands.
    pub diplomacy: Vec<DiplomaticCommand>,
    /// Population transfers.
    pub transfers: Vec<TransferOrder>,
    /// Colony management directives.
    pub colony_directives: Vec<ColonyDirective>,
    /// Espionage budget purchase plus at most one action.
    pub espionage: Option<EspionageDirective>,
    /// Standing-order assignments.
    pub standing_orders: Vec<StandingOrderAssignment>,
}

impl CommandPacket {
    /// An empty packet for `house` at `turn` -- the auto-hold default when
    /// a player misses the submission deadline.
    pub fn hold(house: HouseId, turn: u32) -> Self {
        Self {
            house,
            turn,
            ..Self::default()
        }
    }
}

/// One order for one fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetOrder {
    /// The fleet being ordered.
    pub fleet: FleetId,
    /// What to do.
    pub verb: FleetVerb,
}

/// The fleet order verbs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FleetVerb {
    /// Move toward a destination system.
    Move {
        /// Target system.
        destination: SystemId,
    },
    /// Path home to the nearest friendly colony.
    SeekHome,
    /// Patrol the current system (provocative in foreign space).
    Patrol,
    /// Take the guard posture over the local colony.
    Guard,
    /// Blockade the local colony (threatening).
    Blockade,
    /// Bombard the local colony next Conflict Phase (threatening).
    Bombard,
    /// Invade the local colony next Conflict Phase (threatening).
    Invade,
    /// Bombard then invade in the same turn (threatening).
    Blitz,
    /// Scout the local colony (provocative).
    SpyPlanet,
    /// Scout the system (provocative).
    SpySystem,
    /// Hack the local starbase's surveillance net (threatening).
    HackStarbase,
    /// Found a colony here; consumes a colony kit.
    Colonize,
    /// Merge this fleet into another co-located friendly fleet.
    Join {
        /// The absorbing fleet.
        into: FleetId,
    },
    /// Move to meet another friendly fleet at its location.
    Rendezvous {
        /// The fleet to meet.
        with: FleetId,
    },
    /// Sweep battlefield wreckage for PP (provocative in foreign space).
    Salvage,
    /// Passive observation of the system (provocative).
    ViewWorld,
    /// Hold position.
    Hold,
    /// Enter the reserve posture.
    Reserve,
    /// Mothball the fleet.
    Mothball,
    /// Reactivate from reserve or mothballs.
    Reactivate,
    /// Begin terraforming the local colony one class upward.
    Terraform,
}

impl FleetVerb {
    /// Whether this verb provokes Neutral → Hostile escalation when
    /// executed in a foreign house's system.
    pub const fn is_provocative(&self) -> bool {
        matches!(
            self,
            Self::Hold | Self::Patrol | Self::SpyPlanet | Self::SpySystem | Self::ViewWorld
                | Self::Salvage
        )
    }

    /// Whether this verb escalates straight to Enemy.
    pub const fn is_threatening(&self) -> bool {
        matches!(
            self,
            Self::Blockade | Self::Bombard | Self::Invade | Self::Blitz | Self::HackStarbase
        )
    }
}

/// One build order at one colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOrder {
    /// The colony (by system) doing the work.
    pub colony: SystemId,
    /// What to build.
    pub item: BuildItem,
}

/// What a build order produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildItem {
    /// A ship of the given class.
    Ship(ShipClass),
    /// A ground unit.
    Ground(GroundUnitKind),
    /// A facility.
    Facility(FacilityKind),
    /// Industrial units bought with PP.
    IndustrialUnits(u32),
    /// The next planetary shield level.
    PlanetaryShield,
}

/// A repair order for a crippled ship or starbase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairOrder {
    /// Repair a ship at the given colony's drydock.
    Ship {
        /// The colony (by system) with the drydock.
        colony: SystemId,
        /// The crippled ship.
        ship: ShipId,
    },
    /// Repair a starbase at the given colony's drydock.
    Starbase {
        /// The colony (by system) with the drydock.
        colony: SystemId,
        /// The crippled starbase.
        facility: FacilityId,
    },
}

/// A scrap order; scrapping refunds salvage per the economy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrapOrder {
    /// Scrap a single ship.
    Ship(ShipId),
    /// Scrap a whole squadron.
    Squadron(SquadronId),
    /// Scrap a facility.
    Facility(FacilityId),
    /// Disband a ground unit.
    Ground(GroundUnitId),
}

/// Research point split across the fourteen tech fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchAllocation {
    /// PP committed per field this turn.
    pub allocation: BTreeMap<TechField, u32>,
}

/// A diplomatic command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiplomaticCommand {
    /// Offer to drop the mutual stance one level.
    OfferDeescalation {
        /// The house being approached.
        to: HouseId,
    },
    /// Accept a standing offer.
    AcceptDeescalation {
        /// The offering house.
        from: HouseId,
    },
    /// Reject a standing offer (starts the cooldown).
    RejectDeescalation {
        /// The offering house.
        from: HouseId,
    },
}

/// A population transfer booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOrder {
    /// Source colony system.
    pub source: SystemId,
    /// Destination colony system.
    pub destination: SystemId,
    /// Population transfer units to move.
    pub ptu: u32,
}

/// Colony management directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyDirective {
    /// The colony (by system) being managed.
    pub colony: SystemId,
    /// New tax rate in percent, if changing.
    pub tax_rate: Option<u8>,
    /// New auto-repair flag, if changing.
    pub auto_repair: Option<bool>,
    /// New auto-load flag, if changing.
    pub auto_load: Option<bool>,
}

/// Espionage budget purchase plus at most one covert action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspionageDirective {
    /// EBP to buy this turn.
    pub buy_ebp: u32,
    /// CIP to buy this turn.
    pub buy_cip: u32,
    /// The covert action to attempt, if any.
    pub action: Option<EspionageOrder>,
}

/// One covert action against one house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspionageOrder {
    /// The action to attempt.
    pub action: EspionageAction,
    /// The target house.
    pub target_house: HouseId,
    /// The target system for colony-scoped effects.
    pub target_system: Option<SystemId>,
}

/// Assignment (or clearing) of a fleet's standing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingOrderAssignment {
    /// The fleet whose standing order changes.
    pub fleet: FleetId,
    /// The new standing order, or `None` to clear.
    pub order: Option<StandingOrderKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_packet_is_empty() {
        let packet = CommandPacket::hold(HouseId::new(3), 7);
        assert_eq!(packet.house, HouseId::new(3));
        assert_eq!(packet.turn, 7);
        assert!(packet.fleet_orders.is_empty());
        assert!(packet.espionage.is_none());
    }

    #[test]
    fn threatening_verbs_are_not_provocative() {
        assert!(FleetVerb::Bombard.is_threatening());
        assert!(!FleetVerb::Bombard.is_provocative());
        assert!(FleetVerb::Patrol.is_provocative());
        assert!(!FleetVerb::Patrol.is_threatening());
    }
}
