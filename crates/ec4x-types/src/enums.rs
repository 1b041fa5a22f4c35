//! Enumeration types shared across the EC4X engine.
//!
//! Everything here is a plain, serializable value type. Gameplay constants
//! that designers tune (output factors, costs, thresholds) live in the rule
//! snapshot; the only numbers baked into these enums are structural ones the
//! rest of the engine treats as fixed (lane traversal weights, ship value
//! ranking for critical-hit targeting).

use serde::{Deserialize, Serialize};

/// Habitability class of a colony's planet, from worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PlanetClass {
    /// Barely habitable; domes and vaults.
    Extreme,
    /// Thin atmosphere, hostile surface.
    Desolate,
    /// Marginal biosphere.
    Harsh,
    /// Subsistence-grade biosphere.
    Poor,
    /// Comfortable but unremarkable.
    Benign,
    /// Rich biosphere.
    Lush,
    /// A garden world.
    Eden,
}

impl PlanetClass {
    /// All classes in ascending habitability order.
    pub const ALL: [Self; 7] = [
        Self::Extreme,
        Self::Desolate,
        Self::Harsh,
        Self::Poor,
        Self::Benign,
        Self::Lush,
        Self::Eden,
    ];
}

/// Classification of a jump lane between adjacent systems.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LaneClass {
    /// Broad, stable lane. Traversal weight 1.
    Major,
    /// Narrow lane. Traversal weight 2.
    Minor,
    /// Hazardous lane; closed to fleets with crippled flagships. Weight 3.
    Restricted,
}

impl LaneClass {
    /// Pathfinding edge weight for this lane class.
    pub const fn weight(self) -> u32 {
        match self {
            Self::Major => 1,
            Self::Minor => 2,
            Self::Restricted => 3,
        }
    }
}

/// Hull classification of a ship.
///
/// Ordering is by strategic value, ascending; critical hits pick targets
/// from the top of this ordering downward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ShipClass {
    /// Colony-based interceptor; never leaves its system unescorted.
    Fighter,
    /// Cargo and population hauler.
    Transport,
    /// Fast reconnaissance hull, the espionage workhorse.
    Scout,
    /// Light escort.
    Corvette,
    /// Screen escort.
    Frigate,
    /// Heavy escort.
    Destroyer,
    /// Line hull.
    Cruiser,
    /// Fast capital hull.
    Battlecruiser,
    /// Heavy capital hull.
    Battleship,
    /// Fleet carrier.
    Carrier,
    /// The heaviest line hull.
    Dreadnought,
    /// Siege hull able to crack planetary shields.
    PlanetBreaker,
}

impl ShipClass {
    /// All classes, ascending by strategic value.
    pub const ALL: [Self; 12] = [
        Self::Fighter,
        Self::Transport,
        Self::Scout,
        Self::Corvette,
        Self::Frigate,
        Self::Destroyer,
        Self::Cruiser,
        Self::Battlecruiser,
        Self::Battleship,
        Self::Carrier,
        Self::Dreadnought,
        Self::PlanetBreaker,
    ];

    /// Strategic value rank used for critical-hit target priority.
    ///
    /// Higher means hit first. Planet breakers rank below dreadnoughts:
    /// they are siege tools, not battle line.
    pub const fn value_rank(self) -> u8 {
        match self {
            Self::Fighter => 0,
            Self::Transport => 1,
            Self::Scout => 2,
            Self::Corvette => 3,
            Self::Frigate => 4,
            Self::Destroyer => 5,
            Self::Cruiser => 6,
            Self::Battlecruiser => 7,
            Self::PlanetBreaker => 8,
            Self::Battleship => 9,
            Self::Carrier => 10,
            Self::Dreadnought => 11,
        }
    }

    /// Whether this hull needs a dock slot to be built.
    ///
    /// Fighters are assembled planetside from colony industry.
    pub const fn needs_dock(self) -> bool {
        !matches!(self, Self::Fighter)
    }
}

/// Damage state of a ship or starbase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ShipState {
    /// Fully operational.
    Undamaged,
    /// Combat-crippled: half attack, cannot use Restricted lanes as
    /// flagship, costs extra maintenance.
    Crippled,
}

/// Kind of a ground-force unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum GroundUnitKind {
    /// Defensive garrison formation.
    Army,
    /// Assault infantry; the only unit that invades.
    Marine,
    /// Fixed anti-orbit artillery.
    GroundBattery,
}

/// Kind of an orbital or surface facility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FacilityKind {
    /// Ground-to-orbit logistics hub; provides dock slots.
    Spaceport,
    /// Orbital construction yard; provides dock slots.
    Shipyard,
    /// Heavy repair yard; the only facility that repairs ships and starbases.
    Drydock,
    /// Armed orbital fortress; fights in the orbital theater.
    Starbase,
}

impl FacilityKind {
    /// Whether the facility contributes dock slots to construction.
    pub const fn provides_docks(self) -> bool {
        matches!(self, Self::Spaceport | Self::Shipyard | Self::Drydock)
    }
}

/// The fourteen technology fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TechField {
    /// Economic level; scales colony output.
    El,
    /// Science level; scales research point yield.
    Sl,
    /// Construction tech; shortens build times.
    Cst,
    /// Weapons tech; scales attack strength at commission.
    Wep,
    /// Terraforming; unlocks planet-class upgrades.
    Ter,
    /// Electronic intelligence; detection and combat reports.
    Eli,
    /// Cloaking; first-strike eligibility.
    Clk,
    /// Shields; scales defense strength.
    Sld,
    /// Strategic lift; cargo capacity.
    Stl,
    /// Counter-intelligence; espionage detection threshold.
    Cic,
    /// Fighter command; fighter squadron effectiveness.
    Fc,
    /// Squadron command; capital squadron limits.
    Sc,
    /// Fighter doctrine; colony fighter capacity multiplier.
    Fd,
    /// Advanced colonial operations; colonization and transfer efficiency.
    Aco,
}

impl TechField {
    /// All fields in ledger order.
    pub const ALL: [Self; 14] = [
        Self::El,
        Self::Sl,
        Self::Cst,
        Self::Wep,
        Self::Ter,
        Self::Eli,
        Self::Clk,
        Self::Sld,
        Self::Stl,
        Self::Cic,
        Self::Fc,
        Self::Sc,
        Self::Fd,
        Self::Aco,
    ];
}

/// Diplomatic stance of one house toward another.
///
/// The ladder only escalates automatically; de-escalation is negotiated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DiplomaticState {
    /// No standing grievance. Neutral houses never fight.
    Neutral,
    /// Provoked. Fights only when a threatening order forces the issue.
    Hostile,
    /// Open war. Fights on sight.
    Enemy,
}

/// Quality tier of an intelligence report, ascending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum IntelQuality {
    /// Existence and rough counts, from adjacency.
    Adjacent,
    /// Composition, from a scouting pass.
    Scouted,
    /// Full snapshot including research allocation, from a spy success.
    Spy,
    /// Everything including internal treasury. Own assets only.
    Perfect,
}

/// Kind of an ongoing (timed) effect applied by espionage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EffectKind {
    /// Reduces science output.
    SrpReduction,
    /// Reduces net colonial value.
    NcvReduction,
    /// A starbase is knocked out of action.
    StarbaseCrippled,
    /// The target's intel database stops accepting new reports.
    IntelBlocked,
    /// Numeric fields in stored reports are corrupted.
    IntelCorrupted,
    /// Tax income is suppressed.
    TaxReduction,
}

/// The ten espionage actions purchasable with EBP.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EspionageAction {
    /// Steal accumulated research points.
    TechTheft,
    /// Minor industrial sabotage.
    SabotageLow,
    /// Major industrial sabotage.
    SabotageHigh,
    /// Eliminate key personnel; large prestige swing.
    Assassination,
    /// Corrupt the target's intel database.
    CyberAttack,
    /// Suppress the target's net colonial value.
    EconomicManipulation,
    /// Suppress the target's tax income.
    PsyopsCampaign,
    /// Harden own detection threshold for a few turns.
    CounterIntelSweep,
    /// Copy the target's intel database.
    IntelTheft,
    /// Corrupt what the target thinks it knows.
    PlantDisinformation,
}

impl EspionageAction {
    /// All actions in descriptor-table order.
    pub const ALL: [Self; 10] = [
        Self::TechTheft,
        Self::SabotageLow,
        Self::SabotageHigh,
        Self::Assassination,
        Self::CyberAttack,
        Self::EconomicManipulation,
        Self::PsyopsCampaign,
        Self::CounterIntelSweep,
        Self::IntelTheft,
        Self::PlantDisinformation,
    ];
}

/// Why an order was rejected during validation.
///
/// Rejections are recoverable values, not errors: resolution continues with
/// the remaining orders and the submitting house is informed via an
/// `OrderRejected` event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RejectReason {
    /// The referenced colony is not owned by the submitting house.
    ColonyNotOwned,
    /// The referenced fleet is not owned by the submitting house.
    FleetNotOwned,
    /// The house treasury cannot cover the order's cost.
    InsufficientTreasury,
    /// A capacity limit (docks, fighters, squadrons) is already full.
    CapacityFull,
    /// The order targets an eliminated house.
    EliminatedTarget,
    /// A planetary shield of that level is already present.
    ShieldAlreadyPresent,
    /// The order requires a facility the colony does not have.
    MissingFacility,
    /// The source colony is blockaded.
    BlockadedSource,
    /// The house already has the maximum concurrent transfers.
    TooManyTransfers,
    /// No traversable path exists to the destination.
    PathUnreachable,
    /// The referenced entity does not exist.
    UnknownEntity,
    /// The order's target is invalid for this verb.
    InvalidTarget,
    /// The source colony would drop below the minimum retained population.
    NotEnoughPopulation,
    /// A duplicate order for the same entity was already accepted.
    DuplicateOrder,
    /// The system is already colonized.
    AlreadyColonized,
    /// The fleet lacks a required ship (colony ship, marines, scout).
    MissingShip,
    /// The espionage budget cannot cover the action.
    InsufficientEspionageBudget,
    /// The diplomatic command is not applicable in the current state.
    InvalidDiplomaticState,
}

/// Source category of a prestige ledger entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PrestigeSource {
    /// Destroyed an enemy squadron.
    SquadronDestroyed,
    /// Lost a squadron.
    SquadronLost,
    /// Destroyed an enemy starbase.
    StarbaseDestroyed,
    /// Lost a starbase.
    StarbaseLost,
    /// Forced an enemy side to retreat.
    ForcedRetreat,
    /// Was forced to retreat.
    WasForcedToRetreat,
    /// Took an enemy colony by invasion.
    PlanetInvaded,
    /// Lost a colony to invasion.
    PlanetLost,
    /// Established a new colony. Achievement category.
    ColonyEstablished,
    /// Advanced a technology field. Achievement category.
    TechAdvance,
    /// A successful espionage action.
    EspionageSuccess,
    /// An espionage action was detected.
    EspionageDetected,
    /// Failed to meet maintenance.
    MaintenanceShortfall,
    /// Violated a pact.
    PactViolation,
    /// Attacked a dishonored house.
    AttackedDishonored,
    /// Opened hostilities against a Neutral house with an assault order.
    UnprovokedAssault,
}

/// Rules of engagement for a fleet: when it attempts to break off.
///
/// The threshold is compared against the side's attack strength as a
/// percentage of the opposing side's; at or below it, the side retreats.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RulesOfEngagement {
    /// Never retreat.
    FightToTheDeath,
    /// Retreat below 25% relative strength.
    Aggressive,
    /// Retreat below 50% relative strength.
    #[default]
    Standard,
    /// Retreat below 75% relative strength.
    Cautious,
}

impl RulesOfEngagement {
    /// Retreat threshold as a percentage of opposing attack strength.
    pub const fn retreat_threshold_pct(self) -> u32 {
        match self {
            Self::FightToTheDeath => 0,
            Self::Aggressive => 25,
            Self::Standard => 50,
            Self::Cautious => 75,
        }
    }
}

/// Readiness posture of a fleet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FleetPosture {
    /// Mobile and fully effective.
    #[default]
    Active,
    /// Pinned to orbital defense; fights in the orbital theater only.
    Guard,
    /// Half maintenance, half effectiveness, orbital theater only.
    Reserve,
    /// Skeleton crew; screened out of combat entirely.
    Mothballed,
}

/// A persistent default order a fleet follows when it has no explicit one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum StandingOrderKind {
    /// Return to the nearest friendly colony.
    SeekHome,
    /// Patrol the current system.
    Patrol,
    /// Guard the local colony.
    Guard,
    /// Hold position.
    Hold,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_weights_are_ordered() {
        assert!(LaneClass::Major.weight() < LaneClass::Minor.weight());
        assert!(LaneClass::Minor.weight() < LaneClass::Restricted.weight());
    }

    #[test]
    fn dreadnought_outranks_carrier_outranks_battleship() {
        assert!(ShipClass::Dreadnought.value_rank() > ShipClass::Carrier.value_rank());
        assert!(ShipClass::Carrier.value_rank() > ShipClass::Battleship.value_rank());
    }

    #[test]
    fn only_fighters_skip_docks() {
        for class in ShipClass::ALL {
            assert_eq!(class.needs_dock(), class != ShipClass::Fighter);
        }
    }

    #[test]
    fn intel_quality_is_totally_ordered() {
        assert!(IntelQuality::Adjacent < IntelQuality::Scouted);
        assert!(IntelQuality::Scouted < IntelQuality::Spy);
        assert!(IntelQuality::Spy < IntelQuality::Perfect);
    }

    #[test]
    fn diplomatic_ladder_is_ordered() {
        assert!(DiplomaticState::Neutral < DiplomaticState::Hostile);
        assert!(DiplomaticState::Hostile < DiplomaticState::Enemy);
    }
}
