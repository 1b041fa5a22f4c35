//! Construction projects, population transfers, and ongoing effects.
//!
//! All three are plain records with turn counters, decremented during the
//! Maintenance Phase. Nothing here suspends; a "timed" behavior is just a
//! record that resolution revisits every turn.

use serde::{Deserialize, Serialize};

use crate::enums::{EffectKind, FacilityKind, GroundUnitKind, ShipClass};
use crate::ids::{EffectId, FacilityId, HouseId, ProjectId, ShipId, SystemId, TransferId};

/// What a construction or repair project produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectKind {
    /// A new hull of the given class.
    Ship(ShipClass),
    /// A new ground unit.
    Ground(GroundUnitKind),
    /// A new facility.
    Facility(FacilityKind),
    /// Additional industrial units.
    IndustrialUnits(u32),
    /// A planetary shield of the given level.
    PlanetaryShield(u8),
    /// Repair of a crippled ship.
    RepairShip(ShipId),
    /// Repair of a crippled starbase.
    RepairStarbase(FacilityId),
    /// Terraforming the colony one planet class upward.
    Terraform,
}

/// A queued or active construction/repair project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionProject {
    /// This project's identifier.
    pub id: ProjectId,
    /// What is being built or repaired.
    pub kind: ProjectKind,
    /// Total cost in PP, charged when the order was accepted.
    pub cost_total: i64,
    /// Turns of work remaining. Zero means finished, awaiting commission.
    pub turns_remaining: u32,
    /// The colony (by system) doing the work.
    pub colony: SystemId,
    /// The dock facility holding this project's slot, for dock-bound work.
    pub dock: Option<FacilityId>,
}

/// Population in cold sleep between two colonies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationInTransit {
    /// This transfer's identifier.
    pub id: TransferId,
    /// Owning house.
    pub house_id: HouseId,
    /// Source colony system.
    pub source: SystemId,
    /// Destination colony system.
    pub destination: SystemId,
    /// Population transfer units aboard.
    pub ptu_amount: u32,
    /// PP paid when the transfer was booked.
    pub cost_paid: i64,
    /// The turn the transfer arrives and converts back to PU.
    pub arrival_turn: u32,
}

/// A timed effect applied by espionage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OngoingEffect {
    /// This effect's identifier.
    pub id: EffectId,
    /// Effect kind.
    pub kind: EffectKind,
    /// The house suffering (or, for sweeps, benefiting from) the effect.
    pub target_house: HouseId,
    /// The affected system, for colony-scoped effects.
    pub target_system: Option<SystemId>,
    /// Turns remaining, decremented each Maintenance Phase. Removed at 0.
    pub turns_remaining: u32,
    /// Effect strength in percent (meaning depends on `kind`).
    pub magnitude: i32,
}
