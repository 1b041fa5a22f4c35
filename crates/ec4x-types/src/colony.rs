//! Colony records.

use serde::{Deserialize, Serialize};

use crate::enums::PlanetClass;
use crate::ids::{FacilityId, GroundUnitId, HouseId, ProjectId, SquadronId, SystemId};

/// A settled world.
///
/// Colonies are keyed by their system: a system holds at most one colony.
/// Ownership transfers atomically on invasion via the state helper that
/// also rewrites the reverse indices; nothing mutates `owner` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    /// The system this colony occupies.
    pub system_id: SystemId,
    /// Owning house.
    pub owner: HouseId,
    /// Habitability class.
    pub planet_class: PlanetClass,
    /// Raw planetary quality roll (1-10); scales output within the class.
    pub raw_quality: u8,
    /// Population units.
    pub population_units: u32,
    /// Industrial units.
    pub industrial_units: u32,
    /// Gross colonial output computed last Income Phase, in PP.
    pub gross_output: i64,
    /// Tax rate in percent (0-100).
    pub tax_rate: u8,
    /// Infrastructure damage in percent (0-100); suppresses output.
    pub infrastructure_damage: u8,
    /// Ground batteries emplaced here.
    pub batteries: Vec<GroundUnitId>,
    /// Garrison armies.
    pub armies: Vec<GroundUnitId>,
    /// Marines stationed planetside.
    pub marines: Vec<GroundUnitId>,
    /// Planetary shield level (0 = none).
    pub shield_level: u8,
    /// Spaceports serving this colony.
    pub spaceports: Vec<FacilityId>,
    /// Shipyards in orbit.
    pub shipyards: Vec<FacilityId>,
    /// Drydocks in orbit.
    pub drydocks: Vec<FacilityId>,
    /// Starbases in fixed orbit.
    pub starbases: Vec<FacilityId>,
    /// The colony-level project currently consuming industry, if any.
    pub under_construction: Option<ProjectId>,
    /// Colony-level FIFO queue behind `under_construction`.
    pub construction_queue: Vec<ProjectId>,
    /// Repair projects waiting on drydock capacity.
    pub repair_queue: Vec<ProjectId>,
    /// Fighter squadrons based planetside.
    pub fighter_squadron_ids: Vec<SquadronId>,
    /// Turn at which the fighter capacity first went over limit, if it is
    /// currently violated. Cleared when back under capacity.
    pub capacity_violation_since: Option<u32>,
    /// Whether a hostile blockade is suppressing output.
    pub blockaded: bool,
    /// Automation flags the player can toggle.
    pub automation: ColonyAutomation,
}

impl Colony {
    /// Found a new colony with starter population and no infrastructure.
    pub fn found(
        system_id: SystemId,
        owner: HouseId,
        planet_class: PlanetClass,
        raw_quality: u8,
        population_units: u32,
    ) -> Self {
        Self {
            system_id,
            owner,
            planet_class,
            raw_quality,
            population_units,
            industrial_units: 0,
            gross_output: 0,
            tax_rate: 50,
            infrastructure_damage: 0,
            batteries: Vec::new(),
            armies: Vec::new(),
            marines: Vec::new(),
            shield_level: 0,
            spaceports: Vec::new(),
            shipyards: Vec::new(),
            drydocks: Vec::new(),
            starbases: Vec::new(),
            under_construction: None,
            construction_queue: Vec::new(),
            repair_queue: Vec::new(),
            fighter_squadron_ids: Vec::new(),
            capacity_violation_since: None,
            blockaded: false,
            automation: ColonyAutomation::default(),
        }
    }

    /// All facilities, dock-providing first in scheduling order
    /// (spaceports, then shipyards, then drydocks), starbases last.
    pub fn facilities(&self) -> impl Iterator<Item = FacilityId> + '_ {
        self.spaceports
            .iter()
            .chain(self.shipyards.iter())
            .chain(self.drydocks.iter())
            .chain(self.starbases.iter())
            .copied()
    }
}

/// Player-toggled automation flags for a colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyAutomation {
    /// Automatically queue repair of crippled ships in orbit.
    pub auto_repair: bool,
    /// Automatically load marines and fighters onto capable ships.
    pub auto_load: bool,
}

impl Default for ColonyAutomation {
    fn default() -> Self {
        Self {
            auto_repair: true,
            auto_load: false,
        }
    }
}
