//! Intelligence reports and the per-house intelligence database.
//!
//! A report records what one house observed about another at a specific
//! turn and quality. The database keeps the best report per target:
//! supersession is latest-quality-wins, with a newer report of equal or
//! higher quality replacing an older one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{IntelQuality, PlanetClass, ShipClass};
use crate::ids::{HouseId, SystemId};

/// What a house knows about an enemy colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyIntel {
    /// The observed system.
    pub system_id: SystemId,
    /// Turn of observation.
    pub turn: u32,
    /// Report quality.
    pub quality: IntelQuality,
    /// Observed owner.
    pub owner: HouseId,
    /// Observed planet class.
    pub planet_class: PlanetClass,
    /// Observed population units (rough at low quality).
    pub population_units: u32,
    /// Observed industrial units (rough at low quality).
    pub industrial_units: u32,
    /// Observed shield level; `None` below Spy quality.
    pub shield_level: Option<u8>,
    /// Observed garrison size; `None` below Scouted quality.
    pub garrison: Option<u32>,
}

/// What a house knows about a system's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemIntel {
    /// The observed system.
    pub system_id: SystemId,
    /// Turn of observation.
    pub turn: u32,
    /// Report quality.
    pub quality: IntelQuality,
    /// Houses whose fleets were present.
    pub fleets_present: BTreeMap<HouseId, u32>,
    /// Whether a colony was observed.
    pub has_colony: bool,
    /// Colony owner if a colony was observed.
    pub colony_owner: Option<HouseId>,
}

/// What a house knows about an enemy starbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarbaseIntel {
    /// The system whose starbase was observed.
    pub system_id: SystemId,
    /// Turn of observation.
    pub turn: u32,
    /// Report quality.
    pub quality: IntelQuality,
    /// Observed owner.
    pub owner: HouseId,
    /// Number of starbases observed.
    pub starbase_count: u32,
    /// Whether any observed starbase was crippled.
    pub any_crippled: bool,
}

/// A combat encounter as witnessed by one participating or observing house.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEncounterReport {
    /// Where the battle happened.
    pub system_id: SystemId,
    /// Turn of the battle.
    pub turn: u32,
    /// Report quality (drives how much of the enemy side is visible).
    pub quality: IntelQuality,
    /// The houses that fought.
    pub belligerents: Vec<HouseId>,
    /// Ships lost per house, as visible to the observer.
    pub losses: BTreeMap<HouseId, u32>,
    /// The house that held the field, if the observer could tell.
    pub victor: Option<HouseId>,
}

/// Enemy activity caught by a starbase's surveillance radius.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarbaseSurveillanceReport {
    /// The system the starbase watches from.
    pub watching_from: SystemId,
    /// The system where activity was seen.
    pub system_id: SystemId,
    /// Turn of observation.
    pub turn: u32,
    /// The house whose activity was seen.
    pub observed_house: HouseId,
    /// Short description of the activity (transit, combat, bombardment).
    pub activity: String,
}

/// A fleet sighted in visual range of another fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutEncounterReport {
    /// Where the sighting happened.
    pub system_id: SystemId,
    /// Turn of the sighting.
    pub turn: u32,
    /// The sighted house.
    pub observed_house: HouseId,
    /// Hull classes counted, at Adjacent quality.
    pub composition: BTreeMap<ShipClass, u32>,
}

/// One typed report, as generated during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntelReport {
    /// A colony observation.
    Colony(ColonyIntel),
    /// A system observation.
    System(SystemIntel),
    /// A starbase observation.
    Starbase(StarbaseIntel),
    /// A combat encounter.
    CombatEncounter(CombatEncounterReport),
    /// Starbase surveillance.
    StarbaseSurveillance(StarbaseSurveillanceReport),
    /// A fleet sighting.
    ScoutEncounter(ScoutEncounterReport),
}

/// Everything a house believes about the galaxy.
///
/// Keyed stores hold the single best report per target; encounter-style
/// reports are append-only within a bounded window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelligenceDatabase {
    /// Best colony report per system.
    pub colonies: BTreeMap<SystemId, ColonyIntel>,
    /// Best system report per system.
    pub systems: BTreeMap<SystemId, SystemIntel>,
    /// Best starbase report per system.
    pub starbases: BTreeMap<SystemId, StarbaseIntel>,
    /// Combat encounters witnessed, newest last.
    pub encounters: Vec<CombatEncounterReport>,
    /// Surveillance hits, newest last.
    pub surveillance: Vec<StarbaseSurveillanceReport>,
    /// Fleet sightings, newest last.
    pub scout_contacts: Vec<ScoutEncounterReport>,
}

impl IntelligenceDatabase {
    /// Merge a report, applying latest-quality-wins supersession.
    ///
    /// A stored report is replaced when the incoming one is newer and of
    /// equal-or-better quality, or strictly better quality at any age.
    pub fn merge(&mut self, report: IntelReport) {
        match report {
            IntelReport::Colony(r) => {
                let replace = self.colonies.get(&r.system_id).is_none_or(|old| {
                    supersedes(r.turn, r.quality, old.turn, old.quality)
                });
                if replace {
                    self.colonies.insert(r.system_id, r);
                }
            }
            IntelReport::System(r) => {
                let replace = self.systems.get(&r.system_id).is_none_or(|old| {
                    supersedes(r.turn, r.quality, old.turn, old.quality)
                });
                if replace {
                    self.systems.insert(r.system_id, r);
                }
            }
            IntelReport::Starbase(r) => {
                let replace = self.starbases.get(&r.system_id).is_none_or(|old| {
                    supersedes(r.turn, r.quality, old.turn, old.quality)
                });
                if replace {
                    self.starbases.insert(r.system_id, r);
                }
            }
            IntelReport::CombatEncounter(r) => self.encounters.push(r),
            IntelReport::StarbaseSurveillance(r) => self.surveillance.push(r),
            IntelReport::ScoutEncounter(r) => self.scout_contacts.push(r),
        }
    }
}

/// Whether a new `(turn, quality)` pair supersedes a stored one.
fn supersedes(
    new_turn: u32,
    new_quality: IntelQuality,
    old_turn: u32,
    old_quality: IntelQuality,
) -> bool {
    new_quality > old_quality || (new_turn >= old_turn && new_quality >= old_quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colony_report(turn: u32, quality: IntelQuality, pu: u32) -> IntelReport {
        IntelReport::Colony(ColonyIntel {
            system_id: SystemId::new(5),
            turn,
            quality,
            owner: HouseId::new(2),
            planet_class: PlanetClass::Benign,
            population_units: pu,
            industrial_units: 10,
            shield_level: None,
            garrison: None,
        })
    }

    #[test]
    fn newer_equal_quality_report_replaces() {
        let mut db = IntelligenceDatabase::default();
        db.merge(colony_report(1, IntelQuality::Scouted, 100));
        db.merge(colony_report(3, IntelQuality::Scouted, 140));
        let stored = db.colonies.get(&SystemId::new(5)).map(|r| r.population_units);
        assert_eq!(stored, Some(140));
    }

    #[test]
    fn older_lower_quality_report_does_not_replace() {
        let mut db = IntelligenceDatabase::default();
        db.merge(colony_report(4, IntelQuality::Spy, 120));
        db.merge(colony_report(5, IntelQuality::Adjacent, 999));
        let stored = db.colonies.get(&SystemId::new(5)).map(|r| r.population_units);
        assert_eq!(stored, Some(120));
    }

    #[test]
    fn higher_quality_wins_even_if_older() {
        let mut db = IntelligenceDatabase::default();
        db.merge(colony_report(6, IntelQuality::Adjacent, 50));
        db.merge(colony_report(2, IntelQuality::Spy, 80));
        let stored = db.colonies.get(&SystemId::new(5)).map(|r| r.quality);
        assert_eq!(stored, Some(IntelQuality::Spy));
    }
}
