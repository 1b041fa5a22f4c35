//! Intelligence report generation.
//!
//! Reports are produced during the turn the observation occurs: spy-scout
//! missions, starbase surveillance sweeps, combat encounters, and plain
//! fleet sightings. Everything funnels through [`file_report`], which
//! honors intel-block effects before merging into the observer's database.

use std::collections::BTreeMap;

use tracing::debug;

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::{EffectKind, IntelQuality, ShipClass};
use ec4x_types::ids::{FleetId, HouseId, SystemId};
use ec4x_types::intel::{
    ColonyIntel, IntelReport, ScoutEncounterReport, StarbaseIntel,
    StarbaseSurveillanceReport, SystemIntel,
};

use crate::rng::TurnRng;
use crate::state::GameState;

/// Merge a report into `observer`'s database, unless an intel block is
/// active against that house.
pub fn file_report(state: &mut GameState, observer: HouseId, report: IntelReport) {
    let blocked = state
        .effects
        .iter()
        .any(|(_, e)| e.kind == EffectKind::IntelBlocked && e.target_house == observer);
    if blocked {
        debug!(%observer, "intel report dropped: database blocked");
        return;
    }
    if let Some(house) = state.houses.get_mut(&observer) {
        house.intelligence_db.merge(report);
    }
}

/// Build a colony report at the given quality.
///
/// Low-quality observations round population and industry to the nearest
/// ten, and withhold the shield and garrison entirely.
pub fn observe_colony(
    state: &GameState,
    system: SystemId,
    quality: IntelQuality,
) -> Option<IntelReport> {
    let colony = state.colonies.get(&system)?;
    let rough = |n: u32| (n / 10).saturating_mul(10);
    let (pu, iu) = if quality >= IntelQuality::Spy {
        (colony.population_units, colony.industrial_units)
    } else {
        (rough(colony.population_units), rough(colony.industrial_units))
    };
    let garrison_size = u32::try_from(
        colony.armies.len() + colony.marines.len() + colony.batteries.len(),
    )
    .unwrap_or(u32::MAX);
    Some(IntelReport::Colony(ColonyIntel {
        system_id: system,
        turn: state.turn,
        quality,
        owner: colony.owner,
        planet_class: colony.planet_class,
        population_units: pu,
        industrial_units: iu,
        shield_level: (quality >= IntelQuality::Spy).then_some(colony.shield_level),
        garrison: (quality >= IntelQuality::Scouted).then_some(garrison_size),
    }))
}

/// Build a system report at the given quality.
pub fn observe_system(
    state: &GameState,
    system: SystemId,
    quality: IntelQuality,
) -> IntelReport {
    let mut fleets_present: BTreeMap<HouseId, u32> = BTreeMap::new();
    for fleet_id in state.fleets_at(system) {
        if let Some(fleet) = state.fleets.get(fleet_id) {
            let count = fleets_present.entry(fleet.owner).or_insert(0);
            *count = count.saturating_add(1);
        }
    }
    let colony = state.colonies.get(&system);
    IntelReport::System(SystemIntel {
        system_id: system,
        turn: state.turn,
        quality,
        fleets_present,
        has_colony: colony.is_some(),
        colony_owner: colony.map(|c| c.owner),
    })
}

/// Build a starbase report for the colony at `system`, if it has any.
pub fn observe_starbase(
    state: &GameState,
    system: SystemId,
    quality: IntelQuality,
) -> Option<IntelReport> {
    let colony = state.colonies.get(&system)?;
    if colony.starbases.is_empty() {
        return None;
    }
    let any_crippled = colony
        .starbases
        .iter()
        .filter_map(|id| state.facilities.get(*id))
        .any(|f| f.crippled);
    Some(IntelReport::Starbase(StarbaseIntel {
        system_id: system,
        turn: state.turn,
        quality,
        owner: colony.owner,
        starbase_count: u32::try_from(colony.starbases.len()).unwrap_or(u32::MAX),
        any_crippled,
    }))
}

/// Build a fleet-sighting report of `sighted` for an observer.
pub fn observe_fleet(state: &GameState, sighted: FleetId) -> Option<IntelReport> {
    let fleet = state.fleets.get(sighted)?;
    let mut composition: BTreeMap<ShipClass, u32> = BTreeMap::new();
    for squadron_id in &fleet.squadrons {
        let Some(squadron) = state.squadrons.get(*squadron_id) else {
            continue;
        };
        for ship_id in &squadron.ships {
            if let Some(ship) = state.ships.get(*ship_id) {
                let count = composition.entry(ship.class).or_insert(0);
                *count = count.saturating_add(1);
            }
        }
    }
    Some(IntelReport::ScoutEncounter(ScoutEncounterReport {
        system_id: fleet.location,
        turn: state.turn,
        observed_house: fleet.owner,
        composition,
    }))
}

/// Run starbase surveillance for every house: each starbase watches its
/// radius and files a report for foreign fleet activity it covers.
pub fn run_starbase_surveillance(state: &mut GameState, snapshot: &RuleSnapshot) {
    let mut filings: Vec<(HouseId, StarbaseSurveillanceReport)> = Vec::new();
    for (system, colony) in &state.colonies {
        if colony.starbases.is_empty() {
            continue;
        }
        let has_operational = colony
            .starbases
            .iter()
            .filter_map(|id| state.facilities.get(*id))
            .any(|f| !f.crippled);
        if !has_operational {
            continue;
        }
        let radius = snapshot
            .facilities
            .spec(ec4x_types::enums::FacilityKind::Starbase)
            .surveillance_radius;
        for watched in state.map.within_radius(*system, radius) {
            for fleet_id in state.fleets_at(watched) {
                let Some(fleet) = state.fleets.get(fleet_id) else {
                    continue;
                };
                if fleet.owner == colony.owner {
                    continue;
                }
                filings.push((
                    colony.owner,
                    StarbaseSurveillanceReport {
                        watching_from: *system,
                        system_id: watched,
                        turn: state.turn,
                        observed_house: fleet.owner,
                        activity: "fleet transit".to_owned(),
                    },
                ));
            }
        }
    }
    for (observer, report) in filings {
        file_report(state, observer, IntelReport::StarbaseSurveillance(report));
    }
}

/// Corrupt the numeric fields of a house's stored colony reports by the
/// summed magnitude of active disinformation effects against it.
pub fn apply_disinformation(state: &mut GameState, rng: &mut TurnRng) {
    let corrupted: Vec<(HouseId, i32)> = state
        .effects
        .iter()
        .filter(|(_, e)| e.kind == EffectKind::IntelCorrupted)
        .map(|(_, e)| (e.target_house, e.magnitude))
        .collect();
    for (house_id, magnitude) in corrupted {
        let variance = u32::try_from(magnitude.max(0)).unwrap_or(0);
        if variance == 0 {
            continue;
        }
        // Each stored report drifts up or down by up to `variance` percent.
        let systems: Vec<SystemId> = state
            .houses
            .get(&house_id)
            .map(|h| h.intelligence_db.colonies.keys().copied().collect())
            .unwrap_or_default();
        for system in systems {
            let up = rng.pct(50);
            let swing = rng.below(variance.saturating_add(1));
            let Some(house) = state.houses.get_mut(&house_id) else {
                continue;
            };
            let Some(report) = house.intelligence_db.colonies.get_mut(&system) else {
                continue;
            };
            let scale = |n: u32| {
                let delta = n.saturating_mul(swing) / 100;
                if up { n.saturating_add(delta) } else { n.saturating_sub(delta) }
            };
            report.population_units = scale(report.population_units);
            report.industrial_units = scale(report.industrial_units);
        }
        debug!(%house_id, variance, "disinformation applied");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::GameSetup;

    fn fixture() -> (GameState, RuleSnapshot) {
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        (state, snapshot)
    }

    #[test]
    fn spy_quality_sees_exact_numbers() {
        let (state, _) = fixture();
        let target = state.colonies_of(HouseId::new(1))[0];
        let exact = state.colonies.get(&target).unwrap().population_units;

        let report = observe_colony(&state, target, IntelQuality::Spy).unwrap();
        let IntelReport::Colony(colony) = report else {
            panic!("wrong report variant");
        };
        assert_eq!(colony.population_units, exact);
        assert!(colony.shield_level.is_some());
    }

    #[test]
    fn adjacent_quality_sees_rounded_numbers_and_no_shield() {
        let (mut state, _) = fixture();
        let target = state.colonies_of(HouseId::new(1))[0];
        state.colonies.get_mut(&target).unwrap().population_units = 487;

        let report = observe_colony(&state, target, IntelQuality::Adjacent).unwrap();
        let IntelReport::Colony(colony) = report else {
            panic!("wrong report variant");
        };
        assert_eq!(colony.population_units, 480);
        assert!(colony.shield_level.is_none());
        assert!(colony.garrison.is_none());
    }

    #[test]
    fn intel_block_drops_reports() {
        let (mut state, _) = fixture();
        let observer = HouseId::new(0);
        let target = state.colonies_of(HouseId::new(1))[0];
        state.effects.create(|id| ec4x_types::projects::OngoingEffect {
            id,
            kind: EffectKind::IntelBlocked,
            target_house: observer,
            target_system: None,
            turns_remaining: 2,
            magnitude: 100,
        });

        let report = observe_colony(&state, target, IntelQuality::Spy).unwrap();
        file_report(&mut state, observer, report);
        assert!(
            state
                .houses
                .get(&observer)
                .unwrap()
                .intelligence_db
                .colonies
                .is_empty()
        );
    }

    #[test]
    fn fleet_sighting_counts_hulls() {
        let (state, _) = fixture();
        let fleet_id = state.fleets_of(HouseId::new(1))[0];
        let report = observe_fleet(&state, fleet_id).unwrap();
        let IntelReport::ScoutEncounter(sighting) = report else {
            panic!("wrong report variant");
        };
        let total: u32 = sighting.composition.values().sum();
        assert!(total >= 4, "default template fields two squadrons");
    }
}
