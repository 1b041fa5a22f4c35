//! Fog-of-war projection.
//!
//! For each house, derive the [`PlayerState`] it is entitled to see: its
//! own assets at Perfect quality, foreign assets redacted to the quality of
//! its intelligence, and the public ledgers (names, prestige standings,
//! colony counts, diplomatic pairs). The projection is the unit of state
//! delivery to clients; nothing else ever leaves the engine.

use std::collections::{BTreeMap, BTreeSet};

use ec4x_types::enums::IntelQuality;
use ec4x_types::events::GameEvent;
use ec4x_types::ids::{FleetId, HouseId, SystemId, pack_house_pair};
use ec4x_types::player_state::{PlayerState, VisibleColony, VisibleFleet, VisibleSystem};

use crate::state::GameState;

/// Project the state one house is allowed to know.
///
/// `events` is the full event log for the turn; only entries whose scope
/// includes the house survive the projection.
pub fn player_state(state: &GameState, house_id: HouseId, events: &[GameEvent]) -> PlayerState {
    let house = state
        .houses
        .get(&house_id)
        .cloned()
        .unwrap_or_else(|| ec4x_types::house::House::new(house_id, "Unknown", 0));

    let own_colonies: BTreeMap<SystemId, _> = state
        .colonies
        .iter()
        .filter(|(_, colony)| colony.owner == house_id)
        .map(|(system, colony)| (*system, colony.clone()))
        .collect();

    let own_fleets: BTreeMap<FleetId, _> = state
        .fleets
        .iter()
        .filter(|(_, fleet)| fleet.owner == house_id)
        .map(|(id, fleet)| (id, fleet.clone()))
        .collect();

    let own_squadrons: BTreeMap<_, _> = state
        .squadrons
        .iter()
        .filter(|(_, squadron)| squadron.house_id == house_id)
        .map(|(id, squadron)| (id, squadron.clone()))
        .collect();

    let own_ships: BTreeMap<_, _> = state
        .ships
        .iter()
        .filter(|(_, ship)| ship.house_id == house_id)
        .map(|(id, ship)| (id, ship.clone()))
        .collect();

    let own_ground_units: BTreeMap<_, _> = state
        .ground_units
        .iter()
        .filter(|(_, unit)| unit.owner == house_id)
        .map(|(id, unit)| (id, unit.clone()))
        .collect();

    let own_facilities: BTreeMap<_, _> = state
        .facilities
        .iter()
        .filter(|(_, facility)| {
            state
                .colonies
                .get(&facility.colony)
                .is_some_and(|colony| colony.owner == house_id)
        })
        .map(|(id, facility)| (id, facility.clone()))
        .collect();

    let own_projects: BTreeMap<_, _> = state
        .projects
        .iter()
        .filter(|(_, project)| {
            state
                .colonies
                .get(&project.colony)
                .is_some_and(|colony| colony.owner == house_id)
        })
        .map(|(id, project)| (id, project.clone()))
        .collect();

    let own_transfers: BTreeMap<_, _> = state
        .transfers
        .iter()
        .filter(|(_, transfer)| transfer.house_id == house_id)
        .map(|(id, transfer)| (id, transfer.clone()))
        .collect();

    let visible_colonies = visible_colonies(state, house_id);
    let visible_systems = visible_systems(state, house_id);
    let visible_fleets = visible_fleets(state, house_id);

    let house_names: BTreeMap<HouseId, String> = state
        .houses
        .iter()
        .map(|(id, record)| (*id, record.name.clone()))
        .collect();
    let prestige: BTreeMap<HouseId, i64> = state
        .houses
        .iter()
        .map(|(id, record)| (*id, record.prestige))
        .collect();
    let colony_counts: BTreeMap<HouseId, u32> = state
        .houses
        .keys()
        .map(|id| {
            (
                *id,
                u32::try_from(state.colonies_of(*id).len()).unwrap_or(u32::MAX),
            )
        })
        .collect();

    let mut diplomacy = BTreeMap::new();
    for (source, record) in &state.houses {
        for (target, stance) in &record.diplomatic_relations {
            diplomacy.insert(pack_house_pair(*source, *target), *stance);
        }
    }

    let eliminated: BTreeSet<HouseId> = state
        .houses
        .iter()
        .filter(|(_, record)| record.eliminated)
        .map(|(id, _)| *id)
        .collect();

    let events: Vec<GameEvent> = events
        .iter()
        .filter(|event| event.scope.includes(house_id))
        .cloned()
        .collect();

    let map = state
        .map
        .systems()
        .map(|(id, system)| (*id, system.clone()))
        .collect();

    PlayerState {
        house_id,
        turn: state.turn,
        config_hash: state.config_hash.clone(),
        house,
        map,
        own_colonies,
        own_fleets,
        own_squadrons,
        own_ships,
        own_ground_units,
        own_facilities,
        own_projects,
        own_transfers,
        visible_systems,
        visible_colonies,
        visible_fleets,
        house_names,
        prestige,
        colony_counts,
        diplomacy,
        eliminated,
        events,
    }
}

/// Foreign colonies, as the intel database knows them.
fn visible_colonies(state: &GameState, house_id: HouseId) -> BTreeMap<SystemId, VisibleColony> {
    let Some(house) = state.houses.get(&house_id) else {
        return BTreeMap::new();
    };
    house
        .intelligence_db
        .colonies
        .values()
        .filter(|report| report.owner != house_id)
        .map(|report| {
            (
                report.system_id,
                VisibleColony {
                    system_id: report.system_id,
                    ltu: report.turn,
                    quality: report.quality,
                    owner: report.owner,
                    planet_class: report.planet_class,
                    population_units: (report.quality >= IntelQuality::Scouted)
                        .then_some(report.population_units),
                    industrial_units: (report.quality >= IntelQuality::Scouted)
                        .then_some(report.industrial_units),
                    shield_level: report.shield_level,
                    garrison: report.garrison,
                },
            )
        })
        .collect()
}

/// Foreign system contents, as the intel database knows them.
fn visible_systems(state: &GameState, house_id: HouseId) -> BTreeMap<SystemId, VisibleSystem> {
    let Some(house) = state.houses.get(&house_id) else {
        return BTreeMap::new();
    };
    house
        .intelligence_db
        .systems
        .values()
        .map(|report| {
            (
                report.system_id,
                VisibleSystem {
                    system_id: report.system_id,
                    ltu: report.turn,
                    has_colony: report.has_colony,
                    colony_owner: report.colony_owner,
                    fleets_present: report.fleets_present.clone(),
                },
            )
        })
        .collect()
}

/// Foreign fleets currently in visual range: co-located with the house's
/// own fleets, or over one of its colonies.
fn visible_fleets(state: &GameState, house_id: HouseId) -> BTreeMap<FleetId, VisibleFleet> {
    let mut watched_systems: BTreeSet<SystemId> = state
        .colonies_of(house_id)
        .into_iter()
        .collect();
    for fleet_id in state.fleets_of(house_id) {
        if let Some(fleet) = state.fleets.get(fleet_id) {
            watched_systems.insert(fleet.location);
        }
    }

    let mut visible = BTreeMap::new();
    for system in watched_systems {
        for fleet_id in state.fleets_at(system) {
            let Some(fleet) = state.fleets.get(fleet_id) else {
                continue;
            };
            if fleet.owner == house_id {
                continue;
            }
            let mut ship_count = 0u32;
            let mut composition = BTreeMap::new();
            for squadron_id in &fleet.squadrons {
                let Some(squadron) = state.squadrons.get(*squadron_id) else {
                    continue;
                };
                for ship_id in &squadron.ships {
                    if let Some(ship) = state.ships.get(*ship_id) {
                        ship_count = ship_count.saturating_add(1);
                        let entry = composition.entry(ship.class).or_insert(0u32);
                        *entry = entry.saturating_add(1);
                    }
                }
            }
            visible.insert(
                fleet_id,
                VisibleFleet {
                    fleet_id,
                    ltu: state.turn,
                    quality: IntelQuality::Adjacent,
                    owner: fleet.owner,
                    location: fleet.location,
                    ship_count,
                    composition: Some(composition),
                },
            );
        }
    }
    visible
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::{GameSetup, RuleSnapshot};

    fn fixture() -> GameState {
        GameState::new_game(&GameSetup::default(), &RuleSnapshot::default()).unwrap()
    }

    #[test]
    fn projection_contains_only_own_assets() {
        let state = fixture();
        let me = HouseId::new(0);
        let projected = player_state(&state, me, &[]);

        assert!(projected.own_colonies.values().all(|c| c.owner == me));
        assert!(projected.own_fleets.values().all(|f| f.owner == me));
        assert!(projected.own_ships.values().all(|s| s.house_id == me));
        assert_eq!(projected.own_colonies.len(), 1);
    }

    #[test]
    fn foreign_assets_without_intel_are_invisible() {
        let state = fixture();
        let projected = player_state(&state, HouseId::new(0), &[]);
        // No scouting has happened: the enemy homeworlds are dark.
        assert!(projected.visible_colonies.is_empty());
        assert!(projected.visible_fleets.is_empty());
    }

    #[test]
    fn public_ledgers_cover_every_house() {
        let state = fixture();
        let projected = player_state(&state, HouseId::new(2), &[]);
        assert_eq!(projected.house_names.len(), 4);
        assert_eq!(projected.prestige.len(), 4);
        assert_eq!(projected.colony_counts.values().sum::<u32>(), 4);
    }

    #[test]
    fn events_are_scope_filtered() {
        use ec4x_types::events::{EventKind, Visibility};
        let state = fixture();
        let events = vec![
            GameEvent {
                turn: 1,
                scope: Visibility::All,
                kind: EventKind::AutoHold { house: HouseId::new(3) },
            },
            GameEvent {
                turn: 1,
                scope: Visibility::only(HouseId::new(1)),
                kind: EventKind::AutoHold { house: HouseId::new(1) },
            },
        ];
        let zero = player_state(&state, HouseId::new(0), &events);
        let one = player_state(&state, HouseId::new(1), &events);
        assert_eq!(zero.events.len(), 1);
        assert_eq!(one.events.len(), 2);
    }

    #[test]
    fn colocated_foreign_fleet_becomes_visible() {
        let mut state = fixture();
        let me = HouseId::new(0);
        let them = HouseId::new(1);
        let their_fleet = state.fleets_of(them)[0];
        let my_home = state.colonies_of(me)[0];
        state.move_fleet(their_fleet, my_home);

        let projected = player_state(&state, me, &[]);
        assert!(projected.visible_fleets.contains_key(&their_fleet));
        let seen = projected.visible_fleets.get(&their_fleet).unwrap();
        assert_eq!(seen.owner, them);
        assert!(seen.ship_count > 0);
    }
}
