//! Phase 4: Maintenance.
//!
//! The bookkeeping tail of the turn: persistent movement executes one hex,
//! transfers arrive, projects advance, upkeep is collected (with shortfall
//! damage for delinquents), timed effects tick down, capacity limits are
//! enforced, diplomatic offers settle, victory is checked, and every
//! house's intelligence picture is refreshed.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::{
    DiplomaticState, FleetPosture, IntelQuality, PrestigeSource, ShipClass, ShipState,
};
use ec4x_types::events::EventKind;
use ec4x_types::ids::{FleetId, HouseId, ProjectId, SystemId};
use ec4x_types::orders::{CommandPacket, DiplomaticCommand};

use crate::diplomacy;
use crate::events::EventSink;
use crate::intel;
use crate::prestige;
use crate::rng::TurnRng;
use crate::state::GameState;

/// Run the Maintenance Phase.
pub fn run(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    rng: &mut TurnRng,
    sink: &mut EventSink,
) {
    execute_movement(state);
    deliver_transfers(state, sink);
    advance_projects(state);
    collect_upkeep(state, snapshot, sink);
    tick_effects(state);
    enforce_capacities(state, snapshot, sink);
    apply_diplomacy(state, staged, sink);
    refresh_blockades(state);
    check_victory(state, sink);
    regenerate_intel(state, snapshot, rng);
}

// -----------------------------------------------------------------------
// (a) Movement
// -----------------------------------------------------------------------

/// Each moving fleet traverses one hex along its persisted path, lane
/// class permitting.
fn execute_movement(state: &mut GameState) {
    let moving: Vec<FleetId> = state
        .fleets
        .iter()
        .filter(|(_, fleet)| fleet.movement.is_some())
        .map(|(id, _)| id)
        .collect();

    for fleet_id in moving {
        let Some(fleet) = state.fleets.get(fleet_id) else {
            continue;
        };
        let here = fleet.location;
        let Some(movement) = fleet.movement.clone() else {
            continue;
        };
        let Some(next) = movement.path.first().copied() else {
            if let Some(fleet) = state.fleets.get_mut(fleet_id) {
                fleet.movement = None;
            }
            continue;
        };
        let Some(lane) = state.map.lane_between(here, next) else {
            // The stored path no longer matches the map; drop it.
            if let Some(fleet) = state.fleets.get_mut(fleet_id) {
                fleet.movement = None;
            }
            continue;
        };
        let crippled = state.fleet_has_crippled(fleet_id);
        if lane == ec4x_types::enums::LaneClass::Restricted && crippled {
            // A ship crippled since the path was laid closes this lane.
            let destination = movement.destination;
            let result = ec4x_world::find_path(&state.map, here, destination, true);
            if let Some(fleet) = state.fleets.get_mut(fleet_id) {
                fleet.movement = result.found.then(|| ec4x_types::fleet::MovementOrder {
                    path: result.path.into_iter().skip(1).collect(),
                    destination,
                });
            }
            continue;
        }

        state.move_fleet(fleet_id, next);
        if let Some(fleet) = state.fleets.get_mut(fleet_id) {
            if let Some(movement) = &mut fleet.movement {
                movement.path.remove(0);
                if movement.path.is_empty() {
                    fleet.movement = None;
                }
            }
        }
        debug!(%fleet_id, from = %here, to = %next, "fleet moved");
    }
}

/// Transfers whose arrival turn has come convert back to population.
fn deliver_transfers(state: &mut GameState, sink: &mut EventSink) {
    let arriving: Vec<_> = state
        .transfers
        .iter()
        .filter(|(_, t)| t.arrival_turn <= state.turn)
        .map(|(id, t)| (id, t.clone()))
        .collect();
    for (id, transfer) in arriving {
        state.transfers.delete(id);
        let Some(colony) = state.colonies.get_mut(&transfer.destination) else {
            // Destination fell while the convoy was in transit; the
            // settlers scatter.
            continue;
        };
        if colony.owner != transfer.house_id {
            continue;
        }
        colony.population_units = colony.population_units.saturating_add(transfer.ptu_amount);
        sink.emit(
            ec4x_types::events::Visibility::only(transfer.house_id),
            EventKind::TransferArrived {
                destination: transfer.destination,
                owner: transfer.house_id,
                ptu: transfer.ptu_amount,
            },
        );
    }
}

// -----------------------------------------------------------------------
// (b) Project advancement
// -----------------------------------------------------------------------

fn advance_projects(state: &mut GameState) {
    // Promote queued dock work into any slots freed since last turn.
    promote_dock_queues(state);

    // Dock-bound projects all advance in parallel.
    let mut finished: Vec<ProjectId> = Vec::new();
    let ids: Vec<ProjectId> = state.projects.ids();
    for project_id in ids {
        let Some(project) = state.projects.get(project_id) else {
            continue;
        };
        let advances = project.dock.is_some()
            || state
                .colonies
                .get(&project.colony)
                .is_some_and(|c| c.under_construction == Some(project_id));
        if !advances {
            continue;
        }
        if let Some(project) = state.projects.get_mut(project_id) {
            project.turns_remaining = project.turns_remaining.saturating_sub(1);
            if project.turns_remaining == 0 {
                finished.push(project_id);
            }
        }
    }

    for project_id in &finished {
        state.pending_commissions.push(*project_id);
        // Clear colony-queue heads and promote the next in line.
        let colony_system = state.projects.get(*project_id).map(|p| p.colony);
        if let Some(system) = colony_system
            && let Some(colony) = state.colonies.get_mut(&system)
        {
            if colony.under_construction == Some(*project_id) {
                colony.under_construction = if colony.construction_queue.is_empty() {
                    None
                } else {
                    Some(colony.construction_queue.remove(0))
                };
            }
            colony.repair_queue.retain(|p| p != project_id);
        }
    }
}

/// Give queued dock-needing projects any free slots, oldest first.
fn promote_dock_queues(state: &mut GameState) {
    let waiting: Vec<(ProjectId, SystemId)> = state
        .projects
        .iter()
        .filter(|(_, p)| p.dock.is_none() && wants_dock(p))
        .map(|(id, p)| (id, p.colony))
        .collect();
    for (project_id, system) in waiting {
        let kinds: &[ec4x_types::enums::FacilityKind] =
            if matches!(
                state.projects.get(project_id).map(|p| &p.kind),
                Some(ec4x_types::projects::ProjectKind::RepairShip(_))
                    | Some(ec4x_types::projects::ProjectKind::RepairStarbase(_))
            ) {
                &[ec4x_types::enums::FacilityKind::Drydock]
            } else {
                &[
                    ec4x_types::enums::FacilityKind::Spaceport,
                    ec4x_types::enums::FacilityKind::Shipyard,
                    ec4x_types::enums::FacilityKind::Drydock,
                ]
            };
        let slot = free_dock_slot(state, system, kinds);
        if let Some(facility) = slot {
            if let Some(project) = state.projects.get_mut(project_id) {
                project.dock = Some(facility);
            }
            // No longer waiting in the colony-level lists.
            if let Some(colony) = state.colonies.get_mut(&system) {
                if colony.under_construction == Some(project_id) {
                    colony.under_construction = if colony.construction_queue.is_empty() {
                        None
                    } else {
                        Some(colony.construction_queue.remove(0))
                    };
                }
                colony.construction_queue.retain(|p| *p != project_id);
                colony.repair_queue.retain(|p| *p != project_id);
            }
        }
    }
}

const fn wants_dock(project: &ec4x_types::projects::ConstructionProject) -> bool {
    match project.kind {
        ec4x_types::projects::ProjectKind::Ship(class) => class.needs_dock(),
        ec4x_types::projects::ProjectKind::RepairShip(_)
        | ec4x_types::projects::ProjectKind::RepairStarbase(_) => true,
        _ => false,
    }
}

fn free_dock_slot(
    state: &GameState,
    system: SystemId,
    kinds: &[ec4x_types::enums::FacilityKind],
) -> Option<ec4x_types::ids::FacilityId> {
    let colony = state.colonies.get(&system)?;
    for kind in kinds {
        let list = match kind {
            ec4x_types::enums::FacilityKind::Spaceport => &colony.spaceports,
            ec4x_types::enums::FacilityKind::Shipyard => &colony.shipyards,
            ec4x_types::enums::FacilityKind::Drydock => &colony.drydocks,
            ec4x_types::enums::FacilityKind::Starbase => continue,
        };
        for facility_id in list {
            let Some(facility) = state.facilities.get(*facility_id) else {
                continue;
            };
            if facility.crippled {
                continue;
            }
            let occupied = state
                .projects
                .iter()
                .filter(|(_, p)| p.dock == Some(*facility_id))
                .count();
            if u32::try_from(occupied).unwrap_or(u32::MAX) < facility.effective_docks {
                return Some(*facility_id);
            }
        }
    }
    None
}

// -----------------------------------------------------------------------
// (c) Upkeep
// -----------------------------------------------------------------------

fn collect_upkeep(state: &mut GameState, snapshot: &RuleSnapshot, sink: &mut EventSink) {
    for house_id in state.live_houses() {
        let ship_upkeep: i64 = state
            .indices
            .ships_by_house
            .get(&house_id)
            .map(|set| {
                set.iter()
                    .filter_map(|id| state.ships.get(*id))
                    .map(|ship| {
                        let base = ship.stats.maintenance;
                        if ship.state == ShipState::Crippled {
                            base.saturating_mul(i64::from(
                                snapshot.economy.crippled_maintenance_pct,
                            )) / 100
                        } else {
                            base
                        }
                    })
                    .sum()
            })
            .unwrap_or(0);

        let facility_upkeep: i64 = state
            .colonies_of(house_id)
            .iter()
            .filter_map(|system| state.colonies.get(system))
            .flat_map(|colony| colony.facilities())
            .filter_map(|id| state.facilities.get(id))
            .map(|facility| snapshot.facilities.spec(facility.kind).maintenance)
            .sum();

        let ground_upkeep: i64 = state
            .ground_units
            .iter()
            .filter(|(_, unit)| unit.owner == house_id)
            .map(|(_, unit)| snapshot.ground_units.spec(unit.kind).maintenance)
            .sum();

        let total = ship_upkeep
            .saturating_add(facility_upkeep)
            .saturating_add(ground_upkeep);

        let covered = state
            .houses
            .get(&house_id)
            .is_some_and(|house| house.treasury >= total);

        if covered {
            if let Some(house) = state.houses.get_mut(&house_id) {
                house.treasury = house.treasury.saturating_sub(total);
            }
            state.overdraft_steps.insert(house_id, 0);
            continue;
        }

        // Shortfall: the treasury floors at zero and a colony pays in
        // broken infrastructure.
        if let Some(house) = state.houses.get_mut(&house_id) {
            house.treasury = 0;
        }
        let steps = state
            .overdraft_steps
            .entry(house_id)
            .and_modify(|s| *s = s.saturating_add(1))
            .or_insert(1);
        let damage = snapshot
            .economy
            .shortfall_base
            .saturating_add(
                snapshot
                    .economy
                    .shortfall_increment
                    .saturating_mul(u8::try_from(steps.saturating_sub(1)).unwrap_or(u8::MAX)),
            )
            .min(100);

        let target = shortfall_target(state, house_id);
        if let Some(system) = target {
            if let Some(colony) = state.colonies.get_mut(&system) {
                colony.infrastructure_damage =
                    colony.infrastructure_damage.saturating_add(damage).min(100);
            }
            warn!(%house_id, %system, damage, "maintenance shortfall");
            sink.emit_public(EventKind::MaintenanceShortfall {
                house: house_id,
                colony: system,
                damage,
            });
        }
        prestige::award(
            state,
            sink,
            snapshot,
            house_id,
            None,
            PrestigeSource::MaintenanceShortfall,
            "failed to meet maintenance",
        );
    }
}

/// The colony that absorbs shortfall damage: lowest population, ties to
/// the lowest system id.
fn shortfall_target(state: &GameState, house: HouseId) -> Option<SystemId> {
    state
        .colonies_of(house)
        .into_iter()
        .filter_map(|system| {
            state
                .colonies
                .get(&system)
                .map(|colony| (colony.population_units, system))
        })
        .min()
        .map(|(_, system)| system)
}

// -----------------------------------------------------------------------
// (d) Timed effects
// -----------------------------------------------------------------------

fn tick_effects(state: &mut GameState) {
    let expired: Vec<_> = {
        let ids = state.effects.ids();
        let mut expired = Vec::new();
        for id in ids {
            if let Some(effect) = state.effects.get_mut(id) {
                effect.turns_remaining = effect.turns_remaining.saturating_sub(1);
                if effect.turns_remaining == 0 {
                    expired.push(id);
                }
            }
        }
        expired
    };
    for id in expired {
        state.effects.delete(id);
    }

    let turn = state.turn;
    state.active_sweeps.retain(|_, until| *until > turn);

    for house in state.houses.values_mut() {
        house.dishonored_turns = house.dishonored_turns.saturating_sub(1);
        house.isolation_turns = house.isolation_turns.saturating_sub(1);
    }
}

// -----------------------------------------------------------------------
// (e) Capacity enforcement
// -----------------------------------------------------------------------

fn enforce_capacities(state: &mut GameState, snapshot: &RuleSnapshot, sink: &mut EventSink) {
    enforce_fighter_capacity(state, snapshot, sink);
    enforce_planet_breaker_capacity(state, sink);
}

/// Fighters over capacity get a grace period, then the oldest excess
/// squadrons are disbanded.
fn enforce_fighter_capacity(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    sink: &mut EventSink,
) {
    let systems: Vec<SystemId> = state.colonies.keys().copied().collect();
    for system in systems {
        let Some(colony) = state.colonies.get(&system) else {
            continue;
        };
        let capacity = crate::resolve::fighter_capacity(state, snapshot, colony);
        let count = u32::try_from(colony.fighter_squadron_ids.len()).unwrap_or(u32::MAX);
        let owner = colony.owner;

        if count <= capacity {
            if let Some(colony) = state.colonies.get_mut(&system) {
                colony.capacity_violation_since = None;
            }
            continue;
        }

        let since = colony.capacity_violation_since;
        match since {
            None => {
                if let Some(colony) = state.colonies.get_mut(&system) {
                    colony.capacity_violation_since = Some(state.turn);
                }
            }
            Some(start)
                if state.turn.saturating_sub(start)
                    >= snapshot.military.fighter_grace_turns =>
            {
                let mut squadron_ids = state
                    .colonies
                    .get(&system)
                    .map(|c| c.fighter_squadron_ids.clone())
                    .unwrap_or_default();
                squadron_ids.sort();
                let excess = usize::try_from(count.saturating_sub(capacity)).unwrap_or(0);
                for squadron_id in squadron_ids.into_iter().take(excess) {
                    state.destroy_squadron(squadron_id);
                    sink.emit_public(EventKind::SquadronScrapped {
                        squadron: squadron_id,
                        owner,
                        salvage: 0,
                    });
                    info!(%system, %squadron_id, "fighter squadron disbanded over capacity");
                }
                if let Some(colony) = state.colonies.get_mut(&system) {
                    colony.capacity_violation_since = None;
                }
            }
            Some(_) => {}
        }
    }
}

/// Planet breakers over the colony count are scrapped immediately, oldest
/// first, with no salvage and no grace.
fn enforce_planet_breaker_capacity(state: &mut GameState, sink: &mut EventSink) {
    for house_id in state.live_houses() {
        let colonies = u32::try_from(state.colonies_of(house_id).len()).unwrap_or(0);
        let mut breakers: Vec<_> = state
            .indices
            .ships_by_house
            .get(&house_id)
            .map(|set| {
                set.iter()
                    .filter(|id| {
                        state
                            .ships
                            .get(**id)
                            .is_some_and(|ship| ship.class == ShipClass::PlanetBreaker)
                    })
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        breakers.sort();
        let count = u32::try_from(breakers.len()).unwrap_or(u32::MAX);
        if count <= colonies {
            continue;
        }
        let excess = usize::try_from(count.saturating_sub(colonies)).unwrap_or(0);
        for ship_id in breakers.into_iter().take(excess) {
            let squadron = state.ships.get(ship_id).map(|s| s.squadron_id);
            state.destroy_ship(ship_id);
            if let Some(squadron) = squadron {
                sink.emit_public(EventKind::SquadronScrapped {
                    squadron,
                    owner: house_id,
                    salvage: 0,
                });
            }
            info!(%house_id, %ship_id, "planet breaker scrapped over capacity");
        }
    }
}

// -----------------------------------------------------------------------
// (f) Diplomacy, (g) victory
// -----------------------------------------------------------------------

fn apply_diplomacy(
    state: &mut GameState,
    staged: &BTreeMap<HouseId, CommandPacket>,
    sink: &mut EventSink,
) {
    for (house, packet) in staged {
        for command in &packet.diplomacy {
            match command {
                DiplomaticCommand::OfferDeescalation { to } => {
                    diplomacy::offer_deescalation(state, sink, *house, *to);
                }
                DiplomaticCommand::AcceptDeescalation { from } => {
                    diplomacy::accept_deescalation(state, sink, *house, *from);
                }
                DiplomaticCommand::RejectDeescalation { from } => {
                    diplomacy::reject_deescalation(state, *house, *from);
                }
            }
        }
    }
}

/// A blockade only holds while a hostile fleet sits over the colony.
fn refresh_blockades(state: &mut GameState) {
    let systems: Vec<SystemId> = state.colonies.keys().copied().collect();
    for system in systems {
        let Some(owner) = state.colonies.get(&system).map(|c| c.owner) else {
            continue;
        };
        let besieged = state.fleets_at(system).iter().any(|fleet_id| {
            state.fleets.get(*fleet_id).is_some_and(|fleet| {
                fleet.owner != owner
                    && state.stance(fleet.owner, owner) != DiplomaticState::Neutral
                    && fleet.posture != FleetPosture::Mothballed
            })
        });
        if !besieged
            && let Some(colony) = state.colonies.get_mut(&system)
        {
            colony.blockaded = false;
        }
    }
}

fn check_victory(state: &mut GameState, sink: &mut EventSink) {
    // Elimination: a house with no colonies and no fleets is out.
    for house_id in state.live_houses() {
        let has_colonies = !state.colonies_of(house_id).is_empty();
        let has_fleets = !state.fleets_of(house_id).is_empty();
        if !has_colonies && !has_fleets {
            if let Some(house) = state.houses.get_mut(&house_id) {
                house.eliminated = true;
            }
            info!(%house_id, "house eliminated");
            sink.emit_public(EventKind::HouseEliminated { house: house_id });
        }
    }

    let live = state.live_houses();
    if live.len() == 1 {
        let winner = live.first().copied();
        finish(state, sink, winner, "last house standing");
        return;
    }

    // Prestige victory.
    let target = state.victory_prestige_target;
    if let Some(target) = target {
        let leader = state
            .houses
            .values()
            .filter(|house| !house.eliminated)
            .max_by_key(|house| (house.prestige, core::cmp::Reverse(house.id)));
        if let Some(leader) = leader
            && leader.prestige >= target
        {
            let winner = Some(leader.id);
            finish(state, sink, winner, "prestige target reached");
            return;
        }
    }

    // Turn limit.
    if let Some(limit) = state.victory_turn_limit
        && state.turn >= limit
    {
        let winner = state
            .houses
            .values()
            .filter(|house| !house.eliminated)
            .max_by_key(|house| (house.prestige, core::cmp::Reverse(house.id)))
            .map(|house| house.id);
        finish(state, sink, winner, "turn limit reached");
    }
}

fn finish(state: &mut GameState, sink: &mut EventSink, winner: Option<HouseId>, reason: &str) {
    state.finished = true;
    state.winner = winner;
    info!(?winner, reason, "game ended");
    sink.emit_public(EventKind::GameEnded {
        winner,
        reason: reason.to_owned(),
    });
}

// -----------------------------------------------------------------------
// (h) Intelligence regeneration
// -----------------------------------------------------------------------

fn regenerate_intel(state: &mut GameState, snapshot: &RuleSnapshot, rng: &mut TurnRng) {
    intel::run_starbase_surveillance(state, snapshot);

    // Co-located foreign fleets sight each other at Adjacent quality.
    let sightings: Vec<(HouseId, FleetId)> = {
        let mut sightings = Vec::new();
        for fleet_set in state.indices.fleets_by_location.values() {
            let fleets: Vec<_> = fleet_set.iter().copied().collect();
            for observer_fleet in &fleets {
                let Some(observer) = state.fleets.get(*observer_fleet).map(|f| f.owner) else {
                    continue;
                };
                for sighted_fleet in &fleets {
                    let Some(sighted) = state.fleets.get(*sighted_fleet) else {
                        continue;
                    };
                    if sighted.owner != observer
                        && sighted.posture != FleetPosture::Mothballed
                    {
                        sightings.push((observer, *sighted_fleet));
                    }
                }
            }
        }
        sightings
    };
    for (observer, sighted) in sightings {
        // Hull classes are visible on approach, so even a plain sighting
        // carries composition.
        if let Some(report) = intel::observe_fleet(state, sighted) {
            intel::file_report(state, observer, report);
        }
    }

    // Houses adjacent to foreign colonies learn of their existence.
    let adjacencies: Vec<(HouseId, SystemId)> = {
        let mut seen = Vec::new();
        for (system, colony) in &state.colonies {
            let Some(record) = state.map.get(*system) else {
                continue;
            };
            for (neighbor, _) in &record.lanes {
                if let Some(foreign) = state.colonies.get(neighbor)
                    && foreign.owner != colony.owner
                {
                    seen.push((colony.owner, *neighbor));
                }
            }
        }
        seen
    };
    for (observer, system) in adjacencies {
        if let Some(report) = intel::observe_colony(state, system, IntelQuality::Adjacent) {
            intel::file_report(state, observer, report);
        }
    }

    intel::apply_disinformation(state, rng);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::GameSetup;
    use ec4x_types::fleet::MovementOrder;

    fn fixture() -> (GameState, RuleSnapshot) {
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        (state, snapshot)
    }

    fn run_phase(state: &mut GameState, snapshot: &RuleSnapshot) -> EventSink {
        let mut sink = EventSink::new(state.turn);
        let mut rng = TurnRng::for_turn(state.seed, state.turn);
        run(state, snapshot, &BTreeMap::new(), &mut rng, &mut sink);
        sink
    }

    #[test]
    fn movement_traverses_one_hex_per_turn() {
        let (mut state, snapshot) = fixture();
        let fleet = state.fleets_of(HouseId::new(0))[0];
        let home = state.fleets.get(fleet).unwrap().location;
        let hub = state.map.hub();
        let path = ec4x_world::find_path(&state.map, home, hub, false);
        let hops: Vec<SystemId> = path.path.clone().into_iter().skip(1).collect();
        assert!(hops.len() >= 2, "homeworld sits on the rim");
        state.fleets.get_mut(fleet).unwrap().movement = Some(MovementOrder {
            path: hops.clone(),
            destination: hub,
        });

        run_phase(&mut state, &snapshot);
        assert_eq!(state.fleets.get(fleet).unwrap().location, hops[0]);
        assert!(state.fleets.get(fleet).unwrap().movement.is_some());
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn maintenance_shortfall_damages_the_smallest_colony() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        state.houses.get_mut(&house).unwrap().treasury = 0;
        let colony = state.colonies_of(house)[0];

        let sink = run_phase(&mut state, &snapshot);
        let events = sink.into_events();
        assert!(events.iter().any(|e| matches!(
            e.kind,
            EventKind::MaintenanceShortfall { house: h, colony: c, .. }
                if h == house && c == colony
        )));
        assert!(state.colonies.get(&colony).unwrap().infrastructure_damage > 0);
        assert_eq!(state.houses.get(&house).unwrap().treasury, 0);
    }

    #[test]
    fn repeated_shortfall_escalates_damage() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let colony = state.colonies_of(house)[0];
        state.houses.get_mut(&house).unwrap().treasury = 0;
        run_phase(&mut state, &snapshot);
        let first = state.colonies.get(&colony).unwrap().infrastructure_damage;

        state.houses.get_mut(&house).unwrap().treasury = 0;
        state.turn += 1;
        run_phase(&mut state, &snapshot);
        let second = state.colonies.get(&colony).unwrap().infrastructure_damage;
        assert!(second.saturating_sub(first) > first, "damage must escalate");
    }

    #[test]
    fn excess_planet_breakers_scrap_immediately_oldest_first() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let home = state.colonies_of(house)[0];
        let fleet = state.fleets_of(house)[0];
        // One colony, two planet breakers: one over capacity.
        let first = state.create_squadron(house, ShipClass::PlanetBreaker, &snapshot, 0);
        let second = state.create_squadron(house, ShipClass::PlanetBreaker, &snapshot, 0);
        state.add_squadron_to_fleet(fleet, first);
        state.add_squadron_to_fleet(fleet, second);
        let _ = home;

        let sink = run_phase(&mut state, &snapshot);
        let events = sink.into_events();
        let scrapped: Vec<_> = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::SquadronScrapped { salvage: 0, .. }))
            .collect();
        assert_eq!(scrapped.len(), 1);
        // The older squadron (lower ship id) is the one scrapped.
        assert!(state.squadrons.get(first).is_none());
        assert!(state.squadrons.get(second).is_some());
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn timed_effects_expire() {
        let (mut state, snapshot) = fixture();
        state.effects.create(|id| ec4x_types::projects::OngoingEffect {
            id,
            kind: ec4x_types::enums::EffectKind::NcvReduction,
            target_house: HouseId::new(1),
            target_system: None,
            turns_remaining: 1,
            magnitude: 15,
        });
        run_phase(&mut state, &snapshot);
        assert!(state.effects.is_empty());
    }

    #[test]
    fn last_house_standing_wins() {
        let (mut state, snapshot) = fixture();
        // Eliminate everyone but house 0 by stripping assets.
        for raw in 1u32..4 {
            let house = HouseId::new(raw);
            for system in state.colonies_of(house) {
                state.remove_colony(system);
            }
            for fleet in state.fleets_of(house) {
                let squadrons = state.fleets.get(fleet).unwrap().squadrons.clone();
                for squadron in squadrons {
                    state.destroy_squadron(squadron);
                }
                state.delete_fleet(fleet);
            }
        }
        run_phase(&mut state, &snapshot);
        assert!(state.finished);
        assert_eq!(state.winner, Some(HouseId::new(0)));
    }
}
