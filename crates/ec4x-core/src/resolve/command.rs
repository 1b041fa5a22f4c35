//! Phase 3: Command.
//!
//! Administrative orders execute here, in the fixed sub-order of the
//! resolver: commission last turn's finished projects first (freeing their
//! docks), run colony automation, accept build orders into dock and colony
//! queues, apply colony directives, book population transfers, apply
//! diplomatic escalations earned by provocative orders, stage movement for
//! the Maintenance Phase, and settle fleet postures.

use std::collections::BTreeMap;

use tracing::{debug, info};

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::{
    FacilityKind, FleetPosture, PlanetClass, ShipClass, ShipState, StandingOrderKind, TechField,
};
use ec4x_types::events::EventKind;
use ec4x_types::fleet::{Cargo, Facility, GroundUnit, MovementOrder};
use ec4x_types::ids::{FacilityId, FleetId, HouseId, ProjectId, SystemId};
use ec4x_types::orders::{BuildItem, CommandPacket, FleetVerb, RepairOrder};
use ec4x_types::projects::{ConstructionProject, PopulationInTransit, ProjectKind};

use crate::diplomacy;
use crate::economy;
use crate::events::EventSink;
use crate::state::GameState;

/// Run the Command Phase.
pub fn run(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    sink: &mut EventSink,
) {
    commission_pending(state, snapshot, sink);
    run_colony_automation(state, snapshot);
    accept_build_orders(state, snapshot, staged);
    accept_repair_orders(state, snapshot, staged);
    apply_scrap_orders(state, snapshot, staged, sink);
    apply_colony_directives(state, staged);
    book_transfers(state, snapshot, staged);
    apply_provocations(state, staged, sink);
    stage_fleet_orders(state, staged);
    apply_standing_orders(state, staged);
}

// -----------------------------------------------------------------------
// (a) Commissioning
// -----------------------------------------------------------------------

/// Commission every project that finished last Maintenance. Runs first so
/// freed docks are available to this turn's build orders.
fn commission_pending(state: &mut GameState, snapshot: &RuleSnapshot, sink: &mut EventSink) {
    let pending = core::mem::take(&mut state.pending_commissions);
    for project_id in pending {
        let Some(project) = state.projects.delete(project_id) else {
            continue;
        };
        let system = project.colony;
        let Some(owner) = state.colonies.get(&system).map(|c| c.owner) else {
            continue;
        };
        let description = commission_one(state, snapshot, &project, system, owner);
        if let Some(item) = description {
            sink.emit(
                ec4x_types::events::Visibility::only(owner),
                EventKind::ProjectCommissioned {
                    colony: system,
                    owner,
                    item,
                },
            );
        }
    }
}

fn commission_one(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    project: &ConstructionProject,
    system: SystemId,
    owner: HouseId,
) -> Option<String> {
    match project.kind {
        ProjectKind::Ship(class) => {
            commission_ship(state, snapshot, system, owner, class);
            Some(format!("{class:?} commissioned"))
        }
        ProjectKind::Ground(kind) => {
            let unit = state.ground_units.create(|id| GroundUnit {
                id,
                owner,
                system_id: system,
                kind,
            });
            if let Some(colony) = state.colonies.get_mut(&system) {
                match kind {
                    ec4x_types::enums::GroundUnitKind::Army => colony.armies.push(unit),
                    ec4x_types::enums::GroundUnitKind::Marine => colony.marines.push(unit),
                    ec4x_types::enums::GroundUnitKind::GroundBattery => {
                        colony.batteries.push(unit);
                    }
                }
            }
            Some(format!("{kind:?} mustered"))
        }
        ProjectKind::Facility(kind) => {
            let spec = snapshot.facilities.spec(kind);
            let facility = state.facilities.create(|id| Facility {
                id,
                kind,
                colony: system,
                effective_docks: spec.docks,
                fixed_orbit: true,
                crippled: false,
            });
            state.attach_facility(system, kind, facility);
            Some(format!("{kind:?} completed"))
        }
        ProjectKind::IndustrialUnits(amount) => {
            if let Some(colony) = state.colonies.get_mut(&system) {
                colony.industrial_units = colony.industrial_units.saturating_add(amount);
            }
            Some(format!("{amount} IU brought online"))
        }
        ProjectKind::PlanetaryShield(level) => {
            if let Some(colony) = state.colonies.get_mut(&system) {
                colony.shield_level = colony.shield_level.max(level);
            }
            Some(format!("planetary shield level {level} raised"))
        }
        ProjectKind::RepairShip(ship) => {
            if let Some(record) = state.ships.get_mut(ship) {
                record.state = ShipState::Undamaged;
            }
            Some("ship repaired".to_owned())
        }
        ProjectKind::RepairStarbase(facility) => {
            if let Some(record) = state.facilities.get_mut(facility) {
                record.crippled = false;
            }
            Some("starbase repaired".to_owned())
        }
        ProjectKind::Terraform => {
            if let Some(colony) = state.colonies.get_mut(&system) {
                let idx = PlanetClass::ALL
                    .iter()
                    .position(|c| *c == colony.planet_class)
                    .unwrap_or(0);
                if let Some(next) = PlanetClass::ALL.get(idx.saturating_add(1)) {
                    colony.planet_class = *next;
                }
            }
            Some("terraforming complete".to_owned())
        }
    }
}

/// Put a newly built hull into service at its colony.
fn commission_ship(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    system: SystemId,
    owner: HouseId,
    class: ShipClass,
) {
    let wep = state
        .houses
        .get(&owner)
        .map_or(0, |h| h.tech.level(TechField::Wep));

    if class == ShipClass::Fighter {
        let squadron = state.create_squadron(owner, ShipClass::Fighter, snapshot, wep);
        if let Some(colony) = state.colonies.get_mut(&system) {
            colony.fighter_squadron_ids.push(squadron);
        }
        return;
    }

    let spec = snapshot.ships.spec(class);
    let home_fleet = home_fleet_at(state, owner, system);

    if spec.command_rating > 0 {
        let squadron = state.create_squadron(owner, class, snapshot, wep);
        state.add_squadron_to_fleet(home_fleet, squadron);
        return;
    }

    // An escort joins the first squadron in the home fleet with command
    // room, or forms a lone squadron if none has space.
    let candidate = state
        .fleets
        .get(home_fleet)
        .map(|f| f.squadrons.clone())
        .unwrap_or_default()
        .into_iter()
        .find(|squadron_id| {
            let (cost, rating) = state.squadron_command_usage(*squadron_id);
            cost.saturating_add(spec.command_cost) <= rating
        });
    match candidate {
        Some(squadron_id) => {
            let _ = state.create_ship(owner, squadron_id, class, snapshot, wep);
        }
        None => {
            let squadron = state.create_squadron(owner, class, snapshot, wep);
            state.add_squadron_to_fleet(home_fleet, squadron);
        }
    }
}

/// An active fleet of `owner` at `system`, creating one if none exists.
fn home_fleet_at(state: &mut GameState, owner: HouseId, system: SystemId) -> FleetId {
    let existing = state
        .house_fleets_at(owner, system)
        .into_iter()
        .find(|id| {
            state
                .fleets
                .get(*id)
                .is_some_and(|f| f.posture == FleetPosture::Active)
        });
    existing.unwrap_or_else(|| state.create_fleet(owner, system))
}

// -----------------------------------------------------------------------
// (b) Colony automation
// -----------------------------------------------------------------------

fn run_colony_automation(state: &mut GameState, snapshot: &RuleSnapshot) {
    let systems: Vec<SystemId> = state.colonies.keys().copied().collect();
    for system in systems {
        let Some(colony) = state.colonies.get(&system) else {
            continue;
        };
        let automation = colony.automation;
        let owner = colony.owner;
        if automation.auto_repair && !colony.drydocks.is_empty() {
            auto_repair_at(state, snapshot, system, owner);
        }
        if automation.auto_load {
            auto_load_marines(state, snapshot, system, owner);
        }
        balance_squadrons(state, system, owner);
    }
}

/// Fold lone leaderless squadrons into squadrons with command room.
///
/// Commissioning can leave an escort in a squadron of one when no
/// flagship had capacity at the time; once room opens up, the stragglers
/// rejoin the line.
fn balance_squadrons(state: &mut GameState, system: SystemId, owner: HouseId) {
    let fleet_ids = state.house_fleets_at(owner, system);
    for fleet_id in fleet_ids {
        let squadrons = state
            .fleets
            .get(fleet_id)
            .map(|f| f.squadrons.clone())
            .unwrap_or_default();

        let lone: Vec<_> = squadrons
            .iter()
            .filter(|squadron_id| {
                let (_, rating) = state.squadron_command_usage(**squadron_id);
                rating == 0
                    && state
                        .squadrons
                        .get(**squadron_id)
                        .is_some_and(|s| s.ships.len() == 1)
            })
            .copied()
            .collect();

        for lone_id in lone {
            let Some(ship_id) = state
                .squadrons
                .get(lone_id)
                .and_then(|s| s.ships.first().copied())
            else {
                continue;
            };
            let ship_cost = state
                .ships
                .get(ship_id)
                .map_or(0, |ship| ship.stats.command_cost);
            let target = squadrons.iter().find(|candidate| {
                **candidate != lone_id && {
                    let (cost, rating) = state.squadron_command_usage(**candidate);
                    rating > 0 && cost.saturating_add(ship_cost) <= rating
                }
            });
            if let Some(target) = target.copied() {
                state.transfer_ship(ship_id, target);
                state.destroy_squadron(lone_id);
            }
        }
    }
}

/// Queue repairs for crippled hulls sitting at a colony with a drydock.
fn auto_repair_at(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    system: SystemId,
    owner: HouseId,
) {
    let crippled: Vec<ec4x_types::ids::ShipId> = state
        .house_fleets_at(owner, system)
        .into_iter()
        .filter_map(|f| state.fleets.get(f))
        .flat_map(|f| f.squadrons.iter())
        .filter_map(|s| state.squadrons.get(*s))
        .flat_map(|s| s.ships.iter())
        .filter_map(|s| state.ships.get(*s))
        .filter(|ship| ship.state == ShipState::Crippled)
        .map(|ship| ship.id)
        .collect();

    for ship_id in crippled {
        let already_queued = state
            .projects
            .iter()
            .any(|(_, p)| matches!(p.kind, ProjectKind::RepairShip(s) if s == ship_id));
        if already_queued {
            continue;
        }
        let cost = state.ships.get(ship_id).map_or(0, |ship| {
            ship.stats
                .build_cost
                .saturating_mul(i64::from(snapshot.economy.repair_cost_pct))
                / 100
        });
        let affordable = state
            .houses
            .get(&owner)
            .is_some_and(|house| house.treasury >= cost);
        if !affordable {
            continue;
        }
        if let Some(house) = state.houses.get_mut(&owner) {
            house.treasury = house.treasury.saturating_sub(cost);
        }
        enqueue_repair(state, snapshot, system, ProjectKind::RepairShip(ship_id), cost);
        debug!(%system, %ship_id, cost, "auto-repair queued");
    }
}

/// Load garrison marines onto hulls with cargo room.
fn auto_load_marines(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    system: SystemId,
    owner: HouseId,
) {
    let mut waiting = state
        .colonies
        .get(&system)
        .map(|c| c.marines.clone())
        .unwrap_or_default();
    if waiting.is_empty() {
        return;
    }
    let carriers: Vec<ec4x_types::ids::ShipId> = state
        .house_fleets_at(owner, system)
        .into_iter()
        .filter_map(|f| state.fleets.get(f))
        .flat_map(|f| f.squadrons.iter())
        .filter_map(|s| state.squadrons.get(*s))
        .flat_map(|s| s.ships.iter())
        .filter_map(|s| state.ships.get(*s))
        .filter(|ship| snapshot.ships.spec(ship.class).cargo_capacity > 0)
        .map(|ship| ship.id)
        .collect();

    for ship_id in carriers {
        if waiting.is_empty() {
            break;
        }
        let Some(ship) = state.ships.get_mut(ship_id) else {
            continue;
        };
        let capacity =
            usize::try_from(snapshot.ships.spec(ship.class).cargo_capacity).unwrap_or(0);
        let mut aboard = match &ship.cargo {
            Cargo::Marines(units) => units.clone(),
            Cargo::Empty => Vec::new(),
            Cargo::Population(_) | Cargo::ColonyKit => continue,
        };
        while aboard.len() < capacity {
            let Some(unit) = waiting.first().copied() else {
                break;
            };
            waiting.remove(0);
            aboard.push(unit);
        }
        ship.cargo = Cargo::Marines(aboard);
    }

    if let Some(colony) = state.colonies.get_mut(&system) {
        colony.marines = waiting;
    }
}

// -----------------------------------------------------------------------
// (c) Build and repair intake
// -----------------------------------------------------------------------

fn accept_build_orders(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
) {
    for (house, packet) in staged {
        for order in &packet.build_orders {
            let system = order.colony;
            let (kind, cost, turns) = match order.item {
                BuildItem::Ship(class) => {
                    let spec = snapshot.ships.spec(class);
                    let cst = state
                        .houses
                        .get(house)
                        .map_or(0, |h| u32::from(h.tech.level(TechField::Cst)));
                    let turns = spec.build_turns.saturating_sub(cst / 2).max(1);
                    (ProjectKind::Ship(class), spec.build_cost, turns)
                }
                BuildItem::Ground(kind) => {
                    let spec = snapshot.ground_units.spec(kind);
                    (ProjectKind::Ground(kind), spec.build_cost, spec.build_turns)
                }
                BuildItem::Facility(kind) => {
                    let spec = snapshot.facilities.spec(kind);
                    (ProjectKind::Facility(kind), spec.build_cost, spec.build_turns)
                }
                BuildItem::IndustrialUnits(amount) => {
                    let cost = state
                        .colonies
                        .get(&system)
                        .map_or(0, |c| economy::iu_invest_cost(c, amount, snapshot));
                    (ProjectKind::IndustrialUnits(amount), cost, 1)
                }
                BuildItem::PlanetaryShield => {
                    let level = state
                        .colonies
                        .get(&system)
                        .map_or(0, |c| c.shield_level)
                        .saturating_add(1);
                    let spec = snapshot
                        .combat
                        .planetary_shields
                        .get(usize::from(level.saturating_sub(1)));
                    let Some(spec) = spec else { continue };
                    (ProjectKind::PlanetaryShield(level), spec.build_cost, spec.build_turns)
                }
            };

            if !charge(state, *house, cost) {
                continue;
            }
            let needs_dock = matches!(kind, ProjectKind::Ship(class) if class.needs_dock());
            let dock = if needs_dock {
                free_dock(state, system, &[FacilityKind::Spaceport, FacilityKind::Shipyard, FacilityKind::Drydock])
            } else {
                None
            };
            let project = state.projects.create(|id| ConstructionProject {
                id,
                kind,
                cost_total: cost,
                turns_remaining: turns,
                colony: system,
                dock,
            });
            if dock.is_none() {
                queue_at_colony(state, system, project);
            }
            debug!(%house, %system, ?kind, dock = ?dock, "build accepted");
        }

        // Terraforming arrives as a fleet order but is a colony project.
        for order in &packet.fleet_orders {
            if !matches!(order.verb, FleetVerb::Terraform) {
                continue;
            }
            let Some(system) = state.fleets.get(order.fleet).map(|f| f.location) else {
                continue;
            };
            let cost = snapshot.economy.terraform_cost_pp;
            if !charge(state, *house, cost) {
                continue;
            }
            let project = state.projects.create(|id| ConstructionProject {
                id,
                kind: ProjectKind::Terraform,
                cost_total: cost,
                turns_remaining: snapshot.economy.terraform_turns,
                colony: system,
                dock: None,
            });
            queue_at_colony(state, system, project);
        }
    }
}

fn accept_repair_orders(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
) {
    for (house, packet) in staged {
        for order in &packet.repair_orders {
            let (system, kind, cost) = match order {
                RepairOrder::Ship { colony, ship } => {
                    let cost = state.ships.get(*ship).map_or(0, |s| {
                        s.stats
                            .build_cost
                            .saturating_mul(i64::from(snapshot.economy.repair_cost_pct))
                            / 100
                    });
                    (*colony, ProjectKind::RepairShip(*ship), cost)
                }
                RepairOrder::Starbase { colony, facility } => {
                    let build = state
                        .facilities
                        .get(*facility)
                        .map_or(0, |f| snapshot.facilities.spec(f.kind).build_cost);
                    let cost =
                        build.saturating_mul(i64::from(snapshot.economy.repair_cost_pct)) / 100;
                    (*colony, ProjectKind::RepairStarbase(*facility), cost)
                }
            };
            if !charge(state, *house, cost) {
                continue;
            }
            enqueue_repair(state, snapshot, system, kind, cost);
        }
    }
}

/// Repairs occupy drydock capacity only.
fn enqueue_repair(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    system: SystemId,
    kind: ProjectKind,
    cost: i64,
) {
    let dock = free_dock(state, system, &[FacilityKind::Drydock]);
    let project = state.projects.create(|id| ConstructionProject {
        id,
        kind,
        cost_total: cost,
        turns_remaining: snapshot.economy.ship_repair_turns,
        colony: system,
        dock,
    });
    if dock.is_none()
        && let Some(colony) = state.colonies.get_mut(&system)
    {
        colony.repair_queue.push(project);
    }
}

/// The first facility of the given kinds with a free dock slot, scanning
/// kinds in the order given.
fn free_dock(
    state: &GameState,
    system: SystemId,
    kinds: &[FacilityKind],
) -> Option<FacilityId> {
    let colony = state.colonies.get(&system)?;
    for kind in kinds {
        let list = match kind {
            FacilityKind::Spaceport => &colony.spaceports,
            FacilityKind::Shipyard => &colony.shipyards,
            FacilityKind::Drydock => &colony.drydocks,
            FacilityKind::Starbase => continue,
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

fn queue_at_colony(state: &mut GameState, system: SystemId, project: ProjectId) {
    if let Some(colony) = state.colonies.get_mut(&system) {
        if colony.under_construction.is_none() {
            colony.under_construction = Some(project);
        } else {
            colony.construction_queue.push(project);
        }
    }
}

/// Deduct `cost` from a treasury if it is covered.
fn charge(state: &mut GameState, house: HouseId, cost: i64) -> bool {
    let Some(record) = state.houses.get_mut(&house) else {
        return false;
    };
    if record.treasury < cost {
        return false;
    }
    record.treasury = record.treasury.saturating_sub(cost);
    true
}

// -----------------------------------------------------------------------
// Scrap, directives, transfers
// -----------------------------------------------------------------------

fn apply_scrap_orders(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    sink: &mut EventSink,
) {
    use ec4x_types::orders::ScrapOrder;
    for (house, packet) in staged {
        for order in &packet.scrap_orders {
            let salvage = match order {
                ScrapOrder::Ship(id) => {
                    let value = state.ships.get(*id).map_or(0, |s| s.stats.build_cost);
                    state.destroy_ship(*id);
                    value.saturating_mul(i64::from(snapshot.economy.salvage_pct)) / 100
                }
                ScrapOrder::Squadron(id) => {
                    let value: i64 = state
                        .squadrons
                        .get(*id)
                        .map(|s| s.ships.clone())
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|ship| state.ships.get(*ship))
                        .map(|ship| ship.stats.build_cost)
                        .sum();
                    state.destroy_squadron(*id);
                    sink.emit_public(EventKind::SquadronScrapped {
                        squadron: *id,
                        owner: *house,
                        salvage: value
                            .saturating_mul(i64::from(snapshot.economy.salvage_pct))
                            / 100,
                    });
                    value.saturating_mul(i64::from(snapshot.economy.salvage_pct)) / 100
                }
                ScrapOrder::Facility(id) => {
                    let value = state
                        .facilities
                        .get(*id)
                        .map_or(0, |f| snapshot.facilities.spec(f.kind).build_cost);
                    if let Some(facility) = state.facilities.delete(*id) {
                        if let Some(colony) = state.colonies.get_mut(&facility.colony) {
                            colony.spaceports.retain(|f| f != id);
                            colony.shipyards.retain(|f| f != id);
                            colony.drydocks.retain(|f| f != id);
                            colony.starbases.retain(|f| f != id);
                        }
                    }
                    value.saturating_mul(i64::from(snapshot.economy.salvage_pct)) / 100
                }
                ScrapOrder::Ground(id) => {
                    if let Some(unit) = state.ground_units.delete(*id) {
                        if let Some(colony) = state.colonies.get_mut(&unit.system_id) {
                            colony.armies.retain(|g| g != id);
                            colony.marines.retain(|g| g != id);
                            colony.batteries.retain(|g| g != id);
                        }
                    }
                    0
                }
            };
            if salvage > 0
                && let Some(record) = state.houses.get_mut(house)
            {
                record.treasury = record.treasury.saturating_add(salvage);
            }
        }
    }
}

fn apply_colony_directives(state: &mut GameState, staged: &BTreeMap<HouseId, CommandPacket>) {
    for packet in staged.values() {
        for directive in &packet.colony_directives {
            let Some(colony) = state.colonies.get_mut(&directive.colony) else {
                continue;
            };
            if let Some(rate) = directive.tax_rate {
                colony.tax_rate = rate.min(100);
            }
            if let Some(flag) = directive.auto_repair {
                colony.automation.auto_repair = flag;
            }
            if let Some(flag) = directive.auto_load {
                colony.automation.auto_load = flag;
            }
        }
    }
}

fn book_transfers(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
) {
    for (house, packet) in staged {
        for order in &packet.transfers {
            let distance = state.map.hex_distance(order.source, order.destination);
            let Some(destination_class) = state
                .colonies
                .get(&order.destination)
                .map(|c| c.planet_class)
            else {
                continue;
            };
            let cost = economy::transfer_cost(destination_class, distance, order.ptu, snapshot);
            if !charge(state, *house, cost) {
                continue;
            }
            let Some(source) = state.colonies.get_mut(&order.source) else {
                continue;
            };
            source.population_units = source.population_units.saturating_sub(order.ptu);
            let travel_turns = distance
                .div_ceil(snapshot.guild.transfer_speed_hexes_per_turn.max(1))
                .max(1);
            let arrival_turn = state.turn.saturating_add(travel_turns);
            state.transfers.create(|id| PopulationInTransit {
                id,
                house_id: *house,
                source: order.source,
                destination: order.destination,
                ptu_amount: order.ptu,
                cost_paid: cost,
                arrival_turn,
            });
            info!(%house, source = %order.source, destination = %order.destination,
                ptu = order.ptu, cost, arrival_turn, "population transfer booked");
        }
    }
}

// -----------------------------------------------------------------------
// (f) Provocations, (g) movement staging, postures
// -----------------------------------------------------------------------

/// Provocative orders in a foreign house's system sour relations.
fn apply_provocations(
    state: &mut GameState,
    staged: &BTreeMap<HouseId, CommandPacket>,
    sink: &mut EventSink,
) {
    for (house, packet) in staged {
        for order in &packet.fleet_orders {
            if !order.verb.is_provocative() && !matches!(order.verb, FleetVerb::Blockade) {
                continue;
            }
            let Some(location) = state.fleets.get(order.fleet).map(|f| f.location) else {
                continue;
            };
            let Some(owner) = state.colonies.get(&location).map(|c| c.owner) else {
                continue;
            };
            if owner != *house {
                diplomacy::escalate_for_order(state, sink, *house, owner, &order.verb);
            }
        }
    }
}

fn stage_fleet_orders(state: &mut GameState, staged: &BTreeMap<HouseId, CommandPacket>) {
    for (house, packet) in staged {
        for order in &packet.fleet_orders {
            let fleet_id = order.fleet;
            if state.fleets.get(fleet_id).is_none() {
                continue;
            }
            match &order.verb {
                FleetVerb::Move { destination } => {
                    stage_movement(state, fleet_id, *destination);
                }
                FleetVerb::SeekHome => {
                    if let Some(home) = nearest_home(state, *house, fleet_id) {
                        stage_movement(state, fleet_id, home);
                    }
                }
                FleetVerb::Rendezvous { with } => {
                    if let Some(target) = state.fleets.get(*with).map(|f| f.location) {
                        stage_movement(state, fleet_id, target);
                    }
                }
                FleetVerb::Join { into } => {
                    join_fleets(state, fleet_id, *into);
                }
                FleetVerb::Guard => set_posture(state, fleet_id, FleetPosture::Guard),
                FleetVerb::Reserve => set_posture(state, fleet_id, FleetPosture::Reserve),
                FleetVerb::Mothball => set_posture(state, fleet_id, FleetPosture::Mothballed),
                FleetVerb::Reactivate => set_posture(state, fleet_id, FleetPosture::Active),
                FleetVerb::Hold | FleetVerb::Patrol => {
                    if let Some(fleet) = state.fleets.get_mut(fleet_id) {
                        fleet.movement = None;
                    }
                }
                FleetVerb::Blockade => {
                    let location = state.fleets.get(fleet_id).map(|f| f.location);
                    if let Some(location) = location
                        && let Some(colony) = state.colonies.get_mut(&location)
                        && colony.owner != *house
                    {
                        colony.blockaded = true;
                    }
                }
                FleetVerb::Salvage => {
                    let location = state.fleets.get(fleet_id).map(|f| f.location);
                    if let Some(location) = location {
                        let recovered = state.wreckage.remove(&location).unwrap_or(0);
                        if recovered > 0
                            && let Some(record) = state.houses.get_mut(house)
                        {
                            record.treasury = record.treasury.saturating_add(recovered);
                            debug!(%house, %location, recovered, "wreckage salvaged");
                        }
                    }
                }
                // Resolved in the Conflict Phase or as colony projects.
                FleetVerb::Bombard
                | FleetVerb::Invade
                | FleetVerb::Blitz
                | FleetVerb::SpyPlanet
                | FleetVerb::SpySystem
                | FleetVerb::HackStarbase
                | FleetVerb::Colonize
                | FleetVerb::ViewWorld
                | FleetVerb::Terraform => {}
            }
        }
    }
}

/// Compute and persist a movement order for the Maintenance Phase.
fn stage_movement(state: &mut GameState, fleet_id: FleetId, destination: SystemId) {
    let Some(from) = state.fleets.get(fleet_id).map(|f| f.location) else {
        return;
    };
    if from == destination {
        if let Some(fleet) = state.fleets.get_mut(fleet_id) {
            fleet.movement = None;
        }
        return;
    }
    let crippled = state.fleet_has_crippled(fleet_id);
    let result = ec4x_world::find_path(&state.map, from, destination, crippled);
    if !result.found {
        return;
    }
    let path: Vec<SystemId> = result.path.into_iter().skip(1).collect();
    if let Some(fleet) = state.fleets.get_mut(fleet_id) {
        fleet.movement = Some(MovementOrder { path, destination });
        fleet.posture = FleetPosture::Active;
    }
}

/// The nearest own colony by path cost, ties to lowest system id.
fn nearest_home(state: &GameState, house: HouseId, fleet_id: FleetId) -> Option<SystemId> {
    let from = state.fleets.get(fleet_id).map(|f| f.location)?;
    let crippled = state.fleet_has_crippled(fleet_id);
    state
        .colonies_of(house)
        .into_iter()
        .filter_map(|system| {
            ec4x_world::calculate_eta(&state.map, from, system, crippled)
                .map(|eta| (eta, system))
        })
        .min()
        .map(|(_, system)| system)
}

/// Merge one fleet into another co-located friendly fleet.
fn join_fleets(state: &mut GameState, source: FleetId, target: FleetId) {
    let Some(source_fleet) = state.fleets.get(source) else {
        return;
    };
    let Some(target_fleet) = state.fleets.get(target) else {
        return;
    };
    if source_fleet.owner != target_fleet.owner
        || source_fleet.location != target_fleet.location
    {
        return;
    }
    let squadrons = source_fleet.squadrons.clone();
    for squadron in squadrons {
        state.add_squadron_to_fleet(target, squadron);
    }
    if let Some(fleet) = state.fleets.get_mut(source) {
        fleet.squadrons.clear();
    }
    state.delete_fleet(source);
}

fn set_posture(state: &mut GameState, fleet_id: FleetId, posture: FleetPosture) {
    if let Some(fleet) = state.fleets.get_mut(fleet_id) {
        fleet.posture = posture;
        if posture != FleetPosture::Active {
            fleet.movement = None;
        }
    }
}

/// Standing orders take over fleets that received no explicit order.
fn apply_standing_orders(state: &mut GameState, staged: &BTreeMap<HouseId, CommandPacket>) {
    // First record this turn's assignments.
    for packet in staged.values() {
        for assignment in &packet.standing_orders {
            if let Some(fleet) = state.fleets.get_mut(assignment.fleet) {
                fleet.standing_order = assignment.order;
            }
        }
    }

    let explicitly_ordered: Vec<FleetId> = staged
        .values()
        .flat_map(|packet| packet.fleet_orders.iter())
        .map(|order| order.fleet)
        .collect();

    let idle_with_standing: Vec<(FleetId, StandingOrderKind, HouseId)> = state
        .fleets
        .iter()
        .filter(|(id, _)| !explicitly_ordered.contains(id))
        .filter_map(|(id, fleet)| fleet.standing_order.map(|o| (id, o, fleet.owner)))
        .collect();

    for (fleet_id, standing, owner) in idle_with_standing {
        match standing {
            StandingOrderKind::Guard => set_posture(state, fleet_id, FleetPosture::Guard),
            StandingOrderKind::SeekHome => {
                let already_moving = state
                    .fleets
                    .get(fleet_id)
                    .is_some_and(|f| f.movement.is_some());
                if !already_moving
                    && let Some(home) = nearest_home(state, owner, fleet_id)
                {
                    stage_movement(state, fleet_id, home);
                }
            }
            StandingOrderKind::Patrol | StandingOrderKind::Hold => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::GameSetup;
    use ec4x_types::orders::{BuildOrder, FleetOrder, TransferOrder};

    fn fixture() -> (GameState, RuleSnapshot) {
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        (state, snapshot)
    }

    fn staged_one(packet: CommandPacket) -> BTreeMap<HouseId, CommandPacket> {
        let mut staged = BTreeMap::new();
        staged.insert(packet.house, packet);
        staged
    }

    #[test]
    fn capital_build_takes_a_dock_slot() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let colony = state.colonies_of(house)[0];
        let packet = CommandPacket {
            house,
            turn: 1,
            build_orders: vec![BuildOrder {
                colony,
                item: BuildItem::Ship(ShipClass::Cruiser),
            }],
            ..CommandPacket::default()
        };
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &staged_one(packet), &mut sink);

        let project = state.projects.iter().next().unwrap().1;
        assert!(project.dock.is_some(), "capital hulls occupy a dock");
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn dock_overflow_queues_at_the_colony() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let colony = state.colonies_of(house)[0];
        state.houses.get_mut(&house).unwrap().treasury = 100_000;
        // Default homeworld: spaceport (2 docks) + shipyard (3 docks).
        let orders: Vec<BuildOrder> = (0..7)
            .map(|_| BuildOrder {
                colony,
                item: BuildItem::Ship(ShipClass::Corvette),
            })
            .collect();
        let packet = CommandPacket {
            house,
            turn: 1,
            build_orders: orders,
            ..CommandPacket::default()
        };
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &staged_one(packet), &mut sink);

        let docked = state.projects.iter().filter(|(_, p)| p.dock.is_some()).count();
        assert_eq!(docked, 5);
        let queued = state.colonies.get(&colony).unwrap();
        assert!(queued.under_construction.is_some());
        assert_eq!(queued.construction_queue.len(), 1);
    }

    #[test]
    fn transfer_moves_population_out_immediately() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let source = state.colonies_of(house)[0];
        // Give the house a second colony to receive the settlers.
        let hub = state.map.hub();
        state.insert_colony(ec4x_types::colony::Colony::found(
            hub,
            house,
            PlanetClass::Benign,
            5,
            50,
        ));
        let before = state.colonies.get(&source).unwrap().population_units;
        let packet = CommandPacket {
            house,
            turn: 1,
            transfers: vec![TransferOrder {
                source,
                destination: hub,
                ptu: 30,
            }],
            ..CommandPacket::default()
        };
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &staged_one(packet), &mut sink);

        assert_eq!(
            state.colonies.get(&source).unwrap().population_units,
            before - 30
        );
        assert_eq!(state.transfers.len(), 1);
        let transfer = state.transfers.iter().next().unwrap().1;
        assert!(transfer.arrival_turn > state.turn);
    }

    #[test]
    fn join_merges_and_dissolves_the_source_fleet() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let original = state.fleets_of(house)[0];
        let location = state.fleets.get(original).unwrap().location;
        let second = state.create_fleet(house, location);
        // Move one squadron over to the new fleet so both are non-empty.
        let squadron = state.fleets.get(original).unwrap().squadrons[0];
        state.fleets.get_mut(original).unwrap().squadrons.retain(|s| *s != squadron);
        state.add_squadron_to_fleet(second, squadron);

        let packet = CommandPacket {
            house,
            turn: 1,
            fleet_orders: vec![FleetOrder {
                fleet: second,
                verb: FleetVerb::Join { into: original },
            }],
            ..CommandPacket::default()
        };
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &staged_one(packet), &mut sink);

        assert!(state.fleets.get(second).is_none());
        assert_eq!(state.fleets.get(original).unwrap().squadrons.len(), 2);
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn move_order_stages_a_path_for_maintenance() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let fleet = state.fleets_of(house)[0];
        let destination = state.map.hub();
        let packet = CommandPacket {
            house,
            turn: 1,
            fleet_orders: vec![FleetOrder {
                fleet,
                verb: FleetVerb::Move { destination },
            }],
            ..CommandPacket::default()
        };
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &staged_one(packet), &mut sink);

        let movement = state.fleets.get(fleet).unwrap().movement.clone().unwrap();
        assert_eq!(movement.destination, destination);
        assert_eq!(*movement.path.last().unwrap(), destination);
    }
}
