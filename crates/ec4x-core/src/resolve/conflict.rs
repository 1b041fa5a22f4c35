//! Phase 1: Conflict.
//!
//! Order of business, all traversals ascending for determinism:
//!
//! 1. Stage planetary assaults from the turn's packets, applying the
//!    diplomatic escalation (and the aggression penalty for assaulting a
//!    Neutral house) the moment the order is given.
//! 2. Resolve simultaneous colonization attempts by tie-break.
//! 3. Resolve scout espionage, then EBP-funded covert actions.
//! 4. Fight space combat for every eligible pair, then the orbital and
//!    planetary theaters for surviving assaults.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use ec4x_rules::RuleSnapshot;
use ec4x_types::colony::Colony;
use ec4x_types::enums::{
    DiplomaticState, FleetPosture, GroundUnitKind, IntelQuality, PrestigeSource, RejectReason,
    ShipClass, ShipState, TechField,
};
use ec4x_types::events::{EventKind, Visibility};
use ec4x_types::fleet::Cargo;
use ec4x_types::ids::{FleetId, HouseId, ShipId, SystemId};
use ec4x_types::intel::{CombatEncounterReport, IntelReport};
use ec4x_types::orders::{CommandPacket, FleetVerb};

use crate::combat::{self, EngagementResult, SideOutcome, SideSpec};
use crate::diplomacy;
use crate::espionage;
use crate::events::EventSink;
use crate::intel;
use crate::prestige;
use crate::rng::TurnRng;
use crate::state::{AssaultKind, GameState, QueuedAssault};

/// Run the Conflict Phase.
pub fn run(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    rng: &mut TurnRng,
    sink: &mut EventSink,
) {
    stage_assaults(state, snapshot, staged, sink);
    resolve_colonization(state, snapshot, staged, rng, sink);
    resolve_scout_espionage(state, snapshot, staged, rng, sink);
    resolve_covert_actions(state, snapshot, staged, rng, sink);
    resolve_combat(state, snapshot, rng, sink);
}

/// Step 1: stage assault orders and apply their escalations.
fn stage_assaults(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    sink: &mut EventSink,
) {
    for (house, packet) in staged {
        for order in &packet.fleet_orders {
            let kind = match order.verb {
                FleetVerb::Bombard => AssaultKind::Bombard,
                FleetVerb::Invade => AssaultKind::Invade,
                FleetVerb::Blitz => AssaultKind::Blitz,
                _ => continue,
            };
            let Some(fleet) = state.fleets.get(order.fleet) else {
                continue;
            };
            let system = fleet.location;
            let Some(colony) = state.colonies.get(&system) else {
                continue;
            };
            let defender = colony.owner;
            let was_neutral = state.stance(*house, defender) == DiplomaticState::Neutral;
            diplomacy::escalate_for_order(state, sink, *house, defender, &order.verb);
            if was_neutral {
                prestige::award(
                    state,
                    sink,
                    snapshot,
                    *house,
                    None,
                    PrestigeSource::UnprovokedAssault,
                    "assault on a neutral house",
                );
            }
            if state
                .houses
                .get(&defender)
                .is_some_and(|h| h.dishonored_turns > 0)
            {
                prestige::award(
                    state,
                    sink,
                    snapshot,
                    *house,
                    None,
                    PrestigeSource::AttackedDishonored,
                    "attacked a dishonored house",
                );
            }
            state.queued_assaults.push(QueuedAssault {
                attacker: *house,
                fleet: order.fleet,
                system,
                kind,
            });
        }
    }
}

/// Step 2: colonization tie-breaks, then execution for the winners.
///
/// Tie-break: highest prestige, then highest treasury, then lowest house.
fn resolve_colonization(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    rng: &mut TurnRng,
    sink: &mut EventSink,
) {
    let mut attempts: BTreeMap<SystemId, Vec<(HouseId, FleetId)>> = BTreeMap::new();
    for (house, packet) in staged {
        for order in &packet.fleet_orders {
            if !matches!(order.verb, FleetVerb::Colonize) {
                continue;
            }
            if let Some(fleet) = state.fleets.get(order.fleet) {
                attempts
                    .entry(fleet.location)
                    .or_default()
                    .push((*house, order.fleet));
            }
        }
    }

    for (system, mut contenders) in attempts {
        if state.colonies.contains_key(&system) {
            continue;
        }
        contenders.sort_by_key(|(house, _)| {
            let record = state.houses.get(house);
            (
                core::cmp::Reverse(record.map_or(0, |h| h.prestige)),
                core::cmp::Reverse(record.map_or(0, |h| h.treasury)),
                *house,
            )
        });
        let Some((winner, winning_fleet)) = contenders.first().copied() else {
            continue;
        };
        for (loser, _) in contenders.iter().skip(1) {
            sink.emit(
                Visibility::only(*loser),
                EventKind::OrderRejected {
                    house: *loser,
                    reason: RejectReason::AlreadyColonized,
                    order: format!("colonize {system}"),
                },
            );
        }
        found_colony(state, snapshot, rng, sink, winner, winning_fleet, system);
    }
}

/// Consume the winner's transport and found the colony.
fn found_colony(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    sink: &mut EventSink,
    house: HouseId,
    fleet: FleetId,
    system: SystemId,
) {
    let transport = fleet_ship_of_class(state, fleet, ShipClass::Transport);
    let Some(transport) = transport else {
        return;
    };
    // The planet's nature is discovered on the ground.
    let class_roll = usize::try_from(rng.below(7)).unwrap_or(0);
    let planet_class = ec4x_types::enums::PlanetClass::ALL
        .get(class_roll)
        .copied()
        .unwrap_or(ec4x_types::enums::PlanetClass::Benign);
    let raw_quality = u8::try_from(rng.die(10)).unwrap_or(5);
    let settlers = 20u32;

    state.destroy_ship(transport);
    state.insert_colony(Colony::found(system, house, planet_class, raw_quality, settlers));
    info!(%house, %system, ?planet_class, "colony established");
    prestige::award(
        state,
        sink,
        snapshot,
        house,
        None,
        PrestigeSource::ColonyEstablished,
        "colony established",
    );
    sink.emit_public(EventKind::ColonyEstablished { system, owner: house });
}

/// Step 3: scout-based espionage.
///
/// Detection is a flat percentage independent of the EBP/CIP economy; a
/// detected scout is lost with its fleet none the wiser about the target.
fn resolve_scout_espionage(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    rng: &mut TurnRng,
    sink: &mut EventSink,
) {
    for (house, packet) in staged {
        for order in &packet.fleet_orders {
            let quality = IntelQuality::Spy;
            let Some(fleet) = state.fleets.get(order.fleet) else {
                continue;
            };
            let system = fleet.location;
            let report = match order.verb {
                FleetVerb::SpyPlanet => intel::observe_colony(state, system, quality),
                FleetVerb::SpySystem => Some(intel::observe_system(state, system, quality)),
                FleetVerb::HackStarbase => intel::observe_starbase(state, system, quality),
                FleetVerb::ViewWorld => {
                    intel::observe_colony(state, system, IntelQuality::Scouted)
                }
                _ => continue,
            };
            let is_view = matches!(order.verb, FleetVerb::ViewWorld);
            let defender = state.colonies.get(&system).map(|c| c.owner);

            if !is_view && rng.pct(snapshot.espionage.scout_detection_pct) {
                // Caught: the scout is lost, the report never made.
                if let Some(scout) = fleet_ship_of_class(state, order.fleet, ShipClass::Scout) {
                    state.destroy_ship(scout);
                    sink.emit(
                        Visibility::only(*house),
                        EventKind::ShipDestroyed {
                            ship: scout,
                            class: ShipClass::Scout,
                            owner: *house,
                            system,
                        },
                    );
                }
                if let Some(defender) = defender {
                    sink.emit(
                        Visibility::only(defender),
                        EventKind::EspionageDetected {
                            by: *house,
                            against: defender,
                            action: ec4x_types::enums::EspionageAction::IntelTheft,
                        },
                    );
                }
                debug!(%house, %system, "spy scout detected and destroyed");
                continue;
            }
            if let Some(report) = report {
                intel::file_report(state, *house, report);
            }
        }
    }
}

/// Step 3b: EBP purchases, then covert actions, houses ascending.
fn resolve_covert_actions(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    rng: &mut TurnRng,
    sink: &mut EventSink,
) {
    for (house, packet) in staged {
        if let Some(directive) = &packet.espionage {
            espionage::purchase_budget(state, *house, directive.buy_ebp, directive.buy_cip, snapshot);
        }
    }
    for (house, packet) in staged {
        if let Some(directive) = &packet.espionage
            && let Some(action) = &directive.action
        {
            espionage::resolve_action(state, sink, snapshot, rng, *house, action);
        }
    }
}

/// Step 4: combat, system by system.
fn resolve_combat(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    sink: &mut EventSink,
) {
    let assaults = core::mem::take(&mut state.queued_assaults);

    let contested: Vec<SystemId> = state
        .indices
        .fleets_by_location
        .iter()
        .filter(|(_, fleets)| {
            let mut houses = BTreeSet::new();
            for fleet_id in fleets.iter() {
                if let Some(fleet) = state.fleets.get(*fleet_id)
                    && fleet.posture != FleetPosture::Mothballed
                {
                    houses.insert(fleet.owner);
                }
            }
            houses.len() >= 2
        })
        .map(|(system, _)| *system)
        .collect();

    for system in &contested {
        let houses_here: BTreeSet<HouseId> = state
            .fleets_at(*system)
            .into_iter()
            .filter_map(|id| state.fleets.get(id))
            .filter(|f| f.posture != FleetPosture::Mothballed)
            .map(|f| f.owner)
            .collect();
        let ordered: Vec<HouseId> = houses_here.into_iter().collect();

        for i in 0..ordered.len() {
            for j in i.saturating_add(1)..ordered.len() {
                let (Some(a), Some(b)) = (ordered.get(i).copied(), ordered.get(j).copied())
                else {
                    continue;
                };
                let threatening = assaults.iter().any(|assault| {
                    assault.system == *system
                        && ((assault.attacker == a
                            && state.colonies.get(system).is_some_and(|c| c.owner == b))
                            || (assault.attacker == b
                                && state.colonies.get(system).is_some_and(|c| c.owner == a)))
                });
                if !diplomacy::combat_permitted(state.stance(a, b), threatening) {
                    continue;
                }
                fight_space_battle(state, snapshot, rng, sink, *system, a, b);
            }
        }
    }

    // Orbital and planetary theaters for the staged assaults.
    let mut ordered_assaults = assaults;
    ordered_assaults.sort_by_key(|a| (a.system, a.attacker, a.kind, a.fleet));
    for assault in ordered_assaults {
        resolve_assault(state, snapshot, rng, sink, &assault);
    }
}

/// CER percentage for one side of an engagement.
fn side_cer(
    state: &GameState,
    snapshot: &RuleSnapshot,
    house: HouseId,
    enemy: HouseId,
    ships: &[ShipId],
) -> u32 {
    let mut cer: u32 = 100;
    let has_scout = ships.iter().any(|id| {
        state
            .ships
            .get(*id)
            .is_some_and(|ship| ship.class == ShipClass::Scout)
    });
    if has_scout {
        cer = cer.saturating_add(snapshot.combat.scout_cer_bonus_pct);
    }
    let own_clk = state
        .houses
        .get(&house)
        .map_or(0, |h| h.tech.level(TechField::Clk));
    let enemy_eli = state
        .houses
        .get(&enemy)
        .map_or(0, |h| h.tech.level(TechField::Eli));
    if own_clk > enemy_eli {
        // Undetected approach: the cloaked side opens with the advantage.
        cer = cer.saturating_add(snapshot.combat.ambush_cer_bonus_pct);
    } else if enemy_eli > own_clk.saturating_add(2) {
        cer = cer.saturating_sub(snapshot.combat.surprise_cer_penalty_pct.min(cer));
    }
    cer
}

/// Mobile (non-guard) ships a house has at a system.
fn mobile_side(state: &GameState, house: HouseId, system: SystemId) -> (Vec<FleetId>, Vec<ShipId>) {
    let mut fleets = Vec::new();
    let mut ships = Vec::new();
    for fleet_id in state.house_fleets_at(house, system) {
        let Some(fleet) = state.fleets.get(fleet_id) else {
            continue;
        };
        if fleet.posture != FleetPosture::Active {
            continue;
        }
        fleets.push(fleet_id);
        for squadron_id in &fleet.squadrons {
            if let Some(squadron) = state.squadrons.get(*squadron_id) {
                ships.extend(squadron.ships.iter().copied());
            }
        }
    }
    (fleets, ships)
}

/// The fleet-wide ROE: the most cautious posture among the participating
/// fleets carries the side.
fn side_roe(state: &GameState, fleets: &[FleetId]) -> ec4x_types::enums::RulesOfEngagement {
    fleets
        .iter()
        .filter_map(|id| state.fleets.get(*id))
        .map(|f| f.roe)
        .max()
        .unwrap_or_default()
}

fn fight_space_battle(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    sink: &mut EventSink,
    system: SystemId,
    a: HouseId,
    b: HouseId,
) {
    let (fleets_a, ships_a) = mobile_side(state, a, system);
    let (fleets_b, ships_b) = mobile_side(state, b, system);
    if ships_a.is_empty() || ships_b.is_empty() {
        return;
    }
    info!(%system, house_a = %a, house_b = %b, "space combat");

    let spec_a = SideSpec {
        house: a,
        fleets: fleets_a,
        ships: ships_a.clone(),
        reserve_ships: Vec::new(),
        starbases: Vec::new(),
        effectiveness_pct: 100,
        cer_pct: side_cer(state, snapshot, a, b, &ships_a),
        roe: side_roe(state, &spec_fleets(state, a, system)),
        can_retreat: true,
        shield_block_pct: 0,
        crit_die_modifier: 0,
    };
    let spec_b = SideSpec {
        house: b,
        fleets: fleets_b,
        ships: ships_b.clone(),
        reserve_ships: Vec::new(),
        starbases: Vec::new(),
        effectiveness_pct: 100,
        cer_pct: side_cer(state, snapshot, b, a, &ships_b),
        roe: side_roe(state, &spec_fleets(state, b, system)),
        can_retreat: true,
        shield_block_pct: 0,
        crit_die_modifier: 0,
    };

    let result = combat::run_engagement(state, snapshot, rng, spec_a, spec_b);
    apply_battle(state, snapshot, sink, system, a, b, &result);
}

fn spec_fleets(state: &GameState, house: HouseId, system: SystemId) -> Vec<FleetId> {
    state
        .house_fleets_at(house, system)
        .into_iter()
        .filter(|id| {
            state
                .fleets
                .get(*id)
                .is_some_and(|f| f.posture == FleetPosture::Active)
        })
        .collect()
}

/// Apply an engagement's outcomes to authoritative state.
fn apply_battle(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    sink: &mut EventSink,
    system: SystemId,
    a: HouseId,
    b: HouseId,
    result: &EngagementResult,
) {
    state
        .last_combat_between
        .insert(diplomacy::pair_key(a, b), state.turn);

    let losses_a = apply_side_outcome(state, snapshot, sink, system, a, b, &result.a);
    let losses_b = apply_side_outcome(state, snapshot, sink, system, b, a, &result.b);

    sink.emit_public(EventKind::CombatResolved {
        system,
        belligerents: vec![a, b],
        victor: result.victor,
    });

    // Both sides file an encounter report; each sees its own losses
    // exactly and the enemy's as observed.
    for (observer, quality) in [(a, IntelQuality::Spy), (b, IntelQuality::Spy)] {
        let mut losses = BTreeMap::new();
        losses.insert(a, losses_a);
        losses.insert(b, losses_b);
        intel::file_report(
            state,
            observer,
            IntelReport::CombatEncounter(CombatEncounterReport {
                system_id: system,
                turn: state.turn,
                quality,
                belligerents: vec![a, b],
                losses,
                victor: result.victor,
            }),
        );
    }
}

/// Apply one side's outcome; returns the ship-loss count for reporting.
fn apply_side_outcome(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    sink: &mut EventSink,
    system: SystemId,
    side: HouseId,
    enemy: HouseId,
    outcome: &SideOutcome,
) -> u32 {
    let mut losses = 0u32;

    for ship_id in &outcome.ships_destroyed {
        let Some(ship) = state.ships.get(*ship_id) else {
            // Already removed by a flagship cascade.
            losses = losses.saturating_add(1);
            continue;
        };
        let class = ship.class;
        let build_cost = ship.stats.build_cost;
        let salvage = build_cost.saturating_mul(i64::from(snapshot.economy.salvage_pct)) / 100;
        let wreck = state.wreckage.entry(system).or_insert(0);
        *wreck = wreck.saturating_add(salvage);
        losses = losses.saturating_add(1);

        let destroyed_squadron = state.destroy_ship(*ship_id);
        sink.emit_public(EventKind::ShipDestroyed {
            ship: *ship_id,
            class,
            owner: side,
            system,
        });
        if let Some(squadron) = destroyed_squadron {
            sink.emit_public(EventKind::SquadronDestroyed {
                squadron,
                owner: side,
                system,
            });
            prestige::award(
                state,
                sink,
                snapshot,
                enemy,
                Some(side),
                PrestigeSource::SquadronDestroyed,
                "squadron destroyed in battle",
            );
        }
    }

    for ship_id in &outcome.ships_crippled {
        if let Some(ship) = state.ships.get_mut(*ship_id) {
            ship.state = ShipState::Crippled;
        }
    }

    for facility_id in &outcome.starbases_destroyed {
        if let Some(facility) = state.facilities.delete(*facility_id) {
            if let Some(colony) = state.colonies.get_mut(&facility.colony) {
                colony.starbases.retain(|f| *f != *facility_id);
            }
            prestige::award(
                state,
                sink,
                snapshot,
                enemy,
                Some(side),
                PrestigeSource::StarbaseDestroyed,
                "starbase destroyed",
            );
        }
    }
    for facility_id in &outcome.starbases_crippled {
        if let Some(facility) = state.facilities.get_mut(*facility_id) {
            facility.crippled = true;
        }
    }

    if outcome.retreated {
        retreat_side(state, snapshot, sink, system, side, enemy);
    }
    losses
}

/// Move a beaten side out of the system, shedding what cannot follow.
fn retreat_side(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    sink: &mut EventSink,
    system: SystemId,
    side: HouseId,
    enemy: HouseId,
) {
    let destination = combat::retreat_destination(state, system, side, enemy);
    let Some(destination) = destination else {
        // Cornered: nowhere to run, the side stands and the rout becomes
        // a last stand next turn.
        return;
    };

    let fleets: Vec<FleetId> = state
        .house_fleets_at(side, system)
        .into_iter()
        .filter(|id| {
            state
                .fleets
                .get(*id)
                .is_some_and(|f| f.posture == FleetPosture::Active)
        })
        .collect();

    for fleet_id in fleets {
        // Fighters never retreat and spacelift cannot outrun pursuit.
        let abandoned: Vec<ShipId> = state
            .fleets
            .get(fleet_id)
            .into_iter()
            .flat_map(|f| f.squadrons.iter())
            .filter_map(|s| state.squadrons.get(*s))
            .flat_map(|s| s.ships.iter())
            .filter_map(|s| state.ships.get(*s))
            .filter(|ship| matches!(ship.class, ShipClass::Fighter | ShipClass::Transport))
            .map(|ship| ship.id)
            .collect();
        for ship_id in abandoned {
            let class = state.ships.get(ship_id).map(|s| s.class);
            let destroyed_squadron = state.destroy_ship(ship_id);
            if let Some(class) = class {
                sink.emit_public(EventKind::ShipDestroyed {
                    ship: ship_id,
                    class,
                    owner: side,
                    system,
                });
            }
            if let Some(squadron) = destroyed_squadron {
                sink.emit_public(EventKind::SquadronDestroyed {
                    squadron,
                    owner: side,
                    system,
                });
            }
        }
        if state.fleets.get(fleet_id).is_some_and(|f| f.squadrons.is_empty()) {
            state.delete_fleet(fleet_id);
            continue;
        }
        state.move_fleet(fleet_id, destination);
        if let Some(fleet) = state.fleets.get_mut(fleet_id) {
            fleet.movement = None;
        }
        sink.emit_public(EventKind::FleetRetreated {
            fleet: fleet_id,
            owner: side,
            from: system,
            to: destination,
        });
    }

    prestige::award(
        state,
        sink,
        snapshot,
        enemy,
        Some(side),
        PrestigeSource::ForcedRetreat,
        "forced the enemy to retreat",
    );
}

/// Orbital then planetary resolution for one staged assault.
fn resolve_assault(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    sink: &mut EventSink,
    assault: &QueuedAssault,
) {
    let system = assault.system;
    let Some(colony) = state.colonies.get(&system) else {
        return;
    };
    let defender = colony.owner;
    if defender == assault.attacker {
        return;
    }

    // The attacker must still hold mobile force in the system.
    let (attacker_fleets, attacker_ships) = mobile_side(state, assault.attacker, system);
    if attacker_ships.is_empty() {
        return;
    }

    // Orbital theater: guards, reserves at half effect, starbases, and
    // colony fighters. Mothballed hulls are screened and sit it out.
    let defender_orbital = orbital_defenders(state, defender, system);
    let shield_block = shield_block_pct(state, snapshot, system);

    if !defender_orbital.ships.is_empty() || !defender_orbital.starbases.is_empty() {
        info!(%system, attacker = %assault.attacker, %defender, "orbital combat");
        let spec_attacker = SideSpec {
            house: assault.attacker,
            fleets: attacker_fleets,
            ships: attacker_ships.clone(),
            reserve_ships: Vec::new(),
            starbases: Vec::new(),
            effectiveness_pct: 100,
            cer_pct: side_cer(state, snapshot, assault.attacker, defender, &attacker_ships),
            roe: side_roe(state, &spec_fleets(state, assault.attacker, system)),
            can_retreat: true,
            shield_block_pct: 0,
            crit_die_modifier: 0,
        };
        let spec_defender = SideSpec {
            house: defender,
            fleets: defender_orbital.fleets.clone(),
            ships: defender_orbital.ships.clone(),
            reserve_ships: defender_orbital.reserve_ships.clone(),
            starbases: defender_orbital.starbases.clone(),
            effectiveness_pct: 100,
            cer_pct: 100,
            roe: ec4x_types::enums::RulesOfEngagement::FightToTheDeath,
            can_retreat: false,
            shield_block_pct: shield_block,
            crit_die_modifier: if defender_orbital.starbases.is_empty() {
                0
            } else {
                snapshot.combat.starbase_die_modifier
            },
        };
        let result = combat::run_engagement(state, snapshot, rng, spec_attacker, spec_defender);
        apply_battle(state, snapshot, sink, system, assault.attacker, defender, &result);
        if result.victor != Some(assault.attacker) {
            return;
        }
    }

    planetary_theater(state, snapshot, rng, sink, assault, defender);
}

/// Defender assets for the orbital theater.
struct OrbitalDefense {
    fleets: Vec<FleetId>,
    ships: Vec<ShipId>,
    reserve_ships: Vec<ShipId>,
    starbases: Vec<ec4x_types::ids::FacilityId>,
}

fn orbital_defenders(state: &GameState, defender: HouseId, system: SystemId) -> OrbitalDefense {
    let mut fleets = Vec::new();
    let mut ships = Vec::new();
    let mut reserve_ships = Vec::new();
    for fleet_id in state.house_fleets_at(defender, system) {
        let Some(fleet) = state.fleets.get(fleet_id) else {
            continue;
        };
        match fleet.posture {
            FleetPosture::Guard | FleetPosture::Reserve => {
                fleets.push(fleet_id);
                for squadron_id in &fleet.squadrons {
                    if let Some(squadron) = state.squadrons.get(*squadron_id) {
                        ships.extend(squadron.ships.iter().copied());
                        if fleet.posture == FleetPosture::Reserve {
                            reserve_ships.extend(squadron.ships.iter().copied());
                        }
                    }
                }
            }
            FleetPosture::Active | FleetPosture::Mothballed => {}
        }
    }
    let mut starbases = Vec::new();
    if let Some(colony) = state.colonies.get(&system) {
        starbases.extend(colony.starbases.iter().copied());
        for squadron_id in &colony.fighter_squadron_ids {
            if let Some(squadron) = state.squadrons.get(*squadron_id) {
                ships.extend(squadron.ships.iter().copied());
            }
        }
    }
    OrbitalDefense {
        fleets,
        ships,
        reserve_ships,
        starbases,
    }
}

/// The colony's shield block chance, from its current shield level.
fn shield_block_pct(state: &GameState, snapshot: &RuleSnapshot, system: SystemId) -> u32 {
    let level = state
        .colonies
        .get(&system)
        .map_or(0, |colony| usize::from(colony.shield_level));
    if level == 0 {
        return 0;
    }
    snapshot
        .combat
        .planetary_shields
        .get(level.saturating_sub(1))
        .map_or(0, |spec| spec.block_chance_pct)
}

/// The planetary theater: bombardment dice and the ground battle.
fn planetary_theater(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    sink: &mut EventSink,
    assault: &QueuedAssault,
    defender: HouseId,
) {
    let system = assault.system;
    match assault.kind {
        AssaultKind::Bombard => {
            bombard(state, snapshot, rng, sink, assault.attacker, system);
        }
        AssaultKind::Invade => {
            invade(state, snapshot, sink, assault, defender, 0);
        }
        AssaultKind::Blitz => {
            bombard(state, snapshot, rng, sink, assault.attacker, system);
            invade(
                state,
                snapshot,
                sink,
                assault,
                defender,
                snapshot.combat.blitz_iu_loss_pct,
            );
        }
    }
    // A colony bled dry of people is gone.
    if state
        .colonies
        .get(&system)
        .is_some_and(|colony| colony.population_units == 0)
    {
        let owner = state.colonies.get(&system).map(|c| c.owner);
        state.remove_colony(system);
        if let Some(owner) = owner {
            sink.emit_public(EventKind::ColonyDestroyed { system, owner });
        }
    }
}

fn bombard(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    sink: &mut EventSink,
    attacker: HouseId,
    system: SystemId,
) {
    let mut iu_destroyed = 0u32;
    let mut pu_destroyed = 0u32;
    for _ in 0..snapshot.combat.max_rounds_per_turn {
        let damage = rng.die(snapshot.combat.bombard_die);
        iu_destroyed = iu_destroyed.saturating_add(damage);
        if i64::from(rng.d20()) >= i64::from(snapshot.combat.critical_threshold) {
            pu_destroyed = pu_destroyed.saturating_add(damage);
        }
    }
    if let Some(colony) = state.colonies.get_mut(&system) {
        colony.industrial_units = colony.industrial_units.saturating_sub(iu_destroyed);
        colony.population_units = colony.population_units.saturating_sub(pu_destroyed);
        colony.blockaded = true;
        colony.infrastructure_damage = colony.infrastructure_damage.saturating_add(10).min(100);
    }
    info!(%attacker, %system, iu_destroyed, pu_destroyed, "bombardment");
    sink.emit_public(EventKind::ColonyBombarded {
        system,
        by: attacker,
        iu_destroyed,
    });
}

fn invade(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    sink: &mut EventSink,
    assault: &QueuedAssault,
    defender: HouseId,
    extra_iu_loss_pct: u32,
) {
    let system = assault.system;

    // Marines embarked across the attacker's ships at the system.
    let (_, attacker_ships) = mobile_side(state, assault.attacker, system);
    let mut marine_units: Vec<ec4x_types::ids::GroundUnitId> = Vec::new();
    for ship_id in &attacker_ships {
        if let Some(ship) = state.ships.get(*ship_id)
            && let Cargo::Marines(units) = &ship.cargo
        {
            marine_units.extend(units.iter().copied());
        }
    }
    if marine_units.is_empty() {
        return;
    }

    let marine_strength = snapshot
        .ground_units
        .spec(GroundUnitKind::Marine)
        .combat_strength;
    let attacker_strength = u32::try_from(marine_units.len())
        .unwrap_or(u32::MAX)
        .saturating_mul(marine_strength);

    let defender_strength = state.colonies.get(&system).map_or(0, |colony| {
        colony
            .armies
            .iter()
            .chain(colony.marines.iter())
            .chain(colony.batteries.iter())
            .filter_map(|id| state.ground_units.get(*id))
            .map(|unit| snapshot.ground_units.spec(unit.kind).combat_strength)
            .fold(0u32, u32::saturating_add)
    });

    let attacker_wins = attacker_strength.saturating_mul(100)
        > defender_strength.saturating_mul(snapshot.combat.ground_victory_threshold_pct);

    if !attacker_wins {
        // The landing is repulsed; the assault force is spent.
        for unit in &marine_units {
            state.ground_units.delete(*unit);
        }
        clear_marine_cargo(state, &attacker_ships, &marine_units);
        debug!(%system, attacker = %assault.attacker, "invasion repulsed");
        return;
    }

    // Defender garrison is destroyed, the colony changes hands.
    let garrison: Vec<ec4x_types::ids::GroundUnitId> = state
        .colonies
        .get(&system)
        .map(|colony| {
            colony
                .armies
                .iter()
                .chain(colony.marines.iter())
                .chain(colony.batteries.iter())
                .copied()
                .collect()
        })
        .unwrap_or_default();
    for unit in garrison {
        state.ground_units.delete(unit);
    }
    if let Some(colony) = state.colonies.get_mut(&system) {
        colony.armies.clear();
        colony.marines.clear();
        colony.batteries.clear();
        let iu_loss_pct = snapshot
            .combat
            .invasion_iu_loss_pct
            .saturating_add(extra_iu_loss_pct)
            .min(100);
        let iu_loss = colony.industrial_units.saturating_mul(iu_loss_pct) / 100;
        colony.industrial_units = colony.industrial_units.saturating_sub(iu_loss);
        let pu_loss = colony.population_units.saturating_mul(iu_loss_pct) / 100;
        colony.population_units = colony.population_units.saturating_sub(pu_loss);
    }

    state.update_colony_owner(system, defender, assault.attacker);

    // The landing force garrisons the prize.
    clear_marine_cargo(state, &attacker_ships, &marine_units);
    for unit_id in &marine_units {
        if let Some(unit) = state.ground_units.get_mut(*unit_id) {
            unit.owner = assault.attacker;
            unit.system_id = system;
        }
        if let Some(colony) = state.colonies.get_mut(&system) {
            colony.marines.push(*unit_id);
        }
    }

    info!(%system, attacker = %assault.attacker, %defender, "colony invaded");
    prestige::award(
        state,
        sink,
        snapshot,
        assault.attacker,
        Some(defender),
        PrestigeSource::PlanetInvaded,
        "colony taken by invasion",
    );
    sink.emit_public(EventKind::ColonyInvaded {
        system,
        from: defender,
        to: assault.attacker,
    });
}

/// Remove landed (or lost) marines from their ships' cargo holds.
fn clear_marine_cargo(state: &mut GameState, ships: &[ShipId], landed: &[ec4x_types::ids::GroundUnitId]) {
    for ship_id in ships {
        if let Some(ship) = state.ships.get_mut(*ship_id)
            && let Cargo::Marines(units) = &mut ship.cargo
        {
            units.retain(|unit| !landed.contains(unit));
            if units.is_empty() {
                ship.cargo = Cargo::Empty;
            }
        }
    }
}

/// Find one ship of a class in a fleet.
fn fleet_ship_of_class(state: &GameState, fleet: FleetId, class: ShipClass) -> Option<ShipId> {
    state
        .fleets
        .get(fleet)
        .into_iter()
        .flat_map(|f| f.squadrons.iter())
        .filter_map(|s| state.squadrons.get(*s))
        .flat_map(|s| s.ships.iter())
        .filter_map(|s| state.ships.get(*s))
        .find(|ship| ship.class == class)
        .map(|ship| ship.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::GameSetup;
    use ec4x_types::orders::FleetOrder;
    use std::collections::BTreeMap as Map;

    fn fixture() -> (GameState, RuleSnapshot) {
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        (state, snapshot)
    }

    fn packet_with(house: HouseId, orders: Vec<FleetOrder>) -> CommandPacket {
        CommandPacket {
            house,
            turn: 1,
            fleet_orders: orders,
            ..CommandPacket::default()
        }
    }

    #[test]
    fn bombard_on_neutral_escalates_to_enemy_and_costs_prestige() {
        let (mut state, snapshot) = fixture();
        let attacker = HouseId::new(0);
        let defender = HouseId::new(1);
        let fleet = state.fleets_of(attacker)[0];
        let target = state.colonies_of(defender)[0];
        state.move_fleet(fleet, target);
        state.turn = 1;

        let mut staged: Map<HouseId, CommandPacket> = Map::new();
        staged.insert(
            attacker,
            packet_with(attacker, vec![FleetOrder { fleet, verb: FleetVerb::Bombard }]),
        );
        let mut rng = TurnRng::for_turn(state.seed, 1);
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &staged, &mut rng, &mut sink);

        assert_eq!(state.stance(attacker, defender), DiplomaticState::Enemy);
        let penalty = state
            .houses
            .get(&attacker)
            .unwrap()
            .prestige_ledger
            .iter()
            .any(|entry| entry.source == PrestigeSource::UnprovokedAssault && entry.delta < 0);
        assert!(penalty, "aggressor must book the assault penalty");
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn colonization_tie_breaks_on_prestige_then_treasury() {
        let (mut state, snapshot) = fixture();
        let rich = HouseId::new(2);
        let poor = HouseId::new(3);
        state.houses.get_mut(&rich).unwrap().treasury = 9_000;

        // Both contenders sit on the hub with transports.
        let hub = state.map.hub();
        let fleet_rich = state.fleets_of(rich)[0];
        let fleet_poor = state.fleets_of(poor)[0];
        state.move_fleet(fleet_rich, hub);
        state.move_fleet(fleet_poor, hub);

        let mut staged: Map<HouseId, CommandPacket> = Map::new();
        staged.insert(
            rich,
            packet_with(rich, vec![FleetOrder { fleet: fleet_rich, verb: FleetVerb::Colonize }]),
        );
        staged.insert(
            poor,
            packet_with(poor, vec![FleetOrder { fleet: fleet_poor, verb: FleetVerb::Colonize }]),
        );
        let mut rng = TurnRng::for_turn(state.seed, 1);
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &staged, &mut rng, &mut sink);

        assert_eq!(state.colonies.get(&hub).unwrap().owner, rich);
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn neutral_colocated_fleets_do_not_fight() {
        let (mut state, snapshot) = fixture();
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        let hub = state.map.hub();
        state.move_fleet(state.fleets_of(a)[0], hub);
        state.move_fleet(state.fleets_of(b)[0], hub);

        let ships_before = state.ships.len();
        let mut rng = TurnRng::for_turn(state.seed, 1);
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &Map::new(), &mut rng, &mut sink);
        assert_eq!(state.ships.len(), ships_before);
    }

    #[test]
    fn enemy_colocated_fleets_fight_on_sight() {
        let (mut state, snapshot) = fixture();
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        state.set_stance(a, b, DiplomaticState::Enemy);
        let hub = state.map.hub();
        state.move_fleet(state.fleets_of(a)[0], hub);
        state.move_fleet(state.fleets_of(b)[0], hub);

        let ships_before = state.ships.len();
        let mut rng = TurnRng::for_turn(state.seed, 1);
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &Map::new(), &mut rng, &mut sink);
        assert!(state.ships.len() < ships_before, "combat must cost hulls");
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }
}
