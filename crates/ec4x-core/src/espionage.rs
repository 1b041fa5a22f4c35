//! EBP-funded covert actions and their detection.
//!
//! Each house may attempt one covert action per turn. The defender's
//! counter-intel tech sets the d20 detection threshold; banked CIP points
//! modify the roll, and an active sweep lowers the bar further. A detected
//! action is foiled outright: the attacker pays prestige and the target is
//! told who came knocking.

use tracing::{debug, info};

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::{EffectKind, EspionageAction, PrestigeSource, TechField};
use ec4x_types::events::{EventKind, Visibility};
use ec4x_types::ids::{HouseId, SystemId};
use ec4x_types::orders::EspionageOrder;
use ec4x_types::projects::OngoingEffect;

use crate::events::EventSink;
use crate::prestige;
use crate::rng::TurnRng;
use crate::state::GameState;

/// Duration of a successful counter-intel sweep, in turns.
const SWEEP_DURATION: u32 = 3;

/// Buy EBP/CIP for a house. The validator has already checked the funds.
pub fn purchase_budget(
    state: &mut GameState,
    house: HouseId,
    buy_ebp: u32,
    buy_cip: u32,
    snapshot: &RuleSnapshot,
) {
    let cost = snapshot
        .espionage
        .ebp_cost_pp
        .saturating_mul(i64::from(buy_ebp))
        .saturating_add(snapshot.espionage.cip_cost_pp.saturating_mul(i64::from(buy_cip)));
    if let Some(record) = state.houses.get_mut(&house) {
        if record.treasury < cost {
            return;
        }
        record.treasury = record.treasury.saturating_sub(cost);
        record.espionage.ebp = record.espionage.ebp.saturating_add(buy_ebp);
        record.espionage.cip = record.espionage.cip.saturating_add(buy_cip);
        debug!(%house, buy_ebp, buy_cip, cost, "espionage budget purchased");
    }
}

/// Resolve one house's covert action.
///
/// Draws exactly one detection roll from the turn stream, then the
/// action's effect dice. The caller iterates houses in ascending order so
/// the stream is consumed deterministically.
pub fn resolve_action(
    state: &mut GameState,
    sink: &mut EventSink,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    actor: HouseId,
    order: &EspionageOrder,
) {
    let spec = snapshot.espionage.action(order.action);
    let target = order.target_house;

    // Spend the points first; a foiled action still burns its budget.
    {
        let Some(house) = state.houses.get_mut(&actor) else {
            return;
        };
        if house.espionage.ebp < spec.cost_ebp {
            return;
        }
        house.espionage.ebp = house.espionage.ebp.saturating_sub(spec.cost_ebp);
    }

    // A sweep is self-targeted and cannot be detected.
    if order.action == EspionageAction::CounterIntelSweep {
        state
            .active_sweeps
            .insert(actor, state.turn.saturating_add(SWEEP_DURATION));
        info!(%actor, "counter-intel sweep active");
        return;
    }

    let detected = roll_detection(state, snapshot, rng, target);
    if detected {
        info!(%actor, %target, action = ?order.action, "espionage detected");
        prestige::award(
            state,
            sink,
            snapshot,
            actor,
            Some(target),
            PrestigeSource::EspionageDetected,
            "covert action detected",
        );
        sink.emit(
            Visibility::pair(actor, target),
            EventKind::EspionageDetected {
                by: actor,
                against: target,
                action: order.action,
            },
        );
        return;
    }

    apply_success(state, sink, rng, actor, order, &spec);
}

/// Roll detection for an action against `defender`.
fn roll_detection(
    state: &GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    defender: HouseId,
) -> bool {
    let Some(house) = state.houses.get(&defender) else {
        return false;
    };
    let cic = house.tech.level(TechField::Cic);
    let mut threshold = i64::from(snapshot.espionage.threshold_for(cic));
    if state
        .active_sweeps
        .get(&defender)
        .is_some_and(|until| state.turn <= *until)
    {
        threshold = threshold.saturating_sub(i64::from(snapshot.espionage.sweep_threshold_shift));
    }
    let roll = i64::from(rng.d20())
        .saturating_add(i64::from(snapshot.espionage.cip_modifier(house.espionage.cip)));
    roll >= threshold
}

/// Apply a successful action's data-driven effects.
fn apply_success(
    state: &mut GameState,
    sink: &mut EventSink,
    rng: &mut TurnRng,
    actor: HouseId,
    order: &EspionageOrder,
    spec: &ec4x_rules::EspionageActionSpec,
) {
    let target = order.target_house;
    info!(%actor, %target, action = ?order.action, "espionage succeeded");

    if spec.prestige_on_success != 0 {
        prestige::award_raw(
            state,
            sink,
            actor,
            Some(target),
            PrestigeSource::EspionageSuccess,
            spec.prestige_on_success,
            "covert action succeeded",
        );
    }

    if spec.srp_stolen > 0 {
        steal_research(state, actor, target, spec.srp_stolen);
    }

    if spec.iu_damage_die > 0 {
        let damage = rng.die(spec.iu_damage_die);
        if let Some(system) = sabotage_target(state, target, order.target_system) {
            if let Some(colony) = state.colonies.get_mut(&system) {
                colony.industrial_units = colony.industrial_units.saturating_sub(damage);
            }
            debug!(%target, %system, damage, "industry sabotaged");
        }
    }

    if let Some(effect) = spec.effect {
        state.effects.create(|id| OngoingEffect {
            id,
            kind: effect.kind,
            target_house: target,
            target_system: order.target_system,
            turns_remaining: effect.turns,
            magnitude: effect.magnitude,
        });
    }

    if spec.steals_intel {
        steal_intel(state, actor, target);
    }

    // Assassination disrupts the target's whole apparatus for a turn.
    if order.action == EspionageAction::Assassination {
        state.effects.create(|id| OngoingEffect {
            id,
            kind: EffectKind::SrpReduction,
            target_house: target,
            target_system: None,
            turns_remaining: 2,
            magnitude: 50,
        });
    }

    sink.emit(
        Visibility::pair(actor, target),
        EventKind::EspionageSucceeded {
            by: actor,
            against: target,
            action: order.action,
        },
    );
}

/// Move up to `amount` research points from `target` to `actor`,
/// draining fields in ledger order.
fn steal_research(state: &mut GameState, actor: HouseId, target: HouseId, amount: u32) {
    let mut remaining = amount;
    let mut stolen: Vec<(TechField, u32)> = Vec::new();
    if let Some(victim) = state.houses.get_mut(&target) {
        for field in TechField::ALL {
            if remaining == 0 {
                break;
            }
            let pool = victim.tech.points(field);
            let take = pool.min(remaining);
            if take > 0 {
                victim.tech.points.insert(field, pool.saturating_sub(take));
                stolen.push((field, take));
                remaining = remaining.saturating_sub(take);
            }
        }
    }
    if let Some(thief) = state.houses.get_mut(&actor) {
        for (field, take) in stolen {
            let current = thief.tech.points(field);
            thief.tech.points.insert(field, current.saturating_add(take));
        }
    }
}

/// Copy the target's keyed intel stores into the actor's database.
fn steal_intel(state: &mut GameState, actor: HouseId, target: HouseId) {
    let Some(victim) = state.houses.get(&target) else {
        return;
    };
    let colonies: Vec<_> = victim.intelligence_db.colonies.values().cloned().collect();
    let systems: Vec<_> = victim.intelligence_db.systems.values().cloned().collect();
    let starbases: Vec<_> = victim.intelligence_db.starbases.values().cloned().collect();
    if let Some(thief) = state.houses.get_mut(&actor) {
        for report in colonies {
            thief
                .intelligence_db
                .merge(ec4x_types::intel::IntelReport::Colony(report));
        }
        for report in systems {
            thief
                .intelligence_db
                .merge(ec4x_types::intel::IntelReport::System(report));
        }
        for report in starbases {
            thief
                .intelligence_db
                .merge(ec4x_types::intel::IntelReport::Starbase(report));
        }
    }
}

/// The colony that absorbs sabotage: the named system if the target owns
/// it, otherwise the target's highest-IU colony, ties to lowest system.
fn sabotage_target(
    state: &GameState,
    target: HouseId,
    named: Option<SystemId>,
) -> Option<SystemId> {
    if let Some(system) = named
        && state
            .colonies
            .get(&system)
            .is_some_and(|colony| colony.owner == target)
    {
        return Some(system);
    }
    state
        .colonies_of(target)
        .into_iter()
        .filter_map(|system| state.colonies.get(&system).map(|c| (system, c.industrial_units)))
        .max_by_key(|(system, iu)| (*iu, core::cmp::Reverse(*system)))
        .map(|(system, _)| system)
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
    fn budget_purchase_converts_treasury_to_points() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let before = state.houses.get(&house).unwrap().treasury;

        purchase_budget(&mut state, house, 10, 5, &snapshot);

        let record = state.houses.get(&house).unwrap();
        assert_eq!(record.espionage.ebp, 10);
        assert_eq!(record.espionage.cip, 5);
        assert_eq!(record.treasury, before - 150);
    }

    #[test]
    fn unaffordable_purchase_changes_nothing() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        state.houses.get_mut(&house).unwrap().treasury = 10;

        purchase_budget(&mut state, house, 100, 0, &snapshot);

        let record = state.houses.get(&house).unwrap();
        assert_eq!(record.espionage.ebp, 0);
        assert_eq!(record.treasury, 10);
    }

    #[test]
    fn sweep_activates_without_a_detection_roll() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        state.houses.get_mut(&house).unwrap().espionage.ebp = 20;
        state.turn = 5;

        let mut sink = EventSink::new(5);
        let mut rng = TurnRng::for_turn(state.seed, 5);
        resolve_action(
            &mut state,
            &mut sink,
            &snapshot,
            &mut rng,
            house,
            &EspionageOrder {
                action: EspionageAction::CounterIntelSweep,
                target_house: house,
                target_system: None,
            },
        );

        assert_eq!(state.active_sweeps.get(&house), Some(&8));
        assert_eq!(state.houses.get(&house).unwrap().espionage.ebp, 16);
        assert!(sink.is_empty());
    }

    #[test]
    fn tech_theft_burns_budget_and_moves_points_or_is_caught() {
        let (mut state, snapshot) = fixture();
        let actor = HouseId::new(0);
        let target = HouseId::new(1);
        state.houses.get_mut(&actor).unwrap().espionage.ebp = 10;
        state
            .houses
            .get_mut(&target)
            .unwrap()
            .tech
            .points
            .insert(TechField::El, 30);
        state.turn = 2;

        let mut sink = EventSink::new(2);
        let mut rng = TurnRng::for_turn(state.seed, 2);
        resolve_action(
            &mut state,
            &mut sink,
            &snapshot,
            &mut rng,
            actor,
            &EspionageOrder {
                action: EspionageAction::TechTheft,
                target_house: target,
                target_system: None,
            },
        );

        // The budget burns either way.
        assert_eq!(state.houses.get(&actor).unwrap().espionage.ebp, 5);
        let stolen = state.houses.get(&actor).unwrap().tech.points(TechField::El);
        let remaining = state.houses.get(&target).unwrap().tech.points(TechField::El);
        if stolen > 0 {
            // Success: points moved, conservation holds.
            assert_eq!(stolen + remaining, 30);
        } else {
            // Detected: nothing moved and the attempt is on the record.
            assert_eq!(remaining, 30);
            assert!(!sink.is_empty());
        }
    }

    #[test]
    fn insufficient_ebp_is_a_silent_no_op() {
        let (mut state, snapshot) = fixture();
        let actor = HouseId::new(0);
        let mut sink = EventSink::new(1);
        let mut rng = TurnRng::for_turn(state.seed, 1);
        resolve_action(
            &mut state,
            &mut sink,
            &snapshot,
            &mut rng,
            actor,
            &EspionageOrder {
                action: EspionageAction::Assassination,
                target_house: HouseId::new(1),
                target_system: None,
            },
        );
        assert!(sink.is_empty());
        assert_eq!(state.effects.len(), 0);
    }
}
