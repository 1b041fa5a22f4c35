//! The four-phase turn resolver.
//!
//! A turn is a pure function `(state, rng seed, orders) -> (state', events)`
//! executed as Conflict -> Income -> Command -> Maintenance. The resolver
//! snapshots the state before touching it; any invariant violation restores
//! the snapshot and surfaces the error, leaving the game on its last good
//! turn. Best-effort continuation is off the table -- a corrupted state
//! would silently desynchronize every client.
//!
//! Within a phase, simultaneous actions are ordered by `(priority class,
//! house id ascending)` and all random draws follow that traversal order,
//! which is what makes replays byte-identical.

pub mod command;
pub mod conflict;
pub mod income;
pub mod maintenance;

use std::collections::BTreeMap;

use tracing::{error, info};

use ec4x_rules::RuleSnapshot;
use ec4x_types::colony::Colony;
use ec4x_types::enums::TechField;
use ec4x_types::events::{EventKind, GameEvent, Visibility};
use ec4x_types::ids::HouseId;
use ec4x_types::orders::CommandPacket;

use crate::error::EngineError;
use crate::events::EventSink;
use crate::orders;
use crate::rng::TurnRng;
use crate::state::GameState;

/// The committed result of one resolved turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The turn that was resolved.
    pub turn: u32,
    /// The full event log, in emission order.
    pub events: Vec<GameEvent>,
}

/// Resolve one turn.
///
/// Houses that submitted no packet are defaulted to hold. Invalid orders
/// inside a packet are rejected individually and surfaced as
/// `OrderRejected` events visible only to the submitter.
///
/// # Errors
///
/// Returns [`EngineError::Invariant`] if a phase corrupts the state; the
/// state is rolled back to the pre-turn snapshot first.
pub fn advance_turn(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    packets: &BTreeMap<HouseId, CommandPacket>,
) -> Result<TurnOutcome, EngineError> {
    if state.finished {
        return Err(EngineError::Invariant {
            phase: "advance",
            details: "the game is already finished".to_owned(),
        });
    }

    let rollback = state.clone();
    state.turn = state.turn.saturating_add(1);
    let turn = state.turn;
    let mut rng = TurnRng::for_turn(state.seed, turn);
    let mut sink = EventSink::new(turn);

    info!(turn, "turn started");

    // Validate and stage every live house's packet, ascending.
    let mut staged: BTreeMap<HouseId, CommandPacket> = BTreeMap::new();
    for house in state.live_houses() {
        match packets.get(&house) {
            Some(packet) => {
                let review = orders::validate_packet(state, snapshot, packet);
                for (what, reason) in review.rejections {
                    sink.emit(
                        Visibility::only(house),
                        EventKind::OrderRejected {
                            house,
                            reason,
                            order: what,
                        },
                    );
                }
                staged.insert(house, review.accepted);
            }
            None => {
                sink.emit_public(EventKind::AutoHold { house });
                staged.insert(house, CommandPacket::hold(house, turn));
            }
        }
    }

    let result = run_phases(state, snapshot, &staged, &mut rng, &mut sink);
    match result {
        Ok(()) => {
            info!(turn, events = sink.len(), "turn committed");
            Ok(TurnOutcome {
                turn,
                events: sink.into_events(),
            })
        }
        Err(err) => {
            error!(turn, %err, "turn aborted, rolling back");
            *state = rollback;
            Err(err)
        }
    }
}

fn run_phases(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    rng: &mut TurnRng,
    sink: &mut EventSink,
) -> Result<(), EngineError> {
    conflict::run(state, snapshot, staged, rng, sink);
    check_indices(state, "conflict")?;

    income::run(state, snapshot, staged, sink);
    check_indices(state, "income")?;

    command::run(state, snapshot, staged, sink);
    check_indices(state, "command")?;

    maintenance::run(state, snapshot, staged, rng, sink);
    check_indices(state, "maintenance")?;

    Ok(())
}

fn check_indices(state: &GameState, phase: &'static str) -> Result<(), EngineError> {
    let violations = state.validate_indices();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Invariant {
            phase,
            details: violations.join("; "),
        })
    }
}

/// Fighter capacity of a colony:
/// `floor(IU / divisor) x FD multiplier(owner's FD level)`.
pub fn fighter_capacity(state: &GameState, snapshot: &RuleSnapshot, colony: &Colony) -> u32 {
    let base = colony.industrial_units / snapshot.military.fighter_iu_divisor.max(1);
    let fd_level = state
        .houses
        .get(&colony.owner)
        .map_or(0, |house| u32::from(house.tech.level(TechField::Fd)));
    let multiplier_pct = 100u32.saturating_add(
        snapshot
            .military
            .fd_multiplier_pct_per_level
            .saturating_mul(fd_level),
    );
    base.saturating_mul(multiplier_pct) / 100
}

/// A house's capital squadron limit:
/// `max(minimum, 2 x floor(total IU / divisor))`.
pub fn capital_squadron_limit(
    state: &GameState,
    snapshot: &RuleSnapshot,
    house: HouseId,
) -> u32 {
    let by_industry = (state.total_iu(house) / snapshot.military.squadron_iu_divisor.max(1))
        .saturating_mul(2);
    by_industry.max(snapshot.military.capital_squadron_min)
}

/// How many capital squadrons (flagship with a command rating) a house has.
pub fn capital_squadron_count(state: &GameState, house: HouseId) -> u32 {
    let count = state
        .squadrons
        .iter()
        .filter(|(_, squadron)| squadron.house_id == house)
        .filter(|(_, squadron)| {
            state
                .ships
                .get(squadron.flagship)
                .is_some_and(|flagship| flagship.stats.command_rating > 0)
        })
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
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
    fn a_full_hold_turn_resolves_cleanly() {
        let (mut state, snapshot) = fixture();
        let outcome = advance_turn(&mut state, &snapshot, &BTreeMap::new()).unwrap();
        assert_eq!(outcome.turn, 1);
        assert_eq!(state.turn, 1);
        // Every house was auto-held.
        let holds = outcome
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::AutoHold { .. }))
            .count();
        assert_eq!(holds, 4);
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn hold_turns_are_deterministic_replays() {
        let (mut a, snapshot) = fixture();
        let (mut b, _) = fixture();
        for _ in 0..5 {
            advance_turn(&mut a, &snapshot, &BTreeMap::new()).unwrap();
            advance_turn(&mut b, &snapshot, &BTreeMap::new()).unwrap();
        }
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn income_accrues_over_hold_turns() {
        let (mut state, snapshot) = fixture();
        let before = state.houses.get(&HouseId::new(0)).unwrap().treasury;
        advance_turn(&mut state, &snapshot, &BTreeMap::new()).unwrap();
        let after = state.houses.get(&HouseId::new(0)).unwrap().treasury;
        assert!(after > before, "homeworld income should outweigh upkeep");
    }

    #[test]
    fn default_capacities_are_positive() {
        let (state, snapshot) = fixture();
        let house = HouseId::new(0);
        let colony_system = state.colonies_of(house)[0];
        let colony = state.colonies.get(&colony_system).unwrap();
        assert!(fighter_capacity(&state, &snapshot, colony) >= 5);
        assert!(capital_squadron_limit(&state, &snapshot, house) >= 2);
        assert_eq!(capital_squadron_count(&state, house), 2);
    }
}
