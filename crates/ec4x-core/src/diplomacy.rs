//! The diplomatic ladder.
//!
//! Stances only escalate automatically -- a provocative order in a foreign
//! system turns Neutral into Hostile, a threatening order jumps straight to
//! Enemy. De-escalation is negotiated: offer, then acceptance, with a
//! cooldown after rejection and a lockout while blood is still fresh.

use tracing::info;

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::{DiplomaticState, PrestigeSource};
use ec4x_types::events::EventKind;
use ec4x_types::ids::HouseId;
use ec4x_types::orders::FleetVerb;

use crate::events::EventSink;
use crate::prestige;
use crate::state::{GameState, PactViolation};

/// Turns without combat required before a de-escalation can be accepted.
pub const DEESCALATION_COMBAT_LOCKOUT: u32 = 3;

/// Turns a rejected offerer must wait before offering again.
pub const REJECTION_COOLDOWN: u32 = 3;

/// Turns of dishonored status after a pact violation.
pub const DISHONORED_TURNS: u32 = 3;

/// Turns of diplomatic isolation after a pact violation.
pub const ISOLATION_TURNS: u32 = 5;

/// Escalate `actor`'s stance toward `victim` based on the order class.
///
/// Provocative orders move Neutral to Hostile; a second offense, or any
/// threatening order, moves to Enemy. Escalation is symmetric and emits a
/// `DiplomaticShift` event both houses can see.
pub fn escalate_for_order(
    state: &mut GameState,
    sink: &mut EventSink,
    actor: HouseId,
    victim: HouseId,
    verb: &FleetVerb,
) {
    if actor == victim {
        return;
    }
    let current = state.stance(actor, victim);
    let next = if verb.is_threatening() {
        DiplomaticState::Enemy
    } else if verb.is_provocative() {
        match current {
            DiplomaticState::Neutral => DiplomaticState::Hostile,
            // A second offense while Hostile means war.
            DiplomaticState::Hostile | DiplomaticState::Enemy => DiplomaticState::Enemy,
        }
    } else {
        return;
    };
    if next > current {
        state.set_stance(actor, victim, next);
        info!(%actor, %victim, ?next, "diplomatic escalation");
        sink.emit_public(EventKind::DiplomaticShift {
            source: actor,
            target: victim,
            state: next,
        });
    }
}

/// Record a de-escalation offer from `from` toward `to`.
///
/// Fails silently (no state change) when the offerer is isolated, on
/// cooldown, or the pair is already Neutral.
pub fn offer_deescalation(
    state: &mut GameState,
    sink: &mut EventSink,
    from: HouseId,
    to: HouseId,
) {
    if from == to || state.stance(from, to) == DiplomaticState::Neutral {
        return;
    }
    if state
        .houses
        .get(&from)
        .is_some_and(|house| house.isolation_turns > 0)
    {
        return;
    }
    if let Some(until) = state.rejection_cooldown_until.get(&(from, to))
        && state.turn < *until
    {
        return;
    }
    state.deescalation_offers.insert((from, to), state.turn);
    sink.emit(
        ec4x_types::events::Visibility::pair(from, to),
        EventKind::DeescalationOffered { from, to },
    );
}

/// Accept a standing offer, dropping the stance one level on both sides.
///
/// Requires no combat between the pair within the lockout window.
pub fn accept_deescalation(
    state: &mut GameState,
    sink: &mut EventSink,
    acceptor: HouseId,
    offerer: HouseId,
) {
    if state.deescalation_offers.remove(&(offerer, acceptor)).is_none() {
        return;
    }
    let key = pair_key(acceptor, offerer);
    if let Some(last) = state.last_combat_between.get(&key)
        && state.turn.saturating_sub(*last) < DEESCALATION_COMBAT_LOCKOUT
    {
        return;
    }
    let next = match state.stance(acceptor, offerer) {
        DiplomaticState::Enemy => DiplomaticState::Hostile,
        DiplomaticState::Hostile | DiplomaticState::Neutral => DiplomaticState::Neutral,
    };
    state.set_stance(acceptor, offerer, next);
    info!(%acceptor, %offerer, ?next, "de-escalation accepted");
    sink.emit_public(EventKind::DiplomaticShift {
        source: acceptor,
        target: offerer,
        state: next,
    });
}

/// Reject a standing offer, starting the offerer's cooldown.
pub fn reject_deescalation(state: &mut GameState, rejector: HouseId, offerer: HouseId) {
    if state.deescalation_offers.remove(&(offerer, rejector)).is_some() {
        state.rejection_cooldown_until.insert(
            (offerer, rejector),
            state.turn.saturating_add(REJECTION_COOLDOWN),
        );
    }
}

/// Record a pact violation, applying dishonored and isolation statuses.
pub fn record_pact_violation(
    state: &mut GameState,
    sink: &mut EventSink,
    snapshot: &RuleSnapshot,
    violator: HouseId,
    victim: HouseId,
) {
    let turn = state.turn;
    state.pact_violations.push(PactViolation {
        violator,
        victim,
        turn,
    });
    if let Some(house) = state.houses.get_mut(&violator) {
        house.dishonored_turns = DISHONORED_TURNS;
        house.isolation_turns = ISOLATION_TURNS;
    }
    prestige::award(
        state,
        sink,
        snapshot,
        violator,
        None,
        PrestigeSource::PactViolation,
        "pact violation",
    );
}

/// Whether two co-located houses may fight at all, given their stance and
/// whether either carries a threatening order against the other.
///
/// Enemy houses fight on sight. Hostile houses need a threatening order to
/// force the issue. Neutral houses never fight, which is what lets two
/// houses jointly besiege a common enemy without turning on each other.
pub fn combat_permitted(
    stance: DiplomaticState,
    threatening_order_present: bool,
) -> bool {
    match stance {
        DiplomaticState::Enemy => true,
        DiplomaticState::Hostile => threatening_order_present,
        DiplomaticState::Neutral => false,
    }
}

/// Normalized pair key for symmetric bookkeeping.
pub fn pair_key(a: HouseId, b: HouseId) -> (HouseId, HouseId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::GameSetup;

    fn fixture() -> GameState {
        GameState::new_game(&GameSetup::default(), &RuleSnapshot::default()).unwrap()
    }

    #[test]
    fn provocative_order_makes_neutral_hostile() {
        let mut state = fixture();
        let mut sink = EventSink::new(1);
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        escalate_for_order(&mut state, &mut sink, a, b, &FleetVerb::Patrol);
        assert_eq!(state.stance(a, b), DiplomaticState::Hostile);
    }

    #[test]
    fn second_provocation_means_war() {
        let mut state = fixture();
        let mut sink = EventSink::new(1);
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        escalate_for_order(&mut state, &mut sink, a, b, &FleetVerb::Patrol);
        escalate_for_order(&mut state, &mut sink, a, b, &FleetVerb::SpyPlanet);
        assert_eq!(state.stance(a, b), DiplomaticState::Enemy);
    }

    #[test]
    fn threatening_order_jumps_straight_to_enemy() {
        let mut state = fixture();
        let mut sink = EventSink::new(1);
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        escalate_for_order(&mut state, &mut sink, a, b, &FleetVerb::Bombard);
        assert_eq!(state.stance(a, b), DiplomaticState::Enemy);
    }

    #[test]
    fn deescalation_needs_offer_then_acceptance() {
        let mut state = fixture();
        let mut sink = EventSink::new(1);
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        state.set_stance(a, b, DiplomaticState::Enemy);
        state.turn = 10;

        offer_deescalation(&mut state, &mut sink, a, b);
        accept_deescalation(&mut state, &mut sink, b, a);
        assert_eq!(state.stance(a, b), DiplomaticState::Hostile);
    }

    #[test]
    fn recent_combat_blocks_acceptance() {
        let mut state = fixture();
        let mut sink = EventSink::new(1);
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        state.set_stance(a, b, DiplomaticState::Enemy);
        state.turn = 10;
        state.last_combat_between.insert(pair_key(a, b), 9);

        offer_deescalation(&mut state, &mut sink, a, b);
        accept_deescalation(&mut state, &mut sink, b, a);
        assert_eq!(state.stance(a, b), DiplomaticState::Enemy);
    }

    #[test]
    fn rejection_starts_a_cooldown() {
        let mut state = fixture();
        let mut sink = EventSink::new(1);
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        state.set_stance(a, b, DiplomaticState::Hostile);
        state.turn = 5;

        offer_deescalation(&mut state, &mut sink, a, b);
        reject_deescalation(&mut state, b, a);
        // Immediate re-offer is swallowed by the cooldown.
        offer_deescalation(&mut state, &mut sink, a, b);
        assert!(state.deescalation_offers.is_empty());

        state.turn = 8;
        offer_deescalation(&mut state, &mut sink, a, b);
        assert_eq!(state.deescalation_offers.len(), 1);
    }

    #[test]
    fn neutral_houses_never_fight_hostile_need_cause() {
        assert!(!combat_permitted(DiplomaticState::Neutral, true));
        assert!(!combat_permitted(DiplomaticState::Hostile, false));
        assert!(combat_permitted(DiplomaticState::Hostile, true));
        assert!(combat_permitted(DiplomaticState::Enemy, false));
    }
}
