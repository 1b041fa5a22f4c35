//! The prestige ledger.
//!
//! Prestige is the primary victory metric. Every change is recorded as a
//! ledger entry on the house, and every non-achievement change is zero-sum:
//! the opposing house receives the exact negation. The per-game prestige
//! multiplier scales both sides identically, preserving the sum.

use tracing::debug;

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::PrestigeSource;
use ec4x_types::events::EventKind;
use ec4x_types::house::PrestigeEntry;
use ec4x_types::ids::HouseId;

use crate::events::EventSink;
use crate::state::GameState;

/// Apply a prestige event to `house`, and its negation to `opponent` when
/// the source is not an achievement category.
pub fn award(
    state: &mut GameState,
    sink: &mut EventSink,
    snapshot: &RuleSnapshot,
    house: HouseId,
    opponent: Option<HouseId>,
    source: PrestigeSource,
    reason: &str,
) {
    let base = snapshot.prestige.delta(source);
    let scaled = scale(base, state.prestige_multiplier);
    if scaled == 0 {
        return;
    }
    let turn = state.turn;

    apply_entry(state, house, source, scaled, reason, turn);
    sink.emit_public(EventKind::PrestigeChanged {
        house,
        source,
        delta: scaled,
    });

    if !snapshot.prestige.is_achievement(source)
        && let Some(opponent) = opponent
    {
        apply_entry(state, opponent, source, scaled.saturating_neg(), reason, turn);
        sink.emit_public(EventKind::PrestigeChanged {
            house: opponent,
            source,
            delta: scaled.saturating_neg(),
        });
    }
}

/// Apply an explicit delta outside the rule table (espionage descriptors
/// carry their own prestige values).
pub fn award_raw(
    state: &mut GameState,
    sink: &mut EventSink,
    house: HouseId,
    opponent: Option<HouseId>,
    source: PrestigeSource,
    delta: i64,
    reason: &str,
) {
    let scaled = scale(delta, state.prestige_multiplier);
    if scaled == 0 {
        return;
    }
    let turn = state.turn;
    apply_entry(state, house, source, scaled, reason, turn);
    sink.emit_public(EventKind::PrestigeChanged {
        house,
        source,
        delta: scaled,
    });
    if let Some(opponent) = opponent {
        apply_entry(state, opponent, source, scaled.saturating_neg(), reason, turn);
        sink.emit_public(EventKind::PrestigeChanged {
            house: opponent,
            source,
            delta: scaled.saturating_neg(),
        });
    }
}

fn apply_entry(
    state: &mut GameState,
    house: HouseId,
    source: PrestigeSource,
    delta: i64,
    reason: &str,
    turn: u32,
) {
    let Some(record) = state.houses.get_mut(&house) else {
        return;
    };
    record.prestige = record.prestige.saturating_add(delta);
    record.prestige_ledger.push(PrestigeEntry {
        source,
        delta,
        reason: reason.to_owned(),
        turn,
    });
    debug!(%house, ?source, delta, "prestige changed");
}

/// Scale a base delta by the per-game multiplier, preserving sign and
/// keeping the magnitude symmetric for zero-sum pairing.
///
/// Prestige deltas are small table constants, so the float round trip is
/// exact; the clamp guards pathological multipliers.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn scale(base: i64, multiplier: f64) -> i64 {
    if base == 0 {
        return 0;
    }
    let scaled = (base as f64 * multiplier).round();
    if scaled.abs() < 1.0 {
        // Never scale a real event to nothing.
        base.signum()
    } else if scaled >= i64::MAX as f64 {
        i64::MAX
    } else if scaled <= i64::MIN as f64 {
        i64::MIN
    } else {
        scaled as i64
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
    fn combat_prestige_is_zero_sum() {
        let (mut state, snapshot) = fixture();
        let mut sink = EventSink::new(1);
        let a = HouseId::new(0);
        let b = HouseId::new(1);
        let before: i64 = state.houses.values().map(|h| h.prestige).sum();

        award(
            &mut state,
            &mut sink,
            &snapshot,
            a,
            Some(b),
            PrestigeSource::SquadronDestroyed,
            "squadron destroyed in battle",
        );

        let after: i64 = state.houses.values().map(|h| h.prestige).sum();
        assert_eq!(before, after);
        assert!(state.houses.get(&a).unwrap().prestige > 0);
        assert!(state.houses.get(&b).unwrap().prestige < 0);
    }

    #[test]
    fn achievements_are_not_paired() {
        let (mut state, snapshot) = fixture();
        let mut sink = EventSink::new(1);
        let a = HouseId::new(0);
        let b = HouseId::new(1);

        award(
            &mut state,
            &mut sink,
            &snapshot,
            a,
            Some(b),
            PrestigeSource::ColonyEstablished,
            "colony established",
        );

        assert!(state.houses.get(&a).unwrap().prestige > 0);
        assert_eq!(state.houses.get(&b).unwrap().prestige, 0);
    }

    #[test]
    fn every_change_lands_in_the_ledger() {
        let (mut state, snapshot) = fixture();
        let mut sink = EventSink::new(3);
        let a = HouseId::new(0);
        award(
            &mut state,
            &mut sink,
            &snapshot,
            a,
            None,
            PrestigeSource::TechAdvance,
            "weapons research breakthrough",
        );
        let ledger = &state.houses.get(&a).unwrap().prestige_ledger;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].turn, 3);
        assert_eq!(ledger[0].source, PrestigeSource::TechAdvance);
    }
}
