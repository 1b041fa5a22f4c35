//! Delta extraction between consecutive projections.
//!
//! At the end of every turn the engine projects each house's
//! [`PlayerState`] and diffs it against the previous turn's projection.
//! The resulting [`PlayerStateDelta`] is what actually crosses the wire;
//! applying it client-side must reproduce the new projection exactly
//! (checked by the round-trip tests below).
//!
//! [`PlayerState`]: ec4x_types::player_state::PlayerState
//! [`PlayerStateDelta`]: ec4x_types::player_state::PlayerStateDelta

use std::collections::BTreeMap;

use ec4x_types::player_state::{
    CollectionDelta, DiplomacyEntry, PlayerState, PlayerStateDelta,
};

/// Diff one keyed collection.
fn diff_collection<K: Ord + Copy, V: Clone + PartialEq>(
    previous: &BTreeMap<K, V>,
    next: &BTreeMap<K, V>,
) -> CollectionDelta<K, V> {
    let mut delta = CollectionDelta::default();
    for (key, value) in next {
        match previous.get(key) {
            None => delta.added.push(value.clone()),
            Some(old) if old != value => delta.updated.push(value.clone()),
            Some(_) => {}
        }
    }
    for key in previous.keys() {
        if !next.contains_key(key) {
            delta.removed.push(*key);
        }
    }
    delta
}

/// Replacement-table diff: `Some(next)` only when anything changed.
fn diff_table<T: Clone + PartialEq>(previous: &T, next: &T) -> Option<T> {
    (previous != next).then(|| next.clone())
}

/// Extract the delta that carries a client from `previous` to `next`.
pub fn diff_player_states(previous: &PlayerState, next: &PlayerState) -> PlayerStateDelta {
    let diplomacy = {
        let mut delta = CollectionDelta::default();
        for (key, state) in &next.diplomacy {
            match previous.diplomacy.get(key) {
                None => delta.added.push(DiplomacyEntry { key: *key, state: *state }),
                Some(old) if old != state => {
                    delta.updated.push(DiplomacyEntry { key: *key, state: *state });
                }
                Some(_) => {}
            }
        }
        for key in previous.diplomacy.keys() {
            if !next.diplomacy.contains_key(key) {
                delta.removed.push(*key);
            }
        }
        delta
    };

    PlayerStateDelta {
        house_id: next.house_id,
        turn: next.turn,
        config_hash: next.config_hash.clone(),
        house: (previous.house != next.house).then(|| next.house.clone()),
        own_colonies: diff_collection(&previous.own_colonies, &next.own_colonies),
        own_fleets: diff_collection(&previous.own_fleets, &next.own_fleets),
        own_squadrons: diff_collection(&previous.own_squadrons, &next.own_squadrons),
        own_ships: diff_collection(&previous.own_ships, &next.own_ships),
        own_ground_units: diff_collection(&previous.own_ground_units, &next.own_ground_units),
        own_facilities: diff_collection(&previous.own_facilities, &next.own_facilities),
        own_projects: diff_collection(&previous.own_projects, &next.own_projects),
        own_transfers: diff_collection(&previous.own_transfers, &next.own_transfers),
        visible_systems: diff_collection(&previous.visible_systems, &next.visible_systems),
        visible_colonies: diff_collection(&previous.visible_colonies, &next.visible_colonies),
        visible_fleets: diff_collection(&previous.visible_fleets, &next.visible_fleets),
        house_names: diff_table(&previous.house_names, &next.house_names),
        prestige: diff_table(&previous.prestige, &next.prestige),
        colony_counts: diff_table(&previous.colony_counts, &next.colony_counts),
        diplomacy,
        eliminated: diff_table(&previous.eliminated, &next.eliminated),
        events: next.events.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::projection;
    use crate::resolve;
    use crate::state::GameState;
    use ec4x_rules::{GameSetup, RuleSnapshot};
    use ec4x_types::ids::HouseId;
    use ec4x_types::player_state::apply_delta;
    use std::collections::BTreeMap as Map;

    #[test]
    fn delta_round_trips_over_resolved_turns() {
        let snapshot = RuleSnapshot::default();
        let mut state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();

        for house_raw in 0u32..4 {
            let house = HouseId::new(house_raw);
            let mut client = projection::player_state(&state, house, &[]);

            let mut authoritative = state.clone();
            for _ in 0..3 {
                let outcome =
                    resolve::advance_turn(&mut authoritative, &snapshot, &Map::new()).unwrap();
                let next = projection::player_state(&authoritative, house, &outcome.events);
                let delta = diff_player_states(&client, &next);
                apply_delta(&mut client, delta);
                assert_eq!(client, next, "client drifted for house {house}");
            }
        }
    }

    #[test]
    fn applying_the_same_delta_twice_is_idempotent() {
        let snapshot = RuleSnapshot::default();
        let mut state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        let house = HouseId::new(0);
        let mut client = projection::player_state(&state, house, &[]);

        let outcome = resolve::advance_turn(&mut state, &snapshot, &Map::new()).unwrap();
        let next = projection::player_state(&state, house, &outcome.events);
        let delta = diff_player_states(&client, &next);

        apply_delta(&mut client, delta.clone());
        apply_delta(&mut client, delta);
        assert_eq!(client, next);
    }

    #[test]
    fn unchanged_tables_are_omitted() {
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        let house = HouseId::new(0);
        let projected = projection::player_state(&state, house, &[]);
        let delta = diff_player_states(&projected, &projected);
        assert!(delta.house.is_none());
        assert!(delta.house_names.is_none());
        assert!(delta.own_colonies.is_empty());
        assert!(delta.visible_fleets.is_empty());
        assert!(delta.diplomacy.is_empty());
    }
}
