//! Fog-of-war player projections and per-turn deltas.
//!
//! A [`PlayerState`] is what one house is allowed to know: its own entities
//! in full, everything else redacted to its intel quality. It is the unit
//! of state delivery to a client. A [`PlayerStateDelta`] is the diff between
//! two consecutive projections for the same house; applying it on the client
//! must be idempotent per turn.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::colony::Colony;
use crate::enums::{DiplomaticState, IntelQuality, PlanetClass, ShipClass};
use crate::events::GameEvent;
use crate::fleet::{Facility, Fleet, GroundUnit, Ship, Squadron};
use crate::house::House;
use crate::ids::{
    FacilityId, FleetId, GroundUnitId, HouseId, ProjectId, ShipId, SquadronId, SystemId,
    TransferId,
};
use crate::projects::{ConstructionProject, PopulationInTransit};
use crate::system::StarSystem;

/// A foreign system as this house knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleSystem {
    /// The system.
    pub system_id: SystemId,
    /// Last turn this knowledge was updated.
    pub ltu: u32,
    /// Whether a colony is known to exist there.
    pub has_colony: bool,
    /// The colony's owner, if known.
    pub colony_owner: Option<HouseId>,
    /// Foreign fleet presence known there, per house.
    pub fleets_present: BTreeMap<HouseId, u32>,
}

/// A foreign colony as this house knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleColony {
    /// The colony's system.
    pub system_id: SystemId,
    /// Last turn this knowledge was updated.
    pub ltu: u32,
    /// The quality tier backing this view.
    pub quality: IntelQuality,
    /// Known owner.
    pub owner: HouseId,
    /// Known planet class.
    pub planet_class: PlanetClass,
    /// Population units; rough below Spy quality.
    pub population_units: Option<u32>,
    /// Industrial units; rough below Spy quality.
    pub industrial_units: Option<u32>,
    /// Shield level; Spy quality only.
    pub shield_level: Option<u8>,
    /// Garrison size; Scouted and above.
    pub garrison: Option<u32>,
}

/// A foreign fleet as this house knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleFleet {
    /// The fleet.
    pub fleet_id: FleetId,
    /// Last turn this knowledge was updated.
    pub ltu: u32,
    /// The quality tier backing this view.
    pub quality: IntelQuality,
    /// Known owner.
    pub owner: HouseId,
    /// Last known location.
    pub location: SystemId,
    /// Rough hull count (Adjacent quality).
    pub ship_count: u32,
    /// Full composition (Scouted and above).
    pub composition: Option<BTreeMap<ShipClass, u32>>,
}

/// Everything one house is allowed to know, at one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// The viewing house.
    pub house_id: HouseId,
    /// The turn this projection reflects.
    pub turn: u32,
    /// Hash of the rule snapshot this game runs under. Clients must
    /// refuse to apply state carrying an unexpected hash.
    pub config_hash: String,
    /// The viewing house in full (Perfect quality).
    pub house: House,
    /// The full starmap geometry (public knowledge from game start).
    pub map: BTreeMap<SystemId, StarSystem>,
    /// Own colonies in full.
    pub own_colonies: BTreeMap<SystemId, Colony>,
    /// Own fleets in full.
    pub own_fleets: BTreeMap<FleetId, Fleet>,
    /// Own squadrons in full.
    pub own_squadrons: BTreeMap<SquadronId, Squadron>,
    /// Own ships in full.
    pub own_ships: BTreeMap<ShipId, Ship>,
    /// Own ground units in full.
    pub own_ground_units: BTreeMap<GroundUnitId, GroundUnit>,
    /// Own facilities in full.
    pub own_facilities: BTreeMap<FacilityId, Facility>,
    /// Own projects in full.
    pub own_projects: BTreeMap<ProjectId, ConstructionProject>,
    /// Own transfers in full.
    pub own_transfers: BTreeMap<TransferId, PopulationInTransit>,
    /// Foreign systems as known.
    pub visible_systems: BTreeMap<SystemId, VisibleSystem>,
    /// Foreign colonies as known.
    pub visible_colonies: BTreeMap<SystemId, VisibleColony>,
    /// Foreign fleets as known.
    pub visible_fleets: BTreeMap<FleetId, VisibleFleet>,
    /// Display names of every house.
    pub house_names: BTreeMap<HouseId, String>,
    /// Public prestige standings.
    pub prestige: BTreeMap<HouseId, i64>,
    /// Public colony counts.
    pub colony_counts: BTreeMap<HouseId, u32>,
    /// Known diplomatic pairs, keyed `(source << 16) | target`.
    pub diplomacy: BTreeMap<u32, DiplomaticState>,
    /// Eliminated houses.
    pub eliminated: BTreeSet<HouseId>,
    /// Events visible to this house this turn.
    pub events: Vec<GameEvent>,
}

/// Add/update/remove sets for one keyed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDelta<K, V> {
    /// Entries new since the previous turn. Insert or replace by key.
    pub added: Vec<V>,
    /// Entries changed since the previous turn. Replace by key.
    pub updated: Vec<V>,
    /// Keys gone since the previous turn. Delete by key.
    pub removed: Vec<K>,
}

impl<K, V> Default for CollectionDelta<K, V> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<K, V> CollectionDelta<K, V> {
    /// Whether this delta carries no changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// A packed diplomacy entry for delta transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomacyEntry {
    /// Packed `(source << 16) | target` key.
    pub key: u32,
    /// The stance for that pair.
    pub state: DiplomaticState,
}

/// The per-turn diff between two consecutive projections for one house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStateDelta {
    /// The viewing house.
    pub house_id: HouseId,
    /// The turn this delta advances the client to.
    pub turn: u32,
    /// Rule snapshot hash; must match the client's full state.
    pub config_hash: String,
    /// The full house record, when anything in it changed.
    pub house: Option<House>,
    /// Own colony changes.
    pub own_colonies: CollectionDelta<SystemId, Colony>,
    /// Own fleet changes.
    pub own_fleets: CollectionDelta<FleetId, Fleet>,
    /// Own squadron changes.
    pub own_squadrons: CollectionDelta<SquadronId, Squadron>,
    /// Own ship changes.
    pub own_ships: CollectionDelta<ShipId, Ship>,
    /// Own ground unit changes.
    pub own_ground_units: CollectionDelta<GroundUnitId, GroundUnit>,
    /// Own facility changes.
    pub own_facilities: CollectionDelta<FacilityId, Facility>,
    /// Own project changes.
    pub own_projects: CollectionDelta<ProjectId, ConstructionProject>,
    /// Own transfer changes.
    pub own_transfers: CollectionDelta<TransferId, PopulationInTransit>,
    /// Visible system changes.
    pub visible_systems: CollectionDelta<SystemId, VisibleSystem>,
    /// Visible colony changes.
    pub visible_colonies: CollectionDelta<SystemId, VisibleColony>,
    /// Visible fleet changes.
    pub visible_fleets: CollectionDelta<FleetId, VisibleFleet>,
    /// Replacement house-name table, when changed.
    pub house_names: Option<BTreeMap<HouseId, String>>,
    /// Replacement prestige table, when changed.
    pub prestige: Option<BTreeMap<HouseId, i64>>,
    /// Replacement colony-count table, when changed.
    pub colony_counts: Option<BTreeMap<HouseId, u32>>,
    /// Diplomacy pair changes.
    pub diplomacy: CollectionDelta<u32, DiplomacyEntry>,
    /// Replacement eliminated set, when changed.
    pub eliminated: Option<BTreeSet<HouseId>>,
    /// Events visible to this house this turn.
    pub events: Vec<GameEvent>,
}

/// Apply one collection delta onto a keyed map.
fn apply_collection<K: Ord, V>(
    target: &mut BTreeMap<K, V>,
    delta: CollectionDelta<K, V>,
    key_of: impl Fn(&V) -> K,
) {
    for value in delta.added {
        target.insert(key_of(&value), value);
    }
    for value in delta.updated {
        target.insert(key_of(&value), value);
    }
    for key in delta.removed {
        target.remove(&key);
    }
}

/// Apply a delta to a client-held projection in place.
///
/// Idempotent per turn: applying the same delta twice leaves the state
/// identical, and a delta for a turn at or before the state's own turn is
/// a no-op apart from the event list refresh.
pub fn apply_delta(state: &mut PlayerState, delta: PlayerStateDelta) {
    if delta.turn < state.turn {
        return;
    }
    state.turn = delta.turn;
    state.config_hash = delta.config_hash;
    if let Some(house) = delta.house {
        state.house = house;
    }
    apply_collection(&mut state.own_colonies, delta.own_colonies, |c| c.system_id);
    apply_collection(&mut state.own_fleets, delta.own_fleets, |f| f.id);
    apply_collection(&mut state.own_squadrons, delta.own_squadrons, |s| s.id);
    apply_collection(&mut state.own_ships, delta.own_ships, |s| s.id);
    apply_collection(&mut state.own_ground_units, delta.own_ground_units, |g| g.id);
    apply_collection(&mut state.own_facilities, delta.own_facilities, |f| f.id);
    apply_collection(&mut state.own_projects, delta.own_projects, |p| p.id);
    apply_collection(&mut state.own_transfers, delta.own_transfers, |t| t.id);
    apply_collection(&mut state.visible_systems, delta.visible_systems, |v| {
        v.system_id
    });
    apply_collection(&mut state.visible_colonies, delta.visible_colonies, |v| {
        v.system_id
    });
    apply_collection(&mut state.visible_fleets, delta.visible_fleets, |v| v.fleet_id);
    if let Some(names) = delta.house_names {
        state.house_names = names;
    }
    if let Some(prestige) = delta.prestige {
        state.prestige = prestige;
    }
    if let Some(counts) = delta.colony_counts {
        state.colony_counts = counts;
    }
    {
        let mut as_map: BTreeMap<u32, DiplomaticState> = state.diplomacy.clone();
        for entry in delta
            .diplomacy
            .added
            .iter()
            .chain(delta.diplomacy.updated.iter())
        {
            as_map.insert(entry.key, entry.state);
        }
        for key in &delta.diplomacy.removed {
            as_map.remove(key);
        }
        state.diplomacy = as_map;
    }
    if let Some(eliminated) = delta.eliminated {
        state.eliminated = eliminated;
    }
    state.events = delta.events;
}
