//! The authoritative game state.
//!
//! [`GameState`] bundles every arena, the reverse indices, and the handful
//! of per-game scalars (seed, dynamic multipliers, diplomatic bookkeeping).
//! All cross-entity mutation goes through the helper methods here; they are
//! the only code allowed to touch the reverse indices, which is what keeps
//! `validate_indices` empty after every phase.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use ec4x_rules::{GameSetup, RuleSnapshot};
use ec4x_types::colony::Colony;
use ec4x_types::enums::{DiplomaticState, GroundUnitKind, PlanetClass, ShipClass, ShipState};
use ec4x_types::fleet::{Cargo, Facility, Fleet, GroundUnit, Ship, ShipStats, Squadron};
use ec4x_types::house::House;
use ec4x_types::ids::{
    EffectId, FacilityId, FleetId, GroundUnitId, HouseId, ProjectId, ShipId, SquadronId,
    SystemId, TransferId,
};
use ec4x_types::projects::{ConstructionProject, OngoingEffect, PopulationInTransit};
use ec4x_world::Starmap;

use crate::arena::Arena;
use crate::error::EngineError;

/// A bombard/invade/blitz order queued for the next Conflict Phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedAssault {
    /// The attacking house.
    pub attacker: HouseId,
    /// The fleet executing the assault.
    pub fleet: FleetId,
    /// The target colony's system.
    pub system: SystemId,
    /// What kind of assault.
    pub kind: AssaultKind,
}

/// The three planetary assault kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssaultKind {
    /// Orbital bombardment of industry.
    Bombard,
    /// Ground invasion by embarked marines.
    Invade,
    /// Bombardment followed by invasion in the same turn.
    Blitz,
}

/// A recorded pact violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PactViolation {
    /// The violating house.
    pub violator: HouseId,
    /// The wronged house.
    pub victim: HouseId,
    /// The turn of the violation.
    pub turn: u32,
}

/// The reverse indices.
///
/// Maintained transactionally by the mutation helpers on [`GameState`];
/// nothing else writes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indices {
    /// Fleets present per system.
    pub fleets_by_location: BTreeMap<SystemId, BTreeSet<FleetId>>,
    /// Fleets per owning house.
    pub fleets_by_owner: BTreeMap<HouseId, BTreeSet<FleetId>>,
    /// Colony systems per owning house.
    pub colonies_by_owner: BTreeMap<HouseId, BTreeSet<SystemId>>,
    /// Ships per squadron.
    pub ships_by_squadron: BTreeMap<SquadronId, BTreeSet<ShipId>>,
    /// Ships per owning house.
    pub ships_by_house: BTreeMap<HouseId, BTreeSet<ShipId>>,
}

/// The authoritative state of one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Current turn. Turn 0 is setup; the first resolved turn is 1.
    pub turn: u32,
    /// The game seed all per-turn streams derive from.
    pub seed: u64,
    /// Hash of the rule snapshot this game runs under.
    pub config_hash: String,
    /// The starmap.
    pub map: Starmap,
    /// All houses. Never removed; elimination is a flag.
    pub houses: BTreeMap<HouseId, House>,
    /// All colonies, keyed by system.
    pub colonies: BTreeMap<SystemId, Colony>,
    /// Fleet arena.
    pub fleets: Arena<FleetId, Fleet>,
    /// Squadron arena.
    pub squadrons: Arena<SquadronId, Squadron>,
    /// Ship arena.
    pub ships: Arena<ShipId, Ship>,
    /// Ground unit arena.
    pub ground_units: Arena<GroundUnitId, GroundUnit>,
    /// Facility arena.
    pub facilities: Arena<FacilityId, Facility>,
    /// Construction project arena.
    pub projects: Arena<ProjectId, ConstructionProject>,
    /// Population transfer arena.
    pub transfers: Arena<TransferId, PopulationInTransit>,
    /// Ongoing effect arena.
    pub effects: Arena<EffectId, OngoingEffect>,
    /// The reverse indices.
    pub indices: Indices,
    /// Projects that finished last Maintenance, awaiting commission.
    pub pending_commissions: Vec<ProjectId>,
    /// Assaults queued for the next Conflict Phase.
    pub queued_assaults: Vec<QueuedAssault>,
    /// Standing de-escalation offers: `(from, to)` -> turn offered.
    pub deescalation_offers: BTreeMap<(HouseId, HouseId), u32>,
    /// Offer cooldowns after a rejection: `(from, to)` -> turn it lifts.
    pub rejection_cooldown_until: BTreeMap<(HouseId, HouseId), u32>,
    /// Last turn two houses fought, keyed `(min, max)`.
    pub last_combat_between: BTreeMap<(HouseId, HouseId), u32>,
    /// Recorded pact violations.
    pub pact_violations: Vec<PactViolation>,
    /// Consecutive maintenance overdraft steps per house.
    pub overdraft_steps: BTreeMap<HouseId, u32>,
    /// Active counter-intel sweeps: house -> last turn the sweep covers.
    pub active_sweeps: BTreeMap<HouseId, u32>,
    /// Recoverable battlefield wreckage per system, in PP.
    pub wreckage: BTreeMap<SystemId, i64>,
    /// Per-game population growth multiplier, fixed at creation.
    pub growth_multiplier: f64,
    /// Per-game prestige multiplier, fixed at creation.
    pub prestige_multiplier: f64,
    /// Prestige at which a house wins outright, from the scenario.
    pub victory_prestige_target: Option<i64>,
    /// Hard turn limit, from the scenario.
    pub victory_turn_limit: Option<u32>,
    /// The winner, once the game has ended.
    pub winner: Option<HouseId>,
    /// Whether the game has ended.
    pub finished: bool,
}

impl GameState {
    // -------------------------------------------------------------------
    // Game creation
    // -------------------------------------------------------------------

    /// Create a new game deterministically from `(setup, snapshot)`.
    ///
    /// The same inputs always produce an identical state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Rules`] if the setup is invalid, or
    /// [`EngineError::World`] if map generation fails.
    pub fn new_game(setup: &GameSetup, snapshot: &RuleSnapshot) -> Result<Self, EngineError> {
        setup.validate()?;
        let config_hash = snapshot.config_hash()?;

        let players = u32::try_from(setup.players.len()).unwrap_or(2);
        let mut starmap_table = snapshot.starmap.clone();
        if setup.rings.is_some() {
            starmap_table.rings_override = setup.rings;
        }
        let generated = ec4x_world::generate(players, setup.seed, &starmap_table)?;

        let system_count = u32::try_from(generated.starmap.len()).unwrap_or(u32::MAX);
        let systems_per_player = f64::from(system_count) / f64::from(players.max(1));
        let ratio = systems_per_player / snapshot.economy.baseline_systems_per_player;
        let multiplier = ratio.sqrt().clamp(
            snapshot.economy.growth_multiplier_min,
            snapshot.economy.growth_multiplier_max,
        );

        let mut state = Self {
            turn: 0,
            seed: setup.seed,
            config_hash,
            map: generated.starmap,
            houses: BTreeMap::new(),
            colonies: BTreeMap::new(),
            fleets: Arena::new(),
            squadrons: Arena::new(),
            ships: Arena::new(),
            ground_units: Arena::new(),
            facilities: Arena::new(),
            projects: Arena::new(),
            transfers: Arena::new(),
            effects: Arena::new(),
            indices: Indices::default(),
            pending_commissions: Vec::new(),
            queued_assaults: Vec::new(),
            deescalation_offers: BTreeMap::new(),
            rejection_cooldown_until: BTreeMap::new(),
            last_combat_between: BTreeMap::new(),
            pact_violations: Vec::new(),
            overdraft_steps: BTreeMap::new(),
            active_sweeps: BTreeMap::new(),
            wreckage: BTreeMap::new(),
            growth_multiplier: multiplier,
            prestige_multiplier: multiplier,
            victory_prestige_target: setup.victory.prestige_target,
            victory_turn_limit: setup.victory.turn_limit,
            winner: None,
            finished: false,
        };

        for (house_id, homeworld) in &generated.homeworlds {
            let slot_index = usize::try_from(house_id.into_inner()).unwrap_or(usize::MAX);
            let slot_name = setup
                .players
                .get(slot_index)
                .map_or_else(|| format!("House {house_id}"), |slot| slot.name.clone());
            let mut house = House::new(*house_id, slot_name, setup.starting_treasury);
            for (field, level) in &setup.homeworld.starting_tech {
                house.tech.levels.insert(*field, *level);
            }
            state.houses.insert(*house_id, house);

            state.settle_homeworld(*house_id, *homeworld, setup, snapshot);
        }

        info!(
            players,
            systems = state.map.len(),
            growth_multiplier = state.growth_multiplier,
            "game created"
        );
        Ok(state)
    }

    /// Apply the homeworld template for one house.
    fn settle_homeworld(
        &mut self,
        house_id: HouseId,
        homeworld: SystemId,
        setup: &GameSetup,
        snapshot: &RuleSnapshot,
    ) {
        let template = &setup.homeworld;
        let mut colony = Colony::found(
            homeworld,
            house_id,
            PlanetClass::Eden,
            8,
            template.population_units,
        );
        colony.industrial_units = template.industrial_units;
        self.insert_colony(colony);

        for kind in &template.facilities {
            let spec = snapshot.facilities.spec(*kind);
            let facility_id = self.facilities.create(|id| Facility {
                id,
                kind: *kind,
                colony: homeworld,
                effective_docks: spec.docks,
                fixed_orbit: true,
                crippled: false,
            });
            self.attach_facility(homeworld, *kind, facility_id);
        }

        for _ in 0..template.armies {
            let unit = self.ground_units.create(|id| GroundUnit {
                id,
                owner: house_id,
                system_id: homeworld,
                kind: GroundUnitKind::Army,
            });
            if let Some(colony) = self.colonies.get_mut(&homeworld) {
                colony.armies.push(unit);
            }
        }
        for _ in 0..template.marines {
            let unit = self.ground_units.create(|id| GroundUnit {
                id,
                owner: house_id,
                system_id: homeworld,
                kind: GroundUnitKind::Marine,
            });
            if let Some(colony) = self.colonies.get_mut(&homeworld) {
                colony.marines.push(unit);
            }
        }

        let fleet_id = self.create_fleet(house_id, homeworld);
        for squadron_template in &template.starting_squadrons {
            let wep = self
                .houses
                .get(&house_id)
                .map_or(0, |h| h.tech.level(ec4x_types::enums::TechField::Wep));
            let squadron_id = self.create_squadron(
                house_id,
                squadron_template.flagship,
                snapshot,
                wep,
            );
            for escort in &squadron_template.escorts {
                let _ = self.create_ship(house_id, squadron_id, *escort, snapshot, wep);
            }
            self.add_squadron_to_fleet(fleet_id, squadron_id);
        }
    }

    /// Register a facility on the right colony list.
    pub fn attach_facility(
        &mut self,
        system: SystemId,
        kind: ec4x_types::enums::FacilityKind,
        facility: FacilityId,
    ) {
        use ec4x_types::enums::FacilityKind;
        if let Some(colony) = self.colonies.get_mut(&system) {
            match kind {
                FacilityKind::Spaceport => colony.spaceports.push(facility),
                FacilityKind::Shipyard => colony.shipyards.push(facility),
                FacilityKind::Drydock => colony.drydocks.push(facility),
                FacilityKind::Starbase => colony.starbases.push(facility),
            }
        }
    }

    // -------------------------------------------------------------------
    // Colony operations
    // -------------------------------------------------------------------

    /// Insert a colony and index it.
    pub fn insert_colony(&mut self, colony: Colony) {
        let owner = colony.owner;
        let system = colony.system_id;
        self.colonies.insert(system, colony);
        self.indices
            .colonies_by_owner
            .entry(owner)
            .or_default()
            .insert(system);
    }

    /// Remove a colony (population loss), cleaning up its index entry.
    ///
    /// Ground units and facilities tied to the colony die with it.
    pub fn remove_colony(&mut self, system: SystemId) -> Option<Colony> {
        let colony = self.colonies.remove(&system)?;
        if let Some(set) = self.indices.colonies_by_owner.get_mut(&colony.owner) {
            set.remove(&system);
        }
        for unit in colony
            .armies
            .iter()
            .chain(colony.marines.iter())
            .chain(colony.batteries.iter())
        {
            self.ground_units.delete(*unit);
        }
        for facility in colony.facilities().collect::<Vec<_>>() {
            self.facilities.delete(facility);
        }
        Some(colony)
    }

    /// Transfer colony ownership atomically, rewriting the reverse index.
    ///
    /// The caller has already resolved the ground battle; this helper only
    /// moves the record. Surviving defender assets were removed by combat.
    pub fn update_colony_owner(&mut self, system: SystemId, old: HouseId, new: HouseId) {
        if let Some(colony) = self.colonies.get_mut(&system) {
            colony.owner = new;
        }
        if let Some(set) = self.indices.colonies_by_owner.get_mut(&old) {
            set.remove(&system);
        }
        self.indices
            .colonies_by_owner
            .entry(new)
            .or_default()
            .insert(system);
    }

    // -------------------------------------------------------------------
    // Fleet tree operations
    // -------------------------------------------------------------------

    /// Create an empty fleet and index it.
    pub fn create_fleet(&mut self, owner: HouseId, location: SystemId) -> FleetId {
        let id = self.fleets.create(|id| Fleet::new(id, owner, location));
        self.indices
            .fleets_by_location
            .entry(location)
            .or_default()
            .insert(id);
        self.indices
            .fleets_by_owner
            .entry(owner)
            .or_default()
            .insert(id);
        id
    }

    /// Delete a fleet, unindexing it. Squadrons must already be detached.
    pub fn delete_fleet(&mut self, id: FleetId) {
        let Some(fleet) = self.fleets.delete(id) else {
            return;
        };
        if let Some(set) = self.indices.fleets_by_location.get_mut(&fleet.location) {
            set.remove(&id);
        }
        if let Some(set) = self.indices.fleets_by_owner.get_mut(&fleet.owner) {
            set.remove(&id);
        }
    }

    /// Move a fleet to a new system, maintaining the location index.
    pub fn move_fleet(&mut self, id: FleetId, to: SystemId) {
        let Some(fleet) = self.fleets.get_mut(id) else {
            return;
        };
        let from = fleet.location;
        fleet.location = to;
        if let Some(set) = self.indices.fleets_by_location.get_mut(&from) {
            set.remove(&id);
        }
        self.indices
            .fleets_by_location
            .entry(to)
            .or_default()
            .insert(id);
    }

    /// Create a squadron led by a newly commissioned flagship.
    pub fn create_squadron(
        &mut self,
        house: HouseId,
        flagship_class: ShipClass,
        snapshot: &RuleSnapshot,
        commissioned_wep: u8,
    ) -> SquadronId {
        let squadron_id = self.squadrons.create(|id| Squadron {
            id,
            house_id: house,
            flagship: ShipId::new(0),
            ships: Vec::new(),
            destroyed: false,
        });
        let flagship = self.create_ship(house, squadron_id, flagship_class, snapshot, commissioned_wep);
        if let Some(squadron) = self.squadrons.get_mut(squadron_id) {
            squadron.flagship = flagship;
        }
        squadron_id
    }

    /// Commission a ship into a squadron, updating all indices.
    pub fn create_ship(
        &mut self,
        house: HouseId,
        squadron: SquadronId,
        class: ShipClass,
        snapshot: &RuleSnapshot,
        commissioned_wep: u8,
    ) -> ShipId {
        let spec = snapshot.ships.spec(class);
        let ship_id = self.ships.create(|id| Ship {
            id,
            house_id: house,
            squadron_id: squadron,
            class,
            stats: ShipStats {
                attack: spec.attack,
                defense: spec.defense,
                command_cost: spec.command_cost,
                command_rating: spec.command_rating,
                maintenance: spec.maintenance,
                build_cost: spec.build_cost,
                commissioned_wep,
            },
            state: ShipState::Undamaged,
            cargo: Cargo::Empty,
        });
        if let Some(squadron) = self.squadrons.get_mut(squadron) {
            squadron.ships.push(ship_id);
        }
        self.indices
            .ships_by_squadron
            .entry(squadron)
            .or_default()
            .insert(ship_id);
        self.indices
            .ships_by_house
            .entry(house)
            .or_default()
            .insert(ship_id);
        ship_id
    }

    /// Destroy a ship. Destroying a flagship destroys its whole squadron;
    /// the destroyed squadron's ID is returned so combat can report it.
    pub fn destroy_ship(&mut self, id: ShipId) -> Option<SquadronId> {
        let Some(ship) = self.ships.delete(id) else {
            return None;
        };
        if let Some(set) = self.indices.ships_by_squadron.get_mut(&ship.squadron_id) {
            set.remove(&id);
        }
        if let Some(set) = self.indices.ships_by_house.get_mut(&ship.house_id) {
            set.remove(&id);
        }
        let mut flagship_died = false;
        if let Some(squadron) = self.squadrons.get_mut(ship.squadron_id) {
            squadron.ships.retain(|s| *s != id);
            flagship_died = squadron.flagship == id;
            if flagship_died {
                squadron.destroyed = true;
            }
        }
        if flagship_died {
            self.destroy_squadron(ship.squadron_id);
            return Some(ship.squadron_id);
        }
        None
    }

    /// Destroy a squadron and every ship still in it.
    pub fn destroy_squadron(&mut self, id: SquadronId) {
        let Some(squadron) = self.squadrons.delete(id) else {
            return;
        };
        for ship_id in squadron.ships {
            if let Some(ship) = self.ships.delete(ship_id) {
                if let Some(set) = self.indices.ships_by_house.get_mut(&ship.house_id) {
                    set.remove(&ship_id);
                }
            }
        }
        self.indices.ships_by_squadron.remove(&id);
        // Detach from whichever fleet carried it.
        let carrying: Vec<FleetId> = self
            .fleets
            .iter()
            .filter(|(_, f)| f.squadrons.contains(&id))
            .map(|(fid, _)| fid)
            .collect();
        for fleet_id in carrying {
            if let Some(fleet) = self.fleets.get_mut(fleet_id) {
                fleet.squadrons.retain(|s| *s != id);
            }
        }
        // Colony fighter lists may also reference it.
        for colony in self.colonies.values_mut() {
            colony.fighter_squadron_ids.retain(|s| *s != id);
        }
    }

    /// Move a ship between squadrons of the same house.
    ///
    /// The caller checks command capacity first; this helper only rewires.
    pub fn transfer_ship(&mut self, ship_id: ShipId, to: SquadronId) {
        let Some(ship) = self.ships.get_mut(ship_id) else {
            return;
        };
        let from = ship.squadron_id;
        if from == to {
            return;
        }
        ship.squadron_id = to;
        if let Some(squadron) = self.squadrons.get_mut(from) {
            squadron.ships.retain(|s| *s != ship_id);
        }
        if let Some(squadron) = self.squadrons.get_mut(to) {
            squadron.ships.push(ship_id);
        }
        if let Some(set) = self.indices.ships_by_squadron.get_mut(&from) {
            set.remove(&ship_id);
        }
        self.indices
            .ships_by_squadron
            .entry(to)
            .or_default()
            .insert(ship_id);
    }

    /// Attach a squadron to a fleet.
    pub fn add_squadron_to_fleet(&mut self, fleet: FleetId, squadron: SquadronId) {
        if let Some(fleet) = self.fleets.get_mut(fleet)
            && !fleet.squadrons.contains(&squadron)
        {
            fleet.squadrons.push(squadron);
        }
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Fleets at a system, ascending.
    pub fn fleets_at(&self, system: SystemId) -> Vec<FleetId> {
        self.indices
            .fleets_by_location
            .get(&system)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Fleets owned by a house, ascending.
    pub fn fleets_of(&self, house: HouseId) -> Vec<FleetId> {
        self.indices
            .fleets_by_owner
            .get(&house)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Colony systems owned by a house, ascending.
    pub fn colonies_of(&self, house: HouseId) -> Vec<SystemId> {
        self.indices
            .colonies_by_owner
            .get(&house)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether any ship in the fleet is crippled.
    pub fn fleet_has_crippled(&self, fleet: FleetId) -> bool {
        let Some(fleet) = self.fleets.get(fleet) else {
            return false;
        };
        fleet.squadrons.iter().any(|squadron_id| {
            self.squadrons.get(*squadron_id).is_some_and(|squadron| {
                squadron.ships.iter().any(|ship_id| {
                    self.ships
                        .get(*ship_id)
                        .is_some_and(|ship| ship.state == ShipState::Crippled)
                })
            })
        })
    }

    /// Sum of member command costs and the flagship's command rating.
    pub fn squadron_command_usage(&self, squadron: SquadronId) -> (u32, u32) {
        let Some(squadron) = self.squadrons.get(squadron) else {
            return (0, 0);
        };
        let rating = self
            .ships
            .get(squadron.flagship)
            .map_or(0, |flagship| flagship.stats.command_rating);
        let cost = squadron
            .ships
            .iter()
            .filter(|s| **s != squadron.flagship)
            .filter_map(|s| self.ships.get(*s))
            .map(|ship| ship.stats.command_cost)
            .fold(0u32, u32::saturating_add);
        (cost, rating)
    }

    /// The diplomatic stance between two houses (symmetric by invariant).
    pub fn stance(&self, a: HouseId, b: HouseId) -> DiplomaticState {
        self.houses
            .get(&a)
            .map_or(DiplomaticState::Neutral, |house| house.stance_toward(b))
    }

    /// Set the stance symmetrically on both houses.
    pub fn set_stance(&mut self, a: HouseId, b: HouseId, state: DiplomaticState) {
        if let Some(house) = self.houses.get_mut(&a) {
            house.diplomatic_relations.insert(b, state);
        }
        if let Some(house) = self.houses.get_mut(&b) {
            house.diplomatic_relations.insert(a, state);
        }
    }

    /// Houses still in the game, ascending.
    pub fn live_houses(&self) -> Vec<HouseId> {
        self.houses
            .iter()
            .filter(|(_, house)| !house.eliminated)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Total industrial units across a house's colonies.
    pub fn total_iu(&self, house: HouseId) -> u32 {
        self.colonies_of(house)
            .iter()
            .filter_map(|system| self.colonies.get(system))
            .map(|colony| colony.industrial_units)
            .fold(0u32, u32::saturating_add)
    }

    /// A fleet in guard or active posture at `system` owned by `house`.
    pub fn house_fleets_at(&self, house: HouseId, system: SystemId) -> Vec<FleetId> {
        self.fleets_at(system)
            .into_iter()
            .filter(|id| self.fleets.get(*id).is_some_and(|f| f.owner == house))
            .collect()
    }

    // -------------------------------------------------------------------
    // Invariant validation
    // -------------------------------------------------------------------

    /// Check every structural invariant, returning all violations found.
    ///
    /// Must return empty after every phase; the resolver asserts this in
    /// debug builds and aborts the turn on failure.
    pub fn validate_indices(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (system, fleet_set) in &self.indices.fleets_by_location {
            for fleet_id in fleet_set {
                match self.fleets.get(*fleet_id) {
                    None => violations.push(format!("fleets_by_location[{system}] holds dead fleet {fleet_id}")),
                    Some(fleet) if fleet.location != *system => violations.push(format!(
                        "fleet {fleet_id} indexed at {system} but located at {}",
                        fleet.location
                    )),
                    Some(_) => {}
                }
            }
        }
        for (owner, fleet_set) in &self.indices.fleets_by_owner {
            for fleet_id in fleet_set {
                match self.fleets.get(*fleet_id) {
                    None => violations.push(format!("fleets_by_owner[{owner}] holds dead fleet {fleet_id}")),
                    Some(fleet) if fleet.owner != *owner => violations.push(format!(
                        "fleet {fleet_id} indexed under {owner} but owned by {}",
                        fleet.owner
                    )),
                    Some(_) => {}
                }
            }
        }
        for (fleet_id, fleet) in self.fleets.iter() {
            let located = self
                .indices
                .fleets_by_location
                .get(&fleet.location)
                .is_some_and(|set| set.contains(&fleet_id));
            if !located {
                violations.push(format!("fleet {fleet_id} missing from location index"));
            }
            for squadron_id in &fleet.squadrons {
                match self.squadrons.get(*squadron_id) {
                    None => violations.push(format!("fleet {fleet_id} holds dead squadron {squadron_id}")),
                    Some(squadron) if squadron.house_id != fleet.owner => violations.push(
                        format!("fleet {fleet_id} holds foreign squadron {squadron_id}"),
                    ),
                    Some(_) => {}
                }
            }
        }

        for (owner, systems) in &self.indices.colonies_by_owner {
            for system in systems {
                match self.colonies.get(system) {
                    None => violations.push(format!("colonies_by_owner[{owner}] holds dead colony {system}")),
                    Some(colony) if colony.owner != *owner => violations.push(format!(
                        "colony {system} indexed under {owner} but owned by {}",
                        colony.owner
                    )),
                    Some(_) => {}
                }
            }
        }

        for (squadron_id, squadron) in self.squadrons.iter() {
            for ship_id in &squadron.ships {
                match self.ships.get(*ship_id) {
                    None => violations.push(format!("squadron {squadron_id} holds dead ship {ship_id}")),
                    Some(ship) if ship.squadron_id != squadron_id => violations.push(format!(
                        "ship {ship_id} in squadron {squadron_id} list but assigned to {}",
                        ship.squadron_id
                    )),
                    Some(_) => {}
                }
            }
            match self.ships.get(squadron.flagship) {
                None => violations.push(format!("squadron {squadron_id} flagship is dead")),
                Some(flagship) if flagship.house_id != squadron.house_id => violations.push(
                    format!("squadron {squadron_id} house differs from flagship's"),
                ),
                Some(_) => {}
            }
            let (cost, rating) = self.squadron_command_usage(squadron_id);
            if cost > rating {
                violations.push(format!(
                    "squadron {squadron_id} command cost {cost} exceeds rating {rating}"
                ));
            }
        }

        for (ship_id, ship) in self.ships.iter() {
            let indexed = self
                .indices
                .ships_by_squadron
                .get(&ship.squadron_id)
                .is_some_and(|set| set.contains(&ship_id));
            if !indexed {
                violations.push(format!("ship {ship_id} missing from squadron index"));
            }
            let house_indexed = self
                .indices
                .ships_by_house
                .get(&ship.house_id)
                .is_some_and(|set| set.contains(&ship_id));
            if !house_indexed {
                violations.push(format!("ship {ship_id} missing from house index"));
            }
        }

        for (_, house) in &self.houses {
            if house.treasury < 0 {
                violations.push(format!("house {} treasury is negative", house.id));
            }
        }

        violations
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fixture() -> (GameState, RuleSnapshot) {
        let setup = GameSetup::default();
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&setup, &snapshot).unwrap();
        (state, snapshot)
    }

    #[test]
    fn new_game_is_deterministic() {
        let setup = GameSetup::default();
        let snapshot = RuleSnapshot::default();
        let a = GameState::new_game(&setup, &snapshot).unwrap();
        let b = GameState::new_game(&setup, &snapshot).unwrap();
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn new_game_passes_index_validation() {
        let (state, _) = fixture();
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn every_house_starts_with_one_colony_and_one_fleet() {
        let (state, _) = fixture();
        for house in state.houses.keys() {
            assert_eq!(state.colonies_of(*house).len(), 1);
            assert_eq!(state.fleets_of(*house).len(), 1);
        }
    }

    #[test]
    fn flagship_destruction_cascades_to_the_squadron() {
        let (mut state, _) = fixture();
        let (squadron_id, squadron) = {
            let (id, s) = state.squadrons.iter().next().unwrap();
            (id, s.clone())
        };
        let member_count = squadron.ships.len();
        assert!(member_count > 1);

        let destroyed = state.destroy_ship(squadron.flagship);
        assert_eq!(destroyed, Some(squadron_id));
        assert!(state.squadrons.get(squadron_id).is_none());
        for ship in &squadron.ships {
            assert!(state.ships.get(*ship).is_none());
        }
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn escort_destruction_leaves_the_squadron_alive() {
        let (mut state, _) = fixture();
        let (squadron_id, squadron) = {
            let (id, s) = state.squadrons.iter().next().unwrap();
            (id, s.clone())
        };
        let escort = *squadron
            .ships
            .iter()
            .find(|s| **s != squadron.flagship)
            .unwrap();
        let destroyed = state.destroy_ship(escort);
        assert_eq!(destroyed, None);
        assert!(state.squadrons.get(squadron_id).is_some());
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn colony_conquest_rewrites_the_owner_index() {
        let (mut state, _) = fixture();
        let attacker = HouseId::new(0);
        let defender = HouseId::new(1);
        let target = state.colonies_of(defender)[0];

        state.update_colony_owner(target, defender, attacker);

        assert!(state.colonies_of(attacker).contains(&target));
        assert!(!state.colonies_of(defender).contains(&target));
        assert_eq!(state.colonies.get(&target).unwrap().owner, attacker);
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn move_fleet_maintains_the_location_index() {
        let (mut state, _) = fixture();
        let fleet_id = state.fleets.iter().next().unwrap().0;
        let from = state.fleets.get(fleet_id).unwrap().location;
        let to = state.map.hub();
        assert_ne!(from, to);

        state.move_fleet(fleet_id, to);
        assert!(state.fleets_at(to).contains(&fleet_id));
        assert!(!state.fleets_at(from).contains(&fleet_id));
        assert_eq!(state.validate_indices(), Vec::<String>::new());
    }

    #[test]
    fn stances_are_set_symmetrically() {
        let (mut state, _) = fixture();
        let a = HouseId::new(0);
        let b = HouseId::new(2);
        assert_eq!(state.stance(a, b), DiplomaticState::Neutral);
        state.set_stance(a, b, DiplomaticState::Enemy);
        assert_eq!(state.stance(a, b), DiplomaticState::Enemy);
        assert_eq!(state.stance(b, a), DiplomaticState::Enemy);
    }
}
