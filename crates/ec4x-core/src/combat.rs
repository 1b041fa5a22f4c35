//! Three-theater combat resolution.
//!
//! Space, orbital, and planetary combat share one round engine. A round:
//! each side's attack strength (weapons tech at commission, crippled
//! penalty, CER modifiers, posture effectiveness) becomes a hit count; hits
//! land on an ordered target list (weakest-command squadrons first,
//! flagships last within a squadron); criticals destroy the highest-value
//! hull outright. Between rounds each side checks its rules of engagement
//! and may break off, absorbing a pursuit volley on the way out.
//!
//! The engine works on a scratch copy of ship condition and reports what
//! died; the caller applies the mutations through the state helpers so the
//! reverse indices stay intact.

use std::collections::BTreeMap;

use tracing::debug;

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::{RulesOfEngagement, ShipClass, ShipState};
use ec4x_types::ids::{FacilityId, FleetId, HouseId, ShipId, SquadronId, SystemId};

use crate::rng::TurnRng;
use crate::state::GameState;

/// A combat target: a ship or a starbase standing in the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TargetRef {
    /// A ship.
    Ship(ShipId),
    /// A starbase fighting in the orbital theater.
    Starbase(FacilityId),
}

/// Scratch condition of one combatant during a battle.
#[derive(Debug, Clone, Copy)]
struct Condition {
    /// Hits this combatant can still absorb before its next transition.
    hits_remaining: u32,
    /// Whether it is currently crippled.
    crippled: bool,
    /// Whether it is still in the fight.
    alive: bool,
    /// Hull class (starbases rank as dreadnoughts for crit priority).
    class: ShipClass,
    /// Attack contribution at full effectiveness.
    attack: u32,
    /// Squadron grouping for targeting order; starbases group under none.
    squadron: Option<SquadronId>,
}

/// One side of an engagement, as assembled by the conflict phase.
#[derive(Debug, Clone)]
pub struct SideSpec {
    /// The fighting house.
    pub house: HouseId,
    /// Participating fleets (used for retreat bookkeeping).
    pub fleets: Vec<FleetId>,
    /// Participating ships.
    pub ships: Vec<ShipId>,
    /// Ships fighting at reserve effectiveness (half attack).
    pub reserve_ships: Vec<ShipId>,
    /// Participating starbases (orbital theater only).
    pub starbases: Vec<FacilityId>,
    /// Posture effectiveness in percent (reserves fight at half).
    pub effectiveness_pct: u32,
    /// Combat effectiveness rating modifier in percent (scouts, surprise,
    /// ambush; 100 = unmodified).
    pub cer_pct: u32,
    /// The side's rules of engagement.
    pub roe: RulesOfEngagement,
    /// Whether this side may retreat at all (defenders of an orbital
    /// theater and fixed assets cannot).
    pub can_retreat: bool,
    /// Shield block chance in percent protecting this side (planetary
    /// shields over an orbital defender; 0 in open space).
    pub shield_block_pct: u32,
    /// Die modifier on this side's critical rolls (starbase fire control).
    pub crit_die_modifier: i32,
}

/// What happened to one side.
#[derive(Debug, Clone, Default)]
pub struct SideOutcome {
    /// Ships destroyed outright.
    pub ships_destroyed: Vec<ShipId>,
    /// Ships that ended the battle crippled (and survived).
    pub ships_crippled: Vec<ShipId>,
    /// Starbases destroyed.
    pub starbases_destroyed: Vec<FacilityId>,
    /// Starbases that ended the battle crippled.
    pub starbases_crippled: Vec<FacilityId>,
    /// Whether this side was forced to retreat.
    pub retreated: bool,
}

/// The result of one engagement.
#[derive(Debug, Clone)]
pub struct EngagementResult {
    /// The side that held the field, if either did.
    pub victor: Option<HouseId>,
    /// Outcome for the first side.
    pub a: SideOutcome,
    /// Outcome for the second side.
    pub b: SideOutcome,
    /// Rounds fought.
    pub rounds: u32,
    /// Whether the battle ended in mutual withdrawal from stalemate.
    pub stalemate: bool,
}

/// Scratch state for one side during resolution.
struct SideState {
    spec: SideSpec,
    conditions: BTreeMap<TargetRef, Condition>,
    outcome: SideOutcome,
}

impl SideState {
    fn new(state: &GameState, snapshot: &RuleSnapshot, spec: SideSpec) -> Self {
        let mut conditions = BTreeMap::new();
        let sld_level = state
            .houses
            .get(&spec.house)
            .map_or(0, |h| u32::from(h.tech.level(ec4x_types::enums::TechField::Sld)));
        let sld_pct = 100u32
            .saturating_add(snapshot.combat.sld_bonus_pct_per_level.saturating_mul(sld_level));

        for ship_id in &spec.ships {
            let Some(ship) = state.ships.get(*ship_id) else {
                continue;
            };
            let effective_ds =
                (ship.stats.defense.saturating_mul(sld_pct) / 100).max(1);
            let crippled = ship.state == ShipState::Crippled;
            let wep_pct = 100u32.saturating_add(
                snapshot
                    .combat
                    .wep_bonus_pct_per_level
                    .saturating_mul(u32::from(ship.stats.commissioned_wep)),
            );
            let mut attack = ship.stats.attack.saturating_mul(wep_pct) / 100;
            if spec.reserve_ships.contains(ship_id) {
                attack = attack.saturating_mul(snapshot.combat.reserve_effectiveness_pct) / 100;
            }
            conditions.insert(
                TargetRef::Ship(*ship_id),
                Condition {
                    hits_remaining: if crippled { 1 } else { effective_ds },
                    crippled,
                    alive: true,
                    class: ship.class,
                    attack,
                    squadron: Some(ship.squadron_id),
                },
            );
        }
        for facility_id in &spec.starbases {
            let Some(facility) = state.facilities.get(*facility_id) else {
                continue;
            };
            let fspec = snapshot.facilities.spec(facility.kind);
            let crippled = facility.crippled;
            conditions.insert(
                TargetRef::Starbase(*facility_id),
                Condition {
                    hits_remaining: if crippled { 1 } else { fspec.defense.max(1) },
                    crippled,
                    alive: true,
                    class: ShipClass::Dreadnought,
                    attack: fspec.attack,
                    squadron: None,
                },
            );
        }
        Self {
            spec,
            conditions,
            outcome: SideOutcome::default(),
        }
    }

    /// Current attack strength, with crippled and posture penalties.
    fn attack_strength(&self, snapshot: &RuleSnapshot) -> u32 {
        let raw: u32 = self
            .conditions
            .values()
            .filter(|c| c.alive)
            .map(|c| {
                if c.crippled {
                    c.attack.saturating_mul(snapshot.combat.crippled_attack_pct) / 100
                } else {
                    c.attack
                }
            })
            .fold(0u32, u32::saturating_add);
        raw.saturating_mul(self.spec.effectiveness_pct) / 100
    }

    /// Hit count for one round at the given volley fraction.
    fn hits(&self, snapshot: &RuleSnapshot, volley_pct: u32) -> u32 {
        let strength = self.attack_strength(snapshot);
        let modified = strength
            .saturating_mul(self.spec.cer_pct)
            .saturating_mul(volley_pct)
            / 10_000;
        let coefficient = snapshot.combat.round_coefficient.max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            (f64::from(modified) * coefficient).floor().max(0.0) as u32
        }
    }

    fn any_alive(&self) -> bool {
        self.conditions.values().any(|c| c.alive)
    }

    /// Targets in priority order: squadrons by flagship command rating
    /// ascending, escorts before the flagship, starbases last.
    fn target_order(&self, state: &GameState) -> Vec<TargetRef> {
        let mut squadron_rating: BTreeMap<SquadronId, u32> = BTreeMap::new();
        for condition in self.conditions.values() {
            if let Some(squadron_id) = condition.squadron
                && let Some(squadron) = state.squadrons.get(squadron_id)
            {
                let rating = state
                    .ships
                    .get(squadron.flagship)
                    .map_or(0, |f| f.stats.command_rating);
                squadron_rating.insert(squadron_id, rating);
            }
        }
        let flagship_of = |squadron_id: SquadronId| -> Option<ShipId> {
            state.squadrons.get(squadron_id).map(|s| s.flagship)
        };
        let mut targets: Vec<TargetRef> = self
            .conditions
            .iter()
            .filter(|(_, c)| c.alive)
            .map(|(t, _)| *t)
            .collect();
        targets.sort_by_key(|target| match target {
            TargetRef::Ship(ship_id) => {
                let squadron = self
                    .conditions
                    .get(target)
                    .and_then(|c| c.squadron);
                let rating = squadron
                    .and_then(|s| squadron_rating.get(&s).copied())
                    .unwrap_or(0);
                let is_flagship =
                    squadron.and_then(flagship_of) == Some(*ship_id);
                (0u8, rating, u8::from(is_flagship), ship_id.into_inner())
            }
            TargetRef::Starbase(facility_id) => {
                (1u8, u32::MAX, 1, facility_id.into_inner())
            }
        });
        targets
    }

    /// The living target with the highest hull value, for criticals.
    fn highest_value_target(&self) -> Option<TargetRef> {
        self.conditions
            .iter()
            .filter(|(_, c)| c.alive)
            .max_by_key(|(target, c)| (c.class.value_rank(), *target))
            .map(|(target, _)| *target)
    }

    /// Kill a target outright. A flagship takes its squadron with it.
    fn destroy(&mut self, state: &GameState, target: TargetRef) {
        let Some(condition) = self.conditions.get_mut(&target) else {
            return;
        };
        if !condition.alive {
            return;
        }
        condition.alive = false;
        let squadron = condition.squadron;
        match target {
            TargetRef::Ship(id) => {
                self.outcome.ships_destroyed.push(id);
                if let Some(squadron_id) = squadron
                    && state
                        .squadrons
                        .get(squadron_id)
                        .is_some_and(|s| s.flagship == id)
                {
                    self.destroy_squadron_mates(squadron_id);
                }
            }
            TargetRef::Starbase(id) => self.outcome.starbases_destroyed.push(id),
        }
    }

    /// A dead flagship takes every surviving squadron mate down with it.
    fn destroy_squadron_mates(&mut self, squadron: SquadronId) {
        let mates: Vec<TargetRef> = self
            .conditions
            .iter()
            .filter(|(_, c)| c.alive && c.squadron == Some(squadron))
            .map(|(t, _)| *t)
            .collect();
        for mate in mates {
            if let Some(condition) = self.conditions.get_mut(&mate) {
                condition.alive = false;
                if let TargetRef::Ship(id) = mate {
                    self.outcome.ships_destroyed.push(id);
                }
            }
        }
    }

    /// Apply one plain hit. Returns true if the target died.
    fn hit(&mut self, state: &GameState, target: TargetRef) -> bool {
        let Some(condition) = self.conditions.get_mut(&target) else {
            return false;
        };
        if !condition.alive {
            return false;
        }
        condition.hits_remaining = condition.hits_remaining.saturating_sub(1);
        if condition.hits_remaining > 0 {
            return false;
        }
        if condition.crippled {
            self.destroy(state, target);
            true
        } else {
            condition.crippled = true;
            condition.hits_remaining = 1;
            false
        }
    }

    /// Record which survivors ended the battle crippled.
    fn finalize(&mut self) {
        for (target, condition) in &self.conditions {
            if condition.alive && condition.crippled {
                match target {
                    TargetRef::Ship(id) => self.outcome.ships_crippled.push(*id),
                    TargetRef::Starbase(id) => self.outcome.starbases_crippled.push(*id),
                }
            }
        }
    }
}

/// Resolve one engagement between two sides.
///
/// Mutates nothing; the caller applies the returned outcomes through the
/// state helpers.
pub fn run_engagement(
    state: &GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    side_a: SideSpec,
    side_b: SideSpec,
) -> EngagementResult {
    let mut a = SideState::new(state, snapshot, side_a);
    let mut b = SideState::new(state, snapshot, side_b);
    let mut rounds = 0u32;
    let mut stalemate_rounds = 0u32;
    let mut desperation = false;

    while rounds < snapshot.combat.max_rounds_per_turn && a.any_alive() && b.any_alive() {
        rounds = rounds.saturating_add(1);

        let hits_a = a.hits(snapshot, 100);
        let hits_b = b.hits(snapshot, 100);

        // Stalemate: neither side can land a single hit.
        if hits_a == 0 && hits_b == 0 {
            stalemate_rounds = stalemate_rounds.saturating_add(1);
            if stalemate_rounds == 1 {
                desperation = true;
                continue;
            }
            debug!(rounds, "stalemate: mutual withdrawal");
            a.finalize();
            b.finalize();
            return EngagementResult {
                victor: None,
                a: a.outcome,
                b: b.outcome,
                rounds,
                stalemate: true,
            };
        }
        stalemate_rounds = 0;

        // Simultaneous volleys: both sides fire at pre-volley strength.
        let drm = if desperation { snapshot.combat.stalemate_drm } else { 0 };
        apply_volley(state, snapshot, rng, &mut b, &a_spec_view(&a), hits_a, drm);
        apply_volley(state, snapshot, rng, &mut a, &a_spec_view(&b), hits_b, drm);

        // Rules of engagement: check both sides, lower house id first.
        let strength_a = a.attack_strength(snapshot);
        let strength_b = b.attack_strength(snapshot);
        let a_breaks = a.spec.can_retreat && wants_retreat(a.spec.roe, strength_a, strength_b);
        let b_breaks = b.spec.can_retreat && wants_retreat(b.spec.roe, strength_b, strength_a);

        if a_breaks || b_breaks {
            // The side that stands fires one parting volley at half weight.
            if a_breaks && !b_breaks {
                let pursuit = b.hits(snapshot, snapshot.combat.pursuit_volley_pct);
                apply_volley(state, snapshot, rng, &mut a, &a_spec_view(&b), pursuit, 0);
            }
            if b_breaks && !a_breaks {
                let pursuit = a.hits(snapshot, snapshot.combat.pursuit_volley_pct);
                apply_volley(state, snapshot, rng, &mut b, &a_spec_view(&a), pursuit, 0);
            }
            if a_breaks {
                a.outcome.retreated = true;
            }
            if b_breaks {
                b.outcome.retreated = true;
            }
            break;
        }
    }

    let victor = match (a.any_alive() && !a.outcome.retreated, b.any_alive() && !b.outcome.retreated)
    {
        (true, false) => Some(a.spec.house),
        (false, true) => Some(b.spec.house),
        _ => None,
    };

    a.finalize();
    b.finalize();
    EngagementResult {
        victor,
        a: a.outcome,
        b: b.outcome,
        rounds,
        stalemate: false,
    }
}

/// Firing-side view needed while the defender is mutably borrowed.
struct FiringView {
    crit_die_modifier: i32,
}

fn a_spec_view(side: &SideState) -> FiringView {
    FiringView {
        crit_die_modifier: side.spec.crit_die_modifier,
    }
}

/// Land `hits` on `defender` in targeting order, rolling criticals.
fn apply_volley(
    state: &GameState,
    snapshot: &RuleSnapshot,
    rng: &mut TurnRng,
    defender: &mut SideState,
    firer: &FiringView,
    hits: u32,
    desperation_drm: u32,
) {
    let shield_pct = defender.spec.shield_block_pct;
    for _ in 0..hits {
        if !defender.any_alive() {
            return;
        }
        // Planetary shields roll against every incoming hit.
        if shield_pct > 0 && rng.pct(shield_pct) {
            continue;
        }
        // Critical check: d20 with the firer's die modifier.
        let mut roll = i64::from(rng.d20());
        roll = roll
            .saturating_add(i64::from(firer.crit_die_modifier))
            .saturating_add(i64::from(desperation_drm));
        let is_critical = roll >= i64::from(snapshot.combat.critical_threshold);
        if is_critical {
            if let Some(target) = defender.highest_value_target() {
                defender.destroy(state, target);
                continue;
            }
        }
        let order = defender.target_order(state);
        if let Some(target) = order.first() {
            defender.hit(state, *target);
        }
    }
}

/// Whether a side's ROE triggers at the given relative strength.
fn wants_retreat(roe: RulesOfEngagement, own: u32, enemy: u32) -> bool {
    let threshold = roe.retreat_threshold_pct();
    if threshold == 0 {
        return false;
    }
    if own == 0 {
        return true;
    }
    if enemy == 0 {
        return false;
    }
    own.saturating_mul(100) / enemy <= threshold
}

/// Choose where a retreating fleet flees: an adjacent system reachable by
/// lane with no enemy of the retreater present, preferring friendly
/// colonies, then neutral space, lowest system id on ties.
pub fn retreat_destination(
    state: &GameState,
    from: SystemId,
    house: HouseId,
    enemy: HouseId,
) -> Option<SystemId> {
    let system = state.map.get(from)?;
    let mut friendly: Option<SystemId> = None;
    let mut neutral: Option<SystemId> = None;
    for (neighbor, _) in &system.lanes {
        let enemy_present = state.fleets_at(*neighbor).iter().any(|fleet_id| {
            state
                .fleets
                .get(*fleet_id)
                .is_some_and(|f| f.owner == enemy)
        });
        if enemy_present {
            continue;
        }
        let owner = state.colonies.get(neighbor).map(|c| c.owner);
        match owner {
            Some(o) if o == house => {
                friendly = Some(friendly.map_or(*neighbor, |f: SystemId| f.min(*neighbor)));
            }
            Some(_) => {}
            None => {
                neutral = Some(neutral.map_or(*neighbor, |n: SystemId| n.min(*neighbor)));
            }
        }
    }
    friendly.or(neutral)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::GameSetup;
    use ec4x_types::enums::FleetPosture;

    fn fixture() -> (GameState, RuleSnapshot) {
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        (state, snapshot)
    }

    fn side_for(state: &GameState, house: HouseId, roe: RulesOfEngagement) -> SideSpec {
        let fleets = state.fleets_of(house);
        let ships: Vec<ShipId> = fleets
            .iter()
            .filter_map(|f| state.fleets.get(*f))
            .flat_map(|f| f.squadrons.iter())
            .filter_map(|s| state.squadrons.get(*s))
            .flat_map(|s| s.ships.iter().copied())
            .collect();
        SideSpec {
            house,
            fleets,
            ships,
            reserve_ships: Vec::new(),
        starbases: Vec::new(),
            effectiveness_pct: 100,
            cer_pct: 100,
            roe,
            can_retreat: true,
            shield_block_pct: 0,
            crit_die_modifier: 0,
        }
    }

    #[test]
    fn symmetric_forces_produce_losses_on_both_sides() {
        let (state, snapshot) = fixture();
        let mut rng = TurnRng::for_turn(state.seed, 1);
        let a = side_for(&state, HouseId::new(0), RulesOfEngagement::FightToTheDeath);
        let b = side_for(&state, HouseId::new(1), RulesOfEngagement::FightToTheDeath);
        let result = run_engagement(&state, &snapshot, &mut rng, a, b);
        assert!(result.rounds >= 1);
        let total_losses =
            result.a.ships_destroyed.len() + result.b.ships_destroyed.len();
        assert!(total_losses > 0, "no losses in a pitched battle");
    }

    #[test]
    fn engagement_is_deterministic_for_a_fixed_stream() {
        let (state, snapshot) = fixture();
        let run = |seed_turn: u32| {
            let mut rng = TurnRng::for_turn(state.seed, seed_turn);
            let a = side_for(&state, HouseId::new(0), RulesOfEngagement::Standard);
            let b = side_for(&state, HouseId::new(1), RulesOfEngagement::Standard);
            let result = run_engagement(&state, &snapshot, &mut rng, a, b);
            (
                result.victor,
                result.a.ships_destroyed,
                result.b.ships_destroyed,
                result.rounds,
            )
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn overwhelming_force_wins_without_retreating() {
        let (mut state, snapshot) = fixture();
        let weak_house = HouseId::new(1);
        // Strip house 1 down to a single scout squadron's flagship escorts.
        let fleets = state.fleets_of(weak_house);
        let fleet = state.fleets.get(fleets[0]).unwrap().clone();
        for squadron_id in fleet.squadrons.iter().skip(1) {
            state.destroy_squadron(*squadron_id);
        }
        let mut rng = TurnRng::for_turn(state.seed, 2);
        let a = side_for(&state, HouseId::new(0), RulesOfEngagement::FightToTheDeath);
        let b = side_for(&state, weak_house, RulesOfEngagement::FightToTheDeath);
        let result = run_engagement(&state, &snapshot, &mut rng, a, b);
        assert_eq!(result.victor, Some(HouseId::new(0)));
        assert!(!result.b.ships_destroyed.is_empty());
    }

    #[test]
    fn empty_side_concedes_the_field() {
        let (state, snapshot) = fixture();
        let mut rng = TurnRng::for_turn(state.seed, 3);
        let a = side_for(&state, HouseId::new(0), RulesOfEngagement::Standard);
        let b = SideSpec {
            house: HouseId::new(1),
            fleets: Vec::new(),
            ships: Vec::new(),
            reserve_ships: Vec::new(),
        starbases: Vec::new(),
            effectiveness_pct: 100,
            cer_pct: 100,
            roe: RulesOfEngagement::Standard,
            can_retreat: true,
            shield_block_pct: 0,
            crit_die_modifier: 0,
        };
        let result = run_engagement(&state, &snapshot, &mut rng, a, b);
        assert_eq!(result.victor, Some(HouseId::new(0)));
        assert_eq!(result.rounds, 0);
    }

    #[test]
    fn retreat_destination_prefers_friendly_colonies() {
        let (state, _) = fixture();
        let house = HouseId::new(0);
        let homeworld = state.colonies_of(house)[0];
        // From a neighbor of the homeworld, the homeworld itself is the
        // preferred bolthole.
        let neighbor = state.map.get(homeworld).unwrap().lanes[0].0;
        let destination =
            retreat_destination(&state, neighbor, house, HouseId::new(1));
        assert_eq!(destination, Some(homeworld));
    }

    #[test]
    fn fight_to_the_death_never_retreats() {
        assert!(!wants_retreat(RulesOfEngagement::FightToTheDeath, 0, 100));
        assert!(wants_retreat(RulesOfEngagement::Standard, 40, 100));
        assert!(!wants_retreat(RulesOfEngagement::Standard, 60, 100));
        assert!(wants_retreat(RulesOfEngagement::Cautious, 70, 100));
    }

    #[test]
    fn mothballed_posture_never_reaches_the_engine() {
        // Guard: the conflict phase screens mothballed fleets out before
        // building sides; the posture enum documents the contract.
        assert_ne!(FleetPosture::Mothballed, FleetPosture::Reserve);
    }
}
