//! Phase 2: Income.
//!
//! For every house and every colony, ascending: compute gross output, tax
//! it into the treasury, accrue research from the turn's allocation, and
//! grow population. Ongoing espionage effects suppress output and tax at
//! this point; the effects themselves tick down later, in Maintenance.

use std::collections::BTreeMap;

use tracing::debug;

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::{EffectKind, PrestigeSource, TechField};
use ec4x_types::events::EventKind;
use ec4x_types::ids::HouseId;
use ec4x_types::orders::CommandPacket;

use crate::economy;
use crate::events::EventSink;
use crate::prestige;
use crate::state::GameState;

/// Run the Income Phase.
pub fn run(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    sink: &mut EventSink,
) {
    for house_id in state.live_houses() {
        collect_colony_income(state, snapshot, house_id);
        accrue_research(state, snapshot, staged, sink, house_id);
        grow_population(state, snapshot, house_id);
    }
}

fn collect_colony_income(state: &mut GameState, snapshot: &RuleSnapshot, house_id: HouseId) {
    let mut total_ncv: i64 = 0;
    for system in state.colonies_of(house_id) {
        let Some(colony) = state.colonies.get(&system) else {
            continue;
        };
        let Some(house) = state.houses.get(&house_id) else {
            continue;
        };
        let gross = economy::gross_output(colony, house, snapshot);
        let ncv_cut = economy::effect_magnitude(
            state,
            house_id,
            Some(system),
            EffectKind::NcvReduction,
        );
        let tax_cut = economy::effect_magnitude(
            state,
            house_id,
            Some(system),
            EffectKind::TaxReduction,
        );
        let ncv = economy::net_value(gross, colony.tax_rate, ncv_cut, tax_cut);
        total_ncv = total_ncv.saturating_add(ncv);
        if let Some(colony) = state.colonies.get_mut(&system) {
            colony.gross_output = gross;
        }
    }
    if let Some(house) = state.houses.get_mut(&house_id) {
        house.treasury = house.treasury.saturating_add(total_ncv);
    }
    debug!(%house_id, total_ncv, "income collected");
}

/// Turn the house's PP allocation into research points and level-ups.
fn accrue_research(
    state: &mut GameState,
    snapshot: &RuleSnapshot,
    staged: &BTreeMap<HouseId, CommandPacket>,
    sink: &mut EventSink,
    house_id: HouseId,
) {
    let Some(packet) = staged.get(&house_id) else {
        return;
    };
    if packet.research.allocation.is_empty() {
        return;
    }
    let srp_cut = economy::effect_magnitude(state, house_id, None, EffectKind::SrpReduction)
        .clamp(0, 100);

    let mut advances: Vec<(TechField, u8)> = Vec::new();
    if let Some(house) = state.houses.get_mut(&house_id) {
        // The validator already committed this spend against the budget.
        let total_pp: i64 = packet
            .research
            .allocation
            .values()
            .map(|pp| i64::from(*pp))
            .sum();
        house.treasury = house.treasury.saturating_sub(total_pp).max(0);

        for (field, pp) in &packet.research.allocation {
            let points = pp
                .saturating_mul(snapshot.economy.research_points_per_pp)
                .saturating_mul(u32::try_from(100i64.saturating_sub(srp_cut)).unwrap_or(100))
                / 100;
            let current = house.tech.points(*field);
            let mut pool = current.saturating_add(points);
            let mut level = house.tech.level(*field);
            loop {
                let next_cost = snapshot
                    .economy
                    .tech_level_cost_base
                    .saturating_mul(u32::from(level).saturating_add(1));
                if pool < next_cost {
                    break;
                }
                pool = pool.saturating_sub(next_cost);
                level = level.saturating_add(1);
                advances.push((*field, level));
            }
            house.tech.points.insert(*field, pool);
            house.tech.levels.insert(*field, level);
        }
    }

    for (field, level) in advances {
        sink.emit_public(EventKind::TechAdvanced {
            house: house_id,
            field,
            level,
        });
        prestige::award(
            state,
            sink,
            snapshot,
            house_id,
            None,
            PrestigeSource::TechAdvance,
            "technology field advanced",
        );
    }
}

fn grow_population(state: &mut GameState, snapshot: &RuleSnapshot, house_id: HouseId) {
    let multiplier = state.growth_multiplier;
    for system in state.colonies_of(house_id) {
        let Some(colony) = state.colonies.get(&system) else {
            continue;
        };
        let growth = economy::population_growth(colony, snapshot, multiplier);
        if growth > 0
            && let Some(colony) = state.colonies.get_mut(&system)
        {
            colony.population_units = colony.population_units.saturating_add(growth);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::GameSetup;
    use ec4x_types::orders::ResearchAllocation;

    fn fixture() -> (GameState, RuleSnapshot) {
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        (state, snapshot)
    }

    #[test]
    fn income_raises_the_treasury_and_records_gross_output() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let before = state.houses.get(&house).unwrap().treasury;
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &BTreeMap::new(), &mut sink);
        assert!(state.houses.get(&house).unwrap().treasury > before);
        let colony = state.colonies_of(house)[0];
        assert!(state.colonies.get(&colony).unwrap().gross_output > 0);
    }

    #[test]
    fn research_allocation_levels_a_field_up() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        state.houses.get_mut(&house).unwrap().treasury = 1_000;

        let mut allocation = BTreeMap::new();
        // Level 1 costs 50 points at the default rate of 1 point per PP.
        allocation.insert(TechField::Wep, 60u32);
        let packet = CommandPacket {
            house,
            turn: 1,
            research: ResearchAllocation { allocation },
            ..CommandPacket::default()
        };
        let mut staged = BTreeMap::new();
        staged.insert(house, packet);

        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &staged, &mut sink);

        let record = state.houses.get(&house).unwrap();
        assert_eq!(record.tech.level(TechField::Wep), 1);
        assert_eq!(record.tech.points(TechField::Wep), 10);
    }

    #[test]
    fn population_grows_on_hold() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let colony = state.colonies_of(house)[0];
        let before = state.colonies.get(&colony).unwrap().population_units;
        let mut sink = EventSink::new(1);
        run(&mut state, &snapshot, &BTreeMap::new(), &mut sink);
        assert!(state.colonies.get(&colony).unwrap().population_units > before);
    }
}
