//! Economic formulas.
//!
//! Pure functions over colony and house state; the Income and Maintenance
//! phases drive them. All money amounts are integral PP.

use ec4x_rules::RuleSnapshot;
use ec4x_types::colony::Colony;
use ec4x_types::enums::{EffectKind, PlanetClass, TechField};
use ec4x_types::house::House;

/// Gross colonial output in PP for one colony this turn.
///
/// `GCO = (PU/10 + IU) x EL bonus x class factor x quality
///        x (1 - damage) x (1 - blockade penalty)`
pub fn gross_output(colony: &Colony, house: &House, snapshot: &RuleSnapshot) -> i64 {
    let base = i64::from(colony.population_units / 10)
        .saturating_add(i64::from(colony.industrial_units));
    let el_level = u32::from(house.tech.level(TechField::El));
    let el_pct = 100u32
        .saturating_add(snapshot.economy.el_bonus_pct_per_level.saturating_mul(el_level));
    let class_pct = snapshot.economy.class_row(colony.planet_class).output_factor_pct;
    // Raw quality 1-10 swings output +-25% around the class baseline.
    let quality_pct = 75u32.saturating_add(u32::from(colony.raw_quality).saturating_mul(5));
    let damage_pct = 100u32.saturating_sub(u32::from(colony.infrastructure_damage.min(100)));
    let blockade_pct = if colony.blockaded {
        100u32.saturating_sub(snapshot.economy.blockade_penalty_pct.min(100))
    } else {
        100
    };

    let mut output = base;
    for pct in [el_pct, class_pct, quality_pct, damage_pct, blockade_pct] {
        output = output.saturating_mul(i64::from(pct)) / 100;
    }
    output.max(0)
}

/// Net colonial value: the taxed share of gross output, after ongoing
/// NCV/tax suppression effects (given as summed percent magnitudes).
pub fn net_value(gross: i64, tax_rate: u8, ncv_reduction_pct: i64, tax_reduction_pct: i64) -> i64 {
    let effective_tax = i64::from(tax_rate.min(100))
        .saturating_mul(100i64.saturating_sub(tax_reduction_pct.clamp(0, 100)))
        / 100;
    let ncv = gross.saturating_mul(effective_tax) / 100;
    ncv.saturating_mul(100i64.saturating_sub(ncv_reduction_pct.clamp(0, 100))) / 100
}

/// Population growth in PU for one colony this turn.
///
/// `growth = PU x class rate x dynamic multiplier x tax morale`, floored at
/// one PU on any growing world so small colonies are not stuck.
pub fn population_growth(
    colony: &Colony,
    snapshot: &RuleSnapshot,
    dynamic_multiplier: f64,
) -> u32 {
    let rate_permille = snapshot
        .economy
        .class_row(colony.planet_class)
        .growth_rate_permille;
    if rate_permille == 0 || colony.population_units == 0 {
        return 0;
    }
    let morale_pct = ec4x_rules::EconomyTable::tax_morale_pct(colony.tax_rate);
    let raw = f64::from(colony.population_units)
        * (f64::from(rate_permille) / 1000.0)
        * dynamic_multiplier
        * (f64::from(morale_pct) / 100.0);
    if raw <= 0.0 {
        return 0;
    }
    let grown = raw.floor();
    if grown < 1.0 { 1 } else if grown >= f64::from(u32::MAX) { u32::MAX } else {
        // Representable: guarded above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            grown as u32
        }
    }
}

/// Passive industrial growth: `max(1, PU / divisor)` for a living colony.
pub fn passive_iu_growth(population_units: u32, snapshot: &RuleSnapshot) -> u32 {
    if population_units == 0 {
        return 0;
    }
    (population_units / snapshot.economy.iu_passive_divisor.max(1)).max(1)
}

/// PP cost to add `amount` IU at a colony, using the tier for the colony's
/// current industrialization ratio.
pub fn iu_invest_cost(colony: &Colony, amount: u32, snapshot: &RuleSnapshot) -> i64 {
    let ratio_pct = if colony.population_units == 0 {
        u32::MAX
    } else {
        colony
            .industrial_units
            .saturating_mul(100)
            .checked_div(colony.population_units)
            .unwrap_or(u32::MAX)
    };
    let per_iu = snapshot
        .economy
        .iu_invest_tiers
        .iter()
        .find(|tier| ratio_pct <= tier.max_iu_to_pu_pct)
        .map_or(13, |tier| tier.cost_pp);
    per_iu.saturating_mul(i64::from(amount))
}

/// Total PP cost for a population transfer.
///
/// `cost = ptu x (destination class cost + distance surcharge)`.
pub fn transfer_cost(
    destination_class: PlanetClass,
    distance: u32,
    ptu: u32,
    snapshot: &RuleSnapshot,
) -> i64 {
    let class_cost = snapshot.economy.class_row(destination_class).transfer_cost;
    let per_ptu = class_cost.saturating_add(
        snapshot.guild.per_hex_surcharge.saturating_mul(i64::from(distance)),
    );
    per_ptu.saturating_mul(i64::from(ptu))
}

/// Summed magnitude (percent) of one ongoing-effect kind against a house,
/// optionally scoped to a system.
pub fn effect_magnitude(
    state: &crate::state::GameState,
    house: ec4x_types::ids::HouseId,
    system: Option<ec4x_types::ids::SystemId>,
    kind: EffectKind,
) -> i64 {
    state
        .effects
        .iter()
        .filter(|(_, e)| e.kind == kind && e.target_house == house)
        .filter(|(_, e)| e.target_system.is_none() || e.target_system == system)
        .map(|(_, e)| i64::from(e.magnitude))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_types::ids::{HouseId, SystemId};

    fn colony(class: PlanetClass, pu: u32, iu: u32) -> Colony {
        let mut c = Colony::found(SystemId::new(1), HouseId::new(0), class, 5, pu);
        c.industrial_units = iu;
        c
    }

    #[test]
    fn eden_to_extreme_single_hex_costs_ninety() {
        let snapshot = RuleSnapshot::default();
        // Moving 10 PTU from an Eden world to an Extreme world one hex away.
        assert_eq!(transfer_cost(PlanetClass::Extreme, 1, 10, &snapshot), 90);
    }

    #[test]
    fn lush_to_benign_three_hexes_costs_three_fifty() {
        let snapshot = RuleSnapshot::default();
        assert_eq!(transfer_cost(PlanetClass::Benign, 3, 50, &snapshot), 350);
    }

    #[test]
    fn blockade_halves_gross_output() {
        let snapshot = RuleSnapshot::default();
        let house = House::new(HouseId::new(0), "Test", 0);
        let mut c = colony(PlanetClass::Benign, 200, 30);
        let open = gross_output(&c, &house, &snapshot);
        c.blockaded = true;
        let blockaded = gross_output(&c, &house, &snapshot);
        assert_eq!(blockaded, open / 2);
    }

    #[test]
    fn infrastructure_damage_suppresses_output() {
        let snapshot = RuleSnapshot::default();
        let house = House::new(HouseId::new(0), "Test", 0);
        let mut c = colony(PlanetClass::Benign, 200, 30);
        let intact = gross_output(&c, &house, &snapshot);
        c.infrastructure_damage = 40;
        let damaged = gross_output(&c, &house, &snapshot);
        assert!(damaged < intact);
        assert_eq!(damaged, intact * 60 / 100);
    }

    #[test]
    fn net_value_applies_tax_then_reductions() {
        assert_eq!(net_value(1000, 50, 0, 0), 500);
        assert_eq!(net_value(1000, 50, 20, 0), 400);
        assert_eq!(net_value(1000, 50, 0, 50), 250);
    }

    #[test]
    fn small_growing_colony_gains_at_least_one_pu() {
        let snapshot = RuleSnapshot::default();
        let c = colony(PlanetClass::Extreme, 30, 0);
        assert_eq!(population_growth(&c, &snapshot, 1.0), 1);
    }

    #[test]
    fn passive_iu_growth_floors_at_one() {
        let snapshot = RuleSnapshot::default();
        assert_eq!(passive_iu_growth(150, &snapshot), 1);
        assert_eq!(passive_iu_growth(650, &snapshot), 3);
        assert_eq!(passive_iu_growth(0, &snapshot), 0);
    }

    #[test]
    fn iu_invest_tiers_step_with_industrialization() {
        let snapshot = RuleSnapshot::default();
        let light = colony(PlanetClass::Benign, 100, 10);
        let heavy = colony(PlanetClass::Benign, 100, 90);
        assert_eq!(iu_invest_cost(&light, 1, &snapshot), 5);
        assert_eq!(iu_invest_cost(&heavy, 1, &snapshot), 10);
        assert_eq!(iu_invest_cost(&heavy, 4, &snapshot), 40);
    }
}
