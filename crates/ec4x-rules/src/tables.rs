//! The static rule tables.
//!
//! Every tunable number in the engine lives here. Tables are loaded once at
//! game creation, materialized into a [`RuleSnapshot`], and shared read-only
//! by every turn resolution of that game. Field defaults match the baseline
//! rules; a scenario may override any subset in YAML.
//!
//! [`RuleSnapshot`]: crate::snapshot::RuleSnapshot

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use ec4x_types::enums::{
    EffectKind, EspionageAction, FacilityKind, GroundUnitKind, PlanetClass, PrestigeSource,
    ShipClass,
};

/// Combat and economic statistics for one hull class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipSpec {
    /// Attack strength before weapons-tech scaling.
    pub attack: u32,
    /// Defense strength before shield-tech scaling.
    pub defense: u32,
    /// Command cost counted against a flagship's command rating.
    pub command_cost: u32,
    /// Command rating when leading a squadron (0 = cannot lead).
    pub command_rating: u32,
    /// Build cost in PP.
    pub build_cost: i64,
    /// Build time in turns.
    pub build_turns: u32,
    /// Per-turn maintenance in PP.
    pub maintenance: i64,
    /// Cargo capacity in marine units or PTU (0 = no hold).
    pub cargo_capacity: u32,
}

/// Per-class ship statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipTable {
    /// Stats per hull class.
    #[serde(default = "default_ship_specs")]
    pub classes: BTreeMap<ShipClass, ShipSpec>,
}

impl Default for ShipTable {
    fn default() -> Self {
        Self {
            classes: default_ship_specs(),
        }
    }
}

impl ShipTable {
    /// Stats for `class`, falling back to the corvette baseline for any
    /// class a malformed override removed.
    pub fn spec(&self, class: ShipClass) -> ShipSpec {
        self.classes.get(&class).copied().unwrap_or(ShipSpec {
            attack: 2,
            defense: 2,
            command_cost: 1,
            command_rating: 0,
            build_cost: 40,
            build_turns: 2,
            maintenance: 2,
            cargo_capacity: 0,
        })
    }
}

/// Statistics for one ground-unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundUnitSpec {
    /// Build cost in PP.
    pub build_cost: i64,
    /// Build time in turns.
    pub build_turns: u32,
    /// Ground combat strength.
    pub combat_strength: u32,
    /// Per-turn maintenance in PP.
    pub maintenance: i64,
}

/// Per-kind ground unit statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundUnitTable {
    /// Stats per unit kind.
    #[serde(default = "default_ground_specs")]
    pub kinds: BTreeMap<GroundUnitKind, GroundUnitSpec>,
}

impl Default for GroundUnitTable {
    fn default() -> Self {
        Self {
            kinds: default_ground_specs(),
        }
    }
}

impl GroundUnitTable {
    /// Stats for `kind`.
    pub fn spec(&self, kind: GroundUnitKind) -> GroundUnitSpec {
        self.kinds.get(&kind).copied().unwrap_or(GroundUnitSpec {
            build_cost: 10,
            build_turns: 1,
            combat_strength: 2,
            maintenance: 1,
        })
    }
}

/// Statistics for one facility kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitySpec {
    /// Build cost in PP.
    pub build_cost: i64,
    /// Build time in turns.
    pub build_turns: u32,
    /// Dock slots contributed (0 for starbases).
    pub docks: u32,
    /// Per-turn maintenance in PP.
    pub maintenance: i64,
    /// Attack strength in the orbital theater (starbases only).
    pub attack: u32,
    /// Defense strength in the orbital theater (starbases only).
    pub defense: u32,
    /// Surveillance radius in hexes (starbases only).
    pub surveillance_radius: u32,
}

/// Per-kind facility statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityTable {
    /// Stats per facility kind.
    #[serde(default = "default_facility_specs")]
    pub kinds: BTreeMap<FacilityKind, FacilitySpec>,
}

impl Default for FacilityTable {
    fn default() -> Self {
        Self {
            kinds: default_facility_specs(),
        }
    }
}

impl FacilityTable {
    /// Stats for `kind`.
    pub fn spec(&self, kind: FacilityKind) -> FacilitySpec {
        self.kinds.get(&kind).copied().unwrap_or(FacilitySpec {
            build_cost: 100,
            build_turns: 3,
            docks: 0,
            maintenance: 5,
            attack: 0,
            defense: 0,
            surveillance_radius: 0,
        })
    }
}

/// One planetary shield level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldLevelSpec {
    /// Chance (percent) each incoming hit is rolled against the shield.
    pub block_chance_pct: u32,
    /// Build cost in PP.
    pub build_cost: i64,
    /// Build time in turns.
    pub build_turns: u32,
}

/// Combat resolution constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatTable {
    /// Per-round hit coefficient applied to attack strength.
    #[serde(default = "default_round_coefficient")]
    pub round_coefficient: f64,
    /// Maximum battle rounds resolved per theater per turn.
    #[serde(default = "default_max_rounds")]
    pub max_rounds_per_turn: u32,
    /// d20 result at or above which a hit is a critical (outright kill).
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: u8,
    /// Whether starbases may reroll one failed critical per round.
    #[serde(default)]
    pub starbase_crit_reroll: bool,
    /// Die modifier applied to starbase critical rolls.
    #[serde(default = "default_starbase_die_modifier")]
    pub starbase_die_modifier: i32,
    /// Attack bonus percent per weapons tech level at commission.
    #[serde(default = "default_wep_bonus_pct")]
    pub wep_bonus_pct_per_level: u32,
    /// Defense bonus percent per shield tech level.
    #[serde(default = "default_sld_bonus_pct")]
    pub sld_bonus_pct_per_level: u32,
    /// Attack strength retained by crippled ships, percent.
    #[serde(default = "default_crippled_attack_pct")]
    pub crippled_attack_pct: u32,
    /// CER modifier percent when scouts accompany the side.
    #[serde(default = "default_scout_cer_pct")]
    pub scout_cer_bonus_pct: u32,
    /// CER modifier percent for a surprised side (applied to the victim).
    #[serde(default = "default_surprise_cer_pct")]
    pub surprise_cer_penalty_pct: u32,
    /// CER modifier percent for an ambushing side.
    #[serde(default = "default_ambush_cer_pct")]
    pub ambush_cer_bonus_pct: u32,
    /// Desperation die-roll modifier applied after a stalemate round.
    #[serde(default = "default_stalemate_drm")]
    pub stalemate_drm: u32,
    /// Fraction (percent) of a normal volley fired at a retreating side.
    #[serde(default = "default_pursuit_pct")]
    pub pursuit_volley_pct: u32,
    /// Effectiveness (percent) of reserve-posture fleets in orbit.
    #[serde(default = "default_reserve_pct")]
    pub reserve_effectiveness_pct: u32,
    /// Bombardment die size rolled against IU per round.
    #[serde(default = "default_bombard_die")]
    pub bombard_die: u32,
    /// Ground combat: attacker strength percent needed to win.
    #[serde(default = "default_ground_threshold_pct")]
    pub ground_victory_threshold_pct: u32,
    /// Fraction (percent) of IU lost by the defender on invasion.
    #[serde(default = "default_invasion_iu_loss_pct")]
    pub invasion_iu_loss_pct: u32,
    /// Additional IU-loss percent when the invasion was a blitz.
    #[serde(default = "default_blitz_iu_loss_pct")]
    pub blitz_iu_loss_pct: u32,
    /// Planetary shield levels, index 0 = SLD1.
    #[serde(default = "default_shield_levels")]
    pub planetary_shields: Vec<ShieldLevelSpec>,
}

impl Default for CombatTable {
    fn default() -> Self {
        Self {
            round_coefficient: default_round_coefficient(),
            max_rounds_per_turn: default_max_rounds(),
            critical_threshold: default_critical_threshold(),
            starbase_crit_reroll: false,
            starbase_die_modifier: default_starbase_die_modifier(),
            wep_bonus_pct_per_level: default_wep_bonus_pct(),
            sld_bonus_pct_per_level: default_sld_bonus_pct(),
            crippled_attack_pct: default_crippled_attack_pct(),
            scout_cer_bonus_pct: default_scout_cer_pct(),
            surprise_cer_penalty_pct: default_surprise_cer_pct(),
            ambush_cer_bonus_pct: default_ambush_cer_pct(),
            stalemate_drm: default_stalemate_drm(),
            pursuit_volley_pct: default_pursuit_pct(),
            reserve_effectiveness_pct: default_reserve_pct(),
            bombard_die: default_bombard_die(),
            ground_victory_threshold_pct: default_ground_threshold_pct(),
            invasion_iu_loss_pct: default_invasion_iu_loss_pct(),
            blitz_iu_loss_pct: default_blitz_iu_loss_pct(),
            planetary_shields: default_shield_levels(),
        }
    }
}

/// Output and growth characteristics of one planet class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetClassRow {
    /// Gross output factor, percent of baseline.
    pub output_factor_pct: u32,
    /// Base population growth per turn, in tenths of a percent.
    pub growth_rate_permille: u32,
    /// Per-PTU transfer cost component for moving people here.
    pub transfer_cost: i64,
}

/// Tiered cost for investing PP into new industrial units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IuCostTier {
    /// Applies while `IU * 100 / PU` is at most this value.
    pub max_iu_to_pu_pct: u32,
    /// PP per IU in this tier.
    pub cost_pp: i64,
}

/// Economy constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyTable {
    /// Per-class output and growth rows.
    #[serde(default = "default_planet_classes")]
    pub planet_classes: BTreeMap<PlanetClass, PlanetClassRow>,
    /// Output bonus percent per economic tech level.
    #[serde(default = "default_el_bonus_pct")]
    pub el_bonus_pct_per_level: u32,
    /// Output suppression percent under blockade.
    #[serde(default = "default_blockade_penalty_pct")]
    pub blockade_penalty_pct: u32,
    /// PU per passive IU gained each turn.
    #[serde(default = "default_iu_passive_divisor")]
    pub iu_passive_divisor: u32,
    /// Tiered PP costs for invested IU growth.
    #[serde(default = "default_iu_tiers")]
    pub iu_invest_tiers: Vec<IuCostTier>,
    /// Maintenance multiplier percent for crippled ships.
    #[serde(default = "default_crippled_maintenance_pct")]
    pub crippled_maintenance_pct: u32,
    /// Repair cost as a percent of build cost.
    #[serde(default = "default_repair_cost_pct")]
    pub repair_cost_pct: u32,
    /// Turns a ship repair occupies a drydock slot.
    #[serde(default = "default_repair_turns")]
    pub ship_repair_turns: u32,
    /// Infrastructure damage percent applied on the first overdraft step.
    #[serde(default = "default_shortfall_base")]
    pub shortfall_base: u8,
    /// Additional damage percent per further overdraft step.
    #[serde(default = "default_shortfall_increment")]
    pub shortfall_increment: u8,
    /// Salvage refund as a percent of build cost.
    #[serde(default = "default_salvage_pct")]
    pub salvage_pct: u32,
    /// Baseline systems-per-player for the dynamic growth multiplier.
    #[serde(default = "default_baseline_systems_per_player")]
    pub baseline_systems_per_player: f64,
    /// Lower clamp of the dynamic growth multiplier.
    #[serde(default = "default_growth_clamp_min")]
    pub growth_multiplier_min: f64,
    /// Upper clamp of the dynamic growth multiplier.
    #[serde(default = "default_growth_clamp_max")]
    pub growth_multiplier_max: f64,
    /// Research points granted per PP of allocation.
    #[serde(default = "default_rp_per_pp")]
    pub research_points_per_pp: u32,
    /// Research points required per level, times the next level.
    #[serde(default = "default_tech_level_cost")]
    pub tech_level_cost_base: u32,
    /// PP cost to terraform a colony one class upward.
    #[serde(default = "default_terraform_cost")]
    pub terraform_cost_pp: i64,
    /// Turns a terraforming project takes.
    #[serde(default = "default_terraform_turns")]
    pub terraform_turns: u32,
}

impl Default for EconomyTable {
    fn default() -> Self {
        Self {
            planet_classes: default_planet_classes(),
            el_bonus_pct_per_level: default_el_bonus_pct(),
            blockade_penalty_pct: default_blockade_penalty_pct(),
            iu_passive_divisor: default_iu_passive_divisor(),
            iu_invest_tiers: default_iu_tiers(),
            crippled_maintenance_pct: default_crippled_maintenance_pct(),
            repair_cost_pct: default_repair_cost_pct(),
            ship_repair_turns: default_repair_turns(),
            shortfall_base: default_shortfall_base(),
            shortfall_increment: default_shortfall_increment(),
            salvage_pct: default_salvage_pct(),
            baseline_systems_per_player: default_baseline_systems_per_player(),
            growth_multiplier_min: default_growth_clamp_min(),
            growth_multiplier_max: default_growth_clamp_max(),
            research_points_per_pp: default_rp_per_pp(),
            tech_level_cost_base: default_tech_level_cost(),
            terraform_cost_pp: default_terraform_cost(),
            terraform_turns: default_terraform_turns(),
        }
    }
}

impl EconomyTable {
    /// The row for `class`, falling back to the Benign baseline.
    pub fn class_row(&self, class: PlanetClass) -> PlanetClassRow {
        self.planet_classes
            .get(&class)
            .copied()
            .unwrap_or(PlanetClassRow {
                output_factor_pct: 100,
                growth_rate_permille: 10,
                transfer_cost: 4,
            })
    }

    /// Tax morale factor in percent for a tax rate in percent.
    ///
    /// Low taxes breed growth, confiscatory taxes strangle it.
    pub fn tax_morale_pct(tax_rate: u8) -> u32 {
        match tax_rate {
            0..=20 => 120,
            21..=40 => 110,
            41..=60 => 100,
            61..=80 => 75,
            _ => 50,
        }
    }
}

/// Prestige event values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrestigeTable {
    /// Signed delta per source category, applied to the acting house; the
    /// opposing house receives the negation unless the source is an
    /// achievement.
    #[serde(default = "default_prestige_deltas")]
    pub deltas: BTreeMap<PrestigeSource, i64>,
    /// Categories exempt from zero-sum pairing.
    #[serde(default = "default_achievements")]
    pub achievements: BTreeSet<PrestigeSource>,
}

impl Default for PrestigeTable {
    fn default() -> Self {
        Self {
            deltas: default_prestige_deltas(),
            achievements: default_achievements(),
        }
    }
}

impl PrestigeTable {
    /// The delta for `source` (0 if unlisted).
    pub fn delta(&self, source: PrestigeSource) -> i64 {
        self.deltas.get(&source).copied().unwrap_or(0)
    }

    /// Whether `source` is an achievement (non-zero-sum).
    pub fn is_achievement(&self, source: PrestigeSource) -> bool {
        self.achievements.contains(&source)
    }
}

/// Effect template applied by a successful espionage action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspionageEffectSpec {
    /// The ongoing effect kind to create.
    pub kind: EffectKind,
    /// Duration in turns.
    pub turns: u32,
    /// Magnitude in percent.
    pub magnitude: i32,
}

/// Descriptor for one espionage action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspionageActionSpec {
    /// EBP cost to attempt.
    pub cost_ebp: u32,
    /// Prestige gained on success (zero-sum with the target).
    pub prestige_on_success: i64,
    /// Research points stolen on success.
    pub srp_stolen: u32,
    /// IU damage die size rolled on success (0 = none).
    pub iu_damage_die: u32,
    /// Ongoing effect applied on success, if any.
    pub effect: Option<EspionageEffectSpec>,
    /// Whether success copies the target's intel database.
    pub steals_intel: bool,
}

/// Espionage constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspionageTable {
    /// PP per EBP.
    #[serde(default = "default_ebp_cost")]
    pub ebp_cost_pp: i64,
    /// PP per CIP.
    #[serde(default = "default_cip_cost")]
    pub cip_cost_pp: i64,
    /// Action descriptors.
    #[serde(default = "default_espionage_actions")]
    pub actions: BTreeMap<EspionageAction, EspionageActionSpec>,
    /// Detection threshold (d20, roll at or above detects) per CIC level.
    #[serde(default = "default_detection_thresholds")]
    pub detection_thresholds: BTreeMap<u8, u8>,
    /// CIP roll-modifier buckets: `(minimum points, modifier)`, ascending.
    #[serde(default = "default_cip_buckets")]
    pub cip_modifier_buckets: Vec<(u32, i32)>,
    /// Threshold shift granted by an active counter-intel sweep.
    #[serde(default = "default_sweep_shift")]
    pub sweep_threshold_shift: i32,
    /// Prestige penalty for a detected attempt.
    #[serde(default = "default_failed_espionage_prestige")]
    pub failed_espionage_prestige: i64,
    /// Chance (percent) a spy-scout mission is detected and the scout lost.
    #[serde(default = "default_scout_loss_pct")]
    pub scout_detection_pct: u32,
}

impl Default for EspionageTable {
    fn default() -> Self {
        Self {
            ebp_cost_pp: default_ebp_cost(),
            cip_cost_pp: default_cip_cost(),
            actions: default_espionage_actions(),
            detection_thresholds: default_detection_thresholds(),
            cip_modifier_buckets: default_cip_buckets(),
            sweep_threshold_shift: default_sweep_shift(),
            failed_espionage_prestige: default_failed_espionage_prestige(),
            scout_detection_pct: default_scout_loss_pct(),
        }
    }
}

impl EspionageTable {
    /// The descriptor for `action`.
    pub fn action(&self, action: EspionageAction) -> EspionageActionSpec {
        self.actions
            .get(&action)
            .copied()
            .unwrap_or(EspionageActionSpec {
                cost_ebp: 5,
                prestige_on_success: 1,
                srp_stolen: 0,
                iu_damage_die: 0,
                effect: None,
                steals_intel: false,
            })
    }

    /// Detection threshold for a defender at `cic_level`.
    pub fn threshold_for(&self, cic_level: u8) -> u8 {
        // Thresholds are keyed by level; use the highest key at or below.
        self.detection_thresholds
            .range(..=cic_level)
            .next_back()
            .map_or(16, |(_, t)| *t)
    }

    /// Roll modifier for a defender holding `cip` points.
    pub fn cip_modifier(&self, cip: u32) -> i32 {
        let mut modifier = 0;
        for (min_points, m) in &self.cip_modifier_buckets {
            if cip >= *min_points {
                modifier = *m;
            }
        }
        modifier
    }
}

/// Starmap generation constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarmapTable {
    /// Explicit ring count; `None` derives `max(2, players - 1)`.
    #[serde(default)]
    pub rings_override: Option<u32>,
    /// Weighted-random draw weights for Major lanes.
    #[serde(default = "default_major_weight")]
    pub major_lane_weight: u32,
    /// Weighted-random draw weights for Minor lanes.
    #[serde(default = "default_minor_weight")]
    pub minor_lane_weight: u32,
    /// Weighted-random draw weights for Restricted lanes.
    #[serde(default = "default_restricted_weight")]
    pub restricted_lane_weight: u32,
    /// Major lanes guaranteed to each homeworld.
    #[serde(default = "default_homeworld_major_lanes")]
    pub homeworld_major_lanes: u32,
    /// Maximum lane connections per homeworld.
    #[serde(default = "default_homeworld_max_connections")]
    pub homeworld_max_connections: u32,
}

impl Default for StarmapTable {
    fn default() -> Self {
        Self {
            rings_override: None,
            major_lane_weight: default_major_weight(),
            minor_lane_weight: default_minor_weight(),
            restricted_lane_weight: default_restricted_weight(),
            homeworld_major_lanes: default_homeworld_major_lanes(),
            homeworld_max_connections: default_homeworld_max_connections(),
        }
    }
}

/// Military capacity constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilitaryTable {
    /// IU per base fighter slot.
    #[serde(default = "default_fighter_iu_divisor")]
    pub fighter_iu_divisor: u32,
    /// Fighter-capacity multiplier percent per fighter-doctrine level.
    #[serde(default = "default_fd_multiplier_pct")]
    pub fd_multiplier_pct_per_level: u32,
    /// Turns a fighter-capacity violation is tolerated before disbanding.
    #[serde(default = "default_fighter_grace_turns")]
    pub fighter_grace_turns: u32,
    /// Minimum capital squadrons regardless of industry.
    #[serde(default = "default_capital_squadron_min")]
    pub capital_squadron_min: u32,
    /// Total IU per two capital squadrons.
    #[serde(default = "default_squadron_iu_divisor")]
    pub squadron_iu_divisor: u32,
}

impl Default for MilitaryTable {
    fn default() -> Self {
        Self {
            fighter_iu_divisor: default_fighter_iu_divisor(),
            fd_multiplier_pct_per_level: default_fd_multiplier_pct(),
            fighter_grace_turns: default_fighter_grace_turns(),
            capital_squadron_min: default_capital_squadron_min(),
            squadron_iu_divisor: default_squadron_iu_divisor(),
        }
    }
}

/// Transport-guild constants governing population transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildTable {
    /// Per-hex surcharge added to the destination class cost.
    #[serde(default = "default_per_hex_surcharge")]
    pub per_hex_surcharge: i64,
    /// Minimum PU the source colony must retain.
    #[serde(default = "default_min_retained_pu")]
    pub min_retained_pu: u32,
    /// Maximum concurrent transfers per house.
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: u32,
    /// Hexes a transfer convoy covers per turn.
    #[serde(default = "default_transfer_speed")]
    pub transfer_speed_hexes_per_turn: u32,
}

impl Default for GuildTable {
    fn default() -> Self {
        Self {
            per_hex_surcharge: default_per_hex_surcharge(),
            min_retained_pu: default_min_retained_pu(),
            max_concurrent_transfers: default_max_concurrent_transfers(),
            transfer_speed_hexes_per_turn: default_transfer_speed(),
        }
    }
}

/// Standing-order behavior constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingOrderTable {
    /// Whether fleets with no orders fall back to their standing order.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for StandingOrderTable {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_ship_specs() -> BTreeMap<ShipClass, ShipSpec> {
    let rows = [
        (ShipClass::Fighter, ShipSpec { attack: 1, defense: 1, command_cost: 0, command_rating: 0, build_cost: 8, build_turns: 1, maintenance: 0, cargo_capacity: 0 }),
        (ShipClass::Transport, ShipSpec { attack: 0, defense: 2, command_cost: 1, command_rating: 0, build_cost: 25, build_turns: 1, maintenance: 1, cargo_capacity: 50 }),
        (ShipClass::Scout, ShipSpec { attack: 1, defense: 1, command_cost: 1, command_rating: 0, build_cost: 20, build_turns: 1, maintenance: 1, cargo_capacity: 0 }),
        (ShipClass::Corvette, ShipSpec { attack: 2, defense: 2, command_cost: 1, command_rating: 0, build_cost: 40, build_turns: 2, maintenance: 2, cargo_capacity: 0 }),
        (ShipClass::Frigate, ShipSpec { attack: 3, defense: 3, command_cost: 2, command_rating: 0, build_cost: 60, build_turns: 2, maintenance: 3, cargo_capacity: 0 }),
        (ShipClass::Destroyer, ShipSpec { attack: 5, defense: 4, command_cost: 2, command_rating: 4, build_cost: 90, build_turns: 2, maintenance: 4, cargo_capacity: 0 }),
        (ShipClass::Cruiser, ShipSpec { attack: 7, defense: 6, command_cost: 3, command_rating: 6, build_cost: 130, build_turns: 3, maintenance: 6, cargo_capacity: 5 }),
        (ShipClass::Battlecruiser, ShipSpec { attack: 9, defense: 7, command_cost: 4, command_rating: 8, build_cost: 170, build_turns: 3, maintenance: 8, cargo_capacity: 5 }),
        (ShipClass::Battleship, ShipSpec { attack: 12, defense: 10, command_cost: 5, command_rating: 10, build_cost: 220, build_turns: 4, maintenance: 10, cargo_capacity: 10 }),
        (ShipClass::Carrier, ShipSpec { attack: 4, defense: 8, command_cost: 5, command_rating: 12, build_cost: 240, build_turns: 4, maintenance: 11, cargo_capacity: 20 }),
        (ShipClass::Dreadnought, ShipSpec { attack: 16, defense: 14, command_cost: 6, command_rating: 14, build_cost: 320, build_turns: 5, maintenance: 14, cargo_capacity: 10 }),
        (ShipClass::PlanetBreaker, ShipSpec { attack: 20, defense: 8, command_cost: 8, command_rating: 0, build_cost: 400, build_turns: 6, maintenance: 18, cargo_capacity: 0 }),
    ];
    rows.into_iter().collect()
}

fn default_ground_specs() -> BTreeMap<GroundUnitKind, GroundUnitSpec> {
    let rows = [
        (GroundUnitKind::Army, GroundUnitSpec { build_cost: 15, build_turns: 1, combat_strength: 3, maintenance: 1 }),
        (GroundUnitKind::Marine, GroundUnitSpec { build_cost: 25, build_turns: 1, combat_strength: 4, maintenance: 1 }),
        (GroundUnitKind::GroundBattery, GroundUnitSpec { build_cost: 40, build_turns: 2, combat_strength: 5, maintenance: 2 }),
    ];
    rows.into_iter().collect()
}

fn default_facility_specs() -> BTreeMap<FacilityKind, FacilitySpec> {
    let rows = [
        (FacilityKind::Spaceport, FacilitySpec { build_cost: 120, build_turns: 3, docks: 2, maintenance: 4, attack: 0, defense: 0, surveillance_radius: 0 }),
        (FacilityKind::Shipyard, FacilitySpec { build_cost: 200, build_turns: 4, docks: 3, maintenance: 6, attack: 0, defense: 0, surveillance_radius: 0 }),
        (FacilityKind::Drydock, FacilitySpec { build_cost: 160, build_turns: 3, docks: 2, maintenance: 5, attack: 0, defense: 0, surveillance_radius: 0 }),
        (FacilityKind::Starbase, FacilitySpec { build_cost: 350, build_turns: 5, docks: 0, maintenance: 12, attack: 14, defense: 16, surveillance_radius: 2 }),
    ];
    rows.into_iter().collect()
}

fn default_shield_levels() -> Vec<ShieldLevelSpec> {
    vec![
        ShieldLevelSpec { block_chance_pct: 20, build_cost: 150, build_turns: 3 },
        ShieldLevelSpec { block_chance_pct: 35, build_cost: 250, build_turns: 4 },
        ShieldLevelSpec { block_chance_pct: 50, build_cost: 400, build_turns: 5 },
    ]
}

fn default_planet_classes() -> BTreeMap<PlanetClass, PlanetClassRow> {
    let rows = [
        (PlanetClass::Extreme, PlanetClassRow { output_factor_pct: 40, growth_rate_permille: 2, transfer_cost: 8 }),
        (PlanetClass::Desolate, PlanetClassRow { output_factor_pct: 55, growth_rate_permille: 4, transfer_cost: 7 }),
        (PlanetClass::Harsh, PlanetClassRow { output_factor_pct: 70, growth_rate_permille: 6, transfer_cost: 6 }),
        (PlanetClass::Poor, PlanetClassRow { output_factor_pct: 85, growth_rate_permille: 8, transfer_cost: 5 }),
        (PlanetClass::Benign, PlanetClassRow { output_factor_pct: 100, growth_rate_permille: 10, transfer_cost: 4 }),
        (PlanetClass::Lush, PlanetClassRow { output_factor_pct: 115, growth_rate_permille: 13, transfer_cost: 3 }),
        (PlanetClass::Eden, PlanetClassRow { output_factor_pct: 130, growth_rate_permille: 16, transfer_cost: 2 }),
    ];
    rows.into_iter().collect()
}

fn default_iu_tiers() -> Vec<IuCostTier> {
    vec![
        IuCostTier { max_iu_to_pu_pct: 25, cost_pp: 5 },
        IuCostTier { max_iu_to_pu_pct: 50, cost_pp: 6 },
        IuCostTier { max_iu_to_pu_pct: 75, cost_pp: 8 },
        IuCostTier { max_iu_to_pu_pct: 100, cost_pp: 10 },
        IuCostTier { max_iu_to_pu_pct: u32::MAX, cost_pp: 13 },
    ]
}

fn default_prestige_deltas() -> BTreeMap<PrestigeSource, i64> {
    let rows = [
        (PrestigeSource::SquadronDestroyed, 3),
        (PrestigeSource::SquadronLost, -3),
        (PrestigeSource::StarbaseDestroyed, 5),
        (PrestigeSource::StarbaseLost, -5),
        (PrestigeSource::ForcedRetreat, 2),
        (PrestigeSource::WasForcedToRetreat, -2),
        (PrestigeSource::PlanetInvaded, 10),
        (PrestigeSource::PlanetLost, -10),
        (PrestigeSource::ColonyEstablished, 5),
        (PrestigeSource::TechAdvance, 2),
        (PrestigeSource::EspionageSuccess, 1),
        (PrestigeSource::EspionageDetected, -2),
        (PrestigeSource::MaintenanceShortfall, -1),
        (PrestigeSource::PactViolation, -8),
        (PrestigeSource::AttackedDishonored, 1),
        (PrestigeSource::UnprovokedAssault, -3),
    ];
    rows.into_iter().collect()
}

fn default_achievements() -> BTreeSet<PrestigeSource> {
    BTreeSet::from([
        PrestigeSource::ColonyEstablished,
        PrestigeSource::TechAdvance,
        PrestigeSource::MaintenanceShortfall,
        PrestigeSource::PactViolation,
        PrestigeSource::AttackedDishonored,
        PrestigeSource::UnprovokedAssault,
    ])
}

fn default_espionage_actions() -> BTreeMap<EspionageAction, EspionageActionSpec> {
    let none = |cost_ebp: u32, prestige: i64| EspionageActionSpec {
        cost_ebp,
        prestige_on_success: prestige,
        srp_stolen: 0,
        iu_damage_die: 0,
        effect: None,
        steals_intel: false,
    };
    let rows = [
        (EspionageAction::TechTheft, EspionageActionSpec { srp_stolen: 20, ..none(5, 2) }),
        (EspionageAction::SabotageLow, EspionageActionSpec { iu_damage_die: 6, ..none(2, 1) }),
        (EspionageAction::SabotageHigh, EspionageActionSpec { iu_damage_die: 20, ..none(7, 2) }),
        (EspionageAction::Assassination, none(10, 5)),
        (EspionageAction::CyberAttack, EspionageActionSpec {
            effect: Some(EspionageEffectSpec { kind: EffectKind::IntelCorrupted, turns: 3, magnitude: 25 }),
            ..none(6, 2)
        }),
        (EspionageAction::EconomicManipulation, EspionageActionSpec {
            effect: Some(EspionageEffectSpec { kind: EffectKind::NcvReduction, turns: 3, magnitude: 15 }),
            ..none(6, 2)
        }),
        (EspionageAction::PsyopsCampaign, EspionageActionSpec {
            effect: Some(EspionageEffectSpec { kind: EffectKind::TaxReduction, turns: 3, magnitude: 20 }),
            ..none(3, 1)
        }),
        (EspionageAction::CounterIntelSweep, none(4, 0)),
        (EspionageAction::IntelTheft, EspionageActionSpec { steals_intel: true, ..none(8, 2) }),
        (EspionageAction::PlantDisinformation, EspionageActionSpec {
            effect: Some(EspionageEffectSpec { kind: EffectKind::IntelCorrupted, turns: 4, magnitude: 40 }),
            ..none(6, 1)
        }),
    ];
    rows.into_iter().collect()
}

fn default_detection_thresholds() -> BTreeMap<u8, u8> {
    // CIC level -> d20 threshold. Better counter-intel detects on lower rolls.
    [(0, 18), (1, 16), (2, 14), (3, 12), (4, 10), (5, 8)]
        .into_iter()
        .collect()
}

fn default_cip_buckets() -> Vec<(u32, i32)> {
    vec![(5, 1), (15, 2), (30, 3), (50, 5)]
}

const fn default_round_coefficient() -> f64 {
    1.0
}
const fn default_max_rounds() -> u32 {
    5
}
const fn default_critical_threshold() -> u8 {
    19
}
const fn default_starbase_die_modifier() -> i32 {
    1
}
const fn default_wep_bonus_pct() -> u32 {
    10
}
const fn default_sld_bonus_pct() -> u32 {
    10
}
const fn default_crippled_attack_pct() -> u32 {
    50
}
const fn default_scout_cer_pct() -> u32 {
    10
}
const fn default_surprise_cer_pct() -> u32 {
    25
}
const fn default_ambush_cer_pct() -> u32 {
    20
}
const fn default_stalemate_drm() -> u32 {
    2
}
const fn default_pursuit_pct() -> u32 {
    50
}
const fn default_reserve_pct() -> u32 {
    50
}
const fn default_bombard_die() -> u32 {
    20
}
const fn default_ground_threshold_pct() -> u32 {
    100
}
const fn default_invasion_iu_loss_pct() -> u32 {
    10
}
const fn default_blitz_iu_loss_pct() -> u32 {
    10
}
const fn default_el_bonus_pct() -> u32 {
    5
}
const fn default_blockade_penalty_pct() -> u32 {
    50
}
const fn default_iu_passive_divisor() -> u32 {
    200
}
const fn default_crippled_maintenance_pct() -> u32 {
    150
}
const fn default_repair_cost_pct() -> u32 {
    30
}
const fn default_repair_turns() -> u32 {
    1
}
const fn default_shortfall_base() -> u8 {
    5
}
const fn default_shortfall_increment() -> u8 {
    5
}
const fn default_salvage_pct() -> u32 {
    25
}
const fn default_baseline_systems_per_player() -> f64 {
    9.25
}
const fn default_growth_clamp_min() -> f64 {
    0.5
}
const fn default_growth_clamp_max() -> f64 {
    2.0
}
const fn default_rp_per_pp() -> u32 {
    1
}
const fn default_terraform_cost() -> i64 {
    250
}
const fn default_terraform_turns() -> u32 {
    5
}
const fn default_tech_level_cost() -> u32 {
    50
}
const fn default_ebp_cost() -> i64 {
    10
}
const fn default_cip_cost() -> i64 {
    10
}
const fn default_sweep_shift() -> i32 {
    5
}
const fn default_failed_espionage_prestige() -> i64 {
    -2
}
const fn default_scout_loss_pct() -> u32 {
    30
}
const fn default_major_weight() -> u32 {
    5
}
const fn default_minor_weight() -> u32 {
    3
}
const fn default_restricted_weight() -> u32 {
    2
}
const fn default_homeworld_major_lanes() -> u32 {
    3
}
const fn default_homeworld_max_connections() -> u32 {
    3
}
const fn default_fighter_iu_divisor() -> u32 {
    10
}
const fn default_fd_multiplier_pct() -> u32 {
    25
}
const fn default_fighter_grace_turns() -> u32 {
    3
}
const fn default_capital_squadron_min() -> u32 {
    4
}
const fn default_squadron_iu_divisor() -> u32 {
    50
}
const fn default_per_hex_surcharge() -> i64 {
    1
}
const fn default_min_retained_pu() -> u32 {
    20
}
const fn default_max_concurrent_transfers() -> u32 {
    4
}
const fn default_transfer_speed() -> u32 {
    2
}
const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_ship_class_has_a_default_row() {
        let table = ShipTable::default();
        for class in ShipClass::ALL {
            assert!(table.classes.contains_key(&class), "missing {class:?}");
        }
    }

    #[test]
    fn transfer_cost_ladder_matches_class_order() {
        let table = EconomyTable::default();
        assert_eq!(table.class_row(PlanetClass::Eden).transfer_cost, 2);
        assert_eq!(table.class_row(PlanetClass::Benign).transfer_cost, 4);
        assert_eq!(table.class_row(PlanetClass::Extreme).transfer_cost, 8);
    }

    #[test]
    fn detection_threshold_uses_highest_key_at_or_below() {
        let table = EspionageTable::default();
        assert_eq!(table.threshold_for(0), 18);
        assert_eq!(table.threshold_for(3), 12);
        // Beyond the last key, the best threshold applies.
        assert_eq!(table.threshold_for(9), 8);
    }

    #[test]
    fn cip_modifier_buckets_are_cumulative_maximums() {
        let table = EspionageTable::default();
        assert_eq!(table.cip_modifier(0), 0);
        assert_eq!(table.cip_modifier(5), 1);
        assert_eq!(table.cip_modifier(29), 2);
        assert_eq!(table.cip_modifier(100), 5);
    }

    #[test]
    fn tax_morale_rewards_low_taxes() {
        assert!(EconomyTable::tax_morale_pct(10) > EconomyTable::tax_morale_pct(50));
        assert!(EconomyTable::tax_morale_pct(50) > EconomyTable::tax_morale_pct(90));
    }
}
