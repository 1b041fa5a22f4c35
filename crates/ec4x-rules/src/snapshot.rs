//! The materialized rule snapshot.
//!
//! Loaded once per game, then immutable. Every player delta embeds the
//! snapshot's `config_hash` so clients can detect rule-version drift and
//! fail loudly instead of desynchronizing.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RulesError;
use crate::tables::{
    CombatTable, EconomyTable, EspionageTable, FacilityTable, GroundUnitTable, GuildTable,
    MilitaryTable, PrestigeTable, ShipTable, StandingOrderTable, StarmapTable,
};

/// The immutable bundle of rule tables one game runs under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    /// Ship statistics.
    #[serde(default)]
    pub ships: ShipTable,
    /// Ground unit statistics.
    #[serde(default)]
    pub ground_units: GroundUnitTable,
    /// Facility statistics.
    #[serde(default)]
    pub facilities: FacilityTable,
    /// Combat constants.
    #[serde(default)]
    pub combat: CombatTable,
    /// Economy constants.
    #[serde(default)]
    pub economy: EconomyTable,
    /// Prestige event values.
    #[serde(default)]
    pub prestige: PrestigeTable,
    /// Espionage constants.
    #[serde(default)]
    pub espionage: EspionageTable,
    /// Starmap generation constants.
    #[serde(default)]
    pub starmap: StarmapTable,
    /// Military capacity constants.
    #[serde(default)]
    pub military: MilitaryTable,
    /// Transport-guild constants.
    #[serde(default)]
    pub guild: GuildTable,
    /// Standing-order behavior.
    #[serde(default)]
    pub standing_orders: StandingOrderTable,
}

impl RuleSnapshot {
    /// Load a snapshot from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Io`] if the file cannot be read, or
    /// [`RulesError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a snapshot from a YAML string, then validate it.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Yaml`] on malformed YAML, or
    /// [`RulesError::OutOfRange`] if a table value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, RulesError> {
        let snapshot: Self = serde_yml::from_str(yaml)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check cross-table constraints a malformed override could break.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::OutOfRange`] naming the first violation.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.combat.critical_threshold == 0 || self.combat.critical_threshold > 20 {
            return Err(RulesError::OutOfRange {
                what: format!(
                    "combat.critical_threshold {} (must be 1-20)",
                    self.combat.critical_threshold
                ),
            });
        }
        if self.combat.round_coefficient <= 0.0 {
            return Err(RulesError::OutOfRange {
                what: "combat.round_coefficient (must be positive)".to_owned(),
            });
        }
        if self.economy.growth_multiplier_min > self.economy.growth_multiplier_max {
            return Err(RulesError::OutOfRange {
                what: "economy growth multiplier clamp (min > max)".to_owned(),
            });
        }
        if self.starmap.homeworld_major_lanes > 6 {
            return Err(RulesError::OutOfRange {
                what: format!(
                    "starmap.homeworld_major_lanes {} (a hex has 6 neighbors)",
                    self.starmap.homeworld_major_lanes
                ),
            });
        }
        if self.guild.transfer_speed_hexes_per_turn == 0 {
            return Err(RulesError::OutOfRange {
                what: "guild.transfer_speed_hexes_per_turn (must be at least 1)".to_owned(),
            });
        }
        Ok(())
    }

    /// SHA-256 over the canonical JSON serialization of the materialized
    /// snapshot, hex-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Serialize`] if serialization fails.
    pub fn config_hash(&self) -> Result<String, RulesError> {
        let canonical = serde_json::to_vec(self)?;
        let digest = Sha256::digest(&canonical);
        Ok(hex::encode(digest))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_validates() {
        assert!(RuleSnapshot::default().validate().is_ok());
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let snapshot = RuleSnapshot::parse("{}").unwrap();
        assert_eq!(snapshot, RuleSnapshot::default());
    }

    #[test]
    fn hash_is_stable_and_sensitive() {
        let a = RuleSnapshot::default();
        let b = RuleSnapshot::default();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());

        let mut c = RuleSnapshot::default();
        c.combat.max_rounds_per_turn = 9;
        assert_ne!(a.config_hash().unwrap(), c.config_hash().unwrap());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let yaml = "combat:\n  critical_threshold: 25\n";
        assert!(matches!(
            RuleSnapshot::parse(yaml),
            Err(RulesError::OutOfRange { .. })
        ));
    }

    #[test]
    fn override_survives_parse() {
        let yaml = "economy:\n  blockade_penalty_pct: 75\n";
        let snapshot = RuleSnapshot::parse(yaml).unwrap();
        assert_eq!(snapshot.economy.blockade_penalty_pct, 75);
        // Untouched tables keep their defaults.
        assert_eq!(snapshot.military, MilitaryTable::default());
    }
}
