//! Scenario loading: the `GameSetup` consumed by `new_game`.
//!
//! A scenario names the players and describes the homeworld template every
//! house starts from. Like the rule tables, every field has a default so a
//! scenario file only states what it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use ec4x_types::enums::{FacilityKind, ShipClass, TechField};

use crate::error::RulesError;

/// Everything needed to create a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    /// Display name of the game.
    #[serde(default = "default_game_name")]
    pub name: String,
    /// The player slots, in house-id order.
    #[serde(default = "default_players")]
    pub players: Vec<PlayerSlot>,
    /// Explicit map ring count; `None` derives from the player count.
    #[serde(default)]
    pub rings: Option<u32>,
    /// Game seed. Every random draw in the game's life derives from it.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Starting treasury per house, in PP.
    #[serde(default = "default_starting_treasury")]
    pub starting_treasury: i64,
    /// The homeworld template applied to every house.
    #[serde(default)]
    pub homeworld: HomeworldTemplate,
    /// Victory conditions.
    #[serde(default)]
    pub victory: VictoryConditions,
}

impl Default for GameSetup {
    fn default() -> Self {
        Self {
            name: default_game_name(),
            players: default_players(),
            rings: None,
            seed: default_seed(),
            starting_treasury: default_starting_treasury(),
            homeworld: HomeworldTemplate::default(),
            victory: VictoryConditions::default(),
        }
    }
}

impl GameSetup {
    /// Load a setup from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Io`] if the file cannot be read, or
    /// [`RulesError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a setup from a YAML string, then validate it.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Yaml`] on malformed YAML, or
    /// [`RulesError::OutOfRange`] if the player count is unplayable.
    pub fn parse(yaml: &str) -> Result<Self, RulesError> {
        let setup: Self = serde_yml::from_str(yaml)?;
        setup.validate()?;
        Ok(setup)
    }

    /// Check the setup is playable.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::OutOfRange`] naming the first violation.
    pub fn validate(&self) -> Result<(), RulesError> {
        let n = self.players.len();
        if !(2..=12).contains(&n) {
            return Err(RulesError::OutOfRange {
                what: format!("player count {n} (must be 2-12)"),
            });
        }
        if self.homeworld.population_units == 0 {
            return Err(RulesError::OutOfRange {
                what: "homeworld.population_units (must be positive)".to_owned(),
            });
        }
        Ok(())
    }
}

/// One player slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    /// House display name.
    pub name: String,
}

/// The homeworld every house starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeworldTemplate {
    /// Starting population units.
    #[serde(default = "default_homeworld_pu")]
    pub population_units: u32,
    /// Starting industrial units.
    #[serde(default = "default_homeworld_iu")]
    pub industrial_units: u32,
    /// Starting facilities.
    #[serde(default = "default_homeworld_facilities")]
    pub facilities: Vec<FacilityKind>,
    /// Starting garrison: armies.
    #[serde(default = "default_homeworld_armies")]
    pub armies: u32,
    /// Starting garrison: marines.
    #[serde(default = "default_homeworld_marines")]
    pub marines: u32,
    /// Starting squadrons, each a flagship class plus escort classes.
    #[serde(default = "default_starting_squadrons")]
    pub starting_squadrons: Vec<StartingSquadron>,
    /// Starting tech levels; unlisted fields start at zero.
    #[serde(default)]
    pub starting_tech: Vec<(TechField, u8)>,
}

impl Default for HomeworldTemplate {
    fn default() -> Self {
        Self {
            population_units: default_homeworld_pu(),
            industrial_units: default_homeworld_iu(),
            facilities: default_homeworld_facilities(),
            armies: default_homeworld_armies(),
            marines: default_homeworld_marines(),
            starting_squadrons: default_starting_squadrons(),
            starting_tech: Vec::new(),
        }
    }
}

/// One starting squadron: a flagship and its escorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingSquadron {
    /// The flagship's hull class.
    pub flagship: ShipClass,
    /// Escort hull classes.
    #[serde(default)]
    pub escorts: Vec<ShipClass>,
}

/// How the game ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VictoryConditions {
    /// Prestige at which a house wins outright.
    #[serde(default = "default_prestige_target")]
    pub prestige_target: Option<i64>,
    /// Hard turn limit; highest prestige wins at the limit.
    #[serde(default)]
    pub turn_limit: Option<u32>,
}

impl Default for VictoryConditions {
    fn default() -> Self {
        Self {
            prestige_target: default_prestige_target(),
            turn_limit: None,
        }
    }
}

fn default_game_name() -> String {
    "EC4X".to_owned()
}

fn default_players() -> Vec<PlayerSlot> {
    vec![
        PlayerSlot { name: "House Alpha".to_owned() },
        PlayerSlot { name: "House Bravo".to_owned() },
        PlayerSlot { name: "House Charlie".to_owned() },
        PlayerSlot { name: "House Delta".to_owned() },
    ]
}

const fn default_seed() -> u64 {
    42
}

const fn default_starting_treasury() -> i64 {
    500
}

const fn default_homeworld_pu() -> u32 {
    500
}

const fn default_homeworld_iu() -> u32 {
    50
}

fn default_homeworld_facilities() -> Vec<FacilityKind> {
    vec![FacilityKind::Spaceport, FacilityKind::Shipyard]
}

const fn default_homeworld_armies() -> u32 {
    2
}

const fn default_homeworld_marines() -> u32 {
    1
}

fn default_starting_squadrons() -> Vec<StartingSquadron> {
    vec![
        StartingSquadron {
            flagship: ShipClass::Destroyer,
            escorts: vec![ShipClass::Corvette, ShipClass::Corvette],
        },
        StartingSquadron {
            flagship: ShipClass::Destroyer,
            escorts: vec![ShipClass::Scout, ShipClass::Transport],
        },
    ]
}

const fn default_prestige_target() -> Option<i64> {
    Some(400)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_setup_validates() {
        assert!(GameSetup::default().validate().is_ok());
    }

    #[test]
    fn single_player_is_rejected() {
        let yaml = "players:\n  - name: Loner\n";
        assert!(matches!(
            GameSetup::parse(yaml),
            Err(RulesError::OutOfRange { .. })
        ));
    }

    #[test]
    fn overrides_apply_over_defaults() {
        let yaml = concat!(
            "name: Border War\n",
            "seed: 7\n",
            "players:\n",
            "  - name: North\n",
            "  - name: South\n",
        );
        let setup = GameSetup::parse(yaml).unwrap();
        assert_eq!(setup.name, "Border War");
        assert_eq!(setup.seed, 7);
        assert_eq!(setup.players.len(), 2);
        assert_eq!(setup.homeworld, HomeworldTemplate::default());
    }
}
