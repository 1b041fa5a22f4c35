//! House records: the player factions and their internal ledgers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{DiplomaticState, PrestigeSource, TechField};
use crate::ids::HouseId;
use crate::intel::IntelligenceDatabase;

/// A player faction.
///
/// Houses are created at game setup and never removed; elimination is a
/// flag, so ledgers and diplomatic history survive the house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    /// This house's identifier.
    pub id: HouseId,
    /// Display name.
    pub name: String,
    /// Production points on hand. Never negative.
    pub treasury: i64,
    /// Current prestige, the primary victory metric.
    pub prestige: i64,
    /// Set when the house has lost its last colony and its last fleet.
    pub eliminated: bool,
    /// Technology levels and accumulated research points.
    pub tech: TechTree,
    /// Stance toward every other house. Absent means `Neutral`.
    pub diplomatic_relations: BTreeMap<HouseId, DiplomaticState>,
    /// Everything this house believes about the galaxy.
    pub intelligence_db: IntelligenceDatabase,
    /// Espionage budget points.
    pub espionage: EspionageBudget,
    /// Prestige ledger, append-only.
    pub prestige_ledger: Vec<PrestigeEntry>,
    /// Turns remaining of dishonored status from a pact violation.
    pub dishonored_turns: u32,
    /// Turns remaining of diplomatic isolation from a pact violation.
    pub isolation_turns: u32,
    /// Hex-encoded X25519 public key of the player's client, for the
    /// encrypted transport. Empty until the player joins.
    pub transport_pubkey: String,
}

impl House {
    /// Create a fresh house with empty ledgers.
    pub fn new(id: HouseId, name: impl Into<String>, treasury: i64) -> Self {
        Self {
            id,
            name: name.into(),
            treasury,
            prestige: 0,
            eliminated: false,
            tech: TechTree::default(),
            diplomatic_relations: BTreeMap::new(),
            intelligence_db: IntelligenceDatabase::default(),
            espionage: EspionageBudget::default(),
            prestige_ledger: Vec::new(),
            dishonored_turns: 0,
            isolation_turns: 0,
            transport_pubkey: String::new(),
        }
    }

    /// Stance toward `other`, defaulting to `Neutral`.
    pub fn stance_toward(&self, other: HouseId) -> DiplomaticState {
        self.diplomatic_relations
            .get(&other)
            .copied()
            .unwrap_or(DiplomaticState::Neutral)
    }
}

/// Technology levels plus accumulated research points per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechTree {
    /// Current level per field. Absent means level 0.
    pub levels: BTreeMap<TechField, u8>,
    /// Research points accumulated toward the next level.
    pub points: BTreeMap<TechField, u32>,
}

impl TechTree {
    /// Current level in `field`.
    pub fn level(&self, field: TechField) -> u8 {
        self.levels.get(&field).copied().unwrap_or(0)
    }

    /// Accumulated points in `field`.
    pub fn points(&self, field: TechField) -> u32 {
        self.points.get(&field).copied().unwrap_or(0)
    }
}

/// Offensive and defensive espionage point pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspionageBudget {
    /// Espionage budget points (offense).
    pub ebp: u32,
    /// Counter-intelligence points (defense).
    pub cip: u32,
}

/// One entry in a house's prestige ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrestigeEntry {
    /// What caused the change.
    pub source: PrestigeSource,
    /// Signed prestige delta.
    pub delta: i64,
    /// Human-readable reason.
    pub reason: String,
    /// Turn the change was applied.
    pub turn: u32,
}
