//! The per-turn game event log.
//!
//! Every observable state change produces an immutable [`GameEvent`]
//! appended to the turn's log. Events carry a visibility scope; the
//! projection layer filters the log per house before anything leaves the
//! engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::enums::{
    DiplomaticState, EspionageAction, PrestigeSource, RejectReason, ShipClass, TechField,
};
use crate::ids::{FleetId, HouseId, ShipId, SquadronId, SystemId};

/// Who may see an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Every house sees it.
    All,
    /// Only the listed houses see it.
    Houses(BTreeSet<HouseId>),
}

impl Visibility {
    /// Scope visible to a single house.
    pub fn only(house: HouseId) -> Self {
        Self::Houses(BTreeSet::from([house]))
    }

    /// Scope visible to two houses.
    pub fn pair(a: HouseId, b: HouseId) -> Self {
        Self::Houses(BTreeSet::from([a, b]))
    }

    /// Whether `house` may see an event with this scope.
    pub fn includes(&self, house: HouseId) -> bool {
        match self {
            Self::All => true,
            Self::Houses(set) => set.contains(&house),
        }
    }
}

/// One immutable entry in the turn's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// The turn this event occurred in.
    pub turn: u32,
    /// Who may see it.
    pub scope: Visibility,
    /// What happened.
    pub kind: EventKind,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// An order failed validation. Visible only to the submitter.
    OrderRejected {
        /// The submitting house.
        house: HouseId,
        /// Why the order was rejected.
        reason: RejectReason,
        /// Short description of the rejected order.
        order: String,
    },
    /// A battle was fought.
    CombatResolved {
        /// Where.
        system: SystemId,
        /// The houses that fought.
        belligerents: Vec<HouseId>,
        /// The house that held the field, if any.
        victor: Option<HouseId>,
    },
    /// A squadron was destroyed in battle.
    SquadronDestroyed {
        /// The destroyed squadron.
        squadron: SquadronId,
        /// Its owner.
        owner: HouseId,
        /// Where it died.
        system: SystemId,
    },
    /// A squadron was scrapped (voluntarily or by capacity enforcement).
    SquadronScrapped {
        /// The scrapped squadron.
        squadron: SquadronId,
        /// Its owner.
        owner: HouseId,
        /// Salvage credited, in PP.
        salvage: i64,
    },
    /// A ship was destroyed.
    ShipDestroyed {
        /// The destroyed ship.
        ship: ShipId,
        /// Its class.
        class: ShipClass,
        /// Its owner.
        owner: HouseId,
        /// Where it died.
        system: SystemId,
    },
    /// A side was forced to retreat.
    FleetRetreated {
        /// The retreating fleet.
        fleet: FleetId,
        /// Its owner.
        owner: HouseId,
        /// Where it fled from.
        from: SystemId,
        /// Where it fled to.
        to: SystemId,
    },
    /// A colony was founded.
    ColonyEstablished {
        /// The new colony's system.
        system: SystemId,
        /// The founding house.
        owner: HouseId,
    },
    /// A colony changed hands by invasion.
    ColonyInvaded {
        /// The colony's system.
        system: SystemId,
        /// The previous owner.
        from: HouseId,
        /// The new owner.
        to: HouseId,
    },
    /// A colony was bombarded.
    ColonyBombarded {
        /// The colony's system.
        system: SystemId,
        /// The bombarding house.
        by: HouseId,
        /// Industrial units destroyed.
        iu_destroyed: u32,
    },
    /// A colony's population reached zero and the colony was removed.
    ColonyDestroyed {
        /// The dead colony's system.
        system: SystemId,
        /// Its last owner.
        owner: HouseId,
    },
    /// A diplomatic stance changed.
    DiplomaticShift {
        /// The house whose stance changed.
        source: HouseId,
        /// The house it changed toward.
        target: HouseId,
        /// The new stance.
        state: DiplomaticState,
    },
    /// A de-escalation offer was made.
    DeescalationOffered {
        /// The offering house.
        from: HouseId,
        /// The approached house.
        to: HouseId,
    },
    /// An espionage action succeeded.
    EspionageSucceeded {
        /// The acting house.
        by: HouseId,
        /// The victim.
        against: HouseId,
        /// The action taken.
        action: EspionageAction,
    },
    /// An espionage action was detected and foiled.
    EspionageDetected {
        /// The caught house.
        by: HouseId,
        /// The defending house that caught it.
        against: HouseId,
        /// The attempted action.
        action: EspionageAction,
    },
    /// A technology field advanced a level.
    TechAdvanced {
        /// The advancing house.
        house: HouseId,
        /// The field.
        field: TechField,
        /// The new level.
        level: u8,
    },
    /// Prestige changed.
    PrestigeChanged {
        /// The house whose prestige moved.
        house: HouseId,
        /// The source category.
        source: PrestigeSource,
        /// The signed delta.
        delta: i64,
    },
    /// A house failed to meet maintenance.
    MaintenanceShortfall {
        /// The delinquent house.
        house: HouseId,
        /// The colony that absorbed infrastructure damage.
        colony: SystemId,
        /// Damage applied, in percent.
        damage: u8,
    },
    /// A construction project was commissioned into service.
    ProjectCommissioned {
        /// The colony that built it.
        colony: SystemId,
        /// The owning house.
        owner: HouseId,
        /// Short description of what entered service.
        item: String,
    },
    /// A population transfer arrived.
    TransferArrived {
        /// The receiving colony's system.
        destination: SystemId,
        /// The owning house.
        owner: HouseId,
        /// PTU delivered.
        ptu: u32,
    },
    /// A house was eliminated.
    HouseEliminated {
        /// The fallen house.
        house: HouseId,
    },
    /// The game ended.
    GameEnded {
        /// The winning house, if any (`None` for a draw).
        winner: Option<HouseId>,
        /// Why the game ended.
        reason: String,
    },
    /// A house missed the submission deadline and was defaulted to hold.
    AutoHold {
        /// The tardy house.
        house: HouseId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_only_excludes_others() {
        let scope = Visibility::only(HouseId::new(1));
        assert!(scope.includes(HouseId::new(1)));
        assert!(!scope.includes(HouseId::new(2)));
    }

    #[test]
    fn visibility_all_includes_everyone() {
        assert!(Visibility::All.includes(HouseId::new(9)));
    }
}
