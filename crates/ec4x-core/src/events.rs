//! The per-turn event sink.
//!
//! Phases emit events into the sink as they mutate state; the resolver
//! drains it once the turn commits. Emission order is part of the
//! deterministic-replay contract, so phases only emit from their fixed
//! traversal order.

use ec4x_types::events::{EventKind, GameEvent, Visibility};

/// Collects the turn's events in emission order.
#[derive(Debug, Default)]
pub struct EventSink {
    turn: u32,
    events: Vec<GameEvent>,
}

impl EventSink {
    /// A sink for `turn`.
    pub const fn new(turn: u32) -> Self {
        Self {
            turn,
            events: Vec::new(),
        }
    }

    /// Emit an event with the given visibility scope.
    pub fn emit(&mut self, scope: Visibility, kind: EventKind) {
        self.events.push(GameEvent {
            turn: self.turn,
            scope,
            kind,
        });
    }

    /// Emit an event every house may see.
    pub fn emit_public(&mut self, kind: EventKind) {
        self.emit(Visibility::All, kind);
    }

    /// Number of events collected so far.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events have been emitted.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consume the sink, yielding the ordered event log.
    pub fn into_events(self) -> Vec<GameEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec4x_types::ids::HouseId;

    #[test]
    fn events_keep_emission_order_and_turn() {
        let mut sink = EventSink::new(9);
        sink.emit_public(EventKind::AutoHold { house: HouseId::new(1) });
        sink.emit(
            Visibility::only(HouseId::new(2)),
            EventKind::AutoHold { house: HouseId::new(2) },
        );
        let events = sink.into_events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.turn == 9));
        assert!(matches!(events[0].scope, Visibility::All));
    }
}
