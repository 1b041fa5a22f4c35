//! The per-game inbound order queue.
//!
//! Order uploads arrive asynchronously over the relay and sit here until
//! the turn loop drains them. One packet per house per turn: a resubmission
//! replaces the earlier packet, which is how players amend orders before
//! the deadline.

use std::collections::BTreeMap;

use tracing::debug;

use ec4x_types::ids::HouseId;
use ec4x_types::orders::CommandPacket;

/// Pending packets for one game, keyed by house.
#[derive(Debug, Default)]
pub struct PacketInbox {
    pending: BTreeMap<HouseId, CommandPacket>,
}

impl PacketInbox {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposit a packet, replacing any earlier one from the same house.
    pub fn deposit(&mut self, packet: CommandPacket) {
        debug!(house = %packet.house, turn = packet.turn, "order packet deposited");
        self.pending.insert(packet.house, packet);
    }

    /// Houses that have submitted.
    pub fn submitted(&self) -> Vec<HouseId> {
        self.pending.keys().copied().collect()
    }

    /// Whether every house in `required` has submitted.
    pub fn all_in(&self, required: &[HouseId]) -> bool {
        required.iter().all(|house| self.pending.contains_key(house))
    }

    /// Whether any packet is waiting.
    pub fn any(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain everything for resolution.
    pub fn drain(&mut self) -> BTreeMap<HouseId, CommandPacket> {
        core::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resubmission_replaces_the_earlier_packet() {
        let mut inbox = PacketInbox::new();
        let house = HouseId::new(1);
        let mut first = CommandPacket::hold(house, 3);
        first.turn = 3;
        inbox.deposit(first);
        let mut second = CommandPacket::hold(house, 3);
        second.transfers.push(ec4x_types::orders::TransferOrder {
            source: ec4x_types::ids::SystemId::new(1),
            destination: ec4x_types::ids::SystemId::new(2),
            ptu: 5,
        });
        inbox.deposit(second.clone());

        let drained = inbox.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained.get(&house), Some(&second));
        assert!(!inbox.any());
    }

    #[test]
    fn all_in_tracks_the_required_set() {
        let mut inbox = PacketInbox::new();
        let required = vec![HouseId::new(0), HouseId::new(1)];
        inbox.deposit(CommandPacket::hold(HouseId::new(0), 1));
        assert!(!inbox.all_in(&required));
        inbox.deposit(CommandPacket::hold(HouseId::new(1), 1));
        assert!(inbox.all_in(&required));
    }
}
