//! Order validation and staging.
//!
//! Each order in a [`CommandPacket`] is checked against the current state
//! and either staged or rejected with a typed [`RejectReason`]; one bad
//! order never sinks the packet. Orders that spend PP additionally pass
//! through a budget projection in submission order, so a packet asking for
//! more than the treasury holds has its later orders rejected.
//!
//! [`RejectReason`]: ec4x_types::enums::RejectReason

use tracing::debug;

use ec4x_rules::RuleSnapshot;
use ec4x_types::enums::{
    FleetPosture, GroundUnitKind, PlanetClass, RejectReason, ShipClass, ShipState,
};
use ec4x_types::fleet::Cargo;
use ec4x_types::ids::{FleetId, HouseId, SystemId};
use ec4x_types::orders::{
    BuildItem, BuildOrder, ColonyDirective, CommandPacket, DiplomaticCommand,
    EspionageDirective, FleetOrder, FleetVerb, RepairOrder, ScrapOrder, TransferOrder,
};

use crate::economy;
use crate::state::GameState;

/// The validated remains of one packet, plus what was turned away.
#[derive(Debug, Clone, Default)]
pub struct PacketReview {
    /// The orders that passed, ready for the phase pipeline.
    pub accepted: CommandPacket,
    /// Rejected orders: a short description and the reason.
    pub rejections: Vec<(String, RejectReason)>,
}

/// Running budget state for the projection pass.
struct Budget {
    remaining: i64,
}

impl Budget {
    /// Commit `cost` if it fits, or report the shortfall.
    fn commit(&mut self, cost: i64) -> Result<(), RejectReason> {
        if cost > self.remaining {
            return Err(RejectReason::InsufficientTreasury);
        }
        self.remaining = self.remaining.saturating_sub(cost);
        Ok(())
    }
}

/// Validate a house's packet against the current state.
pub fn validate_packet(
    state: &GameState,
    snapshot: &RuleSnapshot,
    packet: &CommandPacket,
) -> PacketReview {
    let house = packet.house;
    let mut review = PacketReview {
        accepted: CommandPacket {
            house,
            turn: packet.turn,
            ..CommandPacket::default()
        },
        rejections: Vec::new(),
    };
    let Some(house_record) = state.houses.get(&house) else {
        return review;
    };
    let mut budget = Budget {
        remaining: house_record.treasury,
    };

    let mut ordered_fleets: Vec<FleetId> = Vec::new();
    for order in &packet.fleet_orders {
        match check_fleet_order(state, house, order, &ordered_fleets) {
            Ok(()) => {
                ordered_fleets.push(order.fleet);
                review.accepted.fleet_orders.push(order.clone());
            }
            Err(reason) => reject(&mut review, format!("fleet order {:?}", order.verb), reason),
        }
    }

    for order in &packet.build_orders {
        match check_build_order(state, snapshot, house, order, &mut budget) {
            Ok(()) => review.accepted.build_orders.push(order.clone()),
            Err(reason) => reject(&mut review, format!("build {:?}", order.item), reason),
        }
    }

    for order in &packet.repair_orders {
        match check_repair_order(state, snapshot, house, order, &mut budget) {
            Ok(()) => review.accepted.repair_orders.push(*order),
            Err(reason) => reject(&mut review, format!("repair {order:?}"), reason),
        }
    }

    for order in &packet.scrap_orders {
        match check_scrap_order(state, house, order) {
            Ok(()) => review.accepted.scrap_orders.push(*order),
            Err(reason) => reject(&mut review, format!("scrap {order:?}"), reason),
        }
    }

    let research_total: i64 = packet
        .research
        .allocation
        .values()
        .map(|pp| i64::from(*pp))
        .sum();
    if budget.commit(research_total).is_ok() {
        review.accepted.research = packet.research.clone();
    } else {
        reject(
            &mut review,
            "research allocation".to_owned(),
            RejectReason::InsufficientTreasury,
        );
    }

    for command in &packet.diplomacy {
        match check_diplomatic_command(state, house, command) {
            Ok(()) => review.accepted.diplomacy.push(*command),
            Err(reason) => reject(&mut review, format!("diplomacy {command:?}"), reason),
        }
    }

    let mut accepted_transfers = 0u32;
    for order in &packet.transfers {
        match check_transfer(state, snapshot, house, order, accepted_transfers, &mut budget) {
            Ok(()) => {
                accepted_transfers = accepted_transfers.saturating_add(1);
                review.accepted.transfers.push(*order);
            }
            Err(reason) => reject(
                &mut review,
                format!("transfer {} -> {}", order.source, order.destination),
                reason,
            ),
        }
    }

    for directive in &packet.colony_directives {
        match check_colony_directive(state, house, directive) {
            Ok(()) => review.accepted.colony_directives.push(*directive),
            Err(reason) => reject(&mut review, format!("colony directive {}", directive.colony), reason),
        }
    }

    if let Some(espionage) = &packet.espionage {
        match check_espionage(state, snapshot, house, espionage, &mut budget) {
            Ok(()) => review.accepted.espionage = Some(*espionage),
            Err(reason) => reject(&mut review, "espionage directive".to_owned(), reason),
        }
    }

    for assignment in &packet.standing_orders {
        let owned = state
            .fleets
            .get(assignment.fleet)
            .is_some_and(|fleet| fleet.owner == house);
        if owned {
            review.accepted.standing_orders.push(*assignment);
        } else {
            reject(
                &mut review,
                format!("standing order for fleet {}", assignment.fleet),
                RejectReason::FleetNotOwned,
            );
        }
    }

    debug!(
        %house,
        accepted_fleet_orders = review.accepted.fleet_orders.len(),
        rejections = review.rejections.len(),
        "packet validated"
    );
    review
}

fn reject(review: &mut PacketReview, what: String, reason: RejectReason) {
    review.rejections.push((what, reason));
}

fn check_fleet_order(
    state: &GameState,
    house: HouseId,
    order: &FleetOrder,
    already_ordered: &[FleetId],
) -> Result<(), RejectReason> {
    let fleet = state
        .fleets
        .get(order.fleet)
        .ok_or(RejectReason::UnknownEntity)?;
    if fleet.owner != house {
        return Err(RejectReason::FleetNotOwned);
    }
    if already_ordered.contains(&order.fleet) {
        return Err(RejectReason::DuplicateOrder);
    }
    let here = fleet.location;
    let local_colony = state.colonies.get(&here);

    match &order.verb {
        FleetVerb::Move { destination } => {
            if state.map.get(*destination).is_none() {
                return Err(RejectReason::InvalidTarget);
            }
            let crippled = state.fleet_has_crippled(order.fleet);
            let result = ec4x_world::find_path(&state.map, here, *destination, crippled);
            if !result.found {
                return Err(RejectReason::PathUnreachable);
            }
            Ok(())
        }
        FleetVerb::SeekHome => {
            if state.colonies_of(house).is_empty() {
                return Err(RejectReason::InvalidTarget);
            }
            Ok(())
        }
        FleetVerb::Colonize => {
            if local_colony.is_some() {
                return Err(RejectReason::AlreadyColonized);
            }
            if !fleet_has_class(state, order.fleet, ShipClass::Transport) {
                return Err(RejectReason::MissingShip);
            }
            Ok(())
        }
        FleetVerb::Bombard | FleetVerb::Blockade => {
            let colony = local_colony.ok_or(RejectReason::InvalidTarget)?;
            foreign_live_target(state, house, colony.owner)
        }
        FleetVerb::Invade | FleetVerb::Blitz => {
            let colony = local_colony.ok_or(RejectReason::InvalidTarget)?;
            foreign_live_target(state, house, colony.owner)?;
            if !fleet_has_marines(state, order.fleet) {
                return Err(RejectReason::MissingShip);
            }
            Ok(())
        }
        FleetVerb::SpyPlanet => {
            let colony = local_colony.ok_or(RejectReason::InvalidTarget)?;
            foreign_live_target(state, house, colony.owner)?;
            if !fleet_has_class(state, order.fleet, ShipClass::Scout) {
                return Err(RejectReason::MissingShip);
            }
            Ok(())
        }
        FleetVerb::SpySystem => {
            if !fleet_has_class(state, order.fleet, ShipClass::Scout) {
                return Err(RejectReason::MissingShip);
            }
            Ok(())
        }
        FleetVerb::HackStarbase => {
            let colony = local_colony.ok_or(RejectReason::InvalidTarget)?;
            foreign_live_target(state, house, colony.owner)?;
            if colony.starbases.is_empty() {
                return Err(RejectReason::MissingFacility);
            }
            if !fleet_has_class(state, order.fleet, ShipClass::Scout) {
                return Err(RejectReason::MissingShip);
            }
            Ok(())
        }
        FleetVerb::Join { into } | FleetVerb::Rendezvous { with: into } => {
            let other = state
                .fleets
                .get(*into)
                .ok_or(RejectReason::UnknownEntity)?;
            if other.owner != house {
                return Err(RejectReason::FleetNotOwned);
            }
            if matches!(order.verb, FleetVerb::Join { .. }) && other.location != here {
                return Err(RejectReason::InvalidTarget);
            }
            Ok(())
        }
        FleetVerb::Guard | FleetVerb::Terraform => {
            let colony = local_colony.ok_or(RejectReason::InvalidTarget)?;
            if colony.owner != house {
                return Err(RejectReason::ColonyNotOwned);
            }
            if matches!(order.verb, FleetVerb::Terraform)
                && colony.planet_class == PlanetClass::Eden
            {
                return Err(RejectReason::InvalidTarget);
            }
            Ok(())
        }
        FleetVerb::Reactivate => {
            if fleet.posture == FleetPosture::Active {
                return Err(RejectReason::InvalidTarget);
            }
            Ok(())
        }
        FleetVerb::Patrol
        | FleetVerb::Salvage
        | FleetVerb::ViewWorld
        | FleetVerb::Hold
        | FleetVerb::Reserve
        | FleetVerb::Mothball => Ok(()),
    }
}

/// A combat target must be foreign and still in the game.
fn foreign_live_target(
    state: &GameState,
    house: HouseId,
    owner: HouseId,
) -> Result<(), RejectReason> {
    if owner == house {
        return Err(RejectReason::InvalidTarget);
    }
    if state.houses.get(&owner).is_some_and(|h| h.eliminated) {
        return Err(RejectReason::EliminatedTarget);
    }
    Ok(())
}

fn fleet_has_class(state: &GameState, fleet: FleetId, class: ShipClass) -> bool {
    fleet_ships(state, fleet).any(|ship| ship.class == class)
}

fn fleet_has_marines(state: &GameState, fleet: FleetId) -> bool {
    fleet_ships(state, fleet).any(|ship| matches!(&ship.cargo, Cargo::Marines(m) if !m.is_empty()))
}

fn fleet_ships<'a>(
    state: &'a GameState,
    fleet: FleetId,
) -> impl Iterator<Item = &'a ec4x_types::fleet::Ship> {
    state
        .fleets
        .get(fleet)
        .into_iter()
        .flat_map(|f| f.squadrons.iter())
        .filter_map(|s| state.squadrons.get(*s))
        .flat_map(|s| s.ships.iter())
        .filter_map(|s| state.ships.get(*s))
}

fn check_build_order(
    state: &GameState,
    snapshot: &RuleSnapshot,
    house: HouseId,
    order: &BuildOrder,
    budget: &mut Budget,
) -> Result<(), RejectReason> {
    let colony = state
        .colonies
        .get(&order.colony)
        .ok_or(RejectReason::UnknownEntity)?;
    if colony.owner != house {
        return Err(RejectReason::ColonyNotOwned);
    }

    let cost = match order.item {
        BuildItem::Ship(class) => {
            if class.needs_dock() && colony_dock_count(state, colony) == 0 {
                return Err(RejectReason::MissingFacility);
            }
            if class == ShipClass::Fighter {
                let capacity = crate::resolve::fighter_capacity(state, snapshot, colony);
                let current = u32::try_from(colony.fighter_squadron_ids.len()).unwrap_or(u32::MAX);
                if current >= capacity {
                    return Err(RejectReason::CapacityFull);
                }
            }
            if class == ShipClass::PlanetBreaker {
                let colonies = u32::try_from(state.colonies_of(house).len()).unwrap_or(0);
                let breakers = house_planet_breaker_count(state, house);
                if breakers >= colonies {
                    return Err(RejectReason::CapacityFull);
                }
            }
            // A hull that would lead a new capital squadron counts against
            // the house's squadron limit.
            if snapshot.ships.spec(class).command_rating > 0 {
                let current = crate::resolve::capital_squadron_count(state, house);
                if current >= crate::resolve::capital_squadron_limit(state, snapshot, house) {
                    return Err(RejectReason::CapacityFull);
                }
            }
            snapshot.ships.spec(class).build_cost
        }
        BuildItem::Ground(kind) => snapshot.ground_units.spec(kind).build_cost,
        BuildItem::Facility(kind) => snapshot.facilities.spec(kind).build_cost,
        BuildItem::IndustrialUnits(amount) => {
            if amount == 0 {
                return Err(RejectReason::InvalidTarget);
            }
            economy::iu_invest_cost(colony, amount, snapshot)
        }
        BuildItem::PlanetaryShield => {
            let next_level = usize::from(colony.shield_level);
            match snapshot.combat.planetary_shields.get(next_level) {
                Some(level) => level.build_cost,
                None => return Err(RejectReason::ShieldAlreadyPresent),
            }
        }
    };
    budget.commit(cost)
}

/// Total dock slots across a colony's dock-providing facilities.
fn colony_dock_count(state: &GameState, colony: &ec4x_types::colony::Colony) -> u32 {
    colony
        .spaceports
        .iter()
        .chain(colony.shipyards.iter())
        .chain(colony.drydocks.iter())
        .filter_map(|id| state.facilities.get(*id))
        .map(|f| f.effective_docks)
        .fold(0u32, u32::saturating_add)
}

/// How many planet breakers a house owns.
pub fn house_planet_breaker_count(state: &GameState, house: HouseId) -> u32 {
    state
        .indices
        .ships_by_house
        .get(&house)
        .map(|set| {
            set.iter()
                .filter_map(|id| state.ships.get(*id))
                .filter(|ship| ship.class == ShipClass::PlanetBreaker)
                .count()
        })
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn check_repair_order(
    state: &GameState,
    snapshot: &RuleSnapshot,
    house: HouseId,
    order: &RepairOrder,
    budget: &mut Budget,
) -> Result<(), RejectReason> {
    let (colony_system, cost) = match order {
        RepairOrder::Ship { colony, ship } => {
            let record = state.ships.get(*ship).ok_or(RejectReason::UnknownEntity)?;
            if record.house_id != house {
                return Err(RejectReason::InvalidTarget);
            }
            if record.state != ShipState::Crippled {
                return Err(RejectReason::InvalidTarget);
            }
            let cost = record
                .stats
                .build_cost
                .saturating_mul(i64::from(snapshot.economy.repair_cost_pct))
                / 100;
            (*colony, cost)
        }
        RepairOrder::Starbase { colony, facility } => {
            let record = state
                .facilities
                .get(*facility)
                .ok_or(RejectReason::UnknownEntity)?;
            if !record.crippled {
                return Err(RejectReason::InvalidTarget);
            }
            let build = snapshot.facilities.spec(record.kind).build_cost;
            let cost = build.saturating_mul(i64::from(snapshot.economy.repair_cost_pct)) / 100;
            (*colony, cost)
        }
    };
    let colony = state
        .colonies
        .get(&colony_system)
        .ok_or(RejectReason::UnknownEntity)?;
    if colony.owner != house {
        return Err(RejectReason::ColonyNotOwned);
    }
    if colony.drydocks.is_empty() {
        return Err(RejectReason::MissingFacility);
    }
    budget.commit(cost)
}

fn check_scrap_order(
    state: &GameState,
    house: HouseId,
    order: &ScrapOrder,
) -> Result<(), RejectReason> {
    let owned = match order {
        ScrapOrder::Ship(id) => state.ships.get(*id).map(|s| s.house_id == house),
        ScrapOrder::Squadron(id) => state.squadrons.get(*id).map(|s| s.house_id == house),
        ScrapOrder::Facility(id) => state.facilities.get(*id).and_then(|f| {
            state.colonies.get(&f.colony).map(|c| c.owner == house)
        }),
        ScrapOrder::Ground(id) => state.ground_units.get(*id).map(|g| g.owner == house),
    };
    match owned {
        Some(true) => Ok(()),
        Some(false) => Err(RejectReason::InvalidTarget),
        None => Err(RejectReason::UnknownEntity),
    }
}

fn check_diplomatic_command(
    state: &GameState,
    house: HouseId,
    command: &DiplomaticCommand,
) -> Result<(), RejectReason> {
    let other = match command {
        DiplomaticCommand::OfferDeescalation { to } => *to,
        DiplomaticCommand::AcceptDeescalation { from }
        | DiplomaticCommand::RejectDeescalation { from } => *from,
    };
    if other == house {
        return Err(RejectReason::InvalidTarget);
    }
    let record = state
        .houses
        .get(&other)
        .ok_or(RejectReason::UnknownEntity)?;
    if record.eliminated {
        return Err(RejectReason::EliminatedTarget);
    }
    if matches!(command, DiplomaticCommand::OfferDeescalation { .. })
        && state.stance(house, other) == ec4x_types::enums::DiplomaticState::Neutral
    {
        return Err(RejectReason::InvalidDiplomaticState);
    }
    Ok(())
}

fn check_transfer(
    state: &GameState,
    snapshot: &RuleSnapshot,
    house: HouseId,
    order: &TransferOrder,
    already_accepted: u32,
    budget: &mut Budget,
) -> Result<(), RejectReason> {
    if order.ptu == 0 || order.source == order.destination {
        return Err(RejectReason::InvalidTarget);
    }
    let source = state
        .colonies
        .get(&order.source)
        .ok_or(RejectReason::UnknownEntity)?;
    let destination = state
        .colonies
        .get(&order.destination)
        .ok_or(RejectReason::UnknownEntity)?;
    if source.owner != house || destination.owner != house {
        return Err(RejectReason::ColonyNotOwned);
    }
    if source.blockaded {
        return Err(RejectReason::BlockadedSource);
    }
    let in_flight = state
        .transfers
        .iter()
        .filter(|(_, t)| t.house_id == house)
        .count();
    let in_flight = u32::try_from(in_flight).unwrap_or(u32::MAX);
    if in_flight.saturating_add(already_accepted) >= snapshot.guild.max_concurrent_transfers {
        return Err(RejectReason::TooManyTransfers);
    }
    if source
        .population_units
        .saturating_sub(order.ptu)
        < snapshot.guild.min_retained_pu
    {
        return Err(RejectReason::NotEnoughPopulation);
    }
    let distance = state.map.hex_distance(order.source, order.destination);
    let cost = economy::transfer_cost(destination.planet_class, distance, order.ptu, snapshot);
    budget.commit(cost)
}

fn check_colony_directive(
    state: &GameState,
    house: HouseId,
    directive: &ColonyDirective,
) -> Result<(), RejectReason> {
    let colony = state
        .colonies
        .get(&directive.colony)
        .ok_or(RejectReason::UnknownEntity)?;
    if colony.owner != house {
        return Err(RejectReason::ColonyNotOwned);
    }
    if directive.tax_rate.is_some_and(|rate| rate > 100) {
        return Err(RejectReason::InvalidTarget);
    }
    Ok(())
}

fn check_espionage(
    state: &GameState,
    snapshot: &RuleSnapshot,
    house: HouseId,
    directive: &EspionageDirective,
    budget: &mut Budget,
) -> Result<(), RejectReason> {
    let purchase_cost = snapshot
        .espionage
        .ebp_cost_pp
        .saturating_mul(i64::from(directive.buy_ebp))
        .saturating_add(
            snapshot
                .espionage
                .cip_cost_pp
                .saturating_mul(i64::from(directive.buy_cip)),
        );
    budget.commit(purchase_cost)?;

    if let Some(action) = &directive.action {
        if action.target_house == house {
            return Err(RejectReason::InvalidTarget);
        }
        let target = state
            .houses
            .get(&action.target_house)
            .ok_or(RejectReason::UnknownEntity)?;
        if target.eliminated {
            return Err(RejectReason::EliminatedTarget);
        }
        let have = state
            .houses
            .get(&house)
            .map_or(0, |h| h.espionage.ebp)
            .saturating_add(directive.buy_ebp);
        if have < snapshot.espionage.action(action.action).cost_ebp {
            return Err(RejectReason::InsufficientEspionageBudget);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_rules::GameSetup;
    use ec4x_types::orders::EspionageOrder;

    fn fixture() -> (GameState, RuleSnapshot) {
        let snapshot = RuleSnapshot::default();
        let state = GameState::new_game(&GameSetup::default(), &snapshot).unwrap();
        (state, snapshot)
    }

    fn own_fleet(state: &GameState, house: HouseId) -> FleetId {
        state.fleets_of(house)[0]
    }

    #[test]
    fn foreign_fleet_orders_are_rejected() {
        let (state, snapshot) = fixture();
        let foreign = own_fleet(&state, HouseId::new(1));
        let packet = CommandPacket {
            house: HouseId::new(0),
            turn: 1,
            fleet_orders: vec![FleetOrder {
                fleet: foreign,
                verb: FleetVerb::Hold,
            }],
            ..CommandPacket::default()
        };
        let review = validate_packet(&state, &snapshot, &packet);
        assert!(review.accepted.fleet_orders.is_empty());
        assert_eq!(review.rejections[0].1, RejectReason::FleetNotOwned);
    }

    #[test]
    fn duplicate_fleet_orders_keep_only_the_first() {
        let (state, snapshot) = fixture();
        let fleet = own_fleet(&state, HouseId::new(0));
        let packet = CommandPacket {
            house: HouseId::new(0),
            turn: 1,
            fleet_orders: vec![
                FleetOrder { fleet, verb: FleetVerb::Hold },
                FleetOrder { fleet, verb: FleetVerb::Patrol },
            ],
            ..CommandPacket::default()
        };
        let review = validate_packet(&state, &snapshot, &packet);
        assert_eq!(review.accepted.fleet_orders.len(), 1);
        assert_eq!(review.rejections[0].1, RejectReason::DuplicateOrder);
    }

    #[test]
    fn budget_projection_rejects_later_builds_first() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let colony = state.colonies_of(house)[0];
        // Enough for one destroyer (90) but not two.
        state.houses.get_mut(&house).unwrap().treasury = 150;
        let packet = CommandPacket {
            house,
            turn: 1,
            build_orders: vec![
                BuildOrder { colony, item: BuildItem::Ship(ShipClass::Destroyer) },
                BuildOrder { colony, item: BuildItem::Ship(ShipClass::Destroyer) },
            ],
            ..CommandPacket::default()
        };
        let review = validate_packet(&state, &snapshot, &packet);
        assert_eq!(review.accepted.build_orders.len(), 1);
        assert_eq!(review.rejections[0].1, RejectReason::InsufficientTreasury);
    }

    #[test]
    fn invade_without_marines_is_rejected() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let fleet = own_fleet(&state, house);
        // Park the fleet on an enemy colony.
        let target = state.colonies_of(HouseId::new(1))[0];
        state.move_fleet(fleet, target);
        let packet = CommandPacket {
            house,
            turn: 1,
            fleet_orders: vec![FleetOrder { fleet, verb: FleetVerb::Invade }],
            ..CommandPacket::default()
        };
        let review = validate_packet(&state, &snapshot, &packet);
        assert_eq!(review.rejections[0].1, RejectReason::MissingShip);
    }

    #[test]
    fn transfer_must_retain_minimum_population() {
        let (state, snapshot) = fixture();
        let house = HouseId::new(0);
        let source = state.colonies_of(house)[0];
        let pu = state.colonies.get(&source).unwrap().population_units;
        let packet = CommandPacket {
            house,
            turn: 1,
            transfers: vec![TransferOrder {
                source,
                destination: state.colonies_of(HouseId::new(1))[0],
                ptu: pu,
            }],
            ..CommandPacket::default()
        };
        let review = validate_packet(&state, &snapshot, &packet);
        // Destination is foreign, so ownership fails before population.
        assert_eq!(review.rejections[0].1, RejectReason::ColonyNotOwned);
    }

    #[test]
    fn espionage_needs_points_to_cover_the_action() {
        let (state, snapshot) = fixture();
        let house = HouseId::new(0);
        let packet = CommandPacket {
            house,
            turn: 1,
            espionage: Some(EspionageDirective {
                buy_ebp: 2,
                buy_cip: 0,
                action: Some(EspionageOrder {
                    action: ec4x_types::enums::EspionageAction::Assassination,
                    target_house: HouseId::new(1),
                    target_system: None,
                }),
            }),
            ..CommandPacket::default()
        };
        let review = validate_packet(&state, &snapshot, &packet);
        assert_eq!(
            review.rejections[0].1,
            RejectReason::InsufficientEspionageBudget
        );
    }

    #[test]
    fn shield_past_top_level_is_rejected() {
        let (mut state, snapshot) = fixture();
        let house = HouseId::new(0);
        let colony = state.colonies_of(house)[0];
        state.colonies.get_mut(&colony).unwrap().shield_level = 3;
        let packet = CommandPacket {
            house,
            turn: 1,
            build_orders: vec![BuildOrder { colony, item: BuildItem::PlanetaryShield }],
            ..CommandPacket::default()
        };
        let review = validate_packet(&state, &snapshot, &packet);
        assert_eq!(review.rejections[0].1, RejectReason::ShieldAlreadyPresent);
    }
}
