//! The star graph: systems as nodes, jump lanes as symmetric weighted edges.
//!
//! The [`Starmap`] is the spatial backbone of a game. Systems are created
//! once at generation and immutable thereafter; lane insertion writes both
//! directions so symmetry holds by construction. A precomputed hex-distance
//! matrix backs the A* heuristic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use ec4x_types::enums::LaneClass;
use ec4x_types::ids::{HouseId, SystemId};
use ec4x_types::system::{AxialCoord, StarSystem};

use crate::error::WorldError;

/// The star graph holding all systems and lanes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Starmap {
    /// All systems indexed by their identifier.
    systems: BTreeMap<SystemId, StarSystem>,
    /// Coordinate lookup.
    by_coords: BTreeMap<AxialCoord, SystemId>,
    /// The central hub system.
    hub: SystemId,
    /// Precomputed hex distances for the A* heuristic.
    distance_matrix: BTreeMap<(SystemId, SystemId), u32>,
}

impl Starmap {
    /// Create a starmap containing only the hub system.
    pub fn with_hub(hub: StarSystem) -> Self {
        let hub_id = hub.id;
        let mut systems = BTreeMap::new();
        let mut by_coords = BTreeMap::new();
        by_coords.insert(hub.coords, hub_id);
        systems.insert(hub_id, hub);
        Self {
            systems,
            by_coords,
            hub: hub_id,
            distance_matrix: BTreeMap::new(),
        }
    }

    /// The hub system's ID.
    pub const fn hub(&self) -> SystemId {
        self.hub
    }

    /// Add a system.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateSystem`] if the ID or coordinate is
    /// already taken.
    pub fn add_system(&mut self, system: StarSystem) -> Result<(), WorldError> {
        if self.systems.contains_key(&system.id) || self.by_coords.contains_key(&system.coords)
        {
            return Err(WorldError::DuplicateSystem(system.id));
        }
        self.by_coords.insert(system.coords, system.id);
        self.systems.insert(system.id, system);
        Ok(())
    }

    /// Add a symmetric lane between two adjacent systems.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::SystemNotFound`] if either endpoint is missing,
    /// [`WorldError::NotAdjacent`] if the endpoints are not hex neighbors,
    /// or [`WorldError::DuplicateLane`] if a lane already connects them.
    pub fn add_lane(
        &mut self,
        a: SystemId,
        b: SystemId,
        class: LaneClass,
    ) -> Result<(), WorldError> {
        let coord_a = self
            .systems
            .get(&a)
            .ok_or(WorldError::SystemNotFound(a))?
            .coords;
        let coord_b = self
            .systems
            .get(&b)
            .ok_or(WorldError::SystemNotFound(b))?
            .coords;
        if coord_a.distance(coord_b) != 1 {
            return Err(WorldError::NotAdjacent(a, b));
        }
        if self.lane_between(a, b).is_some() {
            return Err(WorldError::DuplicateLane(a, b));
        }
        if let Some(system) = self.systems.get_mut(&a) {
            system.lanes.push((b, class));
        }
        if let Some(system) = self.systems.get_mut(&b) {
            system.lanes.push((a, class));
        }
        Ok(())
    }

    /// The lane class between two systems, if one exists.
    pub fn lane_between(&self, a: SystemId, b: SystemId) -> Option<LaneClass> {
        self.systems.get(&a).and_then(|s| s.lane_to(b))
    }

    /// Get a system.
    pub fn get(&self, id: SystemId) -> Option<&StarSystem> {
        self.systems.get(&id)
    }

    /// The system at a hex coordinate, if any.
    pub fn at_coords(&self, coords: AxialCoord) -> Option<SystemId> {
        self.by_coords.get(&coords).copied()
    }

    /// Number of systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Whether the map holds no systems. Never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Iterate over all systems in ID order.
    pub fn systems(&self) -> impl Iterator<Item = (&SystemId, &StarSystem)> {
        self.systems.iter()
    }

    /// All systems within `radius` hexes of `center`, inclusive.
    pub fn within_radius(&self, center: SystemId, radius: u32) -> Vec<SystemId> {
        let Some(origin) = self.systems.get(&center).map(|s| s.coords) else {
            return Vec::new();
        };
        self.systems
            .iter()
            .filter(|(_, s)| origin.distance(s.coords) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Mark a system as `house`'s homeworld.
    pub(crate) fn set_homeworld(&mut self, id: SystemId, house: HouseId) {
        if let Some(system) = self.systems.get_mut(&id) {
            system.homeworld_of = Some(house);
        }
    }

    /// Precompute the hex-distance matrix for the A* heuristic.
    pub fn build_distance_matrix(&mut self) {
        let coords: Vec<(SystemId, AxialCoord)> =
            self.systems.iter().map(|(id, s)| (*id, s.coords)).collect();
        let mut matrix = BTreeMap::new();
        for (a, ca) in &coords {
            for (b, cb) in &coords {
                matrix.insert((*a, *b), ca.distance(*cb));
            }
        }
        self.distance_matrix = matrix;
    }

    /// Hex distance between two systems.
    ///
    /// Served from the precomputed matrix, falling back to coordinate
    /// arithmetic for maps built without one.
    pub fn hex_distance(&self, a: SystemId, b: SystemId) -> u32 {
        if let Some(d) = self.distance_matrix.get(&(a, b)) {
            return *d;
        }
        match (self.systems.get(&a), self.systems.get(&b)) {
            (Some(sa), Some(sb)) => sa.coords.distance(sb.coords),
            _ => u32::MAX,
        }
    }

    /// Whether every system is reachable from the hub.
    pub fn is_connected(&self) -> bool {
        let mut seen: BTreeSet<SystemId> = BTreeSet::new();
        let mut queue = VecDeque::from([self.hub]);
        seen.insert(self.hub);
        while let Some(current) = queue.pop_front() {
            let Some(system) = self.systems.get(&current) else {
                continue;
            };
            for (neighbor, _) in &system.lanes {
                if seen.insert(*neighbor) {
                    queue.push_back(*neighbor);
                }
            }
        }
        seen.len() == self.systems.len()
    }

    /// Check all structural invariants, returning every violation found.
    ///
    /// Checked: full connectivity, lane symmetry, the hub's six lanes, and
    /// each homeworld's Major-lane guarantee.
    pub fn validate(&self, homeworld_major_lanes: u32) -> Vec<String> {
        let mut violations = Vec::new();

        if !self.is_connected() {
            violations.push("map is not fully connected from the hub".to_owned());
        }

        if let Some(hub) = self.systems.get(&self.hub)
            && hub.lane_count() != 6
        {
            violations.push(format!("hub has {} lanes, expected 6", hub.lane_count()));
        }

        for (id, system) in &self.systems {
            for (neighbor, class) in &system.lanes {
                let mirrored = self
                    .systems
                    .get(neighbor)
                    .and_then(|n| n.lane_to(*id));
                if mirrored != Some(*class) {
                    violations.push(format!(
                        "lane {id} -> {neighbor} ({class:?}) has no symmetric mirror"
                    ));
                }
            }
            if system.homeworld_of.is_some() {
                let majors = system.major_lane_count();
                if majors != usize::try_from(homeworld_major_lanes).unwrap_or(usize::MAX) {
                    violations.push(format!(
                        "homeworld {id} has {majors} Major lanes, expected {homeworld_major_lanes}"
                    ));
                }
            }
        }

        violations
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn system(id: u32, q: i32, r: i32) -> StarSystem {
        StarSystem {
            id: SystemId::new(id),
            coords: AxialCoord::new(q, r),
            ring: AxialCoord::ORIGIN.distance(AxialCoord::new(q, r)),
            name: format!("Test {id}"),
            homeworld_of: None,
            lanes: Vec::new(),
        }
    }

    fn two_system_map() -> Starmap {
        let mut map = Starmap::with_hub(system(0, 0, 0));
        map.add_system(system(1, 1, 0)).unwrap();
        map
    }

    #[test]
    fn lanes_are_symmetric_by_construction() {
        let mut map = two_system_map();
        map.add_lane(SystemId::new(0), SystemId::new(1), LaneClass::Minor)
            .unwrap();
        assert_eq!(
            map.lane_between(SystemId::new(0), SystemId::new(1)),
            Some(LaneClass::Minor)
        );
        assert_eq!(
            map.lane_between(SystemId::new(1), SystemId::new(0)),
            Some(LaneClass::Minor)
        );
    }

    #[test]
    fn duplicate_lane_is_rejected() {
        let mut map = two_system_map();
        map.add_lane(SystemId::new(0), SystemId::new(1), LaneClass::Major)
            .unwrap();
        assert!(matches!(
            map.add_lane(SystemId::new(1), SystemId::new(0), LaneClass::Minor),
            Err(WorldError::DuplicateLane(..))
        ));
    }

    #[test]
    fn non_adjacent_lane_is_rejected() {
        let mut map = Starmap::with_hub(system(0, 0, 0));
        map.add_system(system(1, 2, 0)).unwrap();
        assert!(matches!(
            map.add_lane(SystemId::new(0), SystemId::new(1), LaneClass::Major),
            Err(WorldError::NotAdjacent(..))
        ));
    }

    #[test]
    fn disconnected_map_fails_validation() {
        let mut map = two_system_map();
        // No lanes at all: system 1 is unreachable.
        let violations = map.validate(3);
        assert!(!violations.is_empty());
        map.add_lane(SystemId::new(0), SystemId::new(1), LaneClass::Major)
            .unwrap();
        // Still fails: the hub now has 1 lane, not 6. Connectivity holds.
        assert!(map.is_connected());
    }

    #[test]
    fn distance_matrix_matches_coordinates() {
        let mut map = two_system_map();
        map.build_distance_matrix();
        assert_eq!(map.hex_distance(SystemId::new(0), SystemId::new(1)), 1);
        assert_eq!(map.hex_distance(SystemId::new(0), SystemId::new(0)), 0);
    }
}
