//! A* pathfinding over the lane graph.
//!
//! Edge weight is the lane class weight (Major 1, Minor 2, Restricted 3).
//! The hex-distance matrix is the heuristic; it is admissible because no
//! lane costs less than one. Restricted lanes are closed to fleets carrying
//! any crippled ship.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use ec4x_types::enums::LaneClass;
use ec4x_types::ids::SystemId;

use crate::starmap::Starmap;

/// The outcome of a path query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    /// The systems traversed, origin first, destination last. Empty when
    /// no path was found.
    pub path: Vec<SystemId>,
    /// Total lane-weight cost of the path.
    pub total_cost: u32,
    /// Whether a path was found.
    pub found: bool,
}

impl PathResult {
    const fn not_found() -> Self {
        Self {
            path: Vec::new(),
            total_cost: 0,
            found: false,
        }
    }
}

/// Whether a fleet in the given condition may traverse a lane class.
const fn traversable(class: LaneClass, fleet_has_crippled: bool) -> bool {
    match class {
        LaneClass::Major | LaneClass::Minor => true,
        LaneClass::Restricted => !fleet_has_crippled,
    }
}

/// Find the cheapest path from `from` to `to`.
///
/// `fleet_has_crippled` closes Restricted lanes. Ties between equal-cost
/// frontier nodes break on ascending system ID, so the result is
/// deterministic across runs.
pub fn find_path(
    map: &Starmap,
    from: SystemId,
    to: SystemId,
    fleet_has_crippled: bool,
) -> PathResult {
    if map.get(from).is_none() || map.get(to).is_none() {
        return PathResult::not_found();
    }
    if from == to {
        return PathResult {
            path: vec![from],
            total_cost: 0,
            found: true,
        };
    }

    // Frontier keyed by (f-score, system id); BinaryHeap is a max-heap, so
    // both are reversed.
    let mut open: BinaryHeap<Reverse<(u32, SystemId)>> = BinaryHeap::new();
    let mut g_score: BTreeMap<SystemId, u32> = BTreeMap::new();
    let mut came_from: BTreeMap<SystemId, SystemId> = BTreeMap::new();

    g_score.insert(from, 0);
    open.push(Reverse((map.hex_distance(from, to), from)));

    while let Some(Reverse((_, current))) = open.pop() {
        if current == to {
            return reconstruct(&came_from, from, to, &g_score);
        }
        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);
        let Some(system) = map.get(current) else {
            continue;
        };
        for (neighbor, class) in &system.lanes {
            if !traversable(*class, fleet_has_crippled) {
                continue;
            }
            let tentative = current_g.saturating_add(class.weight());
            let known = g_score.get(neighbor).copied().unwrap_or(u32::MAX);
            if tentative < known {
                g_score.insert(*neighbor, tentative);
                came_from.insert(*neighbor, current);
                let f = tentative.saturating_add(map.hex_distance(*neighbor, to));
                open.push(Reverse((f, *neighbor)));
            }
        }
    }

    PathResult::not_found()
}

fn reconstruct(
    came_from: &BTreeMap<SystemId, SystemId>,
    from: SystemId,
    to: SystemId,
    g_score: &BTreeMap<SystemId, u32>,
) -> PathResult {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        let Some(previous) = came_from.get(&current) else {
            return PathResult::not_found();
        };
        current = *previous;
        path.push(current);
    }
    path.reverse();
    PathResult {
        path,
        total_cost: g_score.get(&to).copied().unwrap_or(0),
        found: true,
    }
}

/// Estimated turns for a fleet to reach `to`.
///
/// Returns `None` when no traversable path exists (for instance, any
/// surviving route needs a Restricted lane and the fleet has a crippled
/// ship). A found path takes at least one turn.
pub fn calculate_eta(
    map: &Starmap,
    from: SystemId,
    to: SystemId,
    fleet_has_crippled: bool,
) -> Option<u32> {
    let result = find_path(map, from, to, fleet_has_crippled);
    result.found.then(|| result.total_cost.max(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ec4x_types::system::{AxialCoord, StarSystem};

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

    /// A line of five systems: 0 -1- 1 -1- 2 -1- 3 -1- 4 on Major lanes,
    /// plus a Restricted shortcut 0 -3- 5 -3- 4 through a spur.
    fn line_map() -> Starmap {
        let mut map = Starmap::with_hub(system(0, 0, 0));
        map.add_system(system(1, 1, 0)).unwrap();
        map.add_system(system(2, 2, 0)).unwrap();
        map.add_system(system(3, 3, 0)).unwrap();
        map.add_system(system(4, 4, 0)).unwrap();
        map.add_lane(SystemId::new(0), SystemId::new(1), LaneClass::Major).unwrap();
        map.add_lane(SystemId::new(1), SystemId::new(2), LaneClass::Major).unwrap();
        map.add_lane(SystemId::new(2), SystemId::new(3), LaneClass::Major).unwrap();
        map.add_lane(SystemId::new(3), SystemId::new(4), LaneClass::Major).unwrap();
        map.build_distance_matrix();
        map
    }

    #[test]
    fn straight_line_costs_its_length() {
        let map = line_map();
        let result = find_path(&map, SystemId::new(0), SystemId::new(4), false);
        assert!(result.found);
        assert_eq!(result.total_cost, 4);
        assert_eq!(result.path.len(), 5);
    }

    #[test]
    fn eta_on_major_lanes_equals_path_cost() {
        let map = line_map();
        assert_eq!(
            calculate_eta(&map, SystemId::new(0), SystemId::new(4), false),
            Some(4)
        );
    }

    #[test]
    fn eta_same_system_is_clamped_to_one_turn_minimum() {
        let map = line_map();
        assert_eq!(
            calculate_eta(&map, SystemId::new(2), SystemId::new(2), false),
            Some(1)
        );
    }

    #[test]
    fn restricted_lane_blocks_crippled_fleets() {
        // 0 -- 1 (Restricted) is the only route.
        let mut map = Starmap::with_hub(system(0, 0, 0));
        map.add_system(system(1, 1, 0)).unwrap();
        map.add_lane(SystemId::new(0), SystemId::new(1), LaneClass::Restricted)
            .unwrap();
        map.build_distance_matrix();

        assert_eq!(
            calculate_eta(&map, SystemId::new(0), SystemId::new(1), false),
            Some(3)
        );
        assert_eq!(
            calculate_eta(&map, SystemId::new(0), SystemId::new(1), true),
            None
        );
    }

    #[test]
    fn minor_detour_beats_restricted_shortcut_for_crippled() {
        // Triangle: 0-1 Restricted (w3), 0-2 Minor (w2), 2-1 Minor (w2).
        let mut map = Starmap::with_hub(system(0, 0, 0));
        map.add_system(system(1, 1, 0)).unwrap();
        map.add_system(system(2, 0, 1)).unwrap();
        map.add_lane(SystemId::new(0), SystemId::new(1), LaneClass::Restricted).unwrap();
        map.add_lane(SystemId::new(0), SystemId::new(2), LaneClass::Minor).unwrap();
        map.add_lane(SystemId::new(2), SystemId::new(1), LaneClass::Minor).unwrap();
        map.build_distance_matrix();

        let healthy = find_path(&map, SystemId::new(0), SystemId::new(1), false);
        assert_eq!(healthy.total_cost, 3);

        let crippled = find_path(&map, SystemId::new(0), SystemId::new(1), true);
        assert!(crippled.found);
        assert_eq!(crippled.total_cost, 4);
        assert_eq!(
            crippled.path,
            vec![SystemId::new(0), SystemId::new(2), SystemId::new(1)]
        );
    }

    #[test]
    fn unknown_endpoint_is_not_found() {
        let map = line_map();
        let result = find_path(&map, SystemId::new(0), SystemId::new(99), false);
        assert!(!result.found);
        assert!(result.path.is_empty());
    }
}
