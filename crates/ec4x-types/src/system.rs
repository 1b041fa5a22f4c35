//! Star systems and axial hex coordinates.
//!
//! Systems are created once at map generation and immutable thereafter.
//! The graph algorithms (generation, pathfinding) live in `ec4x-world`;
//! this module only defines the records they operate on, plus the small
//! amount of coordinate arithmetic every layer needs.

use serde::{Deserialize, Serialize};

use crate::enums::LaneClass;
use crate::ids::{HouseId, SystemId};

/// Axial hex coordinates `(q, r)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AxialCoord {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

impl AxialCoord {
    /// The six axial direction offsets, clockwise from east.
    pub const DIRECTIONS: [Self; 6] = [
        Self { q: 1, r: 0 },
        Self { q: 1, r: -1 },
        Self { q: 0, r: -1 },
        Self { q: -1, r: 0 },
        Self { q: -1, r: 1 },
        Self { q: 0, r: 1 },
    ];

    /// The origin hex.
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    /// Construct from components.
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Hex distance: `max(|dq|, |dr|, |dq + dr|)`.
    pub const fn distance(self, other: Self) -> u32 {
        let dq = self.q.wrapping_sub(other.q);
        let dr = self.r.wrapping_sub(other.r);
        let ds = dq.wrapping_add(dr);
        let m = if dq.abs() > dr.abs() { dq.abs() } else { dr.abs() };
        let m = if ds.abs() > m { ds.abs() } else { m };
        m.unsigned_abs()
    }

    /// The neighbor in direction `dir` (0-5, clockwise from east).
    pub const fn neighbor(self, dir: usize) -> Self {
        let d = match dir % 6 {
            0 => Self::DIRECTIONS[0],
            1 => Self::DIRECTIONS[1],
            2 => Self::DIRECTIONS[2],
            3 => Self::DIRECTIONS[3],
            4 => Self::DIRECTIONS[4],
            _ => Self::DIRECTIONS[5],
        };
        Self {
            q: self.q.wrapping_add(d.q),
            r: self.r.wrapping_add(d.r),
        }
    }

    /// All six neighbors.
    pub fn neighbors(self) -> [Self; 6] {
        [
            self.neighbor(0),
            self.neighbor(1),
            self.neighbor(2),
            self.neighbor(3),
            self.neighbor(4),
            self.neighbor(5),
        ]
    }
}

/// A star system: one hex on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarSystem {
    /// This system's identifier.
    pub id: SystemId,
    /// Hex position.
    pub coords: AxialCoord,
    /// Distance in rings from the hub.
    pub ring: u32,
    /// Display name.
    pub name: String,
    /// Set when this system is a house's homeworld.
    pub homeworld_of: Option<HouseId>,
    /// Outbound lanes: `(neighbor, class)`. Symmetric by construction.
    pub lanes: Vec<(SystemId, LaneClass)>,
}

impl StarSystem {
    /// Number of lanes touching this system.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Number of Major lanes touching this system.
    pub fn major_lane_count(&self) -> usize {
        self.lanes
            .iter()
            .filter(|(_, class)| *class == LaneClass::Major)
            .count()
    }

    /// The lane class toward `neighbor`, if a lane exists.
    pub fn lane_to(&self, neighbor: SystemId) -> Option<LaneClass> {
        self.lanes
            .iter()
            .find(|(id, _)| *id == neighbor)
            .map(|(_, class)| *class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let a = AxialCoord::new(2, -1);
        let b = AxialCoord::new(-1, 3);
        assert_eq!(a.distance(b), b.distance(a));
    }

    #[test]
    fn neighbors_are_distance_one() {
        let center = AxialCoord::new(3, -2);
        for n in center.neighbors() {
            assert_eq!(center.distance(n), 1);
        }
    }

    #[test]
    fn origin_ring_distances() {
        assert_eq!(AxialCoord::ORIGIN.distance(AxialCoord::new(3, 0)), 3);
        assert_eq!(AxialCoord::ORIGIN.distance(AxialCoord::new(-2, 2)), 2);
        assert_eq!(AxialCoord::ORIGIN.distance(AxialCoord::new(1, -3)), 3);
    }
}
