//! Seeded starmap generation.
//!
//! Generation is deterministic: the same `(players, seed, table)` triple
//! always yields the same map. The layout is a hexagonal disc of rings
//! around a central hub, with player homeworlds placed on the outer ring by
//! greedy distance maximization.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use tracing::{debug, info};

use ec4x_rules::tables::StarmapTable;
use ec4x_types::enums::LaneClass;
use ec4x_types::ids::{HouseId, SystemId};
use ec4x_types::system::{AxialCoord, StarSystem};

use crate::error::WorldError;
use crate::starmap::Starmap;

/// Star name pool; overflow gets a numbered suffix.
const STAR_NAMES: [&str; 36] = [
    "Meridian", "Altair", "Vesta", "Kharon", "Ossia", "Brand", "Cyrene", "Duat", "Eridu",
    "Fenrir", "Gorgon", "Hadal", "Ilium", "Jarnsaxa", "Kestrel", "Lament", "Mormo", "Nadir",
    "Obsidian", "Pale", "Quorum", "Rimward", "Sable", "Tannhauser", "Umber", "Vigil",
    "Wake", "Xiphos", "Yarrow", "Zenith", "Ashfall", "Bastion", "Cinder", "Dirge",
    "Embers", "Falx",
];

/// The generated map plus the homeworld assignment, house-id ascending.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    /// The finished starmap.
    pub starmap: Starmap,
    /// Homeworld system per house, in house-id order.
    pub homeworlds: Vec<(HouseId, SystemId)>,
}

/// Generate a starmap for `players` houses from `seed`.
///
/// # Errors
///
/// Returns [`WorldError::Generation`] if the requested configuration cannot
/// satisfy the structural invariants (connectivity, hub degree, homeworld
/// Major-lane guarantee).
pub fn generate(
    players: u32,
    seed: u64,
    table: &StarmapTable,
) -> Result<GeneratedMap, WorldError> {
    let rings = table.rings_override.unwrap_or_else(|| players.saturating_sub(1).max(2));
    let mut rng = ChaCha12Rng::seed_from_u64(seed);

    info!(players, rings, seed, "generating starmap");

    // Hub plus concentric rings: ring r carries 6r systems.
    let mut map = Starmap::with_hub(make_system(0, AxialCoord::ORIGIN, 0));
    let mut next_id: u32 = 1;
    for ring in 1..=rings {
        for coords in ring_coords(ring) {
            map.add_system(make_system(next_id, coords, ring))?;
            next_id = next_id.saturating_add(1);
        }
    }

    // Homeworld placement on the outer ring.
    let homeworld_ids = place_homeworlds(&map, players, rings, &mut rng)?;
    let homeworlds: Vec<(HouseId, SystemId)> = homeworld_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (HouseId::new(u32::try_from(i).unwrap_or(u32::MAX)), *id))
        .collect();
    for (house, system) in &homeworlds {
        map.set_homeworld(*system, *house);
    }

    // Hub lanes: all six ring-1 neighbors, weighted-random class.
    connect_hub(&mut map, table, &mut rng)?;

    // Homeworld lanes: exactly the guaranteed number of Major lanes.
    for (_, system) in &homeworlds {
        connect_homeworld(&mut map, *system, table, &mut rng)?;
    }

    // Remaining adjacency, capped at homeworlds.
    connect_remaining(&mut map, &homeworld_ids, table, &mut rng)?;

    map.build_distance_matrix();

    let violations = map.validate(table.homeworld_major_lanes);
    if !violations.is_empty() {
        return Err(WorldError::Generation(violations.join("; ")));
    }

    debug!(systems = map.len(), "starmap generated");
    Ok(GeneratedMap {
        starmap: map,
        homeworlds,
    })
}

fn make_system(id: u32, coords: AxialCoord, ring: u32) -> StarSystem {
    let idx = usize::try_from(id).unwrap_or(usize::MAX);
    let base = STAR_NAMES
        .get(idx % STAR_NAMES.len())
        .copied()
        .unwrap_or("Meridian");
    let name = if idx < STAR_NAMES.len() {
        base.to_owned()
    } else {
        format!("{base} {}", idx / STAR_NAMES.len() + 1)
    };
    StarSystem {
        id: SystemId::new(id),
        coords,
        ring,
        name,
        homeworld_of: None,
        lanes: Vec::new(),
    }
}

/// The coordinates of ring `r`, walked clockwise from the western corner.
fn ring_coords(r: u32) -> Vec<AxialCoord> {
    let radius = i32::try_from(r).unwrap_or(i32::MAX);
    let mut hex = AxialCoord::new(
        AxialCoord::DIRECTIONS[4].q.saturating_mul(radius),
        AxialCoord::DIRECTIONS[4].r.saturating_mul(radius),
    );
    let mut out = Vec::new();
    for dir in 0..6 {
        for _ in 0..r {
            out.push(hex);
            hex = hex.neighbor(dir);
        }
    }
    out
}

/// The six corner coordinates of ring `r`.
fn ring_corners(r: u32) -> Vec<AxialCoord> {
    let radius = i32::try_from(r).unwrap_or(i32::MAX);
    AxialCoord::DIRECTIONS
        .iter()
        .map(|d| AxialCoord::new(d.q.saturating_mul(radius), d.r.saturating_mul(radius)))
        .collect()
}

/// Choose homeworld systems by greedy distance maximization.
///
/// Small games draw from the outer ring's corner cells (the 3-neighbor
/// "vertices" of the disc); larger games draw from the whole outer ring.
/// Candidates adjacent to an already-chosen homeworld are excluded so every
/// homeworld keeps its full Major-lane allotment to neutral space.
fn place_homeworlds(
    map: &Starmap,
    players: u32,
    rings: u32,
    rng: &mut ChaCha12Rng,
) -> Result<Vec<SystemId>, WorldError> {
    let candidate_coords = if players <= 4 {
        ring_corners(rings)
    } else {
        ring_coords(rings)
    };
    let candidates: Vec<SystemId> = candidate_coords
        .iter()
        .filter_map(|c| map.at_coords(*c))
        .collect();
    let candidate_count = u32::try_from(candidates.len()).unwrap_or(u32::MAX);
    if candidate_count < players {
        return Err(WorldError::Generation(format!(
            "only {} homeworld candidates for {players} players",
            candidates.len()
        )));
    }

    let start = rng.random_range(0..candidates.len());
    let Some(first) = candidates.get(start).copied() else {
        return Err(WorldError::Generation(
            "homeworld candidate draw out of range".to_owned(),
        ));
    };
    let mut chosen: Vec<SystemId> = vec![first];

    while u32::try_from(chosen.len()).unwrap_or(u32::MAX) < players {
        let mut best: Option<(u32, SystemId)> = None;
        for candidate in &candidates {
            if chosen.contains(candidate) {
                continue;
            }
            let min_distance = chosen
                .iter()
                .map(|c| map.hex_distance(*candidate, *c))
                .min()
                .unwrap_or(u32::MAX);
            if min_distance <= 1 {
                continue;
            }
            let better = match best {
                None => true,
                // Ties break to the lowest system id for determinism.
                Some((best_distance, best_id)) => {
                    min_distance > best_distance
                        || (min_distance == best_distance && *candidate < best_id)
                }
            };
            if better {
                best = Some((min_distance, *candidate));
            }
        }
        let Some((_, pick)) = best else {
            return Err(WorldError::Generation(
                "could not spread homeworlds on the outer ring".to_owned(),
            ));
        };
        chosen.push(pick);
    }

    Ok(chosen)
}

/// Draw a lane class from the configured weights.
fn weighted_class(table: &StarmapTable, rng: &mut ChaCha12Rng) -> LaneClass {
    let total = table
        .major_lane_weight
        .saturating_add(table.minor_lane_weight)
        .saturating_add(table.restricted_lane_weight)
        .max(1);
    let roll = rng.random_range(0..total);
    if roll < table.major_lane_weight {
        LaneClass::Major
    } else if roll < table.major_lane_weight.saturating_add(table.minor_lane_weight) {
        LaneClass::Minor
    } else {
        LaneClass::Restricted
    }
}

/// Connect the hub to all six ring-1 neighbors.
fn connect_hub(
    map: &mut Starmap,
    table: &StarmapTable,
    rng: &mut ChaCha12Rng,
) -> Result<(), WorldError> {
    let hub = map.hub();
    let hub_coords = map
        .get(hub)
        .map(|s| s.coords)
        .ok_or(WorldError::SystemNotFound(hub))?;
    for neighbor_coords in hub_coords.neighbors() {
        let Some(neighbor) = map.at_coords(neighbor_coords) else {
            return Err(WorldError::Generation(
                "hub neighbor missing from ring 1".to_owned(),
            ));
        };
        let class = weighted_class(table, rng);
        map.add_lane(hub, neighbor, class)?;
    }
    Ok(())
}

/// Give a homeworld its guaranteed Major lanes.
fn connect_homeworld(
    map: &mut Starmap,
    homeworld: SystemId,
    table: &StarmapTable,
    rng: &mut ChaCha12Rng,
) -> Result<(), WorldError> {
    let coords = map
        .get(homeworld)
        .map(|s| s.coords)
        .ok_or(WorldError::SystemNotFound(homeworld))?;
    let mut in_map: Vec<SystemId> = coords
        .neighbors()
        .iter()
        .filter_map(|c| map.at_coords(*c))
        .collect();
    let wanted = usize::try_from(table.homeworld_major_lanes).unwrap_or(6);
    if in_map.len() < wanted {
        return Err(WorldError::Generation(format!(
            "homeworld {homeworld} has only {} in-map neighbors",
            in_map.len()
        )));
    }
    // Seeded shuffle-by-draw, then take the first `wanted` neighbors.
    for i in (1..in_map.len()).rev() {
        let j = rng.random_range(0..=i);
        in_map.swap(i, j);
    }
    for neighbor in in_map.into_iter().take(wanted) {
        map.add_lane(homeworld, neighbor, LaneClass::Major)?;
    }
    Ok(())
}

/// Connect every remaining adjacent pair, capping homeworld connections.
fn connect_remaining(
    map: &mut Starmap,
    homeworlds: &[SystemId],
    table: &StarmapTable,
    rng: &mut ChaCha12Rng,
) -> Result<(), WorldError> {
    let ids: Vec<SystemId> = map.systems().map(|(id, _)| *id).collect();
    let cap = usize::try_from(table.homeworld_max_connections).unwrap_or(6);
    for a in &ids {
        let Some(coords) = map.get(*a).map(|s| s.coords) else {
            continue;
        };
        for neighbor_coords in coords.neighbors() {
            let Some(b) = map.at_coords(neighbor_coords) else {
                continue;
            };
            // Each unordered pair is visited once, in ascending order.
            if b <= *a || map.lane_between(*a, b).is_some() {
                continue;
            }
            let a_capped = homeworlds.contains(a)
                && map.get(*a).is_some_and(|s| s.lane_count() >= cap);
            let b_capped = homeworlds.contains(&b)
                && map.get(b).is_some_and(|s| s.lane_count() >= cap);
            if a_capped || b_capped {
                continue;
            }
            let mut class = weighted_class(table, rng);
            // A homeworld's Major lanes are exactly the guaranteed ones.
            if class == LaneClass::Major
                && (homeworlds.contains(a) || homeworlds.contains(&b))
            {
                class = LaneClass::Minor;
            }
            map.add_lane(*a, b, class)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ring_sizes_are_six_r() {
        assert_eq!(ring_coords(1).len(), 6);
        assert_eq!(ring_coords(3).len(), 18);
        for c in ring_coords(3) {
            assert_eq!(AxialCoord::ORIGIN.distance(c), 3);
        }
    }

    #[test]
    fn seed_42_four_players_matches_the_reference_layout() {
        let table = StarmapTable::default();
        let generated = generate(4, 42, &table).unwrap();
        let map = &generated.starmap;

        // 3 rings: 1 + 6 + 12 + 18 systems.
        assert_eq!(map.len(), 37);
        assert_eq!(map.get(map.hub()).unwrap().lane_count(), 6);
        assert_eq!(generated.homeworlds.len(), 4);
        for (_, homeworld) in &generated.homeworlds {
            assert_eq!(map.get(*homeworld).unwrap().major_lane_count(), 3);
        }
        assert!(map.is_connected());
    }

    #[test]
    fn generation_is_deterministic() {
        let table = StarmapTable::default();
        let a = generate(4, 1234, &table).unwrap();
        let b = generate(4, 1234, &table).unwrap();
        let lanes_of = |g: &GeneratedMap| -> Vec<(SystemId, SystemId, LaneClass)> {
            let mut out = Vec::new();
            for (id, system) in g.starmap.systems() {
                for (n, class) in &system.lanes {
                    out.push((*id, *n, *class));
                }
            }
            out
        };
        assert_eq!(lanes_of(&a), lanes_of(&b));
        assert_eq!(a.homeworlds, b.homeworlds);
    }

    #[test]
    fn total_system_count_follows_the_ring_formula() {
        let table = StarmapTable::default();
        for players in [2u32, 5, 8] {
            let generated = generate(players, 9, &table).unwrap();
            let rings = players.saturating_sub(1).max(2);
            let expected = 3 * rings * (rings + 1) + 1;
            assert_eq!(generated.starmap.len() as u32, expected);
        }
    }

    #[test]
    fn homeworlds_are_never_adjacent() {
        let table = StarmapTable::default();
        for seed in [3u64, 77, 901] {
            let generated = generate(6, seed, &table).unwrap();
            let map = &generated.starmap;
            for (_, a) in &generated.homeworlds {
                for (_, b) in &generated.homeworlds {
                    if a != b {
                        assert!(map.hex_distance(*a, *b) > 1);
                    }
                }
            }
        }
    }
}
