// ═══════════════════════════════════════════════════════════════════════
// Map generator — grid layout, jittered positions, symmetric adjacency
// with a connectivity repair pass. Knows nothing about game rules.
// ═══════════════════════════════════════════════════════════════════════

use crate::config::MapConfig;
use crate::types::{Fortification, Position, Region, RegionId, RegionKind};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::debug;

// ── Names ──────────────────────────────────────────────────────────────

pub const REGION_NAMES: [&str; 36] = [
    "Arctic", "Tundra", "Taiga", "Forest", "Plains", "Desert",
    "Savanna", "Jungle", "Mountains", "Hills", "Swamp", "Coast",
    "Island", "Peninsula", "Archipelago", "Valley", "Canyon",
    "Plateau", "Mesa", "Oasis", "Volcano", "Glacier", "Fjord",
    "Delta", "Basin", "Cliff", "Cave", "Reef", "Lagoon", "Bay",
    "Strait", "Isthmus", "Atoll", "Geyser", "Crater", "Summit",
];

const NAME_SUFFIXES: [&str; 11] = [
    "North", "South", "East", "West", "Upper", "Lower",
    "New", "Old", "Greater", "Lesser", "Central",
];

/// `count` distinct names. Past the base list, compound names are built
/// ("Delta North"); repeats get a running number ("Delta North 2").
pub fn region_names(count: usize, rng: &mut impl Rng) -> Vec<String> {
    let mut base: Vec<&str> = REGION_NAMES.to_vec();
    base.shuffle(rng);

    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut names = Vec::with_capacity(count);
    for i in 0..count {
        let raw = match base.get(i) {
            Some(name) => name.to_string(),
            None => {
                let stem = base.choose(rng).copied().unwrap_or("Region");
                let suffix = NAME_SUFFIXES.choose(rng).copied().unwrap_or("New");
                format!("{} {}", stem, suffix)
            }
        };
        let n = seen.entry(raw.clone()).or_insert(0);
        *n += 1;
        if *n == 1 {
            names.push(raw);
        } else {
            names.push(format!("{} {}", raw, n));
        }
    }
    names
}

// ── Grid ───────────────────────────────────────────────────────────────

/// Grid `(width, height)` in cells for `count` regions. Minimizes
/// `10 * |w/h - aspect| + empty cells`; the first best width wins.
pub fn grid_dimensions(count: usize, aspect_ratio: f64) -> (usize, usize) {
    let count = count.max(1);
    let mut best = (1, count);
    let mut best_score = f64::INFINITY;
    for width in 1..=count {
        let height = count.div_ceil(width);
        let aspect_diff = (width as f64 / height as f64 - aspect_ratio).abs();
        let empty = (width * height - count) as f64;
        let score = aspect_diff * 10.0 + empty;
        if score < best_score {
            best_score = score;
            best = (width, height);
        }
    }
    best
}

/// Occupied cells, column by column.
fn grid_cells(count: usize, width: usize, height: usize) -> Vec<(usize, usize)> {
    (0..width)
        .flat_map(|x| (0..height).map(move |y| (x, y)))
        .take(count)
        .collect()
}

fn grid_positions(
    config: &MapConfig,
    cells: &[(usize, usize)],
    width: usize,
    height: usize,
    rng: &mut impl Rng,
) -> Vec<Position> {
    let canvas_w = config.canvas_width();
    let canvas_h = config.canvas_height;
    let margin = config.border_margin;

    let cell_w = (canvas_w - 2.0 * margin) / width as f64 * 0.85;
    let cell_h = (canvas_h - 2.0 * margin) / height as f64 * 0.85;
    let radius = cell_w.min(cell_h) * 0.25;

    cells.iter()
        .map(|&(gx, gy)| {
            let cx = margin + (gx as f64 + 0.5) * cell_w;
            let cy = margin + (gy as f64 + 0.5) * cell_h;
            let x = cx + jitter(cell_w * config.jitter, &mut *rng);
            let y = cy + jitter(cell_h * config.jitter, &mut *rng);
            Position {
                x: clamp_span(x, margin + radius, canvas_w - margin - radius),
                y: clamp_span(y, margin + radius, canvas_h - margin - radius),
            }
        })
        .collect()
}

fn jitter(reach: f64, rng: &mut impl Rng) -> f64 {
    if reach > 0.0 { rng.gen_range(-reach..=reach) } else { 0.0 }
}

/// Like `f64::clamp` but tolerates an inverted range on tiny canvases.
fn clamp_span(v: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi { (lo + hi) / 2.0 } else { v.clamp(lo, hi) }
}

fn link(adjacency: &mut [BTreeSet<usize>], a: usize, b: usize) {
    if a != b {
        adjacency[a].insert(b);
        adjacency[b].insert(a);
    }
}

fn grid_adjacency(
    cells: &[(usize, usize)],
    diagonal_probability: f64,
    rng: &mut impl Rng,
) -> Vec<BTreeSet<usize>> {
    let index: HashMap<(i64, i64), usize> = cells.iter()
        .enumerate()
        .map(|(i, &(x, y))| ((x as i64, y as i64), i))
        .collect();
    let mut adjacency = vec![BTreeSet::new(); cells.len()];

    for (i, &(x, y)) in cells.iter().enumerate() {
        let (x, y) = (x as i64, y as i64);
        for n in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
            if let Some(&j) = index.get(&n) {
                link(&mut adjacency, i, j);
            }
        }
    }

    // Diagonal shortcuts. Each ordered pair gets its own roll.
    for (i, &(x, y)) in cells.iter().enumerate() {
        let (x, y) = (x as i64, y as i64);
        for d in [(x - 1, y - 1), (x + 1, y - 1), (x - 1, y + 1), (x + 1, y + 1)] {
            if rng.gen::<f64>() < diagonal_probability {
                if let Some(&j) = index.get(&d) {
                    link(&mut adjacency, i, j);
                }
            }
        }
    }
    adjacency
}

/// BFS from index 0, then bridge the closest (reached, unreached) pair
/// until everything is reached. Returns the number of bridges added.
fn ensure_connectivity(adjacency: &mut [BTreeSet<usize>], positions: &[Position]) -> usize {
    if adjacency.is_empty() {
        return 0;
    }

    let mut reached: BTreeSet<usize> = BTreeSet::new();
    let mut queue = VecDeque::from([0usize]);
    while let Some(current) = queue.pop_front() {
        if !reached.insert(current) {
            continue;
        }
        for &n in &adjacency[current] {
            if !reached.contains(&n) {
                queue.push_back(n);
            }
        }
    }

    let mut unreached: BTreeSet<usize> = (0..adjacency.len()).filter(|i| !reached.contains(i)).collect();
    let mut bridges = 0;
    while !unreached.is_empty() {
        let mut best: Option<(usize, usize, f64)> = None;
        for &a in &reached {
            for &b in &unreached {
                let d = positions[a].distance(positions[b]);
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((a, b, d));
                }
            }
        }
        let Some((a, b, _)) = best else { break };
        link(adjacency, a, b);
        unreached.remove(&b);
        reached.insert(b);
        bridges += 1;
    }
    bridges
}

// ── Generation ─────────────────────────────────────────────────────────

/// A generated map. Regions are unowned, normal, unfortified and worth 0
/// until setup assigns values.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub grid_width: usize,
    pub grid_height: usize,
    pub regions: BTreeMap<RegionId, Region>,
    /// Edges added by the connectivity repair pass.
    pub repair_edges: usize,
}

/// Generate a connected map of `count` regions (clamped to the configured
/// range). Region ids are contiguous from 1.
pub fn generate(config: &MapConfig, count: usize, rng: &mut impl Rng) -> GeneratedMap {
    let count = config.clamp_count(count).min(u8::MAX as usize);
    let (width, height) = grid_dimensions(count, config.aspect_ratio);
    let cells = grid_cells(count, width, height);
    let positions = grid_positions(config, &cells, width, height, rng);
    let names = region_names(count, rng);
    let mut adjacency = grid_adjacency(&cells, config.diagonal_probability, rng);
    let repair_edges = ensure_connectivity(&mut adjacency, &positions);

    let regions = names.into_iter()
        .zip(positions)
        .zip(adjacency)
        .enumerate()
        .map(|(i, ((name, position), adj))| {
            let id = RegionId(i as u8 + 1);
            let region = Region {
                id,
                name,
                position,
                owner: None,
                kind: RegionKind::Normal,
                fortification: Fortification::None,
                adjacent: adj.into_iter().map(|j| RegionId(j as u8 + 1)).collect(),
                point_value: 0,
                has_been_captured: false,
                original_owner: None,
            };
            (id, region)
        })
        .collect();

    debug!(count, width, height, repair_edges, "generated map");
    GeneratedMap { grid_width: width, grid_height: height, regions, repair_edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn grid_for_24_regions_is_6_by_4() {
        assert_eq!(grid_dimensions(24, 1280.0 / 720.0), (6, 4));
    }

    #[test]
    fn grid_covers_count() {
        for count in 16..=32 {
            let (w, h) = grid_dimensions(count, 16.0 / 9.0);
            assert!(w * h >= count);
            assert!(w * (h - 1) < count || w * h == count);
        }
    }

    #[test]
    fn names_are_unique_past_base_list() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let names = region_names(80, &mut rng);
        let unique: BTreeSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), 80);
        assert!(names[..36].iter().all(|n| REGION_NAMES.contains(&n.as_str())));
    }

    #[test]
    fn repair_bridges_disconnected_components() {
        let positions = vec![
            Position { x: 0.0, y: 0.0 },
            Position { x: 10.0, y: 0.0 },
            Position { x: 100.0, y: 0.0 },
            Position { x: 12.0, y: 0.0 },
        ];
        let mut adjacency = vec![BTreeSet::new(); 4];
        link(&mut adjacency, 0, 1);
        let bridges = ensure_connectivity(&mut adjacency, &positions);
        assert_eq!(bridges, 2);
        // 3 is closest to 1, then 2 is closest to 3
        assert!(adjacency[1].contains(&3));
        assert!(adjacency[3].contains(&2));
    }

    #[test]
    fn positions_stay_inside_margins() {
        let config = MapConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let map = generate(&config, 32, &mut rng);
        for r in map.regions.values() {
            assert!(r.position.x > config.border_margin && r.position.x < config.canvas_width() - config.border_margin);
            assert!(r.position.y > config.border_margin && r.position.y < config.canvas_height - config.border_margin);
        }
    }

    #[test]
    fn same_seed_same_map() {
        let config = MapConfig::default();
        let a = generate(&config, 24, &mut ChaCha8Rng::seed_from_u64(9));
        let b = generate(&config, 24, &mut ChaCha8Rng::seed_from_u64(9));
        let adj = |m: &GeneratedMap| m.regions.values().map(|r| r.adjacent.clone()).collect::<Vec<_>>();
        assert_eq!(adj(&a), adj(&b));
        let names = |m: &GeneratedMap| m.regions.values().map(|r| r.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
    }
}
