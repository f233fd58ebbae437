// ═══════════════════════════════════════════════════════════════════════
// Navigation — reachability, connectivity, shortest paths over the
// region adjacency graph
// ═══════════════════════════════════════════════════════════════════════

use crate::types::{Region, RegionId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// All regions reachable from `start`, including `start` itself.
pub fn reachable(regions: &BTreeMap<RegionId, Region>, start: RegionId) -> BTreeSet<RegionId> {
    let mut visited = BTreeSet::new();
    if !regions.contains_key(&start) {
        return visited;
    }

    let mut queue: VecDeque<RegionId> = VecDeque::new();
    queue.push_back(start);
    visited.insert(start);

    while let Some(current) = queue.pop_front() {
        for &adj in &regions[&current].adjacent {
            if regions.contains_key(&adj) && visited.insert(adj) {
                queue.push_back(adj);
            }
        }
    }
    visited
}

/// True if every region can reach every other one.
pub fn is_connected(regions: &BTreeMap<RegionId, Region>) -> bool {
    match regions.keys().next() {
        None => true,
        Some(&first) => reachable(regions, first).len() == regions.len(),
    }
}

/// Connected components, each sorted, ordered by their smallest id.
pub fn components(regions: &BTreeMap<RegionId, Region>) -> Vec<BTreeSet<RegionId>> {
    let mut seen: BTreeSet<RegionId> = BTreeSet::new();
    let mut out = Vec::new();
    for &id in regions.keys() {
        if seen.contains(&id) {
            continue;
        }
        let component = reachable(regions, id);
        seen.extend(component.iter().copied());
        out.push(component);
    }
    out
}

/// Shortest path from `from` to `to` (both inclusive), or `None` if either
/// id is unknown or no path exists.
pub fn shortest_path(regions: &BTreeMap<RegionId, Region>, from: RegionId, to: RegionId) -> Option<Vec<RegionId>> {
    if !regions.contains_key(&from) || !regions.contains_key(&to) {
        return None;
    }
    if from == to {
        return Some(vec![from]);
    }

    let mut parent: BTreeMap<RegionId, RegionId> = BTreeMap::new();
    let mut queue: VecDeque<RegionId> = VecDeque::new();
    queue.push_back(from);
    parent.insert(from, from);

    while let Some(current) = queue.pop_front() {
        for &adj in &regions[&current].adjacent {
            if !regions.contains_key(&adj) || parent.contains_key(&adj) {
                continue;
            }
            parent.insert(adj, current);
            if adj == to {
                let mut path = vec![to];
                let mut step = to;
                while step != from {
                    step = parent[&step];
                    path.push(step);
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(adj);
        }
    }
    None
}

/// Hop count between two regions.
pub fn distance(regions: &BTreeMap<RegionId, Region>, from: RegionId, to: RegionId) -> Option<usize> {
    shortest_path(regions, from, to).map(|p| p.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fortification, Position, RegionKind};

    fn line(n: u8) -> BTreeMap<RegionId, Region> {
        (1..=n)
            .map(|i| {
                let mut adjacent = BTreeSet::new();
                if i > 1 { adjacent.insert(RegionId(i - 1)); }
                if i < n { adjacent.insert(RegionId(i + 1)); }
                let region = Region {
                    id: RegionId(i),
                    name: format!("R{}", i),
                    position: Position { x: i as f64, y: 0.0 },
                    owner: None,
                    kind: RegionKind::Normal,
                    fortification: Fortification::None,
                    adjacent,
                    point_value: 0,
                    has_been_captured: false,
                    original_owner: None,
                };
                (RegionId(i), region)
            })
            .collect()
    }

    #[test]
    fn path_along_a_line() {
        let regions = line(5);
        assert_eq!(
            shortest_path(&regions, RegionId(1), RegionId(4)),
            Some(vec![RegionId(1), RegionId(2), RegionId(3), RegionId(4)])
        );
        assert_eq!(distance(&regions, RegionId(5), RegionId(5)), Some(0));
        assert_eq!(shortest_path(&regions, RegionId(1), RegionId(9)), None);
    }

    #[test]
    fn split_line_is_two_components() {
        let mut regions = line(4);
        regions.get_mut(&RegionId(2)).unwrap().adjacent.remove(&RegionId(3));
        regions.get_mut(&RegionId(3)).unwrap().adjacent.remove(&RegionId(2));
        assert!(!is_connected(&regions));
        assert_eq!(components(&regions).len(), 2);
        assert_eq!(shortest_path(&regions, RegionId(1), RegionId(4)), None);
    }
}
