//! Match invariants - consistency checks that detect bugs.
//!
//! All mutation goes through the rules engine and orchestrator, so these
//! should never fire in a correct build. A violation is a programming
//! error, not a gameplay condition.

use crate::types::{MatchState, RegionKind};

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

fn violation(message: String) -> InvariantViolation {
    InvariantViolation { message }
}

/// Check all match invariants. Returns every violation found.
#[must_use]
pub fn check(state: &MatchState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    // Adjacency symmetry and dangling edges
    for region in state.regions.values() {
        for adj in &region.adjacent {
            match state.regions.get(adj) {
                None => violations.push(violation(format!(
                    "region {} adjacent to missing region {}", region.id, adj
                ))),
                Some(other) if !other.adjacent.contains(&region.id) => violations.push(violation(format!(
                    "adjacency not symmetric: {} -> {} but not {} -> {}", region.id, adj, adj, region.id
                ))),
                Some(_) => {}
            }
        }
        if region.adjacent.contains(&region.id) {
            violations.push(violation(format!("region {} is adjacent to itself", region.id)));
        }
    }

    // Region owner <-> player controlled set
    for region in state.regions.values() {
        if let Some(owner) = region.owner {
            match state.players.get(&owner) {
                None => violations.push(violation(format!(
                    "region {} owned by missing player {}", region.id, owner
                ))),
                Some(p) if !p.regions.contains(&region.id) => violations.push(violation(format!(
                    "region {} owned by {} but missing from its controlled set", region.id, owner
                ))),
                Some(_) => {}
            }
        }
    }
    for player in state.players.values() {
        for rid in &player.regions {
            match state.regions.get(rid) {
                None => violations.push(violation(format!(
                    "player {} controls missing region {}", player.id, rid
                ))),
                Some(r) if r.owner != Some(player.id) => violations.push(violation(format!(
                    "player {} lists region {} owned by {:?}", player.id, rid, r.owner
                ))),
                Some(_) => {}
            }
        }
        if !player.alive && !player.regions.is_empty() {
            violations.push(violation(format!(
                "eliminated player {} still controls {} regions", player.id, player.regions.len()
            )));
        }
    }

    // Capital record <-> capital-kind owned region
    for (rid, capital) in &state.capitals {
        if capital.region != *rid {
            violations.push(violation(format!("capital keyed {} points at {}", rid, capital.region)));
        }
        if capital.destroyed {
            violations.push(violation(format!("destroyed capital {} still recorded", rid)));
        }
        if capital.current_hp > capital.max_hp {
            violations.push(violation(format!(
                "capital {} hp {} exceeds max {}", rid, capital.current_hp, capital.max_hp
            )));
        }
        match state.regions.get(rid) {
            None => violations.push(violation(format!("capital for missing region {}", rid))),
            Some(r) => {
                if r.kind != RegionKind::Capital {
                    violations.push(violation(format!("capital record on non-capital region {}", rid)));
                }
                if r.owner != Some(capital.owner) {
                    violations.push(violation(format!(
                        "capital {} owner {} but region owner {:?}", rid, capital.owner, r.owner
                    )));
                }
            }
        }
    }
    for region in state.regions.values() {
        if region.kind == RegionKind::Capital
            && region.owner.is_some()
            && !state.capitals.contains_key(&region.id)
        {
            violations.push(violation(format!("owned capital region {} has no capital record", region.id)));
        }
    }

    violations
}
