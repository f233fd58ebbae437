// ═══════════════════════════════════════════════════════════════════════
// Match setup — creates the initial MatchState for N seats
// ═══════════════════════════════════════════════════════════════════════

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::map;
use crate::types::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Default display name when a seat has none.
pub fn default_player_name(id: PlayerId, kind: PlayerKind) -> String {
    match kind {
        PlayerKind::Human => format!("Player {}", id.0),
        PlayerKind::Ai => format!("AI {}", id.0),
    }
}

/// Create a match on a freshly generated map. The seed drives the map and
/// every later random draw.
pub fn create_match(config: MatchConfig, seats: &[PlayerSeat], seed: u64) -> Result<MatchState, MatchError> {
    let config = config.sanitized();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let generated = map::generate(&config.map, config.map.region_count, &mut rng);
    create_match_on_map(config, seats, generated.regions, seed)
}

/// Create a match on a prepared set of regions. Ownership, kinds and values
/// are reset; adjacency is kept as given.
pub fn create_match_on_map(
    config: MatchConfig,
    seats: &[PlayerSeat],
    regions: BTreeMap<RegionId, Region>,
    seed: u64,
) -> Result<MatchState, MatchError> {
    let config = config.sanitized();
    if seats.len() < config.min_players || seats.len() > config.max_players {
        return Err(MatchError::InvalidSetup(format!(
            "{} seats, need {}-{}", seats.len(), config.min_players, config.max_players
        )));
    }
    if regions.len() < seats.len() {
        return Err(MatchError::InvalidSetup(format!(
            "{} regions for {} players", regions.len(), seats.len()
        )));
    }

    let players: BTreeMap<PlayerId, Player> = seats.iter()
        .enumerate()
        .map(|(i, seat)| {
            let id = PlayerId(i as u8 + 1);
            let name = if seat.name.trim().is_empty() {
                default_player_name(id, seat.kind)
            } else {
                seat.name.clone()
            };
            let player = Player {
                id,
                name,
                kind: seat.kind,
                score: config.starting_score,
                alive: true,
                regions: BTreeSet::new(),
                capital: None,
                turns_played: 0,
            };
            (id, player)
        })
        .collect();

    let initial = config.initial_region_points;
    let regions: BTreeMap<RegionId, Region> = regions.into_iter()
        .map(|(id, mut r)| {
            r.owner = None;
            r.original_owner = None;
            r.kind = RegionKind::Normal;
            r.fortification = Fortification::None;
            r.has_been_captured = false;
            r.point_value = initial;
            (id, r)
        })
        .collect();

    info!(players = players.len(), regions = regions.len(), seed, "match created");

    Ok(MatchState {
        max_turns_per_player: config.turns_per_player,
        config,
        players,
        regions,
        capitals: BTreeMap::new(),
        phase: Phase::Setup,
        current_player: None,
        current_turn: 0,
        turn_budget: 0,
        turn_order: Vec::new(),
        is_special_round: false,
        current_battle: None,
        question_round: None,
        occupation_ranking: Vec::new(),
        occupation_claims: Vec::new(),
        history: Vec::new(),
        pending: None,
        winner: None,
        seed,
        rng_counter: 0,
    })
}
