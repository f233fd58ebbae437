// ═══════════════════════════════════════════════════════════════════════
// Core types — players, regions, capitals, battles and the match state
// ═══════════════════════════════════════════════════════════════════════

use crate::config::MatchConfig;
use crate::trivia::Question;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Identifiers ────────────────────────────────────────────────────────
// Compact, copyable ids. Region ids are contiguous from 1.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u8);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

// ── Enums ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerKind {
    Human,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    Normal,
    Capital,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fortification {
    None,
    Fortified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Spawning,
    Occupying,
    Turn,
    Battle,
    CapitalAttack,
    GameOver,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Setup => "Setup",
            Phase::Spawning => "Spawning",
            Phase::Occupying => "Occupying",
            Phase::Turn => "Turn",
            Phase::Battle => "Battle",
            Phase::CapitalAttack => "CapitalAttack",
            Phase::GameOver => "GameOver",
        };
        f.write_str(name)
    }
}

// ── Position ───────────────────────────────────────────────────────────

/// Display position on the map canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn distance(self, other: Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

// ── Region ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub position: Position,
    pub owner: Option<PlayerId>,
    pub kind: RegionKind,
    pub fortification: Fortification,
    /// Symmetric: `a.adjacent.contains(b)` iff `b.adjacent.contains(a)`.
    pub adjacent: BTreeSet<RegionId>,
    pub point_value: u32,
    /// Set on the first battle capture and never cleared.
    pub has_been_captured: bool,
    pub original_owner: Option<PlayerId>,
}

impl Region {
    pub fn is_adjacent_to(&self, other: RegionId) -> bool {
        self.adjacent.contains(&other)
    }

    pub fn is_fortified(&self) -> bool {
        self.fortification == Fortification::Fortified
    }
}

// ── Capital ────────────────────────────────────────────────────────────

/// Hit-point record bound to a `Capital`-kind region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capital {
    pub region: RegionId,
    pub owner: PlayerId,
    pub current_hp: u8,
    pub max_hp: u8,
    pub turns_since_last_attack: u32,
    pub destroyed: bool,
}

impl Capital {
    pub fn new(region: RegionId, owner: PlayerId, max_hp: u8) -> Self {
        Capital {
            region,
            owner,
            current_hp: max_hp,
            max_hp,
            turns_since_last_attack: 0,
            destroyed: false,
        }
    }

    /// Remove one HP. Returns true exactly once: on the hit that reaches 0.
    pub fn take_damage(&mut self) -> bool {
        if self.destroyed || self.current_hp == 0 {
            return false;
        }
        self.current_hp -= 1;
        self.register_attack();
        if self.current_hp == 0 {
            self.destroyed = true;
            return true;
        }
        false
    }

    /// Any attack, damaging or repelled, resets the regeneration counter.
    pub fn register_attack(&mut self) {
        self.turns_since_last_attack = 0;
    }

    /// Count one completed turn without an attack.
    pub fn tick(&mut self) {
        if !self.destroyed {
            self.turns_since_last_attack += 1;
        }
    }

    /// Gain 1 HP after `threshold` unattacked turns. Returns true if HP changed.
    pub fn regenerate(&mut self, threshold: u32) -> bool {
        if self.destroyed || self.turns_since_last_attack < threshold || self.current_hp >= self.max_hp {
            return false;
        }
        self.current_hp += 1;
        self.turns_since_last_attack = 0;
        true
    }
}

// ── Player ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub kind: PlayerKind,
    pub score: u32,
    pub alive: bool,
    /// Exactly the regions whose `owner` is this player.
    pub regions: BTreeSet<RegionId>,
    pub capital: Option<RegionId>,
    pub turns_played: u32,
}

/// Setup-time description of a seat at the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeat {
    pub name: String,
    pub kind: PlayerKind,
}

impl PlayerSeat {
    pub fn human(name: impl Into<String>) -> Self {
        PlayerSeat { name: name.into(), kind: PlayerKind::Human }
    }

    pub fn ai(name: impl Into<String>) -> Self {
        PlayerSeat { name: name.into(), kind: PlayerKind::Ai }
    }
}

// ── Battle ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub region: RegionId,
    pub capital_attack: bool,
    pub attacker_correct: Option<bool>,
    pub defender_correct: Option<bool>,
    /// Closest-then-fastest order from the open-answer tiebreak.
    pub open_answer_ranking: Option<Vec<PlayerId>>,
    /// `None` while unresolved; a tie on the multiple-choice stage stays `None`.
    pub winner: Option<PlayerId>,
    pub defender_bonus: bool,
    pub region_captured: bool,
}

impl BattleResult {
    pub fn new(attacker: PlayerId, defender: PlayerId, region: RegionId, capital_attack: bool) -> Self {
        BattleResult {
            attacker,
            defender,
            region,
            capital_attack,
            attacker_correct: None,
            defender_correct: None,
            open_answer_ranking: None,
            winner: None,
            defender_bonus: false,
            region_captured: false,
        }
    }

    /// Both sides answered the multiple-choice question correctly.
    pub fn needs_tiebreak(&self) -> bool {
        self.winner.is_none() && self.attacker_correct == Some(true) && self.defender_correct == Some(true)
    }
}

// ── Question rounds ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionPurpose {
    Occupation,
    Battle,
    Tiebreak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerValue {
    /// `None` = no answer given (timeout).
    Choice(Option<String>),
    /// `None` = unusable number; ranks last.
    Number(Option<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub player: PlayerId,
    pub answer: AnswerValue,
    pub elapsed_ms: u64,
}

/// One question put to a set of participants, with answers collected so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRound {
    pub question: Question,
    pub purpose: QuestionPurpose,
    pub participants: Vec<PlayerId>,
    pub answers: Vec<SubmittedAnswer>,
}

impl QuestionRound {
    pub fn next_to_answer(&self) -> Option<PlayerId> {
        self.participants.iter()
            .copied()
            .find(|p| !self.answers.iter().any(|a| a.player == *p))
    }

    pub fn answer_of(&self, player: PlayerId) -> Option<&SubmittedAnswer> {
        self.answers.iter().find(|a| a.player == player)
    }
}

// ── Pending decisions ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoicePurpose {
    /// Claim an unclaimed region during occupation.
    Occupy,
    /// Pick an enemy region to attack or an owned region to fortify.
    TurnAction { attack: Vec<RegionId>, fortify: Vec<RegionId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingDecision {
    ChooseRegion {
        player: PlayerId,
        candidates: Vec<RegionId>,
        purpose: ChoicePurpose,
        time_budget_ms: u64,
    },
    AnswerMultipleChoice {
        player: PlayerId,
        time_budget_ms: u64,
    },
    AnswerOpen {
        player: PlayerId,
        purpose: QuestionPurpose,
        time_budget_ms: u64,
    },
}

impl PendingDecision {
    /// The player whose provider must answer.
    pub fn player(&self) -> PlayerId {
        match self {
            PendingDecision::ChooseRegion { player, .. }
            | PendingDecision::AnswerMultipleChoice { player, .. }
            | PendingDecision::AnswerOpen { player, .. } => *player,
        }
    }

    pub fn time_budget_ms(&self) -> u64 {
        match self {
            PendingDecision::ChooseRegion { time_budget_ms, .. }
            | PendingDecision::AnswerMultipleChoice { time_budget_ms, .. }
            | PendingDecision::AnswerOpen { time_budget_ms, .. } => *time_budget_ms,
        }
    }
}

// ── History ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnAction {
    Attack(RegionId),
    Fortify(RegionId),
    /// Player had no legal attack or fortify.
    NoAction,
    /// Player is eliminated; the slot still advances the counter.
    Eliminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub player: PlayerId,
    pub action: TurnAction,
    pub special_round: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryEntry {
    Battle(BattleResult),
    Turn(TurnRecord),
    Elimination { eliminated: PlayerId, conqueror: PlayerId, score_transferred: u32 },
}

// ── Standings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: u32,
    pub player: PlayerId,
    pub name: String,
    pub score: u32,
    pub alive: bool,
    pub regions: usize,
}

// ── Match State ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchState {
    pub config: MatchConfig,

    pub players: BTreeMap<PlayerId, Player>,
    pub regions: BTreeMap<RegionId, Region>,
    /// Keyed by the capital's region.
    pub capitals: BTreeMap<RegionId, Capital>,

    pub phase: Phase,
    pub current_player: Option<PlayerId>,
    /// Turn slots completed so far in the turn phase.
    pub current_turn: u32,
    pub max_turns_per_player: u32,
    /// Total turn slots fixed when the turn phase starts.
    pub turn_budget: u32,
    /// Ascending score at the end of occupation, ties by id.
    pub turn_order: Vec<PlayerId>,
    pub is_special_round: bool,

    pub current_battle: Option<BattleResult>,
    pub question_round: Option<QuestionRound>,

    pub occupation_ranking: Vec<PlayerId>,
    /// Claims still owed from the last occupation ranking, front first.
    pub occupation_claims: Vec<PlayerId>,

    /// Append-only audit trail.
    pub history: Vec<HistoryEntry>,

    pub pending: Option<PendingDecision>,
    pub winner: Option<PlayerId>,

    // Deterministic RNG
    pub seed: u64,
    pub rng_counter: u64,
}

impl MatchState {
    /// Get a player. Panics on an unknown id; use `players.get` when unsure.
    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[&id]
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[&id]
    }

    pub fn alive_players(&self) -> Vec<PlayerId> {
        self.players.values().filter(|p| p.alive).map(|p| p.id).collect()
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }

    pub fn unclaimed_regions(&self) -> Vec<RegionId> {
        self.regions.values().filter(|r| r.owner.is_none()).map(|r| r.id).collect()
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Fresh RNG for one draw site. Advances the stream so resumed
    /// snapshots continue where they left off.
    pub fn next_rng(&mut self) -> ChaCha8Rng {
        self.rng_counter += 1;
        ChaCha8Rng::seed_from_u64(self.seed ^ self.rng_counter.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}
