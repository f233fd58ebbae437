// ═══════════════════════════════════════════════════════════════════════
// Heuristic Provider — difficulty-tuned strategic opponent.
// Scores every candidate region, then lets the difficulty decide how
// often it actually takes the best one. Trivia accuracy and think time
// also scale with difficulty.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{DecisionProvider, MAX_ESTIMATE};
use conquest_engine::trivia::{Question, QuestionKind};
use conquest_engine::types::*;
use conquest_engine::visibility::MatchView;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Distances are normalised against roughly the width of the canvas.
const MAX_DISTANCE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Chance of picking the right option.
    pub fn multiple_choice_accuracy(self) -> f64 {
        match self {
            Difficulty::Easy => 0.40,
            Difficulty::Medium => 0.65,
            Difficulty::Hard => 0.85,
        }
    }

    /// Chance of landing within 10% of the correct number.
    pub fn open_answer_accuracy(self) -> f64 {
        match self {
            Difficulty::Easy => 0.45,
            Difficulty::Medium => 0.60,
            Difficulty::Hard => 0.85,
        }
    }

    pub fn accuracy(self, kind: QuestionKind) -> f64 {
        match kind {
            QuestionKind::MultipleChoice => self.multiple_choice_accuracy(),
            QuestionKind::OpenAnswer => self.open_answer_accuracy(),
        }
    }

    /// Simulated think time range in ms.
    pub fn think_time_ms(self) -> (u64, u64) {
        match self {
            Difficulty::Easy => (3_000, 5_000),
            Difficulty::Medium => (2_000, 4_000),
            Difficulty::Hard => (1_000, 3_000),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}' (easy, medium, hard)", other)),
        }
    }
}

pub struct HeuristicProvider {
    difficulty: Difficulty,
    name: String,
    rng: ChaCha8Rng,
}

impl HeuristicProvider {
    pub fn new(difficulty: Difficulty, seed: u64) -> Self {
        HeuristicProvider {
            difficulty,
            name: format!("Heuristic ({})", difficulty),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Occupation picks by territory fit; a turn flips a coin between its
    /// best attack and its best fortification.
    fn pick_region(&mut self, view: &MatchView, candidates: &[RegionId], purpose: &ChoicePurpose) -> Option<RegionId> {
        match purpose {
            ChoicePurpose::Occupy => {
                let scored = candidates.iter().map(|&r| (r, self.occupation_score(view, r))).collect();
                self.pick(scored, 0.8)
            }
            ChoicePurpose::TurnAction { attack, fortify } => {
                // Coin flip between attacking and fortifying, taking the
                // other when the preferred list is empty.
                let wants_attack = self.rng.gen_bool(0.5);
                if (wants_attack || fortify.is_empty()) && !attack.is_empty() {
                    let scored = attack.iter().map(|&r| (r, self.attack_score(view, r))).collect();
                    self.pick(scored, 0.7)
                } else if !fortify.is_empty() {
                    let scored = fortify.iter().map(|&r| (r, self.fortify_score(view, r))).collect();
                    self.pick(scored, 0.8)
                } else {
                    candidates.first().copied()
                }
            }
        }
    }

    fn think_time(&mut self, budget_ms: u64) -> u64 {
        let (lo, hi) = self.difficulty.think_time_ms();
        self.rng.gen_range(lo..=hi).min(budget_ms)
    }

    /// Hard takes the best, Medium the best with probability `best_odds`
    /// (else second best), Easy any of the top three.
    fn pick(&mut self, mut scored: Vec<(RegionId, f64)>, best_odds: f64) -> Option<RegionId> {
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let best = scored.first()?.0;
        trace!(difficulty = %self.difficulty, ?scored, "candidates scored");
        match self.difficulty {
            Difficulty::Hard => Some(best),
            Difficulty::Medium => {
                if self.rng.gen_bool(best_odds) {
                    Some(best)
                } else {
                    Some(scored.get(1).map_or(best, |s| s.0))
                }
            }
            Difficulty::Easy => {
                let top = scored.len().min(3);
                scored[..top].choose(&mut self.rng).map(|s| s.0)
            }
        }
    }

    // ── Region scoring ─────────────────────────────────────────────────

    fn occupation_score(&mut self, view: &MatchView, region: RegionId) -> f64 {
        let r = view.region(region);
        let mut score = r.adjacent.len() as f64 * 0.5;
        score += view.friendly_neighbours(region) as f64 * 3.0;

        if let Some(capital) = view.me().capital {
            score += closeness(r.position, view.region(capital).position) * 2.0;
        }
        score -= view.hostile_neighbours(region) as f64 * 0.5;

        // Expand toward the nearest opponent capital
        if self.difficulty != Difficulty::Easy {
            let nearest = view.opponents()
                .filter_map(|p| p.capital)
                .map(|c| closeness(r.position, view.region(c).position))
                .max_by(|a, b| a.total_cmp(b));
            if let Some(c) = nearest {
                score += c * 1.5;
            }
        }

        score * self.rng.gen_range(0.8..1.2)
    }

    fn attack_score(&mut self, view: &MatchView, region: RegionId) -> f64 {
        let r = view.region(region);
        let mut score = r.point_value as f64 / 1000.0;
        if r.kind == RegionKind::Capital {
            score += 5.0;
        }
        if !r.is_fortified() {
            score += 1.0;
        }
        score += view.friendly_neighbours(region) as f64 * 2.0;

        // Underdogs go after the leaders
        if let Some(owner) = r.owner {
            let theirs = view.state.player(owner).score.max(1) as f64;
            if (view.me().score as f64) / theirs < 0.5 {
                score += 2.0;
            }
        }

        score * self.rng.gen_range(0.9..1.1)
    }

    fn fortify_score(&mut self, view: &MatchView, region: RegionId) -> f64 {
        let r = view.region(region);
        let mut score = r.point_value as f64 / 1000.0;
        if r.kind == RegionKind::Capital {
            score += 3.0;
        }
        score += view.hostile_neighbours(region) as f64 * 2.0;
        score += view.friendly_neighbours(region) as f64;
        score * self.rng.gen_range(0.9..1.1)
    }
}

/// 1.0 on top of `to`, 0.0 at `MAX_DISTANCE` or beyond.
fn closeness(from: Position, to: Position) -> f64 {
    (MAX_DISTANCE - from.distance(to).min(MAX_DISTANCE)) / MAX_DISTANCE
}

fn round_if_whole(answer: f64, correct: f64) -> f64 {
    if correct.fract() == 0.0 { answer.round() } else { answer }
}

impl DecisionProvider for HeuristicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_region(
        &mut self,
        view: &MatchView,
        candidates: &[RegionId],
        purpose: &ChoicePurpose,
        time_budget_ms: u64,
    ) -> Option<(RegionId, u64)> {
        let region = self.pick_region(view, candidates, purpose)?;
        Some((region, self.think_time(time_budget_ms)))
    }

    fn answer_multiple_choice(&mut self, _view: &MatchView, question: &Question, time_budget_ms: u64) -> Option<(String, u64)> {
        let elapsed = self.think_time(time_budget_ms);
        let answer = if self.rng.gen_bool(self.difficulty.multiple_choice_accuracy()) {
            question.correct_answer.clone()
        } else {
            question.wrong_options()
                .choose(&mut self.rng)
                .map_or_else(|| question.correct_answer.clone(), |o| o.to_string())
        };
        Some((answer, elapsed))
    }

    fn answer_open(
        &mut self,
        _view: &MatchView,
        question: &Question,
        _purpose: QuestionPurpose,
        time_budget_ms: u64,
    ) -> Option<(f64, u64)> {
        let correct = question.numeric_answer()?;
        let elapsed = self.think_time(time_budget_ms);

        let target = correct.clamp(-MAX_ESTIMATE, MAX_ESTIMATE);

        let answer = if self.rng.gen_bool(self.difficulty.open_answer_accuracy()) {
            let (a, b) = (target * 0.9, target * 1.1);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            round_if_whole(self.rng.gen_range(lo..=hi), correct)
        } else {
            let scale = if target == 0.0 { 100.0 } else { target.abs() * self.rng.gen_range(0.5..2.0) };
            let mut guess = self.rng.gen_range(-scale..=scale);
            if self.rng.gen_bool(0.5) {
                guess *= self.rng.gen_range(2.0..5.0);
            }
            round_if_whole(guess, correct)
        };
        Some((answer, elapsed))
    }
}
