// ═══════════════════════════════════════════════════════════════════════
// Scripted Provider — fixed, fully deterministic policy.
// Used to stage exact battles in tests and as a benchmark opponent.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::DecisionProvider;
use conquest_engine::trivia::Question;
use conquest_engine::types::*;
use conquest_engine::visibility::MatchView;

/// Which candidate a scripted player takes on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionPolicy {
    /// First candidate (attacks are listed before fortifications).
    First,
    /// First fortify target when there is one.
    PreferFortify,
}

pub struct ScriptedProvider {
    name: String,
    pub always_correct: bool,
    /// Added to the correct number on open questions.
    pub open_offset: f64,
    pub elapsed_ms: u64,
    pub policy: RegionPolicy,
}

impl ScriptedProvider {
    pub fn always_right(name: impl Into<String>) -> Self {
        ScriptedProvider {
            name: name.into(),
            always_correct: true,
            open_offset: 0.0,
            elapsed_ms: 1_000,
            policy: RegionPolicy::First,
        }
    }

    pub fn always_wrong(name: impl Into<String>) -> Self {
        ScriptedProvider {
            always_correct: false,
            open_offset: 1_000.0,
            ..ScriptedProvider::always_right(name)
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.open_offset = offset;
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_policy(mut self, policy: RegionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl DecisionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_region(
        &mut self,
        _view: &MatchView,
        candidates: &[RegionId],
        purpose: &ChoicePurpose,
        _time_budget_ms: u64,
    ) -> Option<(RegionId, u64)> {
        if let (RegionPolicy::PreferFortify, ChoicePurpose::TurnAction { fortify, .. }) = (self.policy, purpose) {
            if let Some(&region) = fortify.first() {
                return Some((region, self.elapsed_ms));
            }
        }
        candidates.first().map(|&region| (region, self.elapsed_ms))
    }

    fn answer_multiple_choice(&mut self, _view: &MatchView, question: &Question, _time_budget_ms: u64) -> Option<(String, u64)> {
        let answer = if self.always_correct {
            question.correct_answer.clone()
        } else {
            question.wrong_options().first()?.to_string()
        };
        Some((answer, self.elapsed_ms))
    }

    fn answer_open(
        &mut self,
        _view: &MatchView,
        question: &Question,
        _purpose: QuestionPurpose,
        _time_budget_ms: u64,
    ) -> Option<(f64, u64)> {
        let correct = question.numeric_answer()?;
        Some((correct + self.open_offset, self.elapsed_ms))
    }
}
