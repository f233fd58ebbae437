// ═══════════════════════════════════════════════════════════════════════
// DecisionProvider — interface every player controller implements
//
// Providers receive a `MatchView`, never the mutable state. The engine
// asks for one decision at a time through `state.pending`; `decide`
// maps that pending decision onto the matching method and wraps the
// reply in an engine `Action`.
//
// Answers come back with the elapsed time the provider claims it took.
// Simulated opponents report a think time instead of sleeping; a human
// console provider measures the real wall clock.
// ═══════════════════════════════════════════════════════════════════════

use conquest_engine::engine::Action;
use conquest_engine::trivia::Question;
use conquest_engine::types::*;
use conquest_engine::visibility::MatchView;

/// Largest magnitude a simulated estimate is built around. Keeps the
/// sampling ranges finite for huge open answers.
pub(crate) const MAX_ESTIMATE: f64 = f64::MAX / 16.0;

/// Trait that all decision providers implement.
pub trait DecisionProvider: Send {
    /// Human-readable name for this provider (e.g., "Heuristic (Hard)").
    fn name(&self) -> &str;

    /// Seat kind this provider fills. Only console players are human.
    fn kind(&self) -> PlayerKind {
        PlayerKind::Ai
    }

    /// Universal entry point: answer whatever the view's pending decision
    /// asks for. Anything the provider declines becomes a timeout.
    fn decide(&mut self, view: &MatchView) -> Action {
        let Some(pending) = view.pending else { return Action::Timeout };
        match pending {
            PendingDecision::ChooseRegion { candidates, purpose, time_budget_ms, .. } => {
                match self.choose_region(view, candidates, purpose, *time_budget_ms) {
                    Some((region, elapsed_ms)) => Action::ChooseRegion { region, elapsed_ms },
                    None => Action::Timeout,
                }
            }
            PendingDecision::AnswerMultipleChoice { time_budget_ms, .. } => {
                match view.question.and_then(|q| self.answer_multiple_choice(view, q, *time_budget_ms)) {
                    Some((answer, elapsed_ms)) => Action::AnswerChoice { answer, elapsed_ms },
                    None => Action::Timeout,
                }
            }
            PendingDecision::AnswerOpen { purpose, time_budget_ms, .. } => {
                match view.question.and_then(|q| self.answer_open(view, q, *purpose, *time_budget_ms)) {
                    Some((answer, elapsed_ms)) => Action::AnswerNumber { answer, elapsed_ms },
                    None => Action::Timeout,
                }
            }
        }
    }

    // ── Individual decision methods ────────────────────────────────────

    /// Pick one of `candidates`. For a turn action the purpose says which
    /// candidates are attacks and which are fortifications.
    /// Returns (region, elapsed ms); None = no choice.
    fn choose_region(
        &mut self,
        view: &MatchView,
        candidates: &[RegionId],
        purpose: &ChoicePurpose,
        time_budget_ms: u64,
    ) -> Option<(RegionId, u64)>;

    /// Pick an option text. Returns (answer, elapsed ms); None = no answer.
    fn answer_multiple_choice(&mut self, view: &MatchView, question: &Question, time_budget_ms: u64) -> Option<(String, u64)>;

    /// Give a numeric estimate. Returns (answer, elapsed ms); None = no answer.
    fn answer_open(
        &mut self,
        view: &MatchView,
        question: &Question,
        purpose: QuestionPurpose,
        time_budget_ms: u64,
    ) -> Option<(f64, u64)>;
}
