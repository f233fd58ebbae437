// ═══════════════════════════════════════════════════════════════════════
// Random Provider — makes all decisions randomly.
// Serves as baseline and for testing engine stability.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{DecisionProvider, MAX_ESTIMATE};
use conquest_engine::trivia::Question;
use conquest_engine::types::*;
use conquest_engine::visibility::MatchView;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub struct RandomProvider {
    rng: ChaCha8Rng,
}

impl RandomProvider {
    pub fn new(seed: u64) -> Self {
        RandomProvider { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl DecisionProvider for RandomProvider {
    fn name(&self) -> &str { "Random" }

    fn choose_region(
        &mut self,
        _view: &MatchView,
        candidates: &[RegionId],
        _purpose: &ChoicePurpose,
        time_budget_ms: u64,
    ) -> Option<(RegionId, u64)> {
        let region = *candidates.choose(&mut self.rng)?;
        Some((region, self.rng.gen_range(0..=time_budget_ms)))
    }

    fn answer_multiple_choice(&mut self, _view: &MatchView, question: &Question, time_budget_ms: u64) -> Option<(String, u64)> {
        let answer = question.options.choose(&mut self.rng)?.clone();
        Some((answer, self.rng.gen_range(0..=time_budget_ms)))
    }

    fn answer_open(
        &mut self,
        _view: &MatchView,
        question: &Question,
        _purpose: QuestionPurpose,
        time_budget_ms: u64,
    ) -> Option<(f64, u64)> {
        // Same order of magnitude as the truth, otherwise anything goes
        let scale = question.numeric_answer()
            .map_or(100.0, |c| c.clamp(-MAX_ESTIMATE, MAX_ESTIMATE).abs().max(1.0) * 2.0);
        let answer = self.rng.gen_range(-scale..=scale);
        Some((answer, self.rng.gen_range(0..=time_budget_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_engine::config::MatchConfig;
    use conquest_engine::setup::create_match;
    use conquest_engine::visibility::match_view;

    #[test]
    fn test_huge_open_answer_gives_finite_guess() {
        let seats = vec![PlayerSeat::ai("A"), PlayerSeat::ai("B")];
        let state = create_match(MatchConfig::default(), &seats, 1).unwrap();
        let view = match_view(&state, PlayerId(1));
        let mut ai = RandomProvider::new(3);
        for correct in [1e308, -1e308, f64::MAX] {
            let question = Question::open_answer(9, "Very large", "Science", correct);
            assert!(question.validate().is_ok());
            for _ in 0..50 {
                let (answer, elapsed) = ai.answer_open(&view, &question, QuestionPurpose::Tiebreak, 30_000).unwrap();
                assert!(answer.is_finite());
                assert!(elapsed <= 30_000);
            }
        }
    }

    #[test]
    fn test_region_choice_within_budget() {
        let seats = vec![PlayerSeat::ai("A"), PlayerSeat::ai("B")];
        let state = create_match(MatchConfig::default(), &seats, 1).unwrap();
        let view = match_view(&state, PlayerId(1));
        let mut ai = RandomProvider::new(4);
        let candidates = [RegionId(2), RegionId(5)];
        for _ in 0..20 {
            let (region, elapsed) = ai.choose_region(&view, &candidates, &ChoicePurpose::Occupy, 500).unwrap();
            assert!(candidates.contains(&region));
            assert!(elapsed <= 500);
        }
        assert_eq!(ai.choose_region(&view, &[], &ChoicePurpose::Occupy, 500), None);
    }
}
