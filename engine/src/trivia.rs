// ═══════════════════════════════════════════════════════════════════════
// Trivia content — questions, validation, question providers
// ═══════════════════════════════════════════════════════════════════════

use crate::error::MatchError;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

// ── Question ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    #[serde(rename = "MULTIPLE_CHOICE")]
    MultipleChoice,
    #[serde(rename = "OPEN_ANSWER")]
    OpenAnswer,
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionKind::MultipleChoice => f.write_str("multiple choice"),
            QuestionKind::OpenAnswer => f.write_str("open answer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub category: String,
    #[serde(rename = "question_type")]
    pub kind: QuestionKind,
    /// Option text for multiple choice, a decimal number for open answers.
    /// Accepts a JSON string or number.
    #[serde(deserialize_with = "string_or_number")]
    pub correct_answer: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
}

fn default_difficulty() -> u8 {
    1
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number answer, got {}",
            other
        ))),
    }
}

impl Question {
    pub fn multiple_choice(
        id: u32,
        text: impl Into<String>,
        category: impl Into<String>,
        correct: impl Into<String>,
        options: &[&str],
    ) -> Self {
        Question {
            id,
            text: text.into(),
            category: category.into(),
            kind: QuestionKind::MultipleChoice,
            correct_answer: correct.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            difficulty: 1,
        }
    }

    pub fn open_answer(id: u32, text: impl Into<String>, category: impl Into<String>, correct: f64) -> Self {
        Question {
            id,
            text: text.into(),
            category: category.into(),
            kind: QuestionKind::OpenAnswer,
            correct_answer: correct.to_string(),
            options: Vec::new(),
            difficulty: 1,
        }
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let invalid = |reason: &str| MatchError::InvalidQuestion { id: self.id, reason: reason.to_string() };
        if self.text.trim().is_empty() {
            return Err(invalid("empty text"));
        }
        if !(1..=5).contains(&self.difficulty) {
            return Err(invalid("difficulty must be between 1 and 5"));
        }
        match self.kind {
            QuestionKind::MultipleChoice => {
                if self.options.is_empty() {
                    return Err(invalid("multiple choice question has no options"));
                }
                if !self.options.contains(&self.correct_answer) {
                    return Err(invalid("correct answer is not among the options"));
                }
            }
            QuestionKind::OpenAnswer => {
                if self.numeric_answer().is_none() {
                    return Err(invalid("open answer must be numeric"));
                }
            }
        }
        Ok(())
    }

    /// The correct answer as a number, for open-answer questions.
    pub fn numeric_answer(&self) -> Option<f64> {
        self.correct_answer.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Exact match against the correct option. Anything outside the offered
    /// set is simply wrong.
    pub fn is_correct_choice(&self, answer: &str) -> bool {
        self.kind == QuestionKind::MultipleChoice && answer == self.correct_answer
    }

    /// Incorrect options, in offered order.
    pub fn wrong_options(&self) -> Vec<&str> {
        self.options.iter()
            .filter(|o| **o != self.correct_answer)
            .map(|o| o.as_str())
            .collect()
    }
}

// ── Fallbacks ──────────────────────────────────────────────────────────
// Used whenever the provider has nothing matching; a match never stalls
// for lack of content.

pub const FALLBACK_OPEN_ID: u32 = 0;
pub const FALLBACK_CHOICE_ID: u32 = 0;

pub fn fallback_question(kind: QuestionKind) -> Question {
    match kind {
        QuestionKind::OpenAnswer => Question::open_answer(FALLBACK_OPEN_ID, "What is 42?", "General Knowledge", 42.0),
        QuestionKind::MultipleChoice => Question::multiple_choice(
            FALLBACK_CHOICE_ID,
            "What is the capital of France?",
            "Geography",
            "Paris",
            &["Paris", "London", "Berlin", "Madrid"],
        ),
    }
}

// ── Provider ───────────────────────────────────────────────────────────

/// Source of questions for the orchestrator. `None` means nothing matches;
/// the caller substitutes a fallback.
pub trait QuestionProvider {
    fn get_question(
        &mut self,
        categories: &BTreeSet<String>,
        kind: QuestionKind,
        rng: &mut dyn RngCore,
    ) -> Option<Question>;
}

/// Hands out questions from a fixed queue, then runs dry. Handy for
/// scripting exact battles.
#[derive(Debug, Clone, Default)]
pub struct QueuedQuestions {
    pub queue: std::collections::VecDeque<Question>,
}

impl QueuedQuestions {
    pub fn new(questions: impl IntoIterator<Item = Question>) -> Self {
        QueuedQuestions { queue: questions.into_iter().collect() }
    }
}

impl QuestionProvider for QueuedQuestions {
    fn get_question(&mut self, _: &BTreeSet<String>, kind: QuestionKind, _: &mut dyn RngCore) -> Option<Question> {
        let pos = self.queue.iter().position(|q| q.kind == kind)?;
        self.queue.remove(pos)
    }
}

// ── Question bank ──────────────────────────────────────────────────────

const SAMPLE_QUESTIONS: &str = include_str!("../data/questions.json");

/// In-memory question store. Options are shuffled on every draw so the
/// correct answer has no fixed slot.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
    times_asked: BTreeMap<u32, u32>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, MatchError> {
        for q in &questions {
            q.validate()?;
        }
        Ok(QuestionBank { questions, times_asked: BTreeMap::new() })
    }

    /// Parse a JSON array of questions.
    pub fn from_json(text: &str) -> Result<Self, MatchError> {
        let questions: Vec<Question> = serde_json::from_str(text)?;
        QuestionBank::new(questions)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MatchError> {
        let text = std::fs::read_to_string(path)?;
        QuestionBank::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MatchError> {
        std::fs::write(path, serde_json::to_string_pretty(&self.questions)?)?;
        Ok(())
    }

    /// The bundled starter set, one or more questions per default category.
    pub fn sample() -> Result<Self, MatchError> {
        QuestionBank::from_json(SAMPLE_QUESTIONS)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn categories(&self) -> BTreeSet<String> {
        self.questions.iter().map(|q| q.category.clone()).collect()
    }

    pub fn times_asked(&self, id: u32) -> u32 {
        self.times_asked.get(&id).copied().unwrap_or(0)
    }

    /// Questions of `kind` in any of `categories` (empty set = any category).
    pub fn matching(&self, categories: &BTreeSet<String>, kind: QuestionKind) -> Vec<&Question> {
        self.questions.iter()
            .filter(|q| q.kind == kind)
            .filter(|q| categories.is_empty() || categories.contains(&q.category))
            .collect()
    }
}

impl QuestionProvider for QuestionBank {
    fn get_question(
        &mut self,
        categories: &BTreeSet<String>,
        kind: QuestionKind,
        rng: &mut dyn RngCore,
    ) -> Option<Question> {
        let mut question = (*self.matching(categories, kind).choose(rng)?).clone();
        question.options.shuffle(rng);
        *self.times_asked.entry(question.id).or_insert(0) += 1;
        Some(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn sample_bank_is_valid_and_covers_both_kinds() {
        let bank = QuestionBank::sample().unwrap();
        assert!(bank.len() >= 20);
        let any = BTreeSet::new();
        assert!(!bank.matching(&any, QuestionKind::MultipleChoice).is_empty());
        assert!(!bank.matching(&any, QuestionKind::OpenAnswer).is_empty());
    }

    #[test]
    fn numeric_correct_answer_accepted_from_json_number() {
        let json = r#"[{"id": 7, "text": "Sides on a hexagon?", "category": "Science",
                        "question_type": "OPEN_ANSWER", "correct_answer": 6, "options": []}]"#;
        let bank = QuestionBank::from_json(json).unwrap();
        assert_eq!(bank.questions()[0].numeric_answer(), Some(6.0));
        assert_eq!(bank.questions()[0].difficulty, 1);
    }

    #[test]
    fn validation_rejects_bad_questions() {
        let mut q = Question::multiple_choice(1, "Q?", "Science", "A", &["B", "C"]);
        assert!(matches!(q.validate(), Err(MatchError::InvalidQuestion { id: 1, .. })));
        q.options.push("A".into());
        assert!(q.validate().is_ok());

        let mut open = Question::open_answer(2, "How many?", "Science", 3.0);
        open.correct_answer = "three".into();
        assert!(open.validate().is_err());

        let mut hard = Question::open_answer(3, "How many?", "Science", 3.0);
        hard.difficulty = 9;
        assert!(hard.validate().is_err());
    }

    #[test]
    fn bank_filters_by_category_and_counts_draws() {
        let mut bank = QuestionBank::new(vec![
            Question::multiple_choice(1, "Q1", "Science", "A", &["A", "B"]),
            Question::multiple_choice(2, "Q2", "History", "A", &["A", "B"]),
            Question::open_answer(3, "Q3", "Science", 10.0),
        ]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let science: BTreeSet<String> = ["Science".to_string()].into_iter().collect();
        for _ in 0..5 {
            let q = bank.get_question(&science, QuestionKind::MultipleChoice, &mut rng).unwrap();
            assert_eq!(q.id, 1);
        }
        assert_eq!(bank.times_asked(1), 5);
        let sports: BTreeSet<String> = ["Sports".to_string()].into_iter().collect();
        assert!(bank.get_question(&sports, QuestionKind::OpenAnswer, &mut rng).is_none());
    }

    #[test]
    fn fallbacks_are_valid() {
        let open = fallback_question(QuestionKind::OpenAnswer);
        assert_eq!(open.numeric_answer(), Some(42.0));
        let mc = fallback_question(QuestionKind::MultipleChoice);
        assert!(mc.validate().is_ok());
        assert!(mc.is_correct_choice("Paris"));
        assert!(!mc.is_correct_choice("paris"));
        assert_eq!(mc.wrong_options().len(), 3);
    }

    #[test]
    fn queued_questions_skip_other_kinds() {
        let mut queue = QueuedQuestions::new(vec![
            Question::open_answer(1, "Q1", "Science", 1.0),
            Question::multiple_choice(2, "Q2", "Science", "A", &["A", "B"]),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let q = queue.get_question(&BTreeSet::new(), QuestionKind::MultipleChoice, &mut rng).unwrap();
        assert_eq!(q.id, 2);
        assert_eq!(queue.queue.len(), 1);
    }
}
