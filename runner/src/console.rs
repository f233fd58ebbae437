// ═══════════════════════════════════════════════════════════════════════
// Console Provider — a human player at the terminal.
// Reads choices from stdin and reports the real time taken to answer;
// a prompt left unanswered past its budget gives up.
// The correct answer carried by the view is never printed.
// ═══════════════════════════════════════════════════════════════════════

use conquest_agents::DecisionProvider;
use conquest_engine::trivia::Question;
use conquest_engine::types::*;
use conquest_engine::visibility::MatchView;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Attempts before an unreadable reply counts as no answer.
const MAX_ATTEMPTS: usize = 3;

pub struct ConsoleProvider {
    name: String,
    /// Lines from a background reader, so a prompt can give up at its
    /// deadline instead of blocking on input.
    lines: Receiver<String>,
}

impl ConsoleProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_input(name, BufReader::new(io::stdin()))
    }

    pub fn with_input<R: BufRead + Send + 'static>(name: impl Into<String>, input: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        ConsoleProvider { name: name.into(), lines: rx }
    }

    /// Next line typed before `deadline`. None on timeout or end of input.
    fn prompt(&self, text: &str, deadline: Instant) -> Option<String> {
        print!("{}", text);
        io::stdout().flush().ok()?;
        let wait = deadline.saturating_duration_since(Instant::now());
        match self.lines.recv_timeout(wait) {
            Ok(line) => Some(line.trim().to_string()),
            Err(RecvTimeoutError::Timeout) => {
                println!("\n  Out of time.");
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Ask until `parse` accepts a reply, the attempts run out or the budget
    /// is spent. Returns the value and the milliseconds it took.
    fn ask<T>(&self, text: &str, time_budget_ms: u64, parse: impl Fn(&str) -> Option<T>) -> Option<(T, u64)> {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(time_budget_ms);
        for _ in 0..MAX_ATTEMPTS {
            let reply = self.prompt(text, deadline)?;
            if let Some(value) = parse(&reply) {
                let elapsed = started.elapsed().as_millis() as u64;
                return (elapsed <= time_budget_ms).then_some((value, elapsed));
            }
            println!("  Not understood, try again.");
        }
        None
    }
}

fn print_scores(view: &MatchView) {
    println!();
    for p in view.state.players.values() {
        let marker = if p.id == view.viewer { "*" } else { " " };
        let status = if p.alive { "" } else { " (eliminated)" };
        println!("{} {:<16} {:>6} pts  {:>2} regions{}", marker, p.name, p.score, p.regions.len(), status);
    }
    if view.is_special_round() {
        println!("  ** Special round: gains are doubled **");
    }
}

fn describe(view: &MatchView, region: RegionId) -> String {
    let r = view.region(region);
    let owner = r.owner.map_or_else(|| "unclaimed".to_string(), |o| view.state.player(o).name.clone());
    let mut text = format!("{} {:<22} {:>5} pts  {}", r.id, r.name, r.point_value, owner);
    if let Some(c) = view.capital(region) {
        text.push_str(&format!("  [capital {}/{} HP]", c.current_hp, c.max_hp));
    }
    if r.is_fortified() {
        text.push_str("  [fortified]");
    }
    text
}

impl DecisionProvider for ConsoleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> PlayerKind {
        PlayerKind::Human
    }

    fn choose_region(
        &mut self,
        view: &MatchView,
        candidates: &[RegionId],
        purpose: &ChoicePurpose,
        time_budget_ms: u64,
    ) -> Option<(RegionId, u64)> {
        print_scores(view);
        match purpose {
            ChoicePurpose::Occupy => {
                println!("\n{}, claim a region:", self.name);
                for &r in candidates {
                    println!("  {}", describe(view, r));
                }
            }
            ChoicePurpose::TurnAction { attack, fortify } => {
                println!("\n{}, your turn.", self.name);
                if !attack.is_empty() {
                    println!(" Attack:");
                    for &r in attack {
                        println!("  {}", describe(view, r));
                    }
                }
                if !fortify.is_empty() {
                    println!(" Fortify:");
                    for &r in fortify {
                        println!("  {}", describe(view, r));
                    }
                }
            }
        }
        println!("  ({} s)", time_budget_ms / 1000);

        self.ask("Region number: ", time_budget_ms, |reply| {
            let id: u8 = reply.trim_start_matches(['R', 'r']).parse().ok()?;
            candidates.iter().copied().find(|c| c.0 == id)
        })
    }

    fn answer_multiple_choice(&mut self, _view: &MatchView, question: &Question, time_budget_ms: u64) -> Option<(String, u64)> {
        println!("\n[{}] {}", question.category, question.text);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}. {}", i + 1, option);
        }
        println!("  ({} s)", time_budget_ms / 1000);

        self.ask("Answer: ", time_budget_ms, |reply| {
            if let Ok(n) = reply.parse::<usize>() {
                return question.options.get(n.checked_sub(1)?).cloned();
            }
            question.options.iter().find(|o| o.eq_ignore_ascii_case(reply)).cloned()
        })
    }

    fn answer_open(
        &mut self,
        _view: &MatchView,
        question: &Question,
        purpose: QuestionPurpose,
        time_budget_ms: u64,
    ) -> Option<(f64, u64)> {
        let heading = match purpose {
            QuestionPurpose::Tiebreak => "Tiebreak! Closest answer wins",
            _ => "Closest answers claim regions",
        };
        println!("\n{}.\n[{}] {}  ({} s)", heading, question.category, question.text, time_budget_ms / 1000);

        self.ask("Your estimate: ", time_budget_ms, |reply| reply.replace(',', "").parse::<f64>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_engine::config::MatchConfig;
    use conquest_engine::setup::create_match;
    use conquest_engine::visibility::match_view;
    use std::io::{Cursor, Read};

    /// Input that stays silent for a while before closing.
    struct Silent(Duration);

    impl Read for Silent {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(self.0);
            Ok(0)
        }
    }

    fn state() -> MatchState {
        let seats = vec![PlayerSeat::human("You"), PlayerSeat::ai("Bot")];
        create_match(MatchConfig::default(), &seats, 1).unwrap()
    }

    #[test]
    fn test_region_choice_retries_until_a_candidate() {
        let state = state();
        let view = match_view(&state, PlayerId(1));
        let mut console = ConsoleProvider::with_input("You", Cursor::new("9\nR3\n"));
        let (region, elapsed) = console
            .choose_region(&view, &[RegionId(3), RegionId(5)], &ChoicePurpose::Occupy, 60_000)
            .unwrap();
        assert_eq!(region, RegionId(3));
        assert!(elapsed <= 60_000);
    }

    #[test]
    fn test_unanswered_region_choice_gives_up_at_the_budget() {
        let state = state();
        let view = match_view(&state, PlayerId(1));
        let mut console = ConsoleProvider::with_input("You", BufReader::new(Silent(Duration::from_secs(5))));
        let started = Instant::now();
        let choice = console.choose_region(&view, &[RegionId(3)], &ChoicePurpose::Occupy, 100);
        assert_eq!(choice, None);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_open_answer_accepts_thousands_separators() {
        let state = state();
        let view = match_view(&state, PlayerId(1));
        let question = Question::open_answer(1, "Height of Everest in metres?", "Geography", 8849.0);
        let mut console = ConsoleProvider::with_input("You", Cursor::new("8,800\n"));
        let (answer, _) = console.answer_open(&view, &question, QuestionPurpose::Occupation, 45_000).unwrap();
        assert_eq!(answer, 8800.0);
    }

    #[test]
    fn test_closed_input_is_no_answer() {
        let state = state();
        let view = match_view(&state, PlayerId(1));
        let question = Question::multiple_choice(2, "Capital of France?", "Geography", "Paris", &["Paris", "Rome"]);
        let mut console = ConsoleProvider::with_input("You", Cursor::new(""));
        assert_eq!(console.answer_multiple_choice(&view, &question, 30_000), None);
    }
}
