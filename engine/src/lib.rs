pub mod types;
pub mod config;
pub mod error;
pub mod trivia;
pub mod map;
pub mod navigation;
pub mod rules;
pub mod combat;
pub mod invariants;
pub mod setup;
pub mod engine;
pub mod visibility;
pub mod snapshot;


pub use types::*;
pub use config::{CategoryMode, MapConfig, MatchConfig, TimeBudgets};
pub use error::MatchError;
pub use engine::{advance, apply_action, fallback_action, Action};
pub use trivia::{Question, QuestionBank, QuestionKind, QuestionProvider};
