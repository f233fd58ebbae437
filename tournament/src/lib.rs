pub mod error;
pub mod runner;
pub mod database;

pub use error::TournamentError;
pub use runner::{drive, run_match, run_tournament, MatchResult, PlayerResult};
pub use database::Database;
