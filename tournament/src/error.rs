use conquest_engine::error::MatchError;
use conquest_engine::types::{Phase, PlayerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TournamentError {
    #[error(transparent)]
    Engine(#[from] MatchError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("no provider bound to {0}")]
    MissingProvider(PlayerId),

    #[error("match exceeded {limit} decisions without finishing (turn {turn})")]
    DecisionLimit { limit: usize, turn: u32 },

    #[error("match stuck in {0:?} with no pending decision")]
    Stalled(Phase),
}
