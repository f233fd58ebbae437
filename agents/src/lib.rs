pub mod agent;
pub mod random;
pub mod heuristic;
pub mod scripted;

pub use agent::DecisionProvider;
pub use random::RandomProvider;
pub use heuristic::{Difficulty, HeuristicProvider};
pub use scripted::{RegionPolicy, ScriptedProvider};
