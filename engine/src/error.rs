// ═══════════════════════════════════════════════════════════════════════
// Error taxonomy
//
//   Illegal action : rejected before any mutation, surfaced to caller
//   State violation: broken invariant; a programming error, never recovered
//   I/O & snapshots: config and persistence plumbing
//
// Missing questions and decision timeouts are recovered locally by the
// engine (fallback question / fallback answer) and never reach this type.
// ═══════════════════════════════════════════════════════════════════════

use crate::invariants::InvariantViolation;
use crate::types::{Phase, PlayerId, RegionId};

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("player {player} cannot attack region {region}")]
    IllegalAttack { player: PlayerId, region: RegionId },

    #[error("player {player} cannot fortify region {region}")]
    IllegalFortify { player: PlayerId, region: RegionId },

    #[error("region {region} is not among the offered candidates")]
    NotACandidate { region: RegionId },

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("unknown region {0}")]
    UnknownRegion(RegionId),

    #[error("no decision is pending")]
    NoPendingDecision,

    #[error("action does not answer the pending decision: {0}")]
    UnexpectedAction(String),

    #[error("invalid match setup: {0}")]
    InvalidSetup(String),

    #[error("match is over (phase {0})")]
    MatchOver(Phase),

    #[error("invalid question {id}: {reason}")]
    InvalidQuestion { id: u32, reason: String },

    #[error("state invariants violated: {}", .0.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; "))]
    StateViolation(Vec<InvariantViolation>),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshotVersion { found: u32, expected: u32 },

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
