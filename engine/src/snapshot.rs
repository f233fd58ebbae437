// ═══════════════════════════════════════════════════════════════════════
// Snapshots — versioned JSON of the full match state
// ═══════════════════════════════════════════════════════════════════════

use crate::engine;
use crate::error::MatchError;
use crate::types::MatchState;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume a match exactly where it stopped,
/// including an in-flight battle, a half-answered question and the RNG
/// position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub version: u32,
    pub state: MatchState,
}

impl MatchSnapshot {
    pub fn capture(state: &MatchState) -> Self {
        MatchSnapshot { version: SNAPSHOT_VERSION, state: state.clone() }
    }

    pub fn to_json(&self) -> Result<String, MatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, MatchError> {
        // Check the version before committing to the state layout.
        #[derive(Deserialize)]
        struct Header {
            version: u32,
        }
        let header: Header = serde_json::from_str(text)?;
        if header.version != SNAPSHOT_VERSION {
            return Err(MatchError::UnsupportedSnapshotVersion {
                found: header.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let snapshot: MatchSnapshot = serde_json::from_str(text)?;
        // Refuse to resume a state the engine could never have produced.
        engine::validate(&snapshot.state)?;
        Ok(snapshot)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MatchError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MatchError> {
        let text = std::fs::read_to_string(path)?;
        MatchSnapshot::from_json(&text)
    }
}

/// Save `state` to `path` at the current version.
pub fn save(state: &MatchState, path: impl AsRef<Path>) -> Result<(), MatchError> {
    MatchSnapshot::capture(state).save(path)
}

/// Load a state saved with [`save`].
pub fn load(path: impl AsRef<Path>) -> Result<MatchState, MatchError> {
    Ok(MatchSnapshot::load(path)?.state)
}
