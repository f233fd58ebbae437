// ═══════════════════════════════════════════════════════════════════════
// Match view — what a decision provider gets to look at
//
// Everything on the board is public: owners, values, capitals and HP,
// scores, fortifications. The view also carries the question being
// asked, correct answer included; simulated opponents use it to model
// their accuracy, while a human-facing provider must not display it.
//
// Selection state (which regions are highlighted) is not match data.
// The view exposes the legal candidate set and the UI does the rest.
// ═══════════════════════════════════════════════════════════════════════

use crate::engine::current_question;
use crate::trivia::Question;
use crate::types::*;

/// Read-only view of the match for one player.
#[derive(Debug, Clone)]
pub struct MatchView<'a> {
    pub viewer: PlayerId,
    pub state: &'a MatchState,
    /// The pending decision, only when it belongs to the viewer.
    pub pending: Option<&'a PendingDecision>,
    pub question: Option<&'a Question>,
}

impl<'a> MatchView<'a> {
    pub fn me(&self) -> &'a Player {
        self.state.player(self.viewer)
    }

    pub fn region(&self, id: RegionId) -> &'a Region {
        self.state.region(id)
    }

    pub fn capital(&self, region: RegionId) -> Option<&'a Capital> {
        self.state.capitals.get(&region)
    }

    pub fn is_special_round(&self) -> bool {
        self.state.is_special_round
    }

    /// Opponents still in the match.
    pub fn opponents(&self) -> impl Iterator<Item = &'a Player> + '_ {
        self.state.players.values().filter(move |p| p.alive && p.id != self.viewer)
    }

    /// Number of the viewer's regions adjacent to `region`.
    pub fn friendly_neighbours(&self, region: RegionId) -> usize {
        self.region(region).adjacent.iter()
            .filter(|a| self.state.regions.get(a).is_some_and(|r| r.owner == Some(self.viewer)))
            .count()
    }

    /// Number of enemy-owned regions adjacent to `region`.
    pub fn hostile_neighbours(&self, region: RegionId) -> usize {
        self.region(region).adjacent.iter()
            .filter(|a| {
                self.state.regions.get(a)
                    .and_then(|r| r.owner)
                    .is_some_and(|o| o != self.viewer)
            })
            .count()
    }
}

/// Build the view for `viewer`.
pub fn match_view(state: &MatchState, viewer: PlayerId) -> MatchView<'_> {
    let pending = state.pending.as_ref().filter(|p| p.player() == viewer);
    MatchView {
        viewer,
        state,
        pending,
        question: current_question(state),
    }
}
