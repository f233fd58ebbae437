// ═══════════════════════════════════════════════════════════════════════
// Match configuration — tunable constants, JSON load/save
// ═══════════════════════════════════════════════════════════════════════

use crate::error::MatchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryMode {
    /// Only the selected categories are asked.
    Include,
    /// Every available category except the selected ones.
    Exclude,
}

/// Map generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub region_count: usize,
    pub min_regions: usize,
    pub max_regions: usize,
    pub canvas_height: f64,
    /// Canvas width / height.
    pub aspect_ratio: f64,
    pub border_margin: f64,
    /// Chance that a diagonal neighbour pair gets a shortcut edge.
    pub diagonal_probability: f64,
    /// Max positional jitter as a fraction of the cell size.
    pub jitter: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            region_count: 24,
            min_regions: 16,
            max_regions: 32,
            canvas_height: 720.0,
            aspect_ratio: 1280.0 / 720.0,
            border_margin: 50.0,
            diagonal_probability: 0.3,
            jitter: 0.05,
        }
    }
}

impl MapConfig {
    pub fn canvas_width(&self) -> f64 {
        self.canvas_height * self.aspect_ratio
    }

    pub fn clamp_count(&self, count: usize) -> usize {
        count.clamp(self.min_regions, self.max_regions)
    }
}

/// Wall-clock budgets per decision, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBudgets {
    pub multiple_choice_ms: u64,
    pub tiebreak_ms: u64,
    pub occupation_ms: u64,
    pub region_choice_ms: u64,
}

impl Default for TimeBudgets {
    fn default() -> Self {
        TimeBudgets {
            multiple_choice_ms: 30_000,
            tiebreak_ms: 30_000,
            occupation_ms: 45_000,
            region_choice_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub map: MapConfig,

    pub min_players: usize,
    pub max_players: usize,
    pub starting_score: u32,

    pub turns_per_player: u32,
    pub min_turns_per_player: u32,
    pub max_turns_per_player: u32,

    // Points
    pub capital_points: u32,
    pub initial_region_points: u32,
    pub captured_region_points: u32,
    pub defense_bonus: u32,

    // Capitals
    pub capital_max_hp: u8,
    pub capital_regeneration_turns: u32,
    /// Euclidean canvas distance kept between spawned capitals.
    pub min_capital_distance: f64,

    pub special_round_probability: f64,

    pub time_budgets: TimeBudgets,

    // Question categories
    pub available_categories: Vec<String>,
    pub selected_categories: Vec<String>,
    pub category_mode: CategoryMode,
}

impl Default for MatchConfig {
    fn default() -> Self {
        let categories: Vec<String> = [
            "General Knowledge",
            "Science",
            "History",
            "Geography",
            "Sports",
            "Entertainment",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        MatchConfig {
            map: MapConfig::default(),
            min_players: 2,
            max_players: 6,
            starting_score: 1000,
            turns_per_player: 10,
            min_turns_per_player: 5,
            max_turns_per_player: 20,
            capital_points: 1000,
            initial_region_points: 500,
            captured_region_points: 800,
            defense_bonus: 300,
            capital_max_hp: 3,
            capital_regeneration_turns: 3,
            min_capital_distance: 100.0,
            special_round_probability: 0.15,
            time_budgets: TimeBudgets::default(),
            selected_categories: categories.clone(),
            available_categories: categories,
            category_mode: CategoryMode::Include,
        }
    }
}

impl MatchConfig {
    /// Clamp every tunable into its legal range.
    pub fn sanitized(mut self) -> Self {
        if self.map.min_regions > self.map.max_regions {
            std::mem::swap(&mut self.map.min_regions, &mut self.map.max_regions);
        }
        self.map.region_count = self.map.clamp_count(self.map.region_count);
        if !(self.map.aspect_ratio.is_finite() && self.map.aspect_ratio > 0.0) {
            self.map.aspect_ratio = MapConfig::default().aspect_ratio;
        }
        self.map.diagonal_probability = self.map.diagonal_probability.clamp(0.0, 1.0);
        self.map.jitter = self.map.jitter.clamp(0.0, 0.5);

        self.min_players = self.min_players.max(2);
        self.max_players = self.max_players.max(self.min_players);
        self.turns_per_player = self.turns_per_player
            .clamp(self.min_turns_per_player.min(self.max_turns_per_player), self.max_turns_per_player.max(1));
        self.capital_max_hp = self.capital_max_hp.max(1);
        self.capital_regeneration_turns = self.capital_regeneration_turns.max(1);
        self.min_capital_distance = self.min_capital_distance.max(0.0);
        self.special_round_probability = self.special_round_probability.clamp(0.0, 1.0);
        self
    }

    /// Categories questions may be drawn from. Empty means "any".
    pub fn included_categories(&self) -> BTreeSet<String> {
        match self.category_mode {
            CategoryMode::Include => self.selected_categories.iter().cloned().collect(),
            CategoryMode::Exclude => self.available_categories.iter()
                .filter(|c| !self.selected_categories.contains(c))
                .cloned()
                .collect(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MatchError> {
        let text = std::fs::read_to_string(path)?;
        let config: MatchConfig = serde_json::from_str(&text)?;
        Ok(config.sanitized())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MatchError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_clamps_region_count_and_turns() {
        let mut config = MatchConfig::default();
        config.map.region_count = 99;
        config.turns_per_player = 1;
        let config = config.sanitized();
        assert_eq!(config.map.region_count, 32);
        assert_eq!(config.turns_per_player, 5);
    }

    #[test]
    fn exclude_mode_inverts_selection() {
        let mut config = MatchConfig::default();
        config.selected_categories = vec!["Sports".to_string()];
        config.category_mode = CategoryMode::Exclude;
        let included = config.included_categories();
        assert!(!included.contains("Sports"));
        assert!(included.contains("Science"));
        assert_eq!(included.len(), config.available_categories.len() - 1);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: MatchConfig = serde_json::from_str(r#"{ "turns_per_player": 7 }"#).unwrap();
        assert_eq!(config.turns_per_player, 7);
        assert_eq!(config.defense_bonus, 300);
        assert_eq!(config.map.region_count, 24);
    }

    #[test]
    fn save_and_load_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = MatchConfig::default();
        config.capital_max_hp = 4;
        config.save(&path).unwrap();
        let loaded = MatchConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
