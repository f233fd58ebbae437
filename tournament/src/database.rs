// ═══════════════════════════════════════════════════════════════════════
// Database — SQLite storage for match results and ELO ratings
// ═══════════════════════════════════════════════════════════════════════

use crate::runner::MatchResult;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Starting rating for newly registered providers.
pub const INITIAL_ELO: f64 = 1500.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub elo: f64,
    pub games: u32,
    pub wins: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
    pub seed: u64,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn new(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let db = Database { conn: Connection::open(path)? };
        db.create_schema()?;
        Ok(db)
    }

    /// In-memory database (useful for tests).
    pub fn in_memory() -> rusqlite::Result<Self> {
        let db = Database { conn: Connection::open_in_memory()? };
        db.create_schema()?;
        Ok(db)
    }

    fn create_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch("
            CREATE TABLE IF NOT EXISTS agents (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                elo         REAL NOT NULL DEFAULT 1500.0,
                games       INTEGER NOT NULL DEFAULT 0,
                wins        INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS matches (
                id          INTEGER PRIMARY KEY,
                seed        INTEGER NOT NULL,
                turns       INTEGER NOT NULL,
                battles     INTEGER NOT NULL,
                winner      TEXT,
                played_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS match_standings (
                id          INTEGER PRIMARY KEY,
                match_id    INTEGER NOT NULL REFERENCES matches(id),
                agent_id    INTEGER NOT NULL REFERENCES agents(id),
                player      INTEGER NOT NULL,
                rank        INTEGER NOT NULL,
                score       INTEGER NOT NULL,
                alive       INTEGER NOT NULL,
                regions     INTEGER NOT NULL
            );
        ")
    }

    /// Register a provider by name (or return the existing id).
    pub fn register_agent(&self, name: &str) -> rusqlite::Result<i64> {
        self.conn.execute("INSERT OR IGNORE INTO agents (name) VALUES (?1)", params![name])?;
        self.conn.query_row("SELECT id FROM agents WHERE name = ?1", params![name], |row| row.get(0))
    }

    /// Store a finished match: the match row, one standing per player and
    /// the games/wins counters, all or nothing. Returns the match id.
    pub fn store_match(&self, result: &MatchResult) -> rusqlite::Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let match_id = self.insert_match(result)?;
        tx.commit()?;
        Ok(match_id)
    }

    fn insert_match(&self, result: &MatchResult) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO matches (seed, turns, battles, winner) VALUES (?1, ?2, ?3, ?4)",
            params![result.seed as i64, result.turns_played, result.battles as i64, result.winner_provider()],
        )?;
        let match_id = self.conn.last_insert_rowid();

        for pr in &result.standings {
            let agent_id = self.register_agent(&pr.provider)?;
            let s = &pr.standing;
            self.conn.execute(
                "INSERT INTO match_standings (match_id, agent_id, player, rank, score, alive, regions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![match_id, agent_id, s.player.0, s.rank, s.score, s.alive, s.regions as i64],
            )?;

            let won = result.winner == Some(s.player);
            self.conn.execute(
                "UPDATE agents SET games = games + 1, wins = wins + ?1 WHERE id = ?2",
                params![won as i64, agent_id],
            )?;
        }
        Ok(match_id)
    }

    fn elo_of(&self, agent_id: i64) -> rusqlite::Result<f64> {
        let elo = self.conn
            .query_row("SELECT elo FROM agents WHERE id = ?1", params![agent_id], |row| row.get(0))
            .optional()?;
        Ok(elo.unwrap_or(INITIAL_ELO))
    }

    /// Update ELO ratings after a match.
    /// Simple multiplayer ELO: winner gains K points from each loser.
    pub fn update_elo(&self, winner_id: i64, loser_ids: &[i64], k: f64) -> rusqlite::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.apply_elo(winner_id, loser_ids, k)?;
        tx.commit()
    }

    fn apply_elo(&self, winner_id: i64, loser_ids: &[i64], k: f64) -> rusqlite::Result<()> {
        for &loser_id in loser_ids {
            if loser_id == winner_id {
                continue;
            }
            let winner_elo = self.elo_of(winner_id)?;
            let loser_elo = self.elo_of(loser_id)?;

            let expected_winner = 1.0 / (1.0 + 10f64.powf((loser_elo - winner_elo) / 400.0));
            let delta = k * (1.0 - expected_winner);

            self.conn.execute("UPDATE agents SET elo = elo + ?1 WHERE id = ?2", params![delta, winner_id])?;
            self.conn.execute("UPDATE agents SET elo = elo - ?1 WHERE id = ?2", params![delta, loser_id])?;
        }
        Ok(())
    }

    /// Store a match and apply its ELO changes in one transaction.
    pub fn record_match(&self, result: &MatchResult, k: f64) -> rusqlite::Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        let match_id = self.insert_match(result)?;
        if let Some(winner) = result.winner_provider() {
            let winner_id = self.register_agent(winner)?;
            let mut losers = Vec::new();
            for pr in result.standings.iter().filter(|pr| Some(pr.standing.player) != result.winner) {
                losers.push(self.register_agent(&pr.provider)?);
            }
            self.apply_elo(winner_id, &losers, k)?;
        }
        tx.commit()?;
        Ok(match_id)
    }

    /// ELO leaderboard, best first.
    pub fn leaderboard(&self) -> rusqlite::Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare("SELECT name, elo, games, wins FROM agents ORDER BY elo DESC, name")?;
        let rows = stmt.query_map([], |row| {
            Ok(LeaderboardEntry {
                name: row.get(0)?,
                elo: row.get(1)?,
                games: row.get(2)?,
                wins: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    /// Best individual final scores across all stored matches.
    pub fn top_scores(&self, limit: usize) -> rusqlite::Result<Vec<ScoreEntry>> {
        let mut stmt = self.conn.prepare("
            SELECT a.name, s.score, m.seed
            FROM match_standings s
            JOIN agents a ON a.id = s.agent_id
            JOIN matches m ON m.id = s.match_id
            ORDER BY s.score DESC, s.id
            LIMIT ?1
        ")?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(ScoreEntry {
                name: row.get(0)?,
                score: row.get(1)?,
                seed: row.get::<_, i64>(2)? as u64,
            })
        })?;
        rows.collect()
    }

    /// Total number of matches stored.
    pub fn match_count(&self) -> rusqlite::Result<u32> {
        self.conn.query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::PlayerResult;
    use conquest_engine::types::{PlayerId, Standing};

    fn result(seed: u64, scores: &[(&str, u32)], winner: u8) -> MatchResult {
        let standings = scores.iter()
            .enumerate()
            .map(|(i, (name, score))| PlayerResult {
                standing: Standing {
                    rank: i as u32 + 1,
                    player: PlayerId(i as u8 + 1),
                    name: name.to_string(),
                    score: *score,
                    alive: true,
                    regions: 4,
                },
                provider: name.to_string(),
            })
            .collect();
        MatchResult { seed, winner: Some(PlayerId(winner)), turns_played: 20, battles: 7, standings }
    }

    #[test]
    fn test_register_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let a = db.register_agent("Random").unwrap();
        let b = db.register_agent("Random").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, db.register_agent("Heuristic (Hard)").unwrap());
    }

    #[test]
    fn test_record_match_updates_counts_and_elo() {
        let db = Database::in_memory().unwrap();
        db.record_match(&result(1, &[("Hard", 4200), ("Easy", 1800), ("Random", 900)], 1), 32.0).unwrap();
        db.record_match(&result(2, &[("Hard", 3900), ("Random", 1200), ("Easy", 1000)], 1), 32.0).unwrap();

        assert_eq!(db.match_count().unwrap(), 2);
        let board = db.leaderboard().unwrap();
        assert_eq!(board[0].name, "Hard");
        assert_eq!((board[0].games, board[0].wins), (2, 2));
        assert!(board[0].elo > INITIAL_ELO);
        assert!(board.iter().skip(1).all(|e| e.elo < INITIAL_ELO && e.wins == 0));

        // ELO is zero-sum
        let total: f64 = board.iter().map(|e| e.elo).sum();
        assert!((total - 3.0 * INITIAL_ELO).abs() < 1e-6);
    }

    #[test]
    fn test_equal_ratings_trade_half_k() {
        let db = Database::in_memory().unwrap();
        let w = db.register_agent("W").unwrap();
        let l = db.register_agent("L").unwrap();
        db.update_elo(w, &[l], 32.0).unwrap();
        let board = db.leaderboard().unwrap();
        assert!((board[0].elo - 1516.0).abs() < 1e-9);
        assert!((board[1].elo - 1484.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_scores() {
        let db = Database::in_memory().unwrap();
        db.store_match(&result(10, &[("A", 5000), ("B", 100)], 1)).unwrap();
        db.store_match(&result(11, &[("B", 6000), ("A", 2000)], 1)).unwrap();

        let top = db.top_scores(2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], ScoreEntry { name: "B".into(), score: 6000, seed: 11 });
        assert_eq!(top[1], ScoreEntry { name: "A".into(), score: 5000, seed: 10 });
    }

    #[test]
    fn test_failed_store_leaves_nothing_behind() {
        let db = Database::in_memory().unwrap();
        db.record_match(&result(1, &[("A", 3000), ("B", 1000)], 1), 32.0).unwrap();
        let before = db.leaderboard().unwrap();

        // Standings can no longer be written; the match row must go too
        db.conn.execute_batch("DROP TABLE match_standings").unwrap();
        assert!(db.record_match(&result(2, &[("A", 3000), ("C", 1000)], 1), 32.0).is_err());
        assert!(db.store_match(&result(3, &[("B", 3000), ("A", 1000)], 1)).is_err());

        assert_eq!(db.match_count().unwrap(), 1);
        assert_eq!(db.leaderboard().unwrap(), before);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.db");
        {
            let db = Database::new(&path).unwrap();
            db.store_match(&result(3, &[("A", 10), ("B", 20)], 2)).unwrap();
        }
        let db = Database::new(&path).unwrap();
        assert_eq!(db.match_count().unwrap(), 1);
    }
}
