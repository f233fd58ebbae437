// ═══════════════════════════════════════════════════════════════════════
// Runner — CLI entry point for matches, tournaments and map previews
// ═══════════════════════════════════════════════════════════════════════

mod console;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use conquest_agents::{DecisionProvider, Difficulty, HeuristicProvider, RandomProvider};
use conquest_engine::config::MatchConfig;
use conquest_engine::map;
use conquest_engine::navigation;
use conquest_engine::setup::create_match;
use conquest_engine::snapshot;
use conquest_engine::trivia::QuestionBank;
use conquest_engine::types::*;
use conquest_tournament::{drive, run_tournament, Database, MatchResult};
use console::ConsoleProvider;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_DECISIONS: usize = 50_000;

#[derive(Parser)]
#[command(name = "conquest", about = "Trivia conquest match engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match
    Play {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, default_value_t = 3)]
        players: usize,
        /// Agent type: "random", "heuristic" or "mixed"
        #[arg(short, long, default_value = "heuristic")]
        agent: String,
        /// easy, medium or hard
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,
        /// Take seat 1 yourself
        #[arg(long)]
        human: bool,
        /// Match config JSON
        #[arg(long)]
        config: Option<PathBuf>,
        /// Question bank JSON (defaults to the built-in sample)
        #[arg(long)]
        questions: Option<PathBuf>,
        /// Snapshot the match here after every decision
        #[arg(long)]
        save: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Continue a match from a snapshot
    Resume {
        snapshot: PathBuf,
        #[arg(short, long, default_value = "heuristic")]
        agent: String,
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,
        #[arg(long)]
        human: bool,
        #[arg(long)]
        questions: Option<PathBuf>,
        /// Keep snapshotting to the same file
        #[arg(long)]
        autosave: bool,
    },
    /// Run a tournament of N matches in parallel
    Tournament {
        #[arg(short, long, default_value_t = 100)]
        games: u64,
        #[arg(short, long, default_value_t = 4)]
        players: usize,
        #[arg(long, default_value = "results.db")]
        db: PathBuf,
        /// Agent type: "random", "heuristic" or "mixed"
        #[arg(short, long, default_value = "mixed")]
        agent: String,
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// ELO K factor
        #[arg(short, long, default_value_t = 32.0)]
        k: f64,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        questions: Option<PathBuf>,
    },
    /// Show leaderboard from database
    Leaderboard {
        #[arg(long, default_value = "results.db")]
        db: PathBuf,
        /// Also list the N best single-match scores
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Generate and print a map
    Map {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, default_value_t = 24)]
        regions: usize,
        /// Print the shortest path between two region ids
        #[arg(long, num_args = 2)]
        path: Option<Vec<u8>>,
    },
    /// Write the default config and the sample question bank
    Init {
        #[arg(long, default_value = "conquest.json")]
        config: PathBuf,
        #[arg(long, default_value = "questions.json")]
        questions: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { seed, players, agent, difficulty, human, config, questions, save, json } => {
            cmd_play(seed, players, &agent, difficulty, human, config, questions, save, json)
        }
        Commands::Resume { snapshot, agent, difficulty, human, questions, autosave } => {
            cmd_resume(snapshot, &agent, difficulty, human, questions, autosave)
        }
        Commands::Tournament { games, players, db, agent, difficulty, seed, k, config, questions } => {
            cmd_tournament(games, players, db, &agent, difficulty, seed, k, config, questions)
        }
        Commands::Leaderboard { db, top } => cmd_leaderboard(db, top),
        Commands::Map { seed, regions, path } => cmd_map(seed, regions, path),
        Commands::Init { config, questions } => cmd_init(config, questions),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<MatchConfig> {
    match path {
        Some(p) => MatchConfig::load(&p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(MatchConfig::default()),
    }
}

fn load_questions(path: Option<PathBuf>) -> Result<QuestionBank> {
    let bank = match path {
        Some(p) => QuestionBank::load(&p).with_context(|| format!("loading questions {}", p.display()))?,
        None => QuestionBank::sample()?,
    };
    info!(questions = bank.len(), categories = bank.categories().len(), "question bank ready");
    Ok(bank)
}

fn make_providers(seed: u64, players: usize, agent: &str, difficulty: Difficulty, human: bool) -> Result<Vec<Box<dyn DecisionProvider>>> {
    let mut providers: Vec<Box<dyn DecisionProvider>> = Vec::with_capacity(players);
    for i in 0..players {
        let provider_seed = seed.wrapping_add(i as u64 * 7919);
        let provider: Box<dyn DecisionProvider> = match (agent, i) {
            _ if human && i == 0 => Box::new(ConsoleProvider::new("You")),
            ("random", _) => Box::new(RandomProvider::new(provider_seed)),
            ("heuristic", _) => Box::new(HeuristicProvider::new(difficulty, provider_seed)),
            ("mixed", i) if i % 2 == 0 => Box::new(HeuristicProvider::new(difficulty, provider_seed)),
            ("mixed", _) => Box::new(RandomProvider::new(provider_seed)),
            (other, _) => bail!("unknown agent type '{}' (random, heuristic, mixed)", other),
        };
        providers.push(provider);
    }
    Ok(providers)
}

fn print_result(state: &MatchState, result: &MatchResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    println!("\nMatch finished after {} turns, {} battles.", result.turns_played, result.battles);
    match result.winner {
        Some(w) => println!("  Winner: {} ({})", state.player(w).name, result.winner_provider().unwrap_or("?")),
        None => println!("  No winner."),
    }
    println!("\n  Final standings:");
    for pr in &result.standings {
        let s = &pr.standing;
        let status = if s.alive { "" } else { "  eliminated" };
        println!("    {}. {:<20} {:>6} pts  {:>2} regions{}", s.rank, pr.provider, s.score, s.regions, status);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_play(
    seed: u64,
    players: usize,
    agent: &str,
    difficulty: Difficulty,
    human: bool,
    config: Option<PathBuf>,
    questions: Option<PathBuf>,
    save: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let mut bank = load_questions(questions)?;
    let mut providers = make_providers(seed, players, agent, difficulty, human)?;

    let seats: Vec<PlayerSeat> = providers.iter()
        .map(|p| PlayerSeat { name: p.name().to_string(), kind: p.kind() })
        .collect();
    let mut state = create_match(config, &seats, seed)?;
    info!(seed, players, agent, %difficulty, "starting match");

    let result = drive(&mut state, &mut providers, &mut bank, MAX_DECISIONS, |s| autosave(s, save.as_ref()))?;
    print_result(&state, &result, json)
}

fn autosave(state: &MatchState, path: Option<&PathBuf>) {
    if let Some(path) = path {
        if let Err(e) = snapshot::save(state, path) {
            warn!(path = %path.display(), error = %e, "snapshot failed");
        }
    }
}

fn cmd_resume(path: PathBuf, agent: &str, difficulty: Difficulty, human: bool, questions: Option<PathBuf>, autosave_on: bool) -> Result<()> {
    let mut state = snapshot::load(&path).with_context(|| format!("loading snapshot {}", path.display()))?;
    if state.is_over() {
        bail!("match in {} is already over", path.display());
    }
    let mut bank = load_questions(questions)?;
    let mut providers = make_providers(state.seed, state.players.len(), agent, difficulty, human)?;
    info!(phase = ?state.phase, turn = state.current_turn, "resuming match");

    let save = autosave_on.then_some(path);
    let result = drive(&mut state, &mut providers, &mut bank, MAX_DECISIONS, |s| autosave(s, save.as_ref()))?;
    print_result(&state, &result, false)
}

#[allow(clippy::too_many_arguments)]
fn cmd_tournament(
    games: u64,
    players: usize,
    db_path: PathBuf,
    agent: &str,
    difficulty: Difficulty,
    seed: u64,
    k: f64,
    config: Option<PathBuf>,
    questions: Option<PathBuf>,
) -> Result<()> {
    println!("=== Tournament: {} matches, {} players, agent={} ({}) ===\n", games, players, agent, difficulty);

    let config = load_config(config)?;
    let bank = load_questions(questions)?;
    // Validate the lineup once up front; the parallel factory below can't fail.
    make_providers(seed, players, agent, difficulty, false)?;

    let seeds: Vec<u64> = (0..games).map(|g| seed.wrapping_add(g * 1000)).collect();
    let lineup = |s: u64| make_providers(s, players, agent, difficulty, false).unwrap_or_default();
    let results = run_tournament(lineup, &config, &seeds, &bank, MAX_DECISIONS);

    let db = Database::new(&db_path).with_context(|| format!("opening {}", db_path.display()))?;
    let mut wins: BTreeMap<String, u32> = BTreeMap::new();
    let mut errors = 0u32;
    for (seed, outcome) in &results {
        match outcome {
            Ok(result) => {
                if let Some(name) = result.winner_provider() {
                    *wins.entry(name.to_string()).or_insert(0) += 1;
                }
                db.record_match(result, k)?;
            }
            Err(e) => {
                errors += 1;
                eprintln!("Match seed {}: ERROR -- {}", seed, e);
            }
        }
    }

    println!("--- Summary ({} matches, {} errors) ---", games, errors);
    for (name, w) in &wins {
        let pct = if games > 0 { *w as f64 / games as f64 * 100.0 } else { 0.0 };
        println!("  {:<20}: {:>4} wins ({:.1}%)", name, w, pct);
    }
    println!("\nResults saved to: {}", db_path.display());
    println!("Total matches in DB: {}", db.match_count()?);
    Ok(())
}

fn cmd_leaderboard(db_path: PathBuf, top: usize) -> Result<()> {
    let db = Database::new(&db_path)?;
    let board = db.leaderboard()?;
    if board.is_empty() {
        println!("No agents found. Run some tournaments first.");
        return Ok(());
    }
    println!("=== Leaderboard ===\n");
    println!("{:<20} {:>8} {:>8} {:>8}", "Agent", "ELO", "Games", "Wins");
    println!("{}", "-".repeat(48));
    for e in &board {
        println!("{:<20} {:>8.1} {:>8} {:>8}", e.name, e.elo, e.games, e.wins);
    }

    if top > 0 {
        println!("\n=== Top {} scores ===\n", top);
        for (i, s) in db.top_scores(top)?.iter().enumerate() {
            println!("{:>3}. {:<20} {:>7}  (seed {})", i + 1, s.name, s.score, s.seed);
        }
    }
    Ok(())
}

fn cmd_map(seed: u64, regions: usize, path: Option<Vec<u8>>) -> Result<()> {
    let config = MatchConfig::default();
    let generated = map::generate(&config.map, regions, &mut ChaCha8Rng::seed_from_u64(seed));
    println!(
        "{} regions on a {}x{} grid ({} bridge edges added)\n",
        generated.regions.len(), generated.grid_width, generated.grid_height, generated.repair_edges
    );
    for r in generated.regions.values() {
        let adjacent: Vec<String> = r.adjacent.iter().map(|a| a.to_string()).collect();
        println!("{:>4} {:<24} ({:>6.1}, {:>6.1})  -> {}", r.id.to_string(), r.name, r.position.x, r.position.y, adjacent.join(" "));
    }
    if !navigation::is_connected(&generated.regions) {
        warn!(components = navigation::components(&generated.regions).len(), "map is not connected");
    }

    if let Some([from, to]) = path.as_deref() {
        let (from, to) = (RegionId(*from), RegionId(*to));
        match navigation::shortest_path(&generated.regions, from, to) {
            Some(route) => {
                let hops: Vec<String> = route.iter().map(|r| r.to_string()).collect();
                println!("\n{} -> {}: {} ({} steps)", from, to, hops.join(" -> "), route.len().saturating_sub(1));
            }
            None => println!("\nNo path from {} to {}", from, to),
        }
    }
    Ok(())
}

fn cmd_init(config: PathBuf, questions: PathBuf) -> Result<()> {
    MatchConfig::default().save(&config)?;
    QuestionBank::sample()?.save(&questions)?;
    println!("Wrote {} and {}", config.display(), questions.display());
    Ok(())
}
