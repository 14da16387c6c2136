mod engine;

use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use bastion::{
    action::Menu,
    arena::Arena,
    bot,
    parallel,
    policy::{Exp3, Policy, Ucb},
    rules::{advance_state, status},
    search::Search,
    snapshot::Snapshot,
};
use clap::{Args, Parser, Subcommand};
use common::{
    pair::Pair,
    params::{PolicyKind, SearchParams},
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bastion", version, about = "Tower-defence decision engine")]
struct Cli {
    #[command(flatten)]
    search: SearchArgs,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Args)]
struct SearchArgs {
    /// Search worker threads
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// Wall-clock budget per decision
    #[arg(long, global = true)]
    budget_ms: Option<u64>,
    /// Edge selection rule (ucb or exp3)
    #[arg(long, global = true)]
    policy: Option<PolicyKind>,
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Rollouts are adjudicated at this turn
    #[arg(long, global = true)]
    max_turn: Option<u32>,
}

impl SearchArgs {
    fn params(&self) -> SearchParams {
        let mut params = SearchParams::default();
        if let Some(threads) = self.threads {
            params.threads = threads;
        }
        if let Some(ms) = self.budget_ms {
            params.budget = Duration::from_millis(ms);
        }
        if let Some(policy) = self.policy {
            params.policy = policy;
        }
        if let Some(max_turn) = self.max_turn {
            params.max_turn = max_turn;
        }
        params.seed = self.seed;
        params
    }
}

#[derive(Subcommand)]
enum Mode {
    /// Play one turn: read the state file, write the command file
    Bot {
        #[arg(long, default_value = "state.json")]
        state: PathBuf,
        #[arg(long, default_value = "command.txt")]
        command: PathBuf,
    },
    /// Search a state and report the root statistics
    Search {
        state: PathBuf,
        /// Number of actions to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Let the engine play both sides
    Showmatch {
        state: Option<PathBuf>,
        #[arg(long, default_value_t = 400)]
        turns: u32,
    },
    /// Measure single-worker rollout throughput
    Bench {
        state: Option<PathBuf>,
        #[arg(long, default_value_t = 20_000)]
        rollouts: u64,
    },
    /// Line protocol over stdin and stdout
    Engine,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let params = cli.search.params();

    match cli.mode {
        Mode::Bot { state, command } => {
            bot::respond(&state, &command, &params)?;
            Ok(())
        }
        Mode::Search { state, top } => search(&state, top, &params),
        Mode::Showmatch { state, turns } => showmatch(state.as_deref(), turns, &params),
        Mode::Bench { state, rollouts } => bench(state.as_deref(), rollouts, &params),
        Mode::Engine => Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start runtime")?
            .block_on(engine::run(params)),
    }
}

fn load(state: Option<&Path>, params: &SearchParams) -> Result<Snapshot> {
    let time = Instant::now();
    let snapshot = match state {
        Some(path) => {
            Snapshot::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Snapshot::start(params.max_turn),
    };
    println!(
        "loaded turn {} in {:.1}ms",
        snapshot.turn,
        time.elapsed().as_secs_f64() * 1000.,
    );
    Ok(snapshot)
}

fn search(state: &Path, top: usize, params: &SearchParams) -> Result<()> {
    let snapshot = load(Some(state), params)?;
    let board = &snapshot.board;
    let time = Instant::now();
    let decision = parallel::search(
        board,
        snapshot.turn,
        snapshot.max_turn.min(params.max_turn),
        params,
    )?;
    let secs = time.elapsed().as_secs_f64();

    let menu = Menu::new(&board.a);
    let mut ranked: Vec<_> = decision.stats.iter().enumerate().collect();
    ranked.sort_by(|(_, x), (_, y)| y.visits.cmp(&x.visits));

    for (i, stats) in ranked.into_iter().take(top) {
        println!(
            "{:>16}: {} visits, score {:.3}",
            menu.decode(i as u16).to_string(),
            stats.visits,
            stats.score,
        );
    }
    println!(
        "bestmove {} after {} rollouts in {secs:.2}s ({:.1} Krps)",
        decision.action,
        decision.rollouts,
        decision.rollouts as f64 / secs / 1000.,
    );
    Ok(())
}

fn showmatch(state: Option<&Path>, turns: u32, params: &SearchParams) -> Result<()> {
    let Snapshot {
        mut board,
        mut turn,
        max_turn,
    } = load(state, params)?;
    let max_turn = max_turn.min(params.max_turn);

    for _ in 0..turns {
        if status(&board, turn, max_turn).is_terminal() {
            break;
        }

        // Each half is stored in its owner's frame, so swapping the pair hands B the view A has.
        let a = bot::decide(&Snapshot { board, turn, max_turn }, params)?;
        let b = bot::decide(
            &Snapshot {
                board: board.swap(),
                turn,
                max_turn,
            },
            params,
        )?;

        advance_state(&mut board, Pair::new(a, b), turn);
        println!(
            "turn {turn}: {a} / {b} (health {} - {}, energy {} - {})",
            board.a.health, board.b.health, board.a.energy, board.b.energy,
        );
        turn += 1;
    }

    println!("game finished: {:?}", status(&board, turn, max_turn));
    Ok(())
}

fn bench(state: Option<&Path>, rollouts: u64, params: &SearchParams) -> Result<()> {
    let snapshot = load(state, params)?;
    match params.policy {
        PolicyKind::Ucb => bench_with(
            &snapshot,
            rollouts,
            params,
            Ucb {
                exploration: params.exploration,
            },
        ),
        PolicyKind::Exp3 => bench_with(
            &snapshot,
            rollouts,
            params,
            Exp3 {
                gamma: params.gamma,
            },
        ),
    }
    Ok(())
}

fn bench_with<P: Policy>(snapshot: &Snapshot, rollouts: u64, params: &SearchParams, policy: P) {
    let rng = ChaCha8Rng::seed_from_u64(params.seed.unwrap_or(0));
    let arena = Arena::with_bytes(params.bank_bytes, params.banks);
    let mut search = Search::new(
        snapshot.board,
        snapshot.turn,
        snapshot.max_turn.min(params.max_turn),
        policy,
        arena,
        rng,
    );

    let time = Instant::now();
    search.run_for(rollouts);
    let secs = time.elapsed().as_secs_f64();

    println!(
        "{} rollouts in {secs:.2}s ({:.1} Krps, {} root actions)",
        search.rollouts(),
        search.rollouts() as f64 / secs / 1000.,
        search.root_choices(),
    );
}
