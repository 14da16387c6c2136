//! Root-parallel search: independent trees on worker threads, merged at the root.

use std::{
    panic,
    sync::{
        atomic::{AtomicBool, Ordering::Relaxed},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use common::params::{PolicyKind, SearchParams};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::{
    action::{decode, legal_action_count, Action},
    arena::Arena,
    error::SearchError,
    policy::{Exp3, Policy, Ucb},
    search::{ActionStats, Search},
    state::Board,
};

/// Raised once by the master when the time budget runs out.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn set(&self) {
        self.0.store(true, Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    /// Merged statistics per root action of player A.
    pub stats: Vec<ActionStats>,
    pub rollouts: u64,
}

pub fn search(
    board: &Board,
    turn: u32,
    max_turn: u32,
    params: &SearchParams,
) -> Result<Decision, SearchError> {
    match params.policy {
        PolicyKind::Ucb => run(
            board,
            turn,
            max_turn,
            params,
            Ucb {
                exploration: params.exploration,
            },
        ),
        PolicyKind::Exp3 => run(
            board,
            turn,
            max_turn,
            params,
            Exp3 {
                gamma: params.gamma,
            },
        ),
    }
}

/// Index of the highest-ranked root action, the lowest index among equals.
pub fn best_index<P: Policy>(policy: &P, stats: &[ActionStats]) -> u16 {
    let mut best = 0;
    let mut best_rank = f64::NEG_INFINITY;
    for (i, s) in stats.iter().enumerate() {
        let rank = policy.rank(s);
        if rank > best_rank {
            best_rank = rank;
            best = i;
        }
    }
    best as u16
}

fn run<P: Policy>(
    board: &Board,
    turn: u32,
    max_turn: u32,
    params: &SearchParams,
    policy: P,
) -> Result<Decision, SearchError> {
    if params.threads == 0 {
        return Err(SearchError::NoThreads);
    }

    let start = Instant::now();
    let stop = StopFlag::default();
    let seed = params.seed.unwrap_or_else(rand::random);

    let (board, bank_bytes, banks) = (*board, params.bank_bytes, params.banks);
    let spawn = |index: usize| -> Result<JoinHandle<(Vec<ActionStats>, u64)>, SearchError> {
        let stop = stop.clone();
        let handle = thread::Builder::new()
            .name(format!("search-{index}"))
            .spawn(move || {
                let arena = Arena::with_bytes(bank_bytes, banks);
                let rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(index as u64));
                let mut search = Search::new(board, turn, max_turn, policy, arena, rng);
                search.run(&stop);

                debug!(
                    worker = index,
                    rollouts = search.rollouts(),
                    nodes = search.nodes(),
                    "worker stopped"
                );
                (search.root_stats(), search.rollouts())
            })?;
        Ok(handle)
    };

    let mut workers = Vec::with_capacity(params.threads);
    for i in 0..params.threads {
        match spawn(i) {
            Ok(worker) => workers.push(worker),
            Err(e) => {
                stop.set();
                for worker in workers {
                    let _ = worker.join();
                }
                return Err(e);
            }
        }
    }

    thread::sleep(params.budget);
    stop.set();

    let mut stats: Vec<ActionStats> = Vec::new();
    let mut rollouts = 0;
    for worker in workers {
        let (worker_stats, worker_rollouts) =
            worker.join().unwrap_or_else(|e| panic::resume_unwind(e));

        if stats.is_empty() {
            stats = worker_stats;
        } else {
            for (total, s) in stats.iter_mut().zip(worker_stats) {
                *total += s;
            }
        }
        rollouts += worker_rollouts;
    }

    let best = best_index(&policy, &stats);
    let action = decode(best, &board.a, legal_action_count(&board.a));

    info!(
        %action,
        rollouts,
        threads = params.threads,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search finished"
    );

    Ok(Decision {
        action,
        stats,
        rollouts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::time::Duration;

    fn params(threads: usize) -> SearchParams {
        SearchParams {
            threads,
            budget: Duration::from_millis(60),
            bank_bytes: 16 << 20,
            banks: 4,
            seed: Some(17),
            ..SearchParams::default()
        }
    }

    #[test]
    fn stop_flag_is_shared() {
        let flag = StopFlag::default();
        let other = flag.clone();
        assert!(!other.is_set());
        flag.set();
        assert!(other.is_set());
    }

    #[test]
    fn merges_worker_statistics() {
        let board = Board::default();
        for policy in [PolicyKind::Ucb, PolicyKind::Exp3] {
            let params = SearchParams {
                policy,
                ..params(3)
            };
            let decision = search(&board, 0, 20, &params).unwrap();

            assert!(decision.rollouts > 0);
            assert_eq!(decision.stats.len(), 65);
            let visits: u64 = decision.stats.iter().map(|s| s.visits).sum();
            assert_eq!(visits, decision.rollouts);
        }
    }

    #[test]
    fn lone_action_wins() {
        let mut board = Board::default();
        board.a.energy = 5;
        let decision = search(&board, 0, 20, &params(2)).unwrap();
        assert_eq!(decision.action, Action::None);
        assert_eq!(decision.stats.len(), 1);
    }

    #[test]
    fn no_threads_is_an_error() {
        let board = Board::default();
        assert!(matches!(
            search(&board, 0, 20, &params(0)),
            Err(SearchError::NoThreads)
        ));
    }

    #[test]
    fn ties_go_to_the_first_action() {
        let ucb = Ucb { exploration: 1. };
        let stats = [
            ActionStats {
                visits: 4,
                score: 1.,
            },
            ActionStats {
                visits: 2,
                score: 1.,
            },
            ActionStats {
                visits: 4,
                score: 2.,
            },
        ];
        assert_eq!(best_index(&ucb, &stats), 1);
        assert_eq!(best_index(&Exp3 { gamma: 0.1 }, &stats), 2);
        assert_eq!(best_index(&ucb, &[ActionStats::default(); 3]), 0);
    }
}
