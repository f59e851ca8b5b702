//! The search: engine descriptor, iterative-deepening root driver, and
//! the alpha-beta tree underneath it.

pub mod control;
mod ordering;
pub mod pv;
mod pvs;
mod tt;

use std::time::{Duration, Instant};

use tracing::debug;

use peregrine_core::{Board, Move};

use crate::eval::Evaluator;
use control::{AbortFlag, Alarm};
use pv::PvLine;

/// Ceiling on search iterations and PV length, in plies.
pub const MAX_DEPTH: u32 = 120;

/// Score sentinel treated as unreachable; the root searches the window
/// `(-INFINITY, INFINITY)`.
pub const INFINITY: i32 = i32::MAX;

/// Base of the mate score range: a side that is checkmated `n` plies
/// from the root scores `-MATE_SCORE + n`.
pub const MATE_SCORE: i32 = 32_000;

/// Score returned for drawn positions.
pub(crate) const DRAW_SCORE: i32 = 0;

/// The termination policy for one search call.
#[derive(Clone, Copy, Debug)]
pub struct Target {
    /// Iteration ceiling, clamped to [`MAX_DEPTH`].
    pub depth: u32,
    /// Stop once this many nodes have been visited.
    pub node_count: u64,
    /// Stop once the iteration score lands at or outside `(lo, hi)`.
    pub scores: (i32, i32),
    /// Soft wall-clock budget in seconds: no new iteration starts after
    /// it has elapsed. Zero disables the check.
    pub time: f64,
    /// Hard wall-clock budget in seconds: the running iteration is
    /// aborted when it expires. Zero arms no alarm.
    pub max_time: f64,
}

impl Default for Target {
    fn default() -> Target {
        Target {
            depth: MAX_DEPTH,
            node_count: u64::MAX,
            scores: (-INFINITY, INFINITY),
            time: 0.0,
            max_time: 0.0,
        }
    }
}

/// The engine descriptor: the single mutable object a search call
/// operates on.
///
/// Inputs are the board, the evaluator, the [`Target`], and the
/// `pondering` flag; outputs are read from `score`, `best_move`, `pv`,
/// `depth`, `seconds`, and `node_count` after
/// [`root_search`](Engine::root_search) returns.
pub struct Engine {
    /// The position being searched; mutated in place and restored by
    /// the time the search returns.
    pub board: Board,
    /// Static evaluation, with its tunable coefficients.
    pub eval: Evaluator,
    /// Termination policy for the next search call.
    pub target: Target,
    /// When pondering, wall-clock termination is disabled.
    pub pondering: bool,
    /// Depth of the current (completed or in-progress) iteration.
    pub depth: u32,
    /// Score of the current iteration, in millipawns for the mover.
    pub score: i32,
    /// Best root move found so far; null when none exists.
    pub best_move: Move,
    /// The principal variation backing `score`.
    pub pv: PvLine,
    /// Nodes visited in this search call.
    pub node_count: u64,
    /// Wall-clock seconds elapsed in this search call.
    pub seconds: f64,
    /// Ply counter value at the root, for mate-distance scores.
    pub(crate) root_ply: u32,
    /// The cooperative abort token shared with the alarm and the host.
    pub(crate) abort: AbortFlag,
}

impl Engine {
    /// Create an engine for the given position with default evaluation
    /// and an idle target.
    pub fn new(board: Board) -> Engine {
        let root_ply = board.ply_number();
        Engine {
            board,
            eval: Evaluator::new(),
            target: Target::default(),
            pondering: false,
            depth: 0,
            score: 0,
            best_move: Move::NULL,
            pv: PvLine::new(),
            node_count: 0,
            seconds: 0.0,
            root_ply,
            abort: AbortFlag::new(),
        }
    }

    /// A clone of the abort token, for external stop requests.
    ///
    /// Setting the returned flag makes the running search unwind to the
    /// root at the next scout node and return with the best move of the
    /// last completed iteration.
    pub fn abort_handle(&self) -> AbortFlag {
        self.abort.clone()
    }

    /// Iterative-deepening search of `self.board` under `self.target`.
    ///
    /// `on_iter` runs after every completed iteration and once more
    /// after an abort; returning `true` ends the search. The board is
    /// left exactly as it was on entry, even when the search is aborted
    /// mid-iteration.
    pub fn root_search(&mut self, mut on_iter: impl FnMut(&Engine) -> bool) {
        let start = Instant::now();
        self.node_count = 0;
        self.seconds = 0.0;
        self.depth = 0;
        self.score = 0;
        self.best_move = Move::NULL;
        self.pv.clear();
        self.root_ply = self.board.ply_number();
        self.abort.clear();

        let _alarm = if !self.pondering && self.target.max_time > 0.0 {
            Some(Alarm::arm(
                self.abort.clone(),
                Duration::from_secs_f64(self.target.max_time),
            ))
        } else {
            None
        };

        debug!(depth = self.target.depth, max_time = self.target.max_time, "search started");

        let max_depth = self.target.depth.min(MAX_DEPTH);
        let mut stop = false;
        for iteration in 0..=max_depth {
            if stop {
                break;
            }
            self.depth = iteration;
            match self.pv_search(iteration, -INFINITY, INFINITY, 0) {
                Ok(score) => {
                    self.score = score;
                    self.seconds = start.elapsed().as_secs_f64();
                    if !self.pv.is_empty() {
                        self.best_move = self.pv[0];
                    }
                    stop = on_iter(self) || self.target_reached();
                }
                Err(_aborted) => {
                    self.seconds = start.elapsed().as_secs_f64();
                    // A partial PV cannot be trusted; keep one move only
                    // when it corroborates the last completed iteration.
                    if !self.pv.is_empty() && self.pv[0] == self.best_move {
                        self.pv.truncate(1);
                    } else {
                        self.pv.clear();
                    }
                    let _ = on_iter(self);
                    break;
                }
            }
        }

        self.abort.clear();
        debug!(
            depth = self.depth,
            score = self.score,
            nodes = self.node_count,
            "search finished"
        );
    }

    /// Whether the target policy ends the search after this iteration.
    fn target_reached(&self) -> bool {
        if self.node_count >= self.target.node_count {
            return true;
        }
        let (lo, hi) = self.target.scores;
        if self.score <= lo || self.score >= hi {
            return true;
        }
        if !self.pondering && self.target.time > 0.0 && self.seconds >= self.target.time {
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{Engine, INFINITY, MATE_SCORE, Target};
    use peregrine_core::{Board, MoveList};
    use std::time::Instant;

    fn search_depth(fen: &str, depth: u32) -> Engine {
        let board: Board = fen.parse().unwrap();
        let mut engine = Engine::new(board);
        engine.target.depth = depth;
        engine.root_search(|_| false);
        engine
    }

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn mate_in_one() {
        let engine = search_depth("4k3/8/4K3/8/8/8/8/7R w - - 0 1", 2);
        assert_eq!(engine.score, MATE_SCORE - 1);
        assert_eq!(engine.best_move.to_uci(), "h1h8");
        assert!(engine.pv.len() >= 1);
        assert_eq!(engine.pv[0], engine.best_move);
    }

    #[test]
    fn stalemate_scores_zero() {
        let engine = search_depth("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 4);
        assert_eq!(engine.score, 0);
        assert!(engine.best_move.is_null());
        assert_eq!(engine.pv.len(), 0);
    }

    #[test]
    fn checkmated_root_scores_minus_mate() {
        let engine = search_depth("7k/6Q1/5K2/8/8/8/8/8 b - - 0 1", 3);
        assert_eq!(engine.score, -MATE_SCORE);
        assert!(engine.best_move.is_null());
        assert_eq!(engine.pv.len(), 0);
    }

    #[test]
    fn depth_zero_returns_static_eval() {
        let board: Board = STARTPOS.parse().unwrap();
        let mut engine = Engine::new(board);
        let expected = engine.eval.evaluate(&engine.board);
        engine.target.depth = 0;
        engine.root_search(|_| false);
        assert_eq!(engine.score, expected);
        assert_eq!(engine.depth, 0);
    }

    #[test]
    fn forced_recapture_found() {
        // The queen gives check; capturing it is clearly best.
        let engine = search_depth("4k3/8/8/8/4q3/3P4/8/4K3 w - - 0 1", 3);
        assert_eq!(engine.best_move.to_uci(), "d3e4");
        assert!(engine.node_count > 0);
    }

    #[test]
    fn board_conserved_by_search() {
        for fen in [STARTPOS, KIWIPETE] {
            let board: Board = fen.parse().unwrap();
            let reference = board.clone();
            let mut engine = Engine::new(board);
            engine.target.depth = 3;
            engine.root_search(|_| false);
            assert_eq!(engine.board, reference, "board changed for {fen}");
            assert_eq!(engine.board.hash(), reference.hash());
        }
    }

    #[test]
    fn fixed_depth_search_is_deterministic() {
        let a = search_depth(KIWIPETE, 3);
        let b = search_depth(KIWIPETE, 3);
        assert_eq!(a.score, b.score);
        assert_eq!(a.best_move, b.best_move);
        assert_eq!(a.node_count, b.node_count);
        assert_eq!(a.pv.as_slice(), b.pv.as_slice());
    }

    #[test]
    fn repeated_search_is_idempotent() {
        let board: Board = KIWIPETE.parse().unwrap();
        let mut engine = Engine::new(board);
        engine.target.depth = 3;
        engine.root_search(|_| false);
        let first = (engine.score, engine.best_move, engine.node_count);
        engine.root_search(|_| false);
        assert_eq!((engine.score, engine.best_move, engine.node_count), first);
    }

    #[test]
    fn pv_replays_as_legal_moves() {
        let engine = search_depth(KIWIPETE, 4);
        assert!(engine.pv.len() >= 1);
        assert_eq!(engine.pv[0], engine.best_move);

        let mut board: Board = KIWIPETE.parse().unwrap();
        for &mv in engine.pv.as_slice() {
            let mut list = MoveList::new();
            board.generate_moves(&mut list);
            assert!(
                list.iter().any(|&m| m == mv),
                "pv move {mv} not generated"
            );
            board.make_move(mv);
            assert!(board.was_legal_move(), "pv move {mv} is illegal");
        }
    }

    #[test]
    fn callback_runs_per_iteration_and_can_stop() {
        let board: Board = STARTPOS.parse().unwrap();
        let mut engine = Engine::new(board);
        engine.target.depth = 5;
        let mut depths = Vec::new();
        engine.root_search(|e| {
            depths.push(e.depth);
            e.depth >= 2
        });
        assert_eq!(depths, vec![0, 1, 2]);
        assert_eq!(engine.depth, 2);
    }

    #[test]
    fn node_ceiling_stops_iterating() {
        let board: Board = STARTPOS.parse().unwrap();
        let mut engine = Engine::new(board);
        engine.target.depth = 30;
        engine.target.node_count = 1;
        engine.root_search(|_| false);
        assert_eq!(engine.depth, 0);
    }

    #[test]
    fn score_window_stops_on_mate() {
        let board: Board = "4k3/8/4K3/8/8/8/8/7R w - - 0 1".parse().unwrap();
        let mut engine = Engine::new(board);
        engine.target.depth = 30;
        engine.target.scores = (-31_000, 31_000);
        engine.root_search(|_| false);
        assert!(engine.depth <= 2, "window should stop the search early");
        assert_eq!(engine.score, MATE_SCORE - 1);
    }

    #[test]
    fn soft_time_stops_between_iterations() {
        let board: Board = STARTPOS.parse().unwrap();
        let mut engine = Engine::new(board);
        engine.target.depth = 60;
        engine.target.time = 0.0001;
        let start = Instant::now();
        engine.root_search(|_| false);
        assert!(engine.depth < 60);
        assert!(start.elapsed().as_secs_f64() < 5.0);
    }

    #[test]
    fn hard_time_aborts_mid_iteration() {
        let board: Board = STARTPOS.parse().unwrap();
        let reference = board.clone();
        let mut engine = Engine::new(board);
        engine.target.depth = 20;
        engine.target.max_time = 0.05;
        let start = Instant::now();
        engine.root_search(|_| false);
        let elapsed = start.elapsed().as_secs_f64();

        assert!(elapsed < 2.0, "search ran for {elapsed}s");
        assert!(!engine.best_move.is_null());
        assert_eq!(engine.board, reference);
        assert_eq!(engine.board.hash(), reference.hash());
        // The preserved PV is at most the corroborated best move.
        assert!(engine.pv.len() <= 1);
        if engine.pv.len() == 1 {
            assert_eq!(engine.pv[0], engine.best_move);
        }
    }

    #[test]
    fn external_stop_aborts_search() {
        use std::thread;
        use std::time::Duration;

        let board: Board = STARTPOS.parse().unwrap();
        let reference = board.clone();
        let mut engine = Engine::new(board);
        engine.target.depth = 64;

        let stop = engine.abort_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stop.set();
        });

        let start = Instant::now();
        engine.root_search(|_| false);
        stopper.join().unwrap();

        assert!(start.elapsed().as_secs_f64() < 5.0);
        assert_eq!(engine.board, reference);
    }

    #[test]
    fn pondering_ignores_time_targets() {
        let board: Board = STARTPOS.parse().unwrap();
        let mut engine = Engine::new(board);
        engine.pondering = true;
        engine.target.depth = 4;
        engine.target.time = 0.000001;
        engine.target.max_time = 0.000001;
        engine.root_search(|_| false);
        // With the clock disabled, the search runs to its depth target.
        assert_eq!(engine.depth, 4);
        assert!(!engine.best_move.is_null());
    }

    #[test]
    fn best_move_matches_pv_head_every_iteration() {
        let board: Board = KIWIPETE.parse().unwrap();
        let mut engine = Engine::new(board);
        engine.target.depth = 4;
        engine.root_search(|e| {
            if !e.pv.is_empty() {
                assert_eq!(e.pv[0], e.best_move);
            }
            false
        });
    }

    #[test]
    fn mate_score_encodes_distance() {
        let engine = search_depth("4k3/8/4K3/8/8/8/8/7R w - - 0 1", 4);
        let plies = MATE_SCORE - engine.score.abs();
        assert_eq!(plies, 1);
        assert!(engine.score.abs() >= MATE_SCORE - super::MAX_DEPTH as i32);
    }

    #[test]
    fn default_target_is_open() {
        let target = Target::default();
        assert_eq!(target.depth, super::MAX_DEPTH);
        assert_eq!(target.node_count, u64::MAX);
        assert_eq!(target.scores, (-INFINITY, INFINITY));
        assert_eq!(target.time, 0.0);
        assert_eq!(target.max_time, 0.0);
    }
}
