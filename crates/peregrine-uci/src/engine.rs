//! Event-driven UCI engine loop.
//!
//! The main thread owns the protocol state and the current board; a
//! reader thread feeds stdin lines into the event channel and searches
//! run on a worker thread that owns the engine descriptor for the
//! duration of the call. `stop` flips the search's abort token from
//! this side — the "external cancel" source of the search's abort
//! contract.

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::time::Duration;

use tracing::{debug, info, warn};

use peregrine_core::{Board, Color};
use peregrine_engine::search::control::Alarm;
use peregrine_engine::{AbortFlag, Engine, MATE_SCORE, MAX_DEPTH, Target, compute_limits};

use crate::command::{Command, GoParams, parse_command};
use crate::error::UciError;

/// Protocol state: idle, searching, or pondering.
enum EngineState {
    Idle,
    Searching,
    Pondering,
}

/// Events processed by the main engine loop.
enum EngineEvent {
    UciCommand(Result<Command, UciError>),
    SearchDone(Box<Engine>),
    InputClosed,
}

/// The UCI engine, holding the current board and protocol state.
pub struct UciEngine {
    board: Board,
    state: EngineState,
    /// Abort handle of the running search, if any.
    stop: AbortFlag,
    /// Hard budget to arm when a `ponderhit` arrives.
    ponder_budget: Option<f64>,
    /// Alarm armed at `ponderhit`, sharing the search's abort token.
    ponder_alarm: Option<Alarm>,
}

impl UciEngine {
    /// Create a new engine at the starting position.
    pub fn new() -> UciEngine {
        UciEngine {
            board: Board::starting_position(),
            state: EngineState::Idle,
            stop: AbortFlag::new(),
            ponder_budget: None,
            ponder_alarm: None,
        }
    }

    /// Run the UCI event loop, reading stdin until `quit` or EOF.
    pub fn run(mut self) -> Result<(), UciError> {
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        // Stdin reader thread.
        let stdin_tx = tx.clone();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        debug!(cmd = %trimmed, "received UCI command");
                        let cmd = parse_command(trimmed);
                        if stdin_tx.send(EngineEvent::UciCommand(cmd)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = stdin_tx.send(EngineEvent::InputClosed);
        });

        for event in &rx {
            match event {
                EngineEvent::UciCommand(Ok(cmd)) => match cmd {
                    Command::Uci => self.handle_uci(),
                    Command::IsReady => println!("readyok"),
                    Command::UciNewGame => self.board = Board::starting_position(),
                    Command::Position(board) => self.board = *board,
                    Command::Go(params) => self.handle_go(params, &tx),
                    Command::PonderHit => self.handle_ponderhit(),
                    Command::Stop => self.stop.set(),
                    Command::Quit => {
                        if !matches!(self.state, EngineState::Idle) {
                            self.stop.set();
                            for ev in &rx {
                                if let EngineEvent::SearchDone(engine) = ev {
                                    self.finish_search(&engine);
                                    break;
                                }
                            }
                        }
                        break;
                    }
                    Command::Unknown(_) => {}
                },
                EngineEvent::UciCommand(Err(e)) => {
                    warn!(error = %e, "UCI parse error");
                }
                EngineEvent::SearchDone(engine) => self.finish_search(&engine),
                EngineEvent::InputClosed => break,
            }
        }

        info!("peregrine shutting down");
        Ok(())
    }

    fn handle_uci(&self) {
        println!("id name peregrine");
        println!("id author peregrine developers");
        println!("option name Ponder type check default false");
        println!("uciok");
    }

    fn handle_go(&mut self, params: GoParams, tx: &mpsc::Sender<EngineEvent>) {
        if !matches!(self.state, EngineState::Idle) {
            warn!("go received while not idle, ignoring");
            return;
        }

        let target = search_target(&params, self.board.side_to_move());

        let mut engine = Engine::new(self.board.clone());
        engine.target = target;
        engine.pondering = params.ponder;
        self.stop = engine.abort_handle();
        self.ponder_budget = if target.max_time > 0.0 {
            Some(target.max_time)
        } else {
            None
        };

        let done_tx = tx.clone();
        std::thread::spawn(move || {
            engine.root_search(report_iteration);
            let _ = done_tx.send(EngineEvent::SearchDone(Box::new(engine)));
        });

        self.state = if params.ponder {
            EngineState::Pondering
        } else {
            EngineState::Searching
        };
    }

    fn handle_ponderhit(&mut self) {
        if !matches!(self.state, EngineState::Pondering) {
            warn!("ponderhit received while not pondering, ignoring");
            return;
        }
        // The search keeps running; from here on its wall clock counts.
        if let Some(budget) = self.ponder_budget {
            self.ponder_alarm = Some(Alarm::arm(
                self.stop.clone(),
                Duration::from_secs_f64(budget),
            ));
        }
        self.state = EngineState::Searching;
    }

    fn finish_search(&mut self, engine: &Engine) {
        self.ponder_alarm = None;
        self.state = EngineState::Idle;

        if engine.best_move.is_null() {
            println!("bestmove 0000");
        } else if engine.pv.len() >= 2 {
            println!(
                "bestmove {} ponder {}",
                engine.best_move.to_uci(),
                engine.pv[1].to_uci()
            );
        } else {
            println!("bestmove {}", engine.best_move.to_uci());
        }
    }
}

impl Default for UciEngine {
    fn default() -> UciEngine {
        UciEngine::new()
    }
}

/// Translate `go` parameters into a search [`Target`].
fn search_target(params: &GoParams, side: Color) -> Target {
    let mut target = Target::default();

    if let Some(depth) = params.depth {
        target.depth = depth.min(MAX_DEPTH);
    }
    if let Some(nodes) = params.nodes {
        target.node_count = nodes;
    }

    if params.infinite {
        return target;
    }

    if let Some(movetime) = params.movetime {
        target.time = movetime;
        target.max_time = movetime;
        return target;
    }

    let (remaining, increment) = match side {
        Color::White => (params.wtime, params.winc),
        Color::Black => (params.btime, params.binc),
    };
    if let Some(remaining) = remaining {
        let (soft, hard) =
            compute_limits(remaining, increment.unwrap_or(0.0), params.movestogo);
        target.time = soft;
        target.max_time = hard;
    }

    target
}

/// Print one `info` line per completed iteration. Never requests a stop.
fn report_iteration(engine: &Engine) -> bool {
    let millis = (engine.seconds * 1000.0) as u64;
    let nps = if engine.seconds > 0.0 {
        (engine.node_count as f64 / engine.seconds) as u64
    } else {
        0
    };
    let pv: Vec<String> = engine.pv.as_slice().iter().map(|m| m.to_uci()).collect();

    println!(
        "info depth {} score {} nodes {} nps {} time {} pv {}",
        engine.depth,
        score_string(engine.score),
        engine.node_count,
        nps,
        millis,
        pv.join(" ")
    );
    false
}

/// Format a millipawn score for UCI: centipawns, or a mate distance in
/// moves when the score is in the mate range.
fn score_string(score: i32) -> String {
    if score.abs() >= MATE_SCORE - MAX_DEPTH as i32 {
        let plies = MATE_SCORE - score.abs();
        let moves = (plies + 1) / 2;
        if score < 0 && moves > 0 {
            format!("mate -{moves}")
        } else {
            format!("mate {moves}")
        }
    } else {
        format!("cp {}", score / 10)
    }
}
