//! UCI command parsing.

use peregrine_core::{Board, Move, MoveList};

use crate::error::UciError;

/// Parameters of a `go` command.
///
/// All times are in seconds (UCI sends milliseconds; parsing converts).
#[derive(Debug, Clone, Copy, Default)]
pub struct GoParams {
    /// `go depth N` -- iteration ceiling.
    pub depth: Option<u32>,
    /// `go movetime T` -- fixed budget for this move.
    pub movetime: Option<f64>,
    /// `go nodes N` -- node ceiling.
    pub nodes: Option<u64>,
    /// `go wtime T` -- White's remaining clock.
    pub wtime: Option<f64>,
    /// `go btime T` -- Black's remaining clock.
    pub btime: Option<f64>,
    /// `go winc T` -- White's increment.
    pub winc: Option<f64>,
    /// `go binc T` -- Black's increment.
    pub binc: Option<f64>,
    /// `go movestogo N` -- moves until the next time control.
    pub movestogo: Option<u32>,
    /// `go infinite` -- search until `stop`.
    pub infinite: bool,
    /// `go ponder` -- search on the opponent's time.
    pub ponder: bool,
}

/// A parsed UCI command.
#[derive(Debug)]
pub enum Command {
    /// `uci` -- identify the engine.
    Uci,
    /// `isready` -- synchronization ping.
    IsReady,
    /// `ucinewgame` -- reset engine state.
    UciNewGame,
    /// `position` -- set up a board with optional moves applied.
    Position(Box<Board>),
    /// `go` -- start searching.
    Go(GoParams),
    /// `stop` -- halt the current search.
    Stop,
    /// `ponderhit` -- the pondered move was played.
    PonderHit,
    /// `quit` -- exit the engine.
    Quit,
    /// Unrecognized command (silently ignored per UCI convention).
    Unknown(String),
}

/// Parse a single line of UCI input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Command::Unknown(String::new()));
    }

    match tokens[0] {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "stop" => Ok(Command::Stop),
        "ponderhit" => Ok(Command::PonderHit),
        "quit" => Ok(Command::Quit),
        "position" => parse_position(&tokens[1..]),
        "go" => parse_go(&tokens[1..]),
        _ => Ok(Command::Unknown(tokens[0].to_string())),
    }
}

/// Parse the `position` command arguments.
///
/// Supports:
/// - `position startpos [moves e2e4 d7d5 ...]`
/// - `position fen <fen-string> [moves e2e4 d7d5 ...]`
///
/// Moves are applied on the board, so the game history they build is
/// visible to repetition detection during the search.
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    if tokens.is_empty() {
        return Err(UciError::MalformedPosition);
    }

    let (mut board, rest) = if tokens[0] == "startpos" {
        (Board::starting_position(), &tokens[1..])
    } else if tokens[0] == "fen" {
        // A FEN is 6 space-separated fields.
        if tokens.len() < 7 {
            return Err(UciError::InvalidFen {
                fen: tokens[1..].join(" "),
            });
        }
        let fen = tokens[1..7].join(" ");
        let board: Board = fen
            .parse()
            .map_err(|_| UciError::InvalidFen { fen: fen.clone() })?;
        (board, &tokens[7..])
    } else {
        return Err(UciError::MalformedPosition);
    };

    if !rest.is_empty() && rest[0] == "moves" {
        let mut list = MoveList::new();
        for uci_str in &rest[1..] {
            let invalid = || UciError::InvalidMove {
                uci_move: uci_str.to_string(),
            };
            let mv = Move::from_uci(uci_str, &board).ok_or_else(invalid)?;
            // The move must be one the position actually allows.
            board.generate_moves(&mut list);
            if !list.iter().any(|&m| m == mv) {
                return Err(invalid());
            }
            board.make_move(mv);
            if !board.was_legal_move() {
                return Err(invalid());
            }
        }
    }

    Ok(Command::Position(Box::new(board)))
}

/// Parse the `go` command arguments.
fn parse_go(tokens: &[&str]) -> Result<Command, UciError> {
    let mut params = GoParams::default();

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "infinite" => {
                params.infinite = true;
                i += 1;
            }
            "ponder" => {
                params.ponder = true;
                i += 1;
            }
            "depth" => {
                params.depth = Some(parse_value(tokens, i, "depth")?);
                i += 2;
            }
            "nodes" => {
                params.nodes = Some(parse_value(tokens, i, "nodes")?);
                i += 2;
            }
            "movestogo" => {
                params.movestogo = Some(parse_value(tokens, i, "movestogo")?);
                i += 2;
            }
            "movetime" => {
                params.movetime = Some(parse_millis(tokens, i, "movetime")?);
                i += 2;
            }
            "wtime" => {
                params.wtime = Some(parse_millis(tokens, i, "wtime")?);
                i += 2;
            }
            "btime" => {
                params.btime = Some(parse_millis(tokens, i, "btime")?);
                i += 2;
            }
            "winc" => {
                params.winc = Some(parse_millis(tokens, i, "winc")?);
                i += 2;
            }
            "binc" => {
                params.binc = Some(parse_millis(tokens, i, "binc")?);
                i += 2;
            }
            // Unknown go subcommands are skipped.
            _ => i += 1,
        }
    }

    Ok(Command::Go(params))
}

/// Parse the integer value following `tokens[i]`.
fn parse_value<T: std::str::FromStr>(
    tokens: &[&str],
    i: usize,
    param: &str,
) -> Result<T, UciError> {
    let value = tokens.get(i + 1).ok_or_else(|| UciError::MissingGoValue {
        param: param.to_string(),
    })?;
    value.parse().map_err(|_| UciError::InvalidGoValue {
        param: param.to_string(),
        value: value.to_string(),
    })
}

/// Parse a millisecond value following `tokens[i]` into seconds.
fn parse_millis(tokens: &[&str], i: usize, param: &str) -> Result<f64, UciError> {
    let millis: u64 = parse_value(tokens, i, param)?;
    Ok(millis as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::{Command, parse_command};

    #[test]
    fn parse_simple_commands() {
        assert!(matches!(parse_command("uci").unwrap(), Command::Uci));
        assert!(matches!(parse_command("isready").unwrap(), Command::IsReady));
        assert!(matches!(
            parse_command("ucinewgame").unwrap(),
            Command::UciNewGame
        ));
        assert!(matches!(parse_command("stop").unwrap(), Command::Stop));
        assert!(matches!(
            parse_command("ponderhit").unwrap(),
            Command::PonderHit
        ));
        assert!(matches!(parse_command("quit").unwrap(), Command::Quit));
    }

    #[test]
    fn parse_position_startpos() {
        let cmd = parse_command("position startpos").unwrap();
        assert!(matches!(cmd, Command::Position(_)));
    }

    #[test]
    fn parse_position_with_moves() {
        let cmd = parse_command("position startpos moves e2e4 e7e5 g1f3").unwrap();
        match cmd {
            Command::Position(board) => {
                assert_eq!(board.ply_number(), 3);
            }
            _ => panic!("expected Position"),
        }
    }

    #[test]
    fn parse_position_fen() {
        let cmd = parse_command(
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        )
        .unwrap();
        assert!(matches!(cmd, Command::Position(_)));
    }

    #[test]
    fn parse_position_rejects_illegal_move() {
        assert!(parse_command("position startpos moves e2e5").is_err());
        assert!(parse_command("position startpos moves xyzzy").is_err());
    }

    #[test]
    fn parse_position_missing_keyword() {
        assert!(parse_command("position").is_err());
        assert!(parse_command("position sideways").is_err());
    }

    #[test]
    fn parse_position_invalid_fen() {
        assert!(parse_command("position fen invalid").is_err());
    }

    #[test]
    fn parse_go_depth() {
        match parse_command("go depth 6").unwrap() {
            Command::Go(params) => assert_eq!(params.depth, Some(6)),
            _ => panic!("expected Go"),
        }
    }

    #[test]
    fn parse_go_movetime_in_seconds() {
        match parse_command("go movetime 2500").unwrap() {
            Command::Go(params) => assert_eq!(params.movetime, Some(2.5)),
            _ => panic!("expected Go"),
        }
    }

    #[test]
    fn parse_go_clock() {
        match parse_command("go wtime 300000 btime 300000 winc 2000 binc 2000 movestogo 40")
            .unwrap()
        {
            Command::Go(params) => {
                assert_eq!(params.wtime, Some(300.0));
                assert_eq!(params.binc, Some(2.0));
                assert_eq!(params.movestogo, Some(40));
            }
            _ => panic!("expected Go"),
        }
    }

    #[test]
    fn parse_go_flags() {
        match parse_command("go infinite").unwrap() {
            Command::Go(params) => assert!(params.infinite),
            _ => panic!("expected Go"),
        }
        match parse_command("go ponder wtime 1000 btime 1000").unwrap() {
            Command::Go(params) => assert!(params.ponder),
            _ => panic!("expected Go"),
        }
    }

    #[test]
    fn parse_go_nodes() {
        match parse_command("go nodes 123456").unwrap() {
            Command::Go(params) => assert_eq!(params.nodes, Some(123_456)),
            _ => panic!("expected Go"),
        }
    }

    #[test]
    fn parse_go_bad_value() {
        assert!(parse_command("go depth plenty").is_err());
        assert!(parse_command("go movetime").is_err());
    }

    #[test]
    fn parse_unknown_command() {
        assert!(matches!(
            parse_command("xyzzy").unwrap(),
            Command::Unknown(_)
        ));
        assert!(matches!(parse_command("").unwrap(), Command::Unknown(_)));
    }
}
