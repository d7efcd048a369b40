use std::{
    env,
    io::{self, BufRead, Write},
    process::ExitCode,
    thread::{self, JoinHandle},
};

use chess_core::{legal_moves, move_to_uci, parse_uci_move, Color, Move, MoveTables, Position};
use crossbeam_channel::Receiver;
use negascout_engine::{AiEvent, ChessAi, EngineConfig, EngineError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Writes one UCI line to stdout. Safe to call from the waiter threads.
fn send(line: &str) {
    let mut out = io::stdout().lock();
    writeln!(out, "{line}").ok();
    out.flush().ok();
}

struct Session {
    config: EngineConfig,
    tables: MoveTables,
    position: Position,
    engine: Option<ChessAi>,
    waiter: Option<JoinHandle<()>>,
}

impl Session {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            tables: MoveTables::generate(),
            position: Position::startpos(),
            engine: None,
            waiter: None,
        }
    }

    fn set_option(&mut self, parts: &[&str]) {
        // setoption name <Name> value <N>
        let name = parts.iter().position(|&x| x == "name").and_then(|i| parts.get(i + 1));
        let value = parts
            .iter()
            .position(|&x| x == "value")
            .and_then(|i| parts.get(i + 1))
            .and_then(|v| v.parse::<u32>().ok());
        match (name, value) {
            (Some(&"Depth"), Some(depth)) => self.config.max_ply = depth.clamp(1, 8),
            (Some(&"Threads"), Some(threads)) => self.config.threads = Some(threads.clamp(1, 256) as usize),
            _ => {
                warn!(?parts, "ignoring unsupported option");
                return;
            }
        }
        // Engines pick up configuration at construction.
        self.reset_engine();
    }

    fn reset_engine(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.stop();
        }
        if let Some(waiter) = self.waiter.take() {
            let _ = waiter.join();
        }
    }

    fn go(&mut self) {
        if legal_moves(&self.position, &self.tables).is_empty() {
            send("bestmove 0000");
            return;
        }
        match self.start_search() {
            Ok(events) => self.waiter = Some(thread::spawn(move || await_decision(events))),
            Err(EngineError::SearchInProgress) => warn!("go ignored: already searching"),
            Err(err) => {
                error!(%err, "could not start search");
                send("bestmove 0000");
            }
        }
    }

    fn start_search(&mut self) -> Result<Receiver<AiEvent<Move, Color>>, EngineError> {
        let side = self.position.side_to_move;
        if self.engine.as_ref().map(ChessAi::side) != Some(side) {
            self.reset_engine();
        }
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => ChessAi::new(side, self.config.clone())?,
        };
        let engine = self.engine.insert(engine);
        sync_engine(engine, &self.position)?;
        let events = engine.subscribe();
        engine.play();
        Ok(events)
    }

    fn stop(&self) {
        if let Some(engine) = &self.engine {
            engine.stop();
        }
    }
}

/// Brings the engine to `target`. Moves that merely extend the engine's own
/// game are played one by one so its cached tree survives; anything else
/// replaces the position.
fn sync_engine(engine: &ChessAi, target: &Position) -> Result<(), EngineError> {
    let current = engine.position();
    let (ours, theirs) = (current.history(), target.history());
    if theirs.len() >= ours.len() && theirs.starts_with(ours) {
        let extra = &theirs[ours.len()..];
        let mut replay = current.clone();
        for &mv in extra {
            replay.apply_move(mv);
        }
        if replay == *target {
            return extra.iter().try_for_each(|&mv| engine.play_move(mv));
        }
    }
    engine.setup(target.clone())
}

fn await_decision(events: Receiver<AiEvent<Move, Color>>) {
    for event in events {
        match event {
            AiEvent::Decided(mv) => {
                send(&format!("bestmove {}", move_to_uci(mv)));
                return;
            }
            AiEvent::SearchFailed(err) => {
                error!(%err, "search failed");
                send("bestmove 0000");
                return;
            }
            AiEvent::Moved { .. } => {}
        }
    }
}

/// `position startpos|fen <fen...> [moves m1 m2 ...]`
fn parse_position(parts: &[&str], tables: &MoveTables) -> Result<Position, String> {
    let moves_at = parts.iter().position(|&x| x == "moves").unwrap_or(parts.len());
    let mut pos = match parts.first() {
        Some(&"startpos") => Position::startpos(),
        Some(&"fen") => Position::from_fen(&parts[1..moves_at].join(" ")).map_err(|e| e.to_string())?,
        _ => return Err("expected `startpos` or `fen`".into()),
    };
    for text in parts.iter().skip(moves_at + 1) {
        let mv = parse_uci_move(&pos, tables, text).ok_or_else(|| format!("illegal move {text}"))?;
        pos.apply_move(mv);
    }
    Ok(pos)
}

fn load_config(args: &[String]) -> Result<EngineConfig, EngineError> {
    match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args
                .get(i + 1)
                .ok_or_else(|| EngineError::Config("--config needs a path".into()))?;
            EngineConfig::load(path)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> ExitCode {
    // stdout belongs to the UCI protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    info!(?config, "starting");
    let mut session = Session::new(config);

    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = parts.split_first() else {
            continue;
        };

        match command {
            "uci" => {
                send("id name Negascout 0.1");
                send("id author ML-chess");
                send(&format!(
                    "option name Depth type spin default {} min 1 max 8",
                    session.config.max_ply
                ));
                send(&format!(
                    "option name Threads type spin default {} min 1 max 256",
                    session.config.thread_count()
                ));
                send("uciok");
            }
            "isready" => send("readyok"),
            "setoption" => session.set_option(rest),
            "ucinewgame" => {
                session.reset_engine();
                session.position = Position::startpos();
            }
            "position" => match parse_position(rest, &session.tables) {
                Ok(pos) => session.position = pos,
                Err(err) => warn!(%err, "bad position command"),
            },
            "go" => session.go(),
            "stop" => session.stop(),
            "quit" => break,
            _ => {
                // ignore unknown commands
            }
        }
    }

    session.reset_engine();
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_startpos_with_moves() {
        let tables = MoveTables::generate();
        let pos = parse_position(&["startpos", "moves", "e2e4", "e7e5"], &tables).unwrap();
        assert_eq!(pos.history().len(), 2);
        assert_eq!(pos.side_to_move, Color::White);
    }

    #[test]
    fn test_parse_fen() {
        let tables = MoveTables::generate();
        let parts: Vec<&str> = "fen 4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1 moves d1d5"
            .split_whitespace()
            .collect();
        let pos = parse_position(&parts, &tables).unwrap();
        assert_eq!(pos.side_to_move, Color::Black);
        assert_eq!(chess_core::material(&pos, Color::White), 500);
    }

    #[test]
    fn test_parse_rejects_illegal_move() {
        let tables = MoveTables::generate();
        assert!(parse_position(&["startpos", "moves", "e2e5"], &tables).is_err());
        assert!(parse_position(&["somewhere"], &tables).is_err());
    }

    #[test]
    fn test_sync_replays_extending_moves() {
        let engine = ChessAi::new(Color::White, EngineConfig::default().with_threads(1)).unwrap();
        let tables = MoveTables::generate();
        let target = parse_position(&["startpos", "moves", "e2e4", "e7e5"], &tables).unwrap();
        let events = engine.subscribe();

        sync_engine(&engine, &target).unwrap();
        assert_eq!(engine.position(), target);
        // Played move by move rather than replaced.
        assert_eq!(events.try_iter().count(), 2);
    }

    #[test]
    fn test_sync_replaces_unrelated_position() {
        let engine = ChessAi::new(Color::White, EngineConfig::default().with_threads(1)).unwrap();
        let tables = MoveTables::generate();
        let parts: Vec<&str> = "fen 4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1".split_whitespace().collect();
        let target = parse_position(&parts, &tables).unwrap();
        let events = engine.subscribe();

        sync_engine(&engine, &target).unwrap();
        assert_eq!(engine.position(), target);
        assert_eq!(events.try_iter().count(), 0);
    }

    #[test]
    fn test_config_flag_requires_path() {
        let args = vec!["uci_engine".to_string(), "--config".to_string()];
        assert!(matches!(load_config(&args), Err(EngineError::Config(_))));
        assert_eq!(load_config(&args[..1]).unwrap(), EngineConfig::default());
    }
}
