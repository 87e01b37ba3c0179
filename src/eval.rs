/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    io::{BufRead, BufReader, Write},
    path::PathBuf,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};

use crate::{Color, Score, MAX_DEPTH};

/// Default time an external engine may think about a single position.
pub const DEFAULT_MOVETIME: Duration = Duration::from_millis(100);

/// Scores chess positions.
///
/// This is the only channel through which leaf values enter the search.
/// Implementations receive the full FEN of a position and the color to score it for,
/// and return a score where higher is better for `side`.
pub trait Evaluator {
    /// Score the position encoded by `fen` from `side`'s perspective.
    fn evaluate(&mut self, fen: &str, side: Color) -> Result<Score>;

    /// Release any resources held by this evaluator.
    ///
    /// Called once, when the session that owns the evaluator ends.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<F> Evaluator for F
where
    F: FnMut(&str, Color) -> Result<Score>,
{
    #[inline(always)]
    fn evaluate(&mut self, fen: &str, side: Color) -> Result<Score> {
        self(fen, side)
    }
}

/// How to launch and talk to an external UCI engine used as an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Path to the engine's executable.
    pub program: PathBuf,

    /// Extra arguments to launch the engine with.
    pub args: Vec<String>,

    /// How long the engine may think about each position.
    pub movetime: Duration,
}

impl EvaluatorConfig {
    /// A config that launches `program` with no arguments and the default think time.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            movetime: DEFAULT_MOVETIME,
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self::new("stockfish")
    }
}

/// An [`Evaluator`] backed by an external engine speaking the [Universal Chess Interface](https://backscattering.de/chess/uci/).
///
/// The engine process is started by [`UciEvaluator::new`] and lives until [`Evaluator::close`] is called
/// or the evaluator is dropped, whichever comes first.
#[derive(Debug)]
pub struct UciEvaluator {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    config: EvaluatorConfig,

    /// Name the engine reported during the handshake.
    name: String,

    closed: bool,
}

impl UciEvaluator {
    /// Launches the engine described by `config` and waits until it reports it is ready.
    ///
    /// Fails if the engine cannot be started or exits before completing the handshake.
    pub fn new(config: EvaluatorConfig) -> Result<Self> {
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start evaluator {:?}", config.program))?;

        let stdin = child
            .stdin
            .take()
            .context("Failed to open evaluator stdin")?;
        let stdout = child
            .stdout
            .take()
            .context("Failed to open evaluator stdout")?;

        let mut evaluator = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            name: config.program.display().to_string(),
            config,
            closed: false,
        };

        evaluator.handshake()?;
        log::info!("Evaluator {:?} is ready", evaluator.name);

        Ok(evaluator)
    }

    /// The name the engine reported for itself.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The config this evaluator was started with.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    fn handshake(&mut self) -> Result<()> {
        self.send("uci")?;
        while let Some(line) = self.read_line()? {
            if let Some(name) = line.strip_prefix("id name ") {
                self.name = name.trim().to_string();
            } else if line == "uciok" {
                break;
            }
        }

        self.send("isready")?;
        while let Some(line) = self.read_line()? {
            if line == "readyok" {
                return Ok(());
            }
        }

        bail!("Evaluator {:?} exited during the UCI handshake", self.config.program)
    }

    /// Writes a single line to the engine.
    fn send(&mut self, line: &str) -> Result<()> {
        log::trace!("evaluator << {line}");
        writeln!(self.stdin, "{line}")
            .and_then(|_| self.stdin.flush())
            .with_context(|| format!("Failed to send {line:?} to evaluator"))
    }

    /// Reads a single trimmed line from the engine, or `None` if it has closed its output.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buffer = String::new();
        let bytes = self
            .stdout
            .read_line(&mut buffer)
            .context("Failed to read from evaluator")?;

        if bytes == 0 {
            return Ok(None);
        }

        let line = buffer.trim().to_string();
        log::trace!("evaluator >> {line}");
        Ok(Some(line))
    }

    /// Stops the engine, asking nicely first.
    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // The engine may already be gone, in which case there is nobody to ask
        let _ = self.send("quit");
        let status = self
            .child
            .wait()
            .context("Failed to wait for evaluator to exit")?;
        log::info!("Evaluator {:?} exited with {status}", self.name);

        Ok(())
    }
}

impl Evaluator for UciEvaluator {
    fn evaluate(&mut self, fen: &str, side: Color) -> Result<Score> {
        if self.closed {
            bail!("Evaluator {:?} has already been closed", self.name);
        }

        self.send(&format!("position fen {fen}"))?;
        self.send(&format!("go movetime {}", self.config.movetime.as_millis()))?;

        // Keep the score from the deepest `info` line before `bestmove`
        let mut score = None;
        loop {
            let line = self
                .read_line()?
                .ok_or(anyhow!("Evaluator {:?} exited mid-search", self.name))?;

            if line.starts_with("bestmove") {
                break;
            }

            if let Some(parsed) = parse_info_score(&line)? {
                score = Some(parsed);
            }
        }

        let score = score.ok_or(anyhow!("Evaluator {:?} gave no score for {fen:?}", self.name))?;

        // UCI scores are from the side to move's point of view
        if side_to_move(fen)? == side {
            Ok(score)
        } else {
            Ok(-score)
        }
    }

    fn close(&mut self) -> Result<()> {
        self.shutdown()
    }
}

impl Drop for UciEvaluator {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Reads the active color field of a FEN string.
fn side_to_move(fen: &str) -> Result<Color> {
    fen.split_ascii_whitespace()
        .nth(1)
        .ok_or(anyhow!("FEN {fen:?} has no active color"))?
        .parse()
}

/// Extracts the score from a UCI `info` line, if it carries one.
///
/// `score cp <x>` becomes a centipawn score; `score mate <n>` becomes a mate score `n` moves away.
fn parse_info_score(line: &str) -> Result<Option<Score>> {
    let mut tokens = line.split_ascii_whitespace();
    if tokens.next() != Some("info") {
        return Ok(None);
    }

    let Some(_) = tokens.by_ref().find(|&t| t == "score") else {
        return Ok(None);
    };

    let (Some(kind), Some(value)) = (tokens.next(), tokens.next()) else {
        bail!("Truncated score in evaluator output {line:?}");
    };

    let value: i32 = value
        .parse()
        .with_context(|| format!("Invalid score value {value:?} in evaluator output {line:?}"))?;

    // Keep centipawns clear of mate scores, and mates within reach of the mate range
    let max_cp = Score::LOWEST_MATE.0 - 1;
    let max_mate = (MAX_DEPTH / 2) as i32;

    let score = match kind {
        "cp" => Score(value.clamp(-max_cp, max_cp)),
        // Mate in `n` moves is `2n - 1` plies for the mating side, `2n` plies for the mated side
        "mate" if value > 0 => Score::mate_in_plies(2 * value.min(max_mate) - 1),
        "mate" => Score::mate_in_plies(2 * value.max(-max_mate)),
        _ => bail!("Unknown score kind {kind:?} in evaluator output {line:?}"),
    };

    Ok(Some(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info_score() {
        let cp = parse_info_score("info depth 12 seldepth 15 score cp -37 nodes 1000 pv e2e4")
            .unwrap();
        assert_eq!(cp, Some(Score(-37)));

        let mate = parse_info_score("info depth 5 score mate 2 pv d1h5").unwrap().unwrap();
        assert!(mate.is_mate());
        assert_eq!(mate.moves_to_mate(), 2);

        let mated = parse_info_score("info depth 0 score mate 0").unwrap().unwrap();
        assert_eq!(mated, -Score::MATE);

        // Absurd values saturate instead of overflowing
        let far = parse_info_score("info score mate 2147483647").unwrap().unwrap();
        assert!(far.is_mate() && far > Score::DRAW);
        let far = parse_info_score("info score mate -2147483648").unwrap().unwrap();
        assert!(far.is_mate() && far < Score::DRAW);
        let huge = parse_info_score("info score cp -2147483648").unwrap().unwrap();
        assert!(!huge.is_mate() && huge > -Score::INF);

        assert_eq!(parse_info_score("info string hello").unwrap(), None);
        assert_eq!(parse_info_score("readyok").unwrap(), None);
        assert!(parse_info_score("info score cp").is_err());
        assert!(parse_info_score("info score wdl 1 2 3").is_err());
    }

    #[test]
    fn test_closures_are_evaluators() {
        let mut calls = 0;
        let mut eval = |_: &str, side: Color| -> Result<Score> {
            calls += 1;
            Ok(if side.is_white() { Score(10) } else { Score(-10) })
        };

        assert_eq!(eval.evaluate("fen", Color::Black).unwrap(), Score(-10));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let config = EvaluatorConfig::new("./this-engine-does-not-exist");
        assert!(UciEvaluator::new(config).is_err());
    }

    /// A tiny UCI engine that always reports `score cp 42`.
    #[cfg(unix)]
    fn stub_engine() -> EvaluatorConfig {
        let script = r#"
            while read -r line; do
                case "$line" in
                    uci) echo "id name stubfish"; echo "uciok" ;;
                    isready) echo "readyok" ;;
                    go*) echo "info depth 1 score cp 42"; echo "bestmove 0000" ;;
                    quit) exit 0 ;;
                esac
            done
        "#;

        EvaluatorConfig {
            program: PathBuf::from("sh"),
            args: vec![String::from("-c"), String::from(script)],
            movetime: Duration::from_millis(1),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_uci_evaluator_scores_relative_to_side() {
        let mut eval = UciEvaluator::new(stub_engine()).unwrap();
        assert_eq!(eval.name(), "stubfish");

        let white_to_move = crate::FEN_STARTPOS;
        assert_eq!(eval.evaluate(white_to_move, Color::White).unwrap(), Score(42));
        assert_eq!(eval.evaluate(white_to_move, Color::Black).unwrap(), Score(-42));

        let black_to_move = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert_eq!(eval.evaluate(black_to_move, Color::Black).unwrap(), Score(42));

        eval.close().unwrap();
        assert!(eval.evaluate(white_to_move, Color::White).is_err());
    }
}
