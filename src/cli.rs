/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use uci_parser::UciCommand;

use crate::{EvaluatorConfig, InvalidBranchPolicy, SearchConfig, Square};

/// Options the engine is launched with.
///
/// A session started without `--evaluator` can set up positions, play moves, and run perft, but cannot search:
/// `reply` and `go` fail until the engine is relaunched with an evaluator.
/// If an evaluator is given but cannot be started, the session does not start at all.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Path to a UCI engine used to score positions. Required for searching.
    #[arg(short, long, value_name = "PATH")]
    pub evaluator: Option<PathBuf>,

    /// Extra argument to launch the evaluator with. May be repeated.
    #[arg(long = "evaluator-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub evaluator_args: Vec<String>,

    /// Directory of tab-separated opening tables to consult before searching.
    #[arg(short, long, value_name = "DIR")]
    pub openings: Option<PathBuf>,

    /// How long the evaluator may think about each position, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub movetime: u64,

    /// Always search this many plies past the root move, instead of choosing a depth from the material on the board.
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// What to do when a branch of the search cannot be explored.
    #[arg(long, value_enum, default_value_t = InvalidBranchPolicy::Retain)]
    pub invalid_branch: InvalidBranchPolicy,
}

impl Cli {
    /// How to launch the evaluator, if one was requested.
    pub fn evaluator_config(&self) -> Option<EvaluatorConfig> {
        let program = self.evaluator.clone()?;

        Some(EvaluatorConfig {
            program,
            args: self.evaluator_args.clone(),
            movetime: Duration::from_millis(self.movetime),
        })
    }

    /// The search configuration implied by these options.
    ///
    /// The depth is only a default; the engine picks a depth per search unless `--depth` was given.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            invalid_branch: self.invalid_branch,
            ..SearchConfig::default()
        }
    }
}

/// A command to be sent to the engine.
#[derive(Debug, Clone, Parser)]
#[command(
    multicall = true,
    about,
    rename_all = "lower",
    override_usage("<ENGINE COMMAND> | <UCI COMMAND>")
)]
pub enum EngineCommand {
    /// Print a visual representation of the current board state.
    #[command(alias = "d")]
    Display,

    /// Quit the engine.
    #[command(alias = "quit")]
    Exit,

    /// Generate and print a FEN string for the current position.
    Fen,

    /// Shows all legal moves in the current position, or for a specific piece.
    Moves {
        square: Option<Square>,

        /// If set, moves will be printed as move requests (`rank file piece rank file`).
        #[arg(short, long, default_value = "false")]
        requests: bool,
    },

    /// Start a new game from the standard starting position.
    New,

    /// Performs a perft on the current position at the supplied depth, printing total node count.
    Perft { depth: usize },

    /// Apply a move request to the game, if it is legal for the side to move.
    ///
    /// A request is five tokens: origin rank, origin file, piece letter, destination rank, destination file.
    /// For example, `move 1 4 P 3 4` plays e2e4.
    #[command(name = "move", alias = "play")]
    Play {
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
    },

    /// Search the current position and play the best move found.
    Reply {
        /// Override the search depth (plies past the root move) for this move only.
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Performs a split perft on the current position at the supplied depth.
    #[command(alias = "sperft")]
    Splitperft { depth: usize },

    /// Print whether the side to move is in check, mated, or drawn.
    Status,

    /// Wrapper over UCI commands sent to the engine.
    #[command(skip)]
    Uci { cmd: UciCommand },
}

impl FromStr for EngineCommand {
    type Err = clap::Error;
    /// Attempt to parse an [`EngineCommand`] from a string.
    ///
    /// If this fails, it will attempt to parse the string as a [`UciCommand`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::try_parse_from(s.split_ascii_whitespace()) {
            Ok(cmd) => Ok(cmd),
            Err(e) => {
                // If parsing failed, attempt to parse as a UciCommand
                if let Ok(cmd) = UciCommand::new(s) {
                    Ok(Self::Uci { cmd })
                } else {
                    Err(e)
                }
            }
        }
    }
}
