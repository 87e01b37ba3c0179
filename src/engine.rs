/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    io,
    sync::mpsc::{channel, Receiver, Sender},
    thread,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use uci_parser::{UciCommand, UciParseError, UciResponse};

use crate::{
    depth_for_material, perft, splitperft, EngineCommand, Evaluator, Game, GameStatus, Move,
    OpeningBook, Search, SearchConfig, SearchResult,
};

/// The Gambit chess engine.
///
/// Owns the authoritative [`Game`], the evaluator used to score positions, and an optional opening book.
/// Commands are received over a channel, so they can come from `stdin` or from the program itself.
pub struct Engine<E: Evaluator> {
    /// The current state of the chess board, as known to the engine.
    ///
    /// This is modified whenever moves are played or new positions are given,
    /// and is reset whenever the engine is told to start a new game.
    game: Game,

    /// Scores positions during search. Searching is impossible without one.
    evaluator: Option<E>,

    /// Known positions to answer without searching.
    book: Option<OpeningBook>,

    /// Configuration shared by every search.
    config: SearchConfig,

    /// If set, every search uses this depth instead of one chosen from the material on the board.
    fixed_depth: Option<usize>,

    /// One half of a channel, responsible for sending commands to the engine to execute.
    sender: Sender<EngineCommand>,

    /// One half of a channel, responsible for receiving commands for the engine to execute.
    receiver: Receiver<EngineCommand>,
}

impl<E: Evaluator> Engine<E> {
    /// Constructs a new [`Engine`] instance to be executed with [`Engine::run`].
    pub fn new(evaluator: Option<E>) -> Self {
        let (sender, receiver) = channel();

        Self {
            game: Game::default(),
            evaluator,
            book: None,
            config: SearchConfig::default(),
            fixed_depth: None,
            sender,
            receiver,
        }
    }

    /// Consult `book` before every search.
    pub fn with_book(mut self, book: Option<OpeningBook>) -> Self {
        self.book = book;
        self
    }

    /// Use `config` for every search. Its depth is only used if no other depth applies.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Always search to `depth`, if set.
    pub fn with_depth(mut self, depth: Option<usize>) -> Self {
        self.fixed_depth = depth;
        self
    }

    /// Returns a string of the engine's name and current version.
    pub fn name(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// The game the engine is playing.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Sends an [`EngineCommand`] to the engine to be executed.
    pub fn send_command(&self, command: EngineCommand) -> Result<()> {
        self.sender
            .send(command)
            .context("Failed to send command to engine")
    }

    /// Execute the main event loop for the engine.
    ///
    /// This function spawns a thread to handle input from `stdin` and waits on received commands.
    /// Searches block the loop until they complete; input received meanwhile is queued.
    /// When the loop ends, the evaluator is closed.
    pub fn run(&mut self) -> Result<()> {
        log::info!("{} started", self.name());

        // Spawn a separate thread for handling user input
        let sender = self.sender.clone();
        thread::spawn(|| {
            if let Err(err) = input_handler(sender) {
                log::debug!("Input handler thread stopping: {err}");
            }
        });

        // Loop on user input
        while let Ok(cmd) = self.receiver.recv() {
            match self.execute(cmd) {
                Ok(true) => {}
                Ok(false) => break,
                // Keep running, even on error
                Err(e) => log::error!("{e:#}"),
            }
        }

        self.shutdown()
    }

    /// Executes a single command, returning `false` if the engine should stop.
    pub fn execute(&mut self, cmd: EngineCommand) -> Result<bool> {
        match cmd {
            EngineCommand::Display => println!("{}", self.game),

            EngineCommand::Exit => return Ok(false),

            EngineCommand::Fen => println!("{}", self.game.to_fen()),

            EngineCommand::Moves { square, requests } => {
                let moves = if let Some(square) = square {
                    self.game.legal_moves_from(square)
                } else {
                    self.game.legal_moves()
                };

                // If there are none, print "(none)"
                let moves_string = if moves.is_empty() {
                    String::from("(none)")
                } else {
                    // Otherwise, join them by comma-space
                    moves
                        .into_iter()
                        .map(|mv| {
                            if requests {
                                mv.to_request()
                            } else {
                                mv.to_string()
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                println!("{moves_string}");
            }

            EngineCommand::New => self.new_game(),

            EngineCommand::Perft { depth } => println!("{}", perft(&self.game, depth)),

            EngineCommand::Play { request } => {
                let mv = self.game.play_request(&request.join(" "))?;
                log::debug!("Played {mv:?}");
                self.announce_status();
            }

            EngineCommand::Reply { depth } => self.reply(depth)?,

            EngineCommand::Splitperft { depth } => {
                let nodes = splitperft(&self.game, depth);
                println!("\n{nodes}");
            }

            EngineCommand::Status => println!("{}", self.game.status()),

            EngineCommand::Uci { cmd } => return self.handle_uci_command(cmd),
        }

        Ok(true)
    }

    /// Handle the execution of a single [`UciCommand`], returning `false` if the engine should stop.
    fn handle_uci_command(&mut self, uci: UciCommand) -> Result<bool> {
        use UciCommand::*;
        match uci {
            Uci => self.uci(),

            IsReady => println!("{}", UciResponse::<&str>::ReadyOk),

            SetOption { name, value: _ } => bail!("{} has no option named {name:?}", self.name()),

            UciNewGame => self.new_game(),

            Position { fen, moves } => self.position(fen, moves)?,

            Go(options) => {
                if let Some(depth) = options.perft {
                    let nodes = splitperft(&self.game, depth as usize);
                    println!("\n{nodes}");
                    return Ok(true);
                }

                // UCI depths count the root move; ours count the plies below it
                self.search(options.depth.map(|d| (d as usize).saturating_sub(1)))?;
            }

            // Searches are synchronous, so by the time `stop` is read there is nothing to stop
            Stop => {}

            Quit => return Ok(false),

            _ => bail!(
                "{} does not support UCI command {uci:?}",
                env!("CARGO_PKG_NAME")
            ),
        }

        Ok(true)
    }

    /// The depth to search the current position to: `requested` if given,
    /// otherwise the engine's fixed depth, otherwise a depth chosen from the material on the board.
    fn depth_for(&self, requested: Option<usize>) -> usize {
        requested
            .or(self.fixed_depth)
            .unwrap_or_else(|| depth_for_material(self.game.board().piece_count()))
    }

    /// Searches the current position, printing UCI `info` and `bestmove` lines.
    fn search(&mut self, depth: Option<usize>) -> Result<SearchResult> {
        let config = SearchConfig {
            max_depth: self.depth_for(depth),
            ..self.config
        };

        let evaluator = self
            .evaluator
            .as_mut()
            .ok_or(anyhow!("Cannot search without an evaluator; launch with --evaluator"))?;

        let mut search = Search::new(&self.game, evaluator, config);
        if let Some(book) = &self.book {
            search = search.with_book(book);
        }

        search.start()
    }

    /// Executes the `reply` command, searching the current position and playing the move found.
    fn reply(&mut self, depth: Option<usize>) -> Result<()> {
        let res = self.search(depth)?;
        let mv = res
            .bestmove
            .ok_or(anyhow!("No moves to play: {}", self.game.status()))?;

        self.game.play(mv)?;
        println!("{} plays {mv} ({})", self.game.turn().opponent(), mv.to_request());
        self.announce_status();

        Ok(())
    }

    /// Prints the status of the game if it is anything other than ongoing.
    fn announce_status(&self) {
        let status = self.game.status();
        if status != GameStatus::Ongoing {
            println!("{status}");
        }
    }

    /// Set the position to the supplied FEN string (defaults to the standard startpos if not supplied),
    /// and then apply `moves` one-by-one to the position.
    ///
    /// If any move is illegal, the engine's position is left unchanged.
    fn position<T: AsRef<str>>(
        &mut self,
        fen: Option<T>,
        moves: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        // Set the new position
        let mut game = if let Some(fen) = fen {
            fen.as_ref().parse()?
        } else {
            Game::default()
        };

        // Apply the provided moves
        for mv_str in moves {
            let mv = Move::from_uci(game.board(), mv_str.as_ref())?;
            game.play(mv)?;
        }

        self.game = game;
        Ok(())
    }

    /// Resets the engine's internal game state.
    fn new_game(&mut self) {
        self.game.reset();
    }

    /// Called when the engine receives the `uci` command.
    ///
    /// Prints engine's ID and version.
    fn uci(&self) {
        println!("id name {}\nid author {}\n", self.name(), env!("CARGO_PKG_NAME"));

        // We're ready to go!
        println!("{}", UciResponse::<&str>::UciOk)
    }

    /// Releases the evaluator.
    ///
    /// Called automatically when [`Engine::run`] ends.
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(mut evaluator) = self.evaluator.take() {
            evaluator.close()?;
        }

        log::info!("{} stopped", self.name());
        Ok(())
    }
}

/// Loops endlessly to await input via `stdin`, sending all successfully-parsed commands through the supplied `sender`.
fn input_handler(sender: Sender<EngineCommand>) -> Result<()> {
    let mut buffer = String::with_capacity(2048);

    loop {
        // Clear the buffer, read input, and trim the trailing newline
        buffer.clear();
        let bytes = io::stdin()
            .read_line(&mut buffer)
            .context("Failed to read line when parsing UCI commands")?;

        // For ctrl + d
        if 0 == bytes {
            // Send the Exit command and exit this function
            sender
                .send(EngineCommand::Exit)
                .context("Failed to send 'exit' command after receiving empty input")?;

            bail!("Engine received input of 0 bytes and is quitting");
        }

        // Trim any leading/trailing whitespace
        let buf = buffer.trim();

        // Ignore empty lines
        if buf.is_empty() {
            continue;
        }

        // Attempt to parse the input as a UCI command first, since that's what GUIs speak
        match UciCommand::new(buf) {
            Ok(cmd) => sender
                .send(EngineCommand::Uci { cmd })
                .context("Failed to send UCI command to engine")?,

            // If it's not a UCI command, check if it's an engine-specific command
            Err(UciParseError::UnrecognizedCommand { cmd: _ }) => {
                match EngineCommand::try_parse_from(buf.split_ascii_whitespace()) {
                    Ok(cmd) => sender
                        .send(cmd)
                        .context("Failed to send command to engine")?,

                    // If it wasn't a custom command, either, print an error.
                    Err(err) => eprintln!("{err}"),
                }
            }

            // If it was a UCI command, print a usage message.
            Err(uci_err) => eprintln!("{uci_err}"),
        }
    }
}
