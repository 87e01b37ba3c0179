/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::time::Instant;

use anyhow::{Context, Result};
use clap::ValueEnum;
use uci_parser::{UciInfo, UciResponse};

use crate::{
    legal_moves, Board, Color, Evaluator, Game, Move, MoveContext, OpeningBook, PieceKind, Score,
};

/// Maximum number of plies that can be searched, counting the root move.
pub const MAX_DEPTH: usize = 255;

/// Depth searched when nothing else is specified.
///
/// Four plies: the root move plus three replies.
pub const DEFAULT_DEPTH: usize = 3;

/// What the search does when exploring a branch fails,
/// either because its move could not be applied or because the evaluator could not score one of its leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum InvalidBranchPolicy {
    /// Skip the branch: the node keeps the best value it had found so far.
    #[default]
    Retain,

    /// Abort the whole search with the branch's error.
    Fail,
}

/// The result of a search, containing the best move found, score, and total nodes searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchResult {
    /// Number of nodes searched.
    pub nodes: u64,

    /// Best move found during the search.
    pub bestmove: Option<Move>,

    /// Evaluation of the position after `bestmove` is made, from the searching side's perspective.
    pub score: Score,

    /// Whether `bestmove` came from the opening book rather than a search.
    pub from_book: bool,
}

impl Default for SearchResult {
    /// A default search result should initialize to a *very bad* value,
    /// since there isn't a move to play.
    #[inline(always)]
    fn default() -> Self {
        Self {
            nodes: 0,
            bestmove: None,
            score: -Score::INF,
            from_book: false,
        }
    }
}

/// Configuration variables for executing a [`Search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Number of plies to search below each root move before handing positions to the evaluator.
    ///
    /// A depth of `0` scores the positions right after each root move.
    pub max_depth: usize,

    /// Whether to prune with alpha-beta bounds.
    ///
    /// Disabling this performs an exhaustive minimax that selects the same move, only slower.
    pub pruning: bool,

    /// What to do with branches that fail to be explored.
    pub invalid_branch: InvalidBranchPolicy,

    /// Whether to consult the opening book, if one is given, before searching.
    pub use_book: bool,
}

impl SearchConfig {
    /// A default config that searches to `depth` plies.
    pub fn with_depth(depth: usize) -> Self {
        Self {
            max_depth: depth,
            ..Default::default()
        }
    }
}

impl Default for SearchConfig {
    #[inline(always)]
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_DEPTH,
            pruning: true,
            invalid_branch: InvalidBranchPolicy::default(),
            use_book: true,
        }
    }
}

/// A position reached while searching, held on a scratch board.
///
/// Clocks are tracked only so the evaluator receives a well-formed FEN.
#[derive(Debug, Clone, Copy)]
struct Node {
    board: Board,
    turn: Color,
    ctx: MoveContext,
    halfmove: u32,
    fullmove: u32,
}

impl Node {
    fn root(game: &Game) -> Self {
        Self {
            board: *game.board(),
            turn: game.turn(),
            ctx: game.context(),
            halfmove: game.halfmove_clock(),
            fullmove: game.fullmove_number(),
        }
    }

    /// The node reached by playing `mv` on a copy of this node's board.
    fn child(&self, mv: Move) -> Result<Self> {
        let board = self
            .board
            .with_move_made(mv)
            .with_context(|| format!("Failed to apply {mv} to {:?}", self.board))?;

        let reset =
            mv.kind == PieceKind::Pawn || board.piece_count() != self.board.piece_count();

        Ok(Self {
            board,
            turn: self.turn.opponent(),
            ctx: MoveContext::after(mv),
            halfmove: if reset { 0 } else { self.halfmove + 1 },
            fullmove: self.fullmove + u32::from(!self.turn.is_white()),
        })
    }

    #[inline(always)]
    fn legal_moves(&self) -> Vec<Move> {
        legal_moves(&self.board, self.turn, &self.ctx)
    }

    #[inline(always)]
    fn to_fen(&self) -> String {
        self.board.to_fen(self.turn, &self.ctx, self.halfmove, self.fullmove)
    }
}

/// Executes a depth-limited minimax search with alpha-beta pruning on the provided game.
///
/// The side to move in the game is the maximizing side, and every leaf is scored from its perspective.
/// All moves are explored on scratch boards; the game itself is never modified.
pub struct Search<'a, E: Evaluator + ?Sized> {
    /// The game to search on.
    game: &'a Game,

    /// Scores leaf positions.
    evaluator: &'a mut E,

    /// Known positions to answer without searching.
    book: Option<&'a OpeningBook>,

    /// Configuration variables for this instance of the search.
    config: SearchConfig,

    /// Number of nodes visited so far.
    nodes: u64,
}

impl<'a, E: Evaluator + ?Sized> Search<'a, E> {
    /// Construct a new [`Search`] instance to execute on the provided [`Game`].
    #[inline(always)]
    pub fn new(game: &'a Game, evaluator: &'a mut E, config: SearchConfig) -> Self {
        Self {
            game,
            evaluator,
            book: None,
            config,
            nodes: 0,
        }
    }

    /// Consult `book` before searching.
    pub fn with_book(mut self, book: &'a OpeningBook) -> Self {
        self.book = Some(book);
        self
    }

    /// Start the search, returning its results if the search was successful.
    ///
    /// This is the entrypoint of the search, and prints UCI info before calling [`Self::run`],
    /// and concluding by sending the `bestmove` message and exiting.
    pub fn start(self) -> Result<SearchResult> {
        let starttime = Instant::now();
        // Reported in plies, counting the root move
        let depth = self.horizon() + 1;

        let res = self.run()?;

        // Send search info to the GUI
        let elapsed = starttime.elapsed();
        let info = if res.from_book {
            UciInfo::new().string(String::from("Playing move from opening book"))
        } else {
            UciInfo::new()
                .depth(depth)
                .nodes(res.nodes)
                .score(res.score.into_uci())
                .time(elapsed.as_millis())
        };
        send_info(info);

        // Search has ended; send bestmove
        let response = UciResponse::BestMove {
            bestmove: res.bestmove,
            ponder: None,
        };
        println!("{response}");

        Ok(res)
    }

    /// Runs the search without printing anything.
    ///
    /// If the opening book knows the position and its move is legal, that move is returned immediately.
    /// Otherwise every legal move of the side to move is searched, and the first move with the highest score wins.
    pub fn run(mut self) -> Result<SearchResult> {
        if let Some(res) = self.probe_book() {
            return Ok(res);
        }

        let root = Node::root(self.game);
        let moves = root.legal_moves();

        // No legal moves: the game is already over
        if moves.is_empty() {
            let score = if self.game.in_check() {
                -Score::MATE
            } else {
                Score::DRAW
            };

            return Ok(SearchResult {
                nodes: 1,
                score,
                ..Default::default()
            });
        }

        let starttime = Instant::now();
        let depth = self.horizon();
        log::debug!(
            "Searching {} moves of {:?} to depth {depth} past the root move",
            moves.len(),
            self.game
        );

        let mut res = SearchResult {
            // Initialize `bestmove` to the first move available
            bestmove: moves.first().copied(),
            ..Default::default()
        };
        let mut alpha = -Score::INF;
        let beta = Score::INF;
        self.nodes = 1;

        for mv in moves {
            let tic = Instant::now();

            let score = match root
                .child(mv)
                .and_then(|child| self.min_value(&child, depth, 0, alpha, beta))
            {
                Ok(score) => score,
                Err(e) => {
                    self.on_invalid_branch(e)?;
                    continue;
                }
            };

            log::debug!("{mv} scored {score:?} in {:?}", tic.elapsed());

            // Strictly greater, so the first of several equal moves is kept
            if score > res.score {
                res.score = score;
                res.bestmove = Some(mv);
            }

            if self.config.pruning {
                alpha = alpha.max(score);
            }
        }

        res.nodes = self.nodes;
        log::debug!(
            "Search chose {:?} with score {:?} after {} nodes in {:?}",
            res.bestmove,
            res.score,
            res.nodes,
            starttime.elapsed()
        );

        Ok(res)
    }

    /// Number of plies explored below each root move before positions are handed to the evaluator.
    #[inline(always)]
    fn horizon(&self) -> usize {
        self.config.max_depth.min(MAX_DEPTH - 1)
    }

    /// Looks the game's position up in the opening book, if allowed.
    fn probe_book(&self) -> Option<SearchResult> {
        if !self.config.use_book {
            return None;
        }

        let mv = self.book?.lookup(self.game)?;
        if !self.game.is_legal(mv) {
            log::warn!(
                "Ignoring illegal book move {mv:?} for {:?}",
                self.game.key()
            );
            return None;
        }

        log::debug!("Book move {mv} for {:?}", self.game.key());
        Some(SearchResult {
            nodes: 0,
            bestmove: Some(mv),
            score: Score::DRAW,
            from_book: true,
        })
    }

    /// Applies the invalid branch policy to an error from exploring a branch.
    ///
    /// Returns `Ok` if the search should continue without the branch.
    fn on_invalid_branch(&self, err: anyhow::Error) -> Result<()> {
        match self.config.invalid_branch {
            InvalidBranchPolicy::Retain => {
                log::warn!("Skipping invalid search branch: {err:#}");
                Ok(())
            }
            InvalidBranchPolicy::Fail => Err(err),
        }
    }

    /// Scores a leaf position from the searching side's perspective.
    fn leaf(&mut self, node: &Node) -> Result<Score> {
        self.evaluator.evaluate(&node.to_fen(), self.game.turn())
    }

    /// A node where the searching side is to move, and picks the highest-scoring child.
    fn max_value(
        &mut self,
        node: &Node,
        depth: usize,
        ply: usize,
        mut alpha: Score,
        beta: Score,
    ) -> Result<Score> {
        self.nodes += 1;

        if ply >= depth {
            return self.leaf(node);
        }

        let moves = node.legal_moves();
        // Checkmate or stalemate
        if moves.is_empty() {
            return self.leaf(node);
        }

        let mut value = -Score::INF;
        for mv in moves {
            match node
                .child(mv)
                .and_then(|child| self.min_value(&child, depth, ply + 1, alpha, beta))
            {
                Ok(score) => value = value.max(score),
                Err(e) => self.on_invalid_branch(e)?,
            }

            if self.config.pruning {
                alpha = alpha.max(value);
                if alpha >= beta {
                    break;
                }
            }
        }

        Ok(value)
    }

    /// A node where the opponent is to move, and picks the lowest-scoring child.
    fn min_value(
        &mut self,
        node: &Node,
        depth: usize,
        ply: usize,
        alpha: Score,
        mut beta: Score,
    ) -> Result<Score> {
        self.nodes += 1;

        if ply >= depth {
            return self.leaf(node);
        }

        let moves = node.legal_moves();
        if moves.is_empty() {
            return self.leaf(node);
        }

        let mut value = Score::INF;
        for mv in moves {
            match node
                .child(mv)
                .and_then(|child| self.max_value(&child, depth, ply + 1, alpha, beta))
            {
                Ok(score) => value = value.min(score),
                Err(e) => self.on_invalid_branch(e)?,
            }

            if self.config.pruning {
                beta = beta.min(value);
                if beta <= alpha {
                    break;
                }
            }
        }

        Ok(value)
    }
}

#[inline(always)]
fn send_info(info: UciInfo) {
    let resp = UciResponse::<String>::Info(Box::new(info));
    println!("{resp}");
}

/// Searches `game` and returns the move to play, if there is one.
///
/// Convenience wrapper over [`Search::run`].
pub fn best_move<E: Evaluator + ?Sized>(
    game: &Game,
    evaluator: &mut E,
    book: Option<&OpeningBook>,
    config: SearchConfig,
) -> Result<Option<Move>> {
    let mut search = Search::new(game, evaluator, config);
    if let Some(book) = book {
        search = search.with_book(book);
    }

    Ok(search.run()?.bestmove)
}
