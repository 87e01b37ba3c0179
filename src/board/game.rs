/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};

use super::{
    in_check, is_legal, legal_moves, legal_moves_from, Board, Color, Move, MoveCategory,
    MoveContext, MoveList, PieceKind, Square,
};

/// The occupancy of every square plus the side to move, used to detect repeated positions.
///
/// Move counts are deliberately absent: two positions repeat if the same kinds of pieces
/// stand on the same squares with the same player to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Snapshot {
    cells: [Option<(Color, PieceKind)>; Square::COUNT],
    turn: Color,
}

impl Snapshot {
    /// Takes a snapshot of `board` with `turn` to move.
    pub fn new(board: &Board, turn: Color) -> Self {
        let mut cells = [None; Square::COUNT];
        for piece in board.pieces() {
            cells[piece.position.index()] = Some((piece.color, piece.kind));
        }

        Self { cells, turn }
    }
}

/// How a game currently stands, from the point of view of the side to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// The side to move has legal moves and is not in check.
    Ongoing,

    /// The side to move is in check, but can escape.
    Check,

    /// The side to move is in check and has no legal moves.
    Checkmate,

    /// The side to move is not in check and has no legal moves.
    Stalemate,

    /// The current position has occurred at least three times.
    Repetition,
}

impl GameStatus {
    /// Returns `true` if no more moves can be played.
    #[inline(always)]
    pub const fn is_over(&self) -> bool {
        matches!(self, Self::Checkmate | Self::Stalemate | Self::Repetition)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            Self::Ongoing => "ongoing",
            Self::Check => "check",
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::Repetition => "threefold repetition",
        };
        write!(f, "{status}")
    }
}

/// The authoritative state of a game of chess.
///
/// Unlike a [`Board`], which only knows where pieces stand, a [`Game`] tracks whose turn it is,
/// the previous move, the move clocks, and every position reached so far.
/// All of that bookkeeping happens in [`Game::make_move`] and nowhere else;
/// scratch boards explored by legality testing and search never touch it.
#[derive(Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: Color,
    last_move: Option<Move>,
    halfmove_clock: u32,
    fullmove_number: u32,

    /// Every position reached in this game, including the one it started from.
    history: Vec<Snapshot>,
}

impl Game {
    /// Creates a new game in the standard starting position, with White to move.
    pub fn new() -> Self {
        Self::from_board(Board::starting(), Color::White)
    }

    /// Creates a new game from `board`, with `turn` to move and clean clocks.
    pub fn from_board(board: Board, turn: Color) -> Self {
        Self {
            board,
            turn,
            last_move: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            history: vec![Snapshot::new(&board, turn)],
        }
    }

    /// Creates a new game from a FEN string.
    ///
    /// Missing trailing fields default to White to move, no castling, no en passant, and clocks of `0 1`.
    /// An en passant target square is recorded as the Pawn double push that produced it.
    ///
    /// # Example
    /// ```
    /// # use gambit::{Color, Game};
    /// let game = Game::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
    /// assert_eq!(game.turn(), Color::Black);
    /// assert_eq!(game.last_move().unwrap().to_string(), "e2e4");
    /// ```
    pub fn from_fen(fen: &str) -> Result<Self> {
        let board = Board::from_fen(fen)?;

        let mut fields = fen.split_ascii_whitespace().skip(1);
        let turn = fields.next().unwrap_or("w").parse()?;
        let _castling = fields.next();
        let last_move = match fields.next() {
            None | Some("-") => None,
            Some(target) => Some(Self::move_for_en_passant_target(&board, target)?),
        };

        let halfmove_clock = fields
            .next()
            .map(|s| s.parse::<u32>().context("Invalid halfmove clock"))
            .transpose()?
            .unwrap_or(0);
        let fullmove_number = fields
            .next()
            .map(|s| s.parse::<u32>().context("Invalid fullmove number"))
            .transpose()?
            .unwrap_or(1);

        Ok(Self {
            last_move,
            halfmove_clock,
            fullmove_number,
            ..Self::from_board(board, turn)
        })
    }

    /// Reconstructs the double push that left an en passant target on `target`.
    fn move_for_en_passant_target(board: &Board, target: &str) -> Result<Move> {
        let target: Square = target.parse()?;

        let (from_rank, to_rank) = match target.rank() {
            2 => (1, 3),
            5 => (6, 4),
            _ => bail!("Invalid en passant target {target}: must be on the 3rd or 6th rank"),
        };

        let from = Square::from_coords_unchecked(from_rank, target.file());
        let to = Square::from_coords_unchecked(to_rank, target.file());

        if !board
            .piece_at(to)
            .is_some_and(|p| p.kind == PieceKind::Pawn)
        {
            bail!("Invalid en passant target {target}: no pawn on {to}");
        }

        Ok(Move::new(from, PieceKind::Pawn, to))
    }

    /// The current board.
    #[inline(always)]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// The color whose turn it is.
    #[inline(always)]
    pub const fn turn(&self) -> Color {
        self.turn
    }

    /// The move that was played last, if any.
    #[inline(always)]
    pub const fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    #[inline(always)]
    pub const fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[inline(always)]
    pub const fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Number of positions reached so far, including the starting one.
    #[inline(always)]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The move context for generating moves in the current position.
    #[inline(always)]
    pub const fn context(&self) -> MoveContext {
        MoveContext {
            last_move: self.last_move,
        }
    }

    /// Full FEN encoding of the current position.
    pub fn to_fen(&self) -> String {
        self.board.to_fen(
            self.turn,
            &self.context(),
            self.halfmove_clock,
            self.fullmove_number,
        )
    }

    /// The non-clock encoding of the current position, as used by opening tables.
    pub fn key(&self) -> String {
        self.board.key(self.turn)
    }

    /// All legal moves for the side to move.
    #[inline(always)]
    pub fn legal_moves(&self) -> MoveList {
        legal_moves(&self.board, self.turn, &self.context())
    }

    /// All legal moves of the piece on `square`, regardless of whose turn it is.
    #[inline(always)]
    pub fn legal_moves_from(&self, square: Square) -> MoveList {
        legal_moves_from(&self.board, square, &self.context())
    }

    /// Returns `true` if `mv` may be played by the side to move.
    ///
    /// The origin must hold a piece of the side to move whose kind matches `mv.kind`.
    pub fn is_legal(&self, mv: Move) -> bool {
        self.board.piece_at(mv.from).is_some_and(|piece| {
            piece.color == self.turn
                && piece.kind == mv.kind
                && is_legal(&piece, mv.to, &self.board, &self.context())
        })
    }

    /// Returns `true` if the side to move is in check.
    #[inline(always)]
    pub fn in_check(&self) -> bool {
        in_check(&self.board, self.turn, &self.context())
    }

    /// Returns `true` if the side to move is in check and cannot escape it.
    pub fn is_checkmate(&self) -> bool {
        self.in_check() && self.legal_moves().is_empty()
    }

    /// Returns `true` if the game is drawn, either because the side to move has no legal moves
    /// while not in check, or because the current position has occurred three times.
    ///
    /// Both outcomes are reported through this one predicate; use [`Game::status`] to tell them apart.
    pub fn is_stalemate(&self) -> bool {
        (!self.in_check() && self.legal_moves().is_empty()) || self.is_repetition()
    }

    /// Returns `true` if the current position has occurred at least three times in this game.
    pub fn is_repetition(&self) -> bool {
        let current = Snapshot::new(&self.board, self.turn);
        self.history.iter().filter(|&&s| s == current).count() >= 3
    }

    /// Determines the status of the game for the side to move.
    pub fn status(&self) -> GameStatus {
        let in_check = self.in_check();

        if self.legal_moves().is_empty() {
            if in_check {
                GameStatus::Checkmate
            } else {
                GameStatus::Stalemate
            }
        } else if self.is_repetition() {
            GameStatus::Repetition
        } else if in_check {
            GameStatus::Check
        } else {
            GameStatus::Ongoing
        }
    }

    /// Applies `mv` to the game and performs all bookkeeping: the turn flips, `mv` becomes the last move,
    /// the clocks advance, and the new position is appended to the history.
    ///
    /// The move's legality is *not* checked; see [`Game::play`] for that.
    /// If the move cannot be applied to the board at all, an error is returned and the game is left untouched.
    pub fn make_move(&mut self, mv: Move) -> Result<MoveCategory> {
        let before = self.board.piece_count();
        let category = self.board.make_move(mv)?;
        let captured = self.board.piece_count() != before;

        if captured || mv.kind == PieceKind::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if !self.turn.is_white() {
            self.fullmove_number += 1;
        }

        self.turn = self.turn.opponent();
        self.last_move = Some(mv);
        self.history.push(Snapshot::new(&self.board, self.turn));

        Ok(category)
    }

    /// Plays `mv` if it is legal for the side to move, returning an error and leaving the game untouched otherwise.
    pub fn play(&mut self, mv: Move) -> Result<MoveCategory> {
        let piece = self
            .board
            .piece_at(mv.from)
            .ok_or(anyhow!("Illegal move {mv:?}: no piece on {}", mv.from))?;

        if piece.color != self.turn {
            bail!("Illegal move {mv:?}: it is {}'s turn", self.turn);
        }

        if piece.kind != mv.kind {
            bail!(
                "Illegal move {mv:?}: the piece on {} is a {}, not a {}",
                mv.from,
                piece.kind,
                mv.kind
            );
        }

        if !is_legal(&piece, mv.to, &self.board, &self.context()) {
            bail!("Illegal move {mv:?}");
        }

        self.make_move(mv)
    }

    /// Parses a move request (origin rank, origin file, piece letter, destination rank, destination file)
    /// and plays it if it is legal.
    ///
    /// # Example
    /// ```
    /// # use gambit::Game;
    /// let mut game = Game::new();
    /// assert!(game.play_request("1 4 P 3 4").is_ok());
    /// assert!(game.play_request("1 3 P 3 3").is_err()); // Black's turn
    /// ```
    pub fn play_request(&mut self, request: &str) -> Result<Move> {
        let mv = Move::from_request(request)?;
        self.play(mv)?;
        Ok(mv)
    }

    /// Plays a move given in UCI notation, like `e2e4`.
    pub fn play_uci(&mut self, uci: &str) -> Result<Move> {
        let mv = Move::from_uci(&self.board, uci)?;
        self.play(mv)?;
        Ok(mv)
    }

    /// Discards this game, returning to the standard starting position.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Game {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Game {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.board)?;
        writeln!(f)?;
        writeln!(f, "FEN: {}", self.to_fen())?;
        write!(f, "{} to move", self.turn)
    }
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FEN_STARTPOS;

    #[test]
    fn test_new_game_matches_startpos_fen() {
        let game = Game::new();
        assert_eq!(game.to_fen(), FEN_STARTPOS);
        assert_eq!(game, Game::from_fen(FEN_STARTPOS).unwrap());
    }

    #[test]
    fn test_clocks() {
        let mut game = Game::new();

        game.play_request("0 6 H 2 5").unwrap(); // Nf3
        assert_eq!(game.halfmove_clock(), 1);
        assert_eq!(game.fullmove_number(), 1);

        game.play_request("7 6 H 5 5").unwrap(); // Nf6
        assert_eq!(game.halfmove_clock(), 2);
        assert_eq!(game.fullmove_number(), 2);

        game.play_request("1 4 P 3 4").unwrap(); // e4
        assert_eq!(game.halfmove_clock(), 0);

        game.play_request("5 5 H 3 4").unwrap(); // Nxe4
        assert_eq!(game.halfmove_clock(), 0);
        assert_eq!(game.fullmove_number(), 3);
        assert_eq!(game.history_len(), 5);
    }

    #[test]
    fn test_illegal_request_leaves_game_untouched() {
        let mut game = Game::new();
        let before = game.clone();

        // Wrong letter, wrong color, and an impossible destination
        assert!(game.play_request("1 4 Q 3 4").is_err());
        assert!(game.play_request("6 4 P 4 4").is_err());
        assert!(game.play_request("1 4 P 4 4").is_err());
        assert!(game.play_request("not a move").is_err());

        assert_eq!(game, before);
    }

    #[test]
    fn test_en_passant_field_round_trips() {
        let fen = "rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 3";
        let game = Game::from_fen(fen).unwrap();
        assert_eq!(game.to_fen(), fen);

        // Black's d4 pawn may capture on e3
        let exd3: Vec<String> = game
            .legal_moves_from("d4".parse().unwrap())
            .into_iter()
            .map(|mv| mv.to_string())
            .collect();
        assert!(exd3.contains(&String::from("d4e3")));
    }

    #[test]
    fn test_bad_en_passant_field() {
        assert!(Game::from_fen("4k3/8/8/8/8/8/8/4K3 w - e4 0 1").is_err());
        assert!(Game::from_fen("4k3/8/8/8/8/8/8/4K3 w - e3 0 1").is_err());
    }

    #[test]
    fn test_status_of_stalemate() {
        let game = Game::from_fen("k7/8/KQ6/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(game.status(), GameStatus::Stalemate);
        assert!(game.is_stalemate());
        assert!(!game.is_checkmate());
    }
}
