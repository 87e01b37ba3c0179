/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{anyhow, bail, Result};

use super::{Board, PieceKind, Square};

/// A list of moves, as produced by legal move enumeration.
pub type MoveList = Vec<Move>;

/// The four ways a move can change the board.
///
/// Exactly one applies to any move; see [`Board::category_of`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveCategory {
    /// A piece relocates, possibly capturing whatever stood on the destination.
    Normal,

    /// The King moves two files and the Rook on that side jumps over it.
    Castle,

    /// A Pawn reaches the far rank and becomes a Queen.
    Promotion,

    /// A Pawn captures diagonally onto an empty square, removing the Pawn that just passed it.
    EnPassant,
}

/// A move, recorded as the tuple `(from, kind, to)`.
///
/// The piece kind is carried along so that the move can be validated against the board it is applied to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub kind: PieceKind,
    pub to: Square,
}

impl Move {
    /// Creates a new [`Move`] of a `kind` piece from `from` to `to`.
    #[inline(always)]
    pub const fn new(from: Square, kind: PieceKind, to: Square) -> Self {
        Self { from, kind, to }
    }

    /// Returns `true` if this is a King moving two files, which can only be a castle.
    #[inline(always)]
    pub const fn is_castle(&self) -> bool {
        matches!(self.kind, PieceKind::King) && self.from.distance_files(self.to) == 2
    }

    /// Returns `true` if this is a Pawn landing on either back rank.
    ///
    /// Pawns never move backwards, so whichever back rank they land on is the opponent's.
    #[inline(always)]
    pub const fn is_promotion(&self) -> bool {
        matches!(self.kind, PieceKind::Pawn) && (self.to.rank() == 0 || self.to.rank() == 7)
    }

    /// Returns `true` if this is a Pawn advancing two ranks.
    #[inline(always)]
    pub const fn is_double_push(&self) -> bool {
        matches!(self.kind, PieceKind::Pawn) && self.from.distance_ranks(self.to) == 2
    }

    /// Parses a move request: origin rank, origin file, piece letter, destination rank, destination file.
    ///
    /// Any non-alphanumeric characters act as separators,
    /// so both `"1 4 P 3 4"` and `"[(1, 4), 'P', (3, 4)]"` are accepted.
    ///
    /// # Example
    /// ```
    /// # use gambit::{Move, PieceKind, Square};
    /// let e2e4 = Move::from_request("1 4 P 3 4").unwrap();
    /// assert_eq!(e2e4, Move::new("e2".parse().unwrap(), PieceKind::Pawn, "e4".parse().unwrap()));
    ///
    /// let g1f3 = Move::from_request("[(0, 6), 'H', (2, 5)]").unwrap();
    /// assert_eq!(g1f3.kind, PieceKind::Knight);
    ///
    /// assert!(Move::from_request("1 4 P 3").is_err());
    /// ```
    pub fn from_request(request: &str) -> Result<Self> {
        let tokens: Vec<&str> = request
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let [from_rank, from_file, letter, to_rank, to_file] = tokens[..] else {
            bail!(
                "Invalid move request {request:?}: expected 5 tokens (rank file piece rank file), got {}",
                tokens.len()
            );
        };

        let coord = |token: &str| -> Result<u8> {
            token
                .parse::<u8>()
                .map_err(|_| anyhow!("Invalid coordinate {token:?} in move request {request:?}"))
        };

        let mut letters = letter.chars();
        let (Some(letter), None) = (letters.next(), letters.next()) else {
            bail!("Invalid piece letter {letter:?} in move request {request:?}");
        };

        Ok(Self::new(
            Square::new(coord(from_rank)?, coord(from_file)?)?,
            PieceKind::from_abbr(letter)?,
            Square::new(coord(to_rank)?, coord(to_file)?)?,
        ))
    }

    /// Formats this move as a move request, like `"1 4 P 3 4"`.
    pub fn to_request(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.from.rank(),
            self.from.file(),
            self.kind.abbr(),
            self.to.rank(),
            self.to.file()
        )
    }

    /// Creates a [`Move`] from [Universal Chess Interface](https://en.wikipedia.org//wiki/Universal_Chess_Interface) notation,
    /// looking up the moving piece on `board`.
    ///
    /// A trailing promotion letter is accepted but ignored, since Pawns always promote to a Queen.
    ///
    /// # Example
    /// ```
    /// # use gambit::{Board, Move, PieceKind};
    /// let board = Board::default();
    /// let mv = Move::from_uci(&board, "g1f3").unwrap();
    /// assert_eq!(mv.kind, PieceKind::Knight);
    ///
    /// assert!(Move::from_uci(&board, "e4e5").is_err());
    /// ```
    pub fn from_uci(board: &Board, uci: &str) -> Result<Self> {
        let from = uci
            .get(0..2)
            .ok_or(anyhow!("Move str must contain a `from` square. Got {uci:?}"))?;
        let to = uci
            .get(2..4)
            .ok_or(anyhow!("Move str must contain a `to` square. Got {uci:?}"))?;

        let from: Square = from.parse()?;
        let to: Square = to.parse()?;

        if let Some(promotion) = uci.get(4..) {
            if !promotion.is_empty() {
                PieceKind::from_abbr(promotion.chars().next().unwrap_or('?'))?;
            }
        }

        let piece = board
            .piece_at(from)
            .ok_or(anyhow!("No piece found at {from} when parsing {uci:?}"))?;

        Ok(Self::new(from, piece.kind, to))
    }
}

impl fmt::Display for Move {
    /// A [`Move`] is displayed in its UCI format, with a `q` suffix on promotions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_promotion() {
            write!(f, "{}{}q", self.from, self.to)
        } else {
            write!(f, "{}{}", self.from, self.to)
        }
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({})", self.to_request())
    }
}

/// The minimum history a piece needs to know about to generate its moves:
/// the move that was played immediately before, used for en passant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MoveContext {
    pub last_move: Option<Move>,
}

impl MoveContext {
    /// A context with no previous move, as at the start of a game.
    pub const NONE: Self = Self { last_move: None };

    /// The context that holds right after `mv` was played.
    #[inline(always)]
    pub const fn after(mv: Move) -> Self {
        Self {
            last_move: Some(mv),
        }
    }

    /// If the previous move was a Pawn double push, returns the square that Pawn now stands on.
    #[inline(always)]
    pub fn double_pushed_pawn(&self) -> Option<Square> {
        self.last_move
            .filter(|mv| mv.is_double_push())
            .map(|mv| mv.to)
    }

    /// The square a Pawn would capture onto by en passant, if the previous move allows one.
    ///
    /// This is the square the double-pushed Pawn skipped over.
    pub fn en_passant_target(&self) -> Option<Square> {
        let mv = self.last_move.filter(|mv| mv.is_double_push())?;
        let rank = (mv.from.rank() + mv.to.rank()) / 2;
        Square::new(rank, mv.to.file()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip_uses_internal_knight_letter() {
        let mv = Move::from_request("0 1 N 2 2").unwrap();
        assert_eq!(mv.to_request(), "0 1 H 2 2");
        assert_eq!(mv.to_string(), "b1c3");
    }

    #[test]
    fn test_request_rejects_bad_tokens() {
        assert!(Move::from_request("").is_err());
        assert!(Move::from_request("1 4 X 3 4").is_err());
        assert!(Move::from_request("1 4 PP 3 4").is_err());
        assert!(Move::from_request("1 9 P 3 4").is_err());
        assert!(Move::from_request("1 4 P 3 4 5").is_err());
    }

    #[test]
    fn test_en_passant_target() {
        let e2e4 = Move::from_request("1 4 P 3 4").unwrap();
        let ctx = MoveContext::after(e2e4);
        assert_eq!(ctx.en_passant_target().unwrap().to_string(), "e3");
        assert_eq!(ctx.double_pushed_pawn().unwrap().to_string(), "e4");

        let e2e3 = Move::from_request("1 4 P 2 4").unwrap();
        assert_eq!(MoveContext::after(e2e3).en_passant_target(), None);
        assert_eq!(MoveContext::NONE.en_passant_target(), None);
    }

    #[test]
    fn test_promotion_display() {
        let mv = Move::from_request("6 0 P 7 0").unwrap();
        assert!(mv.is_promotion());
        assert_eq!(mv.to_string(), "a7a8q");
    }
}
