/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use anyhow::{bail, Result};

use super::Square;

/// Represents the color of a player or piece.
///
/// White moves first, and therefore [`Color`] defaults to [`Color::White`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    #[default]
    White,
    Black,
}

impl Color {
    /// Number of color variants.
    pub const COUNT: usize = 2;

    /// An array of both colors, starting with White.
    #[inline(always)]
    pub const fn all() -> [Self; Self::COUNT] {
        [Self::White, Self::Black]
    }

    /// Returns this [`Color`]'s opponent.
    ///
    /// # Example
    /// ```
    /// # use gambit::Color;
    /// assert_eq!(Color::White.opponent(), Color::Black);
    /// assert_eq!(Color::Black.opponent(), Color::White);
    /// ```
    #[inline(always)]
    pub const fn opponent(&self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Returns `true` if this [`Color`] is White.
    #[inline(always)]
    pub const fn is_white(&self) -> bool {
        matches!(self, Self::White)
    }

    /// The rank on which this color's pieces start.
    #[inline(always)]
    pub const fn back_rank(&self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => 7,
        }
    }

    /// The rank on which this color's pawns start.
    #[inline(always)]
    pub const fn pawn_rank(&self) -> u8 {
        match self {
            Self::White => 1,
            Self::Black => 6,
        }
    }

    /// Direction this color's pawns advance in, as a rank offset.
    #[inline(always)]
    pub const fn forward(&self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    /// The FEN active-color token: `w` or `b`.
    #[inline(always)]
    pub const fn to_fen(&self) -> char {
        match self {
            Self::White => 'w',
            Self::Black => 'b',
        }
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "w" | "white" => Ok(Self::White),
            "b" | "black" => Ok(Self::Black),
            _ => bail!("Invalid color {s:?}: must be \"w\" or \"b\""),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::White => "white",
            Self::Black => "black",
        };
        write!(f, "{name}")
    }
}

/// The six kinds of chess pieces.
///
/// This is a closed set; all per-kind behavior is expressed as a `match` over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Number of piece variants.
    pub const COUNT: usize = 6;

    /// An array of all piece kinds, from Pawn to King.
    #[inline(always)]
    pub const fn all() -> [Self; Self::COUNT] {
        [
            Self::Pawn,
            Self::Knight,
            Self::Bishop,
            Self::Rook,
            Self::Queen,
            Self::King,
        ]
    }

    /// Letter used for this kind in move requests.
    ///
    /// The Knight is `H` here, which is why move requests and FEN disagree on that one piece.
    #[inline(always)]
    pub const fn abbr(&self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'H',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    /// Parses a move-request letter. Both `H` and `N` are accepted for the Knight, in either case.
    ///
    /// # Example
    /// ```
    /// # use gambit::PieceKind;
    /// assert_eq!(PieceKind::from_abbr('H').unwrap(), PieceKind::Knight);
    /// assert_eq!(PieceKind::from_abbr('n').unwrap(), PieceKind::Knight);
    /// assert!(PieceKind::from_abbr('x').is_err());
    /// ```
    pub fn from_abbr(abbr: char) -> Result<Self> {
        Ok(match abbr.to_ascii_uppercase() {
            'P' => Self::Pawn,
            'H' | 'N' => Self::Knight,
            'B' => Self::Bishop,
            'R' => Self::Rook,
            'Q' => Self::Queen,
            'K' => Self::King,
            _ => bail!("Invalid piece letter {abbr:?}"),
        })
    }

    /// Uppercase FEN letter for this kind (`N` for the Knight).
    #[inline(always)]
    pub const fn fen_char(&self) -> char {
        match self {
            Self::Knight => 'N',
            _ => self.abbr(),
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbr())
    }
}

/// A piece on the board.
///
/// `move_count` is the sole record of castling rights and double-push eligibility:
/// a King, Rook or Pawn that has never moved has a `move_count` of `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,

    /// Square this piece stands on. Always equal to the square the board stores it under.
    pub position: Square,

    /// Number of times this piece has been moved.
    pub move_count: u16,
}

impl Piece {
    /// Creates a new, unmoved [`Piece`] at `position`.
    #[inline(always)]
    pub const fn new(color: Color, kind: PieceKind, position: Square) -> Self {
        Self {
            color,
            kind,
            position,
            move_count: 0,
        }
    }

    /// Returns `true` if this piece has never moved.
    #[inline(always)]
    pub const fn is_unmoved(&self) -> bool {
        self.move_count == 0
    }

    /// FEN letter for this piece: uppercase for White, lowercase for Black.
    #[inline(always)]
    pub const fn fen_char(&self) -> char {
        let c = self.kind.fen_char();
        if self.color.is_white() {
            c
        } else {
            c.to_ascii_lowercase()
        }
    }

    /// Parses a FEN letter into a color and kind.
    pub fn from_fen_char(c: char) -> Result<(Color, PieceKind)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };

        let kind = match c.to_ascii_uppercase() {
            'P' => PieceKind::Pawn,
            'N' => PieceKind::Knight,
            'B' => PieceKind::Bishop,
            'R' => PieceKind::Rook,
            'Q' => PieceKind::Queen,
            'K' => PieceKind::King,
            _ => bail!("Invalid FEN piece {c:?}"),
        };

        Ok((color, kind))
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen_char())
    }
}
