/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{bail, Context, Result};

use super::{Color, Move, MoveCategory, MoveContext, Piece, PieceKind, Square};

/// FEN string for the starting position of chess.
pub const FEN_STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Back-rank layout of the standard starting position, from the `a` file to the `h` file.
const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// File the King starts on.
const KING_FILE: u8 = 4;

/// A chess board: a total mapping of all 64 squares to an optional [`Piece`].
///
/// A [`Board`] is a plain value. Copying it produces an independent scratch board,
/// so hypothetical moves can be explored with [`Board::with_move_made`] without ever touching the original.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [Option<Piece>; Square::COUNT],
}

impl Board {
    /// Creates a board with no pieces on it.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            squares: [None; Square::COUNT],
        }
    }

    /// Creates a board in the standard starting position.
    pub fn starting() -> Self {
        let mut board = Self::new();

        for (file, kind) in BACK_RANK.into_iter().enumerate() {
            let file = file as u8;
            for color in Color::all() {
                board.place(color, kind, Square::from_coords_unchecked(color.back_rank(), file));
                board.place(
                    color,
                    PieceKind::Pawn,
                    Square::from_coords_unchecked(color.pawn_rank(), file),
                );
            }
        }

        board
    }

    /// Constructs a [`Board`] from the placement and castling fields of a FEN string.
    ///
    /// Only the first field is required. Move counts are inferred:
    /// Pawns off their starting rank and Kings/Rooks without a matching castling right count as having moved.
    ///
    /// Exactly one King of each color must be present.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let mut fields = fen.split_ascii_whitespace();
        let placements = fields.next().context("FEN string is empty")?;
        // Skip the side-to-move field to get to castling rights
        let castling = fields.nth(1).unwrap_or("-");

        if placements.matches('/').count() != 7 {
            bail!("FEN must have piece placements for all 8 ranks. Got {placements:?}");
        }

        let mut board = Self::new();

        // Ranks are listed from 8 down to 1
        for (rank, row) in placements.split('/').rev().enumerate() {
            let rank = rank as u8;
            let mut file = 0;

            for c in row.chars() {
                if let Some(empty) = c.to_digit(10) {
                    file += empty as u8;
                    continue;
                }

                if file > 7 {
                    bail!("Rank {} of FEN {placements:?} has more than 8 files", rank + 1);
                }

                let (color, kind) = Piece::from_fen_char(c)?;
                board.place(color, kind, Square::from_coords_unchecked(rank, file));
                file += 1;
            }

            if file != 8 {
                bail!("Rank {} of FEN {placements:?} does not span 8 files", rank + 1);
            }
        }

        for color in Color::all() {
            let kings = board
                .pieces_of(color)
                .filter(|p| p.kind == PieceKind::King)
                .count();
            if kings != 1 {
                bail!("FEN {placements:?} must have exactly one {color} king. Found {kings}");
            }
        }

        board.infer_move_counts(castling)?;
        Ok(board)
    }

    /// Marks pieces as moved or unmoved according to their squares and the FEN castling field.
    fn infer_move_counts(&mut self, castling: &str) -> Result<()> {
        if castling != "-" {
            if let Some(bad) = castling.chars().find(|c| !"KQkq".contains(*c)) {
                bail!("Invalid castling rights {castling:?}: unexpected {bad:?}");
            }
        }

        let has_right = |color: Color, file: u8| {
            let c = if file == 7 { 'K' } else { 'Q' };
            let c = if color.is_white() {
                c
            } else {
                c.to_ascii_lowercase()
            };
            castling.contains(c)
        };

        for piece in self.squares.iter_mut().flatten() {
            let (rank, file) = (piece.position.rank(), piece.position.file());
            let home = rank == piece.color.back_rank();

            let unmoved = match piece.kind {
                PieceKind::Pawn => rank == piece.color.pawn_rank(),
                PieceKind::King => {
                    home && file == KING_FILE
                        && (has_right(piece.color, 0) || has_right(piece.color, 7))
                }
                PieceKind::Rook => home && (file == 0 || file == 7) && has_right(piece.color, file),
                _ => true,
            };

            piece.move_count = if unmoved { 0 } else { 1 };
        }

        Ok(())
    }

    /// Places a new, unmoved piece on `square`, replacing anything already there.
    #[inline(always)]
    pub fn place(&mut self, color: Color, kind: PieceKind, square: Square) {
        self.squares[square.index()] = Some(Piece::new(color, kind, square));
    }

    /// Places `piece` on `square`, updating its position to match.
    #[inline(always)]
    pub fn place_piece(&mut self, mut piece: Piece, square: Square) {
        piece.position = square;
        self.squares[square.index()] = Some(piece);
    }

    /// Removes and returns the piece on `square`, if there is one.
    #[inline(always)]
    pub fn take(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.index()].take()
    }

    /// Fetches the piece on `square`, if there is one.
    #[inline(always)]
    pub const fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    /// Returns `true` if there is no piece on `square`.
    #[inline(always)]
    pub const fn is_empty(&self, square: Square) -> bool {
        self.squares[square.index()].is_none()
    }

    /// Iterates over every piece on the board, in square order starting at `a1`.
    #[inline(always)]
    pub fn pieces(&self) -> impl Iterator<Item = Piece> + '_ {
        self.squares.iter().flatten().copied()
    }

    /// Iterates over every piece of `color`, in square order starting at `a1`.
    #[inline(always)]
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = Piece> + '_ {
        self.pieces().filter(move |p| p.color == color)
    }

    /// Number of pieces of either color on the board.
    #[inline(always)]
    pub fn piece_count(&self) -> usize {
        self.squares.iter().flatten().count()
    }

    /// The square of `color`'s King, if it is on the board.
    #[inline(always)]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces_of(color)
            .find(|p| p.kind == PieceKind::King)
            .map(|p| p.position)
    }

    /// Determines which of the four kinds of board change `mv` makes.
    pub fn category_of(&self, mv: Move) -> MoveCategory {
        if mv.is_castle() {
            MoveCategory::Castle
        } else if mv.is_promotion() {
            MoveCategory::Promotion
        } else if mv.kind == PieceKind::Pawn
            && mv.from.distance_files(mv.to) == 1
            && self.is_empty(mv.to)
        {
            MoveCategory::EnPassant
        } else {
            MoveCategory::Normal
        }
    }

    /// Returns a copy of this board with `mv` applied, leaving `self` untouched.
    #[inline(always)]
    pub fn with_move_made(&self, mv: Move) -> Result<Self> {
        let mut board = *self;
        board.make_move(mv)?;
        Ok(board)
    }

    /// Applies `mv` to this board.
    ///
    /// This only relocates pieces; it knows nothing about turns or clocks.
    /// Legality is not checked, but the move must make sense on this board:
    /// the origin must hold a piece of the move's kind, nothing may capture its own color or a King,
    /// and castling and en passant need their second piece in place.
    /// If any of that fails, an error is returned and the board is left unchanged.
    pub fn make_move(&mut self, mv: Move) -> Result<MoveCategory> {
        let Some(mut piece) = self.piece_at(mv.from) else {
            bail!("Cannot apply {mv:?}: no piece on {}", mv.from);
        };

        if piece.kind != mv.kind {
            bail!(
                "Cannot apply {mv:?}: piece on {} is a {:?}, not a {:?}",
                mv.from,
                piece.kind,
                mv.kind
            );
        }

        if mv.from == mv.to {
            bail!("Cannot apply {mv:?}: origin and destination are the same square");
        }

        if let Some(target) = self.piece_at(mv.to) {
            if target.color == piece.color {
                bail!("Cannot apply {mv:?}: {} is occupied by a friendly piece", mv.to);
            }
            if target.kind == PieceKind::King {
                bail!("Cannot apply {mv:?}: kings are never captured");
            }
        }

        let category = self.category_of(mv);
        match category {
            MoveCategory::Castle => {
                let rank = mv.from.rank();
                let (rook_from, rook_to) = if mv.to.file() > mv.from.file() {
                    (7, mv.to.file() - 1)
                } else {
                    (0, mv.to.file() + 1)
                };
                let rook_from = Square::from_coords_unchecked(rank, rook_from);
                let rook_to = Square::from_coords_unchecked(rank, rook_to);

                match self.piece_at(rook_from) {
                    Some(rook) if rook.kind == PieceKind::Rook && rook.color == piece.color => {}
                    _ => bail!("Cannot castle with {mv:?}: no {} rook on {rook_from}", piece.color),
                }

                self.take(mv.from);
                piece.move_count += 1;
                self.place_piece(piece, mv.to);

                if let Some(rook) = self.take(rook_from) {
                    self.place_piece(rook, rook_to);
                }
            }

            MoveCategory::Promotion => {
                self.take(mv.from);
                let mut queen = Piece::new(piece.color, PieceKind::Queen, mv.to);
                queen.move_count = piece.move_count + 1;
                self.place_piece(queen, mv.to);
            }

            MoveCategory::EnPassant => {
                // The captured pawn sits beside the origin, on the destination's file
                let captured = Square::from_coords_unchecked(mv.from.rank(), mv.to.file());
                match self.piece_at(captured) {
                    Some(p) if p.kind == PieceKind::Pawn && p.color != piece.color => {}
                    _ => bail!("Cannot capture en passant with {mv:?}: no enemy pawn on {captured}"),
                }

                self.take(mv.from);
                self.take(captured);
                piece.move_count += 1;
                self.place_piece(piece, mv.to);
            }

            MoveCategory::Normal => {
                self.take(mv.from);
                piece.move_count += 1;
                self.place_piece(piece, mv.to);
            }
        }

        Ok(category)
    }

    /// Generates the piece-placement field of a FEN string, listing rank 8 first.
    pub fn placement_fen(&self) -> String {
        let mut ranks = Vec::with_capacity(8);

        for rank in (0..8).rev() {
            let mut row = String::with_capacity(8);
            let mut empty = 0;

            for file in 0..8 {
                match self.piece_at(Square::from_coords_unchecked(rank, file)) {
                    Some(piece) => {
                        if empty != 0 {
                            row.push_str(&empty.to_string());
                            empty = 0;
                        }
                        row.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }

            if empty != 0 {
                row.push_str(&empty.to_string());
            }
            ranks.push(row);
        }

        ranks.join("/")
    }

    /// Generates the FEN castling-availability field by scanning for unmoved Kings and Rooks.
    ///
    /// Returns `-` if neither side can castle.
    pub fn castling_rights(&self) -> String {
        let mut rights = String::with_capacity(4);

        for color in Color::all() {
            let rank = color.back_rank();
            let king = self.piece_at(Square::from_coords_unchecked(rank, KING_FILE));
            let king_unmoved = king.is_some_and(|k| {
                k.kind == PieceKind::King && k.color == color && k.is_unmoved()
            });
            if !king_unmoved {
                continue;
            }

            for (file, token) in [(7, 'K'), (0, 'Q')] {
                let rook = self.piece_at(Square::from_coords_unchecked(rank, file));
                if rook.is_some_and(|r| r.kind == PieceKind::Rook && r.color == color && r.is_unmoved())
                {
                    rights.push(if color.is_white() {
                        token
                    } else {
                        token.to_ascii_lowercase()
                    });
                }
            }
        }

        if rights.is_empty() {
            rights.push('-');
        }
        rights
    }

    /// The position encoding without clocks: placement, active color and castling rights.
    ///
    /// This is the key used by opening tables.
    pub fn key(&self, turn: Color) -> String {
        format!(
            "{} {} {}",
            self.placement_fen(),
            turn.to_fen(),
            self.castling_rights()
        )
    }

    /// The full FEN encoding of this board, as handed to an evaluator.
    pub fn to_fen(&self, turn: Color, ctx: &MoveContext, halfmove: u32, fullmove: u32) -> String {
        let ep = ctx
            .en_passant_target()
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| String::from("-"));

        format!("{} {ep} {halfmove} {fullmove}", self.key(turn))
    }
}

impl Default for Board {
    /// The default board is the standard starting position.
    #[inline(always)]
    fn default() -> Self {
        Self::starting()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{}| ", rank + 1)?;

            for file in 0..8 {
                let occupant = self
                    .piece_at(Square::from_coords_unchecked(rank, file))
                    .map(|p| p.fen_char())
                    .unwrap_or('.');
                write!(f, "{occupant} ")?;
            }
            writeln!(f)?;
        }

        writeln!(f, " +{}", "--".repeat(8))?;
        write!(f, "   a b c d e f g h")
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.placement_fen())
    }
}
