/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::{Board, Color, Move, MoveContext, MoveList, Piece, PieceKind, Square, SquareSet};

/// `(rank, file)` offsets of a Knight's jumps.
const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

/// `(rank, file)` directions a Bishop slides in.
const BISHOP_DELTAS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// `(rank, file)` directions a Rook slides in.
const ROOK_DELTAS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// `(rank, file)` directions a Queen slides in, and a King steps in.
const QUEEN_DELTAS: [(i8, i8); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// Computes every destination `piece` could move to on `board`, ignoring whether its own King is left in check.
///
/// `ctx` supplies the previous move, which is needed for en passant.
/// King destinations are already filtered to squares the opponent does not attack.
pub fn pseudo_moves(piece: &Piece, board: &Board, ctx: &MoveContext) -> SquareSet {
    match piece.kind {
        PieceKind::Pawn => pawn_moves(piece, board, ctx),
        PieceKind::Knight => step_moves(piece, board, &KNIGHT_DELTAS),
        PieceKind::Bishop => slider_moves(piece, board, &BISHOP_DELTAS),
        PieceKind::Rook => slider_moves(piece, board, &ROOK_DELTAS),
        PieceKind::Queen => slider_moves(piece, board, &QUEEN_DELTAS),
        PieceKind::King => king_moves(piece, board, ctx),
    }
}

/// Returns `true` if `square` is empty or holds a piece that is not `color`.
#[inline(always)]
fn is_enemy_or_empty(board: &Board, square: Square, color: Color) -> bool {
    board.piece_at(square).map_or(true, |p| p.color != color)
}

/// Destinations reachable in a single jump by each of `deltas`.
fn step_moves(piece: &Piece, board: &Board, deltas: &[(i8, i8)]) -> SquareSet {
    deltas
        .iter()
        .filter_map(|&(dr, df)| piece.position.offset(dr, df))
        .filter(|&to| is_enemy_or_empty(board, to, piece.color))
        .collect()
}

/// Casts a ray in each of `deltas`, stopping at the edge of the board or the first occupied square.
///
/// The occupied square is included only if it holds an enemy.
fn slider_moves(piece: &Piece, board: &Board, deltas: &[(i8, i8)]) -> SquareSet {
    let mut moves = SquareSet::EMPTY;

    for &(dr, df) in deltas {
        let mut current = piece.position;
        while let Some(to) = current.offset(dr, df) {
            match board.piece_at(to) {
                Some(blocker) => {
                    if blocker.color != piece.color {
                        moves.insert(to);
                    }
                    break;
                }
                None => moves.insert(to),
            }
            current = to;
        }
    }

    moves
}

fn pawn_moves(piece: &Piece, board: &Board, ctx: &MoveContext) -> SquareSet {
    let mut moves = SquareSet::EMPTY;
    let forward = piece.color.forward();

    // Single push, then double push through the same empty square
    if let Some(one) = piece.position.offset(forward, 0) {
        if board.is_empty(one) {
            moves.insert(one);

            if piece.is_unmoved() {
                if let Some(two) = one.offset(forward, 0) {
                    if board.is_empty(two) {
                        moves.insert(two);
                    }
                }
            }
        }
    }

    // Diagonal captures only onto enemy pieces
    for df in [-1, 1] {
        if let Some(to) = piece.position.offset(forward, df) {
            if board.piece_at(to).is_some_and(|p| p.color != piece.color) {
                moves.insert(to);
            }
        }
    }

    // En passant: the previous move was a double push that landed right beside this pawn
    if let Some(passed) = ctx.double_pushed_pawn() {
        let beside = passed.rank() == piece.position.rank()
            && passed.distance_files(piece.position) == 1;
        let is_enemy_pawn = board
            .piece_at(passed)
            .is_some_and(|p| p.kind == PieceKind::Pawn && p.color != piece.color);

        if beside && is_enemy_pawn {
            let df = passed.file() as i8 - piece.position.file() as i8;
            if let Some(to) = piece.position.offset(forward, df) {
                if board.is_empty(to) {
                    moves.insert(to);
                }
            }
        }
    }

    moves
}

fn king_moves(piece: &Piece, board: &Board, ctx: &MoveContext) -> SquareSet {
    let enemy = piece.color.opponent();
    let mut moves = SquareSet::EMPTY;

    // Each step is simulated on a scratch board and kept only if the King would not be attacked there
    for to in step_moves(piece, board, &QUEEN_DELTAS) {
        if !is_attacked(&king_stepped_to(board, piece, to), to, enemy, ctx) {
            moves.insert(to);
        }
    }

    moves | castling_moves(piece, board, ctx)
}

/// A scratch copy of `board` where `king` has been lifted and set down on `to`.
#[inline(always)]
fn king_stepped_to(board: &Board, king: &Piece, to: Square) -> Board {
    let mut scratch = *board;
    scratch.take(king.position);
    scratch.place_piece(*king, to);
    scratch
}

/// Castling destinations for an unmoved King.
///
/// Requires an unmoved friendly Rook in the corner, empty squares strictly between the two,
/// and that the King is neither in check nor passes through an attacked square.
fn castling_moves(king: &Piece, board: &Board, ctx: &MoveContext) -> SquareSet {
    let mut moves = SquareSet::EMPTY;
    let rank = king.color.back_rank();

    if !king.is_unmoved() || king.position != Square::from_coords_unchecked(rank, 4) {
        return moves;
    }

    let enemy = king.color.opponent();
    if is_attacked(board, king.position, enemy, ctx) {
        return moves;
    }

    // (rook file, files strictly between, square the king passes over, king destination)
    let sides: [(u8, &[u8], u8, u8); 2] = [(7, &[5, 6], 5, 6), (0, &[1, 2, 3], 3, 2)];

    for (rook_file, between, transit, dest) in sides {
        let corner = Square::from_coords_unchecked(rank, rook_file);
        let rook_ready = board.piece_at(corner).is_some_and(|r| {
            r.kind == PieceKind::Rook && r.color == king.color && r.is_unmoved()
        });
        if !rook_ready {
            continue;
        }

        let path_clear = between
            .iter()
            .all(|&file| board.is_empty(Square::from_coords_unchecked(rank, file)));
        if !path_clear {
            continue;
        }

        let transit = Square::from_coords_unchecked(rank, transit);
        if is_attacked(&king_stepped_to(board, king, transit), transit, enemy, ctx) {
            continue;
        }

        moves.insert(Square::from_coords_unchecked(rank, dest));
    }

    moves
}

/// Every square `color` attacks on `board`.
///
/// This is the union of the pseudo-moves of every non-King piece of `color`,
/// plus the squares adjacent to `color`'s King.
pub fn attacked_squares(board: &Board, color: Color, ctx: &MoveContext) -> SquareSet {
    let mut attacks = SquareSet::EMPTY;

    for piece in board.pieces_of(color) {
        attacks |= match piece.kind {
            PieceKind::King => QUEEN_DELTAS
                .iter()
                .filter_map(|&(dr, df)| piece.position.offset(dr, df))
                .collect(),
            _ => pseudo_moves(&piece, board, ctx),
        };
    }

    attacks
}

/// Returns `true` if `square` is attacked by any piece of color `by`.
#[inline(always)]
pub fn is_attacked(board: &Board, square: Square, by: Color, ctx: &MoveContext) -> bool {
    attacked_squares(board, by, ctx).contains(square)
}

/// Returns `true` if `color`'s King is attacked on `board`.
///
/// A board without a King of `color` is never in check.
#[inline(always)]
pub fn in_check(board: &Board, color: Color, ctx: &MoveContext) -> bool {
    board
        .king_square(color)
        .is_some_and(|king| is_attacked(board, king, color.opponent(), ctx))
}

/// Returns `true` if playing `mv` on a scratch copy of `board` leaves the mover's King safe.
///
/// A move that cannot be applied at all is never safe.
fn leaves_king_safe(board: &Board, mv: Move, color: Color) -> bool {
    board
        .with_move_made(mv)
        .is_ok_and(|after| !in_check(&after, color, &MoveContext::after(mv)))
}

/// Returns `true` if `piece` may legally move to `to`:
/// `to` is one of its pseudo-moves and its King is not attacked afterwards.
pub fn is_legal(piece: &Piece, to: Square, board: &Board, ctx: &MoveContext) -> bool {
    pseudo_moves(piece, board, ctx).contains(to)
        && leaves_king_safe(board, Move::new(piece.position, piece.kind, to), piece.color)
}

/// All legal moves of the piece on `square`, if there is one.
pub fn legal_moves_from(board: &Board, square: Square, ctx: &MoveContext) -> MoveList {
    let Some(piece) = board.piece_at(square) else {
        return MoveList::new();
    };

    pseudo_moves(&piece, board, ctx)
        .into_iter()
        .map(|to| Move::new(piece.position, piece.kind, to))
        .filter(|&mv| leaves_king_safe(board, mv, piece.color))
        .collect()
}

/// All legal moves for `color` on `board`.
///
/// Moves are grouped by piece, in square order starting at `a1`, and by destination square within each piece.
pub fn legal_moves(board: &Board, color: Color, ctx: &MoveContext) -> MoveList {
    board
        .pieces_of(color)
        .flat_map(|piece| legal_moves_from(board, piece.position, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn dests(board: &Board, from: &str, ctx: &MoveContext) -> Vec<String> {
        let mut names: Vec<String> = legal_moves_from(board, sq(from), ctx)
            .into_iter()
            .map(|mv| mv.to.to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_knight_in_corner() {
        let board = Board::from_fen("7k/8/8/8/8/8/8/N6K w - - 0 1").unwrap();
        assert_eq!(dests(&board, "a1", &MoveContext::NONE), ["b3", "c2"]);
    }

    #[test]
    fn test_rook_ray_stops_at_blockers() {
        // Friendly pawn on a4 blocks; enemy knight on d1 is capturable
        let board = Board::from_fen("7k/8/8/8/P7/8/8/R2n3K w - - 0 1").unwrap();
        assert_eq!(
            dests(&board, "a1", &MoveContext::NONE),
            ["a2", "a3", "b1", "c1", "d1"]
        );
    }

    #[test]
    fn test_pinned_piece_cannot_leave_the_pin() {
        let board = Board::from_fen("4r2k/8/8/8/8/8/4B3/4K3 w - - 0 1").unwrap();
        assert!(dests(&board, "e2", &MoveContext::NONE).is_empty());
    }

    #[test]
    fn test_kings_never_touch() {
        let board = Board::from_fen("8/8/8/3k4/8/3K4/8/8 w - - 0 1").unwrap();
        let moves = dests(&board, "d3", &MoveContext::NONE);
        assert_eq!(moves, ["c2", "c3", "d2", "e2", "e3"]);
    }

    #[test]
    fn test_king_cannot_capture_defended_piece() {
        let board = Board::from_fen("7k/8/8/8/8/2b5/3r4/4K3 w - - 0 1").unwrap();
        assert!(!dests(&board, "e1", &MoveContext::NONE).contains(&String::from("d2")));
    }

    #[test]
    fn test_pawn_pushes_and_captures() {
        let board = Board::from_fen("7k/8/8/8/8/p1p5/1P6/7K w - - 0 1").unwrap();
        assert_eq!(
            dests(&board, "b2", &MoveContext::NONE),
            ["a3", "b3", "b4", "c3"]
        );

        // A moved pawn cannot double push
        let board = Board::from_fen("7k/8/8/8/8/1P6/8/7K w - - 0 1").unwrap();
        assert_eq!(dests(&board, "b3", &MoveContext::NONE), ["b4"]);
    }

    #[test]
    fn test_attacked_squares_include_pawn_captures_of_pieces() {
        let board = Board::from_fen("7k/8/8/8/8/8/3P4/4K3 w - - 0 1").unwrap();
        let attacks = attacked_squares(&board, Color::White, &MoveContext::NONE);
        // Pawn pushes count, empty diagonals do not
        assert!(attacks.contains(sq("d3")));
        assert!(!attacks.contains(sq("e3")));
        // King ring
        assert!(attacks.contains(sq("f2")));
    }

    #[test]
    fn test_start_position_has_twenty_moves() {
        let moves = legal_moves(&Board::starting(), Color::White, &MoveContext::NONE);
        assert_eq!(moves.len(), 20);
        // Ordering follows piece storage: the b1 knight comes first
        assert_eq!(moves[0].to_string(), "b1a3");
    }
}
