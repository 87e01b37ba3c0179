/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use gambit::{in_check, legal_moves, Board, Color, Game, GameStatus, Move, MoveContext, PieceKind};

fn play_all(game: &mut Game, moves: &str) {
    for mv in moves.split_ascii_whitespace() {
        game.play_uci(mv)
            .unwrap_or_else(|e| panic!("{mv} should be playable on {game:?}: {e}"));
    }
}

fn piece_move(kind: PieceKind, uci: &str) -> Move {
    Move::new(uci[0..2].parse().unwrap(), kind, uci[2..4].parse().unwrap())
}

fn king_move(uci: &str) -> Move {
    piece_move(PieceKind::King, uci)
}

/// Walks every line to `depth`, asserting that no legal move leaves the mover in check.
fn assert_legal_moves_are_safe(board: &Board, color: Color, ctx: &MoveContext, depth: usize) {
    if depth == 0 {
        return;
    }

    for mv in legal_moves(board, color, ctx) {
        let after = board.with_move_made(mv).unwrap();
        let ctx = MoveContext::after(mv);
        assert!(
            !in_check(&after, color, &ctx),
            "{mv} leaves {color} in check on {board:?}"
        );

        assert_legal_moves_are_safe(&after, color.opponent(), &ctx, depth - 1);
    }
}

#[cfg(test)]
mod legality {
    use super::*;

    #[test]
    fn test_twenty_opening_moves() {
        let game = Game::new();
        assert_eq!(game.legal_moves().len(), 20);
        assert_eq!(game.status(), GameStatus::Ongoing);
    }

    #[test]
    fn test_no_legal_move_leaves_own_king_attacked() {
        for fen in [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ] {
            let game = Game::from_fen(fen).unwrap();
            assert_legal_moves_are_safe(game.board(), game.turn(), &game.context(), 2);
        }
    }

    #[test]
    fn test_pinned_piece_may_only_move_along_the_pin() {
        // The e-file Rook is pinned by the black Rook on e8
        let game = Game::from_fen("4r1k1/8/8/8/8/8/4R3/4K3 w - - 0 1").unwrap();
        let mut dests: Vec<String> = game
            .legal_moves_from("e2".parse().unwrap())
            .into_iter()
            .map(|mv| mv.to.to_string())
            .collect();
        dests.sort();

        assert_eq!(dests, ["e3", "e4", "e5", "e6", "e7", "e8"]);
    }

    #[test]
    fn test_promotion_is_always_to_a_queen() {
        let mut game = Game::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        let mv = game.play_uci("e7e8").unwrap();

        assert_eq!(mv.to_string(), "e7e8q");
        let promoted = game.board().piece_at("e8".parse().unwrap()).unwrap();
        assert_eq!(promoted.kind, PieceKind::Queen);
        assert_eq!(promoted.color, Color::White);
    }
}

#[cfg(test)]
mod castling {
    use super::*;

    const BOTH_SIDES: &str = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";

    #[test]
    fn test_castling_both_ways() {
        let game = Game::from_fen(BOTH_SIDES).unwrap();
        assert!(game.is_legal(king_move("e1g1")));
        assert!(game.is_legal(king_move("e1c1")));

        let mut short = game.clone();
        short.play(king_move("e1g1")).unwrap();
        let rook = short.board().piece_at("f1".parse().unwrap()).unwrap();
        assert_eq!(rook.kind, PieceKind::Rook);
        assert!(short.board().is_empty("h1".parse().unwrap()));

        let mut long = game;
        long.play(king_move("e1c1")).unwrap();
        let rook = long.board().piece_at("d1".parse().unwrap()).unwrap();
        assert_eq!(rook.kind, PieceKind::Rook);
        assert!(long.board().is_empty("a1".parse().unwrap()));
    }

    #[test]
    fn test_no_castling_after_king_moved() {
        let mut game = Game::from_fen(BOTH_SIDES).unwrap();
        play_all(&mut game, "e1f1 e8f8 f1e1 f8e8");

        assert!(!game.is_legal(king_move("e1g1")));
        assert!(!game.is_legal(king_move("e1c1")));
    }

    #[test]
    fn test_no_castling_with_moved_rook() {
        let mut game = Game::from_fen(BOTH_SIDES).unwrap();
        play_all(&mut game, "h1h2 a8a7 h2h1 a7a8");

        assert!(!game.is_legal(king_move("e1g1")));
        assert!(game.is_legal(king_move("e1c1")));
    }

    #[test]
    fn test_no_castling_through_pieces() {
        let game = Game::from_fen("r3k2r/8/8/8/8/8/8/RN2KB1R w KQkq - 0 1").unwrap();
        assert!(!game.is_legal(king_move("e1g1")));
        assert!(!game.is_legal(king_move("e1c1")));
    }

    #[test]
    fn test_no_castling_out_of_check() {
        let game = Game::from_fen("4k3/8/8/4r3/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(game.in_check());
        assert!(!game.is_legal(king_move("e1g1")));
        assert!(!game.is_legal(king_move("e1c1")));
    }

    #[test]
    fn test_no_castling_through_or_into_attack() {
        // f1 is attacked, d1 is not
        let game = Game::from_fen("4k3/8/8/5r2/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(!game.is_legal(king_move("e1g1")));
        assert!(game.is_legal(king_move("e1c1")));

        // g1 is attacked
        let game = Game::from_fen("4k3/8/8/6r1/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(!game.is_legal(king_move("e1g1")));

        // Only the rook passes over b1, so an attack there does not matter
        let game = Game::from_fen("4k3/8/8/1r6/8/8/8/R3K2R w KQ - 0 1").unwrap();
        assert!(game.is_legal(king_move("e1c1")));
    }
}

#[cfg(test)]
mod en_passant {
    use super::*;

    #[test]
    fn test_en_passant_captures_the_pushed_pawn() {
        let mut game = Game::new();
        play_all(&mut game, "e2e4 a7a6 e4e5 d7d5");

        let mv = game.play_uci("e5d6").unwrap();
        assert_eq!(mv.kind, PieceKind::Pawn);
        assert!(game.board().is_empty("d5".parse().unwrap()));
        assert_eq!(game.board().piece_count(), 31);
        assert_eq!(game.halfmove_clock(), 0);
    }

    #[test]
    fn test_en_passant_window_lasts_one_ply() {
        let mut game = Game::new();
        play_all(&mut game, "e2e4 a7a6 e4e5 d7d5 g1f3 h7h6");

        assert!(game.play_uci("e5d6").is_err());
        assert_eq!(game.turn(), Color::White);
    }

    #[test]
    fn test_only_adjacent_pawns_capture_en_passant() {
        // White pawns one and three files from the d-file, all on the fifth rank
        let mut game = Game::from_fen("4k3/3p4/8/1P2P3/8/8/8/4K3 b - - 0 1").unwrap();
        play_all(&mut game, "d7d5");

        assert!(game.is_legal(piece_move(PieceKind::Pawn, "e5d6")));
        assert!(!game.is_legal(piece_move(PieceKind::Pawn, "b5d6")));
        assert!(game
            .legal_moves_from("b5".parse().unwrap())
            .iter()
            .all(|mv| mv.to.to_string() == "b6"));
    }

    #[test]
    fn test_no_en_passant_from_another_rank() {
        // The c6 pawn sits beside the pushed pawn's file, but not on its rank
        let mut game = Game::from_fen("4k3/3p4/2P5/8/8/8/8/4K3 b - - 0 1").unwrap();
        play_all(&mut game, "d7d5");

        let dests: Vec<String> = game
            .legal_moves_from("c6".parse().unwrap())
            .into_iter()
            .map(|mv| mv.to.to_string())
            .collect();
        assert_eq!(dests, ["c7"]);
        assert!(game.play_uci("c6d7").is_err());
    }

    #[test]
    fn test_no_en_passant_after_single_steps() {
        let mut game = Game::new();
        play_all(&mut game, "e2e4 d7d6 e4e5 d6d5");

        assert!(game.play_uci("e5d6").is_err());
    }
}

#[cfg(test)]
mod game_over {
    use super::*;

    #[test]
    fn test_fools_mate() {
        let mut game = Game::new();
        play_all(&mut game, "f2f3 e7e5 g2g4 d8h4");

        assert!(game.in_check());
        assert!(game.is_checkmate());
        assert!(!game.is_stalemate());
        assert!(game.legal_moves().is_empty());
        assert_eq!(game.status(), GameStatus::Checkmate);
        assert!(game.status().is_over());
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();

        play_all(&mut game, "g1f3 g8f6 f3g1 f6g8");
        assert!(!game.is_repetition());
        assert_eq!(game.status(), GameStatus::Ongoing);

        play_all(&mut game, "g1f3 g8f6 f3g1 f6g8");
        assert!(game.is_repetition());
        assert!(game.is_stalemate());
        assert!(!game.is_checkmate());
        assert_eq!(game.status(), GameStatus::Repetition);
    }

    #[test]
    fn test_stalemate_without_repetition() {
        let game = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();

        assert!(!game.in_check());
        assert!(game.is_stalemate());
        assert!(!game.is_repetition());
        assert_eq!(game.status(), GameStatus::Stalemate);
    }
}
