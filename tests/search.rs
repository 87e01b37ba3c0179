/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use anyhow::Result;
use gambit::{best_move, Color, Game, OpeningBook, Score, Search, SearchConfig};

/// Scores positions with an arbitrary but repeatable value, so that many moves tie and many do not.
fn noise(fen: &str, side: Color) -> Result<Score> {
    let mut hasher = DefaultHasher::new();
    fen.hash(&mut hasher);
    let value = (hasher.finish() % 201) as i32 - 100;

    Ok(if side.is_white() {
        Score(value)
    } else {
        Score(-value)
    })
}

fn config(depth: usize, pruning: bool) -> SearchConfig {
    SearchConfig {
        pruning,
        ..SearchConfig::with_depth(depth)
    }
}

const POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
];

#[test]
fn test_pruning_does_not_change_the_result() {
    for fen in POSITIONS {
        let game = Game::from_fen(fen).unwrap();

        for depth in 0..=2 {
            let mut eval = noise;
            let pruned = Search::new(&game, &mut eval, config(depth, true))
                .run()
                .unwrap();
            let exhaustive = Search::new(&game, &mut eval, config(depth, false))
                .run()
                .unwrap();

            assert_eq!(
                pruned.bestmove, exhaustive.bestmove,
                "Best move differs at depth {depth} on {fen}"
            );
            assert_eq!(
                pruned.score, exhaustive.score,
                "Score differs at depth {depth} on {fen}"
            );
            assert!(
                pruned.nodes <= exhaustive.nodes,
                "Pruning visited more nodes at depth {depth} on {fen}"
            );
        }
    }
}

#[test]
fn test_exhaustive_search_visits_the_whole_tree() {
    let game = Game::new();
    let mut eval = noise;

    // Root, 20 replies, 400 answers, and 8902 leaves
    let res = Search::new(&game, &mut eval, config(2, false)).run().unwrap();
    assert_eq!(res.nodes, 1 + 20 + 400 + 8902);

    let res = Search::new(&game, &mut eval, config(1, false)).run().unwrap();
    assert_eq!(res.nodes, 1 + 20 + 400);

    let res = Search::new(&game, &mut eval, config(0, false)).run().unwrap();
    assert_eq!(res.nodes, 1 + 20);
}

#[test]
fn test_search_is_deterministic() {
    let game = Game::from_fen(POSITIONS[1]).unwrap();
    let mut eval = noise;

    let first = best_move(&game, &mut eval, None, config(1, true)).unwrap();
    let second = best_move(&game, &mut eval, None, config(1, true)).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_book_move_skips_the_search() {
    let table = "fen\tbest_move\n\
        rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq\t[(1, 3), 'P', (3, 3)]\n";
    let book = OpeningBook::from_reader(table.as_bytes()).unwrap();

    let game = Game::new();
    let mut calls = 0;
    let mut eval = |fen: &str, side: Color| -> Result<Score> {
        calls += 1;
        noise(fen, side)
    };

    let res = Search::new(&game, &mut eval, SearchConfig::default())
        .with_book(&book)
        .run()
        .unwrap();

    assert!(res.from_book);
    assert_eq!(res.bestmove.unwrap().to_string(), "d2d4");
    assert_eq!(calls, 0);
}
