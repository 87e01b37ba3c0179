/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Authoritative game state: turn, clocks, history, and status detection.
mod game;

/// Pseudo-move generation per piece kind, attack detection, and legal move enumeration.
mod movegen;

/// Moves, move requests, and the context needed to generate moves.
mod moves;

/// Node counting over the legal move generator.
mod perft;

/// Colors, piece kinds, and pieces.
mod piece;

/// The board itself: placement, pure move application, and FEN encoding.
mod position;

/// Squares and sets of squares.
mod square;

pub use game::*;
pub use movegen::*;
pub use moves::*;
pub use perft::*;
pub use piece::*;
pub use position::*;
pub use square::*;
