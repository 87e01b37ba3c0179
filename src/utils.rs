/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::MAX_DEPTH;

/// Base of the exponential depth curve; each piece removed below 16 multiplies the extra depth by `1 / 0.88`.
const DEPTH_DECAY: f64 = 0.88;

/// Number of pieces at which the depth curve contributes exactly one extra ply.
const DEPTH_PIVOT: i32 = 16;

/// Minimum search depth, reached with a full board.
const BASE_DEPTH: f64 = 3.0;

/// Chooses a search depth from the number of pieces left on the board: fewer pieces means a deeper search.
///
/// The depth is `floor(0.88^(piece_count - 16) + 3)` plies below the root move, capped so the whole search fits in [`MAX_DEPTH`].
///
/// # Example
/// ```
/// # use gambit::depth_for_material;
/// assert_eq!(depth_for_material(32), 3);
/// assert_eq!(depth_for_material(16), 4);
/// assert_eq!(depth_for_material(2), 8);
/// ```
pub fn depth_for_material(piece_count: usize) -> usize {
    let exponent = piece_count as i32 - DEPTH_PIVOT;
    let depth = (DEPTH_DECAY.powi(exponent) + BASE_DEPTH).floor() as usize;
    depth.min(MAX_DEPTH - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_never_decreases_as_pieces_come_off() {
        let depths: Vec<usize> = (2..=32).rev().map(depth_for_material).collect();
        assert!(depths.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(depths.first(), Some(&3));
    }
}
