/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use uci_parser::UciScore;

use crate::MAX_DEPTH;

/// A numerical representation of the evaluation of a position / move, in units of ["centipawns"](https://www.chessprogramming.org/Score).
///
/// Scores are always relative to some color: higher is better for that color.
/// This value is internally capped at [`Self::INF`].
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Score(pub i32);

impl Score {
    /// Largest possible score ever achievable.
    ///
    /// The search starts its bounds at `-INF` and `INF`, so no evaluation may reach it.
    pub const INF: Self = Self(i16::MAX as i32);

    /// Score of delivering mate in the current position.
    pub const MATE: Self = Self(Self::INF.0 - 1);

    /// Score of a draw.
    pub const DRAW: Self = Self(0);

    /// Lowest possible score for mate.
    ///
    /// This is only obtainable if mate is possible in [`MAX_DEPTH`] plies.
    pub const LOWEST_MATE: Self = Self(Self::MATE.0 - MAX_DEPTH as i32);

    /// Creates a score that is `plies` plies away from mate.
    ///
    /// A positive `plies` means the scored side delivers mate; a negative `plies` means it gets mated.
    /// Zero means the scored side is already mated.
    #[inline(always)]
    pub const fn mate_in_plies(plies: i32) -> Self {
        if plies > 0 {
            Self(Self::MATE.0 - plies)
        } else {
            Self(-Self::MATE.0 - plies)
        }
    }

    /// Returns `true` if the score is a mate score.
    #[inline(always)]
    pub fn is_mate(&self) -> bool {
        self.abs() >= Self::LOWEST_MATE && self.abs() < Self::INF
    }

    /// Converts this [`Score`] into a [`UciScore`],
    /// determining whether it is a centipawns score or a mate score.
    ///
    /// Used when sending the `info score` message.
    #[inline(always)]
    pub fn into_uci(self) -> UciScore {
        if self.is_mate() {
            UciScore::mate(self.moves_to_mate())
        } else {
            UciScore::cp(self.0)
        }
    }

    /// Returns the number of plies (half moves) this score is from mate.
    #[inline(always)]
    pub const fn plies_to_mate(&self) -> i32 {
        Self::MATE.0 - self.0.abs()
    }

    /// Returns the number of moves (full moves) this score is from mate.
    #[inline(always)]
    pub const fn moves_to_mate(&self) -> i32 {
        let plies = self.plies_to_mate();

        // If this score is in favor of the scored side, it will be positive
        // so we add 1 (because we need to make the current move in order for it's score to take effect).
        // Otherwise, the score is for our opponent, so we need to negate it.
        let relative_to_side = if self.0 > 0 { plies + 1 } else { -plies };

        // Divide by 2 to obtain the number of moves (1 move = 2 ply)
        relative_to_side / 2
    }

    /// Returns the absolute value of this [`Score`].
    #[inline(always)]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl std::ops::Neg for Score {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl fmt::Debug for Score {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.abs() == Self::INF {
            write!(f, "{}INF", if self.0 < 0 { "-" } else { "" })
        } else if self.is_mate() {
            write!(
                f,
                "{} (mate in {} plies {} moves)",
                self.0,
                self.plies_to_mate(),
                self.moves_to_mate()
            )
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_in_plies() {
        let mating = Score::mate_in_plies(3);
        assert!(mating.is_mate());
        assert_eq!(mating.plies_to_mate(), 3);
        assert_eq!(mating.moves_to_mate(), 2);

        let mated = Score::mate_in_plies(-2);
        assert!(mated.is_mate());
        assert!(mated < Score::DRAW);
        assert_eq!(mated.moves_to_mate(), -1);

        assert_eq!(Score::mate_in_plies(0), -Score::MATE);
    }

    #[test]
    fn test_bounds_are_not_mates() {
        assert!(!Score::INF.is_mate());
        assert!(!(-Score::INF).is_mate());
        assert!(!Score(350).is_mate());
        assert!(-Score::INF < -Score::MATE);
    }
}
