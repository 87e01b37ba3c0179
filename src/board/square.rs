/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    ops::{BitAnd, BitOr, BitOrAssign},
    str::FromStr,
};

use anyhow::{bail, Context, Result};

/// A single square on the chess board, addressed by `(rank, file)`.
///
/// Ranks and files are both in `[0, 7]`. Rank `0` is White's back rank (`1` in algebraic notation)
/// and file `0` is the `a` file.
///
/// Internally, this is stored as `rank * 8 + file`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Square(u8);

impl Square {
    /// Number of squares on the board.
    pub const COUNT: usize = 64;

    /// Creates a new [`Square`] from a rank and file, both in `[0, 7]`.
    ///
    /// # Example
    /// ```
    /// # use gambit::Square;
    /// let e4 = Square::new(3, 4).unwrap();
    /// assert_eq!(e4.to_string(), "e4");
    ///
    /// assert!(Square::new(8, 0).is_err());
    /// ```
    pub fn new(rank: u8, file: u8) -> Result<Self> {
        if rank > 7 || file > 7 {
            bail!("Invalid square ({rank}, {file}): rank and file must be between [0,7]");
        }

        Ok(Self::from_coords_unchecked(rank, file))
    }

    /// Creates a new [`Square`] from a rank and file without bounds checks.
    ///
    /// # Panics
    /// If either coordinate exceeds `7` and debug assertions are enabled.
    #[inline(always)]
    pub const fn from_coords_unchecked(rank: u8, file: u8) -> Self {
        debug_assert!(rank < 8 && file < 8, "Square coordinates out of bounds");
        Self(rank * 8 + file)
    }

    /// Creates a new [`Square`] from an index in `[0, 63]`, if possible.
    #[inline(always)]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Returns an iterator over all squares, starting at `a1` and ending at `h8`, rank by rank.
    #[inline(always)]
    pub fn iter() -> impl DoubleEndedIterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    /// The rank of this square, in `[0, 7]`.
    #[inline(always)]
    pub const fn rank(&self) -> u8 {
        self.0 / 8
    }

    /// The file of this square, in `[0, 7]`.
    #[inline(always)]
    pub const fn file(&self) -> u8 {
        self.0 % 8
    }

    /// Returns this square as a `usize`, useful for indexing into lists.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Returns the square `ranks` ranks and `files` files away from this one, if it lies on the board.
    ///
    /// # Example
    /// ```
    /// # use gambit::Square;
    /// let a1 = Square::new(0, 0).unwrap();
    /// assert_eq!(a1.offset(1, 2), Some(Square::new(1, 2).unwrap()));
    /// assert_eq!(a1.offset(-1, 0), None);
    /// ```
    #[inline(always)]
    pub const fn offset(&self, ranks: i8, files: i8) -> Option<Self> {
        let rank = self.rank() as i8 + ranks;
        let file = self.file() as i8 + files;

        if rank < 0 || rank > 7 || file < 0 || file > 7 {
            None
        } else {
            Some(Self::from_coords_unchecked(rank as u8, file as u8))
        }
    }

    /// Absolute number of files between `self` and `other`.
    #[inline(always)]
    pub const fn distance_files(&self, other: Self) -> u8 {
        self.file().abs_diff(other.file())
    }

    /// Absolute number of ranks between `self` and `other`.
    #[inline(always)]
    pub const fn distance_ranks(&self, other: Self) -> u8 {
        self.rank().abs_diff(other.rank())
    }
}

impl FromStr for Square {
    type Err = anyhow::Error;

    /// Parses a square from algebraic notation, like `e4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            bail!("Invalid square {s:?}: must be exactly two characters, like \"e4\"");
        };

        if !('a'..='h').contains(&file) {
            bail!("Invalid file {file:?} in square {s:?}");
        }

        let rank = rank
            .to_digit(10)
            .filter(|r| (1..=8).contains(r))
            .with_context(|| format!("Invalid rank {rank:?} in square {s:?}"))?;

        Self::new(rank as u8 - 1, file as u8 - b'a')
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file()) as char, self.rank() + 1)
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({}, {})", self.rank(), self.file())
    }
}

/// A set of squares, stored as a 64-bit mask.
///
/// This is the return type of all move-shape generation,
/// so that attack sets of many pieces can be combined with a single `|`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SquareSet(u64);

impl SquareSet {
    /// A set with no squares in it.
    pub const EMPTY: Self = Self(0);

    /// Returns `true` if `square` is in this set.
    #[inline(always)]
    pub const fn contains(&self, square: Square) -> bool {
        self.0 & (1 << square.0) != 0
    }

    /// Adds `square` to this set.
    #[inline(always)]
    pub fn insert(&mut self, square: Square) {
        self.0 |= 1 << square.0;
    }

    /// Removes `square` from this set.
    #[inline(always)]
    pub fn remove(&mut self, square: Square) {
        self.0 &= !(1 << square.0);
    }

    /// Number of squares in this set.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if there are no squares in this set.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over every square in this set, in ascending index order.
    #[inline(always)]
    pub fn iter(&self) -> SquareSetIter {
        SquareSetIter(self.0)
    }
}

impl BitOr for SquareSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SquareSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SquareSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl FromIterator<Square> for SquareSet {
    fn from_iter<T: IntoIterator<Item = Square>>(iter: T) -> Self {
        let mut set = Self::EMPTY;
        for square in iter {
            set.insert(square);
        }
        set
    }
}

impl IntoIterator for SquareSet {
    type Item = Square;
    type IntoIter = SquareSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for SquareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the squares of a [`SquareSet`], lowest index first.
pub struct SquareSetIter(u64);

impl Iterator for SquareSetIter {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            return None;
        }

        let index = self.0.trailing_zeros() as u8;
        // Clear the lowest set bit
        self.0 &= self.0 - 1;
        Some(Square(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SquareSetIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_parsing() {
        let e4: Square = "e4".parse().unwrap();
        assert_eq!(e4.rank(), 3);
        assert_eq!(e4.file(), 4);
        assert_eq!(e4.to_string(), "e4");

        assert!("i1".parse::<Square>().is_err());
        assert!("a9".parse::<Square>().is_err());
        assert!("a10".parse::<Square>().is_err());
        assert!("".parse::<Square>().is_err());
    }

    #[test]
    fn test_square_set_iteration_order() {
        let squares = ["h8", "a1", "d4"].map(|s| s.parse::<Square>().unwrap());
        let set: SquareSet = squares.into_iter().collect();

        assert_eq!(set.len(), 3);
        let names: Vec<String> = set.iter().map(|sq| sq.to_string()).collect();
        assert_eq!(names, ["a1", "d4", "h8"]);
    }
}
