/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};

use crate::{Game, Move};

/// Column holding the position key.
const FEN_COLUMN: &str = "fen";

/// Column holding the recommended move, as a move request like `[(1, 4), 'P', (3, 4)]`.
const MOVE_COLUMN: &str = "best_move";

/// A table of known positions and the move to play in each of them.
///
/// Positions are keyed by their FEN without clocks or en passant: placement, active color, and castling rights.
/// Tables are read from tab-separated files with a header row naming a `fen` and a `best_move` column.
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    entries: HashMap<String, Move>,
}

impl OpeningBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every file in `dir`, in order of file name.
    ///
    /// If a position appears more than once, the first entry wins.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = fs::read_dir(dir)
            .with_context(|| format!("Failed to read opening directory {dir:?}"))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to list opening directory {dir:?}"))?;
        paths.retain(|path| path.is_file());
        paths.sort();

        let mut book = Self::new();
        for path in paths {
            let file =
                File::open(&path).with_context(|| format!("Failed to open opening file {path:?}"))?;
            let added = book.add_rows(BufReader::new(file))?;
            log::debug!("Loaded {added} openings from {path:?}");
        }

        log::info!("Opening book holds {} positions", book.len());
        Ok(book)
    }

    /// Reads a single table from `reader`.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut book = Self::new();
        book.add_rows(reader)?;
        Ok(book)
    }

    /// Adds every well-formed row of the table in `reader`, returning how many new positions were added.
    ///
    /// Rows that are too short or whose move cannot be parsed are skipped.
    /// A table without the expected header adds nothing.
    pub fn add_rows(&mut self, reader: impl BufRead) -> Result<usize> {
        let mut lines = reader.lines();

        let Some(header) = lines.next().transpose().context("Failed to read opening header")? else {
            return Ok(0);
        };

        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();
        let position_of = |name: &str| columns.iter().position(|&c| c == name);
        let (Some(fen_col), Some(move_col)) = (position_of(FEN_COLUMN), position_of(MOVE_COLUMN))
        else {
            log::debug!("Skipping opening table with header {header:?}");
            return Ok(0);
        };

        let mut added = 0;
        for (i, line) in lines.enumerate() {
            let line = line.context("Failed to read opening row")?;
            let fields: Vec<&str> = line.split('\t').collect();

            let (Some(fen), Some(request)) = (fields.get(fen_col), fields.get(move_col)) else {
                log::debug!("Skipping short opening row {}: {line:?}", i + 2);
                continue;
            };

            match Move::from_request(request) {
                Ok(mv) => {
                    if self.insert(fen.trim(), mv) {
                        added += 1;
                    }
                }
                Err(e) => log::debug!("Skipping opening row {}: {e}", i + 2),
            }
        }

        Ok(added)
    }

    /// Records `mv` for the position `key`, unless the position is already known.
    ///
    /// Returns `true` if the entry was added.
    pub fn insert(&mut self, key: impl Into<String>, mv: Move) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }

        self.entries.insert(key, mv);
        true
    }

    /// The recorded move for the position `key`, if any.
    pub fn get(&self, key: &str) -> Option<Move> {
        self.entries.get(key).copied()
    }

    /// The recorded move for the current position of `game`, if any.
    #[inline(always)]
    pub fn lookup(&self, game: &Game) -> Option<Move> {
        self.get(&game.key())
    }

    /// Number of known positions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the book knows no positions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "name\tfen\tbest_move\n\
        King's Pawn\trnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq\t[(1, 4), 'P', (3, 4)]\n\
        broken\tsome fen\n\
        garbage\tanother fen\tnot a move\n\
        Duplicate\trnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq\t[(1, 3), 'P', (3, 3)]\n\
        Sicilian\trnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq\t[(6, 2), 'P', (4, 2)]\n";

    #[test]
    fn test_lookup_by_position_key() {
        let book = OpeningBook::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(book.len(), 2);

        let mut game = Game::new();
        assert_eq!(book.lookup(&game).unwrap().to_string(), "e2e4");

        game.play_request("1 4 P 3 4").unwrap();
        assert_eq!(book.lookup(&game).unwrap().to_string(), "c7c5");

        game.play_request("6 2 P 4 2").unwrap();
        assert_eq!(book.lookup(&game), None);
    }

    #[test]
    fn test_table_without_header_columns_is_ignored() {
        let book = OpeningBook::from_reader("a\tb\nx\ty\n".as_bytes()).unwrap();
        assert!(book.is_empty());

        let book = OpeningBook::from_reader("".as_bytes()).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        assert!(OpeningBook::load_dir("/this/directory/does/not/exist").is_err());
    }
}
