/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use anyhow::{Context, Result};
use clap::Parser;
use gambit::{Cli, Engine, OpeningBook, UciEvaluator};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // Without a working evaluator the session cannot search, so failing to start one is fatal
    let evaluator = cli
        .evaluator_config()
        .map(UciEvaluator::new)
        .transpose()
        .context("Could not establish a connection to the evaluator")?;

    if evaluator.is_none() {
        log::warn!("No evaluator given; searching is disabled for this session");
    }

    let book = cli
        .openings
        .as_ref()
        .map(OpeningBook::load_dir)
        .transpose()?;

    let mut engine = Engine::new(evaluator)
        .with_book(book)
        .with_config(cli.search_config())
        .with_depth(cli.depth);

    engine.run()
}
