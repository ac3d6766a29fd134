//! # monoship CLI
//!
//! Binary entry point. Parses arguments, sets up logging and dispatches to
//! a command; all real work lives in the `monoship` library.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
