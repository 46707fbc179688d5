//! Tipitaka builder CLI.
//!
//! Reads the Pali canon record store and writes one Markdown document tree
//! per target script, converting text through the transliteration bridge.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
