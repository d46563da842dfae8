//! musicvault - a music library indexer.
//!
//! Walks the configured library directories, reads tags and stream info
//! from audio files, and keeps a SQLite catalog of artists, albums and
//! tracks with full-text search, extracted cover art and playlists.

pub mod cli;
pub mod config;
pub mod cover;
pub mod db;
pub mod error;
pub mod identity;
pub mod library;
pub mod metadata;
pub mod model;
pub mod scanner;
pub mod search;
pub mod stream;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging. Warnings from every target (skipped files, cover
    // failures) are shown; scan progress is info.
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy()
        .add_directive("musicvault=info".parse()?)
        .add_directive("library::scan=info".parse()?);
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    cli::run_command(&args)
}
