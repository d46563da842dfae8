//! Command-line interface for musicvault.
//!
//! Scans the configured library and exposes the catalog, search and
//! playlists as subcommands, with optional JSON output.

mod commands;

pub use commands::{Cli, Commands, run_command};
