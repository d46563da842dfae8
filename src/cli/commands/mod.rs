//! CLI command definitions and dispatch.
//!
//! Each group of subcommands is implemented in its own submodule:
//! - `scan`: Library scanning
//! - `browse`: Artist/album/track lookups, search, stats, play history
//! - `playlist`: Playlist management

mod browse;
mod playlist;
mod scan;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::db;
use crate::search;

pub use browse::{
    AlbumListing, cmd_album, cmd_albums, cmd_artist, cmd_artists, cmd_played, cmd_search,
    cmd_stats, cmd_track,
};
pub use playlist::{PlaylistCommand, cmd_playlist};
pub use scan::cmd_scan;

/// musicvault: music library indexer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ./musicvault.toml, then the user config directory)
    #[arg(long, global = true, env = "MUSICVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Scan all configured library directories
    Scan,
    /// List artists
    Artists {
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Show an artist and their albums
    Artist { id: String },
    /// List albums
    Albums {
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        /// Show the N most recently added albums instead
        #[arg(long, value_name = "N", conflicts_with = "random")]
        recent: Option<i64>,
        /// Show N random albums instead
        #[arg(long, value_name = "N")]
        random: Option<i64>,
    },
    /// Show an album and its tracks
    Album { id: String },
    /// Show a track
    Track {
        id: String,
        /// Also show the transcode cache entry for this format
        #[arg(long, value_name = "FORMAT")]
        transcode: Option<String>,
        /// Transcode bitrate in kbps
        #[arg(long, default_value_t = 192)]
        bitrate: u32,
    },
    /// Full-text search across artists, albums and tracks
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(long, default_value_t = search::DEFAULT_LIMIT)]
        limit: i64,
    },
    /// Show library totals
    Stats,
    /// Record that a track was played
    Played {
        track: String,
        /// Seconds listened
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Manage playlists
    #[command(subcommand)]
    Playlist(PlaylistCommand),
}

/// Shared state for a command run: loaded config and open database.
pub struct Context {
    pub config: Config,
    pub pool: SqlitePool,
    pub json: bool,
}

impl Context {
    async fn open(config: Config, json: bool) -> anyhow::Result<Self> {
        let db_path = &config.database.path;
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }

        let pool = db::init_db(&db::db_url(db_path))
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        Ok(Self { config, pool, json })
    }

    /// Print `value` as JSON, or run `human` for the plain-text rendering.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let rt = Runtime::new()?;
    let ctx = rt.block_on(Context::open(config, cli.json))?;

    match &cli.command {
        Commands::Scan => cmd_scan(&rt, &ctx),
        Commands::Artists { limit, offset } => cmd_artists(&rt, &ctx, *limit, *offset),
        Commands::Artist { id } => cmd_artist(&rt, &ctx, id),
        Commands::Albums {
            limit,
            offset,
            recent,
            random,
        } => {
            let listing = match (recent, random) {
                (Some(n), _) => AlbumListing::Recent(*n),
                (_, Some(n)) => AlbumListing::Random(*n),
                _ => AlbumListing::Page {
                    limit: *limit,
                    offset: *offset,
                },
            };
            cmd_albums(&rt, &ctx, listing)
        }
        Commands::Album { id } => cmd_album(&rt, &ctx, id),
        Commands::Track {
            id,
            transcode,
            bitrate,
        } => cmd_track(&rt, &ctx, id, transcode.as_deref(), *bitrate),
        Commands::Search { query, limit } => cmd_search(&rt, &ctx, &query.join(" "), *limit),
        Commands::Stats => cmd_stats(&rt, &ctx),
        Commands::Played { track, duration } => cmd_played(&rt, &ctx, track, *duration),
        Commands::Playlist(command) => cmd_playlist(&rt, &ctx, command),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Render seconds as `m:ss`, or `h:mm:ss` from one hour up.
pub(crate) fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
