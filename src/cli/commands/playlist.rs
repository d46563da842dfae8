//! Playlist management commands.

use clap::Subcommand;
use serde::Serialize;
use tokio::runtime::Runtime;

use super::{Context, format_duration};
use crate::db;
use crate::model::{Playlist, PlaylistTrack};

#[derive(Subcommand)]
pub enum PlaylistCommand {
    /// Create an empty playlist
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List playlists, most recently changed first
    List,
    /// Show a playlist and its entries
    Show { id: String },
    /// Append a track
    Add { playlist: String, track: String },
    /// Remove the entry at a position
    Remove { playlist: String, position: i64 },
    /// Delete a playlist
    Delete { id: String },
}

#[derive(Serialize)]
struct PlaylistDetails {
    #[serde(flatten)]
    playlist: Playlist,
    tracks: Vec<PlaylistTrack>,
}

#[derive(Serialize)]
struct PlaylistChange<'a> {
    playlist_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<i64>,
}

/// Dispatch a playlist subcommand
pub fn cmd_playlist(rt: &Runtime, ctx: &Context, command: &PlaylistCommand) -> anyhow::Result<()> {
    let pool = &ctx.pool;
    match command {
        PlaylistCommand::Create { name, description } => {
            let playlist = rt.block_on(db::create_playlist(pool, name, description.as_deref()))?;
            ctx.emit(&playlist, || {
                println!("Created playlist {} ({})", playlist.name, playlist.id)
            })
        }
        PlaylistCommand::List => {
            let playlists = rt.block_on(db::list_playlists(pool))?;
            ctx.emit(&playlists, || {
                if playlists.is_empty() {
                    println!("No playlists.");
                }
                for p in &playlists {
                    println!(
                        "{}  {}  [{} tracks, {}]",
                        p.id,
                        p.name,
                        p.track_count,
                        format_duration(p.duration_seconds)
                    );
                }
            })
        }
        PlaylistCommand::Show { id } => {
            let details = rt.block_on(async {
                let playlist = db::get_playlist(pool, id).await?;
                let tracks = db::list_playlist_tracks(pool, id).await?;
                anyhow::Ok(PlaylistDetails { playlist, tracks })
            })?;
            ctx.emit(&details, || {
                println!("{}", details.playlist.name);
                if let Some(description) = &details.playlist.description {
                    println!("  {description}");
                }
                for entry in &details.tracks {
                    println!(
                        "  {:>3}. {} - {}  [{}]",
                        entry.position,
                        entry.track.artist_name,
                        entry.track.title,
                        format_duration(entry.track.duration_seconds)
                    );
                }
            })
        }
        PlaylistCommand::Add { playlist, track } => {
            let position = rt.block_on(db::add_track_to_playlist(pool, playlist, track))?;
            let change = PlaylistChange {
                playlist_id: playlist,
                position: Some(position),
            };
            ctx.emit(&change, || println!("Added at position {position}"))
        }
        PlaylistCommand::Remove { playlist, position } => {
            rt.block_on(db::remove_track_from_playlist(pool, playlist, *position))?;
            let change = PlaylistChange {
                playlist_id: playlist,
                position: Some(*position),
            };
            ctx.emit(&change, || println!("Removed entry {position}"))
        }
        PlaylistCommand::Delete { id } => {
            rt.block_on(db::delete_playlist(pool, id))?;
            let change = PlaylistChange {
                playlist_id: id,
                position: None,
            };
            ctx.emit(&change, || println!("Deleted playlist {id}"))
        }
    }
}
