//! Read-only library commands: listings, lookups, search, stats, play history.

use serde::Serialize;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use super::{Context, format_duration};
use crate::db;
use crate::model::{Album, Artist, Pagination, Track};
use crate::search::{self, GroupedResults};
use crate::stream::{TranscodeCache, mime_type_for_format};

/// How `albums` picks what to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumListing {
    Page { limit: i64, offset: i64 },
    Recent(i64),
    Random(i64),
}

/// List artists
pub fn cmd_artists(rt: &Runtime, ctx: &Context, limit: i64, offset: i64) -> anyhow::Result<()> {
    let page = rt.block_on(db::list_artists(&ctx.pool, Pagination::new(limit, offset)))?;

    ctx.emit(&page, || {
        for artist in &page.items {
            println!(
                "{}  {} ({} albums, {} tracks)",
                artist.id, artist.name, artist.album_count, artist.track_count
            );
        }
        println!("Showing {} of {} artists", page.items.len(), page.total);
    })
}

#[derive(Serialize)]
struct ArtistDetails {
    #[serde(flatten)]
    artist: Artist,
    albums: Vec<Album>,
}

/// Show an artist and their albums
pub fn cmd_artist(rt: &Runtime, ctx: &Context, id: &str) -> anyhow::Result<()> {
    let details = rt.block_on(async {
        let artist = db::get_artist(&ctx.pool, id).await?;
        let albums = db::list_albums_by_artist(&ctx.pool, id).await?;
        anyhow::Ok(ArtistDetails { artist, albums })
    })?;

    ctx.emit(&details, || {
        println!("{}", details.artist.name);
        for album in &details.albums {
            print_album_line(album);
        }
    })
}

/// List albums
pub fn cmd_albums(rt: &Runtime, ctx: &Context, listing: AlbumListing) -> anyhow::Result<()> {
    match listing {
        AlbumListing::Page { limit, offset } => {
            let page = rt.block_on(db::list_albums(&ctx.pool, Pagination::new(limit, offset)))?;
            ctx.emit(&page, || {
                for album in &page.items {
                    print_album_line(album);
                }
                println!("Showing {} of {} albums", page.items.len(), page.total);
            })
        }
        AlbumListing::Recent(n) | AlbumListing::Random(n) => {
            let albums = rt.block_on(async {
                if matches!(listing, AlbumListing::Recent(_)) {
                    db::recent_albums(&ctx.pool, n).await
                } else {
                    db::random_albums(&ctx.pool, n).await
                }
            })?;
            ctx.emit(&albums, || albums.iter().for_each(print_album_line))
        }
    }
}

#[derive(Serialize)]
struct AlbumDetails {
    #[serde(flatten)]
    album: Album,
    tracks: Vec<Track>,
}

/// Show an album and its tracks
pub fn cmd_album(rt: &Runtime, ctx: &Context, id: &str) -> anyhow::Result<()> {
    let details = rt.block_on(async {
        let album = db::get_album(&ctx.pool, id).await?;
        let tracks = db::list_tracks_by_album(&ctx.pool, id).await?;
        anyhow::Ok(AlbumDetails { album, tracks })
    })?;

    ctx.emit(&details, || {
        let album = &details.album;
        println!("{} - {}", album.artist_name, album.title);
        if let Some(year) = album.year {
            println!("  Year: {year}");
        }
        if let Some(genre) = &album.genre {
            println!("  Genre: {genre}");
        }
        if let Some(cover) = &album.cover_path {
            println!("  Cover: {cover}");
        }
        println!(
            "  {} tracks, {} disc(s), {}",
            album.track_count,
            album.disc_count,
            format_duration(album.duration_seconds)
        );
        for track in &details.tracks {
            let number = track
                .track_number
                .map(|n| format!("{}.{n:02}", track.disc_number))
                .unwrap_or_else(|| "  -".to_string());
            println!(
                "  {number}  {}  [{}]  {}",
                track.title,
                format_duration(track.duration_seconds),
                track.id
            );
        }
    })
}

#[derive(Serialize)]
struct TrackDetails {
    #[serde(flatten)]
    track: Track,
    file_path: String,
    mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcode: Option<TranscodeEntry>,
}

#[derive(Serialize)]
struct TranscodeEntry {
    path: PathBuf,
    cached: bool,
}

/// Show a track, and optionally where its transcoded rendition would live
pub fn cmd_track(
    rt: &Runtime,
    ctx: &Context,
    id: &str,
    transcode: Option<&str>,
    bitrate_kbps: u32,
) -> anyhow::Result<()> {
    let track = rt.block_on(db::get_track(&ctx.pool, id))?;

    let transcode = transcode.map(|format| {
        let cache = TranscodeCache::new(
            &ctx.config.transcode.cache_dir,
            Some(ctx.config.transcode.ffmpeg_path.clone()),
        );
        let cached = cache.lookup(&track.id, format, bitrate_kbps).is_some();
        TranscodeEntry {
            path: cache.cache_path(&track.id, format, bitrate_kbps),
            cached,
        }
    });

    let details = TrackDetails {
        file_path: track.file_path.clone(),
        mime_type: mime_type_for_format(&track.format),
        track,
        transcode,
    };

    ctx.emit(&details, || {
        let track = &details.track;
        println!("{}", track.title);
        println!("  Artist:   {}", track.artist_name);
        println!("  Album:    {}", track.album_title);
        println!("  Duration: {}", format_duration(track.duration_seconds));
        println!("  File:     {} ({} bytes)", details.file_path, track.file_size);
        println!("  Format:   {} ({})", track.format, details.mime_type);
        if let Some(rate) = track.sample_rate {
            let depth = track.bit_depth.map(|d| format!(", {d}-bit")).unwrap_or_default();
            println!("  Stream:   {rate} Hz{depth}, {} ch", track.channels);
        }
        if let Some(kbps) = track.bitrate {
            println!("  Bitrate:  {kbps} kbps");
        }
        if let Some(entry) = &details.transcode {
            let status = if entry.cached { "cached" } else { "not cached" };
            println!("  Transcode: {} ({status})", entry.path.display());
        }
    })
}

/// Full-text search, grouped by entity kind
pub fn cmd_search(rt: &Runtime, ctx: &Context, query: &str, limit: i64) -> anyhow::Result<()> {
    let results = rt.block_on(search::search(&ctx.pool, query, limit))?;
    let grouped = search::group_results(results);

    ctx.emit(&grouped, || print_grouped(&grouped))
}

fn print_grouped(grouped: &GroupedResults) {
    if grouped.total == 0 {
        println!("No matches.");
        return;
    }
    for (heading, results) in [
        ("Artists", &grouped.artists),
        ("Albums", &grouped.albums),
        ("Tracks", &grouped.tracks),
    ] {
        if results.is_empty() {
            continue;
        }
        println!("{heading}:");
        for result in results {
            match (result.artist.is_empty(), result.album.is_empty()) {
                (true, _) => println!("  {}  {}", result.entity_id, result.title),
                (false, true) => {
                    println!("  {}  {} - {}", result.entity_id, result.artist, result.title)
                }
                (false, false) => println!(
                    "  {}  {} - {} ({})",
                    result.entity_id, result.artist, result.title, result.album
                ),
            }
        }
    }
}

/// Library totals
pub fn cmd_stats(rt: &Runtime, ctx: &Context) -> anyhow::Result<()> {
    let stats = rt.block_on(db::count_entities(&ctx.pool))?;

    ctx.emit(&stats, || {
        println!("Artists: {}", stats.artists);
        println!("Albums:  {}", stats.albums);
        println!("Tracks:  {}", stats.tracks);
    })
}

/// Record a play
pub fn cmd_played(
    rt: &Runtime,
    ctx: &Context,
    track_id: &str,
    duration: Option<f64>,
) -> anyhow::Result<()> {
    let entry = rt.block_on(db::record_play(&ctx.pool, track_id, duration))?;

    ctx.emit(&entry, || println!("Recorded play of {} at {}", entry.track_id, entry.played_at))
}

fn print_album_line(album: &Album) {
    let year = album.year.map(|y| format!(" ({y})")).unwrap_or_default();
    println!(
        "{}  {} - {}{year}  [{} tracks]",
        album.id, album.artist_name, album.title, album.track_count
    );
}
