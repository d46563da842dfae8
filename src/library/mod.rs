//! Library ingestion pipeline.
//!
//! Each audio file found by the [`scanner`] goes through the same steps:
//!
//! 1. Read metadata (tags, stream info, embedded picture)
//! 2. In one transaction: upsert artist, album, track; recompute the album's
//!    aggregates (and the previous album's, if the track moved); refresh the
//!    search index rows for all three entities
//! 3. After commit, extract cover art if the album has none yet
//!
//! A failing file rolls back only its own writes and is reported as a
//! [`ScanEvent::Error`]; the stream carries on with the next file.

pub mod coordinator;

pub use coordinator::{ScanCoordinator, ScanHandle, ScanState, ScanSummary};

use crate::cover::{CoverStore, StagedCover};
use crate::error::{Error, Result, ResultExt};
use crate::metadata::{self, EmbeddedPicture, TrackMetadata};
use crate::model::{AudioFormat, NewTrack, SearchEntry};
use crate::{db, identity, scanner, search};
use futures::{Stream, StreamExt};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum ScanEvent {
    Processed(PathBuf),
    Error(PathBuf, String),
}

/// IDs written for one ingested file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedTrack {
    pub track_id: String,
    pub album_id: String,
    pub artist_id: String,
}

/// Scans the library roots and ingests every audio file found.
///
/// Files are processed one at a time, in walk order. Returns a stream of
/// ScanEvents, one per file.
pub fn scan_library(
    pool: SqlitePool,
    covers: CoverStore,
    roots: Vec<PathBuf>,
) -> impl Stream<Item = ScanEvent> {
    scanner::scan(roots).then(move |path| {
        let pool = pool.clone();
        let covers = covers.clone();
        async move {
            match ingest_file(&pool, &covers, &path).await {
                Ok(_) => ScanEvent::Processed(path),
                Err(e) => {
                    warn!(target: "library::scan", path = %path.display(), error = %e, "Failed to ingest file");
                    ScanEvent::Error(path, e.to_string())
                }
            }
        }
    })
}

/// Ingest one audio file into the library.
pub async fn ingest_file(
    pool: &SqlitePool,
    covers: &CoverStore,
    path: &Path,
) -> Result<IngestedTrack> {
    let format = AudioFormat::from_path(path)
        .ok_or_else(|| Error::metadata(path, "Unsupported file extension"))?;

    let owned = path.to_path_buf();
    let meta = tokio::task::spawn_blocking(move || metadata::read(&owned, format))
        .await
        .map_err(|e| Error::Task(e.to_string()))??;

    let mut tx = pool.begin().await?;

    let artist = db::upsert_artist(&mut tx, meta.artist_name()).await?;
    let album = db::upsert_album(
        &mut tx,
        &artist.id,
        meta.album_title(),
        meta.tags.year.map(i64::from),
        meta.tags.genre.as_deref(),
    )
    .await?;

    let track = new_track(path, &meta, &album.id, &artist.id);
    let previous_album = db::upsert_track(&mut tx, &track)
        .await
        .with_context(format!("Failed to write track {}", track.file_path))?;

    db::recalculate_album_stats(&mut tx, &album.id).await?;
    if let Some(old_album) = &previous_album {
        db::recalculate_album_stats(&mut tx, old_album).await?;
    }

    search::index_entity(
        &mut tx,
        &SearchEntry::track(&track.id, &track.title, &artist.name, &album.title),
    )
    .await?;
    search::index_entity(&mut tx, &SearchEntry::album(&album, &artist.name)).await?;
    search::index_entity(&mut tx, &SearchEntry::artist(&artist)).await?;

    tx.commit().await?;
    debug!(target: "library::scan", path = %path.display(), track = %track.id, "Ingested");

    if album.cover_path.is_none() {
        if let Some(picture) = meta.picture {
            save_cover(pool, covers, &album.id, picture).await;
        }
    }

    Ok(IngestedTrack {
        track_id: track.id,
        album_id: album.id,
        artist_id: artist.id,
    })
}

fn new_track(path: &Path, meta: &TrackMetadata, album_id: &str, artist_id: &str) -> NewTrack {
    NewTrack {
        id: identity::track_id(path),
        album_id: album_id.to_string(),
        artist_id: artist_id.to_string(),
        title: meta.title(path),
        track_number: meta.track_number().map(i64::from),
        disc_number: i64::from(meta.disc_number()),
        duration_seconds: meta.duration_seconds(),
        file_path: path.to_string_lossy().into_owned(),
        file_size: meta.file_size as i64,
        format: meta.format,
        sample_rate: meta.audio.sample_rate.map(i64::from),
        bit_depth: meta.audio.bit_depth.map(i64::from),
        channels: i64::from(meta.channels()),
        bitrate: meta.bitrate().map(|b| b as i64),
    }
}

/// Write the album's cover and record it, unless another writer won.
///
/// The bytes are staged under a temp name, the album row is claimed with a
/// conditional update, and only the winner moves its file into place.
/// Failures are logged; the album stays coverless and is retried on the
/// next scan.
async fn save_cover(pool: &SqlitePool, covers: &CoverStore, album_id: &str, picture: EmbeddedPicture) {
    let store = covers.clone();
    let id = album_id.to_string();
    let staged = match tokio::task::spawn_blocking(move || store.stage(&id, &picture)).await {
        Ok(Ok(staged)) => staged,
        Ok(Err(e)) => {
            warn!(target: "cover", album = %album_id, error = %e, "Failed to write cover art");
            return;
        }
        Err(e) => {
            warn!(target: "cover", album = %album_id, error = %e, "Cover art task failed");
            return;
        }
    };

    let target = staged.target().to_string_lossy().into_owned();
    match db::set_album_cover(pool, album_id, &target).await {
        Ok(true) => {
            let moved = tokio::task::spawn_blocking(move || staged.commit())
                .await
                .map_err(|e| e.to_string())
                .and_then(|result| result.map_err(|e| e.to_string()));
            match moved {
                Ok(path) => debug!(target: "cover", album = %album_id, path = %path.display(), "Saved cover art"),
                Err(error) => {
                    warn!(target: "cover", album = %album_id, error = %error, "Failed to move cover art into place");
                    if let Err(e) = db::clear_album_cover(pool, album_id, &target).await {
                        warn!(target: "cover", album = %album_id, error = %e, "Failed to release cover art claim");
                    }
                }
            }
        }
        Ok(false) => {
            debug!(target: "cover", album = %album_id, "Album already has cover art");
            discard(staged).await;
        }
        Err(e) => {
            warn!(target: "cover", album = %album_id, error = %e, "Failed to record cover art");
            discard(staged).await;
        }
    }
}

async fn discard(staged: StagedCover) {
    let _ = tokio::task::spawn_blocking(move || staged.discard()).await;
}
