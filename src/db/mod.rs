//! Database module for artist, album, and track persistence.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Provides async operations for:
//! - Idempotent upserts keyed on derived IDs (artist -> album -> track)
//! - Album aggregate recomputation
//! - Read queries for browsing (joined names, pagination)
//!
//! Write functions take a `&mut SqliteConnection` so the ingestion pipeline
//! can run them inside one transaction per file; read functions take the
//! pool and return [`Error::NotFound`] for missing IDs.
//!
//! # Example
//!
//! ```ignore
//! use musicvault::db::{init_db, list_albums};
//!
//! let pool = init_db("sqlite:data/musicvault.db").await?;
//! let page = list_albums(&pool, Pagination::default()).await?;
//! ```

pub mod playlist;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identity;
use crate::model::{Album, Artist, LibraryStats, NewTrack, Page, Pagination, Track};

pub use playlist::{
    add_track_to_playlist, create_playlist, delete_playlist, get_playlist, list_playlist_tracks,
    list_playlists, record_play, remove_track_from_playlist,
};

/// Writers wait this long for the database lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default and maximum for recent/random album listings.
const DEFAULT_SAMPLE_LIMIT: i64 = 20;
const MAX_SAMPLE_LIMIT: i64 = 100;

const ARTIST_SELECT: &str = r#"
    SELECT
        a.id, a.name, a.sort_name, a.image_path, a.created_at, a.updated_at,
        (SELECT COUNT(*) FROM albums WHERE artist_id = a.id) AS album_count,
        (SELECT COUNT(*) FROM tracks WHERE artist_id = a.id) AS track_count
    FROM artists a
"#;

const ALBUM_SELECT: &str = r#"
    SELECT
        al.id, al.artist_id, al.title, al.sort_title, al.year, al.genre, al.cover_path,
        al.track_count, al.disc_count, al.duration_seconds, al.created_at, al.updated_at,
        ar.name AS artist_name
    FROM albums al
    JOIN artists ar ON ar.id = al.artist_id
"#;

const TRACK_SELECT: &str = r#"
    SELECT
        t.id, t.album_id, t.artist_id, t.title, t.track_number, t.disc_number,
        t.duration_seconds, t.file_path, t.file_size, t.format, t.sample_rate,
        t.bit_depth, t.channels, t.bitrate, t.created_at, t.updated_at,
        ar.name AS artist_name,
        al.title AS album_title,
        al.cover_path AS cover_path
    FROM tracks t
    JOIN artists ar ON ar.id = t.artist_id
    JOIN albums al ON al.id = t.album_id
"#;

/// Build a SQLite database URL from a file path.
pub fn db_url(path: &Path) -> String {
    format!("sqlite:{}", path.display())
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist. The pool holds a single
/// connection, so every write in the process is serialized; WAL journaling
/// keeps readers of other processes unblocked. Foreign keys are enforced.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> sqlx::Result<SqlitePool> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let options = SqliteConnectOptions::from_str(db_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// ============================================================================
// Writes
// ============================================================================

/// Insert or refresh the artist with this display name.
///
/// The ID is derived from the name, so calling this repeatedly with the same
/// name always lands on the same row; name and sort key are refreshed.
pub async fn upsert_artist(conn: &mut SqliteConnection, name: &str) -> sqlx::Result<Artist> {
    sqlx::query_as::<_, Artist>(
        r#"
        INSERT INTO artists (id, name, sort_name)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            sort_name = excluded.sort_name,
            updated_at = CURRENT_TIMESTAMP
        RETURNING id, name, sort_name, image_path, created_at, updated_at
        "#,
    )
    .bind(identity::artist_id(name))
    .bind(name)
    .bind(identity::sort_name(name))
    .fetch_one(&mut *conn)
    .await
}

/// Insert or refresh an album owned by `artist_id`.
///
/// Year and genre are merged: a pass that lacks them keeps the stored values.
/// Aggregates and the cover path are left untouched.
pub async fn upsert_album(
    conn: &mut SqliteConnection,
    artist_id: &str,
    title: &str,
    year: Option<i64>,
    genre: Option<&str>,
) -> sqlx::Result<Album> {
    sqlx::query_as::<_, Album>(
        r#"
        INSERT INTO albums (id, artist_id, title, sort_title, year, genre)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            sort_title = excluded.sort_title,
            year = COALESCE(excluded.year, albums.year),
            genre = COALESCE(excluded.genre, albums.genre),
            updated_at = CURRENT_TIMESTAMP
        RETURNING id, artist_id, title, sort_title, year, genre, cover_path,
                  track_count, disc_count, duration_seconds, created_at, updated_at
        "#,
    )
    .bind(identity::album_id(artist_id, title))
    .bind(artist_id)
    .bind(title)
    .bind(identity::sort_name(title))
    .bind(year)
    .bind(genre)
    .fetch_one(&mut *conn)
    .await
}

/// Insert or refresh a track.
///
/// Returns the album the track belonged to before this write when that album
/// differs from the new one, so the caller can recompute it too.
pub async fn upsert_track(
    conn: &mut SqliteConnection,
    track: &NewTrack,
) -> sqlx::Result<Option<String>> {
    let previous: Option<(String,)> = sqlx::query_as("SELECT album_id FROM tracks WHERE id = ?")
        .bind(&track.id)
        .fetch_optional(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO tracks (
            id, album_id, artist_id, title, track_number, disc_number, duration_seconds,
            file_path, file_size, format, sample_rate, bit_depth, channels, bitrate
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            album_id = excluded.album_id,
            artist_id = excluded.artist_id,
            title = excluded.title,
            track_number = COALESCE(excluded.track_number, tracks.track_number),
            disc_number = excluded.disc_number,
            duration_seconds = excluded.duration_seconds,
            file_path = excluded.file_path,
            file_size = excluded.file_size,
            format = excluded.format,
            sample_rate = COALESCE(excluded.sample_rate, tracks.sample_rate),
            bit_depth = COALESCE(excluded.bit_depth, tracks.bit_depth),
            channels = excluded.channels,
            bitrate = COALESCE(excluded.bitrate, tracks.bitrate),
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&track.id)
    .bind(&track.album_id)
    .bind(&track.artist_id)
    .bind(&track.title)
    .bind(track.track_number)
    .bind(track.disc_number)
    .bind(track.duration_seconds)
    .bind(&track.file_path)
    .bind(track.file_size)
    .bind(track.format.extension())
    .bind(track.sample_rate)
    .bind(track.bit_depth)
    .bind(track.channels)
    .bind(track.bitrate)
    .execute(&mut *conn)
    .await?;

    let moved_from = previous
        .map(|(album_id,)| album_id)
        .filter(|album_id| *album_id != track.album_id);
    if let Some(old) = &moved_from {
        debug!(target: "db", track = %track.id, from = %old, to = %track.album_id, "Track moved between albums");
    }
    Ok(moved_from)
}

/// Recompute an album's aggregates from its current tracks.
///
/// Always a full recount, never an increment, so repeated calls converge on
/// the same values no matter how often a track was re-ingested.
pub async fn recalculate_album_stats(
    conn: &mut SqliteConnection,
    album_id: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE albums SET
            track_count = (SELECT COUNT(*) FROM tracks WHERE album_id = ?1),
            disc_count = COALESCE((SELECT MAX(disc_number) FROM tracks WHERE album_id = ?1), 1),
            duration_seconds = COALESCE((SELECT SUM(duration_seconds) FROM tracks WHERE album_id = ?1), 0),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?1
        "#,
    )
    .bind(album_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Record the album's cover path unless one is already set.
///
/// Returns `false` when another writer got there first.
pub async fn set_album_cover(pool: &SqlitePool, album_id: &str, cover_path: &str) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE albums SET cover_path = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND cover_path IS NULL",
    )
    .bind(cover_path)
    .bind(album_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Release a cover path recorded by [`set_album_cover`] whose file could not
/// be put in place, so the next scan retries.
pub async fn clear_album_cover(pool: &SqlitePool, album_id: &str, cover_path: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE albums SET cover_path = NULL WHERE id = ? AND cover_path = ?")
        .bind(album_id)
        .bind(cover_path)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Reads
// ============================================================================

/// Get an artist by ID, with album and track counts.
pub async fn get_artist(pool: &SqlitePool, id: &str) -> Result<Artist> {
    let sql = format!("{ARTIST_SELECT} WHERE a.id = ?");
    sqlx::query_as::<_, Artist>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("artist", id))
}

/// List artists ordered by sort name.
pub async fn list_artists(pool: &SqlitePool, page: Pagination) -> Result<Page<Artist>> {
    let page = page.clamped();
    let sql = format!("{ARTIST_SELECT} ORDER BY a.sort_name COLLATE NOCASE LIMIT ? OFFSET ?");
    let items = sqlx::query_as::<_, Artist>(&sql)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artists")
        .fetch_one(pool)
        .await?;
    Ok(Page { items, total })
}

/// Get an album by ID, with its artist's name.
pub async fn get_album(pool: &SqlitePool, id: &str) -> Result<Album> {
    let sql = format!("{ALBUM_SELECT} WHERE al.id = ?");
    sqlx::query_as::<_, Album>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("album", id))
}

/// List albums ordered by sort title.
pub async fn list_albums(pool: &SqlitePool, page: Pagination) -> Result<Page<Album>> {
    let page = page.clamped();
    let sql = format!("{ALBUM_SELECT} ORDER BY al.sort_title COLLATE NOCASE LIMIT ? OFFSET ?");
    let items = sqlx::query_as::<_, Album>(&sql)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(pool)
        .await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM albums")
        .fetch_one(pool)
        .await?;
    Ok(Page { items, total })
}

/// Albums of one artist, oldest first.
pub async fn list_albums_by_artist(pool: &SqlitePool, artist_id: &str) -> Result<Vec<Album>> {
    let sql = format!(
        "{ALBUM_SELECT} WHERE al.artist_id = ? ORDER BY al.year IS NULL, al.year, al.sort_title COLLATE NOCASE"
    );
    Ok(sqlx::query_as::<_, Album>(&sql)
        .bind(artist_id)
        .fetch_all(pool)
        .await?)
}

fn sample_limit(limit: i64) -> i64 {
    if (1..=MAX_SAMPLE_LIMIT).contains(&limit) {
        limit
    } else {
        DEFAULT_SAMPLE_LIMIT
    }
}

/// Most recently added albums.
pub async fn recent_albums(pool: &SqlitePool, limit: i64) -> Result<Vec<Album>> {
    let sql = format!("{ALBUM_SELECT} ORDER BY al.created_at DESC, al.sort_title LIMIT ?");
    Ok(sqlx::query_as::<_, Album>(&sql)
        .bind(sample_limit(limit))
        .fetch_all(pool)
        .await?)
}

/// A random selection of albums.
pub async fn random_albums(pool: &SqlitePool, limit: i64) -> Result<Vec<Album>> {
    let sql = format!("{ALBUM_SELECT} ORDER BY RANDOM() LIMIT ?");
    Ok(sqlx::query_as::<_, Album>(&sql)
        .bind(sample_limit(limit))
        .fetch_all(pool)
        .await?)
}

/// Get a track by ID, with artist name, album title and album cover.
pub async fn get_track(pool: &SqlitePool, id: &str) -> Result<Track> {
    let sql = format!("{TRACK_SELECT} WHERE t.id = ?");
    sqlx::query_as::<_, Track>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("track", id))
}

/// Tracks of one album in play order: disc, then track number.
///
/// Tracks without a number sort after numbered ones on the same disc.
pub async fn list_tracks_by_album(pool: &SqlitePool, album_id: &str) -> Result<Vec<Track>> {
    let sql = format!(
        "{TRACK_SELECT} WHERE t.album_id = ? \
         ORDER BY t.disc_number, t.track_number IS NULL, t.track_number, t.title"
    );
    Ok(sqlx::query_as::<_, Track>(&sql)
        .bind(album_id)
        .fetch_all(pool)
        .await?)
}

/// Total artists, albums and tracks.
pub async fn count_entities(pool: &SqlitePool) -> Result<LibraryStats> {
    let (artists, albums, tracks): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM artists),
            (SELECT COUNT(*) FROM albums),
            (SELECT COUNT(*) FROM tracks)
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(LibraryStats {
        artists,
        albums,
        tracks,
    })
}
