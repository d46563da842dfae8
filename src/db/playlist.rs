//! Playlists and play history.
//!
//! Playlist IDs are random (v4) UUIDs; entries reference tracks by ID and are
//! numbered from 1 in insertion order. A playlist's `track_count` and
//! `duration_seconds` are recomputed after every membership change.

use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{PlayHistory, Playlist, PlaylistTrack, Track};

const PLAYLIST_COLUMNS: &str =
    "id, name, description, cover_path, track_count, duration_seconds, created_at, updated_at";

/// Playlist entry row with its joined track.
#[derive(Debug, sqlx::FromRow)]
struct PlaylistTrackRow {
    entry_id: String,
    playlist_id: String,
    position: i64,
    added_at: NaiveDateTime,
    #[sqlx(flatten)]
    track: Track,
}

impl From<PlaylistTrackRow> for PlaylistTrack {
    fn from(row: PlaylistTrackRow) -> Self {
        Self {
            id: row.entry_id,
            playlist_id: row.playlist_id,
            position: row.position,
            added_at: row.added_at,
            track: row.track,
        }
    }
}

async fn exists(conn: &mut SqliteConnection, table: &str, id: &str) -> sqlx::Result<bool> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ?");
    let row: Option<(i64,)> = sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await?;
    Ok(row.is_some())
}

async fn recalculate_playlist_stats(conn: &mut SqliteConnection, playlist_id: &str) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE playlists SET
            track_count = (SELECT COUNT(*) FROM playlist_tracks WHERE playlist_id = ?1),
            duration_seconds = (
                SELECT COALESCE(SUM(t.duration_seconds), 0)
                FROM playlist_tracks pt
                JOIN tracks t ON t.id = pt.track_id
                WHERE pt.playlist_id = ?1
            ),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?1
        "#,
    )
    .bind(playlist_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Create an empty playlist.
pub async fn create_playlist(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<Playlist> {
    let sql = format!(
        "INSERT INTO playlists (id, name, description) VALUES (?, ?, ?) RETURNING {PLAYLIST_COLUMNS}"
    );
    Ok(sqlx::query_as::<_, Playlist>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .await?)
}

pub async fn get_playlist(pool: &SqlitePool, id: &str) -> Result<Playlist> {
    let sql = format!("SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE id = ?");
    sqlx::query_as::<_, Playlist>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("playlist", id))
}

/// All playlists, most recently changed first.
pub async fn list_playlists(pool: &SqlitePool) -> Result<Vec<Playlist>> {
    let sql = format!(
        "SELECT {PLAYLIST_COLUMNS} FROM playlists ORDER BY updated_at DESC, rowid DESC"
    );
    Ok(sqlx::query_as::<_, Playlist>(&sql).fetch_all(pool).await?)
}

/// Delete a playlist and its entries.
pub async fn delete_playlist(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found("playlist", id));
    }
    Ok(())
}

/// Append a track to a playlist and return its position.
pub async fn add_track_to_playlist(
    pool: &SqlitePool,
    playlist_id: &str,
    track_id: &str,
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    if !exists(&mut tx, "playlists", playlist_id).await? {
        return Err(Error::not_found("playlist", playlist_id));
    }
    if !exists(&mut tx, "tracks", track_id).await? {
        return Err(Error::not_found("track", track_id));
    }

    let (position,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO playlist_tracks (id, playlist_id, track_id, position)
        VALUES (?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM playlist_tracks WHERE playlist_id = ?))
        RETURNING position
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(playlist_id)
    .bind(track_id)
    .bind(playlist_id)
    .fetch_one(&mut *tx)
    .await?;

    recalculate_playlist_stats(&mut tx, playlist_id).await?;
    tx.commit().await?;
    Ok(position)
}

/// Remove the entry at `position`. Remaining positions are not renumbered.
pub async fn remove_track_from_playlist(
    pool: &SqlitePool,
    playlist_id: &str,
    position: i64,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM playlist_tracks WHERE playlist_id = ? AND position = ?")
        .bind(playlist_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::not_found(
            "playlist entry",
            format!("{playlist_id}#{position}"),
        ));
    }

    recalculate_playlist_stats(&mut tx, playlist_id).await?;
    tx.commit().await?;
    Ok(())
}

/// Entries of a playlist in position order, each with its track.
pub async fn list_playlist_tracks(pool: &SqlitePool, playlist_id: &str) -> Result<Vec<PlaylistTrack>> {
    // Surface a missing playlist instead of an empty list
    get_playlist(pool, playlist_id).await?;

    let rows = sqlx::query_as::<_, PlaylistTrackRow>(
        r#"
        SELECT
            pt.id AS entry_id, pt.playlist_id, pt.position, pt.added_at,
            t.id, t.album_id, t.artist_id, t.title, t.track_number, t.disc_number,
            t.duration_seconds, t.file_path, t.file_size, t.format, t.sample_rate,
            t.bit_depth, t.channels, t.bitrate, t.created_at, t.updated_at,
            ar.name AS artist_name,
            al.title AS album_title,
            al.cover_path AS cover_path
        FROM playlist_tracks pt
        JOIN tracks t ON t.id = pt.track_id
        JOIN artists ar ON ar.id = t.artist_id
        JOIN albums al ON al.id = t.album_id
        WHERE pt.playlist_id = ?
        ORDER BY pt.position
        "#,
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PlaylistTrack::from).collect())
}

/// Record that a track was played, optionally with how long it was listened to.
pub async fn record_play(
    pool: &SqlitePool,
    track_id: &str,
    duration_listened: Option<f64>,
) -> Result<PlayHistory> {
    let mut conn = pool.acquire().await?;
    if !exists(&mut conn, "tracks", track_id).await? {
        return Err(Error::not_found("track", track_id));
    }

    Ok(sqlx::query_as::<_, PlayHistory>(
        r#"
        INSERT INTO play_history (id, track_id, duration_listened)
        VALUES (?, ?, ?)
        RETURNING id, track_id, played_at, duration_listened
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(track_id)
    .bind(duration_listened)
    .fetch_one(&mut *conn)
    .await?)
}
