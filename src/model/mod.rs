//! Core data models for the music library.
//!
//! Defines the primary entities: [`Artist`], [`Album`], and [`Track`], the
//! search mirror row [`SearchEntry`], and the playlist/history records that
//! reference tracks by ID. Rows map via SQLx and serialize via serde for
//! `--json` output.
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `artists` - Artists keyed by a name-derived ID
//! - `albums` - Albums keyed by artist ID + title, with derived aggregates
//! - `tracks` - Individual audio files keyed by path
//! - `search_index` - FTS5 mirror of all three
//! - `playlists`, `playlist_tracks`, `play_history`

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// Audio container formats accepted by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Flac,
    Mp3,
    M4a,
    Ogg,
    Opus,
}

impl AudioFormat {
    /// Every supported format, in allow-list order.
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Flac,
        AudioFormat::Mp3,
        AudioFormat::M4a,
        AudioFormat::Ogg,
        AudioFormat::Opus,
    ];

    /// Match a file extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Format of the file at `path`, judged by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical lowercase extension, also stored as the track's format tag.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Opus => "opus",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An artist in the music library.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Artist {
    /// Derived from the display name
    pub id: String,
    pub name: String,
    /// Name without a leading article, used for ordering
    pub sort_name: String,
    pub image_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Number of albums (read queries only)
    #[sqlx(default)]
    pub album_count: i64,
    /// Number of tracks (read queries only)
    #[sqlx(default)]
    pub track_count: i64,
}

/// An album in the music library.
///
/// `track_count`, `disc_count` and `duration_seconds` are recomputed from the
/// album's tracks after every track write; they are never patched in place.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Album {
    /// Derived from owning artist ID + title
    pub id: String,
    pub artist_id: String,
    pub title: String,
    pub sort_title: String,
    pub year: Option<i64>,
    pub genre: Option<String>,
    /// Extracted artwork; set once and never overwritten
    pub cover_path: Option<String>,
    pub track_count: i64,
    pub disc_count: i64,
    pub duration_seconds: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Owning artist's name (joined reads only)
    #[sqlx(default)]
    pub artist_name: String,
}

/// A track (audio file) in the music library.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Track {
    /// Derived from the absolute file path
    pub id: String,
    pub album_id: String,
    pub artist_id: String,
    pub title: String,
    pub track_number: Option<i64>,
    pub disc_number: i64,
    pub duration_seconds: f64,
    /// Absolute file path (unique)
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_size: i64,
    /// Lowercase extension, see [`AudioFormat`]
    pub format: String,
    pub sample_rate: Option<i64>,
    pub bit_depth: Option<i64>,
    pub channels: i64,
    /// Bits per second
    pub bitrate: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[sqlx(default)]
    pub artist_name: String,
    #[sqlx(default)]
    pub album_title: String,
    #[sqlx(default)]
    pub cover_path: Option<String>,
}

/// Attributes written by a track upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrack {
    pub id: String,
    pub album_id: String,
    pub artist_id: String,
    pub title: String,
    pub track_number: Option<i64>,
    pub disc_number: i64,
    pub duration_seconds: f64,
    pub file_path: String,
    pub file_size: i64,
    pub format: AudioFormat,
    pub sample_rate: Option<i64>,
    pub bit_depth: Option<i64>,
    pub channels: i64,
    pub bitrate: Option<i64>,
}

/// Kind of entity mirrored in the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Album,
    Track,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Artist => "artist",
            EntityKind::Album => "album",
            EntityKind::Track => "track",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artist" => Ok(EntityKind::Artist),
            "album" => Ok(EntityKind::Album),
            "track" => Ok(EntityKind::Track),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Denormalized projection of one entity into the search index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEntry {
    pub entity_id: String,
    pub kind: EntityKind,
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl SearchEntry {
    pub fn artist(artist: &Artist) -> Self {
        Self {
            entity_id: artist.id.clone(),
            kind: EntityKind::Artist,
            title: artist.name.clone(),
            artist: String::new(),
            album: String::new(),
        }
    }

    pub fn album(album: &Album, artist_name: &str) -> Self {
        Self {
            entity_id: album.id.clone(),
            kind: EntityKind::Album,
            title: album.title.clone(),
            artist: artist_name.to_string(),
            album: String::new(),
        }
    }

    pub fn track(track_id: &str, title: &str, artist_name: &str, album_title: &str) -> Self {
        Self {
            entity_id: track_id.to_string(),
            kind: EntityKind::Track,
            title: title.to_string(),
            artist: artist_name.to_string(),
            album: album_title.to_string(),
        }
    }
}

/// A ranked full-text search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub entity_id: String,
    pub kind: EntityKind,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// FTS5 rank; lower is better
    pub rank: f64,
}

/// A user playlist.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_path: Option<String>,
    pub track_count: i64,
    pub duration_seconds: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One entry of a playlist, joined with its track.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistTrack {
    pub id: String,
    pub playlist_id: String,
    pub position: i64,
    pub added_at: NaiveDateTime,
    pub track: Track,
}

/// A recorded play event.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PlayHistory {
    pub id: String,
    pub track_id: String,
    pub played_at: NaiveDateTime,
    pub duration_listened: Option<f64>,
}

/// Entity totals for the whole library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub artists: i64,
    pub albums: i64,
    pub tracks: i64,
}

/// One page of a listing plus the unpaginated total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Out-of-range limits fall back to the default; negative offsets to 0.
    pub fn clamped(self) -> Self {
        let limit = if self.limit <= 0 || self.limit > Self::MAX_LIMIT {
            Self::DEFAULT_LIMIT
        } else {
            self.limit
        };
        Self {
            limit,
            offset: self.offset.max(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension_case_insensitive() {
        assert_eq!(AudioFormat::from_extension("FLAC"), Some(AudioFormat::Flac));
        assert_eq!(AudioFormat::from_extension("Mp3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_extension("opus"), Some(AudioFormat::Opus));
        assert_eq!(AudioFormat::from_extension("wav"), None);
        assert_eq!(AudioFormat::from_extension(""), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            AudioFormat::from_path(Path::new("/music/a/01 Song.M4A")),
            Some(AudioFormat::M4a)
        );
        assert_eq!(AudioFormat::from_path(Path::new("/music/cover.jpg")), None);
        assert_eq!(AudioFormat::from_path(Path::new("/music/README")), None);
    }

    #[test]
    fn test_entity_kind_roundtrip_through_str() {
        for kind in [EntityKind::Artist, EntityKind::Album, EntityKind::Track] {
            assert_eq!(kind.as_str().parse::<EntityKind>(), Ok(kind));
        }
        assert!("playlist".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(Pagination::new(0, 0).clamped().limit, 50);
        assert_eq!(Pagination::new(500, 0).clamped().limit, 50);
        assert_eq!(Pagination::new(25, -3).clamped(), Pagination::new(25, 0));
        assert_eq!(Pagination::new(200, 10).clamped(), Pagination::new(200, 10));
    }
}
