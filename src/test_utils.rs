//! Test utilities and fixtures for musicvault tests.
//!
//! This module provides common test helpers, mock factories, and
//! database utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use musicvault::test_utils::{temp_db, FlacFixture};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, dir) = temp_db().await;
//!     FlacFixture::new().tag("TITLE", "Song").write(&dir.path().join("a.flac"));
//!     // ... test logic
//! }
//! ```

use std::path::Path;

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::metadata::{AudioInfo, TagInfo, TrackMetadata};
use crate::model::{AudioFormat, NewTrack, Track};

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// # Returns
///
/// A tuple of (connection pool, temp directory handle).
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = crate::db::db_url(&db_path);

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Creates a mock TrackMetadata with sensible defaults.
///
/// Customize using struct update syntax:
///
/// ```ignore
/// let custom = TrackMetadata {
///     file_size: 0,
///     ..mock_track_metadata()
/// };
/// ```
pub fn mock_track_metadata() -> TrackMetadata {
    TrackMetadata {
        format: AudioFormat::Flac,
        file_size: 30_000_000,
        tags: TagInfo {
            title: Some("Test Track".to_string()),
            artist: Some("Test Artist".to_string()),
            album_artist: None,
            album: Some("Test Album".to_string()),
            year: Some(2023),
            genre: Some("Rock".to_string()),
            track_number: Some(1),
            disc_number: Some(1),
        },
        audio: AudioInfo {
            duration_seconds: Some(180.0),
            sample_rate: Some(44_100),
            bit_depth: Some(16),
            channels: Some(2),
        },
        picture: None,
    }
}

/// Creates a NewTrack for `path` owned by the given album and artist.
pub fn mock_new_track(path: &str, album_id: &str, artist_id: &str) -> NewTrack {
    NewTrack {
        id: crate::identity::track_id(Path::new(path)),
        album_id: album_id.to_string(),
        artist_id: artist_id.to_string(),
        title: "Test Track".to_string(),
        track_number: Some(1),
        disc_number: 1,
        duration_seconds: 180.0,
        file_path: path.to_string(),
        file_size: 30_000_000,
        format: AudioFormat::Flac,
        sample_rate: Some(44_100),
        bit_depth: Some(16),
        channels: 2,
        bitrate: Some(1_333_333),
    }
}

/// Inserts a mock track (with its artist and album) and returns it.
pub async fn insert_mock_track(pool: &SqlitePool, path: &str) -> Track {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let artist = crate::db::upsert_artist(&mut conn, "Test Artist")
        .await
        .expect("Failed to create artist");
    let album = crate::db::upsert_album(&mut conn, &artist.id, "Test Album", Some(2023), None)
        .await
        .expect("Failed to create album");

    let new_track = mock_new_track(path, &album.id, &artist.id);
    crate::db::upsert_track(&mut conn, &new_track)
        .await
        .expect("Failed to insert track");
    crate::db::recalculate_album_stats(&mut conn, &album.id)
        .await
        .expect("Failed to recalculate album");
    drop(conn);

    crate::db::get_track(pool, &new_track.id)
        .await
        .expect("Failed to read back track")
}

/// Builder for minimal valid FLAC files.
///
/// Produces the `fLaC` marker, a STREAMINFO block, a VORBIS_COMMENT block and
/// optionally a PICTURE block, followed by a few bytes standing in for audio
/// frames. Enough for tag readers; not decodable audio.
#[derive(Debug, Clone)]
pub struct FlacFixture {
    sample_rate: u32,
    channels: u8,
    bits_per_sample: u8,
    total_samples: u64,
    comments: Vec<(String, String)>,
    picture: Option<(String, Vec<u8>)>,
}

impl Default for FlacFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl FlacFixture {
    /// CD-quality stereo, ten seconds, no tags.
    pub fn new() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bits_per_sample: 16,
            total_samples: 44_100 * 10,
            comments: Vec::new(),
            picture: None,
        }
    }

    pub fn stream(mut self, sample_rate: u32, channels: u8, bits: u8, total_samples: u64) -> Self {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self.bits_per_sample = bits;
        self.total_samples = total_samples;
        self
    }

    /// Add a Vorbis comment, e.g. `tag("ARTIST", "Radiohead")`.
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.comments.push((key.to_string(), value.to_string()));
        self
    }

    /// Embed a front-cover picture.
    pub fn picture(mut self, mime_type: &str, data: &[u8]) -> Self {
        self.picture = Some((mime_type.to_string(), data.to_vec()));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = b"fLaC".to_vec();

        let mut blocks: Vec<(u8, Vec<u8>)> = vec![(0, self.stream_info()), (4, self.vorbis_comment())];
        if let Some(picture) = self.picture_block() {
            blocks.push((6, picture));
        }

        let last = blocks.len() - 1;
        for (i, (block_type, body)) in blocks.into_iter().enumerate() {
            let flag = if i == last { 0x80 } else { 0x00 };
            let len = body.len() as u32;
            out.push(flag | block_type);
            out.extend_from_slice(&len.to_be_bytes()[1..]);
            out.extend_from_slice(&body);
        }

        // Frame sync followed by filler
        out.extend_from_slice(&[0xFF, 0xF8, 0x69, 0x08, 0x00, 0x00, 0x00, 0x00]);
        out
    }

    /// Write the file, creating parent directories.
    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        std::fs::write(path, self.to_bytes()).expect("Failed to write FLAC fixture");
    }

    fn stream_info(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(34);
        body.extend_from_slice(&4096u16.to_be_bytes()); // min block size
        body.extend_from_slice(&4096u16.to_be_bytes()); // max block size
        body.extend_from_slice(&[0; 3]); // min frame size (unknown)
        body.extend_from_slice(&[0; 3]); // max frame size (unknown)

        let packed = (u64::from(self.sample_rate) << 44)
            | (u64::from(self.channels - 1) << 41)
            | (u64::from(self.bits_per_sample - 1) << 36)
            | (self.total_samples & 0x000F_FFFF_FFFF);
        body.extend_from_slice(&packed.to_be_bytes());
        body.extend_from_slice(&[0; 16]); // MD5
        body
    }

    fn vorbis_comment(&self) -> Vec<u8> {
        let vendor = b"test";
        let mut body = Vec::new();
        body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        body.extend_from_slice(vendor);
        body.extend_from_slice(&(self.comments.len() as u32).to_le_bytes());
        for (key, value) in &self.comments {
            let entry = format!("{key}={value}");
            body.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            body.extend_from_slice(entry.as_bytes());
        }
        body
    }

    fn picture_block(&self) -> Option<Vec<u8>> {
        let (mime, data) = self.picture.as_ref()?;
        let description = b"cover";
        let mut body = Vec::new();
        body.extend_from_slice(&3u32.to_be_bytes()); // front cover
        body.extend_from_slice(&(mime.len() as u32).to_be_bytes());
        body.extend_from_slice(mime.as_bytes());
        body.extend_from_slice(&(description.len() as u32).to_be_bytes());
        body.extend_from_slice(description);
        body.extend_from_slice(&1u32.to_be_bytes()); // width
        body.extend_from_slice(&1u32.to_be_bytes()); // height
        body.extend_from_slice(&24u32.to_be_bytes()); // color depth
        body.extend_from_slice(&0u32.to_be_bytes()); // indexed colors
        body.extend_from_slice(&(data.len() as u32).to_be_bytes());
        body.extend_from_slice(data);
        Some(body)
    }
}

/// Builder for minimal MP3 files.
///
/// An ID3v2.3 tag with text frames, followed by a few MPEG-1 Layer III frame
/// headers (128 kbps, 44.1 kHz, joint stereo) padded with zeros to full frame
/// length.
#[derive(Debug, Clone, Default)]
pub struct Mp3Fixture {
    frames: Vec<(String, String)>,
}

impl Mp3Fixture {
    const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];
    /// 144 * 128000 / 44100
    const FRAME_LEN: usize = 417;
    const FRAME_COUNT: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ID3v2 text frame, e.g. `tag("TPE1", "Boards of Canada")`.
    pub fn tag(mut self, frame_id: &str, value: &str) -> Self {
        self.frames.push((frame_id.to_string(), value.to_string()));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut frames = Vec::new();
        for (id, value) in &self.frames {
            let mut body = vec![0u8]; // ISO-8859-1
            body.extend_from_slice(value.as_bytes());
            frames.extend_from_slice(id.as_bytes());
            frames.extend_from_slice(&(body.len() as u32).to_be_bytes());
            frames.extend_from_slice(&[0, 0]); // flags
            frames.extend_from_slice(&body);
        }

        let mut out = b"ID3\x03\x00\x00".to_vec();
        out.extend_from_slice(&synchsafe(frames.len() as u32));
        out.extend_from_slice(&frames);

        for _ in 0..Self::FRAME_COUNT {
            let start = out.len();
            out.extend_from_slice(&Self::FRAME_HEADER);
            out.resize(start + Self::FRAME_LEN, 0);
        }
        out
    }

    /// Write the file, creating parent directories.
    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        std::fs::write(path, self.to_bytes()).expect("Failed to write MP3 fixture");
    }
}

fn synchsafe(n: u32) -> [u8; 4] {
    [
        ((n >> 21) & 0x7F) as u8,
        ((n >> 14) & 0x7F) as u8,
        ((n >> 7) & 0x7F) as u8,
        (n & 0x7F) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;

        let stats = crate::db::count_entities(&pool).await.unwrap();
        assert_eq!(stats.tracks, 0);
    }

    #[tokio::test]
    async fn test_insert_mock_track() {
        let (pool, _dir) = temp_db().await;

        let track = insert_mock_track(&pool, "/test/song.flac").await;
        assert_eq!(track.file_path, "/test/song.flac");
        assert_eq!(track.artist_name, "Test Artist");
        assert_eq!(track.album_title, "Test Album");
    }

    #[test]
    fn test_mock_track_metadata_defaults() {
        let meta = mock_track_metadata();
        assert_eq!(meta.artist_name(), "Test Artist");
        assert_eq!(meta.album_title(), "Test Album");
        assert_eq!(meta.duration_seconds(), 180.0);
        assert_eq!(meta.track_number(), Some(1));
    }

    #[test]
    fn test_flac_fixture_layout() {
        let bytes = FlacFixture::new().tag("TITLE", "x").to_bytes();
        assert_eq!(&bytes[..4], b"fLaC");
        // STREAMINFO header: not last, type 0, length 34
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 34]);
        // VORBIS_COMMENT header is the last block
        assert_eq!(bytes[42], 0x84);
    }

    #[test]
    fn test_mp3_fixture_layout() {
        let bytes = Mp3Fixture::new().tag("TIT2", "abc").to_bytes();
        assert_eq!(&bytes[..4], b"ID3\x03");
        // One frame: 10-byte header + encoding byte + 3 chars
        assert_eq!(&bytes[6..10], &[0, 0, 0, 14]);
        assert_eq!(&bytes[24..28], &Mp3Fixture::FRAME_HEADER);
        assert_eq!(bytes.len(), 24 + 4 * 417);
    }

    #[test]
    fn test_flac_fixture_picture_is_last_block() {
        let bytes = FlacFixture::new().picture("image/png", &[1, 2, 3]).to_bytes();
        // VORBIS_COMMENT (no comments): 4 + 4 + 4 bytes of body
        assert_eq!(bytes[42], 0x04);
        assert_eq!(bytes[42 + 4 + 12], 0x86);
    }
}
