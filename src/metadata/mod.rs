//! Audio file metadata reading.
//!
//! Uses the lofty crate for format-independent tag access and, for FLAC,
//! the exact stream properties from STREAMINFO.
//!
//! # Features
//! - Read tags into explicit optional fields (absent is `None`, never `""` or `0`)
//! - Resolve display values through the fallback chain
//!   (e.g. artist -> album artist -> "Unknown Artist")
//! - Carry the embedded cover picture for the cover-art extractor

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::properties::FileProperties;
use lofty::picture::{MimeType, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::AudioFormat;

/// Artist name used when neither artist nor album-artist tags are present.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
/// Album title used when the album tag is missing.
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Bytes per second assumed by the duration estimate (~1 Mbps).
const ESTIMATED_BYTES_PER_SECOND: f64 = 125_000.0;

/// Tag values as found in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
}

/// Stream properties, when they could be read exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioInfo {
    pub duration_seconds: Option<f64>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u8>,
    pub channels: Option<u8>,
}

/// Cover art embedded in the file's tags, bytes untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPicture {
    pub data: Vec<u8>,
    /// Declared MIME type (image/jpeg, image/png, ...)
    pub mime_type: String,
}

/// Everything the ingestion pipeline needs from one audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    pub format: AudioFormat,
    pub file_size: u64,
    pub tags: TagInfo,
    pub audio: AudioInfo,
    pub picture: Option<EmbeddedPicture>,
}

impl TrackMetadata {
    /// Artist tag, then album-artist tag, then [`UNKNOWN_ARTIST`].
    pub fn artist_name(&self) -> &str {
        self.tags
            .artist
            .as_deref()
            .or(self.tags.album_artist.as_deref())
            .unwrap_or(UNKNOWN_ARTIST)
    }

    /// Album tag, then [`UNKNOWN_ALBUM`].
    pub fn album_title(&self) -> &str {
        self.tags.album.as_deref().unwrap_or(UNKNOWN_ALBUM)
    }

    /// Title tag, then the file name with its extension stripped.
    pub fn title(&self, path: &Path) -> String {
        match &self.tags.title {
            Some(title) => title.clone(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    pub fn track_number(&self) -> Option<u32> {
        self.tags.track_number.filter(|&n| n > 0)
    }

    /// Disc number, defaulting to 1 when absent or zero.
    pub fn disc_number(&self) -> u32 {
        self.tags.disc_number.filter(|&n| n > 0).unwrap_or(1)
    }

    /// Exact duration when known, otherwise `file_size / 125000`.
    ///
    /// The estimate assumes ~1 Mbps and is only a last resort; it can be far
    /// off for lossy formats.
    pub fn duration_seconds(&self) -> f64 {
        match self.audio.duration_seconds {
            Some(d) if d > 0.0 => d,
            _ => self.file_size as f64 / ESTIMATED_BYTES_PER_SECOND,
        }
    }

    /// Average bitrate in bits per second, derived from size and duration.
    pub fn bitrate(&self) -> Option<u64> {
        let duration = self.duration_seconds();
        (duration > 0.0).then(|| ((self.file_size * 8) as f64 / duration) as u64)
    }

    /// Channel count, defaulting to stereo.
    pub fn channels(&self) -> u8 {
        self.audio.channels.unwrap_or(2)
    }
}

/// Read metadata from the audio file at `path`.
///
/// Fails when the file cannot be opened or its container cannot be parsed.
/// For FLAC, stream properties come from STREAMINFO (wherever it sits, also
/// behind an ID3v2 prefix); other formats ignore stream properties and fall
/// back to the size-based duration estimate.
pub fn read(path: &Path, format: AudioFormat) -> Result<TrackMetadata> {
    let file_size = std::fs::metadata(path)
        .map_err(|e| Error::metadata(path, format!("Failed to stat file: {e}")))?
        .len();

    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("Failed to open file for probing: {e}")))?
        .read()
        .map_err(|e| Error::metadata(path, format!("Failed to read file metadata: {e}")))?;

    // Get the primary tag, or fall back to the first available tag
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let tags = tag.map(read_tags).unwrap_or_default();
    let picture = tag.and_then(front_cover);

    // Stream properties are only trusted for FLAC, where STREAMINFO is exact
    let audio = match format {
        AudioFormat::Flac => stream_properties(tagged_file.properties()),
        _ => AudioInfo::default(),
    };

    Ok(TrackMetadata {
        format,
        file_size,
        tags,
        audio,
        picture,
    })
}

fn stream_properties(properties: &FileProperties) -> AudioInfo {
    let duration = properties.duration().as_secs_f64();
    AudioInfo {
        duration_seconds: (duration > 0.0).then_some(duration),
        sample_rate: properties.sample_rate().filter(|&r| r > 0),
        bit_depth: properties.bit_depth().filter(|&b| b > 0),
        channels: properties.channels().filter(|&c| c > 0),
    }
}

fn non_empty(value: Option<impl AsRef<str>>) -> Option<String> {
    value
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_tags(tag: &Tag) -> TagInfo {
    TagInfo {
        title: non_empty(tag.title()),
        artist: non_empty(tag.artist()),
        album_artist: non_empty(tag.get_string(&ItemKey::AlbumArtist)),
        album: non_empty(tag.album()),
        year: read_year(tag),
        genre: non_empty(tag.genre()),
        track_number: tag.track().filter(|&n| n > 0),
        disc_number: tag.disk().filter(|&n| n > 0),
    }
}

/// Year accessor, then the leading digits of a year or recording date.
fn read_year(tag: &Tag) -> Option<u32> {
    tag.year()
        .or_else(|| {
            [ItemKey::Year, ItemKey::RecordingDate]
                .iter()
                .find_map(|key| tag.get_string(key))
                .and_then(|text| text.trim().get(..4)?.parse().ok())
        })
        .filter(|&y| y > 0)
}

/// Prefer the front cover, fall back to the first picture.
fn front_cover(tag: &Tag) -> Option<EmbeddedPicture> {
    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    let mime_type = match picture.mime_type() {
        Some(MimeType::Unknown(declared)) if !declared.is_empty() => declared.to_ascii_lowercase(),
        Some(MimeType::Unknown(_)) | None => "image/jpeg".to_string(), // Default assumption
        Some(mime) => mime.as_str().to_string(),
    };

    Some(EmbeddedPicture {
        data: picture.data().to_vec(),
        mime_type,
    })
}
