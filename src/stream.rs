//! Streaming helpers: content types and transcode cache naming.
//!
//! No audio is served or transcoded here; these are the pieces a serving
//! layer needs to label a track's bytes and to find a cached transcode.

use std::path::{Path, PathBuf};

/// MIME type for an audio format tag (as stored on tracks).
pub fn mime_type_for_format(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "flac" => "audio/flac",
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/mp4",
        "ogg" => "audio/ogg",
        "opus" => "audio/opus",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Directory of transcoded renditions.
#[derive(Debug, Clone)]
pub struct TranscodeCache {
    dir: PathBuf,
    ffmpeg_path: Option<PathBuf>,
}

impl TranscodeCache {
    pub fn new(dir: impl Into<PathBuf>, ffmpeg_path: Option<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ffmpeg_path,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Configured transcoder binary, if any.
    pub fn ffmpeg_path(&self) -> Option<&Path> {
        self.ffmpeg_path.as_deref()
    }

    /// `<dir>/<track_id>_<format>_<kbps>k.<format>`
    pub fn cache_path(&self, track_id: &str, format: &str, bitrate_kbps: u32) -> PathBuf {
        let format = format.to_ascii_lowercase();
        self.dir
            .join(format!("{track_id}_{format}_{bitrate_kbps}k.{format}"))
    }

    /// The cached rendition, if it has been produced.
    pub fn lookup(&self, track_id: &str, format: &str, bitrate_kbps: u32) -> Option<PathBuf> {
        let path = self.cache_path(track_id, format, bitrate_kbps);
        path.is_file().then_some(path)
    }
}
