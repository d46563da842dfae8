//! Album artwork storage.
//!
//! Cover art embedded in audio files is written once per album to the
//! artwork directory as `<album_id>.<ext>`, bytes untouched. The extension
//! follows the declared MIME type; anything unrecognized is stored as `.jpg`.
//!
//! Deciding *when* to extract (only for albums still lacking a cover, first
//! write wins) is the ingestion pipeline's job; see
//! [`library`](crate::library).

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::metadata::EmbeddedPicture;

/// File extension for an image MIME type. Unknown types map to `jpg`.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let mime = mime_type.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" | "image/x-ms-bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Artwork directory on disk.
#[derive(Debug, Clone)]
pub struct CoverStore {
    dir: PathBuf,
}

/// Picture bytes written under a private temp name, not yet visible at
/// their final path.
#[derive(Debug)]
pub struct StagedCover {
    temp: PathBuf,
    target: PathBuf,
}

impl CoverStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the cover for `album_id` with this MIME type is stored.
    pub fn path_for(&self, album_id: &str, mime_type: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", album_id, extension_for_mime(mime_type)))
    }

    /// Write the picture for `album_id` to a temp file next to its final
    /// path, creating the directory if needed.
    ///
    /// Nothing appears at the final path until [`StagedCover::commit`], so a
    /// writer that loses the race for the album never touches the winner's
    /// file.
    pub fn stage(&self, album_id: &str, picture: &EmbeddedPicture) -> Result<StagedCover, std::io::Error> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(album_id, &picture.mime_type);
        let temp = self.dir.join(format!(".{album_id}.{}.tmp", Uuid::new_v4()));
        fs::write(&temp, &picture.data)?;
        Ok(StagedCover { temp, target })
    }
}

impl StagedCover {
    /// Final location once committed.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the bytes into place.
    pub fn commit(self) -> Result<PathBuf, std::io::Error> {
        if let Err(e) = fs::rename(&self.temp, &self.target) {
            let _ = fs::remove_file(&self.temp);
            return Err(e);
        }
        Ok(self.target)
    }

    /// Drop the staged bytes.
    pub fn discard(self) {
        if let Err(e) = fs::remove_file(&self.temp) {
            tracing::debug!(target: "cover", path = %self.temp.display(), error = %e, "Failed to remove staged cover");
        }
    }
}
