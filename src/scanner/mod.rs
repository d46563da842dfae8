//! Directory walker yielding candidate audio files.

use futures::stream::Stream;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::model::AudioFormat;

/// Paths buffered between the walker thread and the consumer.
const CHANNEL_CAPACITY: usize = 100;

/// Whether `path` has one of the supported audio extensions
/// (flac, mp3, m4a, ogg, opus; case-insensitive).
pub fn is_audio_file(path: &Path) -> bool {
    AudioFormat::from_path(path).is_some()
}

/// Scans the given root directories recursively for audio files.
///
/// Roots are walked in order and made absolute first, so every yielded path
/// is absolute. Symlinks are not followed. Unreadable entries are logged and
/// skipped; a root that cannot be read at all is logged and abandoned.
///
/// The stream is finite and lazy: traversal runs on a blocking thread and
/// pauses when the consumer falls behind.
pub fn scan(roots: Vec<PathBuf>) -> impl Stream<Item = PathBuf> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    // Spawn a blocking task to perform the synchronous file system traversal
    tokio::task::spawn_blocking(move || {
        for root in roots {
            let root = std::path::absolute(&root).unwrap_or(root);
            debug!(target: "scanner::walk", root = %root.display(), "Walking library root");

            if !walk_root(&root, &tx) {
                // Receiver dropped, nobody is listening any more
                break;
            }
        }
    });

    // Convert the mpsc Receiver into a Stream
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|path| (path, rx))
    })
}

/// Walk one root, sending audio files. Returns false once the receiver is gone.
fn walk_root(root: &Path, tx: &mpsc::Sender<PathBuf>) -> bool {
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                error!(target: "scanner::walk", root = %root.display(), error = %e, "Cannot read library root");
                return true;
            }
            Err(e) => {
                warn!(target: "scanner::walk", error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_file() && is_audio_file(entry.path()) {
            // If the receiver is dropped, blocking_send returns an error and we stop.
            if tx.blocking_send(entry.into_path()).is_err() {
                return false;
            }
        }
    }
    true
}
