//! Deterministic identity derivation for library entities.
//!
//! Every ID is a version-5 UUID over the URL namespace, keyed by a
//! namespaced string:
//!
//! | Entity | Key                                   |
//! |--------|---------------------------------------|
//! | Artist | `artist:{name}`                       |
//! | Album  | `album:{artist_id}:{title}`           |
//! | Track  | `track:{absolute file path}`          |
//!
//! Re-deriving a key always yields the same ID on any machine, which is what
//! lets a re-scan update rows in place instead of duplicating them.
//!
//! Artists are keyed by display name alone, so two distinct artists sharing a
//! name resolve to the same ID.

use std::path::Path;

use uuid::Uuid;

fn derive(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

/// ID of the artist with this display name.
pub fn artist_id(name: &str) -> String {
    derive(&format!("artist:{name}"))
}

/// ID of the album with this title, owned by `artist_id`.
pub fn album_id(artist_id: &str, title: &str) -> String {
    derive(&format!("album:{artist_id}:{title}"))
}

/// ID of the track stored at `path`.
///
/// Callers pass absolute paths; the walker absolutizes its roots.
pub fn track_id(path: &Path) -> String {
    derive(&format!("track:{}", path.to_string_lossy()))
}

/// Sort key with a leading English article removed ("The Cure" -> "Cure").
pub fn sort_name(name: &str) -> &str {
    for prefix in ["the ", "a ", "an "] {
        if name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            return &name[prefix.len()..];
        }
    }
    name
}
