//! Full-text search over the library.
//!
//! The `search_index` FTS5 table mirrors every artist, album and track as a
//! denormalized [`SearchEntry`]. FTS5 has no upsert, so [`index_entity`]
//! deletes the previous row for the entity and inserts a fresh one. The two
//! statements are not atomic on their own; the ingestion pipeline runs them
//! inside its per-file transaction.
//!
//! Queries are sanitized by [`prepare_query`] before reaching `MATCH`, and the
//! last token is prefix-matched for type-ahead.

use serde::Serialize;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use tracing::warn;

use crate::error::Result;
use crate::model::{EntityKind, SearchEntry, SearchResult};

/// Result limit used when the requested one is out of range.
pub const DEFAULT_LIMIT: i64 = 30;
const MAX_LIMIT: i64 = 100;

/// Turn raw user input into an FTS5 query.
///
/// Tokens are split on whitespace and stripped of quote characters; each
/// surviving token is wrapped in FTS5 string quotes so punctuation such as
/// `AC/DC` or `-` cannot be read as query syntax. The last token gets a `*`
/// for prefix matching. Returns `None` when nothing searchable remains.
pub fn prepare_query(raw: &str) -> Option<String> {
    let tokens: Vec<String> = raw
        .split_whitespace()
        .map(|t| t.replace(['"', '\''], ""))
        .filter(|t| !t.is_empty())
        .collect();

    let (last, rest) = tokens.split_last()?;
    let mut query: Vec<String> = rest.iter().map(|t| format!("\"{t}\"")).collect();
    query.push(format!("\"{last}\"*"));
    Some(query.join(" "))
}

/// Replace the index row for one entity.
///
/// The previous row is found through `search_keys` and deleted by rowid;
/// the FTS5 key columns are UNINDEXED and would need a full table scan.
pub async fn index_entity(conn: &mut SqliteConnection, entry: &SearchEntry) -> sqlx::Result<()> {
    let previous: Option<i64> = sqlx::query_scalar(
        "SELECT fts_rowid FROM search_keys WHERE entity_id = ? AND entity_type = ?",
    )
    .bind(&entry.entity_id)
    .bind(entry.kind.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(rowid) = previous {
        sqlx::query("DELETE FROM search_index WHERE rowid = ?")
            .bind(rowid)
            .execute(&mut *conn)
            .await?;
    }

    let rowid = sqlx::query(
        "INSERT INTO search_index (entity_id, entity_type, title, artist, album) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&entry.entity_id)
    .bind(entry.kind.as_str())
    .bind(&entry.title)
    .bind(&entry.artist)
    .bind(&entry.album)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    sqlx::query(
        r#"
        INSERT INTO search_keys (entity_id, entity_type, fts_rowid) VALUES (?, ?, ?)
        ON CONFLICT(entity_id, entity_type) DO UPDATE SET fts_rowid = excluded.fts_rowid
        "#,
    )
    .bind(&entry.entity_id)
    .bind(entry.kind.as_str())
    .bind(rowid)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Raw index row; `entity_type` is validated on conversion.
#[derive(Debug, sqlx::FromRow)]
struct SearchRow {
    entity_id: String,
    entity_type: String,
    title: String,
    artist: String,
    album: String,
    rank: f64,
}

impl SearchRow {
    fn into_result(self) -> Option<SearchResult> {
        match self.entity_type.parse::<EntityKind>() {
            Ok(kind) => Some(SearchResult {
                entity_id: self.entity_id,
                kind,
                title: self.title,
                artist: self.artist,
                album: self.album,
                rank: self.rank,
            }),
            Err(e) => {
                warn!(target: "search", entity_id = %self.entity_id, error = %e, "Skipping malformed index row");
                None
            }
        }
    }
}

/// Search the index, best matches first.
///
/// Limits outside 1..=100 fall back to [`DEFAULT_LIMIT`]. Input with nothing
/// searchable yields no results without touching the database.
pub async fn search(pool: &SqlitePool, raw: &str, limit: i64) -> Result<Vec<SearchResult>> {
    let Some(query) = prepare_query(raw) else {
        return Ok(Vec::new());
    };
    let limit = if (1..=MAX_LIMIT).contains(&limit) {
        limit
    } else {
        DEFAULT_LIMIT
    };

    let rows = sqlx::query_as::<_, SearchRow>(
        r#"
        SELECT entity_id, entity_type, title, artist, album, rank
        FROM search_index
        WHERE search_index MATCH ?
        ORDER BY rank
        LIMIT ?
        "#,
    )
    .bind(&query)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(SearchRow::into_result).collect())
}

/// Search results split by entity kind, each keeping rank order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupedResults {
    pub artists: Vec<SearchResult>,
    pub albums: Vec<SearchResult>,
    pub tracks: Vec<SearchResult>,
    pub total: usize,
}

pub fn group_results(results: Vec<SearchResult>) -> GroupedResults {
    let mut grouped = GroupedResults {
        total: results.len(),
        ..Default::default()
    };
    for result in results {
        match result.kind {
            EntityKind::Artist => grouped.artists.push(result),
            EntityKind::Album => grouped.albums.push(result),
            EntityKind::Track => grouped.tracks.push(result),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_db;
    use proptest::prelude::*;

    #[test]
    fn test_prepare_query() {
        assert_eq!(prepare_query("beatles").as_deref(), Some("\"beatles\"*"));
        assert_eq!(
            prepare_query("  abbey   road ").as_deref(),
            Some("\"abbey\" \"road\"*")
        );
        assert_eq!(prepare_query("\"don't\" stop").as_deref(), Some("\"dont\" \"stop\"*"));
        assert_eq!(prepare_query("AC/DC").as_deref(), Some("\"AC/DC\"*"));
    }

    #[test]
    fn test_prepare_query_empty() {
        assert_eq!(prepare_query(""), None);
        assert_eq!(prepare_query("   \t "), None);
        assert_eq!(prepare_query("\"\" ''"), None);
    }

    #[test]
    fn test_group_results() {
        let result = |kind| SearchResult {
            entity_id: "x".into(),
            kind,
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            rank: -1.0,
        };
        let grouped = group_results(vec![
            result(EntityKind::Track),
            result(EntityKind::Artist),
            result(EntityKind::Track),
        ]);
        assert_eq!(grouped.total, 3);
        assert_eq!(grouped.artists.len(), 1);
        assert!(grouped.albums.is_empty());
        assert_eq!(grouped.tracks.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_prepared_query_is_balanced(raw in "\\PC{0,40}") {
            if let Some(query) = prepare_query(&raw) {
                prop_assert!(query.ends_with('*'));
                prop_assert_eq!(query.matches('"').count() % 2, 0);
                prop_assert!(!query.contains('\''));
            }
        }
    }

    #[tokio::test]
    async fn test_index_and_search() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        index_entity(&mut conn, &SearchEntry::track("t1", "Paranoid Android", "Radiohead", "OK Computer"))
            .await
            .unwrap();
        index_entity(&mut conn, &SearchEntry::track("t2", "Karma Police", "Radiohead", "OK Computer"))
            .await
            .unwrap();
        drop(conn);

        let results = search(&pool, "paran", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_id, "t1");
        assert_eq!(results[0].kind, EntityKind::Track);

        // Matches on the artist column too
        assert_eq!(search(&pool, "radiohead", 0).await.unwrap().len(), 2);
        assert!(search(&pool, "   ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reindex_replaces_row() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        index_entity(&mut conn, &SearchEntry::track("t1", "Old Title", "Artist", "Album"))
            .await
            .unwrap();
        index_entity(&mut conn, &SearchEntry::track("t1", "New Title", "Artist", "Album"))
            .await
            .unwrap();
        drop(conn);

        assert!(search(&pool, "old", 10).await.unwrap().is_empty());
        let results = search(&pool, "new title", 10).await.unwrap();
        assert_eq!(results.len(), 1);

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM search_index WHERE entity_id = 't1'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_reindex_deletes_by_recorded_rowid() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        // Same ID under two kinds: each keeps its own row
        index_entity(&mut conn, &SearchEntry::track("x", "Shared", "Artist", "Album"))
            .await
            .unwrap();
        index_entity(&mut conn, &SearchEntry::track("t2", "Other", "Artist", "Album"))
            .await
            .unwrap();
        let album = SearchEntry {
            entity_id: "x".to_string(),
            kind: EntityKind::Album,
            title: "Shared".to_string(),
            artist: "Artist".to_string(),
            album: String::new(),
        };
        index_entity(&mut conn, &album).await.unwrap();
        index_entity(&mut conn, &SearchEntry::track("x", "Renamed", "Artist", "Album"))
            .await
            .unwrap();

        let keys: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT entity_id, entity_type, fts_rowid FROM search_keys ORDER BY entity_id, entity_type",
        )
        .fetch_all(&mut *conn)
        .await
        .unwrap();
        let rowids: Vec<i64> = sqlx::query_scalar("SELECT rowid FROM search_index ORDER BY rowid")
            .fetch_all(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        assert_eq!(keys.len(), 3);
        let mut keyed: Vec<i64> = keys.iter().map(|(_, _, rowid)| *rowid).collect();
        keyed.sort();
        assert_eq!(keyed, rowids);

        let grouped = group_results(search(&pool, "shared", 10).await.unwrap());
        assert_eq!(grouped.albums.len(), 1);
        assert!(grouped.tracks.is_empty());
        assert_eq!(search(&pool, "renamed", 10).await.unwrap().len(), 1);
        assert_eq!(search(&pool, "other", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_tolerates_fts_syntax_in_input() {
        let (pool, _dir) = temp_db().await;
        let mut conn = pool.acquire().await.unwrap();
        index_entity(&mut conn, &SearchEntry::track("t1", "Highway to Hell", "AC/DC", "Highway to Hell"))
            .await
            .unwrap();
        drop(conn);

        let results = search(&pool, "AC/DC", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        // Operators are quoted into plain terms
        assert!(search(&pool, "NOT hell", 10).await.unwrap().is_empty());
        assert_eq!(search(&pool, "highway-to", 10).await.unwrap().len(), 1);
    }
}
