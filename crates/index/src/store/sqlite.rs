//! SQLite-backed vector store.
//!
//! Vectors are stored as little-endian `f32` blobs and searched by a full
//! scan over the rows of one video, which keeps per-video collections of a
//! few thousand frames well within interactive latency.

use super::{DistanceMetric, VectorStore};
use crate::types::{CollectionStats, FrameKind, IndexEntry, QueryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use visionrag_core::{AppError, AppResult};

pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    collection: String,
    metric: DistanceMetric,
}

impl SqliteVectorStore {
    /// Open (or create) a collection in the database at `db_path`.
    ///
    /// A collection keeps the metric it was created with; a different
    /// `metric` argument for an existing collection is ignored with a warning.
    pub fn open(db_path: &Path, collection: &str, metric: DistanceMetric) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite index: {}", e)))?;
        let store = Self::from_connection(conn, collection, metric)?;

        tracing::debug!(
            "Opened collection '{}' ({}) at {:?}",
            store.collection,
            store.metric.as_str(),
            db_path
        );
        Ok(store)
    }

    fn from_connection(conn: Connection, collection: &str, metric: DistanceMetric) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                metric TEXT NOT NULL,
                dimension INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                video_id TEXT NOT NULL,
                frame_index INTEGER NOT NULL,
                timestamp_seconds REAL NOT NULL,
                timestamp_str TEXT NOT NULL,
                caption TEXT NOT NULL,
                kind TEXT NOT NULL,
                document TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_entries_video ON entries(collection, video_id);
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT metric FROM collections WHERE name = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Store(format!("Failed to read collection: {}", e)))?;

        let metric = match stored {
            Some(existing) => {
                let existing = DistanceMetric::parse(&existing)?;
                if existing != metric {
                    tracing::warn!(
                        "Collection '{}' was created with metric '{}'; ignoring requested '{}'",
                        collection,
                        existing.as_str(),
                        metric.as_str()
                    );
                }
                existing
            }
            None => {
                conn.execute(
                    "INSERT INTO collections (name, metric, dimension, created_at) VALUES (?1, ?2, NULL, ?3)",
                    params![collection, metric.as_str(), chrono::Utc::now().to_rfc3339()],
                )
                .map_err(|e| AppError::Store(format!("Failed to create collection: {}", e)))?;
                metric
            }
        };

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
            metric,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Store("Index connection lock poisoned".to_string()))
    }

    fn dimension(conn: &Connection, collection: &str) -> AppResult<Option<usize>> {
        conn.query_row(
            "SELECT dimension FROM collections WHERE name = ?1",
            params![collection],
            |row| row.get::<_, Option<i64>>(0),
        )
        .map(|d| d.map(|d| d as usize))
        .map_err(|e| AppError::Store(format!("Failed to read collection dimension: {}", e)))
    }
}

impl VectorStore for SqliteVectorStore {
    fn upsert(&self, entries: &[IndexEntry]) -> AppResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let dim = entries[0].embedding.len();
        if dim == 0 || entries.iter().any(|e| e.embedding.len() != dim) {
            return Err(AppError::Store(
                "Entries in one upsert must share a non-zero embedding dimension".to_string(),
            ));
        }

        let mut conn = self.lock()?;
        match Self::dimension(&conn, &self.collection)? {
            Some(existing) if existing != dim => {
                return Err(AppError::Store(format!(
                    "Collection '{}' holds {}-dimensional vectors, got {}",
                    self.collection, existing, dim
                )));
            }
            _ => {}
        }

        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            "UPDATE collections SET dimension = ?1 WHERE name = ?2 AND dimension IS NULL",
            params![dim as i64, self.collection],
        )
        .map_err(|e| AppError::Store(format!("Failed to record dimension: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO entries
                     (collection, id, video_id, frame_index, timestamp_seconds, timestamp_str, caption, kind, document, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )
                .map_err(|e| AppError::Store(format!("Failed to prepare insert: {}", e)))?;

            for entry in entries {
                let m = &entry.metadata;
                stmt.execute(params![
                    self.collection,
                    entry.id,
                    m.video_id,
                    m.frame_index,
                    m.timestamp_seconds,
                    m.timestamp_str,
                    m.caption,
                    m.kind.as_str(),
                    entry.document,
                    embedding_to_bytes(&entry.embedding),
                ])
                .map_err(|e| AppError::Store(format!("Failed to insert entry '{}': {}", entry.id, e)))?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Store(format!("Failed to commit entries: {}", e)))?;

        tracing::debug!("Upserted {} entries into '{}'", entries.len(), self.collection);
        Ok(entries.len())
    }

    fn query(&self, query_vector: &[f32], top_k: usize, video_id: &str) -> AppResult<Vec<QueryResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        if let Some(dim) = Self::dimension(&conn, &self.collection)? {
            if dim != query_vector.len() {
                return Err(AppError::Store(format!(
                    "Query vector has {} dimensions but collection '{}' holds {}",
                    query_vector.len(),
                    self.collection,
                    dim
                )));
            }
        }

        let mut stmt = conn
            .prepare(
                "SELECT frame_index, timestamp_seconds, timestamp_str, caption, kind, embedding
                 FROM entries WHERE collection = ?1 AND video_id = ?2",
            )
            .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![self.collection, video_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                ))
            })
            .map_err(|e| AppError::Store(format!("Failed to query entries: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (frame_index, timestamp_seconds, timestamp_str, caption, kind, blob) =
                row.map_err(|e| AppError::Store(format!("Failed to read entry: {}", e)))?;
            let embedding = bytes_to_embedding(&blob)?;
            let distance = self.metric.distance(query_vector, &embedding);

            results.push(QueryResult {
                caption,
                timestamp_str,
                timestamp_seconds,
                frame_index,
                kind: FrameKind::parse(&kind).unwrap_or(FrameKind::Visual),
                distance,
                similarity_score: self.metric.similarity(distance),
            });
        }

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} entries for video '{}' (requested top-{})",
            results.len(),
            video_id,
            top_k
        );
        Ok(results)
    }

    fn delete_by_video(&self, video_id: &str) -> AppResult<usize> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM entries WHERE collection = ?1 AND video_id = ?2",
                params![self.collection, video_id],
            )
            .map_err(|e| AppError::Store(format!("Failed to delete entries: {}", e)))?;

        tracing::info!("Deleted {} entries of video '{}'", deleted, video_id);
        Ok(deleted)
    }

    fn stats(&self) -> AppResult<CollectionStats> {
        let conn = self.lock()?;
        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM entries WHERE collection = ?1",
                params![self.collection],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Store(format!("Failed to count entries: {}", e)))?;

        Ok(CollectionStats {
            total_entries: total as usize,
            collection_name: self.collection.clone(),
            metric: self.metric.as_str().to_string(),
            dimension: Self::dimension(&conn, &self.collection)?,
        })
    }

    fn count_for_video(&self, video_id: &str) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1 AND video_id = ?2",
            params![self.collection, video_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as usize)
        .map_err(|e| AppError::Store(format!("Failed to count entries: {}", e)))
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store("Invalid embedding bytes length".to_string()));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryMetadata;
    use tempfile::TempDir;

    fn entry(id: &str, document: &str, embedding: Vec<f32>, metadata: EntryMetadata) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            document: document.to_string(),
            embedding,
            metadata,
        }
    }

    fn meta(video_id: &str, frame_index: i64, caption: &str) -> EntryMetadata {
        EntryMetadata {
            video_id: video_id.to_string(),
            frame_index,
            timestamp_seconds: frame_index as f64,
            timestamp_str: format!("00:00:{:02}", frame_index),
            caption: caption.to_string(),
            kind: FrameKind::Visual,
        }
    }

    fn open(dir: &TempDir, metric: DistanceMetric) -> SqliteVectorStore {
        SqliteVectorStore::open(&dir.path().join("index.sqlite"), "video_frames", metric).unwrap()
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let v = vec![0.25, -1.5, 3.0];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)).unwrap(), v);
        assert!(bytes_to_embedding(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_upsert_empty_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, DistanceMetric::L2);
        assert_eq!(store.upsert(&[]).unwrap(), 0);
        assert_eq!(store.stats().unwrap().total_entries, 0);
    }

    #[test]
    fn test_upsert_same_id_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, DistanceMetric::L2);

        store
            .upsert(&[entry("v1_0", "old", vec![1.0, 0.0], meta("v1", 0, "old caption"))])
            .unwrap();
        store
            .upsert(&[entry("v1_0", "new", vec![0.0, 1.0], meta("v1", 0, "new caption"))])
            .unwrap();

        assert_eq!(store.stats().unwrap().total_entries, 1);
        let results = store.query(&[0.0, 1.0], 5, "v1").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].caption, "new caption");
    }

    #[test]
    fn test_query_orders_by_distance_and_truncates() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, DistanceMetric::L2);
        store
            .upsert(&[
                entry("v1_0", "d", vec![0.0, 3.0], meta("v1", 0, "far")),
                entry("v1_1", "d", vec![0.0, 1.0], meta("v1", 1, "near")),
                entry("v1_2", "d", vec![0.0, 2.0], meta("v1", 2, "middle")),
            ])
            .unwrap();

        let results = store.query(&[0.0, 0.0], 2, "v1").unwrap();
        let captions: Vec<_> = results.iter().map(|r| r.caption.as_str()).collect();
        assert_eq!(captions, vec!["near", "middle"]);
        assert_eq!(results[0].distance, 1.0);
        assert!((results[0].similarity_score - 0.5).abs() < 1e-6);
        assert!(store.query(&[0.0, 0.0], 0, "v1").unwrap().is_empty());
    }

    #[test]
    fn test_query_unknown_video_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, DistanceMetric::Cosine);
        store
            .upsert(&[entry("v1_0", "d", vec![1.0, 0.0], meta("v1", 0, "x"))])
            .unwrap();
        assert!(store.query(&[1.0, 0.0], 5, "v2").unwrap().is_empty());
    }

    #[test]
    fn test_dimension_fixed_by_first_upsert() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, DistanceMetric::L2);
        store
            .upsert(&[entry("v1_0", "d", vec![1.0, 0.0], meta("v1", 0, "x"))])
            .unwrap();

        let err = store
            .upsert(&[entry("v1_1", "d", vec![1.0, 0.0, 0.0], meta("v1", 1, "y"))])
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(store.query(&[1.0, 0.0, 0.0], 3, "v1").is_err());
        assert_eq!(store.stats().unwrap().dimension, Some(2));
    }

    #[test]
    fn test_metric_fixed_at_creation_and_persisted() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir, DistanceMetric::Cosine);
            store
                .upsert(&[entry("v1_0", "d", vec![1.0, 0.0], meta("v1", 0, "x"))])
                .unwrap();
        }

        let reopened = open(&dir, DistanceMetric::L2);
        assert_eq!(reopened.metric(), DistanceMetric::Cosine);
        assert_eq!(reopened.stats().unwrap().total_entries, 1);
        assert_eq!(reopened.stats().unwrap().metric, "cosine");
    }

    #[test]
    fn test_collections_are_isolated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.sqlite");
        let a = SqliteVectorStore::open(&path, "a", DistanceMetric::L2).unwrap();
        let b = SqliteVectorStore::open(&path, "b", DistanceMetric::L2).unwrap();

        a.upsert(&[entry("v1_0", "d", vec![1.0], meta("v1", 0, "x"))]).unwrap();
        assert_eq!(a.stats().unwrap().total_entries, 1);
        assert_eq!(b.stats().unwrap().total_entries, 0);
        assert_eq!(b.delete_by_video("v1").unwrap(), 0);
        assert_eq!(a.count_for_video("v1").unwrap(), 1);
    }
}
