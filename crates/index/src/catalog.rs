//! Catalog of processed videos.
//!
//! Lives in the same SQLite file as the vector store so a workspace has a
//! single index file.

use crate::types::VideoRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use visionrag_core::{AppError, AppResult};

pub struct VideoCatalog {
    conn: Mutex<Connection>,
}

impl VideoCatalog {
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                original_name TEXT NOT NULL,
                stored_path TEXT NOT NULL,
                duration REAL NOT NULL,
                fps REAL NOT NULL,
                frames INTEGER NOT NULL,
                indexed INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create videos table: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Store("Catalog connection lock poisoned".to_string()))
    }

    /// Insert or replace a video row.
    pub fn register(&self, video: &VideoRecord) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO videos
             (id, original_name, stored_path, duration, fps, frames, indexed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                video.id,
                video.original_name,
                video.stored_path.to_string_lossy().to_string(),
                video.duration,
                video.fps,
                video.frames as i64,
                video.indexed as i64,
                video.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| AppError::Store(format!("Failed to register video: {}", e)))?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> AppResult<Option<VideoRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, original_name, stored_path, duration, fps, frames, indexed, created_at
             FROM videos WHERE id = ?1",
            params![id],
            row_to_video,
        )
        .optional()
        .map_err(|e| AppError::Store(format!("Failed to read video: {}", e)))
    }

    /// All videos, newest first.
    pub fn list(&self) -> AppResult<Vec<VideoRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, original_name, stored_path, duration, fps, frames, indexed, created_at
                 FROM videos ORDER BY created_at DESC",
            )
            .map_err(|e| AppError::Store(format!("Failed to prepare video listing: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_video)
            .map_err(|e| AppError::Store(format!("Failed to list videos: {}", e)))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Store(format!("Failed to read video: {}", e)))
    }

    /// Remove a video row. Returns whether it existed.
    pub fn remove(&self, id: &str) -> AppResult<bool> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM videos WHERE id = ?1", params![id])
            .map_err(|e| AppError::Store(format!("Failed to remove video: {}", e)))?;
        Ok(removed > 0)
    }
}

fn row_to_video(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
    let stored_path: String = row.get(2)?;
    let created_at: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(VideoRecord {
        id: row.get(0)?,
        original_name: row.get(1)?,
        stored_path: PathBuf::from(stored_path),
        duration: row.get(3)?,
        fps: row.get(4)?,
        frames: row.get::<_, i64>(5)? as usize,
        indexed: row.get::<_, i64>(6)? as usize,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn video(id: &str, hour: u32) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            original_name: format!("{}.mp4", id),
            stored_path: PathBuf::from(format!("/tmp/{}.mp4", id)),
            duration: 42.5,
            fps: 30.0,
            frames: 43,
            indexed: 43,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_register_get_list_remove() {
        let dir = TempDir::new().unwrap();
        let catalog = VideoCatalog::open(&dir.path().join("index.sqlite")).unwrap();

        catalog.register(&video("older", 8)).unwrap();
        catalog.register(&video("newer", 9)).unwrap();

        assert_eq!(catalog.get("older").unwrap(), Some(video("older", 8)));
        assert_eq!(catalog.get("missing").unwrap(), None);

        let ids: Vec<_> = catalog.list().unwrap().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["newer", "older"]);

        assert!(catalog.remove("older").unwrap());
        assert!(!catalog.remove("older").unwrap());
        assert_eq!(catalog.list().unwrap().len(), 1);
    }

    #[test]
    fn test_shares_file_with_vector_store() {
        use crate::store::{DistanceMetric, SqliteVectorStore, VectorStore};

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.sqlite");
        let store = SqliteVectorStore::open(&path, "video_frames", DistanceMetric::L2).unwrap();
        let catalog = VideoCatalog::open(&path).unwrap();

        catalog.register(&video("abc", 10)).unwrap();
        assert_eq!(store.stats().unwrap().total_entries, 0);
        assert_eq!(catalog.list().unwrap().len(), 1);
    }
}
