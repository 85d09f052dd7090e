//! Indexing of frame records into the vector store.
//!
//! Each record becomes one entry whose document names the video, the time
//! and the caption. Entries are embedded and written in batches, so a
//! failure part-way leaves the earlier batches in the store; the caller
//! learns how far indexing got through `AppError::PartialIndex`.

use crate::embeddings::EmbeddingProvider;
use crate::progress::ProgressReporter;
use crate::store::VectorStore;
use crate::types::{EntryMetadata, FrameKind, FrameRecord, IndexEntry};
use visionrag_core::{AppError, AppResult};

/// Text that is embedded for a record.
pub fn document_text(video_id: &str, record: &FrameRecord) -> String {
    format!(
        "Video {}, time {}: {}",
        video_id, record.timestamp_str, record.caption
    )
}

/// Store ids: `{video_id}_{frame_index}` for frames and
/// `{video_id}_audio_{n}` for the n-th audio segment.
pub fn entry_ids(video_id: &str, records: &[FrameRecord]) -> Vec<String> {
    let mut audio_ordinal = 0usize;
    records
        .iter()
        .map(|record| match record.kind {
            FrameKind::Visual => format!("{}_{}", video_id, record.frame_index),
            FrameKind::Audio => {
                let id = format!("{}_audio_{}", video_id, audio_ordinal);
                audio_ordinal += 1;
                id
            }
        })
        .collect()
}

/// Embed and store `records` for `video_id`. Returns the number indexed.
///
/// # Errors
/// If the first batch fails, its error is returned unchanged. A failure
/// after at least one batch was written is wrapped in
/// `AppError::PartialIndex` carrying the number already stored.
#[tracing::instrument(skip(embedder, store, records, progress), fields(records = records.len()))]
pub async fn index_video(
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    video_id: &str,
    records: &[FrameRecord],
    batch_size: usize,
    progress: &ProgressReporter,
) -> AppResult<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let ids = entry_ids(video_id, records);
    let total = records.len() as u64;
    let mut indexed = 0usize;

    for (batch_ids, batch) in ids.chunks(batch_size.max(1)).zip(records.chunks(batch_size.max(1))) {
        match index_batch(embedder, store, video_id, batch_ids, batch).await {
            Ok(written) => {
                indexed += written;
                progress.index(indexed as u64, total, embedder.model_name());
            }
            Err(e) if indexed == 0 => return Err(e),
            Err(e) => {
                tracing::warn!("Indexing of {} stopped after {} entries: {}", video_id, indexed, e);
                return Err(AppError::PartialIndex {
                    indexed,
                    source: Box::new(e),
                });
            }
        }
    }

    tracing::info!("Indexed {} entries for video {}", indexed, video_id);
    Ok(indexed)
}

async fn index_batch(
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    video_id: &str,
    ids: &[String],
    records: &[FrameRecord],
) -> AppResult<usize> {
    let documents: Vec<String> = records.iter().map(|r| document_text(video_id, r)).collect();
    let embeddings = embedder.embed_batch(&documents).await?;
    if embeddings.len() != documents.len() {
        return Err(AppError::Other(format!(
            "{} returned {} embeddings for {} documents",
            embedder.model_name(),
            embeddings.len(),
            documents.len()
        )));
    }

    let mut entries = Vec::with_capacity(records.len());
    for (((id, record), document), embedding) in ids.iter().zip(records).zip(documents).zip(embeddings) {
        entries.push(IndexEntry {
            id: id.clone(),
            document,
            embedding,
            metadata: EntryMetadata {
                video_id: video_id.to_string(),
                frame_index: record.frame_index,
                timestamp_seconds: record.timestamp_seconds,
                timestamp_str: record.timestamp_str.clone(),
                caption: record.caption.clone(),
                kind: record.kind,
            },
        });
    }

    store.upsert(&entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_contains_video_time_and_caption() {
        let record = FrameRecord::visual(4, 5.0, "a car parked");
        assert_eq!(
            document_text("v1", &record),
            "Video v1, time 00:00:05: a car parked"
        );
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let records = vec![
            FrameRecord::visual(0, 0.0, "a"),
            FrameRecord::visual(1, 1.0, "b"),
            FrameRecord::audio(0.5, "hello"),
            FrameRecord::audio(2.0, "bye"),
        ];
        let ids = entry_ids("abc", &records);
        assert_eq!(ids, vec!["abc_0", "abc_1", "abc_audio_0", "abc_audio_1"]);
    }

    /// Embedder that only answers whole batches and records their sizes.
    #[derive(Debug, Default)]
    struct BatchOnly {
        batches: std::sync::Mutex<Vec<usize>>,
        short_by: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for BatchOnly {
        fn provider_name(&self) -> &str {
            "batch-only"
        }

        fn model_name(&self) -> &str {
            "batch-v1"
        }

        async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
            Err(AppError::Other("single embeddings are not supported".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.batches.lock().unwrap().push(texts.len());
            let n = texts.len().saturating_sub(self.short_by);
            Ok((0..n).map(|i| vec![1.0, i as f32]).collect())
        }
    }

    fn store() -> (tempfile::TempDir, crate::store::SqliteVectorStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = crate::store::SqliteVectorStore::open(
            &dir.path().join("index.sqlite"),
            "frames",
            crate::store::DistanceMetric::L2,
        )
        .unwrap();
        (dir, store)
    }

    fn records(n: usize) -> Vec<FrameRecord> {
        (0..n).map(|i| FrameRecord::visual(i, i as f64, format!("frame {}", i))).collect()
    }

    #[tokio::test]
    async fn test_each_batch_is_embedded_in_one_call() {
        let embedder = BatchOnly::default();
        let (_dir, store) = store();

        let indexed = index_video(&embedder, &store, "v1", &records(5), 2, &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(indexed, 5);
        assert_eq!(*embedder.batches.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_short_batch_reply_is_rejected() {
        let embedder = BatchOnly {
            short_by: 1,
            ..Default::default()
        };
        let (_dir, store) = store();

        let err = index_video(&embedder, &store, "v1", &records(3), 3, &ProgressReporter::noop())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("returned 2 embeddings for 3 documents"));
        assert_eq!(store.count_for_video("v1").unwrap(), 0);
    }
}
