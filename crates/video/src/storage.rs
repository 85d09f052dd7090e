//! On-disk layout for uploaded videos and extracted frames.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use visionrag_core::{AppError, AppResult};

/// Derive a short stable identifier for a video.
///
/// The id is the first 12 hex characters of a SHA-256 over the file name
/// and the ingest time, so the same file ingested twice gets two ids.
pub fn generate_video_id(filename: &str, created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(b"_");
    hasher.update(created_at.to_rfc3339().as_bytes());
    let digest = hasher.finalize();

    digest
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Copy a video into the store as `{video_id}{.ext}`.
pub async fn save_video(source: &Path, videos_dir: &Path, video_id: &str) -> AppResult<PathBuf> {
    if !source.is_file() {
        return Err(AppError::Decode(format!(
            "Video file not found: {}",
            source.display()
        )));
    }

    tokio::fs::create_dir_all(videos_dir).await?;
    let file_name = match source.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", video_id, ext),
        None => video_id.to_string(),
    };
    let target = videos_dir.join(file_name);
    tokio::fs::copy(source, &target).await?;

    tracing::debug!("Stored video {} at {}", video_id, target.display());
    Ok(target)
}

/// Write one encoded frame to `{frames_dir}/{video_id}/frame_{index:06}.jpg`.
pub async fn save_frame_image(
    frames_dir: &Path,
    video_id: &str,
    index: usize,
    image: &[u8],
) -> AppResult<PathBuf> {
    let dir = frames_dir.join(video_id);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("frame_{:06}.jpg", index));
    tokio::fs::write(&path, image).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_video_id_shape_and_stability() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let a = generate_video_id("lobby.mp4", at);
        let b = generate_video_id("lobby.mp4", at);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        let later = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 1).unwrap();
        assert_ne!(a, generate_video_id("lobby.mp4", later));
        assert_ne!(a, generate_video_id("garage.mp4", at));
    }

    #[tokio::test]
    async fn test_save_video_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cam1.mp4");
        std::fs::write(&source, b"video bytes").unwrap();

        let stored = save_video(&source, &dir.path().join("videos"), "abc123")
            .await
            .unwrap();
        assert_eq!(stored.file_name().unwrap(), "abc123.mp4");
        assert_eq!(std::fs::read(&stored).unwrap(), b"video bytes");
    }

    #[tokio::test]
    async fn test_save_video_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_video(&dir.path().join("nope.mp4"), dir.path(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[tokio::test]
    async fn test_save_frame_image_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_frame_image(dir.path(), "vid", 7, b"jpeg").await.unwrap();
        assert_eq!(path, dir.path().join("vid").join("frame_000007.jpg"));
        assert_eq!(std::fs::read(path).unwrap(), b"jpeg");
    }
}
