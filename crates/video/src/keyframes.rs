//! Scene-based keyframe selection.
//!
//! Frames sampled at the analysis rate are embedded with a [`VisionEncoder`],
//! grouped with a [`Clustering`] and reduced to one representative per
//! cluster: the member closest to the cluster centroid. Representatives come
//! back in temporal order.

use crate::cluster::{squared_distance, Clustering, KMeans};
use crate::encoder::VisionEncoder;
use crate::frame::{FrameSource, SampledFrame};
use std::path::Path;
use std::sync::Arc;
use visionrag_core::AppResult;

pub struct KeyframeSelector {
    encoder: Arc<dyn VisionEncoder>,
    clustering: Box<dyn Clustering>,
    num_clusters: usize,
    analysis_rate: f64,
}

impl KeyframeSelector {
    /// Selector using seeded k-means.
    pub fn new(encoder: Arc<dyn VisionEncoder>, num_clusters: usize, analysis_rate: f64, seed: u64) -> Self {
        Self {
            encoder,
            clustering: Box::new(KMeans::new(seed)),
            num_clusters,
            analysis_rate,
        }
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters.max(1)
    }

    /// Sample `video` at the analysis rate and select keyframes.
    #[tracing::instrument(skip(self, source), fields(video = %video.display(), k = self.num_clusters()))]
    pub async fn extract(&self, source: &dyn FrameSource, video: &Path) -> AppResult<Vec<SampledFrame>> {
        let frames = source.sample(video, self.analysis_rate).await?;
        tracing::info!(
            "Analyzing {} frames sampled at {} fps for scene changes",
            frames.len(),
            self.analysis_rate
        );
        self.select(frames)
    }

    /// Reduce sampled frames to one representative per scene cluster.
    pub fn select(&self, frames: Vec<SampledFrame>) -> AppResult<Vec<SampledFrame>> {
        let k = self.num_clusters();
        if frames.len() <= k {
            return Ok(frames);
        }

        let embeddings = frames
            .iter()
            .map(|f| self.encoder.encode(&f.image))
            .collect::<AppResult<Vec<_>>>()?;

        let clusters = self.clustering.fit(&embeddings, k)?;
        tracing::debug!("Clustered {} frames into {} scenes", frames.len(), clusters.k());

        let mut selected: Vec<usize> = (0..clusters.k())
            .filter_map(|c| {
                clusters
                    .members(c)
                    .map(|i| (i, squared_distance(&embeddings[i], &clusters.centroids[c])))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(i, _)| i)
            })
            .collect();
        selected.sort_unstable();
        selected.dedup();

        let mut frames: Vec<Option<SampledFrame>> = frames.into_iter().map(Some).collect();
        Ok(selected.into_iter().filter_map(|i| frames[i].take()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::tests::solid_png;
    use crate::encoder::HistogramEncoder;

    fn frame(index: usize, color: [u8; 3]) -> SampledFrame {
        SampledFrame {
            index,
            frame_number: index as u64 * 30,
            timestamp_seconds: index as f64,
            image: solid_png(color),
        }
    }

    fn selector(k: usize) -> KeyframeSelector {
        KeyframeSelector::new(Arc::new(HistogramEncoder::default()), k, 1.0, 42)
    }

    fn two_scenes() -> Vec<SampledFrame> {
        vec![
            frame(0, [200, 20, 20]),
            frame(1, [200, 20, 20]),
            frame(2, [200, 20, 20]),
            frame(3, [20, 20, 200]),
            frame(4, [20, 20, 200]),
        ]
    }

    #[test]
    fn test_single_cluster_yields_one_keyframe() {
        let keyframes = selector(1).select(two_scenes()).unwrap();
        assert_eq!(keyframes.len(), 1);
    }

    #[test]
    fn test_fewer_frames_than_clusters_keeps_all() {
        let frames = two_scenes();
        let keyframes = selector(15).select(frames.clone()).unwrap();
        assert_eq!(keyframes, frames);
    }

    #[test]
    fn test_one_keyframe_per_scene_in_temporal_order() {
        let keyframes = selector(2).select(two_scenes()).unwrap();
        assert_eq!(keyframes.len(), 2);
        assert!(keyframes[0].index < 3);
        assert!(keyframes[1].index >= 3);
    }

    #[test]
    fn test_no_frames_is_empty_not_error() {
        assert!(selector(3).select(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_zero_clusters_is_treated_as_one() {
        assert_eq!(selector(0).num_clusters(), 1);
        assert_eq!(selector(0).select(two_scenes()).unwrap().len(), 1);
    }
}
