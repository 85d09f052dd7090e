//! Visual embeddings for keyframe clustering.

use visionrag_core::{AppError, AppResult};

/// Maps an encoded image to a unit-length feature vector.
pub trait VisionEncoder: Send + Sync {
    fn encode(&self, image: &[u8]) -> AppResult<Vec<f32>>;

    /// Length of every vector returned by [`VisionEncoder::encode`].
    fn dimension(&self) -> usize;
}

/// Joint RGB colour histogram, L2-normalized.
///
/// Coarse but deterministic, and enough to separate scenes whose lighting
/// or dominant objects differ.
#[derive(Debug, Clone)]
pub struct HistogramEncoder {
    bins_per_channel: usize,
}

impl HistogramEncoder {
    pub fn new(bins_per_channel: usize) -> Self {
        Self {
            bins_per_channel: bins_per_channel.clamp(1, 64),
        }
    }

    fn bin(&self, value: u8) -> usize {
        (value as usize * self.bins_per_channel) / 256
    }
}

impl Default for HistogramEncoder {
    fn default() -> Self {
        Self::new(8)
    }
}

impl VisionEncoder for HistogramEncoder {
    fn encode(&self, image: &[u8]) -> AppResult<Vec<f32>> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| AppError::Decode(format!("Failed to decode frame image: {}", e)))?
            .to_rgb8();

        let bins = self.bins_per_channel;
        let mut histogram = vec![0f32; self.dimension()];
        for pixel in decoded.pixels() {
            let [r, g, b] = pixel.0;
            let idx = (self.bin(r) * bins + self.bin(g)) * bins + self.bin(b);
            histogram[idx] += 1.0;
        }

        let norm = histogram.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in histogram.iter_mut() {
                *v /= norm;
            }
        }
        Ok(histogram)
    }

    fn dimension(&self) -> usize {
        self.bins_per_channel.pow(3)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Encode a solid-colour PNG.
    pub(crate) fn solid_png(color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, Rgb(color));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_histogram_is_unit_length() {
        let encoder = HistogramEncoder::default();
        let v = encoder.encode(&solid_png([200, 30, 30])).unwrap();
        assert_eq!(v.len(), 512);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_same_colour_same_vector() {
        let encoder = HistogramEncoder::new(4);
        let a = encoder.encode(&solid_png([10, 200, 10])).unwrap();
        let b = encoder.encode(&solid_png([12, 198, 14])).unwrap();
        let c = encoder.encode(&solid_png([250, 250, 250])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_garbage_bytes_are_decode_error() {
        let encoder = HistogramEncoder::default();
        let err = encoder.encode(b"not an image").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }
}
