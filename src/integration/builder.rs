//! Builder for creating FaceDetection objects from detector outputs.

use nalgebra::Point2;
use ndarray::Array3;

use crate::tracker::FaceDetection;

/// Builder for creating `FaceDetection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct FaceDetectionBuilder {
    landmarks: Vec<Point2<f32>>,
    patch: Option<Array3<u8>>,
    label: Option<String>,
}

impl FaceDetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both eye pairs: right eye corners first, then left eye corners.
    pub fn eyes(mut self, right: [(f32, f32); 2], left: [(f32, f32); 2]) -> Self {
        let mut landmarks: Vec<Point2<f32>> = right
            .iter()
            .chain(left.iter())
            .map(|&(x, y)| Point2::new(x, y))
            .collect();
        landmarks.extend(self.landmarks.iter().skip(4).copied());
        self.landmarks = landmarks;
        self
    }

    /// Append a landmark after the eye pairs.
    pub fn landmark(mut self, x: f32, y: f32) -> Self {
        self.landmarks.push(Point2::new(x, y));
        self
    }

    /// Set all landmarks from a flat `[x0, y0, x1, y1, ...]` slice.
    pub fn flat_landmarks(mut self, coords: &[f32]) -> Self {
        self.landmarks = coords
            .chunks_exact(2)
            .map(|c| Point2::new(c[0], c[1]))
            .collect();
        self
    }

    /// Set the patch from interleaved (row-major, channel-last) pixel bytes.
    ///
    /// Data of the wrong length leaves an empty patch, which the aligner
    /// rejects later.
    pub fn patch_bytes(mut self, data: Vec<u8>, width: usize, height: usize, channels: usize) -> Self {
        self.patch = Array3::from_shape_vec((height, width, channels), data).ok();
        self
    }

    pub fn patch(mut self, patch: Array3<u8>) -> Self {
        self.patch = Some(patch);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Build the final `FaceDetection`.
    pub fn build(self) -> FaceDetection {
        let patch = self
            .patch
            .unwrap_or_else(|| Array3::zeros((0, 0, 3)));
        FaceDetection {
            landmarks: self.landmarks,
            patch,
            label: self.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_builder() {
        let det = FaceDetectionBuilder::new()
            .eyes([(10.0, 20.0), (14.0, 20.0)], [(30.0, 20.0), (34.0, 20.0)])
            .landmark(22.0, 35.0)
            .patch_bytes(vec![0; 4 * 2 * 3], 4, 2, 3)
            .label("cam0")
            .build();

        assert_eq!(det.landmarks.len(), 5);
        assert_eq!(det.landmarks[4], Point2::new(22.0, 35.0));
        assert_eq!(det.patch.dim(), (2, 4, 3));
        assert_eq!(det.label.as_deref(), Some("cam0"));
    }

    #[test]
    fn test_eyes_keep_extra_landmarks() {
        let det = FaceDetectionBuilder::new()
            .flat_landmarks(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 9.0, 9.0])
            .eyes([(5.0, 5.0), (6.0, 5.0)], [(7.0, 5.0), (8.0, 5.0)])
            .build();
        assert_eq!(det.landmarks.len(), 5);
        assert_eq!(det.landmarks[0], Point2::new(5.0, 5.0));
        assert_eq!(det.landmarks[4], Point2::new(9.0, 9.0));
    }

    #[test]
    fn test_bad_patch_length_gives_empty_patch() {
        let det = FaceDetectionBuilder::new()
            .patch_bytes(vec![0; 5], 4, 2, 3)
            .build();
        assert!(det.patch.is_empty());
    }
}
