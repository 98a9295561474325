//! Per-frame face observations.

use nalgebra::Point2;
use ndarray::{Array3, ArrayView3};

/// Number of leading landmarks with a fixed meaning:
/// 0,1 = right-eye pair, 2,3 = left-eye pair.
pub const EYE_LANDMARKS: usize = 4;

/// Capability contract a detection must satisfy to be tracked.
pub trait Observation: Clone {
    /// Ordered landmark points. Indices 0..4 are reserved for the eye pairs.
    fn landmarks(&self) -> &[Point2<f32>];

    /// Raw image patch in (height, width, channels) layout.
    fn patch(&self) -> ArrayView3<'_, u8>;

    /// Non-negative geometric dissimilarity to another observation.
    ///
    /// `f64::INFINITY` marks the pair as impossible to associate.
    fn distance_to(&self, other: &Self) -> f64;
}

/// Face detection as produced by a landmark detector.
#[derive(Debug, Clone)]
pub struct FaceDetection {
    /// Landmark points in patch coordinates
    pub landmarks: Vec<Point2<f32>>,
    /// Face image patch (height, width, channels)
    pub patch: Array3<u8>,
    /// Caller-defined tag carried through the tracker untouched
    pub label: Option<String>,
}

impl FaceDetection {
    pub fn new(landmarks: Vec<Point2<f32>>, patch: Array3<u8>) -> Self {
        Self {
            landmarks,
            patch,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Centre of the right-eye pair.
    pub fn right_eye(&self) -> Option<Point2<f32>> {
        eye_centre(&self.landmarks, 0)
    }

    /// Centre of the left-eye pair.
    pub fn left_eye(&self) -> Option<Point2<f32>> {
        eye_centre(&self.landmarks, 2)
    }
}

impl Observation for FaceDetection {
    fn landmarks(&self) -> &[Point2<f32>] {
        &self.landmarks
    }

    fn patch(&self) -> ArrayView3<'_, u8> {
        self.patch.view()
    }

    /// Mean Euclidean offset between corresponding landmarks.
    fn distance_to(&self, other: &Self) -> f64 {
        landmark_offset(&self.landmarks, &other.landmarks)
    }
}

pub(crate) fn eye_centre(landmarks: &[Point2<f32>], first: usize) -> Option<Point2<f32>> {
    let a = landmarks.get(first)?;
    let b = landmarks.get(first + 1)?;
    Some(nalgebra::center(a, b))
}

/// Mean offset over the landmarks both sides have. No shared landmark means
/// the pair can never be associated.
pub fn landmark_offset(a: &[Point2<f32>], b: &[Point2<f32>]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return f64::INFINITY;
    }
    let total: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| nalgebra::distance(p, q) as f64)
        .sum();
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face(offset: f32) -> FaceDetection {
        FaceDetection::new(
            vec![
                Point2::new(10.0 + offset, 10.0),
                Point2::new(20.0 + offset, 10.0),
                Point2::new(40.0 + offset, 10.0),
                Point2::new(50.0 + offset, 10.0),
                Point2::new(30.0 + offset, 30.0),
            ],
            Array3::zeros((4, 4, 3)),
        )
    }

    #[test]
    fn test_distance_is_mean_landmark_offset() {
        assert_relative_eq!(face(0.0).distance_to(&face(3.0)), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let f = face(7.0);
        assert_eq!(f.distance_to(&f), 0.0);
    }

    #[test]
    fn test_eye_centres() {
        let f = face(0.0);
        assert_eq!(f.right_eye(), Some(Point2::new(15.0, 10.0)));
        assert_eq!(f.left_eye(), Some(Point2::new(45.0, 10.0)));
    }

    #[test]
    fn test_no_shared_landmarks_is_unassignable() {
        assert!(landmark_offset(&[], &[Point2::new(1.0, 1.0)]).is_infinite());
    }
}
