//! Trait for face detection backends.

use crate::tracker::FaceDetection;

/// Trait for face detection backends.
///
/// Implement this trait to feed any landmark detector into the tracker.
///
/// # Example
///
/// ```ignore
/// use facetrack_rs::{DetectionSource, FaceDetection};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, input: &[u8], width: u32, height: u32) -> Result<Vec<FaceDetection>, Self::Error> {
///         // Run inference, crop faces and return them with their landmarks
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error;

    /// Run inference on raw image data and return face detections.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes (format depends on implementation)
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    fn detect(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceDetection>, Self::Error>;
}
