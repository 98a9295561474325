//! TrackerPipeline for combining face detection with identity tracking.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::TrackError;
use crate::tracker::{FaceDetection, FaceId, FaceTracker, TrackerConfig};

use super::{DetectionSource, FaceEncoder};

#[derive(Debug, Error)]
pub enum PipelineError<E> {
    #[error("detection failed: {0}")]
    Detection(E),
    #[error(transparent)]
    Track(#[from] TrackError),
}

/// A combined tracker that bundles detection inference with the face tracker.
///
/// This struct provides a convenient way to run end-to-end tracking
/// by combining any `DetectionSource` with a `FaceTracker`.
pub struct TrackerPipeline<S: DetectionSource, E> {
    detector: S,
    tracker: FaceTracker<FaceDetection, E>,
}

impl<S: DetectionSource, E: FaceEncoder<FaceDetection>> TrackerPipeline<S, E> {
    /// Create a new tracking pipeline with the given detector, encoder and tracker config.
    pub fn new(detector: S, encoder: E, config: TrackerConfig) -> Self {
        Self {
            detector,
            tracker: FaceTracker::new(config, encoder),
        }
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: S, encoder: E) -> Self {
        Self::new(detector, encoder, TrackerConfig::default())
    }

    /// Process a single frame and return the tracked faces.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<&BTreeMap<FaceId, FaceDetection>, PipelineError<S::Error>> {
        let detections = self
            .detector
            .detect(input, width, height)
            .map_err(PipelineError::Detection)?;
        self.tracker.track(detections)?;
        Ok(self.tracker.get_tracked_elements())
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &S {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut S {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &FaceTracker<FaceDetection, E> {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut FaceTracker<FaceDetection, E> {
        &mut self.tracker
    }
}
