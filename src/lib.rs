//! Face identity tracking across video frames.
//!
//! Detections are matched to currently tracked identities with an optimal
//! geometric assignment. Detections left over are compared against a
//! persistent appearance memory before a new identity is minted, so a face
//! that leaves the frame briefly comes back under the same identity.

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{AlignmentFailure, ContractViolation, TrackError};
pub use integration::{
    AlignedEncoder, DetectionSource, EmbeddingExtractor, EyeAligner, FaceDetectionBuilder,
    FaceEncoder, PoseNormalizer, TrackerPipeline,
};
pub use tracker::{
    EvictionPolicy, FaceDetection, FaceId, FaceTracker, MatchPolicy, Observation, TrackerConfig,
};
