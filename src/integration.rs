//! Integration module for connecting detection and embedding backends with
//! the face tracker.
//!
//! The tracker only ever talks to a [`FaceEncoder`]. [`AlignedEncoder`]
//! builds one from a [`PoseNormalizer`] and an [`EmbeddingExtractor`], which
//! is where a recognition model plugs in.

mod aligner;
mod builder;
mod detector;
mod encoder;
mod pipeline;

pub use aligner::{AlignerConfig, EyeAligner, PoseNormalizer};
pub use builder::FaceDetectionBuilder;
pub use detector::DetectionSource;
pub use encoder::{AlignedEncoder, EmbeddingExtractor, FaceEncoder};
pub use pipeline::{PipelineError, TrackerPipeline};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnEmbeddingModel, BurnExtractor};
