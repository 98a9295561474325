//! Traits for turning a detection into an appearance embedding.

use ndarray::{Array3, ArrayView3};

use crate::error::AlignmentFailure;
use crate::integration::aligner::PoseNormalizer;
use crate::tracker::{Embedding, Observation};

/// Embedding model applied to a canonical, eye-aligned face patch.
///
/// Implement this for your recognition network. Every failure must be
/// reported as an [`AlignmentFailure`] so the tracker can skip the detection.
pub trait EmbeddingExtractor {
    fn extract(&self, aligned: ArrayView3<'_, u8>) -> Result<Embedding, AlignmentFailure>;
}

/// Everything the tracker needs to obtain an embedding for a detection.
///
/// The tracker owns its encoder, so a heavy model is loaded once by the
/// caller and handed in, instead of living in process-wide state.
pub trait FaceEncoder<D: Observation> {
    fn encode(&self, detection: &D) -> Result<Embedding, AlignmentFailure>;
}

/// Pose normalization followed by embedding extraction.
#[derive(Debug, Clone)]
pub struct AlignedEncoder<N, X> {
    normalizer: N,
    extractor: X,
}

impl<N: PoseNormalizer, X: EmbeddingExtractor> AlignedEncoder<N, X> {
    pub fn new(normalizer: N, extractor: X) -> Self {
        Self {
            normalizer,
            extractor,
        }
    }

    pub fn normalizer(&self) -> &N {
        &self.normalizer
    }

    pub fn extractor(&self) -> &X {
        &self.extractor
    }

    pub fn align<D: Observation>(&self, detection: &D) -> Result<Array3<u8>, AlignmentFailure> {
        self.normalizer
            .normalize(detection.patch(), detection.landmarks())
    }
}

impl<D, N, X> FaceEncoder<D> for AlignedEncoder<N, X>
where
    D: Observation,
    N: PoseNormalizer,
    X: EmbeddingExtractor,
{
    fn encode(&self, detection: &D) -> Result<Embedding, AlignmentFailure> {
        let aligned = self.align(detection)?;
        self.extractor.extract(aligned.view())
    }
}
