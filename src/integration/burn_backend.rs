//! Burn inference backend for face embeddings.
//!
//! This module provides a `BurnExtractor` that implements `EmbeddingExtractor`
//! for recognition models built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use facetrack_rs::integration::{AlignedEncoder, BurnEmbeddingModel, BurnExtractor, EyeAligner};
//! use burn::backend::NdArray;
//!
//! // Implement BurnEmbeddingModel for your recognition model
//! struct MyResNet { /* ... */ }
//!
//! impl BurnEmbeddingModel<NdArray> for MyResNet {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<f32> {
//!         // Run inference
//!     }
//! }
//!
//! let model = MyResNet::load("model.bin");
//! let encoder = AlignedEncoder::new(EyeAligner::default(), BurnExtractor::new(model, Default::default()));
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use ndarray::ArrayView3;

use super::EmbeddingExtractor;
use crate::error::AlignmentFailure;
use crate::tracker::Embedding;

/// Trait for Burn-based face recognition models.
///
/// Implement this trait for your specific model architecture.
pub trait BurnEmbeddingModel<B: Backend>: Send + Sync {
    /// Run forward pass on the input tensor.
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape [1, channels, height, width]
    ///
    /// # Returns
    /// The appearance vector for the single face in the batch.
    fn forward(&self, input: Tensor<B, 4>) -> Vec<f32>;

    /// Get the expected input size (channels, height, width).
    fn input_size(&self) -> (usize, usize, usize) {
        (3, 150, 150) // Default eye-aligned chip size
    }
}

/// Burn-based embedding extractor implementing `EmbeddingExtractor`.
pub struct BurnExtractor<B: Backend, M: BurnEmbeddingModel<B>> {
    model: M,
    device: B::Device,
}

impl<B: Backend, M: BurnEmbeddingModel<B>> BurnExtractor<B, M> {
    /// Create a new Burn extractor with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Convert an aligned (height, width, channels) patch to a normalized
    /// [1, C, H, W] tensor.
    pub fn preprocess(&self, aligned: ArrayView3<'_, u8>) -> Result<Tensor<B, 4>, AlignmentFailure> {
        let (channels, target_h, target_w) = self.model.input_size();
        let (height, width, got_channels) = aligned.dim();

        if (got_channels, height, width) != (channels, target_h, target_w) {
            return Err(AlignmentFailure::Extraction(format!(
                "aligned patch is {width}x{height}x{got_channels}, model expects {target_w}x{target_h}x{channels}"
            )));
        }

        // HWC u8 -> CHW f32 in [0, 1]
        let data: Vec<f32> = aligned
            .permuted_axes([2, 0, 1])
            .iter()
            .map(|&x| x as f32 / 255.0)
            .collect();

        Ok(
            Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
                1,
                channels,
                height,
                width,
            ]),
        )
    }
}

impl<B: Backend, M: BurnEmbeddingModel<B>> EmbeddingExtractor for BurnExtractor<B, M> {
    fn extract(&self, aligned: ArrayView3<'_, u8>) -> Result<Embedding, AlignmentFailure> {
        let tensor = self.preprocess(aligned)?;
        let output = self.model.forward(tensor);
        Embedding::from_f32(&output)
    }
}
