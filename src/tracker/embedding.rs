//! Appearance embeddings and their quantized stored form.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1};

use crate::error::{AlignmentFailure, EmbeddingParseError};

/// Fractional digits kept when an embedding is stored.
pub const QUANTIZATION_DIGITS: usize = 5;

/// Live appearance vector computed for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Array1<f64>);

impl Embedding {
    /// Wrap an extractor output, rejecting empty or non-finite vectors.
    pub fn new(values: Array1<f64>) -> Result<Self, AlignmentFailure> {
        if values.is_empty() {
            return Err(AlignmentFailure::Extraction("empty embedding".into()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AlignmentFailure::NonFiniteEmbedding);
        }
        Ok(Self(values))
    }

    pub fn from_vec(values: Vec<f64>) -> Result<Self, AlignmentFailure> {
        Self::new(Array1::from_vec(values))
    }

    pub fn from_f32(values: &[f32]) -> Result<Self, AlignmentFailure> {
        Self::new(values.iter().map(|&v| v as f64).collect())
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }

    /// Euclidean distance to a stored embedding. Callers must check dimensions.
    pub fn distance(&self, stored: &QuantizedEmbedding) -> f64 {
        euclidean(self.0.view(), stored.0.view())
    }

    /// Round to the stored precision. The result replaces the original for
    /// every later comparison.
    pub fn quantize(&self) -> QuantizedEmbedding {
        QuantizedEmbedding(self.0.mapv(quantize_value))
    }
}

/// Embedding as kept in the appearance store, rounded to
/// [`QUANTIZATION_DIGITS`] fractional digits.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedEmbedding(Array1<f64>);

impl QuantizedEmbedding {
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }
}

/// `[v0,v1,...]` with fixed five-digit fractions.
impl fmt::Display for QuantizedEmbedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{:.*}", QUANTIZATION_DIGITS, v)?;
        }
        f.write_str("]")
    }
}

impl FromStr for QuantizedEmbedding {
    type Err = EmbeddingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .unwrap_or(trimmed)
            .trim();
        if inner.is_empty() {
            return Err(EmbeddingParseError::Empty);
        }

        let values = inner
            .split(',')
            .enumerate()
            .map(|(position, raw)| {
                let raw = raw.trim();
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(quantize_value)
                    .ok_or_else(|| EmbeddingParseError::InvalidValue {
                        position,
                        value: raw.to_string(),
                    })
            })
            .collect::<Result<Array1<f64>, _>>()?;
        Ok(Self(values))
    }
}

/// Decimal rounding through the text form, so the stored value is exactly
/// what the persisted representation reads back as.
fn quantize_value(v: f64) -> f64 {
    let text = format!("{:.*}", QUANTIZATION_DIGITS, v);
    text.parse().unwrap_or(v)
}

pub fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
