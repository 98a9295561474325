use thiserror::Error;

/// A detection's patch could not be turned into an embedding.
///
/// Recoverable: the tracker skips the offending detection for the current
/// frame and carries on with the rest.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignmentFailure {
    #[error("image patch is empty")]
    EmptyPatch,
    #[error("landmark {index} is not a finite point")]
    InvalidLandmark { index: usize },
    #[error("eye centres coincide, cannot derive an alignment")]
    DegenerateEyes,
    #[error("alignment transform is not invertible")]
    SingularTransform,
    #[error("embedding extraction failed: {0}")]
    Extraction(String),
    #[error("embedding contains non-finite values")]
    NonFiniteEmbedding,
    #[error("embedding has {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// A detection does not satisfy the capability contract the tracker relies on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("detection has {got} landmarks, at least 4 are required")]
    TooFewLandmarks { got: usize },
    #[error("landmark {landmark} is not a finite point")]
    NonFiniteLandmark { landmark: usize },
    #[error("distance between tracked row {row} and detection {col} is {value}")]
    InvalidDistance { row: usize, col: usize, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    #[error("detection {index} rejected: {source}")]
    ContractViolation {
        index: usize,
        #[source]
        source: ContractViolation,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingParseError {
    #[error("empty embedding string")]
    Empty,
    #[error("invalid value {value:?} at position {position}")]
    InvalidValue { position: usize, value: String },
}
