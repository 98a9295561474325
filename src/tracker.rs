mod appearance_store;
mod detection;
mod embedding;
mod face_tracker;
mod id_allocator;
mod matching;
mod reidentifier;

pub use appearance_store::{AppearanceStore, StoredAppearance};
pub use detection::{EYE_LANDMARKS, FaceDetection, Observation, landmark_offset};
pub use embedding::{Embedding, QUANTIZATION_DIGITS, QuantizedEmbedding, euclidean};
pub use face_tracker::{EvictionPolicy, FaceTracker, TrackerConfig};
pub use id_allocator::{FaceId, IdAllocator};
pub use matching::{AssignmentResult, distance_matrix, linear_assignment};
pub use reidentifier::{DEFAULT_REID_THRESHOLD, MatchPolicy, Reidentifier};
