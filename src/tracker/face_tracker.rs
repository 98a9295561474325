//! Identity tracker: geometric assignment, then appearance re-identification.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AlignmentFailure, ContractViolation, TrackError};
use crate::integration::FaceEncoder;
use crate::tracker::appearance_store::AppearanceStore;
use crate::tracker::detection::{EYE_LANDMARKS, Observation};
use crate::tracker::embedding::{Embedding, QuantizedEmbedding};
use crate::tracker::id_allocator::{FaceId, IdAllocator};
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::reidentifier::{DEFAULT_REID_THRESHOLD, MatchPolicy, Reidentifier};

/// Optional bound on the appearance store. Both limits are off by default,
/// so every identity ever seen stays available for re-identification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Keep at most this many identities, dropping the least recently seen
    pub max_count: Option<usize>,
    /// Drop identities not seen for more than this many frames
    pub max_age: Option<u64>,
}

impl EvictionPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_count.is_none() && self.max_age.is_none()
    }
}

/// Configuration for the FaceTracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Embedding distance under which a lost identity is re-identified
    pub reid_threshold: f64,
    pub match_policy: MatchPolicy,
    pub eviction: EvictionPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            reid_threshold: DEFAULT_REID_THRESHOLD,
            match_policy: MatchPolicy::default(),
            eviction: EvictionPolicy::unbounded(),
        }
    }
}

impl TrackerConfig {
    pub fn with_reid_threshold(mut self, threshold: f64) -> Self {
        self.reid_threshold = threshold;
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }
}

/// Per-frame counters, logged at debug level.
#[derive(Debug, Default)]
struct FrameStats {
    matched: usize,
    reidentified: usize,
    minted: usize,
    skipped: usize,
    dropped: usize,
}

/// Tracks faces across frames under stable identities.
///
/// Each call to [`track`](Self::track):
/// 1. pairs tracked identities with detections by minimum total geometric cost,
/// 2. compares each leftover detection with the stored appearance of every
///    identity not seen this frame,
/// 3. mints a new identity when nothing matches,
/// 4. drops identities not seen this frame from the tracked set.
///
/// The appearance store keeps every identity ever minted (unless an
/// [`EvictionPolicy`] says otherwise), so dropped identities can come back.
pub struct FaceTracker<D, E> {
    tracked: BTreeMap<FaceId, D>,
    store: AppearanceStore,
    ids: IdAllocator,
    reidentifier: Reidentifier,
    encoder: E,
    config: TrackerConfig,
    frame_id: u64,
}

impl<D: Observation, E: FaceEncoder<D>> FaceTracker<D, E> {
    pub fn new(config: TrackerConfig, encoder: E) -> Self {
        Self {
            tracked: BTreeMap::new(),
            store: AppearanceStore::new(),
            ids: IdAllocator::new(),
            reidentifier: Reidentifier::new(config.reid_threshold, config.match_policy),
            encoder,
            config,
            frame_id: 0,
        }
    }

    pub fn with_default_config(encoder: E) -> Self {
        Self::new(TrackerConfig::default(), encoder)
    }

    /// Process one frame of detections.
    ///
    /// Contract violations are detected before any state changes, so an
    /// `Err` leaves the tracker exactly as it was. Detections whose
    /// embedding cannot be computed are skipped without side effects.
    pub fn track(&mut self, detections: Vec<D>) -> Result<(), TrackError> {
        validate_detections(&detections)?;

        let tracked_ids: Vec<FaceId> = self.tracked.keys().copied().collect();
        let assignment = if tracked_ids.is_empty() {
            AssignmentResult {
                matches: vec![],
                unmatched_tracks: vec![],
                unmatched_detections: (0..detections.len()).collect(),
            }
        } else {
            let previous: Vec<&D> = self.tracked.values().collect();
            let cost = matching::distance_matrix(&previous, &detections).map_err(|source| {
                let index = match source {
                    ContractViolation::InvalidDistance { col, .. } => col,
                    ContractViolation::TooFewLandmarks { .. }
                    | ContractViolation::NonFiniteLandmark { .. } => 0,
                };
                TrackError::ContractViolation { index, source }
            })?;
            matching::linear_assignment(&cost)
        };

        self.frame_id += 1;
        let frame = self.frame_id;
        let num_detections = detections.len();
        let mut stats = FrameStats::default();
        let mut slots: Vec<Option<D>> = detections.into_iter().map(Some).collect();
        let mut registry: BTreeMap<FaceId, D> = BTreeMap::new();
        let mut seen: BTreeSet<FaceId> = BTreeSet::new();

        for (row, col) in assignment.matches {
            if let Some(detection) = slots[col].take() {
                let id = tracked_ids[row];
                seen.insert(id);
                registry.insert(id, detection);
                stats.matched += 1;
            }
        }

        for col in assignment.unmatched_detections {
            let Some(detection) = slots[col].take() else {
                continue;
            };
            let embedding = match self.embed(&detection) {
                Ok(embedding) => embedding,
                Err(failure) => {
                    log::debug!("frame {frame}: skipping detection {col}: {failure}");
                    stats.skipped += 1;
                    continue;
                }
            };

            let id = match self.reidentifier.identify(&embedding, &self.store, &seen) {
                Some(id) => {
                    log::debug!("frame {frame}: detection {col} re-identified as {id}");
                    stats.reidentified += 1;
                    id
                }
                None => {
                    let id = self.ids.allocate();
                    self.store.insert(id, &embedding, frame);
                    log::debug!("frame {frame}: detection {col} is new identity {id}");
                    stats.minted += 1;
                    id
                }
            };
            seen.insert(id);
            registry.insert(id, detection);
        }

        stats.dropped = tracked_ids.iter().filter(|id| !seen.contains(id)).count();
        for id in &seen {
            self.store.mark_seen(*id, frame);
        }
        self.tracked = registry;
        self.apply_eviction();

        log::debug!(
            "frame {frame}: {num_detections} detections, {} matched, {} re-identified, \
             {} new, {} skipped, {} dropped, {} tracked, {} stored",
            stats.matched,
            stats.reidentified,
            stats.minted,
            stats.skipped,
            stats.dropped,
            self.tracked.len(),
            self.store.len(),
        );
        Ok(())
    }

    /// Currently tracked identities with the detection they matched this frame.
    pub fn get_tracked_elements(&self) -> &BTreeMap<FaceId, D> {
        &self.tracked
    }

    /// Forget the tracked set but keep the appearance store, so every known
    /// identity is a re-identification candidate on the next frame.
    pub fn clear_elements(&mut self) {
        self.tracked.clear();
    }

    pub fn appearance_store(&self) -> &AppearanceStore {
        &self.store
    }

    pub fn stored_embedding(&self, id: FaceId) -> Option<&QuantizedEmbedding> {
        self.store.embedding(id)
    }

    /// Number of frames processed so far.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// Identity the next new face will receive.
    pub fn next_id(&self) -> FaceId {
        self.ids.peek()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    fn embed(&self, detection: &D) -> Result<Embedding, AlignmentFailure> {
        let embedding = self.encoder.encode(detection)?;
        match self.store.dim() {
            Some(expected) if expected != embedding.dim() => {
                Err(AlignmentFailure::DimensionMismatch {
                    expected,
                    got: embedding.dim(),
                })
            }
            _ => Ok(embedding),
        }
    }

    fn apply_eviction(&mut self) {
        let policy = self.config.eviction;
        if policy.is_unbounded() {
            return;
        }
        let tracked: BTreeSet<FaceId> = self.tracked.keys().copied().collect();
        let evicted = self
            .store
            .evict(&tracked, self.frame_id, policy.max_age, policy.max_count);
        if !evicted.is_empty() {
            log::debug!("frame {}: evicted {:?}", self.frame_id, evicted);
        }
    }
}

/// Every detection needs the four eye landmarks, and every landmark must be
/// a finite point. Checked whether or not a cost matrix gets built.
fn validate_detections<D: Observation>(detections: &[D]) -> Result<(), TrackError> {
    for (index, detection) in detections.iter().enumerate() {
        let landmarks = detection.landmarks();
        let violation = if landmarks.len() < EYE_LANDMARKS {
            Some(ContractViolation::TooFewLandmarks {
                got: landmarks.len(),
            })
        } else {
            landmarks
                .iter()
                .position(|p| !p.x.is_finite() || !p.y.is_finite())
                .map(|landmark| ContractViolation::NonFiniteLandmark { landmark })
        };
        if let Some(source) = violation {
            return Err(TrackError::ContractViolation { index, source });
        }
    }
    Ok(())
}
