//! Appearance-based re-identification of currently untracked identities.

use std::collections::BTreeSet;

use crate::tracker::appearance_store::AppearanceStore;
use crate::tracker::embedding::Embedding;
use crate::tracker::id_allocator::FaceId;

/// Default maximum Euclidean embedding distance for a reappearance.
pub const DEFAULT_REID_THRESHOLD: f64 = 0.6;

/// How a candidate is chosen among those under the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Lowest identity whose distance is under the threshold. Reproduces
    /// the behaviour of trackers that stop at the first hit.
    FirstMatch,
    /// Identity with the smallest distance under the threshold, ties going
    /// to the lowest identity.
    #[default]
    ClosestMatch,
}

#[derive(Debug, Clone)]
pub struct Reidentifier {
    threshold: f64,
    policy: MatchPolicy,
}

impl Default for Reidentifier {
    fn default() -> Self {
        Self::new(DEFAULT_REID_THRESHOLD, MatchPolicy::default())
    }
}

impl Reidentifier {
    pub fn new(threshold: f64, policy: MatchPolicy) -> Self {
        Self { threshold, policy }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Search stored identities not in `seen` for one whose embedding lies
    /// strictly closer than the threshold. Candidates are visited in
    /// ascending identity order. Stored embeddings of another dimension are
    /// skipped.
    pub fn identify(
        &self,
        embedding: &Embedding,
        store: &AppearanceStore,
        seen: &BTreeSet<FaceId>,
    ) -> Option<FaceId> {
        let mut best: Option<(FaceId, f64)> = None;

        for (id, stored) in store.iter().filter(|(id, _)| !seen.contains(id)) {
            if stored.embedding.dim() != embedding.dim() {
                continue;
            }
            let distance = embedding.distance(&stored.embedding);
            log::trace!("appearance distance to {id}: {distance:.5}");
            if distance >= self.threshold {
                continue;
            }
            match self.policy {
                MatchPolicy::FirstMatch => return Some(id),
                MatchPolicy::ClosestMatch => {
                    if best.is_none_or(|(_, d)| distance < d) {
                        best = Some((id, distance));
                    }
                }
            }
        }

        best.map(|(id, _)| id)
    }
}
