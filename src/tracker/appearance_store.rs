//! Write-once appearance memory keyed by identity.

use std::collections::{BTreeMap, BTreeSet};

use crate::tracker::embedding::{Embedding, QuantizedEmbedding};
use crate::tracker::id_allocator::FaceId;

#[derive(Debug, Clone)]
pub struct StoredAppearance {
    pub embedding: QuantizedEmbedding,
    /// Frame in which the identity was minted
    pub created_frame: u64,
    /// Last frame in which the identity was tracked
    pub last_seen_frame: u64,
}

/// Identity → quantized embedding. Entries are written once and the
/// embedding never changes afterwards. Iteration is in ascending identity
/// order.
#[derive(Debug, Clone, Default)]
pub struct AppearanceStore {
    entries: BTreeMap<FaceId, StoredAppearance>,
}

impl AppearanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: FaceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: FaceId) -> Option<&StoredAppearance> {
        self.entries.get(&id)
    }

    pub fn embedding(&self, id: FaceId) -> Option<&QuantizedEmbedding> {
        self.entries.get(&id).map(|e| &e.embedding)
    }

    /// Dimension of the stored embeddings, if anything is stored.
    pub fn dim(&self) -> Option<usize> {
        self.entries.values().next().map(|e| e.embedding.dim())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FaceId, &StoredAppearance)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    /// Store the quantized form of `embedding` for a fresh identity.
    ///
    /// Returns false and leaves the existing entry untouched when `id` is
    /// already present.
    pub fn insert(&mut self, id: FaceId, embedding: &Embedding, frame: u64) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(
            id,
            StoredAppearance {
                embedding: embedding.quantize(),
                created_frame: frame,
                last_seen_frame: frame,
            },
        );
        true
    }

    pub(crate) fn mark_seen(&mut self, id: FaceId, frame: u64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.last_seen_frame = frame;
        }
    }

    /// Drop lost identities older than `max_age` frames, then the
    /// least recently seen ones until at most `max_count` remain. Identities
    /// in `tracked` are never removed.
    pub(crate) fn evict(
        &mut self,
        tracked: &BTreeSet<FaceId>,
        frame: u64,
        max_age: Option<u64>,
        max_count: Option<usize>,
    ) -> Vec<FaceId> {
        let mut evicted = Vec::new();

        if let Some(max_age) = max_age {
            self.entries.retain(|id, entry| {
                let keep = tracked.contains(id)
                    || frame.saturating_sub(entry.last_seen_frame) <= max_age;
                if !keep {
                    evicted.push(*id);
                }
                keep
            });
        }

        if let Some(max_count) = max_count {
            if self.entries.len() > max_count {
                let mut lost: Vec<(u64, FaceId)> = self
                    .entries
                    .iter()
                    .filter(|(id, _)| !tracked.contains(id))
                    .map(|(id, e)| (e.last_seen_frame, *id))
                    .collect();
                lost.sort_unstable();

                let excess = self.entries.len() - max_count;
                for (_, id) in lost.into_iter().take(excess) {
                    self.entries.remove(&id);
                    evicted.push(id);
                }
            }
        }

        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(v: f64) -> Embedding {
        Embedding::from_vec(vec![v, 0.0]).unwrap()
    }

    fn id(v: u64) -> FaceId {
        FaceId::new(v)
    }

    #[test]
    fn test_entries_are_write_once() {
        let mut store = AppearanceStore::new();
        assert!(store.insert(id(0), &emb(0.1), 1));
        assert!(!store.insert(id(0), &emb(0.9), 2));
        assert_eq!(store.embedding(id(0)), Some(&emb(0.1).quantize()));
        assert_eq!(store.get(id(0)).unwrap().created_frame, 1);
    }

    #[test]
    fn test_iterates_in_ascending_id_order() {
        let mut store = AppearanceStore::new();
        for v in [3, 0, 2] {
            store.insert(id(v), &emb(0.0), 0);
        }
        let order: Vec<FaceId> = store.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![id(0), id(2), id(3)]);
    }

    #[test]
    fn test_evict_by_age_keeps_tracked() {
        let mut store = AppearanceStore::new();
        store.insert(id(0), &emb(0.0), 1);
        store.insert(id(1), &emb(0.0), 1);
        store.insert(id(2), &emb(0.0), 9);
        let tracked = BTreeSet::from([id(1)]);

        let evicted = store.evict(&tracked, 10, Some(5), None);
        assert_eq!(evicted, vec![id(0)]);
        assert!(store.contains(id(1)));
        assert!(store.contains(id(2)));
    }

    #[test]
    fn test_evict_by_count_drops_least_recent_lost() {
        let mut store = AppearanceStore::new();
        store.insert(id(0), &emb(0.0), 5);
        store.insert(id(1), &emb(0.0), 2);
        store.insert(id(2), &emb(0.0), 2);
        store.insert(id(3), &emb(0.0), 1);
        let tracked = BTreeSet::from([id(3)]);

        let evicted = store.evict(&tracked, 6, None, Some(2));
        assert_eq!(evicted, vec![id(1), id(2)]);
        assert_eq!(store.len(), 2);
        assert!(store.contains(id(3)));
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut store = AppearanceStore::new();
        for v in 0..100 {
            store.insert(id(v), &emb(0.0), 0);
        }
        assert!(store.evict(&BTreeSet::new(), 1_000, None, None).is_empty());
        assert_eq!(store.len(), 100);
    }
}
