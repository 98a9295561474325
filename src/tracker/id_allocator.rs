//! Identity tokens and their per-tracker allocator.

use std::fmt;

/// Durable identity of one tracked face. Displays as its decimal token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(u64);

impl FaceId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic identity counter, starting at 0. Owned by a single tracker, so
/// two trackers hand out overlapping ids.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next identity. Values are never reused.
    pub fn allocate(&mut self) -> FaceId {
        let id = FaceId(self.next);
        self.next += 1;
        id
    }

    /// The identity the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> FaceId {
        FaceId(self.next)
    }
}
