//! Lock-free work distribution for one phase.
//!
//! [`TaskCursor`] is a single fetch-and-add counter shared by every worker of
//! a node. Each claim hands out a contiguous batch `[offset, offset + batch)`
//! clipped to the phase length; a worker stops once its claimed offset falls
//! past the end. No index is handed out twice and none is skipped.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Monotonic claim counter. Reset to zero before every phase.
#[derive(Debug, Default)]
pub struct TaskCursor {
    head: AtomicUsize,
}

impl TaskCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind to zero. Must not race with claims of the previous phase.
    pub fn reset(&self) {
        self.head.store(0, Ordering::Release);
    }

    /// Atomically advance by `batch` and return the previous head.
    #[inline]
    pub fn claim(&self, batch: usize) -> usize {
        self.head.fetch_add(batch, Ordering::AcqRel)
    }

    /// Claim the next batch of `0..len`, or `None` once the range is drained.
    #[inline]
    pub fn next_batch(&self, batch: usize, len: usize) -> Option<Range<usize>> {
        debug_assert!(batch >= 1, "batch size must be positive");
        let offset = self.claim(batch);
        (offset < len).then(|| offset..(offset + batch).min(len))
    }

    /// Iterator draining `0..len` in batches of `batch`.
    pub fn batches(&self, batch: usize, len: usize) -> Batches<'_> {
        Batches {
            cursor: self,
            batch,
            len,
        }
    }
}

/// Iterator over the batches one worker wins from a [`TaskCursor`].
pub struct Batches<'a> {
    cursor: &'a TaskCursor,
    batch: usize,
    len: usize,
}

impl Iterator for Batches<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        self.cursor.next_batch(self.batch, self.len)
    }
}
