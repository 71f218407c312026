//! # Admission Heap & Watermark
//!
//! Min-heap of buffered transactions ordered by sequence position, paired
//! with the watermark: the highest position admitted with every lower
//! position also admitted.
//!
//! ## Invariants Enforced
//!
//! - No transaction with `0 < position <= watermark` is ever dispatched
//!   (checked in `push()` and phase A of `release()`).
//! - The heap top always holds the minimal buffered position
//!   (`BinaryHeap<Reverse<_>>`).
//! - The watermark only moves forward (`set_threshold()` ignores regressions).
//! - A non-zero position is buffered at most once (`buffered` membership set).
//!
//! ## Release
//!
//! Two phases repeat until neither fires:
//!
//! ```text
//! A: top.position <= watermark      → pop; dispatch if wildcard, else drop as stale
//! B: top.position == watermark + 1  → watermark += 1; pop; dispatch
//! ```
//!
//! This type is single-threaded. `AdmissionCore` puts it behind the
//! admission lock.

use super::value_objects::{AdmissionStats, PushOutcome, ReleaseSummary};
use shared_types::{SequencePosition, SequencedTransaction, WILDCARD_POSITION};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, trace};

/// Heap entry ordered by (position, insertion order).
///
/// The insertion counter keeps wildcard items, which share position 0,
/// in arrival order.
#[derive(Debug)]
struct HeapEntry {
    position: SequencePosition,
    insertion: u64,
    tx: SequencedTransaction,
}

impl HeapEntry {
    fn key(&self) -> (SequencePosition, u64) {
        (self.position, self.insertion)
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Reordering buffer with watermark.
#[derive(Debug, Default)]
pub struct AdmissionHeap {
    /// Buffered items, minimal position on top.
    heap: BinaryHeap<Reverse<HeapEntry>>,

    /// Non-zero positions currently buffered.
    buffered: HashSet<SequencePosition>,

    /// Highest contiguously admitted position.
    watermark: SequencePosition,

    /// Monotonic insertion counter (tie-break).
    insertions: u64,

    stats: AdmissionStats,
}

impl AdmissionHeap {
    /// Create an empty heap with watermark 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty heap starting from a restored watermark.
    pub fn with_watermark(watermark: SequencePosition) -> Self {
        Self {
            watermark,
            ..Self::default()
        }
    }

    /// Current watermark.
    pub fn threshold(&self) -> SequencePosition {
        self.watermark
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Smallest buffered position, if any.
    pub fn peek_position(&self) -> Option<SequencePosition> {
        self.heap.peek().map(|Reverse(entry)| entry.position)
    }

    /// Counters and current sizes.
    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            watermark: self.watermark,
            buffered: self.heap.len(),
            ..self.stats
        }
    }

    /// Admit one transaction, dispatching everything that becomes releasable.
    ///
    /// `dispatch` is invoked once per released item, in release order.
    pub fn push<F>(&mut self, tx: SequencedTransaction, dispatch: &mut F) -> PushOutcome
    where
        F: FnMut(SequencedTransaction),
    {
        let position = tx.position;

        if position != WILDCARD_POSITION {
            if position <= self.watermark {
                self.stats.stale_discarded += 1;
                debug!(position, watermark = self.watermark, "Discarding stale transaction");
                return PushOutcome::Stale;
            }
            if !self.buffered.insert(position) {
                self.stats.duplicate_discarded += 1;
                debug!(position, "Discarding duplicate of buffered transaction");
                return PushOutcome::Duplicate;
            }
        }

        self.insertions += 1;
        self.heap.push(Reverse(HeapEntry {
            position,
            insertion: self.insertions,
            tx,
        }));
        trace!(position, buffered = self.heap.len(), "Buffered transaction");

        let summary = self.release(dispatch);
        PushOutcome::Accepted(summary)
    }

    /// Force the watermark forward and release what that unblocks.
    ///
    /// A value below the current watermark is ignored: the watermark never
    /// regresses.
    pub fn set_threshold<F>(&mut self, value: SequencePosition, dispatch: &mut F) -> ReleaseSummary
    where
        F: FnMut(SequencedTransaction),
    {
        if value < self.watermark {
            debug!(
                requested = value,
                watermark = self.watermark,
                "Ignoring watermark regression"
            );
            return ReleaseSummary::default();
        }

        self.watermark = value;
        self.release(dispatch)
    }

    fn release<F>(&mut self, dispatch: &mut F) -> ReleaseSummary
    where
        F: FnMut(SequencedTransaction),
    {
        let mut summary = ReleaseSummary::default();

        loop {
            let mut fired = false;

            // Phase A: everything at or below the watermark.
            while let Some(entry) = self.pop_if(|position, watermark| position <= watermark) {
                fired = true;
                if entry.position == WILDCARD_POSITION {
                    summary.wildcard += 1;
                    dispatch(entry.tx);
                } else {
                    summary.stale_discarded += 1;
                    trace!(position = entry.position, "Dropping item overtaken by watermark");
                }
            }

            // Phase B: the contiguous run right above the watermark.
            while let Some(entry) = self.pop_if(|position, watermark| {
                watermark.checked_add(1) == Some(position)
            }) {
                fired = true;
                self.watermark = entry.position;
                summary.admitted += 1;
                dispatch(entry.tx);
            }

            if !fired {
                break;
            }
        }

        self.stats.admitted += summary.admitted;
        self.stats.wildcard_admitted += summary.wildcard;
        self.stats.stale_discarded += summary.stale_discarded;
        summary
    }

    fn pop_if<P>(&mut self, predicate: P) -> Option<HeapEntry>
    where
        P: Fn(SequencePosition, SequencePosition) -> bool,
    {
        let top = self.heap.peek()?.0.position;
        if !predicate(top, self.watermark) {
            return None;
        }
        let Reverse(entry) = self.heap.pop()?;
        if entry.position != WILDCARD_POSITION {
            self.buffered.remove(&entry.position);
        }
        Some(entry)
    }
}
