//! # State History Adapter
//!
//! Keeps the most recent committed state snapshots so admission can answer
//! lookups by state root, and the block-commit path can look one up by
//! height.

use parking_lot::RwLock;
use qc_admission::{AccountDb, AdmissionError, StateHistory};
use shared_types::{BlockHeight, CommittedBlock, Hash};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Post-state of one committed block.
#[derive(Clone, PartialEq, Eq)]
pub struct CommittedState {
    root: Hash,
    height: BlockHeight,
}

impl CommittedState {
    pub fn new(root: Hash, height: BlockHeight) -> Self {
        Self { root, height }
    }

    pub fn from_block(block: &CommittedBlock) -> Self {
        Self::new(block.state_root, block.height)
    }
}

impl fmt::Debug for CommittedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommittedState")
            .field("root", &hex::encode(&self.root[..4]))
            .field("height", &self.height)
            .finish()
    }
}

impl AccountDb for CommittedState {
    fn state_root(&self) -> Hash {
        self.root
    }

    fn height(&self) -> BlockHeight {
        self.height
    }
}

#[derive(Default)]
struct HistoryInner {
    by_height: BTreeMap<BlockHeight, Arc<dyn AccountDb>>,
    /// Highest retained height carrying each root.
    by_root: HashMap<Hash, BlockHeight>,
}

impl HistoryInner {
    /// Empty blocks share a state root across heights, so a root only goes
    /// away once no retained height carries it.
    fn reindex_root(&mut self, root: Hash) {
        let highest = self
            .by_height
            .iter()
            .rev()
            .find(|(_, snapshot)| snapshot.state_root() == root)
            .map(|(height, _)| *height);
        match highest {
            Some(height) => {
                self.by_root.insert(root, height);
            }
            None => {
                self.by_root.remove(&root);
            }
        }
    }
}

/// Bounded in-memory snapshot history. Evicts the lowest heights first.
pub struct InMemoryStateHistory {
    inner: RwLock<HistoryInner>,
    retained: usize,
}

impl InMemoryStateHistory {
    pub fn new(retained: usize) -> Self {
        Self {
            inner: RwLock::new(HistoryInner::default()),
            retained: retained.max(1),
        }
    }

    /// Record a snapshot, replacing any earlier one at the same height.
    pub fn record(&self, snapshot: Arc<dyn AccountDb>) {
        let root = snapshot.state_root();
        let height = snapshot.height();
        let mut inner = self.inner.write();

        let previous = inner.by_height.insert(height, snapshot);
        inner
            .by_root
            .entry(root)
            .and_modify(|h| *h = (*h).max(height))
            .or_insert(height);
        if let Some(previous) = previous {
            let previous_root = previous.state_root();
            if previous_root != root {
                inner.reindex_root(previous_root);
            }
        }

        while inner.by_height.len() > self.retained {
            let Some((evicted_height, evicted)) = inner.by_height.pop_first() else {
                break;
            };
            inner.reindex_root(evicted.state_root());
            trace!(height = evicted_height, "Evicted state snapshot");
        }
    }

    pub fn by_height(&self, height: BlockHeight) -> Result<Arc<dyn AccountDb>, AdmissionError> {
        self.inner
            .read()
            .by_height
            .get(&height)
            .cloned()
            .ok_or(AdmissionError::HeightNotRetained(height))
    }

    pub fn by_root(&self, root: &Hash) -> Result<Arc<dyn AccountDb>, AdmissionError> {
        self.account_db_by_hash(root)
            .ok_or(AdmissionError::SnapshotNotFound(*root))
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_height.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn retained(&self) -> usize {
        self.retained
    }
}

impl StateHistory for InMemoryStateHistory {
    fn account_db_by_hash(&self, root: &Hash) -> Option<Arc<dyn AccountDb>> {
        let inner = self.inner.read();
        inner
            .by_root
            .get(root)
            .and_then(|height| inner.by_height.get(height))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tag: u8, height: u64) -> Arc<dyn AccountDb> {
        Arc::new(CommittedState::new([tag; 32], height))
    }

    #[test]
    fn test_lookup_by_root_and_height() {
        let history = InMemoryStateHistory::new(4);
        history.record(state(1, 10));

        assert_eq!(history.by_height(10).unwrap().state_root(), [1; 32]);
        assert_eq!(history.by_root(&[1; 32]).unwrap().height(), 10);
        assert!(matches!(
            history.by_height(11),
            Err(AdmissionError::HeightNotRetained(11))
        ));
        assert!(matches!(
            history.by_root(&[2; 32]),
            Err(AdmissionError::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn test_evicts_lowest_height() {
        let history = InMemoryStateHistory::new(2);
        history.record(state(1, 1));
        history.record(state(2, 2));
        history.record(state(3, 3));

        assert_eq!(history.len(), 2);
        assert!(history.account_db_by_hash(&[1; 32]).is_none());
        assert!(history.account_db_by_hash(&[3; 32]).is_some());
    }

    #[test]
    fn test_same_height_replaces_root() {
        let history = InMemoryStateHistory::new(4);
        history.record(state(1, 5));
        history.record(state(2, 5));

        assert_eq!(history.len(), 1);
        assert!(history.account_db_by_hash(&[1; 32]).is_none());
        assert_eq!(history.by_height(5).unwrap().state_root(), [2; 32]);
    }

    #[test]
    fn test_shared_root_survives_eviction_of_older_height() {
        let history = InMemoryStateHistory::new(1);
        history.record(state(7, 1));
        history.record(state(7, 2));

        assert_eq!(history.len(), 1);
        assert!(history.account_db_by_hash(&[7; 32]).is_some());
    }

    #[test]
    fn test_empty_blocks_keep_their_own_height() {
        let history = InMemoryStateHistory::new(4);
        history.record(state(7, 1));
        history.record(state(7, 2));
        history.record(state(7, 3));

        for height in 1..=3 {
            assert_eq!(history.by_height(height).unwrap().height(), height);
        }
        assert_eq!(history.by_root(&[7; 32]).unwrap().height(), 3);
    }

    #[test]
    fn test_replaced_height_falls_back_to_older_shared_root() {
        let history = InMemoryStateHistory::new(4);
        history.record(state(7, 1));
        history.record(state(7, 2));
        history.record(state(8, 2));

        assert_eq!(history.by_root(&[7; 32]).unwrap().height(), 1);
        assert_eq!(history.by_root(&[8; 32]).unwrap().height(), 2);
    }

    #[test]
    fn test_zero_retention_clamped() {
        let history = InMemoryStateHistory::new(0);
        history.record(state(1, 1));
        assert_eq!(history.retained(), 1);
        assert!(!history.is_empty());
    }

    #[test]
    fn test_debug_shows_short_root() {
        let rendered = format!("{:?}", CommittedState::new([0xab; 32], 3));
        assert!(rendered.contains("abababab"));
    }
}
