//! # Ordering Properties
//!
//! Randomized submissions, including duplicates and wildcard positions,
//! pushed through the admission core.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use proptest::prelude::*;
    use qc_admission::{
        AdmissionCore, ChannelHandler, OwnerToken, TransactionAdmissionApi,
    };
    use shared_types::{SequencedTransaction, SubmitterId, WILDCARD_POSITION};

    fn submissions() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(prop_oneof![9 => 1u64..48, 1 => Just(WILDCARD_POSITION)], 0..200)
    }

    proptest! {
        #[test]
        fn prop_ordered_releases_strictly_increase(positions in submissions()) {
            let (handler, mut admitted) = ChannelHandler::new();
            let core = AdmissionCore::builder(Arc::new(handler)).build();
            let owner = OwnerToken::fresh();

            for position in &positions {
                core.push(owner, SequencedTransaction::new(*position, vec![], SubmitterId::new("p")));
            }

            let mut ordered = Vec::new();
            let mut wildcards = 0usize;
            while let Ok(tx) = admitted.try_recv() {
                if tx.is_wildcard() {
                    wildcards += 1;
                } else {
                    ordered.push(tx.position);
                }
            }

            // Ordered releases are exactly 1..=W with no gaps.
            let watermark = core.ack_cursor().watermark;
            prop_assert_eq!(ordered, (1..=watermark).collect::<Vec<_>>());
            prop_assert_eq!(
                wildcards,
                positions.iter().filter(|p| **p == WILDCARD_POSITION).count()
            );

            // Watermark is the longest gap-free prefix of what was submitted.
            let distinct: HashSet<u64> = positions.iter().copied().collect();
            let mut expected = 0;
            while distinct.contains(&(expected + 1)) {
                expected += 1;
            }
            prop_assert_eq!(watermark, expected);

            let stats = core.stats(owner);
            prop_assert_eq!(stats.buffered, distinct.iter().filter(|p| **p > expected).count());
        }

        #[test]
        fn prop_threshold_never_regresses(moves in prop::collection::vec(0u64..100, 1..30)) {
            let (handler, _admitted) = ChannelHandler::new();
            let core = AdmissionCore::builder(Arc::new(handler)).build();
            let owner = OwnerToken::fresh();
            let mut high = 0;

            for value in moves {
                core.set_threshold(owner, value);
                high = high.max(value);
                prop_assert_eq!(core.get_threshold(owner), high);
                prop_assert_eq!(core.ack_cursor().watermark, high);
            }
        }
    }
}
