//! Coin selection for consolidation and sends.
//!
//! The pipeline is filter, sort, partition: keep outputs with enough
//! confirmations, order them largest first, then cut the list into
//! fixed-size batches. Consolidating the largest outputs first reduces the
//! most coins per transaction and leaves the smallest ones behind.
//!
//! Partitioning drops the tail: outputs that do not fill a complete batch
//! are not sent in a smaller final transaction. [`Batches::dropped`] reports
//! how many were left out.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use cirrus_core::{OutPoint, SpendableOutput};

use crate::error::WalletError;

/// Outputs chosen for one transaction.
///
/// Non-empty and free of duplicate outpoints; input order is preserved and
/// becomes the order of the build request's outpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSet {
    coins: Vec<SpendableOutput>,
}

impl CoinSet {
    pub fn new(coins: Vec<SpendableOutput>) -> Result<Self, WalletError> {
        if coins.is_empty() {
            return Err(WalletError::NoCoins);
        }
        let mut seen = HashSet::with_capacity(coins.len());
        for coin in &coins {
            if !seen.insert((coin.id.as_str(), coin.index)) {
                return Err(WalletError::DuplicateOutpoint(coin.outpoint().to_string()));
            }
        }
        Ok(Self { coins })
    }

    /// Sum of the selected amounts in units.
    pub fn total(&self) -> u64 {
        self.coins
            .iter()
            .map(|c| c.amount)
            .fold(0u64, u64::saturating_add)
    }

    /// Address of the first selected output.
    pub fn first_address(&self) -> &str {
        // Non-empty by construction.
        self.coins
            .first()
            .map(|c| c.address.as_str())
            .unwrap_or_default()
    }

    pub fn outpoints(&self) -> Vec<OutPoint> {
        self.coins.iter().map(SpendableOutput::outpoint).collect()
    }

    pub fn coins(&self) -> &[SpendableOutput] {
        &self.coins
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

/// Keep outputs with strictly more than `min_confirmations` confirmations.
pub fn filter_eligible(outputs: Vec<SpendableOutput>, min_confirmations: u64) -> Vec<SpendableOutput> {
    outputs
        .into_iter()
        .filter(|o| o.confirmations > min_confirmations)
        .collect()
}

/// Stable sort, largest amount first.
pub fn sort_descending_by_amount(outputs: &mut [SpendableOutput]) {
    outputs.sort_by(|a, b| b.amount.cmp(&a.amount));
}

/// Split into `len / batch_size` sets of exactly `batch_size` outputs.
///
/// The remainder after the last full batch is not returned.
pub fn partition(
    outputs: &[SpendableOutput],
    batch_size: NonZeroUsize,
) -> Result<Vec<CoinSet>, WalletError> {
    outputs
        .chunks_exact(batch_size.get())
        .map(|chunk| CoinSet::new(chunk.to_vec()))
        .collect()
}

/// Result of running the full selection pipeline.
#[derive(Debug, Clone)]
pub struct Batches {
    pub sets: Vec<CoinSet>,
    /// Outputs that passed the confirmation filter.
    pub eligible: usize,
    /// Eligible outputs left out because they did not fill a batch.
    pub dropped: usize,
}

/// Filter, sort and partition with fixed parameters.
#[derive(Debug, Clone, Copy)]
pub struct CoinSelector {
    pub min_confirmations: u64,
    pub batch_size: NonZeroUsize,
}

impl CoinSelector {
    pub fn new(min_confirmations: u64, batch_size: NonZeroUsize) -> Self {
        Self {
            min_confirmations,
            batch_size,
        }
    }

    pub fn batches(&self, outputs: Vec<SpendableOutput>) -> Result<Batches, WalletError> {
        let mut eligible = filter_eligible(outputs, self.min_confirmations);
        sort_descending_by_amount(&mut eligible);
        let sets = partition(&eligible, self.batch_size)?;
        let used = sets.len() * self.batch_size.get();
        Ok(Batches {
            eligible: eligible.len(),
            dropped: eligible.len() - used,
            sets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coin(n: usize, amount: u64, confirmations: u64) -> SpendableOutput {
        SpendableOutput {
            id: format!("{n:064x}"),
            index: 0,
            address: format!("CAddr{n}"),
            amount,
            creation_time: 1_700_000_000,
            confirmations,
        }
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn filter_is_exclusive() {
        let outputs = vec![coin(0, 5, 10), coin(1, 5, 11), coin(2, 5, 9), coin(3, 5, 100)];
        let kept = filter_eligible(outputs, 10);
        let ids: Vec<_> = kept.iter().map(|c| c.address.as_str()).collect();
        assert_eq!(ids, ["CAddr1", "CAddr3"]);
    }

    #[test]
    fn filter_may_return_nothing() {
        assert!(filter_eligible(vec![coin(0, 5, 3)], 10).is_empty());
    }

    #[test]
    fn sort_keeps_ties_in_input_order() {
        let mut outputs = vec![coin(0, 1, 20), coin(1, 7, 20), coin(2, 1, 20), coin(3, 7, 20)];
        sort_descending_by_amount(&mut outputs);
        let order: Vec<_> = outputs.iter().map(|c| c.address.as_str()).collect();
        assert_eq!(order, ["CAddr1", "CAddr3", "CAddr0", "CAddr2"]);
    }

    #[test]
    fn partition_drops_remainder() {
        let outputs: Vec<_> = (0..7).map(|n| coin(n, 1, 20)).collect();
        let sets = partition(&outputs, nz(3)).unwrap();
        assert_eq!(sets.len(), 2);
        assert!(sets.iter().all(|s| s.len() == 3));
        assert_eq!(sets[1].coins()[2].address, "CAddr5");
    }

    #[test]
    fn partition_smaller_than_batch_is_empty() {
        let outputs: Vec<_> = (0..4).map(|n| coin(n, 1, 20)).collect();
        assert!(partition(&outputs, nz(5)).unwrap().is_empty());
    }

    #[test]
    fn coin_set_rejects_duplicates_and_empty() {
        assert_eq!(CoinSet::new(vec![]).unwrap_err(), WalletError::NoCoins);
        let err = CoinSet::new(vec![coin(1, 5, 20), coin(1, 6, 20)]).unwrap_err();
        assert!(matches!(err, WalletError::DuplicateOutpoint(_)));
    }

    #[test]
    fn coin_set_totals() {
        let set = CoinSet::new(vec![coin(0, 3, 20), coin(1, 4, 20)]).unwrap();
        assert_eq!(set.total(), 7);
        assert_eq!(set.first_address(), "CAddr0");
        assert_eq!(set.outpoints().len(), 2);
        assert!(!set.is_empty());
    }

    #[test]
    fn selector_1900_outputs_in_two_batches() {
        let outputs: Vec<_> = (0..1900).map(|n| coin(n, 1 + n as u64, 50)).collect();
        let batches = CoinSelector::new(10, nz(950)).batches(outputs).unwrap();
        assert_eq!(batches.sets.len(), 2);
        assert!(batches.sets.iter().all(|s| s.len() == 950));
        assert_eq!(batches.eligible, 1900);
        assert_eq!(batches.dropped, 0);
        // Largest first.
        assert_eq!(batches.sets[0].coins()[0].amount, 1900);
    }

    #[test]
    fn selector_reports_dropped() {
        let mut outputs: Vec<_> = (0..10).map(|n| coin(n, 10, 50)).collect();
        outputs.push(coin(99, 10, 1));
        let batches = CoinSelector::new(10, nz(4)).batches(outputs).unwrap();
        assert_eq!(batches.eligible, 10);
        assert_eq!(batches.sets.len(), 2);
        assert_eq!(batches.dropped, 2);
    }

    proptest! {
        #[test]
        fn sort_is_idempotent(amounts in proptest::collection::vec(1u64..50, 0..40)) {
            let mut once: Vec<_> = amounts.iter().enumerate().map(|(n, a)| coin(n, *a, 20)).collect();
            sort_descending_by_amount(&mut once);
            let mut twice = once.clone();
            sort_descending_by_amount(&mut twice);
            prop_assert_eq!(once, twice);
        }
    }
}
