//! Property tests for coin selection and amount resolution.
//!
//! Each property runs over randomized output lists and amounts; proptest
//! shrinks any failure to a minimal example.

use std::num::NonZeroUsize;

use proptest::prelude::*;

use cirrus_core::constants::COIN;
use cirrus_core::{ChangePolicy, SpendableOutput, WalletCredentials, parse_coins};
use cirrus_wallet::{
    CoinSelector, CoinSet, TransactionBuilder, WalletError, filter_eligible, partition,
    resolve_amounts, sort_descending_by_amount,
};

fn arb_outputs(max: usize) -> impl Strategy<Value = Vec<SpendableOutput>> {
    prop::collection::vec((1u64..1_000 * COIN, 0u64..200), 0..max).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (amount, confirmations))| SpendableOutput {
                id: format!("{i:064x}"),
                index: 0,
                address: format!("CAddr{i}"),
                amount,
                creation_time: 1_700_000_000,
                confirmations,
            })
            .collect()
    })
}

/// Position of each output in the original list, by id.
fn positions(outputs: &[SpendableOutput], original: &[SpendableOutput]) -> Vec<usize> {
    outputs
        .iter()
        .map(|o| original.iter().position(|x| x.id == o.id).unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn filter_keeps_order_and_threshold(outputs in arb_outputs(80), threshold in 0u64..150) {
        let kept = filter_eligible(outputs.clone(), threshold);
        prop_assert!(kept.iter().all(|o| o.confirmations > threshold));
        let pos = positions(&kept, &outputs);
        prop_assert!(pos.windows(2).all(|w| w[0] < w[1]));
        let expected = outputs.iter().filter(|o| o.confirmations > threshold).count();
        prop_assert_eq!(kept.len(), expected);
    }

    #[test]
    fn sort_is_stable_descending_and_idempotent(outputs in arb_outputs(80)) {
        let mut sorted = outputs.clone();
        sort_descending_by_amount(&mut sorted);
        let pos = positions(&sorted, &outputs);
        for (w, p) in sorted.windows(2).zip(pos.windows(2)) {
            prop_assert!(w[0].amount >= w[1].amount);
            if w[0].amount == w[1].amount {
                prop_assert!(p[0] < p[1]);
            }
        }
        let mut again = sorted.clone();
        sort_descending_by_amount(&mut again);
        prop_assert_eq!(again, sorted);
    }

    #[test]
    fn partition_covers_prefix_in_order(outputs in arb_outputs(120), n in 1usize..30) {
        let sets = partition(&outputs, NonZeroUsize::new(n).unwrap()).unwrap();
        prop_assert_eq!(sets.len(), outputs.len() / n);
        prop_assert!(sets.iter().all(|s| s.len() == n));
        let flat: Vec<_> = sets.iter().flat_map(|s| s.coins().iter().cloned()).collect();
        prop_assert_eq!(&flat[..], &outputs[..n * (outputs.len() / n)]);
    }

    #[test]
    fn selector_accounts_for_every_eligible_output(
        outputs in arb_outputs(120),
        n in 1usize..30,
        threshold in 0u64..150,
    ) {
        let batches = CoinSelector::new(threshold, NonZeroUsize::new(n).unwrap())
            .batches(outputs)
            .unwrap();
        prop_assert_eq!(batches.sets.len() * n + batches.dropped, batches.eligible);
        prop_assert!(batches.dropped < n);
    }

    #[test]
    fn resolved_amount_plus_fee_fits(
        total in 1u64..10_000 * COIN,
        fee in 0u64..COIN,
        amount in proptest::option::of(1u64..10_000 * COIN),
    ) {
        let change = amount.map(|_| "CChange");
        match resolve_amounts(total, fee, change, amount) {
            Ok(resolved) => prop_assert!(resolved.amount() + fee <= total),
            Err(WalletError::InsufficientFunds { have, need }) => {
                prop_assert_eq!(have, total);
                prop_assert!(need > total);
            }
            Err(e) => prop_assert!(false, "unexpected error {e}"),
        }
    }

    #[test]
    fn built_request_never_overspends(
        amounts in prop::collection::vec(1u64..100 * COIN, 1..20),
        fee in 0u64..COIN / 10,
        split in proptest::option::of(0.0f64..1.0),
    ) {
        let coins: Vec<_> = amounts
            .iter()
            .enumerate()
            .map(|(i, &amount)| SpendableOutput {
                id: format!("{i:064x}"),
                index: 1,
                address: format!("CAddr{i}"),
                amount,
                creation_time: 0,
                confirmations: 50,
            })
            .collect();
        let set = CoinSet::new(coins).unwrap();
        let wallet = WalletCredentials::new("mn", "account 0", "");

        let mut builder = TransactionBuilder::new(fee);
        builder.set_destination("CDest").set_change_policy(ChangePolicy::FirstCoinAddress);
        if let Some(f) = split {
            builder
                .set_amount(((set.total() as f64 * f) as u64).max(1))
                .set_change_address("CChange");
        }

        if let Ok(prepared) = builder.build(&set, &wallet) {
            let declared = parse_coins(&prepared.request.recipients[0].amount).unwrap()
                + parse_coins(&prepared.request.fee_amount).unwrap();
            prop_assert!(declared <= set.total());
            prop_assert_eq!(prepared.request.outpoints.len(), set.len());
        }
    }
}
