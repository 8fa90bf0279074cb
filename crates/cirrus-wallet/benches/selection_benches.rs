//! Criterion benchmarks for coin selection over large wallets.
//!
//! Covers: the filter/sort/partition pipeline and sweep request assembly.

use std::num::NonZeroUsize;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use cirrus_core::{ChangePolicy, SpendableOutput, WalletCredentials};
use cirrus_wallet::{CoinSelector, CoinSet, TransactionBuilder};

/// `n` outputs with scattered amounts and confirmations.
fn make_outputs(n: usize) -> Vec<SpendableOutput> {
    (0..n)
        .map(|i| SpendableOutput {
            id: format!("{i:064x}"),
            index: (i % 3) as u32,
            address: format!("CAddr{}", i % 17),
            amount: 1 + ((i as u64).wrapping_mul(2_654_435_761) % 10_000_000_000),
            creation_time: 1_700_000_000 + i as i64,
            confirmations: (i as u64 * 7) % 200,
        })
        .collect()
}

fn bench_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("coin_selector_batches");
    let selector = CoinSelector::new(10, NonZeroUsize::new(950).unwrap());
    for n in [1_000usize, 10_000, 50_000] {
        let outputs = make_outputs(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &outputs, |b, outputs| {
            b.iter(|| selector.batches(black_box(outputs.clone())).unwrap())
        });
    }
    group.finish();
}

fn bench_build_request(c: &mut Criterion) {
    let set = CoinSet::new(make_outputs(950)).unwrap();
    let wallet = WalletCredentials::new("mn", "account 0", "pw");
    let mut builder = TransactionBuilder::new(1_000_000);
    builder
        .set_destination("CDest")
        .set_change_policy(ChangePolicy::FirstCoinAddress);

    c.bench_function("build_request_950_inputs", |b| {
        b.iter(|| builder.build(black_box(&set), &wallet).unwrap())
    });
}

criterion_group!(benches, bench_batches, bench_build_request);
criterion_main!(benches);
