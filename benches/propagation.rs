use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use waves_core::{Identity, Ledger, LedgerConfig, NewTokenType, TokenTypeId};

fn fresh(ceiling: u64) -> (Ledger, TokenTypeId) {
    let mut ledger = Ledger::new(LedgerConfig::default());
    let t = ledger
        .create(&Identity::new("origin"), NewTokenType::new("bench", ceiling))
        .unwrap();
    (ledger, t)
}

fn bench_propagation(c: &mut Criterion) {
    let recipients: Vec<Identity> = (0..256).map(|i| Identity::new(format!("r{}", i))).collect();

    c.bench_function("fan_out_256", |b| {
        b.iter_batched(
            || fresh(1_000),
            |(mut ledger, t)| ledger.propagate(t, &Identity::new("origin"), &recipients).unwrap(),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("chain_depth_200", |b| {
        b.iter_batched(
            || fresh(1_000),
            |(mut ledger, t)| {
                let mut holder = Identity::new("origin");
                for next in recipients.iter().take(200) {
                    ledger.propagate(t, &holder, std::slice::from_ref(next)).unwrap();
                    holder = next.clone();
                }
                ledger
            },
            BatchSize::SmallInput,
        )
    });

    let (mut ledger, t) = fresh(10_000);
    ledger.propagate(t, &Identity::new("origin"), &recipients).unwrap();
    c.bench_function("verify_invariants_257_holders", |b| b.iter(|| ledger.verify_invariants()));
}

criterion_group!(benches, bench_propagation);
criterion_main!(benches);
