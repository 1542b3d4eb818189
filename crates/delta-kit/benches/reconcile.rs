use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use delta_kit::prelude::*;

#[model]
pub struct Entry {
    #[key]
    id: u32,
    title: Scalar<String>,
    weight: Scalar<u64>,
}

#[model]
pub struct Ledger {
    #[key]
    id: u32,
    owner: Scalar<String>,
    labels: KeySet<String>,
    totals: KeyValueMap<String, u64>,
    entries: KeyModelMap<u32, Entry>,
}

fn ledger(size: u32) -> Arc<Ledger> {
    let mut builder = Ledger::builder(1);
    builder.set_owner("bench".to_string());
    for i in 0..size {
        builder.labels_mut().insert(format!("label-{i}"));
        builder.totals_mut().insert(format!("total-{i}"), u64::from(i));
        let mut entry = Entry::builder(i);
        entry.set_title(format!("entry {i}")).set_weight(u64::from(i) * 3);
        builder.entries_mut().insert(i, entry);
    }
    builder.build().unwrap()
}

fn bench_untouched(c: &mut Criterion) {
    let base = ledger(1000);

    c.bench_function("reconcile untouched 1000 entries", |b| {
        b.iter(|| black_box(base.to_builder().reconcile().unwrap()))
    });

    c.bench_function("reconcile equal copy 1000 entries", |b| {
        let copy = ledger(1000);
        b.iter(|| {
            black_box(
                copy.to_builder()
                    .reconcile_against(DeltaType::Update, &base)
                    .unwrap(),
            )
        })
    });
}

fn bench_light_edit(c: &mut Criterion) {
    let base = ledger(1000);

    c.bench_function("reconcile one entry edit in 1000", |b| {
        b.iter(|| {
            let mut builder = base.to_builder();
            builder
                .entries_mut()
                .get_mut(&500)
                .unwrap()
                .set_weight(7);
            black_box(builder.reconcile().unwrap())
        })
    });

    c.bench_function("reconcile owner edit in 1000", |b| {
        b.iter(|| {
            let mut builder = base.to_builder();
            builder.set_owner("someone else".to_string());
            black_box(builder.reconcile().unwrap())
        })
    });
}

fn bench_apply_and_merge(c: &mut Criterion) {
    let base = ledger(1000);
    let deltas: Vec<LedgerDelta> = (0..10u32)
        .map(|round| {
            let mut builder = base.to_builder();
            builder.totals_mut().insert(format!("total-{round}"), 0);
            builder.labels_mut().insert(format!("extra-{round}"));
            builder.reconcile().unwrap().unwrap()
        })
        .collect();

    c.bench_function("apply 10 deltas to 1000 entries", |b| {
        b.iter(|| {
            let mut builder = base.to_builder();
            for delta in &deltas {
                builder.apply_delta(delta).unwrap();
            }
            black_box(builder.build())
        })
    });

    c.bench_function("merge 10 deltas", |b| {
        b.iter(|| {
            let mut merged = deltas[0].to_delta_builder();
            for delta in &deltas[1..] {
                merged.add_delta(delta).unwrap();
            }
            black_box(merged.build_delta())
        })
    });
}

fn bench_add_delta(c: &mut Criterion) {
    let base = ledger(1000);
    c.bench_function("to_delta ADD 1000 entries", |b| {
        b.iter(|| black_box(base.to_delta(DeltaType::Add).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_untouched,
    bench_light_edit,
    bench_apply_and_merge,
    bench_add_delta,
);
criterion_main!(benches);
