//! Reconciler and store benchmarks.
//!
//! Run with: cargo bench --package arbor-core

use arbor_core::{el, Arg, MemoryDocument, Node, Reconciler, Store, Thunk, Value};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

/// A keyed `<ul>` with one `<li>` per key.
fn keyed_list(keys: &[usize]) -> Node {
    let mut list = el("ul");
    for key in keys {
        list = list.child(el("li").key(key.to_string()).text(key.to_string()));
    }
    list.build().unwrap_or_else(|err| panic!("{err}"))
}

fn rows_store(n: usize) -> Store {
    let rows: Vec<serde_json::Value> = (0..n).map(|i| json!(format!("row {i}"))).collect();
    Store::new(Value::from(json!({ "rows": rows })))
}

/// One thunk per row of the store.
fn thunked_rows(store: &Store) -> Node {
    let rows = store.proxy("/rows").items().unwrap_or_default();
    let mut list = el("ul");
    for row in rows {
        list = list.child(Thunk::new("row", vec![Arg::from(row)], |args| {
            el("li").child(args[0].as_state()?).build().ok()
        }));
    }
    list.build().unwrap_or_else(|err| panic!("{err}"))
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_realize(c: &mut Criterion) {
    let mut group = c.benchmark_group("realize_list");
    for size in [10usize, 100, 1000] {
        let keys: Vec<usize> = (0..size).collect();
        let node = keyed_list(&keys);
        group.bench_with_input(BenchmarkId::from_parameter(size), &node, |b, node| {
            b.iter(|| {
                let mut doc = MemoryDocument::new();
                let mut reconciler = Reconciler::default();
                black_box(reconciler.realize(&mut doc, node, 0).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_keyed_shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_shift");
    for size in [10usize, 100, 1000] {
        let old_keys: Vec<usize> = (0..size).collect();
        let new_keys: Vec<usize> = (1..=size).collect();
        let old = keyed_list(&old_keys);
        let new = keyed_list(&new_keys);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut doc = MemoryDocument::new();
                let mut reconciler = Reconciler::default();
                let ul = reconciler.realize(&mut doc, &old, 0).unwrap();
                black_box(reconciler.patch(&mut doc, ul, &new, Some(&old), 0).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_memoized_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("memoized_rows_one_change");
    for size in [100usize, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let store = rows_store(size);
                let mut doc = MemoryDocument::new();
                let mut reconciler = Reconciler::default();
                let old = thunked_rows(&store);
                let ul = reconciler.realize(&mut doc, &old, store.tick()).unwrap();
                let tick = store.tick();
                store.set(&format!("/rows/{}", size / 2), "changed").unwrap();
                let new = thunked_rows(&store);
                black_box(reconciler.patch(&mut doc, ul, &new, Some(&old), tick).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_store_writes(c: &mut Criterion) {
    c.bench_function("store_write_and_query", |b| {
        let store = rows_store(100);
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let tick = store.tick();
            store.set("/rows/50", format!("value {n}")).unwrap();
            black_box(store.changed_since("/rows", tick))
        })
    });
}

criterion_group!(
    benches,
    bench_realize,
    bench_keyed_shift,
    bench_memoized_rows,
    bench_store_writes
);
criterion_main!(benches);
