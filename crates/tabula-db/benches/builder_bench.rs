//! Criterion benchmarks for statement compilation and bulk insert.
//!
//! Run with:
//! ```bash
//! cargo bench -p tabula-db
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use tabula_db::{
    builder, AggregateFunc, ColumnDef, ColumnType, CreateOptions, Database, Filter, Row,
    SelectOptions, SortDirection, TableSchema,
};

// ── helpers ─────────────────────────────────────────────────────────────────

fn wide_schema(columns: usize) -> TableSchema {
    let mut defs = vec![ColumnDef::new("id", ColumnType::Integer).autoincrement()];
    defs.extend((0..columns).map(|i| ColumnDef::new(format!("c{i}"), ColumnType::Integer)));
    TableSchema::new("bench", defs)
}

fn rows(n: usize, columns: usize) -> Vec<Row> {
    (0..n)
        .map(|i| (0..columns).map(|c| (format!("c{c}"), (i * c) as i64)).collect())
        .collect()
}

// ── compile ─────────────────────────────────────────────────────────────────

fn bench_compile_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("builder/select");

    for &n in &[4usize, 32, 128] {
        let schema = wide_schema(n);
        let filter = Filter::and((0..n).map(|i| Filter::gt(format!("c{i}"), i as i64)));
        let opts = SelectOptions::new()
            .filter(filter)
            .group_by("c0")
            .aggregate("id", AggregateFunc::Count)
            .order_by("id_count", SortDirection::Desc)
            .limit(10);

        group.bench_with_input(BenchmarkId::new("filters", n), &n, |b, _| {
            b.iter(|| builder::select(&schema, &opts).unwrap())
        });
    }

    group.finish();
}

// ── insert ──────────────────────────────────────────────────────────────────

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("database/insert");
    let schema = wide_schema(8);

    for &n in &[10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("rows", n), &n, |b, &n| {
            b.iter_batched(
                || {
                    let db = Database::open_memory().unwrap();
                    db.create_table(&schema, CreateOptions::default()).unwrap();
                    (db, rows(n, 8))
                },
                |(db, batch)| db.insert("bench", batch).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile_select, bench_insert);
criterion_main!(benches);
