use chrono::{DateTime, Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use recall_core::model::{Item, NewItem};
use recall_core::scheduler::compute_next_review;
use recall_core::selection::pick_due;

fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

fn make_item(id: i64, difficulty: f64, review_count: u32) -> Item {
    let mut item = Item::from_new(id, NewItem::new(1, format!("w{id}"), format!("t{id}")), epoch());
    item.difficulty = difficulty;
    item.review_count = review_count;
    item.next_due_at = epoch() - Duration::minutes(id % 97);
    item
}

fn bench_compute_next_review(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_next_review");

    group.bench_function("new_item", |b| {
        let item = make_item(1, 2.5, 0);
        b.iter(|| compute_next_review(black_box(&item), black_box(true)))
    });

    group.bench_function("table_interval", |b| {
        let item = make_item(1, 2.0, 3);
        b.iter(|| compute_next_review(black_box(&item), black_box(true)))
    });

    group.bench_function("extrapolated_interval", |b| {
        let item = make_item(1, 2.8, 40);
        b.iter(|| compute_next_review(black_box(&item), black_box(true)))
    });

    group.bench_function("miss", |b| {
        let item = make_item(1, 1.4, 12);
        b.iter(|| compute_next_review(black_box(&item), black_box(false)))
    });

    group.finish();
}

fn bench_pick_due(c: &mut Criterion) {
    let mut group = c.benchmark_group("pick_due");
    let now = epoch();

    for size in [100i64, 10_000] {
        let items: Vec<Item> = (0..size).map(|id| make_item(id, 2.5, 0)).collect();
        group.bench_function(format!("n={size},limit=20"), |b| {
            b.iter(|| pick_due(black_box(items.clone()), 1, now, 20))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute_next_review, bench_pick_due);
criterion_main!(benches);
