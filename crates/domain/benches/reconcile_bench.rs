use std::collections::HashMap;
use std::sync::Arc;

use common::{ItemId, UserId};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{
    CreateOrder, InMemoryEventPublisher, InMemoryUserDirectory, LineChange, LineItem,
    LineItemBatch, Money, OrderService, UpdateOrder, calculate_total, normalize, reconcile,
};
use store::{InMemoryCatalogStore, InMemoryOrderStore};

fn lines(count: i64) -> Vec<LineItem> {
    (1..=count).map(|id| LineItem::new(ItemId::new(id), 2)).collect()
}

fn prices(count: i64) -> HashMap<ItemId, Money> {
    (1..=count * 2)
        .map(|id| (ItemId::new(id), Money::from_cents(100 + id)))
        .collect()
}

/// Removes every third line, bumps every other line and adds as many new
/// items as there are existing lines.
fn mixed_batch(count: i64) -> LineItemBatch {
    let mut batch = LineItemBatch::new();
    for id in 1..=count {
        let item_id = ItemId::new(id);
        if id % 3 == 0 {
            batch = batch.remove(item_id);
        } else if id % 2 == 0 {
            batch = batch.update(item_id, 5);
        }
        batch = batch.add(ItemId::new(count + id), 1);
    }
    batch
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/normalize");
    for count in [10, 100, 1000] {
        let batch = mixed_batch(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &batch, |b, batch| {
            b.iter(|| normalize(batch));
        });
    }
    group.finish();
}

fn bench_reconcile_and_total(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/reconcile_total");
    for count in [10, 100, 1000] {
        let ops = normalize(&mixed_batch(count));
        let items = lines(count);
        let prices = prices(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut working = items.clone();
                reconcile(&mut working, &ops).unwrap();
                calculate_total(&working, &prices).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_service_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let user_id = UserId::new();
    let service = OrderService::new(
        InMemoryOrderStore::new(),
        InMemoryCatalogStore::new(),
        Arc::new(InMemoryUserDirectory::with_users([user_id])),
        Arc::new(InMemoryEventPublisher::new()),
    );

    let (order_id, first, second) = rt.block_on(async {
        let first = service
            .catalog()
            .create_item("Bench Widget", Money::from_cents(1000))
            .await
            .unwrap()
            .id;
        let second = service
            .catalog()
            .create_item("Bench Gadget", Money::from_cents(250))
            .await
            .unwrap()
            .id;
        let order = service
            .create_order(CreateOrder::new(user_id, vec![LineChange::new(first, 1)]))
            .await
            .unwrap();
        (order.id(), first, second)
    });

    c.bench_function("service/update_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                let batch = LineItemBatch::new().add(first, 1).add(second, 1);
                service
                    .update_order(UpdateOrder::new(order_id, batch))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_normalize,
    bench_reconcile_and_total,
    bench_service_update
);
criterion_main!(benches);
