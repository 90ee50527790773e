use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use collview::*;
use std::cell::RefCell;
use std::rc::Rc;

fn named_dict(size: usize) -> Value {
    Value::dict((0..size).map(|i| (format!("item{}", (i * 7919) % size), Value::Int(i as i64))))
}

fn bench_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapter_initialize");

    for size in [100, 1000, 10000].iter() {
        let value = Value::list((0..*size as i64).map(Value::Int));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| CollectionAdapter::from_value(black_box(value.clone()), AdapterOptions::default()).unwrap());
        });
    }
    group.finish();
}

fn bench_fetch_all_pages(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapter_fetch_all_pages");

    for size in [1000, 10000].iter() {
        let value = Value::list((0..*size as i64).map(Value::Int));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut adapter = CollectionAdapter::from_value(value.clone(), AdapterOptions::default()).unwrap();
                while adapter.can_fetch_more() {
                    adapter.fetch_more(None).unwrap();
                }
                black_box(adapter.row_count())
            });
        });
    }
    group.finish();
}

fn bench_natural_key_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapter_natural_key_sort");

    for size in [100, 1000, 10000].iter() {
        let value = named_dict(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let mut adapter = CollectionAdapter::from_value(value.clone(), AdapterOptions::default()).unwrap();
            b.iter(|| {
                adapter.sort(0, SortDirection::Descending).unwrap();
                adapter.sort(0, SortDirection::Ascending).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_natural_cmp(c: &mut Criterion) {
    c.bench_function("natural_cmp", |b| {
        b.iter(|| natural_cmp(black_box("dataset_2024_run10_part3"), black_box("dataset_2024_run9_part12")))
    });
}

fn bench_proxy_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("proxy_find");

    for size in [1000, 10000].iter() {
        let value = named_dict(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let adapter = Rc::new(RefCell::new(
                CollectionAdapter::from_value(value.clone(), AdapterOptions::default()).unwrap(),
            ));
            let mut proxy = FilterProxy::new(adapter);
            b.iter(|| {
                proxy.find(black_box("item12")).unwrap();
                black_box(proxy.row_count())
            });
        });
    }
    group.finish();
}

fn bench_remote_page(c: &mut Criterion) {
    let values: Mapping = (0..500).map(|i| (Key::from(format!("v{}", i)), Value::Int(i))).collect();

    c.bench_function("remote_first_page", |b| {
        b.iter(|| {
            let channel = Loopback::new(Namespace::new(values.clone()));
            let adapter =
                CollectionAdapter::new(Box::new(RemoteProvider::new(channel)), AdapterOptions::default().remote(true))
                    .unwrap();
            black_box(adapter.row_count())
        });
    });
}

criterion_group!(
    benches,
    bench_initialize,
    bench_fetch_all_pages,
    bench_natural_key_sort,
    bench_natural_cmp,
    bench_proxy_find,
    bench_remote_page
);
criterion_main!(benches);
