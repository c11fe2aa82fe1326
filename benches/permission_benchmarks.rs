use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

use rbac_admin::cache::{CacheSettings, MemoryCache};
use rbac_admin::middleware::PerformanceMonitor;
use rbac_admin::service::{DataSeeder, RbacServices};
use rbac_admin::store::{MemoryStore, RbacStore};

fn seeded(rt: &Runtime) -> (RbacServices, i64) {
    rt.block_on(async {
        let store = Arc::new(MemoryStore::new());
        DataSeeder::new(store.clone())
            .seed_if_empty()
            .await
            .expect("seed");
        let jane = store
            .snapshot()
            .await
            .expect("snapshot")
            .users
            .into_iter()
            .find(|u| u.username == "jane.smith")
            .map(|u| u.user_id)
            .expect("jane");
        let services = RbacServices::new(store, Arc::new(MemoryCache::new()), CacheSettings::default());
        (services, jane)
    })
}

fn benchmark_resolution(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let (services, jane) = seeded(&rt);

    c.bench_function("resolve_effective_permissions_cached", |b| {
        b.iter(|| {
            rt.block_on(services.resolver.resolve_effective_permissions(black_box(jane)))
                .expect("resolve")
        })
    });

    let key = CacheSettings::default().keys.user_permissions(jane);
    c.bench_function("resolve_effective_permissions_uncached", |b| {
        b.iter(|| {
            rt.block_on(async {
                services.cache.remove(&key).await;
                services
                    .resolver
                    .resolve_effective_permissions(black_box(jane))
                    .await
                    .expect("resolve")
            })
        })
    });
}

fn benchmark_bulk_assignment(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let (services, jane) = seeded(&rt);
    let role_ids: Vec<i64> = (1..=5).collect();

    // 重复执行时全部为已存在的边，衡量过滤路径
    c.bench_function("bulk_assign_existing_roles", |b| {
        b.iter(|| {
            rt.block_on(
                services
                    .assignments
                    .bulk_assign_roles_to_user(jane, black_box(&role_ids)),
            )
            .expect("bulk")
        })
    });
}

fn benchmark_request_metrics(c: &mut Criterion) {
    let monitor = PerformanceMonitor::new();

    c.bench_function("record_request", |b| {
        b.iter(|| {
            monitor.record(
                black_box("GET"),
                black_box("/api/users/{id}/permissions"),
                black_box(200),
                black_box(3),
            )
        })
    });

    c.bench_function("metrics_snapshot", |b| b.iter(|| monitor.snapshot()));
}

criterion_group!(
    benches,
    benchmark_resolution,
    benchmark_bulk_assignment,
    benchmark_request_metrics
);
criterion_main!(benches);
