//! Benchmarks for Modula store operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use modula_core::{json, NamespacePath, StoreConfig, Value};
use modula_router::{normalize, ModuleDescriptor, NormalizeContext};
use modula_store::{GlobalStateStore, ModuleOptions, RegisterOptions};
use modula_test::{counter_options, global_store};

fn bench_global_commit(c: &mut Criterion) {
    let global = global_store().unwrap();

    c.bench_function("global_commit", |b| {
        b.iter(|| global.commit(black_box("setStatus"), json!("loaded")))
    });
}

fn bench_module_commit(c: &mut Criterion) {
    let global = global_store().unwrap();
    let module = global
        .register_module_store("math", counter_options(0), RegisterOptions::default())
        .unwrap();

    c.bench_function("module_commit", |b| {
        b.iter(|| module.commit(black_box("increment"), Value::Null))
    });
}

fn bench_commit_with_bound_stores(c: &mut Criterion) {
    let global = global_store().unwrap();
    for i in 0..32 {
        global
            .register_module_store(format!("m{i}"), counter_options(0), RegisterOptions::default())
            .unwrap();
    }

    c.bench_function("commit_with_32_bound_stores", |b| {
        b.iter(|| global.commit(black_box("m16/increment"), Value::Null))
    });
}

fn bench_module_getter(c: &mut Criterion) {
    let global = global_store().unwrap();
    let module = global
        .register_module_store("math", counter_options(7), RegisterOptions::default())
        .unwrap();

    c.bench_function("module_getter", |b| {
        b.iter(|| black_box(module.getter(black_box("square"))))
    });
}

fn bench_register_unregister(c: &mut Criterion) {
    let global = global_store().unwrap();
    let path = NamespacePath::from("math");

    c.bench_function("register_unregister_module_store", |b| {
        b.iter(|| {
            let module = global
                .register_module_store(path.clone(), counter_options(0), RegisterOptions::default())
                .unwrap();
            black_box(global.unregister_module_store(path.clone()));
            module
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let descriptor = ModuleDescriptor::new()
        .name("auth")
        .path("/auth")
        .children(
            (0..16)
                .map(|i| ModuleDescriptor::new().name(format!("page{i}")).path(format!("p{i}")))
                .chain(std::iter::once(ModuleDescriptor::new().name("overview")))
                .collect(),
        );
    let global = GlobalStateStore::new(ModuleOptions::new(), StoreConfig::production())
        .unwrap();
    let ctx = NormalizeContext::new(global);

    c.bench_function("normalize_17_children", |b| {
        b.iter(|| normalize(black_box(&descriptor), &ctx))
    });
}

criterion_group!(
    benches,
    bench_global_commit,
    bench_module_commit,
    bench_commit_with_bound_stores,
    bench_module_getter,
    bench_register_unregister,
    bench_normalize,
);
criterion_main!(benches);
