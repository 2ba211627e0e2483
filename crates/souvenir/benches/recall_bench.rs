//! Recall hot path benchmarks.
//!
//! Targets the same question the host engine's own retrieval benches ask:
//! how does fused lexical+vector+graph scoring scale as the store grows.

use criterion::{criterion_group, criterion_main, Criterion};

use souvenir_core::config::RecallConfig;
use souvenir_core::memory::Memory;
use souvenir_core::traits::MemoryRepository;
use souvenir_recall::RecallPipeline;
use souvenir_storage::StorageEngine;

fn seed(storage: &StorageEngine, n: usize) {
    for i in 0..n {
        let memory = Memory::new(
            format!("benchmark memory number {i} about rabbits and databases"),
            "durable",
            "fact",
            0.5,
        );
        storage.insert(&memory).expect("seed insert");
    }
}

fn bench_recall_at(c: &mut Criterion, label: &str, n: usize) {
    let storage = StorageEngine::open_in_memory().unwrap();
    seed(&storage, n);
    let config = RecallConfig::default();
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function(label, |b| {
        b.iter(|| {
            let pipeline = RecallPipeline::new(&storage, None, config.clone());
            rt.block_on(pipeline.recall("rabbits", 2000)).unwrap()
        })
    });
}

fn bench_recall_100(c: &mut Criterion) {
    bench_recall_at(c, "recall_100", 100);
}

fn bench_recall_1k(c: &mut Criterion) {
    bench_recall_at(c, "recall_1k", 1_000);
}

criterion_group!(benches, bench_recall_100, bench_recall_1k);
criterion_main!(benches);
