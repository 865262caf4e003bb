// Scoring and ranking benchmarks
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use countrysim_core::{cosine, IndicatorVector, Indicators};
use countrysim_similarity::{RankingEngine, RatioScorer, RelativeDifferenceScorer, SimilarityScorer};
use rand::prelude::*;

fn random_vector(rng: &mut StdRng, id: usize) -> IndicatorVector {
    let indicators = Indicators::new(
        rng.random_range(500.0..120000.0),
        rng.random_range(50.0..90.0),
        rng.random_range(30.0..100.0),
        rng.random_range(0.1..30.0),
        rng.random_range(0.1..1400.0),
    )
    .with_optional(
        Some(rng.random_range(1.0..30.0)),
        Some(rng.random_range(10.0..90.0)),
        Some(rng.random_range(3.0..8.0)),
    );
    IndicatorVector::new(format!("Country {}", id), "XX", "Region", "Capital", indicators)
        .expect("generated indicators are in bounds")
}

fn random_embedding(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect()
}

fn benchmark_score(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let a = random_vector(&mut rng, 0);
    let b = random_vector(&mut rng, 1);

    let mut group = c.benchmark_group("score");
    let ratio = RatioScorer::default();
    let relative = RelativeDifferenceScorer::default();
    group.bench_function("ratio", |bench| bench.iter(|| ratio.score(black_box(&a), black_box(&b))));
    group.bench_function("relative_difference", |bench| {
        bench.iter(|| relative.score(black_box(&a), black_box(&b)))
    });
    group.finish();
}

fn benchmark_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let engine = RankingEngine::default();

    for size in [30, 1000, 10000].iter() {
        let mut rng = StdRng::seed_from_u64(*size as u64);
        let reference = random_vector(&mut rng, 0);
        let candidates: Vec<IndicatorVector> = (1..=*size).map(|i| random_vector(&mut rng, i)).collect();

        group.bench_with_input(BenchmarkId::new("top10", size), size, |bench, _| {
            bench.iter(|| engine.rank(black_box(&reference), black_box(&candidates), 10, Some("Country 1")))
        });
    }

    group.finish();
}

fn benchmark_cosine(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let a = random_embedding(&mut rng, 768);
    let b = random_embedding(&mut rng, 768);

    c.bench_function("cosine_768", |bench| bench.iter(|| cosine(black_box(&a), black_box(&b))));
}

criterion_group!(benches, benchmark_score, benchmark_rank, benchmark_cosine);
criterion_main!(benches);
