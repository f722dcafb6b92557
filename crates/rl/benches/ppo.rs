use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rl::{RolloutBuffer, Transition};

fn filled_buffer(n: usize) -> RolloutBuffer<()> {
    let mut buffer = RolloutBuffer::new(n, 0.99, 0.95);
    let mut rng = fastrand::Rng::with_seed(0);
    for i in 0..n {
        let _ = buffer.push(Transition {
            observation: (),
            action: vec![rng.f32(), rng.f32()],
            reward: rng.f32() - 0.5,
            episode_start: i % 200 == 0,
            value: rng.f32(),
            log_prob: 0.0,
        });
    }
    buffer
}

fn bench_gae(c: &mut Criterion) {
    let mut buffer = filled_buffer(2048);
    c.bench_function("gae_2048", |b| {
        b.iter(|| buffer.compute_returns_and_advantage(black_box(0.5), false));
    });
}

fn bench_minibatches(c: &mut Criterion) {
    let buffer = filled_buffer(2048);
    let mut rng = fastrand::Rng::with_seed(1);
    c.bench_function("minibatches_2048_by_64", |b| {
        b.iter(|| buffer.minibatches(black_box(64), &mut rng));
    });
}

criterion_group!(benches, bench_gae, bench_minibatches);
criterion_main!(benches);
