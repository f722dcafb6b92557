use criterion::{black_box, criterion_group, criterion_main, Criterion};
use driving::{decode, EnvParams, RewardCalculator, VehicleSnapshot};
use glam::Vec3;
use sim::{PixelFormat, RawImage};

fn camera_frame(width: u32, height: u32) -> RawImage {
    let raw_data = (0..width * height * 4).map(|i| (i % 251) as u8).collect();
    RawImage { frame: 1, width, height, format: PixelFormat::Bgra8, raw_data }
}

fn bench_decode(c: &mut Criterion) {
    let small = camera_frame(160, 120);
    c.bench_function("decode_160x120", |b| b.iter(|| decode(black_box(&small))));

    let large = camera_frame(800, 600);
    c.bench_function("decode_800x600", |b| b.iter(|| decode(black_box(&large))));
}

fn bench_reward(c: &mut Criterion) {
    let mut calc = RewardCalculator::new(&EnvParams::default(), Some(Vec3::new(500.0, 0.0, 0.0)), Vec3::ZERO);
    let snapshot = VehicleSnapshot {
        velocity: Vec3::new(12.0, 0.5, 0.0),
        location: Vec3::new(40.0, 0.3, 0.5),
        lane_center: Vec3::new(40.0, 0.0, 0.0),
        collisions: 0,
    };
    c.bench_function("reward_score", |b| b.iter(|| calc.score(black_box(&snapshot))));
}

criterion_group!(benches, bench_decode, bench_reward);
criterion_main!(benches);
