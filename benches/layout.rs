//! Layout benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use par_graph_layout::config::LayoutConfig;
use par_graph_layout::generators::{ball_cloud, random_graph};
use par_graph_layout::simulation::{
    integrate_particles, ParticleIdMass, ParticlePosKey, ParticleVel, ReferenceEngine,
};

fn benchmark_integrate(c: &mut Criterion) {
    let n = 10_000;
    let particles = ball_cloud(n, 1.0, 1);
    let graph = random_graph(n, 20_000, 2);
    let config = LayoutConfig::default();

    let pos: Vec<ParticlePosKey> = particles.iter().map(ParticlePosKey::from).collect();
    let vel: Vec<ParticleVel> = particles.iter().map(ParticleVel::from).collect();
    let idm: Vec<ParticleIdMass> = particles.iter().map(ParticleIdMass::from).collect();
    let mut out_pos = pos.clone();
    let mut out_vel = vel.clone();
    let mut out_idm = idm.clone();

    c.bench_function("integrate_10k", |b| {
        b.iter(|| {
            integrate_particles(
                black_box(&pos),
                black_box(&vel),
                black_box(&idm),
                black_box(&graph),
                &mut out_pos,
                &mut out_vel,
                &mut out_idm,
                black_box(&config),
            )
        })
    });
}

fn benchmark_reference_tick(c: &mut Criterion) {
    let n = 10_000;
    let particles = ball_cloud(n, 1.0, 3);
    let graph = random_graph(n, 20_000, 4);
    let mut engine = ReferenceEngine::new(particles, graph, LayoutConfig::default()).unwrap();

    c.bench_function("reference_tick_10k", |b| b.iter(|| engine.tick()));
}

criterion_group!(benches, benchmark_integrate, benchmark_reference_tick);
criterion_main!(benches);
