use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use weak_sph::{FluidSimulation, PointerState, SimConfig};

fn settled_simulation(count: usize) -> FluidSimulation {
    let mut config = SimConfig::default();
    config.particle.initial_count = count;
    let mut sim = FluidSimulation::new(config).expect("default config is valid");
    let mut rng = StdRng::seed_from_u64(7);
    sim.seed(&mut rng);
    for _ in 0..30 {
        sim.step(&PointerState::default(), &mut rng);
    }
    sim
}

fn bench_step(c: &mut Criterion) {
    let mut sim = settled_simulation(2000);
    let mut rng = StdRng::seed_from_u64(8);
    c.bench_function("step 2000 particles", |b| {
        b.iter(|| black_box(sim.step(&PointerState::default(), &mut rng)))
    });
}

fn bench_contours(c: &mut Criterion) {
    let sim = settled_simulation(300);
    c.bench_function("contours 300 particles", |b| {
        b.iter(|| black_box(sim.contours().count()))
    });
}

criterion_group!(benches, bench_step, bench_contours);
criterion_main!(benches);
