use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sqw_core::{Crystal, RngHandle, Vec3};
use sqw_corr::{
    intensities, intensity_grid, path, CorrelationOpts, Interpolation, QueryOpts,
    SampledCorrelations, StructureFactor, Trace,
};
use sqw_dyn::{Bond, ImplicitMidpoint, Langevin, LangevinOpts, SpinLattice};

fn chain() -> SpinLattice {
    let mut lattice = SpinLattice::new(Crystal::cubic(1.0), [16, 1, 1], 1.0).expect("lattice");
    lattice
        .add_bond(Bond {
            i: 0,
            j: 0,
            offset: [1, 0, 0],
            coupling: 1.0,
        })
        .expect("bond");
    let mut rng = RngHandle::from_seed(7);
    lattice.randomize(&mut rng);
    lattice
}

fn sampler() -> Langevin {
    Langevin::new(
        LangevinOpts {
            dt: 0.02,
            damping: 0.1,
            kt: 0.5,
            steps_per_sample: 50,
        },
        7,
    )
    .expect("sampler")
}

fn opts() -> CorrelationOpts {
    CorrelationOpts {
        num_omegas: 33,
        omega_max: Some(6.0),
        ..CorrelationOpts::default()
    }
}

fn accumulated() -> SampledCorrelations {
    let mut system = chain();
    let mut sampler = sampler();
    let mut sf = StructureFactor::new(&system, ImplicitMidpoint::new(0.05).expect("integrator"), &opts())
        .expect("structure factor");
    sf.accumulate(&mut system, &mut sampler, 4).expect("accumulate");
    sf.into_correlations()
}

fn bench_accumulate(c: &mut Criterion) {
    let system = chain();
    let mut sf = StructureFactor::new(&system, ImplicitMidpoint::new(0.05).expect("integrator"), &opts())
        .expect("structure factor");
    c.bench_function("add_sample_chain16", |b| {
        b.iter(|| sf.add_sample(black_box(&system)).expect("sample"))
    });
}

fn bench_queries(c: &mut Criterion) {
    let sc = accumulated();
    let trace = Trace::new(sc.info()).expect("trace");
    let dense: Vec<Vec3> = (0..2000)
        .map(|k| Vec3::new(k as f64 / 1000.0, 0.0, 0.0))
        .collect();
    let linear = QueryOpts {
        interpolation: Interpolation::Linear,
        ..QueryOpts::default()
    };
    c.bench_function("intensities_dense_line", |b| {
        b.iter(|| intensities(&sc, black_box(&dense), &trace, &QueryOpts::default()).expect("query"))
    });
    c.bench_function("intensities_dense_line_linear", |b| {
        b.iter(|| intensities(&sc, black_box(&dense), &trace, &linear).expect("query"))
    });
    c.bench_function("intensity_grid_two_zones", |b| {
        b.iter(|| intensity_grid(&sc, &trace, [2, 1, 1], &QueryOpts::default()).expect("grid"))
    });
    let waypoints = [Vec3::zeros(), Vec3::new(0.5, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
    c.bench_function("path_density_200", |b| {
        b.iter(|| path(&sc, &waypoints, 200.0, &trace, &QueryOpts::default()).expect("path"))
    });
}

criterion_group!(benches, bench_accumulate, bench_queries);
criterion_main!(benches);
