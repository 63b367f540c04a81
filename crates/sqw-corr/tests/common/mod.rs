#![allow(dead_code)]

use sqw_core::{Crystal, Mat3, RngHandle, Vec3};
use sqw_corr::{CorrelationOpts, SampledCorrelations, StructureFactor};
use sqw_dyn::{Bond, ImplicitMidpoint, Langevin, LangevinOpts, SpinLattice};

pub fn two_site_crystal() -> Crystal {
    Crystal::new(
        Mat3::identity() * 2.0,
        vec![Vec3::zeros(), Vec3::new(0.5, 0.5, 0.0)],
        None,
    )
    .expect("crystal")
}

pub fn thermal_lattice(seed: u64) -> SpinLattice {
    let mut lattice = SpinLattice::new(two_site_crystal(), [3, 3, 1], 1.0).expect("lattice");
    for offset in [[0, 0, 0], [-1, 0, 0], [0, -1, 0], [-1, -1, 0]] {
        lattice
            .add_bond(Bond {
                i: 0,
                j: 1,
                offset,
                coupling: 1.0,
            })
            .expect("bond");
    }
    lattice
        .add_bond(Bond {
            i: 0,
            j: 0,
            offset: [1, 0, 0],
            coupling: -0.3,
        })
        .expect("bond");
    lattice.set_field(Vec3::new(0.0, 0.0, 0.2));
    let mut rng = RngHandle::from_seed(seed);
    lattice.randomize(&mut rng);
    lattice
}

pub fn integrator() -> ImplicitMidpoint {
    ImplicitMidpoint::new(0.05).expect("integrator")
}

pub fn sampler(seed: u64) -> Langevin {
    Langevin::new(
        LangevinOpts {
            dt: 0.02,
            damping: 0.2,
            kt: 0.4,
            steps_per_sample: 25,
        },
        seed,
    )
    .expect("sampler")
}

pub fn dynamic_opts() -> CorrelationOpts {
    CorrelationOpts {
        num_omegas: 5,
        ..CorrelationOpts::default()
    }
}

pub fn accumulated(opts: &CorrelationOpts, nsamples: usize, seed: u64) -> SampledCorrelations {
    let mut system = thermal_lattice(seed);
    let mut sampler = sampler(seed);
    let mut sf = StructureFactor::new(&system, integrator(), opts).expect("structure factor");
    sf.accumulate(&mut system, &mut sampler, nsamples)
        .expect("accumulate");
    sf.into_correlations()
}
