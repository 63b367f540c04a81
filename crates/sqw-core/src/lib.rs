#![deny(missing_docs)]
#![doc = "Core contracts shared by the sqw crates: the crystal description, the spin-system, integrator and sampler seams consumed by the correlation engine, and the canonical error type."]

use nalgebra::{Matrix3, Vector3};
use num_complex::Complex64;

pub mod crystal;
pub mod errors;
pub mod rng;

pub use crystal::Crystal;
pub use errors::{ErrorInfo, SqwError};
pub use rng::{derive_substream_seed, RngHandle, Stream};

/// Three-component real vector used for wavevectors and positions.
pub type Vec3 = Vector3<f64>;

/// Real 3x3 matrix used for lattice and basis transformations.
pub type Mat3 = Matrix3<f64>;

/// Classical spin configuration on a periodic lattice of unit cells.
///
/// Sites are addressed by their unit-cell coordinate and sublattice index.
/// Implementations must be cheap to clone in isolation: the correlation engine
/// takes a private clone before integrating so the caller's state is never
/// mutated.
pub trait SpinSystem: Clone {
    /// Crystal describing a single unit cell.
    fn crystal(&self) -> &Crystal;

    /// Number of unit cells along each lattice axis.
    fn latsize(&self) -> [usize; 3];

    /// Expected dipole moment of the site.
    fn dipole(&self, cell: [usize; 3], atom: usize) -> Vec3;

    /// SU(N) coherent state of the site, if the system carries one.
    ///
    /// Dipole-only systems return `None`; operator observables cannot be
    /// evaluated on them.
    fn coherent(&self, _cell: [usize; 3], _atom: usize) -> Option<&[Complex64]> {
        None
    }

    /// Total number of sites.
    fn num_sites(&self) -> usize {
        let [lx, ly, lz] = self.latsize();
        lx * ly * lz * self.crystal().natoms()
    }
}

/// Deterministic time integrator with a fixed step size.
pub trait Integrator<S: SpinSystem>: Clone {
    /// Fixed integration step Δt.
    fn dt(&self) -> f64;

    /// Advances the system by one step.
    fn step(&mut self, system: &mut S) -> Result<(), SqwError>;
}

/// Producer of decorrelated configurations (Monte Carlo, Langevin, ...).
pub trait Sampler<S: SpinSystem> {
    /// Replaces the state of `system` with a fresh decorrelated sample.
    fn sample(&mut self, system: &mut S) -> Result<(), SqwError>;
}
