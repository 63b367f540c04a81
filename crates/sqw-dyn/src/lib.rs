//! Reference collaborators for the structure-factor engine: a classical dipole
//! spin lattice, an energy-conserving integrator and a Langevin sampler.

pub mod integrators;
pub mod lattice;

pub use integrators::{ImplicitMidpoint, Langevin, LangevinOpts};
pub use lattice::{Bond, SpinLattice};
