//! Fixed-length trajectory recording.

use ndarray::Array6;
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::{Integrator, SpinSystem};

use crate::observables::{Observable, ObservableInfo};

/// Private system clone plus the sample buffer it writes into.
///
/// The buffer is laid out as `[observable, x, y, z, atom, time]`. Snapshot 0
/// is the state handed to [`TrajectoryBuffer::record`]; snapshot `n` follows
/// after `n * measperiod` integrator steps.
#[derive(Debug, Clone)]
pub struct TrajectoryBuffer<S, I> {
    system: S,
    integrator: I,
    samples: Array6<f64>,
    measperiod: usize,
}

impl<S, I> TrajectoryBuffer<S, I>
where
    S: SpinSystem,
    I: Integrator<S>,
{
    /// Allocates the buffer and takes the private clone of `system`.
    pub fn new(
        system: &S,
        integrator: I,
        info: &ObservableInfo,
        num_snapshots: usize,
        measperiod: usize,
    ) -> Result<Self, SqwError> {
        check_observables(system, info)?;
        let [lx, ly, lz] = system.latsize();
        let natoms = system.crystal().natoms();
        Ok(Self {
            system: system.clone(),
            integrator,
            samples: Array6::zeros((info.num_observables(), lx, ly, lz, natoms, num_snapshots)),
            measperiod,
        })
    }

    /// Overwrites the clone with `source` and records a full trajectory.
    pub fn record(&mut self, source: &S, info: &ObservableInfo) -> Result<(), SqwError> {
        let shape = self.samples.shape();
        if source.latsize() != [shape[1], shape[2], shape[3]] || source.crystal().natoms() != shape[4] {
            return Err(SqwError::Config(
                ErrorInfo::new("system-mismatch", "system does not match the trajectory buffer")
                    .with_context("latsize", format!("{:?}", source.latsize())),
            ));
        }
        self.system.clone_from(source);
        let snapshots = self.samples.shape()[5];
        self.snapshot(0, info)?;
        for t in 1..snapshots {
            for _ in 0..self.measperiod {
                self.integrator.step(&mut self.system)?;
            }
            self.snapshot(t, info)?;
        }
        Ok(())
    }

    fn snapshot(&mut self, t: usize, info: &ObservableInfo) -> Result<(), SqwError> {
        let [lx, ly, lz] = self.system.latsize();
        let natoms = self.system.crystal().natoms();
        for x in 0..lx {
            for y in 0..ly {
                for z in 0..lz {
                    for atom in 0..natoms {
                        let cell = [x, y, z];
                        let dipole = self.system.dipole(cell, atom);
                        for (o, obs) in info.observables().iter().enumerate() {
                            let value = match obs {
                                Observable::Dipole(axis) => dipole[*axis],
                                Observable::Operator(op) => {
                                    let state = self.system.coherent(cell, atom).ok_or_else(|| {
                                        SqwError::Dynamics(
                                            ErrorInfo::new(
                                                "missing-coherent-state",
                                                "site carries no coherent state for an operator observable",
                                            )
                                            .with_context("cell", format!("{cell:?}"))
                                            .with_context("atom", atom),
                                        )
                                    })?;
                                    if state.len() != op.dim() {
                                        return Err(SqwError::Dynamics(
                                            ErrorInfo::new(
                                                "operator-dimension-mismatch",
                                                "operator dimension differs from the coherent-state dimension",
                                            )
                                            .with_context("cell", format!("{cell:?}"))
                                            .with_context("atom", atom)
                                            .with_context("state", state.len()),
                                        ));
                                    }
                                    op.expectation(state)
                                }
                            };
                            self.samples[[o, x, y, z, atom, t]] = value;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Recorded samples.
    pub fn samples(&self) -> &Array6<f64> {
        &self.samples
    }

    /// Integrator steps between snapshots.
    pub fn measperiod(&self) -> usize {
        self.measperiod
    }

    /// Integrator used to evolve the clone.
    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    /// Fresh buffer of the same shape cloned from another system.
    pub fn fork(&self, system: &S) -> Self {
        Self {
            system: system.clone(),
            integrator: self.integrator.clone(),
            samples: Array6::zeros(self.samples.raw_dim()),
            measperiod: self.measperiod,
        }
    }
}

/// Rejects operator observables on systems without coherent states.
pub(crate) fn check_observables<S: SpinSystem>(
    system: &S,
    info: &ObservableInfo,
) -> Result<(), SqwError> {
    if info.is_dipole_only() {
        return Ok(());
    }
    let state = system.coherent([0, 0, 0], 0).ok_or_else(|| {
        SqwError::Config(
            ErrorInfo::new(
                "operator-observables-unsupported",
                "operator observables require a system carrying coherent states",
            )
            .with_hint("restrict observables to dipole components"),
        )
    })?;
    for obs in info.observables() {
        if let Observable::Operator(op) = obs {
            if op.dim() != state.len() {
                return Err(SqwError::Config(
                    ErrorInfo::new(
                        "operator-dimension-mismatch",
                        "operator dimension differs from the coherent-state dimension",
                    )
                    .with_context("operator", op.dim())
                    .with_context("state", state.len()),
                ));
            }
        }
    }
    Ok(())
}
