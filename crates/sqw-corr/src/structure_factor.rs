//! Owner of the accumulator and its trajectory buffer.

use rayon::prelude::*;
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::{Integrator, Sampler, SpinSystem};

use crate::correlations::{CorrelationOpts, SampledCorrelations};
use crate::trajectory::TrajectoryBuffer;

/// Dynamical structure factor accumulated from sampled trajectories.
///
/// Accumulation requires exclusive access; queries operate on the shared
/// [`SampledCorrelations`] returned by [`StructureFactor::correlations`].
#[derive(Debug, Clone)]
pub struct StructureFactor<S, I> {
    correlations: SampledCorrelations,
    trajectory: TrajectoryBuffer<S, I>,
}

impl<S, I> StructureFactor<S, I>
where
    S: SpinSystem,
    I: Integrator<S>,
{
    /// Validates the frequency request against the integrator step and
    /// allocates an empty accumulator for `system`'s lattice.
    pub fn new(system: &S, integrator: I, opts: &CorrelationOpts) -> Result<Self, SqwError> {
        let correlations = SampledCorrelations::new(
            system.crystal().clone(),
            system.latsize(),
            integrator.dt(),
            opts,
        )?;
        let schedule = *correlations.schedule();
        let trajectory = TrajectoryBuffer::new(
            system,
            integrator,
            correlations.info(),
            schedule.num_snapshots,
            schedule.measperiod,
        )?;
        tracing::info!(
            delta_omega = schedule.delta_omega,
            measperiod = schedule.measperiod,
            snapshots = schedule.num_snapshots,
            correlations = correlations.info().num_correlations(),
            shape = ?correlations.data().shape(),
            "structure factor allocated"
        );
        Ok(Self {
            correlations,
            trajectory,
        })
    }

    /// Records one trajectory starting from `system` and folds it in.
    ///
    /// `system` itself is not modified.
    pub fn add_sample(&mut self, system: &S) -> Result<(), SqwError> {
        self.trajectory.record(system, self.correlations.info())?;
        self.correlations.add_trajectory(self.trajectory.samples().view())?;
        tracing::debug!(nsamples = self.correlations.nsamples(), "sample accumulated");
        Ok(())
    }

    /// Draws `nsamples` configurations from `sampler` and accumulates each.
    pub fn accumulate<M: Sampler<S>>(
        &mut self,
        system: &mut S,
        sampler: &mut M,
        nsamples: usize,
    ) -> Result<(), SqwError> {
        for _ in 0..nsamples {
            sampler.sample(system)?;
            self.add_sample(system)?;
        }
        Ok(())
    }

    /// Accumulated correlations.
    pub fn correlations(&self) -> &SampledCorrelations {
        &self.correlations
    }

    /// Releases the accumulated correlations.
    pub fn into_correlations(self) -> SampledCorrelations {
        self.correlations
    }

    /// Frequency axis of query results.
    pub fn frequencies(&self, negative_energies: bool) -> Vec<f64> {
        self.correlations.frequencies(negative_energies)
    }

    /// Merges correlations accumulated elsewhere with the same parameters.
    pub fn merge(&mut self, other: &SampledCorrelations) -> Result<(), SqwError> {
        self.correlations.merge(other)
    }
}

impl<S, I> StructureFactor<S, I>
where
    S: SpinSystem + Send,
    I: Integrator<S> + Send,
{
    /// Runs one independent chain per worker on the rayon pool, each with its
    /// own system clone, sampler and trajectory buffer, then merges the
    /// partial averages in worker order.
    ///
    /// Exactly `nsamples` trajectories are added: worker `k` draws
    /// `nsamples / workers` of them, plus one when `k < nsamples % workers`.
    pub fn accumulate_parallel<M>(
        &mut self,
        workers: Vec<(S, M)>,
        nsamples: usize,
    ) -> Result<(), SqwError>
    where
        M: Sampler<S> + Send,
    {
        if workers.is_empty() {
            return Err(SqwError::Config(ErrorInfo::new(
                "no-workers",
                "parallel accumulation needs at least one worker",
            )));
        }
        if let Some(idx) = workers.iter().position(|(system, _)| {
            system.latsize() != self.correlations.latsize()
                || system.crystal() != self.correlations.crystal()
        }) {
            return Err(SqwError::Config(
                ErrorInfo::new("worker-lattice-mismatch", "worker system differs from the accumulator lattice")
                    .with_context("worker", idx),
            ));
        }
        let base = nsamples / workers.len();
        let extra = nsamples % workers.len();
        let jobs: Vec<_> = workers
            .into_iter()
            .enumerate()
            .map(|(k, (system, sampler))| {
                let partial = Self {
                    correlations: self.correlations.empty_clone(),
                    trajectory: self.trajectory.fork(&system),
                };
                let count = base + usize::from(k < extra);
                (system, sampler, partial, count)
            })
            .collect();
        let partials = jobs
            .into_par_iter()
            .map(|(mut system, mut sampler, mut partial, count)| {
                partial.accumulate(&mut system, &mut sampler, count)?;
                Ok(partial.correlations)
            })
            .collect::<Result<Vec<_>, SqwError>>()?;
        for partial in &partials {
            self.correlations.merge(partial)?;
        }
        tracing::debug!(
            workers = partials.len(),
            nsamples = self.correlations.nsamples(),
            "parallel accumulation merged"
        );
        Ok(())
    }
}
