//! Running average of the 7-D correlation tensor.

use std::f64::consts::PI;

use ndarray::{Array6, ArrayD, ArrayView6, Axis, IxDyn, Zip};
use num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::Crystal;

use crate::observables::{Observable, ObservableInfo};

/// Construction parameters for a correlation accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationOpts {
    /// Number of non-negative frequency bins. `1` records equal-time
    /// correlations only.
    #[serde(default = "default_num_omegas")]
    pub num_omegas: usize,
    /// Largest resolved frequency. `None` samples every integrator step.
    #[serde(default)]
    pub omega_max: Option<f64>,
    /// Recorded observables; `None` selects the three dipole components.
    #[serde(default)]
    pub observables: Option<Vec<Observable>>,
    /// Retained matrix elements; `None` keeps all of them.
    #[serde(default)]
    pub correlations: Option<Vec<(usize, usize)>>,
    /// Subtract the time-averaged value of every site before transforming.
    #[serde(default)]
    pub subtract_mean: bool,
}

fn default_num_omegas() -> usize {
    100
}

impl Default for CorrelationOpts {
    fn default() -> Self {
        Self {
            num_omegas: default_num_omegas(),
            omega_max: None,
            observables: None,
            correlations: None,
            subtract_mean: false,
        }
    }
}

/// Sampling schedule derived from the step size and the frequency request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencySchedule {
    /// Integrator step size Δt.
    pub dt: f64,
    /// Integrator steps between recorded snapshots.
    pub measperiod: usize,
    /// Total snapshots per trajectory, including negative-frequency bins.
    pub num_snapshots: usize,
    /// Frequency spacing Δω (zero for equal-time accumulation).
    pub delta_omega: f64,
}

impl FrequencySchedule {
    /// Validates the step size and derives the schedule.
    pub fn new(dt: f64, num_omegas: usize, omega_max: Option<f64>) -> Result<Self, SqwError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SqwError::Config(
                ErrorInfo::new("invalid-step", "integrator step must be positive and finite")
                    .with_context("dt", dt),
            ));
        }
        if num_omegas == 0 {
            return Err(SqwError::Config(ErrorInfo::new(
                "invalid-frequency-count",
                "at least one frequency bin is required",
            )));
        }
        let measperiod = match omega_max {
            None => 1,
            Some(omega_max) => {
                if !(omega_max.is_finite() && omega_max > 0.0) {
                    return Err(SqwError::Config(
                        ErrorInfo::new("invalid-omega-max", "maximum frequency must be positive")
                            .with_context("omega_max", omega_max),
                    ));
                }
                let nyquist = PI / dt;
                if nyquist <= omega_max {
                    return Err(SqwError::Config(
                        ErrorInfo::new(
                            "nyquist-violation",
                            "maximum frequency exceeds what the step size can resolve",
                        )
                        .with_context("omega_max", omega_max)
                        .with_context("nyquist", nyquist)
                        .with_hint("decrease the integrator step or lower omega_max"),
                    ));
                }
                (nyquist / omega_max).floor() as usize
            }
        };
        if num_omegas == 1 {
            return Ok(Self {
                dt,
                measperiod: 1,
                num_snapshots: 1,
                delta_omega: 0.0,
            });
        }
        let num_snapshots = 2 * (num_omegas - 1);
        let delta_omega = 2.0 * PI / (dt * measperiod as f64 * num_snapshots as f64);
        Ok(Self {
            dt,
            measperiod,
            num_snapshots,
            delta_omega,
        })
    }

    /// Number of non-negative frequency bins.
    pub fn num_nonnegative(&self) -> usize {
        self.num_snapshots / 2 + 1
    }

    /// Frequency of FFT bin `k`.
    pub fn omega(&self, k: usize) -> f64 {
        if k < self.num_nonnegative() {
            k as f64 * self.delta_omega
        } else {
            (k as f64 - self.num_snapshots as f64) * self.delta_omega
        }
    }
}

/// Accumulated correlations `⟨A_α,i(q,ω) A_β,j(q,ω)*⟩`.
///
/// `data` has shape `[pair, i, j, Lx, Ly, Lz, ω]` where `i, j` are
/// sublattices and `ω` runs over all FFT bins in natural order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledCorrelations {
    crystal: Crystal,
    latsize: [usize; 3],
    info: ObservableInfo,
    schedule: FrequencySchedule,
    subtract_mean: bool,
    nsamples: u64,
    data: ArrayD<Complex64>,
}

impl SampledCorrelations {
    /// Allocates an empty accumulator.
    pub fn new(
        crystal: Crystal,
        latsize: [usize; 3],
        dt: f64,
        opts: &CorrelationOpts,
    ) -> Result<Self, SqwError> {
        if latsize.iter().any(|&l| l == 0) {
            return Err(SqwError::Config(
                ErrorInfo::new("empty-lattice", "lattice extents must be positive")
                    .with_context("latsize", format!("{latsize:?}")),
            ));
        }
        let schedule = FrequencySchedule::new(dt, opts.num_omegas, opts.omega_max)?;
        let info = ObservableInfo::new(opts.observables.clone(), opts.correlations.clone())?;
        if opts.subtract_mean && schedule.num_snapshots == 1 {
            tracing::warn!("mean subtraction with a single snapshot removes every signal");
        }
        let shape = tensor_shape(&crystal, latsize, &info, &schedule);
        Ok(Self {
            crystal,
            latsize,
            info,
            schedule,
            subtract_mean: opts.subtract_mean,
            nsamples: 0,
            data: ArrayD::zeros(IxDyn(&shape)),
        })
    }

    /// Shape `data` must have for these parameters.
    pub(crate) fn expected_shape(&self) -> [usize; 7] {
        tensor_shape(&self.crystal, self.latsize, &self.info, &self.schedule)
    }

    /// Accumulator with identical parameters and no samples.
    pub fn empty_clone(&self) -> Self {
        Self {
            crystal: self.crystal.clone(),
            latsize: self.latsize,
            info: self.info.clone(),
            schedule: self.schedule,
            subtract_mean: self.subtract_mean,
            nsamples: 0,
            data: ArrayD::zeros(self.data.raw_dim()),
        }
    }

    /// Crystal the correlations were recorded on.
    pub fn crystal(&self) -> &Crystal {
        &self.crystal
    }

    /// Lattice extents.
    pub fn latsize(&self) -> [usize; 3] {
        self.latsize
    }

    /// Observables and retained pairs.
    pub fn info(&self) -> &ObservableInfo {
        &self.info
    }

    /// Sampling schedule.
    pub fn schedule(&self) -> &FrequencySchedule {
        &self.schedule
    }

    /// Number of trajectories averaged so far.
    pub fn nsamples(&self) -> u64 {
        self.nsamples
    }

    /// Whether per-site means are removed before transforming.
    pub fn subtracts_mean(&self) -> bool {
        self.subtract_mean
    }

    /// Raw tensor.
    pub fn data(&self) -> &ArrayD<Complex64> {
        &self.data
    }

    /// Number of frequency bins a query returns.
    pub fn num_bins(&self, negative_energies: bool) -> usize {
        if negative_energies {
            self.schedule.num_snapshots
        } else {
            self.schedule.num_nonnegative()
        }
    }

    /// Frequency axis matching the query bins.
    pub fn frequencies(&self, negative_energies: bool) -> Vec<f64> {
        (0..self.num_bins(negative_energies))
            .map(|k| self.schedule.omega(k))
            .collect()
    }

    /// Single stored element `data[slot, i, j, cell, ω]`.
    pub(crate) fn element(&self, slot: usize, i: usize, j: usize, cell: [usize; 3], w: usize) -> Complex64 {
        self.data[IxDyn(&[slot, i, j, cell[0], cell[1], cell[2], w])]
    }

    /// Folds one trajectory `[observable, x, y, z, atom, time]` into the average.
    pub fn add_trajectory(&mut self, samples: ArrayView6<f64>) -> Result<(), SqwError> {
        let natoms = self.crystal.natoms();
        let expected = [
            self.info.num_observables(),
            self.latsize[0],
            self.latsize[1],
            self.latsize[2],
            natoms,
            self.schedule.num_snapshots,
        ];
        if samples.shape() != expected {
            return Err(SqwError::Config(
                ErrorInfo::new("trajectory-shape-mismatch", "trajectory does not match the accumulator")
                    .with_context("expected", format!("{expected:?}"))
                    .with_context("actual", format!("{:?}", samples.shape())),
            ));
        }
        if samples.iter().any(|v| !v.is_finite()) {
            return Err(SqwError::Dynamics(ErrorInfo::new(
                "non-finite-trajectory",
                "trajectory contains non-finite samples",
            )));
        }

        let spectra = self.transform(samples);
        self.nsamples += 1;
        let count = self.nsamples as f64;
        for (slot, &(alpha, beta)) in self.info.pairs().iter().enumerate() {
            for i in 0..natoms {
                for j in 0..natoms {
                    let a = spectra.index_axis(Axis(0), alpha).index_axis_move(Axis(3), i);
                    let b = spectra.index_axis(Axis(0), beta).index_axis_move(Axis(3), j);
                    let block = self
                        .data
                        .view_mut()
                        .index_axis_move(Axis(0), slot)
                        .index_axis_move(Axis(0), i)
                        .index_axis_move(Axis(0), j);
                    Zip::from(block)
                        .and(a.into_dyn())
                        .and(b.into_dyn())
                        .for_each(|d, x, y| *d += (x * y.conj() - *d) / count);
                }
            }
        }
        tracing::trace!(nsamples = self.nsamples, "trajectory accumulated");
        Ok(())
    }

    /// Space-time Fourier transform normalised so that summing `|A|²` over
    /// frequencies gives the time-averaged equal-time correlation.
    fn transform(&self, samples: ArrayView6<f64>) -> Array6<Complex64> {
        let mut spectra = samples.mapv(|v| Complex64::new(v, 0.0));
        let snapshots = self.schedule.num_snapshots;
        if self.subtract_mean {
            for mut lane in spectra.lanes_mut(Axis(5)) {
                let mean = lane.sum() / snapshots as f64;
                lane.mapv_inplace(|z| z - mean);
            }
        }
        let mut planner = FftPlanner::<f64>::new();
        for axis in [1, 2, 3, 5] {
            fft_along(&mut spectra, Axis(axis), &mut planner);
        }
        let ncells = (self.latsize[0] * self.latsize[1] * self.latsize[2]) as f64;
        let norm = 1.0 / (snapshots as f64 * ncells.sqrt());
        spectra.mapv_inplace(|z| z * norm);
        spectra
    }

    /// Sample-count weighted merge of an independently accumulated tensor.
    pub fn merge(&mut self, other: &SampledCorrelations) -> Result<(), SqwError> {
        if self.crystal != other.crystal
            || self.latsize != other.latsize
            || self.info != other.info
            || self.schedule != other.schedule
            || self.subtract_mean != other.subtract_mean
        {
            return Err(SqwError::Config(ErrorInfo::new(
                "incompatible-correlations",
                "only accumulators with identical parameters can be merged",
            )));
        }
        if other.nsamples == 0 {
            return Ok(());
        }
        let total = self.nsamples + other.nsamples;
        let weight = other.nsamples as f64 / total as f64;
        Zip::from(&mut self.data)
            .and(&other.data)
            .for_each(|d, o| *d += (o - *d) * weight);
        self.nsamples = total;
        Ok(())
    }
}

fn tensor_shape(
    crystal: &Crystal,
    latsize: [usize; 3],
    info: &ObservableInfo,
    schedule: &FrequencySchedule,
) -> [usize; 7] {
    let natoms = crystal.natoms();
    [
        info.num_correlations(),
        natoms,
        natoms,
        latsize[0],
        latsize[1],
        latsize[2],
        schedule.num_snapshots,
    ]
}

fn fft_along(array: &mut Array6<Complex64>, axis: Axis, planner: &mut FftPlanner<f64>) {
    let n = array.len_of(axis);
    if n <= 1 {
        return;
    }
    let fft = planner.plan_fft_forward(n);
    let mut buffer = vec![Complex64::new(0.0, 0.0); n];
    for mut lane in array.lanes_mut(axis) {
        for (dst, src) in buffer.iter_mut().zip(lane.iter()) {
            *dst = *src;
        }
        fft.process(&mut buffer);
        for (dst, src) in lane.iter_mut().zip(buffer.iter()) {
            *dst = *src;
        }
    }
}
