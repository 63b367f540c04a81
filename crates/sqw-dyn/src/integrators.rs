use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::{Integrator, RngHandle, Sampler, Vec3};

use crate::lattice::SpinLattice;

fn dynamics_error(code: &str, message: impl Into<String>) -> SqwError {
    SqwError::Dynamics(ErrorInfo::new(code, message))
}

fn validate_dt(dt: f64) -> Result<(), SqwError> {
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(SqwError::Dynamics(
            ErrorInfo::new("invalid-step", "integration step must be positive and finite")
                .with_context("dt", dt),
        ));
    }
    Ok(())
}

/// Energy-conserving implicit midpoint integrator for `dS/dt = −S × ∂E/∂S`.
///
/// The midpoint rule preserves every spin length exactly; the implicit
/// equation is solved by fixed-point iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitMidpoint {
    dt: f64,
    atol: f64,
    max_iters: usize,
}

impl ImplicitMidpoint {
    /// Creates an integrator with step `dt`.
    pub fn new(dt: f64) -> Result<Self, SqwError> {
        validate_dt(dt)?;
        Ok(Self {
            dt,
            atol: 1e-12,
            max_iters: 100,
        })
    }

    /// Overrides the fixed-point convergence tolerance.
    pub fn with_tolerance(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }
}

impl Integrator<SpinLattice> for ImplicitMidpoint {
    fn dt(&self) -> f64 {
        self.dt
    }

    fn step(&mut self, system: &mut SpinLattice) -> Result<(), SqwError> {
        let start = system.dipoles().to_vec();
        let mut next = start.clone();
        let mut mid = vec![Vec3::zeros(); start.len()];
        let mut grad = vec![Vec3::zeros(); start.len()];
        for _ in 0..self.max_iters {
            for ((m, s), n) in mid.iter_mut().zip(&start).zip(&next) {
                *m = (s + n) * 0.5;
            }
            system.energy_gradient(&mid, &mut grad);
            let mut residual: f64 = 0.0;
            for idx in 0..start.len() {
                let updated = start[idx] - mid[idx].cross(&grad[idx]) * self.dt;
                residual = residual.max((updated - next[idx]).norm());
                next[idx] = updated;
            }
            if residual <= self.atol {
                system.dipoles_mut().copy_from_slice(&next);
                return Ok(());
            }
        }
        Err(SqwError::Dynamics(
            ErrorInfo::new("midpoint-divergence", "implicit midpoint iteration did not converge")
                .with_context("dt", self.dt)
                .with_hint("reduce the integration step"),
        ))
    }
}

fn default_steps_per_sample() -> usize {
    1000
}

/// Parameters of the stochastic Landau-Lifshitz sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LangevinOpts {
    /// Integration step.
    pub dt: f64,
    /// Phenomenological damping λ.
    pub damping: f64,
    /// Bath temperature k_B T in energy units.
    pub kt: f64,
    /// Steps taken between consecutive samples.
    #[serde(default = "default_steps_per_sample")]
    pub steps_per_sample: usize,
}

/// Heun integrator for damped, noisy Landau-Lifshitz dynamics.
///
/// Each call to [`Sampler::sample`] advances `steps_per_sample` steps, which
/// is expected to exceed the decorrelation time at the bath temperature.
#[derive(Debug, Clone)]
pub struct Langevin {
    opts: LangevinOpts,
    rng: RngHandle,
}

impl Langevin {
    /// Creates a sampler whose noise is drawn from `seed`.
    pub fn new(opts: LangevinOpts, seed: u64) -> Result<Self, SqwError> {
        validate_dt(opts.dt)?;
        if opts.damping < 0.0 || opts.kt < 0.0 {
            return Err(dynamics_error(
                "invalid-bath",
                "damping and temperature must be non-negative",
            ));
        }
        Ok(Self {
            opts,
            rng: RngHandle::from_seed(seed),
        })
    }

    /// Options the sampler was built with.
    pub fn opts(&self) -> &LangevinOpts {
        &self.opts
    }

    /// Advances the system by a single stochastic step.
    pub fn step(&mut self, system: &mut SpinLattice) {
        let dt = self.opts.dt;
        let lambda = self.opts.damping;
        let kappa = system.spin_magnitude();
        let amplitude = (2.0 * lambda * self.opts.kt).sqrt();
        let n = system.dipoles().len();

        let s0 = system.dipoles().to_vec();
        let xi: Vec<Vec3> = (0..n)
            .map(|_| {
                Vec3::new(
                    self.rng.sample(StandardNormal),
                    self.rng.sample(StandardNormal),
                    self.rng.sample(StandardNormal),
                ) * amplitude
            })
            .collect();

        let drift = |s: &Vec3, g: &Vec3| -> Vec3 {
            let s_hat = s / s.norm();
            -s.cross(&(g - s_hat.cross(g) * lambda))
        };
        let noise = |s: &Vec3, x: &Vec3| -> Vec3 { -s.cross(x) };

        let mut g0 = vec![Vec3::zeros(); n];
        system.energy_gradient(&s0, &mut g0);
        let s1: Vec<Vec3> = (0..n)
            .map(|i| s0[i] + drift(&s0[i], &g0[i]) * dt + noise(&s0[i], &xi[i]) * dt.sqrt())
            .collect();
        let mut g1 = vec![Vec3::zeros(); n];
        system.energy_gradient(&s1, &mut g1);

        let sqrt_dt = dt.sqrt();
        for (i, spin) in system.dipoles_mut().iter_mut().enumerate() {
            let deterministic = (drift(&s0[i], &g0[i]) + drift(&s1[i], &g1[i])) * (0.5 * dt);
            let stochastic = (noise(&s0[i], &xi[i]) + noise(&s1[i], &xi[i])) * (0.5 * sqrt_dt);
            let updated = s0[i] + deterministic + stochastic;
            *spin = updated * (kappa / updated.norm());
        }
    }
}

impl Sampler<SpinLattice> for Langevin {
    fn sample(&mut self, system: &mut SpinLattice) -> Result<(), SqwError> {
        for _ in 0..self.opts.steps_per_sample {
            self.step(system);
        }
        if system.dipoles().iter().any(|s| !s.iter().all(|c| c.is_finite())) {
            return Err(dynamics_error(
                "non-finite-state",
                "Langevin sampling produced non-finite spins",
            ));
        }
        tracing::trace!(steps = self.opts.steps_per_sample, "langevin sample drawn");
        Ok(())
    }
}
