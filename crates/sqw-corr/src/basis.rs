//! Sublattice-pair phase averaging at discrete lattice wavevectors.

use num_complex::Complex64;
use sqw_core::Vec3;

use crate::correlations::SampledCorrelations;
use crate::form_factor::FormFactorTable;

/// Basis-reduced elements at one lattice point.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedElements {
    /// Wavevector of the lattice point in absolute units.
    pub q_abs: Vec3,
    /// Elements indexed `[bin][slot]`.
    pub values: Vec<Vec<Complex64>>,
}

/// Absolute wavevector for reciprocal-lattice coordinates `q`.
pub fn absolute(sc: &SampledCorrelations, q: &Vec3) -> Vec3 {
    sc.crystal().recipvecs() * q
}

/// Sums `ff_i ff_j exp(i q·(r_j - r_i)) data[slot, i, j, m mod L, ω]` over
/// sublattice pairs for the first `nbins` frequency bins.
///
/// `m` is the unwrapped lattice index, `q = m / L` in reciprocal lattice units.
pub fn phase_averaged_elements(
    sc: &SampledCorrelations,
    m: [i64; 3],
    form_factors: &FormFactorTable,
    nbins: usize,
) -> ReducedElements {
    let latsize = sc.latsize();
    let q = Vec3::new(
        m[0] as f64 / latsize[0] as f64,
        m[1] as f64 / latsize[1] as f64,
        m[2] as f64 / latsize[2] as f64,
    );
    let q_abs = absolute(sc, &q);
    let cell = [
        m[0].rem_euclid(latsize[0] as i64) as usize,
        m[1].rem_euclid(latsize[1] as i64) as usize,
        m[2].rem_euclid(latsize[2] as i64) as usize,
    ];

    let crystal = sc.crystal();
    let natoms = crystal.natoms();
    let nslots = sc.info().num_correlations();
    let magnitude = q_abs.norm();
    let ffs: Vec<f64> = (0..natoms)
        .map(|atom| form_factors.factor(atom, magnitude))
        .collect();
    let positions: Vec<Vec3> = (0..natoms)
        .map(|atom| crystal.cartesian_position(atom))
        .collect();

    let mut values = vec![vec![Complex64::new(0.0, 0.0); nslots]; nbins];
    for i in 0..natoms {
        for j in 0..natoms {
            let phase =
                Complex64::from_polar(ffs[i] * ffs[j], q_abs.dot(&(positions[j] - positions[i])));
            for (w, row) in values.iter_mut().enumerate() {
                for (slot, value) in row.iter_mut().enumerate() {
                    *value += phase * sc.element(slot, i, j, cell, w);
                }
            }
        }
    }
    ReducedElements { q_abs, values }
}
