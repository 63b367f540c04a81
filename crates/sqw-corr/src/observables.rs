//! Observables recorded at every site and the correlation pairs built from them.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use sqw_core::errors::{ErrorInfo, SqwError};

fn config_error(code: &str, message: impl Into<String>) -> SqwError {
    SqwError::Config(ErrorInfo::new(code, message))
}

/// Hermitian operator acting on an SU(N) coherent state, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorMatrix {
    dim: usize,
    entries: Vec<Complex64>,
}

impl OperatorMatrix {
    /// Builds an operator from row-major entries, checking hermiticity.
    pub fn new(dim: usize, entries: Vec<Complex64>) -> Result<Self, SqwError> {
        if dim == 0 || entries.len() != dim * dim {
            return Err(SqwError::Config(
                ErrorInfo::new("operator-shape", "operator entries must form a square matrix")
                    .with_context("dim", dim)
                    .with_context("entries", entries.len()),
            ));
        }
        for row in 0..dim {
            for col in row..dim {
                let diff = entries[row * dim + col] - entries[col * dim + row].conj();
                if diff.norm() > 1e-10 {
                    return Err(SqwError::Config(
                        ErrorInfo::new("non-hermitian-observable", "observables must be Hermitian")
                            .with_context("row", row)
                            .with_context("col", col),
                    ));
                }
            }
        }
        Ok(Self { dim, entries })
    }

    /// Hilbert-space dimension N.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Real expectation value `⟨Z|A|Z⟩`.
    pub fn expectation(&self, z: &[Complex64]) -> f64 {
        let mut acc = Complex64::new(0.0, 0.0);
        for row in 0..self.dim {
            let mut az = Complex64::new(0.0, 0.0);
            for col in 0..self.dim {
                az += self.entries[row * self.dim + col] * z[col];
            }
            acc += z[row].conj() * az;
        }
        acc.re
    }
}

/// Quantity recorded at every site along a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Observable {
    /// Cartesian dipole component (0 = x, 1 = y, 2 = z).
    Dipole(usize),
    /// Expectation value of an operator in the site's coherent state.
    Operator(OperatorMatrix),
}

/// Observables together with the retained correlation pairs.
///
/// Only unordered pairs `α ≤ β` are stored; the remaining elements follow
/// from `S^{βα} = conj(S^{αβ})`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableInfo {
    observables: Vec<Observable>,
    pairs: Vec<(usize, usize)>,
    dipole_only: bool,
}

impl ObservableInfo {
    /// Resolves the observable list and the requested correlation subset.
    ///
    /// `None` observables select the three dipole components; `None`
    /// correlations select every unordered pair.
    pub fn new(
        observables: Option<Vec<Observable>>,
        correlations: Option<Vec<(usize, usize)>>,
    ) -> Result<Self, SqwError> {
        let observables =
            observables.unwrap_or_else(|| (0..3).map(Observable::Dipole).collect());
        if observables.is_empty() {
            return Err(config_error(
                "no-observables",
                "at least one observable is required",
            ));
        }
        for obs in &observables {
            if let Observable::Dipole(axis) = obs {
                if *axis > 2 {
                    return Err(SqwError::Config(
                        ErrorInfo::new("invalid-dipole-axis", "dipole axis must be 0, 1 or 2")
                            .with_context("axis", axis),
                    ));
                }
            }
        }
        let n = observables.len();
        let mut pairs = match correlations {
            None => (0..n)
                .flat_map(|a| (a..n).map(move |b| (a, b)))
                .collect::<Vec<_>>(),
            Some(requested) => {
                let mut pairs = Vec::with_capacity(requested.len());
                for (a, b) in requested {
                    if a >= n || b >= n {
                        return Err(SqwError::Config(
                            ErrorInfo::new(
                                "observable-index-out-of-range",
                                "matrix element references a missing observable",
                            )
                            .with_context("element", format!("({a},{b})"))
                            .with_context("observables", n),
                        ));
                    }
                    pairs.push((a.min(b), a.max(b)));
                }
                pairs
            }
        };
        pairs.sort_unstable();
        pairs.dedup();
        if pairs.is_empty() {
            return Err(config_error(
                "no-correlations",
                "at least one matrix element must be retained",
            ));
        }
        let dipole_only = observables
            .iter()
            .all(|obs| matches!(obs, Observable::Dipole(_)));
        Ok(Self {
            observables,
            pairs,
            dipole_only,
        })
    }

    /// Recorded observables.
    pub fn observables(&self) -> &[Observable] {
        &self.observables
    }

    /// Number of observables.
    pub fn num_observables(&self) -> usize {
        self.observables.len()
    }

    /// Retained `(α, β)` pairs in storage order.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Number of storage slots.
    pub fn num_correlations(&self) -> usize {
        self.pairs.len()
    }

    /// Whether every observable is a dipole component.
    pub fn is_dipole_only(&self) -> bool {
        self.dipole_only
    }

    /// Storage slot of element `(a, b)` and whether it must be conjugated.
    pub fn slot(&self, a: usize, b: usize) -> Option<(usize, bool)> {
        let key = (a.min(b), a.max(b));
        self.pairs
            .binary_search(&key)
            .ok()
            .map(|slot| (slot, a > b))
    }

    /// Index of the observable recording dipole component `axis`.
    pub fn dipole_index(&self, axis: usize) -> Option<usize> {
        self.observables
            .iter()
            .position(|obs| *obs == Observable::Dipole(axis))
    }
}
