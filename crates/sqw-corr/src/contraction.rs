//! Reduction of the correlation matrix at one `(q, ω)` to a reported value.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::Vec3;

use crate::observables::ObservableInfo;

fn config_error(code: &str, message: impl Into<String>) -> SqwError {
    SqwError::Config(ErrorInfo::new(code, message))
}

/// Values that can be interpolated, summed over bins and rescaled.
pub trait IntensityValue: Clone + fmt::Debug {
    /// `self += weight * other`.
    fn add_scaled(&mut self, other: &Self, weight: f64);

    /// `self *= factor`.
    fn scale(&mut self, factor: f64);
}

impl IntensityValue for f64 {
    fn add_scaled(&mut self, other: &Self, weight: f64) {
        *self += weight * other;
    }

    fn scale(&mut self, factor: f64) {
        *self *= factor;
    }
}

impl IntensityValue for Complex64 {
    fn add_scaled(&mut self, other: &Self, weight: f64) {
        *self += other * weight;
    }

    fn scale(&mut self, factor: f64) {
        *self *= factor;
    }
}

/// Full correlation matrix `S^{αβ}` between observables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMatrix {
    dim: usize,
    entries: Vec<Complex64>,
}

impl ComponentMatrix {
    fn zeros(dim: usize) -> Self {
        Self {
            dim,
            entries: vec![Complex64::new(0.0, 0.0); dim * dim],
        }
    }

    /// Number of observables.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element `S^{αβ}`.
    pub fn get(&self, alpha: usize, beta: usize) -> Complex64 {
        self.entries[alpha * self.dim + beta]
    }

    /// Sum of diagonal elements.
    pub fn trace(&self) -> Complex64 {
        (0..self.dim).map(|a| self.get(a, a)).sum()
    }
}

impl IntensityValue for ComponentMatrix {
    fn add_scaled(&mut self, other: &Self, weight: f64) {
        for (dst, src) in self.entries.iter_mut().zip(&other.entries) {
            *dst += src * weight;
        }
    }

    fn scale(&mut self, factor: f64) {
        for entry in &mut self.entries {
            *entry *= factor;
        }
    }
}

/// Reduces the stored elements at one `(q, ω)` to a reported value.
///
/// `elements` is indexed by storage slot; `q_abs` is the wavevector in
/// absolute (Cartesian) units.
pub trait Contraction {
    /// Reported value type.
    type Output: IntensityValue;

    /// Additive identity of [`Contraction::Output`].
    fn zero(&self) -> Self::Output;

    /// Contracts one set of basis-reduced elements.
    fn contract(&self, elements: &[Complex64], q_abs: &Vec3) -> Self::Output;
}

type Lookup = (usize, bool);

fn fetch(elements: &[Complex64], (slot, conjugate): Lookup) -> Complex64 {
    if conjugate {
        elements[slot].conj()
    } else {
        elements[slot]
    }
}

fn require_slot(info: &ObservableInfo, a: usize, b: usize) -> Result<Lookup, SqwError> {
    info.slot(a, b).ok_or_else(|| {
        SqwError::Config(
            ErrorInfo::new("missing-correlation", "contraction needs an element that was not retained")
                .with_context("element", format!("({a},{b})")),
        )
    })
}

/// Sum of the diagonal elements `Σ_α S^{αα}`.
#[derive(Debug, Clone)]
pub struct Trace {
    slots: Vec<usize>,
}

impl Trace {
    /// Requires every diagonal element to be retained.
    pub fn new(info: &ObservableInfo) -> Result<Self, SqwError> {
        let slots = (0..info.num_observables())
            .map(|a| require_slot(info, a, a).map(|(slot, _)| slot))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { slots })
    }
}

impl Contraction for Trace {
    type Output = f64;

    fn zero(&self) -> f64 {
        0.0
    }

    fn contract(&self, elements: &[Complex64], _q_abs: &Vec3) -> f64 {
        self.slots.iter().map(|&slot| elements[slot].re).sum()
    }
}

/// Dipole correlations projected perpendicular to `q`:
/// `Σ_αβ (δ_αβ - q̂_α q̂_β) S^{αβ}`.
///
/// At `q = 0` the projector is the identity.
#[derive(Debug, Clone)]
pub struct Perp {
    lookup: [[Lookup; 3]; 3],
}

impl Perp {
    /// Requires the three dipole components and all their pairs.
    pub fn new(info: &ObservableInfo) -> Result<Self, SqwError> {
        let mut axes = [0usize; 3];
        for (axis, index) in axes.iter_mut().enumerate() {
            *index = info.dipole_index(axis).ok_or_else(|| {
                SqwError::Config(
                    ErrorInfo::new("perp-requires-dipoles", "perpendicular projection needs all dipole components")
                        .with_context("missing_axis", axis),
                )
            })?;
        }
        let mut lookup = [[(0, false); 3]; 3];
        for a in 0..3 {
            for b in 0..3 {
                lookup[a][b] = require_slot(info, axes[a], axes[b])?;
            }
        }
        Ok(Self { lookup })
    }
}

impl Contraction for Perp {
    type Output = f64;

    fn zero(&self) -> f64 {
        0.0
    }

    fn contract(&self, elements: &[Complex64], q_abs: &Vec3) -> f64 {
        let norm = q_abs.norm();
        let qhat = if norm > 1e-12 { q_abs / norm } else { Vec3::zeros() };
        let mut acc = 0.0;
        for a in 0..3 {
            for b in 0..3 {
                let delta = if a == b { 1.0 } else { 0.0 };
                acc += (delta - qhat[a] * qhat[b]) * fetch(elements, self.lookup[a][b]).re;
            }
        }
        acc
    }
}

/// Single complex element `S^{αβ}`.
#[derive(Debug, Clone)]
pub struct Element {
    lookup: Lookup,
}

impl Element {
    /// Element `(alpha, beta)`, reconstructed by conjugation when needed.
    pub fn new(info: &ObservableInfo, alpha: usize, beta: usize) -> Result<Self, SqwError> {
        let n = info.num_observables();
        if alpha >= n || beta >= n {
            return Err(SqwError::Config(
                ErrorInfo::new("observable-index-out-of-range", "element references a missing observable")
                    .with_context("element", format!("({alpha},{beta})"))
                    .with_context("observables", n),
            ));
        }
        Ok(Self {
            lookup: require_slot(info, alpha, beta)?,
        })
    }
}

impl Contraction for Element {
    type Output = Complex64;

    fn zero(&self) -> Complex64 {
        Complex64::new(0.0, 0.0)
    }

    fn contract(&self, elements: &[Complex64], _q_abs: &Vec3) -> Complex64 {
        fetch(elements, self.lookup)
    }
}

/// Whole correlation matrix.
#[derive(Debug, Clone)]
pub struct Full {
    dim: usize,
    lookup: Vec<Lookup>,
}

impl Full {
    /// Requires every pair to be retained.
    pub fn new(info: &ObservableInfo) -> Result<Self, SqwError> {
        let dim = info.num_observables();
        let lookup = (0..dim)
            .flat_map(|a| (0..dim).map(move |b| (a, b)))
            .map(|(a, b)| require_slot(info, a, b))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dim, lookup })
    }
}

impl Contraction for Full {
    type Output = ComponentMatrix;

    fn zero(&self) -> ComponentMatrix {
        ComponentMatrix::zeros(self.dim)
    }

    fn contract(&self, elements: &[Complex64], _q_abs: &Vec3) -> ComponentMatrix {
        ComponentMatrix {
            dim: self.dim,
            entries: self.lookup.iter().map(|&l| fetch(elements, l)).collect(),
        }
    }
}

/// Contraction selected by name, e.g. from a configuration file.
///
/// Accepted forms are `trace`, `perp`, `full` and `α,β` (optionally
/// parenthesised) for a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContractionMode {
    /// [`Trace`].
    Trace,
    /// [`Perp`].
    Perp,
    /// [`Element`].
    Element(usize, usize),
    /// [`Full`].
    Full,
}

impl FromStr for ContractionMode {
    type Err = SqwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => return Ok(ContractionMode::Trace),
            "perp" => return Ok(ContractionMode::Perp),
            "full" => return Ok(ContractionMode::Full),
            _ => {}
        }
        let inner = trimmed.trim_start_matches('(').trim_end_matches(')');
        let mut parts = inner.split(',').map(|p| p.trim().parse::<usize>());
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(a)), Some(Ok(b)), None) => Ok(ContractionMode::Element(a, b)),
            _ => Err(SqwError::Config(
                ErrorInfo::new("unknown-mode", "unrecognised contraction mode")
                    .with_context("mode", s)
                    .with_hint("use trace, perp, full or an element such as 0,2"),
            )),
        }
    }
}

impl TryFrom<String> for ContractionMode {
    type Error = SqwError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContractionMode> for String {
    fn from(mode: ContractionMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for ContractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractionMode::Trace => write!(f, "trace"),
            ContractionMode::Perp => write!(f, "perp"),
            ContractionMode::Full => write!(f, "full"),
            ContractionMode::Element(a, b) => write!(f, "{a},{b}"),
        }
    }
}

impl ContractionMode {
    /// Checks that the mode can be evaluated against `info`.
    pub fn check(self, info: &ObservableInfo) -> Result<(), SqwError> {
        match self {
            ContractionMode::Trace => Trace::new(info).map(|_| ()),
            ContractionMode::Perp => {
                if !info.is_dipole_only() {
                    return Err(config_error(
                        "perp-requires-dipoles",
                        "perpendicular projection is defined for dipole observables only",
                    ));
                }
                Perp::new(info).map(|_| ())
            }
            ContractionMode::Element(a, b) => Element::new(info, a, b).map(|_| ()),
            ContractionMode::Full => Full::new(info).map(|_| ()),
        }
    }
}
