//! Intensity queries against accumulated correlations.
//!
//! Every query shares the same pipeline: optional basis change, stencil
//! deduplication, basis reduction per lattice point, interpolation of the
//! reduced elements, contraction at the query wavevector and finally the
//! optional quantum rescaling.

use std::f64::consts::PI;

use ndarray::{Array2, ArrayD, IxDyn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use sqw_core::errors::{ErrorInfo, SqwError};
use sqw_core::{Crystal, Mat3, Vec3};

use crate::basis::{phase_averaged_elements, ReducedElements};
use crate::contraction::{
    ComponentMatrix, Contraction, ContractionMode, Element, Full, IntensityValue, Perp, Trace,
};
use crate::correlations::SampledCorrelations;
use crate::form_factor::{FormFactorEntry, FormFactorTable};
use crate::interp::{Interpolation, Stencil};
use crate::rescale::QuantumCorrection;
use crate::stencil::compute_runs;

fn query_error(code: &str, message: impl Into<String>) -> SqwError {
    SqwError::Query(ErrorInfo::new(code, message))
}

/// Options shared by every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOpts {
    /// How off-lattice wavevectors are handled.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Temperature `kT` for quantum rescaling; `None` keeps classical values.
    #[serde(default)]
    pub kt: Option<f64>,
    /// Rescaling formula used when `kt` is set.
    #[serde(default)]
    pub correction: QuantumCorrection,
    /// Form factors for representative sublattices.
    #[serde(default)]
    pub form_factors: Vec<FormFactorEntry>,
    /// Return every FFT bin, including negative frequencies.
    #[serde(default)]
    pub negative_energies: bool,
    /// Maps query coordinates to reciprocal lattice units, `q_rlu = basis q`.
    #[serde(default)]
    pub basis: Option<Mat3>,
}

impl Default for QueryOpts {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::None,
            kt: None,
            correction: QuantumCorrection::Harmonic,
            form_factors: Vec::new(),
            negative_energies: false,
            basis: None,
        }
    }
}

/// Dynamical intensities, `data[[q, ω]]`.
#[derive(Debug, Clone, Serialize)]
pub struct Intensities<T> {
    /// Query wavevectors as supplied.
    pub qs: Vec<Vec3>,
    /// Frequency axis.
    pub omegas: Vec<f64>,
    /// Intensities.
    pub data: Array2<T>,
}

/// Energy-integrated intensities, one per wavevector.
#[derive(Debug, Clone, Serialize)]
pub struct StaticIntensities<T> {
    /// Query wavevectors as supplied.
    pub qs: Vec<Vec3>,
    /// Intensities.
    pub data: Vec<T>,
}

/// Intensities on every lattice-commensurate wavevector, `data[[x, y, z, ω]]`.
#[derive(Debug, Clone, Serialize)]
pub struct GridIntensities<T> {
    /// Grid points along each axis.
    pub dims: [usize; 3],
    /// Wavevectors in reciprocal lattice units, z fastest.
    pub qs: Vec<Vec3>,
    /// Frequency axis.
    pub omegas: Vec<f64>,
    /// Intensities.
    pub data: ArrayD<T>,
}

/// Intensities along a piecewise-linear path.
#[derive(Debug, Clone, Serialize)]
pub struct PathIntensities<T> {
    /// Intensities at the sampled path points.
    pub intensities: Intensities<T>,
    /// Index of each waypoint in the sampled path.
    pub markers: Vec<usize>,
}

/// Plane through reciprocal space sampled on a regular grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceSpec {
    /// Centre of the slice.
    pub center: Vec3,
    /// In-plane directions.
    pub axes: [Vec3; 2],
    /// Half-width of the slice along each direction.
    pub extents: [f64; 2],
    /// Number of points along each direction.
    pub points: [usize; 2],
}

/// Energy-integrated intensities on a slice, `data[[u, v]]`.
#[derive(Debug, Clone, Serialize)]
pub struct SliceIntensities<T> {
    /// Wavevectors, `v` fastest.
    pub qs: Vec<Vec3>,
    /// Intensities.
    pub data: Array2<T>,
}

/// Spherically averaged intensities, `data[[radius, ω]]`.
#[derive(Debug, Clone, Serialize)]
pub struct PowderIntensities<T> {
    /// Shell radii in absolute units.
    pub radii: Vec<f64>,
    /// Frequency axis.
    pub omegas: Vec<f64>,
    /// Intensities.
    pub data: Array2<T>,
}

/// Result of a query whose contraction was chosen by [`ContractionMode`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "kebab-case")]
pub enum ModeIntensities {
    /// `trace` or `perp`.
    Real(Intensities<f64>),
    /// A single element.
    Complex(Intensities<Complex64>),
    /// `full`.
    Tensor(Intensities<ComponentMatrix>),
}

struct Plan<'a> {
    sc: &'a SampledCorrelations,
    interpolation: Interpolation,
    form_factors: FormFactorTable,
    nbins: usize,
    omegas: Vec<f64>,
    rescale: Option<Vec<f64>>,
}

impl<'a> Plan<'a> {
    fn new(sc: &'a SampledCorrelations, opts: &QueryOpts) -> Result<Self, SqwError> {
        if sc.nsamples() == 0 {
            return Err(query_error(
                "no-samples",
                "at least one sample must be accumulated before querying",
            ));
        }
        let form_factors = FormFactorTable::propagate(sc.crystal(), &opts.form_factors)?;
        let omegas = sc.frequencies(opts.negative_energies);
        let rescale = match opts.kt {
            Some(kt) => {
                opts.correction.validate(kt)?;
                Some(omegas.iter().map(|&w| opts.correction.factor(w, kt)).collect())
            }
            None => None,
        };
        Ok(Self {
            sc,
            interpolation: opts.interpolation,
            form_factors,
            nbins: omegas.len(),
            omegas,
            rescale,
        })
    }

    /// Row-major `[q][bin]` values for wavevectors in reciprocal lattice units.
    ///
    /// Each stencil point is contracted at its own lattice wavevector, and
    /// the contracted intensities are then mixed with the interpolation
    /// weights of the query point.
    fn evaluate<C: Contraction>(&self, qs: &[Vec3], contraction: &C) -> Result<Vec<C::Output>, SqwError> {
        let latsize = self.sc.latsize();
        let regions = compute_runs(
            qs,
            |q| self.interpolation.stencil(q, latsize),
            |stencil: &Stencil| {
                let contracted: Vec<Vec<C::Output>> = stencil
                    .points()
                    .iter()
                    .map(|&m| {
                        let point: ReducedElements =
                            phase_averaged_elements(self.sc, m, &self.form_factors, self.nbins);
                        point
                            .values
                            .iter()
                            .map(|elements| contraction.contract(elements, &point.q_abs))
                            .collect()
                    })
                    .collect();
                Ok::<_, SqwError>((stencil.clone(), contracted))
            },
        )?;
        tracing::debug!(queries = qs.len(), regions = regions.len(), "evaluated query batch");

        let mut out = Vec::with_capacity(qs.len() * self.nbins);
        for (range, (stencil, contracted)) in &regions {
            for q in &qs[range.clone()] {
                let weights = self.interpolation.weights(q, stencil, latsize);
                for w in 0..self.nbins {
                    let mut value = contraction.zero();
                    for (point, &weight) in contracted.iter().zip(&weights) {
                        value.add_scaled(&point[w], weight);
                    }
                    if let Some(factors) = &self.rescale {
                        value.scale(factors[w]);
                    }
                    out.push(value);
                }
            }
        }
        Ok(out)
    }
}

fn to_lattice_units(qs: &[Vec3], basis: Option<&Mat3>) -> Result<Vec<Vec3>, SqwError> {
    if let Some(idx) = qs.iter().position(|q| q.iter().any(|c| !c.is_finite())) {
        return Err(SqwError::Query(
            ErrorInfo::new("malformed-wavevector", "wavevectors must be finite")
                .with_context("index", idx),
        ));
    }
    Ok(match basis {
        Some(basis) => qs.iter().map(|q| basis * q).collect(),
        None => qs.to_vec(),
    })
}

fn sum_bins<T: IntensityValue>(zero: &T, row: &[T]) -> T {
    let mut acc = zero.clone();
    for value in row {
        acc.add_scaled(value, 1.0);
    }
    acc
}

/// Dynamical intensities at arbitrary wavevectors.
pub fn intensities<C: Contraction>(
    sc: &SampledCorrelations,
    qs: &[Vec3],
    contraction: &C,
    opts: &QueryOpts,
) -> Result<Intensities<C::Output>, SqwError> {
    let plan = Plan::new(sc, opts)?;
    let rlu = to_lattice_units(qs, opts.basis.as_ref())?;
    let values = plan.evaluate(&rlu, contraction)?;
    let data = Array2::from_shape_vec((qs.len(), plan.nbins), values)
        .map_err(|err| query_error("shape", err.to_string()))?;
    Ok(Intensities {
        qs: qs.to_vec(),
        omegas: plan.omegas,
        data,
    })
}

/// Same as [`intensities`] with the contraction chosen once from `mode`.
pub fn intensities_for_mode(
    sc: &SampledCorrelations,
    qs: &[Vec3],
    mode: ContractionMode,
    opts: &QueryOpts,
) -> Result<ModeIntensities, SqwError> {
    let info = sc.info();
    Ok(match mode {
        ContractionMode::Trace => ModeIntensities::Real(intensities(sc, qs, &Trace::new(info)?, opts)?),
        ContractionMode::Perp => {
            mode.check(info)?;
            ModeIntensities::Real(intensities(sc, qs, &Perp::new(info)?, opts)?)
        }
        ContractionMode::Element(a, b) => {
            ModeIntensities::Complex(intensities(sc, qs, &Element::new(info, a, b)?, opts)?)
        }
        ContractionMode::Full => ModeIntensities::Tensor(intensities(sc, qs, &Full::new(info)?, opts)?),
    })
}

/// Energy-integrated intensities: the sum over every frequency bin, negative
/// ones included, after rescaling.
pub fn static_intensities<C: Contraction>(
    sc: &SampledCorrelations,
    qs: &[Vec3],
    contraction: &C,
    opts: &QueryOpts,
) -> Result<StaticIntensities<C::Output>, SqwError> {
    let all_bins = QueryOpts {
        negative_energies: true,
        ..opts.clone()
    };
    let plan = Plan::new(sc, &all_bins)?;
    let rlu = to_lattice_units(qs, opts.basis.as_ref())?;
    let values = plan.evaluate(&rlu, contraction)?;
    let zero = contraction.zero();
    let data = if plan.nbins == 0 {
        Vec::new()
    } else {
        values.chunks(plan.nbins).map(|row| sum_bins(&zero, row)).collect()
    };
    Ok(StaticIntensities {
        qs: qs.to_vec(),
        data,
    })
}

/// Every wavevector commensurate with the lattice inside `bz_counts` zones.
///
/// Ordered with the z index fastest, starting at the origin.
pub fn exact_wave_vectors(latsize: [usize; 3], bz_counts: [usize; 3]) -> Result<Vec<Vec3>, SqwError> {
    if bz_counts.iter().any(|&n| n == 0) {
        return Err(SqwError::Query(
            ErrorInfo::new("too-few-points", "each Brillouin zone count must be at least one")
                .with_context("bz_counts", format!("{bz_counts:?}")),
        ));
    }
    let dims = [
        latsize[0] * bz_counts[0],
        latsize[1] * bz_counts[1],
        latsize[2] * bz_counts[2],
    ];
    let mut qs = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
    for x in 0..dims[0] {
        for y in 0..dims[1] {
            for z in 0..dims[2] {
                qs.push(Vec3::new(
                    x as f64 / latsize[0] as f64,
                    y as f64 / latsize[1] as f64,
                    z as f64 / latsize[2] as f64,
                ));
            }
        }
    }
    Ok(qs)
}

/// Intensities on the full discrete grid of `bz_counts` Brillouin zones.
///
/// The grid is expressed in reciprocal lattice units, so `opts.basis` and
/// `opts.interpolation` are ignored.
pub fn intensity_grid<C: Contraction>(
    sc: &SampledCorrelations,
    contraction: &C,
    bz_counts: [usize; 3],
    opts: &QueryOpts,
) -> Result<GridIntensities<C::Output>, SqwError> {
    let latsize = sc.latsize();
    let qs = exact_wave_vectors(latsize, bz_counts)?;
    let on_lattice = QueryOpts {
        interpolation: Interpolation::None,
        basis: None,
        ..opts.clone()
    };
    let plan = Plan::new(sc, &on_lattice)?;
    let values = plan.evaluate(&qs, contraction)?;
    let dims = [
        latsize[0] * bz_counts[0],
        latsize[1] * bz_counts[1],
        latsize[2] * bz_counts[2],
    ];
    let data = ArrayD::from_shape_vec(IxDyn(&[dims[0], dims[1], dims[2], plan.nbins]), values)
        .map_err(|err| query_error("shape", err.to_string()))?;
    Ok(GridIntensities {
        dims,
        qs,
        omegas: plan.omegas,
        data,
    })
}

/// Samples the polyline through `waypoints` (reciprocal lattice units) with
/// `density` points per unit of absolute wavevector length.
///
/// Returns the sampled points and the index of every waypoint within them.
pub fn connected_path(
    crystal: &Crystal,
    waypoints: &[Vec3],
    density: f64,
) -> Result<(Vec<Vec3>, Vec<usize>), SqwError> {
    if waypoints.len() < 2 {
        return Err(SqwError::Query(
            ErrorInfo::new("too-few-points", "a path needs at least two waypoints")
                .with_context("waypoints", waypoints.len()),
        ));
    }
    if !(density.is_finite() && density > 0.0) {
        return Err(SqwError::Query(
            ErrorInfo::new("invalid-density", "path density must be positive")
                .with_context("density", density),
        ));
    }
    let recip = crystal.recipvecs();
    let mut points = Vec::new();
    let mut markers = Vec::with_capacity(waypoints.len());
    for (segment, pair) in waypoints.windows(2).enumerate() {
        let (start, end) = (pair[0], pair[1]);
        let length = (recip * (end - start)).norm();
        let count = (length * density).round() as usize;
        if count == 0 {
            tracing::warn!(segment, length, "path segment contributes no points");
        }
        markers.push(points.len());
        for k in 0..count {
            points.push(start + (end - start) * (k as f64 / count as f64));
        }
    }
    markers.push(points.len());
    points.push(waypoints[waypoints.len() - 1]);
    Ok((points, markers))
}

/// Dynamical intensities along the path through `waypoints`.
///
/// With `opts.basis` set the waypoints are converted first and the returned
/// path is in reciprocal lattice units.
pub fn path<C: Contraction>(
    sc: &SampledCorrelations,
    waypoints: &[Vec3],
    density: f64,
    contraction: &C,
    opts: &QueryOpts,
) -> Result<PathIntensities<C::Output>, SqwError> {
    let rlu = to_lattice_units(waypoints, opts.basis.as_ref())?;
    let (qs, markers) = connected_path(sc.crystal(), &rlu, density)?;
    let native = QueryOpts {
        basis: None,
        ..opts.clone()
    };
    Ok(PathIntensities {
        intensities: intensities(sc, &qs, contraction, &native)?,
        markers,
    })
}

fn linspace(half_width: f64, n: usize) -> impl Iterator<Item = f64> {
    (0..n).map(move |k| -half_width + 2.0 * half_width * k as f64 / (n - 1) as f64)
}

/// Energy-integrated intensities on a planar slice.
pub fn static_slice<C: Contraction>(
    sc: &SampledCorrelations,
    spec: &SliceSpec,
    contraction: &C,
    opts: &QueryOpts,
) -> Result<SliceIntensities<C::Output>, SqwError> {
    let [n1, n2] = spec.points;
    if n1 < 2 || n2 < 2 {
        return Err(SqwError::Query(
            ErrorInfo::new("too-few-points", "a slice needs at least two points along each axis")
                .with_context("points", format!("{:?}", spec.points)),
        ));
    }
    if spec.axes[0].cross(&spec.axes[1]).norm() < 1e-12 {
        return Err(query_error(
            "degenerate-slice",
            "slice axes must be linearly independent",
        ));
    }
    let mut qs = Vec::with_capacity(n1 * n2);
    for u in linspace(spec.extents[0], n1) {
        for v in linspace(spec.extents[1], n2) {
            qs.push(spec.center + spec.axes[0] * u + spec.axes[1] * v);
        }
    }
    let values = static_intensities(sc, &qs, contraction, opts)?;
    let data = Array2::from_shape_vec((n1, n2), values.data)
        .map_err(|err| query_error("shape", err.to_string()))?;
    Ok(SliceIntensities { qs, data })
}

/// Unit vectors spread over the sphere on a Fibonacci lattice.
pub fn sphere_points(n: usize) -> Vec<Vec3> {
    let golden = PI * (3.0 - 5f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - (2 * i + 1) as f64 / n as f64;
            let r = (1.0 - z * z).sqrt();
            let theta = golden * i as f64;
            Vec3::new(r * theta.cos(), r * theta.sin(), z)
        })
        .collect()
}

/// Spherical average over shells of radius `radii` (absolute units) sampled
/// with `density` points per unit area.
pub fn powder_average<C: Contraction>(
    sc: &SampledCorrelations,
    radii: &[f64],
    density: f64,
    contraction: &C,
    opts: &QueryOpts,
) -> Result<PowderIntensities<C::Output>, SqwError> {
    if !(density.is_finite() && density > 0.0) {
        return Err(SqwError::Query(
            ErrorInfo::new("invalid-density", "shell density must be positive")
                .with_context("density", density),
        ));
    }
    if let Some(&radius) = radii.iter().find(|r| !(r.is_finite() && **r >= 0.0)) {
        return Err(SqwError::Query(
            ErrorInfo::new("invalid-radius", "shell radii must be non-negative")
                .with_context("radius", radius),
        ));
    }
    let to_rlu = sc.crystal().recipvecs().try_inverse().ok_or_else(|| {
        SqwError::Lattice(ErrorInfo::new("singular-lattice", "reciprocal lattice is singular"))
    })?;
    let native = QueryOpts {
        basis: None,
        ..opts.clone()
    };
    let plan = Plan::new(sc, &native)?;
    let zero = contraction.zero();
    let mut data = Vec::with_capacity(radii.len() * plan.nbins);
    for &radius in radii {
        let count = (4.0 * PI * radius * radius * density).round() as usize;
        let qs: Vec<Vec3> = if count == 0 {
            vec![Vec3::zeros()]
        } else {
            sphere_points(count)
                .into_iter()
                .map(|k| to_rlu * (k * radius))
                .collect()
        };
        let values = plan.evaluate(&qs, contraction)?;
        let weight = 1.0 / qs.len() as f64;
        for w in 0..plan.nbins {
            let mut acc = zero.clone();
            for row in values.chunks(plan.nbins) {
                acc.add_scaled(&row[w], weight);
            }
            data.push(acc);
        }
    }
    let data = Array2::from_shape_vec((radii.len(), plan.nbins), data)
        .map_err(|err| query_error("shape", err.to_string()))?;
    Ok(PowderIntensities {
        radii: radii.to_vec(),
        omegas: plan.omegas,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_wave_vectors_cover_zone() {
        let qs = exact_wave_vectors([2, 3, 1], [1, 1, 2]).unwrap();
        assert_eq!(qs.len(), 12);
        assert_eq!(qs[1], Vec3::new(0.0, 0.0, 1.0));
        assert!(exact_wave_vectors([2, 2, 2], [0, 1, 1]).is_err());
    }

    #[test]
    fn path_markers_point_at_waypoints() {
        let crystal = Crystal::cubic(2.0 * PI);
        let waypoints = [Vec3::zeros(), Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.0)];
        let (points, markers) = connected_path(&crystal, &waypoints, 10.0).unwrap();
        assert_eq!(markers, vec![0, 5, 10]);
        assert_eq!(points.len(), 11);
        assert_eq!(points[markers[1]], waypoints[1]);
    }

    #[test]
    fn single_waypoint_is_rejected() {
        let err = connected_path(&Crystal::cubic(1.0), &[Vec3::zeros()], 1.0).unwrap_err();
        assert_eq!(err.code(), "too-few-points");
    }

    #[test]
    fn sphere_points_are_unit_and_balanced() {
        let points = sphere_points(200);
        let centroid: Vec3 = points.iter().sum::<Vec3>() / 200.0;
        assert!(points.iter().all(|p| (p.norm() - 1.0).abs() < 1e-12));
        assert!(centroid.norm() < 1e-2);
    }
}
