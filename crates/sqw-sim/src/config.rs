use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqw_core::errors::SqwError;
use sqw_core::{Crystal, Mat3, Vec3};
use sqw_corr::{ContractionMode, CorrelationOpts, QueryOpts, SliceSpec};
use sqw_dyn::{Bond, LangevinOpts, SpinLattice};

/// YAML-configurable description of a structure-factor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Crystal, supercell and Hamiltonian.
    pub lattice: LatticeConfig,
    /// Integrator and Langevin bath.
    pub dynamics: DynamicsConfig,
    /// Frequency grid and recorded observables.
    #[serde(default)]
    pub correlations: CorrelationOpts,
    /// Number of trajectories to accumulate.
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Independent chains accumulated in parallel.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Intensity queries evaluated after accumulation.
    #[serde(default)]
    pub queries: Vec<QueryConfig>,
    /// Artefact locations.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_samples() -> usize {
    10
}

fn default_workers() -> usize {
    1
}

/// Unit cell, supercell and couplings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeConfig {
    /// Lattice vectors, one per row.
    #[serde(default = "default_latvecs")]
    pub latvecs: [[f64; 3]; 3],
    /// Fractional sublattice positions.
    #[serde(default = "default_positions")]
    pub positions: Vec<[f64; 3]>,
    /// Symmetry class label per sublattice.
    #[serde(default)]
    pub classes: Option<Vec<usize>>,
    /// Unit cells along each axis.
    pub latsize: [usize; 3],
    /// Spin magnitude κ.
    #[serde(default = "default_spin")]
    pub spin: f64,
    /// Heisenberg bonds.
    #[serde(default)]
    pub bonds: Vec<Bond>,
    /// Uniform Zeeman field.
    #[serde(default)]
    pub field: [f64; 3],
}

fn default_latvecs() -> [[f64; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

fn default_positions() -> Vec<[f64; 3]> {
    vec![[0.0; 3]]
}

fn default_spin() -> f64 {
    1.0
}

impl LatticeConfig {
    /// Builds the crystal description.
    pub fn crystal(&self) -> Result<Crystal, SqwError> {
        let columns: Vec<Vec3> = self.latvecs.iter().map(|v| Vec3::from(*v)).collect();
        Crystal::new(
            Mat3::from_columns(&columns),
            self.positions.iter().map(|p| Vec3::from(*p)).collect(),
            self.classes.clone(),
        )
    }

    /// Builds the spin lattice polarised along +z.
    pub fn build(&self) -> Result<SpinLattice, SqwError> {
        let mut lattice = SpinLattice::new(self.crystal()?, self.latsize, self.spin)?;
        for bond in &self.bonds {
            lattice.add_bond(*bond)?;
        }
        lattice.set_field(Vec3::from(self.field));
        Ok(lattice)
    }
}

/// Deterministic integrator step and sampling bath.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicsConfig {
    /// Implicit midpoint step used for trajectories.
    pub dt: f64,
    /// Langevin sampler used to decorrelate between trajectories.
    pub langevin: LangevinOpts,
    /// Samples discarded before accumulation starts.
    #[serde(default = "default_thermalize")]
    pub thermalize: usize,
}

fn default_thermalize() -> usize {
    10
}

/// Seed derivation policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Root of all random substreams.
    #[serde(default)]
    pub master_seed: u64,
}

/// One named intensity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Artefact stem, written as `<name>.json`.
    pub name: String,
    /// Contraction such as `trace`, `perp`, `full` or `0,2`.
    #[serde(default = "default_mode")]
    pub mode: ContractionMode,
    /// Shared query options.
    #[serde(default)]
    pub opts: QueryOpts,
    /// Query geometry.
    pub kind: QueryKind,
}

fn default_mode() -> ContractionMode {
    ContractionMode::Trace
}

/// Geometry of a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryKind {
    /// Dynamical intensities at listed wavevectors.
    Points {
        /// Wavevectors.
        qs: Vec<[f64; 3]>,
    },
    /// Energy-integrated intensities at listed wavevectors.
    Static {
        /// Wavevectors.
        qs: Vec<[f64; 3]>,
    },
    /// Every commensurate wavevector in the requested zones.
    Grid {
        /// Brillouin zones along each axis.
        #[serde(default = "default_zones")]
        bz_counts: [usize; 3],
    },
    /// Piecewise-linear path.
    Path {
        /// Path corners.
        waypoints: Vec<[f64; 3]>,
        /// Points per unit absolute wavevector.
        density: f64,
    },
    /// Energy-integrated planar slice.
    Slice(SliceSpec),
    /// Spherical shells.
    Powder {
        /// Shell radii.
        radii: Vec<f64>,
        /// Points per unit area.
        density: f64,
    },
}

fn default_zones() -> [usize; 3] {
    [1, 1, 1]
}

/// Artefact file names inside the output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory, filled in from `--out`.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Snapshot file name.
    #[serde(default = "default_snapshot")]
    pub snapshot: String,
}

fn default_snapshot() -> String {
    "correlations.bin".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            snapshot: default_snapshot(),
        }
    }
}
