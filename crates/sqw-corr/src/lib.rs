#![deny(missing_docs)]
#![doc = "Dynamical structure factor engine: trajectory sampling, running-average space-time correlations and intensity queries with interpolation, form factors and quantum rescaling."]

mod basis;
mod contraction;
mod correlations;
mod form_factor;
mod interp;
mod observables;
mod query;
mod rescale;
mod snapshot;
mod stencil;
mod structure_factor;
mod trajectory;

pub use basis::{phase_averaged_elements, ReducedElements};
pub use contraction::{
    ComponentMatrix, Contraction, ContractionMode, Element, Full, IntensityValue, Perp, Trace,
};
pub use correlations::{CorrelationOpts, FrequencySchedule, SampledCorrelations};
pub use form_factor::{FormFactor, FormFactorEntry, FormFactorTable};
pub use interp::{Interpolation, Stencil};
pub use observables::{Observable, ObservableInfo, OperatorMatrix};
pub use query::{
    connected_path, exact_wave_vectors, intensities, intensities_for_mode, intensity_grid, path,
    powder_average, sphere_points, static_intensities, static_slice, GridIntensities,
    Intensities, ModeIntensities, PathIntensities, PowderIntensities, QueryOpts, SliceIntensities,
    SliceSpec, StaticIntensities,
};
pub use rescale::QuantumCorrection;
pub use snapshot::{canonical_json, stable_hash, CorrelationSnapshot};
pub use stencil::{compute_runs, expand, group_runs, Run};
pub use structure_factor::StructureFactor;
pub use trajectory::TrajectoryBuffer;
