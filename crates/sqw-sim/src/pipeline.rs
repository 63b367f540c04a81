use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Serialize;
use sqw_core::{RngHandle, Sampler, SqwError, Stream, Vec3};
use sqw_corr::{
    canonical_json, intensities, intensity_grid, path, powder_average, static_intensities,
    static_slice, Contraction, ContractionMode, CorrelationSnapshot, Element, Full, Perp,
    SampledCorrelations, StructureFactor, Trace,
};
use sqw_dyn::{ImplicitMidpoint, Langevin, SpinLattice};

use crate::config::{QueryConfig, QueryKind, RunConfig};

/// Summary written next to the run artefacts.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Trajectories accumulated.
    pub nsamples: u64,
    /// Parameter hash of the accumulator.
    pub metadata_hash: String,
    /// Content hash of the written snapshot.
    pub content_hash: String,
    /// Integrator steps between snapshots.
    pub measperiod: usize,
    /// Non-negative frequency axis.
    pub omegas: Vec<f64>,
    /// Energy of the configuration after accumulation.
    pub final_energy: f64,
    /// Query artefacts written, in configuration order.
    pub queries: Vec<String>,
}

fn langevin(config: &RunConfig, role: Stream) -> Result<Langevin, SqwError> {
    let seed = RngHandle::for_stream(config.seed_policy.master_seed, role).seed();
    Langevin::new(config.dynamics.langevin.clone(), seed)
}

/// Equilibrates, accumulates and writes every artefact into `out_dir`.
pub fn run(config: &RunConfig, out_dir: &Path) -> Result<RunSummary, Box<dyn Error>> {
    fs::create_dir_all(out_dir)?;
    let master = config.seed_policy.master_seed;
    let mut system = config.lattice.build()?;
    system.randomize(&mut RngHandle::for_stream(master, Stream::Initial));

    let mut sampler = langevin(config, Stream::Thermalize)?;
    for _ in 0..config.dynamics.thermalize {
        sampler.sample(&mut system)?;
    }
    tracing::info!(energy = system.energy(), "thermalized");

    let integrator = ImplicitMidpoint::new(config.dynamics.dt)?;
    let mut sf = StructureFactor::new(&system, integrator, &config.correlations)?;
    let workers = config.workers.max(1);
    if workers == 1 {
        sf.accumulate(&mut system, &mut sampler, config.samples)?;
    } else {
        let chains = (0..workers)
            .map(|worker| Ok((system.clone(), langevin(config, Stream::Worker(worker))?)))
            .collect::<Result<Vec<(SpinLattice, Langevin)>, SqwError>>()?;
        sf.accumulate_parallel(chains, config.samples)?;
    }
    let sc = sf.correlations();
    tracing::info!(nsamples = sc.nsamples(), "accumulation finished");

    let snapshot = CorrelationSnapshot::capture(sc)?;
    fs::write(out_dir.join(&config.output.snapshot), snapshot.to_bytes()?)?;

    let queries = write_queries(sc, &config.queries, out_dir)?;
    let summary = RunSummary {
        nsamples: sc.nsamples(),
        metadata_hash: snapshot.metadata_hash.clone(),
        content_hash: snapshot.content_hash.clone(),
        measperiod: sc.schedule().measperiod,
        omegas: sc.frequencies(false),
        final_energy: system.energy(),
        queries,
    };
    fs::write(out_dir.join("summary.json"), canonical_json(&summary)?)?;
    Ok(summary)
}

/// Evaluates `queries` against restored correlations and writes `<name>.json`.
pub fn write_queries(
    sc: &SampledCorrelations,
    queries: &[QueryConfig],
    out_dir: &Path,
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut written = Vec::with_capacity(queries.len());
    for query in queries {
        let json = evaluate(sc, query)?;
        let file = format!("{}.json", query.name);
        fs::write(out_dir.join(&file), json)?;
        tracing::info!(query = %query.name, mode = %query.mode, "query written");
        written.push(file);
    }
    Ok(written)
}

/// Runs one query with the contraction selected by its mode.
pub fn evaluate(sc: &SampledCorrelations, query: &QueryConfig) -> Result<String, SqwError> {
    let info = sc.info();
    query.mode.check(info)?;
    match query.mode {
        ContractionMode::Trace => render(sc, query, &Trace::new(info)?),
        ContractionMode::Perp => render(sc, query, &Perp::new(info)?),
        ContractionMode::Element(a, b) => render(sc, query, &Element::new(info, a, b)?),
        ContractionMode::Full => render(sc, query, &Full::new(info)?),
    }
}

fn vectors(raw: &[[f64; 3]]) -> Vec<Vec3> {
    raw.iter().map(|q| Vec3::from(*q)).collect()
}

fn render<C>(sc: &SampledCorrelations, query: &QueryConfig, contraction: &C) -> Result<String, SqwError>
where
    C: Contraction,
    C::Output: Serialize,
{
    let opts = &query.opts;
    match &query.kind {
        QueryKind::Points { qs } => canonical_json(&intensities(sc, &vectors(qs), contraction, opts)?),
        QueryKind::Static { qs } => {
            canonical_json(&static_intensities(sc, &vectors(qs), contraction, opts)?)
        }
        QueryKind::Grid { bz_counts } => {
            canonical_json(&intensity_grid(sc, contraction, *bz_counts, opts)?)
        }
        QueryKind::Path { waypoints, density } => {
            canonical_json(&path(sc, &vectors(waypoints), *density, contraction, opts)?)
        }
        QueryKind::Slice(spec) => canonical_json(&static_slice(sc, spec, contraction, opts)?),
        QueryKind::Powder { radii, density } => {
            canonical_json(&powder_average(sc, radii, *density, contraction, opts)?)
        }
    }
}
