mod common;

use std::sync::OnceLock;

use proptest::prelude::*;
use sqw_core::Vec3;
use sqw_corr::{intensities, Contraction, Interpolation, Perp, QueryOpts, SampledCorrelations, Trace};

fn shared() -> &'static SampledCorrelations {
    static SC: OnceLock<SampledCorrelations> = OnceLock::new();
    SC.get_or_init(|| common::accumulated(&common::dynamic_opts(), 2, 3))
}

fn batch_matches_single<C: Contraction<Output = f64>>(qs: &[Vec3], contraction: &C, opts: &QueryOpts) {
    let sc = shared();
    let batch = intensities(sc, qs, contraction, opts).unwrap();
    for (idx, q) in qs.iter().enumerate() {
        let single = intensities(sc, &[*q], contraction, opts).unwrap();
        for w in 0..batch.omegas.len() {
            let (a, b) = (batch.data[[idx, w]], single.data[[0, w]]);
            assert!((a - b).abs() <= 1e-12 * (1.0 + a.abs()), "query {idx} bin {w}: {a} != {b}");
        }
    }
}

fn queries() -> impl Strategy<Value = Vec<Vec3>> {
    prop::collection::vec(((-6i32..6, -6i32..6, -2i32..2), 1usize..4, -0.05f64..0.05), 1..12).prop_map(
        |runs| {
            runs.into_iter()
                .flat_map(|((a, b, c), repeat, jitter)| {
                    let q = Vec3::new(a as f64 / 6.0 + jitter, b as f64 / 6.0, c as f64 / 2.0);
                    std::iter::repeat(q).take(repeat)
                })
                .collect()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn nearest_point_batches_match_single_queries(qs in queries()) {
        let sc = shared();
        batch_matches_single(&qs, &Trace::new(sc.info()).unwrap(), &QueryOpts::default());
    }

    #[test]
    fn linear_batches_match_single_queries(qs in queries()) {
        let sc = shared();
        let opts = QueryOpts {
            interpolation: Interpolation::Linear,
            negative_energies: true,
            ..QueryOpts::default()
        };
        batch_matches_single(&qs, &Perp::new(sc.info()).unwrap(), &opts);
    }
}
