use ndarray::Array6;
use proptest::prelude::*;
use sqw_core::Crystal;
use sqw_corr::{CorrelationOpts, SampledCorrelations};

const SHAPE: (usize, usize, usize, usize, usize, usize) = (3, 2, 1, 1, 1, 4);
const LEN: usize = 3 * 2 * 4;

fn empty() -> SampledCorrelations {
    let opts = CorrelationOpts {
        num_omegas: 3,
        ..CorrelationOpts::default()
    };
    SampledCorrelations::new(Crystal::cubic(1.0), [2, 1, 1], 0.1, &opts).unwrap()
}

fn trajectory(values: &[f64]) -> Array6<f64> {
    Array6::from_shape_vec(SHAPE, values.to_vec()).unwrap()
}

fn accumulate(order: &[&Array6<f64>]) -> SampledCorrelations {
    let mut sc = empty();
    for samples in order {
        sc.add_trajectory(samples.view()).unwrap();
    }
    sc
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn running_average_ignores_order(
        a in prop::collection::vec(-1.0f64..1.0, LEN),
        b in prop::collection::vec(-1.0f64..1.0, LEN),
        c in prop::collection::vec(-1.0f64..1.0, LEN),
    ) {
        let (a, b, c) = (trajectory(&a), trajectory(&b), trajectory(&c));
        let abc = accumulate(&[&a, &b, &c]);
        let cab = accumulate(&[&c, &a, &b]);
        prop_assert_eq!(abc.nsamples(), 3);
        for (x, y) in abc.data().iter().zip(cab.data().iter()) {
            prop_assert!((x - y).norm() < 1e-12);
        }
    }

    #[test]
    fn merge_matches_sequential_accumulation(
        a in prop::collection::vec(-1.0f64..1.0, LEN),
        b in prop::collection::vec(-1.0f64..1.0, LEN),
        c in prop::collection::vec(-1.0f64..1.0, LEN),
    ) {
        let (a, b, c) = (trajectory(&a), trajectory(&b), trajectory(&c));
        let sequential = accumulate(&[&a, &b, &c]);
        let mut left = accumulate(&[&a]);
        let right = accumulate(&[&b, &c]);
        left.merge(&right).unwrap();
        prop_assert_eq!(left.nsamples(), 3);
        for (x, y) in sequential.data().iter().zip(left.data().iter()) {
            prop_assert!((x - y).norm() < 1e-12);
        }
    }
}

#[test]
fn mean_subtraction_removes_static_signal() {
    let opts = CorrelationOpts {
        num_omegas: 3,
        subtract_mean: true,
        ..CorrelationOpts::default()
    };
    let mut sc = SampledCorrelations::new(Crystal::cubic(1.0), [2, 1, 1], 0.1, &opts).unwrap();
    sc.add_trajectory(Array6::from_elem(SHAPE, 0.7).view()).unwrap();
    assert!(sc.data().iter().all(|z| z.norm() < 1e-14));
}
