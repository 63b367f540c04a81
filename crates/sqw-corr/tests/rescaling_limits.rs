mod common;

use sqw_core::Vec3;
use sqw_corr::{intensities, QuantumCorrection, QueryOpts, Trace};

fn queries() -> Vec<Vec3> {
    vec![Vec3::new(1.0 / 3.0, 0.0, 0.0), Vec3::new(2.0 / 3.0, 1.0 / 3.0, 0.0)]
}

#[test]
fn infinite_temperature_is_classical() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 21);
    let trace = Trace::new(sc.info()).unwrap();
    let base = QueryOpts {
        negative_energies: true,
        ..QueryOpts::default()
    };
    let classical = intensities(&sc, &queries(), &trace, &base).unwrap();
    for correction in [QuantumCorrection::Harmonic, QuantumCorrection::DetailedBalance] {
        let opts = QueryOpts {
            kt: Some(f64::INFINITY),
            correction,
            ..base.clone()
        };
        let rescaled = intensities(&sc, &queries(), &trace, &opts).unwrap();
        assert_eq!(rescaled.data, classical.data);
    }
}

#[test]
fn zero_frequency_bin_is_never_rescaled() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 22);
    let trace = Trace::new(sc.info()).unwrap();
    let classical = intensities(&sc, &queries(), &trace, &QueryOpts::default()).unwrap();
    let opts = QueryOpts {
        kt: Some(0.05),
        ..QueryOpts::default()
    };
    let rescaled = intensities(&sc, &queries(), &trace, &opts).unwrap();
    for q in 0..2 {
        assert_eq!(rescaled.data[[q, 0]], classical.data[[q, 0]]);
    }
}

#[test]
fn detailed_balance_at_zero_temperature_doubles_positive_frequencies() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 23);
    let trace = Trace::new(sc.info()).unwrap();
    let base = QueryOpts {
        negative_energies: true,
        ..QueryOpts::default()
    };
    let classical = intensities(&sc, &queries(), &trace, &base).unwrap();
    let opts = QueryOpts {
        kt: Some(0.0),
        correction: QuantumCorrection::DetailedBalance,
        ..base.clone()
    };
    let rescaled = intensities(&sc, &queries(), &trace, &opts).unwrap();
    for (w, omega) in classical.omegas.iter().enumerate() {
        let expected = if *omega > 0.0 {
            2.0
        } else if *omega < 0.0 {
            0.0
        } else {
            1.0
        };
        for q in 0..2 {
            let (c, r) = (classical.data[[q, w]], rescaled.data[[q, w]]);
            assert!((r - expected * c).abs() < 1e-12, "ω = {omega}");
        }
    }
}

#[test]
fn harmonic_requires_positive_temperature() {
    let sc = common::accumulated(&common::dynamic_opts(), 1, 24);
    let trace = Trace::new(sc.info()).unwrap();
    let opts = QueryOpts {
        kt: Some(0.0),
        ..QueryOpts::default()
    };
    let err = intensities(&sc, &queries(), &trace, &opts).unwrap_err();
    assert_eq!(err.code(), "invalid-temperature");
}
