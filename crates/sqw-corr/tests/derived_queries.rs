mod common;

use sqw_core::{Mat3, Vec3};
use sqw_corr::{
    intensities, intensities_for_mode, path, powder_average, static_intensities, static_slice,
    ContractionMode, FormFactor, FormFactorEntry, Full, Interpolation, ModeIntensities, Perp,
    QueryOpts, SliceSpec, Trace,
};

#[test]
fn path_samples_waypoints_in_order() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 51);
    let trace = Trace::new(sc.info()).unwrap();
    let waypoints = [Vec3::zeros(), Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.0)];
    let result = path(&sc, &waypoints, 4.0, &trace, &QueryOpts::default()).unwrap();
    let qs = &result.intensities.qs;
    assert_eq!(result.markers.len(), 3);
    assert_eq!(qs[result.markers[0]], waypoints[0]);
    assert_eq!(qs[*result.markers.last().unwrap()], waypoints[2]);
    assert_eq!(result.intensities.data.nrows(), qs.len());
}

#[test]
fn path_rejects_single_waypoint() {
    let sc = common::accumulated(&common::dynamic_opts(), 1, 52);
    let trace = Trace::new(sc.info()).unwrap();
    let err = path(&sc, &[Vec3::zeros()], 4.0, &trace, &QueryOpts::default()).unwrap_err();
    assert_eq!(err.code(), "too-few-points");
}

#[test]
fn slice_is_static_intensity_on_plane() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 53);
    let trace = Trace::new(sc.info()).unwrap();
    let spec = SliceSpec {
        center: Vec3::zeros(),
        axes: [Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
        extents: [1.0, 0.5],
        points: [5, 3],
    };
    let slice = static_slice(&sc, &spec, &trace, &QueryOpts::default()).unwrap();
    assert_eq!(slice.data.dim(), (5, 3));
    assert_eq!(slice.qs[0], Vec3::new(-1.0, -0.5, 0.0));
    let direct = static_intensities(&sc, &slice.qs, &trace, &QueryOpts::default()).unwrap();
    for (a, b) in slice.data.iter().zip(&direct.data) {
        assert_eq!(a, b);
    }

    let thin = SliceSpec {
        points: [1, 3],
        ..spec.clone()
    };
    assert_eq!(
        static_slice(&sc, &thin, &trace, &QueryOpts::default()).unwrap_err().code(),
        "too-few-points"
    );
    let degenerate = SliceSpec {
        axes: [Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
        ..spec
    };
    assert_eq!(
        static_slice(&sc, &degenerate, &trace, &QueryOpts::default()).unwrap_err().code(),
        "degenerate-slice"
    );
}

#[test]
fn static_sum_covers_negative_bins() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 54);
    let trace = Trace::new(sc.info()).unwrap();
    let qs = [Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)];
    let all = QueryOpts {
        negative_energies: true,
        ..QueryOpts::default()
    };
    let dynamic = intensities(&sc, &qs, &trace, &all).unwrap();
    let stat = static_intensities(&sc, &qs, &trace, &QueryOpts::default()).unwrap();
    let sum: f64 = dynamic.data.row(0).sum();
    assert!((stat.data[0] - sum).abs() < 1e-12 * (1.0 + sum.abs()));
}

#[test]
fn powder_shell_of_zero_radius_is_origin() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 55);
    let trace = Trace::new(sc.info()).unwrap();
    let opts = QueryOpts::default();
    let powder = powder_average(&sc, &[0.0, 2.0], 5.0, &trace, &opts).unwrap();
    let origin = intensities(&sc, &[Vec3::zeros()], &trace, &opts).unwrap();
    assert_eq!(powder.data.dim(), (2, origin.omegas.len()));
    for w in 0..origin.omegas.len() {
        assert!((powder.data[[0, w]] - origin.data[[0, w]]).abs() < 1e-12);
    }
    assert!(powder.data.row(1).iter().all(|v| v.is_finite()));
}

#[test]
fn basis_change_reinterprets_coordinates() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 56);
    let trace = Trace::new(sc.info()).unwrap();
    let swap = Mat3::new(0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
    let rotated = QueryOpts {
        basis: Some(swap),
        ..QueryOpts::default()
    };
    let a = intensities(&sc, &[Vec3::new(2.0 / 3.0, 1.0 / 3.0, 0.0)], &trace, &rotated).unwrap();
    let b = intensities(&sc, &[Vec3::new(1.0 / 3.0, 2.0 / 3.0, 0.0)], &trace, &QueryOpts::default())
        .unwrap();
    assert_eq!(a.data, b.data);
    assert_eq!(a.qs[0], Vec3::new(2.0 / 3.0, 1.0 / 3.0, 0.0));
}

#[test]
fn form_factors_suppress_large_wavevectors() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 57);
    let trace = Trace::new(sc.info()).unwrap();
    let q = [Vec3::new(4.0 / 3.0, 0.0, 0.0)];
    let bare = intensities(&sc, &q, &trace, &QueryOpts::default()).unwrap();
    let ff = FormFactor::ion("Cu2").unwrap();
    let scaled = QueryOpts {
        form_factors: vec![
            FormFactorEntry {
                atom: 0,
                form_factor: ff.clone(),
            },
            FormFactorEntry {
                atom: 1,
                form_factor: ff.clone(),
            },
        ],
        ..QueryOpts::default()
    };
    let damped = intensities(&sc, &q, &trace, &scaled).unwrap();
    let q_abs = (sc.crystal().recipvecs() * q[0]).norm();
    let factor = ff.evaluate(q_abs).powi(2);
    for w in 0..bare.omegas.len() {
        assert!((damped.data[[0, w]] - factor * bare.data[[0, w]]).abs() < 1e-10);
    }
}

#[test]
fn mode_dispatch_selects_output_kind() {
    let sc = common::accumulated(&common::dynamic_opts(), 1, 58);
    let qs = [Vec3::zeros()];
    let opts = QueryOpts::default();
    let full = intensities(&sc, &qs, &Full::new(sc.info()).unwrap(), &opts).unwrap();
    match intensities_for_mode(&sc, &qs, "0,1".parse::<ContractionMode>().unwrap(), &opts).unwrap() {
        ModeIntensities::Complex(element) => {
            assert_eq!(element.data[[0, 0]], full.data[[0, 0]].get(0, 1));
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(matches!(
        intensities_for_mode(&sc, &qs, ContractionMode::Perp, &opts).unwrap(),
        ModeIntensities::Real(_)
    ));
}

#[test]
fn linear_interpolation_mixes_contracted_lattice_intensities() {
    let sc = common::accumulated(&common::dynamic_opts(), 2, 61);
    let perp = Perp::new(sc.info()).unwrap();
    let ff = FormFactor::ion("Fe2").unwrap();
    let nearest = QueryOpts {
        form_factors: vec![
            FormFactorEntry {
                atom: 0,
                form_factor: ff.clone(),
            },
            FormFactorEntry {
                atom: 1,
                form_factor: ff,
            },
        ],
        ..QueryOpts::default()
    };
    let linear = QueryOpts {
        interpolation: Interpolation::Linear,
        ..nearest.clone()
    };

    let corners = [Vec3::new(1.0 / 3.0, 0.0, 0.0), Vec3::new(2.0 / 3.0, 0.0, 0.0)];
    let at_corners = intensities(&sc, &corners, &perp, &nearest).unwrap();
    let midpoint = intensities(&sc, &[Vec3::new(0.5, 0.0, 0.0)], &perp, &linear).unwrap();
    for w in 0..midpoint.omegas.len() {
        let expected = 0.5 * (at_corners.data[[0, w]] + at_corners.data[[1, w]]);
        assert!((midpoint.data[[0, w]] - expected).abs() < 1e-10);
    }
}
