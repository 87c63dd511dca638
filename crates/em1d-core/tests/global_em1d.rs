// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Global Orchestrator Integration Tests
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! End-to-end tests of `GlobalEm1d` over mixed frequency/time surveys.

use em1d_core::jacobian::{derivative_check, fd_jacobian};
use em1d_core::{ExpMap, GlobalEm1d, IdentityMap, Sensitivity};
use em1d_math::sparse::LinearOperator;
use em1d_types::config::Em1dConfig;
use em1d_types::error::Em1dError;
use em1d_types::survey::{
    Channels, ColeCole, ConductivityModel, FrequencyChannels, FrequencyComponents,
    FrequencyUnits, Sounding, SoundingGeometry, SoundingPhysics, SourceGeometry, TimeChannels,
    TimeMoment, TimeQuantity,
};
use ndarray::{array, Array1};
use std::path::PathBuf;

const THICKNESSES: [f64; 3] = [10.0, 50.0, 50.0];
const SIGMA: [f64; 3] = [0.01, 0.1, 0.01];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn dipole_sounding(x: f64, frequencies: Vec<f64>, units: FrequencyUnits) -> Sounding {
    Sounding {
        geometry: SoundingGeometry {
            rx_location: [x + 10.0, 0.0, 30.0],
            src_location: [x, 0.0, 30.0],
            topo: [x, 0.0, 0.0],
            source: SourceGeometry::Dipole { offset: 10.0 },
        },
        physics: SoundingPhysics::default(),
        channels: Channels::Frequency(FrequencyChannels {
            frequencies,
            components: FrequencyComponents::RealImag,
            units,
        }),
    }
}

fn loop_sounding(x: f64) -> Sounding {
    Sounding {
        geometry: SoundingGeometry {
            rx_location: [x, 0.0, 35.0],
            src_location: [x, 0.0, 35.0],
            topo: [x, 0.0, 5.0],
            source: SourceGeometry::Loop {
                radius: 13.0,
                current: 1.0,
            },
        },
        physics: SoundingPhysics::default(),
        channels: Channels::Time(TimeChannels {
            moment: TimeMoment::step_off(vec![2e-5, 1e-4, 5e-4], TimeQuantity::DbDt),
            dual_moment: Some(TimeMoment::step_off(vec![1e-4, 1e-3], TimeQuantity::B)),
            low_pass_cutoff: Some(4.5e5),
        }),
    }
}

fn cole_cole_sounding(x: f64) -> Sounding {
    let mut s = dipole_sounding(x, vec![400.0, 3300.0], FrequencyUnits::Field);
    s.physics.conductivity = ConductivityModel::ColeCole(ColeCole {
        eta: vec![0.2, 0.1, 0.0],
        tau: vec![1e-3, 1e-2, 1e-3],
        c: vec![0.7, 0.5, 1.0],
    });
    if let Channels::Frequency(ch) = &mut s.channels {
        ch.components = FrequencyComponents::AmplitudePhase;
    }
    s
}

fn mixed_survey() -> Vec<Sounding> {
    vec![
        dipole_sounding(0.0, vec![900.0, 7200.0, 56000.0], FrequencyUnits::Ppm),
        loop_sounding(20.0),
        cole_cole_sounding(40.0),
        dipole_sounding(60.0, vec![1000.0], FrequencyUnits::Field),
    ]
}

fn config() -> Em1dConfig {
    Em1dConfig::with_thicknesses(THICKNESSES.to_vec())
}

fn log_model(n_sounding: usize) -> Array1<f64> {
    Array1::from_shape_fn(n_sounding * 3, |i| {
        (SIGMA[i % 3] * (1.0 + 0.1 * (i / 3) as f64)).ln()
    })
}

fn max_rel_diff(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let scale = b.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    a.iter()
        .zip(b.iter())
        .fold(0.0_f64, |m, (x, y)| m.max((x - y).abs()))
        / scale
}

// ── End-to-end single sounding ───────────────────────────────────────

#[test]
fn test_layer_two_perturbation_matches_jacobian_column() {
    init_logger();
    let survey = vec![dipole_sounding(0.0, vec![1000.0], FrequencyUnits::Field)];
    let mut sim = GlobalEm1d::new(survey, &config(), Box::new(IdentityMap)).unwrap();
    // One frequency under RealImag: a single complex value stored as [Re, Im].
    assert_eq!(sim.n_data(), 2);
    assert_eq!(sim.data_index().range(0), 0..2);

    let m = Array1::from(SIGMA.to_vec());
    let d0 = sim.forward(m.view()).unwrap();
    assert_eq!(d0.len(), 2);
    assert!(d0.iter().all(|v| v.is_finite() && *v != 0.0));

    let jac = sim.jacobian(m.view()).unwrap().to_dense();
    assert_eq!(jac.dim(), (2, 3));
    let mut m1 = m.clone();
    let dsigma = 1e-3 * m[1];
    m1[1] += dsigma;
    let d1 = sim.forward(m1.view()).unwrap();
    let delta = &d1 - &d0;

    let mut dm = Array1::zeros(3);
    dm[1] = dsigma;
    let jdm = sim.jvec(m.view(), dm.view()).unwrap();

    for i in 0..2 {
        let predicted = jac[[i, 1]] * dsigma;
        let actual = delta[i];
        assert!(
            (actual - predicted).abs() < 1e-2 * actual.abs(),
            "channel {i}: actual={actual:e}, predicted={predicted:e}"
        );
        // Layers 1 and 3 contribute nothing to J·dm for a layer-2 step.
        assert!(
            (jdm[i] - predicted).abs() <= 1e-12 * predicted.abs(),
            "channel {i}: jvec={:e}, column={predicted:e}",
            jdm[i]
        );
    }

    // The second-order residual bounds what round-off and curvature allow;
    // the layer-1 and layer-3 columns miss the observed change by far more.
    let residual = (&delta - &jdm).mapv(f64::abs).sum();
    assert!(residual < 1e-2 * delta.mapv(f64::abs).sum());
    for k in [0, 2] {
        let wrong_layer = (&delta - &(&jac.column(k) * dsigma)).mapv(f64::abs).sum();
        assert!(
            wrong_layer > 10.0 * residual,
            "layer {} column explains the layer-2 change: {wrong_layer:e} vs {residual:e}",
            k + 1
        );
    }
}

// ── Execution modes ──────────────────────────────────────────────────

#[test]
fn test_serial_and_pooled_forward_agree() {
    init_logger();
    let survey = mixed_survey();
    let n = survey.len();
    let m = log_model(n);
    let serial = GlobalEm1d::new(survey.clone(), &config(), Box::new(ExpMap))
        .unwrap()
        .forward(m.view())
        .unwrap();

    for workers in [1, 2, n] {
        let mut cfg = config();
        cfg.execution.parallel = true;
        cfg.execution.n_workers = Some(workers);
        let pooled = GlobalEm1d::new(survey.clone(), &cfg, Box::new(ExpMap))
            .unwrap()
            .forward(m.view())
            .unwrap();
        assert!(
            max_rel_diff(&pooled, &serial) < 1e-14,
            "n_workers={workers} differs from serial"
        );
    }
}

#[test]
fn test_data_index_tiles_data_vector() {
    let survey = mixed_survey();
    let counts: Vec<usize> = survey.iter().map(Sounding::n_channels).collect();
    let sim = GlobalEm1d::new(survey, &config(), Box::new(ExpMap)).unwrap();
    let index = sim.data_index();
    assert_eq!(index.len(), 4);
    assert_eq!(counts, vec![6, 5, 4, 2]);
    let mut next = 0;
    for (i, r) in index.ranges().iter().enumerate() {
        assert_eq!(r.start, next);
        assert_eq!(r.len(), counts[i]);
        next = r.end;
    }
    assert_eq!(next, sim.n_data());
}

// ── Jacobian products ────────────────────────────────────────────────

#[test]
fn test_assembled_and_block_products_agree() {
    init_logger();
    let survey = mixed_survey();
    let m = log_model(survey.len());

    let mut assembled = GlobalEm1d::new(survey.clone(), &config(), Box::new(ExpMap)).unwrap();
    let mut cfg = config();
    cfg.jacobian.block_products = true;
    let mut blocks = GlobalEm1d::new(survey.clone(), &cfg, Box::new(ExpMap)).unwrap();
    cfg.execution.parallel = true;
    cfg.execution.n_workers = Some(3);
    cfg.execution.parallel_products = true;
    let mut pooled_blocks = GlobalEm1d::new(survey, &cfg, Box::new(ExpMap)).unwrap();

    assert!(matches!(
        assembled.jacobian(m.view()).unwrap(),
        Sensitivity::Assembled(_)
    ));
    assert!(matches!(
        blocks.jacobian(m.view()).unwrap(),
        Sensitivity::Blocks(_)
    ));

    let v = Array1::from_shape_fn(assembled.n_model(), |i| ((i as f64) * 0.37).sin());
    let w = Array1::from_shape_fn(assembled.n_data(), |i| ((i as f64) * 0.91).cos());

    let jv_a = assembled.jvec(m.view(), v.view()).unwrap();
    let jv_b = blocks.jvec(m.view(), v.view()).unwrap();
    let jv_p = pooled_blocks.jvec(m.view(), v.view()).unwrap();
    assert!(max_rel_diff(&jv_b, &jv_a) < 1e-12);
    assert!(max_rel_diff(&jv_p, &jv_a) < 1e-12);

    let jtw_a = assembled.jtvec(m.view(), w.view()).unwrap();
    let jtw_b = blocks.jtvec(m.view(), w.view()).unwrap();
    let jtw_p = pooled_blocks.jtvec(m.view(), w.view()).unwrap();
    assert!(max_rel_diff(&jtw_b, &jtw_a) < 1e-12);
    assert!(max_rel_diff(&jtw_p, &jtw_a) < 1e-12);

    // ⟨w, J v⟩ = ⟨Jᵀ w, v⟩
    let lhs = w.dot(&jv_a);
    let rhs = jtw_a.dot(&v);
    assert!((lhs - rhs).abs() < 1e-10 * lhs.abs().max(rhs.abs()));
}

#[test]
fn test_sensitivity_is_block_diagonal() {
    let survey = mixed_survey();
    let m = log_model(survey.len());
    let mut sim = GlobalEm1d::new(survey, &config(), Box::new(ExpMap)).unwrap();
    let index = sim.data_index().clone();
    let sens = sim.jacobian(m.view()).unwrap();
    assert_eq!(sens.nrows(), index.n_data());
    assert_eq!(sens.ncols(), 12);
    let dense = sens.to_dense();
    for (i, rows) in index.ranges().iter().enumerate() {
        for r in rows.clone() {
            for c in 0..12 {
                if c / 3 != i {
                    assert_eq!(dense[[r, c]], 0.0);
                }
            }
        }
    }
}

#[test]
fn test_jacobian_matches_finite_difference() {
    init_logger();
    let survey = vec![
        dipole_sounding(0.0, vec![900.0, 7200.0], FrequencyUnits::Ppm),
        loop_sounding(20.0),
    ];
    let m = log_model(2);
    let mut sim = GlobalEm1d::new(survey, &config(), Box::new(ExpMap)).unwrap();
    let analytic = sim.jacobian(m.view()).unwrap().to_dense();
    let fd = fd_jacobian(|mm| sim.forward(mm), m.view(), 1e-5).unwrap();

    for ((i, j), &a) in analytic.indexed_iter() {
        let f = fd[[i, j]];
        let row_scale = fd.row(i).iter().fold(0.0_f64, |s, v| s.max(v.abs()));
        assert!(
            (a - f).abs() < 1e-5 * row_scale,
            "J[{i},{j}]: analytic={a:e}, fd={f:e}"
        );
    }
}

#[test]
fn test_taylor_remainder_is_second_order() {
    init_logger();
    let survey = mixed_survey();
    let m = log_model(survey.len());
    let mut sim = GlobalEm1d::new(survey, &config(), Box::new(ExpMap)).unwrap();
    let dm = Array1::from_shape_fn(sim.n_model(), |i| 0.5 * ((i as f64) * 1.3).cos());
    let jdm = sim.jvec(m.view(), dm.view()).unwrap();

    let steps = [1e-1, 3e-2, 1e-2, 3e-3, 1e-3];
    let check = derivative_check(|mm| sim.forward(mm), m.view(), dm.view(), jdm.view(), &steps)
        .unwrap();
    assert!(check.passed(1.8), "orders = {:?}", check.orders());
}

// ── Model cache ──────────────────────────────────────────────────────

#[test]
fn test_jacobian_recomputed_after_model_change() {
    let survey = vec![dipole_sounding(0.0, vec![1000.0, 8000.0], FrequencyUnits::Field)];
    let mut sim = GlobalEm1d::new(survey, &config(), Box::new(ExpMap)).unwrap();
    let m0 = log_model(1);
    let m1 = &m0 + 0.3;
    let v = array![1.0, -0.5, 0.25];
    let jv0 = sim.jvec(m0.view(), v.view()).unwrap();
    let jv1 = sim.jvec(m1.view(), v.view()).unwrap();
    assert!(max_rel_diff(&jv1, &jv0) > 1e-3);

    // Same model again: served from cache.
    assert!(sim.cache().jacobian().is_some());
    let again = sim.jvec(m1.view(), v.view()).unwrap();
    assert_eq!(again, jv1);
}

#[test]
fn test_fixed_jacobian_is_reused() {
    init_logger();
    let survey = vec![dipole_sounding(0.0, vec![1000.0, 8000.0], FrequencyUnits::Field)];
    let mut cfg = config();
    cfg.jacobian.fix_jacobian = true;
    let mut sim = GlobalEm1d::new(survey, &cfg, Box::new(ExpMap)).unwrap();
    let m0 = log_model(1);
    let m1 = &m0 + 0.3;
    let v = array![1.0, -0.5, 0.25];

    let d0 = sim.forward(m0.view()).unwrap();
    let jv0 = sim.jvec(m0.view(), v.view()).unwrap();
    let d1 = sim.forward(m1.view()).unwrap();
    let jv1 = sim.jvec(m1.view(), v.view()).unwrap();
    assert_eq!(jv0, jv1);
    assert!(max_rel_diff(&d1, &d0) > 1e-3);

    sim.invalidate();
    let fresh = sim.jvec(m1.view(), v.view()).unwrap();
    assert!(max_rel_diff(&fresh, &jv0) > 1e-3);
}

// ── Failure semantics ────────────────────────────────────────────────

#[test]
fn test_failing_sounding_reports_index() {
    init_logger();
    let survey = mixed_survey();
    let mut cfg = config();
    cfg.execution.parallel = true;
    cfg.execution.n_workers = Some(2);
    let mut sim = GlobalEm1d::new(survey, &cfg, Box::new(IdentityMap)).unwrap();
    let mut m = Array1::from_shape_fn(12, |i| SIGMA[i % 3]);
    m[2 * 3 + 1] = -0.5;
    match sim.forward(m.view()).unwrap_err() {
        Em1dError::Sounding { index, source } => {
            assert_eq!(index, 2);
            assert!(matches!(*source, Em1dError::PhysicsViolation(_)));
        }
        other => panic!("Expected Sounding error, got {other:?}"),
    }
}

#[test]
fn test_invalid_sounding_rejected_at_construction() {
    let mut survey = mixed_survey();
    survey[3].geometry.source = SourceGeometry::Dipole { offset: 0.0 };
    match GlobalEm1d::new(survey, &config(), Box::new(ExpMap)).unwrap_err() {
        Em1dError::Sounding { index, .. } => assert_eq!(index, 3),
        other => panic!("Expected Sounding error, got {other:?}"),
    }
}

#[test]
fn test_model_length_checked() {
    let mut sim = GlobalEm1d::new(mixed_survey(), &config(), Box::new(ExpMap)).unwrap();
    let short = Array1::zeros(5);
    assert!(matches!(
        sim.forward(short.view()).unwrap_err(),
        Em1dError::DimensionMismatch { .. }
    ));
    let m = log_model(4);
    let bad_v = Array1::zeros(3);
    assert!(sim.jvec(m.view(), bad_v.view()).is_err());
    assert!(sim.jtvec(m.view(), bad_v.view()).is_err());
}

#[test]
fn test_default_config_file_builds_simulation() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("configs")
        .join("em1d_default.json");
    let cfg = Em1dConfig::from_file(&path.to_string_lossy()).unwrap();
    let sim = GlobalEm1d::new(mixed_survey(), &cfg, Box::new(ExpMap)).unwrap();
    assert_eq!(sim.n_layer(), 3);
    assert_eq!(sim.n_sounding(), 4);
    assert_eq!(sim.layers().thicknesses(), &[10.0, 50.0, 50.0]);
}
