// -------------------------------------------------------------------------
// SCPN EM1D -- Forward / Jacobian Benchmark
// Serial vs pooled survey forward modelling and Jacobian assembly on a
// synthetic line of frequency-domain soundings.
// -------------------------------------------------------------------------

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use em1d_core::{ExpMap, GlobalEm1d};
use em1d_types::config::Em1dConfig;
use em1d_types::survey::{
    Channels, FrequencyChannels, FrequencyComponents, FrequencyUnits, Sounding, SoundingGeometry,
    SoundingPhysics, SourceGeometry,
};
use ndarray::Array1;
use std::hint::black_box;

const N_LAYER: usize = 20;

fn make_soundings(n: usize) -> Vec<Sounding> {
    (0..n)
        .map(|i| {
            let x = 5.0 * i as f64;
            Sounding {
                geometry: SoundingGeometry {
                    rx_location: [x + 8.0, 0.0, 30.0],
                    src_location: [x, 0.0, 30.0],
                    topo: [x, 0.0, 0.0],
                    source: SourceGeometry::Dipole { offset: 8.0 },
                },
                physics: SoundingPhysics::default(),
                channels: Channels::Frequency(FrequencyChannels {
                    frequencies: vec![382.0, 1822.0, 7970.0, 35920.0, 130100.0],
                    components: FrequencyComponents::RealImag,
                    units: FrequencyUnits::Ppm,
                }),
            }
        })
        .collect()
}

fn make_config(parallel: bool) -> Em1dConfig {
    let thicknesses: Vec<f64> = (0..N_LAYER).map(|k| 2.0 * 1.15f64.powi(k as i32)).collect();
    let mut config = Em1dConfig::with_thicknesses(thicknesses);
    config.execution.parallel = parallel;
    config
}

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("survey_forward");
    group.sample_size(10);

    for &n in &[16usize, 64usize] {
        let m = Array1::from_elem(n * N_LAYER, (0.02f64).ln());
        for (label, parallel) in [("serial", false), ("pooled", true)] {
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, &n| {
                let mut sim =
                    GlobalEm1d::new(make_soundings(n), &make_config(parallel), Box::new(ExpMap))
                        .expect("valid survey");
                b.iter(|| {
                    sim.invalidate();
                    black_box(sim.forward(m.view()).expect("forward"))
                })
            });
        }
    }
    group.finish();
}

fn bench_jacobian(c: &mut Criterion) {
    let mut group = c.benchmark_group("survey_jacobian");
    group.sample_size(10);

    let n = 32;
    let m = Array1::from_elem(n * N_LAYER, (0.02f64).ln());
    for (label, parallel) in [("serial", false), ("pooled", true)] {
        group.bench_function(label, |b| {
            let mut sim =
                GlobalEm1d::new(make_soundings(n), &make_config(parallel), Box::new(ExpMap))
                    .expect("valid survey");
            b.iter(|| {
                sim.invalidate();
                let v = Array1::ones(sim.n_model());
                black_box(sim.jvec(m.view(), v.view()).expect("jvec"))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_forward, bench_jacobian);
criterion_main!(benches);
