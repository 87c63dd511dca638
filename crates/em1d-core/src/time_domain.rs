// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Time-Domain Operator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Linear map from sampled frequency responses to time-gate data.
//!
//! The complex field `H(f)` is sampled on a log-uniform frequency grid. Every
//! gate is a fixed linear combination of those samples: sine-filter weights,
//! waveform quadrature weights, the receiver low-pass and the 4-point log
//! interpolation stencil are folded into one complex matrix `C`. Data are
//! `Re(C H)` and the sensitivity is `Re(C ∂H/∂σ)`, so both come from the same
//! operator.
//!
//! Step-off responses for `e^{iωt}`:
//!   `b(t)    = −(2μ0/π) ∫ (Re H(ω) − H_dc) sin(ωt)/ω dω`
//!   `db/dt   =  (2μ0/π) ∫  Im H(ω) sin(ωt) dω`

use crate::waveform::{delay_range, step_off_pairs};
use em1d_math::filter::SineFilter;
use em1d_math::interp::{LogGrid, STENCIL_PAD};
use em1d_types::constants::MU0;
use em1d_types::error::{Em1dError, Em1dResult};
use em1d_types::survey::{TimeChannels, TimeMoment, TimeQuantity};
use ndarray::{Array1, Array2, ArrayViewMut1};
use num_complex::Complex64;
use std::f64::consts::PI;

#[derive(Debug, Clone)]
pub struct TimeOperator {
    grid: LogGrid,
    matrix: Array2<Complex64>,
}

impl TimeOperator {
    pub fn build(
        channels: &TimeChannels,
        sine: &SineFilter,
        points_per_decade: usize,
    ) -> Em1dResult<Self> {
        channels.validate()?;
        let moments: Vec<&TimeMoment> = std::iter::once(&channels.moment)
            .chain(channels.dual_moment.as_ref())
            .collect();

        let (t_min, t_max) = moments
            .iter()
            .map(|m| delay_range(m))
            .fold((f64::INFINITY, 0.0_f64), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
        let base = sine.base();
        let y_min = base.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = base.iter().copied().fold(0.0_f64, f64::max);
        let grid = LogGrid::covering(
            y_min / (2.0 * PI * t_max),
            y_max / (2.0 * PI * t_min),
            points_per_decade,
            STENCIL_PAD,
        )?;

        let mut matrix = Array2::zeros((channels.n_channels(), grid.len()));
        let mut row = 0;
        for moment in moments {
            for &t in &moment.times {
                accumulate_gate(
                    matrix.row_mut(row),
                    &grid,
                    sine,
                    moment,
                    t,
                    channels.low_pass_cutoff,
                );
                row += 1;
            }
        }
        log::debug!(
            "time operator: {} gates on {} frequencies [{:.3e}, {:.3e}] Hz",
            matrix.nrows(),
            grid.len(),
            grid.values()[0],
            grid.values()[grid.len() - 1]
        );
        Ok(TimeOperator { grid, matrix })
    }

    /// Frequencies (Hz) at which `H` must be supplied.
    pub fn frequencies(&self) -> &Array1<f64> {
        self.grid.values()
    }

    pub fn n_channels(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    pub fn apply(&self, values: &Array1<Complex64>) -> Em1dResult<Array1<f64>> {
        if values.len() != self.grid.len() {
            return Err(Em1dError::dimension(
                "time operator input",
                self.grid.len(),
                values.len(),
            ));
        }
        Ok(self.matrix.dot(values).mapv(|v| v.re))
    }

    /// `Re(C ∂H/∂σ)` for derivatives shaped `(n_frequency, n_layer)`.
    pub fn apply_jacobian(&self, derivatives: &Array2<Complex64>) -> Em1dResult<Array2<f64>> {
        if derivatives.nrows() != self.grid.len() {
            return Err(Em1dError::dimension(
                "time operator jacobian input",
                self.grid.len(),
                derivatives.nrows(),
            ));
        }
        Ok(self.matrix.dot(derivatives).mapv(|v| v.re))
    }
}

/// First-order receiver low-pass.
#[inline]
pub fn low_pass(frequency: f64, cutoff: Option<f64>) -> Complex64 {
    match cutoff {
        Some(fc) => Complex64::new(1.0, frequency / fc).inv(),
        None => Complex64::new(1.0, 0.0),
    }
}

fn accumulate_gate(
    mut row: ArrayViewMut1<Complex64>,
    grid: &LogGrid,
    sine: &SineFilter,
    moment: &TimeMoment,
    t: f64,
    cutoff: Option<f64>,
) {
    let base = sine.base();
    let weights = sine.weights();
    for (delay, w) in step_off_pairs(moment, t) {
        let mut dc = 0.0;
        for (&y, &wj) in base.iter().zip(weights.iter()) {
            let f = y / (2.0 * PI * delay);
            let coef = match moment.quantity {
                TimeQuantity::B => {
                    let c = -2.0 / PI * wj / y;
                    dc += c;
                    Complex64::new(c, 0.0)
                }
                TimeQuantity::DbDt => Complex64::new(0.0, -2.0 / PI * wj / delay),
            } * (w * MU0)
                * low_pass(f, cutoff);
            let (first, stencil) = grid.stencil(f);
            for (k, a) in stencil.iter().enumerate() {
                row[first + k] += coef * *a;
            }
        }
        // Lowest grid frequency stands in for the DC level.
        row[0] -= Complex64::new(dc * w * MU0, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::EarthModel;
    use em1d_math::filter::HankelFilter;
    use em1d_types::constants::DEFAULT_TIME_POINTS_PER_DECADE;
    use em1d_types::survey::{SoundingGeometry, SoundingPhysics, SourceGeometry, Waveform};

    const SIGMA: f64 = 0.01;
    const RADIUS: f64 = 10.0;

    fn loop_geometry() -> SoundingGeometry {
        SoundingGeometry {
            rx_location: [0.0, 0.0, 0.05],
            src_location: [0.0, 0.0, 0.05],
            topo: [0.0, 0.0, 0.0],
            source: SourceGeometry::Loop {
                radius: RADIUS,
                current: 1.0,
            },
        }
    }

    fn simulate(channels: &TimeChannels) -> Array1<f64> {
        let op = TimeOperator::build(
            channels,
            &SineFilter::designed(),
            DEFAULT_TIME_POINTS_PER_DECADE,
        )
        .unwrap();
        let hankel = HankelFilter::designed();
        let geometry = loop_geometry();
        let physics = SoundingPhysics {
            half_space: true,
            ..Default::default()
        };
        let model = EarthModel {
            filter: &hankel,
            geometry: &geometry,
            physics: &physics,
            thicknesses: &[0.0],
            sigma: &[SIGMA],
        };
        let freqs = op.frequencies().to_vec();
        let h = model.response(&freqs, false).unwrap().values;
        op.apply(&h).unwrap()
    }

    fn step_channels(times: Vec<f64>, quantity: TimeQuantity) -> TimeChannels {
        TimeChannels {
            moment: TimeMoment::step_off(times, quantity),
            dual_moment: None,
            low_pass_cutoff: None,
        }
    }

    /// Step-off dBz/dt at the centre of a loop on a half-space.
    fn analytic_dbdt(t: f64) -> f64 {
        let theta = (MU0 * SIGMA / (4.0 * t)).sqrt();
        let x = theta * RADIUS;
        let erf = erf(x);
        -(1.0 / (SIGMA * RADIUS.powi(3)))
            * (3.0 * erf - 2.0 / PI.sqrt() * x * (3.0 + 2.0 * x * x) * (-x * x).exp())
    }

    /// Maclaurin series; `x` stays well below 1 here.
    fn erf(x: f64) -> f64 {
        let mut term = x;
        let mut sum = x;
        for n in 1..40 {
            term *= -x * x / n as f64;
            sum += term / (2 * n + 1) as f64;
        }
        2.0 / PI.sqrt() * sum
    }

    #[test]
    fn test_loop_half_space_dbdt_matches_closed_form() {
        let times = vec![1e-5, 1e-4, 1e-3];
        let data = simulate(&step_channels(times.clone(), TimeQuantity::DbDt));
        for (i, &t) in times.iter().enumerate() {
            let exact = analytic_dbdt(t);
            let rel = ((data[i] - exact) / exact).abs();
            assert!(rel < 0.05, "t={t}: numeric={}, analytic={exact}", data[i]);
        }
    }

    #[test]
    fn test_b_and_dbdt_are_consistent() {
        let t = 2e-4;
        let d = 1e-3 * t;
        let b = simulate(&step_channels(vec![t - d, t + d], TimeQuantity::B));
        let dbdt = simulate(&step_channels(vec![t], TimeQuantity::DbDt));
        let fd = (b[1] - b[0]) / (2.0 * d);
        assert!(
            ((fd - dbdt[0]) / dbdt[0]).abs() < 0.02,
            "fd={fd}, dbdt={}",
            dbdt[0]
        );
    }

    #[test]
    fn test_dual_moment_rows_are_appended() {
        let mut channels = step_channels(vec![1e-4, 1e-3], TimeQuantity::DbDt);
        let single = simulate(&channels);
        channels.dual_moment = Some(TimeMoment::step_off(vec![5e-5, 2e-3, 4e-3], TimeQuantity::B));
        let dual = simulate(&channels);
        assert_eq!(dual.len(), 5);
        // The grid widens for the dual moment but the shared rows agree.
        for i in 0..2 {
            assert!(((dual[i] - single[i]) / single[i]).abs() < 1e-3);
        }
    }

    #[test]
    fn test_wide_low_pass_is_transparent() {
        let mut channels = step_channels(vec![1e-4, 1e-3], TimeQuantity::DbDt);
        let plain = simulate(&channels);
        channels.low_pass_cutoff = Some(1e15);
        let filtered = simulate(&channels);
        for i in 0..2 {
            assert!(((filtered[i] - plain[i]) / plain[i]).abs() < 1e-6);
        }
        channels.low_pass_cutoff = Some(1e3);
        let narrow = simulate(&channels);
        assert!(((narrow[0] - plain[0]) / plain[0]).abs() > 1e-3);
    }

    #[test]
    fn test_ramp_off_approaches_step_off() {
        let times = vec![1e-4, 1e-3];
        let step = simulate(&step_channels(times.clone(), TimeQuantity::DbDt));
        let ramp = TimeChannels {
            moment: TimeMoment {
                times,
                waveform: Waveform::PiecewiseLinear {
                    times: vec![-1.0, -0.5, -1e-7, 0.0],
                    currents: vec![0.0, 1.0, 1.0, 0.0],
                },
                quantity: TimeQuantity::DbDt,
                n_pulse: 1,
                base_frequency: 0.1,
            },
            dual_moment: None,
            low_pass_cutoff: None,
        };
        let data = simulate(&ramp);
        for i in 0..2 {
            assert!(((data[i] - step[i]) / step[i]).abs() < 1e-2);
        }
    }

    #[test]
    fn test_input_length_checked() {
        let channels = step_channels(vec![1e-4], TimeQuantity::DbDt);
        let op = TimeOperator::build(&channels, &SineFilter::designed(), 10).unwrap();
        let short = Array1::zeros(op.frequencies().len() - 1);
        assert!(matches!(
            op.apply(&short).unwrap_err(),
            Em1dError::DimensionMismatch { .. }
        ));
    }
}
