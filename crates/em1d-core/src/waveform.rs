// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Waveform Convolution
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reduce a transmitter waveform to weighted step-off evaluations.
//!
//! For a waveform whose current starts and ends at zero, the response at gate
//! time `t` is `−∫ I'(s) b_off(t − s) ds`. On a piecewise-linear waveform `I'`
//! is constant per segment, so each segment becomes a Gauss–Legendre sum of
//! step-off responses. Bipolar pulse trains repeat this every half period with
//! alternating sign.

use em1d_math::quadrature::{gauss_legendre, gauss_legendre_on};
use em1d_types::survey::{TimeMoment, Waveform};

/// Gauss–Legendre order per waveform segment.
pub const SEGMENT_ORDER: usize = 12;

/// `(delay, weight)` pairs with `response(t) = Σ weight · b_off(delay)`.
pub fn step_off_pairs(moment: &TimeMoment, t: f64) -> Vec<(f64, f64)> {
    match &moment.waveform {
        Waveform::StepOff => vec![(t, 1.0)],
        Waveform::PiecewiseLinear { times, currents } => {
            let (nodes, weights) = gauss_legendre(SEGMENT_ORDER);
            let half_period = 0.5 / moment.base_frequency;
            let mut pairs = Vec::with_capacity(moment.n_pulse * (times.len() - 1) * SEGMENT_ORDER);
            for p in 0..moment.n_pulse {
                let shift = p as f64 * half_period;
                let polarity = if p % 2 == 0 { 1.0 } else { -1.0 };
                for k in 0..times.len() - 1 {
                    let slope = (currents[k + 1] - currents[k]) / (times[k + 1] - times[k]);
                    if slope == 0.0 {
                        continue;
                    }
                    for (s, w) in gauss_legendre_on(times[k], times[k + 1], &nodes, &weights) {
                        pairs.push((t + shift - s, -polarity * slope * w));
                    }
                }
            }
            pairs
        }
    }
}

/// Smallest and largest delay over all gates.
pub fn delay_range(moment: &TimeMoment) -> (f64, f64) {
    moment
        .times
        .iter()
        .flat_map(|&t| step_off_pairs(moment, t))
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), (d, _)| (lo.min(d), hi.max(d)))
}
