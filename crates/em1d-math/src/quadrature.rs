// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Quadrature
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gauss–Legendre rules and composite Simpson integration.

use std::f64::consts::PI;

/// Gauss–Legendre nodes and weights on [-1, 1].
///
/// Newton iteration on P_n from the Chebyshev initial guess; nodes ascending.
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(n > 0, "Gauss-Legendre order must be > 0");
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let m = n.div_ceil(2);

    for i in 0..m {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 0.0;
        for _ in 0..100 {
            // Three-term recurrence for P_n(x) and its derivative.
            let mut p0 = 1.0;
            let mut p1 = 0.0;
            for j in 0..n {
                let p2 = p1;
                p1 = p0;
                p0 = ((2 * j + 1) as f64 * x * p1 - j as f64 * p2) / (j + 1) as f64;
            }
            dp = n as f64 * (x * p0 - p1) / (x * x - 1.0);
            let dx = p0 / dp;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        weights[i] = w;
        weights[n - 1 - i] = w;
    }
    (nodes, weights)
}

/// Map a Gauss–Legendre rule from [-1, 1] onto [a, b].
pub fn gauss_legendre_on(a: f64, b: f64, nodes: &[f64], weights: &[f64]) -> Vec<(f64, f64)> {
    let half = 0.5 * (b - a);
    let mid = 0.5 * (a + b);
    nodes
        .iter()
        .zip(weights.iter())
        .map(|(&x, &w)| (mid + half * x, half * w))
        .collect()
}

/// Composite Simpson weights for `n_intervals` (even) panels of width `h`.
pub fn simpson_weights(n_intervals: usize, h: f64) -> Vec<f64> {
    assert!(
        n_intervals >= 2 && n_intervals % 2 == 0,
        "Simpson needs an even number of intervals, got {n_intervals}"
    );
    (0..=n_intervals)
        .map(|i| {
            let c = if i == 0 || i == n_intervals {
                1.0
            } else if i % 2 == 1 {
                4.0
            } else {
                2.0
            };
            c * h / 3.0
        })
        .collect()
}
