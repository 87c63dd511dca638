// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Log-Grid Interpolation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Uniform grids in log10 space and 4-point Lagrange stencils on them.
//!
//! Time-domain soundings evaluate the frequency response on such a grid and
//! interpolate in log-frequency; the stencil weights are what the linear time
//! operator is built from.

use em1d_types::error::{Em1dError, Em1dResult};
use ndarray::Array1;

/// Points on either side of a sample kept inside the 4-point stencil.
pub const STENCIL_PAD: usize = 2;

#[derive(Debug, Clone)]
pub struct LogGrid {
    /// Index of the first node on the global `10^(k / per_decade)` lattice.
    start: i64,
    per_decade: usize,
    values: Array1<f64>,
}

impl LogGrid {
    /// Smallest lattice grid containing `[min, max]` plus `pad` extra nodes per side.
    pub fn covering(min: f64, max: f64, per_decade: usize, pad: usize) -> Em1dResult<Self> {
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || max < min {
            return Err(Em1dError::ConfigError(format!(
                "log grid needs 0 < min <= max, got [{min}, {max}]"
            )));
        }
        if per_decade == 0 {
            return Err(Em1dError::ConfigError(
                "log grid per_decade must be >= 1".to_string(),
            ));
        }
        let ppd = per_decade as f64;
        let start = (min.log10() * ppd).floor() as i64 - pad as i64;
        let mut end = (max.log10() * ppd).ceil() as i64 + pad as i64;
        if end - start < 3 {
            end = start + 3;
        }
        let n = (end - start + 1) as usize;
        let values = Array1::from_shape_fn(n, |k| 10f64.powf((start + k as i64) as f64 / ppd));
        Ok(LogGrid {
            start,
            per_decade,
            values,
        })
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First stencil node and the four Lagrange weights interpolating at `x`.
    ///
    /// The stencil straddles `x` where possible and is clamped at the grid ends.
    pub fn stencil(&self, x: f64) -> (usize, [f64; 4]) {
        let p = x.log10() * self.per_decade as f64 - self.start as f64;
        let max_first = self.len().saturating_sub(4) as f64;
        let first = (p.floor() - 1.0).clamp(0.0, max_first);
        (first as usize, lagrange4(p - first))
    }
}

/// Lagrange basis on nodes 0, 1, 2, 3 evaluated at `s`.
pub fn lagrange4(s: f64) -> [f64; 4] {
    [
        -(s - 1.0) * (s - 2.0) * (s - 3.0) / 6.0,
        s * (s - 2.0) * (s - 3.0) / 2.0,
        -s * (s - 1.0) * (s - 3.0) / 2.0,
        s * (s - 1.0) * (s - 2.0) / 6.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_covers_range_with_padding() {
        let g = LogGrid::covering(3.0, 2.0e4, 10, STENCIL_PAD).unwrap();
        let v = g.values();
        assert!(v[STENCIL_PAD] <= 3.0 + 1e-12);
        assert!(v[v.len() - 1 - STENCIL_PAD] >= 2.0e4 - 1e-9);
        for w in v.windows(2) {
            assert!((w[1] / w[0] - 10f64.powf(0.1)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let g = LogGrid::covering(1.0, 1.0e3, 8, STENCIL_PAD).unwrap();
        for &x in &[1.0, 2.7, 55.0, 999.0] {
            let (_, w) = g.stencil(x);
            let s: f64 = w.iter().sum();
            assert!((s - 1.0).abs() < 1e-12, "x={x}: sum={s}");
        }
    }

    #[test]
    fn test_cubic_in_log_is_exact() {
        let g = LogGrid::covering(0.1, 100.0, 6, STENCIL_PAD).unwrap();
        let f = |x: f64| {
            let l = x.log10();
            2.0 - l + 0.5 * l * l - 0.25 * l * l * l
        };
        let samples = g.values().mapv(f);
        for &x in &[0.13, 0.9, 4.2, 77.0] {
            let (i0, w) = g.stencil(x);
            let approx: f64 = (0..4).map(|k| w[k] * samples[i0 + k]).sum();
            assert!((approx - f(x)).abs() < 1e-10, "x={x}: {approx} vs {}", f(x));
        }
    }

    #[test]
    fn test_node_hit_is_kronecker() {
        let g = LogGrid::covering(1.0, 10.0, 10, STENCIL_PAD).unwrap();
        let x = g.values()[5];
        let (i0, w) = g.stencil(x);
        let hit = 5 - i0;
        for (k, &wk) in w.iter().enumerate() {
            let expect = if k == hit { 1.0 } else { 0.0 };
            assert!((wk - expect).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(LogGrid::covering(0.0, 1.0, 10, 2).is_err());
        assert!(LogGrid::covering(10.0, 1.0, 10, 2).is_err());
        assert!(LogGrid::covering(1.0, 10.0, 0, 2).is_err());
    }
}
