// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Digital Filters
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fast Hankel and Fourier-sine transforms by digital filtering.
//!
//! `∫₀^∞ f(λ) J_n(λ r) dλ ≈ Σ_j f(Y_j / r) W_j / r`
//!
//! Abscissae `Y_j = e^{t_j}` are log-spaced with step Δ. Weights come either
//! from a NumPy archive (`YBASE`, `WT0`, `WT1`) or from the sinc-interpolation
//! design
//!
//! `W_j = (Δ/π) ∫₀^{π/Δ} w(k) Re[M(k) e^{−i k t_j}] dk`
//!
//! where `M` is the Mellin transform of the Bessel kernel and `w` a smooth
//! taper that is 1 on the lower half of the band. Designed defaults are built
//! once per process and shared.

use crate::quadrature::simpson_weights;
use crate::special::{hankel_mellin, sine_mellin};
use em1d_types::constants::{DEFAULT_HANKEL_POINTS_PER_DECADE, DEFAULT_SINE_POINTS_PER_DECADE};
use em1d_types::error::{Em1dError, Em1dResult};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use ndarray_npy::NpzReader;
use num_complex::Complex64;
use std::f64::consts::{LN_10, PI};
use std::fs::File;
use std::sync::{Arc, OnceLock};

/// log10 span of `λ r` covered by designed Hankel filters.
pub const HANKEL_LOG10_RANGE: (f64, f64) = (-5.5, 4.5);

/// log10 span of `ω t` covered by designed sine filters.
pub const SINE_LOG10_RANGE: (f64, f64) = (-3.5, 3.5);

/// Simpson panels used to integrate the tapered spectrum.
const DESIGN_INTERVALS: usize = 4096;

/// Fraction of the Nyquist band passed without attenuation.
const TAPER_START: f64 = 0.5;

static DEFAULT_HANKEL: OnceLock<Arc<HankelFilter>> = OnceLock::new();
static DEFAULT_SINE: OnceLock<Arc<SineFilter>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HankelOrder {
    J0,
    J1,
}

/// Hankel filter with shared abscissae for orders 0 and 1.
#[derive(Debug, Clone)]
pub struct HankelFilter {
    base: Array1<f64>,
    j0: Array1<f64>,
    j1: Array1<f64>,
}

impl HankelFilter {
    pub fn from_arrays(base: Array1<f64>, j0: Array1<f64>, j1: Array1<f64>) -> Em1dResult<Self> {
        validate_base(&base)?;
        for (name, w) in [("WT0", &j0), ("WT1", &j1)] {
            if w.len() != base.len() {
                return Err(Em1dError::dimension(
                    format!("hankel filter {name}"),
                    base.len(),
                    w.len(),
                ));
            }
            if w.iter().any(|v| !v.is_finite()) {
                return Err(Em1dError::ConfigError(format!(
                    "hankel filter {name} contains non-finite weights"
                )));
            }
        }
        Ok(HankelFilter { base, j0, j1 })
    }

    /// Load `YBASE`, `WT0`, `WT1` from a NumPy `.npz` archive.
    pub fn from_npz(path: &str) -> Em1dResult<Self> {
        let file = File::open(path)?;
        let mut npz = NpzReader::new(file)
            .map_err(|e| Em1dError::ConfigError(format!("Failed to open npz '{path}': {e}")))?;
        let filter = Self::from_arrays(
            read_array1(&mut npz, "YBASE")?,
            read_array1(&mut npz, "WT0")?,
            read_array1(&mut npz, "WT1")?,
        )?;
        log::info!("loaded Hankel filter '{}' ({} points)", path, filter.len());
        Ok(filter)
    }

    /// Design orders 0 and 1 on a shared log-spaced grid.
    pub fn design(points_per_decade: usize) -> Em1dResult<Self> {
        validate_density(points_per_decade)?;
        Ok(Self::design_unchecked(points_per_decade))
    }

    fn design_unchecked(points_per_decade: usize) -> Self {
        let (lo, hi) = HANKEL_LOG10_RANGE;
        let (base, j0) = design_weights(lo, hi, points_per_decade, |k| hankel_mellin(0, k));
        let (_, j1) = design_weights(lo, hi, points_per_decade, |k| hankel_mellin(1, k));
        log::debug!(
            "designed Hankel filter: {} points, {} per decade",
            base.len(),
            points_per_decade
        );
        HankelFilter { base, j0, j1 }
    }

    /// Process-wide designed filter at the default density.
    pub fn designed() -> Arc<HankelFilter> {
        DEFAULT_HANKEL
            .get_or_init(|| Arc::new(Self::design_unchecked(DEFAULT_HANKEL_POINTS_PER_DECADE)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn base(&self) -> &Array1<f64> {
        &self.base
    }

    pub fn weights(&self, order: HankelOrder) -> &Array1<f64> {
        match order {
            HankelOrder::J0 => &self.j0,
            HankelOrder::J1 => &self.j1,
        }
    }

    /// Wavenumbers `λ_j = Y_j / r` at which the kernel must be sampled.
    pub fn abscissae(&self, r: f64) -> Array1<f64> {
        self.base.mapv(|y| y / r)
    }

    /// `Σ f(Y_j/r) W_j / r` for kernel samples taken at [`Self::abscissae`].
    pub fn transform(&self, order: HankelOrder, r: f64, values: ArrayView1<Complex64>) -> Complex64 {
        debug_assert_eq!(values.len(), self.len());
        let w = self.weights(order);
        values
            .iter()
            .zip(w.iter())
            .fold(Complex64::new(0.0, 0.0), |acc, (&f, &wj)| acc + f * wj)
            / r
    }

    /// Row-wise transform of a `(n_rows, n_abscissae)` kernel matrix.
    pub fn transform_rows(
        &self,
        order: HankelOrder,
        r: f64,
        values: ArrayView2<Complex64>,
    ) -> Array1<Complex64> {
        debug_assert_eq!(values.ncols(), self.len());
        values
            .axis_iter(Axis(0))
            .map(|row| self.transform(order, r, row))
            .collect()
    }
}

/// Fourier sine filter: `∫₀^∞ g(ω) sin(ω t) dω ≈ Σ g(Y_j/t) W_j / t`.
#[derive(Debug, Clone)]
pub struct SineFilter {
    base: Array1<f64>,
    weights: Array1<f64>,
}

impl SineFilter {
    pub fn from_arrays(base: Array1<f64>, weights: Array1<f64>) -> Em1dResult<Self> {
        validate_base(&base)?;
        if weights.len() != base.len() {
            return Err(Em1dError::dimension(
                "sine filter weights",
                base.len(),
                weights.len(),
            ));
        }
        if weights.iter().any(|v| !v.is_finite()) {
            return Err(Em1dError::ConfigError(
                "sine filter contains non-finite weights".to_string(),
            ));
        }
        Ok(SineFilter { base, weights })
    }

    pub fn design(points_per_decade: usize) -> Em1dResult<Self> {
        validate_density(points_per_decade)?;
        Ok(Self::design_unchecked(points_per_decade))
    }

    fn design_unchecked(points_per_decade: usize) -> Self {
        let (lo, hi) = SINE_LOG10_RANGE;
        let (base, weights) = design_weights(lo, hi, points_per_decade, sine_mellin);
        log::debug!(
            "designed sine filter: {} points, {} per decade",
            base.len(),
            points_per_decade
        );
        SineFilter { base, weights }
    }

    pub fn designed() -> Arc<SineFilter> {
        DEFAULT_SINE
            .get_or_init(|| Arc::new(Self::design_unchecked(DEFAULT_SINE_POINTS_PER_DECADE)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn base(&self) -> &Array1<f64> {
        &self.base
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Angular frequencies `ω_j = Y_j / t`.
    pub fn abscissae(&self, t: f64) -> Array1<f64> {
        self.base.mapv(|y| y / t)
    }

    pub fn transform(&self, t: f64, values: ArrayView1<f64>) -> f64 {
        debug_assert_eq!(values.len(), self.len());
        values.dot(&self.weights) / t
    }
}

fn validate_density(points_per_decade: usize) -> Em1dResult<()> {
    if !(5..=200).contains(&points_per_decade) {
        return Err(Em1dError::ConfigError(format!(
            "filter points_per_decade must be in [5, 200], got {points_per_decade}"
        )));
    }
    Ok(())
}

fn validate_base(base: &Array1<f64>) -> Em1dResult<()> {
    if base.len() < 2 {
        return Err(Em1dError::ConfigError(
            "filter base needs at least 2 abscissae".to_string(),
        ));
    }
    if base.iter().any(|&y| !y.is_finite() || y <= 0.0) {
        return Err(Em1dError::ConfigError(
            "filter abscissae must be finite and > 0".to_string(),
        ));
    }
    if base.windows(2).into_iter().any(|w| w[1] <= w[0]) {
        return Err(Em1dError::ConfigError(
            "filter abscissae must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

/// C∞ step: 1 below `TAPER_START`, 0 at the Nyquist wavenumber.
fn taper(x: f64) -> f64 {
    if x <= TAPER_START {
        return 1.0;
    }
    if x >= 1.0 {
        return 0.0;
    }
    let s = (x - TAPER_START) / (1.0 - TAPER_START);
    let bump = |y: f64| if y > 0.0 { (-1.0 / y).exp() } else { 0.0 };
    let a = bump(1.0 - s);
    a / (a + bump(s))
}

fn design_weights(
    log10_min: f64,
    log10_max: f64,
    points_per_decade: usize,
    mellin: impl Fn(f64) -> Complex64,
) -> (Array1<f64>, Array1<f64>) {
    let ppd = points_per_decade as f64;
    let n = ((log10_max - log10_min) * ppd).round() as usize + 1;
    let delta = LN_10 / ppd;
    let t0 = LN_10 * log10_min;

    let k_max = PI / delta;
    let dk = k_max / DESIGN_INTERVALS as f64;
    let spectrum: Vec<(f64, Complex64)> = simpson_weights(DESIGN_INTERVALS, dk)
        .into_iter()
        .enumerate()
        .map(|(i, sw)| {
            let k = i as f64 * dk;
            (k, mellin(k) * (taper(k / k_max) * sw))
        })
        .collect();

    let base = Array1::from_shape_fn(n, |j| (t0 + j as f64 * delta).exp());
    let weights = Array1::from_shape_fn(n, |j| {
        let t = t0 + j as f64 * delta;
        let acc: f64 = spectrum
            .iter()
            .map(|&(k, m)| (m * Complex64::from_polar(1.0, -k * t)).re)
            .sum();
        delta / PI * acc
    });
    (base, weights)
}

fn read_array1(npz: &mut NpzReader<File>, key: &str) -> Em1dResult<Array1<f64>> {
    npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix1>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix1>(key))
        .map_err(|e| Em1dError::ConfigError(format!("Failed to read {key} from npz: {e}")))
}
