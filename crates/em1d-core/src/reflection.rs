// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — TE Reflection Coefficient
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! TE-mode reflection coefficient of a layered earth and its per-layer
//! conductivity derivatives.
//!
//! Time convention `e^{iωt}`. With `u_j = sqrt(λ² + iωμ_j σ_j)` and the
//! normalized admittance `Y_j = u_j / (1 + χ_j)`, the surface admittance is
//! built bottom-up:
//!
//! ```text
//! Ŷ_{N-1} = Y_{N-1}
//! Ŷ_j     = Y_j (Ŷ_{j+1} + Y_j t_j) / (Y_j + Ŷ_{j+1} t_j),   t_j = tanh(u_j d_j)
//! rTE     = (λ − Ŷ_0) / (λ + Ŷ_0)
//! ```
//!
//! Derivatives ride along the same sweep: everything accumulated for deeper
//! layers is multiplied by `∂Ŷ_j/∂Ŷ_{j+1}` at each interface, then the local
//! `∂Ŷ_j/∂σ_j` is added.

use em1d_types::constants::MU0;
use em1d_types::error::{Em1dError, Em1dResult};
use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Conductivity scalar accepted by the recursion.
///
/// `f64` is the non-dispersive fast path; `Complex64` carries dispersive
/// models such as Cole–Cole.
pub trait Conductivity: Copy + Send + Sync {
    /// `i ω μ σ`
    fn induction(self, omega_mu: f64) -> Complex64;

    fn is_admissible(self) -> bool;
}

impl Conductivity for f64 {
    #[inline]
    fn induction(self, omega_mu: f64) -> Complex64 {
        Complex64::new(0.0, omega_mu * self)
    }

    fn is_admissible(self) -> bool {
        self.is_finite() && self >= 0.0
    }
}

impl Conductivity for Complex64 {
    #[inline]
    fn induction(self, omega_mu: f64) -> Complex64 {
        Complex64::new(-omega_mu * self.im, omega_mu * self.re)
    }

    fn is_admissible(self) -> bool {
        self.is_finite() && self.re >= 0.0
    }
}

/// Earth description for one frequency.
#[derive(Debug, Clone, Copy)]
pub struct LayeredEarth<'a, S: Conductivity> {
    pub sigma: &'a [S],
    /// Per-layer susceptibility; `None` means zero everywhere.
    pub chi: Option<&'a [f64]>,
    /// Length `n_layer`; the last entry is not used.
    pub thicknesses: &'a [f64],
    /// Collapse the stack to a half-space of layer 0.
    pub half_space: bool,
}

impl<S: Conductivity> LayeredEarth<'_, S> {
    pub fn n_layer(&self) -> usize {
        self.sigma.len()
    }

    fn chi_at(&self, j: usize) -> f64 {
        self.chi.map_or(0.0, |c| c[j])
    }

    pub fn validate(&self) -> Em1dResult<()> {
        let n = self.sigma.len();
        if n == 0 {
            return Err(Em1dError::ConfigError(
                "layered earth needs at least one layer".to_string(),
            ));
        }
        if self.thicknesses.len() != n {
            return Err(Em1dError::dimension("thicknesses", n, self.thicknesses.len()));
        }
        if let Some(chi) = self.chi {
            if chi.len() != n {
                return Err(Em1dError::dimension("chi", n, chi.len()));
            }
        }
        if let Some(k) = self.sigma.iter().position(|s| !s.is_admissible()) {
            return Err(Em1dError::PhysicsViolation(format!(
                "conductivity of layer {k} must be finite and non-negative"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Reflection {
    /// `rTE(λ_i)`
    pub r_te: Array1<Complex64>,
    /// `∂rTE(λ_i)/∂σ_k`, shape `(n_layer, n_λ)`.
    pub dr_te: Option<Array2<Complex64>>,
}

struct LayerTerms {
    u: Complex64,
    y: Complex64,
    /// `∂Y/∂σ`
    dy: Complex64,
}

#[inline]
fn layer_terms<S: Conductivity>(lambda: f64, omega: f64, sigma: S, chi: f64) -> LayerTerms {
    let mu = MU0 * (1.0 + chi);
    let u = (Complex64::new(lambda * lambda, 0.0) + sigma.induction(omega * mu)).sqrt();
    LayerTerms {
        u,
        y: u / (1.0 + chi),
        // ∂u/∂σ = iωμ/(2u), and μ/(1+χ) = μ0
        dy: Complex64::new(0.0, omega * MU0) / (2.0 * u),
    }
}

/// Reflection coefficient at the top interface for every wavenumber in `lambda`.
pub fn reflection<S: Conductivity>(
    frequency: f64,
    lambda: ArrayView1<f64>,
    earth: &LayeredEarth<'_, S>,
    with_derivative: bool,
) -> Em1dResult<Reflection> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(Em1dError::ConfigError(format!(
            "frequency must be finite and > 0, got {frequency}"
        )));
    }
    earth.validate()?;

    let omega = 2.0 * PI * frequency;
    let n_layer = earth.n_layer();
    let n_active = if earth.half_space { 1 } else { n_layer };
    let n_lambda = lambda.len();

    let mut r_te = Array1::zeros(n_lambda);
    let mut dr_te = with_derivative.then(|| Array2::zeros((n_layer, n_lambda)));
    let mut d_yhat = vec![Complex64::new(0.0, 0.0); n_active];

    for (i, &lam) in lambda.iter().enumerate() {
        let bottom = n_active - 1;
        let basement = layer_terms(lam, omega, earth.sigma[bottom], earth.chi_at(bottom));
        let mut yhat = basement.y;
        if with_derivative {
            d_yhat.iter_mut().for_each(|d| *d = Complex64::new(0.0, 0.0));
            d_yhat[bottom] = basement.dy;
        }

        for j in (0..bottom).rev() {
            let layer = layer_terms(lam, omega, earth.sigma[j], earth.chi_at(j));
            let y = layer.y;
            // tanh(ud) from e^{-2ud}; Re u > 0 keeps |q| < 1.
            let q = (-2.0 * layer.u * earth.thicknesses[j]).exp();
            let one_q = 1.0 + q;
            let t = (1.0 - q) / one_q;
            let sech2 = 4.0 * q / (one_q * one_q);

            let num = yhat + y * t;
            let den = y + yhat * t;
            let next = y * num / den;

            if with_derivative {
                let den2 = den * den;
                let g = y * y * sech2 / den2;
                for d in d_yhat.iter_mut().skip(j + 1) {
                    *d *= g;
                }
                let dnext_dy = ((yhat + 2.0 * y * t) * den - y * num) / den2;
                let dnext_dt = (y * y * den - y * num * yhat) / den2;
                let du = layer.dy * (1.0 + earth.chi_at(j));
                let dt = sech2 * earth.thicknesses[j] * du;
                d_yhat[j] = dnext_dy * layer.dy + dnext_dt * dt;
            }
            yhat = next;
        }

        let denom = lam + yhat;
        r_te[i] = (lam - yhat) / denom;
        if let Some(dr) = dr_te.as_mut() {
            let chain = -2.0 * lam / (denom * denom);
            for (k, &d) in d_yhat.iter().enumerate() {
                dr[[k, i]] = chain * d;
            }
        }
    }

    Ok(Reflection { r_te, dr_te })
}
