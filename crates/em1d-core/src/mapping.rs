// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Conductivity Maps
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Element-wise maps from inversion model `m` to layer conductivity `σ`.
//!
//! The sensitivity stays block-diagonal only if `σ_i` depends on `m_i` alone,
//! so a map returns the diagonal of `dσ/dm` rather than a full matrix.

use em1d_types::error::{Em1dError, Em1dResult};
use ndarray::{Array1, ArrayView1};
use std::fmt::Debug;

pub trait ConductivityMap: Debug + Send + Sync {
    /// `σ(m)`
    fn forward(&self, m: ArrayView1<f64>) -> Em1dResult<Array1<f64>>;

    /// Diagonal of `dσ/dm` at `m`.
    fn derivative(&self, m: ArrayView1<f64>) -> Em1dResult<Array1<f64>>;
}

/// `σ = exp(m)`, the usual log-conductivity parameterization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpMap;

impl ConductivityMap for ExpMap {
    fn forward(&self, m: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        let sigma = m.mapv(f64::exp);
        if let Some(i) = sigma.iter().position(|s| !s.is_finite()) {
            return Err(Em1dError::PhysicsViolation(format!(
                "exp map overflowed at model index {i} (m = {})",
                m[i]
            )));
        }
        Ok(sigma)
    }

    fn derivative(&self, m: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        self.forward(m)
    }
}

/// `σ = m`
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMap;

impl ConductivityMap for IdentityMap {
    fn forward(&self, m: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        Ok(m.to_owned())
    }

    fn derivative(&self, m: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        Ok(Array1::ones(m.len()))
    }
}
