// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Source Kernels
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Wavenumber-domain integrands for the vertical magnetic field.
//!
//! Vertical dipole (order 0, evaluated at the horizontal offset):
//!   `(1/4π) [e^{−λ|z−h|} + rTE e^{−λ(z+h)}] λ²`
//!
//! Horizontal circular loop, receiver at the centre (order 1, evaluated at the radius):
//!   `(I a/2) [e^{−λ|z−h|} + rTE e^{−λ(z+h)}] λ`
//!
//! The direct term is only present for total-field output. Jacobian kernels
//! replace `rTE` by its per-layer derivative and never carry the direct term.

use em1d_math::filter::HankelOrder;
use em1d_types::survey::{FieldType, SourceGeometry};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Geometry of one source/receiver pair relative to the ground surface.
#[derive(Debug, Clone, Copy)]
pub struct SourceKernel {
    pub source: SourceGeometry,
    /// Receiver height above the surface.
    pub z: f64,
    /// Source height above the surface.
    pub h: f64,
}

impl SourceKernel {
    pub fn order(&self) -> HankelOrder {
        match self.source {
            SourceGeometry::Dipole { .. } => HankelOrder::J0,
            SourceGeometry::Loop { .. } => HankelOrder::J1,
        }
    }

    /// Radial distance the Hankel transform is evaluated at.
    pub fn radial_distance(&self) -> f64 {
        match self.source {
            SourceGeometry::Dipole { offset } => offset,
            SourceGeometry::Loop { radius, .. } => radius,
        }
    }

    fn prefactor(&self) -> f64 {
        match self.source {
            SourceGeometry::Dipole { .. } => 0.25 / PI,
            SourceGeometry::Loop { radius, current } => 0.5 * current * radius,
        }
    }

    #[inline]
    fn lambda_power(&self, lambda: f64) -> f64 {
        match self.source {
            SourceGeometry::Dipole { .. } => lambda * lambda,
            SourceGeometry::Loop { .. } => lambda,
        }
    }

    /// `prefactor · e^{−λ(z+h)} · λ^p`, the weight multiplying `rTE`.
    fn reflected_weight(&self, lambda: f64) -> f64 {
        self.prefactor() * (-lambda * (self.z + self.h)).exp() * self.lambda_power(lambda)
    }

    /// Forward integrand at every wavenumber.
    pub fn values(
        &self,
        field_type: FieldType,
        lambda: ArrayView1<f64>,
        r_te: ArrayView1<Complex64>,
    ) -> Array1<Complex64> {
        let separation = (self.z - self.h).abs();
        let pre = self.prefactor();
        let mut out = Array1::zeros(lambda.len());
        Zip::from(&mut out)
            .and(&lambda)
            .and(&r_te)
            .for_each(|o, &lam, &r| {
                let mut v = r * self.reflected_weight(lam);
                if field_type == FieldType::Total {
                    v += pre * (-lam * separation).exp() * self.lambda_power(lam);
                }
                *o = v;
            });
        out
    }

    /// Jacobian integrand, shape `(n_layer, n_λ)`.
    pub fn jacobian_values(
        &self,
        lambda: ArrayView1<f64>,
        dr_te: ArrayView2<Complex64>,
    ) -> Array2<Complex64> {
        let weights = lambda.mapv(|lam| self.reflected_weight(lam));
        let mut out = dr_te.to_owned();
        for mut row in out.rows_mut() {
            row.zip_mut_with(&weights, |v, &w| *v *= w);
        }
        out
    }

    /// Closed-form free-space field at the receiver (the primary field).
    pub fn primary_field(&self) -> f64 {
        let dz = self.z - self.h;
        match self.source {
            SourceGeometry::Dipole { offset } => {
                let r2 = offset * offset + dz * dz;
                let r = r2.sqrt();
                (3.0 * dz * dz / (r2 * r2 * r) - 1.0 / (r2 * r)) / (4.0 * PI)
            }
            SourceGeometry::Loop { radius, current } => {
                let s = radius * radius + dz * dz;
                current * radius * radius / (2.0 * s * s.sqrt())
            }
        }
    }
}
