// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Frequency-Domain Response
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Frequency-domain field of one sounding and its conductivity Jacobian.

use crate::kernel::SourceKernel;
use crate::reflection::{reflection, Conductivity, LayeredEarth, Reflection};
use em1d_math::filter::HankelFilter;
use em1d_types::constants::PPM;
use em1d_types::error::{Em1dError, Em1dResult};
use em1d_types::survey::{
    ColeCole, ConductivityModel, FieldType, FrequencyComponents, SoundingGeometry,
    SoundingPhysics,
};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Complex field per frequency and, on request, `∂H/∂σ` per frequency and layer.
#[derive(Debug, Clone)]
pub struct FrequencyResponse {
    pub values: Array1<Complex64>,
    /// Shape `(n_frequency, n_layer)`.
    pub derivatives: Option<Array2<Complex64>>,
}

/// Everything needed to evaluate `H(f)` for one sounding.
#[derive(Debug, Clone, Copy)]
pub struct EarthModel<'a> {
    pub filter: &'a HankelFilter,
    pub geometry: &'a SoundingGeometry,
    pub physics: &'a SoundingPhysics,
    pub thicknesses: &'a [f64],
    pub sigma: &'a [f64],
}

impl EarthModel<'_> {
    pub fn kernel(&self) -> SourceKernel {
        SourceKernel {
            source: self.geometry.source,
            z: self.geometry.receiver_height(),
            h: self.geometry.source_height(),
        }
    }

    fn earth<'b, S: Conductivity>(&'b self, sigma: &'b [S]) -> LayeredEarth<'b, S> {
        LayeredEarth {
            sigma,
            chi: self.physics.chi.as_deref(),
            thicknesses: self.thicknesses,
            half_space: self.physics.half_space,
        }
    }

    /// Field at each frequency, following `physics.field_type`.
    pub fn response(&self, frequencies: &[f64], with_derivative: bool) -> Em1dResult<FrequencyResponse> {
        self.response_as(frequencies, self.physics.field_type, with_derivative)
    }

    pub fn response_as(
        &self,
        frequencies: &[f64],
        field_type: FieldType,
        with_derivative: bool,
    ) -> Em1dResult<FrequencyResponse> {
        let n_layer = self.sigma.len();
        if self.thicknesses.len() != n_layer {
            return Err(Em1dError::dimension(
                "thicknesses",
                n_layer,
                self.thicknesses.len(),
            ));
        }

        let kernel = self.kernel();
        let r = kernel.radial_distance();
        let order = kernel.order();
        let lambda = self.filter.abscissae(r);

        let mut values = Array1::zeros(frequencies.len());
        let mut derivatives =
            with_derivative.then(|| Array2::zeros((frequencies.len(), n_layer)));

        for (i, &f) in frequencies.iter().enumerate() {
            let (refl, chain) = match &self.physics.conductivity {
                ConductivityModel::Real => (
                    reflection(f, lambda.view(), &self.earth(self.sigma), with_derivative)?,
                    None,
                ),
                ConductivityModel::ColeCole(cc) => {
                    let (sigma_w, chain) = cole_cole(cc, self.sigma, f)?;
                    (
                        reflection(f, lambda.view(), &self.earth(sigma_w.as_slice()), with_derivative)?,
                        Some(chain),
                    )
                }
            };
            let Reflection { r_te, dr_te } = refl;

            let kv = kernel.values(field_type, lambda.view(), r_te.view());
            values[i] = self.filter.transform(order, r, kv.view());

            if let (Some(out), Some(dr)) = (derivatives.as_mut(), dr_te) {
                let kj = kernel.jacobian_values(lambda.view(), dr.view());
                let mut row = self.filter.transform_rows(order, r, kj.view());
                if let Some(chain) = chain {
                    row.iter_mut()
                        .zip(chain.iter())
                        .for_each(|(d, c)| *d *= c);
                }
                out.row_mut(i).assign(&row);
            }
        }

        Ok(FrequencyResponse {
            values,
            derivatives,
        })
    }
}

/// Cole–Cole conductivity at frequency `f` and `∂σ(ω)/∂σ∞` per layer.
///
/// `σ(ω) = σ∞ − σ∞ η / (1 + (1 − η)(iωτ)^c)`
pub fn cole_cole(
    params: &ColeCole,
    sigma_inf: &[f64],
    frequency: f64,
) -> Em1dResult<(Vec<Complex64>, Vec<Complex64>)> {
    let n = sigma_inf.len();
    params.validate(n)?;
    let omega = 2.0 * PI * frequency;
    let mut sigma = Vec::with_capacity(n);
    let mut chain = Vec::with_capacity(n);
    for k in 0..n {
        let iwt = Complex64::new(0.0, omega * params.tau[k]);
        let factor = 1.0 - params.eta[k] / (1.0 + (1.0 - params.eta[k]) * iwt.powf(params.c[k]));
        sigma.push(sigma_inf[k] * factor);
        chain.push(factor);
    }
    Ok((sigma, chain))
}

/// Project complex fields onto real data channels.
pub fn project(values: &Array1<Complex64>, components: FrequencyComponents) -> Array1<f64> {
    match components {
        FrequencyComponents::Real => values.mapv(|v| v.re),
        FrequencyComponents::Imag => values.mapv(|v| v.im),
        FrequencyComponents::RealImag => values
            .iter()
            .map(|v| v.re)
            .chain(values.iter().map(|v| v.im))
            .collect(),
        FrequencyComponents::AmplitudePhase => values
            .iter()
            .map(|v| v.norm())
            .chain(values.iter().map(|v| v.arg()))
            .collect(),
    }
}

/// Jacobian projection matching [`project`], shape `(n_channels, n_layer)`.
pub fn project_jacobian(
    values: &Array1<Complex64>,
    derivatives: &Array2<Complex64>,
    components: FrequencyComponents,
) -> Em1dResult<Array2<f64>> {
    let (nf, nl) = derivatives.dim();
    match components {
        FrequencyComponents::Real => Ok(derivatives.mapv(|d| d.re)),
        FrequencyComponents::Imag => Ok(derivatives.mapv(|d| d.im)),
        FrequencyComponents::RealImag => Ok(Array2::from_shape_fn((2 * nf, nl), |(i, k)| {
            if i < nf {
                derivatives[[i, k]].re
            } else {
                derivatives[[i - nf, k]].im
            }
        })),
        FrequencyComponents::AmplitudePhase => {
            if let Some(i) = values.iter().position(|v| v.norm() == 0.0) {
                return Err(Em1dError::PhysicsViolation(format!(
                    "amplitude/phase sensitivity undefined for zero field at frequency index {i}"
                )));
            }
            Ok(Array2::from_shape_fn((2 * nf, nl), |(i, k)| {
                if i < nf {
                    let h = values[i];
                    (h.conj() * derivatives[[i, k]]).re / h.norm()
                } else {
                    let h = values[i - nf];
                    (derivatives[[i - nf, k]] / h).im
                }
            }))
        }
    }
}

/// Factor converting a field into parts per million of the free-space primary.
pub fn ppm_scale(kernel: &SourceKernel) -> Em1dResult<f64> {
    let primary = kernel.primary_field();
    if !primary.is_finite() || primary.abs() < f64::MIN_POSITIVE {
        return Err(Em1dError::PhysicsViolation(format!(
            "primary field is zero or undefined for this geometry ({primary})"
        )));
    }
    Ok(PPM / primary)
}
