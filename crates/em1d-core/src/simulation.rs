// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Single-Sounding Simulation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Forward data and conductivity sensitivity of one sounding.
//!
//! [`SoundingInput`] owns everything a worker needs, so soundings can be
//! evaluated independently and in any order.

use crate::frequency::{ppm_scale, project, project_jacobian, EarthModel};
use crate::time_domain::TimeOperator;
use em1d_math::filter::{HankelFilter, SineFilter};
use em1d_types::constants::DEFAULT_TIME_POINTS_PER_DECADE;
use em1d_types::error::{Em1dError, Em1dResult};
use em1d_types::survey::{Channels, FrequencyUnits, Sounding};
use ndarray::{Array1, Array2};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    Forward,
    /// Forward data plus `∂d/∂σ`.
    Jacobian,
}

/// Digital filters shared by every sounding of a survey.
#[derive(Debug, Clone)]
pub struct FilterSet {
    pub hankel: Arc<HankelFilter>,
    pub sine: Arc<SineFilter>,
    pub time_points_per_decade: usize,
}

impl Default for FilterSet {
    fn default() -> Self {
        FilterSet {
            hankel: HankelFilter::designed(),
            sine: SineFilter::designed(),
            time_points_per_decade: DEFAULT_TIME_POINTS_PER_DECADE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SoundingInput {
    pub sounding: Sounding,
    pub thicknesses: Arc<Vec<f64>>,
    /// Per-layer conductivity (S/m), top to bottom.
    pub sigma: Vec<f64>,
    pub filters: FilterSet,
}

#[derive(Debug, Clone)]
pub struct SoundingOutput {
    pub data: Array1<f64>,
    /// Shape `(n_channels, n_layer)`, present in [`SimulationMode::Jacobian`].
    pub sensitivity: Option<Array2<f64>>,
}

pub fn simulate(input: &SoundingInput, mode: SimulationMode) -> Em1dResult<SoundingOutput> {
    let n_layer = input.sigma.len();
    if input.thicknesses.len() != n_layer {
        return Err(Em1dError::dimension(
            "thicknesses",
            n_layer,
            input.thicknesses.len(),
        ));
    }
    let sounding = &input.sounding;
    let with_derivative = mode == SimulationMode::Jacobian;
    let model = EarthModel {
        filter: &input.filters.hankel,
        geometry: &sounding.geometry,
        physics: &sounding.physics,
        thicknesses: &input.thicknesses,
        sigma: &input.sigma,
    };

    let output = match &sounding.channels {
        Channels::Frequency(ch) => {
            let mut response = model.response(&ch.frequencies, with_derivative)?;
            if ch.units == FrequencyUnits::Ppm {
                let scale = ppm_scale(&model.kernel())?;
                response.values.mapv_inplace(|v| v * scale);
                if let Some(d) = response.derivatives.as_mut() {
                    d.mapv_inplace(|v| v * scale);
                }
            }
            let sensitivity = match &response.derivatives {
                Some(d) => Some(project_jacobian(&response.values, d, ch.components)?),
                None => None,
            };
            SoundingOutput {
                data: project(&response.values, ch.components),
                sensitivity,
            }
        }
        Channels::Time(ch) => {
            let op = TimeOperator::build(
                ch,
                &input.filters.sine,
                input.filters.time_points_per_decade,
            )?;
            let freqs = op.frequencies().to_vec();
            let response = model.response(&freqs, with_derivative)?;
            let sensitivity = match &response.derivatives {
                Some(d) => Some(op.apply_jacobian(d)?),
                None => None,
            };
            SoundingOutput {
                data: op.apply(&response.values)?,
                sensitivity,
            }
        }
    };

    if let Some(k) = output.data.iter().position(|v| !v.is_finite()) {
        return Err(Em1dError::PhysicsViolation(format!(
            "non-finite datum at channel {k}"
        )));
    }
    Ok(output)
}
