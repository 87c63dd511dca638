// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Survey Data Model
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sounding descriptions: geometry, earth physics switches and channel layout.
//!
//! A [`Sounding`] is self-contained and owned by value so it can be shipped to a
//! worker. Column-form tables ([`FrequencySurveyTable`], [`TimeSurveyTable`])
//! expand into one `Sounding` per row after validating that every column shares
//! the leading dimension.

use crate::constants::{DEFAULT_BASE_FREQUENCY, DEFAULT_N_PULSE};
use crate::error::{Em1dError, Em1dResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ── Closed enums ─────────────────────────────────────────────────────

/// Transmitter geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceGeometry {
    /// Vertical magnetic dipole, receiver at horizontal `offset` (m).
    Dipole { offset: f64 },
    /// Horizontal circular loop of `radius` (m) carrying `current` (A), receiver at the centre.
    Loop { radius: f64, current: f64 },
}

impl SourceGeometry {
    /// Build from a tabular source-type name. `size` is the dipole offset or loop radius.
    pub fn from_name(name: &str, size: f64, current: f64) -> Em1dResult<Self> {
        let source = match name.trim().to_ascii_lowercase().as_str() {
            "vmd" | "dipole" | "vertical_dipole" => SourceGeometry::Dipole { offset: size },
            "circular_loop" | "loop" => SourceGeometry::Loop {
                radius: size,
                current,
            },
            _ => return Err(Em1dError::UnsupportedSource(name.to_string())),
        };
        source.validate()?;
        Ok(source)
    }

    pub fn validate(&self) -> Em1dResult<()> {
        match *self {
            SourceGeometry::Dipole { offset } => {
                if !offset.is_finite() || offset <= 0.0 {
                    return Err(Em1dError::ConfigError(format!(
                        "dipole offset must be finite and > 0, got {offset}"
                    )));
                }
            }
            SourceGeometry::Loop { radius, current } => {
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(Em1dError::ConfigError(format!(
                        "loop radius must be finite and > 0, got {radius}"
                    )));
                }
                if !current.is_finite() {
                    return Err(Em1dError::ConfigError(
                        "loop current must be finite".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Secondary,
    Total,
}

impl FromStr for FieldType {
    type Err = Em1dError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secondary" => Ok(FieldType::Secondary),
            "total" => Ok(FieldType::Total),
            other => Err(Em1dError::ConfigError(format!(
                "field type must be 'secondary' or 'total', got '{other}'"
            ))),
        }
    }
}

/// Projection of a complex frequency-domain response onto real data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyComponents {
    /// `[Re H…, Im H…]`
    #[default]
    RealImag,
    Real,
    Imag,
    /// `[|H|…, arg H…]`
    AmplitudePhase,
}

impl FrequencyComponents {
    pub fn channels_per_frequency(self) -> usize {
        match self {
            FrequencyComponents::RealImag | FrequencyComponents::AmplitudePhase => 2,
            FrequencyComponents::Real | FrequencyComponents::Imag => 1,
        }
    }
}

impl FromStr for FrequencyComponents {
    type Err = Em1dError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" | "real_imag" | "realimag" => Ok(FrequencyComponents::RealImag),
            "real" | "inphase" => Ok(FrequencyComponents::Real),
            "imag" | "quadrature" => Ok(FrequencyComponents::Imag),
            "amplitude_phase" | "amp_phase" => Ok(FrequencyComponents::AmplitudePhase),
            other => Err(Em1dError::ConfigError(format!(
                "unknown frequency component selection '{other}'"
            ))),
        }
    }
}

/// Receiver units for frequency-domain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyUnits {
    /// H-field per unit moment (dipole) or per loop, A/m.
    #[default]
    Field,
    /// Secondary field normalized by the free-space primary, parts per million.
    Ppm,
}

impl FromStr for FrequencyUnits {
    type Err = Em1dError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "field" | "h" => Ok(FrequencyUnits::Field),
            "ppm" => Ok(FrequencyUnits::Ppm),
            other => Err(Em1dError::ConfigError(format!(
                "receiver units must be 'field' or 'ppm', got '{other}'"
            ))),
        }
    }
}

/// Time-domain receiver quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeQuantity {
    /// Magnetic flux density, T.
    B,
    /// Time derivative of B, T/s.
    #[default]
    DbDt,
}

impl FromStr for TimeQuantity {
    type Err = Em1dError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "b" | "bz" => Ok(TimeQuantity::B),
            "dbdt" | "dbzdt" => Ok(TimeQuantity::DbDt),
            other => Err(Em1dError::ConfigError(format!(
                "time quantity must be 'b' or 'dbdt', got '{other}'"
            ))),
        }
    }
}

// ── Conductivity model ───────────────────────────────────────────────

/// Per-layer Cole–Cole dispersion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColeCole {
    /// Chargeability, in [0, 1).
    pub eta: Vec<f64>,
    /// Time constant (s), > 0.
    pub tau: Vec<f64>,
    /// Frequency exponent, in (0, 1].
    pub c: Vec<f64>,
}

impl ColeCole {
    pub fn validate(&self, n_layer: usize) -> Em1dResult<()> {
        for (name, values) in [("eta", &self.eta), ("tau", &self.tau), ("c", &self.c)] {
            if values.len() != n_layer {
                return Err(Em1dError::dimension(
                    format!("cole_cole.{name}"),
                    n_layer,
                    values.len(),
                ));
            }
        }
        for k in 0..n_layer {
            let (eta, tau, c) = (self.eta[k], self.tau[k], self.c[k]);
            if !eta.is_finite() || !(0.0..1.0).contains(&eta) {
                return Err(Em1dError::PhysicsViolation(format!(
                    "cole_cole.eta[{k}] must be in [0, 1), got {eta}"
                )));
            }
            if !tau.is_finite() || tau <= 0.0 {
                return Err(Em1dError::PhysicsViolation(format!(
                    "cole_cole.tau[{k}] must be finite and > 0, got {tau}"
                )));
            }
            if !c.is_finite() || c <= 0.0 || c > 1.0 {
                return Err(Em1dError::PhysicsViolation(format!(
                    "cole_cole.c[{k}] must be in (0, 1], got {c}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConductivityModel {
    /// Frequency-independent real conductivity.
    #[default]
    Real,
    /// Dispersive complex conductivity; the model vector holds σ∞.
    ColeCole(ColeCole),
}

impl ConductivityModel {
    pub fn validate(&self, n_layer: usize) -> Em1dResult<()> {
        match self {
            ConductivityModel::Real => Ok(()),
            ConductivityModel::ColeCole(cc) => cc.validate(n_layer),
        }
    }
}

// ── Sounding ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundingGeometry {
    pub rx_location: [f64; 3],
    pub src_location: [f64; 3],
    pub topo: [f64; 3],
    pub source: SourceGeometry,
}

impl SoundingGeometry {
    /// Receiver height above the topography, `z = rx_z − topo_z`.
    pub fn receiver_height(&self) -> f64 {
        self.rx_location[2] - self.topo[2]
    }

    /// Source height above the topography, `h = src_z − topo_z`.
    pub fn source_height(&self) -> f64 {
        self.src_location[2] - self.topo[2]
    }

    pub fn validate(&self) -> Em1dResult<()> {
        self.source.validate()?;
        let all_finite = self
            .rx_location
            .iter()
            .chain(self.src_location.iter())
            .chain(self.topo.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Em1dError::ConfigError(
                "sounding locations must be finite".to_string(),
            ));
        }
        if self.receiver_height() < 0.0 || self.source_height() < 0.0 {
            return Err(Em1dError::PhysicsViolation(format!(
                "source and receiver must lie above the topography (z={}, h={})",
                self.receiver_height(),
                self.source_height()
            )));
        }
        Ok(())
    }
}

/// Earth-side switches carried by every sounding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SoundingPhysics {
    #[serde(default)]
    pub field_type: FieldType,
    /// Collapse the stack to the top layer as a homogeneous half-space.
    #[serde(default)]
    pub half_space: bool,
    #[serde(default)]
    pub conductivity: ConductivityModel,
    /// Per-layer magnetic susceptibility; zero when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chi: Option<Vec<f64>>,
}

impl SoundingPhysics {
    pub fn validate(&self, n_layer: usize) -> Em1dResult<()> {
        self.conductivity.validate(n_layer)?;
        if let Some(chi) = &self.chi {
            if chi.len() != n_layer {
                return Err(Em1dError::dimension("chi", n_layer, chi.len()));
            }
            if chi.iter().any(|&x| !x.is_finite() || x <= -1.0) {
                return Err(Em1dError::PhysicsViolation(
                    "susceptibility must be finite and > -1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyChannels {
    /// Frequencies (Hz), > 0.
    pub frequencies: Vec<f64>,
    #[serde(default)]
    pub components: FrequencyComponents,
    #[serde(default)]
    pub units: FrequencyUnits,
}

impl FrequencyChannels {
    pub fn n_channels(&self) -> usize {
        self.frequencies.len() * self.components.channels_per_frequency()
    }

    pub fn validate(&self) -> Em1dResult<()> {
        validate_positive_list("frequencies", &self.frequencies)
    }
}

/// Transmitter current waveform, normalized to unit peak current.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    /// Instantaneous shut-off at t = 0 after a long on-time.
    #[default]
    StepOff,
    /// Linear ramps between `(times[k], currents[k])`; times ≤ 0, strictly increasing,
    /// current zero at both ends.
    PiecewiseLinear { times: Vec<f64>, currents: Vec<f64> },
}

impl Waveform {
    pub fn validate(&self) -> Em1dResult<()> {
        let Waveform::PiecewiseLinear { times, currents } = self else {
            return Ok(());
        };
        if times.len() != currents.len() {
            return Err(Em1dError::dimension(
                "waveform.currents",
                times.len(),
                currents.len(),
            ));
        }
        if times.len() < 2 {
            return Err(Em1dError::ConfigError(
                "piecewise-linear waveform needs at least 2 nodes".to_string(),
            ));
        }
        if times
            .iter()
            .chain(currents.iter())
            .any(|v| !v.is_finite())
        {
            return Err(Em1dError::ConfigError(
                "waveform nodes must be finite".to_string(),
            ));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Em1dError::ConfigError(
                "waveform times must be strictly increasing".to_string(),
            ));
        }
        if times[times.len() - 1] > 0.0 {
            return Err(Em1dError::ConfigError(
                "waveform must end at or before t = 0".to_string(),
            ));
        }
        let (first, last) = (currents[0], currents[currents.len() - 1]);
        if first.abs() > 1e-12 || last.abs() > 1e-12 {
            return Err(Em1dError::ConfigError(format!(
                "waveform current must start and end at zero, got {first} and {last}"
            )));
        }
        Ok(())
    }
}

/// One transmitter moment: gate times, waveform and pulse train.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeMoment {
    /// Gate centres (s) after the end of the waveform, > 0.
    pub times: Vec<f64>,
    #[serde(default)]
    pub waveform: Waveform,
    #[serde(default)]
    pub quantity: TimeQuantity,
    /// Bipolar half-periods summed (ignored for step-off).
    #[serde(default = "default_n_pulse")]
    pub n_pulse: usize,
    #[serde(default = "default_base_frequency")]
    pub base_frequency: f64,
}

fn default_n_pulse() -> usize {
    DEFAULT_N_PULSE
}
fn default_base_frequency() -> f64 {
    DEFAULT_BASE_FREQUENCY
}

impl TimeMoment {
    pub fn step_off(times: Vec<f64>, quantity: TimeQuantity) -> Self {
        TimeMoment {
            times,
            waveform: Waveform::StepOff,
            quantity,
            n_pulse: default_n_pulse(),
            base_frequency: default_base_frequency(),
        }
    }

    pub fn validate(&self) -> Em1dResult<()> {
        validate_positive_list("times", &self.times)?;
        self.waveform.validate()?;
        if let Waveform::PiecewiseLinear { .. } = self.waveform {
            if self.n_pulse == 0 {
                return Err(Em1dError::ConfigError(
                    "n_pulse must be >= 1".to_string(),
                ));
            }
            if !self.base_frequency.is_finite() || self.base_frequency <= 0.0 {
                return Err(Em1dError::ConfigError(format!(
                    "base_frequency must be finite and > 0, got {}",
                    self.base_frequency
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeChannels {
    pub moment: TimeMoment,
    /// Optional second moment sharing the earth model; its channels are appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dual_moment: Option<TimeMoment>,
    /// First-order receiver low-pass cutoff (Hz).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_pass_cutoff: Option<f64>,
}

impl TimeChannels {
    pub fn n_channels(&self) -> usize {
        self.moment.times.len() + self.dual_moment.as_ref().map_or(0, |m| m.times.len())
    }

    pub fn validate(&self) -> Em1dResult<()> {
        self.moment.validate()?;
        if let Some(dual) = &self.dual_moment {
            dual.validate()?;
        }
        if let Some(fc) = self.low_pass_cutoff {
            if !fc.is_finite() || fc <= 0.0 {
                return Err(Em1dError::ConfigError(format!(
                    "low_pass_cutoff must be finite and > 0, got {fc}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channels {
    Frequency(FrequencyChannels),
    Time(TimeChannels),
}

/// One independent source/receiver/earth site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sounding {
    pub geometry: SoundingGeometry,
    #[serde(default)]
    pub physics: SoundingPhysics,
    pub channels: Channels,
}

impl Sounding {
    pub fn n_channels(&self) -> usize {
        match &self.channels {
            Channels::Frequency(ch) => ch.n_channels(),
            Channels::Time(ch) => ch.n_channels(),
        }
    }

    pub fn validate(&self, n_layer: usize) -> Em1dResult<()> {
        self.geometry.validate()?;
        self.physics.validate(n_layer)?;
        match &self.channels {
            Channels::Frequency(ch) => {
                if ch.units == FrequencyUnits::Ppm && self.physics.field_type == FieldType::Total {
                    return Err(Em1dError::ConfigError(
                        "ppm units are only defined for the secondary field".to_string(),
                    ));
                }
                ch.validate()
            }
            Channels::Time(ch) => ch.validate(),
        }
    }
}

fn validate_positive_list(name: &str, values: &[f64]) -> Em1dResult<()> {
    if values.is_empty() {
        return Err(Em1dError::ConfigError(format!("{name} must not be empty")));
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
        return Err(Em1dError::ConfigError(format!(
            "{name} must be finite and > 0, got {v}"
        )));
    }
    Ok(())
}

// ── Column-form survey tables ────────────────────────────────────────

/// Columns shared by frequency- and time-domain tables, one row per sounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryColumns {
    /// `(n_sounding, 3)`
    pub rx_locations: Array2<f64>,
    /// `(n_sounding, 3)`
    pub src_locations: Array2<f64>,
    /// `(n_sounding, 3)`
    pub topo: Array2<f64>,
    /// Source-type names, e.g. `"vmd"` or `"circular_loop"`.
    pub source_type: Vec<String>,
    /// Dipole offset or loop radius (m).
    pub size: Array1<f64>,
    /// Loop current (A); ignored for dipoles.
    pub current: Array1<f64>,
    pub field_type: Vec<String>,
    #[serde(default)]
    pub half_space: bool,
    /// Optional `(n_sounding, n_layer)` susceptibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chi: Option<Array2<f64>>,
    /// Conductivity model name per sounding: `"real"` or `"cole_cole"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conductivity_type: Option<Vec<String>>,
    /// `(n_sounding, n_layer)` Cole–Cole columns, required for `"cole_cole"` rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<Array2<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau: Option<Array2<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<Array2<f64>>,
}

impl GeometryColumns {
    pub fn n_sounding(&self) -> usize {
        self.rx_locations.nrows()
    }

    fn validate_shapes(&self, n_layer: usize) -> Em1dResult<()> {
        let n = self.n_sounding();
        for (name, arr) in [
            ("rx_locations", &self.rx_locations),
            ("src_locations", &self.src_locations),
            ("topo", &self.topo),
        ] {
            if arr.nrows() != n {
                return Err(Em1dError::dimension(name, n, arr.nrows()));
            }
            if arr.ncols() != 3 {
                return Err(Em1dError::dimension(format!("{name} columns"), 3, arr.ncols()));
            }
        }
        for (name, len) in [
            ("source_type", self.source_type.len()),
            ("size", self.size.len()),
            ("current", self.current.len()),
            ("field_type", self.field_type.len()),
        ] {
            if len != n {
                return Err(Em1dError::dimension(name, n, len));
            }
        }
        if let Some(kinds) = &self.conductivity_type {
            if kinds.len() != n {
                return Err(Em1dError::dimension("conductivity_type", n, kinds.len()));
            }
        }
        for (name, arr) in [
            ("chi", &self.chi),
            ("eta", &self.eta),
            ("tau", &self.tau),
            ("c", &self.c),
        ] {
            if let Some(arr) = arr {
                if arr.nrows() != n {
                    return Err(Em1dError::dimension(name, n, arr.nrows()));
                }
                if arr.ncols() != n_layer {
                    return Err(Em1dError::dimension(
                        format!("{name} columns"),
                        n_layer,
                        arr.ncols(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn row(&self, i: usize) -> Em1dResult<(SoundingGeometry, SoundingPhysics)> {
        let loc = |arr: &Array2<f64>| [arr[[i, 0]], arr[[i, 1]], arr[[i, 2]]];
        let geometry = SoundingGeometry {
            rx_location: loc(&self.rx_locations),
            src_location: loc(&self.src_locations),
            topo: loc(&self.topo),
            source: SourceGeometry::from_name(&self.source_type[i], self.size[i], self.current[i])?,
        };
        let conductivity = match self.conductivity_type.as_ref().map(|k| k[i].as_str()) {
            None => ConductivityModel::Real,
            Some(kind) => self.conductivity_model(kind, i)?,
        };
        let physics = SoundingPhysics {
            field_type: self.field_type[i].parse()?,
            half_space: self.half_space,
            conductivity,
            chi: self.chi.as_ref().map(|chi| chi.row(i).to_vec()),
        };
        Ok((geometry, physics))
    }

    fn conductivity_model(&self, kind: &str, i: usize) -> Em1dResult<ConductivityModel> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "real" => Ok(ConductivityModel::Real),
            "cole_cole" | "colecole" => match (&self.eta, &self.tau, &self.c) {
                (Some(eta), Some(tau), Some(c)) => Ok(ConductivityModel::ColeCole(ColeCole {
                    eta: eta.row(i).to_vec(),
                    tau: tau.row(i).to_vec(),
                    c: c.row(i).to_vec(),
                })),
                _ => Err(Em1dError::ConfigError(
                    "cole_cole rows require eta, tau and c columns".to_string(),
                )),
            },
            _ => Err(Em1dError::UnsupportedConductivity(kind.to_string())),
        }
    }
}

/// Frequency-domain survey in column form with a shared frequency list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencySurveyTable {
    #[serde(flatten)]
    pub geometry: GeometryColumns,
    pub frequencies: Vec<f64>,
    /// Component selection name, e.g. `"both"` or `"amplitude_phase"`.
    pub components: String,
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_units() -> String {
    "field".to_string()
}

impl FrequencySurveyTable {
    pub fn from_file(path: &str) -> Em1dResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn n_sounding(&self) -> usize {
        self.geometry.n_sounding()
    }

    /// Expand into one validated [`Sounding`] per row.
    pub fn soundings(&self, n_layer: usize) -> Em1dResult<Vec<Sounding>> {
        self.geometry.validate_shapes(n_layer)?;
        let channels = FrequencyChannels {
            frequencies: self.frequencies.clone(),
            components: self.components.parse()?,
            units: self.units.parse()?,
        };
        (0..self.n_sounding())
            .map(|i| {
                let (geometry, physics) = self.geometry.row(i)?;
                let sounding = Sounding {
                    geometry,
                    physics,
                    channels: Channels::Frequency(channels.clone()),
                };
                sounding.validate(n_layer)?;
                Ok(sounding)
            })
            .collect()
    }
}

/// Time-domain survey in column form.
///
/// Gates, waveform, pulse train and low-pass cutoff are per sounding, so rows
/// may carry different channel counts. `dual_moment` and `low_pass_cutoff`
/// may be left empty, meaning `None` on every row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSurveyTable {
    #[serde(flatten)]
    pub geometry: GeometryColumns,
    pub moment: Vec<TimeMoment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dual_moment: Vec<Option<TimeMoment>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub low_pass_cutoff: Vec<Option<f64>>,
}

impl TimeSurveyTable {
    pub fn from_file(path: &str) -> Em1dResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn n_sounding(&self) -> usize {
        self.geometry.n_sounding()
    }

    fn validate_shapes(&self, n_layer: usize) -> Em1dResult<()> {
        self.geometry.validate_shapes(n_layer)?;
        let n = self.n_sounding();
        if self.moment.len() != n {
            return Err(Em1dError::dimension("moment", n, self.moment.len()));
        }
        for (name, len) in [
            ("dual_moment", self.dual_moment.len()),
            ("low_pass_cutoff", self.low_pass_cutoff.len()),
        ] {
            if len != 0 && len != n {
                return Err(Em1dError::dimension(name, n, len));
            }
        }
        Ok(())
    }

    fn channels(&self, i: usize) -> TimeChannels {
        TimeChannels {
            moment: self.moment[i].clone(),
            dual_moment: self.dual_moment.get(i).cloned().flatten(),
            low_pass_cutoff: self.low_pass_cutoff.get(i).copied().flatten(),
        }
    }

    /// Expand into one validated [`Sounding`] per row.
    pub fn soundings(&self, n_layer: usize) -> Em1dResult<Vec<Sounding>> {
        self.validate_shapes(n_layer)?;
        (0..self.n_sounding())
            .map(|i| {
                let (geometry, physics) = self.geometry.row(i)?;
                let sounding = Sounding {
                    geometry,
                    physics,
                    channels: Channels::Time(self.channels(i)),
                };
                sounding.validate(n_layer)?;
                Ok(sounding)
            })
            .collect()
    }
}
