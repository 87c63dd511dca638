// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::f64::consts::PI;

/// Vacuum permeability (H/m).
pub const MU0: f64 = 4.0e-7 * PI;

/// Parts-per-million scaling for normalized secondary fields.
pub const PPM: f64 = 1.0e6;

/// Default Hankel filter density (abscissae per decade of λr).
pub const DEFAULT_HANKEL_POINTS_PER_DECADE: usize = 20;

/// Default sine filter density (abscissae per decade of ωt).
pub const DEFAULT_SINE_POINTS_PER_DECADE: usize = 20;

/// Default density of the broadband frequency grid used by time-domain soundings.
pub const DEFAULT_TIME_POINTS_PER_DECADE: usize = 10;

/// Default number of bipolar half-periods summed for periodic waveforms.
pub const DEFAULT_N_PULSE: usize = 2;

/// Default transmitter base frequency (Hz).
pub const DEFAULT_BASE_FREQUENCY: f64 = 30.0;
