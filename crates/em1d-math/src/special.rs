// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Special Functions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Complex log-gamma and the Mellin transforms of Bessel-type kernels.
//!
//! Uses the Lanczos approximation (g = 7, 9 coefficients), accurate to
//! ~1e-15 relative for Re z >= 0.5, which is the only half-plane the filter
//! designer needs.

use num_complex::Complex64;
use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;

const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// ln Γ(z) for complex z with Re z >= 0.5.
///
/// The imaginary part is not reduced to the principal branch; callers only
/// exponentiate differences of log-gammas.
pub fn ln_gamma(z: Complex64) -> Complex64 {
    debug_assert!(z.re >= 0.5, "ln_gamma requires Re z >= 0.5, got {z}");

    let z = z - 1.0;
    let mut x = Complex64::new(LANCZOS_COEFFS[0], 0.0);
    for (i, &c) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += c / (z + i as f64);
    }
    let t = z + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (z + 0.5) * t.ln() - t + x.ln()
}

/// Mellin transform of `c · y^p · J_ν(y)` evaluated at `s = 1 + p + i k`.
///
/// `M(k) = c · 2^{p + ik} · Γ((ν + p + 1 + ik)/2) / Γ((ν − p + 1 − ik)/2)`
pub fn bessel_mellin(nu: f64, p: f64, scale: f64, k: f64) -> Complex64 {
    let num = ln_gamma(Complex64::new(0.5 * (nu + p + 1.0), 0.5 * k));
    let den = ln_gamma(Complex64::new(0.5 * (nu - p + 1.0), -0.5 * k));
    let pow2 = Complex64::new(p, k) * std::f64::consts::LN_2;
    scale * (pow2 + num - den).exp()
}

/// Mellin transform of `J_n(y)`, used for Hankel filters of order n.
pub fn hankel_mellin(order: u32, k: f64) -> Complex64 {
    bessel_mellin(order as f64, 0.0, 1.0, k)
}

/// Mellin transform of `sin(y) = sqrt(π y / 2) J_{1/2}(y)`.
pub fn sine_mellin(k: f64) -> Complex64 {
    bessel_mellin(0.5, 0.5, (0.5 * PI).sqrt(), k)
}
