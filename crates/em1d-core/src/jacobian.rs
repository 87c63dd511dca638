// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Finite-Difference Jacobian Utilities
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Numerical references for the analytic sensitivities.
//!
//! [`fd_jacobian`] builds a dense centered-difference Jacobian of any forward
//! map. [`derivative_check`] runs the Taylor test
//! `‖F(m + h·dm) − F(m) − h·J dm‖ = O(h²)` over a sequence of shrinking steps.

use em1d_types::error::{Em1dError, Em1dResult};
use ndarray::{Array1, Array2, ArrayView1};

fn validate_step(step: f64) -> Em1dResult<()> {
    if !step.is_finite() || step <= 0.0 {
        return Err(Em1dError::ConfigError(
            "jacobian fd step must be finite and > 0".to_string(),
        ));
    }
    Ok(())
}

/// Centered finite-difference Jacobian, one column per model entry.
pub fn fd_jacobian<F>(mut forward: F, m: ArrayView1<f64>, step: f64) -> Em1dResult<Array2<f64>>
where
    F: FnMut(ArrayView1<f64>) -> Em1dResult<Array1<f64>>,
{
    validate_step(step)?;
    let mut jac: Option<Array2<f64>> = None;
    let mut shifted = m.to_owned();
    for col in 0..m.len() {
        shifted[col] = m[col] + step;
        let plus = forward(shifted.view())?;
        shifted[col] = m[col] - step;
        let minus = forward(shifted.view())?;
        shifted[col] = m[col];

        let out = jac.get_or_insert_with(|| Array2::zeros((plus.len(), m.len())));
        if plus.len() != out.nrows() || minus.len() != out.nrows() {
            return Err(Em1dError::dimension(
                "fd forward output",
                out.nrows(),
                plus.len().max(minus.len()),
            ));
        }
        out.column_mut(col)
            .assign(&((&plus - &minus) / (2.0 * step)));
    }
    jac.ok_or_else(|| Em1dError::ConfigError("fd jacobian needs a non-empty model".to_string()))
}

/// Taylor-test outcome: first- and second-order residual norms per step.
#[derive(Debug, Clone)]
pub struct DerivativeCheck {
    pub steps: Vec<f64>,
    /// `‖F(m + h dm) − F(m)‖`
    pub first_order: Vec<f64>,
    /// `‖F(m + h dm) − F(m) − h J dm‖`
    pub second_order: Vec<f64>,
}

impl DerivativeCheck {
    /// Observed convergence order of the second-order residual between successive steps.
    pub fn orders(&self) -> Vec<f64> {
        self.second_order
            .windows(2)
            .zip(self.steps.windows(2))
            .map(|(r, h)| (r[0] / r[1]).log10() / (h[0] / h[1]).log10())
            .collect()
    }

    /// True once the residual converges at close to second order.
    ///
    /// Steps whose residual sits at round-off level relative to the first-order
    /// residual are skipped.
    pub fn passed(&self, min_order: f64) -> bool {
        let orders = self.orders();
        let resolved: Vec<f64> = orders
            .iter()
            .enumerate()
            .filter(|&(i, _)| self.second_order[i + 1] > 1e-11 * self.first_order[i + 1])
            .map(|(_, &o)| o)
            .collect();
        !resolved.is_empty() && resolved.iter().filter(|&&o| o >= min_order).count() * 2 >= resolved.len()
    }
}

/// Taylor test of `forward` around `m` in direction `dm`, given `jdm = J(m)·dm`.
pub fn derivative_check<F>(
    mut forward: F,
    m: ArrayView1<f64>,
    dm: ArrayView1<f64>,
    jdm: ArrayView1<f64>,
    steps: &[f64],
) -> Em1dResult<DerivativeCheck>
where
    F: FnMut(ArrayView1<f64>) -> Em1dResult<Array1<f64>>,
{
    if dm.len() != m.len() {
        return Err(Em1dError::dimension("derivative check direction", m.len(), dm.len()));
    }
    for &h in steps {
        validate_step(h)?;
    }
    let f0 = forward(m)?;
    if jdm.len() != f0.len() {
        return Err(Em1dError::dimension("derivative check J dm", f0.len(), jdm.len()));
    }
    let norm = |v: &Array1<f64>| v.dot(v).sqrt();

    let mut first_order = Vec::with_capacity(steps.len());
    let mut second_order = Vec::with_capacity(steps.len());
    for &h in steps {
        let mh = &m + &(&dm * h);
        let fh = forward(mh.view())?;
        let r1 = &fh - &f0;
        let r2 = &r1 - &(&jdm * h);
        first_order.push(norm(&r1));
        second_order.push(norm(&r2));
        log::debug!(
            "derivative check h={h:.1e}: |r1|={:.3e}, |r2|={:.3e}",
            first_order[first_order.len() - 1],
            second_order[second_order.len() - 1]
        );
    }
    Ok(DerivativeCheck {
        steps: steps.to_vec(),
        first_order,
        second_order,
    })
}
