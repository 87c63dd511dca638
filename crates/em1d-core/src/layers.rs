// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Layer Stack
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use em1d_types::config::validate_thicknesses;
use em1d_types::error::Em1dResult;
use std::sync::Arc;

/// Layer thicknesses shared by every sounding of a survey.
///
/// Layer 0 sits directly below the air; the last layer is semi-infinite and
/// its thickness entry is carried but unused.
#[derive(Debug, Clone)]
pub struct LayerStack {
    thicknesses: Arc<Vec<f64>>,
}

impl LayerStack {
    pub fn new(thicknesses: Vec<f64>) -> Em1dResult<Self> {
        validate_thicknesses(&thicknesses)?;
        Ok(LayerStack {
            thicknesses: Arc::new(thicknesses),
        })
    }

    pub fn n_layer(&self) -> usize {
        self.thicknesses.len()
    }

    pub fn thicknesses(&self) -> &[f64] {
        &self.thicknesses
    }

    pub fn shared(&self) -> Arc<Vec<f64>> {
        Arc::clone(&self.thicknesses)
    }
}
