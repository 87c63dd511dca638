// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Error Taxonomy
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Em1dError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported source type: {0}")]
    UnsupportedSource(String),

    #[error("Unsupported conductivity model: {0}")]
    UnsupportedConductivity(String),

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    /// Failure of one sounding inside an aggregate forward/Jacobian call.
    #[error("Sounding {index} failed: {source}")]
    Sounding {
        index: usize,
        #[source]
        source: Box<Em1dError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Em1dError {
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Em1dError::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Tag an error with the sounding it came from. Already-tagged errors pass through.
    pub fn in_sounding(self, index: usize) -> Self {
        match self {
            tagged @ Em1dError::Sounding { .. } => tagged,
            other => Em1dError::Sounding {
                index,
                source: Box::new(other),
            },
        }
    }
}

pub type Em1dResult<T> = Result<T, Em1dError>;
