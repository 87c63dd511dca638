// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    DEFAULT_HANKEL_POINTS_PER_DECADE, DEFAULT_SINE_POINTS_PER_DECADE,
    DEFAULT_TIME_POINTS_PER_DECADE,
};
use crate::error::{Em1dError, Em1dResult};
use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
/// Maps 1:1 to configs/em1d_default.json.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Em1dConfig {
    /// Layer thicknesses (m), shared by every sounding. Required by the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thicknesses: Option<Vec<f64>>,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub jacobian: JacobianConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Fan soundings out over a worker pool (default: false).
    #[serde(default)]
    pub parallel: bool,
    /// Pool size; `None` means one worker per logical CPU.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_workers: Option<usize>,
    /// Run per-block Jacobian products on the pool as well (default: false).
    #[serde(default)]
    pub parallel_products: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            parallel: false,
            n_workers: None,
            parallel_products: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JacobianConfig {
    /// Keep per-sounding dense blocks instead of assembling one sparse matrix.
    #[serde(default)]
    pub block_products: bool,
    /// Reuse the cached Jacobian after the model changes.
    #[serde(default)]
    pub fix_jacobian: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Optional `.npz` archive with `YBASE`, `WT0`, `WT1`.
    /// When absent a filter is designed at first use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npz_path: Option<String>,
    /// Density of the designed Hankel filter (default: 20).
    #[serde(default = "default_points_per_decade")]
    pub points_per_decade: usize,
    /// Density of the designed sine filter for time-domain transforms (default: 20).
    #[serde(default = "default_sine_points_per_decade")]
    pub sine_points_per_decade: usize,
    /// Density of the broadband frequency grid for time-domain soundings (default: 10).
    #[serde(default = "default_time_points_per_decade")]
    pub time_points_per_decade: usize,
}

fn default_points_per_decade() -> usize {
    DEFAULT_HANKEL_POINTS_PER_DECADE
}
fn default_sine_points_per_decade() -> usize {
    DEFAULT_SINE_POINTS_PER_DECADE
}
fn default_time_points_per_decade() -> usize {
    DEFAULT_TIME_POINTS_PER_DECADE
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            npz_path: None,
            points_per_decade: default_points_per_decade(),
            sine_points_per_decade: default_sine_points_per_decade(),
            time_points_per_decade: default_time_points_per_decade(),
        }
    }
}

impl Em1dConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> Em1dResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_thicknesses(thicknesses: Vec<f64>) -> Self {
        Em1dConfig {
            thicknesses: Some(thicknesses),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Em1dResult<()> {
        if let Some(thicknesses) = &self.thicknesses {
            validate_thicknesses(thicknesses)?;
        }
        if self.execution.n_workers == Some(0) {
            return Err(Em1dError::ConfigError(
                "execution.n_workers must be >= 1".to_string(),
            ));
        }
        if !(5..=200).contains(&self.filter.points_per_decade) {
            return Err(Em1dError::ConfigError(format!(
                "filter.points_per_decade must be in [5, 200], got {}",
                self.filter.points_per_decade
            )));
        }
        if !(5..=200).contains(&self.filter.sine_points_per_decade) {
            return Err(Em1dError::ConfigError(format!(
                "filter.sine_points_per_decade must be in [5, 200], got {}",
                self.filter.sine_points_per_decade
            )));
        }
        if !(2..=100).contains(&self.filter.time_points_per_decade) {
            return Err(Em1dError::ConfigError(format!(
                "filter.time_points_per_decade must be in [2, 100], got {}",
                self.filter.time_points_per_decade
            )));
        }
        Ok(())
    }
}

/// Thicknesses must be non-empty, finite and > 0.
pub fn validate_thicknesses(thicknesses: &[f64]) -> Em1dResult<()> {
    if thicknesses.is_empty() {
        return Err(Em1dError::ConfigError(
            "thicknesses must contain at least one layer".to_string(),
        ));
    }
    if let Some((idx, &h)) = thicknesses
        .iter()
        .enumerate()
        .find(|(_, h)| !h.is_finite() || **h <= 0.0)
    {
        return Err(Em1dError::ConfigError(format!(
            "thicknesses[{idx}] must be finite and > 0, got {h}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/em1d-types/, two levels below the root.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
    }

    fn config_path(relative: &str) -> String {
        project_root().join(relative).to_string_lossy().to_string()
    }

    #[test]
    fn test_load_default_config() {
        let cfg = Em1dConfig::from_file(&config_path("configs/em1d_default.json")).unwrap();
        let thick = cfg.thicknesses.as_ref().unwrap();
        assert_eq!(thick.len(), 3);
        assert!((thick[0] - 10.0).abs() < 1e-12);
        assert!(!cfg.execution.parallel);
        assert!(!cfg.jacobian.fix_jacobian);
        assert_eq!(cfg.filter.points_per_decade, 20);
        assert_eq!(cfg.filter.sine_points_per_decade, 20);
        assert_eq!(cfg.filter.time_points_per_decade, 10);
        assert!(cfg.filter.npz_path.is_none());
    }

    #[test]
    fn test_missing_sections_take_defaults() {
        let cfg: Em1dConfig = serde_json::from_str(r#"{ "thicknesses": [5.0, 5.0] }"#).unwrap();
        assert!(!cfg.execution.parallel);
        assert!(cfg.execution.n_workers.is_none());
        assert!(!cfg.jacobian.block_products);
        assert_eq!(cfg.filter.points_per_decade, DEFAULT_HANKEL_POINTS_PER_DECADE);
        assert_eq!(cfg.filter.sine_points_per_decade, DEFAULT_SINE_POINTS_PER_DECADE);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut cfg = Em1dConfig::with_thicknesses(vec![1.0, 1.0]);
        cfg.execution.n_workers = Some(0);
        match cfg.validate().unwrap_err() {
            Em1dError::ConfigError(msg) => assert!(msg.contains("n_workers")),
            other => panic!("Expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_thickness() {
        assert!(validate_thicknesses(&[]).is_err());
        assert!(validate_thicknesses(&[10.0, 0.0]).is_err());
        assert!(validate_thicknesses(&[10.0, f64::NAN]).is_err());
        assert!(validate_thicknesses(&[10.0, -1.0]).is_err());
        assert!(validate_thicknesses(&[10.0, 50.0, 50.0]).is_ok());
    }

    #[test]
    fn test_rejects_filter_density_out_of_range() {
        let mut cfg = Em1dConfig::default();
        cfg.filter.points_per_decade = 2;
        assert!(cfg.validate().is_err());
        cfg.filter.points_per_decade = 20;
        cfg.filter.time_points_per_decade = 0;
        assert!(cfg.validate().is_err());
        cfg.filter.time_points_per_decade = 10;
        cfg.filter.sine_points_per_decade = 400;
        match cfg.validate().unwrap_err() {
            Em1dError::ConfigError(msg) => assert!(msg.contains("sine_points_per_decade")),
            other => panic!("Expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn test_filter_densities_are_independent() {
        let cfg: Em1dConfig = serde_json::from_str(
            r#"{ "filter": { "points_per_decade": 40, "sine_points_per_decade": 12 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.filter.points_per_decade, 40);
        assert_eq!(cfg.filter.sine_points_per_decade, 12);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let mut cfg = Em1dConfig::with_thicknesses(vec![10.0, 50.0, 50.0]);
        cfg.execution.parallel = true;
        cfg.execution.n_workers = Some(3);
        cfg.jacobian.block_products = true;
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: Em1dConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.thicknesses, cfg2.thicknesses);
        assert_eq!(cfg2.execution.n_workers, Some(3));
        assert!(cfg2.jacobian.block_products);
    }

    #[test]
    fn test_thicknesses_roundtrip_bit_exact() {
        let thick = vec![104.36798086182003, 0.1 + 0.2, 1.0 / 3.0, 7.000000000000001];
        let cfg = Em1dConfig::with_thicknesses(thick.clone());
        let cfg2: Em1dConfig = serde_json::from_str(&serde_json::to_string(&cfg).unwrap()).unwrap();
        let back = cfg2.thicknesses.unwrap();
        for (a, b) in thick.iter().zip(&back) {
            assert_eq!(a.to_bits(), b.to_bits(), "{a} came back as {b}");
        }
    }
}
