// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Global Multi-Sounding Orchestrator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Survey-wide forward modelling and block-diagonal sensitivities.
//!
//! The global model is a flat vector of `n_sounding × n_layer` entries,
//! sounding-major. It is mapped to conductivity, split into rows, and each row
//! is simulated independently. Data are concatenated in sounding order and the
//! sensitivity is block-diagonal with one `(n_channels_i, n_layer)` block per
//! sounding.

use crate::dispatch::Dispatcher;
use crate::layers::LayerStack;
use crate::mapping::ConductivityMap;
use crate::simulation::{simulate, FilterSet, SimulationMode, SoundingInput};
use em1d_math::filter::{HankelFilter, SineFilter};
use em1d_math::sparse::{BlockDiagonal, CsrMatrix, LinearOperator};
use em1d_types::config::{Em1dConfig, FilterConfig};
use em1d_types::constants::{DEFAULT_HANKEL_POINTS_PER_DECADE, DEFAULT_SINE_POINTS_PER_DECADE};
use em1d_types::error::{Em1dError, Em1dResult};
use em1d_types::survey::Sounding;
use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use std::ops::Range;
use std::sync::Arc;

// ── Sensitivity ──────────────────────────────────────────────────────

/// Block-diagonal Jacobian in either storage form.
#[derive(Debug, Clone)]
pub enum Sensitivity {
    Assembled(CsrMatrix),
    Blocks(BlockDiagonal),
}

impl Sensitivity {
    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            Sensitivity::Assembled(csr) => csr.to_dense(),
            Sensitivity::Blocks(blocks) => blocks.to_dense(),
        }
    }
}

impl LinearOperator for Sensitivity {
    fn nrows(&self) -> usize {
        match self {
            Sensitivity::Assembled(csr) => csr.nrows(),
            Sensitivity::Blocks(blocks) => blocks.nrows(),
        }
    }

    fn ncols(&self) -> usize {
        match self {
            Sensitivity::Assembled(csr) => csr.ncols(),
            Sensitivity::Blocks(blocks) => blocks.ncols(),
        }
    }

    fn matvec(&self, x: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        match self {
            Sensitivity::Assembled(csr) => csr.matvec(x),
            Sensitivity::Blocks(blocks) => blocks.matvec(x),
        }
    }

    fn rmatvec(&self, y: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        match self {
            Sensitivity::Assembled(csr) => csr.rmatvec(y),
            Sensitivity::Blocks(blocks) => blocks.rmatvec(y),
        }
    }
}

// ── Data index ───────────────────────────────────────────────────────

/// Half-open row range of the data vector owned by each sounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIndex {
    ranges: Vec<Range<usize>>,
}

impl DataIndex {
    pub fn from_counts(counts: impl IntoIterator<Item = usize>) -> Self {
        let mut start = 0;
        let ranges = counts
            .into_iter()
            .map(|n| {
                let r = start..start + n;
                start += n;
                r
            })
            .collect();
        DataIndex { ranges }
    }

    pub fn range(&self, sounding: usize) -> Range<usize> {
        self.ranges[sounding].clone()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn n_data(&self) -> usize {
        self.ranges.last().map_or(0, |r| r.end)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

// ── Model cache ──────────────────────────────────────────────────────

/// State memoized against the last model vector.
#[derive(Debug, Default)]
pub struct ModelCache {
    model: Option<Array1<f64>>,
    sigma: Option<Array2<f64>>,
    jacobian: Option<Sensitivity>,
    fix_jacobian: bool,
}

impl ModelCache {
    pub fn new(fix_jacobian: bool) -> Self {
        ModelCache {
            fix_jacobian,
            ..Default::default()
        }
    }

    /// Record `m` as the current model. Returns `true` if it differs from the last one.
    pub fn set_model(&mut self, m: ArrayView1<f64>) -> bool {
        if self.model.as_ref().is_some_and(|old| old.view() == m) {
            return false;
        }
        self.model = Some(m.to_owned());
        self.sigma = None;
        if !self.fix_jacobian {
            self.jacobian = None;
        } else if self.jacobian.is_some() {
            warn!("model changed; reusing fixed Jacobian from an earlier model");
        }
        debug!("model changed; cached conductivity invalidated");
        true
    }

    pub fn model(&self) -> Option<&Array1<f64>> {
        self.model.as_ref()
    }

    pub fn sigma(&self) -> Option<&Array2<f64>> {
        self.sigma.as_ref()
    }

    pub fn jacobian(&self) -> Option<&Sensitivity> {
        self.jacobian.as_ref()
    }

    pub fn fix_jacobian(&self) -> bool {
        self.fix_jacobian
    }

    /// Drop everything, including a fixed Jacobian.
    pub fn invalidate(&mut self) {
        self.model = None;
        self.sigma = None;
        self.jacobian = None;
        debug!("model cache cleared");
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────

pub struct GlobalEm1d {
    soundings: Vec<Sounding>,
    layers: LayerStack,
    filters: FilterSet,
    map: Box<dyn ConductivityMap>,
    dispatcher: Dispatcher,
    block_products: bool,
    parallel_products: bool,
    index: DataIndex,
    cache: ModelCache,
}

impl std::fmt::Debug for GlobalEm1d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalEm1d")
            .field("n_sounding", &self.n_sounding())
            .field("n_layer", &self.n_layer())
            .field("n_data", &self.n_data())
            .field("map", &self.map)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl GlobalEm1d {
    pub fn new(
        soundings: Vec<Sounding>,
        config: &Em1dConfig,
        map: Box<dyn ConductivityMap>,
    ) -> Em1dResult<Self> {
        config.validate()?;
        let thicknesses = config.thicknesses.clone().ok_or_else(|| {
            Em1dError::ConfigError("thicknesses are required for a global simulation".to_string())
        })?;
        let layers = LayerStack::new(thicknesses)?;
        if soundings.is_empty() {
            return Err(Em1dError::ConfigError(
                "at least one sounding is required".to_string(),
            ));
        }
        for (i, sounding) in soundings.iter().enumerate() {
            sounding
                .validate(layers.n_layer())
                .map_err(|e| e.in_sounding(i))?;
        }

        let (filters, filter_source) = build_filters(&config.filter)?;
        let dispatcher = Dispatcher::from_config(&config.execution)?;
        let index = DataIndex::from_counts(soundings.iter().map(Sounding::n_channels));

        info!(
            "GlobalEm1d: {} soundings x {} layers, {} data, {} ({} workers), {} Jacobian, hankel filter {}",
            soundings.len(),
            layers.n_layer(),
            index.n_data(),
            if dispatcher.is_parallel() { "parallel" } else { "serial" },
            dispatcher.n_workers(),
            if config.jacobian.block_products { "block" } else { "assembled" },
            filter_source
        );

        Ok(GlobalEm1d {
            soundings,
            layers,
            filters,
            map,
            dispatcher,
            block_products: config.jacobian.block_products,
            parallel_products: config.execution.parallel_products,
            index,
            cache: ModelCache::new(config.jacobian.fix_jacobian),
        })
    }

    pub fn n_sounding(&self) -> usize {
        self.soundings.len()
    }

    pub fn n_layer(&self) -> usize {
        self.layers.n_layer()
    }

    pub fn n_data(&self) -> usize {
        self.index.n_data()
    }

    pub fn n_model(&self) -> usize {
        self.n_sounding() * self.n_layer()
    }

    pub fn data_index(&self) -> &DataIndex {
        &self.index
    }

    pub fn soundings(&self) -> &[Sounding] {
        &self.soundings
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Conductivity matrix `(n_sounding, n_layer)` for model `m`.
    pub fn conductivity(&mut self, m: ArrayView1<f64>) -> Em1dResult<&Array2<f64>> {
        self.ensure_sigma(m)?;
        self.cache
            .sigma
            .as_ref()
            .ok_or_else(|| Em1dError::ConfigError("conductivity cache is empty".to_string()))
    }

    /// Predicted data for model `m`, concatenated in sounding order.
    pub fn forward(&mut self, m: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        let inputs = self.inputs(m)?;
        debug!(
            "forward: {} soundings, {} data",
            inputs.len(),
            self.n_data()
        );
        let parts = self
            .dispatcher
            .map(&inputs, |input| {
                simulate(input, SimulationMode::Forward).map(|out| out.data)
            })?;
        self.check_lengths(parts.iter().map(|p| p.len()))?;
        Ok(BlockDiagonal::concat(&parts))
    }

    /// Block-diagonal `∂d/∂m` at `m`, memoized.
    pub fn jacobian(&mut self, m: ArrayView1<f64>) -> Em1dResult<&Sensitivity> {
        self.ensure_jacobian(m)?;
        self.cached_jacobian()
    }

    /// `J v`
    pub fn jvec(&mut self, m: ArrayView1<f64>, v: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        if v.len() != self.n_model() {
            return Err(Em1dError::dimension("jvec input", self.n_model(), v.len()));
        }
        self.ensure_jacobian(m)?;
        let sens = self.cached_jacobian()?;
        match sens {
            Sensitivity::Blocks(blocks) if self.parallel_products => {
                let n_layer = self.n_layer();
                let ids: Vec<usize> = (0..blocks.n_blocks()).collect();
                let parts = self.dispatcher.map(&ids, |&i| {
                    let vi = v.slice(s![i * n_layer..(i + 1) * n_layer]);
                    Ok(blocks.block(i).dot(&vi))
                })?;
                Ok(BlockDiagonal::concat(&parts))
            }
            _ => sens.matvec(v),
        }
    }

    /// `Jᵀ v`
    pub fn jtvec(&mut self, m: ArrayView1<f64>, v: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        if v.len() != self.n_data() {
            return Err(Em1dError::dimension("jtvec input", self.n_data(), v.len()));
        }
        self.ensure_jacobian(m)?;
        let sens = self.cached_jacobian()?;
        match sens {
            Sensitivity::Blocks(blocks) if self.parallel_products => {
                let ids: Vec<usize> = (0..blocks.n_blocks()).collect();
                let parts = self.dispatcher.map(&ids, |&i| {
                    let vi = v.slice(s![self.index.range(i)]);
                    Ok(blocks.block(i).t().dot(&vi))
                })?;
                Ok(BlockDiagonal::concat(&parts))
            }
            _ => sens.rmatvec(v),
        }
    }

    fn cached_jacobian(&self) -> Em1dResult<&Sensitivity> {
        self.cache
            .jacobian
            .as_ref()
            .ok_or_else(|| Em1dError::ConfigError("Jacobian cache is empty".to_string()))
    }

    fn ensure_sigma(&mut self, m: ArrayView1<f64>) -> Em1dResult<()> {
        if m.len() != self.n_model() {
            return Err(Em1dError::dimension("model", self.n_model(), m.len()));
        }
        self.cache.set_model(m);
        if self.cache.sigma.is_none() {
            let sigma = self
                .map
                .forward(m)?
                .into_shape_with_order((self.n_sounding(), self.n_layer()))
                .map_err(|_| Em1dError::dimension("mapped conductivity", self.n_model(), m.len()))?;
            self.cache.sigma = Some(sigma);
        }
        Ok(())
    }

    fn ensure_jacobian(&mut self, m: ArrayView1<f64>) -> Em1dResult<()> {
        self.ensure_sigma(m)?;
        if self.cache.jacobian.is_some() {
            return Ok(());
        }
        let dsdm = self
            .map
            .derivative(m)?
            .into_shape_with_order((self.n_sounding(), self.n_layer()))
            .map_err(|_| Em1dError::dimension("map derivative", self.n_model(), m.len()))?;

        let inputs = self.inputs(m)?;
        debug!(
            "jacobian: {} soundings, {} x {} sensitivity",
            inputs.len(),
            self.n_data(),
            self.n_model()
        );
        let blocks = self.dispatcher.map(&inputs, |input| {
            simulate(input, SimulationMode::Jacobian)?
                .sensitivity
                .ok_or_else(|| {
                    Em1dError::PhysicsViolation("sounding produced no sensitivity".to_string())
                })
        })?;
        self.check_lengths(blocks.iter().map(|b| b.nrows()))?;

        let blocks: Vec<Array2<f64>> = blocks
            .into_iter()
            .zip(dsdm.outer_iter())
            .map(|(b, d)| b * &d.insert_axis(Axis(0)))
            .collect();
        self.cache.jacobian = Some(if self.block_products {
            Sensitivity::Blocks(BlockDiagonal::new(blocks))
        } else {
            Sensitivity::Assembled(CsrMatrix::block_diag(&blocks)?)
        });
        Ok(())
    }

    fn inputs(&mut self, m: ArrayView1<f64>) -> Em1dResult<Vec<SoundingInput>> {
        self.ensure_sigma(m)?;
        let sigma = self
            .cache
            .sigma
            .as_ref()
            .ok_or_else(|| Em1dError::ConfigError("conductivity cache is empty".to_string()))?;
        Ok(self
            .soundings
            .iter()
            .zip(sigma.outer_iter())
            .map(|(sounding, row)| SoundingInput {
                sounding: sounding.clone(),
                thicknesses: self.layers.shared(),
                sigma: row.to_vec(),
                filters: self.filters.clone(),
            })
            .collect())
    }

    fn check_lengths(&self, lengths: impl Iterator<Item = usize>) -> Em1dResult<()> {
        for (i, n) in lengths.enumerate() {
            let expected = self.index.range(i).len();
            if n != expected {
                return Err(Em1dError::dimension("sounding channels", expected, n).in_sounding(i));
            }
        }
        Ok(())
    }
}

fn build_filters(config: &FilterConfig) -> Em1dResult<(FilterSet, String)> {
    let (hankel, source) = match &config.npz_path {
        Some(path) => (Arc::new(HankelFilter::from_npz(path)?), path.clone()),
        None if config.points_per_decade == DEFAULT_HANKEL_POINTS_PER_DECADE => {
            (HankelFilter::designed(), "designed (shared)".to_string())
        }
        None => (
            Arc::new(HankelFilter::design(config.points_per_decade)?),
            format!("designed ({} per decade)", config.points_per_decade),
        ),
    };
    let sine = if config.sine_points_per_decade == DEFAULT_SINE_POINTS_PER_DECADE {
        SineFilter::designed()
    } else {
        Arc::new(SineFilter::design(config.sine_points_per_decade)?)
    };
    Ok((
        FilterSet {
            hankel,
            sine,
            time_points_per_decade: config.time_points_per_decade,
        },
        source,
    ))
}
