// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Sounding Dispatch
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Order-preserving fan-out of independent per-sounding work.

use em1d_types::config::ExecutionConfig;
use em1d_types::error::{Em1dError, Em1dResult};
use rayon::prelude::*;
use rayon::ThreadPool;

/// Runs a closure over a slice serially or on a dedicated rayon pool.
///
/// Results come back in input order. The first failure aborts the call and is
/// tagged with the index of the failing item.
#[derive(Debug)]
pub struct Dispatcher {
    pool: Option<ThreadPool>,
}

impl Dispatcher {
    pub fn serial() -> Self {
        Dispatcher { pool: None }
    }

    /// Pool of `n_workers` threads, or one per logical CPU.
    pub fn pooled(n_workers: Option<usize>) -> Em1dResult<Self> {
        let n = n_workers.unwrap_or_else(num_cpus::get);
        if n == 0 {
            return Err(Em1dError::ConfigError(
                "n_workers must be >= 1".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("em1d-worker-{i}"))
            .build()
            .map_err(|e| Em1dError::ConfigError(format!("failed to build worker pool: {e}")))?;
        Ok(Dispatcher { pool: Some(pool) })
    }

    pub fn from_config(execution: &ExecutionConfig) -> Em1dResult<Self> {
        if execution.parallel {
            Self::pooled(execution.n_workers)
        } else {
            Ok(Self::serial())
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub fn n_workers(&self) -> usize {
        self.pool.as_ref().map_or(1, |p| p.current_num_threads())
    }

    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Em1dResult<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Em1dResult<R> + Sync,
    {
        let run = |(i, item): (usize, &T)| f(item).map_err(|e| e.in_sounding(i));
        match &self.pool {
            None => items.iter().enumerate().map(run).collect(),
            Some(pool) => pool.install(|| items.par_iter().enumerate().map(run).collect()),
        }
    }
}
