// ─────────────────────────────────────────────────────────────────────
// SCPN EM1D — Sparse Operators
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Block-diagonal sensitivity storage.
//!
//! Two interchangeable representations of the same operator: an assembled
//! CSR matrix backed by `faer` and an ordered list of dense blocks. Both
//! implement [`LinearOperator`] so callers can form `J v` and `Jᵀ v` without
//! caring which one they hold.

use em1d_types::error::{Em1dError, Em1dResult};
use faer::sparse::{SparseRowMat, Triplet};
use ndarray::{s, Array1, Array2, ArrayView1};
use std::ops::Range;

/// Matrix-free product interface.
pub trait LinearOperator {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;

    /// `A x`
    fn matvec(&self, x: ArrayView1<f64>) -> Em1dResult<Array1<f64>>;

    /// `Aᵀ y`
    fn rmatvec(&self, y: ArrayView1<f64>) -> Em1dResult<Array1<f64>>;
}

fn check_len(context: &str, expected: usize, actual: usize) -> Em1dResult<()> {
    if expected != actual {
        return Err(Em1dError::dimension(context, expected, actual));
    }
    Ok(())
}

/// Compressed sparse row matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    matrix: SparseRowMat<usize, f64>,
}

impl CsrMatrix {
    /// Assemble `diag(B_0, B_1, …)` with every entry of every block stored.
    pub fn block_diag(blocks: &[Array2<f64>]) -> Em1dResult<Self> {
        let nrows: usize = blocks.iter().map(|b| b.nrows()).sum();
        let ncols: usize = blocks.iter().map(|b| b.ncols()).sum();
        let nnz: usize = blocks.iter().map(|b| b.len()).sum();

        let mut triplets = Vec::with_capacity(nnz);
        let (mut row0, mut col0) = (0, 0);
        for block in blocks {
            for ((i, j), &v) in block.indexed_iter() {
                triplets.push(Triplet::new(row0 + i, col0 + j, v));
            }
            row0 += block.nrows();
            col0 += block.ncols();
        }

        let matrix = SparseRowMat::<usize, f64>::try_new_from_triplets(nrows, ncols, &triplets)
            .map_err(|e| {
                Em1dError::ConfigError(format!("sparse sensitivity assembly failed: {e:?}"))
            })?;
        Ok(CsrMatrix { matrix })
    }

    /// Underlying `faer` storage.
    pub fn as_faer(&self) -> &SparseRowMat<usize, f64> {
        &self.matrix
    }

    pub fn nnz(&self) -> usize {
        self.matrix.parts().1.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (symbolic, values) = self.matrix.parts();
        let span = symbolic.row_ptr()[row]..symbolic.row_ptr()[row + 1];
        symbolic.col_idx()[span.clone()]
            .iter()
            .position(|&c| c == col)
            .map_or(0.0, |k| values[span.start + k])
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.matrix.nrows(), self.matrix.ncols()));
        let (symbolic, values) = self.matrix.parts();
        let row_ptr = symbolic.row_ptr();
        let col_idx = symbolic.col_idx();
        for row in 0..self.matrix.nrows() {
            for idx in row_ptr[row]..row_ptr[row + 1] {
                out[[row, col_idx[idx]]] += values[idx];
            }
        }
        out
    }
}

impl LinearOperator for CsrMatrix {
    fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    fn matvec(&self, x: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        check_len("csr matvec", self.ncols(), x.len())?;
        let (symbolic, values) = self.matrix.parts();
        let row_ptr = symbolic.row_ptr();
        let col_idx = symbolic.col_idx();
        let mut output = Array1::<f64>::zeros(self.nrows());
        for row in 0..self.nrows() {
            let mut acc = 0.0;
            for idx in row_ptr[row]..row_ptr[row + 1] {
                acc += values[idx] * x[col_idx[idx]];
            }
            output[row] = acc;
        }
        Ok(output)
    }

    fn rmatvec(&self, y: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        check_len("csr rmatvec", self.nrows(), y.len())?;
        let (symbolic, values) = self.matrix.parts();
        let row_ptr = symbolic.row_ptr();
        let col_idx = symbolic.col_idx();
        let mut output = Array1::<f64>::zeros(self.ncols());
        for row in 0..self.nrows() {
            let yi = y[row];
            for idx in row_ptr[row]..row_ptr[row + 1] {
                output[col_idx[idx]] += values[idx] * yi;
            }
        }
        Ok(output)
    }
}

/// Ordered dense diagonal blocks with their row and column ranges.
#[derive(Debug, Clone)]
pub struct BlockDiagonal {
    blocks: Vec<Array2<f64>>,
    row_ranges: Vec<Range<usize>>,
    col_ranges: Vec<Range<usize>>,
}

impl BlockDiagonal {
    pub fn new(blocks: Vec<Array2<f64>>) -> Self {
        let mut row_ranges = Vec::with_capacity(blocks.len());
        let mut col_ranges = Vec::with_capacity(blocks.len());
        let (mut r0, mut c0) = (0, 0);
        for b in &blocks {
            row_ranges.push(r0..r0 + b.nrows());
            col_ranges.push(c0..c0 + b.ncols());
            r0 += b.nrows();
            c0 += b.ncols();
        }
        BlockDiagonal {
            blocks,
            row_ranges,
            col_ranges,
        }
    }

    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Array2<f64>] {
        &self.blocks
    }

    pub fn block(&self, i: usize) -> &Array2<f64> {
        &self.blocks[i]
    }

    pub fn row_range(&self, i: usize) -> Range<usize> {
        self.row_ranges[i].clone()
    }

    pub fn col_range(&self, i: usize) -> Range<usize> {
        self.col_ranges[i].clone()
    }

    pub fn to_csr(&self) -> Em1dResult<CsrMatrix> {
        CsrMatrix::block_diag(&self.blocks)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.nrows(), self.ncols()));
        for ((b, rows), cols) in self.blocks.iter().zip(&self.row_ranges).zip(&self.col_ranges) {
            out.slice_mut(s![rows.clone(), cols.clone()]).assign(b);
        }
        out
    }

    /// Concatenate per-block results in block order.
    pub fn concat(parts: &[Array1<f64>]) -> Array1<f64> {
        parts.iter().flat_map(|p| p.iter().copied()).collect()
    }
}

impl LinearOperator for BlockDiagonal {
    fn nrows(&self) -> usize {
        self.row_ranges.last().map_or(0, |r| r.end)
    }

    fn ncols(&self) -> usize {
        self.col_ranges.last().map_or(0, |r| r.end)
    }

    fn matvec(&self, x: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        check_len("block matvec", self.ncols(), x.len())?;
        let parts: Vec<Array1<f64>> = self
            .blocks
            .iter()
            .zip(&self.col_ranges)
            .map(|(b, cols)| b.dot(&x.slice(s![cols.clone()])))
            .collect();
        Ok(Self::concat(&parts))
    }

    fn rmatvec(&self, y: ArrayView1<f64>) -> Em1dResult<Array1<f64>> {
        check_len("block rmatvec", self.nrows(), y.len())?;
        let parts: Vec<Array1<f64>> = self
            .blocks
            .iter()
            .zip(&self.row_ranges)
            .map(|(b, rows)| b.t().dot(&y.slice(s![rows.clone()])))
            .collect();
        Ok(Self::concat(&parts))
    }
}
