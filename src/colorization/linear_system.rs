//! Assembly of the harmonic-extension system `A x = b`.
//!
//! Every pixel contributes one row. A pixel whose chrominance is known is a
//! fixed boundary node: its row is the identity row with its scribbled value
//! on the right-hand side. For an unknown pixel `r` the row reads
//!
//! ```text
//! x[r] - Σ_{s unknown} ŵ(r, s) x[s] = Σ_{s known} ŵ(r, s) c[s]
//! ```
//!
//! so known neighbors only ever contribute to `b` and unknown neighbors only
//! ever contribute a coefficient. The matrix is shared by the U and V channels;
//! only the right-hand sides differ.

use rayon::prelude::*;

use crate::colorization::affinity::AffinityWeights;
use crate::colorization::scribble_mask::ScribbleMask;
use crate::error::{ColorizeError, SolveError};
use crate::utils::MAX_NEIGHBORS;

/// Square sparse matrix in compressed sparse row form.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    dim: usize,
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Builds a `dim x dim` matrix from one `(column, value)` list per row.
    ///
    /// Entries within a row are sorted by column and duplicates are summed.
    ///
    /// # Errors
    ///
    /// * `SolveError::DimensionMismatch` - When the number of rows differs from `dim`
    /// * `SolveError::ColumnOutOfBounds` - When a column index is not below `dim`
    pub fn from_rows<I>(dim: usize, rows: I) -> Result<Self, SolveError>
    where
        I: IntoIterator<Item = Vec<(usize, f64)>>,
    {
        let mut row_offsets = Vec::with_capacity(dim + 1);
        let mut columns = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0);

        for (row, mut entries) in rows.into_iter().enumerate() {
            if let Some(&(column, _)) = entries.iter().find(|(column, _)| *column >= dim) {
                return Err(SolveError::ColumnOutOfBounds { row, column, dim });
            }
            entries.sort_by_key(|&(column, _)| column);

            for (column, value) in entries {
                match columns.last() {
                    Some(&last) if last == column && columns.len() > row_offsets[row] => {
                        if let Some(total) = values.last_mut() {
                            *total += value;
                        }
                    }
                    _ => {
                        columns.push(column);
                        values.push(value);
                    }
                }
            }
            row_offsets.push(columns.len());
        }

        let rows_seen = row_offsets.len() - 1;
        if rows_seen != dim {
            return Err(SolveError::DimensionMismatch {
                expected: dim,
                actual: rows_seen,
            });
        }

        Ok(Self {
            dim,
            row_offsets,
            columns,
            values,
        })
    }

    #[must_use]
    pub fn identity(dim: usize) -> Self {
        Self {
            dim,
            row_offsets: (0..=dim).collect(),
            columns: (0..dim).collect(),
            values: vec![1.0; dim],
        }
    }

    #[inline]
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored entries.
    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored `(column, value)` entries of `row`, columns ascending.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = match (self.row_offsets.get(row), self.row_offsets.get(row + 1)) {
            (Some(&start), Some(&end)) => start..end,
            _ => 0..0,
        };
        self.columns[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Value at `(row, column)`; zero when not stored.
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.row(row)
            .find(|&(c, _)| c == column)
            .map_or(0.0, |(_, value)| value)
    }

    #[must_use]
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.dim).map(|row| self.get(row, row)).collect()
    }

    /// Computes `out = self * x`, rows in parallel.
    ///
    /// # Errors
    ///
    /// * `SolveError::DimensionMismatch` - When `x` or `out` is not `dim` long
    pub fn mul_vec(&self, x: &[f64], out: &mut [f64]) -> Result<(), SolveError> {
        for len in [x.len(), out.len()] {
            if len != self.dim {
                return Err(SolveError::DimensionMismatch {
                    expected: self.dim,
                    actual: len,
                });
            }
        }

        out.par_iter_mut().enumerate().for_each(|(row, out)| {
            *out = self.row(row).map(|(column, value)| value * x[column]).sum();
        });
        Ok(())
    }
}

/// Coefficient matrix plus one right-hand side per chrominance channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    pub matrix: SparseMatrix,
    pub bu: Vec<f64>,
    pub bv: Vec<f64>,
}

struct AssembledRow {
    entries: Vec<(usize, f64)>,
    bu: f64,
    bv: f64,
}

/// Assembles the shared matrix and both right-hand sides.
///
/// `known_u` and `known_v` are the scribbled chrominance planes; only their
/// values at known pixels are read.
///
/// # Errors
///
/// * `ColorizeError::MaskDimensionMismatch` - When the mask and weights cover different grids
/// * `ColorizeError::PlaneLengthMismatch` - When a chrominance plane has the wrong length
pub fn build_linear_system(
    weights: &AffinityWeights,
    mask: &ScribbleMask,
    known_u: &[f64],
    known_v: &[f64],
) -> Result<LinearSystem, ColorizeError> {
    let grid = weights.grid();
    if mask.grid() != grid {
        return Err(ColorizeError::MaskDimensionMismatch {
            expected: grid.dimensions(),
            actual: mask.dimensions(),
        });
    }
    for len in [known_u.len(), known_v.len()] {
        if len != grid.len() {
            return Err(ColorizeError::PlaneLengthMismatch {
                expected: grid.len(),
                actual: len,
            });
        }
    }

    let known = mask.as_slice();
    // Each row is assembled into its own buffer; buffers are concatenated in row order.
    let rows: Vec<AssembledRow> = weights
        .as_slice()
        .par_iter()
        .enumerate()
        .map(|(row, pixel)| {
            if known[row] {
                return AssembledRow {
                    entries: vec![(row, 1.0)],
                    bu: known_u[row],
                    bv: known_v[row],
                };
            }

            let mut assembled = AssembledRow {
                entries: Vec::with_capacity(MAX_NEIGHBORS + 1),
                bu: 0.0,
                bv: 0.0,
            };
            assembled.entries.push((row, 1.0));
            for (neighbor, weight) in pixel.iter() {
                if known[neighbor] {
                    assembled.bu += weight * known_u[neighbor];
                    assembled.bv += weight * known_v[neighbor];
                } else {
                    assembled.entries.push((neighbor, -weight));
                }
            }
            assembled
        })
        .collect();

    let mut bu = Vec::with_capacity(rows.len());
    let mut bv = Vec::with_capacity(rows.len());
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        bu.push(row.bu);
        bv.push(row.bv);
        entries.push(row.entries);
    }

    let matrix = SparseMatrix::from_rows(grid.len(), entries)?;
    Ok(LinearSystem { matrix, bu, bv })
}
