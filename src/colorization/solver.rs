//! Jacobi-preconditioned BiCGSTAB for the colorization system.
//!
//! The matrix is not symmetric once known pixels are pinned, so a
//! stabilized bi-conjugate gradient method is used instead of plain CG.
//! One [`BiCgStab`] is built per matrix and then shared read-only by the U
//! and V solves. Dot products are accumulated sequentially, so identical
//! inputs give bit-identical outputs regardless of thread count.

use itertools::izip;

use crate::colorization::linear_system::SparseMatrix;
use crate::error::SolveError;

/// Default relative residual tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Lower bound on the automatic iteration cap.
const MIN_ITERATION_CAP: usize = 100;

/// Relative size below which `(r̂, r)` counts as a breakdown.
const BREAKDOWN_THRESHOLD: f64 = f64::EPSILON * f64::EPSILON;

/// Stopping criteria for the iterative solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverSettings {
    /// Converged when `‖b - Ax‖ ≤ tolerance · ‖b‖`.
    pub tolerance: f64,
    /// Iteration cap; `None` uses `max(2 · n, 100)` for an `n`-row system.
    pub max_iterations: Option<usize>,
}

impl SolverSettings {
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Effective iteration cap for a system with `dim` rows.
    #[must_use]
    pub fn iteration_cap(&self, dim: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| dim.saturating_mul(2).max(MIN_ITERATION_CAP))
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: None,
        }
    }
}

/// Diagonal (Jacobi) preconditioner: `M⁻¹ = diag(A)⁻¹`.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobiPreconditioner {
    inverse_diagonal: Vec<f64>,
}

impl JacobiPreconditioner {
    /// # Errors
    ///
    /// * `SolveError::ZeroDiagonal` - When a diagonal entry is zero or not finite
    pub fn new(matrix: &SparseMatrix) -> Result<Self, SolveError> {
        let inverse_diagonal = matrix
            .diagonal()
            .into_iter()
            .enumerate()
            .map(|(row, d)| {
                if d == 0.0 || !d.is_finite() {
                    Err(SolveError::ZeroDiagonal { row })
                } else {
                    Ok(d.recip())
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { inverse_diagonal })
    }

    #[inline]
    fn apply_impl(&self, x: &[f64], out: &mut [f64]) {
        izip!(out, x, &self.inverse_diagonal).for_each(|(out, &x, &inv)| *out = x * inv);
    }
}

/// Result of a converged solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub values: Vec<f64>,
    pub iterations: usize,
    /// Final `‖b - Ax‖ / ‖b‖`.
    pub residual: f64,
}

/// BiCGSTAB solver bound to one matrix and its preconditioner.
#[derive(Debug, Clone)]
pub struct BiCgStab<'a> {
    matrix: &'a SparseMatrix,
    preconditioner: JacobiPreconditioner,
    settings: SolverSettings,
}

impl<'a> BiCgStab<'a> {
    /// Builds the preconditioner for `matrix`.
    ///
    /// # Errors
    ///
    /// * `SolveError::InvalidTolerance` - When the tolerance is negative or not finite
    /// * `SolveError::ZeroDiagonal` - When the matrix has an unusable diagonal
    pub fn new(matrix: &'a SparseMatrix, settings: SolverSettings) -> Result<Self, SolveError> {
        let tolerance = settings.tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SolveError::InvalidTolerance { tolerance });
        }
        Ok(Self {
            matrix,
            preconditioner: JacobiPreconditioner::new(matrix)?,
            settings,
        })
    }

    #[must_use]
    pub const fn settings(&self) -> SolverSettings {
        self.settings
    }

    /// Solves `A x = rhs` from a zero initial guess.
    ///
    /// # Errors
    ///
    /// * `SolveError::DimensionMismatch` - When `rhs` does not match the matrix size
    /// * `SolveError::NotConverged` - When the tolerance is not met within the
    ///   iteration cap, the method breaks down twice, or the residual stops being finite
    pub fn solve(&self, rhs: &[f64]) -> Result<Solution, SolveError> {
        let n = self.matrix.dim();
        if rhs.len() != n {
            return Err(SolveError::DimensionMismatch {
                expected: n,
                actual: rhs.len(),
            });
        }

        let rhs_norm = norm_impl(rhs);
        if rhs_norm == 0.0 {
            return Ok(Solution {
                values: vec![0.0; n],
                iterations: 0,
                residual: 0.0,
            });
        }
        if !rhs_norm.is_finite() {
            return Err(SolveError::NotConverged {
                iterations: 0,
                residual: f64::INFINITY,
            });
        }

        let threshold = self.settings.tolerance * rhs_norm;
        let max_iterations = self.settings.iteration_cap(n);

        let mut x = vec![0.0; n];
        let mut r = rhs.to_vec();
        let mut r_hat = r.clone();
        let mut r_hat_norm_sq = dot_impl(&r_hat, &r_hat);
        let mut p = vec![0.0; n];
        let mut v = vec![0.0; n];
        let mut y = vec![0.0; n];
        let mut s = vec![0.0; n];
        let mut z = vec![0.0; n];
        let mut t = vec![0.0; n];

        let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);
        let mut residual_norm = rhs_norm;
        let mut iterations = 0;
        let mut restarted = false;

        while residual_norm > threshold && iterations < max_iterations {
            let mut rho_prev = rho;
            rho = dot_impl(&r_hat, &r);

            if rho.abs() < BREAKDOWN_THRESHOLD * r_hat_norm_sq || omega == 0.0 {
                if restarted {
                    return Err(SolveError::NotConverged {
                        iterations,
                        residual: residual_norm / rhs_norm,
                    });
                }
                restarted = true;

                // Restart from the current iterate with a fresh shadow residual.
                self.matrix.mul_vec(&x, &mut t)?;
                izip!(&mut r, rhs, &t).for_each(|(r, &b, &ax)| *r = b - ax);
                r_hat.copy_from_slice(&r);
                r_hat_norm_sq = dot_impl(&r_hat, &r_hat);
                rho = r_hat_norm_sq;
                rho_prev = rho;
                alpha = 1.0;
                omega = 1.0;
                p.fill(0.0);
                v.fill(0.0);
            }

            let beta = (rho / rho_prev) * (alpha / omega);
            izip!(&mut p, &r, &v).for_each(|(p, &r, &v)| *p = r + beta * (*p - omega * v));

            self.preconditioner.apply_impl(&p, &mut y);
            self.matrix.mul_vec(&y, &mut v)?;

            let denominator = dot_impl(&r_hat, &v);
            if denominator == 0.0 {
                return Err(SolveError::NotConverged {
                    iterations,
                    residual: residual_norm / rhs_norm,
                });
            }
            alpha = rho / denominator;
            izip!(&mut s, &r, &v).for_each(|(s, &r, &v)| *s = r - alpha * v);

            self.preconditioner.apply_impl(&s, &mut z);
            self.matrix.mul_vec(&z, &mut t)?;

            let t_norm_sq = dot_impl(&t, &t);
            omega = if t_norm_sq > 0.0 {
                dot_impl(&t, &s) / t_norm_sq
            } else {
                0.0
            };

            izip!(&mut x, &y, &z).for_each(|(x, &y, &z)| *x += alpha * y + omega * z);
            izip!(&mut r, &s, &t).for_each(|(r, &s, &t)| *r = s - omega * t);

            residual_norm = norm_impl(&r);
            iterations += 1;

            if !residual_norm.is_finite() {
                return Err(SolveError::NotConverged {
                    iterations,
                    residual: f64::INFINITY,
                });
            }
        }

        let residual = residual_norm / rhs_norm;
        if residual_norm <= threshold {
            Ok(Solution {
                values: x,
                iterations,
                residual,
            })
        } else {
            Err(SolveError::NotConverged {
                iterations,
                residual,
            })
        }
    }
}

#[inline]
fn dot_impl(a: &[f64], b: &[f64]) -> f64 {
    izip!(a, b).map(|(a, b)| a * b).sum()
}

#[inline]
fn norm_impl(a: &[f64]) -> f64 {
    dot_impl(a, a).sqrt()
}
