//! Luminance-affinity weights between each pixel and its grid neighbors.
//!
//! For pixel `r` with clipped 8-neighborhood `N(r)`:
//!
//! ```text
//! d(r, s)   = (Y[r] - Y[s])²
//! σ²(r)     = Var{ Y[t] : t ∈ N(r) ∪ {r} } + 0.01
//! w(r, s)   = exp(-γ · d(r, s) / (2 σ²(r)))
//! ŵ(r, s)   = w(r, s) / Σ_{t ∈ N(r)} w(r, t)
//! ```
//!
//! Larger `γ` makes weights fall off faster across luminance edges. The
//! normalized weights of a pixel with at least one neighbor sum to one.

use rayon::prelude::*;

use crate::utils::{MAX_NEIGHBORS, Neighborhood, PixelGrid};

/// Added to every local variance so flat regions do not divide by zero.
pub const VARIANCE_EPSILON: f64 = 0.01;

/// Default edge sensitivity.
pub const DEFAULT_GAMMA: f64 = 2.0;

/// Normalized weights from one pixel to each of its neighbors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelWeights {
    neighborhood: Neighborhood,
    weights: [f64; MAX_NEIGHBORS],
}

impl PixelWeights {
    #[inline]
    #[must_use]
    pub fn neighbors(&self) -> &[usize] {
        self.neighborhood.as_slice()
    }

    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights[..self.neighborhood.len()]
    }

    /// `(neighbor index, weight)` pairs, neighbors ascending.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.neighbors()
            .iter()
            .copied()
            .zip(self.weights().iter().copied())
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.weights().iter().sum()
    }
}

/// Affinity weights for every pixel of a grid, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityWeights {
    grid: PixelGrid,
    pixels: Vec<PixelWeights>,
}

impl AffinityWeights {
    #[inline]
    #[must_use]
    pub const fn grid(&self) -> PixelGrid {
        self.grid
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PixelWeights> {
        self.pixels.get(index)
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[PixelWeights] {
        &self.pixels
    }
}

/// Population variance of `values` plus [`VARIANCE_EPSILON`].
///
/// Returns `VARIANCE_EPSILON` for an empty input.
#[must_use]
pub fn local_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return VARIANCE_EPSILON;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let spread = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    spread + VARIANCE_EPSILON
}

/// Computes the normalized weights of `center` toward each index in `neighborhood`.
///
/// `luminance` is the row-major Y plane; every index in `neighborhood` and
/// `center` itself must be a valid index into it.
#[must_use]
pub fn neighbor_weights(
    luminance: &[f64],
    center: usize,
    neighborhood: &Neighborhood,
    gamma: f64,
) -> PixelWeights {
    let mut weights = [0.0; MAX_NEIGHBORS];
    let count = neighborhood.len();
    if count == 0 {
        return PixelWeights {
            neighborhood: *neighborhood,
            weights,
        };
    }

    let center_value = luminance[center];
    let mut window = [center_value; MAX_NEIGHBORS + 1];
    for (slot, neighbor) in window.iter_mut().zip(neighborhood.iter()) {
        *slot = luminance[neighbor];
    }
    let variance = local_variance(&window[..=count]);

    let mut distances = [0.0; MAX_NEIGHBORS];
    for (distance, &value) in distances.iter_mut().zip(&window[..count]) {
        *distance = (center_value - value) * (center_value - value);
    }

    // Shifting by the smallest distance leaves the normalized weights unchanged
    // and keeps the largest raw weight at exactly 1.
    let nearest = distances[..count]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let scale = gamma / (2.0 * variance);
    for (weight, &distance) in weights.iter_mut().zip(&distances[..count]) {
        *weight = (-scale * (distance - nearest)).exp();
    }

    let normalizer: f64 = weights[..count].iter().sum();
    for weight in &mut weights[..count] {
        *weight /= normalizer;
    }

    PixelWeights {
        neighborhood: *neighborhood,
        weights,
    }
}

/// Computes affinity weights for every pixel of `grid`.
///
/// `luminance` holds one value per grid pixel. Each pixel only reads the
/// shared plane and writes its own slot, so pixels are processed in parallel.
#[must_use]
pub fn compute_affinity_weights(luminance: &[f64], grid: PixelGrid, gamma: f64) -> AffinityWeights {
    debug_assert_eq!(luminance.len(), grid.len());

    let pixels = grid
        .indices()
        .into_par_iter()
        .map(|index| {
            let neighborhood = grid.neighborhood_of(index);
            neighbor_weights(luminance, index, &neighborhood, gamma)
        })
        .collect();

    AffinityWeights { grid, pixels }
}
