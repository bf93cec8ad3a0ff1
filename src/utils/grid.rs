//! Row-major pixel indexing.
//!
//! Every per-pixel grid and vector in the crate is addressed with the flat
//! index `y * width + x`. [`PixelGrid`] owns that mapping and hands out
//! bounds-checked neighbor lists, so no caller does the arithmetic by hand.

use core::ops::Range;

/// 8-connected offsets `(dx, dy)` in row-major order, so neighbor indices come out ascending.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Maximum number of grid neighbors a pixel can have.
pub const MAX_NEIGHBORS: usize = NEIGHBOR_OFFSETS.len();

/// Dimensions of a row-major pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelGrid {
    width: u32,
    height: u32,
}

impl PixelGrid {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels in the grid.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// All flat indices in row-major order.
    #[inline]
    #[must_use]
    pub const fn indices(&self) -> Range<usize> {
        0..self.len()
    }

    /// Flat index of `(x, y)`, or `None` when the coordinate lies outside the grid.
    #[inline]
    #[must_use]
    pub const fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Inverse of [`PixelGrid::index`].
    #[inline]
    #[must_use]
    pub const fn coordinates(&self, index: usize) -> Option<(u32, u32)> {
        if index < self.len() {
            let width = self.width as usize;
            Some(((index % width) as u32, (index / width) as u32))
        } else {
            None
        }
    }

    /// In-bounds 8-connected neighbors of `(x, y)`.
    ///
    /// Border pixels get a clipped set (3 in a corner, 5 on an edge); there is
    /// no wraparound and no padding. A coordinate outside the grid has no neighbors.
    #[must_use]
    pub fn neighborhood(&self, x: u32, y: u32) -> Neighborhood {
        let mut neighborhood = Neighborhood::default();
        if self.index(x, y).is_none() {
            return neighborhood;
        }

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let neighbor = x
                .checked_add_signed(dx)
                .zip(y.checked_add_signed(dy))
                .and_then(|(nx, ny)| self.index(nx, ny));
            if let Some(index) = neighbor {
                neighborhood.push_impl(index);
            }
        }

        neighborhood
    }

    /// Same as [`PixelGrid::neighborhood`], addressed by flat index.
    #[must_use]
    pub fn neighborhood_of(&self, index: usize) -> Neighborhood {
        self.coordinates(index)
            .map(|(x, y)| self.neighborhood(x, y))
            .unwrap_or_default()
    }
}

/// Fixed-capacity list of neighbor indices, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighborhood {
    indices: [usize; MAX_NEIGHBORS],
    len: usize,
}

impl Neighborhood {
    #[inline]
    fn push_impl(&mut self, index: usize) {
        self.indices[self.len] = index;
        self.len += 1;
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.indices[..self.len]
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.as_slice().iter().copied()
    }
}
