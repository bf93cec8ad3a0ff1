//! Internal utility functions for scribble-colorize.
//!
//! This module contains the pixel-grid abstraction and the shape checks shared
//! by mask extraction and colorization.

mod grid;
pub use grid::{MAX_NEIGHBORS, Neighborhood, PixelGrid};

/// Reasons a pair of images cannot be processed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairShapeError {
    Empty { width: u32, height: u32 },
    Mismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Validates that two images are non-empty and share dimensions.
///
/// # Arguments
///
/// * `expected` - Dimensions of the reference image
/// * `actual` - Dimensions of the image paired with it
///
/// # Returns
///
/// The shared pixel grid if the pair is usable, otherwise the first violated condition
pub const fn validate_image_pair(
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<PixelGrid, PairShapeError> {
    let (width, height) = expected;
    if width == 0 || height == 0 {
        return Err(PairShapeError::Empty { width, height });
    }
    if width != actual.0 || height != actual.1 {
        return Err(PairShapeError::Mismatch { expected, actual });
    }
    Ok(PixelGrid::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_image_pair_with_matching_sizes_returns_grid() {
        assert_eq!(
            validate_image_pair((100, 50), (100, 50)),
            Ok(PixelGrid::new(100, 50))
        );
        assert_eq!(validate_image_pair((1, 1), (1, 1)), Ok(PixelGrid::new(1, 1)));
    }

    #[test]
    fn validate_image_pair_with_empty_reference_rejects() {
        assert_eq!(
            validate_image_pair((0, 10), (0, 10)),
            Err(PairShapeError::Empty {
                width: 0,
                height: 10
            })
        );
        assert!(validate_image_pair((10, 0), (10, 0)).is_err());
    }

    #[test]
    fn validate_image_pair_with_different_sizes_rejects() {
        assert_eq!(
            validate_image_pair((10, 10), (10, 5)),
            Err(PairShapeError::Mismatch {
                expected: (10, 10),
                actual: (10, 5)
            })
        );
        assert!(validate_image_pair((10, 10), (5, 10)).is_err());
    }
}
