//! # scribble-colorize
//!
//! A Rust library for colorizing grayscale images from sparse user color scribbles.
//!
//! Given an image and a copy of it with a few color strokes drawn on top, the
//! crate infers a color for every pixel by propagating the scribbled
//! chrominance across regions of similar local luminance:
//!
//! - **Scribble Mask Extraction**: Finds the pixels where the scribbled copy differs from the original
//! - **Affinity Weights**: Weights each pixel's 8 neighbors by local luminance similarity
//! - **Linear System Assembly**: Builds one sparse system shared by the U and V channels
//! - **Sparse Solving**: Jacobi-preconditioned BiCGSTAB with per-channel failure reporting
//! - **Channel Composition**: Recombines the original luminance with the solved chrominance
//!
//! ## Example Usage
//!
//! ```no_run
//! use scribble_colorize::{ColorizeExt, ColorizeOptions, Image, MaskOptions, ScribbleMaskExt};
//! use image::Rgb;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let image: Image<Rgb<u8>> = Image::new(100, 100);
//! let scribbles: Image<Rgb<u8>> = Image::new(100, 100);
//!
//! let mask = image.scribble_mask(&scribbles, MaskOptions::default())?;
//! let colored = image.colorize(&scribbles, &mask, &ColorizeOptions::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `serde`: Enables serialization of the option structs (optional)

mod colorization;
mod error;
mod utils;

#[cfg(test)]
mod test_utils;

pub use colorization::affinity::{
    AffinityWeights, DEFAULT_GAMMA, PixelWeights, VARIANCE_EPSILON, compute_affinity_weights,
    local_variance, neighbor_weights,
};
pub use colorization::color_space::{Yuv, YuvPlanes, split_yuv_planes};
pub use colorization::colorize::{
    Channel, ChrominancePlanes, ColorizeExt, ColorizeOptions, colorize, colorize_dynamic,
    colorize_with, solve_chrominance,
};
pub use colorization::compose::compose_color_image;
pub use colorization::linear_system::{LinearSystem, SparseMatrix, build_linear_system};
pub use colorization::scribble_mask::{
    MaskOptions, ScribbleMask, ScribbleMaskExt, get_scribble_mask,
};
pub use colorization::solver::{
    BiCgStab, DEFAULT_TOLERANCE, JacobiPreconditioner, Solution, SolverSettings,
};
pub use error::{ColorizeError, ScribbleMaskError, SolveError};
pub use utils::{Neighborhood, PixelGrid};

// Re-export imageproc::definitions::Image for convenience
pub use imageproc::definitions::Image;
