use core::fmt;

use image::{DynamicImage, Rgb};
use imageproc::definitions::Image;
use log::{debug, info, warn};

use crate::colorization::affinity::{DEFAULT_GAMMA, compute_affinity_weights};
use crate::colorization::color_space::split_yuv_planes;
use crate::colorization::compose::compose_color_image;
use crate::colorization::linear_system::build_linear_system;
use crate::colorization::scribble_mask::ScribbleMask;
use crate::colorization::solver::{BiCgStab, SolverSettings};
use crate::error::{ColorizeError, SolveError};
use crate::utils::{PixelGrid, validate_image_pair};

/// A chrominance channel of the luma-chroma representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    U,
    V,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U => f.write_str("U"),
            Self::V => f.write_str("V"),
        }
    }
}

/// Parameters for a colorize call.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorizeOptions {
    /// Edge sensitivity of the affinity weights.
    pub gamma: f64,
    pub solver: SolverSettings,
}

impl ColorizeOptions {
    #[must_use]
    pub const fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    #[must_use]
    pub const fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }
}

impl Default for ColorizeOptions {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
            solver: SolverSettings::default(),
        }
    }
}

/// Solved chrominance planes, row-major over the image grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ChrominancePlanes {
    grid: PixelGrid,
    u: Vec<f64>,
    v: Vec<f64>,
}

impl ChrominancePlanes {
    #[inline]
    #[must_use]
    pub const fn grid(&self) -> PixelGrid {
        self.grid
    }

    #[inline]
    #[must_use]
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    #[inline]
    #[must_use]
    pub fn v(&self) -> &[f64] {
        &self.v
    }

    #[must_use]
    pub fn get(&self, channel: Channel, x: u32, y: u32) -> Option<f64> {
        let index = self.grid.index(x, y)?;
        Some(match channel {
            Channel::U => self.u[index],
            Channel::V => self.v[index],
        })
    }
}

/// Trait for colorizing a luminance image from user scribbles.
pub trait ColorizeExt {
    /// Propagates the scribbled colors over the image.
    ///
    /// This consumes the original image and returns a new one of the same size.
    ///
    /// # Arguments
    ///
    /// * `scribbles` - The image with color strokes drawn on it
    /// * `mask` - Pixels whose scribbled color is taken as known
    /// * `options` - Edge sensitivity and solver stopping criteria
    ///
    /// # Errors
    ///
    /// See [`colorize_with`].
    fn colorize(
        self,
        scribbles: &Self,
        mask: &ScribbleMask,
        options: &ColorizeOptions,
    ) -> Result<Self, ColorizeError>
    where
        Self: Sized;
}

impl ColorizeExt for Image<Rgb<u8>> {
    fn colorize(
        self,
        scribbles: &Self,
        mask: &ScribbleMask,
        options: &ColorizeOptions,
    ) -> Result<Self, ColorizeError> {
        colorize_with(&self, scribbles, mask, options)
    }
}

/// Colorizes `image` from `scribbles` with edge sensitivity `gamma` and default solver settings.
///
/// # Errors
///
/// See [`colorize_with`].
///
/// # Examples
///
/// ```
/// use scribble_colorize::{Image, MaskOptions, colorize, get_scribble_mask};
/// use image::Rgb;
///
/// let image: Image<Rgb<u8>> = Image::from_pixel(12, 12, Rgb([120, 120, 120]));
/// let mut scribbles = image.clone();
/// for y in 4..8 {
///     for x in 4..8 {
///         scribbles.put_pixel(x, y, Rgb([200, 80, 60]));
///     }
/// }
///
/// let mask = get_scribble_mask(&image, &scribbles, MaskOptions::default()).unwrap();
/// let colored = colorize(&image, &scribbles, &mask, 2.0).unwrap();
///
/// let Rgb([red, _, blue]) = *colored.get_pixel(0, 0);
/// assert!(red > blue);
/// ```
pub fn colorize(
    image: &Image<Rgb<u8>>,
    scribbles: &Image<Rgb<u8>>,
    mask: &ScribbleMask,
    gamma: f64,
) -> Result<Image<Rgb<u8>>, ColorizeError> {
    let options = ColorizeOptions::default().with_gamma(gamma);
    colorize_with(image, scribbles, mask, &options)
}

/// Colorizes `image` by propagating the chrominance of known scribble pixels.
///
/// The luminance of `image` is kept; U and V are solved as a harmonic
/// extension over the luminance-affinity graph, with pixels flagged in `mask`
/// held at the chrominance of `scribbles`.
///
/// # Errors
///
/// * `ColorizeError::EmptyImage` - When the image has no pixels
/// * `ColorizeError::DimensionMismatch` - When image and scribbles differ in size
/// * `ColorizeError::MaskDimensionMismatch` - When the mask differs in size
/// * `ColorizeError::InvalidGamma` - When `gamma` is negative or not finite
/// * `ColorizeError::NoScribbles` - When the mask has no known pixel
/// * `ColorizeError::Solver` - When the solver settings are invalid
/// * `ColorizeError::Convergence` - When the U or V solve does not converge
pub fn colorize_with(
    image: &Image<Rgb<u8>>,
    scribbles: &Image<Rgb<u8>>,
    mask: &ScribbleMask,
    options: &ColorizeOptions,
) -> Result<Image<Rgb<u8>>, ColorizeError> {
    let (grid, luminance, planes) = solve_planes_impl(image, scribbles, mask, options)?;
    let colored = compose_color_image(grid, &luminance, &planes.u, &planes.v)?;
    info!("Finished colorizing {}x{} image", grid.width(), grid.height());
    Ok(colored)
}

/// Solves the U and V planes without recombining them into an image.
///
/// # Errors
///
/// Same as [`colorize_with`].
pub fn solve_chrominance(
    image: &Image<Rgb<u8>>,
    scribbles: &Image<Rgb<u8>>,
    mask: &ScribbleMask,
    options: &ColorizeOptions,
) -> Result<ChrominancePlanes, ColorizeError> {
    solve_planes_impl(image, scribbles, mask, options).map(|(_, _, planes)| planes)
}

/// Colorizes decoded images of any color type.
///
/// Both images must have the same channel count; they are converted to RGB8
/// before colorizing.
///
/// # Errors
///
/// * `ColorizeError::ChannelCountMismatch` - When the images have different channel counts
/// * Everything [`colorize_with`] returns
pub fn colorize_dynamic(
    image: &DynamicImage,
    scribbles: &DynamicImage,
    mask: &ScribbleMask,
    options: &ColorizeOptions,
) -> Result<Image<Rgb<u8>>, ColorizeError> {
    let expected = image.color().channel_count();
    let actual = scribbles.color().channel_count();
    if expected != actual {
        return Err(ColorizeError::ChannelCountMismatch { expected, actual });
    }
    colorize_with(&image.to_rgb8(), &scribbles.to_rgb8(), mask, options)
}

fn validate_inputs_impl(
    image: &Image<Rgb<u8>>,
    scribbles: &Image<Rgb<u8>>,
    mask: &ScribbleMask,
    gamma: f64,
) -> Result<PixelGrid, ColorizeError> {
    let grid = validate_image_pair(image.dimensions(), scribbles.dimensions())?;
    if mask.grid() != grid {
        return Err(ColorizeError::MaskDimensionMismatch {
            expected: grid.dimensions(),
            actual: mask.dimensions(),
        });
    }
    if !gamma.is_finite() || gamma < 0.0 {
        return Err(ColorizeError::InvalidGamma { gamma });
    }
    if !mask.has_known() {
        return Err(ColorizeError::NoScribbles);
    }
    Ok(grid)
}

fn solve_planes_impl(
    image: &Image<Rgb<u8>>,
    scribbles: &Image<Rgb<u8>>,
    mask: &ScribbleMask,
    options: &ColorizeOptions,
) -> Result<(PixelGrid, Vec<f64>, ChrominancePlanes), ColorizeError> {
    let grid = validate_inputs_impl(image, scribbles, mask, options.gamma)?;

    let image_planes = split_yuv_planes(image);
    let scribble_planes = split_yuv_planes(scribbles);

    let weights = compute_affinity_weights(&image_planes.y, grid, options.gamma);
    let system = build_linear_system(&weights, mask, &scribble_planes.u, &scribble_planes.v)?;
    debug!(
        "Assembled {n}x{n} system with {} nonzeros, {} known pixels",
        system.matrix.nnz(),
        mask.count_known(),
        n = system.matrix.dim(),
    );

    let solver = BiCgStab::new(&system.matrix, options.solver)?;

    info!("Solving for U and V channels");
    let (u, v) = rayon::join(
        || solve_channel_impl(&solver, &system.bu, Channel::U),
        || solve_channel_impl(&solver, &system.bv, Channel::V),
    );
    let (u, v) = (u?, v?);

    Ok((grid, image_planes.y, ChrominancePlanes { grid, u, v }))
}

fn solve_channel_impl(
    solver: &BiCgStab<'_>,
    rhs: &[f64],
    channel: Channel,
) -> Result<Vec<f64>, ColorizeError> {
    match solver.solve(rhs) {
        Ok(solution) => {
            debug!(
                "{channel} channel converged in {} iterations (relative residual {:e})",
                solution.iterations, solution.residual
            );
            Ok(solution.values)
        }
        Err(source @ SolveError::NotConverged { .. }) => {
            warn!("Failed to solve for {channel} channel: {source}");
            Err(ColorizeError::Convergence { channel, source })
        }
        Err(source) => Err(ColorizeError::Solver(source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorization::color_space::Yuv;
    use crate::colorization::scribble_mask::{MaskOptions, get_scribble_mask};
    use crate::test_utils::*;
    use image::{Luma, Rgba};

    const RED: Rgb<u8> = Rgb([220, 40, 40]);
    const BLUE: Rgb<u8> = Rgb([40, 40, 220]);

    #[test]
    fn colorize_single_scribbled_pixel_returns_its_color() {
        let image = paint(&gray_image(1, 1, 0), &[(0, 0)], Rgb([200, 120, 30]));
        let mask = ScribbleMask::filled(1, 1, true);

        let result = colorize(&image, &image, &mask, DEFAULT_GAMMA).unwrap();

        assert_eq!(result.get_pixel(0, 0), &Rgb([200, 120, 30]));
    }

    #[test]
    fn colorize_with_full_mask_reproduces_scribbles() {
        let scribbles = noise_image(7, 5, 42);
        let mask = ScribbleMask::filled(7, 5, true);

        let result = colorize(&scribbles, &scribbles, &mask, DEFAULT_GAMMA).unwrap();

        assert_eq!(result, scribbles);
    }

    #[test]
    fn colorize_with_full_mask_keeps_luminance_and_scribble_chrominance() {
        let image = gradient_image(6, 4);
        let scribbles = noise_image(6, 4, 7);
        let mask = ScribbleMask::filled(6, 4, true);

        let planes =
            solve_chrominance(&image, &scribbles, &mask, &ColorizeOptions::default()).unwrap();
        let expected = crate::colorization::color_space::split_yuv_planes(&scribbles);

        assert_eq!(planes.u(), expected.u.as_slice());
        assert_eq!(planes.v(), expected.v.as_slice());
    }

    #[test]
    fn solve_chrominance_from_corner_scribble_decays_with_distance() {
        let image = gray_image(4, 4, 128);
        let scribbles = paint(&image, &[(0, 0)], Rgb([230, 60, 90]));
        let mask = mask_at(4, 4, &[(0, 0)]);
        let options = ColorizeOptions::default().with_gamma(2.0);

        let planes = solve_chrominance(&image, &scribbles, &mask, &options).unwrap();

        let scribbled = Yuv::from_rgb(Rgb([230, 60, 90]));
        for channel in [Channel::U, Channel::V] {
            let mut by_distance: Vec<(u32, f64)> = Vec::new();
            for y in 0..4 {
                for x in 0..4 {
                    let value = planes.get(channel, x, y).unwrap();
                    assert!(value.is_finite());
                    by_distance.push((x.max(y), value.abs()));
                }
            }
            for &(near_distance, near) in &by_distance {
                for &(far_distance, far) in &by_distance {
                    if near_distance < far_distance {
                        assert!(far <= near + 1e-6, "{channel}: {far} > {near}");
                    }
                }
            }
        }

        assert!((planes.get(Channel::U, 0, 0).unwrap() - scribbled.u).abs() < 1e-6);
        assert!((planes.get(Channel::V, 0, 0).unwrap() - scribbled.v).abs() < 1e-6);
        assert!(planes.get(Channel::V, 3, 3).unwrap() > 0.0);
    }

    #[test]
    fn colorize_keeps_colors_on_their_side_of_a_luminance_edge() {
        let image = split_image(8, 8, 30, 220);
        let scribbles = paint(&paint(&image, &[(1, 3)], RED), &[(6, 3)], BLUE);
        let mask = mask_at(8, 8, &[(1, 3), (6, 3)]);
        let options = ColorizeOptions::default().with_gamma(10.0);

        let planes = solve_chrominance(&image, &scribbles, &mask, &options).unwrap();

        for y in 0..8 {
            for x in 0..4 {
                assert!(planes.get(Channel::U, x, y).unwrap() < 0.0, "({x}, {y})");
            }
            for x in 4..8 {
                assert!(planes.get(Channel::U, x, y).unwrap() > 0.0, "({x}, {y})");
            }
        }
    }

    #[test]
    fn colorize_end_to_end_with_extracted_mask_tints_unscribbled_region() {
        let image = gray_image(10, 10, 140);
        let block: Vec<(u32, u32)> = (3..7).flat_map(|y| (3..7).map(move |x| (x, y))).collect();
        let scribbles = paint(&image, &block, Rgb([60, 200, 60]));
        let mask = get_scribble_mask(&image, &scribbles, MaskOptions::default()).unwrap();

        let result = colorize(&image, &scribbles, &mask, DEFAULT_GAMMA).unwrap();

        assert_eq!(result.dimensions(), (10, 10));
        let Rgb([red, green, blue]) = *result.get_pixel(9, 9);
        assert!(green > red && green > blue);
    }

    #[test]
    fn colorize_is_deterministic() {
        let image = gradient_image(9, 7);
        let scribbles = paint(&paint(&image, &[(0, 0), (1, 0)], RED), &[(8, 6)], BLUE);
        let mask = mask_at(9, 7, &[(0, 0), (1, 0), (8, 6)]);

        let first = colorize(&image, &scribbles, &mask, DEFAULT_GAMMA).unwrap();
        let second = colorize(&image, &scribbles, &mask, DEFAULT_GAMMA).unwrap();
        let planes_a =
            solve_chrominance(&image, &scribbles, &mask, &ColorizeOptions::default()).unwrap();
        let planes_b =
            solve_chrominance(&image, &scribbles, &mask, &ColorizeOptions::default()).unwrap();

        assert_eq!(first, second);
        assert_eq!(planes_a, planes_b);
    }

    #[test]
    fn colorize_with_empty_mask_returns_no_scribbles_error() {
        let image = gradient_image(5, 5);
        let mask = ScribbleMask::new(5, 5);

        let result = colorize(&image, &image, &mask, DEFAULT_GAMMA);

        assert_eq!(result, Err(ColorizeError::NoScribbles));
    }

    #[test]
    fn colorize_with_mismatched_scribbles_returns_dimension_error() {
        let image = gray_image(4, 4, 10);
        let scribbles = gray_image(4, 5, 10);
        let mask = ScribbleMask::filled(4, 4, true);

        let result = colorize(&image, &scribbles, &mask, DEFAULT_GAMMA);

        assert_eq!(
            result,
            Err(ColorizeError::DimensionMismatch {
                expected: (4, 4),
                actual: (4, 5)
            })
        );
    }

    #[test]
    fn colorize_with_mismatched_mask_returns_mask_error() {
        let image = gray_image(4, 4, 10);
        let mask = ScribbleMask::filled(3, 4, true);

        let result = colorize(&image, &image, &mask, DEFAULT_GAMMA);

        assert!(matches!(
            result,
            Err(ColorizeError::MaskDimensionMismatch { .. })
        ));
    }

    #[test]
    fn colorize_with_empty_image_returns_error() {
        let image = gray_image(0, 3, 10);
        let mask = ScribbleMask::new(0, 3);

        let result = colorize(&image, &image, &mask, DEFAULT_GAMMA);

        assert_eq!(
            result,
            Err(ColorizeError::EmptyImage {
                width: 0,
                height: 3
            })
        );
    }

    #[test]
    fn colorize_with_invalid_gamma_returns_error() {
        let image = gray_image(2, 2, 10);
        let mask = ScribbleMask::filled(2, 2, true);

        for gamma in [-0.5, f64::NAN, f64::INFINITY] {
            let result = colorize(&image, &image, &mask, gamma);
            assert!(matches!(result, Err(ColorizeError::InvalidGamma { .. })));
        }
    }

    #[test]
    fn colorize_with_iteration_cap_reports_failing_channel() {
        let image = gradient_image(8, 8);
        let scribbles = paint(&image, &[(0, 0)], RED);
        let mask = mask_at(8, 8, &[(0, 0)]);
        let solver = SolverSettings::default()
            .with_tolerance(1e-14)
            .with_max_iterations(1);
        let options = ColorizeOptions::default().with_solver(solver);

        let err = colorize_with(&image, &scribbles, &mask, &options).unwrap_err();

        assert_eq!(err.channel(), Some(Channel::U));
        assert!(matches!(
            err,
            ColorizeError::Convergence {
                source: SolveError::NotConverged { iterations: 1, .. },
                ..
            }
        ));
    }

    #[test]
    fn colorize_with_invalid_tolerance_returns_solver_error() {
        let image = gray_image(3, 3, 10);
        let mask = ScribbleMask::filled(3, 3, true);
        let solver = SolverSettings::default().with_tolerance(-1.0);
        let options = ColorizeOptions::default().with_solver(solver);

        let result = colorize_with(&image, &image, &mask, &options);

        assert!(matches!(
            result,
            Err(ColorizeError::Solver(SolveError::InvalidTolerance { .. }))
        ));
    }

    #[test]
    fn colorize_ext_consumes_image_and_matches_free_function() {
        let image = gradient_image(5, 5);
        let scribbles = paint(&image, &[(2, 2)], BLUE);
        let mask = mask_at(5, 5, &[(2, 2)]);
        let options = ColorizeOptions::default();

        let expected = colorize_with(&image, &scribbles, &mask, &options).unwrap();
        let result = image.colorize(&scribbles, &mask, &options).unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn colorize_dynamic_with_different_channel_counts_returns_error() {
        let image = DynamicImage::ImageLuma8(Image::<Luma<u8>>::new(3, 3));
        let scribbles = DynamicImage::ImageRgba8(Image::<Rgba<u8>>::new(3, 3));
        let mask = ScribbleMask::filled(3, 3, true);

        let result = colorize_dynamic(&image, &scribbles, &mask, &ColorizeOptions::default());

        assert_eq!(
            result,
            Err(ColorizeError::ChannelCountMismatch {
                expected: 1,
                actual: 4
            })
        );
    }

    #[test]
    fn colorize_dynamic_with_rgb_inputs_matches_typed_api() {
        let image = gradient_image(4, 4);
        let scribbles = paint(&image, &[(0, 3)], RED);
        let mask = mask_at(4, 4, &[(0, 3)]);
        let options = ColorizeOptions::default();

        let expected = colorize_with(&image, &scribbles, &mask, &options).unwrap();
        let result = colorize_dynamic(
            &DynamicImage::ImageRgb8(image),
            &DynamicImage::ImageRgb8(scribbles),
            &mask,
            &options,
        )
        .unwrap();

        assert_eq!(result, expected);
    }

    #[test]
    fn channel_display_names_channel() {
        assert_eq!(Channel::U.to_string(), "U");
        assert_eq!(Channel::V.to_string(), "V");
    }
}
