use image::{GrayImage, ImageBuffer, Luma, Pixel};
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::map::map_colors2;
use imageproc::morphology::erode;
use itertools::izip;

use crate::error::ScribbleMaskError;
use crate::utils::{PixelGrid, validate_image_pair};

const MARKED: u8 = u8::MAX;
const UNMARKED: u8 = 0;

/// Parameters for scribble mask extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskOptions {
    /// A pixel is marked when the summed per-channel absolute difference exceeds this value.
    pub eps: f64,
    /// Rounds of 3x3 erosion applied to the thresholded mask.
    pub n_erosions: u32,
}

impl MaskOptions {
    #[must_use]
    pub const fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    #[must_use]
    pub const fn with_erosions(mut self, n_erosions: u32) -> Self {
        self.n_erosions = n_erosions;
        self
    }
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            eps: 1.0,
            n_erosions: 1,
        }
    }
}

/// Per-pixel flags telling which pixels carry a user-supplied color.
///
/// `true` means the pixel's chrominance is known and held fixed while solving;
/// `false` means it is solved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScribbleMask {
    grid: PixelGrid,
    known: Vec<bool>,
}

impl ScribbleMask {
    /// Creates a mask with every pixel unknown.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, false)
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, known: bool) -> Self {
        let grid = PixelGrid::new(width, height);
        Self {
            grid,
            known: vec![known; grid.len()],
        }
    }

    /// Builds a mask by evaluating `f(x, y)` for each pixel in row-major order.
    #[must_use]
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let grid = PixelGrid::new(width, height);
        let known = grid
            .indices()
            .filter_map(|index| grid.coordinates(index))
            .map(|(x, y)| f(x, y))
            .collect();
        Self { grid, known }
    }

    /// Reads a grayscale mask image: non-zero pixels are known.
    #[must_use]
    pub fn from_luma(mask: &GrayImage) -> Self {
        let (width, height) = mask.dimensions();
        Self {
            grid: PixelGrid::new(width, height),
            known: mask.pixels().map(|Luma([value])| *value > 0).collect(),
        }
    }

    /// Renders the mask as a grayscale image (255 = known, 0 = unknown).
    #[must_use]
    pub fn to_luma(&self) -> GrayImage {
        let (width, height) = self.grid.dimensions();
        ImageBuffer::from_fn(width, height, |x, y| {
            Luma([if self.is_known(x, y) { MARKED } else { UNMARKED }])
        })
    }

    #[inline]
    #[must_use]
    pub const fn grid(&self) -> PixelGrid {
        self.grid
    }

    #[inline]
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        self.grid.dimensions()
    }

    /// Whether `(x, y)` is known. Coordinates outside the mask are unknown.
    #[must_use]
    pub fn is_known(&self, x: u32, y: u32) -> bool {
        self.grid
            .index(x, y)
            .is_some_and(|index| self.known[index])
    }

    /// Sets the flag at `(x, y)`; returns `false` if the coordinate is out of bounds.
    pub fn set(&mut self, x: u32, y: u32, known: bool) -> bool {
        match self.grid.index(x, y) {
            Some(index) => {
                self.known[index] = known;
                true
            }
            None => false,
        }
    }

    /// Flags in row-major order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.known
    }

    #[must_use]
    pub fn count_known(&self) -> usize {
        self.known.iter().filter(|&&known| known).count()
    }

    #[must_use]
    pub fn has_known(&self) -> bool {
        self.known.contains(&true)
    }
}

/// Trait for extracting a scribble mask from an image and its scribbled copy.
pub trait ScribbleMaskExt {
    /// Marks the pixels where `scribbles` differs from `self`.
    ///
    /// # Arguments
    ///
    /// * `scribbles` - The same image with user color strokes drawn over it
    /// * `options` - Difference threshold and erosion rounds
    ///
    /// # Errors
    ///
    /// * `ScribbleMaskError::DimensionMismatch` - When the two images differ in size
    /// * `ScribbleMaskError::EmptyImage` - When the images have no pixels
    /// * `ScribbleMaskError::InvalidThreshold` - When `eps` is negative or not finite
    ///
    /// # Examples
    ///
    /// ```
    /// use scribble_colorize::{Image, MaskOptions, ScribbleMaskExt};
    /// use image::Rgb;
    ///
    /// let image: Image<Rgb<u8>> = Image::from_pixel(8, 8, Rgb([90, 90, 90]));
    /// let mut scribbles = image.clone();
    /// for y in 2..6 {
    ///     for x in 2..6 {
    ///         scribbles.put_pixel(x, y, Rgb([200, 40, 40]));
    ///     }
    /// }
    ///
    /// let mask = image.scribble_mask(&scribbles, MaskOptions::default()).unwrap();
    /// assert_eq!(mask.count_known(), 4);
    /// ```
    fn scribble_mask(
        &self,
        scribbles: &Self,
        options: MaskOptions,
    ) -> Result<ScribbleMask, ScribbleMaskError>;
}

impl<P> ScribbleMaskExt for Image<P>
where
    P: Pixel,
    f64: From<P::Subpixel>,
{
    fn scribble_mask(
        &self,
        scribbles: &Self,
        options: MaskOptions,
    ) -> Result<ScribbleMask, ScribbleMaskError> {
        get_scribble_mask(self, scribbles, options)
    }
}

/// Derives the known-color mask from the difference between an image and its scribbled copy.
///
/// The per-channel absolute differences are summed per pixel, the sum is
/// thresholded against `options.eps` (strictly greater marks the pixel), and
/// the result is eroded `options.n_erosions` times with a 3x3 square element.
/// Erosion strips the anti-aliased rim of each stroke; strokes thinner than
/// `2 * n_erosions + 1` pixels disappear entirely.
///
/// # Errors
///
/// See [`ScribbleMaskExt::scribble_mask`].
pub fn get_scribble_mask<P>(
    image: &Image<P>,
    scribbles: &Image<P>,
    options: MaskOptions,
) -> Result<ScribbleMask, ScribbleMaskError>
where
    P: Pixel,
    f64: From<P::Subpixel>,
{
    let MaskOptions { eps, n_erosions } = options;
    if !eps.is_finite() || eps < 0.0 {
        return Err(ScribbleMaskError::InvalidThreshold { eps });
    }
    validate_image_pair(image.dimensions(), scribbles.dimensions())?;

    let mut mask = threshold_difference_impl(image, scribbles, eps);
    for _ in 0..n_erosions {
        mask = erode(&mask, Norm::LInf, 1);
    }

    Ok(ScribbleMask::from_luma(&mask))
}

/// Binarizes the summed absolute channel difference of two equally sized images.
fn threshold_difference_impl<P>(image: &Image<P>, scribbles: &Image<P>, eps: f64) -> GrayImage
where
    P: Pixel,
    f64: From<P::Subpixel>,
{
    map_colors2(image, scribbles, |original, scribbled| {
        let difference: f64 = izip!(original.channels(), scribbled.channels())
            .map(|(&a, &b)| (f64::from(a) - f64::from(b)).abs())
            .sum();
        Luma([if difference > eps { MARKED } else { UNMARKED }])
    })
}
