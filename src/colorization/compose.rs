use image::{ImageBuffer, Rgb};
use imageproc::definitions::Image;
use itertools::izip;

use crate::colorization::color_space::Yuv;
use crate::error::ColorizeError;
use crate::utils::PixelGrid;

/// Recombines a luminance plane with solved chrominance planes into an RGB image.
///
/// All planes are row-major over `grid`. Out-of-range RGB values are clamped,
/// never wrapped.
///
/// # Errors
///
/// * `ColorizeError::PlaneLengthMismatch` - When a plane does not hold one value per pixel
pub fn compose_color_image(
    grid: PixelGrid,
    luminance: &[f64],
    u: &[f64],
    v: &[f64],
) -> Result<Image<Rgb<u8>>, ColorizeError> {
    let expected = grid.len();
    if let Some(actual) = [luminance.len(), u.len(), v.len()]
        .into_iter()
        .find(|&len| len != expected)
    {
        return Err(ColorizeError::PlaneLengthMismatch { expected, actual });
    }

    let buffer: Vec<u8> = izip!(luminance, u, v)
        .flat_map(|(&y, &u, &v)| Yuv { y, u, v }.to_rgb().0)
        .collect();

    let (width, height) = grid.dimensions();
    ImageBuffer::from_raw(width, height, buffer).ok_or(ColorizeError::PlaneLengthMismatch {
        expected,
        actual: expected,
    })
}
