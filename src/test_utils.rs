//! Shared fixtures for unit tests.

use image::Rgb;
use imageproc::definitions::Image;

use crate::colorization::scribble_mask::ScribbleMask;

/// Uniform gray image.
pub fn gray_image(width: u32, height: u32, level: u8) -> Image<Rgb<u8>> {
    Image::from_pixel(width, height, Rgb([level, level, level]))
}

/// Gray image brightening diagonally from the top-left corner.
pub fn gradient_image(width: u32, height: u32) -> Image<Rgb<u8>> {
    let span = (width + height).max(2) - 2;
    Image::from_fn(width, height, |x, y| {
        let level = ((x + y) * 255 / span.max(1)) as u8;
        Rgb([level, level, level])
    })
}

/// Gray image whose left half is `left` and right half is `right`.
pub fn split_image(width: u32, height: u32, left: u8, right: u8) -> Image<Rgb<u8>> {
    Image::from_fn(width, height, |x, _| {
        let level = if x < width / 2 { left } else { right };
        Rgb([level, level, level])
    })
}

/// Deterministic pseudo-random color image.
pub fn noise_image(width: u32, height: u32, seed: u64) -> Image<Rgb<u8>> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    Image::from_fn(width, height, |_, _| {
        Rgb(core::array::from_fn(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 56) as u8
        }))
    })
}

/// Copy of `image` with `color` drawn at each of `pixels`.
pub fn paint(image: &Image<Rgb<u8>>, pixels: &[(u32, u32)], color: Rgb<u8>) -> Image<Rgb<u8>> {
    let mut painted = image.clone();
    for &(x, y) in pixels {
        painted.put_pixel(x, y, color);
    }
    painted
}

/// Mask with exactly `pixels` known.
pub fn mask_at(width: u32, height: u32, pixels: &[(u32, u32)]) -> ScribbleMask {
    ScribbleMask::from_fn(width, height, |x, y| pixels.contains(&(x, y)))
}
