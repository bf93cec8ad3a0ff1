//! Conversion between 8-bit RGB and the analog YUV luma-chroma representation.
//!
//! ```text
//! Y = 0.299 R + 0.587 G + 0.114 B
//! U = 0.492 (B - Y)
//! V = 0.877 (R - Y)
//! ```
//!
//! Chrominance is kept centered on zero, so a gray pixel has `U = V = 0`.
//! The inverse is the exact algebraic inverse of the forward transform,
//! which makes an RGB8 → YUV → RGB8 round trip lossless.

use image::Rgb;
use imageproc::definitions::{Clamp, Image};

const LUMA_RED: f64 = 0.299;
const LUMA_GREEN: f64 = 0.587;
const LUMA_BLUE: f64 = 0.114;
const U_SCALE: f64 = 0.492;
const V_SCALE: f64 = 0.877;

/// One pixel in luma-chroma form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Yuv {
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

impl Yuv {
    #[must_use]
    pub fn from_rgb(pixel: Rgb<u8>) -> Self {
        let [red, green, blue] = pixel.0.map(f64::from);
        let y = LUMA_RED * red + LUMA_GREEN * green + LUMA_BLUE * blue;
        Self {
            y,
            u: U_SCALE * (blue - y),
            v: V_SCALE * (red - y),
        }
    }

    /// Converts back to RGB, rounding to nearest and clamping to `[0, 255]`.
    #[must_use]
    pub fn to_rgb(self) -> Rgb<u8> {
        let red = self.y + self.v / V_SCALE;
        let blue = self.y + self.u / U_SCALE;
        let green = (self.y - LUMA_RED * red - LUMA_BLUE * blue) / LUMA_GREEN;
        Rgb([red, green, blue].map(quantize_impl))
    }
}

#[inline]
fn quantize_impl(value: f64) -> u8 {
    <u8 as Clamp<f32>>::clamp(value.round() as f32)
}

/// Luminance and chrominance planes of an image, flattened row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct YuvPlanes {
    pub y: Vec<f64>,
    pub u: Vec<f64>,
    pub v: Vec<f64>,
}

/// Splits an RGB image into row-major Y, U and V planes.
#[must_use]
pub fn split_yuv_planes(image: &Image<Rgb<u8>>) -> YuvPlanes {
    let len = image.width() as usize * image.height() as usize;
    let mut planes = YuvPlanes {
        y: Vec::with_capacity(len),
        u: Vec::with_capacity(len),
        v: Vec::with_capacity(len),
    };

    for pixel in image.pixels() {
        let Yuv { y, u, v } = Yuv::from_rgb(*pixel);
        planes.y.push(y);
        planes.u.push(u);
        planes.v.push(v);
    }

    planes
}
