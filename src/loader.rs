use std::path::Path;

use image::{DynamicImage, GenericImageView, imageops::FilterType};
use palette::Srgb;
use tracing::debug;

use crate::error::PaletteError;

/// Longest side images are shrunk to before clustering.
pub const DEFAULT_MAX_SIDE: u32 = 800;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Longest side after downscaling. `None` keeps every pixel.
    pub max_side: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_side: Some(DEFAULT_MAX_SIDE),
        }
    }
}

/// Read and decode an image file into opaque sRGB pixels.
pub fn load_pixels(path: &Path, options: &LoadOptions) -> Result<Vec<Srgb<u8>>, PaletteError> {
    let img = image::open(path).map_err(|source| PaletteError::ImageRead {
        origin: path.display().to_string(),
        source,
    })?;
    Ok(pixels_from_image(img, options))
}

/// Decode an in-memory encoded image into opaque sRGB pixels.
pub fn decode_pixels(input: &[u8], options: &LoadOptions) -> Result<Vec<Srgb<u8>>, PaletteError> {
    let img = image::load_from_memory(input).map_err(|source| PaletteError::ImageRead {
        origin: format!("<{} bytes in memory>", input.len()),
        source,
    })?;
    Ok(pixels_from_image(img, options))
}

/// Flatten a decoded image into the pixel sequence the quantizer works on.
///
/// The image is first shrunk so its longest side is at most
/// `options.max_side`, then any alpha channel is composited over white.
pub fn pixels_from_image(img: DynamicImage, options: &LoadOptions) -> Vec<Srgb<u8>> {
    let (orig_w, orig_h) = img.dimensions();
    let img = match options.max_side {
        Some(max_side) => downscale(img, max_side),
        None => img,
    };
    let (w, h) = img.dimensions();
    debug!(orig_w, orig_h, w, h, "decoded image");

    if img.color().has_alpha() {
        img.to_rgba8()
            .pixels()
            .map(|p| flatten_on_white(p.0))
            .collect()
    } else {
        img.to_rgb8()
            .pixels()
            .map(|p| Srgb::new(p[0], p[1], p[2]))
            .collect()
    }
}

// ------------------------------------------------------------
// Pixel preparation helpers
// ------------------------------------------------------------

/// Shrink so the longest side equals `max_side`, keeping the aspect ratio.
///
/// Nearest-neighbour sampling keeps only colors that exist in the source,
/// so the shrink acts as a stride sample rather than blending new colors in.
/// Images already within bounds are returned untouched; this never upscales.
fn downscale(img: DynamicImage, max_side: u32) -> DynamicImage {
    let (orig_w, orig_h) = img.dimensions();
    let longest = orig_w.max(orig_h);
    if max_side == 0 || longest <= max_side {
        return img;
    }

    let ratio = max_side as f32 / longest as f32;
    let w = ((orig_w as f32) * ratio).round().max(1.0) as u32;
    let h = ((orig_h as f32) * ratio).round().max(1.0) as u32;
    DynamicImage::ImageRgba8(image::imageops::resize(&img, w, h, FilterType::Nearest))
}

/// Composite a straight-alpha pixel over an opaque white background.
///
/// Each channel becomes `c * a + 255 * (255 - a)`, divided by 255 with
/// rounding, so fully transparent pixels count as white and opaque ones
/// are unchanged.
fn flatten_on_white([r, g, b, a]: [u8; 4]) -> Srgb<u8> {
    let blend = |c: u8| -> u8 {
        let a = a as u32;
        ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
    };
    Srgb::new(blend(r), blend(g), blend(b))
}
