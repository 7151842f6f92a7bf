//! Extract the dominant colors of an image.
//!
//! Pixels are decoded with `image`, reduced to at most `k` representative
//! colors with a deterministic k-means in RGB space, and reported as
//! `#RRGGBB` / `RGB(r, g, b)` entries ordered by how much of the image they
//! cover. The same pipeline is exported to JavaScript through `wasm_bindgen`.

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;

pub mod config;
#[cfg(feature = "show")]
pub mod display;
pub mod error;
pub mod loader;
#[cfg(not(target_arch = "wasm32"))]
pub mod pipeline;
pub mod quantize;
pub mod report;

pub use config::{Config, OutputFormat};
pub use error::PaletteError;
pub use loader::LoadOptions;
pub use quantize::{Cluster, QuantizeOptions};
pub use report::{Palette, PaletteEntry};

/// Extract up to `n_colors` dominant colors from an encoded image.
pub fn extract_palette_bytes(
    input: &[u8],
    n_colors: usize,
    load_options: &LoadOptions,
    quantize_options: &QuantizeOptions,
) -> Result<Palette, PaletteError> {
    let pixels = loader::decode_pixels(input, load_options)?;
    quantize::quantize(&pixels, n_colors, quantize_options)
}

/// Extract up to `n_colors` dominant colors from an image file.
pub fn extract_palette_path(
    path: &std::path::Path,
    n_colors: usize,
    load_options: &LoadOptions,
    quantize_options: &QuantizeOptions,
) -> Result<Palette, PaletteError> {
    let pixels = loader::load_pixels(path, load_options)?;
    quantize::quantize(&pixels, n_colors, quantize_options)
}

/// JavaScript entry point.
///
/// Returns `{ palette: [{ hex, rgb: [r, g, b], count, weight, percent }] }`
/// with entries ordered by descending weight.
#[wasm_bindgen]
pub fn extract_palette(input: Vec<u8>, n_colors: usize) -> Result<Object, JsValue> {
    let palette = extract_palette_bytes(
        &input,
        n_colors,
        &LoadOptions::default(),
        &QuantizeOptions::default(),
    )
    .map_err(|e| JsValue::from_str(&e.describe()))?;

    let entries = Array::new();
    for entry in &palette {
        let rgb = Array::new();
        for channel in entry.rgb {
            rgb.push(&JsValue::from(channel));
        }

        let obj = Object::new();
        Reflect::set(&obj, &JsValue::from_str("hex"), &JsValue::from_str(&entry.hex))?;
        Reflect::set(&obj, &JsValue::from_str("rgb"), &rgb)?;
        Reflect::set(&obj, &JsValue::from_str("count"), &JsValue::from(entry.count as f64))?;
        Reflect::set(&obj, &JsValue::from_str("weight"), &JsValue::from(entry.weight))?;
        Reflect::set(&obj, &JsValue::from_str("percent"), &JsValue::from(entry.percent))?;
        entries.push(&obj);
    }

    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("palette"), &entries)?;
    Ok(result)
}
