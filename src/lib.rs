//! Photo → paint-by-number template conversion.
//!
//! An image is cut into a grid of square, diamond, honeycomb or
//! hexagon-approximated ("pentagon") cells. Each cell gets exactly one color
//! from a small perceptually deduplicated palette and a short code (`1`..`9`,
//! `A`, `B`, …). White cells stay unnumbered.
//!
//! Steps performed:
//! 1. Build a broad palette from the opaque pixels (k-means in Lab, or a caller palette).
//! 2. Merge near-identical palette entries, greedy first match, CIEDE2000.
//! 3. Pick each cell's entry by per-pixel vote or minimum total CIEDE2000 error.
//! 4. Fold rarely used entries into their nearest frequent neighbour.
//! 5. Number the remaining non-white entries in scan order.

use image::GenericImageView;
use js_sys::{Array, Object, Reflect, Uint32Array};
use wasm_bindgen::prelude::*;

pub mod assign;
pub mod color;
pub mod config;
pub mod convert;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod label;
pub mod palette;

pub use assign::{AssignMode, CellAssigner, PixelView};
pub use color::{Color, LabCache, LabColor, delta_e76, delta_e2000, to_lab};
pub use config::ConvertOptions;
pub use convert::{Conversion, PaletteEntry, convert_rgba, convert_with};
pub use error::ConvertError;
pub use geometry::{GridType, SearchWindow, Tiling};
pub use grid::{Cell, Grid};
pub use label::{Labels, assign_labels, code_for, reference_name};
pub use crate::palette::{FixedPalette, KMeansQuantizer, MergeMetric, Palette, Quantizer};

fn decode_rgba(input: &[u8]) -> Result<(u32, u32, Vec<u8>), ConvertError> {
    let img = image::load_from_memory(input)?;
    let (w, h) = img.dimensions();
    Ok((w, h, img.to_rgba8().into_raw()))
}

/// Decode an encoded image (PNG, JPEG, …) and convert it.
#[cfg(not(target_arch = "wasm32"))]
pub fn convert_bytes(input: &[u8], options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    options.validate()?;
    let (w, h, raw) = decode_rgba(input)?;
    convert_rgba(w, h, &raw, options)
}

/// Decode and convert, restricting the palette to the given hex colors.
#[cfg(not(target_arch = "wasm32"))]
pub fn convert_bytes_with_palette<S: AsRef<str>>(
    input: &[u8],
    options: &ConvertOptions,
    palette_hex: &[S],
) -> Result<Conversion, ConvertError> {
    options.validate()?;
    let fixed = FixedPalette::from_hex(palette_hex)?;
    let (w, h, raw) = decode_rgba(input)?;
    convert_with(w, h, &raw, options, &fixed)
}

/// Row-major index of cell `(x, y)`, or `None` when it does not fit in a `u32`.
fn dense_index(width: u32, x: u32, y: u32) -> Option<u32> {
    y.checked_mul(width)?.checked_add(x)
}

// ------------------------------------------------------------
// wasm bindings
// ------------------------------------------------------------

fn js_err(e: ConvertError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Convert an encoded image into a paint-by-number grid.
///
/// Returns `{ width, height, gridType, cellSize, pixelWidth, pixelHeight,
/// indices, codes, palette, names }` where `indices` holds one palette index
/// per cell (row-major) and `codes`/`palette`/`names` are indexed by palette
/// entry. `palette` holds hex strings.
#[wasm_bindgen]
pub fn paint_by_number(
    input: Vec<u8>,
    grid_type: String,
    cell_size: f64,
    n_colors: usize,
    block_average: bool,
) -> Result<Object, JsValue> {
    let grid_type: GridType = grid_type.parse().map_err(js_err)?;
    let options = ConvertOptions::new(grid_type, cell_size, n_colors, block_average);
    options.validate().map_err(js_err)?;
    let (w, h, raw) = decode_rgba(&input).map_err(js_err)?;
    let conversion = convert_rgba(w, h, &raw, &options).map_err(js_err)?;
    let grid = &conversion.grid;

    let indices: Vec<u32> = grid.cells().iter().map(|c| c.palette_index as u32).collect();
    let codes = Array::new();
    let palette_js = Array::new();
    let names = Array::new();
    for entry in &conversion.palette {
        codes.push(&JsValue::from_str(&entry.code));
        palette_js.push(&JsValue::from_str(&entry.color.to_hex()));
        names.push(&JsValue::from_str(entry.name));
    }
    let (pixel_w, pixel_h) = grid.pixel_size();

    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("width"), &JsValue::from(grid.width()))?;
    Reflect::set(&result, &JsValue::from_str("height"), &JsValue::from(grid.height()))?;
    Reflect::set(&result, &JsValue::from_str("gridType"), &JsValue::from_str(grid.grid_type().as_str()))?;
    Reflect::set(&result, &JsValue::from_str("cellSize"), &JsValue::from_f64(grid.cell_size()))?;
    Reflect::set(&result, &JsValue::from_str("pixelWidth"), &JsValue::from_f64(pixel_w))?;
    Reflect::set(&result, &JsValue::from_str("pixelHeight"), &JsValue::from_f64(pixel_h))?;
    Reflect::set(&result, &JsValue::from_str("indices"), &Uint32Array::from(indices.as_slice()))?;
    Reflect::set(&result, &JsValue::from_str("codes"), &codes)?;
    Reflect::set(&result, &JsValue::from_str("palette"), &palette_js)?;
    Reflect::set(&result, &JsValue::from_str("names"), &names)?;

    Ok(result)
}

/// Map a click in grid pixel space to a row-major cell index.
#[wasm_bindgen]
pub fn hit_test_cell(
    grid_type: String,
    cell_size: f64,
    width: u32,
    height: u32,
    px: f64,
    py: f64,
) -> Result<Option<u32>, JsValue> {
    let grid_type: GridType = grid_type.parse().map_err(js_err)?;
    let tiling = Tiling::new(grid_type, cell_size).map_err(js_err)?;
    match tiling.hit_test(width, height, px, py) {
        Some((x, y)) => dense_index(width, x, y)
            .map(Some)
            .ok_or_else(|| JsValue::from_str("cell index exceeds u32 range")),
        None => Ok(None),
    }
}
