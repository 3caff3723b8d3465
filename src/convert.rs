use serde::{Serialize, Serializer};

use crate::assign::{CellAssigner, PixelView};
use crate::color::Color;
use crate::config::ConvertOptions;
use crate::error::ConvertError;
use crate::geometry::Tiling;
use crate::grid::{Cell, Grid};
use crate::label::assign_labels;
use crate::palette::{Palette, Quantizer};

/// One entry of the final reduced palette, in label order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteEntry {
    #[serde(serialize_with = "hex_color")]
    pub color: Color,
    pub code: String,
    /// Nearest named reference color, for display.
    pub name: &'static str,
    pub cell_count: usize,
}

/// Result of one conversion: the labelled grid plus its palette.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Conversion {
    pub grid: Grid,
    pub palette: Vec<PaletteEntry>,
}

impl Conversion {
    pub fn palette_colors(&self) -> Vec<Color> {
        self.palette.iter().map(|e| e.color).collect()
    }
}

/// Convert a raw RGBA8 buffer with the k-means quantizer described by `options`.
pub fn convert_rgba(width: u32, height: u32, rgba: &[u8], options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    convert_with(width, height, rgba, options, &options.quantizer())
}

/// Convert a raw RGBA8 buffer, taking the broad palette from `quantizer`.
///
/// quantize → deduplicate → assign cells → merge minor colors → compact → label.
pub fn convert_with<Q: Quantizer + ?Sized>(
    width: u32,
    height: u32,
    rgba: &[u8],
    options: &ConvertOptions,
    quantizer: &Q,
) -> Result<Conversion, ConvertError> {
    options.validate()?;
    if width == 0 || height == 0 {
        return Err(ConvertError::EmptyImage { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(ConvertError::BufferSize {
            expected,
            actual: rgba.len(),
        });
    }
    let tiling = Tiling::new(options.grid_type, options.cell_size)?;

    // ----------------------
    // 1. Broad palette
    // ----------------------
    let pixels: Vec<[u8; 4]> = rgba
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();
    let mut initial = quantizer.quantize(&pixels, options.n_colors);
    initial.truncate(options.n_colors);
    if initial.is_empty() {
        return Err(ConvertError::NoOpaquePixels);
    }
    tracing::debug!(colors = initial.len(), requested = options.n_colors, "quantized");

    // ----------------------
    // 2. Deduplicate
    // ----------------------
    let (palette, _) = Palette::new(initial).deduplicate(options.dedup_threshold, options.dedup_metric);
    tracing::debug!(
        colors = palette.len(),
        threshold = options.dedup_threshold,
        "deduplicated palette"
    );

    // ----------------------
    // 3. Assign cells
    // ----------------------
    let (cols, rows) = tiling.dimensions_for(width, height);
    let view = PixelView { width, height, rgba };
    let assigned = CellAssigner::new(&palette, options.assign_mode()).assign_grid(view, &tiling, cols, rows);

    // ----------------------
    // 4. Prune and compact
    // ----------------------
    let merged = palette.merge_minor_colors(&assigned, options.min_cell_count);
    let remapped = assigned.iter().zip(&merged).filter(|(a, b)| a != b).count();
    let (palette, indices) = palette.compact(&merged);
    tracing::debug!(
        remapped_cells = remapped,
        colors = palette.len(),
        "merged minor colors"
    );

    // ----------------------
    // 5. Label
    // ----------------------
    let usage = palette.usage_counts(&indices);
    let labels = assign_labels(&palette, &usage);

    let cells = indices
        .iter()
        .enumerate()
        .map(|(i, &idx)| Cell {
            x: (i % cols as usize) as u32,
            y: (i / cols as usize) as u32,
            color: palette.color(idx),
            palette_index: idx,
            code: labels.codes[idx].clone(),
        })
        .collect();
    let grid = Grid::new(tiling, cols, rows, cells, options.cell_gap, options.rotation);

    let entries = palette
        .colors()
        .iter()
        .enumerate()
        .map(|(idx, &color)| PaletteEntry {
            color,
            code: labels.codes[idx].clone(),
            name: labels.names[idx],
            cell_count: usage[idx],
        })
        .collect();

    tracing::info!(
        grid_type = %options.grid_type,
        width = cols,
        height = rows,
        colors = palette.len(),
        "built grid"
    );

    Ok(Conversion {
        grid,
        palette: entries,
    })
}

fn hex_color<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&color.to_hex())
}
