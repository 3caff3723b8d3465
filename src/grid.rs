use serde::{Serialize, Serializer};

use crate::color::Color;
use crate::geometry::{GridType, Tiling};

/// One tile of the output grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub x: u32,
    pub y: u32,
    #[serde(serialize_with = "hex_color")]
    pub color: Color,
    pub palette_index: usize,
    /// Empty for unnumbered (white) cells.
    pub code: String,
}

/// Dense, row-major grid of labelled cells.
///
/// Built once per image and settings. Never edited afterwards; a new
/// conversion produces a new grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    #[serde(skip)]
    tiling: Tiling,
    grid_type: GridType,
    cell_size: f64,
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    /// Spacing between rendered cells, in pixels. Rendering metadata only.
    cell_gap: f64,
    /// Rotation of the rendered grid, in degrees. Rendering metadata only.
    rotation: f64,
}

impl Grid {
    /// `cells` must be row-major with exactly `width * height` entries.
    pub(crate) fn new(tiling: Tiling, width: u32, height: u32, cells: Vec<Cell>, cell_gap: f64, rotation: f64) -> Self {
        assert_eq!(
            cells.len(),
            width as usize * height as usize,
            "grid of {width}x{height} needs one cell per coordinate"
        );
        Self {
            tiling,
            grid_type: tiling.grid_type(),
            cell_size: tiling.cell_size(),
            width,
            height,
            cells,
            cell_gap,
            rotation,
        }
    }

    pub fn grid_type(&self) -> GridType {
        self.grid_type
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_gap(&self) -> f64 {
        self.cell_gap
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn tiling(&self) -> &Tiling {
        &self.tiling
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y as usize * self.width as usize + x as usize)
    }

    pub fn center(&self, x: u32, y: u32) -> (f64, f64) {
        self.tiling.center(x, y)
    }

    /// Overall pixel extent, for fitting the grid onto a page.
    pub fn pixel_size(&self) -> (f64, f64) {
        self.tiling.extent(self.width, self.height)
    }

    /// Cell under a point in grid pixel space.
    pub fn hit_test(&self, px: f64, py: f64) -> Option<&Cell> {
        let (x, y) = self.tiling.hit_test(self.width, self.height, px, py)?;
        self.cell(x, y)
    }
}

fn hex_color<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&color.to_hex())
}
