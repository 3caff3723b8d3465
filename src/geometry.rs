//! Tiling math for the four supported grid layouts.
//!
//! Every layout places cells in rows. Odd rows of the staggered layouts are
//! shifted right by half a cell. A [`Tiling`] maps integer cell coordinates to
//! a center point and an exact shape, and maps a point back to the cell that
//! contains it.

use std::f64::consts::SQRT_2;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Vertex angles (degrees) of the pointy-top hexagon used by the pentagon layout.
const HEX_VERTEX_ANGLES: [f64; 6] = [-90.0, -30.0, 30.0, 90.0, 150.0, 210.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    #[default]
    Square,
    Diamond,
    Honeycomb,
    /// Hexagon-approximated layout with overlapping rows.
    Pentagon,
}

impl GridType {
    pub const ALL: [GridType; 4] = [
        GridType::Square,
        GridType::Diamond,
        GridType::Honeycomb,
        GridType::Pentagon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GridType::Square => "square",
            GridType::Diamond => "diamond",
            GridType::Honeycomb => "honeycomb",
            GridType::Pentagon => "pentagon",
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square" => Ok(GridType::Square),
            "diamond" => Ok(GridType::Diamond),
            "honeycomb" | "hexagon" => Ok(GridType::Honeycomb),
            "pentagon" => Ok(GridType::Pentagon),
            _ => Err(ConvertError::UnknownGridType(s.to_string())),
        }
    }
}

/// Rows that may contain a point, searched top to bottom.
///
/// Square, diamond and honeycomb rows never overlap so the band is a single
/// row. Pentagon rows overlap vertically and need the neighbours as well.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    pub row: i64,
    pub spread: i64,
}

impl SearchWindow {
    pub fn rows(&self) -> std::ops::RangeInclusive<i64> {
        self.row.saturating_sub(self.spread)..=self.row.saturating_add(self.spread)
    }
}

/// Geometry parameters for one grid layout. Fixed for the lifetime of a grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tiling {
    Square { size: f64 },
    Diamond { size: f64, radius: f64 },
    Honeycomb { size: f64, radius: f64, row_step: f64 },
    Pentagon { size: f64, radius: f64, row_step: f64 },
}

impl Tiling {
    pub fn new(grid_type: GridType, cell_size: f64) -> Result<Self, ConvertError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(ConvertError::InvalidCellSize(cell_size));
        }
        let size = cell_size;
        Ok(match grid_type {
            GridType::Square => Tiling::Square { size },
            GridType::Diamond => Tiling::Diamond { size, radius: size / 2.0 },
            GridType::Honeycomb => {
                let radius = size / 2.0;
                Tiling::Honeycomb { size, radius, row_step: SQRT_3 * radius }
            }
            GridType::Pentagon => {
                let radius = size / SQRT_3;
                Tiling::Pentagon { size, radius, row_step: 1.5 * radius }
            }
        })
    }

    pub fn grid_type(&self) -> GridType {
        match self {
            Tiling::Square { .. } => GridType::Square,
            Tiling::Diamond { .. } => GridType::Diamond,
            Tiling::Honeycomb { .. } => GridType::Honeycomb,
            Tiling::Pentagon { .. } => GridType::Pentagon,
        }
    }

    pub fn cell_size(&self) -> f64 {
        match *self {
            Tiling::Square { size }
            | Tiling::Diamond { size, .. }
            | Tiling::Honeycomb { size, .. }
            | Tiling::Pentagon { size, .. } => size,
        }
    }

    pub fn radius(&self) -> f64 {
        match *self {
            Tiling::Square { size } => size / 2.0,
            Tiling::Diamond { radius, .. }
            | Tiling::Honeycomb { radius, .. }
            | Tiling::Pentagon { radius, .. } => radius,
        }
    }

    /// Vertical distance between consecutive row centers.
    pub fn row_step(&self) -> f64 {
        match *self {
            Tiling::Square { size } => size,
            Tiling::Diamond { radius, .. } => radius,
            Tiling::Honeycomb { row_step, .. } | Tiling::Pentagon { row_step, .. } => row_step,
        }
    }

    /// Horizontal shift applied to row `y`.
    #[inline]
    fn row_offset(&self, y: i64) -> f64 {
        match self {
            Tiling::Square { .. } => 0.0,
            _ if y.rem_euclid(2) == 1 => self.cell_size() / 2.0,
            _ => 0.0,
        }
    }

    #[inline]
    pub fn center(&self, x: u32, y: u32) -> (f64, f64) {
        self.center_i(x as i64, y as i64)
    }

    #[inline]
    fn center_i(&self, x: i64, y: i64) -> (f64, f64) {
        let size = self.cell_size();
        let cx = x as f64 * size + size / 2.0 + self.row_offset(y);
        let cy = (y as f64 + 0.5) * self.row_step();
        (cx, cy)
    }

    /// Number of columns and rows needed to cover an image.
    pub fn dimensions_for(&self, image_width: u32, image_height: u32) -> (u32, u32) {
        let cols = (image_width as f64 / self.cell_size()).ceil().max(1.0) as u32;
        let rows = (image_height as f64 / self.row_step()).ceil().max(1.0) as u32;
        (cols, rows)
    }

    /// Overall pixel extent of a `width` x `height` grid.
    pub fn extent(&self, width: u32, height: u32) -> (f64, f64) {
        let size = self.cell_size();
        let stagger = match self {
            Tiling::Square { .. } => 0.0,
            _ if height > 1 => size / 2.0,
            _ => 0.0,
        };
        (
            width as f64 * size + stagger,
            height as f64 * self.row_step(),
        )
    }

    /// Half extents of a cell's shape around its center.
    fn half_extents(&self) -> (f64, f64) {
        match *self {
            Tiling::Square { size } => (size / 2.0, size / 2.0),
            Tiling::Diamond { radius, .. } => (radius * SQRT_2, radius * SQRT_2),
            Tiling::Honeycomb { radius, .. } => (radius, radius),
            Tiling::Pentagon { radius, .. } => (radius * SQRT_3 / 2.0, radius),
        }
    }

    /// The six corners of a pentagon-layout cell, starting at the top vertex.
    pub fn hexagon_vertices(&self, x: u32, y: u32) -> [(f64, f64); 6] {
        self.hexagon_vertices_i(x as i64, y as i64)
    }

    fn hexagon_vertices_i(&self, x: i64, y: i64) -> [(f64, f64); 6] {
        let (cx, cy) = self.center_i(x, y);
        let r = self.radius();
        HEX_VERTEX_ANGLES.map(|deg: f64| {
            let rad = deg.to_radians();
            (cx + r * rad.cos(), cy + r * rad.sin())
        })
    }

    /// Exact shape containment test for cell `(x, y)`.
    pub fn contains(&self, x: u32, y: u32, px: f64, py: f64) -> bool {
        self.contains_i(x as i64, y as i64, px, py)
    }

    fn contains_i(&self, x: i64, y: i64, px: f64, py: f64) -> bool {
        let (cx, cy) = self.center_i(x, y);
        let dx = px - cx;
        let dy = py - cy;
        match *self {
            Tiling::Square { size } => {
                let r = size / 2.0;
                dx.abs() <= r && dy.abs() <= r
            }
            Tiling::Diamond { radius, .. } => dx.abs() + dy.abs() <= radius * SQRT_2,
            Tiling::Honeycomb { radius, .. } => dx * dx + dy * dy <= radius * radius,
            Tiling::Pentagon { .. } => point_in_polygon(&self.hexagon_vertices_i(x, y), px, py),
        }
    }

    pub fn search_window(&self, py: f64) -> SearchWindow {
        let row = (py / self.row_step()).floor() as i64;
        let spread = match self {
            Tiling::Pentagon { .. } => 1,
            _ => 0,
        };
        SearchWindow { row, spread }
    }

    /// Map a point back to the cell containing it, or `None` outside the grid.
    ///
    /// Candidates are scanned row by row through the search window, and within
    /// a row over the estimated column and its two neighbours. The first cell
    /// whose exact shape contains the point wins.
    pub fn hit_test(&self, width: u32, height: u32, px: f64, py: f64) -> Option<(u32, u32)> {
        if !px.is_finite() || !py.is_finite() {
            return None;
        }
        let size = self.cell_size();
        for row in self.search_window(py).rows() {
            if row < 0 || row >= height as i64 {
                continue;
            }
            let col = ((px - self.row_offset(row)) / size).floor() as i64;
            for c in col.saturating_sub(1)..=col.saturating_add(1) {
                if c < 0 || c >= width as i64 {
                    continue;
                }
                if self.contains_i(c, row, px, py) {
                    return Some((c as u32, row as u32));
                }
            }
        }
        None
    }

    /// Calls `f(px, py)` for every image pixel whose center lies inside cell `(x, y)`.
    pub fn for_each_covered_pixel<F>(&self, x: u32, y: u32, image_width: u32, image_height: u32, mut f: F)
    where
        F: FnMut(u32, u32),
    {
        let (cx, cy) = self.center(x, y);
        let (hx, hy) = self.half_extents();

        let x_start = (cx - hx - 0.5).floor().max(0.0) as u32;
        let x_end = ((cx + hx).ceil().max(0.0) as u32).min(image_width);
        let y_start = (cy - hy - 0.5).floor().max(0.0) as u32;
        let y_end = ((cy + hy).ceil().max(0.0) as u32).min(image_height);

        for py in y_start..y_end {
            for px in x_start..x_end {
                if self.contains(x, y, px as f64 + 0.5, py as f64 + 0.5) {
                    f(px, py);
                }
            }
        }
    }
}

/// Even-odd ray casting.
fn point_in_polygon(vertices: &[(f64, f64)], px: f64, py: f64) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiling(grid_type: GridType, size: f64) -> Tiling {
        Tiling::new(grid_type, size).unwrap()
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Tiling::new(GridType::Square, bad),
                Err(ConvertError::InvalidCellSize(_))
            ));
        }
    }

    #[test]
    fn grid_type_parses_and_displays() {
        for t in GridType::ALL {
            assert_eq!(t.to_string().parse::<GridType>().unwrap(), t);
        }
        assert_eq!("Hexagon".parse::<GridType>().unwrap(), GridType::Honeycomb);
        assert!("triangle".parse::<GridType>().is_err());
    }

    #[test]
    fn square_centers_and_extent() {
        let t = tiling(GridType::Square, 10.0);
        assert_eq!(t.center(0, 0), (5.0, 5.0));
        assert_eq!(t.center(3, 2), (35.0, 25.0));
        assert_eq!(t.radius(), 5.0);
        assert_eq!(t.extent(4, 3), (40.0, 30.0));
        assert_eq!(t.dimensions_for(20, 20), (2, 2));
        assert_eq!(t.dimensions_for(21, 19), (3, 2));
    }

    #[test]
    fn honeycomb_rows_are_staggered_by_radius() {
        let t = tiling(GridType::Honeycomb, 20.0);
        let row_step = SQRT_3 * 10.0;
        assert!((t.row_step() - row_step).abs() < 1e-12);
        for x in 0..4 {
            let (even_x, even_y) = t.center(x, 0);
            let (odd_x, odd_y) = t.center(x, 1);
            let (next_x, next_y) = t.center(x, 2);
            assert!((odd_x - even_x - 10.0).abs() < 1e-12);
            assert_eq!(next_x, even_x);
            assert!((odd_y - even_y - row_step).abs() < 1e-12);
            assert!((next_y - odd_y - row_step).abs() < 1e-12);
        }
        let (w, h) = t.extent(4, 3);
        assert_eq!(w, 90.0);
        assert!((h - 3.0 * row_step).abs() < 1e-12);
    }

    #[test]
    fn diamond_and_pentagon_parameters() {
        let d = tiling(GridType::Diamond, 10.0);
        assert_eq!(d.row_step(), 5.0);
        assert_eq!(d.center(0, 1), (10.0, 7.5));

        let p = tiling(GridType::Pentagon, 12.0);
        let r = 12.0 / SQRT_3;
        assert!((p.radius() - r).abs() < 1e-12);
        assert!((p.row_step() - 1.5 * r).abs() < 1e-12);
        assert_eq!(p.center(1, 1).0, 12.0 + 6.0 + 6.0);
    }

    #[test]
    fn hexagon_vertices_start_at_top() {
        let p = tiling(GridType::Pentagon, 12.0);
        let (cx, cy) = p.center(0, 0);
        let v = p.hexagon_vertices(0, 0);
        assert!((v[0].0 - cx).abs() < 1e-9);
        assert!((v[0].1 - (cy - p.radius())).abs() < 1e-9);
        assert!((v[1].0 - v[5].0 - 12.0).abs() < 1e-9);
    }

    #[test]
    fn every_center_hits_its_own_cell() {
        for grid_type in GridType::ALL {
            for size in [1.0, 7.0, 10.0, 13.5, 20.0] {
                let t = tiling(grid_type, size);
                let (w, h) = (7, 9);
                for y in 0..h {
                    for x in 0..w {
                        let (cx, cy) = t.center(x, y);
                        assert_eq!(
                            t.hit_test(w, h, cx, cy),
                            Some((x, y)),
                            "{grid_type} size {size} cell ({x},{y})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn hit_test_outside_grid_is_none() {
        let t = tiling(GridType::Square, 10.0);
        assert_eq!(t.hit_test(2, 2, -1.0, 5.0), None);
        assert_eq!(t.hit_test(2, 2, 25.0, 5.0), None);
        assert_eq!(t.hit_test(2, 2, 5.0, 25.0), None);
        assert_eq!(t.hit_test(2, 2, f64::NAN, 5.0), None);
    }

    #[test]
    fn hit_test_far_off_grid_is_none() {
        for grid_type in GridType::ALL {
            let t = tiling(grid_type, 10.0);
            assert_eq!(t.hit_test(4, 4, 1e300, 5.0), None, "{grid_type}");
            assert_eq!(t.hit_test(4, 4, -1e300, 5.0), None, "{grid_type}");
            assert_eq!(t.hit_test(4, 4, 5.0, 1e300), None, "{grid_type}");
            assert_eq!(t.hit_test(4, 4, 5.0, -1e300), None, "{grid_type}");
            assert_eq!(t.hit_test(4, 4, f64::MAX, f64::MIN), None, "{grid_type}");
        }
    }

    #[test]
    fn search_window_saturates_at_the_ends() {
        let w = SearchWindow { row: i64::MAX, spread: 1 };
        assert_eq!(w.rows(), (i64::MAX - 1)..=i64::MAX);
        let w = SearchWindow { row: i64::MIN, spread: 1 };
        assert_eq!(w.rows(), i64::MIN..=(i64::MIN + 1));
    }

    #[test]
    fn honeycomb_gap_between_circles_misses() {
        let t = tiling(GridType::Honeycomb, 20.0);
        // Corner of the first row band lies outside every circle.
        assert_eq!(t.hit_test(3, 3, 0.5, 0.5), None);
    }

    #[test]
    fn pentagon_point_near_top_vertex_resolves_to_row_above() {
        let t = tiling(GridType::Pentagon, 20.0);
        // Just below the bottom vertex of (0, 0) but still in row 1's band.
        let (cx, cy) = t.center(0, 0);
        let py = cy + t.radius() - 0.5;
        assert!(py >= t.row_step());
        assert_eq!(t.hit_test(3, 3, cx, py), Some((0, 0)));
    }

    #[test]
    fn diamond_uses_rotated_shape_test() {
        let t = tiling(GridType::Diamond, 10.0);
        let (cx, cy) = t.center(1, 0);
        let r = t.radius() * SQRT_2;
        assert!(t.contains(1, 0, cx + r * 0.49, cy + r * 0.49));
        assert!(!t.contains(1, 0, cx + r * 0.51, cy + r * 0.51));
    }

    #[test]
    fn covered_pixels_of_square_cell_form_its_block() {
        let t = tiling(GridType::Square, 10.0);
        let mut pixels = Vec::new();
        t.for_each_covered_pixel(1, 0, 20, 20, |x, y| pixels.push((x, y)));
        assert_eq!(pixels.len(), 100);
        assert!(pixels.iter().all(|&(x, y)| (10..20).contains(&x) && y < 10));
    }

    #[test]
    fn covered_pixels_are_clipped_to_image() {
        let t = tiling(GridType::Honeycomb, 10.0);
        let mut count = 0;
        t.for_each_covered_pixel(5, 5, 8, 8, |_, _| count += 1);
        assert_eq!(count, 0);
    }
}
