use serde::{Deserialize, Serialize};

use crate::color::{Color, LabCache, LabColor, delta_e2000, hue_distance};
use crate::geometry::Tiling;
use crate::palette::{MIN_OPAQUE_ALPHA, Palette};

/// A runner-up within this factor of the best total error is eligible for
/// the hue tie-break.
pub const HUE_TIE_BREAK_RATIO: f64 = 1.05;

/// How a cell's pixels are reduced to one palette entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignMode {
    /// Plurality vote of each pixel's nearest palette entry.
    Vote,
    /// Palette entry with the minimum summed CIEDE2000 error over the cell.
    #[default]
    BlockAverage,
}

/// Borrowed view of an RGBA8 image.
#[derive(Clone, Copy, Debug)]
pub struct PixelView<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

impl PixelView<'_> {
    #[inline]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }
}

/// Picks one palette entry per cell.
///
/// Holds the per-run Lab cache so every distinct source color is converted
/// once however many cells it shows up in.
pub struct CellAssigner<'p> {
    palette: &'p Palette,
    mode: AssignMode,
    cache: LabCache,
    labs: Vec<LabColor>,
}

impl<'p> CellAssigner<'p> {
    pub fn new(palette: &'p Palette, mode: AssignMode) -> Self {
        Self {
            palette,
            mode,
            cache: LabCache::new(),
            labs: Vec::new(),
        }
    }

    /// Palette index for every cell of a `width` x `height` grid, row-major.
    pub fn assign_grid(&mut self, image: PixelView<'_>, tiling: &Tiling, width: u32, height: u32) -> Vec<usize> {
        let mut indices = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                indices.push(self.assign_cell(image, tiling, x, y));
            }
        }
        indices
    }

    pub fn assign_cell(&mut self, image: PixelView<'_>, tiling: &Tiling, x: u32, y: u32) -> usize {
        self.labs.clear();
        let cache = &mut self.cache;
        let labs = &mut self.labs;
        tiling.for_each_covered_pixel(x, y, image.width, image.height, |px, py| {
            let p = image.pixel(px, py);
            if p[3] >= MIN_OPAQUE_ALPHA {
                labs.push(cache.lab(Color::new(p[0], p[1], p[2])));
            }
        });
        self.assign_labs_inner()
    }

    /// Assign a cell from an explicit list of source colors.
    pub fn assign_colors(&mut self, colors: &[Color]) -> usize {
        self.labs.clear();
        for &c in colors {
            let lab = self.cache.lab(c);
            self.labs.push(lab);
        }
        self.assign_labs_inner()
    }

    fn assign_labs_inner(&self) -> usize {
        // Nothing covered: off-image or fully transparent cell.
        if self.labs.is_empty() || self.palette.is_empty() {
            return 0;
        }
        let idx = match self.mode {
            AssignMode::Vote => vote(self.palette, &self.labs),
            AssignMode::BlockAverage => min_total_error(self.palette, &self.labs),
        };
        assert!(
            idx < self.palette.len(),
            "assigned palette index {idx} outside palette of {}",
            self.palette.len()
        );
        idx
    }
}

/// Plurality of per-pixel nearest entries. Lowest index wins ties.
pub fn vote(palette: &Palette, labs: &[LabColor]) -> usize {
    let mut counts = vec![0u32; palette.len()];
    for &lab in labs {
        counts[palette.nearest(lab)] += 1;
    }

    let mut best_idx = 0;
    let mut best_count = 0;
    for (idx, &count) in counts.iter().enumerate() {
        if count > best_count {
            best_count = count;
            best_idx = idx;
        }
    }
    best_idx
}

/// Entry minimising the summed CIEDE2000 error over all pixels, with a hue
/// tie-break between the two best candidates.
pub fn min_total_error(palette: &Palette, labs: &[LabColor]) -> usize {
    let totals: Vec<f64> = palette
        .labs()
        .iter()
        .map(|&candidate| labs.iter().map(|&p| delta_e2000(p, candidate)).sum())
        .collect();

    // Best and runner-up; lower index wins exact ties.
    let mut best: Option<usize> = None;
    let mut second: Option<usize> = None;
    for (idx, &total) in totals.iter().enumerate() {
        match best {
            Some(b) if total >= totals[b] => {
                if second.is_none_or(|s| total < totals[s]) {
                    second = Some(idx);
                }
            }
            _ => {
                second = best;
                best = Some(idx);
            }
        }
    }

    let Some(best) = best else { return 0 };
    let Some(second) = second else { return best };

    if totals[second] > totals[best] * HUE_TIE_BREAK_RATIO {
        return best;
    }

    let avg_hue = average_lab(labs).hue_degrees();
    let best_hue_gap = hue_distance(palette.lab(best).hue_degrees(), avg_hue);
    let second_hue_gap = hue_distance(palette.lab(second).hue_degrees(), avg_hue);
    if second_hue_gap < best_hue_gap {
        tracing::trace!(best, second, avg_hue, "hue tie-break picked runner-up");
        second
    } else {
        best
    }
}

fn average_lab(labs: &[LabColor]) -> LabColor {
    let n = labs.len() as f64;
    let (l, a, b) = labs
        .iter()
        .fold((0.0, 0.0, 0.0), |(l, a, b), c| (l + c.l, a + c.a, b + c.b));
    LabColor::new(l / n, a / n, b / n)
}
