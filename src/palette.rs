use std::collections::HashSet;

use kmeans_colors::get_kmeans;
use ::palette::{IntoColor, Lab, Srgb};
use serde::{Deserialize, Serialize};

use crate::color::{Color, LabColor, delta_e76, delta_e2000};
use crate::error::ConvertError;

/// Pixels with alpha below this are treated as transparent everywhere.
pub const MIN_OPAQUE_ALPHA: u8 = 128;

/// Metric used to decide whether two palette entries are the same shade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMetric {
    #[default]
    Ciede2000,
    /// Cheaper Euclidean Lab distance for coarse passes.
    Cie76,
}

impl MergeMetric {
    #[inline]
    pub fn distance(self, x: LabColor, y: LabColor) -> f64 {
        match self {
            MergeMetric::Ciede2000 => delta_e2000(x, y),
            MergeMetric::Cie76 => delta_e76(x, y),
        }
    }
}

// ------------------------------------------------------------
// Palette
// ------------------------------------------------------------

/// Ordered list of colors with their Lab coordinates precomputed.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
    labs: Vec<LabColor>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        let labs = colors.iter().map(|c| c.to_lab()).collect();
        Self { colors, labs }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    #[inline]
    pub fn labs(&self) -> &[LabColor] {
        &self.labs
    }

    /// Color at `index`. An out-of-range index is an internal invariant
    /// violation and panics rather than being clamped.
    #[inline]
    pub fn color(&self, index: usize) -> Color {
        match self.colors.get(index) {
            Some(c) => *c,
            None => panic!(
                "palette index {index} out of bounds for palette of {} colors",
                self.colors.len()
            ),
        }
    }

    #[inline]
    pub fn lab(&self, index: usize) -> LabColor {
        self.labs[index]
    }

    /// Index of the closest entry by CIEDE2000. First index wins ties.
    pub fn nearest(&self, lab: LabColor) -> usize {
        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;
        for (idx, entry) in self.labs.iter().enumerate() {
            let dist = delta_e2000(lab, *entry);
            if dist < best_dist {
                best_dist = dist;
                best_idx = idx;
            }
        }
        best_idx
    }

    /// Greedy first-match merge of near-identical entries.
    ///
    /// Entries are visited in order. An entry not yet merged becomes a new
    /// unique color, and every later entry within `threshold` of it is folded
    /// into it. A later entry joins the *first* unique color it is close to,
    /// not the closest one, so the surviving shade depends on input order.
    /// That order dependence is intentional.
    ///
    /// Returns the reduced palette and the old index → new index map.
    pub fn deduplicate(&self, threshold: f64, metric: MergeMetric) -> (Palette, Vec<usize>) {
        let mut mapping: Vec<Option<usize>> = vec![None; self.len()];
        let mut kept = Vec::new();

        for i in 0..self.len() {
            if mapping[i].is_some() {
                continue;
            }
            let new_idx = kept.len();
            kept.push(self.colors[i]);
            mapping[i] = Some(new_idx);

            for j in (i + 1)..self.len() {
                if mapping[j].is_none() && metric.distance(self.labs[i], self.labs[j]) < threshold {
                    mapping[j] = Some(new_idx);
                }
            }
        }

        let mapping = mapping
            .into_iter()
            .map(|m| m.unwrap_or_default())
            .collect();
        (Palette::new(kept), mapping)
    }

    /// Reassign palette indices used by fewer than `min_cell_count` cells to
    /// the nearest (CIEDE2000) index that meets the threshold.
    ///
    /// With no index meeting the threshold the input is returned unchanged;
    /// tiny or uniform images stay as they are.
    pub fn merge_minor_colors(&self, cells: &[usize], min_cell_count: usize) -> Vec<usize> {
        let counts = self.usage_counts(cells);
        let majors: Vec<usize> = (0..self.len())
            .filter(|&i| counts[i] >= min_cell_count)
            .collect();
        if majors.is_empty() {
            return cells.to_vec();
        }

        let remap: Vec<usize> = (0..self.len())
            .map(|i| {
                if counts[i] >= min_cell_count {
                    return i;
                }
                let mut best = majors[0];
                let mut best_dist = f64::INFINITY;
                for &m in &majors {
                    let dist = delta_e2000(self.labs[i], self.labs[m]);
                    if dist < best_dist {
                        best_dist = dist;
                        best = m;
                    }
                }
                best
            })
            .collect();

        cells.iter().map(|&idx| remap[idx]).collect()
    }

    /// Number of cells referencing each palette index.
    pub fn usage_counts(&self, cells: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.len()];
        for &idx in cells {
            match counts.get_mut(idx) {
                Some(c) => *c += 1,
                None => panic!("cell references palette index {idx} of {}", self.len()),
            }
        }
        counts
    }

    /// Drop unused entries and order the rest by first appearance in `cells`.
    ///
    /// Returns the compacted palette and the cells rewritten against it.
    pub fn compact(&self, cells: &[usize]) -> (Palette, Vec<usize>) {
        let mut remap: Vec<Option<usize>> = vec![None; self.len()];
        let mut kept = Vec::new();
        let rewritten = cells
            .iter()
            .map(|&idx| {
                *remap[idx].get_or_insert_with(|| {
                    kept.push(self.colors[idx]);
                    kept.len() - 1
                })
            })
            .collect();
        (Palette::new(kept), rewritten)
    }
}

// ------------------------------------------------------------
// Upstream quantizers
// ------------------------------------------------------------

/// Source of the initial broad palette.
pub trait Quantizer {
    /// Return at most `n_colors` candidate colors for the given RGBA pixels.
    fn quantize(&self, pixels: &[[u8; 4]], n_colors: usize) -> Vec<Color>;
}

/// k-means over Lab pixels, the default broad palette extractor.
#[derive(Clone, Copy, Debug)]
pub struct KMeansQuantizer {
    pub max_iter: usize,
    pub converge: f32,
    pub seed: u64,
}

impl Default for KMeansQuantizer {
    fn default() -> Self {
        Self {
            max_iter: 20,
            converge: 1e-4,
            seed: 0,
        }
    }
}

impl Quantizer for KMeansQuantizer {
    fn quantize(&self, pixels: &[[u8; 4]], n_colors: usize) -> Vec<Color> {
        if n_colors == 0 {
            return Vec::new();
        }
        let opaque = || pixels.iter().filter(|p| p[3] >= MIN_OPAQUE_ALPHA);

        // Few enough distinct colors: hand them back as-is, in order of appearance.
        let mut seen = HashSet::new();
        let mut distinct = Vec::new();
        for p in opaque() {
            let c = Color::new(p[0], p[1], p[2]);
            if seen.insert(c) {
                distinct.push(c);
                if distinct.len() > n_colors {
                    break;
                }
            }
        }
        if distinct.len() <= n_colors {
            return distinct;
        }

        // Collect Lab pixels from opaque areas
        let lab_pixels: Vec<Lab> = opaque()
            .map(|p| Srgb::<u8>::new(p[0], p[1], p[2]).into_linear().into_color())
            .collect();

        let kmeans = get_kmeans(n_colors, self.max_iter, self.converge, false, &lab_pixels, self.seed);
        kmeans
            .centroids
            .iter()
            .map(|&lab| {
                let rgb_f32: Srgb<f32> = Srgb::from_linear(lab.into_color());
                let c: Srgb<u8> = rgb_f32.into_format::<u8>();
                Color::new(c.red, c.green, c.blue)
            })
            .collect()
    }
}

/// A caller-supplied palette; the quantizer step just hands it back.
#[derive(Clone, Debug, Default)]
pub struct FixedPalette {
    colors: Vec<Color>,
}

impl FixedPalette {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    /// Parse a list of `#RRGGBB` strings.
    pub fn from_hex<S: AsRef<str>>(hex: &[S]) -> Result<Self, ConvertError> {
        let colors = hex
            .iter()
            .map(|s| Color::from_hex(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { colors })
    }
}

impl Quantizer for FixedPalette {
    fn quantize(&self, _pixels: &[[u8; 4]], n_colors: usize) -> Vec<Color> {
        self.colors.iter().copied().take(n_colors).collect()
    }
}
