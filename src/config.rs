use serde::{Deserialize, Serialize};

use crate::assign::AssignMode;
use crate::error::ConvertError;
use crate::geometry::GridType;
use crate::palette::{KMeansQuantizer, MergeMetric};

/// Settings for one conversion. Changing any of them means converting again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    pub grid_type: GridType,
    /// Cell size in source-image pixels.
    pub cell_size: f64,
    /// Color budget handed to the quantizer.
    pub n_colors: usize,
    /// Minimum-total-error assignment instead of per-pixel voting.
    pub block_average: bool,
    /// Palette entries closer than this are merged.
    pub dedup_threshold: f64,
    pub dedup_metric: MergeMetric,
    /// Palette entries used by fewer cells are folded into a neighbour.
    pub min_cell_count: usize,
    pub cell_gap: f64,
    pub rotation: f64,
    pub kmeans_max_iter: usize,
    pub kmeans_converge: f32,
    pub seed: u64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            grid_type: GridType::Square,
            cell_size: 10.0,
            n_colors: 16,
            block_average: true,
            dedup_threshold: 5.0,
            dedup_metric: MergeMetric::Ciede2000,
            min_cell_count: 3,
            cell_gap: 0.0,
            rotation: 0.0,
            kmeans_max_iter: 20,
            kmeans_converge: 1e-4,
            seed: 0,
        }
    }
}

impl ConvertOptions {
    pub fn new(grid_type: GridType, cell_size: f64, n_colors: usize, block_average: bool) -> Self {
        Self {
            grid_type,
            cell_size,
            n_colors,
            block_average,
            ..Self::default()
        }
    }

    /// Reject settings that would make the pixel scan meaningless.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(ConvertError::InvalidCellSize(self.cell_size));
        }
        if self.n_colors == 0 {
            return Err(ConvertError::InvalidColorCount);
        }
        if !self.dedup_threshold.is_finite() || self.dedup_threshold < 0.0 {
            return Err(ConvertError::InvalidThreshold(self.dedup_threshold));
        }
        Ok(())
    }

    pub fn assign_mode(&self) -> AssignMode {
        if self.block_average {
            AssignMode::BlockAverage
        } else {
            AssignMode::Vote
        }
    }

    pub fn quantizer(&self) -> KMeansQuantizer {
        KMeansQuantizer {
            max_iter: self.kmeans_max_iter,
            converge: self.kmeans_converge,
            seed: self.seed,
        }
    }
}
