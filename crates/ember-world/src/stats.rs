//! Per-frame grid statistics.

use crate::grid::EnergyGrid;
use ember_core::{Energy, MAX_ENERGY};
use serde::{Deserialize, Serialize};

/// Summary of one grid at one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    /// Cells with energy above zero
    pub live_cells: usize,
    /// Sum of all cell energies
    pub total_energy: u64,
    /// Mean energy over all cells, dead ones included
    pub mean_energy: f64,
    /// Highest cell energy
    pub max_energy: Energy,
    /// Cells pinned at `MAX_ENERGY`
    pub saturated_cells: usize,
}

impl GridStats {
    pub fn from_grid(grid: &EnergyGrid) -> Self {
        let mut stats = Self::default();
        for &energy in grid.cells() {
            if energy > 0 {
                stats.live_cells += 1;
            }
            if energy == MAX_ENERGY {
                stats.saturated_cells += 1;
            }
            stats.total_energy += u64::from(energy);
            stats.max_energy = stats.max_energy.max(energy);
        }
        stats.mean_energy = stats.total_energy as f64 / grid.len() as f64;
        stats
    }

    /// Fraction of cells alive
    pub fn live_fraction(&self, cell_count: usize) -> f64 {
        if cell_count == 0 {
            0.0
        } else {
            self.live_cells as f64 / cell_count as f64
        }
    }

    pub fn is_extinct(&self) -> bool {
        self.live_cells == 0
    }
}
