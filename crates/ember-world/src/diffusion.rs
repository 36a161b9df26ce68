//! Orthogonal energy diffusion.
//!
//! Every live cell hands a quantum of energy to its four wraparound
//! neighbors. The default [`DiffusionMode::Sequential`] pass scans the grid
//! row-major and mutates it in place, so a dead cell that was topped up by
//! an earlier donor becomes a donor itself when the scan reaches it. Energy
//! is created, not moved: donors do not lose what they hand out.

use crate::grid::EnergyGrid;
use ember_core::{Direction, DiffusionMode, Energy};

/// Run the diffusion pass selected by `mode`
pub fn diffuse(grid: &mut EnergyGrid, mode: DiffusionMode, quantum: Energy) {
    match mode {
        DiffusionMode::Sequential => diffuse_sequential(grid, quantum),
        DiffusionMode::Simultaneous => diffuse_simultaneous(grid, quantum),
    }
}

/// Row-major, in-place diffusion.
///
/// Row 0 to the last row, column 0 to the last column within each row. A
/// cell emits if its value at the moment it is visited is above zero.
/// Neighbors receive in the order up, down, left, right, each saturating at
/// `MAX_ENERGY`.
pub fn diffuse_sequential(grid: &mut EnergyGrid, quantum: Energy) {
    for index in 0..grid.len() {
        if grid.cells()[index] == 0 {
            continue;
        }
        let pos = grid.index_to_pos(index);
        for direction in Direction::all() {
            let (dx, dy) = direction.to_delta();
            let cell = grid.get_mut(pos.add(dx, dy));
            *cell = cell.saturating_add(quantum);
        }
    }
}

/// Diffusion where donors are fixed before any energy moves.
pub fn diffuse_simultaneous(grid: &mut EnergyGrid, quantum: Energy) {
    let donors: Vec<bool> = grid.cells().iter().map(|&energy| energy > 0).collect();

    for (index, donor) in donors.into_iter().enumerate() {
        if !donor {
            continue;
        }
        let pos = grid.index_to_pos(index);
        for direction in Direction::all() {
            let (dx, dy) = direction.to_delta();
            let cell = grid.get_mut(pos.add(dx, dy));
            *cell = cell.saturating_add(quantum);
        }
    }
}
