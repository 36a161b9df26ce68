//! Per-cell noise injection.

use crate::grid::EnergyGrid;
use ember_core::{
    validate_dimensions, validate_noise_probability, Energy, Error, Position, Result,
};
use rand::Rng;

/// Boolean mask marking the cells that receive a noise quantum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseMask {
    width: i32,
    height: i32,
    hits: Vec<bool>,
}

impl NoiseMask {
    /// Mask with no hits
    pub fn empty(width: i32, height: i32) -> Result<Self> {
        validate_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            hits: vec![false; (width as usize) * (height as usize)],
        })
    }

    /// Mask from row-major hit flags
    pub fn from_cells(width: i32, height: i32, hits: Vec<bool>) -> Result<Self> {
        validate_dimensions(width, height)?;
        let expected = (width as usize) * (height as usize);
        if hits.len() != expected {
            return Err(Error::Validation(format!(
                "{}x{} mask needs {} cells, got {}",
                width,
                height,
                expected,
                hits.len()
            )));
        }
        Ok(Self {
            width,
            height,
            hits,
        })
    }

    /// Draw a mask where each cell is hit independently with probability `p`.
    ///
    /// One uniform `f64` in `[0, 1)` is drawn per cell in row-major order and
    /// the cell is hit when the draw is below `p`, so `p = 0` never hits and
    /// `p = 1` always does.
    pub fn sample<R: Rng + ?Sized>(width: i32, height: i32, p: f64, rng: &mut R) -> Result<Self> {
        validate_dimensions(width, height)?;
        validate_noise_probability(p)?;

        let hits = (0..(width as usize) * (height as usize))
            .map(|_| rng.gen::<f64>() < p)
            .collect();
        Ok(Self {
            width,
            height,
            hits,
        })
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Whether the cell at `pos` is hit (with toroidal wrapping)
    pub fn get(&self, pos: Position) -> bool {
        self.hits[self.pos_to_index(pos)]
    }

    /// Mark or clear the cell at `pos` (with toroidal wrapping)
    pub fn set(&mut self, pos: Position, hit: bool) {
        let index = self.pos_to_index(pos);
        self.hits[index] = hit;
    }

    /// Number of hit cells
    pub fn count(&self) -> usize {
        self.hits.iter().filter(|&&hit| hit).count()
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        let wrapped = pos.wrap(self.width, self.height);
        (wrapped.y * self.width + wrapped.x) as usize
    }
}

/// Add `quantum` to every masked cell, saturating at `MAX_ENERGY`
pub fn apply_noise(grid: &mut EnergyGrid, mask: &NoiseMask, quantum: Energy) -> Result<()> {
    if grid.dimensions() != mask.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: grid.dimensions(),
            actual: mask.dimensions(),
        });
    }

    for (index, &hit) in mask.hits.iter().enumerate() {
        if hit {
            let cell = grid.get_mut(grid.index_to_pos(index));
            *cell = cell.saturating_add(quantum);
        }
    }
    Ok(())
}
