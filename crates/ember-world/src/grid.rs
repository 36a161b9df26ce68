//! Toroidal energy grid.

use ember_core::{
    validate_dimensions, Energy, Error, NeighborhoodSum, Position, Result, SeedRange,
    MOORE_OFFSETS,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A 2D toroidal grid of 8-bit energy values, stored row-major.
///
/// Dimensions are fixed at construction. Every accessor wraps its position,
/// so `(-1, -1)` addresses the bottom-right cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct EnergyGrid {
    width: i32,
    height: i32,
    cells: Vec<Energy>,
}

/// Unchecked wire form, validated on the way into `EnergyGrid`
#[derive(Deserialize)]
struct RawGrid {
    width: i32,
    height: i32,
    cells: Vec<Energy>,
}

impl TryFrom<RawGrid> for EnergyGrid {
    type Error = Error;

    fn try_from(raw: RawGrid) -> Result<Self> {
        Self::from_cells(raw.width, raw.height, raw.cells)
    }
}

impl EnergyGrid {
    /// Create an all-zero grid
    pub fn new(width: i32, height: i32) -> Result<Self> {
        validate_dimensions(width, height)?;
        Ok(Self::zeroed(width, height))
    }

    /// Create a grid from row-major cell values
    pub fn from_cells(width: i32, height: i32, cells: Vec<Energy>) -> Result<Self> {
        validate_dimensions(width, height)?;
        let expected = (width as usize) * (height as usize);
        if cells.len() != expected {
            return Err(Error::Validation(format!(
                "{}x{} grid needs {} cells, got {}",
                width,
                height,
                expected,
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Create a grid from a list of equally long rows
    pub fn from_rows<R: AsRef<[Energy]>>(rows: &[R]) -> Result<Self> {
        let height = rows.len() as i32;
        let width = rows.first().map_or(0, |row| row.as_ref().len()) as i32;
        if rows.iter().any(|row| row.as_ref().len() != width as usize) {
            return Err(Error::Validation("rows have different lengths".to_string()));
        }
        let cells = rows.iter().flat_map(|row| row.as_ref().iter().copied()).collect();
        Self::from_cells(width, height, cells)
    }

    /// Fill every cell with an energy drawn uniformly from `range`
    pub fn random_fill<R: Rng + ?Sized>(
        width: i32,
        height: i32,
        range: SeedRange,
        rng: &mut R,
    ) -> Result<Self> {
        validate_dimensions(width, height)?;
        range.validate()?;

        let mut grid = Self::zeroed(width, height);
        for cell in &mut grid.cells {
            *cell = rng.gen_range(range.min..range.max) as Energy;
        }
        Ok(grid)
    }

    /// All-zero grid with the same dimensions as `self`
    pub fn zeroed_like(&self) -> Self {
        Self::zeroed(self.width, self.height)
    }

    fn zeroed(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major cell values
    pub fn cells(&self) -> &[Energy] {
        &self.cells
    }

    /// Get energy at position (with toroidal wrapping)
    pub fn get(&self, pos: Position) -> Energy {
        self.cells[self.pos_to_index(pos)]
    }

    /// Get mutable energy at position (with toroidal wrapping)
    pub fn get_mut(&mut self, pos: Position) -> &mut Energy {
        let index = self.pos_to_index(pos);
        &mut self.cells[index]
    }

    /// Set energy at position (with toroidal wrapping)
    pub fn set(&mut self, pos: Position, energy: Energy) {
        let index = self.pos_to_index(pos);
        self.cells[index] = energy;
    }

    /// Sum of the 8 Moore neighbors of `pos`, wrapping at the edges.
    ///
    /// On grids smaller than 3 in a dimension the same cell can be counted
    /// more than once, and on a 1x1 grid the cell is its own neighbor.
    pub fn neighbor_sum(&self, pos: Position, mode: NeighborhoodSum) -> u16 {
        let neighbors = MOORE_OFFSETS
            .iter()
            .map(|&(dx, dy)| self.get(pos.add(dx, dy)));

        match mode {
            NeighborhoodSum::Exact => neighbors.map(u16::from).sum(),
            NeighborhoodSum::Wrapping8 => {
                u16::from(neighbors.fold(0u8, |acc, energy| acc.wrapping_add(energy)))
            }
        }
    }

    pub(crate) fn pos_to_index(&self, pos: Position) -> usize {
        let wrapped = pos.wrap(self.width, self.height);
        (wrapped.y * self.width + wrapped.x) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_pos(i))
    }

    /// Iterator over all cells with positions, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Position, Energy)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &energy)| (self.index_to_pos(i), energy))
    }

    /// Cells as rows, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Energy]> + '_ {
        self.cells.chunks(self.width as usize)
    }
}
