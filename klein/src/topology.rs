//! Klein-bottle addressing for a flat row-major grid.
//!
//! The y axis wraps like a torus. Crossing the x seam (moving a full grid
//! width left or right) reflects y about the midline of the tube, so two
//! crossings bring a coordinate back to where it started.

use crate::error::{KleinError, Result};

/// Relative offsets of the eight Moore neighbors.
pub const NEIGHBORHOOD: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topology {
    width: u32,
    height: u32,
}

impl Topology {
    /// Both sides must be powers of two; masking only matches modulo
    /// under that constraint. Height must also be at least 2 so the
    /// reflection has a midline.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if !width.is_power_of_two() || !height.is_power_of_two() || height < 2 {
            return Err(KleinError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Map any coordinate, in range or not, to its canonical flat index.
    #[inline]
    pub fn resolve(&self, x: i64, y: i64) -> usize {
        let (column, row) = self.canonical(x, y);
        row as usize * self.width as usize + column as usize
    }

    /// The in-range `(x, y)` a coordinate is identified with.
    #[inline]
    pub fn canonical(&self, x: i64, y: i64) -> (u32, u32) {
        let w = u64::from(self.width);
        let h = u64::from(self.height);
        // two's complement keeps the band bit correct for negative x
        let ux = x as u64;
        let uy = y as u64;

        let column = ux & (w - 1);
        let row = if ux & w != 0 {
            (h / 2).wrapping_sub(1).wrapping_sub(uy) & (h - 1)
        } else {
            uy & (h - 1)
        };
        (column as u32, row as u32)
    }

    /// Inverse of `resolve` for in-range indices.
    pub fn coords(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    /// Flat indices of the eight neighbors of `(x, y)`.
    ///
    /// Offsets wrap at the `i64` extremes; resolution only looks at the
    /// low bits, so the wrapped coordinate lands on the same cell.
    #[inline]
    pub fn neighbors(&self, x: i64, y: i64) -> [usize; 8] {
        NEIGHBORHOOD.map(|(dx, dy)| self.resolve(x.wrapping_add(dx), y.wrapping_add(dy)))
    }
}
