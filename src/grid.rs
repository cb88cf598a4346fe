//! Toroidal patch grid holding per-patch temperature.

use serde::{Deserialize, Serialize};

/// Fraction of each patch's heat that flows toward its neighbour average per tick.
pub const DIFFUSION_RATE: f64 = 0.5;

/// Patch coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Offsets of the Moore neighbourhood, row by row.
const MOORE_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Fixed-size grid that wraps at every edge.
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    temperatures: Vec<f64>,
}

impl Grid {
    /// Every patch starts at 0 degrees.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            temperatures: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.temperatures.len()
    }

    /// Convert a cell to its flat index, `None` when it lies outside the grid.
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        if cell.x < self.width && cell.y < self.height {
            Some(cell.y as usize * self.width as usize + cell.x as usize)
        } else {
            None
        }
    }

    /// Convert a flat index back to its cell.
    pub fn cell_at(&self, index: usize) -> Cell {
        let width = self.width as usize;
        Cell {
            x: (index % width) as u32,
            y: (index / width) as u32,
        }
    }

    /// Map arbitrary signed coordinates onto the torus.
    pub fn wrap(&self, x: i64, y: i64) -> Cell {
        Cell {
            x: x.rem_euclid(self.width as i64) as u32,
            y: y.rem_euclid(self.height as i64) as u32,
        }
    }

    /// The 8 toroidal Moore neighbours of `cell`.
    pub fn neighbors(&self, cell: Cell) -> [Cell; 8] {
        MOORE_OFFSETS.map(|(dx, dy)| self.wrap(cell.x as i64 + dx, cell.y as i64 + dy))
    }

    /// Flat indices of the 8 neighbours of the patch at `index`.
    pub fn neighbor_indices(&self, index: usize) -> [usize; 8] {
        let width = self.width as usize;
        self.neighbors(self.cell_at(index))
            .map(|cell| cell.y as usize * width + cell.x as usize)
    }

    pub fn temperature(&self, index: usize) -> f64 {
        self.temperatures[index]
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Replace every patch temperature at once. Lengths must match.
    pub(crate) fn commit_temperatures(&mut self, next: Vec<f64>) {
        debug_assert_eq!(next.len(), self.temperatures.len());
        self.temperatures = next;
    }

    pub fn mean_temperature(&self) -> f64 {
        if self.temperatures.is_empty() {
            return 0.0;
        }
        self.temperatures.iter().sum::<f64>() / self.temperatures.len() as f64
    }

    /// Blend every patch with the mean of its neighbours.
    ///
    /// `next[i] = (1 - rate) * prev[i] + rate * mean(prev[neighbours])`, where
    /// `prev` is the full pre-diffusion field. No patch ever reads an
    /// already-diffused value.
    pub fn diffuse(&mut self, rate: f64) {
        let previous = &self.temperatures;
        let next: Vec<f64> = (0..previous.len())
            .map(|index| {
                let neighbour_mean = self
                    .neighbor_indices(index)
                    .iter()
                    .map(|&n| previous[n])
                    .sum::<f64>()
                    / 8.0;
                (1.0 - rate) * previous[index] + rate * neighbour_mean
            })
            .collect();
        self.temperatures = next;
    }
}
