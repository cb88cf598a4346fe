use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    config::Albedos,
    daisy::{Daisy, DaisyColor, DaisyPopulation, MAX_AGE},
    grid::{Cell, Grid},
};

/// Aggregate statistics published once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub mean_temperature: f64,
    pub tick: u64,
    pub black_count: usize,
    pub white_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSnapshot {
    pub x: u32,
    pub y: u32,
    pub temperature: f64,
    pub occupant: Option<DaisyColor>,
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub name: String,
    pub tick: u64,
    pub solar_luminosity: f64,
    pub stats: GlobalStats,
    pub width: u32,
    pub height: u32,
    pub patches: Vec<PatchSnapshot>,
}

pub struct World {
    tick: u64,
    solar_luminosity: f64,
    albedos: Albedos,
    mean_temperature: f64,
    black_count: usize,
    white_count: usize,
    pub(crate) grid: Grid,
    pub(crate) daisies: DaisyPopulation,
}

impl World {
    pub fn new(width: u32, height: u32, albedos: Albedos, solar_luminosity: f64) -> Self {
        let grid = Grid::new(width, height);
        let daisies = DaisyPopulation::new(grid.cell_count());
        Self {
            tick: 0,
            solar_luminosity,
            albedos,
            mean_temperature: 0.0,
            black_count: 0,
            white_count: 0,
            grid,
            daisies,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn advance_time(&mut self) {
        self.tick += 1;
    }

    pub fn solar_luminosity(&self) -> f64 {
        self.solar_luminosity
    }

    pub(crate) fn set_solar_luminosity(&mut self, value: f64) {
        self.solar_luminosity = value;
    }

    pub fn albedos(&self) -> Albedos {
        self.albedos
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn daisies(&self) -> &DaisyPopulation {
        &self.daisies
    }

    pub fn albedo_of(&self, color: DaisyColor) -> f64 {
        match color {
            DaisyColor::Black => self.albedos.blacks,
            DaisyColor::White => self.albedos.whites,
        }
    }

    /// Albedo of whatever covers the patch at `index`.
    pub fn surface_albedo(&self, index: usize) -> f64 {
        self.daisies
            .get(index)
            .map(Daisy::albedo)
            .unwrap_or(self.albedos.bare_surface)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.grid.index_of(cell).is_some()
    }

    pub fn patch_temperature(&self, cell: Cell) -> Option<f64> {
        self.grid
            .index_of(cell)
            .map(|index| self.grid.temperature(index))
    }

    pub fn daisy(&self, cell: Cell) -> Option<&Daisy> {
        self.grid
            .index_of(cell)
            .and_then(|index| self.daisies.get(index))
    }

    pub fn occupant(&self, cell: Cell) -> Option<DaisyColor> {
        self.daisy(cell).map(Daisy::color)
    }

    /// Plant a new age-0 daisy. Rejected when the patch is occupied or off-grid.
    pub fn place_daisy(&mut self, cell: Cell, color: DaisyColor) -> bool {
        let Some(index) = self.grid.index_of(cell) else {
            return false;
        };
        let placed = self
            .daisies
            .insert(index, Daisy::new(color, self.albedo_of(color), 0));
        if placed {
            self.refresh_counts();
        }
        placed
    }

    /// Remove the daisy on `cell`. Rejected when the patch is empty or off-grid.
    pub fn remove_daisy(&mut self, cell: Cell) -> bool {
        let removed = self
            .grid
            .index_of(cell)
            .and_then(|index| self.daisies.remove(index))
            .is_some();
        if removed {
            self.refresh_counts();
        }
        removed
    }

    /// Sprout `count` daisies of `color` on distinct, currently empty patches,
    /// each with a random age below [`MAX_AGE`]. Returns how many were placed.
    pub(crate) fn seed_randomly<R: Rng>(
        &mut self,
        color: DaisyColor,
        count: usize,
        rng: &mut R,
    ) -> usize {
        let empty: Vec<usize> = (0..self.grid.cell_count())
            .filter(|&index| !self.daisies.is_occupied(index))
            .collect();
        let chosen: Vec<usize> = empty.choose_multiple(rng, count).copied().collect();
        let albedo = self.albedo_of(color);
        for &index in &chosen {
            let age = rng.gen_range(0..MAX_AGE);
            self.daisies.insert(index, Daisy::new(color, albedo, age));
        }
        self.refresh_counts();
        chosen.len()
    }

    pub fn global_stats(&self) -> GlobalStats {
        GlobalStats {
            mean_temperature: self.mean_temperature,
            tick: self.tick,
            black_count: self.black_count,
            white_count: self.white_count,
        }
    }

    pub(crate) fn refresh_stats(&mut self) {
        self.mean_temperature = self.grid.mean_temperature();
        self.refresh_counts();
    }

    fn refresh_counts(&mut self) {
        self.black_count = self.daisies.count(DaisyColor::Black);
        self.white_count = self.daisies.count(DaisyColor::White);
    }

    pub fn snapshot(&self, name: &str) -> WorldSnapshot {
        let patches = (0..self.grid.cell_count())
            .map(|index| {
                let cell = self.grid.cell_at(index);
                let daisy = self.daisies.get(index);
                PatchSnapshot {
                    x: cell.x,
                    y: cell.y,
                    temperature: self.grid.temperature(index),
                    occupant: daisy.map(Daisy::color),
                    age: daisy.map(Daisy::age),
                }
            })
            .collect();
        WorldSnapshot {
            name: name.to_string(),
            tick: self.tick,
            solar_luminosity: self.solar_luminosity,
            stats: self.global_stats(),
            width: self.grid.width(),
            height: self.grid.height(),
            patches,
        }
    }
}
