use bevy::math::DVec2;
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::math::{get_grid_cell, get_neighboring_cells, CellKey};
use crate::particle::Particle;

/// Uniform-cell hash over particle indices, rebuilt from scratch every step.
///
/// Cells hold indices into the particle array rather than references, so the grid can be
/// read from several tasks while the particle slice is only borrowed immutably.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
    expected_particles_per_cell: usize,
}

impl SpatialGrid {
    pub fn new(cell_size: f64, particle_radius: f64) -> Self {
        let cell_area = cell_size * cell_size;
        let particle_area = PI * particle_radius * particle_radius;
        let expected_per_cell = (cell_area / particle_area * 0.5) as usize; // 50% packing density

        Self {
            cell_size,
            cells: HashMap::new(),
            expected_particles_per_cell: expected_per_cell.max(4),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cell_of(&self, position: DVec2) -> CellKey {
        get_grid_cell(position, self.cell_size)
    }

    /// Clears the map and repopulates it from `particles` in one pass.
    pub fn build(&mut self, particles: &[Particle]) {
        self.cells.clear();
        let capacity = self.expected_particles_per_cell;
        for (index, particle) in particles.iter().enumerate() {
            let cell = get_grid_cell(particle.position, self.cell_size);
            self.cells
                .entry(cell)
                .or_insert_with(|| Vec::with_capacity(capacity))
                .push(index);
        }
    }

    /// Indices stored in a single cell, in insertion order.
    pub fn cell(&self, key: CellKey) -> &[usize] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every index whose cell lies in the 3×3 block around the cell containing `position`.
    ///
    /// A particle queried by its own position is part of the result; callers filter it
    /// out by index.
    pub fn neighbors(&self, position: DVec2) -> impl Iterator<Item = usize> + '_ {
        get_neighboring_cells(self.cell_of(position))
            .into_iter()
            .flat_map(move |key| self.cell(key).iter().copied())
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
