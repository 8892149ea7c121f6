use bevy::math::{DVec2, Vec2};

/// Integer coordinates of a spatial grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub x: i32,
    pub y: i32,
}

impl CellKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned simulation domain. Simulation space has its origin at the top-left
/// and y growing downwards, so `(x, y)` is the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn max(&self) -> DVec2 {
        DVec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Shrinks the box by `margin` on every side.
    pub fn inset(&self, margin: f64) -> Self {
        Self::new(
            self.x + margin,
            self.y + margin,
            self.width - 2.0 * margin,
            self.height - 2.0 * margin,
        )
    }

    pub fn contains(&self, point: DVec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }
}

pub fn get_grid_cell(position: DVec2, grid_cell_size: f64) -> CellKey {
    CellKey::new(
        (position.x / grid_cell_size).floor() as i32,
        (position.y / grid_cell_size).floor() as i32,
    )
}

pub fn get_neighboring_cells(cell: CellKey) -> [CellKey; 9] {
    [
        CellKey::new(cell.x - 1, cell.y - 1),
        CellKey::new(cell.x, cell.y - 1),
        CellKey::new(cell.x + 1, cell.y - 1),
        CellKey::new(cell.x - 1, cell.y),
        CellKey::new(cell.x, cell.y),
        CellKey::new(cell.x + 1, cell.y),
        CellKey::new(cell.x - 1, cell.y + 1),
        CellKey::new(cell.x, cell.y + 1),
        CellKey::new(cell.x + 1, cell.y + 1),
    ]
}

/// Maps a simulation point to Bevy world space (y up, origin at the domain center).
pub fn to_world(point: DVec2, bounds: &BoundingBox) -> Vec2 {
    let center = bounds.center();
    Vec2::new((point.x - center.x) as f32, (center.y - point.y) as f32)
}

/// Inverse of [`to_world`].
pub fn to_simulation(point: Vec2, bounds: &BoundingBox) -> DVec2 {
    let center = bounds.center();
    DVec2::new(center.x + point.x as f64, center.y - point.y as f64)
}
