//! Marching squares over a [`DensityField`].
//!
//! The domain is covered by a lattice of square cells of side `step`. Each cell samples
//! the field at its four corners, thresholds them into a 4-bit case index and looks the
//! case up in [`CASE_TABLE`] to get a filled polygon covering the dense part of the cell.
//!
//! Corner bits, in simulation space (y down):
//!
//! ```text
//!   1 ---- 2
//!   |      |
//!   8 ---- 4
//! ```
//!
//! The saddle cases 5 and 10 are not disambiguated; both emit a hexagon.

use bevy::math::DVec2;
use bevy::tasks::TaskPool;

use crate::density::DensityField;
use crate::math::BoundingBox;
use crate::ContourConfig;

/// Vertex offsets in half-steps from a cell's top-left corner: 0, 1 = midpoint, 2 = far side.
pub type HalfStepOffset = (u8, u8);

const EMPTY: &[HalfStepOffset] = &[];
const TOP_LEFT: &[HalfStepOffset] = &[(0, 1), (0, 0), (1, 0)];
const TOP_RIGHT: &[HalfStepOffset] = &[(1, 0), (2, 0), (2, 1)];
const TOP: &[HalfStepOffset] = &[(0, 1), (0, 0), (2, 1)];
const BOTTOM_RIGHT: &[HalfStepOffset] = &[(2, 1), (2, 2), (1, 2)];
const SADDLE_FALLING: &[HalfStepOffset] = &[(0, 1), (0, 0), (1, 0), (2, 0), (2, 1), (1, 2)];
const VERTICAL: &[HalfStepOffset] = &[(1, 0), (2, 0), (0, 2), (1, 2)];
const BOTTOM_LEFT: &[HalfStepOffset] = &[(0, 1), (0, 2), (2, 2)];
const SADDLE_RISING: &[HalfStepOffset] = &[(0, 0), (1, 0), (2, 0), (2, 2), (1, 2), (0, 1)];

/// Polygon shape for every case index. Complementary cases share a shape.
pub const CASE_TABLE: [&[HalfStepOffset]; 16] = [
    EMPTY,          // 0
    TOP_LEFT,       // 1
    TOP_RIGHT,      // 2
    TOP,            // 3
    BOTTOM_RIGHT,   // 4
    SADDLE_FALLING, // 5
    VERTICAL,       // 6
    BOTTOM_LEFT,    // 7
    BOTTOM_LEFT,    // 8
    VERTICAL,       // 9
    SADDLE_RISING,  // 10
    BOTTOM_RIGHT,   // 11
    TOP,            // 12
    TOP_RIGHT,      // 13
    TOP_LEFT,       // 14
    EMPTY,          // 15
];

/// Case index for corner densities ordered top-left, top-right, bottom-right, bottom-left.
pub fn case_index(densities: [f64; 4], threshold: f64) -> usize {
    let mut case = 0;
    for (bit, density) in densities.into_iter().enumerate() {
        if density > threshold {
            case |= 1 << bit;
        }
    }
    case
}

/// Vertices for `case` in the cell whose top-left corner is `origin`,
/// or `None` when the case emits nothing.
pub fn generate_contour(origin: DVec2, step: f64, case: usize) -> Option<Vec<DVec2>> {
    let shape = CASE_TABLE[case & 0xF];
    if shape.is_empty() {
        return None;
    }
    let half = step * 0.5;
    Some(
        shape
            .iter()
            .map(|&(dx, dy)| origin + DVec2::new(dx as f64 * half, dy as f64 * half))
            .collect(),
    )
}

/// One filled iso-surface piece.
#[derive(Clone, Debug, PartialEq)]
pub struct ContourPolygon {
    pub vertices: Vec<DVec2>,
    /// Mean of the four corner densities, for colouring.
    pub density: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContourExtractor {
    pub threshold: f64,
    pub step: f64,
    pub bounds: BoundingBox,
}

impl ContourExtractor {
    pub fn new(config: &ContourConfig, bounds: BoundingBox) -> Self {
        Self {
            threshold: config.density_threshold,
            step: config.step_size,
            bounds,
        }
    }

    /// Lattice size as (columns, rows).
    pub fn lattice_size(&self) -> (usize, usize) {
        (
            (self.bounds.width / self.step).ceil().max(0.0) as usize,
            (self.bounds.height / self.step).ceil().max(0.0) as usize,
        )
    }

    pub fn cell_origin(&self, column: usize, row: usize) -> DVec2 {
        self.bounds.min() + DVec2::new(column as f64, row as f64) * self.step
    }

    /// Samples one lattice cell and builds its polygon, if any.
    pub fn polygon_at(
        &self,
        field: &DensityField,
        column: usize,
        row: usize,
    ) -> Option<ContourPolygon> {
        let origin = self.cell_origin(column, row);
        let s = self.step;
        let densities = [
            field.density_at(origin),
            field.density_at(origin + DVec2::new(s, 0.0)),
            field.density_at(origin + DVec2::new(s, s)),
            field.density_at(origin + DVec2::new(0.0, s)),
        ];
        let vertices = generate_contour(origin, s, case_index(densities, self.threshold))?;
        Some(ContourPolygon {
            vertices,
            density: densities.iter().sum::<f64>() * 0.25,
        })
    }

    /// Lazily walks the lattice row by row. The iterator is consumed once; extract again
    /// for the next frame.
    pub fn polygons<'a>(&'a self, field: DensityField<'a>) -> Contours<'a> {
        let (columns, rows) = self.lattice_size();
        Contours {
            extractor: self,
            field,
            columns,
            cells: columns.saturating_mul(rows),
            next: 0,
        }
    }

    /// Extracts the whole lattice with rows spread across `pool`. The result has the
    /// same order as [`polygons`](Self::polygons).
    pub fn extract_parallel(
        &self,
        field: DensityField<'_>,
        pool: &TaskPool,
    ) -> Vec<ContourPolygon> {
        let (columns, rows) = self.lattice_size();
        if columns == 0 || rows == 0 {
            return Vec::new();
        }
        let rows_per_task = rows.div_ceil(pool.thread_num().max(1)).max(1);
        let extractor = *self;

        let mut bands = pool.scope(|scope| {
            for first_row in (0..rows).step_by(rows_per_task) {
                let last_row = (first_row + rows_per_task).min(rows);
                scope.spawn(async move {
                    let mut polygons = Vec::new();
                    for row in first_row..last_row {
                        polygons.extend(
                            (0..columns)
                                .filter_map(|column| extractor.polygon_at(&field, column, row)),
                        );
                    }
                    (first_row, polygons)
                });
            }
        });
        bands.sort_by_key(|(first_row, _)| *first_row);
        bands.into_iter().flat_map(|(_, polygons)| polygons).collect()
    }
}

/// Lazy polygon sequence over one frame's lattice.
pub struct Contours<'a> {
    extractor: &'a ContourExtractor,
    field: DensityField<'a>,
    columns: usize,
    cells: usize,
    next: usize,
}

impl Iterator for Contours<'_> {
    type Item = ContourPolygon;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.cells {
            let cell = self.next;
            self.next += 1;
            let polygon =
                self.extractor
                    .polygon_at(&self.field, cell % self.columns, cell / self.columns);
            if polygon.is_some() {
                return polygon;
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.cells - self.next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;

    fn extractor(width: f64, height: f64) -> ContourExtractor {
        ContourExtractor {
            threshold: 0.5,
            step: 5.0,
            bounds: BoundingBox::new(0.0, 0.0, width, height),
        }
    }

    #[test]
    fn every_case_is_covered_by_the_table() {
        let expected = [0, 3, 3, 3, 3, 6, 4, 3, 3, 4, 6, 3, 3, 3, 3, 0];
        for (case, &count) in expected.iter().enumerate() {
            match generate_contour(DVec2::ZERO, 4.0, case) {
                None => assert!(case == 0 || case == 15, "case {case} emitted nothing"),
                Some(vertices) => {
                    assert_eq!(vertices.len(), count, "case {case}");
                    assert!([3, 4, 6].contains(&vertices.len()));
                }
            }
        }
    }

    #[test]
    fn complementary_cases_share_a_shape() {
        for (a, b) in [(1, 14), (2, 13), (3, 12), (4, 11), (7, 8), (6, 9)] {
            assert_eq!(CASE_TABLE[a], CASE_TABLE[b]);
        }
        assert_ne!(CASE_TABLE[5], CASE_TABLE[10]);
    }

    #[test]
    fn vertices_stay_inside_the_cell() {
        let origin = DVec2::new(10.0, 20.0);
        for case in 0..16 {
            for v in generate_contour(origin, 4.0, case).unwrap_or_default() {
                assert!(v.x >= 10.0 && v.x <= 14.0 && v.y >= 20.0 && v.y <= 24.0);
            }
        }
    }

    #[test]
    fn case_bits_follow_corner_order() {
        assert_eq!(case_index([1.0, 0.0, 0.0, 0.0], 0.5), 1);
        assert_eq!(case_index([0.0, 1.0, 0.0, 0.0], 0.5), 2);
        assert_eq!(case_index([0.0, 0.0, 1.0, 0.0], 0.5), 4);
        assert_eq!(case_index([0.0, 0.0, 0.0, 1.0], 0.5), 8);
        assert_eq!(case_index([1.0, 1.0, 1.0, 1.0], 0.5), 15);
        // Strictly greater than the threshold.
        assert_eq!(case_index([0.5, 0.5, 0.5, 0.5], 0.5), 0);
    }

    #[test]
    fn lattice_covers_partial_cells() {
        assert_eq!(extractor(12.0, 10.0).lattice_size(), (3, 2));
        assert_eq!(extractor(689.0, 489.0).lattice_size(), (138, 98));
    }

    #[test]
    fn oversized_lattice_does_not_overflow() {
        let extractor = ContourExtractor {
            step: 1e-300,
            ..extractor(50.0, 50.0)
        };
        let (columns, rows) = extractor.lattice_size();
        assert_eq!(columns.saturating_mul(rows), usize::MAX);
        let contours = extractor.polygons(DensityField::new(&[], 5.5));
        assert_eq!(contours.size_hint(), (0, Some(usize::MAX)));
    }

    #[test]
    fn empty_field_yields_no_polygons() {
        let extractor = extractor(50.0, 50.0);
        assert_eq!(extractor.polygons(DensityField::new(&[], 5.5)).count(), 0);
    }

    #[test]
    fn single_particle_is_enclosed_by_boundary_polygons() {
        let particles = [Particle::new(DVec2::new(25.0, 25.0), DVec2::ZERO)];
        let extractor = extractor(50.0, 50.0);
        let polygons: Vec<_> = extractor.polygons(DensityField::new(&particles, 5.5)).collect();

        assert!(!polygons.is_empty());
        for polygon in &polygons {
            assert!(polygon.density > 0.0);
            let center =
                polygon.vertices.iter().copied().sum::<DVec2>() / polygon.vertices.len() as f64;
            assert!(center.distance(particles[0].position) < 15.0);
        }
    }

    #[test]
    fn iterator_is_exhausted_after_one_pass() {
        let particles = [Particle::new(DVec2::new(25.0, 25.0), DVec2::ZERO)];
        let extractor = extractor(50.0, 50.0);
        let mut contours = extractor.polygons(DensityField::new(&particles, 5.5));
        let first_pass = contours.by_ref().count();
        assert!(first_pass > 0);
        assert_eq!(contours.next(), None);
    }

    #[test]
    fn parallel_extraction_matches_lazy_order() {
        let particles: Vec<_> = (0..20)
            .map(|i| {
                let position = DVec2::new(10.0 + i as f64 * 4.0, 30.0 + (i % 5) as f64 * 6.0);
                Particle::new(position, DVec2::ZERO)
            })
            .collect();
        let extractor = extractor(120.0, 80.0);
        let field = DensityField::new(&particles, 5.5);

        let lazy: Vec<_> = extractor.polygons(field).collect();
        let parallel = extractor.extract_parallel(field, &TaskPool::new());
        assert_eq!(lazy, parallel);
    }
}
