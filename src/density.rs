use bevy::math::DVec2;

use crate::particle::Particle;

/// Scalar density over the plane: each particle contributes `r² / (d² + 1)`.
///
/// The `+ 1` keeps the kernel finite at a particle's centre, where it peaks at `r²`.
/// Every sample is a brute-force sum over all particles.
#[derive(Clone, Copy, Debug)]
pub struct DensityField<'a> {
    particles: &'a [Particle],
    radius_squared: f64,
}

impl<'a> DensityField<'a> {
    pub fn new(particles: &'a [Particle], particle_radius: f64) -> Self {
        Self {
            particles,
            radius_squared: particle_radius * particle_radius,
        }
    }

    pub fn density_at(&self, point: DVec2) -> f64 {
        self.particles
            .iter()
            .map(|p| self.radius_squared / (point.distance_squared(p.position) + 1.0))
            .sum()
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn empty_field_is_zero_everywhere() {
        let field = DensityField::new(&[], 5.5);
        assert_eq!(field.density_at(DVec2::new(3.0, -7.0)), 0.0);
    }

    #[test]
    fn single_particle_peaks_at_radius_squared() {
        let particles = [Particle::new(DVec2::new(10.0, 10.0), DVec2::ZERO)];
        let field = DensityField::new(&particles, 2.0);
        assert_eq!(field.density_at(DVec2::new(10.0, 10.0)), 4.0);
        // d² = 9 + 16 = 25
        assert!((field.density_at(DVec2::new(13.0, 14.0)) - 4.0 / 26.0).abs() < 1e-12);
    }

    #[test]
    fn density_is_non_negative_and_additive() {
        let mut rng = StdRng::seed_from_u64(1);
        let particles: Vec<_> = (0..50)
            .map(|_| {
                Particle::new(
                    DVec2::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)),
                    DVec2::ZERO,
                )
            })
            .collect();
        let whole = DensityField::new(&particles, 5.5);
        let (left, right) = particles.split_at(20);

        for _ in 0..100 {
            let point = DVec2::new(rng.gen_range(-50.0..150.0), rng.gen_range(-50.0..150.0));
            let total = whole.density_at(point);
            assert!(total >= 0.0);
            let parts = DensityField::new(left, 5.5).density_at(point)
                + DensityField::new(right, 5.5).density_at(point);
            assert!((total - parts).abs() < 1e-9);
        }
    }
}
