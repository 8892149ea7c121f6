use bevy::prelude::*;

use crate::particle::Particle;

#[derive(Resource, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualizationMode {
    /// Filled iso-surface from the density field
    #[default]
    Contour,
    /// Particles coloured by speed
    Speed,
    /// Particles coloured by neighbour count
    Pressure,
}

impl VisualizationMode {
    pub fn next(self) -> Self {
        match self {
            VisualizationMode::Contour => VisualizationMode::Speed,
            VisualizationMode::Speed => VisualizationMode::Pressure,
            VisualizationMode::Pressure => VisualizationMode::Contour,
        }
    }

    /// Normalised 0..=1 colour scalar for one particle in the particle-drawing modes.
    pub fn particle_value(
        self,
        particle: &Particle,
        neighbours: usize,
        speed_scale: f64,
        pressure_scale: f64,
    ) -> f64 {
        let value = match self {
            VisualizationMode::Contour => 0.0,
            VisualizationMode::Speed => particle.speed() / speed_scale,
            VisualizationMode::Pressure => neighbours as f64 / pressure_scale,
        };
        value.clamp(0.0, 1.0)
    }
}

/// Handle of the mesh the iso-surface is written into every frame.
#[derive(Resource, Clone, Debug)]
pub struct ContourMesh(pub Handle<Mesh>);

/// Frame counter that refreshes the fps figure once per wall-clock second.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub particle_count: usize,
    pub fps: f64,
    pub frames: u32,
    pub last_update: f64,
}

impl FrameStats {
    /// Counts one frame at time `now` (seconds). Returns the new fps value when a full
    /// second has passed since the last refresh.
    pub fn tick(&mut self, now: f64) -> Option<f64> {
        self.frames += 1;
        if now - self.last_update < 1.0 {
            return None;
        }
        self.fps = self.frames as f64;
        self.frames = 0;
        self.last_update = now;
        Some(self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::DVec2;

    #[test]
    fn fps_refreshes_once_per_second() {
        let mut stats = FrameStats::default();
        for frame in 1..60 {
            assert_eq!(stats.tick(frame as f64 / 60.0), None);
        }
        assert_eq!(stats.tick(1.0), Some(60.0));
        assert_eq!(stats.frames, 0);
        assert_eq!(stats.tick(1.5), None);
        assert_eq!(stats.fps, 60.0);
    }

    #[test]
    fn modes_cycle_through_all_variants() {
        let start = VisualizationMode::default();
        assert_eq!(start.next().next().next(), start);
        assert_ne!(start.next(), start);
    }

    #[test]
    fn particle_values_are_clamped() {
        let fast = Particle::new(DVec2::ZERO, DVec2::new(30.0, 40.0));
        assert_eq!(VisualizationMode::Speed.particle_value(&fast, 0, 10.0, 8.0), 1.0);
        let slow = Particle::new(DVec2::ZERO, DVec2::new(3.0, 4.0));
        assert_eq!(VisualizationMode::Speed.particle_value(&slow, 0, 10.0, 8.0), 0.5);
        assert_eq!(VisualizationMode::Pressure.particle_value(&slow, 2, 10.0, 8.0), 0.25);
    }
}
