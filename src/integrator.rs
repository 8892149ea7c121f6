use bevy::math::DVec2;

use crate::math::BoundingBox;
use crate::particle::Particle;
use crate::DomainConfig;

/// What happens when a particle leaves the domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Clamp to the crossed wall and point the velocity back inside, scaled by `bounce`.
    #[default]
    Reflect,
    /// Clamp with min/max, then negate and scale the velocity on every clamped axis.
    ClampInvert,
}

/// Gravity, drag and boundary handling for one particle per call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Integrator {
    pub gravity: f64,
    pub drag: f64,
    pub bounce: f64,
    pub policy: BoundaryPolicy,
    /// Region particle centres are kept inside.
    pub container: BoundingBox,
}

impl Integrator {
    pub fn from_config(config: &DomainConfig, particle_radius: f64) -> Self {
        Self {
            gravity: config.gravity,
            drag: config.drag,
            bounce: config.bounce,
            policy: config.boundary_policy,
            container: config.container(particle_radius),
        }
    }

    pub fn step(&self, particle: &mut Particle) {
        particle.velocity.y += self.gravity;
        particle.velocity *= self.drag;
        particle.position += particle.velocity;

        match self.policy {
            BoundaryPolicy::Reflect => self.reflect(particle),
            BoundaryPolicy::ClampInvert => self.clamp_invert(particle),
        }
    }

    pub fn step_all(&self, particles: &mut [Particle]) {
        for particle in particles {
            self.step(particle);
        }
    }

    fn reflect(&self, particle: &mut Particle) {
        let (min, max) = (self.container.min(), self.container.max());
        let (position, velocity) = (&mut particle.position, &mut particle.velocity);

        if position.x < min.x {
            position.x = min.x;
            velocity.x = velocity.x.abs() * self.bounce;
        }
        if position.x > max.x {
            position.x = max.x;
            velocity.x = -velocity.x.abs() * self.bounce;
        }
        if position.y < min.y {
            position.y = min.y;
            velocity.y = velocity.y.abs() * self.bounce;
        }
        if position.y > max.y {
            position.y = max.y;
            velocity.y = -velocity.y.abs() * self.bounce;
        }
    }

    fn clamp_invert(&self, particle: &mut Particle) {
        let clamped: DVec2 = particle.position.clamp(self.container.min(), self.container.max());
        if clamped.x != particle.position.x {
            particle.velocity.x = -particle.velocity.x * self.bounce;
        }
        if clamped.y != particle.position.y {
            particle.velocity.y = -particle.velocity.y * self.bounce;
        }
        particle.position = clamped;
    }
}
