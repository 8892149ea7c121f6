use bevy::math::DVec2;
use bevy::prelude::*;
use rand::Rng;

use crate::particle::{Particle, ParticleStore};
use crate::solver::MIN_SEPARATION;
use crate::InteractionConfig;

/// Snapshot of the pointer for one frame, in simulation coordinates.
///
/// Positions outside the domain are used as given.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    pub position: Option<DVec2>,
    pub left_active: bool,
    pub right_active: bool,
}

/// Radial falloff of the right-button impulse. Positive strength pulls particles
/// towards the pointer, negative strength pushes them away.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PushFalloff {
    /// `strength / (1 + distance)`, applied to every particle.
    InverseDistance { strength: f64 },
    /// Constant `strength`, applied only within `radius`.
    Capped { strength: f64, radius: f64 },
}

impl Default for PushFalloff {
    fn default() -> Self {
        PushFalloff::InverseDistance { strength: 15.0 }
    }
}

impl PushFalloff {
    fn magnitude(&self, distance: f64) -> Option<f64> {
        match *self {
            PushFalloff::InverseDistance { strength } => Some(strength / (1.0 + distance)),
            PushFalloff::Capped { strength, radius } => (distance < radius).then_some(strength),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractionOutcome {
    pub spawned: usize,
    pub pushed: usize,
    /// A spawn was requested but the store had no room left.
    pub at_capacity: bool,
}

/// Turns pointer input into new particles and radial impulses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionForceApplier {
    pub spawn_batch_size: usize,
    /// Spawned velocities are uniform in `±spawn_speed / 2` per axis.
    pub spawn_speed: f64,
    pub falloff: PushFalloff,
}

impl InteractionForceApplier {
    pub fn from_config(config: &InteractionConfig) -> Self {
        Self {
            spawn_batch_size: config.spawn_batch_size,
            spawn_speed: config.spawn_speed,
            falloff: config.falloff,
        }
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        pointer: &PointerState,
        store: &mut ParticleStore,
        rng: &mut R,
    ) -> InteractionOutcome {
        let mut outcome = InteractionOutcome::default();
        let Some(position) = pointer.position else {
            return outcome;
        };

        if pointer.left_active {
            outcome.at_capacity = store.remaining() == 0;
            outcome.spawned = self.spawn(position, store, rng);
        }
        if pointer.right_active {
            outcome.pushed = self.push(position, store.as_mut_slice());
        }
        outcome
    }

    /// Spawns up to one batch at `position`; whatever exceeds the store's capacity is dropped.
    pub fn spawn<R: Rng + ?Sized>(
        &self,
        position: DVec2,
        store: &mut ParticleStore,
        rng: &mut R,
    ) -> usize {
        let count = self.spawn_batch_size.min(store.remaining());
        let speed = self.spawn_speed;
        store.extend((0..count).map(|_| {
            let velocity = DVec2::new(
                (rng.gen::<f64>() - 0.5) * speed,
                (rng.gen::<f64>() - 0.5) * speed,
            );
            Particle::new(position, velocity)
        }))
    }

    /// Adds the radial impulse towards `target` to every affected particle.
    /// Returns how many particles were affected.
    pub fn push(&self, target: DVec2, particles: &mut [Particle]) -> usize {
        let mut affected = 0;
        for particle in particles {
            let delta = target - particle.position;
            let distance = delta.length();
            if distance < MIN_SEPARATION {
                continue;
            }
            if let Some(magnitude) = self.falloff.magnitude(distance) {
                particle.velocity += delta / distance * magnitude;
                affected += 1;
            }
        }
        affected
    }
}
