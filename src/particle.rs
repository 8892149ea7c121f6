use bevy::math::DVec2;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub position: DVec2,
    pub velocity: DVec2,
}

impl Particle {
    pub fn new(position: DVec2, velocity: DVec2) -> Self {
        Self { position, velocity }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// Owns every particle of the simulation in one contiguous array.
///
/// All particles share a single radius. The store never grows past its capacity:
/// additions beyond it are rejected, not evicted.
#[derive(Clone, Debug)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    radius: f64,
    capacity: usize,
}

impl ParticleStore {
    pub fn new(radius: f64, capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            radius,
            capacity,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of particles that can still be added.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.particles.len())
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    /// Adds a particle, returning `false` when the store is full.
    pub fn push(&mut self, particle: Particle) -> bool {
        if self.particles.len() >= self.capacity {
            return false;
        }
        self.particles.push(particle);
        true
    }

    /// Adds particles until the batch is exhausted or the store is full.
    /// Returns how many were added.
    pub fn extend<I>(&mut self, batch: I) -> usize
    where
        I: IntoIterator<Item = Particle>,
    {
        let room = self.remaining();
        let before = self.particles.len();
        self.particles.extend(batch.into_iter().take(room));
        self.particles.len() - before
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}
