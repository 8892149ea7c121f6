//! Pairwise pressure and viscosity impulses.
//!
//! Each pair closer than the interaction radius pushes apart with an impulse of
//! `(R - d) * pressure_coeff` along the line between them, then both velocities are
//! blended towards their mean by `viscosity_coeff`.

use bevy::math::DVec2;
use bevy::tasks::TaskPool;

use crate::grid::SpatialGrid;
use crate::particle::Particle;
use crate::FluidConfig;

/// Separations below this are treated as coincident and skipped.
pub const MIN_SEPARATION: f64 = 1e-9;

const MIN_PARTICLES_PER_TASK: usize = 64;

/// How neighbour iteration maps onto unordered particle pairs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PairVisitation {
    /// Each unordered pair is processed once, from the lower index.
    #[default]
    Unique,
    /// Each pair is processed from both sides, applying the interaction twice.
    Symmetric,
}

impl PairVisitation {
    fn visits(self, a: usize, b: usize) -> bool {
        match self {
            PairVisitation::Unique => b > a,
            PairVisitation::Symmetric => b != a,
        }
    }

    fn passes_per_pair(self) -> f64 {
        match self {
            PairVisitation::Unique => 1.0,
            PairVisitation::Symmetric => 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceSolver {
    pub interaction_radius: f64,
    pub pressure_coeff: f64,
    pub viscosity_coeff: f64,
    pub pair_visitation: PairVisitation,
}

impl ForceSolver {
    pub fn from_config(config: &FluidConfig) -> Self {
        Self {
            interaction_radius: config.interaction_radius,
            pressure_coeff: config.pressure_coeff,
            viscosity_coeff: config.viscosity_coeff,
            pair_visitation: config.pair_visitation,
        }
    }

    /// Impulse that `b` receives from `a` (and `a` receives negated), or `None` when the
    /// pair is out of range or too close to have a direction.
    pub fn pressure_impulse(&self, a: DVec2, b: DVec2) -> Option<DVec2> {
        let delta = b - a;
        let distance = delta.length();
        if distance >= self.interaction_radius || distance < MIN_SEPARATION {
            return None;
        }
        let force = (self.interaction_radius - distance) * self.pressure_coeff;
        Some(delta / distance * force)
    }

    /// Applies the pair updates in place, one pair at a time, so later pairs see the
    /// velocities left by earlier ones. `grid` must have been built from `particles`.
    ///
    /// Returns the number of pair updates performed.
    pub fn apply(&self, particles: &mut [Particle], grid: &SpatialGrid) -> usize {
        let k = self.viscosity_coeff;
        let mut pairs = 0;

        for a in 0..particles.len() {
            let position = particles[a].position;
            for b in grid.neighbors(position) {
                if !self.pair_visitation.visits(a, b) {
                    continue;
                }
                let Some(push) = self.pressure_impulse(position, particles[b].position) else {
                    continue;
                };
                let (pa, pb) = pair_mut(particles, a, b);
                pa.velocity -= push;
                pb.velocity += push;

                let average = (pa.velocity + pb.velocity) * 0.5;
                pa.velocity = average * k + pa.velocity * (1.0 - k);
                pb.velocity = average * k + pb.velocity * (1.0 - k);
                pairs += 1;
            }
        }
        pairs
    }

    /// Parallel variant of [`apply`](Self::apply).
    ///
    /// Every task reads the same snapshot and writes only the velocity deltas of its own
    /// index range; the deltas are committed once all tasks finish. Pairs therefore see
    /// pre-step velocities instead of partially updated ones, and total momentum is
    /// conserved exactly.
    pub fn apply_parallel(&self, particles: &mut [Particle], grid: &SpatialGrid, pool: &TaskPool) {
        let len = particles.len();
        if len == 0 {
            return;
        }
        let chunk = len.div_ceil(pool.thread_num().max(1)).max(MIN_PARTICLES_PER_TASK);
        let solver = *self;

        let chunks = {
            let snapshot: &[Particle] = particles;
            pool.scope(|scope| {
                for start in (0..len).step_by(chunk) {
                    let end = (start + chunk).min(len);
                    scope.spawn(async move {
                        let deltas: Vec<DVec2> = (start..end)
                            .map(|a| solver.accumulate(a, snapshot, grid))
                            .collect();
                        (start, deltas)
                    });
                }
            })
        };

        for (start, deltas) in chunks {
            for (particle, delta) in particles[start..].iter_mut().zip(deltas) {
                particle.velocity += delta;
            }
        }
    }

    /// Total velocity change of particle `a` from every in-range neighbour, evaluated
    /// against the unmodified snapshot.
    fn accumulate(&self, a: usize, snapshot: &[Particle], grid: &SpatialGrid) -> DVec2 {
        let k = self.viscosity_coeff;
        let this = snapshot[a];
        let mut delta = DVec2::ZERO;

        for b in grid.neighbors(this.position) {
            if b == a {
                continue;
            }
            let other = snapshot[b];
            let Some(push) = self.pressure_impulse(this.position, other.position) else {
                continue;
            };
            delta += -push * (1.0 - k) + (other.velocity - this.velocity) * (0.5 * k);
        }
        delta * self.pair_visitation.passes_per_pair()
    }
}

fn pair_mut(particles: &mut [Particle], a: usize, b: usize) -> (&mut Particle, &mut Particle) {
    debug_assert_ne!(a, b);
    if a < b {
        let (head, tail) = particles.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = particles.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}
