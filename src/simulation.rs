use bevy::math::DVec2;
use bevy::prelude::*;
use bevy::tasks::{ComputeTaskPool, TaskPool};
use rand::Rng;

use crate::contour::{ContourExtractor, ContourPolygon, Contours};
use crate::density::DensityField;
use crate::error::Result;
use crate::grid::SpatialGrid;
use crate::integrator::Integrator;
use crate::interaction::{InteractionForceApplier, InteractionOutcome, PointerState};
use crate::particle::{Particle, ParticleStore};
use crate::solver::ForceSolver;
use crate::SimConfig;

/// Counters from one pass of [`FluidSimulation::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub pairs: usize,
    pub interaction: InteractionOutcome,
}

/// Particle store, neighbour grid and the per-frame stages, driven in a fixed order:
/// grid rebuild, pressure/viscosity, pointer interaction, integration.
#[derive(Resource, Clone, Debug)]
pub struct FluidSimulation {
    config: SimConfig,
    store: ParticleStore,
    grid: SpatialGrid,
    solver: ForceSolver,
    integrator: Integrator,
    interaction: InteractionForceApplier,
    extractor: ContourExtractor,
    steps: u64,
}

impl FluidSimulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let radius = config.particle.radius;

        Ok(Self {
            store: ParticleStore::new(radius, config.particle.max_particles),
            grid: SpatialGrid::new(config.particle.grid_cell_size, radius),
            solver: ForceSolver::from_config(&config.fluid),
            integrator: Integrator::from_config(&config.domain, radius),
            interaction: InteractionForceApplier::from_config(&config.interaction),
            extractor: ContourExtractor::new(&config.contour, config.domain.bounding_box),
            steps: 0,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn particles(&self) -> &[Particle] {
        self.store.as_slice()
    }

    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ParticleStore {
        &mut self.store
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn particle_count(&self) -> usize {
        self.store.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Fills the domain with `initial_count` particles at uniform positions.
    /// Returns how many fit under the population cap.
    pub fn seed<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let count = self.config.particle.initial_count;
        let speed = self.config.particle.seed_speed;
        let container = self.integrator.container;

        self.store.extend((0..count).map(|_| {
            let position = DVec2::new(
                container.x + rng.gen::<f64>() * container.width,
                container.y + rng.gen::<f64>() * container.height,
            );
            let velocity = DVec2::new(
                (rng.gen::<f64>() - 0.5) * speed,
                (rng.gen::<f64>() - 0.5) * speed,
            );
            Particle::new(position, velocity)
        }))
    }

    pub fn rebuild_grid(&mut self) {
        self.grid.build(self.store.as_slice());
    }

    /// Pressure and viscosity over the current grid. Returns the pair count for the
    /// sequential solver; the parallel solver does not count pairs.
    pub fn solve_forces(&mut self) -> usize {
        if self.config.fluid.parallel {
            let pool = ComputeTaskPool::get_or_init(TaskPool::default);
            self.solver
                .apply_parallel(self.store.as_mut_slice(), &self.grid, pool);
            0
        } else {
            self.solver.apply(self.store.as_mut_slice(), &self.grid)
        }
    }

    pub fn apply_interaction<R: Rng + ?Sized>(
        &mut self,
        pointer: &PointerState,
        rng: &mut R,
    ) -> InteractionOutcome {
        self.interaction.apply(pointer, &mut self.store, rng)
    }

    pub fn integrate(&mut self) {
        self.integrator.step_all(self.store.as_mut_slice());
        self.steps += 1;
    }

    /// Runs one full frame of the pipeline.
    pub fn step<R: Rng + ?Sized>(&mut self, pointer: &PointerState, rng: &mut R) -> StepReport {
        self.rebuild_grid();
        let pairs = self.solve_forces();
        let interaction = self.apply_interaction(pointer, rng);
        self.integrate();

        debug!(
            "step {}: {} pairs, {} spawned, {} pushed",
            self.steps, pairs, interaction.spawned, interaction.pushed
        );
        StepReport { pairs, interaction }
    }

    pub fn density_field(&self) -> DensityField<'_> {
        DensityField::new(self.store.as_slice(), self.store.radius())
    }

    pub fn density_at(&self, point: DVec2) -> f64 {
        self.density_field().density_at(point)
    }

    /// Lazy iso-surface polygons for the current particle positions.
    pub fn contours(&self) -> Contours<'_> {
        self.extractor.polygons(self.density_field())
    }

    /// All polygons for the frame, extracted on the compute pool when
    /// parallel extraction is enabled.
    pub fn extract_contours(&self) -> Vec<ContourPolygon> {
        if self.config.contour.parallel {
            let pool = ComputeTaskPool::get_or_init(TaskPool::default);
            self.extractor.extract_parallel(self.density_field(), pool)
        } else {
            self.contours().collect()
        }
    }

    /// Number of other particles within the interaction radius of particle `index`,
    /// measured on the current positions.
    pub fn local_pressure(&self, index: usize) -> usize {
        let Some(particle) = self.store.get(index) else {
            return 0;
        };
        let radius = self.config.fluid.interaction_radius;
        self.particles()
            .iter()
            .enumerate()
            .filter(|&(other, p)| {
                other != index && p.position.distance(particle.position) < radius
            })
            .count()
    }

    /// [`local_pressure`](Self::local_pressure) for every particle at once, through a grid
    /// built on the current positions. The simulation's own grid is left as the last
    /// physics step built it.
    pub fn local_pressures(&self) -> Vec<usize> {
        let particles = self.particles();
        let radius = self.config.fluid.interaction_radius;
        let mut grid = SpatialGrid::new(self.config.particle.grid_cell_size, self.store.radius());
        grid.build(particles);

        particles
            .iter()
            .enumerate()
            .map(|(index, particle)| {
                grid.neighbors(particle.position)
                    .filter(|&other| {
                        other != index
                            && particles[other].position.distance(particle.position) < radius
                    })
                    .count()
            })
            .collect()
    }

    /// Drops every particle and seeds the domain again.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        self.store.clear();
        self.grid.build(&[]);
        self.steps = 0;
        self.seed(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::BoundingBox;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> SimConfig {
        let mut config = SimConfig::default();
        config.domain.bounding_box = BoundingBox::new(0.0, 0.0, 200.0, 150.0);
        config.particle.initial_count = 150;
        config.particle.max_particles = 200;
        config
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut bad = config();
        bad.domain.drag = 1.5;
        assert!(FluidSimulation::new(bad).is_err());
    }

    #[test]
    fn seeding_respects_the_container_and_cap() {
        let mut sim = FluidSimulation::new(config()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sim.seed(&mut rng), 150);
        assert_eq!(sim.seed(&mut rng), 50);
        assert_eq!(sim.particle_count(), 200);
        let container = sim.config().domain.container(sim.store().radius());
        assert!(sim.particles().iter().all(|p| container.contains(p.position)));
    }

    #[test]
    fn steps_keep_particles_finite_and_contained() {
        let mut sim = FluidSimulation::new(config()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        sim.seed(&mut rng);
        let pointer = PointerState {
            position: Some(DVec2::new(100.0, 40.0)),
            left_active: true,
            right_active: true,
        };

        for _ in 0..200 {
            sim.step(&pointer, &mut rng);
        }
        let container = sim.config().domain.container(sim.store().radius());
        assert_eq!(sim.steps(), 200);
        assert_eq!(sim.particle_count(), 200);
        assert!(sim
            .particles()
            .iter()
            .all(|p| p.is_finite() && container.contains(p.position)));
    }

    #[test]
    fn parallel_pipeline_matches_sequential_counts() {
        let mut parallel_config = config();
        parallel_config.fluid.parallel = true;
        parallel_config.contour.parallel = true;
        let mut sim = FluidSimulation::new(parallel_config).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        sim.seed(&mut rng);
        for _ in 0..20 {
            sim.step(&PointerState::default(), &mut rng);
        }
        assert!(sim.particles().iter().all(Particle::is_finite));
        let lazy: Vec<_> = sim.contours().collect();
        assert_eq!(sim.extract_contours(), lazy);
    }

    #[test]
    fn local_pressure_counts_close_neighbours() {
        let mut sim = FluidSimulation::new(config()).unwrap();
        for position in [(50.0, 50.0), (53.0, 50.0), (50.0, 54.0), (80.0, 80.0)] {
            sim.store_mut()
                .push(Particle::new(DVec2::new(position.0, position.1), DVec2::ZERO));
        }
        assert_eq!(sim.local_pressure(0), 2);
        assert_eq!(sim.local_pressure(3), 0);
        assert_eq!(sim.local_pressure(99), 0);
        assert_eq!(sim.local_pressures(), vec![2, 1, 1, 0]);
    }

    #[test]
    fn local_pressure_follows_particles_after_the_grid_was_built() {
        let mut sim = FluidSimulation::new(config()).unwrap();
        sim.store_mut()
            .push(Particle::new(DVec2::new(50.0, 50.0), DVec2::ZERO));
        sim.rebuild_grid();

        // Spawned and moved after the rebuild, as in the last stages of a step.
        sim.store_mut()
            .push(Particle::new(DVec2::new(120.0, 100.0), DVec2::ZERO));
        sim.store_mut()
            .push(Particle::new(DVec2::new(123.0, 100.0), DVec2::ZERO));
        sim.store_mut().as_mut_slice()[0].position = DVec2::new(121.0, 103.0);

        assert_eq!(sim.local_pressure(0), 2);
        assert_eq!(sim.local_pressure(2), 2);
        assert_eq!(sim.local_pressures(), vec![2, 2, 2]);
    }

    #[test]
    fn reset_reseeds_an_emptied_domain() {
        let mut sim = FluidSimulation::new(config()).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        sim.seed(&mut rng);
        sim.seed(&mut rng);
        for _ in 0..5 {
            sim.step(&PointerState::default(), &mut rng);
        }
        assert_eq!(sim.particle_count(), 200);

        assert_eq!(sim.reset(&mut rng), 150);
        assert_eq!(sim.particle_count(), 150);
        assert_eq!(sim.steps(), 0);
    }
}
