use bevy::input::InputSystem;
use bevy::prelude::*;

mod contour;
mod density;
mod error;
mod grid;
mod integrator;
mod interaction;
mod math;
mod particle;
mod resources;
mod simulation;
mod solver;
mod systems;

pub use contour::{
    case_index, generate_contour, ContourExtractor, ContourPolygon, Contours, HalfStepOffset,
    CASE_TABLE,
};
pub use density::DensityField;
pub use error::{ConfigError, Result};
pub use grid::SpatialGrid;
pub use integrator::{BoundaryPolicy, Integrator};
pub use interaction::{InteractionForceApplier, InteractionOutcome, PointerState, PushFalloff};
pub use math::{get_grid_cell, get_neighboring_cells, to_simulation, to_world, BoundingBox, CellKey};
pub use particle::{Particle, ParticleStore};
pub use resources::{ContourMesh, FrameStats, VisualizationMode};
pub use simulation::{FluidSimulation, StepReport};
pub use solver::{ForceSolver, PairVisitation, MIN_SEPARATION};
pub use systems::*;

/// Physics timestep configuration
#[derive(Resource, Clone, Debug, Copy)]
pub struct TimeConfig {
    /// Simulation steps per second; each step advances one unit of simulation time
    pub physics_rate: f64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self { physics_rate: 60.0 }
    }
}

/// Domain and per-particle motion configuration
#[derive(Resource, Clone, Debug, Copy)]
pub struct DomainConfig {
    /// Simulation domain, origin top-left, y down
    pub bounding_box: BoundingBox,
    /// Added to vertical velocity every step (positive is down)
    pub gravity: f64,
    /// Velocity multiplier per step, 0..=1
    pub drag: f64,
    /// Fraction of speed kept after hitting a wall, 0..=1
    pub bounce: f64,
    pub boundary_policy: BoundaryPolicy,
    /// Keep particle centres one radius away from the walls
    pub inset_by_radius: bool,
}

impl DomainConfig {
    /// Region particle centres are confined to.
    pub fn container(&self, particle_radius: f64) -> BoundingBox {
        if self.inset_by_radius {
            self.bounding_box.inset(particle_radius)
        } else {
            self.bounding_box
        }
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            bounding_box: BoundingBox::new(5.0, 5.0, 689.0, 489.0),
            gravity: 0.2,
            drag: 0.98,
            bounce: 0.7,
            boundary_policy: BoundaryPolicy::Reflect,
            inset_by_radius: true,
        }
    }
}

/// Particle-specific configuration
#[derive(Resource, Clone, Debug, Copy)]
pub struct ParticleConfig {
    /// Shared particle radius
    pub radius: f64,
    /// Population cap; spawns beyond it are dropped
    pub max_particles: usize,
    /// Particles seeded at startup
    pub initial_count: usize,
    /// Seeded velocities are uniform in ±seed_speed / 2 per axis
    pub seed_speed: f64,
    /// Grid cell size for spatial partitioning
    pub grid_cell_size: f64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            radius: 5.5,
            max_particles: 3000,
            initial_count: 0,
            seed_speed: 10.0,
            grid_cell_size: 20.0,
        }
    }
}

/// Pairwise force configuration
#[derive(Resource, Clone, Debug, Copy)]
pub struct FluidConfig {
    pub pressure_coeff: f64,
    /// Blend factor towards the pair's mean velocity, 0..=1
    pub viscosity_coeff: f64,
    /// Pairs closer than this interact
    pub interaction_radius: f64,
    pub pair_visitation: PairVisitation,
    /// Solve on the compute task pool with per-particle delta buffers
    pub parallel: bool,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            pressure_coeff: 0.05,
            viscosity_coeff: 0.02,
            interaction_radius: 5.0,
            pair_visitation: PairVisitation::Unique,
            parallel: false,
        }
    }
}

/// Pointer interaction configuration
#[derive(Resource, Clone, Debug, Copy)]
pub struct InteractionConfig {
    /// Particles spawned per step while the left button is held
    pub spawn_batch_size: usize,
    /// Spawned velocities are uniform in ±spawn_speed / 2 per axis
    pub spawn_speed: f64,
    pub falloff: PushFalloff,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            spawn_batch_size: 10,
            spawn_speed: 5.0,
            falloff: PushFalloff::default(),
        }
    }
}

/// Iso-surface extraction configuration
#[derive(Resource, Clone, Debug, Copy)]
pub struct ContourConfig {
    pub density_threshold: f64,
    /// Lattice spacing
    pub step_size: f64,
    /// Extract rows on the compute task pool
    pub parallel: bool,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            density_threshold: 0.5,
            step_size: 5.0,
            parallel: false,
        }
    }
}

/// Visualization configuration
#[derive(Resource, Clone, Debug, Copy)]
pub struct RenderConfig {
    pub initial_mode: VisualizationMode,
    /// Speed mapped to the hottest colour
    pub speed_scale: f64,
    /// Neighbour count mapped to the hottest colour
    pub pressure_scale: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            initial_mode: VisualizationMode::Contour,
            speed_scale: 10.0,
            pressure_scale: 8.0,
        }
    }
}

/// Upper bound on contour lattice cells per frame.
pub const MAX_LATTICE_CELLS: usize = 1 << 22;

/// Combined simulation configuration
#[derive(Resource, Clone, Debug, Copy, Default)]
pub struct SimConfig {
    pub time: TimeConfig,
    pub domain: DomainConfig,
    pub particle: ParticleConfig,
    pub fluid: FluidConfig,
    pub interaction: InteractionConfig,
    pub contour: ContourConfig,
    pub render: RenderConfig,
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        let domain = &self.domain;
        let bounds = &domain.bounding_box;

        for (name, value) in [
            ("bounding_box.x", bounds.x),
            ("bounding_box.y", bounds.y),
            ("gravity", domain.gravity),
            ("pressure_coeff", self.fluid.pressure_coeff),
            ("spawn_speed", self.interaction.spawn_speed),
            ("seed_speed", self.particle.seed_speed),
            ("density_threshold", self.contour.density_threshold),
        ] {
            finite(name, value)?;
        }
        for (name, value) in [
            ("physics_rate", self.time.physics_rate),
            ("bounding_box.width", bounds.width),
            ("bounding_box.height", bounds.height),
            ("radius", self.particle.radius),
            ("grid_cell_size", self.particle.grid_cell_size),
            ("interaction_radius", self.fluid.interaction_radius),
            ("step_size", self.contour.step_size),
            ("max_particles", self.particle.max_particles as f64),
        ] {
            positive(name, value)?;
        }
        for (name, value) in [
            ("drag", domain.drag),
            ("bounce", domain.bounce),
            ("viscosity_coeff", self.fluid.viscosity_coeff),
        ] {
            unit_interval(name, value)?;
        }
        match self.interaction.falloff {
            PushFalloff::InverseDistance { strength } => finite("falloff.strength", strength)?,
            PushFalloff::Capped { strength, radius } => {
                finite("falloff.strength", strength)?;
                positive("falloff.radius", radius)?;
            }
        }

        let container = domain.container(self.particle.radius);
        if container.width <= 0.0 || container.height <= 0.0 {
            return Err(ConfigError::DomainTooSmall {
                width: bounds.width,
                height: bounds.height,
                radius: self.particle.radius,
            });
        }

        if self.fluid.interaction_radius > self.particle.grid_cell_size {
            return Err(ConfigError::RadiusExceedsCell {
                radius: self.fluid.interaction_radius,
                cell_size: self.particle.grid_cell_size,
            });
        }

        let step = self.contour.step_size;
        let columns = (bounds.width / step).ceil();
        let rows = (bounds.height / step).ceil();
        if columns * rows > MAX_LATTICE_CELLS as f64 {
            return Err(ConfigError::LatticeTooLarge {
                step,
                columns,
                rows,
                max: MAX_LATTICE_CELLS,
            });
        }
        Ok(())
    }
}

fn finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { name, value })
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn unit_interval(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

#[derive(Default)]
pub struct WeakSphPlugin {
    pub config: SimConfig,
}

impl Plugin for WeakSphPlugin {
    fn build(&self, app: &mut App) {
        let simulation = match FluidSimulation::new(self.config) {
            Ok(simulation) => simulation,
            Err(err) => panic!("invalid simulation config: {err}"),
        };

        app.insert_resource(self.config)
            .insert_resource(simulation)
            .insert_resource(Time::<Fixed>::from_hz(self.config.time.physics_rate))
            .insert_resource(self.config.render.initial_mode)
            .init_resource::<PointerState>()
            .init_resource::<FrameStats>()
            .add_systems(Startup, setup)
            .add_systems(PreUpdate, update_pointer_state.after(InputSystem))
            // Fixed update systems
            .add_systems(
                FixedUpdate,
                (
                    rebuild_spatial_grid,
                    apply_pressure_and_viscosity,
                    apply_pointer_interaction,
                    integrate_particles,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    handle_visualization_toggle,
                    reset_simulation,
                    update_contour_mesh,
                    draw_particles,
                    print_fps,
                ),
            );
    }
}

// Re-export everything needed for the public API
pub mod prelude {
    pub use crate::{
        BoundingBox, ContourConfig, ContourPolygon, DomainConfig, FluidConfig, FluidSimulation,
        InteractionConfig, Particle, ParticleConfig, PointerState, RenderConfig, SimConfig,
        TimeConfig, VisualizationMode, WeakSphPlugin,
    };
}
