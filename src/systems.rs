use bevy::math::Isometry2d;
use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::window::PrimaryWindow;

use crate::contour::ContourPolygon;
use crate::interaction::PointerState;
use crate::math::{to_simulation, to_world};
use crate::resources::*;
use crate::simulation::FluidSimulation;
use crate::SimConfig;

pub fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut simulation: ResMut<FluidSimulation>,
    config: Res<SimConfig>,
) {
    commands.spawn(Camera2d);

    let bounds = config.domain.bounding_box;
    commands.spawn((
        Mesh2d(meshes.add(Rectangle::new(bounds.width as f32, bounds.height as f32))),
        MeshMaterial2d(materials.add(ColorMaterial::from_color(Color::WHITE))),
        Transform::from_xyz(0.0, 0.0, -1.0),
    ));

    // Vertex colours carry the shading; the material stays white.
    let handle = meshes.add(contour_mesh(&[], &config));
    commands.spawn((
        Mesh2d(handle.clone()),
        MeshMaterial2d(materials.add(ColorMaterial::from_color(Color::WHITE))),
        Transform::default(),
    ));
    commands.insert_resource(ContourMesh(handle));

    let seeded = simulation.seed(&mut rand::thread_rng());
    info!(
        "Seeded {} particles (cap {})",
        seeded, config.particle.max_particles
    );
}

/// Copies mouse state into the per-frame [`PointerState`] snapshot. The last known
/// position is kept while the cursor is outside the window.
pub fn update_pointer_state(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    config: Res<SimConfig>,
    mut pointer: ResMut<PointerState>,
) {
    let cursor = windows.get_single().ok().and_then(Window::cursor_position);
    let world = match (cursor, cameras.get_single()) {
        (Some(cursor), Ok((camera, transform))) => {
            camera.viewport_to_world_2d(transform, cursor).ok()
        }
        _ => None,
    };

    if let Some(world) = world {
        pointer.position = Some(to_simulation(world, &config.domain.bounding_box));
    }
    pointer.left_active = buttons.pressed(MouseButton::Left);
    pointer.right_active = buttons.pressed(MouseButton::Right);
}

pub fn rebuild_spatial_grid(mut simulation: ResMut<FluidSimulation>) {
    simulation.rebuild_grid();
}

pub fn apply_pressure_and_viscosity(mut simulation: ResMut<FluidSimulation>) {
    let pairs = simulation.solve_forces();
    debug!("pressure/viscosity: {} pairs", pairs);
}

pub fn apply_pointer_interaction(
    mut simulation: ResMut<FluidSimulation>,
    pointer: Res<PointerState>,
    mut cap_reported: Local<bool>,
) {
    let outcome = simulation.apply_interaction(&pointer, &mut rand::thread_rng());
    if outcome.spawned > 0 {
        debug!("spawned {} particles", outcome.spawned);
    }
    if outcome.at_capacity && !*cap_reported {
        warn!(
            "particle cap of {} reached, dropping spawns",
            simulation.store().capacity()
        );
        *cap_reported = true;
    }
    if !pointer.left_active {
        *cap_reported = false;
    }
}

pub fn integrate_particles(mut simulation: ResMut<FluidSimulation>) {
    simulation.integrate();
}

pub fn update_contour_mesh(
    simulation: Res<FluidSimulation>,
    visualization_mode: Res<VisualizationMode>,
    contour: Res<ContourMesh>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let Some(mesh) = meshes.get_mut(&contour.0) else {
        return;
    };
    let polygons = match *visualization_mode {
        VisualizationMode::Contour => simulation.extract_contours(),
        _ => Vec::new(),
    };
    *mesh = contour_mesh(&polygons, simulation.config());
}

/// Fan-triangulates every polygon into one triangle list in world space, shaded by
/// how far its density exceeds the threshold.
pub fn contour_mesh(polygons: &[ContourPolygon], config: &SimConfig) -> Mesh {
    let bounds = config.domain.bounding_box;
    let threshold = config.contour.density_threshold;
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut colors: Vec<[f32; 4]> = Vec::new();

    for polygon in polygons {
        let excess = ((polygon.density - threshold) / threshold.abs().max(f64::EPSILON))
            .clamp(0.0, 1.0) as f32;
        let color = [0.15, 0.55 - 0.35 * excess, 0.95 - 0.25 * excess, 1.0];

        let Some((&first, rest)) = polygon.vertices.split_first() else {
            continue;
        };
        for edge in rest.windows(2) {
            let mut triangle = [first, edge[0], edge[1]].map(|v| to_world(v, &bounds));
            if (triangle[1] - triangle[0]).perp_dot(triangle[2] - triangle[0]) < 0.0 {
                triangle.swap(1, 2);
            }
            for vertex in triangle {
                positions.push([vertex.x, vertex.y, 0.0]);
                colors.push(color);
            }
        }
    }

    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
}

pub fn draw_particles(
    simulation: Res<FluidSimulation>,
    visualization_mode: Res<VisualizationMode>,
    config: Res<SimConfig>,
    mut gizmos: Gizmos,
) {
    let mode = *visualization_mode;
    if mode == VisualizationMode::Contour {
        return;
    }
    let bounds = config.domain.bounding_box;
    let radius = simulation.store().radius() as f32;
    let pressures = match mode {
        VisualizationMode::Pressure => simulation.local_pressures(),
        _ => Vec::new(),
    };

    for (index, particle) in simulation.particles().iter().enumerate() {
        let neighbours = pressures.get(index).copied().unwrap_or(0);
        let value = mode.particle_value(
            particle,
            neighbours,
            config.render.speed_scale,
            config.render.pressure_scale,
        ) as f32;
        gizmos.circle_2d(
            Isometry2d::from_translation(to_world(particle.position, &bounds)),
            radius,
            Color::srgb(value, 0.0, 1.0 - value),
        );
    }
}

pub fn handle_visualization_toggle(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut visualization_mode: ResMut<VisualizationMode>,
) {
    if keyboard.just_pressed(KeyCode::Tab) {
        *visualization_mode = visualization_mode.next();
        info!("Visualization mode: {:?}", *visualization_mode);
    }
}

pub fn reset_simulation(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut simulation: ResMut<FluidSimulation>,
) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        let seeded = simulation.reset(&mut rand::thread_rng());
        info!("Simulation reset, {} particles seeded", seeded);
    }
}

pub fn print_fps(
    time: Res<Time>,
    simulation: Res<FluidSimulation>,
    mut stats: ResMut<FrameStats>,
) {
    stats.particle_count = simulation.particle_count();
    if let Some(fps) = stats.tick(time.elapsed_secs_f64()) {
        info!("FPS: {:.0}, Particles: {}", fps, stats.particle_count);
    }
}
