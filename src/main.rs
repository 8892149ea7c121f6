use bevy::prelude::*;
use weak_sph::prelude::*;
use weak_sph::ConfigError;

fn main() -> Result<(), ConfigError> {
    let config = SimConfig::default();
    config.validate()?;

    let bounds = config.domain.bounding_box;
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.92, 0.92, 0.92)))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "2D Fluid Simulation".into(),
                resolution: ((bounds.width + 100.0) as f32, (bounds.height + 150.0) as f32).into(),
                resizable: false,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(WeakSphPlugin { config })
        .run();

    Ok(())
}
