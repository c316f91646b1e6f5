pub mod app;
pub mod asset;
pub mod ecs;
pub mod error;
pub mod event;
pub mod renderer;
pub mod scene;
pub mod settings;

pub use app::{App, AppSetup, SetupContext};
pub use error::{RenderError, Result};

use settings::RenderSettings;
use winit::event_loop::{ControlFlow, EventLoop};

pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Opens a window and runs `setup` once the GPU is ready, then renders the
/// scene every frame until the window closes or a system asks to quit.
pub fn run(title: &str, setup: AppSetup) -> Result<()> {
    init_logging();

    let settings = RenderSettings::load();
    log::info!("Starting {} at {}x{}", title, settings.resolution.width, settings.resolution.height);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(title, settings, setup);
    event_loop.run_app(&mut app)?;

    match app.take_error() {
        Some(err) => Err(err),
        None => {
            log::info!("Application shutdown complete");
            Ok(())
        }
    }
}
