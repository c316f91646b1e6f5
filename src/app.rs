use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::asset::Assets;
use crate::ecs::{FrameContext, Scene};
use crate::error::{RenderError, Result};
use crate::event::{Event, EventQueue};
use crate::renderer::{Renderer, SubmissionQueue};
use crate::settings::RenderSettings;

/// What the setup closure gets once the GPU is ready.
pub struct SetupContext<'a> {
    pub scene: &'a mut Scene,
    pub assets: &'a mut Assets,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub aspect_ratio: f32,
}

/// Populates the scene; runs once, after the renderer is created.
pub type AppSetup = Box<dyn FnOnce(&mut SetupContext) -> Result<()>>;

pub struct App {
    title: String,
    settings: RenderSettings,
    setup: Option<AppSetup>,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    scene: Scene,
    assets: Assets,
    events: EventQueue,
    submissions: SubmissionQueue,
    last_frame: Instant,
    error: Option<RenderError>,
}

impl App {
    pub fn new(title: impl Into<String>, settings: RenderSettings, setup: AppSetup) -> Self {
        let title = title.into();
        Self {
            scene: Scene::new(title.clone()),
            title,
            settings,
            setup: Some(setup),
            window: None,
            renderer: None,
            assets: Assets::new(),
            events: EventQueue::new(),
            submissions: SubmissionQueue::new(),
            last_frame: Instant::now(),
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<RenderError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RenderError) {
        log::error!("Fatal: {}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn initialise(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let resolution = self.settings.resolution;
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(resolution.width, resolution.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let renderer = pollster::block_on(Renderer::new(window.clone(), self.settings.clone()))?;

        if let Some(setup) = self.setup.take() {
            let mut ctx = SetupContext {
                scene: &mut self.scene,
                assets: &mut self.assets,
                device: renderer.device(),
                queue: renderer.queue(),
                aspect_ratio: renderer.aspect_ratio(),
            };
            setup(&mut ctx)?;
            log::info!(
                "Scene '{}' ready: {} entities, {} meshes, {} materials, {} textures",
                self.scene.name(),
                self.scene.entity_count(),
                self.assets.meshes.len(),
                self.assets.materials.len(),
                self.assets.textures.len()
            );
        }

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(renderer);
        self.last_frame = Instant::now();
        Ok(())
    }

    /// Runs the scene's systems and renders what they submitted. Returns
    /// false once the application should stop.
    fn frame(&mut self) -> Result<bool> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(true);
        };

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        let events = self.events.poll();
        if events.contains(&Event::Quit) {
            return Ok(false);
        }

        let mut ctx = FrameContext::new(dt, &events, &mut self.submissions, &self.assets);
        self.scene.update(&mut ctx);
        let keep_running = !ctx.quit_requested();

        renderer.render(&mut self.submissions, &self.assets)?;
        Ok(keep_running)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.initialise(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(|w| w.id()) != Some(id) {
            return;
        }

        if let Some(translated) = Event::from_window_event(&event) {
            self.events.push(translated);
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let resized = self
                    .renderer
                    .as_mut()
                    .map_or(Ok(()), |renderer| renderer.resize(size.width, size.height));
                if let Err(err) = resized {
                    self.fail(event_loop, err);
                }
            }
            WindowEvent::RedrawRequested => match self.frame() {
                Ok(true) => {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
                Ok(false) => event_loop.exit(),
                Err(err) => self.fail(event_loop, err),
            },
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(translated) = Event::from_device_event(&event) {
            self.events.push(translated);
        }
    }
}
