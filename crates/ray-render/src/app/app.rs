use super::{
    camera::Camera,
    input::Input,
    window::create_window,
};
use crate::{
    common::consts::MAX_TEXTURES,
    context::{
        DeviceContext,
        RenderContext,
        WindowContext,
    },
    draw::{
        pipeline::ShaderBytecode,
        scene::Scene,
        uniforms::StandardUniforms,
        DeferredRenderer,
    },
    utils::time::Timer,
};
use anyhow::{
    Context as _,
    Result,
};
use nalgebra_glm::{
    Mat4,
    Vec3,
};
use std::time::{
    Duration,
    Instant,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    keyboard::KeyCode,
    raw_window_handle::HasDisplayHandle as _,
    window::{
        Window,
        WindowId,
    },
};

const FPS_LOG_PERIOD: Duration = Duration::from_secs(5);
const START_POSITION: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// SPIR-V for both passes, read by the caller.
#[derive(Debug, Clone, Default)]
pub struct ShaderSources {
    pub geometry_vertex: Vec<u8>,
    pub geometry_fragment: Vec<u8>,
    pub lighting_vertex: Vec<u8>,
    pub lighting_fragment: Vec<u8>,
}

impl ShaderSources {
    fn bytecode(&self) -> ShaderBytecode<'_> {
        ShaderBytecode {
            geometry_vertex: &self.geometry_vertex,
            geometry_fragment: &self.geometry_fragment,
            lighting_vertex: &self.lighting_vertex,
            lighting_fragment: &self.lighting_fragment,
        }
    }
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub window_size: PhysicalSize<u32>,
    pub validation: bool,
    pub shaders: ShaderSources,
    /// Slot `i` takes entry `i`; `None` keeps the default texture.
    pub textures: Vec<Option<TextureImage>>,
}

/// GPU objects of a running app, dropped renderer first and device last.
struct Graphics {
    renderer: DeferredRenderer,
    _render_context: RenderContext,
    _window_context: WindowContext,
    window: Window,
    _device_context: DeviceContext,
}

impl Graphics {
    fn new(event_loop: &ActiveEventLoop, settings: &AppSettings) -> Result<Self> {
        // the instance needs the display before any window exists
        let display_handle = event_loop.display_handle()?.as_raw();
        let device_context = DeviceContext::new(display_handle, settings.validation)?;
        log::info!("using {}", device_context.device_name());

        let window = create_window(event_loop, settings.window_size)?;
        let window_context = WindowContext::new(&device_context, &window)?;
        let render_context = RenderContext::new(&device_context, &window_context)?;

        let mut renderer = DeferredRenderer::new(
            &device_context,
            &window_context,
            &render_context,
            &Scene::demo(),
        )?;
        renderer.build_pipeline(&settings.shaders.bytecode(), &render_context)?;

        if settings.textures.len() > MAX_TEXTURES {
            log::warn!(
                "{} textures given, only the first {} are used",
                settings.textures.len(),
                MAX_TEXTURES
            );
        }
        let slots = settings.textures.iter().take(MAX_TEXTURES).enumerate();
        for (slot, texture) in slots.filter_map(|(slot, texture)| Some((slot, texture.as_ref()?))) {
            renderer.create_texture(
                slot,
                texture.width,
                texture.height,
                &texture.pixels,
                &render_context,
            )?;
        }
        renderer.record_commands()?;

        Ok(Self {
            renderer,
            _render_context: render_context,
            _window_context: window_context,
            window,
            _device_context: device_context,
        })
    }
}

pub struct App {
    graphics: Option<Graphics>,
    settings: AppSettings,
    input: Input,
    camera: Camera,
    timer: Timer,
    started: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            graphics: None,
            settings,
            input: Input::default(),
            camera: Camera::new(START_POSITION),
            timer: Timer::new(),
            started: Instant::now(),
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:?}");
        self.error = Some(error);
        self.graphics = None;
        event_loop.exit();
    }

    fn draw_frame(&mut self) -> Result<()> {
        let elapsed = self.timer.tick();
        if let Some(fps) = self.timer.fps_every(FPS_LOG_PERIOD) {
            log::info!("{fps:.1} fps");
        }

        let (right, forward) = self.input.movement_axes();
        self.camera.turn(self.input.take_cursor_dx());
        self.camera.advance(right, forward, elapsed.as_secs_f32());

        let graphics = self.graphics.as_mut().context("renderer is not running")?;
        let renderer = &mut graphics.renderer;
        renderer.set_cam_pos(self.camera.position())?;

        let view_proj = self.camera.view_proj();
        let cam_pos = renderer.cam_pos();
        let seconds = self.started.elapsed().as_secs_f32();
        let oscillating = nalgebra_glm::translation(&Vec3::new((seconds * 0.5).sin(), 0.0, 0.0));
        renderer.update_uniform(
            0,
            &StandardUniforms::new(&oscillating, &view_proj, &cam_pos, 1),
        )?;
        renderer.update_uniform(
            1,
            &StandardUniforms::new(&Mat4::identity(), &view_proj, &cam_pos, 0),
        )?;

        renderer.render()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        match Graphics::new(event_loop, &self.settings) {
            Ok(mut graphics) => {
                if let Err(error) = graphics.renderer.set_cam_pos(self.camera.position()) {
                    self.fail(event_loop, error);
                    return;
                }
                self.graphics = Some(graphics);
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        window_event: WindowEvent,
    ) {
        match window_event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.input.key_event(&event);
                if self.input.is_pressed(KeyCode::Escape) {
                    event_loop.exit();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.cursor_moved(position.x);
            }
            WindowEvent::RedrawRequested => {
                if let Err(error) = self.draw_frame() {
                    self.fail(event_loop, error);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(graphics) = self.graphics.as_ref() {
            graphics.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("shutting down");
        self.graphics = None;
    }
}
