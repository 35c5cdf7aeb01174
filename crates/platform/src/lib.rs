//! Platform layer: window, event loop and the glue between input events,
//! the scene session, the asset loader and the renderer.
//!
//! Asset loading runs on a background thread and comes back as a user
//! event, so the first frames render before the model is available.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use asset::loader::{AssetLoad, AssetPaths, spawn_load};
use corelib::config::{CANVAS_ID, SceneConfig};
use corelib::session::Session;
use renderer::GpuState;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

/// Frames are driven by `request_redraw` after each frame; the loop sleeps
/// while the OS withholds redraws (minimized, occluded).
const LOOP_CONTROL_FLOW: ControlFlow = ControlFlow::Wait;

/// Events posted to the loop from other threads.
pub enum UserEvent {
    AssetsLoaded(AssetLoad),
}

/// Frame-rate counter; yields an average once per interval.
struct FpsCounter {
    frames: u32,
    since: Instant,
    interval: Duration,
}

impl FpsCounter {
    fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            since: now,
            interval: Duration::from_secs(1),
        }
    }

    fn frame(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.duration_since(self.since);
        if elapsed < self.interval {
            return None;
        }
        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.since = now;
        Some(fps)
    }
}

/// Scroll amount in lines.
fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(p) => (p.y / 40.0) as f32,
    }
}

/// Window, renderer and session; present once the loop has resumed.
struct Running {
    window: Arc<Window>,
    gpu: GpuState,
    session: Session,
    /// Last cursor position in logical pixels.
    cursor: (f64, f64),
    last_frame: Instant,
    fps: Option<FpsCounter>,
}

struct App {
    config: SceneConfig,
    backends: wgpu::Backends,
    show_fps: bool,
    initial_size: LogicalSize<u32>,
    proxy: EventLoopProxy<UserEvent>,
    running: Option<Running>,
    /// Set if init fails inside the loop; reported after it exits.
    error: Option<anyhow::Error>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let attrs = Window::default_attributes()
            .with_title(CANVAS_ID)
            .with_inner_size(self.initial_size)
            .with_transparent(true);
        let window = Arc::new(event_loop.create_window(attrs)?);

        let scale = window.scale_factor();
        let physical = window.inner_size();
        let logical = physical.to_logical::<f64>(scale);
        log::info!(
            "Window created: {}x{} physical, scale {:.2}",
            physical.width,
            physical.height,
            scale
        );

        let session = Session::new(self.config.clone(), logical.width, logical.height, scale)?;
        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.backends,
            session.viewport().surface_size(),
            self.config.msaa_samples,
        ))?;

        let proxy = self.proxy.clone();
        spawn_load(AssetPaths::from_config(&self.config), move |load| {
            if proxy.send_event(UserEvent::AssetsLoaded(load)).is_err() {
                log::warn!("Event loop closed before assets arrived");
            }
        })?;

        let now = Instant::now();
        window.request_redraw();
        Ok(Running {
            window,
            gpu,
            session,
            cursor: (0.0, 0.0),
            last_frame: now,
            fps: self.show_fps.then(|| FpsCounter::new(now)),
        })
    }
}

impl Running {
    fn resize(&mut self, physical: PhysicalSize<u32>, scale: f64) {
        let logical = physical.to_logical::<f64>(scale);
        match self.session.resize(logical.width, logical.height, scale) {
            Ok(render_size) => {
                log::debug!(
                    "Resized: window {}x{}, scene {}x{}",
                    physical.width,
                    physical.height,
                    render_size.0,
                    render_size.1
                );
                self.gpu
                    .resize((physical.width, physical.height), render_size);
            }
            Err(e) => log::warn!("Resize ignored: {e}"),
        }
    }

    fn logical_cursor(&self, position: PhysicalPosition<f64>) -> (f64, f64) {
        let p = position.to_logical::<f64>(self.window.scale_factor());
        (p.x, p.y)
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let frame = self.session.tick(dt);
        match self.gpu.render(&frame) {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => self.gpu.recreate_surface(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("Frame skipped: {e:?}"),
        }

        if let Some(fps) = self.fps.as_mut().and_then(|c| c.frame(now)) {
            log::info!("FPS: {fps:.1}");
        }
        self.window.request_redraw();
    }

    fn assets_loaded(&mut self, load: AssetLoad) {
        self.gpu.upload_textures(&load.textures);
        match load.model {
            Ok(model) => {
                self.gpu.upload_model(&model);
                if let Err(e) = self.session.attach_model(&model.desc) {
                    log::warn!("Model not attached: {e}");
                }
            }
            Err(e) => self.session.mark_load_failed(&format!("{e:#}")),
        }
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::AssetsLoaded(load) => match self.running.as_mut() {
                Some(running) => running.assets_loaded(load),
                None => log::warn!("Assets arrived before the window; dropped"),
            },
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale = running.window.scale_factor();
                running.resize(size, scale);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = running.window.inner_size();
                running.resize(size, scale_factor);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = running.logical_cursor(position);
                running.cursor = (x, y);
                running.session.pointer_moved(x, y);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    let (x, y) = running.cursor;
                    running.session.drag_started(x, y);
                }
                ElementState::Released => running.session.drag_ended(),
            },
            WindowEvent::CursorLeft { .. } => {
                if running.session.pointer_left() {
                    log::debug!("Cursor left the window mid-drag; drag ended");
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                running.session.scrolled(scroll_lines(delta));
            }
            WindowEvent::RedrawRequested => running.redraw(event_loop),
            _ => {}
        }
    }
}

/// Open the window and run until it closes.
pub fn run_with_renderer(
    config: SceneConfig,
    backends: wgpu::Backends,
    show_fps: bool,
    width: u32,
    height: u32,
) -> Result<()> {
    let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
    event_loop.set_control_flow(LOOP_CONTROL_FLOW);

    let mut app = App {
        config,
        backends,
        show_fps,
        initial_size: LogicalSize::new(width.max(1), height.max(1)),
        proxy: event_loop.create_proxy(),
        running: None,
        error: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_reports_once_per_second() {
        let t0 = Instant::now();
        let mut c = FpsCounter::new(t0);
        for i in 1..60 {
            assert!(c.frame(t0 + Duration::from_millis(i * 16)).is_none());
        }
        let fps = c.frame(t0 + Duration::from_secs(1)).unwrap();
        assert!((fps - 60.0).abs() < 1e-6, "{fps}");
        assert!(c.frame(t0 + Duration::from_millis(1010)).is_none());
    }

    #[test]
    fn loop_sleeps_between_redraws() {
        assert_eq!(LOOP_CONTROL_FLOW, ControlFlow::Wait);
    }

    #[test]
    fn scroll_is_measured_in_lines() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let px = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 80.0));
        assert_eq!(scroll_lines(px), 2.0);
    }
}
