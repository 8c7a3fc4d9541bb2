//! Application shell: window, GPU device, and the frame loop.
//!
//! Thin winit/wgpu plumbing around [`ParticleScene`]. All simulation state is
//! threaded through the exclusively-owned [`App`] context; there is no global
//! mutable state. Initialization failures are fatal to startup, per-frame
//! errors are fatal to the session, and a user-initiated quit exits cleanly
//! with a success status.

use std::process::ExitCode;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::scene::ParticleScene;
use crate::simulation::PARTICLE_COUNT;

/// What the frame loop should do after one window event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDecision {
    /// Keep running.
    Continue,
    /// User-initiated quit; exit with a success status.
    Quit,
    /// Frame error; exit with a failure status.
    Fail,
}

/// Quit decisions that depend only on the event itself: window close and
/// Escape. `None` means the event needs the running [`App`] to handle it.
fn quit_decision(event: &WindowEvent) -> Option<LoopDecision> {
    match event {
        WindowEvent::CloseRequested => {
            log::info!("close requested");
            Some(LoopDecision::Quit)
        }
        WindowEvent::KeyboardInput { event, .. }
            if event.state.is_pressed() && event.logical_key == Key::Named(NamedKey::Escape) =>
        {
            log::info!("escape pressed, quitting");
            Some(LoopDecision::Quit)
        }
        _ => None,
    }
}

pub struct App {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    scene: ParticleScene,
}

impl App {
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Handle one window event and say whether the loop keeps running, quits
    /// cleanly, or ends the session on a frame error.
    pub fn handle_event(&mut self, event: &WindowEvent) -> LoopDecision {
        if let Some(decision) = quit_decision(event) {
            return decision;
        }

        match event {
            WindowEvent::Resized(physical_size) => {
                self.config.width = physical_size.width.max(1);
                self.config.height = physical_size.height.max(1);
                self.surface.configure(&self.device, &self.config);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.scene.step_and_render(
                    &self.device,
                    &self.queue,
                    &self.surface,
                    &self.config,
                ) {
                    // A failed GPU submission is not recoverable; end the
                    // session and proceed to orderly shutdown.
                    log::error!("frame failed: {err}");
                    return LoopDecision::Fail;
                }
            }
            _ => {}
        }
        LoopDecision::Continue
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    fn shutdown(&mut self) {
        self.scene.shutdown(&self.device);
    }
}

#[derive(Default)]
struct AppState {
    app: Option<App>,
    failed: bool,
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, message: &str) {
        log::error!("{message}");
        self.failed = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title("Pointflow")
            .with_inner_size(winit::dpi::PhysicalSize::new(800, 600));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, &format!("couldn't create window: {err}")),
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let surface = match instance.create_surface(window.clone()) {
            Ok(surface) => surface,
            Err(err) => return self.fail(event_loop, &format!("couldn't create surface: {err}")),
        };

        let adapter = match pollster::block_on(instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            },
        )) {
            Ok(adapter) => adapter,
            Err(err) => return self.fail(event_loop, &format!("no suitable adapter: {err}")),
        };

        let info = adapter.get_info();
        log::info!("using {} ({:?})", info.name, info.backend);

        let (device, queue) = match pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("pointflow device"),
                ..Default::default()
            },
        )) {
            Ok(pair) => pair,
            Err(err) => return self.fail(event_loop, &format!("couldn't create device: {err}")),
        };

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let scene = match ParticleScene::new(
            &device,
            &queue,
            surface_format,
            PARTICLE_COUNT,
            config.width,
            config.height,
        ) {
            Ok(scene) => scene,
            Err(err) => return self.fail(event_loop, &format!("initialization failed: {err}")),
        };

        self.app = Some(App {
            window,
            surface,
            device,
            queue,
            config,
            scene,
        });
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = &mut self.app else { return };

        if window_id != app.window().id() {
            return;
        }

        match app.handle_event(&event) {
            LoopDecision::Continue => {}
            LoopDecision::Quit => event_loop.exit(),
            LoopDecision::Fail => {
                self.failed = true;
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(app) = &self.app {
            app.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // The scene waits for device idle before releasing anything, so
        // in-flight work completes before teardown.
        if let Some(app) = &mut self.app {
            app.shutdown();
        }
    }
}

pub fn run() -> ExitCode {
    env_logger::init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("couldn't create event loop: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut state = AppState::default();
    if let Err(err) = event_loop.run_app(&mut state) {
        log::error!("event loop error: {err}");
        return ExitCode::FAILURE;
    }

    if state.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_request_quits_cleanly() {
        assert_eq!(
            quit_decision(&WindowEvent::CloseRequested),
            Some(LoopDecision::Quit)
        );
    }

    #[test]
    fn resize_does_not_quit() {
        let event = WindowEvent::Resized(winit::dpi::PhysicalSize::new(1280, 720));
        assert_eq!(quit_decision(&event), None);
    }
}
