use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use lineconfig::{MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH};
use lineframe::{
    PointerButtons, ReloadOutcome, RenderSurface, ShaderWatcher, SurfaceError, WgpuBackend,
};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::window::WindowBuilder;

use crate::run::Settings;
use crate::shapes;

#[derive(Debug, Clone)]
enum UserEvent {
    ShaderChanged(PathBuf),
}

#[derive(Debug, Default)]
struct PointerState {
    position: Vec2,
    buttons: PointerButtons,
}

impl PointerState {
    fn set_button(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.buttons.primary = pressed,
            MouseButton::Right => self.buttons.secondary = pressed,
            MouseButton::Middle => self.buttons.middle = pressed,
            _ => {}
        }
    }
}

pub fn run_window(settings: Settings) -> Result<()> {
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let size = PhysicalSize::new(
        settings.size.0.max(MIN_WINDOW_WIDTH),
        settings.size.1.max(MIN_WINDOW_HEIGHT),
    );
    let window = WindowBuilder::new()
        .with_title(settings.title.as_str())
        .with_inner_size(size)
        .with_min_inner_size(PhysicalSize::new(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let inner = window.inner_size();
    let backend = WgpuBackend::new(window.clone(), (inner.width, inner.height), &settings.gpu)
        .context("failed to initialise wgpu backend")?;
    info!(
        width = inner.width,
        height = inner.height,
        samples = backend.sample_count(),
        "window surface ready"
    );

    let mut surface = RenderSurface::new(backend, settings.surface.clone());
    let redraw_window = window.clone();
    surface.set_redraw_handle(move || redraw_window.request_redraw());
    surface.add_shape_listener(|| debug!("shape replaced"));

    let (positions, colors) = shapes::build(settings.shape);
    surface.update_shape(positions, colors);
    surface
        .initialize()
        .context("failed to initialise shader program")?;

    if settings.watch {
        match spawn_watcher(&settings, proxy) {
            Ok(watcher) => {
                debug!(directories = ?watcher.directories(), "watching shader sources");
                surface.attach_watcher(watcher);
            }
            Err(err) => warn!("shader hot reload disabled: {err:#}"),
        }
    }

    let mut pointer = PointerState::default();
    event_loop.run(move |event, elwt| match event {
        Event::UserEvent(UserEvent::ShaderChanged(path)) => {
            match surface.on_file_changed(&path) {
                ReloadOutcome::Ready(program) => info!(?program, "shader program reloaded"),
                ReloadOutcome::Skipped => debug!(path = %path.display(), "reload skipped"),
                // Failures are logged by the program manager.
                ReloadOutcome::Failed(_) | ReloadOutcome::Unusable { .. } => {}
            }
        }
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::Resized(new_size) => {
                surface.resize(new_size.width, new_size.height);
            }
            WindowEvent::CursorMoved { position, .. } => {
                pointer.position = Vec2::new(position.x as f32, position.y as f32);
                surface.on_pointer_move(pointer.position, pointer.buttons);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                pointer.set_button(button, state);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = surface.render_frame() {
                    handle_frame_error(&mut surface, &err, || elwt.exit());
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            surface.poll_clock(now);
            match surface.next_tick_deadline() {
                Some(deadline) => elwt.set_control_flow(ControlFlow::WaitUntil(deadline)),
                None => elwt.set_control_flow(ControlFlow::Wait),
            }
        }
        Event::LoopExiting => {
            info!("shutting down");
            surface.teardown();
        }
        _ => {}
    })
    .map_err(|err| anyhow!("window event loop error: {err}"))
}

fn spawn_watcher(settings: &Settings, proxy: EventLoopProxy<UserEvent>) -> Result<ShaderWatcher> {
    let watcher = ShaderWatcher::with_callback(&settings.surface.shaders, move |path| {
        if proxy
            .send_event(UserEvent::ShaderChanged(path.to_path_buf()))
            .is_err()
        {
            debug!("event loop closed; dropping shader change");
        }
    })?;
    Ok(watcher)
}

fn handle_frame_error(
    surface: &mut RenderSurface<WgpuBackend>,
    err: &SurfaceError,
    exit: impl FnOnce(),
) {
    match err.as_surface_error() {
        Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            surface.backend_mut().recover_surface();
            surface.request_redraw();
        }
        Some(wgpu::SurfaceError::OutOfMemory) => {
            error!("surface out of memory; exiting");
            exit();
        }
        Some(wgpu::SurfaceError::Timeout) => {
            warn!("surface timeout; retrying next frame");
        }
        Some(other) => {
            warn!("surface error: {other:?}; retrying next frame");
        }
        None => {
            error!(error = %err, "failed to render frame");
            exit();
        }
    }
}
