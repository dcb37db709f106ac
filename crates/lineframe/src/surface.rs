use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use glam::{Quat, Vec2};
use tracing::{debug, info, warn};

use crate::backend::{GpuBackend, UniformValue};
use crate::clock::{AnimationClock, DEFAULT_TICK_PERIOD, DEFAULT_TIME_STEP};
use crate::error::SurfaceError;
use crate::geometry::{GeometryBuffer, ShapeListener};
use crate::program::{ReloadOutcome, ShaderPaths, ShaderProgramManager};
use crate::rotation::{PointerButtons, RotationController, DEFAULT_DEGREES_PER_PIXEL};
use crate::source::{self, SourceJoin};
use crate::uniforms::setup_matrix;
use crate::watch::ShaderWatcher;

/// Host primitive that schedules a repaint.
pub trait RedrawHandle {
    fn request_redraw(&self);
}

impl<F> RedrawHandle for F
where
    F: Fn(),
{
    fn request_redraw(&self) {
        self()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOptions {
    pub shaders: ShaderPaths,
    pub line_join: SourceJoin,
    pub clear_color: [f32; 4],
    pub degrees_per_pixel: f32,
    pub tick_period: Duration,
    pub time_step: f32,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            shaders: ShaderPaths::default(),
            line_join: SourceJoin::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            degrees_per_pixel: DEFAULT_DEGREES_PER_PIXEL,
            tick_period: DEFAULT_TICK_PERIOD,
            time_step: DEFAULT_TIME_STEP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialised,
    Ready,
    TornDown,
}

/// Interactive line renderer bound to one [`GpuBackend`].
///
/// The surface owns the shader program, the shape, the orientation and the
/// animation clock. Hosts feed it ticks, pointer moves and file-change
/// notifications, and call [`render_frame`](Self::render_frame) whenever the
/// redraw handle fires.
///
/// Single-threaded: every method must be called from the thread that owns
/// the rendering context. File watchers and other producers forward events
/// to that thread instead of touching the surface directly.
pub struct RenderSurface<B: GpuBackend> {
    backend: B,
    programs: ShaderProgramManager,
    geometry: GeometryBuffer,
    rotation: RotationController,
    clock: AnimationClock,
    clear_color: [f32; 4],
    state: SurfaceState,
    redraw_pending: bool,
    redraw: Option<Box<dyn RedrawHandle>>,
    listeners: Vec<Box<dyn ShapeListener>>,
    watcher: Option<ShaderWatcher>,
}

impl<B: GpuBackend> RenderSurface<B> {
    pub fn new(backend: B, options: SurfaceOptions) -> Self {
        Self {
            backend,
            programs: ShaderProgramManager::new(options.shaders, options.line_join),
            geometry: GeometryBuffer::default(),
            rotation: RotationController::new(options.degrees_per_pixel),
            clock: AnimationClock::new(options.tick_period, options.time_step),
            clear_color: options.clear_color,
            state: SurfaceState::Uninitialised,
            redraw_pending: false,
            redraw: None,
            listeners: Vec::new(),
            watcher: None,
        }
    }

    /// One-time setup: builds the program, resolves its bindings and starts
    /// the animation clock.
    pub fn initialize(&mut self) -> Result<(), SurfaceError> {
        match self.state {
            SurfaceState::Ready => return Ok(()),
            SurfaceState::TornDown => return Err(SurfaceError::TornDown),
            SurfaceState::Uninitialised => {}
        }

        self.backend.make_current()?;
        let result = self.programs.initialize(&mut self.backend);
        self.backend.done_current();
        result?;

        self.state = SurfaceState::Ready;
        self.clock.start(Instant::now());
        info!(
            period_ms = self.clock.period().as_millis() as u64,
            step = self.clock.step(),
            "render surface ready"
        );
        self.request_redraw();
        Ok(())
    }

    /// Renders one frame. Without a usable program the frame is only cleared
    /// and presented.
    pub fn render_frame(&mut self) -> Result<(), SurfaceError> {
        match self.state {
            SurfaceState::Ready => {}
            SurfaceState::Uninitialised => return Err(SurfaceError::NotInitialised),
            SurfaceState::TornDown => return Err(SurfaceError::TornDown),
        }
        self.redraw_pending = false;

        self.backend.begin_frame(self.clear_color)?;
        if let Some((program, bindings)) = self.programs.usable() {
            let backend = &mut self.backend;
            backend.bind_program(program);
            backend.set_uniform(
                bindings.matrix,
                UniformValue::Mat4(setup_matrix(self.rotation.orientation())),
            );
            if let Some(time) = bindings.time {
                backend.set_uniform(time, UniformValue::Float(self.clock.time()));
            }
            backend.set_attribute_array(
                bindings.position,
                GeometryBuffer::POSITION_COMPONENTS,
                self.geometry.positions(),
            );
            backend.set_attribute_array(
                bindings.color,
                GeometryBuffer::COLOR_COMPONENTS,
                self.geometry.colors(),
            );
            backend.enable_attribute_array(bindings.position);
            backend.enable_attribute_array(bindings.color);
            backend.draw_lines(0, self.geometry.vertex_count());
            backend.disable_attribute_array(bindings.position);
            backend.disable_attribute_array(bindings.color);
            backend.release_program();
        }
        self.backend.end_frame()?;
        Ok(())
    }

    /// Advances animation time by one step and asks for a redraw.
    pub fn on_tick(&mut self) {
        self.clock.tick();
        self.request_redraw();
    }

    /// Ticks the clock if its deadline has passed. Returns whether it ticked.
    pub fn poll_clock(&mut self, now: Instant) -> bool {
        if self.clock.poll(now) {
            self.request_redraw();
            true
        } else {
            false
        }
    }

    pub fn next_tick_deadline(&self) -> Option<Instant> {
        self.clock.next_deadline()
    }

    pub fn on_pointer_move(&mut self, position: Vec2, buttons: PointerButtons) {
        if self.rotation.on_pointer_move(position, buttons) {
            self.request_redraw();
        }
    }

    /// Rebuilds the program after `path` changed on disk. Both sources are
    /// re-read whichever one changed.
    pub fn on_file_changed(&mut self, path: &Path) -> ReloadOutcome {
        if self.state != SurfaceState::Ready {
            debug!(path = %path.display(), state = ?self.state, "ignoring shader change");
            return ReloadOutcome::Skipped;
        }
        info!(path = %path.display(), "shader source changed; reloading");

        if let Err(err) = self.backend.make_current() {
            warn!(error = %err, "cannot reload shaders without a rendering context");
            return ReloadOutcome::Skipped;
        }
        let outcome = self.programs.reload(&mut self.backend);
        self.backend.done_current();
        self.request_redraw();
        outcome
    }

    /// Replaces the shape and notifies every listener once.
    pub fn update_shape(&mut self, positions: Vec<f32>, colors: Vec<f32>) {
        self.geometry.replace(positions, colors);
        for listener in &mut self.listeners {
            listener.shape_changed();
        }
        self.request_redraw();
    }

    pub fn add_shape_listener(&mut self, listener: impl ShapeListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn set_redraw_handle(&mut self, handle: impl RedrawHandle + 'static) {
        self.redraw = Some(Box::new(handle));
    }

    /// Keeps `watcher` alive until teardown.
    pub fn attach_watcher(&mut self, watcher: ShaderWatcher) {
        self.watcher = Some(watcher);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.backend.resize(width, height);
        self.request_redraw();
    }

    /// Writes a generated fragment shader to the configured fragment path.
    pub fn write_generated_fragment_shader(&self, color_expression: &str) -> io::Result<()> {
        source::write_generated_fragment_shader(
            color_expression,
            &self.programs.paths().fragment,
        )
    }

    /// Releases the program and streamed buffers with the context current,
    /// then disconnects the file watcher. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.state == SurfaceState::TornDown {
            return;
        }
        if self.state == SurfaceState::Ready {
            if let Err(err) = self.backend.make_current() {
                warn!(error = %err, "tearing down without a current context");
            }
            self.programs.release(&mut self.backend);
            self.backend.release_buffers();
            self.backend.done_current();
        }
        self.clock.stop();
        self.state = SurfaceState::TornDown;
        if self.watcher.take().is_some() {
            debug!("shader watcher disconnected");
        }
    }

    /// Requests a redraw unless one is already pending.
    pub fn request_redraw(&mut self) {
        if self.redraw_pending {
            return;
        }
        self.redraw_pending = true;
        if let Some(handle) = &self.redraw {
            handle.request_redraw();
        }
    }

    pub fn is_redraw_pending(&self) -> bool {
        self.redraw_pending
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn time(&self) -> f32 {
        self.clock.time()
    }

    pub fn orientation(&self) -> Quat {
        self.rotation.orientation()
    }

    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    pub fn programs(&self) -> &ShaderProgramManager {
        &self.programs
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: GpuBackend> Drop for RenderSurface<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
