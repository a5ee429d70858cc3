//! recon host: window + GL context, input, the target scene and the post-processing compositor.

mod cli;
mod input;
mod scene;

use std::ffi::CString;
use std::num::NonZeroU32;
use std::time::Instant;

use anyhow::{anyhow, Context as _};
use clap::Parser;
use recon_core::{CompositorConfig, FrameClock, ReconConfig};
use recon_game::{Camera, GameSession, SessionEvent, ShotOutcome};
use recon_runtime_glow::{Compositor, EngineError, RenderBackend};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

use winit::event::{DeviceEvent, Event, KeyboardInput, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, Version};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use raw_window_handle::HasRawWindowHandle;

use crate::cli::Args;
use crate::input::{scroll_lines, Action, Controls};
use crate::scene::TargetRenderer;

fn main() {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    if let Err(e) = run(args) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(level: Option<&str>) {
    let directive = level
        .map(|l| format!("recon={l}"))
        .unwrap_or_else(|| "recon=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| Directive::from(LevelFilter::INFO)),
            ),
        )
        .init();
}

/// Config file (if any) with command-line overrides applied on top.
fn load_config(args: &Args) -> anyhow::Result<ReconConfig> {
    let mut cfg = match &args.config {
        Some(path) => ReconConfig::from_json_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReconConfig::default(),
    };
    if let Some(w) = args.width {
        cfg.window.width = w;
    }
    if let Some(h) = args.height {
        cfg.window.height = h;
    }
    cfg.validate().context("command-line overrides")?;
    Ok(cfg)
}

fn non_zero(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v).unwrap_or(NonZeroU32::MIN)
}

/// Everything the frame loop touches besides the window and GL surface.
struct App {
    gl: glow::Context,
    compositor: Compositor<glow::Context>,
    targets: TargetRenderer<glow::Context>,
    camera: Camera,
    session: GameSession,
    controls: Controls,
    clock: FrameClock,
    base_title: String,
}

impl App {
    fn frame(&mut self, now: Instant) -> Result<(), EngineError> {
        let dt = self.clock.tick(now);

        self.controls.apply(&mut self.camera, dt);
        for _ in 0..self.controls.take_shots() {
            self.shoot();
        }
        match self.session.update(dt) {
            Some(SessionEvent::GameOver { score }) => {
                tracing::info!(score, "time is up; press R to restart")
            }
            Some(SessionEvent::Spawned(_)) | None => {}
        }

        let (w, h) = self.compositor.size();
        let view = self.camera.view_matrix();
        let projection = self.camera.projection(w as f32 / h as f32);
        let time = self.clock.elapsed();

        self.compositor.begin_render(&self.gl)?;
        self.targets
            .draw(&self.gl, &view, &projection, self.session.targets(), time)?;
        let stats = self.compositor.end_render(&self.gl, time)?;
        tracing::trace!(
            passes = stats.passes,
            composite = stats.composite.name(),
            bloom_slot = ?stats.bloom_slot,
            "frame composited"
        );
        Ok(())
    }

    fn shoot(&mut self) {
        let outcome = self.session.check_shot(
            self.camera.position,
            self.camera.front(),
            self.camera.zoom(),
        );
        match outcome {
            ShotOutcome::NeedsZoom => {
                tracing::info!("target too far; hold right mouse to zoom in")
            }
            ShotOutcome::Miss => tracing::debug!("miss"),
            ShotOutcome::Hit { .. } | ShotOutcome::Ignored => {}
        }
    }

    fn action(&mut self, action: Action, control_flow: &mut ControlFlow) {
        match action {
            Action::Quit => control_flow.set_exit(),
            Action::ToggleGlitch => {
                self.compositor.use_glitch = !self.compositor.use_glitch;
                tracing::debug!(enabled = self.compositor.use_glitch, "glitch toggled");
            }
            Action::ToggleBloom => {
                self.compositor.use_bloom = !self.compositor.use_bloom;
                tracing::debug!(enabled = self.compositor.use_bloom, "bloom toggled");
            }
            Action::Restart => self.session.reset(),
        }
    }

    fn title(&self) -> String {
        let mut title = format!(
            "{} | time {:.0}s | score {}",
            self.base_title,
            self.session.time_left().ceil(),
            self.session.score()
        );
        if self.session.is_over() {
            title.push_str(" | GAME OVER (R to restart)");
        }
        title
    }

    fn destroy(&mut self) {
        let seconds = self.clock.stop(Instant::now());
        tracing::info!(frames = self.clock.frame(), seconds, "shutting down");
        self.targets.destroy(&self.gl);
        self.compositor.destroy(&self.gl);
    }
}

/// Compositor plus scene renderer. Nothing stays allocated if either fails.
fn build_renderers<B: RenderBackend>(
    gl: &B,
    width: i32,
    height: i32,
    cfg: &CompositorConfig,
) -> anyhow::Result<(Compositor<B>, TargetRenderer<B>)> {
    let mut compositor = Compositor::from_config(gl, width, height, cfg)
        .context("building the post-processing compositor")?;
    match TargetRenderer::new(gl) {
        Ok(targets) => Ok((compositor, targets)),
        Err(e) => {
            compositor.destroy(gl);
            Err(anyhow::Error::new(e).context("building the target renderer"))
        }
    }
}

fn grab_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Confined)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
    if let Err(e) = grabbed {
        tracing::warn!("cursor grab unavailable: {e}");
    }
    window.set_cursor_visible(false);
}

fn run(args: Args) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let event_loop = EventLoop::new();

    let window_builder = WindowBuilder::new()
        .with_title(cfg.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            cfg.window.width as f64,
            cfg.window.height as f64,
        ));

    let template = glutin::config::ConfigTemplateBuilder::new().with_alpha_size(8);

    let display_builder =
        glutin_winit::DisplayBuilder::new().with_window_builder(Some(window_builder));

    let (window, gl_config) = display_builder
        .build(&event_loop, template, |mut configs| {
            configs.next().expect("display offered no GL configs")
        })
        .map_err(|e| anyhow!("DisplayBuilder.build: {e}"))?;

    let window = window.ok_or_else(|| anyhow!("DisplayBuilder did not create a window"))?;
    let gl_display = gl_config.display();

    let raw_window_handle = window.raw_window_handle();

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .with_profile(GlProfile::Core)
        .build(Some(raw_window_handle));

    let not_current_gl_context = unsafe {
        gl_display
            .create_context(&gl_config, &context_attributes)
            .map_err(|e| anyhow!("create_context: {e}"))?
    };

    let size = window.inner_size();
    let attrs = glutin::surface::SurfaceAttributesBuilder::<glutin::surface::WindowSurface>::new()
        .build(
            raw_window_handle,
            non_zero(size.width),
            non_zero(size.height),
        );

    let gl_surface = unsafe {
        gl_display
            .create_window_surface(&gl_config, &attrs)
            .map_err(|e| anyhow!("create_window_surface: {e}"))?
    };

    let gl_context = not_current_gl_context
        .make_current(&gl_surface)
        .map_err(|e| anyhow!("make_current: {e}"))?;

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match CString::new(s) {
            Ok(name) => gl_display.get_proc_address(name.as_c_str()) as *const _,
            Err(_) => std::ptr::null(),
        })
    };

    let session = GameSession::new(cfg.game.clone()).context("starting the session")?;
    let (compositor, targets) = build_renderers(
        &gl,
        size.width.max(1) as i32,
        size.height.max(1) as i32,
        &cfg.compositor,
    )?;

    grab_cursor(&window);
    tracing::info!(
        width = size.width,
        height = size.height,
        "recon running: WASD/Space/Shift move, right mouse zooms, left click scans, G glitch, B bloom, R restart"
    );

    let mut app = App {
        gl,
        compositor,
        targets,
        camera: Camera::from_config(&cfg.camera),
        session,
        controls: Controls::default(),
        clock: FrameClock::start(Instant::now()),
        base_title: cfg.window.title.clone(),
    };
    let mut shown_title = String::new();

    event_loop.run(move |event, _, control_flow| {
        control_flow.set_poll();

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => control_flow.set_exit(),

                WindowEvent::Resized(physical_size) => {
                    let w = physical_size.width.max(1);
                    let h = physical_size.height.max(1);

                    gl_surface.resize(&gl_context, non_zero(w), non_zero(h));

                    if let Err(e) = app.compositor.update_size(&app.gl, w as i32, h as i32) {
                        tracing::error!("resize to {w}x{h} failed: {e}");
                        control_flow.set_exit_with_code(1);
                        return;
                    }

                    window.request_redraw();
                }

                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(key),
                            state,
                            ..
                        },
                    ..
                } => {
                    if let Some(action) = app.controls.key(key, state) {
                        app.action(action, control_flow);
                    }
                }

                WindowEvent::MouseInput { state, button, .. } => {
                    app.controls.mouse_button(button, state)
                }

                WindowEvent::MouseWheel { delta, .. } => {
                    app.camera.process_zoom(scroll_lines(delta))
                }

                WindowEvent::Focused(false) => app.controls.release_all(),

                _ => {}
            },

            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta: (dx, dy) },
                ..
            } => {
                // Device y grows downwards; pitch grows upwards.
                app.camera.process_mouse(dx as f32, -dy as f32, true);
            }

            Event::MainEventsCleared => window.request_redraw(),

            Event::RedrawRequested(_) => {
                if let Err(e) = app.frame(Instant::now()) {
                    tracing::error!("frame failed: {e}");
                    control_flow.set_exit_with_code(1);
                    return;
                }

                let title = app.title();
                if title != shown_title {
                    window.set_title(&title);
                    shown_title = title;
                }

                if let Err(e) = gl_surface.swap_buffers(&gl_context) {
                    tracing::warn!("swap_buffers failed: {e}");
                }
            }

            Event::LoopDestroyed => app.destroy(),

            _ => {}
        }
    });
}
