use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::{debug, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey as WinitKey};
use winit::window::{Window, WindowId};

use shadow_map_demo::input::BINDINGS;
use shadow_map_demo::{
    Controls, FrameConfig, FrameDriver, KeyCode, NamedKey, Renderer, Scene, Settings,
    SettingsStore, SoftwareBackend, SHADOW_MAP_SIZE,
};

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let settings = match &options.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let store = SettingsStore::new(settings);

    if options.summary_only {
        return run_headless(&store, &options.probes);
    }
    match run_interactive(store.clone()) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
            );
            run_headless(&store, &options.probes)
        }
        Err(err) => Err(err),
    }
}

/// Renders one frame on the CPU and prints what it computed.
fn run_headless(store: &SettingsStore, probes: &[Vec3]) -> Result<()> {
    let settings = store.snapshot();
    let config = FrameConfig::new(settings, WINDOW_WIDTH as f32 / WINDOW_HEIGHT as f32);
    let mut backend = SoftwareBackend::new(Scene::standard());
    let report = FrameDriver::new()
        .render(&config, &mut backend)
        .context("headless frame failed")?;

    let projection = if settings.perspective {
        format!("perspective, fov {:.1}", settings.field_of_view)
    } else {
        format!(
            "orthographic, {:.2} x {:.2}",
            settings.projection_width, settings.projection_height
        )
    };
    println!(
        "Light at {} looking at {} ({projection}), bias {}",
        format_point(report.light.position),
        format_point(settings.light_target),
        settings.bias
    );
    println!("Camera at {}", format_point(report.camera.position));
    let stats = backend.depth_stats();
    println!(
        "Shadow map {size}x{size}: {} of {} triangles drawn, {} texels covered",
        stats.triangles - stats.culled - stats.clipped,
        stats.triangles,
        backend.shadow_map().covered_texels(),
        size = SHADOW_MAP_SIZE
    );
    println!("Frustum corners:");
    for corner in report.light.frustum_corners() {
        println!(" - {}", format_point(corner));
    }
    for probe in probes {
        let shadow = backend
            .shadow_light_at(*probe)
            .ok_or_else(|| anyhow!("frame did not reach the color pass"))?;
        println!("probe {} shadow={shadow:.3}", format_point(*probe));
    }
    Ok(())
}

fn format_point(point: Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", point.x, point.y, point.z)
}

fn run_interactive(store: SettingsStore) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    println!("Controls:");
    for (key, action) in BINDINGS {
        println!(" - {key}: {action:?}");
    }
    println!(" - R: reset, Shift: coarse steps, Esc: quit");

    let mut app = ShadowApp::new(store);
    event_loop
        .run_app(&mut app)
        .context("event loop execution failed")?;
    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct ShadowApp {
    scene: Scene,
    store: SettingsStore,
    controls: Controls,
    driver: FrameDriver,
    renderer: Option<Renderer>,
    coarse: bool,
    last_error: Option<anyhow::Error>,
}

impl ShadowApp {
    fn new(store: SettingsStore) -> Self {
        Self {
            scene: Scene::standard(),
            store,
            controls: Controls::default(),
            driver: FrameDriver::new(),
            renderer: None,
            coarse: false,
            last_error: None,
        }
    }

    fn create_renderer(&self, event_loop: &ActiveEventLoop) -> Result<Renderer> {
        let attributes = Window::default_attributes()
            .with_title("Shadow Map Demo")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH as f64, WINDOW_HEIGHT as f64));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        block_on(Renderer::new(window, &self.scene))
    }

    fn redraw(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let config = FrameConfig::new(self.store.snapshot(), renderer.aspect());
        match self.driver.render(&config, renderer) {
            Ok(report) => debug!("frame {} drawn", report.frame),
            Err(err) => warn!("frame skipped: {err:#}"),
        }
    }

    fn request_redraw(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }
}

impl ApplicationHandler for ShadowApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        match self.create_renderer(event_loop) {
            Ok(renderer) => {
                info!("renderer ready");
                self.renderer = Some(renderer);
                self.request_redraw();
            }
            Err(err) => {
                self.last_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if id != renderer.window_id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                renderer.resize(size);
                self.request_redraw();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.coarse = modifiers.state().shift_key();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match map_key(&logical_key) {
                Some(KeyCode::Named(NamedKey::Escape)) => event_loop.exit(),
                Some(key) => {
                    if self.controls.handle_key(key, self.coarse, &self.store) {
                        self.request_redraw();
                    }
                }
                None => {}
            },
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

fn map_key(key: &Key) -> Option<KeyCode> {
    match key {
        Key::Named(WinitKey::ArrowLeft) => Some(KeyCode::Named(NamedKey::Left)),
        Key::Named(WinitKey::ArrowRight) => Some(KeyCode::Named(NamedKey::Right)),
        Key::Named(WinitKey::ArrowUp) => Some(KeyCode::Named(NamedKey::Up)),
        Key::Named(WinitKey::ArrowDown) => Some(KeyCode::Named(NamedKey::Down)),
        Key::Named(WinitKey::Escape) => Some(KeyCode::Named(NamedKey::Escape)),
        Key::Character(text) => KeyCode::from_name(text),
        _ => None,
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

const USAGE: &str = "Usage: shadow-map-demo [--settings FILE] [--summary-only] [--probe X,Y,Z]...";

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    settings: Option<PathBuf>,
    summary_only: bool,
    probes: Vec<Vec3>,
}

impl CliOptions {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                "--settings" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--settings needs a file. {USAGE}"))?;
                    options.settings = Some(PathBuf::from(path));
                }
                "--probe" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--probe needs X,Y,Z. {USAGE}"))?;
                    options.probes.push(parse_probe(&value)?);
                }
                "-h" | "--help" => return Err(anyhow!(USAGE)),
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }
}

fn parse_probe(value: &str) -> Result<Vec3> {
    let components = value
        .split(',')
        .map(|component| component.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("probe {value} is not numeric"))?;
    match components.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("probe {value} needs exactly three components")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_all_flags() {
        let options = CliOptions::parse(args(&[
            "--settings",
            "demo.xml",
            "--summary-only",
            "--probe",
            "5,0,4",
            "--probe",
            "-1, 0, 1",
        ]))
        .unwrap();
        assert_eq!(options.settings, Some(PathBuf::from("demo.xml")));
        assert!(options.summary_only);
        assert_eq!(
            options.probes,
            vec![Vec3::new(5.0, 0.0, 4.0), Vec3::new(-1.0, 0.0, 1.0)]
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(CliOptions::parse(args(&["--probe", "1,2"])).is_err());
        assert!(CliOptions::parse(args(&["--probe"])).is_err());
        assert!(CliOptions::parse(args(&["--settings"])).is_err());
        assert!(CliOptions::parse(args(&["settings.xml"])).is_err());
    }

    #[test]
    fn maps_winit_keys() {
        assert_eq!(
            map_key(&Key::Named(WinitKey::ArrowUp)),
            Some(KeyCode::Named(NamedKey::Up))
        );
        assert_eq!(
            map_key(&Key::Character("p".into())),
            Some(KeyCode::Character('P'))
        );
        assert_eq!(map_key(&Key::Named(WinitKey::Tab)), None);
    }
}
