/// Terminal front end for the rig3d simulations
use crossterm::{
    cursor,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use rig3d_core::{Aabb, AnimatorEvent, Camera, CameraView, PartId, Rig, Simulation};
use std::collections::HashMap;
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod keymap;
pub mod renderer;

pub use keymap::{Action, Key, Keymap, KeymapError};
pub use renderer::AsciiRenderer;

/// How long a key counts as held after its last press or repeat, for
/// terminals that never report releases.
pub const HOLD_TIMEOUT: Duration = Duration::from_millis(550);

/// Rows reserved for the status lines.
const STATUS_ROWS: usize = 2;

const RIG_PALETTE: &[Color] = &[
    Color::Cyan,
    Color::Blue,
    Color::Green,
    Color::Magenta,
    Color::White,
    Color::DarkCyan,
    Color::DarkGreen,
];
const PAYLOAD_COLOR: Color = Color::Yellow;
const COLLIDING_COLOR: Color = Color::Red;

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    sim: Simulation,
    keymap: Keymap,
    view: CameraView,
    camera: Camera,
    scene_bounds: Aabb,
    follow: Option<PartId>,
    renderer: AsciiRenderer,
    wireframe: bool,
    colliding: bool,
    running: bool,
    frame_time: Duration,
    reports_release: bool,
    held: HashMap<String, Instant>,
    status: String,
    last_tick: Instant,
    last_fps_sample: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(sim: Simulation, keymap: Keymap, fps: u32) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(sim, keymap, fps, width as usize, height as usize))
    }

    /// Build without touching the terminal.
    pub fn with_size(sim: Simulation, keymap: Keymap, fps: u32, width: usize, height: usize) -> Self {
        for event in keymap.sim_events() {
            if sim.inputs().command(event).is_none() {
                tracing::warn!(event, rig = sim.rig().name(), "keymap event is not bound by the rig");
            }
        }

        let scene_bounds = scene_bounds(&sim);
        let view = CameraView::Frontal;
        let render_height = height.saturating_sub(STATUS_ROWS);
        let now = Instant::now();
        Self {
            camera: frame(view, &scene_bounds, width, render_height),
            sim,
            keymap,
            view,
            scene_bounds,
            follow: None,
            renderer: AsciiRenderer::new(width, render_height),
            wireframe: false,
            colliding: false,
            running: true,
            frame_time: Duration::from_secs(1) / fps.max(1),
            reports_release: false,
            held: HashMap::new(),
            status: String::new(),
            last_tick: now,
            last_fps_sample: now,
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Ride the follow camera on the named part of the rig.
    pub fn follow_part(&mut self, name: &str) -> rig3d_core::Result<()> {
        self.follow = Some(self.sim.rig().part_id(name)?);
        if self.view == CameraView::Follow {
            self.aim_follow();
        }
        Ok(())
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn view(&self) -> CameraView {
        self.view
    }

    pub fn is_wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        self.reports_release = matches!(terminal::supports_keyboard_enhancement(), Ok(true));
        if self.reports_release {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        tracing::info!(
            rig = self.sim.rig().name(),
            key_release = self.reports_release,
            "terminal session started"
        );

        let result = self.main_loop();

        // Cleanup
        if self.reports_release {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        self.last_tick = Instant::now();

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(key) => self.handle_key(key, Instant::now()),
                    Event::Resize(width, height) => self.resize(width as usize, height as usize),
                    _ => {}
                }
            }

            let now = Instant::now();
            let elapsed = now - self.last_tick;
            self.last_tick = now;
            self.update(elapsed, now);

            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_fps_sample).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_fps_sample).as_secs_f32();
                self.frame_count = 0;
                self.last_fps_sample = now;
            }
        }

        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return;
        }
        let Some(action) = Key::from_code(key.code).and_then(|k| self.keymap.action(k)).cloned()
        else {
            return;
        };

        if key.kind == KeyEventKind::Release {
            if let Action::Sim(event) = action {
                self.held.remove(&event);
                self.sim.release(&event);
            }
            return;
        }

        match action {
            Action::Quit => self.running = false,
            Action::ToggleWireframe if key.kind == KeyEventKind::Press => {
                self.wireframe = !self.wireframe;
            }
            Action::Camera(view) => self.set_view(view),
            Action::Sim(event) => self.press_event(event, key.kind, now),
            Action::ToggleWireframe => {}
        }
    }

    fn press_event(&mut self, event: String, kind: KeyEventKind, now: Instant) {
        let continuous = self
            .sim
            .inputs()
            .command(&event)
            .map_or(false, |c| c.is_continuous());

        if continuous {
            if !self.reports_release {
                self.held.insert(event.clone(), now + HOLD_TIMEOUT);
            }
            if let Err(err) = self.sim.press(&event) {
                tracing::warn!(event = %event, error = %err, "input failed");
            }
            return;
        }

        // Discrete inputs act on presses, and on repeats only when the
        // terminal cannot tell the two apart.
        if kind == KeyEventKind::Repeat && self.reports_release {
            return;
        }
        match self.sim.press(&event) {
            Ok(true) => tracing::debug!(event = %event, "input applied"),
            Ok(false) => tracing::trace!(event = %event, "input ignored"),
            Err(err) => {
                tracing::warn!(event = %event, error = %err, "input failed");
                self.status = err.to_string();
            }
        }
    }

    fn set_view(&mut self, view: CameraView) {
        self.view = view;
        self.camera = frame(
            view,
            &self.scene_bounds,
            self.renderer.width(),
            self.renderer.height(),
        );
        if view == CameraView::Follow {
            self.aim_follow();
        }
    }

    /// Move the follow camera onto its part. Without one the framed
    /// fallback stays.
    fn aim_follow(&mut self) {
        let Some(part) = self.follow else {
            return;
        };
        let rig = self.sim.rig();
        let focus = match rig.world_transform(part) {
            Ok(world) => world.transform_point(&nalgebra::Point3::origin()),
            Err(err) => {
                tracing::warn!(error = %err, "follow camera lost its part");
                return;
            }
        };
        let reach = self.scene_bounds.size().norm();
        self.camera = Camera::following(
            focus,
            reach,
            self.renderer.width() as u32,
            (self.renderer.height() * 2) as u32,
        );
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.renderer.resize(width, height.saturating_sub(STATUS_ROWS));
        self.set_view(self.view);
    }

    /// Expire held keys and advance the simulation by `elapsed`.
    pub fn update(&mut self, elapsed: Duration, now: Instant) {
        let expired: Vec<String> = self
            .held
            .iter()
            .filter(|(_, until)| **until <= now)
            .map(|(event, _)| event.clone())
            .collect();
        for event in expired {
            self.held.remove(&event);
            self.sim.release(&event);
        }

        match self.sim.tick(elapsed.as_secs_f32()) {
            Ok(report) => {
                self.colliding = report.colliding;
                for event in &report.events {
                    self.status = match event {
                        AnimatorEvent::AnimationComplete { pose } => format!("reached pose '{pose}'"),
                        AnimatorEvent::DockingStarted => "docking...".to_string(),
                        AnimatorEvent::DockingComplete => "trailer docked".to_string(),
                    };
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "simulation tick failed");
                self.status = err.to_string();
            }
        }
        if self.view == CameraView::Follow {
            self.aim_follow();
        }
    }

    /// Rasterize the rig and payload into the renderer's buffers.
    pub fn draw_scene(&mut self) {
        self.renderer.clear();
        let payload_color = if self.colliding {
            COLLIDING_COLOR
        } else {
            PAYLOAD_COLOR
        };

        draw_rig(
            &mut self.renderer,
            self.sim.rig(),
            &self.camera,
            self.wireframe,
            |index| RIG_PALETTE[index % RIG_PALETTE.len()],
        );
        if let Some(payload) = self.sim.payload() {
            draw_rig(&mut self.renderer, payload, &self.camera, self.wireframe, |_| {
                payload_color
            });
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.draw_scene();

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, STATUS_ROWS as u16))?;
        self.renderer.draw(&mut stdout)?;

        let state = self.sim.animator().state().label();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "rig3d | {} | view: {} | {} | {}FPS: {:.1} | Esc=Quit 1-{}=Camera 7=Wireframe",
                self.sim.rig().name(),
                self.view.label(),
                state,
                if self.wireframe { "wireframe | " } else { "" },
                self.fps,
                self.keymap.views().len()
            )),
            cursor::MoveTo(0, 1),
            terminal::Clear(ClearType::CurrentLine),
            Print(&self.status),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

fn draw_rig(
    renderer: &mut AsciiRenderer,
    rig: &Rig,
    camera: &Camera,
    wireframe: bool,
    color: impl Fn(usize) -> Color,
) {
    let world = rig.world_transforms();
    for (id, part) in rig.parts() {
        let model = world[id.index()].to_matrix();
        for shape in part.shapes() {
            renderer.render_box(shape, &model, camera, color(id.index()), wireframe);
        }
    }
}

/// Terminal cells are roughly twice as tall as they are wide.
fn frame(view: CameraView, bounds: &Aabb, width: usize, height: usize) -> Camera {
    Camera::framing(view, bounds, width as u32, (height * 2) as u32)
}

/// Initial extent of the rig and payload, used to place the cameras.
fn scene_bounds(sim: &Simulation) -> Aabb {
    let rig = sim.rig();
    let mut bounds = rig
        .compute_bounding_volume(rig.root())
        .unwrap_or_else(|_| Aabb::point(nalgebra::Point3::origin()));
    if let Some(payload) = sim.payload() {
        if let Ok(volume) = payload.compute_bounding_volume(payload.root()) {
            bounds = bounds.union(&volume);
        }
    }
    bounds
}
