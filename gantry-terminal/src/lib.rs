/// Terminal front end for the gantry simulator
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use gantry_core::{
    scene::{default_object, place_object},
    Axis, Camera, ConfigError, GantryScene, Mesh, SceneLayout, SimConfig, SimError, Simulator,
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Render-space width the machine travel is fitted into
const RENDER_EXTENT: f64 = 4.0;
/// Rows reserved for the header line
const HEADER_ROWS: u16 = 1;
/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: u32 = 2;

const LINEAR_STEP: f64 = 1.0;
const ROTARY_STEP: f64 = 5.0;
const FINE_FACTOR: f64 = 0.1;
const ORBIT_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 1.1;

const KEY_HELP: &str =
    "XYZAB=select +/-=jog t=tcp f=fine :=enter s=scan h=home arrows/[]/,.=view p=proj q=quit";

/// Which coordinate the jog keys and numeric entry act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogMode {
    Motor,
    Tcp,
}

/// What a key press asks the application to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quit,
    Select(Axis),
    Jog(f64),
    ToggleMode,
    ToggleFine,
    ToggleScan,
    Home,
    BeginEntry,
    EntryChar(char),
    EntryBackspace,
    CommitEntry,
    CancelEntry,
    Orbit(f32, f32),
    Zoom(f32),
    ToggleProjection,
}

/// Translate a key into a command. `editing` is true while the numeric entry
/// line is open.
pub fn map_key(code: KeyCode, editing: bool) -> Option<Command> {
    if editing {
        return match code {
            KeyCode::Enter => Some(Command::CommitEntry),
            KeyCode::Esc => Some(Command::CancelEntry),
            KeyCode::Backspace => Some(Command::EntryBackspace),
            KeyCode::Char(c) => Some(Command::EntryChar(c)),
            _ => None,
        };
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char(c @ ('x' | 'y' | 'z' | 'a' | 'b')) => {
            c.to_string().parse().ok().map(Command::Select)
        }
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => Some(Command::Jog(1.0)),
        KeyCode::Char('-') | KeyCode::Down => Some(Command::Jog(-1.0)),
        KeyCode::Char('t') => Some(Command::ToggleMode),
        KeyCode::Char('f') => Some(Command::ToggleFine),
        KeyCode::Char('s') => Some(Command::ToggleScan),
        KeyCode::Char('h') => Some(Command::Home),
        KeyCode::Char(':') | KeyCode::Enter => Some(Command::BeginEntry),
        KeyCode::Left => Some(Command::Orbit(-ORBIT_STEP, 0.0)),
        KeyCode::Right => Some(Command::Orbit(ORBIT_STEP, 0.0)),
        KeyCode::PageUp | KeyCode::Char(']') => Some(Command::Orbit(0.0, ORBIT_STEP)),
        KeyCode::PageDown | KeyCode::Char('[') => Some(Command::Orbit(0.0, -ORBIT_STEP)),
        KeyCode::Char(',') => Some(Command::Zoom(1.0 / ZOOM_STEP)),
        KeyCode::Char('.') => Some(Command::Zoom(ZOOM_STEP)),
        KeyCode::Char('p') => Some(Command::ToggleProjection),
        _ => None,
    }
}

/// Main application struct for the terminal simulator
pub struct TerminalApp {
    sim: Simulator,
    layout: SceneLayout,
    object: Mesh,
    camera: Camera,
    renderer: AsciiRenderer,
    selected: Axis,
    mode: JogMode,
    fine: bool,
    entry: Option<String>,
    status: String,
    frame_rate: u32,
    clock: Instant,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    /// Build the app for a terminal of `width` x `height` cells
    pub fn new(
        config: &SimConfig,
        object: Option<Mesh>,
        width: u16,
        height: u16,
    ) -> Result<Self, ConfigError> {
        let sim = Simulator::new(config)?;
        let layout = SceneLayout::new(config.limits, config.tool_length_offset, RENDER_EXTENT);
        let scan = sim.scan_path();
        let source = match object {
            Some(mesh) if mesh.is_empty() => {
                warn!("scan object has no facets, using the default object");
                default_object()
            }
            Some(mesh) => mesh,
            None => default_object(),
        };
        let object = place_object(&source, scan.center_x, scan.center_y, layout.floor, scan.radius);

        let view_rows = height.saturating_sub(HEADER_ROWS).max(1);
        let mut camera = Camera::new(width as u32, view_rows as u32 * CELL_ASPECT);
        camera.target = layout.center();

        Ok(Self {
            sim,
            layout,
            object,
            camera,
            renderer: AsciiRenderer::new(width as usize, view_rows as usize),
            selected: Axis::X,
            mode: JogMode::Motor,
            fine: false,
            entry: None,
            status: String::new(),
            frame_rate: config.frame_rate,
            clock: Instant::now(),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    pub fn selected(&self) -> Axis {
        self.selected
    }

    pub fn mode(&self) -> JogMode {
        self.mode
    }

    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn now_secs(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_secs_f64(1.0 / self.frame_rate as f64);

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            // Update
            let now = self.now_secs();
            self.sim.tick(now);

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        info!("terminal session ended");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => {
                if let Some(command) = map_key(code, self.entry.is_some()) {
                    let now = self.now_secs();
                    self.apply(command, now);
                }
            }
            Event::Resize(width, height) => self.resize(width, height),
            _ => {}
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        let view_rows = height.saturating_sub(HEADER_ROWS).max(1);
        self.renderer.resize(width as usize, view_rows as usize);
        self.camera.set_viewport(width as u32, view_rows as u32 * CELL_ASPECT);
        debug!(width, height, "terminal resized");
    }

    fn step(&self) -> f64 {
        let base = if self.selected.is_linear() {
            LINEAR_STEP
        } else {
            ROTARY_STEP
        };
        if self.fine {
            base * FINE_FACTOR
        } else {
            base
        }
    }

    /// Apply one command at time `now_secs`
    pub fn apply(&mut self, command: Command, now_secs: f64) {
        match command {
            Command::Quit => self.running = false,
            Command::Select(axis) => {
                self.selected = axis;
                if self.mode == JogMode::Tcp && !axis.is_linear() {
                    self.mode = JogMode::Motor;
                }
            }
            Command::Jog(direction) => {
                let delta = direction * self.step();
                match self.mode {
                    JogMode::Motor => {
                        self.sim.jog_axis(self.selected, delta);
                    }
                    JogMode::Tcp => match self.sim.jog_tcp(self.selected, delta) {
                        Ok(solution) if solution.clamped => {
                            self.status = format!(
                                "TCP {} limited to {:.2}",
                                solution.axis, solution.realized
                            );
                        }
                        Ok(_) => self.status.clear(),
                        Err(err) => self.report(err),
                    },
                }
            }
            Command::ToggleMode => {
                match self.mode {
                    JogMode::Motor if self.selected.is_linear() => self.mode = JogMode::Tcp,
                    JogMode::Motor => self.report(SimError::NotLinear(self.selected)),
                    JogMode::Tcp => self.mode = JogMode::Motor,
                }
            }
            Command::ToggleFine => self.fine = !self.fine,
            Command::ToggleScan => self.sim.toggle_scan(now_secs),
            Command::Home => self.sim.home(),
            Command::BeginEntry => self.entry = Some(String::new()),
            Command::EntryChar(c) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.push(c);
                }
            }
            Command::EntryBackspace => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.pop();
                }
            }
            Command::CommitEntry => {
                if let Some(text) = self.entry.take() {
                    self.commit_entry(&text);
                }
            }
            Command::CancelEntry => self.entry = None,
            Command::Orbit(d_yaw, d_pitch) => self.camera.orbit(d_yaw, d_pitch),
            Command::Zoom(factor) => self.camera.zoom(factor),
            Command::ToggleProjection => self.camera.toggle_projection(),
        }
    }

    fn commit_entry(&mut self, text: &str) {
        let applied = match self.mode {
            JogMode::Motor => self.sim.set_axis_text(self.selected, text).is_some(),
            JogMode::Tcp => match self.sim.set_tcp_text(self.selected, text) {
                Ok(Some(solution)) => {
                    if solution.clamped {
                        self.status = format!(
                            "TCP {} limited to {:.2}",
                            solution.axis, solution.realized
                        );
                        return;
                    }
                    true
                }
                Ok(None) => false,
                Err(err) => {
                    self.report(err);
                    return;
                }
            },
        };
        if applied {
            self.status.clear();
        } else {
            self.status = format!("ignored '{text}'");
        }
    }

    fn report(&mut self, err: SimError) {
        warn!("{err}");
        self.status = err.to_string();
    }

    fn render(&mut self) -> io::Result<()> {
        let scene = GantryScene::build(
            self.sim.state(),
            self.sim.kinematics(),
            &self.layout,
            Some(&self.object),
        );

        self.renderer.clear();
        self.renderer.render_scene(&scene, &self.camera);

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, HEADER_ROWS))?;
        self.renderer.draw(&mut stdout)?;

        // Readout panel overlay, top left under the header
        for (row, line) in self.sim.readout().lines().iter().enumerate() {
            queue!(
                stdout,
                cursor::MoveTo(0, HEADER_ROWS + row as u16),
                SetForegroundColor(Color::White),
                Print(line),
                ResetColor
            )?;
        }

        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(self.header()),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }

    fn header(&self) -> String {
        let mode = match self.mode {
            JogMode::Motor => "motor",
            JogMode::Tcp => "tcp",
        };
        let step = format!("{:.1}", self.step());
        match &self.entry {
            Some(entry) => format!("{} {} = {}_", mode, self.selected, entry),
            None => format!(
                "Gantry Sim | FPS {:.1} | axis {} ({mode}, step {step}) | {} | {KEY_HELP}",
                self.fps, self.selected, self.status
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> TerminalApp {
        TerminalApp::new(&SimConfig::default(), None, 80, 24).unwrap()
    }

    fn press(app: &mut TerminalApp, code: KeyCode) {
        if let Some(command) = map_key(code, app.entry().is_some()) {
            app.apply(command, 0.0);
        }
    }

    #[test]
    fn test_select_and_jog() {
        let mut app = app();
        press(&mut app, KeyCode::Char('z'));
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.selected(), Axis::Z);
        assert_eq!(app.simulator().state().z, 2.0);
    }

    #[test]
    fn test_numeric_entry() {
        let mut app = app();
        press(&mut app, KeyCode::Char('y'));
        press(&mut app, KeyCode::Char(':'));
        for c in "42.5".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.simulator().state().y, 42.5);
        assert!(app.entry().is_none());
    }

    #[test]
    fn test_malformed_entry_is_ignored() {
        let mut app = app();
        app.apply(Command::Select(Axis::X), 0.0);
        app.apply(Command::Jog(1.0), 0.0);
        app.apply(Command::BeginEntry, 0.0);
        app.apply(Command::EntryChar('q'), 0.0);
        app.apply(Command::CommitEntry, 0.0);
        assert_eq!(app.simulator().state().x, 1.0);
        assert!(app.status().contains("ignored"));
    }

    #[test]
    fn test_quit_inside_entry_types_q() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.is_running());
        assert_eq!(app.entry(), Some("q"));
        press(&mut app, KeyCode::Esc);
        assert!(app.entry().is_none());
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.is_running());
    }

    #[test]
    fn test_tcp_mode_requires_linear_axis() {
        let mut app = app();
        app.apply(Command::Select(Axis::A), 0.0);
        app.apply(Command::ToggleMode, 0.0);
        assert_eq!(app.mode(), JogMode::Motor);

        app.apply(Command::Select(Axis::X), 0.0);
        app.apply(Command::ToggleMode, 0.0);
        assert_eq!(app.mode(), JogMode::Tcp);
        app.apply(Command::Select(Axis::B), 0.0);
        assert_eq!(app.mode(), JogMode::Motor);
    }

    #[test]
    fn test_tcp_jog_moves_tool_tip() {
        let mut app = app();
        app.apply(Command::Select(Axis::X), 0.0);
        for _ in 0..20 {
            app.apply(Command::Jog(1.0), 0.0);
        }
        app.apply(Command::Select(Axis::A), 0.0);
        for _ in 0..4 {
            app.apply(Command::Jog(1.0), 0.0);
        }
        app.apply(Command::Select(Axis::B), 0.0);
        for _ in 0..18 {
            app.apply(Command::Jog(1.0), 0.0);
        }
        app.apply(Command::Select(Axis::X), 0.0);
        app.apply(Command::ToggleMode, 0.0);

        let before = app.simulator().pose().translation().x;
        app.apply(Command::Jog(1.0), 0.0);
        let after = app.simulator().pose().translation().x;
        assert!((after - before - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_object_falls_back_to_default() {
        let app = TerminalApp::new(&SimConfig::default(), Some(Mesh::new()), 80, 24).unwrap();
        assert!(!app.object.is_empty());
    }

    #[test]
    fn test_projection_key_and_zero_width_resize() {
        let mut app = app();
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.camera.mode, gantry_core::ProjectionMode::Orthographic);
        app.resize(0, 24);
        assert!(app.camera.aspect > 0.0);
        let scene = GantryScene::build(
            app.sim.state(),
            app.sim.kinematics(),
            &app.layout,
            Some(&app.object),
        );
        app.renderer.render_scene(&scene, &app.camera);
        assert_eq!(app.renderer.width(), 0);
    }

    #[test]
    fn test_jog_halts_scan() {
        let mut app = app();
        app.apply(Command::ToggleScan, 0.0);
        assert!(app.simulator().is_scanning());
        app.apply(Command::Jog(1.0), 0.0);
        assert!(!app.simulator().is_scanning());
    }
}
