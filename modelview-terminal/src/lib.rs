/// Terminal host for the model viewer
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use modelview_core::{ControlInput, ModelStatus, PointerButton, Viewer, ViewerConfig, ViewerState};
use std::io::{self, stdout, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

pub mod asset;
pub mod renderer;

pub use asset::LoadMessage;
pub use renderer::{AsciiRenderer, CELL_ROWS};

const HELP: &str = "WASD/Arrows=Orbit +/-=Zoom IJKL=Pan Mouse=Drag/Scroll Q=Quit";
const KEY_ROTATE_STEP: f32 = 0.1;
const KEY_PAN_STEP: f32 = 2.0;

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    viewer: Viewer<AsciiRenderer>,
    events_tx: Sender<LoadMessage>,
    events_rx: Receiver<LoadMessage>,
    target_frame_time: Duration,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: ViewerConfig, fps: u32) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            viewer: Viewer::new(config, AsciiRenderer::new()),
            events_tx,
            events_rx,
            target_frame_time: Duration::from_millis(1000 / u64::from(fps.max(1))),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture
        )?;

        let result = self.mount().and_then(|_| self.main_loop());

        // Cleanup
        self.viewer.dispose();
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn mount(&mut self) -> io::Result<()> {
        let (columns, rows) = terminal::size()?;
        if let Some(request) = self
            .viewer
            .mount(AsciiRenderer::surface_for(columns, rows), 1.0)
        {
            asset::spawn_load(request, self.events_tx.clone());
        }
        Ok(())
    }

    fn main_loop(&mut self) -> io::Result<()> {
        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            self.drain_load_events();

            // Render
            if !self.viewer.frame().unwrap_or(false) {
                break;
            }
            self.draw()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < self.target_frame_time {
                std::thread::sleep(self.target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn drain_load_events(&mut self) {
        while let Ok((id, event)) = self.events_rx.try_recv() {
            self.viewer.handle_load_event(id, event);
        }
    }

    fn handle_event(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(columns, rows) => {
                self.viewer.resize(AsciiRenderer::surface_for(columns, rows));
                execute!(stdout(), terminal::Clear(ClearType::All))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, KeyEvent { code, kind, .. }: KeyEvent) {
        if kind == KeyEventKind::Release {
            return;
        }
        let input = match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
                return;
            }
            KeyCode::Char('w') | KeyCode::Up => ControlInput::Rotate {
                left: 0.0,
                up: KEY_ROTATE_STEP,
            },
            KeyCode::Char('s') | KeyCode::Down => ControlInput::Rotate {
                left: 0.0,
                up: -KEY_ROTATE_STEP,
            },
            KeyCode::Char('a') | KeyCode::Left => ControlInput::Rotate {
                left: KEY_ROTATE_STEP,
                up: 0.0,
            },
            KeyCode::Char('d') | KeyCode::Right => ControlInput::Rotate {
                left: -KEY_ROTATE_STEP,
                up: 0.0,
            },
            KeyCode::Char('+') | KeyCode::Char('=') => ControlInput::Wheel { delta_y: -1.0 },
            KeyCode::Char('-') => ControlInput::Wheel { delta_y: 1.0 },
            KeyCode::Char('i') => ControlInput::Pan { dx: 0.0, dy: KEY_PAN_STEP },
            KeyCode::Char('k') => ControlInput::Pan { dx: 0.0, dy: -KEY_PAN_STEP },
            KeyCode::Char('j') => ControlInput::Pan { dx: KEY_PAN_STEP, dy: 0.0 },
            KeyCode::Char('l') => ControlInput::Pan { dx: -KEY_PAN_STEP, dy: 0.0 },
            _ => return,
        };
        self.viewer.handle_input(input);
    }

    fn handle_mouse(&mut self, MouseEvent { kind, column, row, .. }: MouseEvent) {
        let x = column as f32;
        let y = (row as u32 * CELL_ROWS) as f32;
        let input = match kind {
            MouseEventKind::Down(button) => ControlInput::PointerDown {
                button: match button {
                    MouseButton::Left => PointerButton::Primary,
                    MouseButton::Right => PointerButton::Secondary,
                    MouseButton::Middle => PointerButton::Middle,
                },
                x,
                y,
            },
            MouseEventKind::Drag(_) => ControlInput::PointerMove { x, y },
            MouseEventKind::Up(_) => ControlInput::PointerUp,
            MouseEventKind::ScrollUp => ControlInput::Wheel { delta_y: -1.0 },
            MouseEventKind::ScrollDown => ControlInput::Wheel { delta_y: 1.0 },
            _ => return,
        };
        self.viewer.handle_input(input);
    }

    fn status(&self) -> String {
        let model = match (self.viewer.state(), self.viewer.load_error()) {
            (ViewerState::Rendering(ModelStatus::Present), _) => "model loaded".to_string(),
            (_, Some(err)) => format!("load failed: {err}"),
            _ if self.viewer.pending_load().is_none() => "no model".to_string(),
            _ => match self.viewer.load_progress().and_then(|p| p.percent()) {
                Some(percent) => format!("loading {percent:.0}%"),
                None => "loading".to_string(),
            },
        };
        let size = self.viewer.container();
        format!(
            "modelview | FPS: {:.1} | {}x{} | {} | {}",
            self.fps, size.width, size.height, model, HELP
        )
    }

    fn draw(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.viewer.renderer().draw(&mut stdout)?;

        // Draw UI overlay
        let (width, _) = terminal::size()?;
        let status: String = self.status().chars().take(width as usize).collect();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(status),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}
