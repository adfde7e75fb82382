//! Ratatui-based frontend
//!
//! Draws the board and status line into the alternate screen and turns
//! crossterm key and mouse events into [`Input`]s.

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, warn};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Paragraph,
    Terminal,
};
use std::io::{self, Stdout};
use std::time::Duration;

use crate::display_trait::{DisplayError, Frontend, Input};
use crate::observer::{board_lines, status_line, FrameObserver};
use crate::snake::{BoardGeometry, Cell, GameState};
use crate::transform::ViewTransform;

/// Screen units for a terminal of `columns x rows`.
///
/// A terminal cell is about twice as tall as it is wide, so one row counts as
/// two units. The last row holds the status line and is off canvas.
pub fn screen_units(columns: u16, rows: u16) -> (u16, u16) {
    (columns, rows.saturating_sub(1).saturating_mul(2))
}

/// Centre of a terminal cell in screen units
pub fn touch_point(column: u16, row: u16) -> (f32, f32) {
    (column as f32 + 0.5, row as f32 * 2.0 + 1.0)
}

/// Terminal cells whose centres fall inside `cell` once drawn through `view`.
/// Never empty; a board cell smaller than a terminal cell still gets one.
pub fn cell_span(view: &ViewTransform, geometry: &BoardGeometry, cell: Cell) -> Rect {
    let (x, y, side) = geometry.canvas_rect(cell);
    let (left, top) = view.to_screen(x, y);
    let (right, bottom) = view.to_screen(x + side, y + side);

    let first_col = (left - 0.5).ceil().max(0.0);
    let end_col = (right - 0.5).ceil().max(first_col);
    let first_row = ((top - 1.0) / 2.0).ceil().max(0.0);
    let end_row = ((bottom - 1.0) / 2.0).ceil().max(first_row);

    let (centre_x, centre_y) = view.to_screen(x + side / 2.0, y + side / 2.0);
    let col = if end_col > first_col { first_col } else { centre_x.floor().max(0.0) };
    let row = if end_row > first_row { first_row } else { (centre_y / 2.0).floor().max(0.0) };
    Rect::new(
        col as u16,
        row as u16,
        ((end_col - first_col) as u16).max(1),
        ((end_row - first_row) as u16).max(1),
    )
}

fn glyph_style(c: char) -> Style {
    match c {
        '@' => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        'o' => Style::default().fg(Color::Green),
        '*' => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        _ => Style::default().fg(Color::DarkGray),
    }
}

/// Draws frames into the terminal
pub struct RatatuiObserver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Kept equal to the transform the host resolves touches with
    view: ViewTransform,
}

impl RatatuiObserver {
    fn draw(&mut self, state: &GameState) -> io::Result<()> {
        let rows = board_lines(state);
        let status = status_line(state);
        let geometry = state.geometry();
        let view = self.view;

        self.terminal.draw(|f| {
            let area = f.size();
            let canvas = Rect::new(area.x, area.y, area.width, area.height.saturating_sub(1));
            let buf = f.buffer_mut();

            // Empty cells first so the snake and apple win shared terminal cells
            for pass_empty in [true, false] {
                for (y, row) in rows.iter().enumerate() {
                    for (x, glyph) in row.chars().enumerate() {
                        if (glyph == '.') != pass_empty {
                            continue;
                        }
                        let span = cell_span(&view, &geometry, Cell::new(x as u16, y as u16));
                        let span = span.intersection(canvas);
                        let symbol = glyph.to_string();
                        for ty in span.top()..span.bottom() {
                            for tx in span.left()..span.right() {
                                buf.get_mut(tx, ty).set_symbol(&symbol).set_style(glyph_style(glyph));
                            }
                        }
                    }
                }
            }

            let status_row = Rect::new(area.x, area.bottom().saturating_sub(1), area.width, 1);
            let status = Paragraph::new(status)
                .style(Style::default().add_modifier(Modifier::REVERSED));
            f.render_widget(status, status_row);
        })?;
        Ok(())
    }

    fn resize(&mut self, columns: u16, rows: u16) -> (u16, u16) {
        let (w, h) = screen_units(columns, rows);
        self.view = ViewTransform::fit(w as f32, h as f32);
        (w, h)
    }
}

impl FrameObserver for RatatuiObserver {
    fn on_frame(&mut self, state: &GameState) {
        if let Err(e) = self.draw(state) {
            warn!("Failed to draw frame: {}", e);
        }
    }
}

pub struct RatatuiFrontend {
    observer: RatatuiObserver,
    screen: (u16, u16),
}

impl RatatuiFrontend {
    /// Enter raw mode and the alternate screen
    pub fn new() -> Result<Self, DisplayError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        let size = terminal.size()?;
        debug!("Ratatui frontend {}x{}", size.width, size.height);

        let mut observer = RatatuiObserver {
            terminal,
            view: ViewTransform::identity(),
        };
        let screen = observer.resize(size.width, size.height);
        Ok(RatatuiFrontend { observer, screen })
    }
}

impl Drop for RatatuiFrontend {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.observer.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.observer.terminal.show_cursor();
    }
}

impl Frontend for RatatuiFrontend {
    fn observer(&mut self) -> &mut dyn FrameObserver {
        &mut self.observer
    }

    fn poll_input(&mut self, timeout: Duration) -> Result<Option<Input>, DisplayError> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let input = match event::read()? {
            Event::Key(key) => map_key(key),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(_) => {
                    let (x, y) = touch_point(mouse.column, mouse.row);
                    Some(Input::Touch(x, y))
                }
                _ => None,
            },
            Event::Resize(columns, rows) => {
                self.screen = self.observer.resize(columns, rows);
                Some(Input::Resize(self.screen.0, self.screen.1))
            }
            _ => None,
        };
        Ok(input)
    }

    /// In screen units, see [`screen_units`]
    fn screen_size(&self) -> (u16, u16) {
        self.screen
    }
}

/// Arrows steer, space pauses, `r` restarts, `s`/`c`/`l` are host commands
pub fn map_key(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let code = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(Input::Quit)
        }
        KeyCode::Esc | KeyCode::Char('q') => return Some(Input::Quit),
        KeyCode::Up | KeyCode::Char('k') => 1,
        KeyCode::Down | KeyCode::Char('j') => 2,
        KeyCode::Left | KeyCode::Char('h') => 3,
        KeyCode::Right | KeyCode::Char('l') => 4,
        KeyCode::Char(' ') | KeyCode::Char('p') => 5,
        KeyCode::Char('r') => 6,
        KeyCode::Char('s') => 7,
        KeyCode::Char('c') => 8,
        KeyCode::Char('o') => 9,
        _ => return None,
    };
    Some(Input::Command(code))
}
