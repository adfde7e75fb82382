//! Application context for the frame loop.
//!
//! Owns the loaded cartridge, the interpreter, the tick counter and the view
//! transform. The host holds one of these and passes its observer in on every call.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::cartridge::{load_or_inert, Cartridge, LoadOutcome};
use crate::command::{Command, HostCommand};
use crate::config::Config;
use crate::display_trait::{DisplayError, Frontend, Input};
use crate::error::CartridgeError;
use crate::interpreter::{ExecutionResult, Interpreter};
use crate::observer::FrameObserver;
use crate::transform::ViewTransform;

pub enum Mode {
    Interactive {
        cartridge: Cartridge,
        interpreter: Interpreter,
    },
    /// Raster only; the interpreter is disabled
    Inert(CartridgeError),
}

pub struct AppContext {
    config: Config,
    mode: Mode,
    transform: ViewTransform,
    tick: u32,
    pending_cmd: u16,
}

impl AppContext {
    /// Load `jpeg` and boot its program, or fall back to inert display
    pub fn open(jpeg: &[u8], config: Config, observer: &mut dyn FrameObserver) -> Self {
        let mode = match load_or_inert(jpeg, config.limits.max_cartridge_bytes) {
            LoadOutcome::Runnable(cartridge) => {
                let mut interpreter = Interpreter::from_cartridge(&cartridge)
                    .with_max_budget(config.limits.max_cycle_budget);
                let booted = interpreter.boot(config.limits.cycles_per_frame, observer);
                debug!("boot finished: {:?}", booted);
                Mode::Interactive {
                    cartridge,
                    interpreter,
                }
            }
            LoadOutcome::Inert(e) => Mode::Inert(e),
        };

        AppContext {
            config,
            mode,
            transform: ViewTransform::identity(),
            tick: 0,
            pending_cmd: 0,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self.mode, Mode::Interactive { .. })
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        match &self.mode {
            Mode::Interactive { cartridge, .. } => Some(cartridge),
            Mode::Inert(_) => None,
        }
    }

    pub fn interpreter(&self) -> Option<&Interpreter> {
        match &self.mode {
            Mode::Interactive { interpreter, .. } => Some(interpreter),
            Mode::Inert(_) => None,
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Recompute the screen mapping after a resize
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.transform = ViewTransform::fit(width, height);
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    /// Queue a command code for the next frame. Host commands are handed back
    /// to the caller instead; unknown codes are dropped.
    pub fn press(&mut self, code: u16) -> Option<HostCommand> {
        let command = Command::from_code(code)?;
        if let Some(host) = command.host() {
            return Some(host);
        }
        if self.is_interactive() {
            self.pending_cmd = code;
        }
        None
    }

    /// Resolve a screen touch through the truth table. Touches outside any
    /// button do nothing.
    pub fn touch(&mut self, x: f32, y: f32) -> Option<HostCommand> {
        let code = self
            .cartridge()
            .and_then(|c| c.truth_table.as_ref())
            .and_then(|t| t.resolve(&self.transform, x, y))?;
        debug!("touch ({}, {}) -> command {}", x, y, code);
        self.press(code)
    }

    /// Advance one fixed time step. `None` when inert.
    pub fn step(&mut self, observer: &mut dyn FrameObserver) -> Option<ExecutionResult> {
        let budget = self.config.limits.cycles_per_frame;
        let Mode::Interactive { interpreter, .. } = &mut self.mode else {
            return None;
        };

        self.tick = self.tick.wrapping_add(1);
        interpreter.registers.tick = self.tick;
        interpreter.registers.cmd = std::mem::take(&mut self.pending_cmd);

        let result = interpreter.run_frame(budget, observer);
        if let ExecutionResult::Faulted(fault) = result {
            info!("frame {} faulted: {:?}", self.tick, fault);
        }
        Some(result)
    }

    /// Drive frames at a fixed step until the frontend quits. Returns the host
    /// commands the user asked for, in order.
    pub fn run(
        &mut self,
        frontend: &mut dyn Frontend,
        frame: Duration,
    ) -> Result<Vec<HostCommand>, DisplayError> {
        let (w, h) = frontend.screen_size();
        self.set_viewport(w as f32, h as f32);
        let mut host_commands = Vec::new();

        loop {
            let deadline = Instant::now() + frame;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let host = match frontend.poll_input(remaining)? {
                    None => break,
                    Some(Input::Quit) => return Ok(host_commands),
                    Some(Input::Command(code)) => self.press(code),
                    Some(Input::Touch(x, y)) => self.touch(x, y),
                    Some(Input::Resize(w, h)) => {
                        self.set_viewport(w as f32, h as f32);
                        None
                    }
                };
                if let Some(host) = host {
                    info!("Host command requested: {:?}", host);
                    host_commands.push(host);
                }
            }
            self.step(frontend.observer());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use crate::interpreter::{SNAKE_ENTRY, SNAKE_PROGRAM};
    use crate::display_headless::HeadlessFrontend;
    use crate::observer::HeadlessObserver;
    use crate::test_utils::tiny_jpeg;
    use crate::truth_table::{Button, InputGrid, TruthTable};

    fn snake_jpeg() -> Vec<u8> {
        let header = Header {
            entry_point: SNAKE_ENTRY,
            ..Header::default()
        };
        let mut cart = Cartridge::new(header, SNAKE_PROGRAM.to_vec());
        cart.truth_table = Some(TruthTable::build(
            InputGrid::default(),
            &[
                Button {
                    name: "right".into(),
                    x: 448.0,
                    y: 0.0,
                    w: 64.0,
                    h: 64.0,
                    command: 4,
                },
                Button {
                    name: "save".into(),
                    x: 0.0,
                    y: 448.0,
                    w: 64.0,
                    h: 64.0,
                    command: 7,
                },
            ],
        ));
        cart.write_into_jpeg(&tiny_jpeg()).unwrap()
    }

    #[test]
    fn plain_image_is_inert() {
        let mut obs = HeadlessObserver::new();
        let mut app = AppContext::open(&tiny_jpeg(), Config::default(), &mut obs);
        assert!(!app.is_interactive());
        assert!(matches!(app.mode(), Mode::Inert(_)));
        assert_eq!(app.step(&mut obs), None);
        assert!(obs.frames().is_empty());
    }

    #[test]
    fn open_boots_and_steps() {
        let mut obs = HeadlessObserver::new();
        let mut app = AppContext::open(&snake_jpeg(), Config::default(), &mut obs);
        assert!(app.is_interactive());
        assert_eq!(obs.frames().len(), 1);

        assert_eq!(app.step(&mut obs), Some(ExecutionResult::Halted));
        assert_eq!(app.tick(), 1);
        assert_eq!(obs.last().unwrap().snake[0].y, 11);
    }

    #[test]
    fn touches_become_commands_and_host_commands_are_intercepted() {
        let mut obs = HeadlessObserver::new();
        let mut app = AppContext::open(&snake_jpeg(), Config::default(), &mut obs);
        app.set_viewport(1024.0, 512.0);

        // Canvas (480, 32) sits at screen (256 + 480, 32)
        assert_eq!(app.touch(736.0, 32.0), None);
        app.step(&mut obs);
        let game = app.interpreter().unwrap().game().unwrap();
        assert_eq!(game.direction(), crate::snake::Direction::Right);

        assert_eq!(app.touch(260.0, 500.0), Some(HostCommand::Download));
        assert_eq!(app.touch(10.0, 10.0), None);
        assert_eq!(app.press(9), Some(HostCommand::Load));
    }

    #[test]
    fn command_register_is_cleared_after_each_frame() {
        let mut obs = HeadlessObserver::new();
        let mut app = AppContext::open(&snake_jpeg(), Config::default(), &mut obs);
        app.press(5);
        app.step(&mut obs);
        assert!(app.interpreter().unwrap().game().unwrap().paused());
        app.step(&mut obs);
        assert!(app.interpreter().unwrap().game().unwrap().paused());
    }

    #[test]
    fn run_loop_replays_a_script() {
        let mut obs = HeadlessObserver::new();
        let mut app = AppContext::open(&snake_jpeg(), Config::default(), &mut obs);

        let mut frontend = HeadlessFrontend::new();
        frontend
            .then_idle(2)
            .then(Input::Command(3))
            .then(Input::Command(8))
            .then_idle(1);
        let host = app.run(&mut frontend, Duration::ZERO).unwrap();

        assert_eq!(host, vec![HostCommand::Capture]);
        assert_eq!(app.tick(), 3);
        let last = frontend.frames().last().unwrap();
        assert_eq!(last.snake[0], crate::snake::Cell::new(9, 10));
    }
}
