//! Core trait for frontends
//!
//! A frontend owns a [`FrameObserver`] for output and is the source of user
//! input for the frame loop.

use std::fmt;
use std::time::Duration;

use crate::observer::FrameObserver;

/// One input event, already mapped out of the terminal's vocabulary
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// A command code (see [`crate::command::Command`])
    Command(u16),
    /// A pointer press in screen coordinates
    Touch(f32, f32),
    /// The screen changed size
    Resize(u16, u16),
    Quit,
}

pub trait Frontend {
    /// Output side, handed to the interpreter on every frame
    fn observer(&mut self) -> &mut dyn FrameObserver;

    /// Wait up to `timeout` for the next input event
    fn poll_input(&mut self, timeout: Duration) -> Result<Option<Input>, DisplayError>;

    /// Current screen size in the units touches are reported in
    fn screen_size(&self) -> (u16, u16);
}

/// Display error type
#[derive(Debug, Clone)]
pub struct DisplayError {
    pub message: String,
}

impl DisplayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Display error: {}", self.message)
    }
}

impl std::error::Error for DisplayError {}

impl From<std::io::Error> for DisplayError {
    fn from(error: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", error))
    }
}
