//! Display manager that creates the appropriate frontend
//!
//! Falls back from ratatui to headless when there is no interactive terminal.

use log::debug;

use crate::config::DisplayMode;
use crate::display_headless::HeadlessFrontend;
use crate::display_ratatui::RatatuiFrontend;
use crate::display_trait::{DisplayError, Frontend};

/// Display environment capabilities
#[derive(Debug)]
pub struct DisplayCapabilities {
    pub has_terminal: bool,
    pub is_interactive: bool,
}

impl DisplayCapabilities {
    /// Detect current environment capabilities
    pub fn detect() -> Self {
        Self {
            has_terminal: atty::is(atty::Stream::Stdout),
            is_interactive: atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout),
        }
    }

    /// Check if ratatui is likely to work
    pub fn supports_ratatui(&self) -> bool {
        self.has_terminal && self.is_interactive
    }
}

/// Create a frontend for `mode`. A headless frontend runs `headless_frames`
/// frames and quits.
pub fn create_frontend(
    mode: DisplayMode,
    headless_frames: u32,
) -> Result<Box<dyn Frontend>, DisplayError> {
    let caps = DisplayCapabilities::detect();
    debug!("Display capabilities: {:?}", caps);
    debug!("Creating frontend with mode {:?}", mode);

    let frontend: Box<dyn Frontend> = match mode {
        DisplayMode::Auto if caps.supports_ratatui() => match RatatuiFrontend::new() {
            Ok(frontend) => Box::new(frontend),
            Err(e) => {
                debug!("Ratatui failed ({}), falling back to headless", e);
                Box::new(HeadlessFrontend::idle(headless_frames))
            }
        },
        DisplayMode::Auto => {
            debug!("No interactive terminal, using headless");
            Box::new(HeadlessFrontend::idle(headless_frames))
        }
        DisplayMode::Ratatui => Box::new(RatatuiFrontend::new()?),
        DisplayMode::Headless => Box::new(HeadlessFrontend::idle(headless_frames)),
    };
    Ok(frontend)
}
