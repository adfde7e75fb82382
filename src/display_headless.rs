//! Headless frontend for testing and CI environments
//!
//! Input comes from a script instead of a terminal. Every `None` in the script
//! ends one frame's input; an exhausted script quits.

use std::collections::VecDeque;
use std::time::Duration;

use log::debug;

use crate::display_trait::{DisplayError, Frontend, Input};
use crate::observer::{FrameObserver, HeadlessObserver};

#[derive(Debug)]
pub struct HeadlessFrontend {
    observer: HeadlessObserver,
    script: VecDeque<Option<Input>>,
    screen: (u16, u16),
}

impl Default for HeadlessFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessFrontend {
    pub fn new() -> Self {
        HeadlessFrontend {
            observer: HeadlessObserver::new(),
            script: VecDeque::new(),
            screen: (512, 512),
        }
    }

    /// Run `frames` frames with no input, then quit
    pub fn idle(frames: u32) -> Self {
        let mut frontend = Self::new();
        frontend.then_idle(frames);
        frontend
    }

    /// Queue `input` for the current frame
    pub fn then(&mut self, input: Input) -> &mut Self {
        self.script.push_back(Some(input));
        self
    }

    pub fn then_idle(&mut self, frames: u32) -> &mut Self {
        self.script.extend((0..frames).map(|_| None));
        self
    }

    pub fn frames(&self) -> &HeadlessObserver {
        &self.observer
    }
}

impl Frontend for HeadlessFrontend {
    fn observer(&mut self) -> &mut dyn FrameObserver {
        &mut self.observer
    }

    fn poll_input(&mut self, _timeout: Duration) -> Result<Option<Input>, DisplayError> {
        let input = match self.script.pop_front() {
            Some(step) => step,
            None => Some(Input::Quit),
        };
        if let Some(Input::Resize(w, h)) = input {
            self.screen = (w, h);
        }
        debug!("Headless input: {:?}", input);
        Ok(input)
    }

    fn screen_size(&self) -> (u16, u16) {
        self.screen
    }
}
