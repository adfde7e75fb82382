//! Render notification
//!
//! The interpreter calls [`FrameObserver::on_frame`] synchronously after every
//! INIT and every applied TICK. Observers only read the state.

use log::debug;

use crate::snake::{Cell, GameState};

pub trait FrameObserver {
    fn on_frame(&mut self, state: &GameState);
}

/// Discards frames
#[derive(Debug, Default)]
pub struct NullObserver;

impl FrameObserver for NullObserver {
    fn on_frame(&mut self, _state: &GameState) {}
}

/// What a renderer needs from one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub snake: Vec<Cell>,
    pub apple: Cell,
    pub score: u32,
    pub high_score: u32,
    pub paused: bool,
    pub game_over: bool,
}

impl Snapshot {
    pub fn of(state: &GameState) -> Self {
        Snapshot {
            snake: state.snake().iter().copied().collect(),
            apple: state.apple(),
            score: state.score(),
            high_score: state.high_score(),
            paused: state.paused(),
            game_over: state.game_over(),
        }
    }
}

/// Collects every frame without displaying anything. Used by tests and
/// non-interactive runs.
#[derive(Debug, Default)]
pub struct HeadlessObserver {
    frames: Vec<Snapshot>,
}

impl HeadlessObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Snapshot] {
        &self.frames
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.frames.last()
    }
}

impl FrameObserver for HeadlessObserver {
    fn on_frame(&mut self, state: &GameState) {
        let snap = Snapshot::of(state);
        debug!(
            "Headless: frame {} head={:?} apple={:?} score={}",
            self.frames.len(),
            snap.snake.first(),
            snap.apple,
            snap.score
        );
        self.frames.push(snap);
    }
}

/// Text rendering of the board, one string per row
pub fn board_lines(state: &GameState) -> Vec<String> {
    let cols = state.columns() as usize;
    let mut rows = vec![vec!['.'; cols]; state.rows() as usize];

    let apple = state.apple();
    rows[apple.y as usize][apple.x as usize] = '*';
    for (i, c) in state.snake().iter().enumerate() {
        rows[c.y as usize][c.x as usize] = if i == 0 { '@' } else { 'o' };
    }

    rows.into_iter().map(|r| r.into_iter().collect()).collect()
}

/// One-line status for the frame
pub fn status_line(state: &GameState) -> String {
    let flag = if state.game_over() {
        "  GAME OVER"
    } else if state.paused() {
        "  PAUSED"
    } else {
        ""
    };
    format!("Score: {}  High: {}{}", state.score(), state.high_score(), flag)
}
