//! Snake game state, driven by the INIT and TICK syscalls.
//!
//! Everything here is deterministic: the only randomness is the xorshift32
//! register seeded from the cartridge header, so the same header and the same
//! input sequence always produce the same game.

use std::collections::VecDeque;

use bitvec::prelude::*;
use log::{debug, warn};

use crate::command::Command;
use crate::header::Header;
use crate::transform::VIRTUAL_SIZE;
use crate::xorshift::XorShift32;

pub const BOARD_COLUMNS: u16 = 20;
pub const BOARD_ROWS: u16 = 24;

/// Random draws before apple spawn falls back to a scan
pub const SPAWN_ATTEMPTS: u32 = 64;

/// Direction codes: 0 up, 1 right, 2 down, 3 left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    pub fn from_index(i: u8) -> Direction {
        match i % 4 {
            0 => Direction::Up,
            1 => Direction::Right,
            2 => Direction::Down,
            _ => Direction::Left,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn reverse(self) -> Direction {
        Direction::from_index(self.index() + 2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: u16,
    pub y: u16,
}

impl Cell {
    pub fn new(x: u16, y: u16) -> Self {
        Cell { x, y }
    }
}

/// Where the board sits in the framebuffer. Used for drawing only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardGeometry {
    pub cell_size: u16,
    pub origin_x: u16,
    pub origin_y: u16,
    pub framebuffer_width: u16,
    pub framebuffer_height: u16,
}

impl BoardGeometry {
    /// Largest whole cell that fits, board centred
    pub fn fit(width: u16, height: u16, columns: u16, rows: u16) -> Self {
        let cell_size = (width / columns).min(height / rows).max(1);
        BoardGeometry {
            cell_size,
            origin_x: width.saturating_sub(cell_size * columns) / 2,
            origin_y: height.saturating_sub(cell_size * rows) / 2,
            framebuffer_width: width,
            framebuffer_height: height,
        }
    }

    /// Square a board cell covers on the virtual canvas, as `(x, y, side)`.
    ///
    /// The framebuffer is scaled uniformly onto the canvas and centred on its
    /// short axis.
    pub fn canvas_rect(&self, cell: Cell) -> (f32, f32, f32) {
        let (w, h) = (self.framebuffer_width as f32, self.framebuffer_height as f32);
        let scale = VIRTUAL_SIZE / w.max(h).max(1.0);
        let left = (VIRTUAL_SIZE - w * scale) / 2.0;
        let top = (VIRTUAL_SIZE - h * scale) / 2.0;
        let size = self.cell_size as f32;
        (
            left + (self.origin_x as f32 + cell.x as f32 * size) * scale,
            top + (self.origin_y as f32 + cell.y as f32 * size) * scale,
            size * scale,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    columns: u16,
    rows: u16,
    geometry: BoardGeometry,
    os_id: u32,
    /// Head first
    snake: VecDeque<Cell>,
    apple: Cell,
    direction: Direction,
    pending: Direction,
    score: u32,
    high_score: u32,
    paused: bool,
    game_over: bool,
    last_tick: u32,
    rng: XorShift32,
}

impl GameState {
    /// INIT: a fresh game for `header`
    pub fn new(header: &Header) -> Self {
        let mut state = GameState {
            columns: BOARD_COLUMNS,
            rows: BOARD_ROWS,
            geometry: BoardGeometry::fit(
                header.framebuffer_width,
                header.framebuffer_height,
                BOARD_COLUMNS,
                BOARD_ROWS,
            ),
            os_id: header.os_id(),
            snake: VecDeque::new(),
            apple: Cell::new(0, 0),
            direction: Direction::Up,
            pending: Direction::Up,
            score: 0,
            high_score: 0,
            paused: false,
            game_over: false,
            last_tick: 0,
            rng: XorShift32::from_os_id(header.os_id()),
        };
        state.reset();
        state
    }

    /// Reinitialize in place. The high score is kept.
    pub fn reset(&mut self) {
        let (cx, cy) = (self.columns / 2, self.rows / 2);
        self.snake = (0..3).map(|i| Cell::new(cx, cy + i)).collect();
        self.direction = Direction::Up;
        self.pending = Direction::Up;
        self.score = 0;
        self.paused = false;
        self.game_over = false;
        self.last_tick = 0;
        self.rng = XorShift32::from_os_id(self.os_id);
        self.spawn_apple();
        debug!("game reset, apple at {:?}", self.apple);
    }

    /// TICK. Returns false when `tick` was already applied and nothing changed.
    pub fn tick(&mut self, cmd: u16, tick: u32) -> bool {
        if tick == self.last_tick {
            return false;
        }
        self.last_tick = tick;

        match Command::from_code(cmd) {
            Some(Command::StartPause) => {
                if !self.game_over {
                    self.paused = !self.paused;
                }
            }
            Some(Command::Restart) => {
                self.reset();
                self.last_tick = tick;
                self.paused = false;
                return true;
            }
            Some(c) => {
                if let Some(want) = c.direction() {
                    if want.reverse() != self.direction {
                        self.pending = want;
                    }
                }
            }
            None => {}
        }

        if self.paused || self.game_over {
            return true;
        }

        self.advance();
        true
    }

    fn advance(&mut self) {
        self.direction = self.pending;

        let Some(next) = self.head().and_then(|h| self.neighbour(h, self.direction)) else {
            debug!("snake left the board");
            self.game_over = true;
            return;
        };

        let grows = next == self.apple;
        // The tail moves out of the way unless the snake grows this step
        let blocking = if grows {
            self.snake.len()
        } else {
            self.snake.len().saturating_sub(1)
        };
        if self.snake.iter().take(blocking).any(|&c| c == next) {
            debug!("snake ran into itself at {:?}", next);
            self.game_over = true;
            return;
        }

        self.snake.push_front(next);
        if grows {
            self.score += 1;
            if self.score > self.high_score {
                self.high_score = self.score;
            }
            self.spawn_apple();
        } else {
            self.snake.pop_back();
        }
    }

    fn neighbour(&self, cell: Cell, dir: Direction) -> Option<Cell> {
        let (x, y) = match dir {
            Direction::Up => (Some(cell.x), cell.y.checked_sub(1)),
            Direction::Down => (Some(cell.x), cell.y.checked_add(1)),
            Direction::Left => (cell.x.checked_sub(1), Some(cell.y)),
            Direction::Right => (cell.x.checked_add(1), Some(cell.y)),
        };
        match (x, y) {
            (Some(x), Some(y)) if x < self.columns && y < self.rows => Some(Cell::new(x, y)),
            _ => None,
        }
    }

    fn occupancy(&self) -> BitVec {
        let mut occupied = bitvec![0; self.columns as usize * self.rows as usize];
        for c in &self.snake {
            occupied.set(c.y as usize * self.columns as usize + c.x as usize, true);
        }
        occupied
    }

    fn spawn_apple(&mut self) {
        let occupied = self.occupancy();
        for _ in 0..SPAWN_ATTEMPTS {
            let x = (self.rng.advance() % self.columns as u32) as u16;
            let y = (self.rng.advance() % self.rows as u32) as u16;
            if !occupied[y as usize * self.columns as usize + x as usize] {
                self.apple = Cell::new(x, y);
                return;
            }
        }
        match occupied.first_zero() {
            Some(i) => {
                let cols = self.columns as usize;
                self.apple = Cell::new((i % cols) as u16, (i / cols) as u16);
            }
            None => warn!("board is full, apple stays at {:?}", self.apple),
        }
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn geometry(&self) -> BoardGeometry {
        self.geometry
    }

    pub fn snake(&self) -> &VecDeque<Cell> {
        &self.snake
    }

    pub fn head(&self) -> Option<Cell> {
        self.snake.front().copied()
    }

    pub fn apple(&self) -> Cell {
        self.apple
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pending_direction(&self) -> Direction {
        self.pending
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn last_tick(&self) -> u32 {
        self.last_tick
    }

    pub fn rng_state(&self) -> u32 {
        self.rng.state()
    }

    #[cfg(test)]
    pub(crate) fn set_board(&mut self, snake: &[Cell], apple: Cell, direction: Direction) {
        self.snake = snake.iter().copied().collect();
        self.apple = apple;
        self.direction = direction;
        self.pending = direction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: u16 = 1;
    const DOWN: u16 = 2;
    const LEFT: u16 = 3;
    const RIGHT: u16 = 4;
    const PAUSE: u16 = 5;
    const RESTART: u16 = 6;

    fn body(state: &GameState) -> Vec<(u16, u16)> {
        state.snake().iter().map(|c| (c.x, c.y)).collect()
    }

    fn game() -> GameState {
        GameState::new(&Header::default())
    }

    #[test]
    fn init_seeds_three_cells_and_an_apple() {
        let state = game();
        assert_eq!(body(&state), vec![(10, 12), (10, 13), (10, 14)]);
        assert_eq!(state.direction(), Direction::Up);
        assert_eq!(state.apple(), Cell::new(5, 7));
        assert_eq!(state.score(), 0);
        assert!(!state.paused() && !state.game_over());
    }

    #[test]
    fn first_tick_moves_up() {
        let mut state = game();
        assert!(state.tick(0, 1));
        assert_eq!(body(&state), vec![(10, 11), (10, 12), (10, 13)]);
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn same_tick_twice_is_ignored() {
        let mut state = game();
        state.tick(RIGHT, 1);
        let snapshot = state.clone();
        assert!(!state.tick(DOWN, 1));
        assert_eq!(state, snapshot);
    }

    #[test]
    fn reverse_moves_are_rejected() {
        let mut state = game();
        state.tick(RIGHT, 1);
        assert_eq!(state.direction(), Direction::Right);

        state.tick(LEFT, 2);
        assert_eq!(state.direction(), Direction::Right);

        state.tick(UP, 3);
        assert_eq!(state.direction(), Direction::Up);

        state.tick(DOWN, 4);
        assert_eq!(state.direction(), Direction::Up);
    }

    #[test]
    fn reverse_check_uses_current_not_pending() {
        let mut state = game();
        // Paused: pending updates but the snake does not turn
        state.tick(PAUSE, 1);
        state.tick(RIGHT, 2);
        assert_eq!(state.pending_direction(), Direction::Right);
        // Down is the reverse of the current direction (up), so it is still refused
        state.tick(DOWN, 3);
        assert_eq!(state.pending_direction(), Direction::Right);
    }

    #[test]
    fn pause_freezes_movement_and_toggles_back() {
        let mut state = game();
        state.tick(PAUSE, 1);
        assert!(state.paused());
        let frozen = body(&state);
        state.tick(0, 2);
        assert_eq!(body(&state), frozen);
        state.tick(PAUSE, 3);
        assert!(!state.paused());
        assert_eq!(body(&state), vec![(10, 11), (10, 12), (10, 13)]);
    }

    #[test]
    fn wall_ends_the_game_and_pause_is_locked() {
        let mut state = game();
        for t in 1..=12 {
            state.tick(0, t);
        }
        assert_eq!(state.head(), Some(Cell::new(10, 0)));
        assert!(!state.game_over());

        state.tick(0, 13);
        assert!(state.game_over());
        let after = body(&state);
        state.tick(PAUSE, 14);
        assert!(!state.paused());
        state.tick(0, 15);
        assert_eq!(body(&state), after);
    }

    #[test]
    fn restart_reinitializes_and_unpauses_without_moving() {
        let mut state = game();
        state.tick(PAUSE, 1);
        state.tick(RESTART, 2);
        assert!(!state.paused());
        assert_eq!(body(&state), vec![(10, 12), (10, 13), (10, 14)]);
        assert_eq!(state.last_tick(), 2);
        assert!(!state.tick(0, 2));
    }

    #[test]
    fn eating_grows_and_scores() {
        let mut state = game();
        state.set_board(&[Cell::new(10, 12), Cell::new(10, 13)], Cell::new(10, 11), Direction::Up);
        state.tick(0, 1);
        assert_eq!(body(&state), vec![(10, 11), (10, 12), (10, 13)]);
        assert_eq!(state.score(), 1);
        assert_eq!(state.high_score(), 1);
        assert!(!state.snake().contains(&state.apple()));
    }

    #[test]
    fn high_score_survives_restart() {
        let mut state = game();
        state.set_board(&[Cell::new(10, 12)], Cell::new(10, 11), Direction::Up);
        state.tick(0, 1);
        state.tick(RESTART, 2);
        assert_eq!(state.score(), 0);
        assert_eq!(state.high_score(), 1);
    }

    #[test]
    fn single_cell_snake_moves_freely() {
        let mut state = game();
        state.set_board(&[Cell::new(3, 3)], Cell::new(0, 0), Direction::Right);
        state.tick(0, 1);
        assert_eq!(body(&state), vec![(4, 3)]);
        state.tick(DOWN, 2);
        assert_eq!(body(&state), vec![(4, 4)]);
        assert!(!state.game_over());
    }

    #[test]
    fn two_cell_snake_can_follow_its_tail() {
        // Head (4,4), tail (4,5); a U-turn is rejected, so walk a square instead
        let mut state = game();
        state.set_board(&[Cell::new(4, 4), Cell::new(4, 5)], Cell::new(0, 0), Direction::Up);
        state.tick(RIGHT, 1);
        state.tick(DOWN, 2);
        state.tick(LEFT, 3);
        assert_eq!(body(&state), vec![(4, 5), (5, 5)]);
        assert!(!state.game_over());
    }

    #[test]
    fn moving_into_the_tail_is_allowed_unless_growing() {
        // A 4-cell loop: head (5,5) moving down onto the tail at (5,6)
        let loop_body = [
            Cell::new(5, 5),
            Cell::new(6, 5),
            Cell::new(6, 6),
            Cell::new(5, 6),
        ];
        let mut state = game();
        state.set_board(&loop_body, Cell::new(0, 0), Direction::Down);
        state.tick(0, 1);
        assert!(!state.game_over());
        assert_eq!(state.head(), Some(Cell::new(5, 6)));

        // Same move, but the apple sits on the tail: the tail stays, so it is a collision
        let mut state = game();
        state.set_board(&loop_body, Cell::new(5, 6), Direction::Down);
        state.tick(0, 1);
        assert!(state.game_over());
    }

    #[test]
    fn running_into_the_body_ends_the_game() {
        let mut state = game();
        state.set_board(
            &[
                Cell::new(5, 5),
                Cell::new(6, 5),
                Cell::new(6, 6),
                Cell::new(5, 6),
                Cell::new(4, 6),
            ],
            Cell::new(0, 0),
            Direction::Down,
        );
        state.tick(0, 1);
        assert!(state.game_over());
    }

    #[test]
    fn spawn_falls_back_to_a_scan_and_tolerates_a_full_board() {
        let mut state = game();
        let mut all: Vec<Cell> = (0..BOARD_ROWS)
            .flat_map(|y| (0..BOARD_COLUMNS).map(move |x| Cell::new(x, y)))
            .collect();

        // One free cell: random draws almost surely miss it, the scan finds it
        let free = all.remove(all.len() - 1);
        state.set_board(&all, Cell::new(0, 0), Direction::Up);
        state.spawn_apple();
        assert_eq!(state.apple(), free);

        all.push(free);
        state.set_board(&all, Cell::new(1, 1), Direction::Up);
        state.spawn_apple();
        assert_eq!(state.apple(), Cell::new(1, 1));
    }

    #[test]
    fn geometry_centres_the_board() {
        let g = BoardGeometry::fit(512, 512, BOARD_COLUMNS, BOARD_ROWS);
        assert_eq!(g.cell_size, 21);
        assert_eq!(g.origin_x, 46);
        assert_eq!(g.origin_y, 4);
        assert_eq!(g.canvas_rect(Cell::new(0, 0)), (46.0, 4.0, 21.0));
        assert_eq!(g.canvas_rect(Cell::new(5, 7)), (151.0, 151.0, 21.0));
    }

    #[test]
    fn narrow_framebuffer_is_centred_on_the_canvas() {
        // 256x512 scales by one and sits in the middle half of the canvas
        let g = BoardGeometry::fit(256, 512, BOARD_COLUMNS, BOARD_ROWS);
        assert_eq!(g.cell_size, 12);
        let (x, y, side) = g.canvas_rect(Cell::new(0, 0));
        assert_eq!(side, 12.0);
        assert_eq!(x, 128.0 + 8.0);
        assert_eq!(y, 112.0);
    }
}
