//! Command codes shared by the truth table, the host and the game

use crate::snake::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Up,
    Down,
    Left,
    Right,
    StartPause,
    Restart,
    Download,
    Capture,
    Load,
}

/// Commands the host handles itself; they never reach the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Download,
    Capture,
    Load,
}

impl Command {
    pub fn from_code(code: u16) -> Option<Command> {
        match code {
            1 => Some(Command::Up),
            2 => Some(Command::Down),
            3 => Some(Command::Left),
            4 => Some(Command::Right),
            5 => Some(Command::StartPause),
            6 => Some(Command::Restart),
            7 => Some(Command::Download),
            8 => Some(Command::Capture),
            9 => Some(Command::Load),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Command::Up => 1,
            Command::Down => 2,
            Command::Left => 3,
            Command::Right => 4,
            Command::StartPause => 5,
            Command::Restart => 6,
            Command::Download => 7,
            Command::Capture => 8,
            Command::Load => 9,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            Command::Up => Some(Direction::Up),
            Command::Down => Some(Direction::Down),
            Command::Left => Some(Direction::Left),
            Command::Right => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn host(self) -> Option<HostCommand> {
        match self {
            Command::Download => Some(HostCommand::Download),
            Command::Capture => Some(HostCommand::Capture),
            Command::Load => Some(HostCommand::Load),
            _ => None,
        }
    }
}
