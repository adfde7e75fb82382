use crate::cartridge::Cartridge;
use crate::header::Header;
use crate::observer::FrameObserver;
use crate::snake::GameState;
use log::{debug, info, warn};

pub const OP_HALT: u8 = 0x01;
pub const OP_SYSCALL: u8 = 0x40;

pub const SYSCALL_INIT: u8 = 0x01;
pub const SYSCALL_TICK: u8 = 0x02;

/// Boot prologue `SYSCALL INIT; HALT`, then the frame body `SYSCALL TICK; HALT`
pub const SNAKE_PROGRAM: [u8; 6] = [OP_SYSCALL, SYSCALL_INIT, OP_HALT, OP_SYSCALL, SYSCALL_TICK, OP_HALT];
pub const SNAKE_ENTRY: u32 = 3;

/// Hard ceiling on the cycles any single run may use
pub const DEFAULT_MAX_CYCLE_BUDGET: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Init,
    Tick,
}

impl Syscall {
    pub fn from_id(id: u8) -> Option<Syscall> {
        match id {
            SYSCALL_INIT => Some(Syscall::Init),
            SYSCALL_TICK => Some(Syscall::Tick),
            _ => None,
        }
    }
}

/// Why the machine stopped for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    InvalidOpcode { pc: usize, opcode: u8 },
    UnknownSyscall { pc: usize, id: u8 },
    PcOutOfBounds { pc: usize },
}

/// Outcome of one bounded run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// HALT reached; the frame is done
    Halted,
    /// Cycle budget used up before HALT
    BudgetExhausted,
    /// Faulted now or earlier; nothing ran
    Faulted(Fault),
}

/// Host-writable inputs read by the syscalls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub cmd: u16,
    pub tick: u32,
    pub mode_bits: u8,
}

/// Bounded two-opcode interpreter driving the game syscalls.
///
/// Bytes before the header's entry point form a boot prologue that runs once
/// (see [`Interpreter::boot`]); every frame then starts at the entry point.
pub struct Interpreter {
    header: Header,
    program: Vec<u8>,
    entry_point: usize,
    pc: usize,
    cycle_count: u32,
    halted: bool,
    fault: Option<Fault>,
    max_budget: u32,
    pub registers: Registers,
    game: Option<GameState>,
}

impl Interpreter {
    pub fn new(header: Header, program: Vec<u8>) -> Self {
        let entry_point = header.entry_point as usize;
        Interpreter {
            header,
            program,
            entry_point,
            pc: entry_point,
            cycle_count: 0,
            halted: false,
            fault: None,
            max_budget: DEFAULT_MAX_CYCLE_BUDGET,
            registers: Registers::default(),
            game: None,
        }
    }

    pub fn from_cartridge(cart: &Cartridge) -> Self {
        Interpreter::new(cart.header.clone(), cart.bytecode.clone())
    }

    /// Clamp every later budget to `max`
    pub fn with_max_budget(mut self, max: u32) -> Self {
        self.max_budget = max;
        self
    }

    /// Run the prologue `[0, entry_point)` once. A zero entry point has no prologue.
    pub fn boot(&mut self, budget: u32, observer: &mut dyn FrameObserver) -> ExecutionResult {
        if let Some(fault) = self.fault {
            return ExecutionResult::Faulted(fault);
        }
        if self.entry_point == 0 {
            return ExecutionResult::Halted;
        }
        info!("Booting cartridge, entry point {:#06x}", self.entry_point);
        self.pc = 0;
        self.run(budget, observer)
    }

    /// Run one frame from the entry point until HALT, a fault, or `budget` cycles
    pub fn run_frame(&mut self, budget: u32, observer: &mut dyn FrameObserver) -> ExecutionResult {
        if let Some(fault) = self.fault {
            return ExecutionResult::Faulted(fault);
        }
        self.pc = self.entry_point;
        self.run(budget, observer)
    }

    fn run(&mut self, budget: u32, observer: &mut dyn FrameObserver) -> ExecutionResult {
        let budget = budget.min(self.max_budget);
        self.halted = false;
        self.cycle_count = 0;

        while self.cycle_count < budget {
            self.cycle_count += 1;

            let pc = self.pc;
            let Some(&opcode) = self.program.get(pc) else {
                return self.fail(Fault::PcOutOfBounds { pc });
            };
            self.pc += 1;

            match opcode {
                OP_HALT => {
                    self.halted = true;
                    return ExecutionResult::Halted;
                }
                OP_SYSCALL => {
                    let Some(&id) = self.program.get(self.pc) else {
                        return self.fail(Fault::PcOutOfBounds { pc: self.pc });
                    };
                    self.pc += 1;
                    match Syscall::from_id(id) {
                        Some(call) => self.dispatch(call, observer),
                        None => return self.fail(Fault::UnknownSyscall { pc, id }),
                    }
                }
                _ => return self.fail(Fault::InvalidOpcode { pc, opcode }),
            }
        }

        debug!("cycle budget of {} used up at pc {:#06x}", budget, self.pc);
        ExecutionResult::BudgetExhausted
    }

    fn fail(&mut self, fault: Fault) -> ExecutionResult {
        warn!("Interpreter halted: {:?}", fault);
        self.halted = true;
        self.fault = Some(fault);
        ExecutionResult::Faulted(fault)
    }

    fn dispatch(&mut self, call: Syscall, observer: &mut dyn FrameObserver) {
        match call {
            // A later INIT resets the live game in place and keeps its high score
            Syscall::Init => {
                match self.game.as_mut() {
                    Some(game) => game.reset(),
                    None => self.game = Some(GameState::new(&self.header)),
                }
                if let Some(game) = &self.game {
                    observer.on_frame(game);
                }
            }
            Syscall::Tick => match self.game.as_mut() {
                Some(game) => {
                    if game.tick(self.registers.cmd, self.registers.tick) {
                        observer.on_frame(game);
                    }
                }
                None => debug!("TICK before INIT ignored"),
            },
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// Program counter
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }
}
