//! A CHIP-8 virtual machine core.
//!
//! The [`Interpreter`] owns the memory, register file, keypad and framebuffer of
//! one machine. A [`Scheduler`] drives it at a configurable instruction rate and
//! ticks the timers at a fixed 60 Hz. Everything that needs an operating system
//! (files, clocks, terminals, entropy) is left to the host.

#![no_std]

#[cfg(test)]
extern crate std;

mod default_font;
pub mod framebuffer;
pub mod instruction;
pub mod interpreter;
pub mod keypad;
pub mod memory;
pub mod registers;
pub mod scheduler;

pub use framebuffer::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer};
pub use instruction::{Instruction, disassemble};
pub use interpreter::{Interpreter, State, Step, UnknownInstruction};
pub use keypad::{Key, Keypad};
pub use memory::{FONT_START, MEMORY_SIZE, Memory, PROGRAM_START};
pub use registers::{Registers, STACK_DEPTH};
pub use scheduler::{DEFAULT_INSTRUCTIONS_PER_SECOND, Frame, MAX_CATCH_UP, Scheduler, TIMER_HZ};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Program of {len} bytes does not fit in memory at 0x{offset:03X}")]
    LoadTooLarge { offset: u16, len: usize },

    #[error(transparent)]
    Fault(#[from] Fault),
}

/// Unrecoverable conditions that halt the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("Memory access out of bounds: 0x{0:04X}")]
    MemoryOutOfBounds(usize),

    #[error("Index register out of range: 0x{0:04X}")]
    IndexOutOfRange(u16),

    #[error("Unaligned instruction fetch at 0x{0:04X}")]
    UnalignedFetch(u16),

    #[error("Stack overflowed!")]
    StackOverflow,

    #[error("Return with an empty stack")]
    StackUnderflow,

    #[error("Invalid key: 0x{0:02X}")]
    InvalidKey(u8),
}

/// Behaviours that differ between historical CHIP-8 interpreters.
///
/// The default is the behaviour most modern programs expect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks {
    /// `8xy6` and `8xyE` copy VY into VX before shifting
    pub shift_uses_vy: bool,
    /// Sprites wrap around the screen edges instead of being clipped
    pub wrap_sprites: bool,
    /// `Fx55` and `Fx65` leave I pointing past the last register transferred
    pub load_store_increments_index: bool,
}

impl Quirks {
    /// The behaviour of the original COSMAC VIP interpreter
    pub const fn cosmac_vip() -> Self {
        Self {
            shift_uses_vy: true,
            wrap_sprites: false,
            load_store_increments_index: true,
        }
    }
}
