use crate::{Fault, memory::PROGRAM_START};
use heapless::Vec;

/// Maximum number of nested subroutine calls
pub const STACK_DEPTH: usize = 16;

/// Largest value the 12-bit index register can hold
const INDEX_MAX: u16 = 0x0FFF;

#[derive(Debug, Clone)]
pub struct Registers {
    var_registers: [u8; 16],
    index_register: u16,
    program_counter: u16,

    stack: Vec<u16, STACK_DEPTH>,

    delay_timer: u8,
    sound_timer: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            var_registers: [0; 16],
            index_register: 0,
            program_counter: PROGRAM_START,

            stack: Vec::new(),

            delay_timer: 0,
            sound_timer: 0,
        }
    }
}

impl Registers {
    pub fn v(&self, x: u8) -> u8 {
        self.var_registers[(x & 0xF) as usize]
    }

    pub fn set_v(&mut self, x: u8, value: u8) {
        self.var_registers[(x & 0xF) as usize] = value;
    }

    /// VF
    pub fn flag(&self) -> u8 {
        self.var_registers[0xF]
    }

    pub fn set_flag(&mut self, set: bool) {
        self.var_registers[0xF] = set as u8;
    }

    pub fn var_registers(&self) -> &[u8; 16] {
        &self.var_registers
    }

    pub fn index(&self) -> u16 {
        self.index_register
    }

    pub fn set_index(&mut self, value: u16) -> Result<(), Fault> {
        if value > INDEX_MAX {
            return Err(Fault::IndexOutOfRange(value));
        }
        self.index_register = value;
        Ok(())
    }

    pub fn pc(&self) -> u16 {
        self.program_counter
    }

    pub fn set_pc(&mut self, addr: u16) {
        self.program_counter = addr;
    }

    /// Move past one instruction
    pub fn advance_pc(&mut self) {
        self.program_counter = self.program_counter.wrapping_add(2);
    }

    pub fn push(&mut self, addr: u16) -> Result<(), Fault> {
        self.stack.push(addr).map_err(|_| Fault::StackOverflow)
    }

    pub fn pop(&mut self) -> Result<u16, Fault> {
        self.stack.pop().ok_or(Fault::StackUnderflow)
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.len()
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn delay(&self) -> u8 {
        self.delay_timer
    }

    pub fn set_delay(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn sound(&self) -> u8 {
        self.sound_timer
    }

    pub fn set_sound(&mut self, value: u8) {
        self.sound_timer = value;
    }

    /// Count both timers down by one.
    /// Returns whether the tone should be playing.
    pub fn tick_timers(&mut self) -> bool {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }
        if self.sound_timer > 0 {
            self.sound_timer -= 1;
            true
        } else {
            false
        }
    }
}
