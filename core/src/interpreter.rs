use crate::{
    Error, Fault, Quirks,
    default_font::GLYPH_SIZE,
    framebuffer::Framebuffer,
    instruction::Instruction,
    keypad::{Key, Keypad},
    memory::{FONT_START, Memory, PROGRAM_START},
    registers::Registers,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    /// Suspended by `Fx0A` until a key is held, the key then goes into this register
    WaitingForKey(u8),
    Halted(Fault),
}

/// What happened during one call to [`Interpreter::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Executed(Instruction),
    /// Still waiting for a key, nothing was executed
    Waiting,
    /// A held key ended a wait and was stored in the register
    KeyReceived { register: u8, key: Key },
}

/// The most recent word that did not decode to an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownInstruction {
    pub address: u16,
    pub word: u16,
}

#[derive(Debug, Clone)]
pub struct Interpreter {
    quirks: Quirks,
    state: State,

    memory: Memory,
    registers: Registers,
    keypad: Keypad,
    framebuffer: Framebuffer,

    tone: bool,

    unknown_count: u32,
    last_unknown: Option<UnknownInstruction>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Quirks::default())
    }
}

impl Interpreter {
    /// A machine in its reset state with the font loaded
    pub fn new(quirks: Quirks) -> Self {
        let mut memory = Memory::new();
        memory.load_font();

        Self {
            quirks,
            state: State::Running,

            memory,
            registers: Registers::default(),
            keypad: Keypad::default(),
            framebuffer: Framebuffer::default(),

            tone: false,

            unknown_count: 0,
            last_unknown: None,
        }
    }

    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Error> {
        self.memory.load(PROGRAM_START, program)?;
        log::debug!("Loaded program [size: {}]", program.len());
        Ok(())
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn key_down(&mut self, key: Key) {
        self.keypad.key_down(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.keypad.key_up(key);
    }

    /// Whether the tone should be playing, as of the last timer tick
    pub fn tone(&self) -> bool {
        self.tone
    }

    pub fn unknown_count(&self) -> u32 {
        self.unknown_count
    }

    pub fn last_unknown(&self) -> Option<UnknownInstruction> {
        self.last_unknown
    }

    /// One 60 Hz timer tick. Returns the new tone state.
    pub fn tick_timers(&mut self) -> bool {
        self.tone = self.registers.tick_timers();
        self.tone
    }

    /// Run one cycle. Any fault halts the interpreter, after which every call
    /// returns that same fault.
    pub fn step(&mut self, random: impl FnMut() -> u8) -> Result<Step, Fault> {
        let result = match self.state {
            State::Halted(fault) => return Err(fault),
            State::WaitingForKey(register) => Ok(self.poll_key(register)),
            State::Running => self.fetch_and_execute(random),
        };

        if let Err(fault) = result {
            log::debug!("Halted at 0x{:03X}: {fault}", self.registers.pc());
            self.state = State::Halted(fault);
        }
        result
    }

    fn poll_key(&mut self, register: u8) -> Step {
        match self.keypad.lowest_held() {
            Some(key) => {
                self.registers.set_v(register, key.value());
                self.state = State::Running;
                Step::KeyReceived { register, key }
            }
            None => Step::Waiting,
        }
    }

    fn fetch_and_execute(&mut self, random: impl FnMut() -> u8) -> Result<Step, Fault> {
        /* FETCH */
        let address = self.registers.pc();
        if address % 2 != 0 {
            return Err(Fault::UnalignedFetch(address));
        }
        let word = self.memory.read_word(address)?;
        self.registers.advance_pc();

        /* DECODE */
        let instruction = Instruction::decode(word);
        log::trace!("{address:03X}: {word:04X} {instruction}");

        if let Instruction::Unknown(word) = instruction {
            log::warn!("Unknown instruction {word:04X} at 0x{address:03X}");
            self.unknown_count += 1;
            self.last_unknown = Some(UnknownInstruction { address, word });
        }

        /* EXECUTE */
        self.execute(instruction, random)?;
        Ok(Step::Executed(instruction))
    }

    /// Apply one decoded instruction to the machine. The program counter is
    /// expected to already point past it.
    ///
    /// This bypasses [`State`]: it runs even when halted or waiting for a key,
    /// and a returned fault does not halt the interpreter. Use
    /// [`Interpreter::step`] to run a program.
    pub fn execute(
        &mut self,
        instruction: Instruction,
        mut random: impl FnMut() -> u8,
    ) -> Result<(), Fault> {
        let regs = &mut self.registers;

        match instruction {
            // 0nnn
            Instruction::Sys(addr) => log::debug!("Ignoring machine code call to 0x{addr:03X}"),

            // 00E0
            Instruction::Clear => self.framebuffer.clear(),

            // 00EE
            Instruction::Return => {
                let addr = regs.pop()?;
                regs.set_pc(addr);
            }

            // 1nnn
            Instruction::Jump(addr) => regs.set_pc(addr),

            // 2nnn
            Instruction::Call(addr) => {
                regs.push(regs.pc())?;
                regs.set_pc(addr);
            }

            // 3xnn
            Instruction::SkipEqImm { x, byte } => {
                if regs.v(x) == byte {
                    regs.advance_pc();
                }
            }

            // 4xnn
            Instruction::SkipNeImm { x, byte } => {
                if regs.v(x) != byte {
                    regs.advance_pc();
                }
            }

            // 5xy0
            Instruction::SkipEqReg { x, y } => {
                if regs.v(x) == regs.v(y) {
                    regs.advance_pc();
                }
            }

            // 9xy0
            Instruction::SkipNeReg { x, y } => {
                if regs.v(x) != regs.v(y) {
                    regs.advance_pc();
                }
            }

            // 6xnn
            Instruction::LoadImm { x, byte } => regs.set_v(x, byte),

            // 7xnn
            Instruction::AddImm { x, byte } => regs.set_v(x, regs.v(x).wrapping_add(byte)),

            // 8xy0
            Instruction::Copy { x, y } => regs.set_v(x, regs.v(y)),

            // 8xy1
            Instruction::Or { x, y } => regs.set_v(x, regs.v(x) | regs.v(y)),

            // 8xy2
            Instruction::And { x, y } => regs.set_v(x, regs.v(x) & regs.v(y)),

            // 8xy3
            Instruction::Xor { x, y } => regs.set_v(x, regs.v(x) ^ regs.v(y)),

            // 8xy4
            Instruction::AddReg { x, y } => {
                let (sum, overflow) = regs.v(x).overflowing_add(regs.v(y));
                regs.set_v(x, sum);
                regs.set_flag(overflow);
            }

            // 8xy5
            Instruction::Sub { x, y } => {
                let no_borrow = regs.v(x) >= regs.v(y);
                regs.set_v(x, regs.v(x).wrapping_sub(regs.v(y)));
                regs.set_flag(no_borrow);
            }

            // 8xy7
            Instruction::SubReversed { x, y } => {
                let no_borrow = regs.v(y) >= regs.v(x);
                regs.set_v(x, regs.v(y).wrapping_sub(regs.v(x)));
                regs.set_flag(no_borrow);
            }

            // 8xy6
            Instruction::ShiftRight { x, y } => {
                let operand = regs.v(if self.quirks.shift_uses_vy { y } else { x });
                regs.set_v(x, operand >> 1);
                regs.set_flag(operand & 0b0000_0001 != 0);
            }

            // 8xyE
            Instruction::ShiftLeft { x, y } => {
                let operand = regs.v(if self.quirks.shift_uses_vy { y } else { x });
                regs.set_v(x, operand << 1);
                regs.set_flag(operand & 0b1000_0000 != 0);
            }

            // Annn
            Instruction::SetIndex(addr) => regs.set_index(addr)?,

            // Bnnn
            Instruction::JumpOffset(addr) => regs.set_pc(addr + regs.v(0) as u16),

            // Cxnn
            Instruction::Random { x, byte } => regs.set_v(x, random() & byte),

            // Dxyn
            Instruction::Draw { x, y, n } => {
                let sprite = self.memory.read_slice(regs.index(), n as usize)?;
                let collision = self.framebuffer.draw_sprite(
                    regs.v(x),
                    regs.v(y),
                    sprite,
                    self.quirks.wrap_sprites,
                );
                regs.set_flag(collision);
            }

            // Ex9E
            Instruction::SkipKeyPressed { x } => {
                if self.keypad.is_held(Self::key_in(regs, x)?) {
                    regs.advance_pc();
                }
            }

            // ExA1
            Instruction::SkipKeyNotPressed { x } => {
                if !self.keypad.is_held(Self::key_in(regs, x)?) {
                    regs.advance_pc();
                }
            }

            // Fx07
            Instruction::LoadDelay { x } => regs.set_v(x, regs.delay()),

            // Fx0A
            Instruction::WaitKey { x } => self.state = State::WaitingForKey(x),

            // Fx15
            Instruction::SetDelay { x } => regs.set_delay(regs.v(x)),

            // Fx18
            Instruction::SetSound { x } => regs.set_sound(regs.v(x)),

            // Fx1E
            Instruction::AddIndex { x } => regs.set_index(regs.index() + regs.v(x) as u16)?,

            // Fx29
            Instruction::LoadGlyph { x } => {
                regs.set_index(FONT_START + (regs.v(x) & 0xF) as u16 * GLYPH_SIZE)?;
            }

            // Fx33
            Instruction::StoreBcd { x } => {
                let value = regs.v(x);
                self.memory
                    .write_slice(regs.index(), &[value / 100, (value / 10) % 10, value % 10])?;
            }

            // Fx55
            Instruction::StoreRegisters { x } => {
                let count = x as usize + 1;
                self.memory
                    .write_slice(regs.index(), &regs.var_registers()[..count])?;
                if self.quirks.load_store_increments_index {
                    Self::skip_index_past(regs, count)?;
                }
            }

            // Fx65
            Instruction::LoadRegisters { x } => {
                let count = x as usize + 1;
                let values = self.memory.read_slice(regs.index(), count)?;
                for (i, &value) in values.iter().enumerate() {
                    regs.set_v(i as u8, value);
                }
                if self.quirks.load_store_increments_index {
                    Self::skip_index_past(regs, count)?;
                }
            }

            Instruction::Unknown(_) => (),
        }

        Ok(())
    }

    // Stays within 12 bits, so a transfer ending at 0xFFF leaves I at 0x000
    fn skip_index_past(regs: &mut Registers, count: usize) -> Result<(), Fault> {
        regs.set_index((regs.index() + count as u16) & 0xFFF)
    }

    fn key_in(regs: &Registers, x: u8) -> Result<Key, Fault> {
        let value = regs.v(x);
        Key::new(value).ok_or(Fault::InvalidKey(value))
    }
}
