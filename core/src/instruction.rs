//! Instruction decoding and disassembly.

use core::fmt;

/// The 35 CHIP-8 instructions. Register operands are guaranteed to be
/// between 0x0 and 0xF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 0nnn: call a machine code routine
    Sys(u16),
    /// 00E0
    Clear,
    /// 00EE
    Return,
    /// 1nnn
    Jump(u16),
    /// 2nnn
    Call(u16),
    /// 3xnn
    SkipEqImm { x: u8, byte: u8 },
    /// 4xnn
    SkipNeImm { x: u8, byte: u8 },
    /// 5xy0
    SkipEqReg { x: u8, y: u8 },
    /// 6xnn
    LoadImm { x: u8, byte: u8 },
    /// 7xnn
    AddImm { x: u8, byte: u8 },
    /// 8xy0
    Copy { x: u8, y: u8 },
    /// 8xy1
    Or { x: u8, y: u8 },
    /// 8xy2
    And { x: u8, y: u8 },
    /// 8xy3
    Xor { x: u8, y: u8 },
    /// 8xy4
    AddReg { x: u8, y: u8 },
    /// 8xy5
    Sub { x: u8, y: u8 },
    /// 8xy6
    ShiftRight { x: u8, y: u8 },
    /// 8xy7
    SubReversed { x: u8, y: u8 },
    /// 8xyE
    ShiftLeft { x: u8, y: u8 },
    /// 9xy0
    SkipNeReg { x: u8, y: u8 },
    /// Annn
    SetIndex(u16),
    /// Bnnn
    JumpOffset(u16),
    /// Cxnn
    Random { x: u8, byte: u8 },
    /// Dxyn
    Draw { x: u8, y: u8, n: u8 },
    /// Ex9E
    SkipKeyPressed { x: u8 },
    /// ExA1
    SkipKeyNotPressed { x: u8 },
    /// Fx07
    LoadDelay { x: u8 },
    /// Fx0A
    WaitKey { x: u8 },
    /// Fx15
    SetDelay { x: u8 },
    /// Fx18
    SetSound { x: u8 },
    /// Fx1E
    AddIndex { x: u8 },
    /// Fx29
    LoadGlyph { x: u8 },
    /// Fx33
    StoreBcd { x: u8 },
    /// Fx55
    StoreRegisters { x: u8 },
    /// Fx65
    LoadRegisters { x: u8 },

    /// Any word that is none of the above
    Unknown(u16),
}

impl Instruction {
    pub fn decode(word: u16) -> Self {
        let x = ((word & 0x0F00) >> 8) as u8;
        let y = ((word & 0x00F0) >> 4) as u8;
        let n = (word & 0x000F) as u8;
        let byte = (word & 0x00FF) as u8;
        let addr = word & 0x0FFF;

        match ((word & 0xF000) >> 12, n) {
            (0x0, _) => match word {
                0x00E0 => Self::Clear,
                0x00EE => Self::Return,
                _ => Self::Sys(addr),
            },
            (0x1, _) => Self::Jump(addr),
            (0x2, _) => Self::Call(addr),
            (0x3, _) => Self::SkipEqImm { x, byte },
            (0x4, _) => Self::SkipNeImm { x, byte },
            (0x5, 0x0) => Self::SkipEqReg { x, y },
            (0x6, _) => Self::LoadImm { x, byte },
            (0x7, _) => Self::AddImm { x, byte },
            (0x8, 0x0) => Self::Copy { x, y },
            (0x8, 0x1) => Self::Or { x, y },
            (0x8, 0x2) => Self::And { x, y },
            (0x8, 0x3) => Self::Xor { x, y },
            (0x8, 0x4) => Self::AddReg { x, y },
            (0x8, 0x5) => Self::Sub { x, y },
            (0x8, 0x6) => Self::ShiftRight { x, y },
            (0x8, 0x7) => Self::SubReversed { x, y },
            (0x8, 0xE) => Self::ShiftLeft { x, y },
            (0x9, 0x0) => Self::SkipNeReg { x, y },
            (0xA, _) => Self::SetIndex(addr),
            (0xB, _) => Self::JumpOffset(addr),
            (0xC, _) => Self::Random { x, byte },
            (0xD, _) => Self::Draw { x, y, n },
            (0xE, _) => match byte {
                0x9E => Self::SkipKeyPressed { x },
                0xA1 => Self::SkipKeyNotPressed { x },
                _ => Self::Unknown(word),
            },
            (0xF, _) => match byte {
                0x07 => Self::LoadDelay { x },
                0x0A => Self::WaitKey { x },
                0x15 => Self::SetDelay { x },
                0x18 => Self::SetSound { x },
                0x1E => Self::AddIndex { x },
                0x29 => Self::LoadGlyph { x },
                0x33 => Self::StoreBcd { x },
                0x55 => Self::StoreRegisters { x },
                0x65 => Self::LoadRegisters { x },
                _ => Self::Unknown(word),
            },
            _ => Self::Unknown(word),
        }
    }

    /// Whether executing this instruction can change the framebuffer
    pub fn is_display_op(&self) -> bool {
        matches!(self, Self::Clear | Self::Draw { .. })
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        Self::decode(word)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Sys(addr) => write!(f, "SYS {addr:03X}"),
            Self::Clear => write!(f, "CLS"),
            Self::Return => write!(f, "RET"),
            Self::Jump(addr) => write!(f, "JP {addr:03X}"),
            Self::Call(addr) => write!(f, "CALL {addr:03X}"),
            Self::SkipEqImm { x, byte } => write!(f, "SE V{x:X}, {byte:02X}"),
            Self::SkipNeImm { x, byte } => write!(f, "SNE V{x:X}, {byte:02X}"),
            Self::SkipEqReg { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            Self::LoadImm { x, byte } => write!(f, "LD V{x:X}, {byte:02X}"),
            Self::AddImm { x, byte } => write!(f, "ADD V{x:X}, {byte:02X}"),
            Self::Copy { x, y } => write!(f, "LD V{x:X}, V{y:X}"),
            Self::Or { x, y } => write!(f, "OR V{x:X}, V{y:X}"),
            Self::And { x, y } => write!(f, "AND V{x:X}, V{y:X}"),
            Self::Xor { x, y } => write!(f, "XOR V{x:X}, V{y:X}"),
            Self::AddReg { x, y } => write!(f, "ADD V{x:X}, V{y:X}"),
            Self::Sub { x, y } => write!(f, "SUB V{x:X}, V{y:X}"),
            Self::ShiftRight { x, y } => write!(f, "SHR V{x:X}, V{y:X}"),
            Self::SubReversed { x, y } => write!(f, "SUBN V{x:X}, V{y:X}"),
            Self::ShiftLeft { x, y } => write!(f, "SHL V{x:X}, V{y:X}"),
            Self::SkipNeReg { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            Self::SetIndex(addr) => write!(f, "LD I, {addr:03X}"),
            Self::JumpOffset(addr) => write!(f, "JP V0, {addr:03X}"),
            Self::Random { x, byte } => write!(f, "RND V{x:X}, {byte:02X}"),
            Self::Draw { x, y, n } => write!(f, "DRW V{x:X}, V{y:X}, {n:X}"),
            Self::SkipKeyPressed { x } => write!(f, "SKP V{x:X}"),
            Self::SkipKeyNotPressed { x } => write!(f, "SKNP V{x:X}"),
            Self::LoadDelay { x } => write!(f, "LD V{x:X}, DT"),
            Self::WaitKey { x } => write!(f, "LD V{x:X}, K"),
            Self::SetDelay { x } => write!(f, "LD DT, V{x:X}"),
            Self::SetSound { x } => write!(f, "LD ST, V{x:X}"),
            Self::AddIndex { x } => write!(f, "ADD I, V{x:X}"),
            Self::LoadGlyph { x } => write!(f, "LD F, V{x:X}"),
            Self::StoreBcd { x } => write!(f, "LD B, V{x:X}"),
            Self::StoreRegisters { x } => write!(f, "LD [I], V{x:X}"),
            Self::LoadRegisters { x } => write!(f, "LD V{x:X}, [I]"),
            Self::Unknown(word) => write!(f, "DW {word:04X}"),
        }
    }
}

/// Decode a program image word by word, yielding `(address, word, instruction)`.
/// A trailing odd byte is not part of any word and is skipped.
pub fn disassemble(program: &[u8], base: u16) -> impl Iterator<Item = (u16, u16, Instruction)> + '_ {
    program.chunks_exact(2).enumerate().map(move |(i, pair)| {
        let word = u16::from_be_bytes([pair[0], pair[1]]);
        let addr = base.wrapping_add(2 * i as u16);
        (addr, word, Instruction::decode(word))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_all_opcodes() {
        let cases = [
            (0x0FFF, Instruction::Sys(0xFFF)),
            (0x00E0, Instruction::Clear),
            (0x00EE, Instruction::Return),
            (0x1ABC, Instruction::Jump(0xABC)),
            (0x2DEF, Instruction::Call(0xDEF)),
            (0x3FAA, Instruction::SkipEqImm { x: 0xF, byte: 0xAA }),
            (0x4FAA, Instruction::SkipNeImm { x: 0xF, byte: 0xAA }),
            (0x5FA0, Instruction::SkipEqReg { x: 0xF, y: 0xA }),
            (0x6FAB, Instruction::LoadImm { x: 0xF, byte: 0xAB }),
            (0x7FAB, Instruction::AddImm { x: 0xF, byte: 0xAB }),
            (0x8FA0, Instruction::Copy { x: 0xF, y: 0xA }),
            (0x8FA1, Instruction::Or { x: 0xF, y: 0xA }),
            (0x8FA2, Instruction::And { x: 0xF, y: 0xA }),
            (0x8FA3, Instruction::Xor { x: 0xF, y: 0xA }),
            (0x8FA4, Instruction::AddReg { x: 0xF, y: 0xA }),
            (0x8FA5, Instruction::Sub { x: 0xF, y: 0xA }),
            (0x8FA6, Instruction::ShiftRight { x: 0xF, y: 0xA }),
            (0x8FA7, Instruction::SubReversed { x: 0xF, y: 0xA }),
            (0x8FAE, Instruction::ShiftLeft { x: 0xF, y: 0xA }),
            (0x9FA0, Instruction::SkipNeReg { x: 0xF, y: 0xA }),
            (0xAFAB, Instruction::SetIndex(0xFAB)),
            (0xBFAB, Instruction::JumpOffset(0xFAB)),
            (0xCFAB, Instruction::Random { x: 0xF, byte: 0xAB }),
            (0xDFAB, Instruction::Draw { x: 0xF, y: 0xA, n: 0xB }),
            (0xEF9E, Instruction::SkipKeyPressed { x: 0xF }),
            (0xEFA1, Instruction::SkipKeyNotPressed { x: 0xF }),
            (0xF907, Instruction::LoadDelay { x: 0x9 }),
            (0xF90A, Instruction::WaitKey { x: 0x9 }),
            (0xF915, Instruction::SetDelay { x: 0x9 }),
            (0xF918, Instruction::SetSound { x: 0x9 }),
            (0xF91E, Instruction::AddIndex { x: 0x9 }),
            (0xF929, Instruction::LoadGlyph { x: 0x9 }),
            (0xF933, Instruction::StoreBcd { x: 0x9 }),
            (0xF955, Instruction::StoreRegisters { x: 0x9 }),
            (0xF965, Instruction::LoadRegisters { x: 0x9 }),
        ];

        for (word, expected) in cases {
            assert_eq!(Instruction::decode(word), expected, "{word:04X}");
        }
    }

    #[test]
    fn unmapped_words_are_unknown() {
        for word in [0x5AB1, 0x8DEF, 0x8AB8, 0x9DEF, 0xED9F, 0xE000, 0xFDEF, 0xF000] {
            assert_eq!(Instruction::decode(word), Instruction::Unknown(word));
        }
    }

    #[test]
    fn display_ops() {
        assert!(Instruction::decode(0x00E0).is_display_op());
        assert!(Instruction::decode(0xD125).is_display_op());
        assert!(!Instruction::decode(0x00EE).is_display_op());
    }

    #[test]
    fn mnemonics() {
        use std::string::ToString;

        assert_eq!(Instruction::decode(0x00E0).to_string(), "CLS");
        assert_eq!(Instruction::decode(0x0123).to_string(), "SYS 123");
        assert_eq!(Instruction::decode(0x2DEF).to_string(), "CALL DEF");
        assert_eq!(Instruction::decode(0x3A07).to_string(), "SE VA, 07");
        assert_eq!(Instruction::decode(0xA050).to_string(), "LD I, 050");
        assert_eq!(Instruction::decode(0xD125).to_string(), "DRW V1, V2, 5");
        assert_eq!(Instruction::decode(0xF355).to_string(), "LD [I], V3");
        assert_eq!(Instruction::decode(0xF365).to_string(), "LD V3, [I]");
        assert_eq!(Instruction::decode(0xFFFF).to_string(), "DW FFFF");
    }

    #[test]
    fn disassemble_program() {
        let program = [0x00, 0xE0, 0xA2, 0x2A, 0x12, 0x00, 0xFF];
        let mut listing = disassemble(&program, 0x200);

        assert_eq!(listing.next(), Some((0x200, 0x00E0, Instruction::Clear)));
        assert_eq!(listing.next(), Some((0x202, 0xA22A, Instruction::SetIndex(0x22A))));
        assert_eq!(listing.next(), Some((0x204, 0x1200, Instruction::Jump(0x200))));
        assert_eq!(listing.next(), None);
    }
}
