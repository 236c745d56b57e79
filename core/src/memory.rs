//! The 4 KiB address space. Glyphs live at 0x050, programs start at 0x200.

use crate::{Error, Fault, default_font::DEFAULT_FONT};

pub const MEMORY_SIZE: usize = 4096;
pub const FONT_START: u16 = 0x050;
pub const PROGRAM_START: u16 = 0x200;

#[derive(Debug, Clone)]
pub struct Memory {
    ram: [u8; MEMORY_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub const fn new() -> Self {
        Self {
            ram: [0; MEMORY_SIZE],
        }
    }

    /// Copy `bytes` into memory starting at `offset`.
    /// Nothing is written if the data would run past the end of memory.
    pub fn load(&mut self, offset: u16, bytes: &[u8]) -> Result<(), Error> {
        let start = offset as usize;
        let end = start
            .checked_add(bytes.len())
            .filter(|&end| end <= MEMORY_SIZE)
            .ok_or(Error::LoadTooLarge {
                offset,
                len: bytes.len(),
            })?;
        self.ram[start..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn load_font(&mut self) {
        let start = FONT_START as usize;
        self.ram[start..start + DEFAULT_FONT.len()].copy_from_slice(&DEFAULT_FONT);
    }

    pub fn read_byte(&self, addr: u16) -> Result<u8, Fault> {
        self.ram
            .get(addr as usize)
            .copied()
            .ok_or(Fault::MemoryOutOfBounds(addr as usize))
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), Fault> {
        let byte = self
            .ram
            .get_mut(addr as usize)
            .ok_or(Fault::MemoryOutOfBounds(addr as usize))?;
        *byte = value;
        Ok(())
    }

    /// Big-endian 16-bit word at `addr`
    pub fn read_word(&self, addr: u16) -> Result<u16, Fault> {
        let bytes = self.read_slice(addr, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_slice(&self, addr: u16, len: usize) -> Result<&[u8], Fault> {
        let start = addr as usize;
        Self::check_range(start, len)?;
        Ok(&self.ram[start..start + len])
    }

    /// Nothing is written if any byte would land out of bounds
    pub fn write_slice(&mut self, addr: u16, bytes: &[u8]) -> Result<(), Fault> {
        let start = addr as usize;
        Self::check_range(start, bytes.len())?;
        self.ram[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn bytes(&self) -> &[u8; MEMORY_SIZE] {
        &self.ram
    }

    // Reports the first address that falls outside memory
    fn check_range(start: usize, len: usize) -> Result<(), Fault> {
        if start + len > MEMORY_SIZE {
            Err(Fault::MemoryOutOfBounds(start.max(MEMORY_SIZE)))
        } else {
            Ok(())
        }
    }
}
