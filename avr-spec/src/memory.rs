//! Program memory access
//!
//! The decoder reads instruction words through [`ProgramMemory`]; image
//! loaders write through [`ProgramMemoryMut`].

use crate::{byte_address, Pc};

/// Read access to a byte-addressable program image
pub trait ProgramMemory {
    /// Number of bytes in the image
    fn size(&self) -> usize;

    /// Read one byte, `None` past the end of the image
    fn read(&self, address: usize) -> Option<u8>;

    /// Read the little-endian instruction word at a program counter
    fn read_word(&self, pc: Pc) -> Option<u16> {
        let address = byte_address(pc);
        let lo = self.read(address)?;
        let hi = self.read(address + 1)?;
        Some(u16::from_le_bytes([lo, hi]))
    }

    /// Check whether a program counter lies at or beyond the end of the image
    fn is_past_end(&self, pc: Pc) -> bool {
        byte_address(pc) >= self.size()
    }
}

/// Write access used when loading an image
pub trait ProgramMemoryMut: ProgramMemory {
    /// Write one byte, growing the image if needed
    fn write(&mut self, address: usize, byte: u8);

    fn write_bytes(&mut self, address: usize, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.write(address + i, byte);
        }
    }
}

impl ProgramMemory for [u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn read(&self, address: usize) -> Option<u8> {
        self.get(address).copied()
    }
}

impl ProgramMemory for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn read(&self, address: usize) -> Option<u8> {
        self.get(address).copied()
    }
}

impl ProgramMemoryMut for Vec<u8> {
    fn write(&mut self, address: usize, byte: u8) {
        if address >= self.len() {
            self.resize(address + 1, 0);
        }
        self[address] = byte;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_word_little_endian() {
        let image: &[u8] = &[0x0F, 0x93, 0x08, 0x95];
        assert_eq!(image.read_word(0), Some(0x930F));
        assert_eq!(image.read_word(1), Some(0x9508));
        assert_eq!(image.read_word(2), None);
    }

    #[test]
    fn test_read_word_odd_size() {
        let image: &[u8] = &[0x00, 0x00, 0x12];
        assert_eq!(image.read_word(1), None);
        assert!(!image.is_past_end(1));
        assert!(image.is_past_end(2));
    }

    #[test]
    fn test_vec_write_grows() {
        let mut image: Vec<u8> = Vec::new();
        image.write_bytes(4, &[0xAA, 0xBB]);
        assert_eq!(image.size(), 6);
        assert_eq!(image.read(0), Some(0));
        assert_eq!(image.read_word(2), Some(0xBBAA));
    }
}
