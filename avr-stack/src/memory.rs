//! Firmware store
//!
//! Byte-addressed program image. Loading grows the store as needed; gaps
//! between HEX data segments read as zero.

use avr_spec::{HexFile, ProgramMemory, ProgramMemoryMut};

use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareMemory {
    bytes: Vec<u8>,
}

impl FirmwareMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Materialize a parsed HEX file
    pub fn from_hex(hex: &HexFile) -> Self {
        let mut memory = Self::new();
        hex.upload_to(&mut memory);
        memory
    }

    /// Parse Intel HEX text and load it
    pub fn parse_hex(text: &str) -> Result<Self> {
        let hex = HexFile::parse(text)?;
        Ok(Self::from_hex(&hex))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ProgramMemory for FirmwareMemory {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, address: usize) -> Option<u8> {
        self.bytes.get(address).copied()
    }
}

impl ProgramMemoryMut for FirmwareMemory {
    fn write(&mut self, address: usize, byte: u8) {
        if address >= self.bytes.len() {
            self.bytes.resize(address + 1, 0);
        }
        self.bytes[address] = byte;
    }
}
