//! # Intel HEX Load Images
//!
//! Firmware images are distributed as Intel HEX text. Each line is one
//! record:
//!
//! ```text
//! :LLAAAATT[DD...]CC
//!  LL    data length in bytes
//!  AAAA  16-bit load offset (big-endian)
//!  TT    record type
//!  DD    data bytes
//!  CC    two's complement of the sum of all preceding bytes
//! ```
//!
//! Supported record types: data (00), end-of-file (01), extended segment
//! address (02), start segment address (03), extended linear address (04)
//! and start linear address (05).
//!
//! Parsing rejects data placed past [`MAX_PROGRAM_BYTES`], so loading a
//! parsed file never allocates more than one device's program memory.

use crate::error::{AvrError, Result};
use crate::memory::ProgramMemoryMut;
use crate::MAX_PROGRAM_BYTES;
use std::fmt;
use std::str::FromStr;

/// Maximum data bytes per record emitted by [`HexFile::from_image`]
pub const BYTES_PER_RECORD: usize = 16;

/// One Intel HEX record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Type 00
    Data { offset: u16, bytes: Vec<u8> },
    /// Type 01
    EndOfFile,
    /// Type 02: base address = segment * 16
    ExtendedSegmentAddress(u16),
    /// Type 03: CS:IP start address
    StartSegmentAddress { cs: u16, ip: u16 },
    /// Type 04: upper 16 bits of the base address
    ExtendedLinearAddress(u16),
    /// Type 05: 32-bit start address
    StartLinearAddress(u32),
}

impl Record {
    pub fn kind(&self) -> u8 {
        match self {
            Record::Data { .. } => 0x00,
            Record::EndOfFile => 0x01,
            Record::ExtendedSegmentAddress(_) => 0x02,
            Record::StartSegmentAddress { .. } => 0x03,
            Record::ExtendedLinearAddress(_) => 0x04,
            Record::StartLinearAddress(_) => 0x05,
        }
    }

    /// New load base set by an extended address record
    fn base_address(&self) -> Option<usize> {
        match self {
            Record::ExtendedSegmentAddress(segment) => Some((*segment as usize) << 4),
            Record::ExtendedLinearAddress(upper) => Some((*upper as usize) << 16),
            _ => None,
        }
    }

    fn offset_and_payload(&self) -> (u16, Vec<u8>) {
        match self {
            Record::Data { offset, bytes } => (*offset, bytes.clone()),
            Record::EndOfFile => (0, Vec::new()),
            Record::ExtendedSegmentAddress(segment) => (0, segment.to_be_bytes().to_vec()),
            Record::StartSegmentAddress { cs, ip } => {
                let mut payload = cs.to_be_bytes().to_vec();
                payload.extend_from_slice(&ip.to_be_bytes());
                (0, payload)
            }
            Record::ExtendedLinearAddress(upper) => (0, upper.to_be_bytes().to_vec()),
            Record::StartLinearAddress(address) => (0, address.to_be_bytes().to_vec()),
        }
    }

    /// Encode as a record line (without line terminator)
    pub fn encode(&self) -> String {
        let (offset, payload) = self.offset_and_payload();
        let mut bytes = Vec::with_capacity(payload.len() + 5);
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(&offset.to_be_bytes());
        bytes.push(self.kind());
        bytes.extend_from_slice(&payload);
        bytes.push(checksum(&bytes));

        let mut line = String::with_capacity(bytes.len() * 2 + 1);
        line.push(':');
        for byte in bytes {
            line.push_str(&format!("{:02X}", byte));
        }
        line
    }
}

/// Parsed Intel HEX file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexFile {
    records: Vec<Record>,
}

impl HexFile {
    /// Build from records; an end-of-file record is appended if missing
    pub fn from_records(mut records: Vec<Record>) -> Self {
        if records.last() != Some(&Record::EndOfFile) {
            records.push(Record::EndOfFile);
        }
        Self { records }
    }

    /// Build an image loaded at address zero
    pub fn from_image(image: &[u8]) -> Self {
        let mut records = Vec::new();
        let mut upper = 0u16;

        for (index, chunk) in image.chunks(BYTES_PER_RECORD).enumerate() {
            let address = index * BYTES_PER_RECORD;
            let chunk_upper = (address >> 16) as u16;
            if chunk_upper != upper {
                records.push(Record::ExtendedLinearAddress(chunk_upper));
                upper = chunk_upper;
            }
            records.push(Record::Data {
                offset: (address & 0xFFFF) as u16,
                bytes: chunk.to_vec(),
            });
        }

        Self::from_records(records)
    }

    /// Parse Intel HEX text
    pub fn parse(text: &str) -> Result<Self> {
        let mut records = Vec::new();
        let mut seen_eof = false;
        let mut base = 0usize;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let raw = raw.trim();

            if raw.is_empty() {
                continue;
            }
            if seen_eof {
                return Err(AvrError::RecordAfterEndOfFile { line });
            }

            let record = parse_record(raw, line)?;
            if let Some(address) = record.base_address() {
                base = address;
            }
            if let Record::Data { offset, bytes } = &record {
                let end = base + *offset as usize + bytes.len();
                if end > MAX_PROGRAM_BYTES {
                    return Err(AvrError::ImageTooLarge { line, end });
                }
            }
            seen_eof = record == Record::EndOfFile;
            records.push(record);
        }

        if !seen_eof {
            return Err(AvrError::MissingEndOfFile);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Data records resolved to absolute byte addresses
    pub fn segments(&self) -> Vec<(usize, &[u8])> {
        let mut base = 0usize;
        let mut segments = Vec::new();

        for record in &self.records {
            if let Record::Data { offset, bytes } = record {
                segments.push((base + *offset as usize, bytes.as_slice()));
            } else if let Some(address) = record.base_address() {
                base = address;
            }
        }

        segments
    }

    /// Total number of data bytes
    pub fn data_len(&self) -> usize {
        self.segments().iter().map(|(_, bytes)| bytes.len()).sum()
    }

    /// Write every data record into a program memory
    pub fn upload_to<M: ProgramMemoryMut + ?Sized>(&self, memory: &mut M) {
        for (address, bytes) in self.segments() {
            memory.write_bytes(address, bytes);
        }
    }
}

impl FromStr for HexFile {
    type Err = AvrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for HexFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}", record.encode())?;
        }
        Ok(())
    }
}

/// Two's complement of the byte sum
fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg()
}

fn invalid(line: usize, reason: impl Into<String>) -> AvrError {
    AvrError::InvalidRecord {
        line,
        reason: reason.into(),
    }
}

fn parse_record(text: &str, line: usize) -> Result<Record> {
    let body = text
        .strip_prefix(':')
        .ok_or_else(|| invalid(line, "missing ':' start code"))?;

    if !body.is_ascii() {
        return Err(invalid(line, "non-ASCII characters"));
    }
    if body.len() % 2 != 0 {
        return Err(invalid(line, "odd number of hex digits"));
    }

    let bytes = (0..body.len())
        .step_by(2)
        .map(|i| {
            let pair = &body[i..i + 2];
            u8::from_str_radix(pair, 16)
                .map_err(|_| invalid(line, format!("invalid hex digits '{}'", pair)))
        })
        .collect::<Result<Vec<u8>>>()?;

    if bytes.len() < 5 {
        return Err(invalid(line, "record too short"));
    }

    let declared = bytes[0] as usize;
    let found = bytes.len() - 5;
    if declared != found {
        return Err(AvrError::LengthMismatch { line, declared, found });
    }

    let (payload, stored) = bytes.split_at(bytes.len() - 1);
    let expected = checksum(payload);
    if expected != stored[0] {
        return Err(AvrError::BadChecksum {
            line,
            expected,
            found: stored[0],
        });
    }

    let offset = u16::from_be_bytes([bytes[1], bytes[2]]);
    let kind = bytes[3];
    let data = &payload[4..];

    let expect_len = |len: usize| {
        if data.len() == len {
            Ok(())
        } else {
            Err(invalid(
                line,
                format!("record type {:#04x} needs {} data bytes, found {}", kind, len, data.len()),
            ))
        }
    };

    match kind {
        0x00 => Ok(Record::Data {
            offset,
            bytes: data.to_vec(),
        }),
        0x01 => {
            expect_len(0)?;
            Ok(Record::EndOfFile)
        }
        0x02 => {
            expect_len(2)?;
            Ok(Record::ExtendedSegmentAddress(u16::from_be_bytes([data[0], data[1]])))
        }
        0x03 => {
            expect_len(4)?;
            Ok(Record::StartSegmentAddress {
                cs: u16::from_be_bytes([data[0], data[1]]),
                ip: u16::from_be_bytes([data[2], data[3]]),
            })
        }
        0x04 => {
            expect_len(2)?;
            Ok(Record::ExtendedLinearAddress(u16::from_be_bytes([data[0], data[1]])))
        }
        0x05 => {
            expect_len(4)?;
            Ok(Record::StartLinearAddress(u32::from_be_bytes([
                data[0], data[1], data[2], data[3],
            ])))
        }
        other => Err(AvrError::UnsupportedRecordType { line, kind: other }),
    }
}
