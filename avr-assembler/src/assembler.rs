//! Main assembler logic
//!
//! Two passes: the first assigns word addresses to labels, the second
//! builds and encodes instructions against the complete label table.

use avr_spec::HexFile;

use crate::encoder::encode;
use crate::error::{AssemblerError, Result};
use crate::parser::{build_instruction, parse_source, Labels, Statement};

/// Assembled flash image
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    /// Opcode words in program order, starting at word address 0
    pub words: Vec<u16>,
    /// Label name to word address
    pub labels: Labels,
}

impl Image {
    /// Image as little-endian flash bytes
    pub fn bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Image as an Intel HEX file
    pub fn to_hex(&self) -> HexFile {
        HexFile::from_image(&self.bytes())
    }

    /// Word address of a label
    pub fn label(&self, name: &str) -> Option<u32> {
        self.labels.get(name).copied()
    }

    /// Size in words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Assemble source code into a flash image
pub fn assemble(source: &str) -> Result<Image> {
    let lines = parse_source(source)?;

    // Pass 1: label addresses
    let mut labels = Labels::new();
    let mut pc = 0u32;
    for line in &lines {
        for label in &line.labels {
            if labels.insert(label.clone(), pc).is_some() {
                return Err(AssemblerError::DuplicateLabel {
                    line: line.number,
                    label: label.clone(),
                });
            }
        }
        if let Some(statement) = &line.statement {
            pc += statement.width();
        }
    }

    // Pass 2: encoding
    let mut words = Vec::with_capacity(pc as usize);
    for line in &lines {
        match &line.statement {
            Some(Statement::Instruction { mnemonic, operands }) => {
                let pc = words.len() as u32;
                let instr = build_instruction(mnemonic, operands, pc, &labels, line.number)?;
                words.extend(encode(&instr));
            }
            Some(Statement::Words(data)) => words.extend_from_slice(data),
            None => {}
        }
    }

    Ok(Image { words, labels })
}

/// Assemble source code straight to Intel HEX text
pub fn assemble_hex(source: &str) -> Result<String> {
    Ok(assemble(source)?.to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test
            push r16
            ret
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.words, vec![0x930F, 0x9508]);
        assert_eq!(image.bytes(), vec![0x0F, 0x93, 0x08, 0x95]);
    }

    #[test]
    fn test_assemble_forward_label() {
        let source = r#"
            call sub
        spin:
            rjmp spin
        sub:
            ret
        "#;

        let image = assemble(source).unwrap();
        assert_eq!(image.label("spin"), Some(2));
        assert_eq!(image.label("sub"), Some(3));
        assert_eq!(image.words, vec![0x940E, 0x0003, 0xCFFF, 0x9508]);
    }

    #[test]
    fn test_assemble_hex_text() {
        let hex = assemble_hex("push r16\nret").unwrap();
        assert_eq!(hex, ":040000000F930895BD\n:00000001FF\n");
    }
}
