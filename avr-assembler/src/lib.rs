//! AVR Assembler
//!
//! Assemble AVR assembly language into flash images and Intel HEX files.
//!
//! ## Example
//!
//! ```rust
//! use avr_assembler::assemble;
//!
//! let source = r#"
//!     push r16
//!     ret
//! "#;
//!
//! let image = assemble(source).unwrap();
//! assert_eq!(image.words, vec![0x930F, 0x9508]);
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod encoder;
pub mod assembler;

pub use error::{AssemblerError, Result};
pub use assembler::{assemble, assemble_hex, Image};
pub use parser::{parse_instruction, parse_register};
pub use encoder::{encode, encode_bytes};
