//! Opcode post-processing
//!
//! - `generator`: runs the line differ and annotates the resulting opcodes
//!   with whitespace-only and indentation-change metadata
//! - `moves`: detects relocated blocks and attaches move mappings

pub mod generator;
pub mod moves;

pub use generator::{DiffOpcodeGenerator, OpcodeGeneratorFlags};
