//! In-memory diff, patch, and chunk-rendering toolkit.
//!
//! The pipeline goes: raw file pair -> [`diff::SequenceDiffer`] -> opcodes ->
//! [`opcodes::DiffOpcodeGenerator`] (move detection, whitespace and
//! indentation annotation) or [`interdiff`] (for diffs of diffs) ->
//! [`chunks`] for renderable output. [`parser`] and [`patch`] are independent
//! entry points that consume raw diff text and file content.
//!
//! Everything operates on pre-loaded buffers; no I/O, storage, or HTTP
//! concerns live here.

pub mod chunks;
pub mod diff;
pub mod errors;
pub mod interdiff;
pub mod opcodes;
pub mod parser;
pub mod patch;

pub use diff::{Opcode, OpcodeMeta, SequenceDiffer, Tag};
pub use errors::{DiffParserError, PatchError};
