//! quill-editor: the in-memory editing buffer that feeds the parser.
//!
//! - [`TextBuffer`] abstracts text storage (char offsets throughout)
//! - [`RopeBuffer`] is the ropey-backed implementation
//! - [`History`] wraps any buffer with bounded undo/redo

pub mod buffer;
pub mod undo;

pub use buffer::{RopeBuffer, TextBuffer};
pub use smol_str::SmolStr;
pub use undo::{History, DEFAULT_UNDO_DEPTH};
