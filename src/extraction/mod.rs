//! Sentence context around a text selection.
//!
//! The algorithm in [`sentence`] only reads a tree through the
//! [`DocumentTree`] trait, so it runs the same over a live document adapter
//! or over the arena-backed [`Document`] used by the CLI and tests.

pub mod document;
pub mod sentence;
pub mod tree;

pub use document::{Document, NodeId};
pub use sentence::{extract_sentence, MAX_SCAN_CHARS, SENTENCE_TERMINATORS};
pub use tree::{BoundaryPoint, Display, DocumentTree, Selection, SelectionRange};
