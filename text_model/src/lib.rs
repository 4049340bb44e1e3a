// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_text_model
//!
//! In-memory text storage for a code editing component. A [`TextDocument`] holds a
//! mutable character sequence and provides:
//!
//! - offset to line mapping, and per line text, length, start and end offsets,
//! - fold levels per line, computed lazily by a pluggable [`FoldHandler`],
//! - undo and redo, where consecutive typing merges into one step, a delete followed by
//!   an insert at the same place becomes a replace, and the same replace at several
//!   carets becomes one step,
//! - change notification through [`ModelListener`] and [`UndoListener`],
//!
//! all behind a reader/writer lock.
//!
//! ## Layers
//!
//! | Module      | What it holds                                                     |
//! | ----------- | ----------------------------------------------------------------- |
//! | [`storage`] | [`GapBuffer`] (the characters), [`LineIndex`], [`TextSlice`] views |
//! | [`history`] | [`Edit`] and [`EditLog`] (undo and redo chains)                   |
//! | [`model`]   | [`DocumentState`], [`TextDocument`], folds, listeners             |
//! | [`core`]    | errors, bounds checks, configuration, logging setup               |
//!
//! Offsets and lengths count `char`s, not bytes. Lines end with `\n`, which belongs to
//! the line it ends.
//!
//! ## Example
//!
//! ```
//! use r3bl_text_model::TextDocument;
//!
//! let document = TextDocument::new();
//! for (offset, ch) in ["a", "b", "c"].into_iter().enumerate() {
//!     document.insert(offset, ch).unwrap();
//! }
//! document.insert(3, "\nline two").unwrap();
//! assert_eq!(document.line_of_offset(4).unwrap(), 1);
//!
//! // Typing merged into a single step.
//! document.undo().unwrap();
//! assert_eq!(document.text(), "");
//! assert!(!document.is_dirty());
//! ```

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap().
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules (re-exported below to provide clean public API).
pub mod core;
pub mod history;
pub mod model;
pub mod storage;

// Re-export.
pub use core::*;
pub use history::*;
pub use model::*;
pub use storage::*;
