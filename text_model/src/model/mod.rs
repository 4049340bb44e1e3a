// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The document model: [`DocumentState`] coordinates the content store, the line index,
//! the edit log, and the fold cache, and [`TextDocument`] guards it with a reader/writer
//! lock and broadcasts changes to registered listeners.

/// Enable verbose logging of every insert, delete, and bulk set.
pub const DEBUG_TEXT_MODEL_EDITS: bool = false;

/// Enable verbose logging of fold level recomputation.
pub const DEBUG_TEXT_MODEL_FOLDS: bool = false;

// Attach sources.
pub mod document_state;
pub mod fold;
pub mod listeners;
pub mod text_document;

// Re-export.
pub use document_state::*;
pub use fold::*;
pub use listeners::*;
pub use text_document::*;
