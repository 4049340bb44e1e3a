// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Character storage for a document: the gap buffer that owns the text, the line index
//! derived from it, and the borrowed views used to read both without copying.

// Attach sources.
pub mod gap_buffer;
pub mod line_index;
pub mod text_slice;

// Re-export.
pub use gap_buffer::*;
pub use line_index::*;
pub use text_slice::*;
