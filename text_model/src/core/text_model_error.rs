// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Error type shared by the content store, the line index, and the document model.
//!
//! Every variant is a caller mistake (a position that does not exist in the document).
//! Nothing is ever clamped: an out of range request is reported back as-is so the
//! caller can see exactly which value was wrong.

use miette::Diagnostic;

/// Result alias used throughout this crate.
pub type TextModelResult<T> = Result<T, TextModelError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum TextModelError {
    /// An insertion point or a single offset lies past the end of the document.
    #[error("Offset {offset} is out of range for a document of length {length}")]
    #[diagnostic(
        code(r3bl_text_model::offset_out_of_range),
        help("Valid offsets run from 0 up to and including the document length")
    )]
    OffsetOutOfRange { offset: usize, length: usize },

    /// A `(offset, requested)` span extends past the end of the document.
    #[error(
        "Range {offset}..{offset}+{requested} is out of bounds for a document of length {length}"
    )]
    #[diagnostic(
        code(r3bl_text_model::range_out_of_bounds),
        help("The range must satisfy offset + length <= document length")
    )]
    RangeOutOfBounds {
        offset: usize,
        requested: usize,
        length: usize,
    },

    #[error("Line {line} is out of range, the document has {line_count} line(s)")]
    #[diagnostic(
        code(r3bl_text_model::line_out_of_range),
        help("Valid lines run from 0 up to, but excluding, the line count")
    )]
    LineOutOfRange { line: usize, line_count: usize },

    #[error(
        "Relative offset {relative_offset} lies beyond line {line} of length {line_length}"
    )]
    #[diagnostic(code(r3bl_text_model::relative_offset_beyond_line))]
    RelativeOffsetBeyondLine {
        line: usize,
        relative_offset: usize,
        line_length: usize,
    },

    #[error("No fold handler is registered under the name '{name}'")]
    #[diagnostic(
        code(r3bl_text_model::unknown_fold_handler),
        help("Use FoldHandlerProvider::fold_handler_names() to list what is available")
    )]
    UnknownFoldHandler { name: String },
}
